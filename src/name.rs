//! Stored object names and filesystem names
//!
//! Names are stored as 16 bytes of space padded ASCII. The helpers here map
//! between that field, what callers display, and what is safe to use as a
//! file name.

/// Width of every name field.
pub const NAME_SIZE: usize = 16;

/// File extension used for extracted and imported samples.
pub const SAMPLE_EXT: &str = ".wav";

/// Decodes a name field, dropping trailing spaces.
pub fn decode(field: &[u8]) -> String {
    let field = &field[..field.len().min(NAME_SIZE)];
    let end = field
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |i| i + 1);
    field[..end].iter().map(|&b| b as char).collect()
}

/// Encodes `name` into a space padded field. Input longer than the field is
/// truncated and non-ASCII characters become `?`.
pub fn encode(name: &str) -> [u8; NAME_SIZE] {
    let mut field = [b' '; NAME_SIZE];
    for (slot, c) in field.iter_mut().zip(name.chars()) {
        *slot = if c.is_ascii() { c as u8 } else { b'?' };
    }
    field
}

/// Builds a storable name from external text: anything other than ASCII
/// alphanumerics, space and `#` becomes `?`.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == ' ' || c == '#' {
                c
            } else {
                '?'
            }
        })
        .collect()
}

/// File name for a stored name: trimmed, with `/` escaped to `?`.
pub fn to_filename(name: &str) -> String {
    name.trim_end_matches(' ').replace('/', "?")
}

/// WAV file name for a stored sample name.
pub fn to_wav_filename(name: &str) -> String {
    format!("{}{}", to_filename(name), SAMPLE_EXT)
}

/// Strips a trailing `.wav` from a file name.
pub fn strip_wav_ext(file_name: &str) -> &str {
    file_name.strip_suffix(SAMPLE_EXT).unwrap_or(file_name)
}
