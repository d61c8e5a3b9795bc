//! Single-byte decoding for the registry feed.

/// Decode ISO-8859-1 bytes. Every byte maps to the code point of the same
/// value, so this never fails.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
