const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decode uploaded bytes into text without ever failing: BOM-aware UTF-8
/// first, then a Latin-1 fallback that maps every byte to a char. The
/// fallback is logged since it can only degrade, not fail.
pub fn decode_upload(bytes: &[u8]) -> String {
    let stripped = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(stripped) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::warn!("upload is not valid UTF-8, decoding as Latin-1");
            stripped.iter().map(|&b| b as char).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passes_through() {
        assert_eq!(decode_upload("Benämning".as_bytes()), "Benämning");
    }

    #[test]
    fn bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Vernr,Konto");
        assert_eq!(decode_upload(&bytes), "Vernr,Konto");
    }

    #[test]
    fn latin1_fallback_never_fails() {
        // "Benämning" encoded as Latin-1: 0xE4 is 'ä'
        let bytes = b"Ben\xE4mning";
        assert_eq!(decode_upload(bytes), "Benämning");
    }
}
