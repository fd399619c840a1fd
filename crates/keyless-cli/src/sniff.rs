//! Media type detection from leading bytes

const TAR_MAGIC_OFFSET: usize = 257;

/// Best-effort media type of `data`
pub fn detect_media_type(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x1f, 0x8b]) {
        return "application/gzip";
    }
    if data.starts_with(b"PK\x03\x04") || data.starts_with(b"PK\x05\x06") {
        return "application/zip";
    }
    if data.len() >= TAR_MAGIC_OFFSET + 5
        && &data[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5] == b"ustar"
    {
        return "application/x-tar";
    }
    if data.starts_with(b"\x7fELF") {
        return "application/x-executable";
    }
    if data.starts_with(&[0xfe, 0xed, 0xfa, 0xce])
        || data.starts_with(&[0xfe, 0xed, 0xfa, 0xcf])
        || data.starts_with(&[0xce, 0xfa, 0xed, 0xfe])
        || data.starts_with(&[0xcf, 0xfa, 0xed, 0xfe])
    {
        return "application/x-mach-binary";
    }
    if data.starts_with(b"MZ") {
        return "application/vnd.microsoft.portable-executable";
    }
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png";
    }
    if data.starts_with(&[0xff, 0xd8, 0xff]) {
        return "image/jpeg";
    }
    if data.starts_with(b"%PDF-") {
        return "application/pdf";
    }

    match std::str::from_utf8(data) {
        Ok(text) if !text.contains('\0') => {
            let trimmed = text.trim_start();
            if (trimmed.starts_with('{') || trimmed.starts_with('['))
                && serde_json::from_str::<serde_json::Value>(text).is_ok()
            {
                "application/json"
            } else {
                "text/plain"
            }
        }
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"hello".as_slice(), "text/plain")]
    #[case(b"".as_slice(), "text/plain")]
    #[case(br#"{"a": 1}"#.as_slice(), "application/json")]
    #[case(b"[1, 2".as_slice(), "text/plain")]
    #[case(&[0x1f, 0x8b, 0x08, 0x00], "application/gzip")]
    #[case(b"PK\x03\x04rest", "application/zip")]
    #[case(b"\x7fELF\x02\x01", "application/x-executable")]
    #[case(b"MZ\x90\x00", "application/vnd.microsoft.portable-executable")]
    #[case(b"\x89PNG\r\n\x1a\n", "image/png")]
    #[case(&[0x00, 0xff, 0x10], "application/octet-stream")]
    fn test_detect(#[case] data: &[u8], #[case] expected: &str) {
        assert_eq!(detect_media_type(data), expected);
    }

    #[test]
    fn test_detect_tar() {
        let mut header = vec![0u8; 512];
        header[257..262].copy_from_slice(b"ustar");
        assert_eq!(detect_media_type(&header), "application/x-tar");
    }
}
