//! Character encoding support for MAB2 byte formats.
//!
//! Binary MAB2 and diskette files are byte streams. Modern files are UTF-8;
//! older exchange files use local 8-bit code pages. Readers and writers take an
//! [`encoding_rs::Encoding`] (UTF-8 by default) and convert through this module.
//!
//! Conversion never fails: undecodable bytes become U+FFFD and unmappable
//! characters become numeric character references. Both cases are reported to
//! the caller so that decoders can record a warning.

use encoding_rs::{Encoding, UTF_8};

/// Default encoding for byte formats (UTF-8).
#[must_use]
pub fn default_encoding() -> &'static Encoding {
    UTF_8
}

/// Decode bytes, returning the text and whether replacement occurred.
///
/// No BOM sniffing takes place; the given encoding is always used.
#[must_use]
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> (String, bool) {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    (text.into_owned(), had_errors)
}

/// Encode text, returning the bytes and whether unmappable characters occurred.
#[must_use]
pub fn encode_string(text: &str, encoding: &'static Encoding) -> (Vec<u8>, bool) {
    let (bytes, _, had_unmappable) = encoding.encode(text);
    (bytes.into_owned(), had_unmappable)
}

/// Look up an encoding by WHATWG label (for example `"utf-8"` or `"windows-1252"`)
#[must_use]
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn test_utf8_roundtrip() {
        let (bytes, unmappable) = encode_string("Grass, Günter", default_encoding());
        assert!(!unmappable);
        let (text, errors) = decode_bytes(&bytes, default_encoding());
        assert!(!errors);
        assert_eq!(text, "Grass, Günter");
    }

    #[test]
    fn test_invalid_utf8_reported() {
        let (text, errors) = decode_bytes(b"G\xFCnter", default_encoding());
        assert!(errors);
        assert_eq!(text, "G\u{FFFD}nter");
    }

    #[test]
    fn test_single_byte_encoding() {
        let (text, errors) = decode_bytes(b"G\xFCnter", WINDOWS_1252);
        assert!(!errors);
        assert_eq!(text, "Günter");
        let (bytes, _) = encode_string("Günter", WINDOWS_1252);
        assert_eq!(bytes, b"G\xFCnter");
    }

    #[test]
    fn test_control_characters_pass_through() {
        let (text, _) = decode_bytes(b"655 \x1Fuhttp://a", WINDOWS_1252);
        assert_eq!(text, "655 \u{1F}uhttp://a");
    }

    #[test]
    fn test_encoding_for_label() {
        assert_eq!(encoding_for_label("latin1"), Some(WINDOWS_1252));
        assert_eq!(encoding_for_label(" UTF-8 "), Some(UTF_8));
        assert_eq!(encoding_for_label("no-such-encoding"), None);
    }
}
