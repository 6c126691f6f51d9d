//! Code page transcoding
//!
//! CSV exports arrive in windows-1251, DBF tables in cp866. Both are
//! single-byte encodings, so decoding never fails; unmapped bytes become
//! U+FFFD.

use encoding_rs::{Encoding, IBM866, WINDOWS_1251};
use std::borrow::Cow;

/// Legacy single-byte code page of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePage {
    /// Windows Cyrillic, used by CSV exports
    Windows1251,
    /// DOS Cyrillic, used by DBF tables
    Cp866,
}

impl CodePage {
    pub fn encoding(self) -> &'static Encoding {
        match self {
            CodePage::Windows1251 => WINDOWS_1251,
            CodePage::Cp866 => IBM866,
        }
    }

    /// Decode `bytes` to UTF-8.
    ///
    /// Input that is already valid UTF-8 is returned unchanged, so decoding
    /// twice is harmless.
    pub fn decode(self, bytes: &[u8]) -> Cow<'_, str> {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return Cow::Borrowed(text);
        }
        let (text, _) = self.encoding().decode_without_bom_handling(bytes);
        text
    }

    /// Owned variant of [`CodePage::decode`] for whole files.
    pub fn decode_owned(self, bytes: Vec<u8>) -> String {
        match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                let (text, _) = self.encoding().decode_without_bom_handling(e.as_bytes());
                text.into_owned()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_windows1251() {
        // "Аптека" in windows-1251
        let raw = [0xC0, 0xEF, 0xF2, 0xE5, 0xEA, 0xE0];
        assert_eq!(CodePage::Windows1251.decode(&raw), "Аптека");
    }

    #[test]
    fn test_cp866() {
        // "Аптека" in cp866
        let raw = [0x80, 0xAF, 0xE2, 0xA5, 0xAA, 0xA0];
        assert_eq!(CodePage::Cp866.decode(&raw), "Аптека");
    }

    #[test]
    fn test_utf8_passes_through() {
        let text = "Аптека №1";
        let once = CodePage::Windows1251.decode(text.as_bytes());
        assert!(matches!(once, Cow::Borrowed(_)));
        assert_eq!(once, text);

        let twice = CodePage::Windows1251.decode(once.as_bytes());
        assert_eq!(twice, text);
    }

    #[test]
    fn test_decode_owned_matches_decode() {
        let raw = vec![0xC0, 0xEF, 0xF2, 0xE5, 0xEA, 0xE0, b';', b'1'];
        let borrowed = CodePage::Windows1251.decode(&raw).into_owned();
        assert_eq!(CodePage::Windows1251.decode_owned(raw), borrowed);
    }
}
