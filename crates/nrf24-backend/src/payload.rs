use encoding_rs::UTF_8;
use serde::{Deserialize, Serialize};

/// How received payloads are rendered in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    #[default]
    Auto,
    Utf8,
    Ascii,
    Hex,
}

impl std::str::FromStr for PayloadEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "auto" => Self::Auto,
            "utf8" | "utf-8" => Self::Utf8,
            "ascii" => Self::Ascii,
            "hex" => Self::Hex,
            other => return Err(format!("unknown payload encoding `{other}`")),
        })
    }
}

impl PayloadEncoding {
    pub fn render(&self, bytes: &[u8]) -> String {
        // Payloads sent as C strings carry their terminator.
        let text = match bytes.iter().position(|&b| b == 0) {
            Some(end) if *self != Self::Hex => &bytes[..end],
            _ => bytes,
        };
        match self {
            Self::Auto => detect_and_decode(text),
            Self::Utf8 => UTF_8.decode(text).0.into_owned(),
            Self::Ascii => text
                .iter()
                .map(|&b| if b.is_ascii() && !b.is_ascii_control() { b as char } else { '.' })
                .collect(),
            Self::Hex => hex::encode(bytes),
        }
    }
}

fn detect_and_decode(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);

    encoding.decode(bytes).0.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_string_terminator_is_dropped() {
        let payload = b"hello\0\0\0";
        assert_eq!(PayloadEncoding::Auto.render(payload), "hello");
        assert_eq!(PayloadEncoding::Utf8.render(payload), "hello");
    }

    #[test]
    fn hex_keeps_every_byte() {
        assert_eq!(PayloadEncoding::Hex.render(&[0x01, 0x00, 0xAB]), "0100ab");
    }

    #[test]
    fn ascii_masks_binary() {
        assert_eq!(PayloadEncoding::Ascii.render(&[b'o', b'k', 0x07, 0xC3]), "ok..");
    }

    #[test]
    fn parse_names() {
        assert_eq!("UTF-8".parse::<PayloadEncoding>(), Ok(PayloadEncoding::Utf8));
        assert!("gbk".parse::<PayloadEncoding>().is_err());
    }
}
