use encoding_rs::{GBK, UTF_16LE, UTF_8};

/// How received line bytes are turned into display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// One character per byte. Escaped and non-ASCII bytes from the
    /// firmware come out as their code points, never as replacement chars.
    #[default]
    Raw,
    Auto,
    Utf8,
    Utf16,
    Ascii,
    Gbk,
}

impl std::str::FromStr for TextEncoding {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Raw" => Self::Raw,
            "Auto" => Self::Auto,
            "UTF-8" => Self::Utf8,
            "UTF-16" => Self::Utf16,
            "ASCII" => Self::Ascii,
            "GBK" | "GB2312" => Self::Gbk,
            _ => return Err(()),
        })
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Raw => "Raw",
            Self::Auto => "Auto",
            Self::Utf8 => "UTF-8",
            Self::Utf16 => "UTF-16",
            Self::Ascii => "ASCII",
            Self::Gbk => "GBK",
        })
    }
}

impl TextEncoding {
    pub const ALL: [TextEncoding; 6] = [
        Self::Raw,
        Self::Auto,
        Self::Utf8,
        Self::Utf16,
        Self::Ascii,
        Self::Gbk,
    ];

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Raw => bytes.iter().map(|&b| b as char).collect(),
            Self::Auto => detect_and_decode(bytes),
            Self::Utf8 => UTF_8.decode(bytes).0.into_owned(),
            Self::Utf16 => UTF_16LE.decode(bytes).0.into_owned(),
            Self::Ascii => bytes
                .iter()
                .map(|&b| if b < 128 { b as char } else { '?' })
                .collect(),
            Self::Gbk => GBK.decode(bytes).0.into_owned(),
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
