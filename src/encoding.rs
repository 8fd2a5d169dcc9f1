use std::fmt;

const BOM: char = '\u{FEFF}';

/// Character encoding used when reading and writing documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl TextEncoding {
    /// Looks up an encoding by one of its common labels, ignoring case.
    pub fn for_label(label: &str) -> Option<TextEncoding> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(TextEncoding::Utf8),
            "utf-16le" | "utf16le" => Some(TextEncoding::Utf16Le),
            "utf-16be" | "utf16be" => Some(TextEncoding::Utf16Be),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Some(TextEncoding::Latin1),
            _ => None,
        }
    }

    /// The canonical label.
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Utf16Le => "UTF-16LE",
            TextEncoding::Utf16Be => "UTF-16BE",
            TextEncoding::Latin1 => "ISO-8859-1",
        }
    }

    /// `None` if `bytes` are not valid in this encoding. A leading byte order mark is dropped.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        let text = match self {
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).ok()?,
            TextEncoding::Utf16Le => decode_utf16(bytes, u16::from_le_bytes)?,
            TextEncoding::Utf16Be => decode_utf16(bytes, u16::from_be_bytes)?,
            TextEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        };
        Some(match text.strip_prefix(BOM) {
            Some(rest) => rest.to_string(),
            None => text,
        })
    }

    /// `None` if `text` holds a character this encoding cannot represent.
    pub fn encode(&self, text: &str) -> Option<Vec<u8>> {
        match self {
            TextEncoding::Utf8 => Some(text.as_bytes().to_vec()),
            TextEncoding::Utf16Le => Some(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            TextEncoding::Utf16Be => Some(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            TextEncoding::Latin1 => text.chars().map(|c| u8::try_from(c).ok()).collect(),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
