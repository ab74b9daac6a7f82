/// The on-disk encoding of a file.
///
/// Buffers always hold decoded characters; the encoding only matters when
/// bytes cross the boundary (file I/O, child-process pipes). `Ascii` treats
/// every byte as a character in 0..=255, Latin-1 style, so arbitrary binary
/// content survives a load/save round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    Ascii,
    #[default]
    Utf8,
}

/// Decodes raw bytes into text according to `enc`.
pub fn decode(bytes: &[u8], enc: Encoding) -> String {
    match enc {
        Encoding::Ascii => bytes.iter().map(|&b| b as char).collect(),
        Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Encodes text into raw bytes according to `enc`.
///
/// In ASCII mode characters are truncated to their low byte, matching the
/// decode direction: byte-soup buffers produced by the `A` command write
/// back out unchanged.
pub fn encode(text: &str, enc: Encoding) -> Vec<u8> {
    match enc {
        Encoding::Ascii => text.chars().map(|c| c as u32 as u8).collect(),
        Encoding::Utf8 => text.as_bytes().to_vec(),
    }
}

/// Whether `bytes` form a complete, valid UTF-8 sequence.
pub fn is_valid_utf8(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
}
