//! Newline-delimited line codec with encoding fallback.
//!
//! IRC predates universal UTF-8, and real networks still carry latin-1 and
//! cyrillic codepage traffic. The codec splits the raw byte stream on `\n`
//! (stripping a trailing `\r`) and decodes each complete line through a
//! priority list of encodings; the first encoding that decodes the line
//! without error wins. When every encoding fails, the line is force-decoded
//! byte by byte with `?` standing in for unmappable bytes — decoding never
//! fails to produce *some* text.
//!
//! The codec performs no I/O. Incomplete trailing fragments stay in the
//! caller's buffer until more bytes arrive.

use bytes::BytesMut;
use encoding::{Encoding, UTF_8, WINDOWS_1251, WINDOWS_1252};
use tokio_util::codec::Decoder;

/// Splits and decodes inbound IRC lines.
#[derive(Debug, Clone)]
pub struct LineCodec {
    encodings: Vec<&'static Encoding>,
}

impl LineCodec {
    /// Create a codec with the default encoding priority list:
    /// UTF-8, then windows-1252 (latin-1 superset), then windows-1251.
    #[must_use]
    pub fn new() -> Self {
        Self {
            encodings: vec![UTF_8, WINDOWS_1252, WINDOWS_1251],
        }
    }

    /// Create a codec with a custom encoding priority list.
    #[must_use]
    pub fn with_encodings(encodings: Vec<&'static Encoding>) -> Self {
        Self { encodings }
    }

    /// Decode one complete line (already stripped of its terminator).
    fn decode_line(&self, bytes: &[u8]) -> String {
        for enc in &self.encodings {
            if let Some(text) = enc.decode_without_bom_handling_and_without_replacement(bytes) {
                return text.into_owned();
            }
        }
        force_decode(bytes)
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        let Some(idx) = src.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let mut line = src.split_to(idx + 1);
        line.truncate(idx);
        while line.last() == Some(&b'\r') {
            let end = line.len() - 1;
            line.truncate(end);
        }
        Ok(Some(self.decode_line(&line)))
    }
}

/// Last-resort decode: ASCII passes through, everything else becomes `?`.
fn force_decode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}
