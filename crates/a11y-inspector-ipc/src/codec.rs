//! Gzip framing for capture payloads handed to the relay.

use std::io::Read;
use std::io::Write;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::CodecError;

pub fn encode(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(text.len() / 4), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(CodecError::Compress)?;
    encoder.finish().map_err(CodecError::Compress)
}

pub fn decode(bytes: &[u8]) -> Result<String, CodecError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(CodecError::Decompress)?;
    Ok(String::from_utf8(out)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_edge_strings_survive() {
        for text in ["", "\n", "\r\n", "é漢字🙂", r#"{"views":{"children":[]}}"#] {
            assert_eq!(decode(&encode(text).unwrap()).unwrap(), text);
        }
    }

    #[test]
    fn test_output_is_gzip() {
        let bytes = encode("hello").unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            decode(b"definitely not gzip"),
            Err(CodecError::Decompress(_))
        ));
    }

    #[test]
    fn test_non_utf8_payload_is_rejected() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[0xff, 0xfe, 0x00]).unwrap();
        let bytes = encoder.finish().unwrap();
        assert!(matches!(decode(&bytes), Err(CodecError::Utf8(_))));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(text in any::<String>()) {
            prop_assert_eq!(decode(&encode(&text).unwrap()).unwrap(), text);
        }
    }
}
