use flate2::write::{DeflateDecoder, GzDecoder, ZlibDecoder};
use std::io::{Result, Write};

/// Decodes `data` for a `Content-Encoding` token. `Ok(None)` means the
/// encoding is not one we know how to undo.
pub fn try_decompress(encoding: &str, data: &[u8]) -> Result<Option<Vec<u8>>> {
    Ok(match encoding {
        "gzip" | "x-gzip" => {
            let mut decoder = GzDecoder::new(Vec::new());
            decoder.write_all(data)?;
            Some(decoder.finish()?)
        }
        "deflate" => {
            let mut decoder = DeflateDecoder::new(Vec::new());
            decoder.write_all(data)?;
            Some(decoder.finish()?)
        }
        "zlib" => {
            let mut decoder = ZlibDecoder::new(Vec::new());
            decoder.write_all(data)?;
            Some(decoder.finish()?)
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    #[test]
    fn inflates_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello hello hello").unwrap();
        let packed = encoder.finish().unwrap();

        let unpacked = try_decompress("gzip", &packed).unwrap();
        assert_eq!(unpacked.as_deref(), Some(&b"hello hello hello"[..]));
    }

    #[test]
    fn unknown_encoding_is_passed_over() {
        assert!(try_decompress("br", b"whatever").unwrap().is_none());
    }

    #[test]
    fn garbage_gzip_is_an_error() {
        assert!(try_decompress("gzip", b"definitely not gzip").is_err());
    }
}
