//! Tile-layer disk encoding: whitespace-separated decimal ids ("plain"), or
//! little-endian 32-bit signed ids, optionally compressed, then
//! base64-encoded (§4.7).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::{Read, Write};

use crate::error::{CompressionErrorKind, ParseErrorKind, Result, SourceLocation, TactileError};
use crate::map::{TileCompression, TileFormat};

pub fn encode_plain(ids: &[i32]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" ")
}

pub fn decode_plain(payload: &str, source: &SourceLocation) -> Result<Vec<i32>> {
    payload
        .split_whitespace()
        .map(|token| token.parse::<i32>().map_err(|_| TactileError::parse(ParseErrorKind::CorruptTileData, source.clone())))
        .collect()
}

fn to_le_bytes(ids: &[i32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(ids.len() * 4);
    for id in ids {
        bytes.extend_from_slice(&id.to_le_bytes());
    }
    bytes
}

fn from_le_bytes(bytes: &[u8], source: &SourceLocation) -> Result<Vec<i32>> {
    if bytes.len() % 4 != 0 {
        return Err(TactileError::parse(ParseErrorKind::CorruptTileData, source.clone()));
    }
    Ok(bytes.chunks_exact(4).map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])).collect())
}

pub fn encode_base64(ids: &[i32], format: &TileFormat) -> Result<String> {
    let raw = to_le_bytes(ids);
    let compressed = match format.compression {
        TileCompression::None => raw,
        TileCompression::Zlib => {
            let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(format.zlib_level));
            encoder.write_all(&raw).map_err(|e| TactileError::compression(CompressionErrorKind::Zlib(e.to_string())))?;
            encoder.finish().map_err(|e| TactileError::compression(CompressionErrorKind::Zlib(e.to_string())))?
        }
        TileCompression::Zstd => {
            zstd::stream::encode_all(raw.as_slice(), format.zstd_level).map_err(|e| TactileError::compression(CompressionErrorKind::Zstd(e.to_string())))?
        }
    };
    Ok(STANDARD.encode(compressed))
}

pub fn decode_base64(payload: &str, compression: TileCompression, source: &SourceLocation) -> Result<Vec<i32>> {
    let compressed = STANDARD.decode(payload.trim()).map_err(|_| TactileError::parse(ParseErrorKind::CorruptTileData, source.clone()))?;
    let raw = match compression {
        TileCompression::None => compressed,
        TileCompression::Zlib => {
            let mut decoder = flate2::read::ZlibDecoder::new(compressed.as_slice());
            let mut out = Vec::new();
            decoder.read_to_end(&mut out).map_err(|e| TactileError::compression(CompressionErrorKind::Zlib(e.to_string())))?;
            out
        }
        TileCompression::Zstd => {
            zstd::stream::decode_all(compressed.as_slice()).map_err(|e| TactileError::compression(CompressionErrorKind::Zstd(e.to_string())))?
        }
    };
    from_le_bytes(&raw, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TileEncoding;

    fn loc() -> SourceLocation {
        SourceLocation::new("test.yaml")
    }

    #[test]
    fn plain_round_trips() {
        let ids = vec![0, 1, 17, -1, 4000];
        let encoded = encode_plain(&ids);
        assert_eq!(decode_plain(&encoded, &loc()).unwrap(), ids);
    }

    #[test]
    fn base64_uncompressed_round_trips() {
        let ids = vec![0, 1, 2, 3, 100000];
        let format = TileFormat { encoding: TileEncoding::Base64, compression: TileCompression::None, zlib_level: 6, zstd_level: 3 };
        let encoded = encode_base64(&ids, &format).unwrap();
        let decoded = decode_base64(&encoded, TileCompression::None, &loc()).unwrap();
        assert_eq!(decoded, ids);
    }

    #[test]
    fn base64_zlib_round_trips() {
        let ids = vec![5; 64];
        let format = TileFormat { encoding: TileEncoding::Base64, compression: TileCompression::Zlib, zlib_level: 6, zstd_level: 3 };
        let encoded = encode_base64(&ids, &format).unwrap();
        let decoded = decode_base64(&encoded, TileCompression::Zlib, &loc()).unwrap();
        assert_eq!(decoded, ids);
    }

    #[test]
    fn base64_zstd_round_trips() {
        let ids = vec![9; 64];
        let format = TileFormat { encoding: TileEncoding::Base64, compression: TileCompression::Zstd, zlib_level: 6, zstd_level: 3 };
        let encoded = encode_base64(&ids, &format).unwrap();
        let decoded = decode_base64(&encoded, TileCompression::Zstd, &loc()).unwrap();
        assert_eq!(decoded, ids);
    }

    #[test]
    fn corrupt_base64_payload_errors() {
        assert!(decode_base64("not valid base64!!", TileCompression::None, &loc()).is_err());
    }
}
