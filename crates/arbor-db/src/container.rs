//! Binary file container.
//!
//! ```text
//! "ARBR" | version: u32 BE | flags: u8 | body | crc32(body): u32 BE
//! ```
//!
//! Flag bit 0 marks a zstd-compressed body. The CRC covers the body as
//! stored, so corruption is caught before decompression.

use crate::error::{DbError, DbResult};

pub const MAGIC: &[u8; 4] = b"ARBR";
pub const VERSION: u32 = 1;

const FLAG_ZSTD: u8 = 0x01;
const HEADER_LEN: usize = 9;
const TRAILER_LEN: usize = 4;

/// Frame a binary token stream, compressing it when `level` is set.
pub fn seal(stream: &[u8], level: Option<i32>) -> DbResult<Vec<u8>> {
    let (flags, body) = match level {
        Some(level) => {
            let compressed = zstd::encode_all(stream, level)
                .map_err(|e| DbError::CompressionFailed(e.to_string()))?;
            (FLAG_ZSTD, compressed)
        }
        None => (0, stream.to_vec()),
    };
    let mut out = Vec::with_capacity(HEADER_LEN + body.len() + TRAILER_LEN);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_be_bytes());
    out.push(flags);
    out.extend_from_slice(&body);
    out.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());
    Ok(out)
}

/// Validate a container and return the binary token stream inside it.
pub fn open(data: &[u8]) -> DbResult<Vec<u8>> {
    if data.len() < HEADER_LEN + TRAILER_LEN {
        return Err(DbError::Truncated { len: data.len() });
    }
    if &data[0..4] != MAGIC {
        return Err(DbError::InvalidMagic {
            actual: String::from_utf8_lossy(&data[0..4]).into(),
        });
    }
    let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    if version != VERSION {
        return Err(DbError::UnsupportedVersion(version));
    }
    let flags = data[8];
    if flags & !FLAG_ZSTD != 0 {
        return Err(DbError::UnsupportedFlags(flags));
    }

    let (body, trailer) = data[HEADER_LEN..].split_at(data.len() - HEADER_LEN - TRAILER_LEN);
    let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = crc32fast::hash(body);
    if expected != actual {
        return Err(DbError::CrcMismatch { expected, actual });
    }

    if flags & FLAG_ZSTD != 0 {
        zstd::decode_all(body).map_err(|e| DbError::DecompressionFailed(e.to_string()))
    } else {
        Ok(body.to_vec())
    }
}

/// Does `data` start like a container?
pub fn is_container(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}
