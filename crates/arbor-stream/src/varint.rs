use crate::error::{StreamError, StreamResult};

/// Encode a u64 as a variable-length integer (LEB128).
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a variable-length integer. Returns (value, bytes_consumed).
///
/// `offset` is the absolute position of `data` and only used for errors.
pub(crate) fn decode_varint(data: &[u8], offset: usize) -> StreamResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if shift >= 64 {
            return Err(StreamError::Corrupt {
                offset: offset as u64,
                reason: "varint overflow".into(),
            });
        }
    }
    Err(StreamError::Corrupt {
        offset: offset as u64,
        reason: "truncated varint".into(),
    })
}

/// Map signed integers onto unsigned so small magnitudes stay short.
pub(crate) fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub(crate) fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
