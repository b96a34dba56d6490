//! Checkpoint file framing: gzip around a sequence of RFC 5531 record-marked XDR values.

use crate::reader::{from_bytes, Decode};
use crate::writer::{to_bytes, Encode};
use crate::XdrError;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

const LAST_FRAGMENT: u32 = 0x8000_0000;
const LENGTH_MASK: u32 = 0x7fff_ffff;

pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, XdrError> {
    let mut decoder = MultiGzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| XdrError::Gzip {
            reason: e.to_string(),
        })?;
    Ok(out)
}

pub fn gzip(data: &[u8]) -> Result<Vec<u8>, XdrError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| XdrError::Gzip {
            reason: e.to_string(),
        })
}

/// Splits a record-marked stream into records, joining multi-fragment records.
pub fn split_records(data: &[u8]) -> Result<Vec<Vec<u8>>, XdrError> {
    let mut records = Vec::new();
    let mut current: Vec<u8> = Vec::new();
    let mut in_record = false;
    let mut pos = 0;

    while pos < data.len() {
        if data.len() - pos < 4 {
            return Err(XdrError::InvalidRecordMark {
                reason: format!("truncated header at offset {}", pos),
            });
        }
        let mut header = [0u8; 4];
        header.copy_from_slice(&data[pos..pos + 4]);
        let mark = u32::from_be_bytes(header);
        let len = (mark & LENGTH_MASK) as usize;
        pos += 4;

        if data.len() - pos < len {
            return Err(XdrError::InvalidRecordMark {
                reason: format!(
                    "fragment of {} bytes at offset {} exceeds input",
                    len,
                    pos - 4
                ),
            });
        }
        current.extend_from_slice(&data[pos..pos + len]);
        in_record = true;
        pos += len;

        if mark & LAST_FRAGMENT != 0 {
            records.push(std::mem::take(&mut current));
            in_record = false;
        }
    }

    if in_record {
        return Err(XdrError::InvalidRecordMark {
            reason: "stream ended inside a record".to_string(),
        });
    }
    Ok(records)
}

pub fn decode_records<T: Decode>(data: &[u8]) -> Result<Vec<T>, XdrError> {
    split_records(data)?
        .iter()
        .map(|record| from_bytes(record))
        .collect()
}

/// Frames every value as a single-fragment record.
pub fn encode_records<T: Encode>(items: &[T]) -> Vec<u8> {
    let mut out = Vec::new();
    for item in items {
        let bytes = to_bytes(item);
        out.extend_from_slice(&(LAST_FRAGMENT | bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&bytes);
    }
    out
}

pub fn read_file<T: Decode>(gz: &[u8]) -> Result<Vec<T>, XdrError> {
    decode_records(&gunzip(gz)?)
}

pub fn write_file<T: Encode>(items: &[T]) -> Result<Vec<u8>, XdrError> {
    gzip(&encode_records(items))
}
