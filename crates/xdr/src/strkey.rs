//! Stellar "strkey" encoding for account IDs (`G...`).
//!
//! Layout: base32(version byte || payload || crc16-xmodem(version || payload) as little endian).

use crate::XdrError;

const VERSION_ACCOUNT_ID: u8 = 6 << 3;
const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
const ACCOUNT_ID_LEN: usize = 56;

pub fn encode_account_id(key: &[u8; 32]) -> String {
    encode(VERSION_ACCOUNT_ID, key)
}

pub fn decode_account_id(s: &str) -> Result<[u8; 32], XdrError> {
    if s.len() != ACCOUNT_ID_LEN {
        return Err(invalid(format!("expected {} characters, got {}", ACCOUNT_ID_LEN, s.len())));
    }
    let payload = decode(VERSION_ACCOUNT_ID, s)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&payload);
    Ok(key)
}

pub fn is_valid_account_id(s: &str) -> bool {
    decode_account_id(s).is_ok()
}

fn invalid(reason: impl Into<String>) -> XdrError {
    XdrError::InvalidStrKey {
        reason: reason.into(),
    }
}

fn encode(version: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 3);
    data.push(version);
    data.extend_from_slice(payload);
    let crc = crc16_xmodem(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    base32_encode(&data)
}

fn decode(version: u8, s: &str) -> Result<Vec<u8>, XdrError> {
    let data = base32_decode(s).ok_or_else(|| invalid("not base32"))?;
    if data.len() < 3 {
        return Err(invalid("too short"));
    }
    if data[0] != version {
        return Err(invalid(format!("unexpected version byte {}", data[0])));
    }
    let (body, checksum) = data.split_at(data.len() - 2);
    let expected = crc16_xmodem(body).to_le_bytes();
    if checksum != expected {
        return Err(invalid("checksum mismatch"));
    }
    Ok(body[1..].to_vec())
}

fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for byte in data {
        buffer = (buffer << 8) | *byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

fn base32_decode(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for c in s.bytes() {
        let value = ALPHABET.iter().position(|a| *a == c)? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }
    // Leftover bits must be zero for a canonical encoding.
    if bits >= 5 || buffer & ((1 << bits) - 1) != 0 {
        return None;
    }
    Some(out)
}
