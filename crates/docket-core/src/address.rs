//! Tron base58check address codec.
//!
//! The on-chain contract returns raw address bytes (20-byte EVM form or the
//! 21-byte `0x41`-prefixed Tron form). Everything above the chain reader
//! works with the human-readable `T...` base58check encoding, so conversion
//! happens exactly once, at the chain boundary.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Tron mainnet address prefix byte.
const PREFIX: u8 = 0x41;
/// Prefixed payload length (prefix + 20 address bytes).
const PAYLOAD_LEN: usize = 21;
/// Checksum length appended to the payload before base58 encoding.
const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address payload must be 20 or 21 bytes, got {0}")]
    BadLength(usize),
    #[error("21-byte address must start with 0x41, got 0x{0:02x}")]
    BadPrefix(u8),
    #[error("invalid base58: {0}")]
    Base58(String),
    #[error("base58check checksum mismatch")]
    BadChecksum,
}

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&second[..CHECKSUM_LEN]);
    out
}

/// Encode raw chain bytes as a `T...` base58check address.
///
/// Accepts either the 20-byte EVM form (the prefix is prepended) or the
/// 21-byte prefixed form.
pub fn from_chain_bytes(bytes: &[u8]) -> Result<String, AddressError> {
    let mut payload = [0u8; PAYLOAD_LEN];
    match bytes.len() {
        20 => {
            payload[0] = PREFIX;
            payload[1..].copy_from_slice(bytes);
        }
        PAYLOAD_LEN => {
            if bytes[0] != PREFIX {
                return Err(AddressError::BadPrefix(bytes[0]));
            }
            payload.copy_from_slice(bytes);
        }
        n => return Err(AddressError::BadLength(n)),
    }

    let mut full = [0u8; PAYLOAD_LEN + CHECKSUM_LEN];
    full[..PAYLOAD_LEN].copy_from_slice(&payload);
    full[PAYLOAD_LEN..].copy_from_slice(&checksum(&payload));
    Ok(bs58::encode(full).into_string())
}

/// Decode a `T...` base58check address into the 21-byte prefixed form.
pub fn to_chain_bytes(address: &str) -> Result<[u8; PAYLOAD_LEN], AddressError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|e| AddressError::Base58(e.to_string()))?;

    if decoded.len() != PAYLOAD_LEN + CHECKSUM_LEN {
        return Err(AddressError::BadLength(decoded.len()));
    }

    let (payload, check) = decoded.split_at(PAYLOAD_LEN);
    if check != checksum(payload) {
        return Err(AddressError::BadChecksum);
    }
    if payload[0] != PREFIX {
        return Err(AddressError::BadPrefix(payload[0]));
    }

    let mut out = [0u8; PAYLOAD_LEN];
    out.copy_from_slice(payload);
    Ok(out)
}
