//! Creation time embedded in local identifiers.
//!
//! Accounts and objects carry time-sortable ids. Three historical layouts are
//! in use:
//!
//! * `aid`: 10 characters, the first 8 are base-36 milliseconds since
//!   2000-01-01T00:00:00Z, followed by 2 characters of noise.
//! * `aidx`: 16 base-36 characters with the same 8 character time prefix.
//! * `meid`: 24 hex digits, the first 12 are milliseconds since the Unix epoch
//!   biased by `0x800000000000`.

use jiff::Timestamp;
use thiserror::Error;

/// 2000-01-01T00:00:00Z in Unix milliseconds.
const AID_EPOCH_MS: i64 = 946_684_800_000;
const MEID_BIAS: i64 = 0x8000_0000_0000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum IdError {
    #[error("unrecognized id format: {0:?}")]
    UnrecognizedFormat(String),
    #[error("id {0:?} encodes a time outside the supported range")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IdFormat {
    Aid,
    Aidx,
    Meid,
}

impl IdFormat {
    pub(crate) fn detect(id: &str) -> Option<IdFormat> {
        // The two trailing aid characters are noise and may be anything.
        if id.chars().count() == 10 && id.chars().take(8).all(|c| c.is_ascii_alphanumeric()) {
            return Some(IdFormat::Aid);
        }
        let bytes = id.as_bytes();
        if bytes.len() == 16 && bytes.iter().all(u8::is_ascii_alphanumeric) {
            return Some(IdFormat::Aidx);
        }
        if bytes.len() == 24 && bytes.iter().all(u8::is_ascii_hexdigit) {
            return Some(IdFormat::Meid);
        }
        None
    }
}

/// Decode the instant an id was minted at.
pub(crate) fn decode_creation_time(id: &str) -> Result<Timestamp, IdError> {
    let unrecognized = || IdError::UnrecognizedFormat(id.to_string());
    let format = IdFormat::detect(id).ok_or_else(unrecognized)?;
    // detect() only admits an ASCII time prefix, so these slices stay on char
    // boundaries.
    let millis = match format {
        IdFormat::Aid | IdFormat::Aidx => {
            i64::from_str_radix(&id[..8], 36).map_err(|_| unrecognized())? + AID_EPOCH_MS
        }
        IdFormat::Meid => {
            i64::from_str_radix(&id[..12], 16).map_err(|_| unrecognized())? - MEID_BIAS
        }
    };
    Timestamp::from_millisecond(millis).map_err(|_| IdError::OutOfRange(id.to_string()))
}

/// Mint an `aid` for `at`. Only tests need to make ids.
#[cfg(test)]
pub(crate) fn aid_at(at: Timestamp) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut millis = (at.as_millisecond() - AID_EPOCH_MS).max(0);
    let mut prefix = [b'0'; 8];
    for slot in prefix.iter_mut().rev() {
        *slot = DIGITS[(millis % 36) as usize];
        millis /= 36;
    }
    let mut id = String::from_utf8_lossy(&prefix).into_owned();
    id.push_str("zz");
    id
}
