use std::time::{ SystemTime, UNIX_EPOCH };

use hmac::{ Hmac, Mac };
use sha1::Sha1;

use crate::error::{ AppError, Result };

const STEP_SECS: u64 = 30;
const DIGITS: u32 = 6;

/// RFC 6238 time-based one-time password over HMAC-SHA1, as used by
/// the platform's authenticator-app two-factor prompt. Secrets are the
/// base32 strings shown during authenticator enrollment.
pub fn totp_now(base32_secret: &str) -> Result<String> {
    totp_at(base32_secret, unix_now()?)
}

/// Code for the previous 30-second window. When the current code is
/// rejected, the clock may sit a step ahead of the platform's; one
/// retry with the prior window covers that skew.
pub fn totp_previous(base32_secret: &str) -> Result<String> {
    totp_at(base32_secret, unix_now()?.saturating_sub(STEP_SECS))
}

fn unix_now() -> Result<u64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .as_secs();
    Ok(now)
}

pub fn totp_at(base32_secret: &str, unix_time: u64) -> Result<String> {
    let key = decode_base32(base32_secret)?;
    hotp(&key, unix_time / STEP_SECS)
}

fn hotp(key: &[u8], counter: u64) -> Result<String> {
    let mut mac = Hmac::<Sha1>
        ::new_from_slice(key)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation per RFC 4226 §5.3
    let offset = (digest[19] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    let code = binary % 10u32.pow(DIGITS);
    Ok(format!("{:06}", code))
}

/// RFC 4648 base32 decode, case-insensitive, padding and spaces
/// tolerated. Authenticator secrets are frequently shown grouped with
/// spaces.
fn decode_base32(s: &str) -> Result<Vec<u8>> {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

    let mut bits: u32 = 0;
    let mut bit_count: u32 = 0;
    let mut out = Vec::with_capacity(s.len() * 5 / 8);

    for c in s.bytes() {
        if c == b'=' || c == b' ' || c == b'-' {
            continue;
        }
        let upper = c.to_ascii_uppercase();
        let value = ALPHABET
            .iter()
            .position(|&a| a == upper)
            .ok_or_else(|| {
                AppError::InvalidInput(format!("Invalid base32 character: {}", c as char))
            })? as u32;

        bits = (bits << 5) | value;
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push((bits >> bit_count) as u8);
        }
    }

    if out.is_empty() {
        return Err(AppError::InvalidInput("Empty base32 secret".to_string()));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // "12345678901234567890" in base32, the RFC 6238 test secret
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn test_base32_decode() {
        assert_eq!(decode_base32("MZXW6YTB").unwrap(), b"fooba");
        assert_eq!(decode_base32("MZXW6YTBOI======").unwrap(), b"foobar");
        // Lowercase and grouping are tolerated
        assert_eq!(decode_base32("mzxw 6ytb-oi").unwrap(), b"foobar");
        assert!(decode_base32("not!valid").is_err());
    }

    #[test]
    fn test_rfc6238_vectors() {
        // Appendix B of RFC 6238 (SHA-1 column, truncated to 6 digits)
        assert_eq!(totp_at(RFC_SECRET, 59).unwrap(), "287082");
        assert_eq!(totp_at(RFC_SECRET, 1111111109).unwrap(), "081804");
        assert_eq!(totp_at(RFC_SECRET, 1234567890).unwrap(), "005924");
        assert_eq!(totp_at(RFC_SECRET, 2000000000).unwrap(), "279037");
    }

    #[test]
    fn test_code_stable_within_step() {
        let a = totp_at(RFC_SECRET, 1000000000).unwrap();
        let b = totp_at(RFC_SECRET, 1000000029).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_code_changes_across_steps() {
        let a = totp_at(RFC_SECRET, 1000000000).unwrap();
        let b = totp_at(RFC_SECRET, 1000000060).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_previous_window_is_one_counter_back() {
        // Counter 1 covers seconds 30..60, counter 0 covers 0..30.
        assert_eq!(totp_at(RFC_SECRET, 59).unwrap(), "287082");
        assert_eq!(totp_at(RFC_SECRET, 29).unwrap(), "755224");
        assert_eq!(
            totp_at(RFC_SECRET, 59 - STEP_SECS).unwrap(),
            totp_at(RFC_SECRET, 29).unwrap()
        );
    }

    #[test]
    fn test_totp_previous_trails_the_current_window() {
        // Bracket the wall clock so a step boundary mid-test cannot
        // produce a false failure.
        let before = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let code = totp_previous(RFC_SECRET).unwrap();
        let after = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();

        let low = totp_at(RFC_SECRET, before - STEP_SECS).unwrap();
        let high = totp_at(RFC_SECRET, after - STEP_SECS).unwrap();
        assert!(code == low || code == high);
    }
}
