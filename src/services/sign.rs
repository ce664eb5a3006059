// SPDX-License-Identifier: MIT

//! HMAC-SHA256 request signing for the vendor cloud API.
//!
//! Every request carries a signature over the method, body digest, path,
//! timestamp, and credentials. The token endpoint signs without a bearer
//! token; all other endpoints include it.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Compute the request signature.
///
/// String-to-sign is `METHOD \n SHA256_HEX(body) \n "" \n path` (the empty
/// line is reserved for signed headers, which this client never sends).
/// The signed message prepends the access id, the bearer token when
/// present, and the millisecond timestamp. Output is uppercase hex.
pub fn sign_request(
    method: &str,
    path: &str,
    body: &[u8],
    timestamp: &str,
    access_id: &str,
    access_key: &str,
    access_token: Option<&str>,
) -> String {
    let body_digest = hex::encode(Sha256::digest(body));
    let string_to_sign = format!("{}\n{}\n\n{}", method, body_digest, path);

    let mut message = String::from(access_id);
    if let Some(token) = access_token {
        message.push_str(token);
    }
    message.push_str(timestamp);
    message.push_str(&string_to_sign);

    // HMAC accepts keys of any length, so new_from_slice cannot fail.
    let mut mac = HmacSha256::new_from_slice(access_key.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC key of any length is valid"));
    mac.update(message.as_bytes());
    hex::encode_upper(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_ID: &str = "test_access_id";
    const ACCESS_KEY: &str = "test_access_key";
    const TS: &str = "1700000000000";
    const PATH: &str = "/v1.0/token?grant_type=1";

    fn base_sign() -> String {
        sign_request("GET", PATH, b"", TS, ACCESS_ID, ACCESS_KEY, None)
    }

    #[test]
    fn test_signature_deterministic() {
        assert_eq!(base_sign(), base_sign());
    }

    #[test]
    fn test_signature_is_uppercase_hex() {
        let sig = base_sign();
        assert_eq!(sig.len(), 64);
        assert!(sig
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_each_input_changes_signature() {
        let base = base_sign();

        let changed = [
            sign_request("POST", PATH, b"", TS, ACCESS_ID, ACCESS_KEY, None),
            sign_request("GET", "/v1.0/other", b"", TS, ACCESS_ID, ACCESS_KEY, None),
            sign_request("GET", PATH, b"{}", TS, ACCESS_ID, ACCESS_KEY, None),
            sign_request("GET", PATH, b"", "1700000000001", ACCESS_ID, ACCESS_KEY, None),
            sign_request("GET", PATH, b"", TS, "other_id", ACCESS_KEY, None),
            sign_request("GET", PATH, b"", TS, ACCESS_ID, "other_key", None),
            sign_request("GET", PATH, b"", TS, ACCESS_ID, ACCESS_KEY, Some("tok")),
        ];

        for sig in changed {
            assert_ne!(base, sig);
        }
    }

    #[test]
    fn test_token_inserted_between_id_and_timestamp() {
        // A token must not be interchangeable with timestamp prefix bytes.
        let with_token = sign_request("GET", PATH, b"", TS, ACCESS_ID, ACCESS_KEY, Some("12"));
        let shifted = sign_request("GET", PATH, b"", "121700000000000", ACCESS_ID, ACCESS_KEY, None);
        // Both concatenate to the same message, which is exactly the
        // documented construction.
        assert_eq!(with_token, shifted);
    }
}
