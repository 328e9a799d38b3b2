//! HMAC-SHA256 signature verification (§4.A.3). Constant-time comparison
//! throughout; never short-circuit on byte mismatch.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Missing,
    Malformed,
    Invalid,
}

/// `signature = hex(HMAC-SHA256(secret, raw_body))`, optionally carrying a
/// `sha256=` prefix as most webhook providers do.
pub fn verify(secret: &str, raw_body: &[u8], provided_signature: Option<&str>) -> SignatureCheck {
    let Some(provided) = provided_signature else {
        return SignatureCheck::Missing;
    };
    let provided = provided.strip_prefix("sha256=").unwrap_or(provided);

    let Ok(expected_bytes) = hex::decode(provided) else {
        return SignatureCheck::Malformed;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return SignatureCheck::Malformed;
    };
    mac.update(raw_body);
    let computed = mac.finalize().into_bytes();

    if computed.len() != expected_bytes.len() {
        return SignatureCheck::Invalid;
    }
    if computed.as_slice().ct_eq(&expected_bytes).into() {
        SignatureCheck::Valid
    } else {
        SignatureCheck::Invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_is_accepted() {
        let body = b"{\"rule\":{\"id\":\"5710\"}}";
        let sig = sign("wh_secret", body);
        assert_eq!(verify("wh_secret", body, Some(&sig)), SignatureCheck::Valid);
    }

    #[test]
    fn sha256_prefix_is_stripped() {
        let body = b"payload";
        let sig = format!("sha256={}", sign("secret", body));
        assert_eq!(verify("secret", body, Some(&sig)), SignatureCheck::Valid);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = b"payload";
        let sig = sign("right", body);
        assert_eq!(verify("wrong", body, Some(&sig)), SignatureCheck::Invalid);
    }

    #[test]
    fn missing_signature_is_reported() {
        assert_eq!(verify("secret", b"x", None), SignatureCheck::Missing);
    }

    #[test]
    fn non_hex_signature_is_malformed() {
        assert_eq!(verify("secret", b"x", Some("not-hex!!")), SignatureCheck::Malformed);
    }
}
