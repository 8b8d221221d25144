//! SigV4 request signing
//!
//! Minimal signer for the gateway's JSON POST requests: POST to `/` with an
//! empty query string and a fixed small header set, which keeps canonical
//! request construction straightforward. Not a general-purpose signer.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::Credentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Scope parameters for one signed request
pub struct SigningParams<'a> {
    pub region: &'a str,
    pub service: &'a str,
    pub timestamp: DateTime<Utc>,
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hex-encoded SHA-256 of the request payload, also sent as
/// `x-amz-content-sha256` by some services. Exposed for tests.
pub fn payload_hash(payload: &[u8]) -> String {
    sha256_hex(payload)
}

/// Compute the `Authorization` header for a POST to `/` with the given
/// headers and payload.
///
/// `headers` must contain every header to be signed, with lowercase names.
/// They are sorted here; the caller sends them verbatim on the wire.
pub fn authorization_header(
    credentials: &Credentials,
    params: &SigningParams<'_>,
    headers: &[(String, String)],
    payload: &[u8],
) -> String {
    let amz_date = params.timestamp.format("%Y%m%dT%H%M%SZ").to_string();
    let date = params.timestamp.format("%Y%m%d").to_string();

    let mut sorted: Vec<&(String, String)> = headers.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = sorted
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    let signed_headers: String = sorted
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    // POST to "/" with no query string.
    let canonical_request = format!(
        "POST\n/\n\n{}\n{}\n{}",
        canonical_headers,
        signed_headers,
        sha256_hex(payload)
    );

    let scope = format!(
        "{}/{}/{}/aws4_request",
        date, params.region, params.service
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    // Derived signing key: secret → date → region → service → terminator.
    let mut key = format!("AWS4{}", credentials.secret_access_key()).into_bytes();
    for part in [
        date.as_str(),
        params.region,
        params.service,
        "aws4_request",
    ] {
        key = hmac(&key, part.as_bytes());
    }
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));

    format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM,
        credentials.access_key_id(),
        scope,
        signed_headers,
        signature
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_credentials() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "secret-key-example", None)
    }

    fn test_params() -> SigningParams<'static> {
        SigningParams {
            region: "ap-northeast-1",
            service: "waf-regional",
            timestamp: Utc.with_ymd_and_hms(2024, 8, 27, 12, 0, 0).unwrap(),
        }
    }

    fn test_headers() -> Vec<(String, String)> {
        vec![
            ("x-amz-target".to_string(), "Svc.Op".to_string()),
            ("host".to_string(), "waf-regional.ap-northeast-1.amazonaws.com".to_string()),
            ("x-amz-date".to_string(), "20240827T120000Z".to_string()),
            ("content-type".to_string(), "application/x-amz-json-1.1".to_string()),
        ]
    }

    #[test]
    fn header_carries_scope_and_sorted_signed_headers() {
        let auth = authorization_header(&test_credentials(), &test_params(), &test_headers(), b"{}");

        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240827/"));
        assert!(auth.contains("/ap-northeast-1/waf-regional/aws4_request"));
        assert!(auth.contains("SignedHeaders=content-type;host;x-amz-date;x-amz-target"));
        assert!(auth.contains("Signature="));
    }

    #[test]
    fn signing_is_deterministic() {
        let a = authorization_header(&test_credentials(), &test_params(), &test_headers(), b"{}");
        let b = authorization_header(&test_credentials(), &test_params(), &test_headers(), b"{}");
        assert_eq!(a, b);
    }

    #[test]
    fn signature_depends_on_payload_and_secret() {
        let base = authorization_header(&test_credentials(), &test_params(), &test_headers(), b"{}");

        let other_payload =
            authorization_header(&test_credentials(), &test_params(), &test_headers(), b"{\"a\":1}");
        assert_ne!(base, other_payload);

        let other_creds = Credentials::new("AKIDEXAMPLE", "different-secret", None);
        let other_secret =
            authorization_header(&other_creds, &test_params(), &test_headers(), b"{}");
        assert_ne!(base, other_secret);
    }

    #[test]
    fn signature_is_lowercase_hex() {
        let auth = authorization_header(&test_credentials(), &test_params(), &test_headers(), b"{}");
        let sig = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn payload_hash_matches_known_empty_digest() {
        // SHA-256 of the empty string is a well-known constant.
        assert_eq!(
            payload_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
