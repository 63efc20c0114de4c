//! AWS Signature Version 4 request signing.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{AwsApiError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Compute the `Authorization` header for one request.
///
/// `headers` must contain every header to be signed (at minimum `host` and
/// `x-amz-date`), with lowercase names and trimmed values; they are sorted
/// here. `amz_date` is the ISO-basic timestamp also sent as `X-Amz-Date`
/// (e.g. `20150830T123600Z`); its first eight characters form the scope date.
#[allow(clippy::too_many_arguments)]
pub(crate) fn authorization_header(
    access_key_id: &str,
    secret_access_key: &str,
    region: &str,
    service: &str,
    method: &str,
    canonical_uri: &str,
    canonical_querystring: &str,
    headers: &[(String, String)],
    payload: &[u8],
    amz_date: &str,
) -> Result<String> {
    let date = &amz_date[..8.min(amz_date.len())];

    // Step 1: Build canonical request
    let mut sorted_headers: Vec<&(String, String)> = headers.iter().collect();
    sorted_headers.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = sorted_headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_headers = sorted_headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let hashed_payload = format!("{:x}", Sha256::digest(payload));
    let canonical_request = format!(
        "{method}\n{canonical_uri}\n{canonical_querystring}\n{canonical_headers}\n{signed_headers}\n{hashed_payload}"
    );
    let hashed_canonical_request = format!("{:x}", Sha256::digest(canonical_request.as_bytes()));

    // Step 2: Build string to sign
    let credential_scope = format!("{date}/{region}/{service}/aws4_request");
    let string_to_sign =
        format!("AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{hashed_canonical_request}");

    // Step 3: Derive the signing key and calculate the signature
    let secret_date = hmac_sha256(format!("AWS4{secret_access_key}").as_bytes(), date.as_bytes())?;
    let secret_region = hmac_sha256(&secret_date, region.as_bytes())?;
    let secret_service = hmac_sha256(&secret_region, service.as_bytes())?;
    let secret_signing = hmac_sha256(&secret_service, b"aws4_request")?;
    let signature = hex::encode(hmac_sha256(&secret_signing, string_to_sign.as_bytes())?);

    // Step 4: Build authorization header
    Ok(format!(
        "AWS4-HMAC-SHA256 Credential={access_key_id}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}"
    ))
}

/// Percent-encode a query-string component per the canonical-request rules
/// (RFC 3986 unreserved characters stay literal).
pub(crate) fn percent_encode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    encoded
}

/// HMAC-SHA256 helper function
fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AwsApiError::HmacError(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
