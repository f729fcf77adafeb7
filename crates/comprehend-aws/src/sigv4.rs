//! AWS Signature Version 4 over HMAC-SHA256.
//!
//! Only what a JSON-protocol `POST /` needs: no query-string canonicalisation
//! and no path segment encoding.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// `X-Amz-Date` format.
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const SCOPE_DATE_FORMAT: &str = "%Y%m%d";

/// Everything that goes into the credential scope.
#[derive(Debug, Clone, Copy)]
pub struct SigningParams<'a> {
  pub access_key: &'a str,
  pub secret_key: &'a str,
  pub region:     &'a str,
  pub service:    &'a str,
  pub time:       DateTime<Utc>,
}

impl SigningParams<'_> {
  fn scope(&self) -> String {
    format!(
      "{}/{}/{}/aws4_request",
      self.time.format(SCOPE_DATE_FORMAT),
      self.region,
      self.service
    )
  }
}

// ─── Primitives ──────────────────────────────────────────────────────────────

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 (RFC 2104).
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
  let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
  mac.update(data);
  mac.finalize().into_bytes().into()
}

pub fn sha256_hex(data: &[u8]) -> String { hex::encode(Sha256::digest(data)) }

/// Derive the per-day, per-region, per-service signing key.
pub fn signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> [u8; 32] {
  let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
  let k_region = hmac_sha256(&k_date, region.as_bytes());
  let k_service = hmac_sha256(&k_region, service.as_bytes());
  hmac_sha256(&k_service, b"aws4_request")
}

// ─── Signing ─────────────────────────────────────────────────────────────────

/// Compute the `Authorization` header value for a request with an empty
/// query string.
///
/// Every header in `headers` is signed; it must include `host` and
/// `x-amz-date`.
pub fn authorization(
  params: &SigningParams<'_>,
  method: &str,
  path: &str,
  headers: &[(&str, &str)],
  payload: &[u8],
) -> String {
  let mut canonical: Vec<(String, &str)> = headers
    .iter()
    .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
    .collect();
  canonical.sort_by(|a, b| a.0.cmp(&b.0));

  let canonical_headers: String = canonical
    .iter()
    .map(|(name, value)| format!("{name}:{value}\n"))
    .collect();
  let signed_headers = canonical
    .iter()
    .map(|(name, _)| name.as_str())
    .collect::<Vec<_>>()
    .join(";");

  let canonical_request = format!(
    "{method}\n{path}\n\n{canonical_headers}\n{signed_headers}\n{}",
    sha256_hex(payload)
  );

  let scope = params.scope();
  let string_to_sign = format!(
    "{ALGORITHM}\n{}\n{scope}\n{}",
    params.time.format(AMZ_DATE_FORMAT),
    sha256_hex(canonical_request.as_bytes())
  );

  let key = signing_key(
    params.secret_key,
    &params.time.format(SCOPE_DATE_FORMAT).to_string(),
    params.region,
    params.service,
  );
  let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

  format!(
    "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
    params.access_key
  )
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  const ACCESS_KEY: &str = "AKIDEXAMPLE";
  const SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

  #[test]
  fn hmac_rfc4231_short_key() {
    assert_eq!(
      hex::encode(hmac_sha256(b"Jefe", b"what do ya want for nothing?")),
      "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
    );
  }

  #[test]
  fn hmac_rfc4231_key_longer_than_block() {
    let key = [0xaa; 131];
    assert_eq!(
      hex::encode(hmac_sha256(&key, b"Test Using Larger Than Block-Size Key - Hash Key First")),
      "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54"
    );
  }

  #[test]
  fn empty_payload_hash() {
    assert_eq!(
      sha256_hex(b""),
      "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
  }

  #[test]
  fn derived_signing_key() {
    let key = signing_key(SECRET_KEY, "20120215", "us-east-1", "iam");
    assert_eq!(
      hex::encode(key),
      "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
    );
  }

  #[test]
  fn get_vanilla() {
    let params = SigningParams {
      access_key: ACCESS_KEY,
      secret_key: SECRET_KEY,
      region:     "us-east-1",
      service:    "service",
      time:       Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap(),
    };
    let auth = authorization(
      &params,
      "GET",
      "/",
      &[("Host", "example.amazonaws.com"), ("X-Amz-Date", "20150830T123600Z")],
      b"",
    );
    assert_eq!(
      auth,
      "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
       SignedHeaders=host;x-amz-date, \
       Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
    );
  }

  #[test]
  fn header_order_does_not_matter() {
    let params = SigningParams {
      access_key: ACCESS_KEY,
      secret_key: SECRET_KEY,
      region:     "eu-west-1",
      service:    "comprehend",
      time:       Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
    };
    let a = authorization(&params, "POST", "/", &[("host", "h"), ("x-amz-date", "d")], b"{}");
    let b = authorization(&params, "POST", "/", &[("x-amz-date", "d"), ("host", " h ")], b"{}");
    assert_eq!(a, b);
  }
}
