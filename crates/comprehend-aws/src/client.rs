//! Async HTTP client for the Comprehend `BatchDetectEntities` operation.

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use comprehend_core::{
  BATCH_SIZE, Error as CoreError, entity::BatchResponse, extractor::EntityExtractor,
};
use reqwest::{Client, Request, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
  Error, Result,
  sigv4::{self, AMZ_DATE_FORMAT, SigningParams},
};

pub const DEFAULT_REGION: &str = "us-east-1";

const SERVICE: &str = "comprehend";
const TARGET: &str = "Comprehend_20171127.BatchDetectEntities";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Credentials {
  pub access_key_id:     String,
  pub secret_access_key: String,
  pub session_token:     Option<String>,
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("access_key_id", &self.access_key_id)
      .field("secret_access_key", &"<redacted>")
      .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
  pub credentials:  Credentials,
  pub region:       String,
  /// Overrides the regional endpoint, e.g. for a local emulator.
  pub endpoint_url: Option<String>,
}

impl ClientConfig {
  pub fn endpoint(&self) -> String {
    self
      .endpoint_url
      .clone()
      .unwrap_or_else(|| format!("https://{SERVICE}.{}.amazonaws.com", self.region))
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BatchRequest<'a> {
  text_list:     &'a [String],
  language_code: &'a str,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
  #[serde(rename = "__type")]
  kind:    Option<String>,
  #[serde(alias = "Message")]
  message: Option<String>,
}

/// Turn a non-2xx reply into [`Error::Service`]. `__type` may carry a
/// `namespace#` prefix, which is dropped.
fn service_error(status: u16, body: &[u8]) -> Error {
  let parsed: Option<ServiceErrorBody> = serde_json::from_slice(body).ok();
  let (kind, message) = match parsed {
    Some(body) => (body.kind, body.message),
    None => (None, None),
  };

  let code = kind
    .map(|k| k.rsplit('#').next().unwrap_or(&k).to_owned())
    .unwrap_or_else(|| "UnknownError".to_owned());
  let message = message.unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_owned());

  Error::Service { status, code, message }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ComprehendClient {
  client:   Client,
  config:   ClientConfig,
  endpoint: Url,
  /// `Host` header value as reqwest will send it.
  host:     String,
}

impl ComprehendClient {
  pub fn new(config: ClientConfig) -> Result<Self> {
    let url = config.endpoint();
    let invalid = |reason: String| Error::InvalidEndpoint { url: url.clone(), reason };

    let endpoint = Url::parse(&url).map_err(|e| invalid(e.to_string()))?;
    let host = match (endpoint.host_str(), endpoint.port()) {
      (Some(host), Some(port)) => format!("{host}:{port}"),
      (Some(host), None) => host.to_owned(),
      (None, _) => return Err(invalid("missing host".into())),
    };

    let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
    Ok(Self { client, config, endpoint, host })
  }

  pub fn endpoint(&self) -> &Url { &self.endpoint }

  /// Build the signed `BatchDetectEntities` request for `texts` as of `now`.
  pub fn build_request(
    &self,
    texts: &[String],
    language_code: &str,
    now: DateTime<Utc>,
  ) -> Result<Request> {
    let body = serde_json::to_vec(&BatchRequest { text_list: texts, language_code })?;
    let amz_date = now.format(AMZ_DATE_FORMAT).to_string();
    let credentials = &self.config.credentials;

    let mut headers = vec![
      ("content-type", CONTENT_TYPE),
      ("host", self.host.as_str()),
      ("x-amz-date", amz_date.as_str()),
      ("x-amz-target", TARGET),
    ];
    if let Some(token) = &credentials.session_token {
      headers.push(("x-amz-security-token", token.as_str()));
    }

    let params = SigningParams {
      access_key: &credentials.access_key_id,
      secret_key: &credentials.secret_access_key,
      region:     &self.config.region,
      service:    SERVICE,
      time:       now,
    };
    let authorization =
      sigv4::authorization(&params, "POST", self.endpoint.path(), &headers, &body);

    // reqwest derives `host` from the URL itself.
    let mut builder = self.client.post(self.endpoint.clone());
    for (name, value) in headers.iter().filter(|(name, _)| *name != "host") {
      builder = builder.header(*name, *value);
    }
    Ok(builder.header("authorization", authorization).body(body).build()?)
  }
}

impl EntityExtractor for ComprehendClient {
  type Error = Error;

  async fn detect_entities(&self, texts: &[String], language_code: &str) -> Result<BatchResponse> {
    if texts.len() > BATCH_SIZE {
      return Err(CoreError::TooManyDocuments(texts.len()).into());
    }

    let request = self.build_request(texts, language_code, Utc::now())?;
    debug!(documents = texts.len(), endpoint = %self.endpoint, "calling BatchDetectEntities");

    let resp = self.client.execute(request).await?;
    let status = resp.status();
    let body = resp.bytes().await?;

    if !status.is_success() {
      return Err(service_error(status.as_u16(), &body));
    }
    Ok(serde_json::from_slice(&body)?)
  }
}
