use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use supplier_core::PostcodeRecord;
use supplier_logging::supplier_debug;

use crate::scrape::scrape_supplier;
use crate::{LookupError, LookupFailure};

pub const DEFAULT_ENDPOINT: &str =
    "https://www.water.org.uk/customers/find-your-supplier?ajax_form=1&_wrapper_format=drupal_ajax";

#[derive(Debug, Clone)]
pub struct LookupSettings {
    pub endpoint: String,
    /// Session token issued by the form page; it expires server-side.
    pub form_build_id: String,
    pub form_id: String,
    pub triggering_element_name: String,
    pub triggering_element_value: String,
    pub user_agent: String,
    /// Position of the envelope whose `data` carries the supplier HTML.
    pub envelope_index: usize,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            form_build_id: "form-L5pD8ZkLBHXVZ8bFpzrd3oIEPn94DYlRz298X2_IG1s".to_string(),
            form_id: "wateruk_find_my_supplier".to_string(),
            triggering_element_name: "op".to_string(),
            triggering_element_value: "Submit".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            envelope_index: 2,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 2 * 1024 * 1024,
        }
    }
}

/// One remote query per postcode. No retries, no state.
#[async_trait::async_trait]
pub trait SupplierLookup: Send + Sync {
    async fn lookup(&self, postcode: &str) -> Result<PostcodeRecord, LookupError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestLookup {
    settings: LookupSettings,
    client: reqwest::Client,
}

impl ReqwestLookup {
    pub fn new(settings: LookupSettings) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| LookupError::new(LookupFailure::Client, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn form_body(&self, postcode: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("postcode", postcode)
            .append_pair("form_build_id", &self.settings.form_build_id)
            .append_pair("form_id", &self.settings.form_id)
            .append_pair(
                "_triggering_element_name",
                &self.settings.triggering_element_name,
            )
            .append_pair(
                "_triggering_element_value",
                &self.settings.triggering_element_value,
            )
            .append_pair("_drupal_ajax", "1")
            .finish()
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, LookupError> {
        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(LookupError::new(
                    LookupFailure::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(LookupError::new(
                    LookupFailure::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl SupplierLookup for ReqwestLookup {
    async fn lookup(&self, postcode: &str) -> Result<PostcodeRecord, LookupError> {
        supplier_debug!("[Postcode {}] Sending request...", postcode);

        let response = self
            .client
            .post(self.settings.endpoint.as_str())
            .header(
                CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .body(self.form_body(postcode))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::new(
                LookupFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = self.read_body(response).await?;
        let html = extract_envelope_html(&body, self.settings.envelope_index)?;
        Ok(scrape_supplier(&html).into_record(postcode))
    }
}

/// Returns the `data` string of the envelope at `index` in a JSON array reply.
pub fn extract_envelope_html(body: &[u8], index: usize) -> Result<String, LookupError> {
    let envelopes: Vec<Value> = serde_json::from_slice(body)
        .map_err(|err| LookupError::new(LookupFailure::Parse, err.to_string()))?;

    let envelope = envelopes.get(index).ok_or_else(|| {
        LookupError::new(
            LookupFailure::Parse,
            format!(
                "envelope index {index} out of range ({} envelopes)",
                envelopes.len()
            ),
        )
    })?;

    envelope
        .get("data")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            LookupError::new(
                LookupFailure::Parse,
                format!("envelope {index} has no string data field"),
            )
        })
}

fn map_reqwest_error(err: reqwest::Error) -> LookupError {
    if err.is_timeout() {
        return LookupError::new(LookupFailure::Timeout, err.to_string());
    }
    LookupError::new(LookupFailure::Network, err.to_string())
}
