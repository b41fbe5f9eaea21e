use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::AppConfig;
use crate::record::{CarrierRecord, Lookup};

const API_KEY_HEADER: &str = "x-api-key";
const BODY_PREVIEW_CHARS: usize = 300;

/// Anything that can produce a carrier record for an MC number.
pub trait RecordSource: Send + Sync {
    fn fetch(&self, mc_number: u64) -> Lookup<CarrierRecord>;
}

/// Client for the SaferWeb snapshot API.
pub struct SaferApiClient {
    client: Client,
    base_url: String,
}

impl SaferApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        // A key that isn't a valid header value is sent as nothing and the
        // API will answer 401 for every lookup, which gets logged per item.
        match HeaderValue::from_str(&config.api_key) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(API_KEY_HEADER, value);
            }
            Err(e) => warn!("SAFER_API_KEY is not a valid header value: {}", e),
        }

        let client = Client::builder()
            .timeout(config.api_timeout)
            .default_headers(headers)
            .build()?;

        Ok(SaferApiClient {
            client,
            base_url: config.api_base_url.clone(),
        })
    }

    fn url_for(&self, mc_number: u64) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, mc_number)
        } else {
            format!("{}/{}", self.base_url, mc_number)
        }
    }
}

impl RecordSource for SaferApiClient {
    fn fetch(&self, mc_number: u64) -> Lookup<CarrierRecord> {
        let url = self.url_for(mc_number);
        let resp = match self.client.get(&url).send() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("MC={} - Request failed: {}", mc_number, e);
                return Lookup::Failed(e.to_string());
            }
        };

        let status = resp.status();
        let body = match resp.text() {
            Ok(body) => body,
            Err(e) => {
                warn!("MC={} - Failed to read response body: {}", mc_number, e);
                return Lookup::Failed(e.to_string());
            }
        };
        debug!(
            "MC={} - Status Code: {} - Response text: {}",
            mc_number,
            status,
            body.chars().take(BODY_PREVIEW_CHARS).collect::<String>()
        );

        if status == StatusCode::NOT_FOUND {
            info!("MC={} - No record", mc_number);
            return Lookup::Absent;
        }
        if !status.is_success() {
            warn!("MC={} - Lookup returned status {}", mc_number, status);
            return Lookup::Failed(format!("status {}", status));
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Null) => {
                info!("MC={} - Empty record", mc_number);
                Lookup::Absent
            }
            Ok(data) => Lookup::Found(CarrierRecord::from_json(mc_number, &data)),
            Err(e) => {
                warn!("MC={} - Response was not JSON: {}", mc_number, e);
                Lookup::Failed(e.to_string())
            }
        }
    }
}
