use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use thiserror::Error;

use crate::runtime::contract::{DeliveryResult, EndpointConfig};

pub const TEXT_PLAIN: &str = "text/plain";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("endpoint `{endpoint}` is not a valid URL: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("configured header `{name}` is invalid")]
    InvalidHeader { name: String },

    #[error("request to endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Submits one decoded archive entry and reports the endpoint's status code.
///
/// Non-2xx statuses are returned as results; only transport failures are errors.
pub trait Delivery {
    fn send(&self, content: &[u8], config: &EndpointConfig)
        -> Result<DeliveryResult, DeliveryError>;
}

impl<T: Delivery + ?Sized> Delivery for &T {
    fn send(
        &self,
        content: &[u8],
        config: &EndpointConfig,
    ) -> Result<DeliveryResult, DeliveryError> {
        (**self).send(content, config)
    }
}

/// Blocking HTTP POST delivery.
#[derive(Debug, Clone)]
pub struct HttpDelivery {
    client: Client,
}

impl HttpDelivery {
    /// Build a client whose requests fail once `timeout` elapses.
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::ClientBuild)?;
        Ok(Self { client })
    }
}

impl Delivery for HttpDelivery {
    fn send(
        &self,
        content: &[u8],
        config: &EndpointConfig,
    ) -> Result<DeliveryResult, DeliveryError> {
        let url = Url::parse(&config.endpoint).map_err(|error| DeliveryError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            reason: error.to_string(),
        })?;

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN))
            .body(content.to_vec());

        for (name, value) in &config.headers {
            let invalid = || DeliveryError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            request = request.header(header_name, header_value);
        }

        let response = request.send()?;
        Ok(DeliveryResult::new(response.status().as_u16()))
    }
}
