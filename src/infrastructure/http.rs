use crate::domain::gateway::{EndpointKind, EndpointTable, FormFields, TransactionMode};
use crate::domain::ports::GatewayTransport;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Posts form-encoded fields to the gateway over HTTPS.
///
/// Certificates are verified; there is no retry, and a timeout or connection
/// failure surfaces as `TransportError`.
pub struct HttpGatewayClient {
    client: reqwest::Client,
    endpoints: EndpointTable,
}

impl HttpGatewayClient {
    pub fn new(endpoints: EndpointTable, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::configuration(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client, endpoints })
    }
}

#[async_trait]
impl GatewayTransport for HttpGatewayClient {
    async fn send(
        &self,
        endpoint: EndpointKind,
        mode: TransactionMode,
        fields: &FormFields,
    ) -> Result<String> {
        let url = self.endpoints.url(endpoint, mode);
        debug!(%url, field_count = fields.len(), "posting to gateway");

        let response = self.client.post(&url).form(fields).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::TransportError(format!(
                "gateway responded with HTTP {}",
                status
            )));
        }
        Ok(response.text().await?)
    }
}
