use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use super::error::{FetchError, TrackerError};
use super::types::{LocationEnvelope, LocationPage, LocationRequest};

const LOCATION_PATH: &str = "/api/getVehicleLocation";

/// Paginated source of vehicle positions, one coordinate per page.
pub trait LocationSource: Send + Sync + 'static {
    fn fetch(
        &self,
        request: &LocationRequest,
    ) -> impl Future<Output = Result<LocationPage, FetchError>> + Send;
}

/// Location source backed by the `getVehicleLocation` HTTP endpoint.
pub struct HttpLocationSource {
    client: Client,
    endpoint: String,
}

impl HttpLocationSource {
    /// `api_url` is the base URL; no timeout is applied unless given.
    pub fn new(api_url: &str, request_timeout: Option<Duration>) -> Result<Self, TrackerError> {
        let mut builder = Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: format!("{}{}", api_url.trim_end_matches('/'), LOCATION_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl LocationSource for HttpLocationSource {
    async fn fetch(&self, request: &LocationRequest) -> Result<LocationPage, FetchError> {
        let envelope: LocationEnvelope = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        log::debug!(
            "{} page {}: response code {}",
            request.vehicle_id,
            request.page_no,
            envelope.response_code
        );

        envelope.into_page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url() {
        let source = HttpLocationSource::new("http://localhost:8090/", None).unwrap();
        assert_eq!(
            source.endpoint(),
            "http://localhost:8090/api/getVehicleLocation"
        );
    }
}
