use super::error::FetchError;
use super::types::LocationRequest;

/// Receives fetch failures the poller swallows.
pub trait FailureObserver: Send + Sync {
    fn on_failure(&self, request: &LocationRequest, error: &FetchError);
}

pub struct LogObserver;

impl FailureObserver for LogObserver {
    fn on_failure(&self, request: &LocationRequest, error: &FetchError) {
        log::warn!(
            "Location fetch for {} page {} failed: {}",
            request.vehicle_id,
            request.page_no,
            error
        );
    }
}
