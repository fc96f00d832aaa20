use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use crate::tracker::{Region, ToggleLabel, TrackerMode, TrackerStatus};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::tracker::toggle,
        super::api::tracker::start,
        super::api::tracker::stop,
        super::api::tracker::status,
    ),
    components(schemas(TrackerStatus, TrackerMode, ToggleLabel, Region, ErrorResponse)),
    info(
        title = "Vehicle Tracker API",
        description = "Start, stop and inspect vehicle location tracking",
        version = "0.1.0"
    ),
    tags(
        (name = "tracker", description = "Location polling")
    )
)]
pub struct ApiDoc;
