use askama::Template;
use askama_web::WebTemplate;

use crate::tracker::{Region, TrackerStatus};

#[derive(Template, WebTemplate)]
#[template(path = "status.html")]
pub struct StatusTemplate {
    pub vehicle_id: String,
    pub mode: String,
    pub label: String,
    pub page_no: u32,
    pub total_page_count: u32,
    pub region: String,
    pub zoom: String,
    pub marker: String,
    pub last_update: String,
    pub fetches: u64,
    pub failures: u64,
}

fn center(region: &Region) -> String {
    format!("{:.6}, {:.6}", region.latitude, region.longitude)
}

impl From<TrackerStatus> for StatusTemplate {
    fn from(status: TrackerStatus) -> Self {
        StatusTemplate {
            mode: format!("{:?}", status.mode),
            label: status.label.to_string(),
            page_no: status.page_no,
            total_page_count: status.total_page_count,
            region: center(&status.region),
            zoom: format!(
                "{:.4} x {:.4}",
                status.region.latitude_delta, status.region.longitude_delta
            ),
            marker: center(&status.marker),
            last_update: status
                .last_update
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string()),
            fetches: status.fetches,
            failures: status.failures,
            vehicle_id: status.vehicle_id,
        }
    }
}
