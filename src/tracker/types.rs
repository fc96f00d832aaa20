use serde::{Deserialize, Serialize};

use super::error::FetchError;

/// Map viewport: center plus zoom deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Region {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Default for Region {
    fn default() -> Self {
        Region {
            latitude: 24.858342986399865,
            longitude: 55.066739235969116,
            latitude_delta: 0.0922,
            longitude_delta: 0.0421,
        }
    }
}

impl Region {
    /// Same zoom, new center.
    pub fn centered_at(self, latitude: f64, longitude: f64) -> Self {
        Region {
            latitude,
            longitude,
            ..self
        }
    }

    pub fn lerp(&self, target: &Region, t: f64) -> Region {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Region {
            latitude: mix(self.latitude, target.latitude),
            longitude: mix(self.longitude, target.longitude),
            latitude_delta: mix(self.latitude_delta, target.latitude_delta),
            longitude_delta: mix(self.longitude_delta, target.longitude_delta),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    pub vehicle_id: String,
    pub page_no: u32,
}

/// Response wrapper of the location endpoint. `response_data` stays untyped
/// until the code is known to be 200, since error payloads differ in shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEnvelope<T = serde_json::Value> {
    pub response_code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    pub location: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_records: Option<TotalRecords>,
}

/// GeoJSON-style point, `[longitude, latitude]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    pub coordinates: Vec<f64>,
}

/// Backends send the record count as a string; numbers are accepted too.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalRecords {
    Text(String),
    Number(u64),
}

impl TotalRecords {
    fn parse(&self) -> Result<u32, FetchError> {
        match self {
            TotalRecords::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| FetchError::Malformed(format!("invalid totalRecords '{}'", s))),
            TotalRecords::Number(n) => u32::try_from(*n)
                .map_err(|_| FetchError::Malformed(format!("totalRecords out of range: {}", n))),
        }
    }
}

/// One decoded page of location data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationPage {
    pub latitude: f64,
    pub longitude: f64,
    pub total_records: Option<u32>,
}

impl LocationEnvelope {
    pub fn into_page(self) -> Result<LocationPage, FetchError> {
        if self.response_code != 200 {
            return Err(FetchError::ResponseCode(self.response_code));
        }
        let data = self
            .response_data
            .ok_or_else(|| FetchError::Malformed("missing responseData".into()))?;
        let data: LocationData =
            serde_json::from_value(data).map_err(|e| FetchError::Malformed(e.to_string()))?;
        data.into_page()
    }
}

impl LocationData {
    pub fn new(longitude: f64, latitude: f64, total_records: Option<usize>) -> Self {
        LocationData {
            location: GeoPoint {
                coordinates: vec![longitude, latitude],
            },
            total_records: total_records.map(|n| TotalRecords::Text(n.to_string())),
        }
    }

    pub fn into_page(self) -> Result<LocationPage, FetchError> {
        let &[longitude, latitude] = self.location.coordinates.as_slice() else {
            return Err(FetchError::Malformed(format!(
                "expected [longitude, latitude], got {} values",
                self.location.coordinates.len()
            )));
        };
        let total_records = self.total_records.as_ref().map(TotalRecords::parse).transpose()?;
        Ok(LocationPage {
            latitude,
            longitude,
            total_records,
        })
    }
}
