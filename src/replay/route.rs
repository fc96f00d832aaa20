use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("route has no vehicles")]
    NoVehicles,
    #[error("vehicle '{0}' has no points")]
    EmptyVehicle(String),
    #[error("vehicle '{vehicle}' point {index}: [{longitude}, {latitude}] is out of range")]
    OutOfRange {
        vehicle: String,
        index: usize,
        longitude: f64,
        latitude: f64,
    },
}

/// Recorded positions per vehicle, each point `[longitude, latitude]`.
#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    pub vehicles: BTreeMap<String, Vec<[f64; 2]>>,
}

impl Route {
    pub fn from_file(path: &str) -> Result<Self, RouteError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parses and validates a route file.
    pub fn from_yaml(yaml: &str) -> Result<Self, RouteError> {
        let route: Route = serde_yaml::from_str(yaml)?;
        route.validate()?;
        Ok(route)
    }

    fn validate(&self) -> Result<(), RouteError> {
        if self.vehicles.is_empty() {
            return Err(RouteError::NoVehicles);
        }

        for (vehicle, points) in &self.vehicles {
            if points.is_empty() {
                return Err(RouteError::EmptyVehicle(vehicle.clone()));
            }
            for (index, &[longitude, latitude]) in points.iter().enumerate() {
                if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
                    return Err(RouteError::OutOfRange {
                        vehicle: vehicle.clone(),
                        index,
                        longitude,
                        latitude,
                    });
                }
            }
        }

        Ok(())
    }

    /// Point served as page `page_no` (1-based) for `vehicle`.
    pub fn page(&self, vehicle: &str, page_no: u32) -> Option<[f64; 2]> {
        let index = usize::try_from(page_no).ok()?.checked_sub(1)?;
        self.vehicles.get(vehicle)?.get(index).copied()
    }

    pub fn len(&self, vehicle: &str) -> usize {
        self.vehicles.get(vehicle).map_or(0, Vec::len)
    }
}
