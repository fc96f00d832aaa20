mod display;
pub mod error;
mod observer;
mod session;
pub mod source;
mod tracker;
mod types;

pub use display::AnimatedMarker;
pub use error::TrackerError;
pub use observer::LogObserver;
pub use session::{ToggleLabel, TrackerMode};
pub use source::HttpLocationSource;
pub use tracker::{Tracker, TrackerSettings, TrackerStatus};
pub use types::{LocationData, LocationEnvelope, LocationRequest, Region};

/// Tracker wired to the HTTP endpoint and an animated marker.
pub type LiveTracker = Tracker<HttpLocationSource, AnimatedMarker>;
