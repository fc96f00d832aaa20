use serde::Serialize;
use uuid::Uuid;

use super::types::{LocationPage, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub enum TrackerMode {
    Idle,
    Tracking,
}

/// Label of the start/stop affordance for the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display, utoipa::ToSchema)]
pub enum ToggleLabel {
    #[serde(rename = "Start Tracking")]
    #[strum(to_string = "Start Tracking")]
    StartTracking,
    #[serde(rename = "Stop Tracking")]
    #[strum(to_string = "Stop Tracking")]
    StopTracking,
}

impl TrackerMode {
    pub fn toggle_label(self) -> ToggleLabel {
        match self {
            TrackerMode::Idle => ToggleLabel::StartTracking,
            TrackerMode::Tracking => ToggleLabel::StopTracking,
        }
    }
}

/// Page request issued on one tick, stamped with the session it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    pub session: Uuid,
    pub page_no: u32,
}

/// What applying a fetched page did to pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Tracking continues with this page next.
    Next(u32),
    /// Last page consumed; the session ended.
    Exhausted,
    /// Page belonged to an ended session; only the region moved.
    Stale,
}

/// Pagination state of the location poller.
///
/// Holds no timers or I/O: the poller drives it, tests drive it directly.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    mode: TrackerMode,
    id: Option<Uuid>,
    page_no: u32,
    total_page_count: u32,
    region: Region,
}

impl TrackingSession {
    pub fn new(region: Region) -> Self {
        TrackingSession {
            mode: TrackerMode::Idle,
            id: None,
            page_no: 1,
            total_page_count: 0,
            region,
        }
    }

    pub fn mode(&self) -> TrackerMode {
        self.mode
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn page_no(&self) -> u32 {
        self.page_no
    }

    pub fn total_page_count(&self) -> u32 {
        self.total_page_count
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Starts a fresh session at page 1. Returns `None` if already tracking.
    pub fn begin(&mut self) -> Option<Uuid> {
        if self.mode == TrackerMode::Tracking {
            return None;
        }
        let id = Uuid::new_v4();
        self.mode = TrackerMode::Tracking;
        self.id = Some(id);
        self.page_no = 1;
        self.total_page_count = 0;
        Some(id)
    }

    pub fn end(&mut self) {
        self.mode = TrackerMode::Idle;
        self.id = None;
        self.page_no = 1;
    }

    pub fn ticket(&self) -> Option<PageTicket> {
        match (self.mode, self.id) {
            (TrackerMode::Tracking, Some(session)) => Some(PageTicket {
                session,
                page_no: self.page_no,
            }),
            _ => None,
        }
    }

    /// Folds a successfully fetched page into the session.
    ///
    /// The region always follows the page, even for late responses. The page
    /// count is only taken from page 1 of the live session, and exhaustion is
    /// checked against the counter as it stands when the response lands, so
    /// overlapping requests each advance it.
    pub fn apply(&mut self, ticket: &PageTicket, page: &LocationPage) -> Advance {
        self.region = self.region.centered_at(page.latitude, page.longitude);

        if self.mode != TrackerMode::Tracking || self.id != Some(ticket.session) {
            return Advance::Stale;
        }

        if ticket.page_no == 1 {
            if let Some(total) = page.total_records {
                self.total_page_count = total;
            }
        }

        if self.page_no >= self.total_page_count {
            self.end();
            Advance::Exhausted
        } else {
            self.page_no += 1;
            Advance::Next(self.page_no)
        }
    }
}
