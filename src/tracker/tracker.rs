use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use uuid::Uuid;

use super::display::MarkerDisplay;
use super::error::TrackerError;
use super::observer::FailureObserver;
use super::session::{Advance, PageTicket, ToggleLabel, TrackerMode, TrackingSession};
use super::source::LocationSource;
use super::types::{LocationRequest, Region};

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub vehicle_id: String,
    pub interval: Duration,
    pub animation: Duration,
    pub initial_region: Region,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            vehicle_id: "Vehicle 1".to_string(),
            interval: Duration::from_millis(3000),
            animation: Duration::from_millis(500),
            initial_region: Region::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TrackerStatus {
    pub mode: TrackerMode,
    pub label: ToggleLabel,
    pub vehicle_id: String,
    pub session_id: Option<Uuid>,
    pub page_no: u32,
    pub total_page_count: u32,
    pub region: Region,
    pub marker: Region,
    pub last_update: Option<DateTime<Utc>>,
    pub fetches: u64,
    pub failures: u64,
}

#[derive(Debug)]
struct Shared {
    session: TrackingSession,
    last_update: Option<DateTime<Utc>>,
    fetches: u64,
    failures: u64,
}

/// Everything a poll tick needs, shared between the timer task and the
/// fetch tasks it spawns.
struct Poll<S, D> {
    source: S,
    display: Arc<D>,
    observer: Arc<dyn FailureObserver>,
    shared: Arc<StdMutex<Shared>>,
    /// Id of the live session, `None` while idle.
    active: watch::Sender<Option<Uuid>>,
    vehicle_id: String,
    animation: Duration,
}

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Location poller: requests one page per interval while tracking and moves
/// the marker after every tick.
pub struct Tracker<S, D> {
    interval: Duration,
    poll: Arc<Poll<S, D>>,
    worker: Option<WorkerHandle>,
}

impl<S: LocationSource, D: MarkerDisplay> Tracker<S, D> {
    pub fn new(
        source: S,
        display: Arc<D>,
        observer: Arc<dyn FailureObserver>,
        settings: TrackerSettings,
    ) -> Self {
        let (active, _) = watch::channel(None);
        Self {
            interval: settings.interval,
            poll: Arc::new(Poll {
                source,
                display,
                observer,
                shared: Arc::new(StdMutex::new(Shared {
                    session: TrackingSession::new(settings.initial_region),
                    last_update: None,
                    fetches: 0,
                    failures: 0,
                })),
                active,
                vehicle_id: settings.vehicle_id,
                animation: settings.animation,
            }),
            worker: None,
        }
    }

    pub fn status(&self) -> TrackerStatus {
        let locked = self.poll.shared.lock().unwrap();
        let mode = locked.session.mode();
        TrackerStatus {
            mode,
            label: mode.toggle_label(),
            vehicle_id: self.poll.vehicle_id.clone(),
            session_id: locked.session.id(),
            page_no: locked.session.page_no(),
            total_page_count: locked.session.total_page_count(),
            region: locked.session.region(),
            marker: self.poll.display.position(),
            last_update: locked.last_update,
            fetches: locked.fetches,
            failures: locked.failures,
        }
    }

    pub fn mode(&self) -> TrackerMode {
        self.poll.shared.lock().unwrap().session.mode()
    }

    pub async fn start(&mut self) -> Result<TrackerStatus, TrackerError> {
        if self.interval.is_zero() {
            return Err(TrackerError::ZeroInterval);
        }
        if self.mode() == TrackerMode::Tracking {
            return Err(TrackerError::AlreadyRunning);
        }

        // A session that exhausted its pages leaves its finished worker behind.
        self.reap_worker().await;

        let session = {
            let mut locked = self.poll.shared.lock().unwrap();
            let session = locked.session.begin().ok_or(TrackerError::AlreadyRunning)?;
            self.poll.active.send_replace(Some(session));
            session
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_poll_loop(
            self.poll.clone(),
            session,
            self.interval,
            stop_rx,
        ));
        self.worker = Some(WorkerHandle { stop_tx, join });

        log::info!(
            "Tracking {} started (session {})",
            self.poll.vehicle_id,
            session
        );
        Ok(self.status())
    }

    pub async fn stop(&mut self) -> TrackerStatus {
        let was_tracking = {
            let mut locked = self.poll.shared.lock().unwrap();
            let was_tracking = locked.session.mode() == TrackerMode::Tracking;
            locked.session.end();
            self.poll.active.send_replace(None);
            was_tracking
        };
        self.reap_worker().await;

        if was_tracking {
            log::info!("Tracking {} stopped", self.poll.vehicle_id);
        }
        self.status()
    }

    pub async fn toggle(&mut self) -> Result<TrackerStatus, TrackerError> {
        match self.mode() {
            TrackerMode::Tracking => Ok(self.stop().await),
            TrackerMode::Idle => self.start().await,
        }
    }

    /// Resolves once no session is active.
    pub async fn wait_idle(&self) {
        let mut active = self.poll.active.subscribe();
        let _ = active.wait_for(|session| session.is_none()).await;
    }

    async fn reap_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
    }
}

impl<S, D> Drop for Tracker<S, D> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.join.abort();
        }
    }
}

impl<S: LocationSource, D: MarkerDisplay> Poll<S, D> {
    fn tick(self: &Arc<Self>) {
        let (ticket, region) = {
            let locked = self.shared.lock().unwrap();
            (locked.session.ticket(), locked.session.region())
        };

        if let Some(ticket) = ticket {
            let poll = self.clone();
            tokio::spawn(async move { poll.fetch(ticket).await });
        }

        // The marker heads for the region as it stood when the tick fired.
        let _ = self.display.animate_to(region, self.animation);
    }

    /// Marks the service idle, unless a newer session has already taken over.
    fn release(&self, session: Uuid) {
        self.active.send_if_modified(|active| {
            if *active == Some(session) {
                *active = None;
                true
            } else {
                false
            }
        });
    }

    async fn fetch(&self, ticket: PageTicket) {
        let request = LocationRequest {
            vehicle_id: self.vehicle_id.clone(),
            page_no: ticket.page_no,
        };
        let result = self.source.fetch(&request).await;

        let page = {
            let mut locked = self.shared.lock().unwrap();
            locked.fetches += 1;
            match result {
                Ok(page) => {
                    locked.last_update = Some(Utc::now());
                    let advance = locked.session.apply(&ticket, &page);
                    // Under the lock, so a start() racing this fetch keeps its session.
                    if advance == Advance::Exhausted {
                        self.release(ticket.session);
                    }
                    Ok((page, advance))
                }
                Err(err) => {
                    locked.failures += 1;
                    Err(err)
                }
            }
        };

        match page {
            Ok((page, Advance::Next(next))) => log::debug!(
                "{} page {}: {:.6}, {:.6}; next page {}",
                self.vehicle_id,
                ticket.page_no,
                page.latitude,
                page.longitude,
                next
            ),
            Ok((_, Advance::Exhausted)) => {
                log::info!(
                    "{}: all pages fetched after page {}, tracking stopped",
                    self.vehicle_id,
                    ticket.page_no
                );
            }
            Ok((_, Advance::Stale)) => log::debug!(
                "{} page {} arrived after session {} ended",
                self.vehicle_id,
                ticket.page_no,
                ticket.session
            ),
            Err(err) => self.observer.on_failure(&request, &err),
        }
    }
}

async fn run_poll_loop<S: LocationSource, D: MarkerDisplay>(
    poll: Arc<Poll<S, D>>,
    session: Uuid,
    interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut active = poll.active.subscribe();
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => poll.tick(),
            _ = &mut stop_rx => break,
            changed = active.changed() => {
                if changed.is_err() || *active.borrow_and_update() != Some(session) {
                    break;
                }
            }
        }
    }

    log::debug!("Poll loop for session {} finished", session);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::error::FetchError;
    use crate::tracker::types::LocationPage;
    use std::collections::VecDeque;
    use tokio::time::sleep;

    const TICK: Duration = Duration::from_millis(3000);

    #[derive(Default)]
    struct ScriptedSource {
        script: StdMutex<VecDeque<Result<LocationPage, FetchError>>>,
        requests: Arc<StdMutex<Vec<u32>>>,
        /// Response latency.
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<LocationPage, FetchError>>) -> Self {
            Self {
                script: StdMutex::new(script.into()),
                requests: Arc::default(),
                delay: Duration::ZERO,
            }
        }
    }

    impl LocationSource for ScriptedSource {
        async fn fetch(&self, request: &LocationRequest) -> Result<LocationPage, FetchError> {
            self.requests.lock().unwrap().push(request.page_no);
            let response = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::ResponseCode(404)));
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            response
        }
    }

    #[derive(Default)]
    struct RecordingDisplay {
        moves: StdMutex<Vec<Region>>,
    }

    impl MarkerDisplay for RecordingDisplay {
        fn animate_to(&self, target: Region, _duration: Duration) -> oneshot::Receiver<()> {
            self.moves.lock().unwrap().push(target);
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(());
            rx
        }

        fn position(&self) -> Region {
            self.moves.lock().unwrap().last().copied().unwrap_or_default()
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        failures: StdMutex<Vec<(u32, String)>>,
    }

    impl FailureObserver for RecordingObserver {
        fn on_failure(&self, request: &LocationRequest, error: &FetchError) {
            self.failures
                .lock()
                .unwrap()
                .push((request.page_no, error.to_string()));
        }
    }

    fn ok(longitude: f64, latitude: f64, total: Option<u32>) -> Result<LocationPage, FetchError> {
        Ok(LocationPage {
            latitude,
            longitude,
            total_records: total,
        })
    }

    struct Harness {
        tracker: Tracker<ScriptedSource, RecordingDisplay>,
        requests: Arc<StdMutex<Vec<u32>>>,
        display: Arc<RecordingDisplay>,
        observer: Arc<RecordingObserver>,
    }

    fn harness(script: Vec<Result<LocationPage, FetchError>>) -> Harness {
        slow_harness(script, Duration::ZERO, TrackerSettings::default())
    }

    fn slow_harness(
        script: Vec<Result<LocationPage, FetchError>>,
        delay: Duration,
        settings: TrackerSettings,
    ) -> Harness {
        let source = ScriptedSource {
            delay,
            ..ScriptedSource::new(script)
        };
        let requests = source.requests.clone();
        let display = Arc::new(RecordingDisplay::default());
        let observer = Arc::new(RecordingObserver::default());
        let tracker = Tracker::new(
            source,
            display.clone(),
            observer.clone(),
            settings,
        );
        Harness {
            tracker,
            requests,
            display,
            observer,
        }
    }

    /// Sleeps just past the next `n` ticks.
    async fn ticks(n: u32) {
        sleep(TICK * n + Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn route_is_followed_until_exhausted() {
        let mut h = harness(vec![
            ok(55.1, 24.9, Some(3)),
            ok(55.2, 25.0, None),
            ok(55.3, 25.1, None),
        ]);

        h.tracker.start().await.unwrap();
        ticks(1).await;
        let status = h.tracker.status();
        assert_eq!((status.region.latitude, status.region.longitude), (24.9, 55.1));
        assert_eq!(status.total_page_count, 3);
        assert_eq!(status.page_no, 2);

        ticks(1).await;
        let status = h.tracker.status();
        assert_eq!((status.region.latitude, status.region.longitude), (25.0, 55.2));
        assert_eq!(status.page_no, 3);

        h.tracker.wait_idle().await;
        let status = h.tracker.status();
        assert_eq!(status.mode, TrackerMode::Idle);
        assert_eq!(status.label, ToggleLabel::StartTracking);
        assert_eq!(status.page_no, 1);
        assert_eq!((status.region.latitude, status.region.longitude), (25.1, 55.3));
        assert_eq!(*h.requests.lock().unwrap(), vec![1, 2, 3]);

        ticks(3).await;
        assert_eq!(h.requests.lock().unwrap().len(), 3);
        assert_eq!(h.display.moves.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_changes_nothing_and_keeps_tracking() {
        let mut h = harness(vec![
            Err(FetchError::ResponseCode(500)),
            ok(55.1, 24.9, Some(2)),
            ok(55.2, 25.0, None),
        ]);

        h.tracker.start().await.unwrap();
        ticks(1).await;
        let status = h.tracker.status();
        assert_eq!(status.mode, TrackerMode::Tracking);
        assert_eq!(status.page_no, 1);
        assert_eq!(status.total_page_count, 0);
        assert_eq!(status.region, Region::default());
        assert_eq!(status.failures, 1);
        assert_eq!(
            *h.observer.failures.lock().unwrap(),
            vec![(1, "unexpected response code 500".to_string())]
        );
        // The marker is still commanded on a failed tick.
        assert_eq!(*h.display.moves.lock().unwrap(), vec![Region::default()]);

        h.tracker.wait_idle().await;
        assert_eq!(*h.requests.lock().unwrap(), vec![1, 1, 2]);
        assert_eq!(h.tracker.status().fetches, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn marker_follows_previous_tick_region() {
        let mut h = harness(vec![ok(55.1, 24.9, Some(5)), ok(55.2, 25.0, None)]);
        h.tracker.start().await.unwrap();
        ticks(2).await;

        let moves = h.display.moves.lock().unwrap().clone();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0], Region::default());
        assert_eq!((moves[1].latitude, moves[1].longitude), (24.9, 55.1));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_timer() {
        let mut h = harness(vec![ok(55.1, 24.9, Some(10))]);
        h.tracker.start().await.unwrap();
        ticks(1).await;

        let status = h.tracker.stop().await;
        assert_eq!(status.mode, TrackerMode::Idle);
        assert_eq!(status.page_no, 1);

        ticks(5).await;
        assert_eq!(*h.requests.lock().unwrap(), vec![1]);
        assert_eq!(h.display.moves.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_restarts_at_first_page() {
        let mut h = harness(vec![
            ok(55.1, 24.9, Some(5)),
            ok(55.2, 25.0, None),
            ok(55.3, 25.1, Some(4)),
        ]);

        let status = h.tracker.toggle().await.unwrap();
        assert_eq!(status.label, ToggleLabel::StopTracking);
        ticks(2).await;
        assert_eq!(h.tracker.status().page_no, 3);

        let status = h.tracker.toggle().await.unwrap();
        assert_eq!(status.mode, TrackerMode::Idle);

        let status = h.tracker.toggle().await.unwrap();
        assert_eq!(status.mode, TrackerMode::Tracking);
        assert_eq!(status.page_no, 1);
        assert_eq!(status.total_page_count, 0);

        ticks(1).await;
        assert_eq!(*h.requests.lock().unwrap(), vec![1, 2, 1]);
        assert_eq!(h.tracker.status().total_page_count, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_tracking_is_refused() {
        let mut h = harness(vec![]);
        let first = h.tracker.start().await.unwrap();
        assert!(matches!(
            h.tracker.start().await,
            Err(TrackerError::AlreadyRunning)
        ));
        assert_eq!(h.tracker.status().session_id, first.session_id);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_exhaustion() {
        let mut h = harness(vec![ok(55.1, 24.9, Some(1)), ok(55.2, 25.0, Some(1))]);
        h.tracker.start().await.unwrap();
        h.tracker.wait_idle().await;

        h.tracker.start().await.unwrap();
        h.tracker.wait_idle().await;
        assert_eq!(*h.requests.lock().unwrap(), vec![1, 1]);
        assert_eq!(h.tracker.status().region.latitude, 25.0);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_exhaustion_does_not_stop_newer_session() {
        let mut h = harness(vec![
            ok(55.1, 24.9, Some(1)),
            ok(55.2, 25.0, Some(100)),
            ok(55.3, 25.1, None),
            ok(55.4, 25.2, None),
        ]);

        let first = h.tracker.start().await.unwrap().session_id.unwrap();
        h.tracker.wait_idle().await;

        let second = h.tracker.start().await.unwrap().session_id.unwrap();
        // An exhaustion of the first session that lands after the restart.
        h.tracker.poll.release(first);
        assert_eq!(*h.tracker.poll.active.borrow(), Some(second));

        ticks(3).await;
        let status = h.tracker.status();
        assert_eq!(*h.requests.lock().unwrap(), vec![1, 1, 2, 3]);
        assert_eq!(status.mode, TrackerMode::Tracking);
        assert_eq!(status.session_id, Some(second));
        assert_eq!(status.page_no, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_overlaps_and_late_responses_still_move_region() {
        let mut h = slow_harness(
            vec![ok(55.1, 24.9, Some(5)), ok(55.2, 25.0, Some(5))],
            Duration::from_millis(4500),
            TrackerSettings::default(),
        );
        h.tracker.start().await.unwrap();

        // Ticks at 3s and 6s both go out before either response lands.
        ticks(2).await;
        assert_eq!(*h.requests.lock().unwrap(), vec![1, 1]);
        assert_eq!(h.tracker.status().fetches, 0);

        // First response lands at 7.5s.
        sleep(Duration::from_millis(1500)).await;
        let status = h.tracker.status();
        assert_eq!((status.region.latitude, status.region.longitude), (24.9, 55.1));
        assert_eq!(status.page_no, 2);
        assert_eq!(status.fetches, 1);

        h.tracker.stop().await;

        // Second response lands at 10.5s, after the session ended.
        sleep(Duration::from_millis(3500)).await;
        let status = h.tracker.status();
        assert_eq!(status.mode, TrackerMode::Idle);
        assert_eq!(status.page_no, 1);
        assert_eq!((status.region.latitude, status.region.longitude), (25.0, 55.2));
        assert_eq!(status.fetches, 2);
        assert_eq!(*h.requests.lock().unwrap(), vec![1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_refused() {
        let settings = TrackerSettings {
            interval: Duration::ZERO,
            ..TrackerSettings::default()
        };
        let mut h = slow_harness(vec![], Duration::ZERO, settings);

        assert!(matches!(
            h.tracker.start().await,
            Err(TrackerError::ZeroInterval)
        ));
        let status = h.tracker.status();
        assert_eq!(status.mode, TrackerMode::Idle);
        assert_eq!(status.session_id, None);
    }
}
