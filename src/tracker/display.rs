use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::sleep;

use super::types::Region;

const FRAME: Duration = Duration::from_millis(16);

/// Marker on a map that can be moved smoothly between coordinates.
pub trait MarkerDisplay: Send + Sync + 'static {
    /// Starts moving the marker toward `target` over `duration` and returns
    /// immediately. The receiver resolves once the marker arrives, or errors
    /// if the animation was superseded by a newer one.
    fn animate_to(&self, target: Region, duration: Duration) -> oneshot::Receiver<()>;

    /// Where the marker is drawn right now.
    fn position(&self) -> Region;
}

/// Marker whose position is interpolated on a background task.
pub struct AnimatedMarker {
    position: Arc<StdMutex<Region>>,
    generation: Arc<AtomicU64>,
}

impl AnimatedMarker {
    pub fn new(initial: Region) -> Self {
        Self {
            position: Arc::new(StdMutex::new(initial)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl MarkerDisplay for AnimatedMarker {
    fn animate_to(&self, target: Region, duration: Duration) -> oneshot::Receiver<()> {
        let (done_tx, done_rx) = oneshot::channel();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.generation.clone();
        let position = self.position.clone();

        tokio::spawn(async move {
            let from = *position.lock().unwrap();
            let frames = (duration.as_millis() / FRAME.as_millis()).max(1) as u32;

            for frame in 1..=frames {
                if !duration.is_zero() {
                    sleep(duration / frames).await;
                }
                if current.load(Ordering::SeqCst) != generation {
                    return;
                }
                *position.lock().unwrap() = if frame == frames {
                    target
                } else {
                    from.lerp(&target, frame as f64 / frames as f64)
                };
            }

            log::trace!(
                "marker at {:.6}, {:.6}",
                target.latitude,
                target.longitude
            );
            let _ = done_tx.send(());
        });

        done_rx
    }

    fn position(&self) -> Region {
        *self.position.lock().unwrap()
    }
}
