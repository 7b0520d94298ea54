//! Positioning feed between the platform location service and the map.
//!
//! The platform side pushes fixes through a [`LocationPublisher`] from any thread; the
//! UI side reads them through a [`LocationFeed`]. The channel holds only the latest fix
//! (last write wins), so a slow UI never sees a backlog and nothing is retried.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::{GpsPoint, MapError, MapScene, PlanarPoint, PlotBounds};

/// A position report from the platform location service.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in metres
    pub accuracy_m: f64,
    /// Unix milliseconds
    pub timestamp_ms: i64,
}

impl PositionFix {
    pub fn gps(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    pub fn grade(&self) -> AccuracyGrade {
        AccuracyGrade::from_meters(self.accuracy_m)
    }
}

/// Coarse fix quality shown on the locate button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccuracyGrade {
    /// Within 5m
    Excellent,
    /// Within 10m
    Good,
    /// Within 20m
    Fair,
    Poor,
}

impl AccuracyGrade {
    pub fn from_meters(accuracy_m: f64) -> Self {
        if accuracy_m <= 5.0 {
            AccuracyGrade::Excellent
        } else if accuracy_m <= 10.0 {
            AccuracyGrade::Good
        } else if accuracy_m <= 20.0 {
            AccuracyGrade::Fair
        } else {
            // NaN lands here too
            AccuracyGrade::Poor
        }
    }
}

/// Create a connected publisher/feed pair. The feed starts stopped.
pub fn channel() -> (LocationPublisher, LocationFeed) {
    let (tx, rx) = watch::channel(None);
    (
        LocationPublisher { tx: Arc::new(tx) },
        LocationFeed { rx, active: false },
    )
}

/// Platform side of the feed. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct LocationPublisher {
    tx: Arc<watch::Sender<Option<PositionFix>>>,
}

impl LocationPublisher {
    /// Replace the stored fix. Fixes with non-finite coordinates are dropped.
    ///
    /// Returns whether the fix was stored.
    pub fn publish(&self, fix: PositionFix) -> bool {
        if !(fix.latitude.is_finite() && fix.longitude.is_finite()) {
            warn!("Dropping position fix with invalid coordinates: {:?}", fix);
            return false;
        }
        self.tx.send_replace(Some(fix));
        true
    }
}

/// UI side of the feed.
#[derive(Debug)]
pub struct LocationFeed {
    rx: watch::Receiver<Option<PositionFix>>,
    active: bool,
}

impl LocationFeed {
    /// Begin delivering fixes (screen resumed). The latest stored fix counts as new.
    pub fn start(&mut self) {
        if !self.active {
            info!("Location feed started");
        }
        self.active = true;
    }

    /// Stop delivering fixes (screen paused). Publishing continues to overwrite the
    /// stored fix.
    pub fn stop(&mut self) {
        if self.active {
            info!("Location feed stopped");
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Most recent fix regardless of whether it has been seen.
    pub fn latest(&self) -> Option<PositionFix> {
        if !self.active {
            return None;
        }
        *self.rx.borrow()
    }

    /// The latest fix if it arrived since the last call.
    pub fn latest_if_changed(&mut self) -> Option<PositionFix> {
        if !self.active {
            return None;
        }
        match self.rx.has_changed() {
            Ok(true) => *self.rx.borrow_and_update(),
            _ => None,
        }
    }

    /// Wait for the next fix. Returns `None` when stopped or once every publisher
    /// has been dropped.
    pub async fn next_fix(&mut self) -> Option<PositionFix> {
        if !self.active {
            return None;
        }
        loop {
            self.rx.changed().await.ok()?;
            if let Some(fix) = *self.rx.borrow_and_update() {
                return Some(fix);
            }
        }
    }

    /// Move the scene's position marker to the latest unseen fix, if any.
    pub fn apply_latest(
        &mut self,
        scene: &mut MapScene,
        bounds: &PlotBounds,
    ) -> Result<Option<PlanarPoint>, MapError> {
        let Some(fix) = self.latest_if_changed() else {
            return Ok(None);
        };
        let planar = scene.apply_fix(fix.gps(), fix.accuracy_m, bounds)?;
        debug!(
            "Position ({:.7}, {:.7}) ±{:.0}m -> map ({:.1}, {:.1})",
            fix.latitude, fix.longitude, fix.accuracy_m, planar.x, planar.y
        );
        Ok(Some(planar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapConfig;

    fn fix(latitude: f64, accuracy_m: f64, timestamp_ms: i64) -> PositionFix {
        PositionFix { latitude, longitude: 101.6730024, accuracy_m, timestamp_ms }
    }

    #[test]
    fn test_accuracy_grades() {
        assert_eq!(AccuracyGrade::from_meters(3.0), AccuracyGrade::Excellent);
        assert_eq!(AccuracyGrade::from_meters(5.0), AccuracyGrade::Excellent);
        assert_eq!(AccuracyGrade::from_meters(9.9), AccuracyGrade::Good);
        assert_eq!(AccuracyGrade::from_meters(20.0), AccuracyGrade::Fair);
        assert_eq!(AccuracyGrade::from_meters(20.1), AccuracyGrade::Poor);
        assert_eq!(AccuracyGrade::from_meters(f64::NAN), AccuracyGrade::Poor);
        assert_eq!(fix(3.21, 7.0, 0).grade(), AccuracyGrade::Good);
    }

    #[test]
    fn test_stopped_feed_yields_nothing() {
        let (publisher, mut feed) = channel();
        assert!(publisher.publish(fix(3.21, 5.0, 1)));
        assert!(!feed.is_active());
        assert_eq!(feed.latest(), None);
        assert_eq!(feed.latest_if_changed(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let (publisher, mut feed) = channel();
        feed.start();
        publisher.publish(fix(3.210, 5.0, 1));
        publisher.publish(fix(3.211, 5.0, 2));
        publisher.publish(fix(3.212, 5.0, 3));

        assert_eq!(feed.latest_if_changed().map(|f| f.timestamp_ms), Some(3));
        // Nothing new since
        assert_eq!(feed.latest_if_changed(), None);
        assert_eq!(feed.latest().map(|f| f.timestamp_ms), Some(3));
    }

    #[test]
    fn test_invalid_fix_dropped() {
        let (publisher, mut feed) = channel();
        feed.start();
        assert!(!publisher.publish(fix(f64::NAN, 5.0, 1)));
        assert_eq!(feed.latest_if_changed(), None);
    }

    #[test]
    fn test_fix_published_while_stopped_arrives_on_start() {
        let (publisher, mut feed) = channel();
        feed.start();
        feed.stop();
        publisher.publish(fix(3.21, 5.0, 9));
        assert_eq!(feed.latest_if_changed(), None);
        feed.start();
        assert_eq!(feed.latest_if_changed().map(|f| f.timestamp_ms), Some(9));
    }

    #[test]
    fn test_publish_from_other_thread() {
        let (publisher, mut feed) = channel();
        feed.start();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let publisher = publisher.clone();
                std::thread::spawn(move || publisher.publish(fix(3.21, 5.0, i)))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        let latest = feed.latest_if_changed().unwrap();
        assert!((0..4).contains(&latest.timestamp_ms));
    }

    #[test]
    fn test_apply_latest_moves_marker() {
        let (publisher, mut feed) = channel();
        feed.start();
        let bounds = PlotBounds::around(GpsPoint::new(3.2125186, 101.6730024), 250.0);
        let mut scene = MapScene::new(MapConfig::default(), 1080.0, 1920.0);

        assert_eq!(feed.apply_latest(&mut scene, &bounds), Ok(None));

        publisher.publish(fix(3.2125186, 4.0, 1));
        let planar = feed.apply_latest(&mut scene, &bounds).unwrap().unwrap();
        assert!((planar.x - 1000.0).abs() < 1e-6);
        assert!((planar.y - 1000.0).abs() < 1e-6);
        let marker = scene.current_position().unwrap();
        assert_eq!(marker.accuracy_m, 4.0);
    }

    #[tokio::test]
    async fn test_next_fix_waits_for_publisher() {
        let (publisher, mut feed) = channel();
        feed.start();

        let task = tokio::spawn(async move {
            publisher.publish(fix(3.2125, 6.0, 42));
            publisher
        });

        let next = feed.next_fix().await;
        assert_eq!(next.map(|f| f.timestamp_ms), Some(42));

        // Dropping every publisher ends the stream
        drop(task.await.unwrap());
        assert_eq!(feed.next_fix().await, None);
    }
}
