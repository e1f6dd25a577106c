use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::gesture::GestureState;
use crate::shape::{ShapeOrigin, ShapePoints};

/// Lifecycle of the vision pipeline, as shown in the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VisionStatus {
    Initializing = 0,
    Tracking = 1,
    Unavailable = 2,
    Stopped = 3,
}

impl VisionStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => VisionStatus::Initializing,
            1 => VisionStatus::Tracking,
            2 => VisionStatus::Unavailable,
            _ => VisionStatus::Stopped,
        }
    }
}

/// A finished shape load waiting to be swapped in between render ticks.
#[derive(Debug, Clone)]
pub struct LoadedShape {
    pub request_id: u64,
    pub description: String,
    pub points: Arc<[f32]>,
    pub origin: ShapeOrigin,
}

/// Primitive for communicating between the vision loop, the shape loader and
/// the render loop. Every value is replaced whole; readers never see a
/// partially written snapshot.
pub struct Exchange {
    gesture: Mutex<GestureState>,
    vision_frames: AtomicU64,
    vision_status: AtomicU8,
    pending_shape: Mutex<Option<LoadedShape>>,
    latest_request: AtomicU64,
    generating: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

impl Exchange {
    pub fn new() -> Self {
        Self {
            gesture: Mutex::new(GestureState::default()),
            vision_frames: AtomicU64::new(0),
            vision_status: AtomicU8::new(VisionStatus::Initializing as u8),
            pending_shape: Mutex::new(None),
            latest_request: AtomicU64::new(0),
            generating: AtomicBool::new(false),
        }
    }

    /// Replace the gesture snapshot.
    pub fn publish_gesture(&self, state: GestureState) {
        *lock(&self.gesture) = state;
        self.vision_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Latest gesture snapshot.
    pub fn gesture(&self) -> GestureState {
        *lock(&self.gesture)
    }

    /// Number of vision frames published so far.
    pub fn vision_frames(&self) -> u64 {
        self.vision_frames.load(Ordering::Relaxed)
    }

    pub fn set_vision_status(&self, status: VisionStatus) {
        self.vision_status.store(status as u8, Ordering::Relaxed);
    }

    pub fn vision_status(&self) -> VisionStatus {
        VisionStatus::from_u8(self.vision_status.load(Ordering::Relaxed))
    }

    /// Register a new shape request and mark generation as running. Returns the
    /// id the finished load must be submitted with. A load still waiting to be
    /// taken is superseded and discarded.
    pub fn begin_shape_request(&self) -> u64 {
        let mut pending = lock(&self.pending_shape);
        *pending = None;
        self.generating.store(true, Ordering::Relaxed);
        self.latest_request.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Hand over a finished load. Loads belonging to an older request are
    /// dropped and leave the generating flag alone. Returns whether the load
    /// was accepted.
    pub fn submit_shape(&self, request_id: u64, description: &str, shape: ShapePoints) -> bool {
        // Same lock as `begin_shape_request`: the latest id cannot move between
        // the check and the store.
        let mut pending = lock(&self.pending_shape);
        if request_id != self.latest_request.load(Ordering::Acquire) {
            log::debug!("Dropping stale shape {description:?} (request {request_id})");
            return false;
        }
        *pending = Some(LoadedShape {
            request_id,
            description: description.to_owned(),
            points: shape.points,
            origin: shape.origin,
        });
        self.generating.store(false, Ordering::Relaxed);
        true
    }

    /// Take the pending load, if any. Called by the render loop between ticks.
    pub fn take_shape(&self) -> Option<LoadedShape> {
        lock(&self.pending_shape).take()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn shape(n: usize) -> ShapePoints {
        ShapePoints {
            points: vec![1.0; n * 3].into(),
            origin: ShapeOrigin::Generated,
        }
    }

    #[test]
    fn gesture_snapshot_is_replaced_whole() {
        let exchange = Exchange::new();
        assert_eq!(exchange.gesture(), GestureState::default());

        let state = GestureState {
            is_present: true,
            separation: 2.0,
            tension: 0.25,
        };
        exchange.publish_gesture(state);
        assert_eq!(exchange.gesture(), state);
        assert_eq!(exchange.vision_frames(), 1);
    }

    #[test]
    fn concurrent_readers_see_consistent_snapshots() {
        let exchange = Arc::new(Exchange::new());
        let written = |i: u32| {
            let v = (i % 100) as f32 / 100.0;
            GestureState {
                is_present: true,
                separation: v,
                tension: v,
            }
        };
        exchange.publish_gesture(written(0));

        let writer = {
            let exchange = exchange.clone();
            thread::spawn(move || {
                for i in 1..2000 {
                    exchange.publish_gesture(written(i));
                }
            })
        };
        for _ in 0..2000 {
            let s = exchange.gesture();
            assert!(s.is_present);
            assert_eq!(s.separation, s.tension);
            assert!((0..100).any(|i| written(i) == s), "{s:?} was never written");
        }
        writer.join().unwrap();
    }

    #[test]
    fn pending_shape_is_taken_once() {
        let exchange = Exchange::new();
        let id = exchange.begin_shape_request();
        assert!(exchange.is_generating());

        assert!(exchange.submit_shape(id, "Cube", shape(4)));
        assert!(!exchange.is_generating());

        let loaded = exchange.take_shape().unwrap();
        assert_eq!(loaded.description, "Cube");
        assert_eq!(loaded.points.len(), 12);
        assert!(exchange.take_shape().is_none());
    }

    #[test]
    fn stale_loads_are_dropped() {
        let exchange = Exchange::new();
        let first = exchange.begin_shape_request();
        let second = exchange.begin_shape_request();

        assert!(!exchange.submit_shape(first, "Heart", shape(2)));
        assert!(exchange.is_generating());
        assert!(exchange.take_shape().is_none());

        assert!(exchange.submit_shape(second, "Flower", shape(3)));
        assert_eq!(exchange.take_shape().unwrap().description, "Flower");
    }

    #[test]
    fn new_request_discards_untaken_load() {
        let exchange = Exchange::new();
        let first = exchange.begin_shape_request();
        assert!(exchange.submit_shape(first, "Heart", shape(2)));

        let second = exchange.begin_shape_request();
        assert!(exchange.take_shape().is_none());
        assert!(exchange.is_generating());
        assert!(!exchange.submit_shape(first, "Heart", shape(2)));
        assert!(exchange.submit_shape(second, "Saturn", shape(2)));
        assert_eq!(exchange.take_shape().unwrap().request_id, second);
    }

    #[test]
    fn racing_loads_only_apply_the_latest_request() {
        let exchange = Arc::new(Exchange::new());
        let loaders: Vec<_> = (0..8)
            .map(|_| {
                let exchange = exchange.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let id = exchange.begin_shape_request();
                        exchange.submit_shape(id, "Dna", shape(1));
                    }
                })
            })
            .collect();
        for loader in loaders {
            loader.join().unwrap();
        }

        // The final request has no successor, so its load is the one left.
        assert!(!exchange.is_generating());
        assert_eq!(exchange.take_shape().unwrap().request_id, 8 * 500);
    }

    #[test]
    fn vision_status_round_trips() {
        let exchange = Exchange::new();
        assert_eq!(exchange.vision_status(), VisionStatus::Initializing);
        for status in [
            VisionStatus::Tracking,
            VisionStatus::Unavailable,
            VisionStatus::Stopped,
        ] {
            exchange.set_vision_status(status);
            assert_eq!(exchange.vision_status(), status);
        }
    }
}
