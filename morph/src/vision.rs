use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

use crate::constants::{CLOSED_RATIO, FRAME_POLL_MS, OPENNESS_SPAN};
use crate::exchange::{Exchange, VisionStatus};
use crate::gesture::{GestureExtractor, Hand, Landmark};

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("hand landmark model failed to load: {0}")]
    ModelLoad(String),
    #[error("camera unavailable: {0}")]
    CameraAccess(String),
}

/// Hands detected in a single camera frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandFrame {
    pub hands: Vec<Hand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Frame(HandFrame),
    /// Nothing arrived within the poll timeout.
    Idle,
    /// The source has ended and will not produce further frames.
    Closed,
}

pub trait HandSource: Send + 'static {
    /// Load the model and acquire the camera.
    fn open(&mut self) -> Result<(), VisionError>;

    /// Wait up to `timeout` for the next frame.
    fn poll(&mut self, timeout: Duration) -> SourceEvent;

    /// Release the camera and any inference scheduling.
    fn close(&mut self) {}
}

/// Run `source` until it closes or `token` is set, publishing one gesture
/// snapshot per frame.
pub fn run_vision_loop<S: HandSource>(mut source: S, exchange: &Exchange, token: &AtomicBool) {
    exchange.set_vision_status(VisionStatus::Initializing);
    if let Err(e) = source.open() {
        log::error!("Vision unavailable, continuing without hands: {e}");
        exchange.set_vision_status(VisionStatus::Unavailable);
        return;
    }
    exchange.set_vision_status(VisionStatus::Tracking);
    log::info!("Vision loop started");

    let mut extractor = GestureExtractor::with_state(exchange.gesture());
    let timeout = Duration::from_millis(FRAME_POLL_MS);

    while !token.load(Ordering::Relaxed) {
        match source.poll(timeout) {
            SourceEvent::Frame(frame) => exchange.publish_gesture(extractor.update(&frame.hands)),
            SourceEvent::Idle => (),
            SourceEvent::Closed => {
                log::info!("Hand source closed");
                break;
            }
        }
    }

    source.close();
    exchange.set_vision_status(VisionStatus::Stopped);
    log::info!("Vision loop terminated");
}

/// Owner of a running vision thread. Stopping (or dropping) it releases the
/// source.
pub struct VisionHandle {
    token: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl VisionHandle {
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        self.token.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("Vision thread panicked");
        }
    }
}

impl Drop for VisionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the vision loop on its own thread.
pub fn spawn_vision_loop<S: HandSource>(source: S, exchange: Arc<Exchange>) -> VisionHandle {
    let token = Arc::new(AtomicBool::new(false));
    let token_clone = token.clone();
    let handle = thread::Builder::new()
        .name("vision".to_owned())
        .spawn(move || run_vision_loop(source, &exchange, &token_clone));

    match handle {
        Ok(handle) => VisionHandle {
            token,
            handle: Some(handle),
        },
        Err(e) => {
            log::error!("Could not spawn vision thread: {e}");
            VisionHandle {
                token,
                handle: None,
            }
        }
    }
}

/// A hand as described by the pointer simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimHand {
    /// Wrist position in normalized image coordinates.
    pub wrist: [f32; 2],
    /// 0 for a fist, 1 for an open hand.
    pub openness: f32,
}

/// One frame of simulated input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimInput {
    pub hands: Vec<SimHand>,
}

/// Offsets of the index, middle, ring and pinky MCP joints from the wrist.
const MCP_OFFSETS: [[f32; 2]; 4] = [[-0.025, -0.08], [0.0, -0.085], [0.02, -0.08], [0.04, -0.07]];
const THUMB: [[f32; 2]; 4] = [[-0.03, -0.02], [-0.05, -0.04], [-0.065, -0.06], [-0.075, -0.075]];

/// Build a 21-landmark hand whose openness, as measured by the extractor,
/// equals `sim.openness` (clamped to `[0, 1]`).
pub fn synthetic_hand(sim: &SimHand) -> Hand {
    let [x, y] = sim.wrist;
    let at = |[dx, dy]: [f32; 2]| Landmark::new(x + dx, y + dy);

    let index_mcp = MCP_OFFSETS[0];
    let palm = (index_mcp[0] * index_mcp[0] + index_mcp[1] * index_mcp[1]).sqrt();
    let ratio = CLOSED_RATIO + sim.openness.clamp(0.0, 1.0) * OPENNESS_SPAN;

    let mut landmarks = Vec::with_capacity(21);
    landmarks.push(at([0.0, 0.0]));
    landmarks.extend(THUMB.iter().map(|o| at(*o)));
    for (finger, mcp) in MCP_OFFSETS.iter().enumerate() {
        // Only the middle fingertip is read by the extractor.
        let reach = if finger == 1 { ratio * palm } else { ratio * palm * 0.95 };
        let tip = [mcp[0], -reach];
        for step in 0..4 {
            let t = step as f32 / 3.0;
            landmarks.push(at([mcp[0], mcp[1] + (tip[1] - mcp[1]) * t]));
        }
    }
    Hand::new(landmarks)
}

/// Hand source driven by [`SimInput`] frames sent from the UI.
pub struct SimHandSource {
    rx: Receiver<SimInput>,
}

impl SimHandSource {
    pub fn channel() -> (Self, Sender<SimInput>) {
        let (tx, rx) = mpsc::channel();
        (Self { rx }, tx)
    }
}

impl HandSource for SimHandSource {
    fn open(&mut self) -> Result<(), VisionError> {
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> SourceEvent {
        match self.rx.recv_timeout(timeout) {
            Ok(mut input) => {
                // Only the newest frame matters.
                while let Ok(newer) = self.rx.try_recv() {
                    input = newer;
                }
                SourceEvent::Frame(HandFrame {
                    hands: input.hands.iter().map(synthetic_hand).collect(),
                })
            }
            Err(RecvTimeoutError::Timeout) => SourceEvent::Idle,
            Err(RecvTimeoutError::Disconnected) => SourceEvent::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::constants::{MIDDLE_TIP, NEUTRAL_SEPARATION};
    use crate::gesture::GestureState;

    struct ScriptedSource {
        events: VecDeque<SourceEvent>,
        fail_open: bool,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedSource {
        fn new(events: Vec<SourceEvent>) -> (Self, Arc<AtomicBool>) {
            let closed = Arc::new(AtomicBool::new(false));
            (
                Self {
                    events: events.into(),
                    fail_open: false,
                    closed: closed.clone(),
                },
                closed,
            )
        }
    }

    impl HandSource for ScriptedSource {
        fn open(&mut self) -> Result<(), VisionError> {
            if self.fail_open {
                Err(VisionError::CameraAccess("permission denied".to_owned()))
            } else {
                Ok(())
            }
        }

        fn poll(&mut self, _timeout: Duration) -> SourceEvent {
            self.events.pop_front().unwrap_or(SourceEvent::Closed)
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn frame(hands: &[SimHand]) -> SourceEvent {
        SourceEvent::Frame(HandFrame {
            hands: hands.iter().map(synthetic_hand).collect(),
        })
    }

    #[test]
    fn synthetic_hand_reproduces_openness() {
        for openness in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let hand = synthetic_hand(&SimHand {
                wrist: [0.4, 0.7],
                openness,
            });
            assert_eq!(hand.landmarks.len(), 21);
            assert!(hand.landmarks.len() > MIDDLE_TIP);
            let measured = hand.openness().unwrap();
            assert!((measured - openness).abs() < 1e-4, "{measured} != {openness}");
        }
    }

    #[test]
    fn loop_publishes_frames_and_closes_source() {
        let open = SimHand {
            wrist: [0.2, 0.5],
            openness: 1.0,
        };
        let fist = SimHand {
            wrist: [0.7, 0.5],
            openness: 0.0,
        };
        let (source, closed) = ScriptedSource::new(vec![
            frame(&[open]),
            SourceEvent::Idle,
            frame(&[open, fist]),
            frame(&[]),
        ]);
        let exchange = Exchange::new();
        run_vision_loop(source, &exchange, &AtomicBool::new(false));

        let state = exchange.gesture();
        assert!(!state.is_present);
        assert!((state.separation - 1.5).abs() < 1e-4);
        assert!((state.tension - 0.5).abs() < 1e-4);
        assert_eq!(exchange.vision_frames(), 3);
        assert_eq!(exchange.vision_status(), VisionStatus::Stopped);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn failed_open_leaves_hands_absent() {
        let (mut source, closed) = ScriptedSource::new(vec![frame(&[SimHand {
            wrist: [0.5, 0.5],
            openness: 1.0,
        }])]);
        source.fail_open = true;

        let exchange = Exchange::new();
        run_vision_loop(source, &exchange, &AtomicBool::new(false));

        assert_eq!(exchange.vision_status(), VisionStatus::Unavailable);
        assert_eq!(exchange.gesture(), GestureState::default());
        assert_eq!(exchange.vision_frames(), 0);
        assert!(!closed.load(Ordering::SeqCst));
    }

    #[test]
    fn stop_releases_running_source() {
        let (source, tx) = SimHandSource::channel();
        let exchange = Arc::new(Exchange::new());
        let mut handle = spawn_vision_loop(source, exchange.clone());

        tx.send(SimInput {
            hands: vec![SimHand {
                wrist: [0.5, 0.5],
                openness: 0.5,
            }],
        })
        .unwrap();
        for _ in 0..200 {
            if exchange.vision_frames() > 0 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(exchange.gesture().is_present);
        assert_eq!(exchange.gesture().separation, NEUTRAL_SEPARATION);

        handle.stop();
        assert!(!handle.is_running());
        assert_eq!(exchange.vision_status(), VisionStatus::Stopped);
    }

    #[test]
    fn dropped_sender_closes_sim_source() {
        let (mut source, tx) = SimHandSource::channel();
        drop(tx);
        assert_eq!(source.poll(Duration::from_millis(1)), SourceEvent::Closed);
    }
}
