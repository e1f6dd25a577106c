use cgmath::{MetricSpace, Point2};

use crate::constants::{
    CLOSED_RATIO, INDEX_MCP, INITIAL_SEPARATION, MAX_SEPARATION, MIDDLE_TIP, MIN_LANDMARKS,
    MIN_SEPARATION, NEUTRAL_SEPARATION, OPENNESS_SPAN, PALM_EPSILON, SEPARATION_SCALE, WRIST,
};

/// A single tracked point, in normalized image coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    fn planar(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Landmarks of one detected hand, in tracker order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hand {
    pub landmarks: Vec<Landmark>,
}

impl Hand {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// Returns the wrist, index base and middle fingertip if the hand has enough
    /// finite landmarks and a non-degenerate palm.
    fn key_points(&self) -> Option<(Point2<f32>, Point2<f32>, Point2<f32>)> {
        if self.landmarks.len() < MIN_LANDMARKS {
            return None;
        }
        let wrist = self.landmarks[WRIST];
        let base = self.landmarks[INDEX_MCP];
        let tip = self.landmarks[MIDDLE_TIP];
        if !(wrist.is_finite() && base.is_finite() && tip.is_finite()) {
            return None;
        }
        let wrist = wrist.planar();
        if wrist.distance(base.planar()) < PALM_EPSILON {
            return None;
        }
        Some((wrist, base.planar(), tip.planar()))
    }

    pub fn wrist(&self) -> Option<Point2<f32>> {
        self.key_points().map(|(wrist, _, _)| wrist)
    }

    /// Finger extension relative to palm size, rescaled so that a fist is 0 and
    /// an open hand is 1. `None` for degenerate hands.
    pub fn openness(&self) -> Option<f32> {
        let (wrist, base, tip) = self.key_points()?;
        let ratio = wrist.distance(tip) / wrist.distance(base);
        Some(((ratio - CLOSED_RATIO) / OPENNESS_SPAN).clamp(0.0, 1.0))
    }
}

/// Control signals derived from the latest vision frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureState {
    pub is_present: bool,
    /// Expansion factor, meaningful while hands are present.
    pub separation: f32,
    /// 0 for open hands, 1 for fists.
    pub tension: f32,
}

impl Default for GestureState {
    fn default() -> Self {
        Self {
            is_present: false,
            separation: INITIAL_SEPARATION,
            tension: 0.0,
        }
    }
}

/// Maps a normalized wrist-to-wrist distance to a separation value.
pub fn separation_from_distance(dist: f32) -> f32 {
    (dist * SEPARATION_SCALE).clamp(MIN_SEPARATION, MAX_SEPARATION)
}

/// Stateful extractor; remembers the last snapshot so that empty frames can
/// carry it forward.
#[derive(Debug, Default, Clone)]
pub struct GestureExtractor {
    state: GestureState,
}

impl GestureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: GestureState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Fold one frame of detected hands into a new snapshot.
    pub fn update(&mut self, hands: &[Hand]) -> GestureState {
        let valid: Vec<(&Hand, f32)> = hands
            .iter()
            .filter_map(|hand| hand.openness().map(|openness| (hand, openness)))
            .collect();

        if valid.len() < hands.len() {
            log::debug!(
                "Discarded {} degenerate hand(s) of {}",
                hands.len() - valid.len(),
                hands.len()
            );
        }

        if valid.is_empty() {
            self.state.is_present = false;
            return self.state;
        }

        let mean_openness = valid.iter().map(|(_, o)| o).sum::<f32>() / valid.len() as f32;
        let tension = 1.0 - mean_openness;

        let separation = match valid.as_slice() {
            [(a, _), (b, _)] => match (a.wrist(), b.wrist()) {
                (Some(wa), Some(wb)) => separation_from_distance(wa.distance(wb)),
                _ => NEUTRAL_SEPARATION,
            },
            _ => NEUTRAL_SEPARATION,
        };

        self.state = GestureState {
            is_present: true,
            separation,
            tension,
        };
        self.state
    }
}
