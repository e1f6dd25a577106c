use std::sync::mpsc::Sender;

use eframe::egui::{self, Key, Pos2, Rect};

use crate::vision::{SimHand, SimInput};

#[derive(Debug, Default, Clone)]
pub struct KeyTrigger {
    pressed: bool,
    trigger: bool,
}

impl KeyTrigger {
    pub fn event(&mut self, is_pressed: bool) {
        match (self.pressed, is_pressed) {
            (true, true) => (),
            (true, false) => self.pressed = false,
            (false, true) => {
                self.pressed = true;
                self.trigger = true;
            }
            (false, false) => (),
        }
    }

    pub fn get_trigger(&mut self) -> bool {
        let t = self.trigger;
        self.trigger = false;
        t
    }
}

/// Build the simulated hands for one frame.
///
/// `position` is the pointer in normalized image coordinates, `None` when no
/// hand is held up. A mirrored second hand sits at the same height on the
/// opposite side of the frame.
pub fn sim_input(position: Option<[f32; 2]>, fist: bool, mirrored: bool) -> SimInput {
    let Some([x, y]) = position else {
        return SimInput::default();
    };
    let openness = if fist { 0.0 } else { 1.0 };
    let mut hands = vec![SimHand {
        wrist: [x, y],
        openness,
    }];
    if mirrored {
        hands.push(SimHand {
            wrist: [1.0 - x, y],
            openness,
        });
    }
    SimInput { hands }
}

fn normalized(pos: Pos2, rect: Rect) -> [f32; 2] {
    [
        ((pos.x - rect.left()) / rect.width().max(1.0)).clamp(0.0, 1.0),
        ((pos.y - rect.top()) / rect.height().max(1.0)).clamp(0.0, 1.0),
    ]
}

/// Turns pointer and keyboard input into simulated hand frames.
///
/// Holding a mouse button raises a hand at the cursor. The secondary button or
/// Space closes it into a fist, and T toggles a mirrored second hand.
pub struct PointerHands {
    tx: Sender<SimInput>,
    mirror_key: KeyTrigger,
    mirrored: bool,
    connected: bool,
}

impl PointerHands {
    pub fn new(tx: Sender<SimInput>) -> Self {
        Self {
            tx,
            mirror_key: KeyTrigger::default(),
            mirrored: false,
            connected: true,
        }
    }

    pub fn mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn update(&mut self, ctx: &egui::Context, rect: Rect) {
        let (pointer, primary, secondary, space, t) = ctx.input(|i| {
            (
                i.pointer.latest_pos(),
                i.pointer.primary_down(),
                i.pointer.secondary_down(),
                i.key_down(Key::Space),
                i.key_down(Key::T),
            )
        });

        self.mirror_key.event(t);
        if self.mirror_key.get_trigger() {
            self.mirrored = !self.mirrored;
        }

        let position = pointer
            .filter(|p| (primary || secondary) && rect.contains(*p))
            .map(|p| normalized(p, rect));
        let input = sim_input(position, secondary || space, self.mirrored);

        if self.connected && self.tx.send(input).is_err() {
            log::warn!("Vision loop is gone, pointer hands disabled");
            self.connected = false;
        }
    }
}
