use std::time::Instant;

use eframe::egui::{self, Color32, CornerRadius, Margin, RichText, Sense, Stroke, Vec2};

use crate::{
    constants::PALETTE,
    exchange::VisionStatus,
    gesture::GestureState,
    shape::PresetShape,
};

const SWATCH_SIZE: f32 = 26.0;

/// Something the user asked for in the control panel this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    LoadShape(PresetShape),
    SetColor(usize),
}

/// What the panel shows. Gathered fresh every frame.
pub struct PanelState<'a> {
    pub gesture: GestureState,
    pub vision: VisionStatus,
    pub generating: bool,
    pub current_shape: &'a str,
    pub color: usize,
    pub ticks: u64,
    pub particles: usize,
    pub mirrored: bool,
}

pub fn palette_color(index: usize) -> Color32 {
    let [r, g, b] = PALETTE[index % PALETTE.len()];
    Color32::from_rgb(r, g, b)
}

pub fn status_text(gesture: &GestureState) -> &'static str {
    if gesture.is_present {
        "HANDS DETECTED"
    } else {
        "NO HANDS"
    }
}

pub fn readout_text(gesture: &GestureState) -> String {
    format!(
        "SEP: {:.2} | TEN: {:.2}",
        gesture.separation, gesture.tension
    )
}

pub struct ControlPanel {
    last_tick: u64,
    last_update: Instant,
    tick_rates: [f64; 30],
    tick_rate_index: usize,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self {
            last_tick: 0,
            last_update: Instant::now(),
            tick_rates: [0.0; 30],
            tick_rate_index: 0,
        }
    }

    fn sample_tick_rate(&mut self, tick: u64) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        if elapsed > 0.0 {
            let ticks_elapsed = tick.saturating_sub(self.last_tick);
            self.tick_rates[self.tick_rate_index] = ticks_elapsed as f64 / elapsed;
            self.tick_rate_index = (self.tick_rate_index + 1) % self.tick_rates.len();
        }
        self.last_tick = tick;
        self.last_update = now;

        self.tick_rates.iter().sum::<f64>() / self.tick_rates.len() as f64
    }

    pub fn render(&mut self, ui: &mut egui::Ui, state: &PanelState<'_>) -> Option<ControlAction> {
        let tick_rate = self.sample_tick_rate(state.ticks);
        let mut action = None;

        ui.vertical(|ui| {
            ui.heading("Gesture Morph");
            ui.label(
                RichText::new("Move hands apart to expand. Close fists to agitate.")
                    .small()
                    .color(Color32::GRAY),
            );
            ui.add_space(8.0);

            status_pill(ui, &state.gesture);
            if state.gesture.is_present {
                ui.label(
                    RichText::new(readout_text(&state.gesture))
                        .monospace()
                        .small()
                        .color(Color32::GRAY),
                );
            }
            match state.vision {
                VisionStatus::Initializing => {
                    ui.label(RichText::new("Loading vision...").small().color(Color32::GRAY));
                }
                VisionStatus::Unavailable => {
                    ui.label(RichText::new("Vision unavailable").small().color(Color32::GRAY));
                }
                VisionStatus::Tracking | VisionStatus::Stopped => (),
            }

            ui.add_space(12.0);
            ui.label(RichText::new("SHAPE").small().strong().color(Color32::GRAY));
            ui.horizontal_wrapped(|ui| {
                for shape in PresetShape::ALL {
                    let selected = state.current_shape == shape.description();
                    let text = if selected {
                        RichText::new(shape.description()).strong().color(Color32::BLACK)
                    } else {
                        RichText::new(shape.description())
                    };
                    let mut button = egui::Button::new(text);
                    if selected {
                        button = button.fill(Color32::WHITE);
                    }
                    if ui.add_enabled(!state.generating, button).clicked() {
                        action = Some(ControlAction::LoadShape(shape));
                    }
                }
            });
            if state.generating {
                ui.label(
                    RichText::new(format!("Generating points for {}...", state.current_shape))
                        .small()
                        .color(Color32::LIGHT_BLUE),
                );
            }

            ui.add_space(12.0);
            ui.label(RichText::new("PARTICLE COLOR").small().strong().color(Color32::GRAY));
            ui.horizontal(|ui| {
                for index in 0..PALETTE.len() {
                    if color_swatch(ui, index, index == state.color) {
                        action = Some(ControlAction::SetColor(index));
                    }
                }
            });

            ui.add_space(12.0);
            ui.label(format!("Particles: {}", state.particles));
            ui.label(format!("Ticks per second: {tick_rate:.0}"));
            ui.label(
                RichText::new(format!(
                    "Hold a mouse button to raise a hand. Right button or Space closes it. \
                     T toggles a second hand ({}).",
                    if state.mirrored { "on" } else { "off" }
                ))
                .small()
                .color(Color32::GRAY),
            );
        });

        action
    }
}

fn status_pill(ui: &mut egui::Ui, gesture: &GestureState) {
    let (fg, bg) = if gesture.is_present {
        (Color32::from_rgb(74, 222, 128), Color32::from_rgb(20, 50, 30))
    } else {
        (Color32::from_rgb(248, 113, 113), Color32::from_rgb(60, 20, 20))
    };
    egui::Frame::new()
        .fill(bg)
        .stroke(Stroke::new(1.0, fg.gamma_multiply(0.5)))
        .corner_radius(CornerRadius::same(12))
        .inner_margin(Margin::symmetric(10, 4))
        .show(ui, |ui| {
            ui.label(RichText::new(status_text(gesture)).monospace().small().color(fg));
        });
}

fn color_swatch(ui: &mut egui::Ui, index: usize, selected: bool) -> bool {
    let (rect, response) = ui.allocate_exact_size(Vec2::splat(SWATCH_SIZE), Sense::click());
    let painter = ui.painter();
    let radius = SWATCH_SIZE * 0.4;
    painter.circle_filled(rect.center(), radius, palette_color(index));
    if selected {
        painter.circle_stroke(rect.center(), radius + 2.0, Stroke::new(2.0, Color32::WHITE));
    }
    response.clicked()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_presence() {
        let mut gesture = GestureState::default();
        assert_eq!(status_text(&gesture), "NO HANDS");
        gesture.is_present = true;
        assert_eq!(status_text(&gesture), "HANDS DETECTED");
    }

    #[test]
    fn readout_uses_two_decimals() {
        let gesture = GestureState {
            is_present: true,
            separation: 1.5,
            tension: 0.126,
        };
        assert_eq!(readout_text(&gesture), "SEP: 1.50 | TEN: 0.13");
    }

    #[test]
    fn default_color_is_cyan() {
        assert_eq!(
            palette_color(crate::constants::DEFAULT_COLOR),
            Color32::from_rgb(0x00, 0xff, 0xff)
        );
    }
}
