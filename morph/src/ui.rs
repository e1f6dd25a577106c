use std::{sync::Arc, time::Instant};

use eframe::egui::{self, Color32, Pos2, Rect, Shape};
use tokio::runtime::Handle;

use crate::{
    camera::Camera,
    constants::{BACKGROUND, DEFAULT_COLOR, PALETTE, POINT_ALPHA, POINT_SIZE},
    exchange::Exchange,
    shape::{PresetShape, ShapeGenerator, ShapeSource},
    sim::{ParticleSet, Simulation},
    vision::VisionHandle,
};

mod controls;
mod input;

pub use controls::{ControlAction, ControlPanel, PanelState};
pub use input::{KeyTrigger, PointerHands, sim_input};

const PANEL_WIDTH: f32 = 300.0;
const ZOOM_PER_SCROLL: f32 = 0.01;

pub struct MorphApp<G> {
    exchange: Arc<Exchange>,
    shapes: Arc<ShapeSource<G>>,
    runtime: Handle,
    simulation: Simulation,
    camera: Camera,
    color: usize,
    current_shape: String,
    started: Instant,
    pointer: PointerHands,
    control_panel: ControlPanel,
    // Dropping the app stops the vision thread and releases its source.
    _vision: VisionHandle,
}

impl<G: ShapeGenerator + 'static> MorphApp<G> {
    pub fn new(
        exchange: Arc<Exchange>,
        shapes: Arc<ShapeSource<G>>,
        runtime: Handle,
        vision: VisionHandle,
        pointer: PointerHands,
        initial_shape: PresetShape,
    ) -> Self {
        let mut app = Self {
            exchange,
            shapes,
            runtime,
            simulation: Simulation::new(ParticleSet::empty()),
            camera: Camera::new(1280.0, 720.0),
            color: DEFAULT_COLOR,
            current_shape: String::new(),
            started: Instant::now(),
            pointer,
            control_panel: ControlPanel::new(),
            _vision: vision,
        };
        app.load_shape(initial_shape.description());
        app
    }

    /// Start loading `description` in the background. The render loop picks
    /// the result up from the exchange once it is ready.
    pub fn load_shape(&mut self, description: &str) {
        let request_id = self.exchange.begin_shape_request();
        self.current_shape = description.to_owned();
        log::info!("Loading shape {description:?} (request {request_id})");

        let shapes = self.shapes.clone();
        let exchange = self.exchange.clone();
        let description = description.to_owned();
        self.runtime.spawn(async move {
            let shape = shapes.points(&description).await;
            exchange.submit_shape(request_id, &description, shape);
        });
    }

    fn apply_pending_shape(&mut self) {
        if let Some(loaded) = self.exchange.take_shape() {
            log::debug!(
                "Applying {} points for {:?} ({:?})",
                loaded.points.len() / 3,
                loaded.description,
                loaded.origin
            );
            self.simulation.load_target(&loaded.points);
        }
    }

    fn paint_particles(&mut self, ui: &egui::Ui, rect: Rect) {
        self.camera.resize(rect.width(), rect.height());
        self.camera.set_rotation(self.simulation.rotation_y());
        self.camera.flush_if_needed();

        let [r, g, b] = PALETTE[self.color];
        let color = Color32::from_rgba_unmultiplied(r, g, b, POINT_ALPHA);
        let center = rect.center();
        let half = rect.size() * 0.5;

        let camera = &self.camera;
        let shapes: Vec<Shape> = self
            .simulation
            .particles()
            .current()
            .iter()
            .filter_map(|p| camera.project(*p))
            .filter(|p| p.ndc[0].abs() <= 1.0 && p.ndc[1].abs() <= 1.0)
            .map(|p| {
                let pos = Pos2::new(center.x + p.ndc[0] * half.x, center.y - p.ndc[1] * half.y);
                Shape::circle_filled(pos, (POINT_SIZE / p.depth).max(0.5), color)
            })
            .collect();

        ui.painter_at(rect).extend(shapes);
    }
}

impl<G: ShapeGenerator + 'static> eframe::App for MorphApp<G> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_pending_shape();

        let gesture = self.exchange.gesture();
        self.simulation
            .tick(&gesture, self.started.elapsed().as_secs_f64());

        let panel_state = PanelState {
            gesture,
            vision: self.exchange.vision_status(),
            generating: self.exchange.is_generating(),
            current_shape: &self.current_shape,
            color: self.color,
            ticks: self.simulation.ticks(),
            particles: self.simulation.particles().len(),
            mirrored: self.pointer.mirrored(),
        };
        let action = egui::SidePanel::right("controls")
            .exact_width(PANEL_WIDTH)
            .show(ctx, |ui| self.control_panel.render(ui, &panel_state))
            .inner;

        match action {
            Some(ControlAction::LoadShape(shape)) => self.load_shape(shape.description()),
            Some(ControlAction::SetColor(index)) => self.color = index,
            None => (),
        }

        let [r, g, b] = BACKGROUND;
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(Color32::from_rgb(r, g, b)))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                self.pointer.update(ctx, rect);

                let scroll = ui.input(|i| i.smooth_scroll_delta.y);
                if ui.rect_contains_pointer(rect) {
                    self.camera.zoom(scroll * ZOOM_PER_SCROLL);
                }

                self.paint_particles(ui, rect);
            });

        ctx.request_repaint();
    }
}
