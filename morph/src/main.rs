use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use morph::{
    Exchange, GeminiGenerator, MorphApp, MorphConfig, PresetShape, ShapeSource, SimHandSource,
    spawn_vision_loop, ui::PointerHands,
};

#[derive(Debug, Parser)]
#[command(about = "Gesture-driven particle morph")]
struct Args {
    /// Number of particles in each generated shape.
    #[arg(long)]
    particles: Option<usize>,
    /// Gemini model used for shape generation.
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,
    /// Shape loaded at startup.
    #[arg(long)]
    shape: Option<PresetShape>,
    /// Never call the generator; every shape falls back to the sphere.
    #[arg(long)]
    offline: bool,
}

impl Args {
    fn apply(self, mut config: MorphConfig) -> MorphConfig {
        if let Some(particles) = self.particles {
            config.particle_count = particles.max(1);
        }
        if let Some(model) = self.model {
            config.gemini.model = model;
        }
        if let Some(shape) = self.shape {
            config.initial_shape = shape;
        }
        if self.offline {
            config.gemini.api_key = None;
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().apply(MorphConfig::from_env());
    if !config.gemini.has_credentials() {
        log::warn!("No Gemini API key, shapes will fall back to a sphere");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("shape-loader")
        .build()
        .context("Failed to start async runtime")?;

    let generator = GeminiGenerator::new(config.gemini.clone())?;
    let shapes = Arc::new(ShapeSource::with_point_count(
        generator,
        config.particle_count,
    ));

    let exchange = Arc::new(Exchange::new());
    let (source, hands_tx) = SimHandSource::channel();
    let vision = spawn_vision_loop(source, exchange.clone());

    let handle = runtime.handle().clone();
    let initial_shape = config.initial_shape;
    let options = eframe::NativeOptions {
        renderer: eframe::Renderer::Wgpu,
        viewport: egui::ViewportBuilder::default()
            .with_title("Gesture Morph")
            .with_inner_size([1280.0, 720.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Gesture Morph",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(MorphApp::new(
                exchange,
                shapes,
                handle,
                vision,
                PointerHands::new(hands_tx),
                initial_shape,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Window closed with error: {e}"))?;

    log::info!("Shutting down");
    runtime.shutdown_timeout(std::time::Duration::from_secs(1));
    Ok(())
}
