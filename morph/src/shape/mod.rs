use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use rand::Rng;
use thiserror::Error;

use crate::constants::{FALLBACK_RADIUS, TARGET_PARTICLES};

mod gemini;

pub use gemini::GeminiGenerator;

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("no Gemini API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generator returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("response has no `points` array")]
    MissingPoints,
    #[error("`points` contains a non-numeric entry")]
    NonNumeric,
    #[error("`points` contains a non-finite value")]
    NonFinite,
    #[error("`points` is empty")]
    Empty,
    #[error("`points` has {len} entries, not a whole number of triples")]
    InvalidLength { len: usize },
}

/// Anything that can turn a description into raw coordinates.
pub trait ShapeGenerator: Send + Sync {
    fn generate(
        &self,
        description: &str,
        point_count: usize,
    ) -> impl Future<Output = Result<Vec<f32>, ShapeError>> + Send;
}

/// Shapes offered by the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresetShape {
    #[default]
    Sphere,
    Cube,
    Heart,
    Flower,
    Saturn,
    Buddha,
    Firework,
    Dna,
}

impl PresetShape {
    pub const ALL: [PresetShape; 8] = [
        PresetShape::Sphere,
        PresetShape::Cube,
        PresetShape::Heart,
        PresetShape::Flower,
        PresetShape::Saturn,
        PresetShape::Buddha,
        PresetShape::Firework,
        PresetShape::Dna,
    ];

    /// The description sent to the generator, also used as the cache key.
    pub fn description(&self) -> &'static str {
        match self {
            PresetShape::Sphere => "Sphere",
            PresetShape::Cube => "Cube",
            PresetShape::Heart => "Heart",
            PresetShape::Flower => "Flower",
            PresetShape::Saturn => "Saturn",
            PresetShape::Buddha => "Buddha Statue",
            PresetShape::Firework => "Firework Explosion",
            PresetShape::Dna => "DNA Helix",
        }
    }
}

impl Display for PresetShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Error)]
#[error("unknown shape {0:?}")]
pub struct UnknownShape(pub String);

impl FromStr for PresetShape {
    type Err = UnknownShape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|shape| {
                let description = shape.description().to_lowercase();
                description == wanted || format!("{shape:?}").to_lowercase() == wanted
            })
            .ok_or_else(|| UnknownShape(s.to_owned()))
    }
}

/// Where a returned buffer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeOrigin {
    Generated,
    Cached,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct ShapePoints {
    pub points: Arc<[f32]>,
    pub origin: ShapeOrigin,
}

impl ShapePoints {
    pub fn point_count(&self) -> usize {
        self.points.len() / 3
    }
}

/// Generated shapes keyed by exact description.
#[derive(Debug, Default)]
pub struct ShapeCache {
    entries: Mutex<HashMap<String, Arc<[f32]>>>,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, description: &str) -> Option<Arc<[f32]>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(description)
            .cloned()
    }

    pub fn insert(&self, description: &str, points: Arc<[f32]>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(description.to_owned(), points);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves descriptions to `3 * point_count` floats. Fallback spheres are never
/// cached.
pub struct ShapeSource<G> {
    generator: G,
    cache: ShapeCache,
    point_count: usize,
}

impl<G: ShapeGenerator> ShapeSource<G> {
    pub fn new(generator: G) -> Self {
        Self::with_point_count(generator, TARGET_PARTICLES)
    }

    pub fn with_point_count(generator: G, point_count: usize) -> Self {
        Self {
            generator,
            cache: ShapeCache::new(),
            point_count: point_count.max(1),
        }
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn cache(&self) -> &ShapeCache {
        &self.cache
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Resolve `description` to exactly `3 * point_count` coordinates. Never
    /// fails; errors are logged and replaced by the fallback sphere.
    pub async fn points(&self, description: &str) -> ShapePoints {
        if let Some(points) = self.cache.get(description) {
            log::debug!("Shape {description:?} served from cache");
            return ShapePoints {
                points,
                origin: ShapeOrigin::Cached,
            };
        }

        let generated = self
            .generator
            .generate(description, self.point_count)
            .await
            .and_then(|raw| normalize_points(raw, self.point_count));

        match generated {
            Ok(points) => {
                let points: Arc<[f32]> = points.into();
                self.cache.insert(description, points.clone());
                log::info!(
                    "Generated {} points for {description:?}",
                    points.len() / 3
                );
                ShapePoints {
                    points,
                    origin: ShapeOrigin::Generated,
                }
            }
            Err(e) => {
                log::warn!("Shape generation for {description:?} failed, using sphere: {e}");
                ShapePoints {
                    points: fallback_sphere(&mut rand::rng(), self.point_count, FALLBACK_RADIUS)
                        .into(),
                    origin: ShapeOrigin::Fallback,
                }
            }
        }
    }
}

/// Bring a generator response to exactly `3 * point_count` floats.
///
/// Longer lists are truncated and shorter ones are padded by repeating their
/// own points from the start. Partial triples and non-finite values are
/// rejected.
pub fn normalize_points(mut raw: Vec<f32>, point_count: usize) -> Result<Vec<f32>, ShapeError> {
    if raw.is_empty() {
        return Err(ShapeError::Empty);
    }
    if raw.len() % 3 != 0 {
        return Err(ShapeError::InvalidLength { len: raw.len() });
    }
    if raw.iter().any(|v| !v.is_finite()) {
        return Err(ShapeError::NonFinite);
    }

    let wanted = point_count * 3;
    if raw.len() > wanted {
        raw.truncate(wanted);
    } else if raw.len() < wanted {
        log::debug!("Padding {} points up to {point_count}", raw.len() / 3);
        let original = raw.len();
        raw.reserve(wanted - original);
        for i in original..wanted {
            raw.push(raw[i % original]);
        }
    }
    Ok(raw)
}

/// Points spread uniformly over a sphere surface.
pub fn fallback_sphere<R: Rng>(rng: &mut R, point_count: usize, radius: f32) -> Vec<f32> {
    let mut points = Vec::with_capacity(point_count * 3);
    for _ in 0..point_count {
        let theta = rng.random::<f32>() * std::f32::consts::TAU;
        let phi = (rng.random::<f32>() * 2.0 - 1.0).clamp(-1.0, 1.0).acos();
        points.push(radius * phi.sin() * theta.cos());
        points.push(radius * phi.sin() * theta.sin());
        points.push(radius * phi.cos());
    }
    points
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    struct CountingGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingGenerator {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl ShapeGenerator for CountingGenerator {
        fn generate(
            &self,
            _description: &str,
            point_count: usize,
        ) -> impl Future<Output = Result<Vec<f32>, ShapeError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            async move {
                if fail {
                    Err(ShapeError::MissingPoints)
                } else {
                    Ok((0..point_count * 3).map(|i| (i % 7) as f32 - 3.0).collect())
                }
            }
        }
    }

    fn norm(p: &[f32]) -> f32 {
        (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let source = ShapeSource::new(CountingGenerator::new(false));

        let first = source.points("Heart").await;
        let second = source.points("Heart").await;

        assert_eq!(first.origin, ShapeOrigin::Generated);
        assert_eq!(second.origin, ShapeOrigin::Cached);
        assert!(Arc::ptr_eq(&first.points, &second.points));
        assert_eq!(first.points[..], second.points[..]);
        assert_eq!(source.generator().calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.cache().len(), 1);
    }

    #[tokio::test]
    async fn cache_is_keyed_by_exact_description() {
        let source = ShapeSource::new(CountingGenerator::new(false));
        source.points("Heart").await;
        source.points("heart").await;
        assert_eq!(source.generator().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_yields_uncached_sphere() {
        let source = ShapeSource::new(CountingGenerator::new(true));

        let shape = source.points("Saturn").await;
        assert_eq!(shape.origin, ShapeOrigin::Fallback);
        assert_eq!(shape.points.len(), 4500);
        assert_eq!(shape.point_count(), TARGET_PARTICLES);
        for p in shape.points.chunks_exact(3) {
            assert!((norm(p) - FALLBACK_RADIUS).abs() < 1e-4);
        }

        assert!(source.cache().is_empty());
        source.points("Saturn").await;
        assert_eq!(source.generator().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fallback_covers_both_hemispheres() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = fallback_sphere(&mut rng, 2000, 4.0);
        let upper = points.chunks_exact(3).filter(|p| p[2] > 0.0).count();
        assert!((800..1200).contains(&upper), "upper = {upper}");
    }

    #[test]
    fn normalize_truncates_and_pads() {
        let long: Vec<f32> = (0..12).map(|i| i as f32).collect();
        assert_eq!(normalize_points(long, 2).unwrap(), vec![0., 1., 2., 3., 4., 5.]);

        let short = vec![1., 2., 3., 4., 5., 6.];
        assert_eq!(
            normalize_points(short, 3).unwrap(),
            vec![1., 2., 3., 4., 5., 6., 1., 2., 3.]
        );
    }

    #[test]
    fn normalize_rejects_malformed_lists() {
        assert!(matches!(normalize_points(vec![], 3), Err(ShapeError::Empty)));
        assert!(matches!(
            normalize_points(vec![1.0, 2.0], 3),
            Err(ShapeError::InvalidLength { len: 2 })
        ));
        assert!(matches!(
            normalize_points(vec![1.0, f32::NAN, 2.0], 3),
            Err(ShapeError::NonFinite)
        ));
    }

    #[test]
    fn preset_names_round_trip() {
        for shape in PresetShape::ALL {
            assert_eq!(shape.to_string().parse::<PresetShape>().unwrap(), shape);
        }
        assert_eq!("dna".parse::<PresetShape>().unwrap(), PresetShape::Dna);
        assert_eq!(
            " buddha statue ".parse::<PresetShape>().unwrap(),
            PresetShape::Buddha
        );
        assert!("Teapot".parse::<PresetShape>().is_err());
    }
}
