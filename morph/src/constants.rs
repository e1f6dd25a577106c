// SHAPES
/// Number of particles requested from the generator and produced by the fallback.
pub const TARGET_PARTICLES: usize = 1500;
/// Radius of the procedural fallback sphere.
pub const FALLBACK_RADIUS: f32 = 4.0;
/// Coordinates requested from the generator lie roughly within +/- this value.
pub const COORDINATE_RANGE: f32 = 5.0;

// GESTURE
/// Landmark index of the wrist.
pub const WRIST: usize = 0;
/// Landmark index of the index finger MCP joint (base of the index finger).
pub const INDEX_MCP: usize = 5;
/// Landmark index of the middle fingertip.
pub const MIDDLE_TIP: usize = 12;
/// Hands with fewer landmarks than this are discarded.
pub const MIN_LANDMARKS: usize = MIDDLE_TIP + 1;
/// Palm sizes below this are treated as degenerate tracking.
pub const PALM_EPSILON: f32 = 1e-6;
/// Extension/palm ratio at or below which a hand counts as a fist.
pub const CLOSED_RATIO: f32 = 0.8;
/// Width of the ratio window between fist and fully open.
pub const OPENNESS_SPAN: f32 = 1.0;
/// Multiplier from normalized wrist distance to separation.
pub const SEPARATION_SCALE: f32 = 3.0;
pub const MIN_SEPARATION: f32 = 0.2;
pub const MAX_SEPARATION: f32 = 3.0;
/// Separation reported while a single hand is tracked.
pub const NEUTRAL_SEPARATION: f32 = 0.8;
/// Separation before the first frame arrives.
pub const INITIAL_SEPARATION: f32 = 0.5;

// SIMULATION
/// Fraction of the remaining distance covered each tick.
pub const SMOOTHING: f32 = 0.05;
/// Jitter amplitude with no hands in view.
pub const AMBIENT_CHAOS: f32 = 0.05;
/// Jitter amplitude per unit of tension.
pub const TENSION_CHAOS: f32 = 0.5;
/// Angular frequency of the jitter, in radians per second.
pub const JITTER_FREQUENCY: f64 = 2.0;
/// Phase spread of the jitter across particles.
pub const JITTER_PHASE_SPREAD: f32 = 10.0;
/// Half-width of the cube new particles spawn in.
pub const SPAWN_EXTENT: f32 = 5.0;
/// Rotation about the y axis per tick, in radians.
pub const BASE_SPIN: f32 = 0.001;
/// Extra rotation per tick while tension is above `SPIN_TENSION_THRESHOLD`.
pub const TENSE_SPIN: f32 = 0.02;
pub const SPIN_TENSION_THRESHOLD: f32 = 0.5;
/// Use the rayon pool if there are at least this many particles.
pub const PARALLEL_CUTOFF: usize = 20_000;
/// Minimum number of particles per rayon task.
pub const PARTICLES_PER_TASK: usize = 4096;

// VISION
/// How long the vision loop waits for a frame before re-checking its stop token.
pub const FRAME_POLL_MS: u64 = 50;

// RENDERING
/// Camera distance from the origin, looking down -z.
pub const CAMERA_DISTANCE: f32 = 15.0;
/// Vertical field of view, in degrees.
pub const CAMERA_FOVY: f32 = 50.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 100.0;
/// Particle radius in points at unit depth; divided by view depth when drawing.
pub const POINT_SIZE: f32 = 22.0;
pub const POINT_ALPHA: u8 = 204;
pub const BACKGROUND: [u8; 3] = [5, 5, 5];
/// Particle colors offered in the control panel.
pub const PALETTE: [[u8; 3]; 7] = [
    [0xff, 0xff, 0xff],
    [0x00, 0xff, 0xff],
    [0xff, 0x00, 0xff],
    [0xff, 0x99, 0x00],
    [0x33, 0xff, 0x33],
    [0xff, 0x33, 0x33],
    [0x99, 0x33, 0xff],
];
/// Index into `PALETTE` selected at startup.
pub const DEFAULT_COLOR: usize = 1;
