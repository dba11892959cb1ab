mod modes;

pub use modes::{build_modes, Mode};

use crate::audio::FrequencySnapshot;
use crate::canvas::PixelCanvas;
use std::time::{Duration, Instant};

pub const TRANSITION_STEP: f32 = 0.03;
pub const AUTO_CYCLE_INTERVAL: Duration = Duration::from_secs(20);

// Reactive boost: loudness past this mean-byte level kicks the camera.
pub const SHAKE_THRESHOLD: f32 = 200.0;
pub const SHAKE_KICK: f32 = 20.0;
const SHAKE_DECAY: f32 = 0.9;

const DRIFT_AMPLITUDE: f32 = 40.0;
const DRIFT_RATE: f32 = 0.002;

// Trail fade alpha; lower in hypnotic mode for longer bloom tails.
const TRAIL_ALPHA: f32 = 0.22;
const TRAIL_ALPHA_HYPNOTIC: f32 = 0.08;

/// The fixed mode catalogue, in auto-cycle order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeKind {
    Swirl,
    Nebula,
    Rings,
    Particles,
    Grid,
    Vortex,
    Fractal,
    Aurora,
    Rain,
    Matrix,
}

impl ModeKind {
    pub const fn all() -> [Self; 10] {
        [
            Self::Swirl,
            Self::Nebula,
            Self::Rings,
            Self::Particles,
            Self::Grid,
            Self::Vortex,
            Self::Fractal,
            Self::Aurora,
            Self::Rain,
            Self::Matrix,
        ]
    }

    pub fn next(self) -> Self {
        let all = Self::all();
        let mut idx = 0usize;
        while idx < all.len() {
            if all[idx] == self {
                return all[(idx + 1) % all.len()];
            }
            idx += 1;
        }
        Self::Swirl
    }

    pub fn prev(self) -> Self {
        let all = Self::all();
        let mut idx = 0usize;
        while idx < all.len() {
            if all[idx] == self {
                return all[(idx + all.len() - 1) % all.len()];
            }
            idx += 1;
        }
        Self::Swirl
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Swirl => "swirl",
            Self::Nebula => "nebula",
            Self::Rings => "rings",
            Self::Particles => "particles",
            Self::Grid => "grid",
            Self::Vortex => "vortex",
            Self::Fractal => "fractal",
            Self::Aurora => "aurora",
            Self::Rain => "rain",
            Self::Matrix => "matrix",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let n = name.trim().to_ascii_lowercase();
        Self::all().into_iter().find(|k| k.label() == n)
    }
}

/// Per-frame values populated by the input layer between frames. The engine
/// itself keeps no toggle state.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub palette: usize,
    pub auto_cycle: bool,
    pub hypnotic: bool,
    pub reactive: bool,
}

/// Read-only view a mode renders from.
pub struct FrameCtx<'a> {
    pub t: f32,
    pub spectrum: &'a FrequencySnapshot,
    pub palette: usize,
    pub w: f32,
    pub h: f32,
    pub reactive: bool,
}

/// What the render loop should draw this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Blend {
    Steady(ModeKind),
    Cross {
        from: ModeKind,
        to: ModeKind,
        progress: f32,
    },
}

/// Steady/Transitioning cross-fade state machine. Selecting always restarts
/// the fade, including a reselect of the active mode.
#[derive(Clone, Copy, Debug)]
pub struct Transition {
    active: ModeKind,
    target: ModeKind,
    progress: f32,
    transitioning: bool,
}

impl Transition {
    pub fn new(initial: ModeKind) -> Self {
        Self {
            active: initial,
            target: initial,
            progress: 0.0,
            transitioning: false,
        }
    }

    pub fn select(&mut self, kind: ModeKind) {
        self.target = kind;
        self.progress = 0.0;
        self.transitioning = true;
    }

    /// Advance one frame and report the blend to draw. On completion the
    /// target becomes active and the completion frame already draws steady.
    pub fn step(&mut self) -> Blend {
        if !self.transitioning {
            return Blend::Steady(self.active);
        }
        self.progress += TRANSITION_STEP;
        if self.progress >= 1.0 {
            self.active = self.target;
            self.transitioning = false;
            return Blend::Steady(self.active);
        }
        Blend::Cross {
            from: self.active,
            to: self.target,
            progress: self.progress,
        }
    }

    pub fn active(&self) -> ModeKind {
        self.active
    }

    pub fn target(&self) -> ModeKind {
        self.target
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }
}

/// Additive camera offset: a slow sinusoidal drift while hypnotic is on plus
/// an exponentially decaying random shake. The offset is applied as a
/// translation for the current frame only.
#[derive(Clone, Copy, Debug)]
pub struct CameraRig {
    shake: f32,
}

impl CameraRig {
    pub fn new() -> Self {
        Self { shake: 0.0 }
    }

    /// Raise the shake envelope to at least `magnitude`; a louder hit simply
    /// restarts the decay, quieter ones are absorbed.
    pub fn trigger_shake(&mut self, magnitude: f32) {
        self.shake = self.shake.max(magnitude);
    }

    pub fn shake_magnitude(&self) -> f32 {
        self.shake
    }

    /// Sample this frame's offset and decay the shake envelope.
    pub fn offset(&mut self, t: f32, hypnotic: bool) -> (f32, f32) {
        let (drift_x, drift_y) = if hypnotic {
            (
                (t * DRIFT_RATE).sin() * DRIFT_AMPLITUDE,
                (t * DRIFT_RATE).cos() * DRIFT_AMPLITUDE,
            )
        } else {
            (0.0, 0.0)
        };

        let jitter_x = (fastrand::f32() - 0.5) * self.shake;
        let jitter_y = (fastrand::f32() - 0.5) * self.shake;
        self.shake *= SHAKE_DECAY;

        (drift_x + jitter_x, drift_y + jitter_y)
    }
}

/// Wall-clock timer advancing the catalogue one mode per interval while
/// enabled. Polled with an explicit `now` so tests can drive it.
#[derive(Clone, Copy, Debug)]
pub struct AutoCycle {
    last: Instant,
}

impl AutoCycle {
    pub fn new(now: Instant) -> Self {
        Self { last: now }
    }

    pub fn poll(&mut self, now: Instant, enabled: bool, current: ModeKind) -> Option<ModeKind> {
        if now.duration_since(self.last) < AUTO_CYCLE_INTERVAL {
            return None;
        }
        self.last = now;
        enabled.then(|| current.next())
    }
}

/// The per-frame driver: owns the mode set, the transition machine, the
/// camera, the auto-cycle timer and the raster it composites onto.
pub struct SceneEngine {
    modes: Vec<Box<dyn Mode>>,
    transition: Transition,
    camera: CameraRig,
    cycle: AutoCycle,
    canvas: PixelCanvas,
    t: u64,
}

impl SceneEngine {
    pub fn new(initial: ModeKind, now: Instant) -> Self {
        Self {
            modes: build_modes(),
            transition: Transition::new(initial),
            camera: CameraRig::new(),
            cycle: AutoCycle::new(now),
            canvas: PixelCanvas::new(0, 0),
            t: 0,
        }
    }

    pub fn resize(&mut self, w: usize, h: usize) {
        if w == self.canvas.width() && h == self.canvas.height() {
            return;
        }
        self.canvas.resize(w, h);
        for m in &mut self.modes {
            m.on_resize(w as f32, h as f32);
        }
    }

    /// Start a transition to the named mode. Unknown names change nothing.
    pub fn select_mode(&mut self, name: &str) -> bool {
        match ModeKind::from_name(name) {
            Some(kind) => {
                self.transition.select(kind);
                true
            }
            None => false,
        }
    }

    pub fn select_kind(&mut self, kind: ModeKind) {
        self.transition.select(kind);
    }

    pub fn active_mode(&self) -> ModeKind {
        self.transition.active()
    }

    pub fn target_mode(&self) -> ModeKind {
        self.transition.target()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_transitioning()
    }

    pub fn transition_progress(&self) -> f32 {
        self.transition.progress()
    }

    pub fn frame_count(&self) -> u64 {
        self.t
    }

    pub fn shake_magnitude(&self) -> f32 {
        self.camera.shake_magnitude()
    }

    pub fn size(&self) -> (usize, usize) {
        (self.canvas.width(), self.canvas.height())
    }

    pub fn pixels(&self) -> &[u8] {
        self.canvas.pixels()
    }

    /// Render one frame: fade the trail, apply the camera, advance the
    /// cross-fade and draw one or two modes, then bump the frame counter.
    /// A zero-area canvas degrades to pure state advancement.
    pub fn advance(
        &mut self,
        now: Instant,
        spectrum: &FrequencySnapshot,
        input: FrameInput,
    ) -> &[u8] {
        if let Some(next) = self.cycle.poll(now, input.auto_cycle, self.transition.active()) {
            self.transition.select(next);
        }

        let loudness = spectrum.loudness();
        if input.reactive && loudness > SHAKE_THRESHOLD {
            self.camera.trigger_shake(SHAKE_KICK);
        }

        self.canvas.fade(if input.hypnotic {
            TRAIL_ALPHA_HYPNOTIC
        } else {
            TRAIL_ALPHA
        });

        let (shift_x, shift_y) = self.camera.offset(self.t as f32, input.hypnotic);
        self.canvas.set_offset(shift_x, shift_y);

        let ctx = FrameCtx {
            t: self.t as f32,
            spectrum,
            palette: input.palette,
            w: self.canvas.width() as f32,
            h: self.canvas.height() as f32,
            reactive: input.reactive,
        };

        match self.transition.step() {
            Blend::Steady(kind) => {
                self.canvas.set_global_alpha(1.0);
                draw_mode(&mut self.modes, &mut self.canvas, kind, &ctx);
            }
            Blend::Cross { from, to, progress } => {
                self.canvas.set_global_alpha(1.0 - progress);
                draw_mode(&mut self.modes, &mut self.canvas, from, &ctx);
                self.canvas.set_global_alpha(progress);
                draw_mode(&mut self.modes, &mut self.canvas, to, &ctx);
            }
        }

        self.canvas.set_global_alpha(1.0);
        self.canvas.clear_offset();
        self.t += 1;

        self.canvas.pixels()
    }
}

fn draw_mode(
    modes: &mut [Box<dyn Mode>],
    canvas: &mut PixelCanvas,
    kind: ModeKind,
    ctx: &FrameCtx<'_>,
) {
    if let Some(mode) = modes.iter_mut().find(|m| m.kind() == kind) {
        mode.draw(ctx, canvas);
    }
}
