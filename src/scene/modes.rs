use super::{FrameCtx, ModeKind};
use crate::canvas::Surface;
use crate::palette;
use std::f32::consts::TAU;

/// A visual generator. Most modes are pure functions of the frame context;
/// `particles` and `matrix` own fixed-size entity pools they mutate between
/// frames.
pub trait Mode {
    fn kind(&self) -> ModeKind;
    fn draw(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface);
    fn on_resize(&mut self, _w: f32, _h: f32) {}
}

/// One instance per catalogue entry, in catalogue order.
pub fn build_modes() -> Vec<Box<dyn Mode>> {
    vec![
        Box::new(SwirlBurst),
        Box::new(NebulaWaves),
        Box::new(PulseRings),
        Box::new(ParticleField::new()),
        Box::new(LaserGrid),
        Box::new(EnergyVortex),
        Box::new(FractalBloom),
        Box::new(AuroraDrift),
        Box::new(RainfallLines),
        Box::new(MatrixDust::new()),
    ]
}

fn blank(ctx: &FrameCtx<'_>) -> bool {
    ctx.w < 1.0 || ctx.h < 1.0
}

/// Wrap a coordinate into [0, extent).
fn wrap_coord(v: f32, extent: f32) -> f32 {
    if extent <= 0.0 {
        return 0.0;
    }
    let r = v.rem_euclid(extent);
    if r >= extent { 0.0 } else { r }
}

// ── swirl ───────────────────────────────────────────────────────────────────

const SWIRL_SPOKES: usize = 160;

struct SwirlBurst;

impl Mode for SwirlBurst {
    fn kind(&self) -> ModeKind {
        ModeKind::Swirl
    }

    fn draw(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) {
        if blank(ctx) {
            return;
        }
        let cx = ctx.w / 2.0;
        let cy = ctx.h / 2.0;
        for i in 0..SWIRL_SPOKES {
            let ang = i as f32 / SWIRL_SPOKES as f32 * TAU + ctx.t * 0.015;
            let vol = ctx.spectrum.level(i);
            let r = 80.0 + vol * 260.0;
            let color = palette::color(ctx.palette, i as i64);
            surface.stroke_line(cx, cy, cx + ang.cos() * r, cy + ang.sin() * r, color, 1.2, 1.0);
        }
    }
}

// ── nebula ──────────────────────────────────────────────────────────────────

const NEBULA_LINE_GAP: f32 = 115.0;
const NEBULA_MAX_AMP: f32 = 170.0;

struct NebulaWaves;

impl Mode for NebulaWaves {
    fn kind(&self) -> ModeKind {
        ModeKind::Nebula
    }

    fn draw(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) {
        if blank(ctx) {
            return;
        }
        let mut band = 0.0f32;
        while band < ctx.h {
            let v = ctx.spectrum.level((band / 2.0) as usize);
            let amp = NEBULA_MAX_AMP * (0.35 + v * 0.9);
            let color = palette::color(ctx.palette, (band as i64) >> 3);

            let mut prev: Option<(f32, f32)> = None;
            let mut x = 0.0f32;
            while x <= ctx.w + 60.0 {
                let wave1 = (x * 0.01 + ctx.t * 0.015 + band * 0.004).sin() * amp * 0.75;
                let wave2 = (x * 0.02 - ctx.t * 0.01 + band * 0.008).sin() * amp * 0.25;
                let yy = band + wave1 + wave2;
                match prev {
                    // Anchor the strand slightly off-canvas so it enters smoothly.
                    None => prev = Some((x - 30.0, yy)),
                    Some((px, py)) => {
                        surface.stroke_line(px, py, x, yy, color, 1.8, 0.6);
                        prev = Some((x, yy));
                    }
                }
                x += 8.0;
            }
            band += NEBULA_LINE_GAP;
        }
    }
}

// ── rings ───────────────────────────────────────────────────────────────────

const RING_COUNT: usize = 6;
const RING_BASE_RADIUS: f32 = 80.0;
const RING_STEP: f32 = 35.0;

struct PulseRings;

impl Mode for PulseRings {
    fn kind(&self) -> ModeKind {
        ModeKind::Rings
    }

    fn draw(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) {
        if blank(ctx) {
            return;
        }
        let cx = ctx.w / 2.0;
        let cy = ctx.h / 2.0;
        let base_r = RING_BASE_RADIUS + ctx.spectrum.loudness() * 0.9;
        for i in 0..RING_COUNT {
            let r = base_r + i as f32 * RING_STEP + (ctx.t * 0.02 + i as f32).sin() * 10.0;
            surface.stroke_circle(cx, cy, r, palette::color(ctx.palette, i as i64), 2.0, 1.0);
        }
    }
}

// ── particles ───────────────────────────────────────────────────────────────

const PARTICLE_COUNT: usize = 250;

struct Particle {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
}

struct ParticleField {
    pool: Vec<Particle>,
}

impl ParticleField {
    fn new() -> Self {
        Self { pool: Vec::new() }
    }

    fn seed(&mut self, w: f32, h: f32) {
        self.pool = (0..PARTICLE_COUNT)
            .map(|_| Particle {
                x: fastrand::f32() * w,
                y: fastrand::f32() * h,
                vx: (fastrand::f32() - 0.5) * 0.8,
                vy: (fastrand::f32() - 0.5) * 0.8,
            })
            .collect();
    }
}

impl Mode for ParticleField {
    fn kind(&self) -> ModeKind {
        ModeKind::Particles
    }

    fn on_resize(&mut self, w: f32, h: f32) {
        // Pool size never changes; carry entries into the new bounds.
        for p in &mut self.pool {
            p.x = wrap_coord(p.x, w);
            p.y = wrap_coord(p.y, h);
        }
    }

    fn draw(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) {
        if blank(ctx) {
            return;
        }
        if self.pool.is_empty() {
            self.seed(ctx.w, ctx.h);
        }

        let boost = ctx.spectrum.loudness() / 255.0;
        let speed = if ctx.reactive { boost * 8.0 } else { 1.0 };

        for p in &mut self.pool {
            p.x = wrap_coord(p.x + p.vx * speed, ctx.w);
            p.y = wrap_coord(p.y + p.vy * speed, ctx.h);
            let color = palette::color(ctx.palette, fastrand::usize(..3) as i64);
            surface.fill_rect(p.x, p.y, 2.2, 2.2, color, 1.0);
        }
    }
}

// ── grid ────────────────────────────────────────────────────────────────────

struct LaserGrid;

impl Mode for LaserGrid {
    fn kind(&self) -> ModeKind {
        ModeKind::Grid
    }

    fn draw(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) {
        if blank(ctx) {
            return;
        }
        let base = ctx.spectrum.loudness() / 255.0;
        let spacing = (50.0 + (ctx.t * 0.01).sin() * 10.0 + base * 40.0).max(1.0);
        let vertical = palette::color(ctx.palette, 0);
        let horizontal = palette::color(ctx.palette, 1);

        let mut x = 0.0f32;
        while x < ctx.w {
            surface.stroke_line(x, 0.0, x, ctx.h, vertical, 1.0, 1.0);
            x += spacing;
        }
        let mut y = 0.0f32;
        while y < ctx.h {
            surface.stroke_line(0.0, y, ctx.w, y, horizontal, 1.0, 1.0);
            y += spacing;
        }
    }
}

// ── vortex ──────────────────────────────────────────────────────────────────

const VORTEX_POINTS: usize = 220;

struct EnergyVortex;

impl Mode for EnergyVortex {
    fn kind(&self) -> ModeKind {
        ModeKind::Vortex
    }

    fn draw(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) {
        if blank(ctx) {
            return;
        }
        let cx = ctx.w / 2.0;
        let cy = ctx.h / 2.0;
        for i in 0..VORTEX_POINTS {
            let ang = i as f32 / VORTEX_POINTS as f32 * TAU + ctx.t * 0.02;
            let ripple = (ctx.t * 0.015 + i as f32 * 0.05).sin() * 40.0;
            let r = 50.0 + ripple + ctx.spectrum.level(i) * 120.0;
            surface.fill_circle(
                cx + ang.cos() * r,
                cy + ang.sin() * r,
                2.0,
                palette::color(ctx.palette, i as i64),
                1.0,
            );
        }
    }
}

// ── fractal ─────────────────────────────────────────────────────────────────

const BLOOM_DISCS: usize = 90;

struct FractalBloom;

impl Mode for FractalBloom {
    fn kind(&self) -> ModeKind {
        ModeKind::Fractal
    }

    fn draw(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) {
        if blank(ctx) {
            return;
        }
        let base = ctx.spectrum.loudness() / 255.0;
        for i in 0..BLOOM_DISCS {
            let x = ((i as f32 * 0.15 + ctx.t * 0.02).sin() * 0.5 + 0.5) * ctx.w;
            let y = ((i as f32 * 0.12 + ctx.t * 0.015).cos() * 0.5 + 0.5) * ctx.h;
            surface.fill_circle(
                x,
                y,
                50.0 + base * 200.0,
                palette::color(ctx.palette, i as i64),
                0.12 + base * 0.4,
            );
        }
    }
}

// ── aurora ──────────────────────────────────────────────────────────────────

struct AuroraDrift;

impl Mode for AuroraDrift {
    fn kind(&self) -> ModeKind {
        ModeKind::Aurora
    }

    fn draw(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) {
        if blank(ctx) {
            return;
        }
        let mut x = 0.0f32;
        while x < ctx.w {
            let xi = x as i64;
            let v = ctx.spectrum.level((xi >> 2) as usize);
            let y = ctx.h / 2.0 + (ctx.t * 0.015 + x * 0.01).sin() * 120.0 * v;
            surface.fill_rect(x, y, 4.0, 240.0 * v, palette::color(ctx.palette, xi >> 3), 1.0);
            x += 6.0;
        }
    }
}

// ── rain ────────────────────────────────────────────────────────────────────

struct RainfallLines;

impl Mode for RainfallLines {
    fn kind(&self) -> ModeKind {
        ModeKind::Rain
    }

    fn draw(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) {
        if blank(ctx) {
            return;
        }
        let mut x = 0.0f32;
        while x < ctx.w {
            let xi = x as i64;
            let speed = ctx.spectrum.level((xi >> 2) as usize) * 10.0 + 4.0;
            let y = (ctx.t * speed).rem_euclid(ctx.h);
            surface.stroke_line(x, y, x, y + 30.0, palette::color(ctx.palette, xi), 1.0, 1.0);
            x += 10.0;
        }
    }
}

// ── matrix ──────────────────────────────────────────────────────────────────

const DROP_COUNT: usize = 200;

struct MatrixDrop {
    x: f32,
    y: f32,
}

struct MatrixDust {
    pool: Vec<MatrixDrop>,
}

impl MatrixDust {
    fn new() -> Self {
        Self { pool: Vec::new() }
    }

    fn seed(&mut self, w: f32, h: f32) {
        self.pool = (0..DROP_COUNT)
            .map(|_| MatrixDrop {
                x: fastrand::f32() * w,
                y: fastrand::f32() * h,
            })
            .collect();
    }
}

impl Mode for MatrixDust {
    fn kind(&self) -> ModeKind {
        ModeKind::Matrix
    }

    fn on_resize(&mut self, w: f32, h: f32) {
        for d in &mut self.pool {
            d.x = wrap_coord(d.x, w);
            d.y = wrap_coord(d.y, h);
        }
    }

    fn draw(&mut self, ctx: &FrameCtx<'_>, surface: &mut dyn Surface) {
        if blank(ctx) {
            return;
        }
        if self.pool.is_empty() {
            self.seed(ctx.w, ctx.h);
        }

        let base = ctx.spectrum.loudness() / 255.0;
        for d in &mut self.pool {
            d.y += 4.0 + base * 20.0;
            // Recycle at the bottom edge: back to the top at a fresh column.
            if d.y >= ctx.h {
                d.y = 0.0;
                d.x = fastrand::f32() * ctx.w;
            }
            let color = palette::color(ctx.palette, fastrand::usize(..3) as i64);
            surface.fill_rect(d.x, d.y, 3.0, 12.0, color, 1.0);
        }
    }
}
