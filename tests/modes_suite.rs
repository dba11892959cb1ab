use pulse_canvas::audio::FrequencySnapshot;
use pulse_canvas::canvas::{PixelCanvas, Surface};
use pulse_canvas::palette::Rgb;
use pulse_canvas::scene::{build_modes, FrameCtx, Mode, ModeKind};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cmd {
    Rect { x: f32, y: f32, w: f32, h: f32 },
    Line { x0: f32, y0: f32, x1: f32, y1: f32 },
    Circle { cx: f32, cy: f32, r: f32 },
    Disc { cx: f32, cy: f32, r: f32 },
}

/// Captures issued draw commands instead of rasterizing them.
struct RecordingSurface {
    cmds: Vec<Cmd>,
}

impl RecordingSurface {
    fn new() -> Self {
        Self { cmds: Vec::new() }
    }
}

impl Surface for RecordingSurface {
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, _color: Rgb, _alpha: f32) {
        self.cmds.push(Cmd::Rect { x, y, w, h });
    }

    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, _color: Rgb, _width: f32, _alpha: f32) {
        self.cmds.push(Cmd::Line { x0, y0, x1, y1 });
    }

    fn stroke_circle(&mut self, cx: f32, cy: f32, r: f32, _color: Rgb, _width: f32, _alpha: f32) {
        self.cmds.push(Cmd::Circle { cx, cy, r });
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, _color: Rgb, _alpha: f32) {
        self.cmds.push(Cmd::Disc { cx, cy, r });
    }
}

fn ctx<'a>(t: f32, spectrum: &'a FrequencySnapshot, w: f32, h: f32) -> FrameCtx<'a> {
    FrameCtx {
        t,
        spectrum,
        palette: 0,
        w,
        h,
        reactive: false,
    }
}

fn flat_spectrum(level: u8) -> FrequencySnapshot {
    FrequencySnapshot { bins: [level; 128] }
}

fn find_mode(modes: &mut [Box<dyn Mode>], kind: ModeKind) -> &mut Box<dyn Mode> {
    modes
        .iter_mut()
        .find(|m| m.kind() == kind)
        .expect("missing catalogue mode")
}

fn has_non_black(buf: &[u8]) -> bool {
    buf.chunks_exact(4)
        .any(|px| px[0] != 0 || px[1] != 0 || px[2] != 0)
}

#[test]
fn catalogue_has_one_mode_per_kind_in_order() {
    let modes = build_modes();
    let kinds = modes.iter().map(|m| m.kind()).collect::<Vec<_>>();
    assert_eq!(kinds, ModeKind::all().to_vec());
}

#[test]
fn every_mode_paints_something_on_a_real_canvas() {
    let spectrum = flat_spectrum(150);
    let mut modes = build_modes();
    for m in modes.iter_mut() {
        let mut canvas = PixelCanvas::new(400, 300);
        for f in 0..8 {
            let c = ctx(f as f32, &spectrum, 400.0, 300.0);
            m.draw(&c, &mut canvas);
        }
        assert!(
            has_non_black(canvas.pixels()),
            "mode '{}' stayed fully black",
            m.kind().label()
        );
    }
}

#[test]
fn every_mode_tolerates_silence_and_zero_area() {
    let silence = FrequencySnapshot::default();
    let mut modes = build_modes();
    for m in modes.iter_mut() {
        // Zero-area canvas: skip drawing entirely, never panic.
        let mut surface = RecordingSurface::new();
        let c = ctx(5.0, &silence, 0.0, 0.0);
        m.draw(&c, &mut surface);
        assert!(
            surface.cmds.is_empty(),
            "mode '{}' drew on a zero-area canvas",
            m.kind().label()
        );

        // Silent audio on a real area: minimum-energy visual, no panic.
        let mut surface = RecordingSurface::new();
        let c = ctx(5.0, &silence, 320.0, 200.0);
        m.draw(&c, &mut surface);
    }
}

#[test]
fn rings_at_zero_loudness_issues_six_growing_circles_from_base_80() {
    let silence = FrequencySnapshot::default();
    let mut modes = build_modes();
    let rings = find_mode(&mut modes, ModeKind::Rings);

    let mut surface = RecordingSurface::new();
    rings.draw(&ctx(0.0, &silence, 800.0, 600.0), &mut surface);

    let circles = surface
        .cmds
        .iter()
        .filter_map(|c| match c {
            Cmd::Circle { cx, cy, r } => Some((*cx, *cy, *r)),
            _ => None,
        })
        .collect::<Vec<_>>();

    assert_eq!(circles.len(), 6);
    for &(cx, cy, _) in &circles {
        assert_eq!((cx, cy), (400.0, 300.0));
    }
    assert!((circles[0].2 - 80.0).abs() < 1e-4, "base radius was {}", circles[0].2);
    for pair in circles.windows(2) {
        assert!(
            pair[1].2 > pair[0].2,
            "ring radii not increasing: {} -> {}",
            pair[0].2,
            pair[1].2
        );
    }
}

#[test]
fn swirl_issues_160_spokes_from_the_center() {
    let spectrum = flat_spectrum(90);
    let mut modes = build_modes();
    let swirl = find_mode(&mut modes, ModeKind::Swirl);

    let mut surface = RecordingSurface::new();
    swirl.draw(&ctx(12.0, &spectrum, 640.0, 480.0), &mut surface);

    let lines = surface
        .cmds
        .iter()
        .filter_map(|c| match c {
            Cmd::Line { x0, y0, .. } => Some((*x0, *y0)),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(lines.len(), 160);
    for &(x0, y0) in &lines {
        assert_eq!((x0, y0), (320.0, 240.0));
    }
}

#[test]
fn particle_pool_keeps_cardinality_and_bounds() {
    let w = 120.0f32;
    let h = 80.0f32;
    let spectrum = flat_spectrum(255);
    let mut modes = build_modes();
    let particles = find_mode(&mut modes, ModeKind::Particles);

    for f in 0..400 {
        let mut surface = RecordingSurface::new();
        let c = FrameCtx {
            t: f as f32,
            spectrum: &spectrum,
            palette: 0,
            w,
            h,
            // Reactive boost at full loudness: velocity x8, the worst case
            // for wraparound handling.
            reactive: true,
        };
        particles.draw(&c, &mut surface);

        let rects = surface
            .cmds
            .iter()
            .filter_map(|c| match c {
                Cmd::Rect { x, y, .. } => Some((*x, *y)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(rects.len(), 250, "frame {f}: pool size changed");
        for &(x, y) in &rects {
            assert!((0.0..w).contains(&x), "frame {f}: particle x={x} out of range");
            assert!((0.0..h).contains(&y), "frame {f}: particle y={y} out of range");
        }
    }
}

#[test]
fn particle_pool_survives_a_shrinking_resize() {
    let spectrum = flat_spectrum(120);
    let mut modes = build_modes();
    let particles = find_mode(&mut modes, ModeKind::Particles);

    let mut surface = RecordingSurface::new();
    particles.draw(&ctx(0.0, &spectrum, 300.0, 200.0), &mut surface);

    particles.on_resize(100.0, 50.0);

    let mut surface = RecordingSurface::new();
    particles.draw(&ctx(1.0, &spectrum, 100.0, 50.0), &mut surface);
    let rects = surface
        .cmds
        .iter()
        .filter_map(|c| match c {
            Cmd::Rect { x, y, .. } => Some((*x, *y)),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(rects.len(), 250);
    for &(x, y) in &rects {
        assert!((0.0..100.0).contains(&x));
        assert!((0.0..50.0).contains(&y));
    }
}

#[test]
fn matrix_drops_recycle_without_leaving_the_canvas() {
    let w = 200.0f32;
    let h = 120.0f32;
    let spectrum = flat_spectrum(255);
    let mut modes = build_modes();
    let matrix = find_mode(&mut modes, ModeKind::Matrix);

    for f in 0..300 {
        let mut surface = RecordingSurface::new();
        matrix.draw(&ctx(f as f32, &spectrum, w, h), &mut surface);

        let rects = surface
            .cmds
            .iter()
            .filter_map(|c| match c {
                Cmd::Rect { x, y, .. } => Some((*x, *y)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(rects.len(), 200, "frame {f}: drop pool size changed");
        for &(x, y) in &rects {
            assert!((0.0..w).contains(&x), "frame {f}: drop x={x} out of range");
            assert!((0.0..h).contains(&y), "frame {f}: drop y={y} out of range");
        }
    }
}

#[test]
fn grid_line_count_follows_spacing_at_silence() {
    let silence = FrequencySnapshot::default();
    let mut modes = build_modes();
    let grid = find_mode(&mut modes, ModeKind::Grid);

    // t = 0 and zero loudness: spacing is exactly 50.
    let mut surface = RecordingSurface::new();
    grid.draw(&ctx(0.0, &silence, 200.0, 100.0), &mut surface);

    let lines = surface
        .cmds
        .iter()
        .filter(|c| matches!(c, Cmd::Line { .. }))
        .count();
    // Verticals at x = 0, 50, 100, 150; horizontals at y = 0, 50.
    assert_eq!(lines, 6);
}

#[test]
fn vortex_issues_220_discs() {
    let spectrum = flat_spectrum(100);
    let mut modes = build_modes();
    let vortex = find_mode(&mut modes, ModeKind::Vortex);

    let mut surface = RecordingSurface::new();
    vortex.draw(&ctx(7.0, &spectrum, 640.0, 480.0), &mut surface);

    let discs = surface
        .cmds
        .iter()
        .filter(|c| matches!(c, Cmd::Disc { .. }))
        .count();
    assert_eq!(discs, 220);
}

#[test]
fn rain_streaks_stay_inside_the_vertical_wrap() {
    let spectrum = flat_spectrum(200);
    let mut modes = build_modes();
    let rain = find_mode(&mut modes, ModeKind::Rain);

    for f in [0u32, 17, 255, 4096] {
        let mut surface = RecordingSurface::new();
        rain.draw(&ctx(f as f32, &spectrum, 300.0, 150.0), &mut surface);
        for c in &surface.cmds {
            if let Cmd::Line { y0, .. } = c {
                assert!((0.0..150.0).contains(y0), "t={f}: streak start y={y0}");
            }
        }
    }
}
