use crate::audio::AudioLink;
use crate::config::{Config, RendererMode};
use crate::lyrics::LyricSheet;
use crate::palette::{PaletteBank, PALETTES};
use crate::render::{AsciiRenderer, Frame, HalfBlockRenderer, Renderer};
use crate::scene::{FrameInput, ModeKind, SceneEngine};
use crate::terminal::TerminalGuard;
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::BufWriter;
use std::time::{Duration, Instant};

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());

    let mut renderer: Box<dyn Renderer> = match cfg.renderer {
        RendererMode::Ascii => Box::new(AsciiRenderer::new()),
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
    };
    let (px_w_mul, px_h_mul) = match cfg.renderer {
        RendererMode::Ascii => (1usize, 1usize),
        RendererMode::HalfBlock => (1usize, 2usize),
    };

    let lyrics = match cfg.lyrics_file.as_deref() {
        Some(path) => {
            Some(LyricSheet::load(path).with_context(|| format!("load lyrics {path}"))?)
        }
        None => None,
    };
    let lyric_duration = cfg
        .lyrics_duration_s
        .or_else(|| lyrics.as_ref().map(LyricSheet::natural_duration_s));

    let initial = ModeKind::from_name(&cfg.mode).unwrap_or(ModeKind::Swirl);
    let start = Instant::now();
    let mut engine = SceneEngine::new(initial, start);
    let mut palettes = PaletteBank::new(cfg.palette);
    let mut auto_cycle = cfg.auto_cycle;
    let mut hypnotic = cfg.hypnotic;
    let mut reactive = cfg.reactive;

    let mut audio = AudioLink::new(cfg.device.clone());
    let mut audio_note: Option<String> = None;

    let mut last_size = crossterm::terminal::size().context("get terminal size")?;
    if last_size.0 < 4 || last_size.1 < 2 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            last_size.0,
            last_size.1
        ));
    }

    let mut show_hud = true;
    let mut show_help = false;
    let mut fps = FpsCounter::new();

    loop {
        let now = Instant::now();

        // Drain input events; they run strictly between frames.
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    if handle_key(
                        k.code,
                        k.modifiers,
                        &mut engine,
                        &mut palettes,
                        &mut auto_cycle,
                        &mut hypnotic,
                        &mut reactive,
                        &mut show_hud,
                        &mut show_help,
                    ) {
                        return Ok(());
                    }
                }
                Event::Resize(c, r) => {
                    last_size = (c, r);
                }
                _ => {}
            }
        }

        // Resize events can be missed in some terminals; never draw a frame
        // against a stale size.
        let sz = crossterm::terminal::size()?;
        if sz != last_size {
            last_size = sz;
        }
        let (term_cols, term_rows) = last_size;
        let hud_rows: u16 = if show_hud { 1 } else { 0 };
        let visual_rows = term_rows.saturating_sub(hud_rows).max(1);
        let w = (term_cols as usize).saturating_mul(px_w_mul);
        let h = (visual_rows as usize).saturating_mul(px_h_mul);
        engine.resize(w, h);

        // Deferred analyzer construction, attempted once. A failed device is
        // reported in the HUD and the engine runs on silent (zero) spectra.
        if !audio.is_started() && audio_note.is_none() {
            if let Err(err) = audio.ensure_started() {
                audio_note = Some(format!("audio off: {err:#}"));
            }
        }
        let snapshot = audio.snapshot().unwrap_or_default();
        let loudness = snapshot.loudness();

        // HUD state is read before advance, which borrows the engine for the
        // returned pixel slice.
        let mode_label = engine.active_mode().label();
        let target_label = engine.target_mode().label();
        let transitioning = engine.is_transitioning();
        let progress = engine.transition_progress();

        let input = FrameInput {
            palette: palettes.selected(),
            auto_cycle,
            hypnotic,
            reactive,
        };
        let pixels = engine.advance(now, &snapshot, input);

        fps.tick();

        let lyric_line = match (&lyrics, lyric_duration) {
            (Some(sheet), Some(duration)) => {
                let t_s = now.duration_since(start).as_secs_f32() + cfg.lyrics_offset_ms / 1000.0;
                sheet.current_line(t_s, duration)
            }
            _ => None,
        };

        let hud = if show_hud {
            build_hud(
                mode_label,
                transitioning,
                target_label,
                progress,
                palettes.resolved(),
                auto_cycle,
                hypnotic,
                reactive,
                fps.fps(),
                loudness,
                audio_note.as_deref(),
                lyric_line,
            )
        } else {
            String::new()
        };
        let overlay = show_help.then_some(HELP_TEXT);

        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows,
            pixel_width: w,
            pixel_height: h,
            pixels_rgba: pixels,
            hud: &hud,
            hud_rows,
            overlay,
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, &mut out)?;

        // Frame pacing.
        let target = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);
        let elapsed = now.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

const HELP_TEXT: &str = "pulse-canvas keys\n\
\n\
left/right  previous / next mode\n\
1..8        select palette\n\
a           toggle auto-cycle (20s)\n\
h           toggle hypnotic drift\n\
r           toggle reactive boost\n\
i           toggle HUD\n\
?           toggle this help\n\
q / esc     quit";

fn handle_key(
    code: KeyCode,
    mods: KeyModifiers,
    engine: &mut SceneEngine,
    palettes: &mut PaletteBank,
    auto_cycle: &mut bool,
    hypnotic: &mut bool,
    reactive: &mut bool,
    show_hud: &mut bool,
    show_help: &mut bool,
) -> bool {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return true;
    }

    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Right => {
            let next = engine.active_mode().next();
            engine.select_kind(next);
            false
        }
        KeyCode::Left => {
            let prev = engine.active_mode().prev();
            engine.select_kind(prev);
            false
        }
        KeyCode::Char(c @ '1'..='8') => {
            palettes.select(c as usize - '1' as usize);
            false
        }
        KeyCode::Char('a') | KeyCode::Char('A') => {
            *auto_cycle = !*auto_cycle;
            false
        }
        KeyCode::Char('h') | KeyCode::Char('H') => {
            *hypnotic = !*hypnotic;
            false
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            *reactive = !*reactive;
            false
        }
        KeyCode::Char('i') | KeyCode::Char('I') => {
            *show_hud = !*show_hud;
            false
        }
        KeyCode::Char('?') | KeyCode::Char('/') | KeyCode::F(1) => {
            *show_help = !*show_help;
            false
        }
        _ => false,
    }
}

fn build_hud(
    mode_label: &str,
    transitioning: bool,
    target_label: &str,
    progress: f32,
    palette_index: usize,
    auto_cycle: bool,
    hypnotic: bool,
    reactive: bool,
    fps: f32,
    loudness: f32,
    audio_note: Option<&str>,
    lyric_line: Option<&str>,
) -> String {
    let mode = if transitioning {
        format!("{mode_label}>{target_label} {:>3.0}%", progress * 100.0)
    } else {
        mode_label.to_string()
    };

    let flag = |on: bool| if on { "on" } else { "off" };
    let mut hud = format!(
        "{mode} | pal {}/{} | cycle {} | hypno {} | react {} | {:>5.1} fps | vol {:>3.0}",
        palette_index + 1,
        PALETTES.len(),
        flag(auto_cycle),
        flag(hypnotic),
        flag(reactive),
        fps,
        loudness,
    );
    if let Some(note) = audio_note {
        hud.push_str(" | ");
        hud.push_str(note);
    }
    if let Some(line) = lyric_line {
        hud.push_str(" | ");
        hud.push_str(line);
    }
    hud
}

struct FpsCounter {
    frames: u32,
    window_start: Instant,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            window_start: Instant::now(),
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_millis(500) {
            self.fps = self.frames as f32 / elapsed.as_secs_f32();
            self.frames = 0;
            self.window_start = Instant::now();
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
