use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(name = "pulse-canvas", version, about = "Audio-reactive terminal visual engine (10 modes, palettes, bloom trails)")]
pub struct Config {
    /// Starting visual mode (swirl, nebula, rings, particles, grid, vortex,
    /// fractal, aurora, rain, matrix). Unknown names fall back to swirl.
    #[arg(long, default_value = "swirl")]
    pub mode: String,

    /// Starting palette index. Any value is accepted; it is normalized
    /// against the palette count when colors are read.
    #[arg(long, default_value_t = 0)]
    pub palette: usize,

    #[arg(long, default_value_t = false)]
    pub auto_cycle: bool,

    #[arg(long, default_value_t = false)]
    pub hypnotic: bool,

    #[arg(long, default_value_t = false)]
    pub reactive: bool,

    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Substring match against input device names; default device otherwise.
    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    /// Plain text lyric sheet, one line per lyric.
    #[arg(long)]
    pub lyrics_file: Option<String>,

    #[arg(long, default_value_t = 0.0)]
    pub lyrics_offset_ms: f32,

    /// Track length used to pace the lyric highlight; derived from the
    /// sheet's line count when not given.
    #[arg(long)]
    pub lyrics_duration_s: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
}
