use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = pulse_canvas::config::Config::parse();
    if cfg.list_devices {
        pulse_canvas::audio::list_input_devices()?;
        return Ok(());
    }

    pulse_canvas::app::run(cfg)
}
