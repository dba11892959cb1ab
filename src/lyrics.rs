use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

// Duration-based pacing: lines are spread evenly across the track, shifted
// earlier by the lead so the highlight lands ahead of the vocal.
const START_OFFSET_S: f32 = 1.5;
const TAIL_HOLD_S: f32 = 1.5;
const LEAD_S: f32 = 4.0;
const LINE_CADENCE_S: f32 = 2.4;

/// A plain lyric sheet: one line per lyric, highlighted by playback position.
#[derive(Clone, Debug)]
pub struct LyricSheet {
    lines: Vec<String>,
}

impl LyricSheet {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw =
            fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
        Self::parse(&raw)
    }

    pub fn parse(input: &str) -> Result<Self> {
        let lines = input
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();

        if lines.is_empty() {
            return Err(anyhow!("no lyric lines found"));
        }

        Ok(Self { lines })
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Fallback track length when the caller has none: a fixed cadence per
    /// line plus the start/tail margins.
    pub fn natural_duration_s(&self) -> f32 {
        START_OFFSET_S + self.lines.len() as f32 * LINE_CADENCE_S + TAIL_HOLD_S
    }

    /// Active line at playback time `t_s` within a track of `duration_s`, or
    /// `None` before the first line is due. The last line holds through the
    /// tail of the track.
    pub fn current_index(&self, t_s: f32, duration_s: f32) -> Option<usize> {
        if self.lines.is_empty() || !duration_s.is_finite() || duration_s <= 0.0 {
            return None;
        }

        let effective = t_s + LEAD_S;
        if effective < START_OFFSET_S {
            return None;
        }

        let start = START_OFFSET_S;
        let end = (duration_s - TAIL_HOLD_S).max(start + 1.0);
        let clamped = effective.clamp(start, end);
        let progress = (clamped - start) / (end - start);

        let idx = (progress * self.lines.len() as f32) as usize;
        Some(idx.min(self.lines.len() - 1))
    }

    pub fn current_line(&self, t_s: f32, duration_s: f32) -> Option<&str> {
        let idx = self.current_index(t_s, duration_s)?;
        self.lines.get(idx).map(String::as_str)
    }
}
