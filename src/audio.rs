use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use ringbuf::HeapRb;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::TAU;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const BIN_COUNT: usize = 128;

const FFT_SIZE: usize = 256;
const HOP: usize = 128;
// Web-Audio-style byte scaling: per-bin time smoothing, then dB mapped
// from [-100, -30] onto 0..255.
const SMOOTHING: f32 = 0.8;
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// One frame's worth of spectral magnitudes, one byte per frequency bin.
#[derive(Clone, Copy, Debug)]
pub struct FrequencySnapshot {
    pub bins: [u8; BIN_COUNT],
}

impl Default for FrequencySnapshot {
    fn default() -> Self {
        Self { bins: [0; BIN_COUNT] }
    }
}

impl FrequencySnapshot {
    /// Normalized energy at bin `i`, with the index wrapped so callers may
    /// sample with unbounded counters.
    pub fn level(&self, i: usize) -> f32 {
        self.bins[i % BIN_COUNT] as f32 / 255.0
    }

    /// Arithmetic mean over all bins, in byte units (0..255).
    pub fn loudness(&self) -> f32 {
        let sum: u32 = self.bins.iter().map(|&b| b as u32).sum();
        sum as f32 / BIN_COUNT as f32
    }
}

/// Seqlock publishing the analyzer's latest spectrum to the render thread.
/// Bins are packed four-per-word; an odd sequence count marks a write in
/// progress.
pub struct AtomicSpectrum {
    seq: AtomicU64,
    words: [AtomicU32; BIN_COUNT / 4],
    updated_ms: AtomicU64,
}

impl AtomicSpectrum {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            words: std::array::from_fn(|_| AtomicU32::new(0)),
            updated_ms: AtomicU64::new(0),
        }
    }

    pub fn store(&self, snap: FrequencySnapshot) {
        self.seq.fetch_add(1, Ordering::Release);
        for (dst, chunk) in self.words.iter().zip(snap.bins.chunks_exact(4)) {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            dst.store(word, Ordering::Relaxed);
        }
        self.updated_ms.store(now_ms(), Ordering::Relaxed);
        self.seq.fetch_add(1, Ordering::Release);
    }

    pub fn load(&self) -> FrequencySnapshot {
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                continue;
            }

            let mut snap = FrequencySnapshot::default();
            for (i, src) in self.words.iter().enumerate() {
                let bytes = src.load(Ordering::Relaxed).to_le_bytes();
                snap.bins[i * 4..i * 4 + 4].copy_from_slice(&bytes);
            }

            let v2 = self.seq.load(Ordering::Acquire);
            if v1 == v2 {
                return snap;
            }
        }
    }

    /// False until the analyzer has published at least once.
    pub fn has_data(&self) -> bool {
        self.updated_ms.load(Ordering::Relaxed) != 0
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_millis(0))
        .as_millis() as u64
}

pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

/// Capture stream plus its analyzer thread. Held alive for the process
/// lifetime; dropping stops the analyzer and releases the device.
pub struct AudioTap {
    _stream: cpal::Stream,
    stop: Arc<AtomicBool>,
    analyzer_handle: Option<thread::JoinHandle<()>>,
    spectrum: Arc<AtomicSpectrum>,
    pub sample_rate_hz: u32,
}

impl AudioTap {
    pub fn start(device_query: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_input_device(&host, device_query)?;
        let supported = device
            .default_input_config()
            .context("get default input config")?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();

        let rb_capacity = (sample_rate_hz as usize).saturating_mul(4);
        let rb = HeapRb::<f32>::new(rb_capacity);
        let (mut prod, mut cons) = rb.split();

        let stop = Arc::new(AtomicBool::new(false));
        let spectrum = Arc::new(AtomicSpectrum::new());
        let spectrum_for_thread = Arc::clone(&spectrum);
        let stop_for_thread = Arc::clone(&stop);

        let err_fn = |err| eprintln!("audio stream error: {err}");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };

        stream.play().context("start input stream")?;

        let analyzer_handle = thread::spawn(move || {
            analyze_loop(&mut cons, &stop_for_thread, &spectrum_for_thread)
        });

        Ok(Self {
            _stream: stream,
            stop,
            analyzer_handle: Some(analyzer_handle),
            spectrum,
            sample_rate_hz,
        })
    }

    pub fn snapshot(&self) -> Option<FrequencySnapshot> {
        if self.spectrum.has_data() {
            Some(self.spectrum.load())
        } else {
            None
        }
    }
}

impl Drop for AudioTap {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.analyzer_handle.take() {
            let _ = h.join();
        }
    }
}

/// Deferred, idempotent wrapper around the capture graph. The render loop
/// calls `ensure_started` on its first tick; repeat calls are no-ops, and
/// `snapshot` answers `None` until the analyzer has produced data.
pub struct AudioLink {
    tap: Option<AudioTap>,
    device_query: Option<String>,
}

impl AudioLink {
    pub fn new(device_query: Option<String>) -> Self {
        Self {
            tap: None,
            device_query,
        }
    }

    pub fn ensure_started(&mut self) -> anyhow::Result<()> {
        if self.tap.is_some() {
            return Ok(());
        }
        self.tap = Some(AudioTap::start(self.device_query.as_deref())?);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.tap.is_some()
    }

    pub fn snapshot(&self) -> Option<FrequencySnapshot> {
        self.tap.as_ref()?.snapshot()
    }
}

fn select_input_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> anyhow::Result<cpal::Device> {
    let devices = host
        .input_devices()
        .context("enumerate input devices")?
        .collect::<Vec<_>>();

    let want = device_query.map(|s| s.to_lowercase());
    if let Some(want) = want.as_deref() {
        if let Some(dev) = devices.iter().find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(want))
                .unwrap_or(false)
        }) {
            return Ok(dev.clone());
        }
        return Err(anyhow!("no input device matching: {want}"));
    }

    host.default_input_device()
        .ok_or_else(|| anyhow!("no default input device found"))
}

fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    for frame in data.chunks(channels) {
        let mut acc = 0.0f32;
        for s in frame {
            acc += (*s).to_float_sample();
        }
        let mono = acc / channels as f32;
        let _ = prod.try_push(mono);
    }
}

fn analyze_loop(
    cons: &mut ringbuf::HeapCons<f32>,
    stop: &AtomicBool,
    spectrum: &AtomicSpectrum,
) {
    let n = FFT_SIZE;

    let mut scratch = vec![0.0f32; n];
    let mut write_pos = 0usize;
    let mut filled = 0usize;
    let mut since_last = 0usize;

    let hann = (0..n)
        .map(|i| 0.5 - 0.5 * ((TAU * i as f32) / n as f32).cos())
        .collect::<Vec<_>>();
    let window_gain: f32 = hann.iter().sum::<f32>().max(1e-6);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n);
    let mut fft_buf = vec![Complex { re: 0.0, im: 0.0 }; n];
    let mut smoothed = [0.0f32; BIN_COUNT];

    while !stop.load(Ordering::Relaxed) {
        let mut got_any = false;
        while let Some(s) = cons.try_pop() {
            got_any = true;
            scratch[write_pos] = s;
            write_pos = (write_pos + 1) % n;
            if filled < n {
                filled += 1;
            }
            since_last += 1;
            if filled == n && since_last >= HOP {
                since_last = 0;
                for i in 0..n {
                    let s = scratch[(write_pos + i) % n];
                    fft_buf[i].re = s * hann[i];
                    fft_buf[i].im = 0.0;
                }
                fft.process(&mut fft_buf);

                let mut snap = FrequencySnapshot::default();
                for (k, bin) in snap.bins.iter_mut().enumerate() {
                    let c = fft_buf[k];
                    let mag = (c.re * c.re + c.im * c.im).sqrt() * 2.0 / window_gain;
                    smoothed[k] = smoothed[k] * SMOOTHING + mag * (1.0 - SMOOTHING);
                    let db = 20.0 * smoothed[k].max(1e-10).log10();
                    let v = (db - MIN_DB) / (MAX_DB - MIN_DB);
                    *bin = (v.clamp(0.0, 1.0) * 255.0) as u8;
                }
                spectrum.store(snap);
            }
        }

        if !got_any {
            thread::sleep(Duration::from_millis(1));
        }
    }
}
