//! Sine tone example.
//!
//! Plays a 440 Hz tone on an ALSA device and logs how long each buffer took
//! to render, about once per second.
//!
//! Run with: cargo run --features alsa --example sine -- [DEVICE] [FORMAT] [SECONDS]
//!
//! FORMAT is an ALSA-style name such as `FLOAT_LE` or `S16_LE`. Without
//! SECONDS the tone plays until Ctrl+C.

use std::time::{Duration, Instant};

use pcm_pipe::{Playback, PlaybackEvent, SampleFormat, SineOscillator, DEFAULT_FREQUENCY};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 44_100;
const CHANNELS: u32 = 1;
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Per-buffer render timing, reported periodically.
struct RenderTimer {
    started: Instant,
    last_call: Instant,
    last_report: Instant,
}

impl RenderTimer {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_call: now,
            last_report: now,
        }
    }

    fn record(&mut self, render_start: Instant, samples: usize) {
        let end = Instant::now();
        let dt = render_start - self.last_call;
        self.last_call = render_start;

        if end - self.last_report >= REPORT_INTERVAL {
            let rt = end - render_start;
            tracing::info!(
                "time: {:.3}s  dt: {:.6}s  rt: {}ns ({}ns/sample, {} samples)",
                (end - self.started).as_secs_f64(),
                dt.as_secs_f64(),
                rt.as_nanos(),
                rt.as_nanos() / samples.max(1) as u128,
                samples
            );
            self.last_report = end;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let device = args.next().unwrap_or_else(|| pcm_pipe::DEFAULT_DEVICE.to_string());
    let format: SampleFormat = match args.next() {
        Some(name) => name.parse()?,
        None => SampleFormat::FloatLe,
    };
    let seconds: Option<f64> = args.next().map(|s| s.parse()).transpose()?;

    if let Some(name) = pcm_pipe::default_output_device_name() {
        println!("Default output device: {name}");
    }
    println!(
        "Playing {DEFAULT_FREQUENCY} Hz on '{device}' ({format}, {SAMPLE_RATE} Hz, mono)"
    );

    let total_frames = seconds.map(|s| (s * f64::from(SAMPLE_RATE)) as u64);
    let mut frames_played = 0u64;
    let mut osc = SineOscillator::new(DEFAULT_FREQUENCY, SAMPLE_RATE);
    let mut timer = RenderTimer::new();

    let stats = Playback::builder()
        .device(device)
        .channels(CHANNELS)
        .sample_rate(SAMPLE_RATE)
        .format(format)
        .on_event(|event| match event {
            PlaybackEvent::WriteFailed { attempt, error } => {
                tracing::warn!(attempt, %error, "write failed");
            }
            PlaybackEvent::PeriodDropped { slot, error } => {
                tracing::error!(slot, %error, "period dropped");
            }
            other => tracing::debug!(?other, "playback event"),
        })
        .play(|buf: &mut [u8]| {
            let start = Instant::now();
            let frames = osc.fill(buf, format, CHANNELS as usize);
            timer.record(start, frames * CHANNELS as usize);

            frames_played += frames as u64;
            total_frames.is_some_and(|total| frames_played >= total)
        })?;

    println!("Stats: {stats:?}");
    Ok(())
}
