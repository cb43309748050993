use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Source};
use std::f32::consts::PI;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const SAMPLE_RATE: u32 = 44_100;

/// Exponential ramp from `from` to `to` at fraction `frac` of the ramp,
/// mirroring an audio-rate exponentialRampToValueAtTime.
fn exp_ramp(from: f32, to: f32, frac: f32) -> f32 {
    from * (to / from).powf(frac.clamp(0.0, 1.0))
}

/// One-pole smoothing filter; the primitive behind the low/high/band-pass
/// shaping in the synthesized events.
#[derive(Default)]
struct OnePole {
    state: f32,
}

impl OnePole {
    fn coefficient(cutoff_hz: f32) -> f32 {
        1.0 - (-2.0 * PI * cutoff_hz / SAMPLE_RATE as f32).exp()
    }

    fn lowpass(&mut self, input: f32, coeff: f32) -> f32 {
        self.state += coeff * (input - self.state);
        self.state
    }

    fn highpass(&mut self, input: f32, coeff: f32) -> f32 {
        input - self.lowpass(input, coeff)
    }
}

fn white() -> f32 {
    fastrand::f32() * 2.0 - 1.0
}

/// Launch whoosh: sine swept 150 -> 600 Hz plus a bandpass noise layer swept
/// 400 -> 1200 Hz, both under a short attack and exponential release.
fn synth_launch() -> Vec<f32> {
    let duration = 0.5;
    let len = (SAMPLE_RATE as f32 * duration) as usize;
    let dt = 1.0 / SAMPLE_RATE as f32;

    let mut phase = 0.0f32;
    let mut band_low = OnePole::default();
    let mut band_high = OnePole::default();

    (0..len)
        .map(|i| {
            let t = i as f32 * dt;
            let envelope = if t < 0.1 {
                t / 0.1
            } else {
                exp_ramp(1.0, 0.01, (t - 0.1) / (duration - 0.1))
            };

            let freq = exp_ramp(150.0, 600.0, t / duration);
            phase += 2.0 * PI * freq * dt;
            let tone = phase.sin() * 0.1;

            let center = exp_ramp(400.0, 1200.0, t / duration);
            let passed = band_low.lowpass(
                band_high.highpass(white(), OnePole::coefficient(center / 1.5)),
                OnePole::coefficient(center * 1.5),
            );
            let noise = passed * 0.05;

            (tone + noise) * envelope
        })
        .collect()
}

/// Explosion triple: low thud sweep, a short filtered crack, and a long
/// rumble whose lowpass cutoff falls from 800 to 50 Hz.
fn synth_explosion(intensity: f32) -> Vec<f32> {
    // A zero intensity would degenerate the exponential gain ramps
    let intensity = intensity.max(0.01);
    let duration = 2.0;
    let len = (SAMPLE_RATE as f32 * duration) as usize;
    let dt = 1.0 / SAMPLE_RATE as f32;

    let mut phase = 0.0f32;
    let mut crack_filter = OnePole::default();
    let crack_coeff = OnePole::coefficient(3000.0);
    let mut rumble_filter = OnePole::default();

    (0..len)
        .map(|i| {
            let t = i as f32 * dt;
            let mut sample = 0.0;

            // Thud: 120 -> 40 Hz over 150 ms, gone by 200 ms
            if t < 0.2 {
                let freq = exp_ramp(120.0, 40.0, t / 0.15);
                phase += 2.0 * PI * freq * dt;
                sample += phase.sin() * exp_ramp(0.8 * intensity, 0.01, t / 0.2);
            }

            // Crack: bright noise burst, gone by 100 ms
            if t < 0.1 {
                sample += crack_filter.lowpass(white(), crack_coeff)
                    * exp_ramp(0.5 * intensity, 0.01, t / 0.1);
            }

            // Rumble: darkening noise tail over the full two seconds
            let cutoff = exp_ramp(800.0, 50.0, t / 1.5);
            sample += rumble_filter.lowpass(white(), OnePole::coefficient(cutoff))
                * exp_ramp(0.4 * intensity, 0.001, t / duration);

            sample.clamp(-1.0, 1.0)
        })
        .collect()
}

/// Crackle: a small cluster of randomized highpass pops inside 450 ms.
fn synth_crackle() -> Vec<f32> {
    let pop_duration = 0.05;
    let len = (SAMPLE_RATE as f32 * 0.5) as usize;
    let pop_len = (SAMPLE_RATE as f32 * pop_duration) as usize;
    let mut buffer = vec![0.0f32; len];

    let count = 4 + fastrand::usize(0..4);
    for _ in 0..count {
        let offset = (fastrand::f32() * 0.4 * SAMPLE_RATE as f32) as usize;
        let coeff = OnePole::coefficient(1000.0 + fastrand::f32() * 1000.0);
        let mut filter = OnePole::default();
        for i in 0..pop_len.min(len - offset) {
            let frac = i as f32 / pop_len as f32;
            buffer[offset + i] += filter.highpass(white(), coeff) * exp_ramp(0.05, 0.001, frac);
        }
    }

    buffer
}

/// A decoded sound file kept in memory so each playback is a cheap copy.
struct Sample {
    channels: u16,
    sample_rate: u32,
    data: Vec<f32>,
}

impl Sample {
    fn load(dir: &Path, name: &str) -> Option<Self> {
        for ext in ["mp3", "wav"] {
            let path = dir.join(format!("{name}.{ext}"));
            let Ok(file) = File::open(&path) else { continue };
            let Ok(decoder) = Decoder::new(BufReader::new(file)) else { continue };
            let channels = decoder.channels();
            let sample_rate = decoder.sample_rate();
            let data: Vec<f32> = decoder.convert_samples().collect();
            if !data.is_empty() {
                return Some(Self {
                    channels,
                    sample_rate,
                    data,
                });
            }
        }
        None
    }

    fn source(&self) -> SamplesBuffer<f32> {
        SamplesBuffer::new(self.channels, self.sample_rate, self.data.clone())
    }
}

/// Fire-and-forget sound service. Construction is caller-controlled and the
/// instance is handed to the simulation loop; when no output device exists
/// every play call is a silent no-op.
pub struct SoundManager {
    output: Option<(OutputStream, OutputStreamHandle)>,
    launch: Option<Sample>,
    explode: Option<Sample>,
    crackle: Option<Sample>,
    muted: bool,
}

impl SoundManager {
    pub fn new() -> Self {
        Self {
            output: OutputStream::try_default().ok(),
            launch: None,
            explode: None,
            crackle: None,
            muted: false,
        }
    }

    /// A manager with no output stream; used headless and in tests.
    pub fn disabled() -> Self {
        Self {
            output: None,
            launch: None,
            explode: None,
            crackle: None,
            muted: false,
        }
    }

    /// Best-effort load of optional sample overrides. Missing or undecodable
    /// files simply leave the synthesized fallback in place.
    pub fn load_samples(&mut self, dir: &Path) {
        self.launch = Sample::load(dir, "launch");
        self.explode = Sample::load(dir, "explode");
        self.crackle = Sample::load(dir, "crackle");
    }

    /// Mute gates event issuance only; loaded buffers and the output stream
    /// stay intact, so unmuting restores output with no other state change.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn play_launch(&self) {
        let Some(handle) = self.handle() else { return };
        if let Some(sample) = &self.launch {
            let rate = 0.8 + fastrand::f32() * 0.4;
            let _ = handle.play_raw(sample.source().speed(rate).amplify(0.3));
        } else {
            let _ = handle.play_raw(SamplesBuffer::new(1, SAMPLE_RATE, synth_launch()));
        }
    }

    pub fn play_explosion(&self, intensity: f32) {
        let Some(handle) = self.handle() else { return };
        if let Some(sample) = &self.explode {
            let rate = 1.2 - intensity * 0.4 + (fastrand::f32() * 0.2 - 0.1);
            let _ = handle.play_raw(
                sample
                    .source()
                    .speed(rate.max(0.1))
                    .amplify(0.5 * intensity),
            );
        } else {
            let _ = handle.play_raw(SamplesBuffer::new(1, SAMPLE_RATE, synth_explosion(intensity)));
        }
    }

    pub fn play_crackle(&self) {
        let Some(handle) = self.handle() else { return };
        if let Some(sample) = &self.crackle {
            let _ = handle.play_raw(sample.source().amplify(0.2));
        } else {
            let _ = handle.play_raw(SamplesBuffer::new(1, SAMPLE_RATE, synth_crackle()));
        }
    }

    fn handle(&self) -> Option<&OutputStreamHandle> {
        if self.muted {
            return None;
        }
        self.output.as_ref().map(|(_, handle)| handle)
    }
}
