use crate::audio::SoundManager;
use crate::config::{HueMode, ParticleConfig};
use crate::entity::{Particle, Rocket, Star, generate_stars};
use crate::math::{hsl_to_rgb, random, random_int};
use crate::shapes::{Shape, explosion_velocities};
use std::io::{BufWriter, Stdout, Write};

/// Logical pixels per terminal half-block cell. The simulation runs in
/// pixels so the physics constants keep their canvas-scale meaning.
pub const CELL: f32 = 8.0;

// Per-tick physics, tuned for a 60 Hz step
const ROCKET_GRAVITY: f32 = 0.15;
const PARTICLE_GRAVITY: f32 = 0.06;
const DRAG: f32 = 0.93;
const EMBER_PROBABILITY: f32 = 0.7;

// Compositing
const TRAIL_KEEP: f32 = 0.8; // complement of the 0.2-alpha black overlay
const FLASH_DECAY: f32 = 0.85;

#[derive(Clone, Copy)]
enum Blend {
    Normal,
    Screen,
    Lighter,
}

/// Cell-space color accumulation buffer. Cells persist between frames and
/// are only darkened by the per-tick fade, which is what produces the
/// motion trails.
struct Canvas {
    cells_w: usize,
    cells_h: usize,
    cells: Vec<[f32; 3]>,
}

impl Canvas {
    fn new(cells_w: usize, cells_h: usize) -> Self {
        Self {
            cells_w,
            cells_h,
            cells: vec![[0.0; 3]; cells_w * cells_h],
        }
    }

    fn fade(&mut self, keep: f32) {
        for cell in &mut self.cells {
            cell[0] *= keep;
            cell[1] *= keep;
            cell[2] *= keep;
        }
    }

    /// Full-frame white overlay at the given opacity.
    fn flash(&mut self, alpha: f32) {
        for cell in &mut self.cells {
            for channel in cell {
                *channel = *channel * (1.0 - alpha) + alpha;
            }
        }
    }

    fn blend_cell(&mut self, cx: isize, cy: isize, color: [f32; 3], alpha: f32, mode: Blend) {
        if cx < 0 || cy < 0 || cx >= self.cells_w as isize || cy >= self.cells_h as isize {
            return;
        }
        let cell = &mut self.cells[cy as usize * self.cells_w + cx as usize];
        for i in 0..3 {
            cell[i] = match mode {
                Blend::Normal => cell[i] * (1.0 - alpha) + color[i] * alpha,
                Blend::Screen => 1.0 - (1.0 - cell[i]) * (1.0 - color[i] * alpha),
                Blend::Lighter => cell[i] + color[i] * alpha,
            };
        }
    }

    /// Filled dot at pixel coordinates. Footprints larger than one cell
    /// spill into the four neighbours.
    fn draw_dot(&mut self, mode: Blend, x: f32, y: f32, radius: f32, color: [f32; 3], alpha: f32) {
        let cx = (x / CELL).floor() as isize;
        let cy = (y / CELL).floor() as isize;
        self.blend_cell(cx, cy, color, alpha, mode);

        if radius > CELL * 0.5 {
            let spill = ((radius - CELL * 0.5) / CELL).min(1.0) * 0.6;
            for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                self.blend_cell(cx + dx, cy + dy, color, alpha * spill, mode);
            }
        }
    }

    /// Soft additive halo in the eight neighbouring cells.
    fn draw_glow(&mut self, x: f32, y: f32, color: [f32; 3], alpha: f32) {
        let cx = (x / CELL).floor() as isize;
        let cy = (y / CELL).floor() as isize;
        for dy in -1..=1isize {
            for dx in -1..=1isize {
                if dx == 0 && dy == 0 {
                    continue;
                }
                self.blend_cell(cx + dx, cy + dy, color, alpha, Blend::Lighter);
            }
        }
    }
}

/// The whole display: entity collections, the launch scheduler, the flash
/// state, the accumulation canvas and the injected sound service. The loop
/// is the single owner and single mutator of every collection here.
pub struct FireworksDisplay {
    width: f32,
    height: f32,
    rockets: Vec<Rocket>,
    particles: Vec<Particle>,
    stars: Vec<Star>,
    canvas: Canvas,
    flash: f32,
    time: f32,
    last_launch: f32,
    launch_interval: f32,
    countdown_clock: f32,
    next_launch_in: u32,
    running: bool,
    pub config: ParticleConfig,
    audio: SoundManager,
    output_buf: Vec<u8>,
}

impl FireworksDisplay {
    /// `width` and `height` are in logical pixels (terminal cells * 8).
    pub fn new(width: f32, height: f32, launch_interval: f32, audio: SoundManager) -> Self {
        let cells_w = (width / CELL).round() as usize;
        let cells_h = (height / CELL).round() as usize;
        Self {
            width,
            height,
            rockets: Vec::new(),
            particles: Vec::new(),
            stars: generate_stars(width, height),
            canvas: Canvas::new(cells_w, cells_h),
            flash: 0.0,
            time: 0.0,
            last_launch: 0.0,
            launch_interval,
            countdown_clock: 0.0,
            next_launch_in: launch_interval.ceil() as u32,
            running: true,
            config: ParticleConfig::default(),
            audio,
            output_buf: Vec::with_capacity(cells_w * cells_h * 25),
        }
    }

    /// Viewport change: adopt the new dimensions and regenerate the star
    /// field. Rockets and particles in flight persist.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.stars = generate_stars(width, height);
        self.canvas = Canvas::new(
            (width / CELL).round() as usize,
            (height / CELL).round() as usize,
        );
    }

    /// Create one rocket. Omitted arguments are sampled: start in the middle
    /// 60% of the width, burst altitude in the upper 10-40% band, shape
    /// uniform over the six silhouettes.
    pub fn launch(&mut self, target_x: Option<f32>, target_y: Option<f32>, shape: Option<Shape>) {
        let config = self.config;
        let start_x = target_x.unwrap_or_else(|| random(self.width * 0.2, self.width * 0.8));
        let dest_y = target_y.unwrap_or_else(|| random(self.height * 0.1, self.height * 0.4));
        let shape = shape.unwrap_or_else(Shape::random);

        let hue = match config.hue_mode {
            HueMode::Custom => config.custom_hue,
            HueMode::Random => random_int(0, 359) as f32,
        };

        // Launch speed scales with the viewport so ascent duration is
        // resolution-independent
        let speed = random(self.height * 0.013, self.height * 0.017);

        self.rockets.push(Rocket {
            x: start_x,
            y: self.height,
            vx: 0.0,
            vy: -speed,
            target_y: dest_y,
            hue,
            shape,
        });
        self.audio.play_launch();
    }

    /// Manual "launch now": fires immediately and restarts the autonomous
    /// launch clock.
    pub fn trigger_launch(&mut self) {
        self.launch(None, None, None);
        self.last_launch = self.time;
    }

    /// Burst a rocket into its particle batch, kick the screen flash and
    /// emit the matching sound.
    fn explode(&mut self, rocket: &Rocket) {
        let config = self.config;
        let is_crackle = rocket.shape == Shape::Crackle;
        let count = if rocket.shape == Shape::Sphere { 200 } else { 120 };

        // Power scales with the smaller viewport dimension so burst size is
        // resolution-independent
        let scale = self.width.min(self.height) / 1000.0;
        let power = random(4.0, 8.0) * scale;

        self.flash = 0.2 + (power / 10.0) * 0.3;

        for (vx, vy) in explosion_velocities(rocket.shape, count, power) {
            let base_decay = if is_crackle {
                random(0.015, 0.03)
            } else {
                random(0.005, 0.015)
            };
            self.particles.push(Particle {
                x: rocket.x,
                y: rocket.y,
                vx,
                vy,
                alpha: 1.0,
                hue: rocket.hue + random_int(-20, 20) as f32,
                decay: base_decay / config.duration_multiplier,
                size: (random(1.5, 3.5) * config.size_multiplier).max(0.5),
                flicker: is_crackle || fastrand::f32() < config.flicker_density,
            });
        }

        if is_crackle {
            self.audio.play_crackle();
            self.audio.play_explosion(0.5);
        } else {
            self.audio.play_explosion((power - 4.0) / 5.0 + 0.5);
        }
    }

    /// One simulation tick, painted into the canvas in strict order: fade,
    /// stars, flash, rockets, particles, scheduler. `dt` advances only the
    /// launch clock; the physics constants are per-tick and the caller
    /// drives this at a fixed 60 Hz step.
    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        // Wrap time to prevent floating point precision issues
        if self.time > 10000.0 {
            self.time -= 10000.0;
            self.last_launch -= 10000.0;
        }

        // 1. Low-alpha black overlay: previous frame dims into a trail
        self.canvas.fade(TRAIL_KEEP);

        // 2. Background stars
        for star in &mut self.stars {
            star.twinkle_phase += star.twinkle_speed;
            let twinkle = star.twinkle_phase.sin() * 0.5 + 1.0;
            let alpha = (star.base_alpha * twinkle).min(1.0);
            self.canvas
                .draw_dot(Blend::Normal, star.x, star.y, star.size, [1.0; 3], alpha);
        }

        // 3. Screen flash from a recent burst
        if self.flash > 0.01 {
            self.canvas.flash(self.flash);
            self.flash *= FLASH_DECAY;
        } else {
            self.flash = 0.0;
        }

        // 4. Rockets: ascend, shed embers, explode at apex or target height
        let mut embers: Vec<Particle> = Vec::new();
        let mut exploded: Vec<Rocket> = Vec::new();
        let canvas = &mut self.canvas;
        self.rockets.retain_mut(|rocket| {
            rocket.x += rocket.vx;
            rocket.y += rocket.vy;
            rocket.vy += ROCKET_GRAVITY;

            if fastrand::f32() < EMBER_PROBABILITY {
                embers.push(Particle::ember(rocket.x, rocket.y));
            }

            let head = hsl_to_rgb(rocket.hue, 1.0, 0.8);
            canvas.draw_dot(Blend::Screen, rocket.x, rocket.y, 2.0, head, 1.0);

            if rocket.vy >= 0.0 || rocket.y <= rocket.target_y {
                exploded.push(rocket.clone());
                false
            } else {
                true
            }
        });
        self.particles.append(&mut embers);
        for rocket in &exploded {
            self.explode(rocket);
        }

        // 5. Particles: drag, gravity, fade; additive draw with a hot core
        let canvas = &mut self.canvas;
        self.particles.retain_mut(|p| {
            p.x += p.vx;
            p.y += p.vy;
            p.vx *= DRAG;
            p.vy *= DRAG;
            p.vy += PARTICLE_GRAVITY;
            p.alpha -= p.decay;
            if p.alpha <= 0.0 {
                return false;
            }

            // Hot particles render near white, cooling into saturated color
            let mut lightness = 50.0;
            if p.alpha > 0.8 {
                lightness = 50.0 + (p.alpha - 0.8) * 250.0;
            }
            if p.flicker && fastrand::f32() > 0.7 {
                lightness += 20.0;
            }

            let color = hsl_to_rgb(p.hue, 1.0, lightness.min(100.0) / 100.0);
            canvas.draw_dot(Blend::Lighter, p.x, p.y, p.size, color, p.alpha);

            let glow = hsl_to_rgb(p.hue, 1.0, 0.5);
            canvas.draw_glow(p.x, p.y, glow, p.alpha * 0.35);
            true
        });

        // 6. Autonomous launches; pause only stops this step
        if self.running {
            if self.time - self.last_launch > self.launch_interval {
                self.launch(None, None, None);
                self.last_launch = self.time;
            }
            self.countdown_clock += dt;
            if self.countdown_clock >= 1.0 {
                self.countdown_clock = 0.0;
                let remaining = self.launch_interval - (self.time - self.last_launch);
                self.next_launch_in = remaining.max(0.0).ceil() as u32;
            }
        }
    }

    /// Rasterize the canvas as half-block cells plus a one-line status
    /// overlay. A zero-area surface skips the frame silently.
    pub fn render(&mut self, stdout: &mut BufWriter<Stdout>) -> std::io::Result<()> {
        let (cells_w, cells_h) = (self.canvas.cells_w, self.canvas.cells_h);
        if cells_w == 0 || cells_h == 0 {
            return Ok(());
        }

        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[H");

        let mut prev_top: (u8, u8, u8) = (255, 255, 255);
        let mut prev_bot: (u8, u8, u8) = (255, 255, 255);

        for y in (0..cells_h).step_by(2) {
            for x in 0..cells_w {
                let top = to_rgb8(self.canvas.cells[y * cells_w + x]);
                let bot = if y + 1 < cells_h {
                    to_rgb8(self.canvas.cells[(y + 1) * cells_w + x])
                } else {
                    top
                };

                // Only emit color codes if changed
                if top != prev_top {
                    write!(self.output_buf, "\x1b[48;2;{};{};{}m", top.0, top.1, top.2)?;
                    prev_top = top;
                }
                if bot != prev_bot {
                    write!(self.output_buf, "\x1b[38;2;{};{};{}m", bot.0, bot.1, bot.2)?;
                    prev_bot = bot;
                }
                self.output_buf.extend_from_slice("▄".as_bytes());
            }
            self.output_buf.extend_from_slice(b"\x1b[0m");
            prev_top = (255, 255, 255);
            prev_bot = (255, 255, 255);
            if y + 2 < cells_h {
                self.output_buf.extend_from_slice(b"\r\n");
            }
        }

        // Status overlay in the top-left corner
        self.output_buf.extend_from_slice(b"\x1b[H\x1b[38;2;110;110;125m");
        if self.running {
            write!(self.output_buf, " next burst in {}s", self.next_launch_in)?;
        } else {
            self.output_buf.extend_from_slice(b" paused");
        }
        if self.audio.is_muted() {
            self.output_buf.extend_from_slice(b" [muted]");
        }
        self.output_buf.extend_from_slice(b"\x1b[0m");

        stdout.write_all(&self.output_buf)?;
        stdout.flush()?;
        Ok(())
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn toggle_mute(&mut self) {
        let muted = self.audio.is_muted();
        self.audio.set_muted(!muted);
    }
}

fn to_rgb8(cell: [f32; 3]) -> (u8, u8, u8) {
    (
        (cell[0].clamp(0.0, 1.0) * 255.0) as u8,
        (cell[1].clamp(0.0, 1.0) * 255.0) as u8,
        (cell[2].clamp(0.0, 1.0) * 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: f32 = 1.0 / 60.0;

    fn test_display(width: f32, height: f32) -> FireworksDisplay {
        FireworksDisplay::new(width, height, 4.0, SoundManager::disabled())
    }

    #[test]
    fn star_field_regenerates_on_resize() {
        fastrand::seed(61);
        let mut display = test_display(800.0, 600.0);
        assert_eq!(display.stars.len(), 60);

        display.resize(400.0, 400.0);
        assert_eq!(display.stars.len(), 20); // floor(400 * 400 / 8000)
        for star in &display.stars {
            assert!(star.x >= 0.0 && star.x < 400.0);
            assert!(star.y >= 0.0 && star.y < 400.0);
        }
    }

    #[test]
    fn particle_alpha_strictly_decreases_and_dead_particles_leave() {
        fastrand::seed(67);
        let mut display = test_display(800.0, 600.0);
        display.set_running(false);

        display.particles.push(Particle {
            x: 400.0,
            y: 300.0,
            vx: 1.0,
            vy: -1.0,
            alpha: 1.0,
            hue: 120.0,
            decay: 0.01,
            size: 2.0,
            flicker: false,
        });
        display.particles.push(Particle {
            x: 400.0,
            y: 300.0,
            vx: 0.0,
            vy: 0.0,
            alpha: 0.005,
            hue: 120.0,
            decay: 0.01,
            size: 2.0,
            flicker: false,
        });

        display.update(TICK);
        // The nearly-dead particle is gone the tick its alpha hits zero
        assert_eq!(display.particles.len(), 1);
        assert!((display.particles[0].alpha - 0.99).abs() < 1e-6);

        let mut prev = display.particles[0].alpha;
        for _ in 0..50 {
            display.update(TICK);
            if let Some(p) = display.particles.first() {
                assert!(p.alpha < prev);
                assert!(p.alpha > 0.0);
                prev = p.alpha;
            }
        }
    }

    #[test]
    fn rocket_rises_then_explodes_exactly_once() {
        fastrand::seed(71);
        let mut display = test_display(800.0, 600.0);
        display.set_running(false);
        display.config.hue_mode = HueMode::Custom;
        display.config.custom_hue = 200.0;

        display.launch(Some(500.0), Some(100.0), Some(Shape::Ring));
        assert_eq!(display.rockets.len(), 1);
        assert!(display.rockets[0].vy < 0.0);

        let mut ticks = 0;
        while !display.rockets.is_empty() {
            display.update(TICK);
            ticks += 1;
            assert!(ticks < 1000, "rocket never exploded");
        }

        // Exactly one RING burst of 120 particles; trail embers are gold
        // (hue 40) and cannot fall in the rocket's hue band
        let burst: Vec<_> = display
            .particles
            .iter()
            .filter(|p| (180.0..=220.0).contains(&p.hue))
            .collect();
        assert_eq!(burst.len(), 120);

        // Flash kicked by the burst
        assert!(display.flash > 0.0);

        // Further ticks must not produce another burst
        for _ in 0..20 {
            display.update(TICK);
        }
        let burst_count = display
            .particles
            .iter()
            .filter(|p| (180.0..=220.0).contains(&p.hue))
            .count();
        assert!(burst_count <= 120);
    }

    #[test]
    fn ring_burst_travels_the_analytic_distance() {
        fastrand::seed(73);
        let mut display = test_display(800.0, 600.0);
        display.set_running(false);
        display.config.hue_mode = HueMode::Custom;
        display.config.custom_hue = 200.0;

        display.launch(Some(500.0), Some(100.0), Some(Shape::Ring));
        while !display.rockets.is_empty() {
            display.update(TICK);
        }

        // One tick after the burst the ring is still nearly centred on the
        // burst point, so its mean position estimates the origin
        let burst = |d: &FireworksDisplay| -> Vec<(f32, f32)> {
            d.particles
                .iter()
                .filter(|p| (180.0..=220.0).contains(&p.hue))
                .map(|p| (p.x, p.y))
                .collect()
        };
        let initial = burst(&display);
        assert_eq!(initial.len(), 120);
        let n = initial.len() as f32;
        let origin_x = initial.iter().map(|p| p.0).sum::<f32>() / n;
        let origin_y = initial.iter().map(|p| p.1).sum::<f32>() / n;

        for _ in 0..9 {
            display.update(TICK);
        }

        // After 10 ticks total each particle traveled speed * sum(0.93^k)
        // for k in 0..10 (~7.37x), with speed in [0.9, 1.1] * power and
        // power in [4, 8] * (600 / 1000); gravity adds a small y drift
        let settled = burst(&display);
        assert_eq!(settled.len(), 120);
        let mean_dist = settled
            .iter()
            .map(|(x, y)| ((x - origin_x).powi(2) + (y - origin_y).powi(2)).sqrt())
            .sum::<f32>()
            / n;
        assert!(
            (12.0..=42.0).contains(&mean_dist),
            "mean radial travel {mean_dist} outside the analytic window"
        );
    }

    #[test]
    fn rocket_sheds_gold_embers_while_rising() {
        fastrand::seed(79);
        let mut display = test_display(800.0, 600.0);
        display.set_running(false);
        display.launch(None, None, Some(Shape::Sphere));

        for _ in 0..10 {
            display.update(TICK);
        }
        let embers = display
            .particles
            .iter()
            .filter(|p| p.hue == 40.0 && p.decay == 0.05)
            .count();
        // Probability 0.7 per tick; ten ticks without a single ember would
        // be a broken emitter, not bad luck
        assert!(embers >= 2, "only {embers} embers after 10 ticks");
    }

    #[test]
    fn autonomous_launch_honors_the_interval() {
        fastrand::seed(83);
        let mut display = FireworksDisplay::new(800.0, 600.0, 0.5, SoundManager::disabled());

        // 0.5 s interval: the first launch arrives just past tick 30
        for _ in 0..35 {
            display.update(TICK);
        }
        assert_eq!(display.rockets.len(), 1);

        // Clock was reset; no second launch until another interval elapses
        for _ in 0..10 {
            display.update(TICK);
        }
        assert_eq!(display.rockets.len(), 1);
    }

    #[test]
    fn pause_stops_launches_but_not_physics() {
        fastrand::seed(89);
        let mut display = FireworksDisplay::new(800.0, 600.0, 0.05, SoundManager::disabled());
        display.launch(Some(400.0), Some(100.0), Some(Shape::Ring));
        display.set_running(false);

        let rockets_before = display.rockets.len();
        assert_eq!(rockets_before, 1);
        let y_before = display.rockets[0].y;

        for _ in 0..5 {
            display.update(TICK);
        }
        // No autonomous launches while paused, despite the tiny interval
        assert_eq!(display.rockets.len(), 1);
        // The live rocket kept moving
        assert!(display.rockets[0].y < y_before);

        // And everything runs to natural completion
        for _ in 0..2000 {
            display.update(TICK);
        }
        assert!(display.rockets.is_empty());
        assert!(display.particles.is_empty());
    }

    #[test]
    fn flash_decays_to_rest() {
        fastrand::seed(97);
        let mut display = test_display(800.0, 600.0);
        display.set_running(false);
        display.flash = 0.5;

        for _ in 0..60 {
            display.update(TICK);
        }
        assert_eq!(display.flash, 0.0);
    }

    #[test]
    fn custom_hue_drives_rocket_color() {
        fastrand::seed(101);
        let mut display = test_display(800.0, 600.0);
        display.config.hue_mode = HueMode::Custom;
        display.config.custom_hue = 313.0;
        display.launch(None, None, None);
        assert_eq!(display.rockets[0].hue, 313.0);
    }

    #[test]
    fn canvas_lighter_blending_accumulates() {
        let mut canvas = Canvas::new(4, 4);
        canvas.blend_cell(1, 1, [0.4, 0.2, 0.0], 1.0, Blend::Lighter);
        canvas.blend_cell(1, 1, [0.4, 0.2, 0.0], 1.0, Blend::Lighter);
        let cell = canvas.cells[1 * 4 + 1];
        assert!((cell[0] - 0.8).abs() < 1e-6);
        assert!((cell[1] - 0.4).abs() < 1e-6);

        // Out-of-bounds writes are ignored
        canvas.blend_cell(-1, 7, [1.0; 3], 1.0, Blend::Normal);
        canvas.blend_cell(4, 0, [1.0; 3], 1.0, Blend::Screen);
    }
}
