use crate::math::random;
use crate::shapes::Shape;
use std::f32::consts::PI;

/// Ascending shell. Removed from the active set the tick it explodes.
#[derive(Clone)]
pub struct Rocket {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub target_y: f32,
    pub hue: f32,
    pub shape: Shape,
}

/// One glowing point from an explosion or a rocket trail. Alpha doubles as
/// remaining lifetime and only ever decreases.
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub alpha: f32,
    pub hue: f32,
    pub decay: f32,
    pub size: f32,
    pub flicker: bool,
}

impl Particle {
    /// Gold ember emitted behind a rising rocket; short-lived, drifting down.
    pub fn ember(x: f32, y: f32) -> Self {
        Self {
            x,
            y: y + 5.0,
            vx: random(-0.25, 0.25),
            vy: 1.0 + fastrand::f32(),
            alpha: 1.0,
            hue: 40.0,
            decay: 0.05,
            size: 1.5,
            flicker: true,
        }
    }
}

/// Static background decoration. The whole field is regenerated on resize.
pub struct Star {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub base_alpha: f32,
    pub twinkle_speed: f32,
    pub twinkle_phase: f32,
}

impl Star {
    pub fn random(width: f32, height: f32) -> Self {
        Self {
            x: random(0.0, width),
            y: random(0.0, height),
            size: random(0.5, 1.8),
            base_alpha: random(0.2, 0.7),
            twinkle_speed: random(0.005, 0.03),
            twinkle_phase: random(0.0, PI * 2.0),
        }
    }
}

/// One star per ~8000 square pixels of sky.
pub fn generate_stars(width: f32, height: f32) -> Vec<Star> {
    let count = (width * height / 8000.0) as usize;
    (0..count).map(|_| Star::random(width, height)).collect()
}
