/// How explosion hues are chosen.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum HueMode {
    Random,
    Custom,
}

/// Tunables read by the simulation each time it launches or explodes a
/// rocket. Mutated only by the control surface; the loop snapshots the
/// fields it needs at the top of each operation.
#[derive(Clone, Copy)]
pub struct ParticleConfig {
    pub size_multiplier: f32,
    pub duration_multiplier: f32,
    pub flicker_density: f32,
    pub hue_mode: HueMode,
    pub custom_hue: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            size_multiplier: 1.0,
            duration_multiplier: 1.0,
            flicker_density: 0.5,
            hue_mode: HueMode::Random,
            custom_hue: 0.0,
        }
    }
}

impl ParticleConfig {
    pub fn adjust_size(&mut self, delta: f32) {
        self.size_multiplier = (self.size_multiplier + delta).clamp(0.5, 3.0);
    }

    pub fn adjust_duration(&mut self, delta: f32) {
        self.duration_multiplier = (self.duration_multiplier + delta).clamp(0.5, 2.5);
    }

    pub fn adjust_flicker(&mut self, delta: f32) {
        self.flicker_density = (self.flicker_density + delta).clamp(0.0, 1.0);
    }

    pub fn adjust_hue(&mut self, delta: f32) {
        self.custom_hue = (self.custom_hue + delta).clamp(0.0, 360.0);
    }

    pub fn toggle_hue_mode(&mut self) {
        self.hue_mode = match self.hue_mode {
            HueMode::Random => HueMode::Custom,
            HueMode::Custom => HueMode::Random,
        };
    }
}
