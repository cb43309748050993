/// Uniform float in [min, max).
pub fn random(min: f32, max: f32) -> f32 {
    min + fastrand::f32() * (max - min)
}

/// Uniform integer in [min, max] inclusive.
pub fn random_int(min: i32, max: i32) -> i32 {
    fastrand::i32(min..=max)
}

/// HSL to linear-ish RGB in [0, 1]. Hue is in degrees and wraps,
/// saturation and lightness are fractions.
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> [f32; 3] {
    let h = hue.rem_euclid(360.0);
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = lightness - c / 2.0;

    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [r + m, g + m, b + m]
}
