use crate::math::random;
use std::f32::consts::PI;

/// Burst silhouette. Each variant maps particle index/count/power to an
/// initial velocity field in `explosion_velocities`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Shape {
    Sphere,
    Ring,
    Heart,
    Star,
    Spiral,
    Crackle,
}

impl Shape {
    pub fn random() -> Self {
        match fastrand::usize(0..6) {
            0 => Shape::Sphere,
            1 => Shape::Ring,
            2 => Shape::Heart,
            3 => Shape::Star,
            4 => Shape::Spiral,
            _ => Shape::Crackle,
        }
    }
}

/// The parametric heart curve, normalized so both axes fit in roughly
/// [-1, 1]. Y is negated because screen space grows downward.
pub fn heart_curve(theta: f32) -> (f32, f32) {
    let x = 16.0 * theta.sin().powi(3);
    let y = -(13.0 * theta.cos()
        - 5.0 * (2.0 * theta).cos()
        - 2.0 * (3.0 * theta).cos()
        - (4.0 * theta).cos());
    (x / 16.0, y / 16.0)
}

/// Sample `count` initial velocity vectors for one explosion of the given
/// shape and power magnitude.
pub fn explosion_velocities(shape: Shape, count: usize, power: f32) -> Vec<(f32, f32)> {
    let mut velocities = Vec::with_capacity(count);

    match shape {
        Shape::Sphere => {
            // Mix of slow core particles and occasional high-speed streamers
            for _ in 0..count {
                let angle = fastrand::f32() * PI * 2.0;
                let base_speed = fastrand::f32() * power;
                let burst_factor = if fastrand::f32() > 0.7 {
                    random(1.0, 1.5)
                } else {
                    1.0
                };
                let speed = base_speed * burst_factor;
                velocities.push((angle.cos() * speed, angle.sin() * speed));
            }
        }
        Shape::Ring => {
            // Evenly spaced angles, near-uniform radius with thickness jitter
            for i in 0..count {
                let angle = (i as f32 / count as f32) * PI * 2.0;
                let speed = power * random(0.9, 1.1);
                velocities.push((angle.cos() * speed, angle.sin() * speed));
            }
        }
        Shape::Heart => {
            for i in 0..count {
                let angle = (i as f32 / count as f32) * PI * 2.0;
                let variance = random(0.85, 1.15);
                let (x, y) = heart_curve(angle);
                velocities.push((x * power * 0.8 * variance, y * power * 0.8 * variance));
            }
        }
        Shape::Star => {
            // Five-pointed silhouette from a sin(5θ) radius modulation
            for i in 0..count {
                let angle = (i as f32 / count as f32) * PI * 2.0;
                let variance = random(0.8, 1.25);
                let r = (1.0 + (angle * 5.0).sin() * 0.5) * variance;
                velocities.push((
                    angle.cos() * r * power * 0.7,
                    angle.sin() * r * power * 0.7,
                ));
            }
        }
        Shape::Spiral => {
            // Three arms; speed grows along each arm so outer particles
            // travel further, tracing the spiral
            let arms = 3;
            let particles_per_arm = count.div_ceil(arms);
            for arm in 0..arms {
                for i in 0..particles_per_arm {
                    let t = i as f32 / particles_per_arm as f32;
                    let angle = (arm as f32 * PI * 2.0 / arms as f32) + t * PI * 1.5;
                    let speed = power * (0.2 + 0.8 * t) * random(0.9, 1.1);
                    velocities.push((angle.cos() * speed, angle.sin() * speed));
                }
            }
        }
        Shape::Crackle => {
            // Sqrt sampling fills the disk uniformly: dense chaotic static
            // rather than a ring
            for _ in 0..count {
                let angle = fastrand::f32() * PI * 2.0;
                let r = fastrand::f32().sqrt();
                let speed = r * power * random(0.8, 1.2);
                velocities.push((angle.cos() * speed, angle.sin() * speed));
            }
        }
    }

    velocities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn magnitude(v: (f32, f32)) -> f32 {
        (v.0 * v.0 + v.1 * v.1).sqrt()
    }

    #[test]
    fn ring_magnitudes_bounded_independent_of_index() {
        fastrand::seed(11);
        let power = 6.0;
        let velocities = explosion_velocities(Shape::Ring, 120, power);
        assert_eq!(velocities.len(), 120);
        for v in &velocities {
            let m = magnitude(*v);
            assert!(m >= 0.9 * power - 1e-4 && m <= 1.1 * power + 1e-4);
        }
    }

    #[test]
    fn sphere_speeds_bounded_by_streamer_factor() {
        fastrand::seed(13);
        let power = 5.0;
        let velocities = explosion_velocities(Shape::Sphere, 200, power);
        assert_eq!(velocities.len(), 200);
        for v in &velocities {
            assert!(magnitude(*v) <= power * 1.5 + 1e-4);
        }
    }

    #[test]
    fn heart_matches_closed_form_at_unit_variance() {
        // heart_curve is the deterministic core; velocities are
        // curve * power * 0.8 * variance with variance in [0.85, 1.15]
        let theta = 1.234_f32;
        let (x, y) = heart_curve(theta);
        let expected_x = 16.0 * theta.sin().powi(3) / 16.0;
        let expected_y = -(13.0 * theta.cos()
            - 5.0 * (2.0 * theta).cos()
            - 2.0 * (3.0 * theta).cos()
            - (4.0 * theta).cos())
            / 16.0;
        assert!((x - expected_x).abs() < 1e-6);
        assert!((y - expected_y).abs() < 1e-6);

        fastrand::seed(17);
        let power = 6.0;
        let count = 120;
        let velocities = explosion_velocities(Shape::Heart, count, power);
        for (i, v) in velocities.iter().enumerate() {
            let angle = (i as f32 / count as f32) * std::f32::consts::PI * 2.0;
            let (cx, cy) = heart_curve(angle);
            let base = magnitude((cx * power * 0.8, cy * power * 0.8));
            let m = magnitude(*v);
            if base > 1e-3 {
                let ratio = m / base;
                assert!(
                    ratio >= 0.85 - 1e-3 && ratio <= 1.15 + 1e-3,
                    "index {i}: ratio {ratio} outside variance bounds"
                );
                // Direction must be the curve's, up to the scalar variance
                let cross = (v.0 * cy - v.1 * cx).abs();
                assert!(cross < 1e-3 * base.max(1.0));
            }
        }
    }

    #[test]
    fn spiral_speed_grows_along_each_arm() {
        fastrand::seed(19);
        let power = 6.0;
        let count = 120;
        let per_arm = count / 3;

        // Jitter is +-10%, so compare quarter-arm averages over many batches
        let mut inner_sum = 0.0;
        let mut outer_sum = 0.0;
        let batches = 200;
        for _ in 0..batches {
            let velocities = explosion_velocities(Shape::Spiral, count, power);
            for arm in 0..3 {
                for i in 0..per_arm {
                    let m = magnitude(velocities[arm * per_arm + i]);
                    if i < per_arm / 4 {
                        inner_sum += m;
                    } else if i >= per_arm * 3 / 4 {
                        outer_sum += m;
                    }
                }
            }
        }
        assert!(
            outer_sum > inner_sum * 2.0,
            "outer arm positions should travel much faster: inner {inner_sum}, outer {outer_sum}"
        );
    }

    #[test]
    fn spiral_covers_all_three_arms() {
        fastrand::seed(23);
        let velocities = explosion_velocities(Shape::Spiral, 120, 5.0);
        assert_eq!(velocities.len(), 120);
    }

    #[test]
    fn crackle_fills_the_disk() {
        fastrand::seed(29);
        let power = 6.0;
        let velocities = explosion_velocities(Shape::Crackle, 120, power);
        let mut inner = 0;
        for v in &velocities {
            let m = magnitude(*v);
            assert!(m <= power * 1.2 + 1e-4);
            if m < power * 0.5 {
                inner += 1;
            }
        }
        // Uniform disk coverage puts a meaningful share of particles inside
        // half the radius; a ring distribution would leave it empty
        assert!(inner > 10, "expected dense core, found {inner} inner particles");
    }

    #[test]
    fn shape_random_hits_every_variant() {
        fastrand::seed(31);
        let mut seen = [false; 6];
        for _ in 0..500 {
            match Shape::random() {
                Shape::Sphere => seen[0] = true,
                Shape::Ring => seen[1] = true,
                Shape::Heart => seen[2] = true,
                Shape::Star => seen[3] = true,
                Shape::Spiral => seen[4] = true,
                Shape::Crackle => seen[5] = true,
            }
        }
        assert!(seen.iter().all(|&s| s));
    }
}
