//! Admissible velocity sampling.
//!
//! Produces the finite candidate set the motion controller scores: the
//! preferred velocity itself, optionally a full stop, then rings of evenly
//! spaced headings at fractions of the maximum speed. The ring pattern is
//! rotated to start at the preferred heading so the sample closest to it is
//! considered early, which matters because ties go to the earlier sample.

use crate::config::AvoidanceConfig;
use crate::geometry::Vec2;
use std::f32::consts::TAU;

pub fn sample_velocities(preferred: Vec2, config: &AvoidanceConfig) -> Vec<Vec2> {
    let rings = config.rings as usize;
    let directions = config.directions as usize;
    let mut samples = Vec::with_capacity(2 + rings * directions);

    samples.push(preferred.clamp_length(config.max_speed));
    if config.include_stop {
        samples.push(Vec2::ZERO);
    }

    if directions == 0 {
        return samples;
    }

    let base_angle = if preferred == Vec2::ZERO {
        0.0
    } else {
        preferred.y.atan2(preferred.x)
    };
    let step = TAU / directions as f32;

    for ring in 1..=rings {
        let speed = config.max_speed * ring as f32 / rings as f32;
        for i in 0..directions {
            let angle = base_angle + step * i as f32;
            samples.push(Vec2::new(angle.cos(), angle.sin()) * speed);
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(directions: u32, rings: u32, include_stop: bool) -> AvoidanceConfig {
        AvoidanceConfig {
            max_speed: 2.0,
            directions,
            rings,
            include_stop,
            ..Default::default()
        }
    }

    #[test]
    fn preferred_comes_first() {
        let samples = sample_velocities(Vec2::new(1.0, 0.0), &config(4, 1, true));
        assert_eq!(samples[0], Vec2::new(1.0, 0.0));
        assert_eq!(samples[1], Vec2::ZERO);
        assert_eq!(samples.len(), 2 + 4);
    }

    #[test]
    fn preferred_is_clamped_to_max_speed() {
        let samples = sample_velocities(Vec2::new(10.0, 0.0), &config(4, 1, false));
        assert!((samples[0].length() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn rings_scale_speed() {
        let samples = sample_velocities(Vec2::ZERO, &config(4, 2, false));
        assert_eq!(samples.len(), 1 + 8);
        for s in &samples[1..5] {
            assert!((s.length() - 1.0).abs() < 1e-5);
        }
        for s in &samples[5..] {
            assert!((s.length() - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn ring_starts_at_preferred_heading() {
        let samples = sample_velocities(Vec2::new(0.0, 1.0), &config(4, 1, false));
        let first_ring = samples[1];
        assert!(first_ring.x.abs() < 1e-5);
        assert!((first_ring.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn zero_directions_keeps_base_samples() {
        let samples = sample_velocities(Vec2::new(1.0, 1.0), &config(0, 3, true));
        assert_eq!(samples.len(), 2);
    }
}
