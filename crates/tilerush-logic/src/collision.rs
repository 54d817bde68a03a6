//! Swept-rectangle collision prediction.
//!
//! Two moving axis-aligned rectangles are reduced to a point (the center of
//! the first) moving at the relative velocity through the second rectangle
//! grown by the first one's half-extents. Each axis gives an entry/exit time
//! interval through that rectangle's slab; the rectangles overlap while both
//! intervals do.

use crate::geometry::{Rect, Vec2};

/// Time interval during which the moving point lies inside one axis slab.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SlabInterval {
    begin: f32,
    end: f32,
}

fn slab_interval(position: f32, velocity: f32, slab_min: f32, slab_max: f32) -> SlabInterval {
    let t_min = (slab_min - position) / velocity;
    let t_max = (slab_max - position) / velocity;
    SlabInterval {
        begin: t_min.min(t_max),
        end: t_min.max(t_max),
    }
}

/// Time until `a` moving at `velocity_a` first touches `b` moving at
/// `velocity_b`.
///
/// Returns `None` when they never overlap: zero relative velocity, or the
/// per-axis intervals are disjoint. A motionless axis counts only if the
/// point already lies strictly inside that slab. A negative result means
/// the overlap started in the past and is still ongoing.
pub fn time_to_collision(a: &Rect, velocity_a: Vec2, b: &Rect, velocity_b: Vec2) -> Option<f32> {
    let relative = velocity_a - velocity_b;
    if relative == Vec2::ZERO {
        return None;
    }

    let center = a.center();
    let enlarged = Rect::new(
        b.x - a.width / 2.0,
        b.y - a.height / 2.0,
        a.width + b.width,
        a.height + b.height,
    );

    let moving_x = relative.x != 0.0;
    let moving_y = relative.y != 0.0;

    match (moving_x, moving_y) {
        (true, true) => {
            let x = slab_interval(center.x, relative.x, enlarged.left(), enlarged.right());
            let y = slab_interval(center.y, relative.y, enlarged.top(), enlarged.bottom());
            let begin = x.begin.max(y.begin);
            let end = x.end.min(y.end);
            (begin < end).then_some(begin)
        }
        (true, false) => {
            let inside = center.y > enlarged.top() && center.y < enlarged.bottom();
            inside.then(|| slab_interval(center.x, relative.x, enlarged.left(), enlarged.right()).begin)
        }
        (false, true) => {
            let inside = center.x > enlarged.left() && center.x < enlarged.right();
            inside.then(|| slab_interval(center.y, relative.y, enlarged.top(), enlarged.bottom()).begin)
        }
        // relative != ZERO rules this out
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(x: f32, y: f32) -> Rect {
        Rect::new(x, y, 2.0, 2.0)
    }

    #[test]
    fn head_on_along_x() {
        let a = unit(0.0, 0.0);
        let b = unit(10.0, 0.0);
        let t = time_to_collision(&a, Vec2::ZERO, &b, Vec2::new(-1.0, 0.0)).unwrap();
        assert!((t - 8.0).abs() < 1e-5, "got {t}");
    }

    #[test]
    fn both_stationary_never_collide() {
        let a = unit(0.0, 0.0);
        let b = unit(10.0, 0.0);
        assert_eq!(time_to_collision(&a, Vec2::ZERO, &b, Vec2::ZERO), None);
    }

    #[test]
    fn equal_velocities_never_collide_even_when_overlapping() {
        let a = unit(0.0, 0.0);
        let b = unit(1.0, 1.0);
        let v = Vec2::new(3.0, -2.0);
        assert_eq!(time_to_collision(&a, v, &b, v), None);
    }

    #[test]
    fn parallel_miss() {
        // B passes above A: slabs on Y never overlap
        let a = unit(0.0, 0.0);
        let b = unit(10.0, 5.0);
        assert_eq!(
            time_to_collision(&a, Vec2::ZERO, &b, Vec2::new(-1.0, 0.0)),
            None
        );
    }

    #[test]
    fn moving_away_collided_in_the_past() {
        let a = unit(0.0, 0.0);
        let b = unit(10.0, 0.0);
        let t = time_to_collision(&a, Vec2::ZERO, &b, Vec2::new(1.0, 0.0)).unwrap();
        assert!(t < 0.0);
    }

    #[test]
    fn diagonal_approach() {
        let a = unit(0.0, 0.0);
        let b = unit(5.0, 5.0);
        let t = time_to_collision(&a, Vec2::new(1.0, 1.0), &b, Vec2::ZERO).unwrap();
        // gap of 3 on both axes closes at unit speed
        assert!((t - 3.0).abs() < 1e-5, "got {t}");
    }

    #[test]
    fn diagonal_miss() {
        let a = unit(0.0, 0.0);
        let b = unit(5.0, -6.0);
        assert_eq!(
            time_to_collision(&a, Vec2::new(1.0, 1.0), &b, Vec2::ZERO),
            None
        );
    }

    #[test]
    fn touching_and_approaching_is_zero() {
        let a = unit(0.0, 0.0);
        let b = unit(2.0, 0.0);
        let t = time_to_collision(&a, Vec2::new(1.0, 0.0), &b, Vec2::ZERO).unwrap();
        assert_eq!(t, 0.0);
    }

    #[test]
    fn grazing_edges_do_not_collide() {
        // A slides along B's top edge: perpendicular coordinate sits on the slab boundary
        let a = unit(0.0, 0.0);
        let b = unit(5.0, 2.0);
        assert_eq!(
            time_to_collision(&a, Vec2::new(1.0, 0.0), &b, Vec2::ZERO),
            None
        );
    }

    #[test]
    fn different_sizes() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        let b = Rect::new(6.0, -2.0, 3.0, 5.0);
        let t = time_to_collision(&a, Vec2::new(2.0, 0.0), &b, Vec2::ZERO).unwrap();
        assert!((t - 2.5).abs() < 1e-5, "got {t}");
    }

    #[test]
    fn mirrored_computation_agrees() {
        let a = Rect::new(0.0, 0.0, 1.0, 2.0);
        let b = Rect::new(7.0, 3.0, 3.0, 1.0);
        let va = Vec2::new(1.0, 0.5);
        let vb = Vec2::new(-0.5, 0.0);
        let ab = time_to_collision(&a, va, &b, vb).unwrap();
        let ba = time_to_collision(&b, vb, &a, va).unwrap();
        assert!((ab - ba).abs() < 1e-4, "{ab} vs {ba}");
    }
}
