//! Per-entity local avoidance with reciprocal velocity obstacles.
//!
//! Each tick the controller pulls a snapshot from its [`Actuator`], scores
//! every admissible velocity and commits the cheapest one. A candidate `v` is
//! tested as `2v - current`, so each of two approaching agents only takes on
//! half of the avoidance manoeuvre.
//!
//! Penalty of a candidate:
//!
//! | Term | Value |
//! |------|-------|
//! | collision | `1 / t` for the soonest predicted collision at `t > 0`, else 0 |
//! | deviation | distance between the candidate and the preferred velocity |
//!
//! Candidates predicted to collide at exactly `t = 0` are never chosen.

use crate::collision::time_to_collision;
use crate::geometry::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A nearby moving footprint, as seen at the start of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicObstacle {
    pub position: Rect,
    pub velocity: Vec2,
}

/// The controlled entity's view of itself and its surroundings.
///
/// Ground and air units implement this directly; the controller never needs
/// to know which one it drives.
pub trait Actuator {
    /// Current footprint.
    fn current_position(&self) -> Rect;

    fn current_velocity(&self) -> Vec2;

    /// Where the entity would like to go this tick, usually derived from its path.
    fn preferred_velocity(&self) -> Vec2;

    /// Candidate velocities, in the order they should be considered.
    fn admissible_velocities(&self) -> &[Vec2];

    fn dynamic_obstacles(&self) -> &[DynamicObstacle];

    /// Commit the candidate at `index` of [`Actuator::admissible_velocities`].
    fn set_velocity(&mut self, index: usize);
}

/// Score of one candidate velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    /// Soonest non-negative predicted collision time, if any.
    pub time_to_collision: Option<f32>,
    /// `None` when the candidate is rejected outright.
    pub penalty: Option<f32>,
}

/// Score a single candidate against all obstacles.
pub fn score_candidate(
    position: &Rect,
    current_velocity: Vec2,
    preferred_velocity: Vec2,
    candidate: Vec2,
    obstacles: &[DynamicObstacle],
) -> CandidateScore {
    let checked = candidate * 2.0 - current_velocity;
    let time_to_collision = obstacles
        .iter()
        .filter_map(|o| time_to_collision(position, checked, &o.position, o.velocity))
        .filter(|&t| t >= 0.0)
        .min_by(f32::total_cmp);

    let penalty = match time_to_collision {
        Some(t) if t == 0.0 => None,
        Some(t) => Some(1.0 / t + preferred_velocity.distance(candidate)),
        None => Some(preferred_velocity.distance(candidate)),
    };

    CandidateScore {
        time_to_collision,
        penalty,
    }
}

/// Index of the least-penalty candidate; the first one wins ties.
///
/// Returns `None` when every candidate is already colliding (or there are
/// no candidates).
pub fn select_velocity(
    position: &Rect,
    current_velocity: Vec2,
    preferred_velocity: Vec2,
    candidates: &[Vec2],
    obstacles: &[DynamicObstacle],
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &candidate) in candidates.iter().enumerate() {
        let score = score_candidate(
            position,
            current_velocity,
            preferred_velocity,
            candidate,
            obstacles,
        );
        let Some(penalty) = score.penalty else {
            continue;
        };
        if best.map_or(true, |(_, least)| penalty < least) {
            best = Some((index, penalty));
        }
    }
    best.map(|(index, _)| index)
}

/// Drives one entity's velocity through its actuator.
#[derive(Debug)]
pub struct MotionController<A> {
    actuator: A,
}

impl<A: Actuator> MotionController<A> {
    pub fn new(actuator: A) -> Self {
        Self { actuator }
    }

    /// Pick and commit a velocity for this tick.
    ///
    /// Returns the committed candidate index, or `None` if nothing was
    /// committed and the entity keeps its previous velocity.
    pub fn update_velocity(&mut self) -> Option<usize> {
        let chosen = select_velocity(
            &self.actuator.current_position(),
            self.actuator.current_velocity(),
            self.actuator.preferred_velocity(),
            self.actuator.admissible_velocities(),
            self.actuator.dynamic_obstacles(),
        );
        match chosen {
            Some(index) => {
                log::trace!(
                    "committing velocity #{} {:?}",
                    index,
                    self.actuator.admissible_velocities()[index]
                );
                self.actuator.set_velocity(index);
            }
            None => log::trace!("no safe velocity, holding"),
        }
        chosen
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn into_actuator(self) -> A {
        self.actuator
    }
}
