//! Tunables for search scheduling, avoidance sampling, and path following.
//!
//! Every struct deserializes with missing fields filled from its `Default`,
//! so scenario files only need to mention what they change.

use serde::{Deserialize, Serialize};

/// Path search work limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Node expansions a single search may perform per tick.
    pub expansions_per_step: usize,
    /// Expansions shared by all queued searches per tick.
    pub queue_budget: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            expansions_per_step: 32,
            queue_budget: 256,
        }
    }
}

/// Shape of the admissible velocity pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Map units per tick.
    pub max_speed: f32,
    /// Headings sampled per ring.
    pub directions: u32,
    /// Concentric speed rings between zero and `max_speed`.
    pub rings: u32,
    /// Whether standing still is a candidate.
    pub include_stop: bool,
    /// Obstacles farther than this (center to center) are ignored.
    pub neighbor_radius: f32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            max_speed: 0.1,
            directions: 8,
            rings: 2,
            include_stop: true,
            neighbor_radius: 3.0,
        }
    }
}

/// Path following and replanning policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Distance to the destination point that counts as arrived.
    pub arrival_tolerance: f32,
    /// Ticks without entering a new path node before the edge ahead is
    /// blocked and the route replanned. `0` disables stall handling.
    pub stall_ticks: u32,
    /// Ticks after which accumulated blocked edges are forgotten and a
    /// clean route is planned. `0` keeps them forever.
    pub replan_interval: u32,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            arrival_tolerance: 0.05,
            stall_ticks: 40,
            replan_interval: 400,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub search: SearchConfig,
    pub avoidance: AvoidanceConfig,
    pub navigator: NavigatorConfig,
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A search could never make progress.
    ZeroExpansionBudget,
    /// Queue budget smaller than a single search step.
    QueueBudgetTooSmall { queue: usize, step: usize },
    /// Max speed must be positive and finite.
    InvalidMaxSpeed(f32),
    /// At least one heading is needed per ring.
    NoDirections,
    /// Without rings or a stop candidate only the preferred velocity remains.
    NoAvoidanceSamples,
    /// Neighbor radius must be non-negative.
    InvalidNeighborRadius(f32),
    /// Arrival tolerance must be non-negative.
    InvalidArrivalTolerance(f32),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroExpansionBudget => write!(f, "expansions_per_step must be at least 1"),
            ConfigError::QueueBudgetTooSmall { queue, step } => write!(
                f,
                "queue_budget {} is smaller than expansions_per_step {}",
                queue, step
            ),
            ConfigError::InvalidMaxSpeed(v) => write!(f, "max_speed {} must be positive", v),
            ConfigError::NoDirections => write!(f, "directions must be at least 1"),
            ConfigError::NoAvoidanceSamples => {
                write!(f, "rings is 0 and include_stop is off: no avoidance candidates")
            }
            ConfigError::InvalidNeighborRadius(v) => {
                write!(f, "neighbor_radius {} must not be negative", v)
            }
            ConfigError::InvalidArrivalTolerance(v) => {
                write!(f, "arrival_tolerance {} must not be negative", v)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &MotionConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    let search = &config.search;
    if search.expansions_per_step == 0 {
        errors.push(ConfigError::ZeroExpansionBudget);
    }
    if search.queue_budget < search.expansions_per_step {
        errors.push(ConfigError::QueueBudgetTooSmall {
            queue: search.queue_budget,
            step: search.expansions_per_step,
        });
    }

    let avoidance = &config.avoidance;
    if !(avoidance.max_speed.is_finite() && avoidance.max_speed > 0.0) {
        errors.push(ConfigError::InvalidMaxSpeed(avoidance.max_speed));
    }
    if avoidance.directions == 0 {
        errors.push(ConfigError::NoDirections);
    }
    if avoidance.rings == 0 && !avoidance.include_stop {
        errors.push(ConfigError::NoAvoidanceSamples);
    }
    if avoidance.neighbor_radius.is_nan() || avoidance.neighbor_radius < 0.0 {
        errors.push(ConfigError::InvalidNeighborRadius(avoidance.neighbor_radius));
    }

    let tolerance = config.navigator.arrival_tolerance;
    if tolerance.is_nan() || tolerance < 0.0 {
        errors.push(ConfigError::InvalidArrivalTolerance(tolerance));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let errors = validate_config(&MotionConfig::default());
        assert!(errors.is_empty(), "default config should be valid: {errors:?}");
    }

    #[test]
    fn reports_every_problem() {
        let mut config = MotionConfig::default();
        config.search.expansions_per_step = 0;
        config.avoidance.max_speed = -1.0;
        config.avoidance.directions = 0;
        config.avoidance.rings = 0;
        config.avoidance.include_stop = false;
        let errors = validate_config(&config);
        assert!(errors.contains(&ConfigError::ZeroExpansionBudget));
        assert!(errors.contains(&ConfigError::InvalidMaxSpeed(-1.0)));
        assert!(errors.contains(&ConfigError::NoDirections));
        assert!(errors.contains(&ConfigError::NoAvoidanceSamples));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn queue_must_fit_a_step() {
        let mut config = MotionConfig::default();
        config.search.queue_budget = 4;
        config.search.expansions_per_step = 16;
        assert_eq!(
            validate_config(&config),
            vec![ConfigError::QueueBudgetTooSmall { queue: 4, step: 16 }]
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: MotionConfig =
            serde_json::from_str(r#"{ "avoidance": { "max_speed": 0.25 } }"#).unwrap();
        assert_eq!(config.avoidance.max_speed, 0.25);
        assert_eq!(config.avoidance.directions, 8);
        assert_eq!(config.search.expansions_per_step, 32);
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn round_trips_through_json() {
        let json = serde_json::to_string(&MotionConfig::default()).unwrap();
        let back: MotionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.navigator.stall_ticks, 40);
    }
}
