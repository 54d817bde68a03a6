//! Start-of-frame capture of every moving footprint.
//!
//! All controllers in a frame read obstacles from the same snapshot, so the
//! order in which entities are updated never changes what they see.

use crate::geometry::Rect;
use crate::motion::DynamicObstacle;

/// Obstacle positions and velocities keyed by the owning entity.
#[derive(Debug, Clone)]
pub struct ObstacleSnapshot<K> {
    entries: Vec<(K, DynamicObstacle)>,
}

impl<K> Default for ObstacleSnapshot<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Copy + PartialEq> ObstacleSnapshot<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: K, obstacle: DynamicObstacle) {
        self.entries.push((key, obstacle));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: K) -> Option<&DynamicObstacle> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, o)| o)
    }

    /// Obstacles other than `key` whose centers lie within `radius` of
    /// `around`'s center, in capture order.
    pub fn obstacles_near(&self, key: K, around: &Rect, radius: f32) -> Vec<DynamicObstacle> {
        let center = around.center();
        self.entries
            .iter()
            .filter(|(k, o)| *k != key && o.position.center().distance(center) <= radius)
            .map(|&(_, o)| o)
            .collect()
    }
}

impl<K> FromIterator<(K, DynamicObstacle)> for ObstacleSnapshot<K> {
    fn from_iter<I: IntoIterator<Item = (K, DynamicObstacle)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
