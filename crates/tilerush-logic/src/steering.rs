//! Path following for one entity: turns a [`Path`] into the preferred
//! velocity fed to the motion controller, and replans around congestion.
//!
//! Algorithm per tick:
//! 1. Advance a pending search within the per-step budget.
//! 2. Find the furthest route node (at or after the current one) that
//!    contains the entity; falling off the route triggers a replan.
//! 3. No progress for `stall_ticks` (neither a new node nor a closer
//!    approach to the waypoint) ⇒ block the edge ahead and replan with the
//!    inherited blocked set.
//! 4. Every `replan_interval` ticks, forget blocked edges and replan clean.
//! 5. Head for the midpoint of the edge into the next node, or for the
//!    destination point inside the last node.

use crate::config::{MotionConfig, NavigatorConfig};
use crate::error::PathError;
use crate::geometry::Vec2;
use crate::navmesh::{NavMesh, NodeId};
use crate::path::Path;
use crate::search::BlockedEdges;

/// Fraction of `max_speed` the entity must gain on its waypoint for a tick
/// not to count towards a stall.
const MIN_PROGRESS: f32 = 0.1;

/// What the navigator is doing this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStatus {
    /// No destination.
    Idle,
    /// Waiting for the route search to finish.
    Searching,
    /// Following the route.
    Moving,
    /// Within tolerance of the destination point.
    Arrived,
    /// Reached the end of a route that does not contain the destination.
    Unreachable,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    config: NavigatorConfig,
    expansions_per_step: usize,
    path: Option<Path>,
    /// Index into the route of the node the entity is in.
    progress: usize,
    stalled_ticks: u32,
    /// Nearest the entity has come to its current waypoint.
    closest_approach: f32,
    ticks_since_plan: u32,
    replans: u32,
    status: NavStatus,
}

impl Navigator {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            config: config.navigator.clone(),
            expansions_per_step: config.search.expansions_per_step,
            path: None,
            progress: 0,
            stalled_ticks: 0,
            closest_approach: f32::INFINITY,
            ticks_since_plan: 0,
            replans: 0,
            status: NavStatus::Idle,
        }
    }

    /// Request a fresh route from `position` to `destination`.
    pub fn set_destination(
        &mut self,
        mesh: &NavMesh,
        position: Vec2,
        destination: Vec2,
    ) -> Result<(), PathError> {
        let from = mesh.locate_or_nearest(position).ok_or(PathError::EmptyMesh)?;
        let to = mesh.locate_or_nearest(destination).ok_or(PathError::EmptyMesh)?;
        let path = Path::request(mesh, from, to, destination, BlockedEdges::new())?;
        self.assign_path(path);
        Ok(())
    }

    /// Follow a path computed elsewhere, e.g. by a [`crate::queue::PathQueue`].
    pub fn assign_path(&mut self, path: Path) {
        self.status = if path.is_ready_for_use() {
            NavStatus::Moving
        } else {
            NavStatus::Searching
        };
        self.path = Some(path);
        self.progress = 0;
        self.stalled_ticks = 0;
        self.closest_approach = f32::INFINITY;
        self.ticks_since_plan = 0;
    }

    pub fn clear(&mut self) {
        self.path = None;
        self.status = NavStatus::Idle;
    }

    pub fn status(&self) -> NavStatus {
        self.status
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    /// Number of replans triggered by stalls, drift, or the refresh interval.
    pub fn replans(&self) -> u32 {
        self.replans
    }

    /// Route index of the node the entity currently occupies.
    pub fn progress(&self) -> usize {
        self.progress
    }

    /// Advance navigation and return the preferred velocity for this tick.
    pub fn update(
        &mut self,
        mesh: &NavMesh,
        position: Vec2,
        max_speed: f32,
    ) -> Result<Vec2, PathError> {
        let Some(path) = self.path.as_mut() else {
            self.status = NavStatus::Idle;
            return Ok(Vec2::ZERO);
        };

        if !path.is_ready_for_use() {
            path.step(mesh, self.expansions_per_step);
            if !path.is_ready_for_use() {
                self.status = NavStatus::Searching;
                return Ok(Vec2::ZERO);
            }
        }

        self.ticks_since_plan += 1;
        if self.config.replan_interval > 0
            && self.ticks_since_plan >= self.config.replan_interval
            && !path.blocked_edges().is_empty()
        {
            path.forget_blocked_edges()?;
            log::debug!("forgetting blocked edges after {} ticks", self.ticks_since_plan);
            return self.replan_from(mesh, position);
        }

        let nodes = path.nodes()?;
        let reached = (self.progress..nodes.len())
            .rev()
            .find(|&i| mesh.contains(nodes[i], position));

        match reached {
            Some(i) if i > self.progress => {
                self.progress = i;
                self.stalled_ticks = 0;
                self.closest_approach = f32::INFINITY;
            }
            Some(_) => self.stalled_ticks += 1,
            None => {
                if mesh.locate(position).is_some() {
                    log::debug!("left route at {:?}, replanning", position);
                    return self.replan_from(mesh, position);
                }
                // off the mesh entirely: keep steering back towards the route
                self.stalled_ticks += 1;
            }
        }

        let last = nodes.len() - 1;
        let target_found = path.is_target_found(mesh)?;
        let waypoint = if self.progress < last {
            let (here, ahead) = (nodes[self.progress], nodes[self.progress + 1]);
            mesh.edge(here, ahead)
                .map(|e| e.midpoint())
                .ok_or(PathError::NotAdjacent {
                    from: here,
                    to: ahead,
                })?
        } else if target_found {
            path.to_coords()
        } else {
            let end = mesh.node(nodes[last]).ok_or(PathError::UnknownNode(nodes[last]))?;
            end.centroid()
        };

        // Getting closer to the waypoint counts as progress, even inside one
        // large polygon.
        let remaining = position.distance(waypoint);
        if remaining + max_speed * MIN_PROGRESS < self.closest_approach {
            self.closest_approach = remaining;
            self.stalled_ticks = 0;
        }

        if self.progress < last
            && self.config.stall_ticks > 0
            && self.stalled_ticks >= self.config.stall_ticks
        {
            let (here, ahead) = (nodes[self.progress], nodes[self.progress + 1]);
            log::debug!("stalled on edge {:?} -> {:?}, blocking it", here, ahead);
            path.block_edge(mesh, here, ahead)?;
            return self.replan_from(mesh, position);
        }

        let offset = waypoint - position;
        if self.progress == last {
            if offset.length() <= self.config.arrival_tolerance {
                self.status = if target_found {
                    NavStatus::Arrived
                } else {
                    NavStatus::Unreachable
                };
                return Ok(Vec2::ZERO);
            }
            self.status = NavStatus::Moving;
            return Ok(offset.clamp_length(max_speed));
        }

        self.status = NavStatus::Moving;
        Ok(offset.normalized() * max_speed)
    }

    /// Spawn a new search from the entity's node that inherits the current
    /// blocked edges. The preferred velocity is zero until it finishes.
    fn replan_from(&mut self, mesh: &NavMesh, position: Vec2) -> Result<Vec2, PathError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(Vec2::ZERO);
        };
        let from = mesh.locate_or_nearest(position).ok_or(PathError::EmptyMesh)?;
        let mut replanned = path.replan(mesh, from)?;
        replanned.step(mesh, self.expansions_per_step);
        self.replans += 1;
        self.assign_path(replanned);
        Ok(Vec2::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    fn config() -> MotionConfig {
        let mut config = MotionConfig::default();
        config.search.expansions_per_step = 64;
        config.navigator.stall_ticks = 5;
        config.navigator.replan_interval = 0;
        config
    }

    fn walk(nav: &mut Navigator, mesh: &NavMesh, mut position: Vec2, ticks: usize) -> Vec2 {
        for _ in 0..ticks {
            let v = nav.update(mesh, position, 0.25).unwrap();
            position += v;
        }
        position
    }

    #[test]
    fn idle_without_destination() {
        let mesh = NavMesh::from_grid(2, 1, 1.0, |_, _| true).unwrap();
        let mut nav = Navigator::new(&config());
        assert_eq!(nav.update(&mesh, Vec2::new(0.5, 0.5), 1.0), Ok(Vec2::ZERO));
        assert_eq!(nav.status(), NavStatus::Idle);
    }

    #[test]
    fn walks_corridor_to_destination() {
        let mesh = NavMesh::from_grid(6, 1, 1.0, |_, _| true).unwrap();
        let mut nav = Navigator::new(&config());
        let start = Vec2::new(0.5, 0.5);
        let goal = Vec2::new(5.5, 0.5);
        nav.set_destination(&mesh, start, goal).unwrap();
        let end = walk(&mut nav, &mesh, start, 60);
        assert_eq!(nav.status(), NavStatus::Arrived);
        assert!(end.distance(goal) <= 0.05);
        assert_eq!(nav.replans(), 0);
    }

    #[test]
    fn crossing_wide_cells_is_not_a_stall() {
        // each cell is far wider than stall_ticks × speed
        let mesh = NavMesh::from_grid(2, 1, 10.0, |_, _| true).unwrap();
        let mut nav = Navigator::new(&MotionConfig::default());
        let start = Vec2::new(5.0, 5.0);
        let goal = Vec2::new(15.0, 5.0);
        nav.set_destination(&mesh, start, goal).unwrap();

        let mut position = start;
        for _ in 0..200 {
            position += nav.update(&mesh, position, 0.1).unwrap();
        }
        assert_eq!(nav.status(), NavStatus::Arrived);
        assert!(position.distance(goal) <= 0.05);
        assert_eq!(nav.replans(), 0);
        assert!(nav.path().unwrap().blocked_edges().is_empty());
    }

    #[test]
    fn crosses_large_triangles() {
        let a = Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(0.0, 20.0),
        ]);
        let b = Polygon::new(vec![
            Vec2::new(20.0, 0.0),
            Vec2::new(20.0, 20.0),
            Vec2::new(0.0, 20.0),
        ]);
        let mesh = NavMesh::from_polygons(vec![a, b]).unwrap();
        let mut nav = Navigator::new(&config());
        let start = Vec2::new(3.0, 3.0);
        let goal = Vec2::new(17.0, 17.0);
        nav.set_destination(&mesh, start, goal).unwrap();

        let end = walk(&mut nav, &mesh, start, 200);
        assert_eq!(nav.status(), NavStatus::Arrived);
        assert!(end.distance(goal) <= 0.05);
        assert_eq!(nav.replans(), 0);
    }

    #[test]
    fn pacing_in_place_still_stalls() {
        let mesh = NavMesh::from_grid(2, 1, 10.0, |_, _| true).unwrap();
        let mut nav = Navigator::new(&config());
        let start = Vec2::new(5.0, 5.0);
        nav.set_destination(&mesh, start, Vec2::new(15.0, 5.0)).unwrap();
        // shuffle back and forth without gaining on the edge midpoint
        for tick in 0..8 {
            let x = if tick % 2 == 0 { 5.0 } else { 4.9 };
            nav.update(&mesh, Vec2::new(x, 5.0), 0.25).unwrap();
        }
        assert_eq!(nav.replans(), 1);
        assert!(nav.path().unwrap().blocked_edges().contains(NodeId(0), NodeId(1)));
    }

    #[test]
    fn heads_for_shared_edge_midpoint() {
        let mesh = NavMesh::from_grid(3, 1, 1.0, |_, _| true).unwrap();
        let mut nav = Navigator::new(&config());
        nav.set_destination(&mesh, Vec2::new(0.5, 0.2), Vec2::new(2.5, 0.5))
            .unwrap();
        let v = nav.update(&mesh, Vec2::new(0.5, 0.2), 1.0).unwrap();
        // towards (1.0, 0.5)
        let expected = Vec2::new(0.5, 0.3).normalized();
        assert!((v - expected).length() < 1e-5, "{v:?}");
        assert_eq!(nav.status(), NavStatus::Moving);
    }

    #[test]
    fn stall_blocks_edge_and_replans() {
        // 3×2 grid: 0 1 2 / 3 4 5
        let mesh = NavMesh::from_grid(3, 2, 1.0, |_, _| true).unwrap();
        let mut nav = Navigator::new(&config());
        let stuck = Vec2::new(1.5, 0.5);
        nav.set_destination(&mesh, stuck, Vec2::new(2.5, 0.5)).unwrap();
        // never move: after stall_ticks the 1 -> 2 edge is blocked
        for _ in 0..6 {
            nav.update(&mesh, stuck, 0.25).unwrap();
        }
        assert_eq!(nav.replans(), 1);
        let path = nav.path().unwrap();
        assert!(path.blocked_edges().contains(NodeId(1), NodeId(2)));
        assert_eq!(path.from_node(), NodeId(1));
        let nodes = path.nodes().unwrap();
        assert!(!nodes.windows(2).any(|w| w == [NodeId(1), NodeId(2)]));
    }

    #[test]
    fn unreachable_destination_stops_at_closest_node() {
        // . . # .
        let mesh = NavMesh::from_grid(4, 1, 1.0, |c, _| c != 2).unwrap();
        let mut nav = Navigator::new(&config());
        let start = Vec2::new(0.5, 0.5);
        nav.set_destination(&mesh, start, Vec2::new(3.5, 0.5)).unwrap();
        let end = walk(&mut nav, &mesh, start, 40);
        assert_eq!(nav.status(), NavStatus::Unreachable);
        assert!(end.distance(Vec2::new(1.5, 0.5)) <= 0.05);
    }

    #[test]
    fn searching_until_budget_allows() {
        let mesh = NavMesh::from_grid(30, 1, 1.0, |_, _| true).unwrap();
        let mut cfg = config();
        cfg.search.expansions_per_step = 4;
        cfg.navigator.stall_ticks = 0;
        let mut nav = Navigator::new(&cfg);
        let start = Vec2::new(0.5, 0.5);
        nav.set_destination(&mesh, start, Vec2::new(29.5, 0.5)).unwrap();
        assert_eq!(nav.status(), NavStatus::Searching);
        assert_eq!(nav.update(&mesh, start, 0.5), Ok(Vec2::ZERO));
        assert_eq!(nav.status(), NavStatus::Searching);
        for _ in 0..10 {
            nav.update(&mesh, start, 0.5).unwrap();
        }
        assert_eq!(nav.status(), NavStatus::Moving);
    }

    #[test]
    fn refresh_interval_forgets_blocked_edges() {
        let mesh = NavMesh::from_grid(3, 2, 1.0, |_, _| true).unwrap();
        let mut cfg = config();
        cfg.navigator.replan_interval = 3;
        cfg.navigator.stall_ticks = 0;
        let mut nav = Navigator::new(&cfg);
        let here = Vec2::new(0.5, 0.5);
        let mut blocked = BlockedEdges::new();
        blocked.block(&mesh, NodeId(0), NodeId(1)).unwrap();
        let mut path =
            Path::request(&mesh, NodeId(0), NodeId(2), Vec2::new(2.5, 0.5), blocked).unwrap();
        path.step(&mesh, usize::MAX);
        nav.assign_path(path);

        for _ in 0..3 {
            nav.update(&mesh, here, 0.1).unwrap();
        }
        assert_eq!(nav.replans(), 1);
        assert!(nav.path().unwrap().blocked_edges().is_empty());
    }
}
