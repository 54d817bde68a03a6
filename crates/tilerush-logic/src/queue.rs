//! Cooperative scheduler for many in-flight path searches.
//!
//! Each tick the queue hands out a fixed expansion budget, split evenly
//! between pending searches in submission order. Finished paths wait in the
//! queue until their owner collects them with [`PathQueue::take`].

use crate::navmesh::NavMesh;
use crate::path::Path;
use std::collections::{HashMap, VecDeque};

/// Handle returned by [`PathQueue::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct PathQueue {
    pending: VecDeque<(Ticket, Path)>,
    finished: HashMap<Ticket, Path>,
    next_ticket: u64,
}

impl PathQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, path: Path) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        if path.is_ready_for_use() {
            self.finished.insert(ticket, path);
        } else {
            self.pending.push_back((ticket, path));
        }
        ticket
    }

    /// Advance pending searches by up to `budget` expansions in total.
    ///
    /// Returns the expansions actually performed.
    pub fn update(&mut self, mesh: &NavMesh, budget: usize) -> usize {
        let mut remaining = budget;
        let mut visits = self.pending.len();
        let mut spent = 0;

        while remaining > 0 && visits > 0 {
            let Some((ticket, mut path)) = self.pending.pop_front() else {
                break;
            };
            visits -= 1;

            let share = (remaining / (visits + 1)).max(1);
            let before = path.expansions();
            path.step(mesh, share);
            let used = path.expansions() - before;
            spent += used;
            remaining = remaining.saturating_sub(used.max(1));

            if path.is_ready_for_use() {
                self.finished.insert(ticket, path);
            } else {
                self.pending.push_back((ticket, path));
            }
        }
        spent
    }

    pub fn is_finished(&self, ticket: Ticket) -> bool {
        self.finished.contains_key(&ticket)
    }

    /// Remove and return a finished path.
    pub fn take(&mut self, ticket: Ticket) -> Option<Path> {
        self.finished.remove(&ticket)
    }

    /// Drop a search whether or not it has finished.
    pub fn cancel(&mut self, ticket: Ticket) -> bool {
        if self.finished.remove(&ticket).is_some() {
            return true;
        }
        let before = self.pending.len();
        self.pending.retain(|(t, _)| *t != ticket);
        self.pending.len() != before
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn finished_len(&self) -> usize {
        self.finished.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use crate::navmesh::NodeId;
    use crate::search::BlockedEdges;

    fn long_corridor() -> NavMesh {
        NavMesh::from_grid(20, 1, 1.0, |_, _| true).unwrap()
    }

    fn request(mesh: &NavMesh, to: u32) -> Path {
        Path::request(
            mesh,
            NodeId(0),
            NodeId(to),
            Vec2::new(to as f32 + 0.5, 0.5),
            BlockedEdges::new(),
        )
        .unwrap()
    }

    #[test]
    fn budget_is_shared() {
        let mesh = long_corridor();
        let mut queue = PathQueue::new();
        let a = queue.submit(request(&mesh, 19));
        let b = queue.submit(request(&mesh, 19));

        let spent = queue.update(&mesh, 10);
        assert_eq!(spent, 10);
        assert_eq!(queue.pending_len(), 2);

        // 20 expansions each to close the target
        for _ in 0..10 {
            queue.update(&mesh, 10);
        }
        assert!(queue.is_finished(a));
        assert!(queue.is_finished(b));
        assert_eq!(queue.pending_len(), 0);

        let path = queue.take(a).unwrap();
        assert_eq!(path.len(), Ok(20));
        assert!(queue.take(a).is_none());
    }

    #[test]
    fn trivial_request_finishes_on_submit_or_first_update() {
        let mesh = long_corridor();
        let mut queue = PathQueue::new();
        let t = queue.submit(request(&mesh, 0));
        queue.update(&mesh, 1);
        assert!(queue.is_finished(t));
    }

    #[test]
    fn cancel_removes_pending_and_finished() {
        let mesh = long_corridor();
        let mut queue = PathQueue::new();
        let a = queue.submit(request(&mesh, 19));
        assert!(queue.cancel(a));
        assert!(!queue.cancel(a));
        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.update(&mesh, 100), 0);
    }
}
