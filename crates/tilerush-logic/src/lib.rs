//! Pure motion control and pathfinding for Tilerush.
//!
//! This crate contains the unit navigation core independent of any renderer,
//! map loader, or entity framework. Functions take plain data and return
//! results, making them unit-testable and usable from the headless harness
//! as well as the game.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`avoidance`] | Admissible velocity sampling around the preferred velocity |
//! | [`collision`] | Closed-form time-to-collision of two moving rectangles |
//! | [`config`] | Search, avoidance and navigator tunables with validation |
//! | [`error`] | Contract-violation errors for paths and searches |
//! | [`geometry`] | `Vec2`, `Rect`, convex `Polygon` |
//! | [`motion`] | `Actuator` trait and the RVO motion controller |
//! | [`navmesh`] | Convex-polygon navigation mesh and its builder |
//! | [`path`] | Lazily materialized route over a search |
//! | [`queue`] | Budgeted round-robin stepping of many searches |
//! | [`search`] | Resumable A* with blocked-edge filtering |
//! | [`snapshot`] | Start-of-frame obstacle capture |
//! | [`steering`] | Path following, stall detection and replanning |
//!
//! # Per-tick flow
//!
//! ```
//! use tilerush_logic::config::MotionConfig;
//! use tilerush_logic::geometry::Vec2;
//! use tilerush_logic::navmesh::NavMesh;
//! use tilerush_logic::steering::{NavStatus, Navigator};
//!
//! let mesh = NavMesh::from_grid(4, 1, 1.0, |_, _| true).unwrap();
//! let mut nav = Navigator::new(&MotionConfig::default());
//! nav.set_destination(&mesh, Vec2::new(0.5, 0.5), Vec2::new(3.5, 0.5)).unwrap();
//! let preferred = nav.update(&mesh, Vec2::new(0.5, 0.5), 0.1).unwrap();
//! assert_eq!(nav.status(), NavStatus::Moving);
//! assert!(preferred.x > 0.0);
//! ```

pub mod avoidance;
pub mod collision;
pub mod config;
pub mod error;
pub mod geometry;
pub mod motion;
pub mod navmesh;
pub mod path;
pub mod queue;
pub mod search;
pub mod snapshot;
pub mod steering;
