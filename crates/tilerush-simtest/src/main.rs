//! Tilerush Headless Simulation Harness
//!
//! Drives agents across grid maps with the pure motion logic and checks
//! that they arrive, stay on the mesh, and never trip a path contract.
//! Runs entirely in-process with no renderer and no game loop.
//!
//! Usage:
//!   cargo run -p tilerush-simtest
//!   cargo run -p tilerush-simtest -- --verbose
//!   cargo run -p tilerush-simtest -- path/to/scenarios.json
//!   RUST_LOG=debug cargo run -p tilerush-simtest

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tilerush_logic::avoidance::sample_velocities;
use tilerush_logic::config::{validate_config, MotionConfig};
use tilerush_logic::geometry::{Rect, Vec2};
use tilerush_logic::motion::{Actuator, DynamicObstacle, MotionController};
use tilerush_logic::navmesh::{MeshError, NavMesh};
use tilerush_logic::path::Path;
use tilerush_logic::queue::{PathQueue, Ticket};
use tilerush_logic::search::BlockedEdges;
use tilerush_logic::snapshot::ObstacleSnapshot;
use tilerush_logic::steering::{NavStatus, Navigator};

// ── Scenario file ───────────────────────────────────────────────────────
const SCENARIOS_JSON: &str = include_str!("../../../data/scenarios.json");

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    #[serde(default = "default_cell_size")]
    cell_size: f32,
    /// Grid rows: `.` is walkable, anything else is a wall.
    map: Vec<String>,
    agents: Vec<AgentSpec>,
    ticks: u32,
    #[serde(default)]
    seed: u64,
    /// Maximum spawn offset on each axis.
    #[serde(default)]
    jitter: f32,
    #[serde(default)]
    config: Option<MotionConfig>,
    #[serde(default)]
    expect: Expectation,
}

#[derive(Debug, Deserialize)]
struct AgentSpec {
    name: String,
    start: [f32; 2],
    goal: [f32; 2],
    #[serde(default = "default_agent_size")]
    size: f32,
}

#[derive(Debug, Default, Deserialize)]
struct Expectation {
    #[serde(default)]
    min_arrived: usize,
    /// Agents whose goal cannot be reached.
    #[serde(default)]
    unreachable: Vec<String>,
}

fn default_cell_size() -> f32 {
    1.0
}

fn default_agent_size() -> f32 {
    0.4
}

// ── Agent components ────────────────────────────────────────────────────

#[derive(Debug)]
struct Agent {
    name: String,
    goal: Vec2,
    ticket: Option<Ticket>,
    arrived_at: Option<u32>,
}

/// Physical state of an agent, driven through the [`Actuator`] contract.
#[derive(Debug, Default)]
struct Body {
    footprint: Rect,
    velocity: Vec2,
    preferred: Vec2,
    candidates: Vec<Vec2>,
    obstacles: Vec<DynamicObstacle>,
}

impl Actuator for Body {
    fn current_position(&self) -> Rect {
        self.footprint
    }

    fn current_velocity(&self) -> Vec2 {
        self.velocity
    }

    fn preferred_velocity(&self) -> Vec2 {
        self.preferred
    }

    fn admissible_velocities(&self) -> &[Vec2] {
        &self.candidates
    }

    fn dynamic_obstacles(&self) -> &[DynamicObstacle] {
        &self.obstacles
    }

    fn set_velocity(&mut self, index: usize) {
        if let Some(&v) = self.candidates.get(index) {
            self.velocity = v;
        }
    }
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

#[derive(Debug, Default)]
struct RunStats {
    arrived: usize,
    unreachable: Vec<String>,
    path_errors: usize,
    reverted_moves: usize,
    overlap_ticks: u32,
    replans: u32,
    off_mesh: usize,
}

fn main() {
    env_logger::init();

    let verbose = std::env::args().any(|a| a == "--verbose");
    let scenario_path = std::env::args().skip(1).find(|a| !a.starts_with("--"));
    println!("=== Tilerush Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Built-in configuration checks
    results.extend(validate_default_config(verbose));

    // 2. Scenarios
    let source = match &scenario_path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("cannot read {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => SCENARIOS_JSON.to_string(),
    };
    results.extend(run_scenarios(&source, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_default_config(verbose: bool) -> Vec<TestResult> {
    println!("--- Configuration ---");
    let mut results = Vec::new();

    let errors = validate_config(&MotionConfig::default());
    results.push(TestResult {
        name: "default_config_valid".into(),
        passed: errors.is_empty(),
        detail: if errors.is_empty() {
            "defaults pass validation".into()
        } else {
            format!("{} problems: {:?}", errors.len(), errors)
        },
    });

    let mut broken = MotionConfig::default();
    broken.search.expansions_per_step = 0;
    broken.avoidance.max_speed = -1.0;
    let errors = validate_config(&broken);
    results.push(TestResult {
        name: "broken_config_rejected".into(),
        passed: errors.len() >= 2,
        detail: format!("{} problems reported", errors.len()),
    });

    if verbose {
        for e in &errors {
            println!("    {}", e);
        }
    }
    results
}

// ── 2. Scenarios ────────────────────────────────────────────────────────

fn run_scenarios(source: &str, verbose: bool) -> Vec<TestResult> {
    let scenarios: Vec<Scenario> = match serde_json::from_str(source) {
        Ok(s) => s,
        Err(e) => {
            return vec![TestResult {
                name: "scenarios_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            }];
        }
    };

    let mut results = vec![TestResult {
        name: "scenarios_not_empty".into(),
        passed: !scenarios.is_empty(),
        detail: format!("{} scenarios loaded", scenarios.len()),
    }];

    for scenario in &scenarios {
        results.extend(run_scenario(scenario, verbose));
    }
    results
}

fn build_mesh(scenario: &Scenario) -> Result<NavMesh, MeshError> {
    let rows = &scenario.map;
    let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    NavMesh::from_grid(columns, rows.len(), scenario.cell_size, |c, r| {
        rows[r].as_bytes().get(c) == Some(&b'.')
    })
}

fn run_scenario(scenario: &Scenario, verbose: bool) -> Vec<TestResult> {
    println!("--- Scenario: {} ---", scenario.name);
    let mut results = Vec::new();
    let prefix = &scenario.name;

    let config = scenario.config.clone().unwrap_or_default();
    let problems = validate_config(&config);
    results.push(TestResult {
        name: format!("{}_config_valid", prefix),
        passed: problems.is_empty(),
        detail: if problems.is_empty() {
            "config ok".into()
        } else {
            format!("{:?}", problems)
        },
    });
    if !problems.is_empty() {
        return results;
    }

    let mesh = match build_mesh(scenario) {
        Ok(mesh) => mesh,
        Err(e) => {
            results.push(TestResult {
                name: format!("{}_map_built", prefix),
                passed: false,
                detail: format!("map error: {}", e),
            });
            return results;
        }
    };
    let misplaced: Vec<_> = scenario
        .agents
        .iter()
        .filter(|a| mesh.locate(Vec2::new(a.start[0], a.start[1])).is_none())
        .map(|a| a.name.as_str())
        .collect();
    results.push(TestResult {
        name: format!("{}_spawns_on_mesh", prefix),
        passed: !mesh.is_empty() && misplaced.is_empty(),
        detail: if misplaced.is_empty() {
            format!("{} nodes, {} edges", mesh.node_count(), mesh.edge_count())
        } else {
            format!("agents off the mesh: {:?}", misplaced)
        },
    });
    if mesh.is_empty() || !misplaced.is_empty() {
        return results;
    }

    let (world, stats) = simulate(scenario, &mesh, &config);

    if verbose {
        for (_, (agent, controller)) in world.query::<(&Agent, &MotionController<Body>)>().iter() {
            println!(
                "    {:<10} at {:>5.2},{:>5.2}  arrived {:?}",
                agent.name,
                controller.actuator().footprint.center().x,
                controller.actuator().footprint.center().y,
                agent.arrived_at
            );
        }
        println!(
            "    {} replans, {} reverted moves, {} overlap ticks",
            stats.replans, stats.reverted_moves, stats.overlap_ticks
        );
    }

    results.push(TestResult {
        name: format!("{}_arrivals", prefix),
        passed: stats.arrived >= scenario.expect.min_arrived,
        detail: format!(
            "{}/{} arrived (need {})",
            stats.arrived,
            scenario.agents.len(),
            scenario.expect.min_arrived
        ),
    });

    let missing: Vec<_> = scenario
        .expect
        .unreachable
        .iter()
        .filter(|name| !stats.unreachable.contains(*name))
        .collect();
    results.push(TestResult {
        name: format!("{}_unreachable_reported", prefix),
        passed: missing.is_empty(),
        detail: if missing.is_empty() {
            format!("{} agents gave up at the closest node", stats.unreachable.len())
        } else {
            format!("expected unreachable: {:?}", missing)
        },
    });

    results.push(TestResult {
        name: format!("{}_no_path_errors", prefix),
        passed: stats.path_errors == 0,
        detail: format!("{} path contract errors", stats.path_errors),
    });

    results.push(TestResult {
        name: format!("{}_stays_on_mesh", prefix),
        passed: stats.off_mesh == 0,
        detail: format!("{} agents ended off the mesh", stats.off_mesh),
    });

    results
}

/// Spawn agents, run the scenario for its tick count, and collect stats.
fn simulate(scenario: &Scenario, mesh: &NavMesh, config: &MotionConfig) -> (World, RunStats) {
    let mut world = World::new();
    let mut rng = StdRng::seed_from_u64(scenario.seed);
    let mut queue = PathQueue::new();
    let mut stats = RunStats::default();

    for spec in &scenario.agents {
        let start = Vec2::new(spec.start[0], spec.start[1]);
        let goal = Vec2::new(spec.goal[0], spec.goal[1]);
        let mut position = start;
        if scenario.jitter > 0.0 {
            let j = scenario.jitter;
            let jittered = start + Vec2::new(rng.gen_range(-j..=j), rng.gen_range(-j..=j));
            if mesh.locate(jittered).is_some() {
                position = jittered;
            }
        }

        let ticket = match (mesh.locate_or_nearest(position), mesh.locate_or_nearest(goal)) {
            (Some(from), Some(to)) => match Path::request(mesh, from, to, goal, BlockedEdges::new()) {
                Ok(path) => Some(queue.submit(path)),
                Err(e) => {
                    log::warn!("{}: path request failed: {}", spec.name, e);
                    stats.path_errors += 1;
                    None
                }
            },
            _ => None,
        };

        let body = Body {
            footprint: Rect::centered(position, spec.size, spec.size),
            ..Default::default()
        };
        world.spawn((
            Agent {
                name: spec.name.clone(),
                goal,
                ticket,
                arrived_at: None,
            },
            Navigator::new(config),
            MotionController::new(body),
        ));
    }

    for tick in 0..scenario.ticks {
        queue.update(mesh, config.search.queue_budget);
        step_agents(&mut world, mesh, config, &mut queue, &mut stats, tick);
        stats.reverted_moves += integrate(&mut world, mesh);
        if count_overlaps(&world) > 0 {
            stats.overlap_ticks += 1;
        }
    }

    for (_, (agent, navigator, controller)) in world
        .query::<(&Agent, &Navigator, &MotionController<Body>)>()
        .iter()
    {
        if agent.arrived_at.is_some() {
            stats.arrived += 1;
        }
        if navigator.status() == NavStatus::Unreachable {
            stats.unreachable.push(agent.name.clone());
        }
        if mesh.locate(controller.actuator().footprint.center()).is_none() {
            stats.off_mesh += 1;
        }
        stats.replans += navigator.replans();
    }

    (world, stats)
}

/// One decision pass: every agent reads the same start-of-frame snapshot.
fn step_agents(
    world: &mut World,
    mesh: &NavMesh,
    config: &MotionConfig,
    queue: &mut PathQueue,
    stats: &mut RunStats,
    tick: u32,
) {
    let snapshot: ObstacleSnapshot<Entity> = world
        .query::<&MotionController<Body>>()
        .iter()
        .map(|(entity, controller)| {
            let body = controller.actuator();
            (
                entity,
                DynamicObstacle {
                    position: body.footprint,
                    velocity: body.velocity,
                },
            )
        })
        .collect();

    let avoidance = &config.avoidance;
    for (entity, (agent, navigator, controller)) in
        world.query_mut::<(&mut Agent, &mut Navigator, &mut MotionController<Body>)>()
    {
        if let Some(ticket) = agent.ticket {
            match queue.take(ticket) {
                Some(path) => {
                    navigator.assign_path(path);
                    agent.ticket = None;
                }
                None => {
                    controller.actuator_mut().velocity = Vec2::ZERO;
                    continue;
                }
            }
        }

        let position = controller.actuator().footprint.center();
        let preferred = match navigator.update(mesh, position, avoidance.max_speed) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("{}: navigation failed: {}", agent.name, e);
                stats.path_errors += 1;
                Vec2::ZERO
            }
        };

        if navigator.status() == NavStatus::Arrived && agent.arrived_at.is_none() {
            log::info!("{} arrived at {:?} on tick {}", agent.name, agent.goal, tick);
            agent.arrived_at = Some(tick);
        }

        let body = controller.actuator_mut();
        body.preferred = preferred;
        body.candidates = sample_velocities(preferred, avoidance);
        body.obstacles = snapshot.obstacles_near(entity, &body.footprint, avoidance.neighbor_radius);

        if controller.update_velocity().is_none() {
            // every candidate is already touching something: hold position
            controller.actuator_mut().velocity = Vec2::ZERO;
        }
    }
}

/// Apply velocities. A move that would carry an agent's center off the mesh
/// is reverted. Returns the number of reverted moves.
fn integrate(world: &mut World, mesh: &NavMesh) -> usize {
    let mut reverted = 0;
    for (_, controller) in world.query_mut::<&mut MotionController<Body>>() {
        let body = controller.actuator_mut();
        let moved = body.footprint.translated(body.velocity);
        if mesh.locate(moved.center()).is_some() {
            body.footprint = moved;
        } else {
            body.velocity = Vec2::ZERO;
            reverted += 1;
        }
    }
    reverted
}

fn count_overlaps(world: &World) -> usize {
    let footprints: Vec<Rect> = world
        .query::<&MotionController<Body>>()
        .iter()
        .map(|(_, c)| c.actuator().footprint)
        .collect();
    let mut overlaps = 0;
    for (i, a) in footprints.iter().enumerate() {
        overlaps += footprints[i + 1..].iter().filter(|b| a.intersects(b)).count();
    }
    overlaps
}
