use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use mf_core::kind::{Camera, MapGame, Monster, Player, Trap, TreasureBox};
use mf_core::{EntityType, HeadlessViews, ViewSyncSystem, World, WorldConfig};
use mf_simulation::{MovementSystem, Scheduler, SchedulerConfig};

const PLAYER_PREFAB: &str = "prefabs/player";
const MONSTER_PREFAB: &str = "prefabs/monster";
const MAP_HALF_EXTENT: f32 = 20.0;
// Longest simulated frame accepted, jitter included.
const MAX_FRAME_SECS: f64 = 60.0;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of render frames to simulate
    #[arg(short = 'n', long, default_value_t = 300)]
    pub frames: u64,

    /// Nominal render frame rate
    #[arg(long, default_value_t = 60.0)]
    pub fps: f64,

    /// Relative frame-time jitter in [0, 1)
    #[arg(long, default_value_t = 0.0)]
    pub jitter: f64,

    /// Random seed for map layout and jitter
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of monsters to spawn
    #[arg(long, default_value_t = 8)]
    pub monsters: u32,

    /// Number of traps to spawn, each with a treasure box nearby
    #[arg(long, default_value_t = 3)]
    pub traps: u32,

    /// Physics rate in Hz, overriding the config's fixed timestep
    #[arg(long)]
    pub physics_hz: Option<u32>,

    /// Scheduler config as JSON
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print a summary line per simulated second and enable debug logs
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run(args: &SimulateArgs) -> Result<(), String> {
    if !args.fps.is_finite() || args.fps <= 0.0 {
        return Err(format!("--fps must be positive, got {}", args.fps));
    }
    if !(0.0..1.0).contains(&args.jitter) {
        return Err(format!("--jitter must be in [0, 1), got {}", args.jitter));
    }

    let mut config = super::load_config(args.config.as_deref())?;
    if let Some(hz) = args.physics_hz {
        if hz == 0 {
            return Err("--physics-hz must be positive".into());
        }
        config = config.with_fixed_timestep_ms(u64::from((1000 / hz).max(1)));
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let world = build_map(args, &config, &mut rng)?;
    let spawned = world.entity_count();
    let mut sched = Scheduler::new(world, config).map_err(|e| e.to_string())?;

    let nominal = 1.0 / args.fps;
    if nominal * (1.0 + args.jitter) > MAX_FRAME_SECS {
        return Err(format!(
            "--fps {} gives frames longer than {MAX_FRAME_SECS}s",
            args.fps
        ));
    }
    let fixed = sched.config().fixed_timestep();
    let mut physics_bank = Duration::ZERO;
    let mut elapsed = Duration::ZERO;
    let mut next_summary = Duration::from_secs(1);

    for _ in 0..args.frames {
        let secs = if args.jitter > 0.0 {
            nominal * (1.0 + rng.random_range(-args.jitter..=args.jitter))
        } else {
            nominal
        };
        let delta = Duration::try_from_secs_f64(secs)
            .map_err(|e| format!("frame time of {secs}s is out of range: {e}"))?;

        physics_bank += delta;
        while physics_bank >= fixed {
            physics_bank -= fixed;
            sched
                .physics_step()
                .map_err(|e| format!("physics step failed: {e}"))?;
        }
        let report = sched
            .frame(delta)
            .map_err(|e| format!("render frame failed: {e}"))?;
        elapsed += delta;

        if args.verbose && elapsed >= next_summary {
            next_summary += Duration::from_secs(1);
            println!(
                "  {} fps={} logic={} bank={:.1}ms",
                format!("[{:>3}s]", elapsed.as_secs()).dimmed(),
                sched.fps(),
                report.logic_frame,
                report.bank.as_secs_f64() * 1000.0
            );
        }
    }

    print_summary(args, &sched, spawned, elapsed);

    sched.stop();
    let world = sched.world();
    let released = world
        .views_as::<HeadlessViews>()
        .map_or(0, HeadlessViews::released);
    let stats = world.pool_stats();
    info!(released, outstanding = stats.outstanding, "teardown complete");
    println!(
        "  {} {} entities left, {} systems left, {} views released, {} leases outstanding",
        "Teardown".bold(),
        world.entity_count(),
        world.system_count(),
        released,
        stats.outstanding
    );
    Ok(())
}

fn build_map(
    args: &SimulateArgs,
    config: &SchedulerConfig,
    rng: &mut StdRng,
) -> Result<World, String> {
    let mut world = World::with_config(
        WorldConfig::new("demo-map").with_event_history(config.event_history),
    );
    world.create_system(MovementSystem::new());
    world.create_system(ViewSyncSystem::new());

    let spawn_err = |e: mf_core::EcsError| format!("cannot build map: {e}");
    world
        .create_entity(Camera {
            yaw: 45f32.to_radians(),
            ..Camera::default()
        })
        .map_err(spawn_err)?;
    world.create_entity(MapGame).map_err(spawn_err)?;
    world
        .create_entity(Player::at(0.0, 0.0).with_view(PLAYER_PREFAB))
        .map_err(spawn_err)?;

    for _ in 0..args.monsters {
        let (x, y) = random_point(rng);
        let monster = Monster::at(x, y)
            .with_velocity(rng.random_range(-2.0..2.0), rng.random_range(-2.0..2.0))
            .with_health(rng.random_range(50..=150))
            .with_view(MONSTER_PREFAB);
        world.create_entity(monster).map_err(spawn_err)?;
    }

    for _ in 0..args.traps {
        let (x, y) = random_point(rng);
        let radius = rng.random_range(0.5..=2.0);
        world
            .create_entity(Trap::at(x, y, radius))
            .map_err(spawn_err)?;
        let gold = rng.random_range(10..=100);
        world
            .create_entity(TreasureBox::at(x + radius + 1.0, y, gold))
            .map_err(spawn_err)?;
    }

    debug!(entities = world.entity_count(), "map built");
    Ok(world)
}

fn random_point(rng: &mut StdRng) -> (f32, f32) {
    (
        rng.random_range(-MAP_HALF_EXTENT..MAP_HALF_EXTENT),
        rng.random_range(-MAP_HALF_EXTENT..MAP_HALF_EXTENT),
    )
}

fn print_summary(args: &SimulateArgs, sched: &Scheduler, spawned: usize, elapsed: Duration) {
    let world = sched.world();
    println!(
        "  {} '{}' {}",
        "Simulation".bold(),
        world.name(),
        format!(
            "({} frames at {} fps, jitter={}, seed={})",
            args.frames, args.fps, args.jitter, args.seed
        )
        .dimmed()
    );
    println!(
        "  {} entities spawned, {:.3}s simulated",
        spawned,
        elapsed.as_secs_f64()
    );
    println!();

    println!("  {}", "Scheduler".bold().underline());
    println!();
    let stats = world.pool_stats();
    let views = world.views_as::<HeadlessViews>();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Render frames".to_string(), sched.render_frames().to_string()]);
    table.add_row(vec!["Logic frames".to_string(), sched.clock().logic_frame().to_string()]);
    table.add_row(vec!["Physics steps".to_string(), sched.physics_steps().to_string()]);
    table.add_row(vec!["FPS".to_string(), sched.fps().to_string()]);
    table.add_row(vec![
        "Bank".to_string(),
        format!("{:.3}ms", sched.clock().banked().as_secs_f64() * 1000.0),
    ]);
    table.add_row(vec!["Components constructed".to_string(), stats.constructed.to_string()]);
    table.add_row(vec!["Components leased".to_string(), stats.outstanding.to_string()]);
    table.add_row(vec!["Components idle".to_string(), stats.idle.to_string()]);
    table.add_row(vec![
        "Views attached".to_string(),
        views.map_or(0, HeadlessViews::attached).to_string(),
    ]);
    table.add_row(vec!["Events".to_string(), world.events().total().to_string()]);
    println!("{table}");
    println!();

    println!("  {}", "Entities".bold().underline());
    println!();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Type", "Count"]);
    for ty in EntityType::ALL {
        let count = world.entities_of_type(ty).len();
        if count > 0 {
            table.add_row(vec![ty.to_string(), count.to_string()]);
        }
    }
    println!("{table}");
    println!();
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_8;

    use mf_core::component::Rotation;

    use super::*;

    fn args() -> SimulateArgs {
        SimulateArgs {
            frames: 1,
            fps: 60.0,
            jitter: 0.0,
            seed: 1,
            monsters: 2,
            traps: 1,
            physics_hz: None,
            config: None,
            verbose: false,
        }
    }

    #[test]
    fn camera_looks_down_the_diagonal() {
        let mut rng = StdRng::seed_from_u64(1);
        let world = build_map(&args(), &SchedulerConfig::default(), &mut rng).unwrap();
        let camera = world.entities_of_type(EntityType::Camera)[0];
        let rot = world.component::<Rotation>(camera).unwrap();
        assert!((rot.y - FRAC_PI_8.sin()).abs() < 1e-6);
        assert!((rot.w - FRAC_PI_8.cos()).abs() < 1e-6);
    }

    #[test]
    fn map_has_every_requested_entity() {
        let mut rng = StdRng::seed_from_u64(1);
        let world = build_map(&args(), &SchedulerConfig::default(), &mut rng).unwrap();
        assert_eq!(world.entities_of_type(EntityType::Monster).len(), 2);
        assert_eq!(world.entities_of_type(EntityType::Trap).len(), 1);
        assert_eq!(world.entities_of_type(EntityType::TreasureBox).len(), 1);
        assert_eq!(world.entity_count(), 7);
    }
}
