//! Gravity Particle Simulation
//!
//! Headless driver: spawns a random population and advances it frame by frame,
//! logging aggregate statistics along the way.

use clap::{Parser, ValueEnum};
use glam::Vec3;
use particle_physics::{
    CollisionPolicy, ContactRule, ForceMode, FORCE_CELL_SIZE, G, PARTICLE_RADIUS,
};
use particle_simulation::{
    AcceleratorBridge, HostBackend, Simulation, SimulationConfig, WgpuBackend,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

const SPAWN_RADIUS: f32 = 100.0;
const STATS_EVERY: u32 = 60;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Forces {
    /// Every pair, O(n²)
    Direct,
    /// Only particles in neighboring hash cells
    Hash,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Collisions {
    /// Touching particles (sum of radii) fuse into one
    Merge,
    /// Element particles fuse within a fixed contact radius
    MergeFixed,
    /// Overlapping particles bounce
    Elastic,
    None,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    /// wgpu compute device, CPU when none is found
    Gpu,
    /// Offload kernel run on the host, for checking the offload path
    Host,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of particles to spawn
    #[arg(short = 'n', long, default_value_t = 500)]
    count: usize,
    /// Number of frames to run
    #[arg(short, long, default_value_t = 600)]
    frames: u32,
    /// Frames per second fed into the fixed-timestep accumulator
    #[arg(long, default_value_t = 60.0)]
    frame_rate: f32,
    /// Seed for the population, random when omitted
    #[arg(short, long)]
    seed: Option<u64>,
    /// Spawn massive bodies instead of element particles
    #[arg(long, default_value_t = false)]
    bodies: bool,
    #[arg(long, value_enum, default_value_t = Forces::Hash)]
    forces: Forces,
    #[arg(long, value_enum, default_value_t = Collisions::Merge)]
    collisions: Collisions,
    /// Gravitational constant
    #[arg(short, long, default_value_t = G)]
    gravity: f32,
    /// Compute backend used for offloaded steps
    #[arg(long, value_enum, default_value_t = Backend::Gpu)]
    backend: Backend,
    /// Never offload, ignores --backend
    #[arg(long, default_value_t = false)]
    cpu_only: bool,
}

impl Args {
    fn config(&self) -> SimulationConfig {
        let force_mode = match self.forces {
            Forces::Direct => ForceMode::Direct,
            Forces::Hash => ForceMode::SpatialHash {
                cell_size: FORCE_CELL_SIZE,
            },
        };
        let collision = match self.collisions {
            Collisions::Merge => CollisionPolicy::Merge {
                contact: ContactRule::SumOfRadii,
            },
            Collisions::MergeFixed => CollisionPolicy::Merge {
                contact: ContactRule::FixedRadius(PARTICLE_RADIUS),
            },
            Collisions::Elastic => CollisionPolicy::Elastic,
            Collisions::None => CollisionPolicy::Disabled,
        };

        SimulationConfig::default()
            .with_gravity(self.gravity)
            .with_force_mode(force_mode)
            .with_collision(collision)
            .with_offload(!self.cpu_only)
    }
}

fn create_bridge(args: &Args) -> AcceleratorBridge {
    if args.cpu_only {
        log::info!("Running CPU only");
        return AcceleratorBridge::cpu_only();
    }

    match args.backend {
        Backend::Host => AcceleratorBridge::with_backend(Box::new(HostBackend::new())),
        Backend::Gpu => match WgpuBackend::new() {
            Ok(backend) => {
                log::info!("✓ Using GPU: {}", backend.adapter_name());
                AcceleratorBridge::with_backend(Box::new(backend))
            }
            Err(err) => {
                log::warn!("GPU unavailable, running CPU only: {}", err);
                AcceleratorBridge::cpu_only()
            }
        },
    }
}

/// Uniform random point inside a sphere
fn random_in_sphere<R: Rng>(rng: &mut R, radius: f32) -> Vec3 {
    let theta = rng.random::<f32>() * std::f32::consts::TAU;
    let cos_phi = rng.random::<f32>() * 2.0 - 1.0;
    let sin_phi = (1.0 - cos_phi * cos_phi).sqrt();
    let r = rng.random::<f32>().powf(1.0 / 3.0) * radius;

    Vec3::new(
        r * sin_phi * theta.cos(),
        r * sin_phi * theta.sin(),
        r * cos_phi,
    )
}

/// Fill the simulation with the requested population
fn populate(sim: &mut Simulation, args: &Args) {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut rejected = 0;
    for _ in 0..args.count {
        let position = random_in_sphere(&mut rng, SPAWN_RADIUS);
        let spawned = if args.bodies {
            sim.spawn_random_body_at(position)
        } else {
            sim.spawn_random_at(position)
        };
        if spawned.is_err() {
            rejected += 1;
        }
    }

    log::info!("✓ Initialized {} particles", sim.particles().len());
    if rejected > 0 {
        log::warn!("  {} particles could not be added", rejected);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if !(args.frame_rate.is_finite() && args.frame_rate > 0.0) {
        return Err(format!("frame rate must be positive, got {}", args.frame_rate).into());
    }

    log::info!("Starting gravity particle simulation...");

    let config = args.config();
    let bridge = create_bridge(&args);
    let mut sim = match args.seed {
        Some(seed) => Simulation::with_seed(config, bridge, seed),
        None => Simulation::new(config, bridge),
    };
    log::info!(
        "  gravity {:e}, offload {} via {}",
        sim.config().gravity,
        sim.config().offload_enabled,
        sim.bridge().backend_name().unwrap_or("cpu")
    );
    populate(&mut sim, &args);

    let frame_time = 1.0 / args.frame_rate;
    let start = Instant::now();
    let mut ticks = 0u64;

    for frame in 1..=args.frames {
        ticks += sim.advance(frame_time) as u64;

        if frame % STATS_EVERY == 0 || frame == args.frames {
            let stats = sim.diagnostics();
            log::info!(
                "frame {:>5}: {} particles, mass {:.4e}, |p| {:.4e}, {} merges, {} bounces, {:?}",
                frame,
                stats.particle_count,
                stats.total_mass,
                stats.total_momentum.length(),
                stats.merges,
                stats.bounces,
                stats.last_path
            );
        }
    }

    let elapsed = start.elapsed();
    log::info!(
        "Ran {} ticks over {} frames in {:.2?} ({:.1} ticks/s)",
        ticks,
        args.frames,
        elapsed,
        ticks as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );

    Ok(())
}
