//! Fixed-timestep simulation driver
//!
//! Frame time is accumulated and consumed in whole ticks. Each tick runs the
//! force and integration step through the [`AcceleratorBridge`], then the
//! collision policy. Spawn requests coming from input are queued and applied
//! at the start of the next [`Simulation::advance`], never in the middle of a
//! tick.

use glam::Vec3;
use particle_physics::{resolve_collisions, Particle, ParticleStore, StoreError};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::bridge::{AcceleratorBridge, ComputePath};
use crate::SimulationConfig;

/// Flags a renderer reads to decide what to draw and how
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderToggles {
    pub offload_enabled: bool,
    pub culling_enabled: bool,
}

/// Snapshot of aggregate quantities
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    pub particle_count: usize,
    pub total_mass: f64,
    pub total_momentum: Vec3,
    pub ticks: u64,
    pub merges: u64,
    pub bounces: u64,
    /// Path taken by the most recent tick, `None` before the first one
    pub last_path: Option<ComputePath>,
}

pub struct Simulation {
    config: SimulationConfig,
    bridge: AcceleratorBridge,
    store: ParticleStore,
    spawn_queue: Vec<Vec3>,
    rng: StdRng,
    accumulator: f32,
    ticks: u64,
    merges: u64,
    bounces: u64,
    last_path: Option<ComputePath>,
}

impl Simulation {
    pub fn new(config: SimulationConfig, bridge: AcceleratorBridge) -> Self {
        Self::with_rng(config, bridge, StdRng::from_os_rng())
    }

    /// Deterministic spawning from `seed`
    pub fn with_seed(config: SimulationConfig, bridge: AcceleratorBridge, seed: u64) -> Self {
        Self::with_rng(config, bridge, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulationConfig, bridge: AcceleratorBridge, rng: StdRng) -> Self {
        log::info!(
            "Simulation created: tick {:.5}s, forces {:?}, collisions {:?}",
            config.tick,
            config.force_mode,
            config.collision
        );
        Self {
            config,
            bridge,
            store: ParticleStore::new(),
            spawn_queue: Vec::new(),
            rng,
            accumulator: 0.0,
            ticks: 0,
            merges: 0,
            bounces: 0,
            last_path: None,
        }
    }

    /// Consume `frame_time` seconds in fixed ticks and return how many ran.
    ///
    /// Leftover time below one tick carries over to the next call. At most
    /// `max_ticks_per_advance` ticks run; time beyond that is dropped.
    pub fn advance(&mut self, frame_time: f32) -> u32 {
        self.apply_spawns();

        let tick = self.config.tick;
        if !(tick.is_finite() && tick > 0.0) {
            log::warn!("Ignoring advance: tick {} is not a positive duration", tick);
            return 0;
        }

        if frame_time.is_finite() && frame_time > 0.0 {
            self.accumulator += frame_time;
        }

        let max_ticks = self.config.max_ticks_per_advance;
        let mut ticks = 0;
        while self.accumulator >= tick && ticks < max_ticks {
            self.step();
            self.accumulator -= tick;
            ticks += 1;
        }

        if self.accumulator >= tick {
            log::warn!(
                "Simulation fell behind, dropping {:.3}s after {} ticks",
                self.accumulator,
                ticks
            );
            self.accumulator = 0.0;
        }
        ticks
    }

    /// Run exactly one tick
    pub fn step(&mut self) {
        let path = self
            .bridge
            .compute(&mut self.store, self.config.tick, &self.config);
        let report = resolve_collisions(&mut self.store, &self.config.collision);

        self.ticks += 1;
        self.merges += report.merges as u64;
        self.bounces += report.bounces as u64;
        self.last_path = Some(path);

        log::debug!(
            "Tick {}: {} particles via {:?}, {} merges, {} bounces",
            self.ticks,
            self.store.len(),
            path,
            report.merges,
            report.bounces
        );
    }

    /// Request a random element particle at `position` before the next tick
    pub fn queue_spawn(&mut self, position: Vec3) {
        self.spawn_queue.push(position);
    }

    pub fn pending_spawns(&self) -> usize {
        self.spawn_queue.len()
    }

    fn apply_spawns(&mut self) {
        for position in std::mem::take(&mut self.spawn_queue) {
            if let Err(err) = self.spawn_random_at(position) {
                log::warn!("Dropped queued spawn at {:?}: {}", position, err);
            }
        }
    }

    /// Add a random element particle at `position` right away
    pub fn spawn_random_at(&mut self, position: Vec3) -> Result<usize, StoreError> {
        let particle = Particle::random_at(position, &mut self.rng);
        self.store.add(particle)
    }

    /// Add a random body at `position` right away
    pub fn spawn_random_body_at(&mut self, position: Vec3) -> Result<usize, StoreError> {
        let particle = Particle::random_body_at(position, &mut self.rng);
        self.store.add(particle)
    }

    pub fn add_particle(&mut self, particle: Particle) -> Result<usize, StoreError> {
        self.store.add(particle)
    }

    pub fn particles(&self) -> &[Particle] {
        self.store.as_slice()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn bridge(&self) -> &AcceleratorBridge {
        &self.bridge
    }

    pub fn set_offload_enabled(&mut self, enabled: bool) {
        log::info!("Compute offload {}", if enabled { "enabled" } else { "disabled" });
        self.config.offload_enabled = enabled;
    }

    pub fn set_culling_enabled(&mut self, enabled: bool) {
        self.config.culling_enabled = enabled;
    }

    pub fn render_toggles(&self) -> RenderToggles {
        RenderToggles {
            offload_enabled: self.config.offload_enabled,
            culling_enabled: self.config.culling_enabled,
        }
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            particle_count: self.store.len(),
            total_mass: self.store.total_mass(),
            total_momentum: self.store.total_momentum(),
            ticks: self.ticks,
            merges: self.merges,
            bounces: self.bounces,
            last_path: self.last_path,
        }
    }
}
