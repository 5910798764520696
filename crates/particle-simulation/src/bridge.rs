//! Chooses between the CPU force path and an offloaded compute backend
//!
//! The bridge never surfaces backend errors. Any failure is logged and the
//! step is recomputed on the CPU from the untouched particle state.

use glam::Vec3;
use particle_physics::{integrate_all, DenseGrid, ParticleStore};
use thiserror::Error;

use crate::backend::{BackendError, ComputeBackend};
use crate::staging::TransferBuffers;
use crate::SimulationConfig;

/// Which path produced the last step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputePath {
    Cpu,
    Offloaded,
    /// Offload was attempted and failed, the CPU result was used
    Fallback,
}

#[derive(Default)]
pub struct AcceleratorBridge {
    backend: Option<Box<dyn ComputeBackend>>,
    failure_streak: u32,
}

impl AcceleratorBridge {
    /// Bridge that always computes on the CPU
    pub fn cpu_only() -> Self {
        Self::default()
    }

    pub fn with_backend(backend: Box<dyn ComputeBackend>) -> Self {
        log::info!("Compute offload backend: {}", backend.name());
        Self {
            backend: Some(backend),
            failure_streak: 0,
        }
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.name())
    }

    /// Consecutive offload failures so far
    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }

    /// Accumulate forces and integrate every particle by `dt`
    pub fn compute(
        &mut self,
        store: &mut ParticleStore,
        dt: f32,
        config: &SimulationConfig,
    ) -> ComputePath {
        if !config.offload_enabled || store.is_empty() {
            compute_on_cpu(store, dt, config);
            return ComputePath::Cpu;
        }
        let Some(backend) = self.backend.as_deref_mut() else {
            compute_on_cpu(store, dt, config);
            return ComputePath::Cpu;
        };

        match offload(backend, store, dt, config) {
            Ok(()) => {
                if self.failure_streak > 0 {
                    log::info!(
                        "Compute offload recovered after {} failed steps",
                        self.failure_streak
                    );
                }
                self.failure_streak = 0;
                ComputePath::Offloaded
            }
            Err(reason) => {
                if self.failure_streak == 0 {
                    log::warn!("Compute offload failed, using CPU: {}", reason);
                } else {
                    log::debug!("Compute offload failed again, using CPU: {}", reason);
                }
                self.failure_streak += 1;
                compute_on_cpu(store, dt, config);
                ComputePath::Fallback
            }
        }
    }
}

/// CPU force solver followed by the integrator
pub fn compute_on_cpu(store: &mut ParticleStore, dt: f32, config: &SimulationConfig) {
    let particles = store.as_mut_slice();
    config
        .force_mode
        .accumulate_with_table(particles, config.gravity, config.hash_table_size);
    integrate_all(particles, dt);
}

/// Why an offload attempt was abandoned
#[derive(Error, Debug)]
enum OffloadError {
    #[error("no dense grid for the current positions")]
    Grid,

    #[error("dense grid of {cells} cells exceeds {max}")]
    GridTooLarge { cells: usize, max: usize },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

fn offload(
    backend: &mut dyn ComputeBackend,
    store: &mut ParticleStore,
    dt: f32,
    config: &SimulationConfig,
) -> Result<(), OffloadError> {
    let (_, dims) =
        DenseGrid::layout(store.as_slice(), config.dense_cell_size).ok_or(OffloadError::Grid)?;
    let cells = DenseGrid::cell_count_of(dims).unwrap_or(usize::MAX);
    if cells > config.max_grid_cells {
        return Err(OffloadError::GridTooLarge {
            cells,
            max: config.max_grid_cells,
        });
    }

    let buffers = {
        let grid =
            DenseGrid::build(store.as_slice(), config.dense_cell_size).ok_or(OffloadError::Grid)?;
        TransferBuffers::flatten(store.as_slice(), &grid, dt, config.gravity)
    };

    let results = backend.dispatch(&buffers)?;
    if results.len() != store.len() {
        return Err(BackendError::ResultMismatch {
            expected: store.len(),
            actual: results.len(),
        }
        .into());
    }

    for (particle, result) in store.as_mut_slice().iter_mut().zip(&results) {
        particle.position = result.position();
        particle.velocity = result.velocity();
        particle.force = Vec3::ZERO;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HostBackend;
    use crate::staging::GpuParticle;
    use particle_physics::{ForceMode, Particle};

    struct FailingBackend;

    impl ComputeBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        fn dispatch(&mut self, _: &TransferBuffers) -> Result<Vec<GpuParticle>, BackendError> {
            Err(BackendError::Dispatch("device lost".to_string()))
        }
    }

    /// Returns one particle too few
    struct TruncatingBackend;

    impl ComputeBackend for TruncatingBackend {
        fn name(&self) -> &str {
            "truncating"
        }

        fn dispatch(
            &mut self,
            buffers: &TransferBuffers,
        ) -> Result<Vec<GpuParticle>, BackendError> {
            let mut out = buffers.particles.clone();
            out.pop();
            Ok(out)
        }
    }

    fn cluster() -> ParticleStore {
        let mut store = ParticleStore::new();
        let bodies = [
            (10.0, Vec3::new(0.0, 0.0, 0.0), Vec3::ZERO),
            (20.0, Vec3::new(5.0, 1.0, 0.0), Vec3::X),
            (5.0, Vec3::new(2.0, 8.0, 3.0), Vec3::ZERO),
            (7.0, Vec3::new(-4.0, 3.0, 9.0), -Vec3::Y),
        ];
        for (mass, position, velocity) in bodies {
            store
                .add(Particle::body(mass, 1.0, position, velocity, [255; 4]))
                .unwrap();
        }
        store
    }

    fn config() -> SimulationConfig {
        SimulationConfig::default()
            .with_gravity(1.0)
            .with_force_mode(ForceMode::Direct)
    }

    #[test]
    fn test_failing_backend_matches_cpu_exactly() {
        let config = config();
        let mut expected = cluster();
        let mut cpu = AcceleratorBridge::cpu_only();
        let mut actual = cluster();
        let mut bridge = AcceleratorBridge::with_backend(Box::new(FailingBackend));

        for _ in 0..5 {
            assert_eq!(cpu.compute(&mut expected, 0.01, &config), ComputePath::Cpu);
            assert_eq!(bridge.compute(&mut actual, 0.01, &config), ComputePath::Fallback);
        }

        assert_eq!(actual.as_slice(), expected.as_slice());
        assert_eq!(bridge.failure_streak(), 5);
    }

    #[test]
    fn test_result_length_mismatch_falls_back() {
        let config = config();
        let mut expected = cluster();
        compute_on_cpu(&mut expected, 0.01, &config);

        let mut actual = cluster();
        let mut bridge = AcceleratorBridge::with_backend(Box::new(TruncatingBackend));
        assert_eq!(bridge.compute(&mut actual, 0.01, &config), ComputePath::Fallback);
        assert_eq!(actual.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_host_backend_matches_direct_for_cluster() {
        // one dense cell holds everything, so the offload is exact pairwise
        let config = SimulationConfig {
            dense_cell_size: 50.0,
            ..config()
        };
        let mut expected = cluster();
        compute_on_cpu(&mut expected, 0.01, &config);

        let mut actual = cluster();
        let mut bridge = AcceleratorBridge::with_backend(Box::new(HostBackend::new()));
        assert_eq!(bridge.compute(&mut actual, 0.01, &config), ComputePath::Offloaded);

        for (got, want) in actual.iter().zip(expected.iter()) {
            assert!((got.position - want.position).length() < 1e-4);
            assert!((got.velocity - want.velocity).length() < 1e-3);
            assert_eq!(got.force, Vec3::ZERO);
        }
    }

    #[test]
    fn test_disabled_offload_and_empty_store_use_cpu() {
        let mut bridge = AcceleratorBridge::with_backend(Box::new(FailingBackend));
        assert_eq!(bridge.backend_name(), Some("failing"));
        assert_eq!(AcceleratorBridge::cpu_only().backend_name(), None);

        let config = config().with_offload(false);
        let mut store = cluster();
        assert_eq!(bridge.compute(&mut store, 0.01, &config), ComputePath::Cpu);

        let mut empty = ParticleStore::new();
        let defaults = SimulationConfig::default();
        assert_eq!(bridge.compute(&mut empty, 0.01, &defaults), ComputePath::Cpu);
        assert_eq!(bridge.failure_streak(), 0);
    }

    #[test]
    fn test_oversized_grid_falls_back() {
        let config = SimulationConfig {
            dense_cell_size: 0.5,
            max_grid_cells: 8,
            ..config()
        };
        let mut store = cluster();
        let mut bridge = AcceleratorBridge::with_backend(Box::new(HostBackend::new()));
        assert_eq!(bridge.compute(&mut store, 0.01, &config), ComputePath::Fallback);
    }

    #[test]
    fn test_streak_resets_after_success() {
        let config = config();
        let mut store = cluster();
        let mut bridge = AcceleratorBridge::with_backend(Box::new(HostBackend::new()));
        bridge.failure_streak = 3;
        assert_eq!(bridge.compute(&mut store, 0.01, &config), ComputePath::Offloaded);
        assert_eq!(bridge.failure_streak(), 0);
    }
}
