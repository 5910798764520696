//! Compute backend abstraction for the offloaded force and integration step

use glam::{IVec3, Vec3};
use thiserror::Error;

use crate::staging::{GpuParticle, TransferBuffers};

/// Errors raised while offloading a step
#[derive(Error, Debug)]
pub enum BackendError {
    /// No usable adapter on this machine
    #[error("no compatible compute adapter: {0}")]
    Unavailable(String),

    #[error("failed to open compute device: {0}")]
    Device(String),

    /// A staged array does not fit into one storage binding
    #[error("{label} needs {size} bytes, storage binding limit is {limit}")]
    BufferTooLarge {
        label: &'static str,
        size: u64,
        limit: u64,
    },

    /// Validation or submission failure
    #[error("compute dispatch failed: {0}")]
    Dispatch(String),

    #[error("result readback failed: {0}")]
    Readback(String),

    #[error("backend returned {actual} particles, expected {expected}")]
    ResultMismatch { expected: usize, actual: usize },
}

/// Runs one gravity + integration step over flattened buffers.
///
/// Contract: for every particle, exact pairwise gravity against the members
/// of the 27 cells around its own cell, and the aggregate `(center, mass)` of
/// every other non-empty cell; then `v += F/m·dt`, `x += v·dt`. Results come
/// back in submission order.
pub trait ComputeBackend {
    fn name(&self) -> &str;

    fn dispatch(&mut self, buffers: &TransferBuffers) -> Result<Vec<GpuParticle>, BackendError>;
}

/// CPU implementation of the [`ComputeBackend`] contract
#[derive(Debug, Default)]
pub struct HostBackend;

impl HostBackend {
    pub fn new() -> Self {
        Self
    }
}

fn attraction(from: Vec3, to: Vec3, m1: f32, m2: f32, g: f32, softening: f32) -> Vec3 {
    let r_vec = to - from;
    let r = r_vec.length();
    if r <= softening {
        return Vec3::ZERO;
    }
    r_vec / r * (g * m1 * m2 / (r * r))
}

impl ComputeBackend for HostBackend {
    fn name(&self) -> &str {
        "host"
    }

    fn dispatch(&mut self, buffers: &TransferBuffers) -> Result<Vec<GpuParticle>, BackendError> {
        let params = &buffers.params;
        let origin = Vec3::from_array(params.origin);
        let dims = IVec3::new(
            params.grid_size[0] as i32,
            params.grid_size[1] as i32,
            params.grid_size[2] as i32,
        );
        let cell_of = |position: Vec3| -> IVec3 {
            ((position - origin) / params.cell_size)
                .max(Vec3::ZERO)
                .as_ivec3()
                .min(dims - IVec3::ONE)
        };
        let cell_coord = |index: usize| -> IVec3 {
            let index = index as i32;
            IVec3::new(
                index % dims.x,
                (index / dims.x) % dims.y,
                index / (dims.x * dims.y),
            )
        };

        let objects = &buffers.particles;
        let mut out = objects.clone();

        for (i, object) in out.iter_mut().enumerate() {
            let position = object.position();
            let home = cell_of(position);
            let mut force = Vec3::ZERO;

            for (c, cell) in buffers.cells.iter().enumerate() {
                if cell.object_count == 0 {
                    continue;
                }
                let offset = (cell_coord(c) - home).abs();
                if offset.max_element() <= 1 {
                    let start = cell.object_start as usize;
                    let members = &buffers.indices[start..start + cell.object_count as usize];
                    for &j in members {
                        let j = j as usize;
                        if j == i {
                            continue;
                        }
                        let other = &objects[j];
                        force += attraction(
                            position,
                            other.position(),
                            object.mass,
                            other.mass,
                            params.g,
                            params.softening,
                        );
                    }
                } else {
                    force += attraction(
                        position,
                        Vec3::from_array(cell.center),
                        object.mass,
                        cell.mass,
                        params.g,
                        params.softening,
                    );
                }
            }

            if object.mass.is_finite() && object.mass > 0.0 {
                let velocity = object.velocity() + force / object.mass * params.delta_time;
                object.velocity = velocity.to_array();
                object.position = (position + velocity * params.delta_time).to_array();
            }
        }

        Ok(out)
    }
}
