//! Flat, GPU-layout copies of one physics step's input
//!
//! Built from the particle slice and its [`DenseGrid`] right before a
//! dispatch and dropped right after. Cell members are concatenated into one
//! index array; every cell records its `[object_start, object_start +
//! object_count)` window into it.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use particle_physics::{DenseGrid, Particle};

use crate::GravityParams;

/// Particle state as seen by the kernel (matches WGSL `Object`)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuParticle {
    pub position: [f32; 3],
    pub _pad0: f32,
    pub velocity: [f32; 3],
    pub _pad1: f32,
    pub mass: f32,
    pub _pad2: [f32; 3],
}

impl GpuParticle {
    pub fn from_particle(particle: &Particle) -> Self {
        Self {
            position: particle.position.to_array(),
            velocity: particle.velocity.to_array(),
            mass: particle.mass,
            ..Default::default()
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::from_array(self.velocity)
    }
}

/// Aggregate of one dense-grid cell (matches WGSL `Cell`)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuGridCell {
    pub center: [f32; 3],
    pub mass: f32,
    pub object_start: u32,
    pub object_count: u32,
    pub _pad: [u32; 2],
}

/// Everything a [`ComputeBackend`](crate::ComputeBackend) needs for one step
#[derive(Debug, Clone)]
pub struct TransferBuffers {
    pub params: GravityParams,
    pub particles: Vec<GpuParticle>,
    pub cells: Vec<GpuGridCell>,
    /// Particle indices grouped by cell
    pub indices: Vec<u32>,
}

impl TransferBuffers {
    pub fn flatten(particles: &[Particle], grid: &DenseGrid, dt: f32, g: f32) -> Self {
        let mut cells = Vec::with_capacity(grid.cell_count());
        let mut indices = Vec::with_capacity(particles.len());

        for cell in grid.cells() {
            cells.push(GpuGridCell {
                center: cell.center.to_array(),
                mass: cell.mass,
                object_start: indices.len() as u32,
                object_count: cell.members.len() as u32,
                _pad: [0; 2],
            });
            indices.extend(cell.members.iter().map(|&i| i as u32));
        }

        let params = GravityParams::new(
            grid.origin().to_array(),
            grid.cell_size(),
            grid.dims().to_array(),
            particles.len() as u32,
            dt,
            g,
        );

        Self {
            params,
            particles: particles.iter().map(GpuParticle::from_particle).collect(),
            cells,
            indices,
        }
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Sizes in bytes of the particle, cell and index arrays
    pub fn byte_sizes(&self) -> [u64; 3] {
        [
            std::mem::size_of_val(self.particles.as_slice()) as u64,
            std::mem::size_of_val(self.cells.as_slice()) as u64,
            std::mem::size_of_val(self.indices.as_slice()) as u64,
        ]
    }
}
