//! Uniform spatial partitioning rebuilt every physics step
//!
//! Two representations are provided:
//! - [`SpatialHash`]: bucketed hash of cell coordinates, used by the
//!   neighbor-limited force solver and the elastic collision broadphase.
//!   Distinct cells may share a bucket; neighbor queries then return extra
//!   candidates, never fewer.
//! - [`DenseGrid`]: a 3D array covering the bounding box of all particles,
//!   with per-cell mass and center of mass. This is the layout staged for the
//!   compute backend.
//!
//! Both store particle indices only and must be dropped before the particle
//! store is restructured.

use glam::{IVec3, UVec3, Vec3};

use crate::constants::{HASH_PRIME_X, HASH_PRIME_Y, HASH_PRIME_Z, HASH_TABLE_SIZE};
use crate::particle::Particle;

/// Integer cell coordinate of a position: `floor(position / cell_size)`
pub fn cell_coord(position: Vec3, cell_size: f32) -> IVec3 {
    (position / cell_size).floor().as_ivec3()
}

/// Multiplicative-XOR hash of a cell coordinate, reduced to a bucket index
pub fn hash_cell(cell: IVec3, table_size: usize) -> usize {
    let h = HASH_PRIME_X.wrapping_mul(cell.x as u32)
        ^ HASH_PRIME_Y.wrapping_mul(cell.y as u32)
        ^ HASH_PRIME_Z.wrapping_mul(cell.z as u32);
    h as usize % table_size
}

/// The 27 offsets of a cell's 3×3×3 neighborhood (including itself)
fn neighborhood() -> impl Iterator<Item = IVec3> {
    (-1..=1).flat_map(|dz| {
        (-1..=1).flat_map(move |dy| (-1..=1).map(move |dx| IVec3::new(dx, dy, dz)))
    })
}

/// Hashed uniform grid
pub struct SpatialHash {
    cell_size: f32,
    buckets: Vec<Vec<usize>>,
}

impl SpatialHash {
    pub fn build(particles: &[Particle], cell_size: f32) -> Self {
        Self::with_table_size(particles, cell_size, HASH_TABLE_SIZE)
    }

    pub fn with_table_size(particles: &[Particle], cell_size: f32, table_size: usize) -> Self {
        let table_size = table_size.max(1);
        let mut buckets = vec![Vec::new(); table_size];
        for (index, particle) in particles.iter().enumerate() {
            let bucket = hash_cell(cell_coord(particle.position, cell_size), table_size);
            buckets[bucket].push(index);
        }
        Self { cell_size, buckets }
    }

    /// Indices stored in the 27 cells around `position`.
    ///
    /// Each bucket is visited once even if several neighbor cells hash to it,
    /// so every index appears at most once. May contain particles from
    /// unrelated cells that collide in the table.
    pub fn neighbors_of(&self, position: Vec3) -> Vec<usize> {
        let home = cell_coord(position, self.cell_size);
        let mut visited: Vec<usize> = Vec::with_capacity(27);
        let mut members = Vec::new();
        for offset in neighborhood() {
            let bucket = hash_cell(home + offset, self.buckets.len());
            if visited.contains(&bucket) {
                continue;
            }
            visited.push(bucket);
            members.extend_from_slice(&self.buckets[bucket]);
        }
        members
    }
}

/// One cell of a [`DenseGrid`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridCell {
    /// Summed mass of the members
    pub mass: f32,
    /// Mean member position, zero for empty cells
    pub center: Vec3,
    pub members: Vec<usize>,
}

/// Dense grid sized to the bounding box of the particles
#[derive(Debug, Clone)]
pub struct DenseGrid {
    origin: Vec3,
    cell_size: f32,
    dims: UVec3,
    cells: Vec<GridCell>,
}

impl DenseGrid {
    /// Origin and cell counts the grid would have, without allocating it
    pub fn layout(particles: &[Particle], cell_size: f32) -> Option<(Vec3, UVec3)> {
        let first = particles.first()?;
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return None;
        }

        let (min, max) = particles
            .iter()
            .fold((first.position, first.position), |(min, max), p| {
                (min.min(p.position), max.max(p.position))
            });
        if !(min.is_finite() && max.is_finite()) {
            log::debug!("Dense grid skipped: non-finite bounds {:?}..{:?}", min, max);
            return None;
        }

        let extent = (max - min) / cell_size + Vec3::ONE;
        Some((min, extent.as_uvec3().max(UVec3::ONE)))
    }

    /// Number of cells for `dims`, `None` on overflow
    pub fn cell_count_of(dims: UVec3) -> Option<usize> {
        (dims.x as usize)
            .checked_mul(dims.y as usize)?
            .checked_mul(dims.z as usize)
    }

    /// Build the grid, or `None` when there is nothing to partition or the
    /// bounding box is not finite.
    pub fn build(particles: &[Particle], cell_size: f32) -> Option<Self> {
        let (min, dims) = Self::layout(particles, cell_size)?;
        let cell_count = Self::cell_count_of(dims)?;

        let mut grid = Self {
            origin: min,
            cell_size,
            dims,
            cells: vec![GridCell::default(); cell_count],
        };

        let mut sums = vec![Vec3::ZERO; cell_count];
        for (index, particle) in particles.iter().enumerate() {
            let cell_index = grid.cell_index(grid.cell_of(particle.position));
            let cell = &mut grid.cells[cell_index];
            cell.mass += particle.mass;
            cell.members.push(index);
            sums[cell_index] += particle.position;
        }

        for (cell, sum) in grid.cells.iter_mut().zip(sums) {
            if !cell.members.is_empty() {
                cell.center = sum / cell.members.len() as f32;
            }
        }

        Some(grid)
    }

    /// Cell coordinate of a position, clamped into the grid
    pub fn cell_of(&self, position: Vec3) -> UVec3 {
        let local = ((position - self.origin) / self.cell_size).max(Vec3::ZERO);
        local.as_uvec3().min(self.dims - UVec3::ONE)
    }

    /// Flat index `x + nx·(y + ny·z)`
    pub fn cell_index(&self, cell: UVec3) -> usize {
        let (nx, ny) = (self.dims.x as usize, self.dims.y as usize);
        cell.x as usize + nx * (cell.y as usize + ny * cell.z as usize)
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }
}
