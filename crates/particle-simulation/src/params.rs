//! Simulation parameters for runtime tuning

use bytemuck::{Pod, Zeroable};
use particle_physics::{
    CollisionPolicy, ForceMode, DENSE_CELL_SIZE, G, HASH_TABLE_SIZE, SOFTENING, TICK,
};

/// Runtime configuration, passed explicitly to every step
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Gravitational constant used by every force path
    pub gravity: f32,
    /// Fixed physics timestep in seconds
    pub tick: f32,
    /// CPU force strategy
    pub force_mode: ForceMode,
    /// Cell edge length of the dense grid staged for offload
    pub dense_cell_size: f32,
    pub collision: CollisionPolicy,
    /// Offload the force and integration step when a backend is attached
    pub offload_enabled: bool,
    /// Renderer hint only, the physics never reads it
    pub culling_enabled: bool,
    /// Dense grids larger than this are not offloaded
    pub max_grid_cells: usize,
    /// Bucket count of the CPU spatial hash
    pub hash_table_size: usize,
    /// Upper bound on ticks per `Simulation::advance`, extra time is dropped
    pub max_ticks_per_advance: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: G,
            tick: TICK,
            force_mode: ForceMode::default(),
            dense_cell_size: DENSE_CELL_SIZE,
            collision: CollisionPolicy::default(),
            offload_enabled: true,
            culling_enabled: true,
            max_grid_cells: 1 << 20,
            hash_table_size: HASH_TABLE_SIZE,
            max_ticks_per_advance: 64,
        }
    }
}

impl SimulationConfig {
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_force_mode(mut self, force_mode: ForceMode) -> Self {
        self.force_mode = force_mode;
        self
    }

    pub fn with_collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    pub fn with_offload(mut self, enabled: bool) -> Self {
        self.offload_enabled = enabled;
        self
    }
}

/// Uniform block of the grid gravity kernel (matches WGSL `Params`)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GravityParams {
    // Group 1: grid placement
    pub origin: [f32; 3],
    pub cell_size: f32,

    // Group 2: grid shape
    // x, y, z: cell counts, w: particle count
    pub grid_size: [u32; 3],
    pub num_objects: u32,

    // Group 3: integration
    pub delta_time: f32,
    pub g: f32,
    pub softening: f32,
    pub _padding: f32,
}

impl GravityParams {
    pub fn new(
        origin: [f32; 3],
        cell_size: f32,
        grid_size: [u32; 3],
        num_objects: u32,
        delta_time: f32,
        g: f32,
    ) -> Self {
        Self {
            origin,
            cell_size,
            grid_size,
            num_objects,
            delta_time,
            g,
            softening: SOFTENING,
            _padding: 0.0,
        }
    }
}
