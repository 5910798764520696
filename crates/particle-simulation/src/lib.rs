//! # Particle Simulation Engine
//!
//! Fixed-timestep gravity simulation on top of `particle-physics`, with an
//! optional compute backend (headless wgpu) for the force and integration step.

pub mod backend;
pub mod bridge;
pub mod gpu;
pub mod params;
pub mod simulation;
pub mod staging;

pub use backend::*;
pub use bridge::*;
pub use gpu::*;
pub use params::*;
pub use simulation::*;
pub use staging::*;
