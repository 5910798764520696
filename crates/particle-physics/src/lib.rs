//! # Particle Physics Engine
//!
//! Core physics for the gravity simulation: particles and elements, the
//! particle store, spatial partitioning, gravitational force accumulation,
//! time integration and collision handling.

pub mod collision;
pub mod constants;
pub mod error;
pub mod forces;
pub mod grid;
pub mod integrator;
pub mod particle;
pub mod store;

pub use collision::*;
pub use constants::*;
pub use error::*;
pub use forces::*;
pub use grid::*;
pub use integrator::*;
pub use particle::*;
pub use store::*;
