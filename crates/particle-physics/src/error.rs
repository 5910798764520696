use thiserror::Error;

/// Errors raised by the particle store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Backing storage could not grow
    #[error("could not allocate room for particle {requested}")]
    Allocation { requested: usize },

    /// Zero, negative or non-finite mass would poison the integrator
    #[error("particle mass {0} is not a positive finite number")]
    InvalidMass(f32),

    /// Pair indices that are equal or outside the store
    #[error("cannot replace pair ({a}, {b}) in a store of {len}")]
    InvalidPair { a: usize, b: usize, len: usize },
}
