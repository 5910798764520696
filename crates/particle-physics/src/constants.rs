//! Physical and numeric constants for the gravity simulation
//!
//! Values are tuned for real-time visualization, not for physical accuracy.

/// Universal gravitational constant
pub const G: f32 = 6.67430e-11;

/// Minimum separation below which a pair exerts no force (guards r → 0)
pub const SOFTENING: f32 = 1.0e-6;

/// Fixed physics timestep (170 Hz)
pub const TICK: f32 = 1.0 / 170.0;

/// Radius of element particles for drawing and fixed-radius contact tests
pub const PARTICLE_RADIUS: f32 = 1.0;

/// Bucket count of the spatial hash table (prime)
pub const HASH_TABLE_SIZE: usize = 10_007;

/// Cell edge length used by the neighbor-limited force solver
pub const FORCE_CELL_SIZE: f32 = 20.0;

/// Cell edge length of the dense grid staged for the compute backend
pub const DENSE_CELL_SIZE: f32 = 20.0;

/// Minimum cell edge length of the elastic-collision broadphase
pub const COLLISION_CELL_SIZE: f32 = 2.0;

/// Hash multipliers for the three cell axes
pub const HASH_PRIME_X: u32 = 73_856_093;
pub const HASH_PRIME_Y: u32 = 19_349_663;
pub const HASH_PRIME_Z: u32 = 83_492_791;

/// Speed bound for randomly spawned element particles
pub const RANDOM_ELEMENT_SPEED: f32 = 0.1;

/// Mass range of randomly spawned bodies
pub const BODY_MASS_MIN: u32 = 1;
pub const BODY_MASS_MAX: u32 = 100;

/// Speed bound for randomly spawned bodies
pub const BODY_SPEED: i32 = 10;
