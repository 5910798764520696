//! Semi-implicit (symplectic) Euler integration

use crate::particle::Particle;

/// Advance one particle: velocity first, then position with the new velocity.
///
/// Particles without a positive finite mass are left untouched.
pub fn integrate(particle: &mut Particle, dt: f32) {
    if !(particle.mass.is_finite() && particle.mass > 0.0) {
        return;
    }

    let acceleration = particle.force / particle.mass;
    particle.velocity += acceleration * dt;
    particle.position += particle.velocity * dt;
}

pub fn integrate_all(particles: &mut [Particle], dt: f32) {
    for particle in particles.iter_mut() {
        integrate(particle, dt);
    }
}
