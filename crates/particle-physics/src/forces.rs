//! Gravitational force accumulation
//!
//! Two interchangeable strategies:
//! - [`ForceMode::Direct`]: every unordered pair, O(n²), exact up to rounding.
//! - [`ForceMode::SpatialHash`]: each particle only feels the particles found
//!   in its 3×3×3 cell neighborhood. Everything farther away is ignored no
//!   matter how heavy, so results deliberately differ from the direct sum.

use glam::Vec3;

use crate::constants::{FORCE_CELL_SIZE, HASH_TABLE_SIZE, SOFTENING};
use crate::grid::SpatialHash;
use crate::particle::Particle;

/// Force on `p1` from `p2`: F = G * m1 * m2 / r²
///
/// Pairs closer than [`SOFTENING`] exert no force.
pub fn gravitational_force(p1: &Particle, p2: &Particle, g: f32) -> Vec3 {
    let r_vec = p2.position - p1.position;
    let r = r_vec.length();

    if r <= SOFTENING {
        return Vec3::ZERO;
    }

    let force_magnitude = g * p1.mass * p2.mass / (r * r);
    r_vec / r * force_magnitude
}

/// Force computation strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForceMode {
    Direct,
    SpatialHash { cell_size: f32 },
}

impl Default for ForceMode {
    fn default() -> Self {
        ForceMode::SpatialHash {
            cell_size: FORCE_CELL_SIZE,
        }
    }
}

impl ForceMode {
    /// Reset and recompute the force on every particle
    pub fn accumulate(&self, particles: &mut [Particle], g: f32) {
        self.accumulate_with_table(particles, g, HASH_TABLE_SIZE);
    }

    /// Same as [`ForceMode::accumulate`] with an explicit hash bucket count
    pub fn accumulate_with_table(&self, particles: &mut [Particle], g: f32, table_size: usize) {
        match *self {
            ForceMode::Direct => direct_forces(particles, g),
            ForceMode::SpatialHash { cell_size } => {
                spatial_hash_forces_with_table(particles, g, cell_size, table_size)
            }
        }
    }
}

fn reset_forces(particles: &mut [Particle]) {
    for particle in particles.iter_mut() {
        particle.force = Vec3::ZERO;
    }
}

/// Pairwise summation applying equal and opposite forces to both partners
pub fn direct_forces(particles: &mut [Particle], g: f32) {
    reset_forces(particles);

    for i in 0..particles.len() {
        let (head, tail) = particles.split_at_mut(i + 1);
        let a = &mut head[i];
        for b in tail.iter_mut() {
            let force = gravitational_force(a, b, g);
            a.force += force;
            b.force -= force;
        }
    }
}

/// Neighbor-limited summation over a freshly built spatial hash
pub fn spatial_hash_forces(particles: &mut [Particle], g: f32, cell_size: f32) {
    spatial_hash_forces_with_table(particles, g, cell_size, HASH_TABLE_SIZE);
}

pub fn spatial_hash_forces_with_table(
    particles: &mut [Particle],
    g: f32,
    cell_size: f32,
    table_size: usize,
) {
    reset_forces(particles);

    let forces: Vec<Vec3> = {
        let snapshot: &[Particle] = particles;
        let hash = SpatialHash::with_table_size(snapshot, cell_size, table_size);
        snapshot
            .iter()
            .enumerate()
            .map(|(i, particle)| {
                hash.neighbors_of(particle.position)
                    .into_iter()
                    .filter(|&j| j != i)
                    .map(|j| gravitational_force(particle, &snapshot[j], g))
                    .sum::<Vec3>()
            })
            .collect()
    };

    for (particle, force) in particles.iter_mut().zip(forces) {
        particle.force = force;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Element;

    fn body(mass: f32, x: f32) -> Particle {
        Particle::body(mass, 0.5, Vec3::new(x, 0.0, 0.0), Vec3::ZERO, [255; 4])
    }

    fn assert_vec_close(a: Vec3, b: Vec3, tol: f32) {
        assert!((a - b).length() <= tol, "{a:?} != {b:?}");
    }

    #[test]
    fn test_newtons_third_law() {
        let mut particles = vec![
            body(10.0, 0.0),
            Particle::body(4.0, 0.5, Vec3::new(3.0, -2.0, 1.0), Vec3::ZERO, [255; 4]),
            Particle::body(7.0, 0.5, Vec3::new(-1.0, 5.0, 2.0), Vec3::ZERO, [255; 4]),
            Particle::body(1.0, 0.5, Vec3::new(0.5, 0.5, -4.0), Vec3::ZERO, [255; 4]),
        ];
        direct_forces(&mut particles, 1.0);

        // pairwise antisymmetry
        for i in 0..particles.len() {
            for j in 0..particles.len() {
                if i == j {
                    continue;
                }
                let f_ij = gravitational_force(&particles[i], &particles[j], 1.0);
                let f_ji = gravitational_force(&particles[j], &particles[i], 1.0);
                assert_vec_close(f_ij, -f_ji, 1e-5);
            }
        }

        let net: Vec3 = particles.iter().map(|p| p.force).sum();
        assert_vec_close(net, Vec3::ZERO, 1e-4);
    }

    #[test]
    fn test_two_body_magnitude() {
        let mut particles = vec![body(10.0, 0.0), body(20.0, 5.0)];
        direct_forces(&mut particles, 1.0);
        assert_vec_close(particles[0].force, Vec3::new(8.0, 0.0, 0.0), 1e-5);
        assert_vec_close(particles[1].force, Vec3::new(-8.0, 0.0, 0.0), 1e-5);
    }

    #[test]
    fn test_colinear_symmetric_cancels() {
        let mut particles = vec![body(5.0, -3.0), body(1.0, 0.0), body(5.0, 3.0)];
        direct_forces(&mut particles, 1.0);
        assert_vec_close(particles[1].force, Vec3::ZERO, 1e-6);
    }

    #[test]
    fn test_colinear_heavier_side_wins() {
        let mut particles = vec![body(5.0, -3.0), body(1.0, 0.0), body(9.0, 3.0)];
        direct_forces(&mut particles, 1.0);
        assert!(particles[1].force.x > 0.0);
        assert!(particles[1].force.y.abs() < 1e-6);
    }

    #[test]
    fn test_colinear_nearer_side_wins() {
        let mut particles = vec![body(5.0, -2.0), body(1.0, 0.0), body(5.0, 4.0)];
        direct_forces(&mut particles, 1.0);
        assert!(particles[1].force.x < 0.0);
    }

    #[test]
    fn test_zero_separation_is_ignored() {
        let mut particles = vec![body(3.0, 1.0), body(3.0, 1.0)];
        direct_forces(&mut particles, 1.0);
        assert_eq!(particles[0].force, Vec3::ZERO);

        spatial_hash_forces(&mut particles, 1.0, 2.0);
        assert_eq!(particles[1].force, Vec3::ZERO);
        assert!(particles.iter().all(|p| p.force.is_finite()));
    }

    #[test]
    fn test_forces_are_reset_each_call() {
        let mut particles = vec![body(10.0, 0.0), body(20.0, 5.0)];
        particles[0].force = Vec3::splat(1_000.0);
        direct_forces(&mut particles, 1.0);
        direct_forces(&mut particles, 1.0);
        assert_vec_close(particles[0].force, Vec3::new(8.0, 0.0, 0.0), 1e-5);

        particles[1].force = Vec3::splat(1_000.0);
        spatial_hash_forces(&mut particles, 1.0, 10.0);
        assert_vec_close(particles[1].force, Vec3::new(-8.0, 0.0, 0.0), 1e-5);
    }

    #[test]
    fn test_spatial_hash_matches_direct_inside_neighborhood() {
        let mut direct = vec![
            body(10.0, 0.5),
            Particle::body(4.0, 0.5, Vec3::new(1.2, 0.3, 0.1), Vec3::ZERO, [255; 4]),
            Particle::body(6.0, 0.5, Vec3::new(0.1, 1.4, 0.9), Vec3::ZERO, [255; 4]),
        ];
        let mut hashed = direct.clone();
        direct_forces(&mut direct, 1.0);
        spatial_hash_forces(&mut hashed, 1.0, 1.0);

        for (a, b) in direct.iter().zip(&hashed) {
            assert_vec_close(a.force, b.force, 1e-4);
        }
    }

    #[test]
    fn test_spatial_hash_diverges_beyond_neighborhood() {
        // cells (0,0,0) and (10,0,0) are far apart and do not share a bucket
        let mut direct = vec![
            Particle::new(Element::Iron, Vec3::splat(0.5), Vec3::ZERO),
            Particle::new(Element::Iron, Vec3::new(10.5, 0.5, 0.5), Vec3::ZERO),
        ];
        let mut hashed = direct.clone();
        direct_forces(&mut direct, 1.0);
        spatial_hash_forces(&mut hashed, 1.0, 1.0);

        assert!(direct[0].force.x > 0.0);
        assert_eq!(hashed[0].force, Vec3::ZERO);
        assert_eq!(hashed[1].force, Vec3::ZERO);
    }

    #[test]
    fn test_mode_dispatch() {
        let mut particles = vec![body(10.0, 0.0), body(20.0, 5.0)];
        ForceMode::Direct.accumulate(&mut particles, 1.0);
        assert_vec_close(particles[0].force, Vec3::new(8.0, 0.0, 0.0), 1e-5);

        ForceMode::SpatialHash { cell_size: 1.0 }.accumulate(&mut particles, 1.0);
        assert_eq!(particles[0].force, Vec3::ZERO);
    }
}
