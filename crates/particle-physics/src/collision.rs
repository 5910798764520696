//! Collision detection and response
//!
//! Policies are mutually exclusive and picked by configuration:
//! - [`CollisionPolicy::Merge`] replaces two touching particles with one
//!   combined particle. Mass and momentum are conserved. Because removal
//!   shifts indices, the scan restarts from the beginning after every merge;
//!   each merge lowers the particle count by one, so the loop terminates.
//! - [`CollisionPolicy::Elastic`] bounces overlapping pairs in place with an
//!   equal-mass impulse and pushes them apart. No particle is created or
//!   destroyed.
//! - [`CollisionPolicy::Disabled`] skips collision handling.

use glam::Vec3;

use crate::constants::{COLLISION_CELL_SIZE, SOFTENING};
use crate::grid::SpatialHash;
use crate::particle::Particle;
use crate::store::ParticleStore;

/// When two particles count as touching under the merge policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactRule {
    /// `distance < radius_a + radius_b`
    SumOfRadii,
    /// `distance <= 2 * radius`, ignoring per-particle radii
    FixedRadius(f32),
}

impl ContactRule {
    pub fn touching(&self, a: &Particle, b: &Particle) -> bool {
        let distance = a.position.distance(b.position);
        match *self {
            ContactRule::SumOfRadii => distance < a.radius + b.radius,
            ContactRule::FixedRadius(radius) => distance <= 2.0 * radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionPolicy {
    Merge { contact: ContactRule },
    Elastic,
    Disabled,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        CollisionPolicy::Merge {
            contact: ContactRule::SumOfRadii,
        }
    }
}

/// What a collision pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionReport {
    pub merges: usize,
    pub bounces: usize,
}

/// Run one collision pass over the store under `policy`
pub fn resolve_collisions(store: &mut ParticleStore, policy: &CollisionPolicy) -> CollisionReport {
    match *policy {
        CollisionPolicy::Merge { contact } => resolve_merges(store, contact),
        CollisionPolicy::Elastic => resolve_elastic(store.as_mut_slice()),
        CollisionPolicy::Disabled => CollisionReport::default(),
    }
}

/// Combine two particles into one, conserving mass and momentum.
///
/// The merged radius preserves total cross-section area; color and element
/// come from the heavier input.
pub fn merge(a: &Particle, b: &Particle) -> Particle {
    let mass = a.mass + b.mass;
    let position = (a.position * a.mass + b.position * b.mass) / mass;
    let velocity = (a.momentum() + b.momentum()) / mass;
    let radius = ((a.cross_section() + b.cross_section()) / std::f32::consts::PI).sqrt();
    let heavier = if a.mass > b.mass { a } else { b };

    Particle {
        name: "merged",
        element: heavier.element,
        mass,
        radius,
        color: heavier.color,
        position,
        velocity,
        force: Vec3::ZERO,
    }
}

fn find_contact(particles: &[Particle], contact: ContactRule) -> Option<(usize, usize)> {
    for i in 0..particles.len() {
        for j in (i + 1)..particles.len() {
            if contact.touching(&particles[i], &particles[j]) {
                return Some((i, j));
            }
        }
    }
    None
}

fn resolve_merges(store: &mut ParticleStore, contact: ContactRule) -> CollisionReport {
    let mut report = CollisionReport::default();

    while let Some((i, j)) = find_contact(store.as_slice(), contact) {
        let merged = merge(&store.as_slice()[i], &store.as_slice()[j]);
        log::debug!(
            "Merging particles {} and {} into mass {}",
            i,
            j,
            merged.mass
        );

        if let Err(err) = store.replace_pair(i, j, merged) {
            log::error!("Could not merge particles {} and {}: {}", i, j, err);
            break;
        }
        report.merges += 1;
    }

    report
}

/// Apply an equal-mass elastic bounce to a pair if they overlap and approach
fn bounce(a: &mut Particle, b: &mut Particle) -> bool {
    let delta = b.position - a.position;
    let distance = delta.length();
    let penetration = a.radius + b.radius - distance;
    if penetration <= 0.0 || distance <= SOFTENING {
        return false;
    }

    let normal = delta / distance;
    let approach = (b.velocity - a.velocity).dot(normal);
    if approach >= 0.0 {
        return false;
    }

    // equal masses: each side takes half of the 2·approach exchange
    let impulse = -approach;
    a.velocity -= normal * impulse;
    b.velocity += normal * impulse;

    let push = normal * (penetration * 0.5);
    a.position -= push;
    b.position += push;
    true
}

fn resolve_elastic(particles: &mut [Particle]) -> CollisionReport {
    let mut report = CollisionReport::default();
    if particles.len() < 2 {
        return report;
    }

    let max_radius = particles.iter().fold(0.0f32, |r, p| r.max(p.radius));
    let cell_size = COLLISION_CELL_SIZE.max(2.0 * max_radius);
    let hash = SpatialHash::build(particles, cell_size);

    for i in 0..particles.len() {
        let mut candidates = hash.neighbors_of(particles[i].position);
        candidates.retain(|&j| j > i);
        candidates.sort_unstable();

        for j in candidates {
            let (head, tail) = particles.split_at_mut(j);
            if bounce(&mut head[i], &mut tail[0]) {
                report.bounces += 1;
            }
        }
    }

    report
}
