//! Particle types and properties for the gravity simulation

use glam::Vec3;
use rand::Rng;

use crate::constants::*;

/// Chemical element classifier.
///
/// The discriminant doubles as the particle's mass in force and acceleration
/// formulas.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Hydrogen = 37_659,
    Helium = 74_564,
    Oxygen = 598_608,
    Carbon = 949_646_300,
    Neon = 376_968,
    Iron = 3_298_418_600,
}

impl Element {
    pub const ALL: [Element; 6] = [
        Element::Hydrogen,
        Element::Helium,
        Element::Oxygen,
        Element::Carbon,
        Element::Neon,
        Element::Iron,
    ];

    /// Mass-like quantity carried by the element tag
    pub fn mass(self) -> f32 {
        self as u32 as f32
    }

    /// Display color (RGBA)
    pub fn color(self) -> [u8; 4] {
        match self {
            Element::Hydrogen => [245, 245, 245, 255],
            Element::Helium => [230, 41, 55, 255],
            Element::Oxygen => [0, 121, 241, 255],
            Element::Carbon => [130, 130, 130, 255],
            Element::Neon => [255, 109, 194, 255],
            Element::Iron => [200, 200, 200, 255],
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// A point mass with an accumulated force
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Diagnostic label, not unique
    pub name: &'static str,
    pub element: Element,
    pub mass: f32,
    /// Collision and drawing radius
    pub radius: f32,
    pub color: [u8; 4],
    pub position: Vec3,
    pub velocity: Vec3,
    /// Transient, reset at the start of every force pass
    pub force: Vec3,
}

impl Particle {
    /// Create an element particle with the given velocity
    pub fn new(element: Element, position: Vec3, velocity: Vec3) -> Self {
        Self {
            name: "Custom",
            element,
            mass: element.mass(),
            radius: PARTICLE_RADIUS,
            color: element.color(),
            position,
            velocity,
            force: Vec3::ZERO,
        }
    }

    /// Create a body with explicit mass and radius.
    ///
    /// The element tag is kept at `Hydrogen`; only `mass` enters the physics.
    pub fn body(mass: f32, radius: f32, position: Vec3, velocity: Vec3, color: [u8; 4]) -> Self {
        Self {
            name: "Custom",
            element: Element::Hydrogen,
            mass,
            radius,
            color,
            position,
            velocity,
            force: Vec3::ZERO,
        }
    }

    /// Random element particle with a small random drift
    pub fn random_at<R: Rng + ?Sized>(position: Vec3, rng: &mut R) -> Self {
        let velocity = Vec3::new(
            rng.random_range(-RANDOM_ELEMENT_SPEED..=RANDOM_ELEMENT_SPEED),
            rng.random_range(-RANDOM_ELEMENT_SPEED..=RANDOM_ELEMENT_SPEED),
            rng.random_range(-RANDOM_ELEMENT_SPEED..=RANDOM_ELEMENT_SPEED),
        );
        Self {
            name: "Random",
            ..Self::new(Element::random(rng), position, velocity)
        }
    }

    /// Random body: mass in 1..=100, radius grows with mass
    pub fn random_body_at<R: Rng + ?Sized>(position: Vec3, rng: &mut R) -> Self {
        let mass = rng.random_range(BODY_MASS_MIN..=BODY_MASS_MAX) as f32;
        let color = [
            rng.random_range(100..=255),
            rng.random_range(100..=255),
            rng.random_range(100..=255),
            255,
        ];
        let velocity = Vec3::new(
            rng.random_range(-BODY_SPEED..=BODY_SPEED) as f32,
            rng.random_range(-BODY_SPEED..=BODY_SPEED) as f32,
            rng.random_range(-BODY_SPEED..=BODY_SPEED) as f32,
        );
        Self {
            name: "Random",
            ..Self::body(mass, 3.0 + mass / 20.0, position, velocity, color)
        }
    }

    /// Linear momentum `m·v`
    pub fn momentum(&self) -> Vec3 {
        self.velocity * self.mass
    }

    /// Area of the particle's cross-section, used when merging radii
    pub fn cross_section(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_element_mass_matches_tag() {
        assert_eq!(Element::Hydrogen.mass(), 37_659.0);
        assert_eq!(Element::Iron.mass(), 3_298_418_600u32 as f32);
    }

    #[test]
    fn test_random_particle_is_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let p = Particle::random_at(Vec3::new(1.0, 2.0, 3.0), &mut rng);
            assert_eq!(p.name, "Random");
            assert_eq!(p.position, Vec3::new(1.0, 2.0, 3.0));
            assert_eq!(p.mass, p.element.mass());
            assert!(p.velocity.abs().max_element() <= RANDOM_ELEMENT_SPEED);
            assert_eq!(p.force, Vec3::ZERO);
        }
    }

    #[test]
    fn test_random_body_radius_follows_mass() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let p = Particle::random_body_at(Vec3::ZERO, &mut rng);
            assert!((1.0..=100.0).contains(&p.mass));
            assert_eq!(p.radius, 3.0 + p.mass / 20.0);
            assert!(p.color[..3].iter().all(|&c| c >= 100));
            assert_eq!(p.velocity, p.velocity.round());
        }
    }
}
