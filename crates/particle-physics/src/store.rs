//! Owning, insertion-ordered particle collection

use glam::Vec3;

use crate::error::StoreError;
use crate::particle::Particle;

/// Insertion-ordered particle collection.
///
/// Indices are only valid until the next insertion or removal.
#[derive(Debug, Clone, Default)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a particle and return its index.
    ///
    /// On failure the store is left untouched.
    pub fn add(&mut self, particle: Particle) -> Result<usize, StoreError> {
        if !(particle.mass.is_finite() && particle.mass > 0.0) {
            log::warn!(
                "Rejected particle '{}' with mass {}",
                particle.name,
                particle.mass
            );
            return Err(StoreError::InvalidMass(particle.mass));
        }

        let index = self.particles.len();
        if self.particles.try_reserve(1).is_err() {
            log::error!("Could not allocate memory for particle {}", index);
            return Err(StoreError::Allocation { requested: index + 1 });
        }

        self.particles.push(particle);
        Ok(index)
    }

    /// Replace the particles at `a` and `b` with `particle`, appended last.
    ///
    /// Everything is checked before the first removal, so on failure the
    /// store is left untouched. Returns the index of the new particle.
    pub fn replace_pair(
        &mut self,
        a: usize,
        b: usize,
        particle: Particle,
    ) -> Result<usize, StoreError> {
        if !(particle.mass.is_finite() && particle.mass > 0.0) {
            log::warn!(
                "Rejected replacement '{}' with mass {}",
                particle.name,
                particle.mass
            );
            return Err(StoreError::InvalidMass(particle.mass));
        }

        let len = self.particles.len();
        let (low, high) = (a.min(b), a.max(b));
        if low == high || high >= len {
            return Err(StoreError::InvalidPair { a, b, len });
        }

        // two out, one in: the push reuses freed capacity
        self.particles.remove(high);
        self.particles.remove(low);
        self.particles.push(particle);
        self.particles.shrink_to_fit();
        Ok(len - 2)
    }

    /// Remove the particle at `index`, shifting the tail down by one.
    ///
    /// Out-of-range indices are ignored.
    pub fn remove_at(&mut self, index: usize) -> Option<Particle> {
        if index >= self.particles.len() {
            return None;
        }

        let removed = self.particles.remove(index);
        if self.particles.is_empty() {
            self.particles = Vec::new();
        } else {
            self.particles.shrink_to_fit();
        }
        Some(removed)
    }

    /// Release every particle and the backing storage
    pub fn clear(&mut self) {
        self.particles = Vec::new();
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.particles.capacity()
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn total_mass(&self) -> f64 {
        self.particles.iter().map(|p| p.mass as f64).sum()
    }

    pub fn total_momentum(&self) -> Vec3 {
        self.particles.iter().map(Particle::momentum).sum()
    }
}

impl<'a> IntoIterator for &'a ParticleStore {
    type Item = &'a Particle;
    type IntoIter = std::slice::Iter<'a, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Element;

    fn labelled(x: f32) -> Particle {
        Particle::new(Element::Helium, Vec3::new(x, 0.0, 0.0), Vec3::ZERO)
    }

    fn store_of(n: usize) -> ParticleStore {
        let mut store = ParticleStore::new();
        for i in 0..n {
            store.add(labelled(i as f32)).unwrap();
        }
        store
    }

    #[test]
    fn test_add_returns_index() {
        let mut store = ParticleStore::new();
        assert_eq!(store.add(labelled(0.0)), Ok(0));
        assert_eq!(store.add(labelled(1.0)), Ok(1));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_add_rejects_zero_mass() {
        let mut store = store_of(2);
        let ghost = Particle::body(0.0, 1.0, Vec3::ZERO, Vec3::ZERO, [255; 4]);
        assert_eq!(store.add(ghost), Err(StoreError::InvalidMass(0.0)));

        let nan = Particle::body(f32::NAN, 1.0, Vec3::ZERO, Vec3::ZERO, [255; 4]);
        assert!(matches!(store.add(nan), Err(StoreError::InvalidMass(_))));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_shifts_tail_down() {
        let n = 6;
        let k = 2;
        let mut store = store_of(n);

        let removed = store.remove_at(k).unwrap();
        assert_eq!(removed.position.x, k as f32);
        assert_eq!(store.len(), n - 1);

        for i in 0..store.len() {
            let expected = if i < k { i } else { i + 1 };
            assert_eq!(store.get(i).unwrap().position.x, expected as f32);
        }
    }

    #[test]
    fn test_replace_pair_appends_last() {
        let mut store = store_of(5);
        let fused = Particle::body(9.0, 1.0, Vec3::splat(7.0), Vec3::ZERO, [255; 4]);

        assert_eq!(store.replace_pair(3, 1, fused), Ok(3));
        let xs: Vec<f32> = store.iter().map(|p| p.position.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0, 7.0]);
    }

    #[test]
    fn test_replace_pair_failure_keeps_store() {
        let mut store = store_of(3);
        let overflowed = Particle::body(f32::INFINITY, 1.0, Vec3::ZERO, Vec3::ZERO, [255; 4]);
        assert_eq!(
            store.replace_pair(0, 1, overflowed),
            Err(StoreError::InvalidMass(f32::INFINITY))
        );

        let fine = Particle::body(1.0, 1.0, Vec3::ZERO, Vec3::ZERO, [255; 4]);
        assert_eq!(
            store.replace_pair(1, 1, fine.clone()),
            Err(StoreError::InvalidPair { a: 1, b: 1, len: 3 })
        );
        assert!(store.replace_pair(0, 3, fine).is_err());

        let xs: Vec<f32> = store.iter().map(|p| p.position.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut store = store_of(3);
        assert!(store.remove_at(3).is_none());
        assert!(store.remove_at(usize::MAX).is_none());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_remove_last_releases_storage() {
        let mut store = store_of(1);
        store.remove_at(0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 0);
    }

    #[test]
    fn test_remove_shrinks_capacity() {
        let mut store = store_of(10);
        let before = store.capacity();
        store.remove_at(4);
        assert!(store.capacity() < before);
        assert!(store.capacity() >= store.len());
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut store = store_of(5);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 0);
    }

    #[test]
    fn test_aggregates() {
        let mut store = ParticleStore::new();
        store
            .add(Particle::body(2.0, 1.0, Vec3::ZERO, Vec3::X, [255; 4]))
            .unwrap();
        store
            .add(Particle::body(3.0, 1.0, Vec3::ZERO, Vec3::Y, [255; 4]))
            .unwrap();
        assert_eq!(store.total_mass(), 5.0);
        assert_eq!(store.total_momentum(), Vec3::new(2.0, 3.0, 0.0));
    }
}
