use std::collections::HashMap;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Named, independently seeded RNG streams derived from one master seed.
///
/// Stream seeds depend only on the master seed and the stream name, so
/// seeding species in a different order yields the same populations.
pub struct RngManager {
    seed: u64,
    streams: HashMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            streams: HashMap::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stream(&mut self, name: &str) -> StreamRng<'_> {
        let seed = self.seed;
        let entry = self
            .streams
            .entry(name.to_string())
            .or_insert_with(|| ChaCha8Rng::seed_from_u64(derive_seed(seed, name)));
        StreamRng { inner: entry }
    }

    pub fn species_stream(&mut self, species: usize) -> StreamRng<'_> {
        self.stream(&format!("species {species}"))
    }
}

fn derive_seed(seed: u64, name: &str) -> u64 {
    let mut master = ChaCha8Rng::seed_from_u64(seed);
    let mut mixed = master.next_u64();
    for byte in name.bytes() {
        mixed ^= byte as u64;
        mixed = mixed.wrapping_mul(0x0000_0100_0000_01b3);
    }
    mixed
}

pub struct StreamRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl<'a> RngCore for StreamRng<'a> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = RngManager::new(42);
        let mut b = RngManager::new(42);

        let x: f64 = a.species_stream(1).gen();
        let y: f64 = b.species_stream(1).gen();
        assert_eq!(x, y);
    }

    #[test]
    fn test_stream_independent_of_access_order() {
        let mut a = RngManager::new(7);
        let mut b = RngManager::new(7);

        let _: u64 = a.species_stream(0).gen();
        let from_a: u64 = a.species_stream(1).gen();
        let from_b: u64 = b.species_stream(1).gen();
        assert_eq!(from_a, from_b);
    }

    #[test]
    fn test_streams_differ() {
        let mut rng = RngManager::new(42);

        let x: u64 = rng.species_stream(0).gen();
        let y: u64 = rng.species_stream(1).gen();
        assert_ne!(x, y);
    }

    #[test]
    fn test_stream_continues() {
        let mut rng = RngManager::new(42);

        let x: u64 = rng.stream("terrain").gen();
        let y: u64 = rng.stream("terrain").gen();
        assert_ne!(x, y);
    }
}
