// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Deterministic, seedable, stream-splittable RNG discipline.
//!
//! One top-level seed is supplied per job; each parallel unit (e.g. a
//! radiosity source patch index) derives its own substream by mixing the
//! seed with a unit id, rather than relying on thread-local defaults.

use rand_pcg::Pcg64Mcg;

/// Fold a top-level seed and a unit index into a single 64-bit substream
/// seed. Uses the splitmix64 finalizer as a cheap, well-distributed mix.
fn derive_substream_seed(seed: u64, unit_id: u64) -> u64 {
    let mut z = seed.wrapping_add(unit_id.wrapping_mul(0x9E3779B97F4A7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Build a PCG generator for the given top-level seed and parallel-unit id.
/// Calling this twice with the same `(seed, unit_id)` always yields a
/// generator in the same initial state, which is what makes the Monte
/// Carlo form-factor pass and any other parallel unit reproducible.
pub fn substream_rng(seed: u64, unit_id: u64) -> Pcg64Mcg {
    Pcg64Mcg::new(derive_substream_seed(seed, unit_id) as u128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_and_unit_id_reproduce() {
        let mut a = substream_rng(42, 7);
        let mut b = substream_rng(42, 7);
        let xs: Vec<f64> = (0..8).map(|_| a.gen::<f64>()).collect();
        let ys: Vec<f64> = (0..8).map(|_| b.gen::<f64>()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn different_unit_ids_diverge() {
        let mut a = substream_rng(42, 1);
        let mut b = substream_rng(42, 2);
        let x: f64 = a.gen();
        let y: f64 = b.gen();
        assert_ne!(x, y);
    }
}
