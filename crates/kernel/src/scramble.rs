use glam::Vec3;

/// Deterministic generator built on splitmix64, so scrambles replay from a seed.
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

/// Uniform point in the cube `[-extent/2, extent/2)^3`.
pub fn random_position(rng: &mut SplitMix64, extent: f32) -> Vec3 {
    let mut axis = || (rng.next_f32() - 0.5) * extent;
    Vec3::new(axis(), axis(), axis())
}

/// `count` points evenly spaced on a circle of `radius` in the XY plane,
/// starting on +X.
pub fn circle_layout(count: usize, radius: f32) -> Vec<Vec3> {
    (0..count)
        .map(|i| {
            let angle = i as f32 / count as f32 * std::f32::consts::TAU;
            Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SplitMix64::new(7);
        let mut b = SplitMix64::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        assert_ne!(SplitMix64::new(7).next_u64(), SplitMix64::new(8).next_u64());
    }

    #[test]
    fn random_positions_stay_in_extent() {
        let mut rng = SplitMix64::new(42);
        for _ in 0..200 {
            let p = random_position(&mut rng, 10.0);
            for c in p.to_array() {
                assert!((-5.0..5.0).contains(&c), "{c} out of range");
            }
        }
    }

    #[test]
    fn circle_points_on_radius() {
        let points = circle_layout(6, 150.0);
        assert_eq!(points.len(), 6);
        assert!(points[0].abs_diff_eq(Vec3::new(150.0, 0.0, 0.0), 1e-3));
        for p in &points {
            assert!((p.length() - 150.0).abs() < 1e-2);
            assert_eq!(p.z, 0.0);
        }
        // Quarter of twelve is straight up.
        assert!(circle_layout(12, 1.0)[3].abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn empty_layout() {
        assert!(circle_layout(0, 150.0).is_empty());
    }
}
