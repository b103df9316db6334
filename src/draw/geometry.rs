//! Randomized pose sampling for each draw phase
//!
//! Pure functions over an explicit RNG. Each phase has its own bounds for
//! angle, radius, rotation, tilt and depth; all distributions are uniform
//! over their stated ranges. The jitter here is cosmetic: fairness of the
//! draw rests solely on the uniform winner choice in the Select phase.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use crate::polar_to_cartesian;
use crate::surface::Pose;

/// Horizontal entry jitter, either side of the bowl mouth.
pub const ENTRY_JITTER: f32 = 75.0;
/// Height above the bowl chits enter from.
pub const ENTRY_HEIGHT: f32 = 260.0;
/// Maximum settle radius from the bowl center.
pub const REST_RADIUS_MAX: f32 = 80.0;
/// Tilt range (± degrees) for settled and scattered chits.
pub const TILT_RANGE: f32 = 10.0;
/// Maximum settle depth offset.
pub const REST_DEPTH_MAX: f32 = 5.0;
/// Stir radius band.
pub const STIR_RADIUS_MIN: f32 = 50.0;
pub const STIR_RADIUS_MAX: f32 = 140.0;
/// Scatter radius band.
pub const SCATTER_RADIUS_MIN: f32 = 60.0;
pub const SCATTER_RADIUS_MAX: f32 = 140.0;
/// Angular jitter (radians) added to each chit's scatter slot.
pub const SCATTER_JITTER: f32 = 0.5;
/// How far the winner rises out of the bowl.
pub const LIFT_HEIGHT: f32 = 200.0;
/// Winner scale while lifted.
pub const LIFT_SCALE: f32 = 1.3;
/// Outward depth push applied during the vanish fade.
pub const VANISH_DEPTH_PUSH: f32 = 50.0;
/// How far above the grab target the cursor hovers first.
pub const CURSOR_HOVER_RISE: f32 = 40.0;
/// Bowl-relative offset from the winner's center to the grab point.
pub const GRAB_OFFSET: Vec2 = Vec2::new(0.0, 12.0);

/// Entry pose: above the bowl with horizontal jitter and a random tilt,
/// waiting to fall.
pub fn entry_pose<R: Rng>(rng: &mut R) -> Pose {
    Pose {
        translation: Vec2::new(
            rng.random_range(-ENTRY_JITTER..=ENTRY_JITTER),
            -ENTRY_HEIGHT,
        ),
        rotation: 0.0,
        tilt: rng.random_range(0.0..360.0),
        depth: 0.0,
        scale: 1.0,
    }
}

/// Resting pose inside the bowl after the drop settles.
pub fn rest_pose<R: Rng>(rng: &mut R) -> Pose {
    let angle = rng.random_range(0.0..TAU);
    let radius = rng.random_range(0.0..=REST_RADIUS_MAX);
    Pose {
        translation: polar_to_cartesian(radius, angle),
        rotation: rng.random_range(0.0..360.0),
        tilt: rng.random_range(-TILT_RANGE..=TILT_RANGE),
        depth: rng.random_range(0.0..=REST_DEPTH_MAX),
        scale: 1.0,
    }
}

/// Stir pose: a fresh position and spin; tilt, depth and scale carry over.
pub fn stir_pose<R: Rng>(rng: &mut R, current: Pose) -> Pose {
    let angle = rng.random_range(0.0..TAU);
    let radius = rng.random_range(STIR_RADIUS_MIN..=STIR_RADIUS_MAX);
    Pose {
        translation: polar_to_cartesian(radius, angle),
        rotation: rng.random_range(0.0..360.0),
        ..current
    }
}

/// Angular slot for chit `index` of `count` in the scatter ring, plus
/// per-chit jitter.
pub fn scatter_angle<R: Rng>(rng: &mut R, index: usize, count: usize) -> f32 {
    let slot = TAU * index as f32 / count.max(1) as f32;
    slot + rng.random_range(0.0..SCATTER_JITTER)
}

/// Scatter pose: chits fan out into evenly spaced, jittered slots around
/// the bowl rim; depth and scale carry over.
pub fn scatter_pose<R: Rng>(rng: &mut R, current: Pose, index: usize, count: usize) -> Pose {
    let angle = scatter_angle(rng, index, count);
    let radius = rng.random_range(SCATTER_RADIUS_MIN..=SCATTER_RADIUS_MAX);
    Pose {
        translation: polar_to_cartesian(radius, angle),
        rotation: rng.random_range(0.0..360.0),
        tilt: rng.random_range(-TILT_RANGE..=TILT_RANGE),
        ..current
    }
}

/// Lifted pose for the presented winner: straight up, squared off, enlarged.
pub fn lifted_pose() -> Pose {
    Pose {
        translation: Vec2::new(0.0, -LIFT_HEIGHT),
        rotation: 0.0,
        tilt: 0.0,
        depth: 0.0,
        scale: LIFT_SCALE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize_angle;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_entry_pose_bounds() {
        let mut rng = Pcg32::seed_from_u64(42);
        for _ in 0..1000 {
            let pose = entry_pose(&mut rng);
            assert!(pose.translation.x.abs() <= ENTRY_JITTER);
            assert_eq!(pose.translation.y, -ENTRY_HEIGHT);
            assert!((0.0..360.0).contains(&pose.tilt));
            assert_eq!(pose.rotation, 0.0);
        }
    }

    #[test]
    fn test_rest_pose_bounds() {
        let mut rng = Pcg32::seed_from_u64(42);
        for _ in 0..1000 {
            let pose = rest_pose(&mut rng);
            assert!(pose.translation.length() <= REST_RADIUS_MAX + 1e-3);
            assert!((0.0..360.0).contains(&pose.rotation));
            assert!(pose.tilt.abs() <= TILT_RANGE);
            assert!((0.0..=REST_DEPTH_MAX).contains(&pose.depth));
            assert_eq!(pose.scale, 1.0);
        }
    }

    #[test]
    fn test_stir_pose_radius_band_and_carryover() {
        let mut rng = Pcg32::seed_from_u64(42);
        let current = Pose {
            tilt: 7.5,
            depth: 3.0,
            scale: 1.3,
            ..Pose::NEUTRAL
        };
        for _ in 0..1000 {
            let pose = stir_pose(&mut rng, current);
            let radius = pose.translation.length();
            assert!(radius >= STIR_RADIUS_MIN - 1e-3);
            assert!(radius <= STIR_RADIUS_MAX + 1e-3);
            // Position and spin are fresh; the rest carries over
            assert_eq!(pose.tilt, 7.5);
            assert_eq!(pose.depth, 3.0);
            assert_eq!(pose.scale, 1.3);
        }
    }

    #[test]
    fn test_scatter_angle_stays_in_slot_window() {
        let mut rng = Pcg32::seed_from_u64(42);
        let count = 8;
        for index in 0..count {
            let slot = TAU * index as f32 / count as f32;
            for _ in 0..200 {
                let angle = scatter_angle(&mut rng, index, count);
                // Compare modulo TAU since slot + jitter can pass the seam
                let delta = normalize_angle(angle - slot);
                assert!((0.0..SCATTER_JITTER + 1e-3).contains(&delta));
            }
        }
    }

    #[test]
    fn test_lifted_pose_is_fixed() {
        let pose = lifted_pose();
        assert_eq!(pose.translation, Vec2::new(0.0, -LIFT_HEIGHT));
        assert_eq!(pose.rotation, 0.0);
        assert_eq!(pose.tilt, 0.0);
        assert_eq!(pose.scale, LIFT_SCALE);
    }

    proptest! {
        #[test]
        fn prop_scatter_pose_radius_in_band(seed in any::<u64>(), count in 1usize..24, index_raw in 0usize..24) {
            let index = index_raw % count;
            let mut rng = Pcg32::seed_from_u64(seed);
            let pose = scatter_pose(&mut rng, Pose::NEUTRAL, index, count);
            let radius = pose.translation.length();
            prop_assert!(radius >= SCATTER_RADIUS_MIN - 1e-3);
            prop_assert!(radius <= SCATTER_RADIUS_MAX + 1e-3);
        }

        #[test]
        fn prop_rest_pose_inside_bowl(seed in any::<u64>()) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let pose = rest_pose(&mut rng);
            prop_assert!(pose.translation.length() <= REST_RADIUS_MAX + 1e-3);
        }
    }
}
