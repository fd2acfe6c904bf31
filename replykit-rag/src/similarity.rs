//! Cosine distance between embeddings.

/// Distance reported when either vector has zero magnitude.
///
/// Cosine distance lies in `[0, 2]`, so this ranks such vectors last.
pub const MAX_COSINE_DISTANCE: f32 = 2.0;

/// Compute `1 - (a·b) / (‖a‖‖b‖)`.
///
/// Callers must pass vectors of equal length. Sums are accumulated in `f64`
/// so components near either end of the `f32` range neither overflow nor
/// underflow. Returns [`MAX_COSINE_DISTANCE`] if either vector has zero
/// magnitude or the result is not finite; otherwise the result is clamped to
/// `[0, 2]` to absorb floating-point drift.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return MAX_COSINE_DISTANCE;
    }
    let distance = 1.0 - dot / (norm_a.sqrt() * norm_b.sqrt());
    if !distance.is_finite() {
        return MAX_COSINE_DISTANCE;
    }
    (distance as f32).clamp(0.0, MAX_COSINE_DISTANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identical_vectors_have_zero_distance() {
        let v = [0.3, -1.2, 4.0];
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn distance_ignores_magnitude() {
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 20.0, 30.0];
        assert!(cosine_distance(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_and_opposite_vectors() {
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_maximally_distant() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), MAX_COSINE_DISTANCE);
        assert_eq!(cosine_distance(&[1.0, 0.0], &[0.0, 0.0]), MAX_COSINE_DISTANCE);
    }

    #[test]
    fn extreme_magnitudes_keep_identical_vectors_at_zero() {
        let large = [3e19f32, 0.0];
        assert!(cosine_distance(&large, &large).abs() < 1e-6);

        let huge = [f32::MAX, f32::MAX];
        assert!(cosine_distance(&huge, &huge).abs() < 1e-6);

        let tiny = [1e-25f32, 0.0];
        assert!(cosine_distance(&tiny, &tiny).abs() < 1e-6);

        let subnormal = [f32::from_bits(1), 0.0];
        assert!(cosine_distance(&subnormal, &subnormal).abs() < 1e-6);
    }

    #[test]
    fn non_finite_components_are_maximally_distant() {
        assert_eq!(cosine_distance(&[1.0, f32::NAN], &[1.0, 0.0]), MAX_COSINE_DISTANCE);
        assert_eq!(cosine_distance(&[f32::INFINITY, 0.0], &[1.0, 0.0]), MAX_COSINE_DISTANCE);
    }

    proptest! {
        #[test]
        fn distance_stays_within_bounds(
            pair in (1usize..32).prop_flat_map(|dim| (
                proptest::collection::vec(-1e30f32..1e30, dim),
                proptest::collection::vec(-1e30f32..1e30, dim),
            ))
        ) {
            let (a, b) = pair;
            let d = cosine_distance(&a, &b);
            prop_assert!((0.0..=MAX_COSINE_DISTANCE).contains(&d));
        }
    }
}
