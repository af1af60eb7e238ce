//! Vector similarity functions used by every match decision.
//!
//! Malformed input (length mismatch, empty or zero-magnitude vectors) never
//! fails: it scores as "no similarity" so a bad embedding can't disturb a scan.

/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Returns `0.0` when the lengths differ, either vector is empty, either has
/// zero magnitude, or the computation is not finite.
pub fn cosine_similarity(vector_a: &[f64], vector_b: &[f64]) -> f64 {
    if vector_a.len() != vector_b.len() || vector_a.is_empty() {
        return 0.0;
    }

    let (dot_product, norm_a, norm_b) = vector_a.iter().zip(vector_b).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, left, right), (&x, &y)| (x.mul_add(y, dot), x.mul_add(x, left), y.mul_add(y, right)),
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Euclidean (L2) distance between two vectors.
///
/// Returns `f64::INFINITY` when the lengths differ or the input is empty.
pub fn euclidean_distance(vector_a: &[f64], vector_b: &[f64]) -> f64 {
    if vector_a.len() != vector_b.len() || vector_a.is_empty() {
        return f64::INFINITY;
    }

    vector_a
        .iter()
        .zip(vector_b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Scale a vector to unit length.
///
/// A zero-magnitude vector is returned unchanged.
pub fn normalize(vector: &[f64]) -> Vec<f64> {
    let magnitude = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
    if magnitude == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / magnitude).collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test code is allowed to use unwrap and has different conventions"
)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_identical_vectors_score_one() {
        for vector in [
            vec![1.0, 0.0, 0.0],
            vec![0.3, -0.7, 2.5, 4.0],
            vec![1e-3, 1e-3],
            vec![-5.0],
        ] {
            assert!((cosine_similarity(&vector, &vector) - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let pairs = [
            (vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0]),
            (vec![0.5, -0.5], vec![-1.0, 4.0]),
            (vec![1.0, 0.0], vec![1.0, 0.0, 0.0]),
        ];
        for (left, right) in pairs {
            let forward = cosine_similarity(&left, &right);
            let backward = cosine_similarity(&right, &left);
            assert!((forward - backward).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_malformed_vectors_score_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).abs() < f64::EPSILON);
        assert!(cosine_similarity(&[], &[]).abs() < f64::EPSILON);
        assert!(cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]).abs() < f64::EPSILON);
        assert!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]).abs() < f64::EPSILON);
        assert!(cosine_similarity(&[f64::NAN, 1.0], &[1.0, 1.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < TOLERANCE);
        assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]) + 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_near_match_score() {
        let score = cosine_similarity(&[0.99, 0.1, 0.0], &[1.0, 0.0, 0.0]);
        assert!((score - 0.994_937).abs() < 1e-5, "score was {score}");
    }

    #[test]
    fn test_euclidean_distance() {
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < TOLERANCE);
        assert!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0]).abs() < TOLERANCE);
        assert!(euclidean_distance(&[1.0], &[1.0, 2.0]).is_infinite());
        assert!(euclidean_distance(&[], &[]).is_infinite());
    }

    #[test]
    fn test_normalize() {
        let unit = normalize(&[3.0, 4.0]);
        assert!((unit[0] - 0.6).abs() < TOLERANCE);
        assert!((unit[1] - 0.8).abs() < TOLERANCE);

        let zero = normalize(&[0.0, 0.0, 0.0]);
        assert_eq!(zero, vec![0.0, 0.0, 0.0]);

        assert!(normalize(&[]).is_empty());
    }
}
