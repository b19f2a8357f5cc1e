//! Vector arithmetic on node positions.
//!
//! Callers guarantee equal lengths; the graph and engine check dimensions
//! before anything reaches these helpers.

/// Squared Euclidean distance.
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// Component-wise midpoint of two positions.
pub fn midpoint(a: &[f64], b: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x + y) / 2.0).collect()
}

/// Move `position` toward `target` by `rate`: `p += rate * (target - p)`.
pub fn move_toward(position: &mut [f64], target: &[f64], rate: f64) {
    debug_assert_eq!(position.len(), target.len());
    for (p, t) in position.iter_mut().zip(target) {
        *p += rate * (t - *p);
    }
}
