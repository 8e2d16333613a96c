/// Compute the squared Euclidean distance between two vectors.
///
/// Uses f64 intermediate precision. Callers must ensure both slices have
/// the same length; extra trailing components of the longer slice are
/// ignored.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    let mut sum: f64 = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let d = x as f64 - y as f64;
        sum += d * d;
    }
    sum as f32
}

/// Normalize a vector to unit length in-place. Zero vectors are left as is.
pub fn l2_normalize(v: &mut [f32]) {
    let mut sum: f64 = 0.0;
    for &x in v.iter() {
        sum += (x as f64) * (x as f64);
    }
    let norm = sum.sqrt();
    if norm > 0.0 {
        let scale = (1.0 / norm) as f32;
        for x in v.iter_mut() {
            *x *= scale;
        }
    }
}
