use faer_core::{Mat, MatRef};

pub type Float = f32;

/// Copies a host field into a single-column matrix.
pub fn column(xs: &[Float]) -> Mat<Float> {
    Mat::from_fn(xs.len(), 1, |i, _| xs[i])
}

/// Copies the first column of `m` back into a host field.
pub fn column_to_vec(m: MatRef<'_, Float>) -> Vec<Float> {
    (0..m.nrows()).map(|i| m.read(i, 0)).collect()
}
