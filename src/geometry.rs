//! Fundamental geometric types and small dense linear algebra for frame modelling.

use nalgebra::{SMatrix, SVector, Vector3};

/// Dense 12×12 matrix used for element stiffness and transformation.
pub type Mat12 = SMatrix<f64, 12, 12>;
/// Twelve-component vector of element end quantities (six per end).
pub type Vec12 = SVector<f64, 12>;

/// Position in three dimensional space.
#[derive(Clone, Copy, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Point {
    /// Distance along the global X axis.
    pub x: f64,
    /// Distance along the global Y axis.
    pub y: f64,
    /// Distance along the global Z axis.
    pub z: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Coordinates as a plain array.
    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<Vector3<f64>> for Point {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Point> for Vector3<f64> {
    fn from(value: Point) -> Self {
        value.to_vector()
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use arclm::point;
///
/// let origin = point(0.0, 0.0, 0.0);
/// assert_eq!(origin.x, 0.0);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64, z: f64) -> Point {
    Point::new(x, y, z)
}

/// Sum of `x[i] * y[i]` over the first `n` entries.
///
/// # Panics
///
/// Panics if either slice is shorter than `n`.
#[must_use]
pub fn dot(x: &[f64], y: &[f64], n: usize) -> f64 {
    x[..n].iter().zip(&y[..n]).map(|(a, b)| a * b).sum()
}

/// Cross product of two 3-vectors.
#[must_use]
pub fn cross(x: &[f64; 3], y: &[f64; 3]) -> [f64; 3] {
    [
        x[1] * y[2] - x[2] * y[1],
        x[2] * y[0] - x[0] * y[2],
        x[0] * y[1] - x[1] * y[0],
    ]
}

/// Scale `x` to unit length in place and return it.
///
/// A zero vector is returned unchanged.
pub fn normalize(x: &mut [f64]) -> &mut [f64] {
    let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm != 0.0 {
        for v in x.iter_mut() {
            *v /= norm;
        }
    }
    x
}

/// Build the 12×12 block-diagonal rotation whose four 3×3 blocks have the rows `axes`.
#[must_use]
pub fn block_rotation(axes: &[[f64; 3]; 3]) -> Mat12 {
    let mut t = Mat12::zeros();
    for block in 0..4 {
        let offset = 3 * block;
        for (row, axis) in axes.iter().enumerate() {
            for (col, value) in axis.iter().enumerate() {
                t[(offset + row, offset + col)] = *value;
            }
        }
    }
    t
}

/// Copy the upper triangle of `m` onto its lower triangle.
pub fn mirror_upper(m: &mut Mat12) {
    for i in 0..12 {
        for j in 0..i {
            m[(i, j)] = m[(j, i)];
        }
    }
}

/// Largest absolute difference between `m` and its transpose.
#[must_use]
pub fn asymmetry(m: &Mat12) -> f64 {
    let mut worst: f64 = 0.0;
    for i in 0..12 {
        for j in 0..i {
            worst = worst.max((m[(i, j)] - m[(j, i)]).abs());
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_to_vector_roundtrip() {
        let origin = Point::new(1.0, 2.0, 3.0);
        let vector: Vector3<f64> = origin.into();
        assert_eq!(vector, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(Point::from(vector), origin);
    }

    #[test]
    fn dot_uses_only_leading_entries() {
        let x = [1.0, 2.0, 3.0, 100.0];
        let y = [4.0, 5.0, 6.0, 100.0];
        assert_relative_eq!(dot(&x, &y, 3), 32.0);
    }

    #[test]
    fn cross_of_basis_vectors() {
        assert_eq!(cross(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
        assert_eq!(cross(&[0.0, 1.0, 0.0], &[0.0, 0.0, 1.0]), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn normalize_scales_to_unit_length() {
        let mut v = [3.0, 0.0, 4.0];
        normalize(&mut v);
        assert_relative_eq!(v[0], 0.6);
        assert_relative_eq!(v[2], 0.8);
    }

    #[test]
    fn normalize_leaves_zero_vector() {
        let mut v = [0.0; 3];
        normalize(&mut v);
        assert_eq!(v, [0.0; 3]);
    }

    #[test]
    fn block_rotation_repeats_blocks() {
        let axes = [[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        let t = block_rotation(&axes);
        for block in 0..4 {
            let o = 3 * block;
            assert_eq!(t[(o, o + 1)], 1.0);
            assert_eq!(t[(o + 1, o)], -1.0);
            assert_eq!(t[(o + 2, o + 2)], 1.0);
        }
        assert_eq!(t[(0, 4)], 0.0);
    }
}
