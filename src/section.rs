//! Cross-section properties shared by elements.

use serde::{Deserialize, Serialize};

/// Index of a section inside its owning [`Frame`](crate::Frame).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(pub usize);

/// Yield envelope as six `(max, min)` pairs, one per stress component.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct YieldEnvelope(pub [f64; 12]);

impl YieldEnvelope {
    /// Envelope centred on zero with the given half widths.
    #[must_use]
    pub fn symmetric(limits: [f64; 6]) -> Self {
        let mut values = [0.0; 12];
        for (j, limit) in limits.iter().enumerate() {
            values[2 * j] = *limit;
            values[2 * j + 1] = -*limit;
        }
        Self(values)
    }

    /// Centre of component `j`.
    #[must_use]
    pub fn center(&self, j: usize) -> f64 {
        0.5 * (self.0[2 * j] + self.0[2 * j + 1])
    }

    /// Half width of component `j`.
    #[must_use]
    pub fn unit(&self, j: usize) -> f64 {
        0.5 * (self.0[2 * j] - self.0[2 * j + 1])
    }
}

impl Default for YieldEnvelope {
    fn default() -> Self {
        Self([0.0; 12])
    }
}

/// Material and geometric properties of a member cross section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Section number, unique within a frame.
    pub num: i64,
    /// Young's modulus.
    pub young: f64,
    /// Poisson ratio.
    pub poisson: f64,
    /// Area, strong-axis inertia, weak-axis inertia and torsional constant.
    pub value: [f64; 4],
    /// Yield envelope for `N, Qx, Qy, Mz, Mx, My`.
    pub envelope: YieldEnvelope,
    /// Exponent applied to each normalised stress component.
    pub exp: f64,
    /// Exponent combining the axial/bending and shear groups.
    pub exq: f64,
    /// Type flag; `-1` marks the rigid sentinel.
    pub kind: i32,
    /// Opaque tag carried through from input.
    pub original: i64,
}

impl Section {
    /// Elastic section with the given properties and an empty yield envelope.
    #[must_use]
    pub fn new(num: i64, young: f64, poisson: f64, value: [f64; 4]) -> Self {
        Self {
            num,
            young,
            poisson,
            value,
            envelope: YieldEnvelope::default(),
            exp: 1.5,
            exq: 1.5,
            kind: 0,
            original: num,
        }
    }

    /// The rigid sentinel used where no real section applies.
    #[must_use]
    pub fn rigid() -> Self {
        Self {
            num: 0,
            young: 0.0,
            poisson: 0.0,
            value: [0.0, -1.0, -1.0, 0.0],
            envelope: YieldEnvelope::default(),
            exp: 1.5,
            exq: 1.5,
            kind: -1,
            original: 0,
        }
    }

    /// Attach a yield envelope and shape exponents.
    #[must_use]
    pub fn with_envelope(mut self, envelope: YieldEnvelope, exp: f64, exq: f64) -> Self {
        self.envelope = envelope;
        self.exp = exp;
        self.exq = exq;
        self
    }

    /// Whether this is the rigid sentinel.
    #[must_use]
    pub fn is_rigid(&self) -> bool {
        self.kind == -1
    }

    /// Cross-sectional area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.value[0]
    }

    /// Strong-axis flexural inertia.
    #[must_use]
    pub fn ix(&self) -> f64 {
        self.value[1]
    }

    /// Weak-axis flexural inertia.
    #[must_use]
    pub fn iy(&self) -> f64 {
        self.value[2]
    }

    /// Torsional constant.
    #[must_use]
    pub fn torsion(&self) -> f64 {
        self.value[3]
    }

    /// Shear modulus `E / 2(1 + ν)`.
    #[must_use]
    pub fn shear_modulus(&self) -> f64 {
        0.5 * self.young / (1.0 + self.poisson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn envelope_center_and_unit() {
        let mut values = [0.0; 12];
        values[8] = 12.0;
        values[9] = -8.0;
        let envelope = YieldEnvelope(values);
        assert_relative_eq!(envelope.center(4), 2.0);
        assert_relative_eq!(envelope.unit(4), 10.0);
    }

    #[test]
    fn symmetric_envelope_is_centred() {
        let envelope = YieldEnvelope::symmetric([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        for j in 0..6 {
            assert_eq!(envelope.center(j), 0.0);
            assert_eq!(envelope.unit(j), (j + 1) as f64);
        }
    }

    #[test]
    fn rigid_sentinel_flags() {
        let rigid = Section::rigid();
        assert!(rigid.is_rigid());
        assert_eq!(rigid.value, [0.0, -1.0, -1.0, 0.0]);
    }

    #[test]
    fn shear_modulus_from_poisson() {
        let section = Section::new(1, 2.6e8, 0.3, [1.0, 1.0, 1.0, 1.0]);
        assert_relative_eq!(section.shear_modulus(), 1.0e8);
    }
}
