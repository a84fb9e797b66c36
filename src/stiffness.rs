//! Element stiffness, condensation of releases and end force recovery.
//!
//! Local degrees of freedom at each end are ordered
//! `u` (along the axis), `v` (along the strong axis), `w` (along the weak axis),
//! `θ` about the axis, about the strong axis and about the weak axis.
//! Slots `0..6` belong to the first node, `6..12` to the second.

use crate::bond::Bond;
use crate::element::ElementView;
use crate::errors::ElementError;
use crate::geometry::{mirror_upper, Mat12, Vec12};
use crate::plasticity::{plastic_matrix, MaterialLaw};

/// Local elastic stiffness of an Euler–Bernoulli space frame member.
///
/// # Errors
///
/// Returns [`ElementError::ZeroLength`] when the end nodes coincide.
pub fn stiff_matrix(view: &ElementView) -> Result<Mat12, ElementError> {
    let l = view.length();
    if l == 0.0 {
        return Err(ElementError::ZeroLength {
            element: view.element.num,
        });
    }
    let section = view.section;
    let e = section.young;
    let g = section.shear_modulus();
    let (a, ix, iy, j) = (section.area(), section.ix(), section.iy(), section.torsion());
    let l2 = l * l;
    let l3 = l2 * l;

    let mut k = Mat12::zeros();

    let ka = e * a / l;
    k[(0, 0)] = ka;
    k[(0, 6)] = -ka;
    k[(6, 6)] = ka;

    let kt = g * j / l;
    k[(3, 3)] = kt;
    k[(3, 9)] = -kt;
    k[(9, 9)] = kt;

    // Bending about the strong axis: w with rotation about the strong axis.
    let (b12, b6, b4, b2) = (
        12.0 * e * ix / l3,
        6.0 * e * ix / l2,
        4.0 * e * ix / l,
        2.0 * e * ix / l,
    );
    k[(2, 2)] = b12;
    k[(2, 4)] = -b6;
    k[(2, 8)] = -b12;
    k[(2, 10)] = -b6;
    k[(4, 4)] = b4;
    k[(4, 8)] = b6;
    k[(4, 10)] = b2;
    k[(8, 8)] = b12;
    k[(8, 10)] = b6;
    k[(10, 10)] = b4;

    // Bending about the weak axis: v with rotation about the weak axis.
    let (c12, c6, c4, c2) = (
        12.0 * e * iy / l3,
        6.0 * e * iy / l2,
        4.0 * e * iy / l,
        2.0 * e * iy / l,
    );
    k[(1, 1)] = c12;
    k[(1, 5)] = c6;
    k[(1, 7)] = -c12;
    k[(1, 11)] = c6;
    k[(5, 5)] = c4;
    k[(5, 7)] = -c6;
    k[(5, 11)] = c2;
    k[(7, 7)] = c12;
    k[(7, 11)] = -c6;
    k[(11, 11)] = c4;

    mirror_upper(&mut k);
    Ok(k)
}

/// Local geometric stiffness for the element's current end forces.
///
/// The axial force is `N = -stress[0]`, positive in tension.
///
/// # Errors
///
/// Returns [`ElementError::ZeroLength`] when the end nodes coincide.
pub fn geo_stiff_matrix(view: &ElementView) -> Result<Mat12, ElementError> {
    let l = view.length();
    if l == 0.0 {
        return Err(ElementError::ZeroLength {
            element: view.element.num,
        });
    }
    let section = view.section;
    let s = &view.element.stress;
    let n = -s[0];
    let (qx, qy) = (s[1], s[2]);
    let (mxi, myi, mxj, myj) = (s[4], s[5], s[10], s[11]);
    let mt = s[9];
    let g = if section.area() != 0.0 {
        -(section.ix() + section.iy()) / section.area()
    } else {
        0.0
    };

    let mut k = Mat12::zeros();

    k[(0, 0)] = n / l;
    k[(0, 6)] = -n / l;
    k[(6, 6)] = n / l;

    let kt = -g * n / l;
    k[(3, 3)] = kt;
    k[(3, 9)] = -kt;
    k[(9, 9)] = kt;

    let p6 = 6.0 * n / (5.0 * l);
    let p1 = n / 10.0;
    let p2 = 2.0 * n * l / 15.0;
    let p3 = n * l / 30.0;

    k[(1, 1)] = p6;
    k[(1, 5)] = p1;
    k[(1, 7)] = -p6;
    k[(1, 11)] = p1;
    k[(5, 5)] = p2;
    k[(5, 7)] = -p1;
    k[(5, 11)] = -p3;
    k[(7, 7)] = p6;
    k[(7, 11)] = -p1;
    k[(11, 11)] = p2;

    k[(2, 2)] = p6;
    k[(2, 4)] = -p1;
    k[(2, 8)] = -p6;
    k[(2, 10)] = -p1;
    k[(4, 4)] = p2;
    k[(4, 8)] = p1;
    k[(4, 10)] = -p3;
    k[(8, 8)] = p6;
    k[(8, 10)] = p1;
    k[(10, 10)] = p2;

    // Coupling of transverse displacement and twist through the end moments.
    k[(1, 3)] = mxi / l;
    k[(1, 9)] = mxj / l;
    k[(2, 3)] = myi / l;
    k[(2, 9)] = myj / l;
    k[(3, 7)] = -mxi / l;
    k[(3, 8)] = -myi / l;
    k[(7, 9)] = -mxj / l;
    k[(8, 9)] = -myj / l;

    k[(1, 4)] = mt / l;
    k[(1, 10)] = -mt / l;
    k[(2, 5)] = mt / l;
    k[(2, 11)] = -mt / l;
    k[(4, 7)] = -mt / l;
    k[(7, 10)] = mt / l;
    k[(5, 8)] = -mt / l;
    k[(8, 11)] = mt / l;

    k[(3, 4)] = (2.0 * myi - myj) / 6.0;
    k[(3, 5)] = -(2.0 * mxi - mxj) / 6.0;
    k[(4, 9)] = (myi - 2.0 * myj) / 6.0;
    k[(5, 9)] = -(mxi - 2.0 * mxj) / 6.0;

    // Shear contribution to the twist/rotation coupling.
    k[(3, 10)] = qx * l / 6.0;
    k[(3, 11)] = qy * l / 6.0;
    k[(9, 10)] = -qx * l / 6.0;
    k[(9, 11)] = -qy * l / 6.0;

    mirror_upper(&mut k);
    Ok(k)
}

/// Statically condense released components and springs out of `k`.
///
/// For each condensed dof the update is
/// `K ← K − K[·,k]·K[k,·] / (K[k,k]·(κ + 1))`, where `κ` is the spring
/// stiffness relative to the member's own stiffness at that dof.
/// Released components condense with `κ = 0` and leave an empty row and column.
///
/// # Errors
///
/// Returns [`ElementError::Singular`] when a condensed dof has zero stiffness
/// but still couples to other dofs.
pub fn modify_hinge(view: &ElementView, mut k: Mat12) -> Result<Mat12, ElementError> {
    let l = view.length();
    let section = view.section;
    let scale = (0..12).map(|i| k[(i, i)].abs()).fold(0.0, f64::max);
    for (dof, bond) in view.element.bonds.iter().enumerate() {
        let Some(spring) = bond.condensation_stiffness(dof) else {
            continue;
        };
        let kk = k[(dof, dof)];
        if kk.abs() <= 1e-12 * scale {
            let coupled = (0..12).any(|i| i != dof && k[(i, dof)].abs() > 1e-12 * scale);
            if kk == 0.0 && coupled {
                return Err(ElementError::Singular {
                    element: view.element.num,
                    dof,
                });
            }
            clear_dof(&mut k, dof);
            continue;
        }
        let kappa = match dof % 6 {
            4 if section.ix() > 0.0 => spring * l / (4.0 * section.young * section.ix()),
            5 if section.iy() > 0.0 => spring * l / (4.0 * section.young * section.iy()),
            _ => spring / kk,
        };
        let column: [f64; 12] = std::array::from_fn(|i| k[(i, dof)]);
        let factor = 1.0 / (kk * (kappa + 1.0));
        for i in 0..12 {
            for j in 0..12 {
                k[(i, j)] -= column[i] * column[j] * factor;
            }
        }
        if matches!(bond, Bond::Released) {
            clear_dof(&mut k, dof);
        }
    }
    Ok(k)
}

fn clear_dof(k: &mut Mat12, dof: usize) {
    for i in 0..12 {
        k[(i, dof)] = 0.0;
        k[(dof, i)] = 0.0;
    }
}

/// Redistribute member loads for moment releases at one or both ends.
///
/// Only the moment slots `(4, 10)` and `(5, 11)` with a release at one end
/// and a rigid connection at the other (or releases at both) are affected.
/// Applying the adjustment twice gives the same result as applying it once.
pub fn modify_cmq(bonds: &[Bond; 12], length: f64, values: &mut [f64; 12]) {
    release_pair(bonds, length, values, (4, 10), (2, 8), 1.0);
    release_pair(bonds, length, values, (5, 11), (1, 7), -1.0);
}

fn release_pair(
    bonds: &[Bond; 12],
    length: f64,
    values: &mut [f64; 12],
    (mi, mj): (usize, usize),
    (si, sj): (usize, usize),
    sign: f64,
) {
    match (bonds[mi], bonds[mj]) {
        (Bond::Released, Bond::Released) => {
            values[mi] = 0.0;
            values[mj] = 0.0;
        }
        (Bond::Released, Bond::Rigid) => {
            let m = values[mi];
            values[mj] -= 0.5 * m;
            values[si] += sign * 1.5 * m / length;
            values[sj] -= sign * 1.5 * m / length;
            values[mi] = 0.0;
        }
        (Bond::Rigid, Bond::Released) => {
            let m = values[mj];
            values[mi] -= 0.5 * m;
            values[si] += sign * 1.5 * m / length;
            values[sj] -= sign * 1.5 * m / length;
            values[mj] = 0.0;
        }
        _ => (),
    }
}

/// `Tᵀ·K·T`.
#[must_use]
pub fn transformation(k: &Mat12, t: &Mat12) -> Mat12 {
    t.transpose() * k * t
}

/// Options controlling which contributions enter the element tangent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TangentOptions {
    /// Add the geometric stiffness of the current end forces.
    pub geometric: bool,
    /// Condense active plastic hinges.
    pub plastic: bool,
    /// Yield function whose gradient is condensed at plastic hinges.
    pub material: MaterialLaw,
}

/// Local tangent stiffness: elastic (plus geometric) stiffness, releases
/// condensed, then plastic hinges condensed.
///
/// # Errors
///
/// Propagates the element errors of the individual steps.
pub fn tangent_matrix(view: &ElementView, options: TangentOptions) -> Result<Mat12, ElementError> {
    let mut k = stiff_matrix(view)?;
    if options.geometric {
        k += geo_stiff_matrix(view)?;
    }
    let mut k = modify_hinge(view, k)?;
    if options.plastic && view.element.phinge.iter().any(|h| *h) {
        k += plastic_matrix(view, &k, &options.material)?;
    }
    Ok(k)
}

/// Gather the element's global displacement entries from a 6N vector.
#[must_use]
pub fn gather(view: &ElementView, global: &[f64]) -> Vec12 {
    Vec12::from_fn(|k, _| global[view.global_dof(k)])
}

/// Incremental end forces for the global displacement increment `global_disp`.
///
/// The caller accumulates the result into [`Element::stress`](crate::Element::stress).
///
/// # Errors
///
/// Propagates element errors from building the tangent.
pub fn elem_stress(
    view: &ElementView,
    t: &Mat12,
    global_disp: &[f64],
    options: TangentOptions,
) -> Result<Vec12, ElementError> {
    let local = t * gather(view, global_disp);
    let k = tangent_matrix(view, options)?;
    Ok(k * local)
}

/// Subtract the member loads, rotated to global axes, from `rhs` at free dofs.
pub fn assem_cmq(view: &ElementView, t: &Mat12, rhs: &mut [f64]) {
    let cmq = Vec12::from_column_slice(&view.element.cmq);
    subtract_free(view, &(t.transpose() * cmq), rhs);
}

/// Subtract the current end forces, rotated to global axes, from `rhs` at free dofs.
pub fn modify_true_force(view: &ElementView, t: &Mat12, rhs: &mut [f64]) {
    let stress = Vec12::from_column_slice(&view.element.stress);
    subtract_free(view, &(t.transpose() * stress), rhs);
}

fn subtract_free(view: &ElementView, global: &Vec12, rhs: &mut [f64]) {
    for k in 0..12 {
        let node = view.nodes[k / 6];
        if !node.conf[k % 6] {
            rhs[view.global_dof(k)] -= global[k];
        }
    }
}
