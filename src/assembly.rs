//! Global assembly of element tangents and load vectors.

use crate::element::ElementView;
use crate::errors::ElementError;
use crate::frame::Frame;
use crate::node::NodeId;
use crate::sparse::CooMatrix;
use crate::stiffness::{
    assem_cmq, modify_true_force, tangent_matrix, transformation, TangentOptions,
};

/// Numbering of the free degrees of freedom.
///
/// Maps each of the `6N` global degrees of freedom to an equation of the
/// reduced system, or to nothing when the degree of freedom is restrained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DofMap {
    equation: Vec<Option<usize>>,
    dofs: Vec<usize>,
}

impl DofMap {
    /// Number free degrees of freedom in their global order.
    #[must_use]
    pub fn new(conf: &[bool]) -> Self {
        Self::numbered(conf, 0..conf.len())
    }

    /// Number free degrees of freedom node by node in `order`.
    ///
    /// Nodes missing from `order` are numbered last in index order.
    #[must_use]
    pub fn with_node_order(conf: &[bool], order: &[NodeId]) -> Self {
        let nodes = conf.len() / 6;
        let mut seen = vec![false; nodes];
        let mut sequence = Vec::with_capacity(conf.len());
        let remaining: Vec<NodeId> = (0..nodes).map(NodeId).collect();
        for node in order.iter().chain(&remaining) {
            if node.0 < nodes && !seen[node.0] {
                seen[node.0] = true;
                sequence.extend((0..6).map(|d| node.dof(d)));
            }
        }
        Self::numbered(conf, sequence)
    }

    fn numbered(conf: &[bool], sequence: impl IntoIterator<Item = usize>) -> Self {
        let mut equation = vec![None; conf.len()];
        let mut dofs = Vec::new();
        for dof in sequence {
            if !conf[dof] {
                equation[dof] = Some(dofs.len());
                dofs.push(dof);
            }
        }
        Self { equation, dofs }
    }

    /// Size of the reduced system.
    #[must_use]
    pub fn size(&self) -> usize {
        self.dofs.len()
    }

    /// Size of the unreduced system.
    #[must_use]
    pub fn full_size(&self) -> usize {
        self.equation.len()
    }

    /// Reduced equation of global degree of freedom `dof`.
    #[must_use]
    pub fn equation(&self, dof: usize) -> Option<usize> {
        self.equation.get(dof).copied().flatten()
    }

    /// Global degree of freedom of reduced equation `eq`.
    #[must_use]
    pub fn dof(&self, eq: usize) -> usize {
        self.dofs[eq]
    }

    /// Keep the free entries of a full vector.
    #[must_use]
    pub fn reduce(&self, full: &[f64]) -> Vec<f64> {
        self.dofs.iter().map(|d| full[*d]).collect()
    }

    /// Expand a reduced vector, with zeros at restrained degrees of freedom.
    #[must_use]
    pub fn restore(&self, reduced: &[f64]) -> Vec<f64> {
        let mut full = vec![0.0; self.full_size()];
        for (eq, dof) in self.dofs.iter().enumerate() {
            full[*dof] = reduced[eq];
        }
        full
    }
}

/// Assemble the tangent stiffness of every valid element into a full `6N`
/// symmetric builder, in element order.
///
/// Restrained degrees of freedom are dropped later, when the builder is
/// compressed through a [`DofMap`].
///
/// # Errors
///
/// Propagates element errors from building the tangents.
pub fn assemble(frame: &Frame, options: TangentOptions) -> Result<CooMatrix, ElementError> {
    let mut coo = CooMatrix::with_capacity(frame.dof_count(), 144 * frame.element_count());
    for (_, view) in frame.views() {
        if view.element.is_valid {
            add_element(&mut coo, &view, options)?;
        }
    }
    Ok(coo)
}

fn add_element(
    coo: &mut CooMatrix,
    view: &ElementView,
    options: TangentOptions,
) -> Result<(), ElementError> {
    let t = view.trans_matrix()?;
    let k = transformation(&tangent_matrix(view, options)?, &t);
    for a in 0..12 {
        let row = view.global_dof(a);
        for b in 0..12 {
            coo.push(row, view.global_dof(b), k[(a, b)]);
        }
    }
    Ok(())
}

/// Right-hand side `factor · (loads − Σ Tᵀ·cmq)` over `6N` degrees of freedom.
///
/// Member loads of valid elements enter at free degrees of freedom only when
/// `with_cmq` is set.
///
/// # Errors
///
/// Propagates element errors from building the transformations.
pub fn load_rhs(
    frame: &Frame,
    loads: &[f64],
    factor: f64,
    with_cmq: bool,
) -> Result<Vec<f64>, ElementError> {
    let mut rhs = loads.to_vec();
    if with_cmq {
        for (_, view) in frame.views() {
            if view.element.is_valid {
                assem_cmq(&view, &view.trans_matrix()?, &mut rhs);
            }
        }
    }
    rhs.iter_mut().for_each(|v| *v *= factor);
    Ok(rhs)
}

/// Out-of-balance force `factor · F − Σ Tᵀ·stress` at free degrees of freedom.
///
/// # Errors
///
/// Propagates element errors from building the transformations.
pub fn unbalanced_force(frame: &Frame, factor: f64) -> Result<Vec<f64>, ElementError> {
    let mut rhs: Vec<f64> = frame
        .nodes()
        .iter()
        .flat_map(|n| (0..6).map(move |d| if n.conf[d] { 0.0 } else { factor * n.force[d] }))
        .collect();
    for (_, view) in frame.views() {
        if view.element.is_valid {
            modify_true_force(&view, &view.trans_matrix()?, &mut rhs);
        }
    }
    Ok(rhs)
}
