//! Arena holding the sections, nodes and elements of a structure.

use std::collections::{BTreeMap, VecDeque};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;

use crate::admissibility::CheckOutcome;
use crate::bond::Bond;
use crate::element::{Element, ElementId, ElementView};
use crate::errors::{ElementError, FrameEditError};
use crate::geometry::{Point, Vec12};
use crate::node::{Node, NodeId};
use crate::section::{Section, SectionId};
use crate::stiffness::{elem_stress, gather, geo_stiff_matrix, modify_cmq, TangentOptions};

/// A space frame: sections, nodes and the elements joining them.
///
/// Elements refer to their section and end nodes by id, so the frame owns
/// every entity and lookups are plain indexing.
#[derive(Debug, Default)]
pub struct Frame {
    /// Section table.
    sections: Vec<Section>,
    /// Nodes in index order.
    nodes: Vec<Node>,
    /// Elements in declaration order.
    elements: Vec<Element>,
}

/// Mutable response of a frame, captured so a lap can be rolled back.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameState {
    disp: Vec<[f64; 6]>,
    reaction: Vec<[f64; 6]>,
    stress: Vec<[f64; 12]>,
    energy: Vec<(f64, f64)>,
    bonds: Vec<[Bond; 12]>,
    phinge: Vec<[bool; 2]>,
    valid: Vec<bool>,
}

impl Frame {
    /// Create an empty frame.
    ///
    /// # Examples
    /// ```
    /// use arclm::Frame;
    ///
    /// let frame = Frame::new();
    /// assert_eq!(frame.node_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Size of the unreduced system, six per node.
    #[must_use]
    pub fn dof_count(&self) -> usize {
        6 * self.nodes.len()
    }

    /// Add a section.
    pub fn add_section(&mut self, section: Section) -> SectionId {
        self.sections.push(section);
        SectionId(self.sections.len() - 1)
    }

    /// Add a free, unloaded node.
    ///
    /// # Examples
    /// ```
    /// use arclm::{point, Frame};
    ///
    /// let mut frame = Frame::new();
    /// let node = frame.add_node(101, point(0.0, 0.0, 3.5));
    /// assert_eq!(node.0, 0);
    /// assert_eq!(frame.node_count(), 1);
    /// ```
    pub fn add_node(&mut self, num: i64, coord: Point) -> NodeId {
        self.nodes.push(Node::new(num, coord));
        NodeId(self.nodes.len() - 1)
    }

    /// Add an element.
    ///
    /// # Errors
    ///
    /// Returns [`FrameEditError::UnknownSection`] or [`FrameEditError::UnknownNode`]
    /// when the element refers to entities outside this frame, and
    /// [`FrameEditError::SameEnds`] when both ends are one node.
    pub fn add_element(&mut self, element: Element) -> Result<ElementId, FrameEditError> {
        if element.section.0 >= self.sections.len() {
            return Err(FrameEditError::UnknownSection(element.section));
        }
        for node in element.enod {
            if node.0 >= self.nodes.len() {
                return Err(FrameEditError::UnknownNode(node));
            }
        }
        if element.enod[0] == element.enod[1] {
            return Err(FrameEditError::SameEnds {
                element: element.num,
                node: element.enod[0],
            });
        }
        self.elements.push(element);
        Ok(ElementId(self.elements.len() - 1))
    }

    /// Set the restraint flags of a node.
    ///
    /// # Errors
    ///
    /// Returns [`FrameEditError::UnknownNode`] when `node` is not part of this frame.
    pub fn set_conf(&mut self, node: NodeId, conf: [bool; 6]) -> Result<(), FrameEditError> {
        let target = self
            .nodes
            .get_mut(node.0)
            .ok_or(FrameEditError::UnknownNode(node))?;
        target.conf = conf;
        Ok(())
    }

    /// Set the external load of a node.
    ///
    /// # Errors
    ///
    /// Returns [`FrameEditError::UnknownNode`] when `node` is not part of this frame.
    pub fn set_load(&mut self, node: NodeId, force: [f64; 6]) -> Result<(), FrameEditError> {
        let target = self
            .nodes
            .get_mut(node.0)
            .ok_or(FrameEditError::UnknownNode(node))?;
        target.force = force;
        Ok(())
    }

    /// Replace the end bonds of an element.
    ///
    /// # Errors
    ///
    /// Returns [`FrameEditError::UnknownElement`] when `element` is not part of this frame.
    pub fn set_bonds(
        &mut self,
        element: ElementId,
        bonds: [Bond; 12],
    ) -> Result<(), FrameEditError> {
        let target = self
            .elements
            .get_mut(element.0)
            .ok_or(FrameEditError::UnknownElement(element))?;
        target.set_bonds(bonds);
        Ok(())
    }

    /// All sections.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// All nodes in index order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All elements in declaration order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Look up a section.
    #[must_use]
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id.0)
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Look up a node for editing.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Look up an element.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    /// Look up an element for editing.
    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0)
    }

    /// Id of the section numbered `num`.
    #[must_use]
    pub fn find_section(&self, num: i64) -> Option<SectionId> {
        self.sections.iter().position(|s| s.num == num).map(SectionId)
    }

    /// Id of the node numbered `num`.
    #[must_use]
    pub fn find_node(&self, num: i64) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.num == num).map(NodeId)
    }

    /// Id of the element numbered `num`.
    #[must_use]
    pub fn find_element(&self, num: i64) -> Option<ElementId> {
        self.elements.iter().position(|e| e.num == num).map(ElementId)
    }

    /// Element together with its section and end nodes.
    ///
    /// # Panics
    ///
    /// Panics when `id` is not an element of this frame.
    #[must_use]
    pub fn view(&self, id: ElementId) -> ElementView<'_> {
        Self::view_of(&self.sections, &self.nodes, &self.elements[id.0])
    }

    /// Views of all elements in declaration order.
    pub fn views(&self) -> impl Iterator<Item = (ElementId, ElementView<'_>)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (ElementId(i), Self::view_of(&self.sections, &self.nodes, e)))
    }

    fn view_of<'a>(
        sections: &'a [Section],
        nodes: &'a [Node],
        element: &'a Element,
    ) -> ElementView<'a> {
        ElementView {
            element,
            section: &sections[element.section.0],
            nodes: [&nodes[element.enod[0].0], &nodes[element.enod[1].0]],
        }
    }

    /// External loads gathered into a vector of length `6N`.
    #[must_use]
    pub fn load_vector(&self) -> Vec<f64> {
        self.nodes.iter().flat_map(|n| n.force).collect()
    }

    /// Restraint flags gathered into a mask of length `6N`.
    #[must_use]
    pub fn conf_mask(&self) -> Vec<bool> {
        self.nodes.iter().flat_map(|n| n.conf).collect()
    }

    /// Displacements gathered into a vector of length `6N`.
    #[must_use]
    pub fn displacement_vector(&self) -> Vec<f64> {
        self.nodes.iter().flat_map(|n| n.disp).collect()
    }

    /// Largest absolute translational displacement.
    #[must_use]
    pub fn max_displacement(&self) -> f64 {
        self.nodes
            .iter()
            .flat_map(|n| n.disp[..3].iter().copied())
            .fold(0.0, |acc: f64, v| acc.max(v.abs()))
    }

    /// Bring the frame back to the undeformed input state.
    ///
    /// Node response is cleared, element bonds and validity are restored,
    /// member loads are adjusted for end releases and copied into the end
    /// forces, and the cached principal axes are recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`ElementError::ZeroLength`] for an element whose ends coincide.
    pub fn reset(&mut self) -> Result<(), ElementError> {
        for node in &mut self.nodes {
            node.reset();
        }
        for element in &mut self.elements {
            element.reset();
        }
        let lengths: Vec<f64> = self.views().map(|(_, v)| v.length0()).collect();
        for (element, length) in self.elements.iter_mut().zip(lengths) {
            if length == 0.0 {
                return Err(ElementError::ZeroLength {
                    element: element.num,
                });
            }
            let bonds = element.bonds;
            modify_cmq(&bonds, length, &mut element.cmq);
            modify_cmq(&bonds, length, &mut element.stress);
        }
        self.update_axes()
    }

    /// Recompute the cached principal axes of every element.
    ///
    /// # Errors
    ///
    /// Returns [`ElementError::ZeroLength`] for an element whose ends coincide.
    pub fn update_axes(&mut self) -> Result<(), ElementError> {
        let axes = self
            .views()
            .map(|(_, v)| v.principal_axis(v.element.cang))
            .collect::<Result<Vec<_>, _>>()?;
        for (element, (strong, weak)) in self.elements.iter_mut().zip(axes) {
            element.strong = strong;
            element.weak = weak;
        }
        Ok(())
    }

    /// Apply a global displacement increment.
    ///
    /// End forces and energies of every valid element grow by the response
    /// of its tangent to the increment, evaluated on the geometry before the
    /// increment. Node displacements are then advanced and reactions
    /// recomputed as `Σ Tᵀ·stress − factor · loads` at restrained degrees of
    /// freedom.
    ///
    /// # Errors
    ///
    /// Propagates element errors from building the tangents.
    pub fn apply_increment(
        &mut self,
        du: &[f64],
        loads: &[f64],
        factor: f64,
        options: TangentOptions,
    ) -> Result<(), ElementError> {
        let mut updates = Vec::with_capacity(self.elements.len());
        for (id, view) in self.views() {
            if !view.element.is_valid {
                continue;
            }
            let t = view.trans_matrix()?;
            let dl = t * gather(&view, du);
            let ds = elem_stress(&view, &t, du, options)?;
            let energyb = if options.geometric {
                0.5 * dl.dot(&(geo_stiff_matrix(&view)? * dl))
            } else {
                0.0
            };
            updates.push((id, t, dl, ds, energyb));
        }

        let mut totals = vec![0.0; self.dof_count()];
        for (id, t, dl, ds, energyb) in updates {
            let element = &mut self.elements[id.0];
            let old = Vec12::from_column_slice(&element.stress);
            let new = old + ds;
            element.energy += 0.5 * (old + new).dot(&dl);
            element.energyb += energyb;
            element.stress.copy_from_slice(new.as_slice());
            let global = t.transpose() * new;
            for k in 0..12 {
                totals[element.enod[k / 6].dof(k % 6)] += global[k];
            }
        }

        for (index, node) in self.nodes.iter_mut().enumerate() {
            for d in 0..6 {
                node.disp[d] += du[6 * index + d];
                node.reaction[d] = if node.conf[d] {
                    totals[6 * index + d] - factor * loads[6 * index + d]
                } else {
                    0.0
                };
            }
        }
        Ok(())
    }

    /// Run every element's admissibility rule, returning the elements that changed.
    pub fn check_admissibility(&mut self) -> Vec<(ElementId, CheckOutcome)> {
        let lengths: Vec<(f64, f64)> = self
            .views()
            .map(|(_, v)| (v.length(), v.length0()))
            .collect();
        let mut changes = Vec::new();
        for (index, (element, (length, length0))) in
            self.elements.iter_mut().zip(lengths).enumerate()
        {
            let outcome = element.apply_check(length, length0);
            if outcome != CheckOutcome::AsIs {
                changes.push((ElementId(index), outcome));
            }
        }
        changes
    }

    /// Validity flag of every element.
    #[must_use]
    pub fn validity(&self) -> Vec<bool> {
        self.elements.iter().map(|e| e.is_valid).collect()
    }

    /// Delete the elements flagged invalid in `validity`.
    pub fn restore_validity(&mut self, validity: &[bool]) {
        for (element, valid) in self.elements.iter_mut().zip(validity) {
            if !valid {
                element.delete();
            }
        }
    }

    /// Capture the mutable response so it can be restored later.
    #[must_use]
    pub fn snapshot(&self) -> FrameState {
        FrameState {
            disp: self.nodes.iter().map(|n| n.disp).collect(),
            reaction: self.nodes.iter().map(|n| n.reaction).collect(),
            stress: self.elements.iter().map(|e| e.stress).collect(),
            energy: self.elements.iter().map(|e| (e.energy, e.energyb)).collect(),
            bonds: self.elements.iter().map(|e| e.bonds).collect(),
            phinge: self.elements.iter().map(|e| e.phinge).collect(),
            valid: self.elements.iter().map(|e| e.is_valid).collect(),
        }
    }

    /// Restore a response captured by [`Frame::snapshot`].
    pub fn restore(&mut self, state: &FrameState) {
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.disp = state.disp[i];
            node.reaction = state.reaction[i];
        }
        for (i, element) in self.elements.iter_mut().enumerate() {
            element.stress = state.stress[i];
            (element.energy, element.energyb) = state.energy[i];
            element.bonds = state.bonds[i];
            element.phinge = state.phinge[i];
            element.is_valid = state.valid[i];
        }
    }

    /// Node connectivity graph; graph node `i` is `NodeId(i)`, edges are elements.
    #[must_use]
    pub fn connectivity(&self) -> UnGraph<NodeId, ElementId> {
        let mut graph = UnGraph::with_capacity(self.nodes.len(), self.elements.len());
        for index in 0..self.nodes.len() {
            graph.add_node(NodeId(index));
        }
        for (index, element) in self.elements.iter().enumerate() {
            graph.add_edge(
                NodeIndex::new(element.enod[0].0),
                NodeIndex::new(element.enod[1].0),
                ElementId(index),
            );
        }
        graph
    }

    /// Reverse Cuthill–McKee ordering of the nodes.
    ///
    /// Numbering equations in this order keeps the profile of the stiffness
    /// matrix narrow, which limits fill-in during LDLᵀ factorisation.
    #[must_use]
    pub fn pivot_order(&self) -> Vec<NodeId> {
        let graph = self.connectivity();
        let n = graph.node_count();
        let degree: Vec<usize> = (0..n)
            .map(|i| graph.neighbors(NodeIndex::new(i)).count())
            .collect();
        let mut starts: Vec<usize> = (0..n).collect();
        starts.sort_by_key(|i| (degree[*i], *i));

        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let mut queue = VecDeque::new();
        for start in starts {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            queue.push_back(start);
            while let Some(v) = queue.pop_front() {
                order.push(NodeId(v));
                let mut next: Vec<usize> = graph
                    .neighbors(NodeIndex::new(v))
                    .map(|w| w.index())
                    .filter(|w| !visited[*w])
                    .collect();
                next.sort_by_key(|w| (degree[*w], *w));
                next.dedup();
                for w in next {
                    visited[w] = true;
                    queue.push_back(w);
                }
            }
        }
        order.reverse();
        order
    }

    /// Connected groups of nodes without a single restrained degree of freedom.
    ///
    /// Each such group can move as a rigid body, so the stiffness is singular.
    #[must_use]
    pub fn unsupported_islands(&self) -> Vec<Vec<NodeId>> {
        let mut sets = UnionFind::<usize>::new(self.nodes.len());
        for element in &self.elements {
            sets.union(element.enod[0].0, element.enod[1].0);
        }
        let mut groups: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        for index in 0..self.nodes.len() {
            groups.entry(sets.find(index)).or_default().push(NodeId(index));
        }
        groups
            .into_values()
            .filter(|group| group.iter().all(|id| self.nodes[id.0].confined_count() == 0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point;
    use approx::assert_relative_eq;

    fn section() -> Section {
        Section::new(1, 2.05e8, 0.3, [0.01, 8.33e-6, 8.33e-6, 1.67e-5])
    }

    fn chain(count: usize) -> Frame {
        let mut frame = Frame::new();
        let s = frame.add_section(section());
        let nodes: Vec<NodeId> = (0..count)
            .map(|i| frame.add_node(i as i64 + 1, point(i as f64, 0.0, 0.0)))
            .collect();
        for pair in nodes.windows(2) {
            let num = frame.element_count() as i64 + 1;
            frame
                .add_element(Element::new(num, s, [pair[0], pair[1]]))
                .expect("valid element");
        }
        frame
    }

    #[test]
    fn editing_rejects_foreign_ids() {
        let mut frame = chain(2);
        assert_eq!(
            frame.set_conf(NodeId(5), [true; 6]),
            Err(FrameEditError::UnknownNode(NodeId(5)))
        );
        assert_eq!(
            frame.add_element(Element::new(9, SectionId(3), [NodeId(0), NodeId(1)])),
            Err(FrameEditError::UnknownSection(SectionId(3)))
        );
        assert_eq!(
            frame.add_element(Element::new(9, SectionId(0), [NodeId(1), NodeId(1)])),
            Err(FrameEditError::SameEnds {
                element: 9,
                node: NodeId(1)
            })
        );
        assert_eq!(
            frame.set_bonds(ElementId(4), [Bond::Rigid; 12]),
            Err(FrameEditError::UnknownElement(ElementId(4)))
        );
    }

    #[test]
    fn lookup_by_number() {
        let frame = chain(3);
        assert_eq!(frame.find_node(3), Some(NodeId(2)));
        assert_eq!(frame.find_element(2), Some(ElementId(1)));
        assert_eq!(frame.find_section(1), Some(SectionId(0)));
        assert_eq!(frame.find_node(42), None);
    }

    #[test]
    fn undeformed_length_matches_current_length() {
        let frame = chain(2);
        let view = frame.view(ElementId(0));
        assert_relative_eq!(view.length0(), 1.0);
        assert_relative_eq!(view.length(), view.length0());
    }

    #[test]
    fn reset_adjusts_member_loads_for_releases() {
        let mut frame = chain(2);
        let mut bonds = [Bond::Rigid; 12];
        bonds[4] = Bond::Released;
        frame.set_bonds(ElementId(0), bonds).expect("element exists");
        let element = frame.element_mut(ElementId(0)).expect("element exists");
        element.cmq[4] = 2.0;
        frame.reset().expect("valid geometry");
        let element = frame.element(ElementId(0)).expect("element exists");
        assert_eq!(element.cmq[4], 0.0);
        assert_relative_eq!(element.cmq[10], -1.0);
        assert_eq!(element.stress, element.cmq);
        assert_relative_eq!(element.strong[1].abs(), 1.0);
    }

    #[test]
    fn snapshot_restores_response() {
        let mut frame = chain(2);
        frame.reset().expect("valid geometry");
        let before = frame.snapshot();
        frame.node_mut(NodeId(1)).expect("node exists").disp[2] = 0.5;
        frame.element_mut(ElementId(0)).expect("element exists").yield_at(0, 4);
        frame.restore(&before);
        assert_eq!(frame.snapshot(), before);
    }

    #[test]
    fn pivot_order_is_a_permutation() {
        let frame = chain(5);
        let mut order: Vec<usize> = frame.pivot_order().iter().map(|n| n.0).collect();
        assert_eq!(order.len(), 5);
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn pivot_order_keeps_chain_neighbours_adjacent() {
        let frame = chain(5);
        let order = frame.pivot_order();
        for pair in order.windows(2) {
            assert_eq!(pair[0].0.abs_diff(pair[1].0), 1);
        }
    }

    #[test]
    fn islands_without_support_are_reported() {
        let mut frame = chain(3);
        let s = SectionId(0);
        let a = frame.add_node(10, point(0.0, 5.0, 0.0));
        let b = frame.add_node(11, point(1.0, 5.0, 0.0));
        frame.add_element(Element::new(10, s, [a, b])).expect("valid element");
        frame.set_conf(NodeId(0), [true; 6]).expect("node exists");
        assert_eq!(frame.unsupported_islands(), vec![vec![a, b]]);
    }

    #[test]
    fn increment_moves_nodes_and_loads_elements() {
        let mut frame = chain(2);
        frame.set_conf(NodeId(0), [true; 6]).expect("node exists");
        frame.reset().expect("valid geometry");
        let mut du = vec![0.0; 12];
        du[6] = 1.0e-4;
        let loads = frame.load_vector();
        frame
            .apply_increment(&du, &loads, 1.0, TangentOptions::default())
            .expect("valid geometry");
        let element = frame.element(ElementId(0)).expect("element exists");
        let ea_over_l = 2.05e8 * 0.01;
        // Stretching gives tension, which is negative at the first end.
        assert_relative_eq!(element.stress[0], -ea_over_l * 1.0e-4, max_relative = 1e-12);
        assert_relative_eq!(element.energy, 0.5 * ea_over_l * 1.0e-8, max_relative = 1e-12);
        let support = frame.node(NodeId(0)).expect("node exists");
        assert_relative_eq!(support.reaction[0], -ea_over_l * 1.0e-4, max_relative = 1e-12);
        assert_eq!(frame.node(NodeId(1)).expect("node exists").disp[0], 1.0e-4);
    }
}
