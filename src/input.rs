//! Whitespace separated text description of a frame.
//!
//! The input is split into blocks by the header lines `SECTIONS`, `NODES`,
//! `CONDITIONS` and `ELEMENTS`; blocks may come in any order and repeat.
//! Everything after `#` on a line is ignored, as are fields beyond the ones
//! listed below.
//!
//! ```text
//! SECTIONS    num E ν A Ix Iy J y0 … y11 [type]
//! NODES       num x y z
//! CONDITIONS  num c0 … c5 F0 … F5
//! ELEMENTS    num sec n0 n1 cang b3 b4 b5 b9 b10 b11 [cmq0 … cmq11]
//! ```
//!
//! `y0 … y11` are the yield envelope as `(max, min)` pairs of
//! `N, Qx, Qy, Mz, Mx, My`. Condition flags are `0` (free) or non-zero
//! (restrained). Bond codes follow [`Bond::from_code`]; any other code names
//! a section whose strong and weak inertia are read as spring stiffnesses.
//!
//! ```
//! use arclm::read_frame;
//!
//! let frame = read_frame(
//!     "SECTIONS\n\
//!      1 2.05e8 0.3 0.01 8.33e-6 8.33e-6 1.67e-5 0 0 0 0 0 0 0 0 0 0 0 0\n\
//!      NODES\n\
//!      1 0 0 0\n\
//!      2 3 0 0\n\
//!      ELEMENTS\n\
//!      1 1 1 2 0 0 0 0 0 0 0\n",
//! )
//! .unwrap();
//! assert_eq!(frame.element_count(), 1);
//! ```

use std::collections::HashSet;
use std::str::{FromStr, SplitWhitespace};

use crate::bond::Bond;
use crate::element::Element;
use crate::errors::InputError;
use crate::frame::Frame;
use crate::geometry::point;
use crate::node::NodeId;
use crate::section::{Section, YieldEnvelope};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Block {
    Sections,
    Nodes,
    Conditions,
    Elements,
}

impl Block {
    fn from_header(line: &str) -> Option<Self> {
        match line.to_ascii_uppercase().as_str() {
            "SECTIONS" => Some(Self::Sections),
            "NODES" => Some(Self::Nodes),
            "CONDITIONS" => Some(Self::Conditions),
            "ELEMENTS" => Some(Self::Elements),
            _ => None,
        }
    }
}

/// Tokens of one record with the line number for error reporting.
struct Fields<'a> {
    line: usize,
    tokens: SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(line: usize, text: &'a str) -> Self {
        Self {
            line,
            tokens: text.split_whitespace(),
        }
    }

    fn next<T: FromStr>(&mut self, field: &'static str) -> Result<T, InputError> {
        let token = self.tokens.next().ok_or(InputError::MissingField {
            line: self.line,
            field,
        })?;
        self.parse(field, token)
    }

    fn optional<T: FromStr>(&mut self, field: &'static str) -> Result<Option<T>, InputError> {
        self.tokens.next().map(|token| self.parse(field, token)).transpose()
    }

    fn parse<T: FromStr>(&self, field: &'static str, token: &str) -> Result<T, InputError> {
        token.parse().map_err(|_| InputError::Parse {
            line: self.line,
            field,
            token: token.to_string(),
        })
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[f64; N], InputError> {
        let mut values = [0.0; N];
        for value in &mut values {
            *value = self.next(field)?;
        }
        Ok(values)
    }
}

struct NodeRecord {
    num: i64,
    coord: [f64; 3],
}

struct ConditionRecord {
    line: usize,
    num: i64,
    conf: [bool; 6],
    force: [f64; 6],
}

struct ElementRecord {
    line: usize,
    num: i64,
    section: i64,
    enod: [i64; 2],
    cang: f64,
    bonds: [i64; 6],
    cmq: [f64; 12],
}

#[derive(Default)]
struct Records {
    sections: Vec<Section>,
    nodes: Vec<NodeRecord>,
    conditions: Vec<ConditionRecord>,
    elements: Vec<ElementRecord>,
}

/// Parse a frame from text.
///
/// Numbers in element and condition lines refer to section and node numbers
/// anywhere in the input, not only to earlier lines.
///
/// # Errors
///
/// Returns an [`InputError`] naming the line of a malformed record, an
/// unknown section or node reference, or a repeated number.
pub fn read_frame(text: &str) -> Result<Frame, InputError> {
    let records = parse(text)?;
    build(records)
}

fn parse(text: &str) -> Result<Records, InputError> {
    let mut records = Records::default();
    let mut block = None;
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        if let Some(header) = Block::from_header(content) {
            block = Some(header);
            continue;
        }
        let mut fields = Fields::new(line, content);
        match block.ok_or(InputError::Orphan { line })? {
            Block::Sections => records.sections.push(section(&mut fields)?),
            Block::Nodes => records.nodes.push(NodeRecord {
                num: fields.next("node number")?,
                coord: fields.array("coordinate")?,
            }),
            Block::Conditions => {
                let num = fields.next("node number")?;
                let mut conf = [false; 6];
                for flag in &mut conf {
                    *flag = fields.next::<i64>("restraint flag")? != 0;
                }
                records.conditions.push(ConditionRecord {
                    line,
                    num,
                    conf,
                    force: fields.array("nodal force")?,
                });
            }
            Block::Elements => records.elements.push(element(&mut fields)?),
        }
    }
    Ok(records)
}

fn section(fields: &mut Fields) -> Result<Section, InputError> {
    let num = fields.next("section number")?;
    let young = fields.next("young modulus")?;
    let poisson = fields.next("poisson ratio")?;
    let value = fields.array("section property")?;
    let envelope = YieldEnvelope(fields.array("yield value")?);
    let mut section = Section::new(num, young, poisson, value);
    section.envelope = envelope;
    if let Some(kind) = fields.optional("section type")? {
        section.kind = kind;
    }
    Ok(section)
}

fn element(fields: &mut Fields) -> Result<ElementRecord, InputError> {
    let line = fields.line;
    let num = fields.next("element number")?;
    let section = fields.next("section number")?;
    let enod = [fields.next("node number")?, fields.next("node number")?];
    let cang = fields.next("cang")?;
    let mut bonds = [0; 6];
    for bond in &mut bonds {
        *bond = fields.next("bond code")?;
    }
    let mut cmq = [0.0; 12];
    if let Some(first) = fields.optional("member load")? {
        cmq[0] = first;
        for value in &mut cmq[1..] {
            *value = fields.next("member load")?;
        }
    }
    Ok(ElementRecord {
        line,
        num,
        section,
        enod,
        cang,
        bonds,
        cmq,
    })
}

fn unique(seen: &mut HashSet<i64>, kind: &'static str, number: i64) -> Result<(), InputError> {
    if seen.insert(number) {
        Ok(())
    } else {
        Err(InputError::DuplicateNumber { kind, number })
    }
}

fn build(records: Records) -> Result<Frame, InputError> {
    let mut frame = Frame::new();

    let mut seen = HashSet::new();
    for section in records.sections {
        unique(&mut seen, "section", section.num)?;
        frame.add_section(section);
    }

    let mut seen = HashSet::new();
    for node in &records.nodes {
        unique(&mut seen, "node", node.num)?;
        let [x, y, z] = node.coord;
        frame.add_node(node.num, point(x, y, z));
    }

    for condition in &records.conditions {
        let id = frame.find_node(condition.num).ok_or(InputError::UnknownNode {
            element: 0,
            node: condition.num,
        })?;
        let rejected = |source| InputError::Rejected {
            line: condition.line,
            source,
        };
        frame.set_conf(id, condition.conf).map_err(rejected)?;
        frame.set_load(id, condition.force).map_err(rejected)?;
    }

    let mut seen = HashSet::new();
    for record in &records.elements {
        unique(&mut seen, "element", record.num)?;
        let section = frame.find_section(record.section).ok_or(InputError::UnknownSection {
            element: record.num,
            section: record.section,
        })?;
        let mut enod = [NodeId(0); 2];
        for (id, num) in enod.iter_mut().zip(record.enod) {
            *id = frame.find_node(num).ok_or(InputError::UnknownNode {
                element: record.num,
                node: num,
            })?;
        }
        let bonds = element_bonds(&frame, record)?;
        let element = Element::new(record.num, section, enod)
            .with_cang(record.cang)
            .with_bonds(bonds)
            .with_cmq(record.cmq);
        frame.add_element(element).map_err(|source| InputError::Rejected {
            line: record.line,
            source,
        })?;
    }
    Ok(frame)
}

/// Bond slots given in the element line: the three moments at each end.
const BOND_SLOTS: [usize; 6] = [3, 4, 5, 9, 10, 11];

fn element_bonds(frame: &Frame, record: &ElementRecord) -> Result<[Bond; 12], InputError> {
    let mut bonds = [Bond::Rigid; 12];
    for (slot, code) in BOND_SLOTS.iter().zip(record.bonds) {
        bonds[*slot] = match code {
            0 | 1 | -1 | -2 | -3 => Bond::from_code(code, 0.0, 0.0),
            _ => {
                let spring = frame
                    .find_section(code)
                    .and_then(|id| frame.section(id))
                    .ok_or(InputError::UnknownSection {
                        element: record.num,
                        section: code,
                    })?;
                Bond::from_code(code, spring.ix(), spring.iy())
            }
        };
    }
    Ok(bonds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admissibility::Admissibility;
    use crate::errors::FrameEditError;
    use crate::element::ElementId;
    use approx::assert_relative_eq;

    const PORTAL: &str = "\
# two columns and a beam
SECTIONS
1 2.05e8 0.3 0.01 8.33e-6 8.33e-6 1.67e-5  100 -100 10 -10 10 -10 5 -5 20 -20 20 -20
2 2.05e8 0.3 0.02 2e-5 1e-5 3e-5  200 -200 20 -20 20 -20 10 -10 40 -40 30 -30  2
50 0 0 0 1500 700 0  0 0 0 0 0 0 0 0 0 0 0 0
NODES
1 0 0 0
2 0 0 3
3 6 0 3
4 6 0 0 ground
CONDITIONS
1 1 1 1 1 1 1  0 0 0 0 0 0
4 1 1 1 1 1 1  0 0 0 0 0 0
2 0 0 0 0 0 0  10 0 0 0 0 0   # wind
ELEMENTS
1 1 1 2 0  0 0 0 0 0 0
2 2 2 3 0.5  0 1 0 50 0 0  0 0 -30 0 45 0 0 0 -30 0 -45 0
3 1 4 3 0  0 0 0 0 0 0
";

    #[test]
    fn reads_portal_frame() {
        let frame = read_frame(PORTAL).expect("valid input");
        assert_eq!(frame.sections().len(), 3);
        assert_eq!(frame.node_count(), 4);
        assert_eq!(frame.element_count(), 3);

        let beam_section = frame
            .section(frame.find_section(2).expect("declared"))
            .expect("declared");
        assert_eq!(beam_section.kind, 2);
        assert_eq!(beam_section.envelope.unit(4), 40.0);

        let base = frame.node(NodeId(0)).expect("declared");
        assert_eq!(base.conf, [true; 6]);
        let top = frame.node(NodeId(1)).expect("declared");
        assert_eq!(top.force[0], 10.0);
        assert_eq!(top.conf, [false; 6]);
    }

    #[test]
    fn reads_bonds_springs_and_member_loads() {
        let frame = read_frame(PORTAL).expect("valid input");
        let beam = frame.element(ElementId(1)).expect("declared");
        assert_relative_eq!(beam.cang, 0.5);
        assert_eq!(beam.bonds[4], Bond::Released);
        assert_eq!(
            beam.bonds[9],
            Bond::Spring {
                k_strong: 1500.0,
                k_weak: 700.0
            }
        );
        assert_eq!(beam.bonds[0], Bond::Rigid);
        assert_eq!(beam.cmq[2], -30.0);
        assert_eq!(beam.cmq[10], -45.0);
        assert!(matches!(beam.check, Admissibility::Always));

        let column = frame.element(ElementId(2)).expect("declared");
        assert_eq!(column.enod, [NodeId(3), NodeId(2)]);
        assert_eq!(column.cmq, [0.0; 12]);
    }

    #[test]
    fn malformed_number_names_line_and_field() {
        let error = read_frame("NODES\n1 0 zero 0\n").expect_err("bad coordinate");
        assert_eq!(
            error,
            InputError::Parse {
                line: 2,
                field: "coordinate",
                token: "zero".to_string()
            }
        );
    }

    #[test]
    fn short_line_is_missing_a_field() {
        let error = read_frame("NODES\n1 0 0\n").expect_err("short line");
        assert_eq!(
            error,
            InputError::MissingField {
                line: 2,
                field: "coordinate"
            }
        );
    }

    #[test]
    fn partial_member_loads_are_rejected() {
        let text = "SECTIONS\n1 1 0.3 1 1 1 1 0 0 0 0 0 0 0 0 0 0 0 0\nNODES\n1 0 0 0\n2 1 0 0\n\
                    ELEMENTS\n1 1 1 2 0 0 0 0 0 0 0 1 2 3\n";
        assert!(matches!(
            read_frame(text),
            Err(InputError::MissingField {
                line: 7,
                field: "member load"
            })
        ));
    }

    #[test]
    fn references_are_checked() {
        let section = "SECTIONS\n1 1 0.3 1 1 1 1 0 0 0 0 0 0 0 0 0 0 0 0\n";
        let nodes = "NODES\n1 0 0 0\n2 1 0 0\n";

        let text = format!("{section}{nodes}ELEMENTS\n1 7 1 2 0 0 0 0 0 0 0\n");
        assert_eq!(
            read_frame(&text).expect_err("unknown section"),
            InputError::UnknownSection {
                element: 1,
                section: 7
            }
        );

        let text = format!("{section}{nodes}ELEMENTS\n1 1 1 9 0 0 0 0 0 0 0\n");
        assert_eq!(
            read_frame(&text).expect_err("unknown node"),
            InputError::UnknownNode { element: 1, node: 9 }
        );

        let text = format!("{section}{nodes}ELEMENTS\n1 1 1 2 0 0 33 0 0 0 0\n");
        assert_eq!(
            read_frame(&text).expect_err("unknown spring section"),
            InputError::UnknownSection {
                element: 1,
                section: 33
            }
        );

        let text = format!("{section}{nodes}CONDITIONS\n5 1 1 1 1 1 1 0 0 0 0 0 0\n");
        assert_eq!(
            read_frame(&text).expect_err("unknown node"),
            InputError::UnknownNode { element: 0, node: 5 }
        );
    }

    #[test]
    fn duplicates_and_degenerate_elements_are_rejected() {
        assert_eq!(
            read_frame("NODES\n1 0 0 0\n1 1 0 0\n").expect_err("duplicate node"),
            InputError::DuplicateNumber {
                kind: "node",
                number: 1
            }
        );
        let text = "SECTIONS\n1 1 0.3 1 1 1 1 0 0 0 0 0 0 0 0 0 0 0 0\nNODES\n1 0 0 0\n\
                    ELEMENTS\n4 1 1 1 0 0 0 0 0 0 0\n";
        assert_eq!(
            read_frame(text).expect_err("same ends"),
            InputError::Rejected {
                line: 6,
                source: FrameEditError::SameEnds {
                    element: 4,
                    node: NodeId(0)
                }
            }
        );
    }

    #[test]
    fn records_need_a_block() {
        assert_eq!(
            read_frame("\n# header follows\n1 0 0 0\n").expect_err("no header"),
            InputError::Orphan { line: 3 }
        );
    }

    #[test]
    fn blocks_may_come_in_any_order() {
        let text = "ELEMENTS\n1 1 1 2 0 0 0 0 0 0 0\nnodes\n1 0 0 0\n2 1 0 0\n\
                    SECTIONS\n1 1 0.3 1 1 1 1 0 0 0 0 0 0 0 0 0 0 0 0\n";
        let frame = read_frame(text).expect("valid input");
        assert_eq!(frame.element_count(), 1);
    }
}
