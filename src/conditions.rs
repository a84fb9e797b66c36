use arclm::{point, Element, Frame, FrameEditError, NodeId, Section, YieldEnvelope};

/// Loads and member properties used for the portal frame demonstration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalProperties {
    /// Young's modulus in kN/m².
    pub young: f64,
    /// Column section: area, strong and weak inertia, torsional constant.
    pub column: [f64; 4],
    /// Beam section.
    pub beam: [f64; 4],
    /// Fully plastic bending moment of every member in kN·m.
    pub plastic_moment: f64,
    /// Horizontal load at each top corner in kN.
    pub lateral_load: f64,
    /// Vertical load at each top corner in kN.
    pub gravity_load: f64,
}

impl Default for PortalProperties {
    fn default() -> Self {
        Self {
            young: 2.05e8,
            column: [0.01, 8.33e-6, 8.33e-6, 1.67e-5],
            beam: [0.008, 1.2e-5, 4.0e-6, 1.0e-6],
            plastic_moment: 60.0,
            lateral_load: 15.0,
            gravity_load: -40.0,
        }
    }
}

/// Nodes of the portal that the report looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalNodes {
    /// Column bases.
    pub bases: [NodeId; 2],
    /// Beam-column joints.
    pub corners: [NodeId; 2],
}

/// Build a single-bay portal: two 4 m columns and an 8 m beam, clamped at the
/// bases and loaded sideways and downwards at the corners.
pub fn build_portal(properties: &PortalProperties) -> Result<(Frame, PortalNodes), FrameEditError> {
    let mut frame = Frame::new();
    let mp = properties.plastic_moment;
    let envelope = |area: f64| {
        // Axial and shear capacities well above the demonstration loads.
        YieldEnvelope::symmetric([2.0e5 * area, 500.0, 500.0, mp, mp, mp])
    };
    let column = frame.add_section(
        Section::new(1, properties.young, 0.3, properties.column)
            .with_envelope(envelope(properties.column[0]), 1.5, 1.5),
    );
    let beam = frame.add_section(
        Section::new(2, properties.young, 0.3, properties.beam)
            .with_envelope(envelope(properties.beam[0]), 1.5, 1.5),
    );

    let left_base = frame.add_node(101, point(0.0, 0.0, 0.0));
    let right_base = frame.add_node(102, point(8.0, 0.0, 0.0));
    let left_top = frame.add_node(201, point(0.0, 0.0, 4.0));
    let right_top = frame.add_node(202, point(8.0, 0.0, 4.0));

    for base in [left_base, right_base] {
        frame.set_conf(base, [true; 6])?;
    }
    let corner_load = [
        properties.lateral_load,
        0.0,
        properties.gravity_load,
        0.0,
        0.0,
        0.0,
    ];
    for corner in [left_top, right_top] {
        frame.set_load(corner, corner_load)?;
    }

    frame.add_element(Element::new(1, column, [left_base, left_top]))?;
    frame.add_element(Element::new(2, column, [right_base, right_top]))?;
    frame.add_element(Element::new(3, beam, [left_top, right_top]))?;

    Ok((
        frame,
        PortalNodes {
            bases: [left_base, right_base],
            corners: [left_top, right_top],
        },
    ))
}
