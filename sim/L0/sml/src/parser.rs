//! SML declaration parser.
//!
//! Reads the generic document tree into [`SmlModel`]. Nothing here fails on
//! a per-entity basis: missing names, meshes or malformed numbers are carried
//! through as-is and reported by the builders.

use crate::document::{Element, parse_document};
use crate::error::Result;
use crate::types::{SmlDof, SmlEndpoint, SmlJoint, SmlModel, SmlOffset, SmlRigid};

/// Parse an SML string into its declarations.
///
/// # Errors
///
/// Returns an error only if the XML itself is malformed or empty.
pub fn parse_sml_str(xml: &str) -> Result<SmlModel> {
    let root = parse_document(xml)?;
    Ok(model_from_element(&root))
}

/// Read declarations from an already parsed root element.
///
/// `<rigid>`, `<joint>` and `<dof>` are collected from anywhere below their
/// parent, in document order.
pub fn model_from_element(root: &Element) -> SmlModel {
    SmlModel {
        name: root.attr("name").map(str::to_string),
        units: root.child("units").map(|u| u.attributes.clone()),
        rigids: root
            .descendants_named("rigid")
            .into_iter()
            .map(parse_rigid)
            .collect(),
        joints: root
            .descendants_named("joint")
            .into_iter()
            .map(parse_joint)
            .collect(),
    }
}

fn parse_rigid(e: &Element) -> SmlRigid {
    SmlRigid {
        name: e.attr("name").map(str::to_string),
        mesh: child_text(e, "mesh"),
        density: child_text(e, "density"),
        mass: child_text(e, "mass"),
        inertia: child_text(e, "inertia"),
        position: child_text(e, "position"),
    }
}

fn parse_joint(e: &Element) -> SmlJoint {
    SmlJoint {
        name: e.attr("name").map(str::to_string),
        parent: e.child("parent").map(parse_endpoint),
        child: e.child("child").map(parse_endpoint),
        dofs: e
            .descendants_named("dof")
            .into_iter()
            .map(|d| SmlDof {
                index: d.attr("index").map(str::to_string),
                min: d.attr("min").map(str::to_string),
                max: d.attr("max").map(str::to_string),
            })
            .collect(),
    }
}

fn parse_endpoint(e: &Element) -> SmlEndpoint {
    SmlEndpoint {
        body: e.attr("name").map(str::to_string),
        offset: e.child("offset").map(|o| {
            SmlOffset::from_type(o.attr("type"), o.text().unwrap_or_default())
        }),
    }
}

/// Trimmed text of the first child with the given tag name.
fn child_text(e: &Element, name: &str) -> Option<String> {
    e.child(name).and_then(Element::text).map(str::to_string)
}
