// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Indented text dump of a surface subtree.
//!
//! One line per surface, children indented two spaces under their parent:
//!
//! ```text
//! RootContent #0 pos=(0, 0) size=800x600
//!   Primary #1 owner=0 pos=(0, 0) size=800x600 [draws]
//!     Primary #2 owner=1 pos=(10, 10) size=100x100 [draws, opacity=0.5]
//! ```

use std::fmt::{self, Write};

use lamina_core::surface::{SurfaceContent, SurfaceId, SurfaceTree};

/// Formats the subtree rooted at `root` as indented text.
///
/// Returns an empty string if `root` is stale.
#[must_use]
pub fn format_surface_tree(surfaces: &SurfaceTree, root: SurfaceId) -> String {
    let mut out = String::new();
    let _ = write_surface_tree(surfaces, root, &mut out);
    out
}

/// Writes the subtree rooted at `root` to `out`.
pub fn write_surface_tree(
    surfaces: &SurfaceTree,
    root: SurfaceId,
    out: &mut dyn Write,
) -> fmt::Result {
    if !surfaces.is_alive(root) {
        return Ok(());
    }
    write_surface(surfaces, root, 0, out)
}

fn write_surface(
    surfaces: &SurfaceTree,
    id: SurfaceId,
    depth: usize,
    out: &mut dyn Write,
) -> fmt::Result {
    let props = surfaces.properties(id);
    write!(
        out,
        "{:indent$}{:?} #{}",
        "",
        surfaces.role(id),
        id.index(),
        indent = depth * 2
    )?;
    if let Some(owner) = surfaces.owner(id) {
        write!(out, " owner={}", owner.index())?;
    }
    write!(
        out,
        " pos=({}, {}) size={}x{}",
        props.position.x, props.position.y, props.size.width, props.size.height
    )?;

    let mut flags: Vec<String> = Vec::new();
    if props.draws_content {
        flags.push("draws".into());
    }
    if props.masks_to_bounds {
        flags.push("clips".into());
    }
    if props.contents_opaque {
        flags.push("opaque".into());
    }
    if !props.contents_visible {
        flags.push("hidden".into());
    }
    if props.preserves_3d {
        flags.push("preserve-3d".into());
    }
    if props.opacity < 1.0 {
        flags.push(format!("opacity={}", props.opacity));
    }
    if !props.transform.is_identity() {
        flags.push("transformed".into());
    }
    match props.content {
        SurfaceContent::None => {}
        SurfaceContent::SolidColor(c) => {
            flags.push(format!("solid=#{:02x}{:02x}{:02x}{:02x}", c.r, c.g, c.b, c.a));
        }
        other => flags.push(format!("content={other:?}")),
    }
    if props.mask.is_some() {
        flags.push("mask".into());
    }
    if props.replica.is_some() {
        flags.push("replica".into());
    }
    if !flags.is_empty() {
        write!(out, " [{}]", flags.join(", "))?;
    }
    writeln!(out)?;

    for child in surfaces.children(id) {
        write_surface(surfaces, child, depth + 1, out)?;
    }
    Ok(())
}
