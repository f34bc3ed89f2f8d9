// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON snapshots of surface geometry.
//!
//! [`capture`] turns a surface subtree into a [`Value`] holding each
//! surface's role, geometry, and appearance, with children nested in order.
//! Surface and layer indices are left out so that two runs building the same
//! document compare equal even if slots were reused differently.
//!
//! [`compare`] walks two captures and reports the first difference with a
//! JSON-path-like location; numbers compare with a small tolerance.

use std::fmt;

use serde_json::{Map, Value, json};

use lamina_core::surface::{SurfaceContent, SurfaceId, SurfaceTree};

/// Tolerance used when comparing numbers.
pub const EPSILON: f64 = 1e-6;

/// Errors from parsing or comparing snapshots.
#[derive(Debug)]
pub enum SnapshotError {
    /// The snapshot text is not valid JSON.
    Parse(serde_json::Error),
    /// The root surface handle is stale.
    StaleRoot,
    /// A value differs between the two snapshots.
    Mismatch {
        /// Location of the difference, e.g. `$.children[1].position[0]`.
        path: String,
        /// Value in the expected snapshot.
        expected: String,
        /// Value in the actual snapshot.
        actual: String,
    },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "invalid snapshot: {e}"),
            Self::StaleRoot => f.write_str("snapshot root surface is stale"),
            Self::Mismatch {
                path,
                expected,
                actual,
            } => write!(f, "{path}: expected {expected}, found {actual}"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

/// Captures the subtree rooted at `root`.
pub fn capture(surfaces: &SurfaceTree, root: SurfaceId) -> Result<Value, SnapshotError> {
    if !surfaces.is_alive(root) {
        return Err(SnapshotError::StaleRoot);
    }
    Ok(capture_surface(surfaces, root))
}

fn capture_surface(surfaces: &SurfaceTree, id: SurfaceId) -> Value {
    let p = surfaces.properties(id);
    let content = match p.content {
        SurfaceContent::None => Value::Null,
        SurfaceContent::SolidColor(c) => json!([c.r, c.g, c.b, c.a]),
        other => Value::String(format!("{other:?}")),
    };
    let transform: Vec<f64> = p.transform.to_cols_array_2d().into_iter().flatten().collect();
    let children_transform: Vec<f64> = p
        .children_transform
        .to_cols_array_2d()
        .into_iter()
        .flatten()
        .collect();
    let children: Vec<Value> = surfaces
        .children(id)
        .map(|child| capture_surface(surfaces, child))
        .collect();

    json!({
        "role": format!("{:?}", surfaces.role(id)),
        "position": [p.position.x, p.position.y],
        "size": [p.size.width, p.size.height],
        "anchor": [p.anchor_point.x, p.anchor_point.y, p.anchor_point_z],
        "offset_from_layer": [p.offset_from_layer.x, p.offset_from_layer.y],
        "transform": transform,
        "children_transform": children_transform,
        "opacity": p.opacity,
        "masks_to_bounds": p.masks_to_bounds,
        "preserves_3d": p.preserves_3d,
        "backface_visible": p.backface_visible,
        "contents_visible": p.contents_visible,
        "contents_opaque": p.contents_opaque,
        "draws_content": p.draws_content,
        "painting_phase": p.painting_phase.bits(),
        "content": content,
        "has_mask": p.mask.is_some(),
        "has_replica": p.replica.is_some(),
        "replicated_position": p.replicated_position.map(|pt| [pt.x, pt.y]),
        "children": children,
    })
}

/// Serializes a capture as pretty-printed JSON.
#[must_use]
pub fn to_string(snapshot: &Value) -> String {
    serde_json::to_string_pretty(snapshot).unwrap_or_default()
}

/// Parses a snapshot previously written by [`to_string`].
pub fn parse(text: &str) -> Result<Value, SnapshotError> {
    Ok(serde_json::from_str(text)?)
}

/// Compares two captures, returning the first difference.
pub fn compare(expected: &Value, actual: &Value) -> Result<(), SnapshotError> {
    let mut path = String::from("$");
    compare_at(&mut path, expected, actual)
}

fn compare_at(path: &mut String, expected: &Value, actual: &Value) -> Result<(), SnapshotError> {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            if (a - b).abs() <= EPSILON {
                Ok(())
            } else {
                Err(mismatch(path, expected, actual))
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                path.push_str(".len()");
                return Err(SnapshotError::Mismatch {
                    path: path.clone(),
                    expected: a.len().to_string(),
                    actual: b.len().to_string(),
                });
            }
            for (i, (x, y)) in a.iter().zip(b).enumerate() {
                let len = path.len();
                path.push_str(&format!("[{i}]"));
                compare_at(path, x, y)?;
                path.truncate(len);
            }
            Ok(())
        }
        (Value::Object(a), Value::Object(b)) => compare_objects(path, a, b),
        _ if expected == actual => Ok(()),
        _ => Err(mismatch(path, expected, actual)),
    }
}

fn compare_objects(
    path: &mut String,
    expected: &Map<String, Value>,
    actual: &Map<String, Value>,
) -> Result<(), SnapshotError> {
    for (key, x) in expected {
        let len = path.len();
        path.push('.');
        path.push_str(key);
        let y = actual.get(key).unwrap_or(&Value::Null);
        compare_at(path, x, y)?;
        path.truncate(len);
    }
    if let Some(extra) = actual.keys().find(|k| !expected.contains_key(*k)) {
        path.push('.');
        path.push_str(extra);
        return Err(SnapshotError::Mismatch {
            path: path.clone(),
            expected: "nothing".into(),
            actual: actual[extra].to_string(),
        });
    }
    Ok(())
}

fn mismatch(path: &str, expected: &Value, actual: &Value) -> SnapshotError {
    SnapshotError::Mismatch {
        path: path.to_owned(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Size, Vec2};
    use lamina_core::compositor::{CompositingUpdateType, CompositorEnv, LayerTreeCompositor};
    use lamina_core::layer::LayerTree;
    use lamina_core::transform::Transform3d;

    /// Builds a document with a 3-D layer and an overlapping translucent
    /// sibling, runs one update, and captures the result.
    fn build_and_capture(offset: f64) -> Value {
        let mut layers = LayerTree::new();
        let root = layers.create_root_layer();
        layers.set_size(root, Size::new(800.0, 600.0));
        let a = layers.create_layer();
        layers.add_child(root, a);
        layers.set_size(a, Size::new(100.0, 100.0));
        layers.update_style(a, |s| {
            s.positioned = true;
            s.transform = Some(Transform3d::from_translation(0.0, 0.0, 1.0));
        });
        let b = layers.create_layer();
        layers.add_child(root, b);
        layers.set_offset(b, Vec2::new(offset, offset));
        layers.set_size(b, Size::new(100.0, 100.0));
        layers.update_style(b, |s| {
            s.positioned = true;
            s.opacity = 0.5;
        });

        let mut surfaces = SurfaceTree::new();
        let mut compositor = LayerTreeCompositor::default();
        let mut env = CompositorEnv::new(&mut layers, &mut surfaces);
        compositor.update_compositing_layers(CompositingUpdateType::AfterLayout, &mut env);
        capture(&surfaces, compositor.root_content_surface().unwrap()).unwrap()
    }

    #[test]
    fn identical_documents_capture_equal() {
        let first = build_and_capture(50.0);
        let second = build_and_capture(50.0);
        compare(&first, &second).unwrap();
    }

    #[test]
    fn moved_layer_reports_position_path() {
        let expected = build_and_capture(50.0);
        let actual = build_and_capture(60.0);
        match compare(&expected, &actual) {
            Err(SnapshotError::Mismatch { path, .. }) => {
                assert!(path.contains(".children[0].children[1]"), "path: {path}");
            }
            other => panic!("expected a mismatch, got {other:?}"),
        }
    }

    #[test]
    fn text_round_trip_compares_equal() {
        let snapshot = build_and_capture(50.0);
        let parsed = parse(&to_string(&snapshot)).unwrap();
        compare(&snapshot, &parsed).unwrap();
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        let err = parse("{ not json").unwrap_err();
        assert!(matches!(err, SnapshotError::Parse(_)));
        assert!(err.to_string().starts_with("invalid snapshot"));
    }

    #[test]
    fn extra_key_is_reported() {
        let expected = json!({ "a": 1 });
        let actual = json!({ "a": 1, "b": 2 });
        match compare(&expected, &actual) {
            Err(SnapshotError::Mismatch { path, .. }) => assert_eq!(path, "$.b"),
            other => panic!("expected a mismatch, got {other:?}"),
        }
    }

    #[test]
    fn numbers_compare_with_tolerance() {
        compare(&json!([1.0, 2.0]), &json!([1.0 + 1e-9, 2.0])).unwrap();
        assert!(compare(&json!([1.0]), &json!([1.1])).is_err());
    }
}
