// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end compositing updates over small documents.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};

use super::*;
use crate::layer::{AnimatedProperties, DocumentId, LayerContent, ZIndex};
use crate::surface::{SurfaceChanges, SurfacePresenter};
use crate::transform::Transform3d;

fn document() -> (LayerTree, LayerId) {
    let mut layers = LayerTree::new();
    let root = layers.create_root_layer();
    layers.set_size(root, Size::new(800.0, 600.0));
    (layers, root)
}

fn child(layers: &mut LayerTree, parent: LayerId, rect: Rect) -> LayerId {
    let l = layers.create_layer();
    layers.add_child(parent, l);
    layers.set_offset(l, rect.origin().to_vec2());
    layers.set_size(l, rect.size());
    l
}

/// A positioned layer with a 3-D transform.
fn make_3d(layers: &mut LayerTree, l: LayerId) {
    layers.update_style(l, |s| {
        s.positioned = true;
        s.transform = Some(Transform3d::from_translation(0.0, 0.0, 1.0));
    });
}

fn update(
    compositor: &mut LayerTreeCompositor,
    layers: &mut LayerTree,
    surfaces: &mut SurfaceTree,
) -> UpdateOutcome {
    let mut env = CompositorEnv::new(layers, surfaces);
    compositor.update_compositing_layers(CompositingUpdateType::AfterLayout, &mut env)
}

fn primary(compositor: &LayerTreeCompositor, l: LayerId) -> SurfaceId {
    compositor.backing(l).map(LayerBacking::primary).unwrap()
}

#[test]
fn plain_document_stays_out_of_compositing_mode() {
    let (mut layers, root) = document();
    child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();

    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(outcome.performed);
    assert!(!outcome.compositing_mode);
    assert_eq!(c.composited_layer_count(), 0);
    assert_eq!(surfaces.live_count(), 0);
    assert_eq!(c.root_attachment(), RootAttachment::Unattached);
}

#[test]
fn three_d_layer_enters_compositing_mode() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    make_3d(&mut layers, a);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();

    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(outcome.compositing_mode);
    assert!(outcome.layers_changed);
    assert!(outcome.hierarchy_updated);
    assert!(c.is_composited(a));
    assert!(c.is_composited(root), "root is composited in compositing mode");
    assert!(
        c.compositing_reasons(a)
            .contains(CompositingReasons::THREE_D_TRANSFORM)
    );
    assert_eq!(c.root_attachment(), RootAttachment::ViaHost);

    let root_content = c.root_content_surface().unwrap();
    let root_primary = primary(&c, root);
    let a_primary = primary(&c, a);
    assert_eq!(
        surfaces.children(root_content).collect::<Vec<_>>(),
        vec![root_primary]
    );
    assert_eq!(surfaces.parent(a_primary), Some(root_primary));
    assert_eq!(
        surfaces.properties(root_content).size,
        Size::new(800.0, 600.0)
    );
}

#[test]
fn overlapping_sibling_is_composited() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    make_3d(&mut layers, a);
    let b = child(&mut layers, root, Rect::new(50.0, 50.0, 150.0, 150.0));
    let far = child(&mut layers, root, Rect::new(300.0, 300.0, 400.0, 400.0));
    for l in [b, far] {
        layers.update_style(l, |s| s.positioned = true);
    }
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);

    assert!(c.is_composited(b));
    assert_eq!(c.indirect_reason(b), IndirectReason::Overlap);
    assert!(c.compositing_reasons(b).is_empty());
    assert!(!c.is_composited(far));

    // Paint order is preserved among sibling surfaces.
    let root_primary = primary(&c, root);
    assert_eq!(
        surfaces.children(root_primary).collect::<Vec<_>>(),
        vec![primary(&c, a), primary(&c, b)]
    );
}

#[test]
fn group_opacity_isolates_composited_descendant() {
    let (mut layers, root) = document();
    let p = child(&mut layers, root, Rect::new(0.0, 0.0, 200.0, 200.0));
    layers.update_style(p, |s| s.opacity = 0.5);
    let n = child(&mut layers, p, Rect::new(10.0, 10.0, 60.0, 60.0));
    make_3d(&mut layers, n);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);

    assert!(c.is_composited(p));
    assert_eq!(c.indirect_reason(p), IndirectReason::GraphicalEffect);
    assert!(c.has_compositing_descendant(p));
    assert_eq!(surfaces.properties(primary(&c, p)).opacity, 0.5);
    assert_eq!(surfaces.properties(primary(&c, n)).opacity, 1.0);
    assert_eq!(surfaces.parent(primary(&c, n)), Some(primary(&c, p)));
}

#[test]
fn negative_z_child_gets_foreground_surface() {
    let (mut layers, root) = document();
    let p = child(&mut layers, root, Rect::new(0.0, 0.0, 200.0, 200.0));
    layers.update_style(p, |s| {
        s.positioned = true;
        s.z_index = ZIndex::Value(0);
        s.paints_content = true;
    });
    let n = child(&mut layers, p, Rect::new(0.0, 0.0, 50.0, 50.0));
    make_3d(&mut layers, n);
    layers.update_style(n, |s| s.z_index = ZIndex::Value(-1));
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);

    assert!(c.is_composited(p));
    assert_eq!(c.indirect_reason(p), IndirectReason::BackgroundLayer);
    let backing = c.backing(p).unwrap();
    let fg = backing.foreground().unwrap();
    assert_eq!(
        surfaces.children(backing.primary()).collect::<Vec<_>>(),
        vec![primary(&c, n), fg],
        "negative-z content paints between background and foreground"
    );
    assert!(
        !surfaces
            .properties(backing.primary())
            .painting_phase
            .contains(crate::surface::PaintingPhase::FOREGROUND)
    );
}

#[test]
fn background_promotion_restores_overlap_testing() {
    let (mut layers, root) = document();
    let p = child(&mut layers, root, Rect::new(0.0, 0.0, 300.0, 300.0));
    layers.update_style(p, |s| {
        s.positioned = true;
        s.z_index = ZIndex::Value(0);
    });
    let n = child(&mut layers, p, Rect::new(0.0, 0.0, 50.0, 50.0));
    layers.update_style(n, |s| {
        s.positioned = true;
        s.z_index = ZIndex::Value(-1);
        s.animations = AnimatedProperties::TRANSFORM;
    });
    let m = child(&mut layers, p, Rect::new(200.0, 200.0, 250.0, 250.0));
    layers.update_style(m, |s| {
        s.positioned = true;
        s.z_index = ZIndex::Value(1);
    });
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);

    assert!(c.compositing_reasons(n).contains(CompositingReasons::ANIMATION));
    assert_eq!(c.indirect_reason(p), IndirectReason::BackgroundLayer);
    assert!(
        !c.is_composited(m),
        "a layer overlapping nothing paints into the promoted container"
    );
    assert_eq!(c.indirect_reason(m), IndirectReason::None);
}

#[test]
fn clipping_layer_wraps_composited_descendants() {
    let (mut layers, root) = document();
    let p = child(&mut layers, root, Rect::new(20.0, 20.0, 120.0, 120.0));
    layers.update_style(p, |s| {
        s.positioned = true;
        s.z_index = ZIndex::Value(0);
        s.overflow_clip = true;
    });
    let n = child(&mut layers, p, Rect::new(0.0, 0.0, 300.0, 300.0));
    make_3d(&mut layers, n);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);

    assert!(
        c.compositing_reasons(p)
            .contains(CompositingReasons::CLIPS_COMPOSITING_DESCENDANTS)
    );
    let clip = c.backing(p).and_then(LayerBacking::child_containment).unwrap();
    assert!(surfaces.properties(clip).masks_to_bounds);
    assert_eq!(surfaces.properties(clip).size, Size::new(100.0, 100.0));
    assert_eq!(surfaces.parent(primary(&c, n)), Some(clip));
}

#[test]
fn clip_between_layer_and_compositing_ancestor_gets_ancestor_clip() {
    let (mut layers, root) = document();
    let p = child(&mut layers, root, Rect::new(10.0, 10.0, 110.0, 110.0));
    layers.update_style(p, |s| s.overflow_clip = true);
    let n = child(&mut layers, p, Rect::new(0.0, 0.0, 300.0, 300.0));
    make_3d(&mut layers, n);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);

    assert!(!c.is_composited(p));
    let backing = c.backing(n).unwrap();
    let clip = backing.ancestor_clip().unwrap();
    assert_eq!(backing.child_for_superlayers(), clip);
    assert_eq!(surfaces.parent(clip), Some(primary(&c, root)));
    assert_eq!(surfaces.parent(backing.primary()), Some(clip));
    let props = surfaces.properties(clip);
    assert_eq!(props.position, Point::new(10.0, 10.0));
    assert_eq!(props.size, Size::new(100.0, 100.0));
}

#[test]
fn removing_last_reason_leaves_compositing_mode() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    make_3d(&mut layers, a);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);
    assert!(c.in_compositing_mode());

    layers.update_style(a, |s| s.transform = None);
    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(!outcome.compositing_mode);
    assert!(outcome.layers_changed);
    assert!(!c.is_composited(a));
    assert!(!c.is_composited(root));
    assert_eq!(c.root_content_surface(), None);
    assert_eq!(surfaces.live_count(), 0);
    assert!(
        outcome
            .repaints
            .iter()
            .any(|r| r.container == root && r.rect == Rect::new(0.0, 0.0, 100.0, 100.0)),
        "vacated region is repainted in the root"
    );
}

#[test]
fn unchanged_document_update_is_idempotent() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    make_3d(&mut layers, a);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);
    let _ = surfaces.evaluate();
    let count = c.composited_layer_count();

    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(!outcome.layers_changed);
    assert!(!outcome.hierarchy_updated);
    assert!(outcome.repaints.is_empty());
    assert_eq!(c.composited_layer_count(), count);
    assert!(surfaces.evaluate().is_empty());
}

#[test]
fn geometry_change_repositions_without_rebuild() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    make_3d(&mut layers, a);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);

    layers.set_offset(a, Vec2::new(30.0, 40.0));
    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(!outcome.hierarchy_updated);
    assert_eq!(
        surfaces.properties(primary(&c, a)).position,
        Point::new(30.0, 40.0)
    );
}

#[test]
fn destroying_composited_layer_repaints_once() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(10.0, 10.0, 60.0, 60.0));
    make_3d(&mut layers, a);
    let b = child(&mut layers, root, Rect::new(400.0, 400.0, 450.0, 450.0));
    make_3d(&mut layers, b);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);
    let before = c.composited_layer_count();
    let a_primary = primary(&c, a);

    let repaint = {
        let mut env = CompositorEnv::new(&mut layers, &mut surfaces);
        c.destroy_layer(a, &mut env)
    };
    assert_eq!(
        repaint,
        Some(RepaintRequest {
            container: root,
            rect: Rect::new(10.0, 10.0, 60.0, 60.0),
        })
    );
    assert!(!surfaces.is_alive(a_primary));
    assert_eq!(c.composited_layer_count(), before - 1);

    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(outcome.compositing_mode);
    assert!(c.is_composited(b));
    let vacated = Rect::new(10.0, 10.0, 60.0, 60.0);
    assert!(
        !outcome
            .repaints
            .iter()
            .any(|r| r.rect.intersect(vacated).area() > 0.0),
        "the vacated region was already reported: {:?}",
        outcome.repaints
    );
    assert_eq!(
        surfaces.children(primary(&c, root)).collect::<Vec<_>>(),
        vec![primary(&c, b)],
        "the destroyed layer's surface is gone from the tree"
    );
}

#[test]
fn refused_allocation_leaves_layer_uncomposited() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    make_3d(&mut layers, a);
    let mut surfaces = SurfaceTree::with_limit(1);
    let mut c = LayerTreeCompositor::default();

    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(outcome.performed);
    assert!(!c.is_composited(a));
    assert!(!outcome.compositing_mode, "falls back to painting");
    assert_eq!(c.root_content_surface(), None);
    assert_eq!(c.root_attachment(), RootAttachment::Unattached);
    assert_eq!(surfaces.live_count(), 0);

    // Surfaces become available again: the next update retries and the
    // composited layers are presented under the root content surface.
    surfaces.set_limit(None);
    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(outcome.compositing_mode);
    assert!(c.is_composited(a));
    let root_content = c.root_content_surface().unwrap();
    let root_primary = primary(&c, root);
    assert_eq!(surfaces.parent(root_primary), Some(root_content));
    assert_eq!(surfaces.parent(primary(&c, a)), Some(root_primary));
    assert_eq!(c.root_attachment(), RootAttachment::ViaHost);
}

#[test]
fn disabled_config_never_composites() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    make_3d(&mut layers, a);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::new(CompositingConfig::disabled());

    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(!outcome.compositing_mode);
    assert!(!c.is_composited(a));
    assert_eq!(surfaces.live_count(), 0);
}

#[test]
fn forced_mode_composites_plain_root() {
    let (mut layers, root) = document();
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::new(CompositingConfig {
        force_compositing_mode: true,
        ..CompositingConfig::new()
    });

    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(outcome.compositing_mode);
    assert!(c.is_composited(root));
    assert!(c.root_content_surface().is_some());
}

#[test]
fn pending_layout_defers_update() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    make_3d(&mut layers, a);
    layers.set_document_needs_layout(true);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();

    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(!outcome.performed);
    assert!(!c.is_composited(a));

    layers.set_document_needs_layout(false);
    let outcome = update(&mut c, &mut layers, &mut surfaces);
    assert!(outcome.performed);
    assert!(c.is_composited(a));
}

#[test]
fn scheduled_updates_coalesce_into_one_run() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    make_3d(&mut layers, a);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();

    c.schedule_update(CompositingUpdateType::AfterStyleChange);
    c.schedule_update(CompositingUpdateType::OnScroll);
    c.schedule_update(CompositingUpdateType::AfterLayout);
    assert!(c.has_pending_update());

    let mut env = CompositorEnv::new(&mut layers, &mut surfaces);
    let first = c.run_pending_update(&mut env);
    assert!(first.is_some_and(|o| o.performed));
    assert!(!c.has_pending_update());
    assert!(c.run_pending_update(&mut env).is_none());
    assert_eq!(c.update_index(), 1);
}

#[test]
fn hosted_document_is_grafted_under_iframe() {
    let mut surfaces = SurfaceTree::new();
    let mut frames = FrameRegistry::new();
    let inner_doc = DocumentId(1);

    let (mut inner, inner_root) = document();
    let spinner = child(&mut inner, inner_root, Rect::new(0.0, 0.0, 20.0, 20.0));
    make_3d(&mut inner, spinner);
    let mut inner_c = LayerTreeCompositor::default();
    inner_c.set_propagates_to_enclosing_frame(true);
    let outcome = update(&mut inner_c, &mut inner, &mut surfaces);
    assert!(outcome.notify_enclosing_frame);
    assert_eq!(inner_c.root_attachment(), RootAttachment::ViaEnclosingFrame);
    let inner_surface = inner_c.root_surface().unwrap();
    assert!(frames.update_from(inner_doc, &inner_c));
    assert!(!frames.update_from(inner_doc, &inner_c));

    let (mut outer, outer_root) = document();
    let iframe = child(&mut outer, outer_root, Rect::new(50.0, 50.0, 350.0, 200.0));
    outer.set_content(
        iframe,
        LayerContent::Frame {
            document: inner_doc,
            requires_accelerated: true,
            content_box: Rect::new(0.0, 0.0, 300.0, 150.0),
        },
    );
    let mut outer_c = LayerTreeCompositor::default();
    let mut env = CompositorEnv::new(&mut outer, &mut surfaces).with_frames(&frames);
    outer_c.update_compositing_layers(CompositingUpdateType::AfterLayout, &mut env);

    assert!(
        outer_c
            .compositing_reasons(iframe)
            .contains(CompositingReasons::IFRAME)
    );
    let iframe_primary = primary(&outer_c, iframe);
    assert_eq!(
        surfaces.children(iframe_primary).collect::<Vec<_>>(),
        vec![inner_surface]
    );
    assert_eq!(outer_c.root_attachment(), RootAttachment::ViaHost);
}

#[test]
fn opacity_layer_over_video_is_promoted() {
    let (mut layers, root) = document();
    let p = child(&mut layers, root, Rect::new(0.0, 0.0, 320.0, 240.0));
    layers.update_style(p, |s| s.opacity = 0.5);
    let video = child(&mut layers, p, Rect::new(0.0, 0.0, 320.0, 240.0));
    layers.set_content(
        video,
        LayerContent::Video {
            displays: true,
            accelerated: true,
        },
    );
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);

    assert!(c.compositing_reasons(video).contains(CompositingReasons::VIDEO));
    assert!(c.is_composited(p));
    assert_eq!(
        surfaces.children(primary(&c, p)).collect::<Vec<_>>(),
        vec![primary(&c, video)],
        "video surface is the only child of the isolation surface"
    );
    assert_eq!(
        surfaces.properties(primary(&c, video)).content,
        crate::surface::SurfaceContent::Media
    );
}

#[test]
fn overlap_follows_paint_order_across_z_lists() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    let b = child(&mut layers, root, Rect::new(50.0, 50.0, 150.0, 150.0));
    let c_layer = child(&mut layers, root, Rect::new(100.0, 100.0, 200.0, 200.0));
    for (l, z) in [(a, -1), (b, 0), (c_layer, 1)] {
        layers.update_style(l, |s| {
            s.positioned = true;
            s.z_index = ZIndex::Value(z);
        });
    }
    layers.update_style(b, |s| {
        s.transform = Some(Transform3d::from_translation(0.0, 0.0, 1.0));
    });
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    update(&mut c, &mut layers, &mut surfaces);

    assert!(
        !c.is_composited(a),
        "nothing precedes the negative-z layer in the index"
    );
    assert!(c.is_composited(b));
    assert!(c.compositing_reasons(b).contains(CompositingReasons::THREE_D_TRANSFORM));
    assert!(c.is_composited(c_layer));
    assert_eq!(c.indirect_reason(c_layer), IndirectReason::Overlap);
}

/// Mirrors surface lifetimes the way a platform presenter would.
#[derive(Default)]
struct CountingPresenter {
    live: Vec<u32>,
    applied: u32,
}

impl SurfacePresenter for CountingPresenter {
    fn apply(&mut self, tree: &SurfaceTree, changes: &SurfaceChanges) {
        self.applied += 1;
        self.live.retain(|idx| !changes.removed.contains(idx));
        for &idx in &changes.added {
            assert!(tree.is_alive_at(idx), "added surface {idx} is live");
            self.live.push(idx);
        }
    }
}

#[test]
fn presenter_mirrors_surface_lifetimes() {
    let (mut layers, root) = document();
    let a = child(&mut layers, root, Rect::new(0.0, 0.0, 100.0, 100.0));
    make_3d(&mut layers, a);
    let mut surfaces = SurfaceTree::new();
    let mut c = LayerTreeCompositor::default();
    let mut presenter = CountingPresenter::default();

    update(&mut c, &mut layers, &mut surfaces);
    let changes = surfaces.evaluate();
    presenter.apply(&surfaces, &changes);
    assert_eq!(presenter.live.len(), surfaces.live_count() as usize);

    layers.update_style(a, |s| s.transform = None);
    update(&mut c, &mut layers, &mut surfaces);
    let changes = surfaces.evaluate();
    presenter.apply(&surfaces, &changes);
    assert_eq!(presenter.applied, 2);
    assert!(presenter.live.is_empty(), "left: {:?}", presenter.live);
}
