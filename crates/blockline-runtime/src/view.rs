#![forbid(unsafe_code)]

//! The published accessible view.
//!
//! Every render builds a complete [`AccessibleView`] off to the side and
//! publishes it with a single atomic swap. Readers (a screen-reader bridge,
//! a test, another thread) load the current view without locking and never
//! observe a half-built tree.

use std::sync::Arc;

use arc_swap::ArcSwap;
use blockline_core::BlockId;
use blockline_render::node_renderer::WORKSPACE;
use blockline_render::{Linearization, RenderNode, Role};

/// One complete render: breadcrumb trail plus list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessibleView {
    /// Render generation; increments with every published view.
    pub generation: u64,
    pub breadcrumbs: RenderNode,
    pub list: RenderNode,
    /// Focused block; `None` for the workspace view.
    pub focus: Option<BlockId>,
}

impl AccessibleView {
    /// The view shown before the first render.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            generation: 0,
            breadcrumbs: RenderNode::new("breadcrumbs", Role::Navigation),
            list: RenderNode::new(WORKSPACE, Role::Tree),
            focus: None,
        }
    }

    /// Wrap a linearization and run the presentation pass over it.
    ///
    /// The pass assigns every item its presentation level (tree depth plus
    /// logical indent) so list styling is uniform across the new subtree.
    #[must_use]
    pub fn present(linearization: Linearization, generation: u64) -> Self {
        let Linearization {
            mut breadcrumbs,
            mut list,
            focus,
        } = linearization;
        breadcrumbs.assign_levels(0);
        list.assign_levels(0);
        Self {
            generation,
            breadcrumbs,
            list,
            focus,
        }
    }

    /// Text outline of breadcrumbs and list, for logs and tests.
    #[must_use]
    pub fn outline(&self) -> String {
        format!("{}{}", self.breadcrumbs.outline(), self.list.outline())
    }
}

/// Lock-free holder of the current [`AccessibleView`].
#[derive(Debug)]
pub struct ViewStore {
    inner: ArcSwap<AccessibleView>,
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new(AccessibleView::empty())
    }
}

impl ViewStore {
    #[must_use]
    pub fn new(view: AccessibleView) -> Self {
        Self {
            inner: ArcSwap::from_pointee(view),
        }
    }

    /// Current view. Cheap; clones an `Arc`.
    #[must_use]
    pub fn load(&self) -> Arc<AccessibleView> {
        self.inner.load_full()
    }

    /// Replace the current view in one step.
    pub fn publish(&self, view: AccessibleView) {
        self.inner.store(Arc::new(view));
    }

    /// Generation of the current view.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.load().generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockline_harness::{MockCanvas, fixtures};
    use blockline_render::{LinearizationEngine, RenderContext};
    use std::thread;

    fn sample_view(generation: u64) -> AccessibleView {
        let mut canvas = MockCanvas::new();
        fixtures::sample_program(&mut canvas);
        let linearization = LinearizationEngine::new().render(&canvas, &RenderContext::workspace());
        AccessibleView::present(linearization, generation)
    }

    #[test]
    fn presentation_assigns_levels() {
        let view = sample_view(1);
        let stack = &view.list.children()[0];
        assert_eq!(stack.level(), 1);
        let nested = stack.find("print small").unwrap();
        assert_eq!(nested.level(), 2 + nested.indent_level());
    }

    #[test]
    fn publish_replaces_whole_view() {
        let store = ViewStore::default();
        assert_eq!(store.generation(), 0);
        let before = store.load();
        store.publish(sample_view(7));
        assert_eq!(store.generation(), 7);
        assert_eq!(before.generation, 0);
        assert_eq!(store.load().list.children().len(), 3);
    }

    #[test]
    fn readers_never_see_partial_views() {
        let store = Arc::new(ViewStore::default());
        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    let view = store.load();
                    let complete = view.generation == 0 || view.list.children().len() == 3;
                    assert!(complete, "generation {} incomplete", view.generation);
                }
            })
        };
        for generation in 1..=50 {
            store.publish(sample_view(generation));
        }
        reader.join().unwrap();
        assert_eq!(store.generation(), 50);
    }
}
