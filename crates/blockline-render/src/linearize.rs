#![forbid(unsafe_code)]

//! Tree-to-list projection of the block canvas.
//!
//! [`LinearizationEngine::render`] turns the live block tree into a
//! breadcrumb trail and a nested accessible list. It runs in one of two modes:
//!
//! - **Workspace**: one group per top-level stack, labelled `Stack A`,
//!   `Stack B`, ..., each holding a flat, indented list of its blocks with
//!   `end ...` markers at the close of every nesting construct.
//! - **Single node**: a `go back` link, the focused block's heading and
//!   actions, its fields and inline inputs, mutator options, its body (one
//!   section per branch for multi-branch constructs), and finally its return
//!   value.
//!
//! # Ownership test
//!
//! The walk visits every cursor node below its start. A node becomes a list
//! item only when it is a block, is not rendered inline by its parent, and
//! its topmost structural ancestor is the root the walk started from. Every
//! other node contributes at most an `end ...` marker. The root check keeps a
//! block from being listed under anything but its true owner.
//!
//! # Termination
//!
//! The non-inline block tree is acyclic (the move protocol refuses cyclic
//! connections), so the walk visits each node once and recursion depth is
//! bounded by nesting depth.

use crate::branch::{Branch, branches};
use crate::markers::StackMarkers;
use crate::node_renderer::{NodeRenderer, WORKSPACE, input_label};
use crate::render_node::{Action, ItemFlags, RenderNode, Role};
use crate::walk::{
    attached_block, block_trail, closing_keyword, focus_block, is_inline, nearest_block_ancestor,
    root_block,
};
use blockline_core::{
    AstNode, BlockHost, BlockId, BlockInfo, ConnectionId, ConnectionKind, InputKind, NodeKind,
};
#[cfg(feature = "tracing")]
use web_time::Instant;

/// Everything a render depends on besides the host tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    /// Focused node; `None` renders the whole workspace.
    pub selected: Option<AstNode>,
    /// Focused branch of a multi-branch selection.
    pub branch: Option<usize>,
    /// Block currently held by the move protocol.
    pub held: Option<AstNode>,
    /// Whether a move is in progress (either slot occupied).
    pub move_pending: bool,
    /// Emit `end ...` markers.
    pub end_labels: bool,
    /// Build the breadcrumb trail.
    pub breadcrumbs: bool,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            selected: None,
            branch: None,
            held: None,
            move_pending: false,
            end_labels: true,
            breadcrumbs: true,
        }
    }
}

impl RenderContext {
    /// Whole-workspace context.
    #[must_use]
    pub fn workspace() -> Self {
        Self::default()
    }

    /// Single-node context focused on `node`.
    #[must_use]
    pub fn focused(node: AstNode) -> Self {
        Self {
            selected: Some(node),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_branch(mut self, branch: Option<usize>) -> Self {
        self.branch = branch;
        self
    }

    #[must_use]
    pub fn with_move(mut self, held: Option<AstNode>, pending: bool) -> Self {
        self.held = held;
        self.move_pending = pending;
        self
    }

    #[must_use]
    pub fn with_end_labels(mut self, enabled: bool) -> Self {
        self.end_labels = enabled;
        self
    }

    #[must_use]
    pub fn with_breadcrumbs(mut self, enabled: bool) -> Self {
        self.breadcrumbs = enabled;
        self
    }
}

/// Output of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linearization {
    pub breadcrumbs: RenderNode,
    pub list: RenderNode,
    /// Block the list is focused on; `None` in workspace mode.
    pub focus: Option<BlockId>,
}

/// Builds [`Linearization`]s. Stateless; one engine serves every render.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearizationEngine;

impl LinearizationEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Render the view for `ctx`.
    ///
    /// A selection whose block no longer exists falls back to workspace mode.
    pub fn render<H: BlockHost + ?Sized>(&self, host: &H, ctx: &RenderContext) -> Linearization {
        let focus = ctx
            .selected
            .as_ref()
            .and_then(|node| focus_block(host, node))
            .filter(|id| host.contains_block(*id));

        #[cfg(feature = "tracing")]
        let render_start = Instant::now();
        #[cfg(feature = "tracing")]
        let mode = if focus.is_some() { "node" } else { "workspace" };
        #[cfg(feature = "tracing")]
        let render_span = tracing::debug_span!(
            "linearize.render",
            mode,
            move_pending = ctx.move_pending,
            items = tracing::field::Empty,
            render_duration_us = tracing::field::Empty,
        );
        #[cfg(feature = "tracing")]
        let _render_guard = render_span.enter();

        let walker = Walker {
            host,
            ctx,
            renderer: NodeRenderer::new(host, ctx),
        };
        let (list, breadcrumbs) = match focus.and_then(|id| host.block(id)) {
            Some(info) => {
                let branch = walker.focused_branch(&info);
                let trail = block_trail(host, &AstNode::block(info.id));
                (
                    walker.single_node(&info, branch.as_ref()),
                    walker.breadcrumbs(&trail, branch.as_ref()),
                )
            }
            None => (walker.workspace(), walker.breadcrumbs(&[], None)),
        };

        #[cfg(feature = "tracing")]
        {
            let elapsed_us = render_start.elapsed().as_micros() as u64;
            let items = list.len() as u64;
            render_span.record("items", items);
            render_span.record("render_duration_us", elapsed_us);
            tracing::debug!(
                message = "linearize.metrics",
                items,
                render_duration_us = elapsed_us
            );
        }

        Linearization {
            breadcrumbs,
            list,
            focus,
        }
    }
}

struct Walker<'a, H: BlockHost + ?Sized> {
    host: &'a H,
    ctx: &'a RenderContext,
    renderer: NodeRenderer<'a, H>,
}

impl<H: BlockHost + ?Sized> Walker<'_, H> {
    fn breadcrumbs(&self, trail: &[AstNode], branch: Option<&Branch>) -> RenderNode {
        if self.ctx.breadcrumbs {
            self.renderer.breadcrumbs(trail, branch)
        } else {
            RenderNode::new("breadcrumbs", Role::Navigation)
        }
    }

    fn focused_branch(&self, info: &BlockInfo) -> Option<Branch> {
        let index = self.ctx.branch?;
        if !info.construct.is_multi_branch() {
            return None;
        }
        branches(self.host, info).into_iter().find(|branch| branch.index == index)
    }

    // ── Workspace mode ──────────────────────────────────────────────────

    fn workspace(&self) -> RenderNode {
        let mut list = RenderNode::new(WORKSPACE, Role::Tree);
        for (marker, top) in StackMarkers::new().zip(self.host.top_blocks()) {
            let mut group = self.renderer.stack_group(&marker, top);
            let mut items = Vec::new();
            self.expand_siblings(self.host.first_child(&AstNode::stack(top)), top, 0, &mut items);
            group.extend(items);
            list.push(group);
        }
        list
    }

    // ── Core traversal ──────────────────────────────────────────────────

    fn expand_siblings(&self, start: Option<AstNode>, root: BlockId, indent: u16, out: &mut Vec<RenderNode>) {
        let mut current = start;
        while let Some(node) = current {
            self.expand(&node, root, indent, out);
            current = self.host.next_sibling(&node);
        }
    }

    /// The block at `node`, when it is listed as an item under `root`.
    fn root_owned(&self, node: &AstNode, root: BlockId) -> Option<BlockInfo> {
        if !node.is_block() {
            return None;
        }
        let info = self.host.block(node.block_id()?)?;
        if is_inline(self.host, &info) {
            return None;
        }
        (root_block(self.host, info.id) == root).then_some(info)
    }

    fn expand(&self, node: &AstNode, root: BlockId, indent: u16, out: &mut Vec<RenderNode>) {
        if let Some(info) = self.root_owned(node, root) {
            out.push(self.renderer.block_item(&info, *node, indent));
            if info.construct.is_multi_branch() {
                self.expand_branches(&info, root, indent + 1, out);
                if let Some(next) = info.next.and_then(|conn| AstNode::connection(NodeKind::Next, conn)) {
                    self.close(&next, indent + 1, out);
                }
            } else {
                self.expand_siblings(self.host.first_child(node), root, indent + 1, out);
            }
            return;
        }
        if node.is_block() {
            return;
        }
        if node.kind() == NodeKind::Input && self.ctx.move_pending {
            if let Some(target) = self.empty_statement_slot(node) {
                out.push(self.renderer.insert_here(target, indent));
            }
        }
        self.expand_siblings(self.host.first_child(node), root, indent, out);
        self.close(node, indent, out);
    }

    fn empty_statement_slot(&self, node: &AstNode) -> Option<AstNode> {
        let connection = node.connection_id()?;
        let info = self.host.connection(connection)?;
        let is_statement = matches!(info.kind, ConnectionKind::Statement);
        (is_statement && !info.is_connected()).then_some(*node)
    }

    fn close(&self, node: &AstNode, indent: u16, out: &mut Vec<RenderNode>) {
        if !self.ctx.end_labels {
            return;
        }
        if let Some(keyword) = closing_keyword(self.host, node) {
            out.push(self.renderer.end_label(keyword, indent.saturating_sub(1)));
        }
    }

    fn expand_branches(&self, info: &BlockInfo, root: BlockId, indent: u16, out: &mut Vec<RenderNode>) {
        for branch in branches(self.host, info) {
            out.push(self.renderer.branch_header(info.id, &branch, indent));
            self.expand_body(branch.body, root, indent + 1, out);
        }
    }

    /// Items of one statement body, or its empty-slot stand-in.
    fn expand_body(
        &self,
        body: Option<ConnectionId>,
        root: BlockId,
        indent: u16,
        out: &mut Vec<RenderNode>,
    ) {
        let Some(body) = body else {
            return;
        };
        match attached_block(self.host, body) {
            Some(first) => self.expand_siblings(Some(AstNode::block(first)), root, indent, out),
            None => out.push(self.renderer.empty_body(body, indent)),
        }
    }

    // ── Single-node mode ────────────────────────────────────────────────

    fn single_node(&self, info: &BlockInfo, branch: Option<&Branch>) -> RenderNode {
        let node = AstNode::block(info.id);
        let root = root_block(self.host, info.id);
        let mut list = RenderNode::new(info.description.clone(), Role::Tree);

        let back = match branch {
            Some(_) => Action::Select(node),
            None => nearest_block_ancestor(self.host, &node)
                .map_or(Action::SelectWorkspace, Action::Select),
        };
        list.push(self.renderer.go_back(back));
        list.push(self.renderer.heading(info, node));
        list.extend(self.renderer.block_actions(info, node));

        for field in info.fields.iter().filter_map(|id| self.host.field(*id)) {
            list.push(self.renderer.field_control(&field, ""));
        }

        if !info.construct.is_multi_branch() {
            for input in info
                .inputs
                .iter()
                .filter(|input| input.kind == InputKind::Value && !input.is_return)
            {
                if let Some(connection) = input.connection {
                    list.push(self.renderer.value_slot(input, connection));
                }
            }
        }

        list.extend(self.renderer.mutator_options(info));

        if info.construct.is_multi_branch() {
            let arms = branches(self.host, info);
            for arm in arms
                .iter()
                .filter(|arm| branch.is_none_or(|focused| focused.index == arm.index))
            {
                list.push(self.branch_section(info, arm, root));
            }
        } else {
            for input in info.statement_inputs() {
                let Some(connection) = input.connection else {
                    continue;
                };
                let label = if input.label.is_empty() {
                    "body".to_string()
                } else {
                    input_label(input)
                };
                let mut section = RenderNode::new(label, Role::Group);
                let mut items = Vec::new();
                self.expand_body(Some(connection), root, 0, &mut items);
                section.extend(items);
                list.push(section);
            }
        }

        if let Some(ret) = info.return_input() {
            if let Some(connection) = ret.connection {
                list.push(self.renderer.value_slot(ret, connection));
            }
        }
        list
    }

    fn branch_section(&self, info: &BlockInfo, branch: &Branch, root: BlockId) -> RenderNode {
        let mut section =
            RenderNode::new(branch.text.clone(), Role::Group).action(Action::SelectBranch {
                block: info.id,
                index: branch.index,
            });
        if self.ctx.branch == Some(branch.index) {
            section = section.flags(ItemFlags::SELECTED);
        }
        if let Some(condition) = branch.condition {
            if let Some(input) = info.inputs.iter().find(|input| input.connection == Some(condition)) {
                section.push(self.renderer.value_slot(input, condition));
            }
        }
        let mut items = Vec::new();
        self.expand_body(branch.body, root, 0, &mut items);
        section.extend(items);
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockline_harness::{MockCanvas, fixtures};
    #[cfg(feature = "tracing")]
    use std::sync::{Arc, Mutex};
    #[cfg(feature = "tracing")]
    use tracing::Subscriber;
    #[cfg(feature = "tracing")]
    use tracing_subscriber::Layer;
    #[cfg(feature = "tracing")]
    use tracing_subscriber::layer::{Context, SubscriberExt};

    #[cfg(feature = "tracing")]
    #[derive(Debug, Default)]
    struct RenderTraceState {
        span_seen: bool,
        has_items_field: bool,
        duration_recorded: bool,
        metrics_events: usize,
    }

    #[cfg(feature = "tracing")]
    struct RenderTraceCapture {
        state: Arc<Mutex<RenderTraceState>>,
    }

    #[cfg(feature = "tracing")]
    impl<S> Layer<S> for RenderTraceCapture
    where
        S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::Id,
            _ctx: Context<'_, S>,
        ) {
            if attrs.metadata().name() != "linearize.render" {
                return;
            }
            let mut state = self.state.lock().expect("render trace state lock");
            state.span_seen = true;
            state.has_items_field |= attrs.metadata().fields().field("items").is_some();
        }

        fn on_record(
            &self,
            id: &tracing::Id,
            values: &tracing::span::Record<'_>,
            ctx: Context<'_, S>,
        ) {
            let Some(span) = ctx.span(id) else {
                return;
            };
            if span.metadata().name() != "linearize.render" {
                return;
            }

            struct DurationVisitor {
                saw_duration: bool,
            }
            impl tracing::field::Visit for DurationVisitor {
                fn record_u64(&mut self, field: &tracing::field::Field, _value: u64) {
                    if field.name() == "render_duration_us" {
                        self.saw_duration = true;
                    }
                }

                fn record_debug(&mut self, _field: &tracing::field::Field, _value: &dyn std::fmt::Debug) {}
            }

            let mut visitor = DurationVisitor { saw_duration: false };
            values.record(&mut visitor);
            if visitor.saw_duration {
                self.state.lock().expect("render trace state lock").duration_recorded = true;
            }
        }

        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct MessageVisitor {
                message: Option<String>,
            }
            impl tracing::field::Visit for MessageVisitor {
                fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                    if field.name() == "message" {
                        self.message = Some(value.to_string());
                    }
                }

                fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                    if field.name() == "message" {
                        self.message = Some(format!("{value:?}").trim_matches('"').to_string());
                    }
                }
            }

            let mut visitor = MessageVisitor { message: None };
            event.record(&mut visitor);
            if visitor.message.as_deref() == Some("linearize.metrics") {
                self.state.lock().expect("render trace state lock").metrics_events += 1;
            }
        }
    }

    fn stack_labels(view: &Linearization, index: usize) -> Vec<String> {
        view.list.children()[index]
            .children()
            .iter()
            .map(|item| item.label().to_string())
            .collect()
    }

    #[test]
    fn workspace_lists_stacks_with_markers() {
        let mut canvas = MockCanvas::new();
        fixtures::sample_program(&mut canvas);
        let view = LinearizationEngine::new().render(&canvas, &RenderContext::workspace());
        let groups: Vec<_> = view.list.children().iter().map(RenderNode::label).collect();
        assert_eq!(groups, ["Stack A", "Stack B", "Stack C"]);
        assert_eq!(view.focus, None);
        assert_eq!(view.breadcrumbs.labels(), [WORKSPACE]);
    }

    #[test]
    fn nested_constructs_close_with_end_labels() {
        let mut canvas = MockCanvas::new();
        fixtures::sample_program(&mut canvas);
        let view = LinearizationEngine::new().render(&canvas, &RenderContext::workspace());
        assert_eq!(
            stack_labels(&view, 0),
            [
                "set x to 0",
                "repeat 3",
                "if x < 2 else if x < 5",
                "if x < 2",
                "print small",
                "else if x < 5",
                "print medium",
                "else",
                "print large",
                "end if",
                "end repeat",
            ]
        );
        assert_eq!(
            stack_labels(&view, 1),
            ["to double with: n", "print doubling", "end function"]
        );
        assert_eq!(stack_labels(&view, 2), ["scratch"]);
    }

    #[test]
    fn indentation_follows_nesting() {
        let mut canvas = MockCanvas::new();
        fixtures::sample_program(&mut canvas);
        let view = LinearizationEngine::new().render(&canvas, &RenderContext::workspace());
        let stack = &view.list.children()[0];
        let indent_of = |label: &str| stack.find(label).map(RenderNode::indent_level);
        assert_eq!(indent_of("repeat 3"), Some(0));
        assert_eq!(indent_of("if x < 2"), Some(2));
        assert_eq!(indent_of("print small"), Some(3));
        assert_eq!(indent_of("end if"), Some(1));
        assert_eq!(indent_of("end repeat"), Some(0));
    }

    #[test]
    fn end_labels_can_be_disabled() {
        let mut canvas = MockCanvas::new();
        let repeat = fixtures::repeat(&mut canvas, 2.0);
        let ctx = RenderContext::workspace().with_end_labels(false);
        let view = LinearizationEngine::new().render(&canvas, &ctx);
        assert_eq!(stack_labels(&view, 0), ["repeat 2"]);
        assert!(canvas.contains_block(repeat));
    }

    #[test]
    fn focused_block_renders_controls_in_order() {
        let mut canvas = MockCanvas::new();
        let program = fixtures::sample_program(&mut canvas);
        let ctx = RenderContext::focused(AstNode::block(program.repeat));
        let view = LinearizationEngine::new().render(&canvas, &ctx);
        let top: Vec<_> = view.list.children().iter().map(RenderNode::label).collect();
        assert_eq!(
            top,
            ["go back", "repeat 3", "move", "disconnect", "duplicate", "delete", "repeat", "do"]
        );
        assert_eq!(view.focus, Some(program.repeat));
        let back = view.list.find(crate::node_renderer::GO_BACK).unwrap();
        assert_eq!(back.action_ref(), Some(&Action::SelectWorkspace));

        let ctx = RenderContext::focused(AstNode::block(program.branch));
        let view = LinearizationEngine::new().render(&canvas, &ctx);
        let back = view.list.find(crate::node_renderer::GO_BACK).unwrap();
        assert_eq!(back.action_ref(), Some(&Action::Select(AstNode::block(program.repeat))));
    }

    #[test]
    fn breadcrumbs_run_root_to_leaf() {
        let mut canvas = MockCanvas::new();
        let chain = fixtures::nested_repeats(&mut canvas, 3);
        let ctx = RenderContext::focused(AstNode::block(chain[2]));
        let view = LinearizationEngine::new().render(&canvas, &ctx);
        assert_eq!(view.breadcrumbs.labels(), [WORKSPACE, "repeat 2", "repeat 3", "repeat 4"]);
        let last = view.breadcrumbs.children().last().unwrap();
        assert!(last.item_flags().contains(ItemFlags::SELECTED));
    }

    #[test]
    fn function_return_is_last() {
        let mut canvas = MockCanvas::new();
        let program = fixtures::sample_program(&mut canvas);
        let ctx = RenderContext::focused(AstNode::block(program.helper));
        let view = LinearizationEngine::new().render(&canvas, &ctx);
        let last = view.list.children().last().unwrap();
        assert_eq!(last.label(), "return: n");
        assert!(view.list.find("argument 1").is_some());
        assert!(view.list.find("add argument").is_some());
    }

    #[test]
    fn branch_focus_narrows_to_one_section() {
        let mut canvas = MockCanvas::new();
        let program = fixtures::sample_program(&mut canvas);
        let ctx = RenderContext::focused(AstNode::block(program.branch)).with_branch(Some(1));
        let view = LinearizationEngine::new().render(&canvas, &ctx);
        let sections: Vec<_> = view
            .list
            .children()
            .iter()
            .filter(|node| node.role() == Role::Group)
            .map(RenderNode::label)
            .collect();
        assert_eq!(sections, ["else if x < 5"]);
        let back = view.list.find(crate::node_renderer::GO_BACK).unwrap();
        assert_eq!(back.action_ref(), Some(&Action::Select(AstNode::block(program.branch))));
        assert_eq!(view.breadcrumbs.labels().last(), Some(&"else if x < 5"));
    }

    #[test]
    fn vanished_selection_falls_back_to_workspace() {
        let mut canvas = MockCanvas::new();
        fixtures::print_text(&mut canvas, "a");
        let ctx = RenderContext::focused(AstNode::block(BlockId(9_999)));
        let view = LinearizationEngine::new().render(&canvas, &ctx);
        assert_eq!(view.focus, None);
        assert_eq!(view.list.label(), WORKSPACE);
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn render_emits_span_and_metrics() {
        let state = Arc::new(Mutex::new(RenderTraceState::default()));
        let subscriber = tracing_subscriber::registry().with(RenderTraceCapture {
            state: Arc::clone(&state),
        });
        let _guard = tracing::subscriber::set_default(subscriber);
        tracing::callsite::rebuild_interest_cache();

        let mut canvas = MockCanvas::new();
        fixtures::sample_program(&mut canvas);
        let engine = LinearizationEngine::new();
        engine.render(&canvas, &RenderContext::workspace());
        engine.render(&canvas, &RenderContext::workspace().with_end_labels(false));

        let state = state.lock().expect("render trace state lock");
        assert!(state.span_seen);
        assert!(state.has_items_field);
        assert!(state.duration_recorded);
        assert_eq!(state.metrics_events, 2);
    }
}
