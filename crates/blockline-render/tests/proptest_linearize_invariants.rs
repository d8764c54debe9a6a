//! Property-based invariant tests for whole-workspace linearization.
//!
//! For randomly generated, well-formed programs:
//!
//! 1. Every top-level stack is listed exactly once, in canvas order.
//! 2. Every non-inline block is listed exactly once, inside its own stack.
//! 3. Every named nesting construct is closed by exactly one `end` label.
//! 4. Rendering is deterministic.

use std::collections::HashSet;

use blockline_core::{AstNode, BlockHost, BlockId};
use blockline_harness::fixtures::{self, Sketch};
use blockline_harness::MockCanvas;
use blockline_render::{Action, ItemFlags, LinearizationEngine, RenderContext, RenderNode};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn sketch() -> impl Strategy<Value = Sketch> {
    let leaf = prop_oneof![
        "[a-z]{1,6}".prop_map(Sketch::Print),
        prop::sample::select(vec!["x", "y", "i"]).prop_map(|name| Sketch::Set(name.to_string())),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        let body = prop::collection::vec(inner, 0..4);
        prop_oneof![
            (1u32..6, body.clone()).prop_map(|(times, body)| Sketch::Repeat { times, body }),
            body.clone().prop_map(|body| Sketch::While { body }),
            (prop::collection::vec(body.clone(), 1..3), prop::option::of(body))
                .prop_map(|(arms, otherwise)| Sketch::If { arms, otherwise }),
        ]
    })
}

fn program() -> impl Strategy<Value = Vec<Vec<Sketch>>> {
    prop::collection::vec(prop::collection::vec(sketch(), 1..4), 1..5)
}

fn build(stacks: &[Vec<Sketch>]) -> (MockCanvas, Vec<BlockId>) {
    let mut canvas = MockCanvas::new();
    let heads = stacks
        .iter()
        .filter_map(|stack| fixtures::build_sequence(&mut canvas, stack))
        .collect();
    (canvas, heads)
}

fn listed_blocks(group: &RenderNode) -> Vec<BlockId> {
    group
        .iter()
        .filter_map(|item| match item.action_ref() {
            Some(Action::Select(node)) if node.is_block() => node.block_id(),
            _ => None,
        })
        .collect()
}

fn construct_count(items: &[Sketch]) -> usize {
    items
        .iter()
        .map(|item| match item {
            Sketch::Print(_) | Sketch::Set(_) => 0,
            Sketch::Repeat { body, .. } | Sketch::While { body } => 1 + construct_count(body),
            Sketch::If { arms, otherwise } => {
                1 + arms.iter().map(|arm| construct_count(arm)).sum::<usize>()
                    + otherwise.as_deref().map_or(0, construct_count)
            }
        })
        .sum()
}

fn root_of(canvas: &MockCanvas, id: BlockId) -> BlockId {
    let mut current = id;
    while let Some(parent) = canvas.parent_block(current) {
        current = parent;
    }
    current
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Stacks listed once, in order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn every_stack_listed_once(stacks in program()) {
        let (canvas, heads) = build(&stacks);
        let view = LinearizationEngine::new().render(&canvas, &RenderContext::workspace());
        let listed: Vec<_> = view
            .list
            .children()
            .iter()
            .map(|group| group.action_ref().cloned())
            .collect();
        let expected: Vec<_> = heads
            .iter()
            .map(|head| Some(Action::Select(AstNode::stack(*head))))
            .collect();
        prop_assert_eq!(listed, expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Non-inline blocks listed once, under their owner
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn every_block_listed_once_in_its_stack(stacks in program()) {
        let (canvas, heads) = build(&stacks);
        let view = LinearizationEngine::new().render(&canvas, &RenderContext::workspace());

        let mut seen = HashSet::new();
        for (group, head) in view.list.children().iter().zip(&heads) {
            for block in listed_blocks(group) {
                prop_assert!(seen.insert(block), "{} listed twice", block);
                prop_assert_eq!(root_of(&canvas, block), *head);
            }
        }
        let expected: usize = stacks.iter().map(|stack| fixtures::count_all(stack)).sum();
        prop_assert_eq!(seen.len(), expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. One end label per construct
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn constructs_closed_once(stacks in program()) {
        let (canvas, _) = build(&stacks);
        let view = LinearizationEngine::new().render(&canvas, &RenderContext::workspace());
        let ends = view
            .list
            .iter()
            .filter(|item| item.item_flags().contains(ItemFlags::END_MARKER))
            .count();
        let expected: usize = stacks.iter().map(|stack| construct_count(stack)).sum();
        prop_assert_eq!(ends, expected);

        let quiet = RenderContext::workspace().with_end_labels(false);
        let view = LinearizationEngine::new().render(&canvas, &quiet);
        prop_assert!(view.list.iter().all(|item| !item.item_flags().contains(ItemFlags::END_MARKER)));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn render_is_deterministic(stacks in program()) {
        let (canvas, _) = build(&stacks);
        let engine = LinearizationEngine::new();
        let first = engine.render(&canvas, &RenderContext::workspace());
        let second = engine.render(&canvas, &RenderContext::workspace());
        prop_assert_eq!(first, second);
    }
}
