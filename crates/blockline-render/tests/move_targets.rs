//! Drop targets and navigation links in rendered views.

use blockline_core::{AstNode, BlockHost, NodeKind};
use blockline_harness::{MockCanvas, fixtures};
use blockline_render::node_renderer::{EMPTY, GO_BACK, INSERT_HERE};
use blockline_render::{Action, ItemFlags, Linearization, LinearizationEngine, RenderContext, Role};

/// if / else if / else with both conditional arms filled and the else empty.
fn three_branch(canvas: &mut MockCanvas) -> blockline_core::BlockId {
    let cond = fixtures::conditional(canvas, 1, true);
    for (index, message) in ["small", "medium"].into_iter().enumerate() {
        let lhs = fixtures::less_than(canvas, "x", index as f64 + 2.0);
        canvas.attach_input(cond, &format!("IF{index}"), lhs).unwrap();
        let body = fixtures::print_text(canvas, message);
        canvas.attach_input(cond, &format!("DO{index}"), body).unwrap();
    }
    cond
}

/// Render the view a `Select*` action leads to.
fn follow(canvas: &MockCanvas, action: &Action) -> Linearization {
    let ctx = match action {
        Action::SelectWorkspace => RenderContext::workspace(),
        Action::Select(node) => RenderContext::focused(*node),
        Action::SelectBranch { block, index } => {
            RenderContext::focused(AstNode::block(*block)).with_branch(Some(*index))
        }
        other => panic!("not a navigation action: {other:?}"),
    };
    LinearizationEngine::new().render(canvas, &ctx)
}

#[test]
fn empty_else_offers_insert_while_moving() {
    let mut canvas = MockCanvas::new();
    let cond = three_branch(&mut canvas);
    let held = fixtures::print_text(&mut canvas, "moving");
    let else_slot = AstNode::connection(NodeKind::Input, canvas.input_connection(cond, "ELSE").unwrap())
        .unwrap();

    let ctx = RenderContext::workspace().with_move(Some(AstNode::block(held)), true);
    let view = LinearizationEngine::new().render(&canvas, &ctx);
    let stack = &view.list.children()[0];
    let labels: Vec<_> = stack.children().iter().map(|item| item.label()).collect();
    assert_eq!(
        labels,
        [
            "if x < 2 else if x < 3",
            "if x < 2",
            "print small",
            "else if x < 3",
            "print medium",
            "else",
            INSERT_HERE,
            "end if",
        ]
    );
    let insert = stack.find(INSERT_HERE).unwrap();
    assert_eq!(insert.action_ref(), Some(&Action::PlaceAt(else_slot)));
    assert!(insert.item_flags().contains(ItemFlags::INSERT_POINT));

    let ctx = RenderContext::focused(AstNode::block(cond)).with_move(Some(AstNode::block(held)), true);
    let view = LinearizationEngine::new().render(&canvas, &ctx);
    let otherwise = view
        .list
        .children()
        .iter()
        .find(|node| node.role() == Role::Group && node.label() == "else")
        .unwrap();
    assert_eq!(otherwise.labels(), [INSERT_HERE]);
}

#[test]
fn empty_else_is_placeholder_when_idle() {
    let mut canvas = MockCanvas::new();
    let cond = three_branch(&mut canvas);
    let view = LinearizationEngine::new().render(&canvas, &RenderContext::focused(AstNode::block(cond)));
    let otherwise = view
        .list
        .children()
        .iter()
        .find(|node| node.role() == Role::Group && node.label() == "else")
        .unwrap();
    assert_eq!(otherwise.labels(), [EMPTY]);
    assert!(view.list.find(INSERT_HERE).is_none());
}

#[test]
fn held_block_offers_cancel_and_others_offer_insertion() {
    let mut canvas = MockCanvas::new();
    let program = fixtures::sample_program(&mut canvas);
    let held = AstNode::block(program.stray);

    let ctx = RenderContext::focused(held).with_move(Some(held), true);
    let view = LinearizationEngine::new().render(&canvas, &ctx);
    assert!(view.list.find("cancel move").is_some());
    assert!(view.list.find("move").is_none());

    let ctx = RenderContext::focused(AstNode::block(program.repeat)).with_move(Some(held), true);
    let view = LinearizationEngine::new().render(&canvas, &ctx);
    let before = view.list.find("insert before").unwrap();
    let after = view.list.find("insert after").unwrap();
    let slot_above = canvas.next_connection(program.main).unwrap();
    assert_eq!(
        before.action_ref(),
        Some(&Action::PlaceAt(AstNode::connection(NodeKind::Next, slot_above).unwrap()))
    );
    let slot_below = canvas.next_connection(program.repeat).unwrap();
    assert_eq!(
        after.action_ref(),
        Some(&Action::PlaceAt(AstNode::connection(NodeKind::Next, slot_below).unwrap()))
    );
}

#[test]
fn go_back_returns_to_parent_view() {
    let mut canvas = MockCanvas::new();
    let chain = fixtures::nested_repeats(&mut canvas, 3);
    let engine = LinearizationEngine::new();

    let parent_view = engine.render(&canvas, &RenderContext::focused(AstNode::block(chain[1])));
    let child_view = engine.render(&canvas, &RenderContext::focused(AstNode::block(chain[2])));
    let back = child_view.list.find(GO_BACK).and_then(|node| node.action_ref()).unwrap();
    assert_eq!(back, &Action::Select(AstNode::block(chain[1])));
    assert_eq!(follow(&canvas, back), parent_view);
    assert_eq!(parent_view.focus, Some(chain[1]));
}

#[test]
fn go_back_from_stack_top_reaches_workspace() {
    let mut canvas = MockCanvas::new();
    let program = fixtures::sample_program(&mut canvas);
    let engine = LinearizationEngine::new();

    let workspace = engine.render(&canvas, &RenderContext::workspace());
    let view = engine.render(&canvas, &RenderContext::focused(AstNode::block(program.main)));
    let back = view.list.find(GO_BACK).and_then(|node| node.action_ref()).unwrap();
    assert_eq!(follow(&canvas, back), workspace);
}

#[test]
fn branch_round_trip_restores_whole_block() {
    let mut canvas = MockCanvas::new();
    let program = fixtures::sample_program(&mut canvas);
    let engine = LinearizationEngine::new();

    let whole = engine.render(&canvas, &RenderContext::focused(AstNode::block(program.branch)));
    let header = whole
        .list
        .find_action(&Action::SelectBranch {
            block: program.branch,
            index: 2,
        })
        .and_then(|node| node.action_ref())
        .unwrap();
    let narrowed = follow(&canvas, header);
    assert_eq!(narrowed.list.find("print large").map(|node| node.label()), Some("print large"));
    assert!(narrowed.list.find("print small").is_none());

    let back = narrowed.list.find(GO_BACK).and_then(|node| node.action_ref()).unwrap();
    assert_eq!(follow(&canvas, back), whole);
    assert!(canvas.contains_block(program.branch));
}
