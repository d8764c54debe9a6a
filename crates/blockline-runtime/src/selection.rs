#![forbid(unsafe_code)]

//! Focused node, branch context, and the creation cooldown.
//!
//! # Event table
//!
//! | Event | Selection |
//! |---|---|
//! | block moved | the moved block, unless the cooldown is active (then ignored) |
//! | block created | the new subtree's root; the cooldown restarts |
//! | block deleted | cleared |
//! | load finished | cleared |
//! | canvas select | the clicked block |
//! | block changed, other UI | unchanged |
//!
//! Creating a block usually triggers a cascade of synthetic move events from
//! auto-layout. The cooldown keeps those from pulling focus away from the
//! block the user just created.

use blockline_core::{AstNode, BlockHost, BlockId, ChangeEvent, NodeKind};
use blockline_render::branch::branches;
use blockline_render::walk::focus_block;
use web_time::{Duration, Instant};

/// Default cooldown after block creation, in milliseconds.
pub const DEFAULT_COOLDOWN_MS: u64 = 300;

/// What [`SelectionState::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Unchanged,
    Selected(AstNode),
    Cleared,
    /// A move event arrived while the cooldown was active.
    Suppressed,
}

/// The single focused node.
///
/// `branch` is only meaningful while `selected` is a multi-branch block.
#[derive(Debug, Clone)]
pub struct SelectionState {
    selected: Option<AstNode>,
    branch: Option<usize>,
    cooldown_until: Option<Instant>,
    cooldown: Duration,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_COOLDOWN_MS))
    }
}

impl SelectionState {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            selected: None,
            branch: None,
            cooldown_until: None,
            cooldown,
        }
    }

    #[inline]
    #[must_use]
    pub fn selected(&self) -> Option<AstNode> {
        self.selected
    }

    #[inline]
    #[must_use]
    pub fn branch(&self) -> Option<usize> {
        self.branch
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether move events are currently suppressed.
    #[must_use]
    pub fn cooldown_active(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    /// Focus `node`. Selecting the workspace root clears the selection.
    pub fn select(&mut self, node: AstNode) {
        self.branch = None;
        self.selected = match node.kind() {
            NodeKind::Workspace => None,
            _ => Some(node),
        };
    }

    /// Focus one branch of a multi-branch block.
    pub fn select_branch(&mut self, block: BlockId, index: usize) {
        self.selected = Some(AstNode::block(block));
        self.branch = Some(index);
    }

    /// Clear the selection and the cooldown.
    pub fn clear(&mut self) {
        self.selected = None;
        self.branch = None;
        self.cooldown_until = None;
    }

    /// Update the selection for one host event.
    pub fn apply(&mut self, event: &ChangeEvent, now: Instant) -> SelectionChange {
        let change = match event {
            ChangeEvent::BlockMove { block } => {
                if self.cooldown_active(now) {
                    SelectionChange::Suppressed
                } else {
                    self.select(AstNode::block(*block));
                    SelectionChange::Selected(AstNode::block(*block))
                }
            }
            ChangeEvent::BlockCreate { blocks } => {
                self.cooldown_until = Some(now + self.cooldown);
                match blocks.first() {
                    Some(root) => {
                        self.select(AstNode::block(*root));
                        SelectionChange::Selected(AstNode::block(*root))
                    }
                    None => SelectionChange::Unchanged,
                }
            }
            ChangeEvent::BlockDelete { .. } | ChangeEvent::FinishedLoading => {
                self.clear();
                SelectionChange::Cleared
            }
            ChangeEvent::UiSelect { block } => {
                self.select(AstNode::block(*block));
                SelectionChange::Selected(AstNode::block(*block))
            }
            ChangeEvent::BlockChange { .. } | ChangeEvent::Ui => SelectionChange::Unchanged,
        };
        tracing::debug!(
            category = event.category().as_str(),
            change = ?change,
            "selection.apply"
        );
        change
    }

    /// Drop a selection whose block is gone, and a branch index the block no
    /// longer has. Returns `true` if anything was dropped.
    pub fn retain_existing<H: BlockHost + ?Sized>(&mut self, host: &H) -> bool {
        let Some(node) = self.selected else {
            return false;
        };
        let Some(info) = focus_block(host, &node).and_then(|id| host.block(id)) else {
            tracing::debug!(%node, "selection.stale");
            self.selected = None;
            self.branch = None;
            return true;
        };
        if let Some(index) = self.branch {
            let valid = info.construct.is_multi_branch() && index < branches(host, &info).len();
            if !valid {
                self.branch = None;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockline_harness::{MockCanvas, fixtures};

    fn moved(id: u32) -> ChangeEvent {
        ChangeEvent::BlockMove { block: BlockId(id) }
    }

    fn created(id: u32) -> ChangeEvent {
        ChangeEvent::BlockCreate {
            blocks: vec![BlockId(id), BlockId(id + 1)],
        }
    }

    #[test]
    fn move_selects_moved_block() {
        let mut state = SelectionState::default();
        let change = state.apply(&moved(3), Instant::now());
        assert_eq!(change, SelectionChange::Selected(AstNode::block(BlockId(3))));
        assert_eq!(state.selected(), Some(AstNode::block(BlockId(3))));
    }

    #[test]
    fn creation_cooldown_suppresses_moves() {
        let mut state = SelectionState::new(Duration::from_millis(300));
        let t0 = Instant::now();
        state.apply(&created(7), t0);
        assert_eq!(state.selected(), Some(AstNode::block(BlockId(7))));

        let change = state.apply(&moved(2), t0 + Duration::from_millis(120));
        assert_eq!(change, SelectionChange::Suppressed);
        assert_eq!(state.selected(), Some(AstNode::block(BlockId(7))));

        state.apply(&moved(2), t0 + Duration::from_millis(300));
        assert_eq!(state.selected(), Some(AstNode::block(BlockId(2))));
    }

    #[test]
    fn second_creation_restarts_cooldown() {
        let mut state = SelectionState::new(Duration::from_millis(100));
        let t0 = Instant::now();
        state.apply(&created(1), t0);
        state.apply(&created(5), t0 + Duration::from_millis(80));
        assert!(state.cooldown_active(t0 + Duration::from_millis(150)));
        assert!(!state.cooldown_active(t0 + Duration::from_millis(180)));
    }

    #[test]
    fn delete_and_load_clear() {
        let now = Instant::now();
        for event in [
            ChangeEvent::BlockDelete {
                blocks: vec![BlockId(1)],
            },
            ChangeEvent::FinishedLoading,
        ] {
            let mut state = SelectionState::default();
            state.select_branch(BlockId(1), 1);
            assert_eq!(state.apply(&event, now), SelectionChange::Cleared);
            assert_eq!(state.selected(), None);
            assert_eq!(state.branch(), None);
        }
    }

    #[test]
    fn canvas_click_selects_even_during_cooldown() {
        let mut state = SelectionState::default();
        let now = Instant::now();
        state.apply(&created(1), now);
        state.apply(&ChangeEvent::UiSelect { block: BlockId(9) }, now);
        assert_eq!(state.selected(), Some(AstNode::block(BlockId(9))));
    }

    #[test]
    fn unrelated_events_leave_selection() {
        let mut state = SelectionState::default();
        state.select(AstNode::block(BlockId(4)));
        let now = Instant::now();
        assert_eq!(state.apply(&ChangeEvent::Ui, now), SelectionChange::Unchanged);
        assert_eq!(
            state.apply(&ChangeEvent::BlockChange { block: BlockId(8) }, now),
            SelectionChange::Unchanged
        );
        assert_eq!(state.selected(), Some(AstNode::block(BlockId(4))));
    }

    #[test]
    fn selecting_workspace_clears() {
        let mut state = SelectionState::default();
        state.select(AstNode::block(BlockId(4)));
        state.select(AstNode::workspace());
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn stale_block_and_branch_are_dropped() {
        let mut canvas = MockCanvas::new();
        let program = fixtures::sample_program(&mut canvas);
        let mut state = SelectionState::default();

        state.select_branch(program.branch, 2);
        assert!(!state.retain_existing(&canvas));
        state.select_branch(program.branch, 3);
        assert!(state.retain_existing(&canvas));
        assert_eq!(state.selected(), Some(AstNode::block(program.branch)));
        assert_eq!(state.branch(), None);

        state.select(AstNode::block(BlockId(9_999)));
        assert!(state.retain_existing(&canvas));
        assert_eq!(state.selected(), None);
    }
}
