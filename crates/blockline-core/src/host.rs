#![forbid(unsafe_code)]

//! The host canvas interface.
//!
//! [`BlockHost`] is everything the overlay needs from the block canvas it
//! sits on: enumeration and lookup, cursor movement, and the handful of
//! mutations the linear view can trigger. The overlay only reads host state
//! while rendering and only mutates it through these methods.
//!
//! # Cursor shape
//!
//! Implementations must expose the tree with this shape:
//!
//! - `Workspace` children are `Stack` nodes, one per top block, in canvas order.
//! - A `Stack`'s first child is the `Block` node of its top block. Blocks of
//!   one statement sequence are siblings.
//! - A `Block`'s children are its `Field` nodes, then the `Input` nodes of its
//!   value and statement inputs, then its `Next` node when it has a next
//!   connection.
//! - An `Input`'s first child is the `Block` node of the attached block.
//! - `parent` inverts `first_child`: the parent of any block in a sequence is
//!   the `Input` or `Stack` holding that sequence.
//!
//! Structural ownership is separate from cursor shape: [`BlockHost::parent_block`]
//! returns the block a block is *attached to* (its predecessor in a sequence,
//! or the owner of the input holding it).

use crate::ast::{AstNode, BlockId, ConnectionId, FieldId, NodeKind};
use crate::block::{
    BlockInfo, ConnectionInfo, ConnectionKind, DropdownOption, FieldInfo, MutatorChange,
};
use crate::error::{ConnectError, HostError};
use crate::event::ChangeSender;

/// Cursor kind used for a connection of the given role.
#[must_use]
pub const fn node_kind_for(kind: ConnectionKind) -> NodeKind {
    match kind {
        ConnectionKind::Previous => NodeKind::Previous,
        ConnectionKind::Next => NodeKind::Next,
        ConnectionKind::Output => NodeKind::Output,
        ConnectionKind::Value | ConnectionKind::Statement => NodeKind::Input,
    }
}

/// Operations the overlay requires from the host canvas.
pub trait BlockHost {
    // ── Workspace ───────────────────────────────────────────────────────

    /// Top blocks in canvas order.
    fn top_blocks(&self) -> Vec<BlockId>;

    /// Every block in the workspace, shadows included.
    fn all_blocks(&self) -> Vec<BlockId>;

    /// Look up a block by identity.
    fn block(&self, id: BlockId) -> Option<BlockInfo>;

    /// Whether the block exists.
    fn contains_block(&self, id: BlockId) -> bool {
        self.block(id).is_some()
    }

    /// Register the overlay's change listener.
    fn subscribe(&mut self, sender: ChangeSender);

    // ── Cursor construction ─────────────────────────────────────────────

    /// Cursor at the workspace root.
    fn workspace_node(&self) -> AstNode {
        AstNode::workspace()
    }

    /// Cursor at a block.
    fn block_node(&self, id: BlockId) -> Option<AstNode> {
        self.contains_block(id).then(|| AstNode::block(id))
    }

    /// Cursor at a connection.
    fn connection_node(&self, id: ConnectionId) -> Option<AstNode> {
        let info = self.connection(id)?;
        AstNode::connection(node_kind_for(info.kind), id)
    }

    // ── Cursor movement ─────────────────────────────────────────────────

    fn next_sibling(&self, node: &AstNode) -> Option<AstNode>;

    fn prev_sibling(&self, node: &AstNode) -> Option<AstNode>;

    fn first_child(&self, node: &AstNode) -> Option<AstNode>;

    fn parent(&self, node: &AstNode) -> Option<AstNode>;

    /// Cursor ancestors, nearest first, ending at the workspace.
    fn ancestors(&self, node: &AstNode) -> Vec<AstNode> {
        let mut chain = Vec::new();
        let mut current = self.parent(node);
        while let Some(ancestor) = current {
            current = self.parent(&ancestor);
            chain.push(ancestor);
        }
        chain
    }

    // ── Blocks ──────────────────────────────────────────────────────────

    /// The block this block is attached to, if any.
    fn parent_block(&self, id: BlockId) -> Option<BlockId>;

    /// Blocks attached directly below this block (inputs and next).
    fn child_blocks(&self, id: BlockId) -> Vec<BlockId>;

    fn dispose(&mut self, id: BlockId) -> Result<(), HostError>;

    /// Copy a block and everything attached under it. Returns the copy's id.
    fn duplicate(&mut self, id: BlockId) -> Result<BlockId, HostError>;

    fn move_by(&mut self, id: BlockId, dx: i32, dy: i32) -> Result<(), HostError>;

    /// Ask the host to push unconnected neighbours away from the block.
    fn bump_neighbours(&mut self, id: BlockId) -> Result<(), HostError>;

    fn mutate(&mut self, id: BlockId, change: &MutatorChange) -> Result<(), HostError>;

    // ── Connections ─────────────────────────────────────────────────────

    fn connection(&self, id: ConnectionId) -> Option<ConnectionInfo>;

    /// Attach `attach` to `target`. Anything previously attached to `target`
    /// is displaced according to host rules.
    fn connect(&mut self, target: ConnectionId, attach: ConnectionId) -> Result<(), ConnectError>;

    fn disconnect(&mut self, id: ConnectionId) -> Result<(), HostError>;

    // ── Fields ──────────────────────────────────────────────────────────

    fn field(&self, id: FieldId) -> Option<FieldInfo>;

    fn set_field_value(&mut self, id: FieldId, value: &str) -> Result<(), HostError>;

    /// Set display text. Hosts whose fields derive text from value can keep
    /// the default.
    fn set_field_text(&mut self, id: FieldId, text: &str) -> Result<(), HostError> {
        self.set_field_value(id, text)
    }

    fn dropdown_options(&self, id: FieldId) -> Vec<DropdownOption>;

    // ── View ────────────────────────────────────────────────────────────

    /// Reload the whole host view. Last-resort recovery after a cyclic fault.
    fn reload_view(&mut self);
}
