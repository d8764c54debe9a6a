#![forbid(unsafe_code)]

//! Value-typed cursor over the host's block tree.
//!
//! An [`AstNode`] names one position in the tree: the workspace itself, a
//! stack, a block, one of a block's connections, or one of its fields. It
//! holds no references into the host, so it is `Copy`, hashable, and safe to
//! store across render cycles. Two nodes are the same position exactly when
//! they compare equal.
//!
//! Movement (next/previous sibling, first child, parent) is performed by the
//! host through [`BlockHost`](crate::host::BlockHost); this module only
//! describes positions.

use std::fmt;

/// Stable identity of a block, issued by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// Stable identity of a connection point, issued by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

/// Stable identity of an editable or static field, issued by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block#{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field#{}", self.0)
    }
}

/// Position type of an [`AstNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The whole canvas.
    Workspace,
    /// A top-level sequence; located at its top block.
    Stack,
    /// A block.
    Block,
    /// A value or statement input of a block; located at the input connection.
    Input,
    /// A field on a block.
    Field,
    /// A block's successor-facing statement connection.
    Next,
    /// A block's predecessor-facing statement connection.
    Previous,
    /// A block's value output connection.
    Output,
}

impl NodeKind {
    /// Whether nodes of this kind are located at a connection.
    #[must_use]
    pub const fn is_connection(self) -> bool {
        matches!(self, Self::Input | Self::Next | Self::Previous | Self::Output)
    }

    /// Short lowercase name, used in logs and outlines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Stack => "stack",
            Self::Block => "block",
            Self::Input => "input",
            Self::Field => "field",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Output => "output",
        }
    }
}

/// The concrete host entity a node is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Workspace,
    Block(BlockId),
    Connection(ConnectionId),
    Field(FieldId),
}

/// What an [`AstNode`] points at, by capability.
///
/// This is the classification the block joiner uses: block-like entities can
/// be moved, connection-like entities can receive a moved block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Workspace,
    Block(BlockId),
    Connection(ConnectionId),
    Field(FieldId),
}

/// A position in the block tree.
///
/// # Invariants
///
/// - `Workspace` nodes are located at [`Location::Workspace`].
/// - `Stack` and `Block` nodes are located at a block.
/// - `Input`, `Next`, `Previous` and `Output` nodes are located at a connection.
/// - `Field` nodes are located at a field.
///
/// The constructors below are the only way to build a node, so the pairing is
/// always consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AstNode {
    kind: NodeKind,
    location: Location,
}

impl AstNode {
    /// The workspace root.
    #[must_use]
    pub const fn workspace() -> Self {
        Self {
            kind: NodeKind::Workspace,
            location: Location::Workspace,
        }
    }

    /// The stack whose top block is `top`.
    #[must_use]
    pub const fn stack(top: BlockId) -> Self {
        Self {
            kind: NodeKind::Stack,
            location: Location::Block(top),
        }
    }

    /// A block position.
    #[must_use]
    pub const fn block(id: BlockId) -> Self {
        Self {
            kind: NodeKind::Block,
            location: Location::Block(id),
        }
    }

    /// A field position.
    #[must_use]
    pub const fn field(id: FieldId) -> Self {
        Self {
            kind: NodeKind::Field,
            location: Location::Field(id),
        }
    }

    /// A connection position of the given kind.
    ///
    /// Returns `None` when `kind` is not a connection kind.
    #[must_use]
    pub const fn connection(kind: NodeKind, id: ConnectionId) -> Option<Self> {
        if kind.is_connection() {
            Some(Self {
                kind,
                location: Location::Connection(id),
            })
        } else {
            None
        }
    }

    /// Position type.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Anchor in the host.
    #[inline]
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// The entity this node points at.
    #[must_use]
    pub const fn entity(&self) -> Entity {
        match self.location {
            Location::Workspace => Entity::Workspace,
            Location::Block(id) => Entity::Block(id),
            Location::Connection(id) => Entity::Connection(id),
            Location::Field(id) => Entity::Field(id),
        }
    }

    /// The block this node is located at, for `Stack` and `Block` nodes.
    #[must_use]
    pub const fn block_id(&self) -> Option<BlockId> {
        match self.location {
            Location::Block(id) => Some(id),
            _ => None,
        }
    }

    /// The connection this node is located at, for connection nodes.
    #[must_use]
    pub const fn connection_id(&self) -> Option<ConnectionId> {
        match self.location {
            Location::Connection(id) => Some(id),
            _ => None,
        }
    }

    /// The field this node is located at, for `Field` nodes.
    #[must_use]
    pub const fn field_id(&self) -> Option<FieldId> {
        match self.location {
            Location::Field(id) => Some(id),
            _ => None,
        }
    }

    /// `true` for `Block` nodes.
    #[inline]
    #[must_use]
    pub const fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Block)
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Location::Workspace => f.write_str("workspace"),
            Location::Block(id) => write!(f, "{}({id})", self.kind.as_str()),
            Location::Connection(id) => write!(f, "{}({id})", self.kind.as_str()),
            Location::Field(id) => write!(f, "{}({id})", self.kind.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_constructor_rejects_non_connection_kinds() {
        let id = ConnectionId(3);
        assert!(AstNode::connection(NodeKind::Block, id).is_none());
        assert!(AstNode::connection(NodeKind::Field, id).is_none());
        assert!(AstNode::connection(NodeKind::Workspace, id).is_none());
        let next = AstNode::connection(NodeKind::Next, id).unwrap();
        assert_eq!(next.kind(), NodeKind::Next);
        assert_eq!(next.connection_id(), Some(id));
    }

    #[test]
    fn stack_and_block_share_location_but_differ_in_identity() {
        let stack = AstNode::stack(BlockId(1));
        let block = AstNode::block(BlockId(1));
        assert_eq!(stack.location(), block.location());
        assert_ne!(stack, block);
        assert_eq!(stack.entity(), Entity::Block(BlockId(1)));
    }

    #[test]
    fn display_is_kind_and_anchor() {
        assert_eq!(AstNode::workspace().to_string(), "workspace");
        assert_eq!(AstNode::block(BlockId(7)).to_string(), "block(block#7)");
        assert_eq!(AstNode::field(FieldId(2)).to_string(), "field(field#2)");
    }
}
