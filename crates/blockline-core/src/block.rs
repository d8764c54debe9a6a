#![forbid(unsafe_code)]

//! Read-only snapshots of host entities: blocks, connections, fields, and
//! mutator metadata.
//!
//! The host owns and mutates the real objects; these structs are what the
//! overlay reads during one render cycle.

use crate::ast::{BlockId, ConnectionId, FieldId};

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// Nesting construct a block represents.
///
/// Every variant except [`Construct::Plain`] is a *named* nesting construct:
/// its closing boundary is announced with an `end ...` label in the linear
/// view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Construct {
    /// An ordinary statement or value block.
    #[default]
    Plain,
    /// If / else-if / else. The only multi-branch construct.
    Conditional,
    /// Repeat N times.
    Repeat,
    /// Counted or for-each loop.
    For,
    /// While / until loop.
    While,
    /// Function definition. `returns` marks definitions with a return value.
    Function { returns: bool },
}

impl Construct {
    /// Keyword used in `end ...` labels, or `None` for plain blocks.
    #[must_use]
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Conditional => Some("if"),
            Self::Repeat => Some("repeat"),
            Self::For => Some("for"),
            Self::While => Some("while"),
            Self::Function { .. } => Some("function"),
        }
    }

    /// Whether the construct is rendered as one section per branch.
    #[inline]
    #[must_use]
    pub const fn is_multi_branch(self) -> bool {
        matches!(self, Self::Conditional)
    }

    /// Whether the construct is a function definition with a return value.
    #[inline]
    #[must_use]
    pub const fn returns_value(self) -> bool {
        matches!(self, Self::Function { returns: true })
    }
}

/// Input slot kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Accepts a value block through its output connection.
    Value,
    /// Accepts a statement sequence through its previous connection.
    Statement,
    /// Holds fields only; has no connection.
    Dummy,
}

/// One input of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputInfo {
    /// Host-side name (`IF0`, `DO0`, `ELSE`, `RETURN`, ...).
    pub name: String,
    /// Human-readable label shown next to the input (`do`, `else`, `return`).
    pub label: String,
    pub kind: InputKind,
    /// Connection of value and statement inputs. `None` for dummy inputs.
    pub connection: Option<ConnectionId>,
    /// Marks the return-value input of a function definition.
    pub is_return: bool,
}

impl InputInfo {
    /// Whether this input exposes a connection the cursor can visit.
    #[must_use]
    pub fn is_connectable(&self) -> bool {
        self.connection.is_some() && !matches!(self.kind, InputKind::Dummy)
    }
}

/// Snapshot of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub id: BlockId,
    /// Human-readable description, including inline value descriptions.
    pub description: String,
    /// Category hue in degrees (0..360), if the block is coloured.
    pub hue: Option<u16>,
    pub construct: Construct,
    /// Shadow blocks are default-value placeholders rendered inline.
    pub shadow: bool,
    pub previous: Option<ConnectionId>,
    pub next: Option<ConnectionId>,
    pub output: Option<ConnectionId>,
    /// Inputs in display order.
    pub inputs: Vec<InputInfo>,
    /// Fields in display order, across all inputs.
    pub fields: Vec<FieldId>,
    pub mutator: Option<MutatorInfo>,
}

impl BlockInfo {
    /// Value and statement inputs, in order.
    pub fn connectable_inputs(&self) -> impl Iterator<Item = &InputInfo> {
        self.inputs.iter().filter(|input| input.is_connectable())
    }

    /// Statement inputs, in order.
    pub fn statement_inputs(&self) -> impl Iterator<Item = &InputInfo> {
        self.inputs
            .iter()
            .filter(|input| matches!(input.kind, InputKind::Statement))
    }

    /// The return-value input of a function definition.
    #[must_use]
    pub fn return_input(&self) -> Option<&InputInfo> {
        self.inputs.iter().find(|input| input.is_return)
    }

    /// Whether the block has any statement input.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.statement_inputs().next().is_some()
    }
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// Role of a connection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    /// Predecessor-facing statement connection (top of a block).
    Previous,
    /// Successor-facing statement connection (bottom of a block).
    Next,
    /// Value output of an expression block.
    Output,
    /// Value input slot.
    Value,
    /// Statement input slot.
    Statement,
}

impl ConnectionKind {
    /// Whether "advance" on this connection means moving to the next sibling.
    ///
    /// Successor-style and input connections advance forward; predecessor
    /// and output connections point back up the tree.
    #[must_use]
    pub const fn advances_forward(self) -> bool {
        matches!(self, Self::Next | Self::Value | Self::Statement)
    }
}

/// Snapshot of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub kind: ConnectionKind,
    /// Block the connection belongs to.
    pub owner: BlockId,
    /// Connection on the other side, when attached.
    pub target: Option<ConnectionId>,
}

impl ConnectionInfo {
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Editing capability of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Static text.
    Label,
    /// Free text input.
    Text,
    /// Numeric input.
    Number,
    /// Choice among fixed options.
    Dropdown,
    /// Boolean toggle.
    Checkbox,
    /// Variable picker; options are the workspace's variable names.
    Variable,
}

/// Snapshot of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub id: FieldId,
    pub owner: BlockId,
    pub name: String,
    pub kind: FieldKind,
    /// Stored value (`"TRUE"`, `"42"`, an option key, ...).
    pub value: String,
    /// Display text for the value.
    pub text: String,
}

/// One selectable option of a dropdown or variable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownOption {
    pub text: String,
    pub value: String,
}

impl DropdownOption {
    #[must_use]
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Mutators
// ---------------------------------------------------------------------------

/// Shape metadata for blocks with a variable number of parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutatorInfo {
    /// Conditional with optional else-if arms and else arm.
    ElseIf { else_if_count: usize, has_else: bool },
    /// Function definition argument list.
    Arguments { names: Vec<String> },
    /// Variable-length item list (list/text builders).
    ItemCount { count: usize },
}

/// A shape change request forwarded to the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutatorChange {
    AddElseIf,
    RemoveElseIf,
    AddElse,
    RemoveElse,
    AddArgument,
    RemoveArgument,
    RenameArgument { index: usize, name: String },
    AddItem,
    RemoveItem,
}

impl MutatorChange {
    /// Label of the control that requests this change.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::AddElseIf => "add else if".to_string(),
            Self::RemoveElseIf => "remove else if".to_string(),
            Self::AddElse => "add else".to_string(),
            Self::RemoveElse => "remove else".to_string(),
            Self::AddArgument => "add argument".to_string(),
            Self::RemoveArgument => "remove last argument".to_string(),
            Self::RenameArgument { index, .. } => format!("argument {}", index + 1),
            Self::AddItem => "add item".to_string(),
            Self::RemoveItem => "remove last item".to_string(),
        }
    }
}

impl MutatorInfo {
    /// Add/remove changes currently available for this shape.
    #[must_use]
    pub fn available_changes(&self) -> Vec<MutatorChange> {
        match self {
            Self::ElseIf {
                else_if_count,
                has_else,
            } => {
                let mut changes = vec![MutatorChange::AddElseIf];
                if *else_if_count > 0 {
                    changes.push(MutatorChange::RemoveElseIf);
                }
                changes.push(if *has_else {
                    MutatorChange::RemoveElse
                } else {
                    MutatorChange::AddElse
                });
                changes
            }
            Self::Arguments { names } => {
                let mut changes = vec![MutatorChange::AddArgument];
                if !names.is_empty() {
                    changes.push(MutatorChange::RemoveArgument);
                }
                changes
            }
            Self::ItemCount { count } => {
                let mut changes = vec![MutatorChange::AddItem];
                if *count > 0 {
                    changes.push(MutatorChange::RemoveItem);
                }
                changes
            }
        }
    }
}
