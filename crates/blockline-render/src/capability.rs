#![forbid(unsafe_code)]

//! What a connection or field lets the user do.
//!
//! Rendering and the move protocol both dispatch on [`Capability`] with
//! exhaustive matches instead of probing entity types at each call site.

use blockline_core::{
    AstNode, BlockHost, ConnectionId, ConnectionInfo, ConnectionKind, FieldId, FieldInfo,
    FieldKind, Location,
};

/// Capability of a connection or field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Statement input: accepts a sequence.
    StatementConnection(ConnectionId),
    /// Value input: accepts an expression.
    ValueConnection(ConnectionId),
    /// Top of a statement block.
    PredecessorConnection(ConnectionId),
    /// Bottom of a statement block.
    SuccessorConnection(ConnectionId),
    /// Output of an expression block.
    OutputConnection(ConnectionId),
    LabelField(FieldId),
    TextField(FieldId),
    NumericField(FieldId),
    DropdownField(FieldId),
    CheckboxField(FieldId),
    VariableField(FieldId),
}

impl Capability {
    #[must_use]
    pub const fn of_connection(info: &ConnectionInfo) -> Self {
        match info.kind {
            ConnectionKind::Statement => Self::StatementConnection(info.id),
            ConnectionKind::Value => Self::ValueConnection(info.id),
            ConnectionKind::Previous => Self::PredecessorConnection(info.id),
            ConnectionKind::Next => Self::SuccessorConnection(info.id),
            ConnectionKind::Output => Self::OutputConnection(info.id),
        }
    }

    #[must_use]
    pub const fn of_field(info: &FieldInfo) -> Self {
        match info.kind {
            FieldKind::Label => Self::LabelField(info.id),
            FieldKind::Text => Self::TextField(info.id),
            FieldKind::Number => Self::NumericField(info.id),
            FieldKind::Dropdown => Self::DropdownField(info.id),
            FieldKind::Checkbox => Self::CheckboxField(info.id),
            FieldKind::Variable => Self::VariableField(info.id),
        }
    }

    /// Capability of the entity under a cursor, for connection and field nodes.
    pub fn of_node<H: BlockHost + ?Sized>(host: &H, node: &AstNode) -> Option<Self> {
        match node.location() {
            Location::Connection(id) => host.connection(id).map(|info| Self::of_connection(&info)),
            Location::Field(id) => host.field(id).map(|info| Self::of_field(&info)),
            Location::Workspace | Location::Block(_) => None,
        }
    }

    #[must_use]
    pub const fn connection(self) -> Option<ConnectionId> {
        match self {
            Self::StatementConnection(id)
            | Self::ValueConnection(id)
            | Self::PredecessorConnection(id)
            | Self::SuccessorConnection(id)
            | Self::OutputConnection(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn field(self) -> Option<FieldId> {
        match self {
            Self::LabelField(id)
            | Self::TextField(id)
            | Self::NumericField(id)
            | Self::DropdownField(id)
            | Self::CheckboxField(id)
            | Self::VariableField(id) => Some(id),
            _ => None,
        }
    }

    /// Whether "advance" from here moves forward through the tree.
    ///
    /// Successor and input connections advance forward; predecessor and
    /// output connections point back toward the parent. Fields never advance.
    #[must_use]
    pub const fn advances_forward(self) -> Option<bool> {
        match self {
            Self::SuccessorConnection(_) | Self::StatementConnection(_) | Self::ValueConnection(_) => {
                Some(true)
            }
            Self::PredecessorConnection(_) | Self::OutputConnection(_) => Some(false),
            _ => None,
        }
    }

    /// Spoken name of the role, for items that announce a slot rather than
    /// edit it.
    #[must_use]
    pub const fn role_name(self) -> &'static str {
        match self {
            Self::StatementConnection(_) => "statement slot",
            Self::ValueConnection(_) => "value slot",
            Self::PredecessorConnection(_) => "top of block",
            Self::SuccessorConnection(_) => "bottom of block",
            Self::OutputConnection(_) => "block output",
            Self::LabelField(_) => "label",
            Self::TextField(_) => "text",
            Self::NumericField(_) => "number",
            Self::DropdownField(_) => "choice",
            Self::CheckboxField(_) => "checkbox",
            Self::VariableField(_) => "variable",
        }
    }

    /// Whether the user can edit the field in place.
    #[must_use]
    pub const fn is_editable_field(self) -> bool {
        matches!(
            self,
            Self::TextField(_)
                | Self::NumericField(_)
                | Self::DropdownField(_)
                | Self::CheckboxField(_)
                | Self::VariableField(_)
        )
    }
}
