#![forbid(unsafe_code)]

//! The accessible render tree.
//!
//! A [`RenderNode`] is a labelled item with an accessible [`Role`], an
//! optional colour, an optional editable [`Control`], and an optional
//! [`Action`] performed when the item is activated. Trees are rebuilt from
//! scratch on every render and never mutated after publication.
//!
//! # Example
//!
//! ```
//! use blockline_render::render_node::{RenderNode, Role};
//!
//! let list = RenderNode::new("Workspace", Role::Tree)
//!     .child(RenderNode::new("Stack A", Role::Group)
//!         .child(RenderNode::new("print hello", Role::TreeItem)));
//!
//! assert_eq!(list.outline(), "Workspace\n  Stack A\n    print hello\n");
//! assert_eq!(list.len(), 3);
//! ```

use crate::color::Rgb;
use bitflags::bitflags;
use blockline_core::{AstNode, BlockId, DropdownOption, FieldId, MutatorChange};

/// Accessible role of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Root of the main list.
    Tree,
    /// A labelled group (stack, branch section, body).
    Group,
    /// A block entry.
    TreeItem,
    Heading,
    Button,
    Link,
    /// Static text (labels, end markers, placeholders).
    Text,
    TextBox,
    SpinButton,
    ComboBox,
    CheckBox,
    /// Root of the breadcrumb trail.
    Navigation,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Group => "group",
            Self::TreeItem => "treeitem",
            Self::Heading => "heading",
            Self::Button => "button",
            Self::Link => "link",
            Self::Text => "text",
            Self::TextBox => "textbox",
            Self::SpinButton => "spinbutton",
            Self::ComboBox => "combobox",
            Self::CheckBox => "checkbox",
            Self::Navigation => "navigation",
        }
    }

    /// Whether items with this role accept activation.
    #[must_use]
    pub const fn is_interactive(self) -> bool {
        !matches!(self, Self::Tree | Self::Group | Self::Heading | Self::Text | Self::Navigation)
    }
}

bitflags! {
    /// Per-item presentation state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ItemFlags: u8 {
        /// The item represents the current selection.
        const SELECTED     = 0b0000_0001;
        /// The block currently held for a move.
        const MOVE_SOURCE  = 0b0000_0010;
        /// A control that drops the held block here.
        const INSERT_POINT = 0b0000_0100;
        /// A nested value expression shown inline.
        const INLINE       = 0b0000_1000;
        /// Carries an editable control.
        const EDITABLE     = 0b0001_0000;
        /// Stands in for missing content.
        const PLACEHOLDER  = 0b0010_0000;
        /// Closing boundary of a nesting construct.
        const END_MARKER   = 0b0100_0000;
    }
}

/// Editable control descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Text { field: FieldId, value: String },
    Number { field: FieldId, value: String },
    Dropdown {
        field: FieldId,
        selected: String,
        options: Vec<DropdownOption>,
    },
    Checkbox { field: FieldId, checked: bool },
    /// Editable name of a function argument.
    ArgumentName {
        block: BlockId,
        index: usize,
        value: String,
    },
}

impl Control {
    /// The field edited by this control, when it edits a field.
    #[must_use]
    pub fn field(&self) -> Option<FieldId> {
        match self {
            Self::Text { field, .. }
            | Self::Number { field, .. }
            | Self::Dropdown { field, .. }
            | Self::Checkbox { field, .. } => Some(*field),
            Self::ArgumentName { .. } => None,
        }
    }
}

/// What activating an item does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Show the whole workspace.
    SelectWorkspace,
    /// Focus a node.
    Select(AstNode),
    /// Focus one branch of a multi-branch block.
    SelectBranch { block: BlockId, index: usize },
    /// Hold a block for moving.
    PickUp(AstNode),
    /// Drop the held block onto a connection.
    PlaceAt(AstNode),
    /// Detach a block from its predecessor.
    Disconnect(AstNode),
    Duplicate(BlockId),
    Delete(BlockId),
    Mutate { block: BlockId, change: MutatorChange },
    /// Drop whatever the joiner holds.
    CancelMove,
}

/// One item of the accessible render tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderNode {
    label: String,
    role: Role,
    color: Option<Rgb>,
    control: Option<Control>,
    action: Option<Action>,
    flags: ItemFlags,
    indent: u16,
    level: u16,
    children: Vec<RenderNode>,
}

impl RenderNode {
    #[must_use]
    pub fn new(label: impl Into<String>, role: Role) -> Self {
        Self {
            label: label.into(),
            role,
            color: None,
            control: None,
            action: None,
            flags: ItemFlags::empty(),
            indent: 0,
            level: 0,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn control(mut self, control: Control) -> Self {
        self.control = Some(control);
        self.flags |= ItemFlags::EDITABLE;
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: ItemFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Logical indentation inside a flat list.
    #[must_use]
    pub fn indent(mut self, indent: u16) -> Self {
        self.indent = indent;
        self
    }

    #[must_use]
    pub fn child(mut self, node: RenderNode) -> Self {
        self.children.push(node);
        self
    }

    #[must_use]
    pub fn with_children(mut self, nodes: Vec<RenderNode>) -> Self {
        self.children = nodes;
        self
    }

    pub fn push(&mut self, node: RenderNode) {
        self.children.push(node);
    }

    pub fn extend(&mut self, nodes: impl IntoIterator<Item = RenderNode>) {
        self.children.extend(nodes);
    }

    // ── Accessors ───────────────────────────────────────────────────────

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn color_value(&self) -> Option<Rgb> {
        self.color
    }

    #[must_use]
    pub fn control_ref(&self) -> Option<&Control> {
        self.control.as_ref()
    }

    #[must_use]
    pub fn action_ref(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn item_flags(&self) -> ItemFlags {
        self.flags
    }

    #[inline]
    #[must_use]
    pub fn indent_level(&self) -> u16 {
        self.indent
    }

    /// Presentation level assigned by [`assign_levels`](Self::assign_levels).
    #[inline]
    #[must_use]
    pub fn level(&self) -> u16 {
        self.level
    }

    #[must_use]
    pub fn children(&self) -> &[RenderNode] {
        &self.children
    }

    /// Total nodes in this subtree, including `self`.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(RenderNode::len).sum::<usize>()
    }

    /// Always `false`: a node counts itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    // ── Traversal ───────────────────────────────────────────────────────

    /// Pre-order iterator over this subtree, `self` first.
    pub fn iter(&self) -> impl Iterator<Item = &RenderNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Labels of all descendants in pre-order, excluding `self`.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.iter().skip(1).map(RenderNode::label).collect()
    }

    /// First node in pre-order whose label equals `label`.
    #[must_use]
    pub fn find(&self, label: &str) -> Option<&RenderNode> {
        self.iter().find(|node| node.label == label)
    }

    /// First node in pre-order carrying `action`.
    #[must_use]
    pub fn find_action(&self, action: &Action) -> Option<&RenderNode> {
        self.iter().find(|node| node.action.as_ref() == Some(action))
    }

    /// Indented text rendering: two spaces per tree depth plus indent.
    #[must_use]
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(0, &mut out);
        out
    }

    fn write_outline(&self, depth: usize, out: &mut String) {
        let pad = depth + usize::from(self.indent);
        for _ in 0..pad {
            out.push_str("  ");
        }
        out.push_str(&self.label);
        out.push('\n');
        for child in &self.children {
            child.write_outline(depth + 1, out);
        }
    }

    /// Presentation pass: every node's level becomes its tree depth plus its
    /// logical indent, starting from `base` at `self`.
    pub fn assign_levels(&mut self, base: u16) {
        self.level = base.saturating_add(self.indent);
        for child in &mut self.children {
            child.assign_levels(base.saturating_add(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RenderNode {
        RenderNode::new("root", Role::Tree)
            .child(
                RenderNode::new("a", Role::Group)
                    .child(RenderNode::new("a1", Role::TreeItem))
                    .child(RenderNode::new("a2", Role::TreeItem).indent(1)),
            )
            .child(RenderNode::new("b", Role::Button).action(Action::CancelMove))
    }

    #[test]
    fn preorder_labels() {
        assert_eq!(sample().labels(), ["a", "a1", "a2", "b"]);
        assert_eq!(sample().len(), 5);
    }

    #[test]
    fn outline_uses_depth_and_indent() {
        assert_eq!(sample().outline(), "root\n  a\n    a1\n      a2\n  b\n");
    }

    #[test]
    fn assign_levels_adds_indent() {
        let mut tree = sample();
        tree.assign_levels(0);
        let a2 = tree.find("a2").unwrap();
        assert_eq!(a2.level(), 3);
        assert_eq!(tree.find("b").unwrap().level(), 1);
    }

    #[test]
    fn control_marks_item_editable() {
        let node = RenderNode::new("n", Role::SpinButton).control(Control::Number {
            field: FieldId(1),
            value: "3".into(),
        });
        assert!(node.item_flags().contains(ItemFlags::EDITABLE));
        assert_eq!(node.control_ref().and_then(Control::field), Some(FieldId(1)));
    }

    #[test]
    fn find_action_locates_button() {
        let tree = sample();
        assert_eq!(tree.find_action(&Action::CancelMove).map(RenderNode::label), Some("b"));
        assert!(!Role::Text.is_interactive());
        assert!(Role::Button.is_interactive());
    }
}
