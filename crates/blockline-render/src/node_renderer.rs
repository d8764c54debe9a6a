#![forbid(unsafe_code)]

//! Conversion of single tree nodes into render items.
//!
//! [`NodeRenderer`] knows how one block, field, input slot, or branch header
//! looks in the linear view, given the current selection and move state. It
//! never walks the tree; that is the engine's job.

use crate::branch::Branch;
use crate::capability::Capability;
use crate::color::Rgb;
use crate::linearize::RenderContext;
use crate::render_node::{Action, Control, ItemFlags, RenderNode, Role};
use crate::walk::attached_block;
use blockline_core::{
    AstNode, BlockHost, BlockId, BlockInfo, ConnectionId, FieldInfo, InputInfo, MutatorInfo,
    NodeKind,
};

pub const GO_BACK: &str = "go back";
pub const INSERT_HERE: &str = "insert here";
pub const EMPTY: &str = "empty";
pub const WORKSPACE: &str = "Workspace";

/// Renders individual nodes for one render cycle.
pub struct NodeRenderer<'a, H: BlockHost + ?Sized> {
    host: &'a H,
    ctx: &'a RenderContext,
}

impl<'a, H: BlockHost + ?Sized> NodeRenderer<'a, H> {
    #[must_use]
    pub fn new(host: &'a H, ctx: &'a RenderContext) -> Self {
        Self { host, ctx }
    }

    fn state_flags(&self, node: AstNode) -> ItemFlags {
        let mut flags = ItemFlags::empty();
        if self.ctx.selected == Some(node) {
            flags |= ItemFlags::SELECTED;
        }
        if self.ctx.held == Some(node) {
            flags |= ItemFlags::MOVE_SOURCE;
        }
        flags
    }

    fn describe(info: &BlockInfo) -> String {
        if info.description.is_empty() {
            format!("unnamed {}", info.id)
        } else {
            info.description.clone()
        }
    }

    fn tint(node: RenderNode, info: &BlockInfo) -> RenderNode {
        match info.hue {
            Some(hue) => node.color(Rgb::from_hue(hue)),
            None => node,
        }
    }

    // ── Workspace-mode items ────────────────────────────────────────────

    /// Group for one top-level stack.
    #[must_use]
    pub fn stack_group(&self, marker: &str, top: BlockId) -> RenderNode {
        RenderNode::new(format!("Stack {marker}"), Role::Group)
            .action(Action::Select(AstNode::stack(top)))
    }

    /// List item for a root-owned block.
    #[must_use]
    pub fn block_item(&self, info: &BlockInfo, node: AstNode, indent: u16) -> RenderNode {
        let item = RenderNode::new(Self::describe(info), Role::TreeItem)
            .action(Action::Select(node))
            .flags(self.state_flags(node))
            .indent(indent);
        Self::tint(item, info)
    }

    /// `end <keyword>` marker.
    #[must_use]
    pub fn end_label(&self, keyword: &str, indent: u16) -> RenderNode {
        RenderNode::new(format!("end {keyword}"), Role::Text)
            .flags(ItemFlags::END_MARKER)
            .indent(indent)
    }

    /// Branch header carrying the branch's text.
    #[must_use]
    pub fn branch_header(&self, block: BlockId, branch: &Branch, indent: u16) -> RenderNode {
        let mut header = RenderNode::new(branch.text.clone(), Role::TreeItem)
            .action(Action::SelectBranch {
                block,
                index: branch.index,
            })
            .indent(indent);
        if self.ctx.selected == Some(AstNode::block(block)) && self.ctx.branch == Some(branch.index) {
            header = header.flags(ItemFlags::SELECTED);
        }
        header
    }

    /// Drop target for the held block.
    #[must_use]
    pub fn insert_here(&self, target: AstNode, indent: u16) -> RenderNode {
        RenderNode::new(INSERT_HERE, Role::Button)
            .action(Action::PlaceAt(target))
            .flags(ItemFlags::INSERT_POINT)
            .indent(indent)
    }

    #[must_use]
    pub fn placeholder(&self, text: impl Into<String>, indent: u16) -> RenderNode {
        RenderNode::new(text, Role::Text)
            .flags(ItemFlags::PLACEHOLDER)
            .indent(indent)
    }

    /// Content of an empty statement slot: a drop target while a move is
    /// pending, otherwise a placeholder.
    #[must_use]
    pub fn empty_body(&self, connection: ConnectionId, indent: u16) -> RenderNode {
        match self.input_node(connection) {
            Some(target) if self.ctx.move_pending => self.insert_here(target, indent),
            _ => self.placeholder(EMPTY, indent),
        }
    }

    fn input_node(&self, connection: ConnectionId) -> Option<AstNode> {
        AstNode::connection(NodeKind::Input, connection)
    }

    // ── Single-node items ───────────────────────────────────────────────

    #[must_use]
    pub fn go_back(&self, target: Action) -> RenderNode {
        RenderNode::new(GO_BACK, Role::Link).action(target)
    }

    #[must_use]
    pub fn heading(&self, info: &BlockInfo, node: AstNode) -> RenderNode {
        let heading = RenderNode::new(Self::describe(info), Role::Heading).flags(self.state_flags(node));
        Self::tint(heading, info)
    }

    /// Move, insert, disconnect, duplicate and delete controls for a block.
    #[must_use]
    pub fn block_actions(&self, info: &BlockInfo, node: AstNode) -> Vec<RenderNode> {
        let mut items = Vec::new();
        match self.ctx.held {
            Some(held) if held == node => {
                items.push(RenderNode::new("cancel move", Role::Button).action(Action::CancelMove));
            }
            Some(_) => {
                items.push(RenderNode::new("move", Role::Button).action(Action::PickUp(node)));
                if let Some(target) = self.insert_before_target(info) {
                    items.push(
                        RenderNode::new("insert before", Role::Button)
                            .action(Action::PlaceAt(target))
                            .flags(ItemFlags::INSERT_POINT),
                    );
                }
                if let Some(next) = info.next.and_then(|conn| AstNode::connection(NodeKind::Next, conn)) {
                    items.push(
                        RenderNode::new("insert after", Role::Button)
                            .action(Action::PlaceAt(next))
                            .flags(ItemFlags::INSERT_POINT),
                    );
                }
            }
            None => {
                items.push(RenderNode::new("move", Role::Button).action(Action::PickUp(node)));
            }
        }
        if self.is_attached(info) {
            items.push(RenderNode::new("disconnect", Role::Button).action(Action::Disconnect(node)));
        }
        items.push(RenderNode::new("duplicate", Role::Button).action(Action::Duplicate(info.id)));
        items.push(RenderNode::new("delete", Role::Button).action(Action::Delete(info.id)));
        items
    }

    /// Where a block lands to end up directly before `info`: the slot its
    /// previous connection is plugged into, or that connection itself for
    /// the head of a stack.
    fn insert_before_target(&self, info: &BlockInfo) -> Option<AstNode> {
        let previous = self.host.connection(info.previous?)?;
        match previous.target {
            Some(slot) => self.host.connection_node(slot),
            None => AstNode::connection(NodeKind::Previous, previous.id),
        }
    }

    fn is_attached(&self, info: &BlockInfo) -> bool {
        [info.previous, info.output]
            .into_iter()
            .flatten()
            .filter_map(|conn| self.host.connection(conn))
            .any(|conn| conn.is_connected())
    }

    /// Control for one field, chosen by its capability.
    #[must_use]
    pub fn field_control(&self, field: &FieldInfo, label: &str) -> RenderNode {
        let label = if label.is_empty() {
            field_label(field)
        } else {
            label.to_string()
        };
        match Capability::of_field(field) {
            Capability::LabelField(_) => RenderNode::new(field.text.clone(), Role::Text),
            Capability::TextField(id) => RenderNode::new(label, Role::TextBox).control(Control::Text {
                field: id,
                value: field.value.clone(),
            }),
            Capability::NumericField(id) => {
                RenderNode::new(label, Role::SpinButton).control(Control::Number {
                    field: id,
                    value: field.value.clone(),
                })
            }
            Capability::DropdownField(id) | Capability::VariableField(id) => {
                RenderNode::new(label, Role::ComboBox).control(Control::Dropdown {
                    field: id,
                    selected: field.value.clone(),
                    options: self.host.dropdown_options(id),
                })
            }
            Capability::CheckboxField(id) => {
                RenderNode::new(label, Role::CheckBox).control(Control::Checkbox {
                    field: id,
                    checked: field.value == "TRUE",
                })
            }
            other @ (Capability::StatementConnection(_)
            | Capability::ValueConnection(_)
            | Capability::PredecessorConnection(_)
            | Capability::SuccessorConnection(_)
            | Capability::OutputConnection(_)) => {
                RenderNode::new(format!("{label}: {}", other.role_name()), Role::Text)
            }
        }
    }

    /// Item for a value slot: the shadow's editor, a link to the plugged
    /// block, a drop target, or a placeholder.
    #[must_use]
    pub fn value_slot(&self, input: &InputInfo, connection: ConnectionId) -> RenderNode {
        let label = input_label(input);
        let attached = attached_block(self.host, connection).and_then(|id| self.host.block(id));
        match attached {
            Some(child) if child.shadow => self.shadow_control(&label, &child),
            Some(child) => RenderNode::new(format!("{label}: {}", Self::describe(&child)), Role::Link)
                .action(Action::Select(AstNode::block(child.id)))
                .flags(ItemFlags::INLINE),
            None => match self.input_node(connection) {
                Some(target) if self.ctx.move_pending => self.insert_here(target, 0),
                _ => self.placeholder(format!("{label}: {EMPTY}"), 0),
            },
        }
    }

    fn shadow_control(&self, label: &str, shadow: &BlockInfo) -> RenderNode {
        let editable = shadow
            .fields
            .iter()
            .filter_map(|id| self.host.field(*id))
            .find(|field| Capability::of_field(field).is_editable_field());
        match editable {
            Some(field) => self.field_control(&field, label),
            None => RenderNode::new(format!("{label}: {}", Self::describe(shadow)), Role::Text)
                .flags(ItemFlags::INLINE),
        }
    }

    /// Add/remove buttons and argument editors for a block's mutator.
    #[must_use]
    pub fn mutator_options(&self, info: &BlockInfo) -> Vec<RenderNode> {
        let Some(mutator) = &info.mutator else {
            return Vec::new();
        };
        let mut items = Vec::new();
        if let MutatorInfo::Arguments { names } = mutator {
            for (index, name) in names.iter().enumerate() {
                items.push(
                    RenderNode::new(format!("argument {}", index + 1), Role::TextBox).control(
                        Control::ArgumentName {
                            block: info.id,
                            index,
                            value: name.clone(),
                        },
                    ),
                );
            }
        }
        items.extend(mutator.available_changes().into_iter().map(|change| {
            RenderNode::new(change.label(), Role::Button).action(Action::Mutate {
                block: info.id,
                change,
            })
        }));
        items
    }

    /// Breadcrumb trail: `Workspace` and then one link per block, root first.
    #[must_use]
    pub fn breadcrumbs(&self, trail: &[AstNode], branch: Option<&Branch>) -> RenderNode {
        let mut nav = RenderNode::new("breadcrumbs", Role::Navigation)
            .child(RenderNode::new(WORKSPACE, Role::Link).action(Action::SelectWorkspace));
        for (position, node) in trail.iter().enumerate() {
            let Some(info) = node.block_id().and_then(|id| self.host.block(id)) else {
                continue;
            };
            let mut link = RenderNode::new(Self::describe(&info), Role::Link).action(Action::Select(*node));
            if position + 1 == trail.len() && branch.is_none() {
                link = link.flags(ItemFlags::SELECTED);
            }
            nav.push(link);
        }
        if let (Some(branch), Some(last)) = (branch, trail.last().and_then(AstNode::block_id)) {
            nav.push(
                RenderNode::new(branch.text.clone(), Role::Link)
                    .action(Action::SelectBranch {
                        block: last,
                        index: branch.index,
                    })
                    .flags(ItemFlags::SELECTED),
            );
        }
        nav
    }
}

/// Display label of an input: its label text, or its lowercased name.
#[must_use]
pub fn input_label(input: &InputInfo) -> String {
    if input.label.is_empty() {
        input.name.to_lowercase()
    } else {
        input.label.clone()
    }
}

fn field_label(field: &FieldInfo) -> String {
    if field.name.is_empty() {
        field.text.clone()
    } else {
        field.name.to_lowercase().replace('_', " ")
    }
}
