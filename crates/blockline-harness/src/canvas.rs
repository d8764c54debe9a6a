#![forbid(unsafe_code)]

//! In-memory [`BlockHost`] used by tests, benches, and demos.
//!
//! `MockCanvas` keeps blocks, connections, and fields in flat arenas keyed by
//! id and derives every cursor move from them on demand. It follows the
//! cursor shape documented on [`BlockHost`] and the usual block-canvas rules:
//!
//! - Connecting a statement block into an occupied slot splices the old
//!   occupant onto the tail of the inserted sequence.
//! - Connecting a value block into a slot holding a shadow replaces the
//!   shadow; any other occupant is bumped to the top level.
//! - Disposing a block heals the sequence around it.
//!
//! Setup helpers ([`add`](MockCanvas::add), [`attach_next`](MockCanvas::attach_next),
//! [`attach_input`](MockCanvas::attach_input)) are silent. Everything reached
//! through the trait emits change events to subscribers.

use crate::spec::{BlockSpec, FieldSpec, InputSpec, format_number};
use ahash::AHashMap;
use blockline_core::{
    AstNode, BlockHost, BlockId, BlockInfo, ChangeEvent, ChangeSender, ConnectError,
    ConnectionId, ConnectionInfo, ConnectionKind, Construct, DropdownOption, FieldId, FieldInfo,
    FieldKind, HostError, InputInfo, InputKind, MutatorChange, MutatorInfo, NodeKind,
};
use std::collections::VecDeque;

const STACK_SPACING: i32 = 120;
const DUPLICATE_OFFSET: i32 = 20;

#[derive(Debug, Clone)]
struct MockInput {
    name: String,
    label: String,
    kind: InputKind,
    connection: Option<ConnectionId>,
    is_return: bool,
    fields: Vec<FieldId>,
}

#[derive(Debug, Clone)]
struct MockBlock {
    type_name: String,
    construct: Construct,
    hue: Option<u16>,
    shadow: bool,
    previous: Option<ConnectionId>,
    next: Option<ConnectionId>,
    output: Option<ConnectionId>,
    inputs: Vec<MockInput>,
    mutator: Option<MutatorInfo>,
    position: (i32, i32),
}

#[derive(Debug, Clone, Copy)]
struct MockConnection {
    kind: ConnectionKind,
    owner: BlockId,
    target: Option<ConnectionId>,
}

#[derive(Debug, Clone)]
struct MockField {
    owner: BlockId,
    name: String,
    kind: FieldKind,
    value: String,
    options: Vec<DropdownOption>,
}

/// Reference block canvas.
#[derive(Debug, Default)]
pub struct MockCanvas {
    blocks: AHashMap<BlockId, MockBlock>,
    connections: AHashMap<ConnectionId, MockConnection>,
    fields: AHashMap<FieldId, MockField>,
    top: Vec<BlockId>,
    variables: Vec<String>,
    listeners: Vec<ChangeSender>,
    connect_faults: VecDeque<ConnectError>,
    connect_calls: usize,
    bumps: usize,
    reloads: usize,
    next_id: u32,
}

impl MockCanvas {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Setup ───────────────────────────────────────────────────────────

    /// Create a block as a new top-level stack. Emits nothing.
    pub fn add(&mut self, spec: BlockSpec) -> BlockId {
        let id = BlockId(self.alloc());
        let previous = spec
            .previous
            .then(|| self.new_connection(ConnectionKind::Previous, id));
        let next = spec
            .next
            .then(|| self.new_connection(ConnectionKind::Next, id));
        let output = spec
            .output
            .then(|| self.new_connection(ConnectionKind::Output, id));
        let inputs = spec
            .inputs
            .into_iter()
            .map(|input| self.build_input(id, input))
            .collect();
        let position = (0, self.top.len() as i32 * STACK_SPACING);
        self.blocks.insert(
            id,
            MockBlock {
                type_name: spec.type_name,
                construct: spec.construct,
                hue: spec.hue,
                shadow: spec.shadow,
                previous,
                next,
                output,
                inputs,
                mutator: spec.mutator,
                position,
            },
        );
        self.top.push(id);
        id
    }

    /// Create a block the way a toolbox drop would, emitting `BlockCreate`.
    pub fn create(&mut self, spec: BlockSpec) -> BlockId {
        let id = self.add(spec);
        self.emit(ChangeEvent::BlockCreate { blocks: vec![id] });
        id
    }

    /// Attach `child` below `parent` in the same sequence. Emits nothing.
    pub fn attach_next(&mut self, parent: BlockId, child: BlockId) -> Result<(), ConnectError> {
        let target = self
            .next_connection(parent)
            .ok_or_else(|| incompatible(format!("{parent} has no next connection")))?;
        let attach = self
            .previous_connection(child)
            .ok_or_else(|| incompatible(format!("{child} has no previous connection")))?;
        self.link(target, attach).map(|_| ())
    }

    /// Attach `child` into the named input of `parent`. Emits nothing.
    pub fn attach_input(
        &mut self,
        parent: BlockId,
        input: &str,
        child: BlockId,
    ) -> Result<(), ConnectError> {
        let target = self
            .input_connection(parent, input)
            .ok_or_else(|| incompatible(format!("{parent} has no input {input}")))?;
        let attach = match self.connections.get(&target).map(|c| c.kind) {
            Some(ConnectionKind::Value) => self.output_connection(child),
            _ => self.previous_connection(child),
        }
        .ok_or_else(|| incompatible(format!("{child} cannot plug into {input}")))?;
        self.link(target, attach).map(|_| ())
    }

    /// Register a workspace variable for variable pickers.
    pub fn define_variable(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.variables.contains(&name) {
            self.variables.push(name);
        }
    }

    /// Make the next `connect` call fail with `err`, before touching anything.
    pub fn inject_connect_fault(&mut self, err: ConnectError) {
        self.connect_faults.push_back(err);
    }

    /// Deliver an arbitrary event to subscribers.
    pub fn emit(&mut self, event: ChangeEvent) {
        self.listeners
            .retain(|listener| listener.send(event.clone()));
    }

    /// Simulate a click on a block in the canvas.
    pub fn select(&mut self, id: BlockId) {
        self.emit(ChangeEvent::UiSelect { block: id });
    }

    // ── Inspection ──────────────────────────────────────────────────────

    /// Number of `connect` calls received through the trait.
    #[must_use]
    pub fn connect_calls(&self) -> usize {
        self.connect_calls
    }

    #[must_use]
    pub fn bump_count(&self) -> usize {
        self.bumps
    }

    #[must_use]
    pub fn reload_count(&self) -> usize {
        self.reloads
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn type_name(&self, id: BlockId) -> Option<&str> {
        self.blocks.get(&id).map(|block| block.type_name.as_str())
    }

    #[must_use]
    pub fn position(&self, id: BlockId) -> Option<(i32, i32)> {
        self.blocks.get(&id).map(|block| block.position)
    }

    #[must_use]
    pub fn previous_connection(&self, id: BlockId) -> Option<ConnectionId> {
        self.blocks.get(&id).and_then(|block| block.previous)
    }

    #[must_use]
    pub fn next_connection(&self, id: BlockId) -> Option<ConnectionId> {
        self.blocks.get(&id).and_then(|block| block.next)
    }

    #[must_use]
    pub fn output_connection(&self, id: BlockId) -> Option<ConnectionId> {
        self.blocks.get(&id).and_then(|block| block.output)
    }

    /// Connection of the named input.
    #[must_use]
    pub fn input_connection(&self, id: BlockId, name: &str) -> Option<ConnectionId> {
        self.blocks
            .get(&id)?
            .inputs
            .iter()
            .find(|input| input.name == name)?
            .connection
    }

    /// Field with the given name on a block.
    #[must_use]
    pub fn field_named(&self, id: BlockId, name: &str) -> Option<FieldId> {
        let block = self.blocks.get(&id)?;
        block
            .inputs
            .iter()
            .flat_map(|input| input.fields.iter())
            .copied()
            .find(|field| self.fields.get(field).is_some_and(|f| f.name == name))
    }

    /// Block plugged into a connection, if any.
    #[must_use]
    pub fn attached(&self, connection: ConnectionId) -> Option<BlockId> {
        let target = self.connections.get(&connection)?.target?;
        self.connections.get(&target).map(|c| c.owner)
    }

    // ── Arena plumbing ──────────────────────────────────────────────────

    fn alloc(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn new_connection(&mut self, kind: ConnectionKind, owner: BlockId) -> ConnectionId {
        let id = ConnectionId(self.alloc());
        self.connections.insert(
            id,
            MockConnection {
                kind,
                owner,
                target: None,
            },
        );
        id
    }

    fn new_field(&mut self, owner: BlockId, spec: FieldSpec) -> FieldId {
        let id = FieldId(self.alloc());
        self.fields.insert(
            id,
            MockField {
                owner,
                name: spec.name,
                kind: spec.kind,
                value: spec.value,
                options: spec.options,
            },
        );
        id
    }

    fn build_input(&mut self, owner: BlockId, spec: InputSpec) -> MockInput {
        let connection = match spec.kind {
            InputKind::Value => Some(self.new_connection(ConnectionKind::Value, owner)),
            InputKind::Statement => Some(self.new_connection(ConnectionKind::Statement, owner)),
            InputKind::Dummy => None,
        };
        let fields = spec
            .fields
            .into_iter()
            .map(|field| self.new_field(owner, field))
            .collect();
        MockInput {
            name: spec.name,
            label: spec.label,
            kind: spec.kind,
            connection,
            is_return: spec.is_return,
            fields,
        }
    }

    fn spec_of(&self, block: &MockBlock) -> BlockSpec {
        let inputs = block
            .inputs
            .iter()
            .map(|input| InputSpec {
                name: input.name.clone(),
                label: input.label.clone(),
                kind: input.kind,
                is_return: input.is_return,
                fields: input
                    .fields
                    .iter()
                    .filter_map(|id| self.fields.get(id))
                    .map(|field| FieldSpec {
                        name: field.name.clone(),
                        kind: field.kind,
                        value: field.value.clone(),
                        options: field.options.clone(),
                    })
                    .collect(),
            })
            .collect();
        BlockSpec {
            type_name: block.type_name.clone(),
            construct: block.construct,
            hue: block.hue,
            shadow: block.shadow,
            previous: block.previous.is_some(),
            next: block.next.is_some(),
            output: block.output.is_some(),
            inputs,
            mutator: block.mutator.clone(),
        }
    }

    fn conn(&self, id: ConnectionId) -> Result<MockConnection, HostError> {
        self.connections
            .get(&id)
            .copied()
            .ok_or(HostError::UnknownConnection(id))
    }

    fn set_target(&mut self, id: ConnectionId, target: Option<ConnectionId>) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.target = target;
        }
    }

    /// Break the link on `id`, returning the former peer.
    fn detach(&mut self, id: ConnectionId) -> Option<ConnectionId> {
        let peer = self.connections.get(&id)?.target?;
        self.set_target(id, None);
        self.set_target(peer, None);
        Some(peer)
    }

    fn pair(&mut self, a: ConnectionId, b: ConnectionId) {
        self.set_target(a, Some(b));
        self.set_target(b, Some(a));
    }

    fn make_top(&mut self, id: BlockId) {
        if self.top.contains(&id) {
            return;
        }
        let y = self.top.len() as i32 * STACK_SPACING;
        if let Some(block) = self.blocks.get_mut(&id) {
            block.position = (STACK_SPACING, y);
        }
        self.top.push(id);
    }

    fn is_ancestor_or_self(&self, candidate: BlockId, of: BlockId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.parent_block(id);
        }
        false
    }

    /// Join two connections. Returns the block on the child side.
    fn link(&mut self, target: ConnectionId, attach: ConnectionId) -> Result<BlockId, ConnectError> {
        let t = self.conn(target)?;
        let a = self.conn(attach)?;
        use ConnectionKind as K;
        let (parent_conn, child_conn) = match (t.kind, a.kind) {
            (K::Next | K::Statement, K::Previous) | (K::Value, K::Output) => (target, attach),
            (K::Previous, K::Next | K::Statement) | (K::Output, K::Value) => (attach, target),
            (tk, ak) => return Err(incompatible(format!("{tk:?} cannot accept {ak:?}"))),
        };
        let parent = self.conn(parent_conn)?.owner;
        let child = self.conn(child_conn)?.owner;
        if self.is_ancestor_or_self(child, parent) {
            return Err(ConnectError::Cyclic);
        }

        self.detach(child_conn);
        self.top.retain(|id| *id != child);
        let displaced = self
            .detach(parent_conn)
            .and_then(|peer| self.connections.get(&peer).map(|c| c.owner));
        self.pair(parent_conn, child_conn);

        if let Some(old) = displaced {
            self.rehome(old, child);
        }
        Ok(child)
    }

    /// Find a place for a block pushed out of its slot by `inserted`.
    fn rehome(&mut self, old: BlockId, inserted: BlockId) {
        let Some(old_block) = self.blocks.get(&old) else {
            return;
        };
        if let Some(old_previous) = old_block.previous {
            let mut tail = inserted;
            while let Some(next) = self.next_in_sequence(tail) {
                tail = next;
            }
            if let Some(tail_next) = self.next_connection(tail) {
                self.pair(tail_next, old_previous);
                return;
            }
        } else if old_block.shadow {
            self.remove_subtree(old);
            return;
        }
        self.make_top(old);
    }

    /// Drop a block and everything attached under it. Returns removed ids.
    fn remove_subtree(&mut self, root: BlockId) -> Vec<BlockId> {
        let mut removed = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            stack.extend(self.child_blocks(id));
            removed.push(id);
        }
        for id in &removed {
            if let Some(block) = self.blocks.remove(id) {
                for conn in [block.previous, block.next, block.output]
                    .into_iter()
                    .flatten()
                    .chain(block.inputs.iter().filter_map(|input| input.connection))
                {
                    self.detach(conn);
                    self.connections.remove(&conn);
                }
                for input in &block.inputs {
                    for field in &input.fields {
                        self.fields.remove(field);
                    }
                }
            }
        }
        self.top.retain(|id| !removed.contains(id));
        removed
    }

    fn copy_tree(
        &mut self,
        id: BlockId,
        include_next: bool,
        created: &mut Vec<BlockId>,
    ) -> Result<BlockId, HostError> {
        let source = self
            .blocks
            .get(&id)
            .cloned()
            .ok_or(HostError::UnknownBlock(id))?;
        let spec = self.spec_of(&source);
        let copy = self.add(spec);
        created.push(copy);

        for input in &source.inputs {
            let Some(child) = input.connection.and_then(|c| self.attached(c)) else {
                continue;
            };
            let child_copy = self.copy_tree(child, true, created)?;
            self.attach_input(copy, &input.name, child_copy)
                .map_err(|err| HostError::Rejected(err.to_string()))?;
        }
        if include_next {
            if let Some(next) = self.next_in_sequence(id) {
                let next_copy = self.copy_tree(next, true, created)?;
                self.attach_next(copy, next_copy)
                    .map_err(|err| HostError::Rejected(err.to_string()))?;
            }
        }
        Ok(copy)
    }

    fn remove_input(&mut self, id: BlockId, name: &str) {
        let Some(block) = self.blocks.get_mut(&id) else {
            return;
        };
        let Some(index) = block.inputs.iter().position(|input| input.name == name) else {
            return;
        };
        let input = block.inputs.remove(index);
        if let Some(conn) = input.connection {
            if let Some(child) = self.attached(conn) {
                self.detach(conn);
                self.make_top(child);
            }
            self.connections.remove(&conn);
        }
        for field in &input.fields {
            self.fields.remove(field);
        }
    }

    fn insert_input(&mut self, id: BlockId, index: usize, spec: InputSpec) {
        let input = self.build_input(id, spec);
        if let Some(block) = self.blocks.get_mut(&id) {
            let index = index.min(block.inputs.len());
            block.inputs.insert(index, input);
        }
    }

    fn set_mutator(&mut self, id: BlockId, mutator: MutatorInfo) {
        if let Some(block) = self.blocks.get_mut(&id) {
            block.mutator = Some(mutator);
        }
    }

    // ── Derived structure ───────────────────────────────────────────────

    fn next_in_sequence(&self, id: BlockId) -> Option<BlockId> {
        self.attached(self.blocks.get(&id)?.next?)
    }

    fn prev_in_sequence(&self, id: BlockId) -> Option<BlockId> {
        let target = self.connections.get(&self.blocks.get(&id)?.previous?)?.target?;
        let peer = self.connections.get(&target)?;
        matches!(peer.kind, ConnectionKind::Next).then_some(peer.owner)
    }

    /// Cursor node holding the sequence `id` belongs to.
    fn holder(&self, id: BlockId) -> Option<AstNode> {
        let mut head = id;
        while let Some(prev) = self.prev_in_sequence(head) {
            head = prev;
        }
        let block = self.blocks.get(&head)?;
        let slot = [block.previous, block.output]
            .into_iter()
            .flatten()
            .find_map(|conn| self.connections.get(&conn)?.target);
        match slot {
            Some(input) => AstNode::connection(NodeKind::Input, input),
            None => self.top.contains(&head).then(|| AstNode::stack(head)),
        }
    }

    /// Cursor children of a block: fields, connectable inputs, next.
    fn parts(&self, id: BlockId) -> Vec<AstNode> {
        let Some(block) = self.blocks.get(&id) else {
            return Vec::new();
        };
        let fields = block
            .inputs
            .iter()
            .flat_map(|input| input.fields.iter())
            .map(|field| AstNode::field(*field));
        let inputs = block
            .inputs
            .iter()
            .filter(|input| !matches!(input.kind, InputKind::Dummy))
            .filter_map(|input| input.connection)
            .filter_map(|conn| AstNode::connection(NodeKind::Input, conn));
        let next = block
            .next
            .and_then(|conn| AstNode::connection(NodeKind::Next, conn));
        fields.chain(inputs).chain(next).collect()
    }

    fn owner_of(&self, node: &AstNode) -> Option<BlockId> {
        if let Some(field) = node.field_id() {
            return self.fields.get(&field).map(|f| f.owner);
        }
        node.connection_id()
            .and_then(|conn| self.connections.get(&conn))
            .map(|c| c.owner)
    }

    fn part_sibling(&self, node: &AstNode, forward: bool) -> Option<AstNode> {
        let parts = self.parts(self.owner_of(node)?);
        let index = parts.iter().position(|part| part == node)?;
        if forward {
            parts.get(index + 1).copied()
        } else {
            index.checked_sub(1).and_then(|i| parts.get(i)).copied()
        }
    }

    fn stack_sibling(&self, id: BlockId, forward: bool) -> Option<AstNode> {
        let index = self.top.iter().position(|top| *top == id)?;
        let sibling = if forward {
            self.top.get(index + 1)
        } else {
            index.checked_sub(1).and_then(|i| self.top.get(i))
        };
        sibling.map(|top| AstNode::stack(*top))
    }

    fn field_text(&self, field: &MockField) -> String {
        match field.kind {
            FieldKind::Dropdown => field
                .options
                .iter()
                .find(|option| option.value == field.value)
                .map_or_else(|| field.value.clone(), |option| option.text.clone()),
            _ => field.value.clone(),
        }
    }

    fn describe(&self, id: BlockId) -> String {
        let Some(block) = self.blocks.get(&id) else {
            return String::new();
        };
        let mut words = Vec::new();
        for input in &block.inputs {
            if matches!(input.kind, InputKind::Statement) || input.is_return {
                continue;
            }
            words.push(input.label.clone());
            words.extend(
                input
                    .fields
                    .iter()
                    .filter_map(|field| self.fields.get(field))
                    .map(|field| self.field_text(field)),
            );
            if matches!(input.kind, InputKind::Value) {
                let child = input.connection.and_then(|conn| self.attached(conn));
                words.push(child.map_or_else(|| "?".to_string(), |child| self.describe(child)));
            }
        }
        if let Some(MutatorInfo::Arguments { names }) = &block.mutator {
            if !names.is_empty() {
                words.push(format!("with: {}", names.join(", ")));
            }
        }
        words.retain(|word| !word.is_empty());
        words.join(" ")
    }
}

fn incompatible(reason: String) -> ConnectError {
    ConnectError::Incompatible { reason }
}

fn fresh_argument_name(existing: &[String]) -> String {
    const BASE: [&str; 3] = ["x", "y", "z"];
    (0..)
        .flat_map(|round: usize| {
            BASE.iter().map(move |base| {
                if round == 0 {
                    (*base).to_string()
                } else {
                    format!("{base}{}", round + 1)
                }
            })
        })
        .find(|name| !existing.contains(name))
        .unwrap_or_default()
}

impl BlockHost for MockCanvas {
    fn top_blocks(&self) -> Vec<BlockId> {
        self.top.clone()
    }

    fn all_blocks(&self) -> Vec<BlockId> {
        let mut ids: Vec<_> = self.blocks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn block(&self, id: BlockId) -> Option<BlockInfo> {
        let block = self.blocks.get(&id)?;
        Some(BlockInfo {
            id,
            description: self.describe(id),
            hue: block.hue,
            construct: block.construct,
            shadow: block.shadow,
            previous: block.previous,
            next: block.next,
            output: block.output,
            inputs: block
                .inputs
                .iter()
                .map(|input| InputInfo {
                    name: input.name.clone(),
                    label: input.label.clone(),
                    kind: input.kind,
                    connection: input.connection,
                    is_return: input.is_return,
                })
                .collect(),
            fields: block
                .inputs
                .iter()
                .flat_map(|input| input.fields.iter().copied())
                .collect(),
            mutator: block.mutator.clone(),
        })
    }

    fn contains_block(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    fn subscribe(&mut self, sender: ChangeSender) {
        self.listeners.push(sender);
    }

    fn next_sibling(&self, node: &AstNode) -> Option<AstNode> {
        match node.kind() {
            NodeKind::Workspace | NodeKind::Previous | NodeKind::Output => None,
            NodeKind::Stack => self.stack_sibling(node.block_id()?, true),
            NodeKind::Block => self.next_in_sequence(node.block_id()?).map(AstNode::block),
            NodeKind::Field | NodeKind::Input | NodeKind::Next => self.part_sibling(node, true),
        }
    }

    fn prev_sibling(&self, node: &AstNode) -> Option<AstNode> {
        match node.kind() {
            NodeKind::Workspace | NodeKind::Previous | NodeKind::Output => None,
            NodeKind::Stack => self.stack_sibling(node.block_id()?, false),
            NodeKind::Block => self.prev_in_sequence(node.block_id()?).map(AstNode::block),
            NodeKind::Field | NodeKind::Input | NodeKind::Next => self.part_sibling(node, false),
        }
    }

    fn first_child(&self, node: &AstNode) -> Option<AstNode> {
        match node.kind() {
            NodeKind::Workspace => self.top.first().map(|id| AstNode::stack(*id)),
            NodeKind::Stack => self.block_node(node.block_id()?),
            NodeKind::Block => self.parts(node.block_id()?).first().copied(),
            NodeKind::Input => self.attached(node.connection_id()?).map(AstNode::block),
            NodeKind::Field | NodeKind::Next | NodeKind::Previous | NodeKind::Output => None,
        }
    }

    fn parent(&self, node: &AstNode) -> Option<AstNode> {
        match node.kind() {
            NodeKind::Workspace => None,
            NodeKind::Stack => Some(AstNode::workspace()),
            NodeKind::Block => self.holder(node.block_id()?),
            _ => self.owner_of(node).map(AstNode::block),
        }
    }

    fn parent_block(&self, id: BlockId) -> Option<BlockId> {
        let block = self.blocks.get(&id)?;
        let slot = block.previous.or(block.output)?;
        self.attached(slot)
    }

    fn child_blocks(&self, id: BlockId) -> Vec<BlockId> {
        let Some(block) = self.blocks.get(&id) else {
            return Vec::new();
        };
        block
            .inputs
            .iter()
            .filter_map(|input| input.connection)
            .chain(block.next)
            .filter_map(|conn| self.attached(conn))
            .collect()
    }

    fn dispose(&mut self, id: BlockId) -> Result<(), HostError> {
        let previous = self
            .blocks
            .get(&id)
            .ok_or(HostError::UnknownBlock(id))?
            .previous;
        let slot = previous.and_then(|conn| self.detach(conn));
        let top_index = self.top.iter().position(|top| *top == id);
        let next = self.next_in_sequence(id);
        if let Some(conn) = self.next_connection(id) {
            self.detach(conn);
        }
        if let Some(conn) = self.output_connection(id) {
            self.detach(conn);
        }

        if let Some(next) = next {
            match (slot, self.previous_connection(next)) {
                (Some(slot), Some(previous)) => self.pair(slot, previous),
                _ => match top_index {
                    Some(index) => {
                        self.top[index] = next;
                        let position = self.position(id).unwrap_or_default();
                        if let Some(block) = self.blocks.get_mut(&next) {
                            block.position = position;
                        }
                    }
                    None => self.make_top(next),
                },
            }
        }

        let removed = self.remove_subtree(id);
        tracing::debug!(block = %id, removed = removed.len(), "canvas.dispose");
        self.emit(ChangeEvent::BlockDelete { blocks: removed });
        Ok(())
    }

    fn duplicate(&mut self, id: BlockId) -> Result<BlockId, HostError> {
        let mut created = Vec::new();
        let copy = self.copy_tree(id, false, &mut created)?;
        let (x, y) = self.position(id).unwrap_or_default();
        if let Some(block) = self.blocks.get_mut(&copy) {
            block.position = (x + DUPLICATE_OFFSET, y + DUPLICATE_OFFSET);
        }
        self.emit(ChangeEvent::BlockCreate { blocks: created });
        Ok(copy)
    }

    fn move_by(&mut self, id: BlockId, dx: i32, dy: i32) -> Result<(), HostError> {
        let block = self
            .blocks
            .get_mut(&id)
            .ok_or(HostError::UnknownBlock(id))?;
        block.position = (block.position.0 + dx, block.position.1 + dy);
        self.emit(ChangeEvent::BlockMove { block: id });
        Ok(())
    }

    fn bump_neighbours(&mut self, id: BlockId) -> Result<(), HostError> {
        if !self.blocks.contains_key(&id) {
            return Err(HostError::UnknownBlock(id));
        }
        self.bumps += 1;
        Ok(())
    }

    fn mutate(&mut self, id: BlockId, change: &MutatorChange) -> Result<(), HostError> {
        let block = self.blocks.get(&id).ok_or(HostError::UnknownBlock(id))?;
        let mutator = block
            .mutator
            .clone()
            .ok_or_else(|| HostError::Rejected(format!("{id} has no mutator")))?;
        let else_index = block.inputs.iter().position(|input| input.name == "ELSE");
        let input_count = block.inputs.len();
        let rejected = || HostError::Rejected(format!("{} is not available", change.label()));

        match (mutator, change) {
            (MutatorInfo::ElseIf { else_if_count, has_else }, MutatorChange::AddElseIf) => {
                let n = else_if_count + 1;
                let at = else_index.unwrap_or(input_count);
                self.insert_input(id, at, InputSpec::value(format!("IF{n}"), "else if"));
                self.insert_input(id, at + 1, InputSpec::statement(format!("DO{n}"), "do"));
                self.set_mutator(id, MutatorInfo::ElseIf { else_if_count: n, has_else });
            }
            (MutatorInfo::ElseIf { else_if_count, has_else }, MutatorChange::RemoveElseIf)
                if else_if_count > 0 =>
            {
                self.remove_input(id, &format!("IF{else_if_count}"));
                self.remove_input(id, &format!("DO{else_if_count}"));
                self.set_mutator(
                    id,
                    MutatorInfo::ElseIf { else_if_count: else_if_count - 1, has_else },
                );
            }
            (MutatorInfo::ElseIf { else_if_count, has_else: false }, MutatorChange::AddElse) => {
                self.insert_input(id, input_count, InputSpec::statement("ELSE", "else"));
                self.set_mutator(id, MutatorInfo::ElseIf { else_if_count, has_else: true });
            }
            (MutatorInfo::ElseIf { else_if_count, has_else: true }, MutatorChange::RemoveElse) => {
                self.remove_input(id, "ELSE");
                self.set_mutator(id, MutatorInfo::ElseIf { else_if_count, has_else: false });
            }
            (MutatorInfo::Arguments { mut names }, MutatorChange::AddArgument) => {
                names.push(fresh_argument_name(&names));
                self.set_mutator(id, MutatorInfo::Arguments { names });
            }
            (MutatorInfo::Arguments { mut names }, MutatorChange::RemoveArgument)
                if !names.is_empty() =>
            {
                names.pop();
                self.set_mutator(id, MutatorInfo::Arguments { names });
            }
            (MutatorInfo::Arguments { mut names }, MutatorChange::RenameArgument { index, name })
                if *index < names.len() && !name.trim().is_empty() =>
            {
                names[*index] = name.trim().to_string();
                self.set_mutator(id, MutatorInfo::Arguments { names });
            }
            (MutatorInfo::ItemCount { count }, MutatorChange::AddItem) => {
                self.insert_input(id, input_count, InputSpec::value(format!("ADD{count}"), ""));
                self.set_mutator(id, MutatorInfo::ItemCount { count: count + 1 });
            }
            (MutatorInfo::ItemCount { count }, MutatorChange::RemoveItem) if count > 0 => {
                self.remove_input(id, &format!("ADD{}", count - 1));
                self.set_mutator(id, MutatorInfo::ItemCount { count: count - 1 });
            }
            _ => return Err(rejected()),
        }
        self.emit(ChangeEvent::BlockChange { block: id });
        Ok(())
    }

    fn connection(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        let conn = self.connections.get(&id)?;
        Some(ConnectionInfo {
            id,
            kind: conn.kind,
            owner: conn.owner,
            target: conn.target,
        })
    }

    fn connect(&mut self, target: ConnectionId, attach: ConnectionId) -> Result<(), ConnectError> {
        self.connect_calls += 1;
        if let Some(fault) = self.connect_faults.pop_front() {
            tracing::debug!(%target, %attach, error = %fault, "canvas.connect.injected_fault");
            return Err(fault);
        }
        let child = self.link(target, attach)?;
        self.emit(ChangeEvent::BlockMove { block: child });
        Ok(())
    }

    fn disconnect(&mut self, id: ConnectionId) -> Result<(), HostError> {
        let conn = self.conn(id)?;
        let peer = conn.target.ok_or(HostError::NotConnected(id))?;
        let child = match conn.kind {
            ConnectionKind::Previous | ConnectionKind::Output => conn.owner,
            _ => self.conn(peer)?.owner,
        };
        self.detach(id);
        self.make_top(child);
        self.emit(ChangeEvent::BlockMove { block: child });
        Ok(())
    }

    fn field(&self, id: FieldId) -> Option<FieldInfo> {
        let field = self.fields.get(&id)?;
        Some(FieldInfo {
            id,
            owner: field.owner,
            name: field.name.clone(),
            kind: field.kind,
            value: field.value.clone(),
            text: self.field_text(field),
        })
    }

    fn set_field_value(&mut self, id: FieldId, value: &str) -> Result<(), HostError> {
        let field = self.fields.get(&id).ok_or(HostError::UnknownField(id))?;
        let stored = match field.kind {
            FieldKind::Label => {
                return Err(HostError::Rejected("label fields are read-only".into()));
            }
            FieldKind::Text => value.to_string(),
            FieldKind::Number => value
                .trim()
                .parse::<f64>()
                .map(format_number)
                .map_err(|_| HostError::Rejected(format!("{value:?} is not a number")))?,
            FieldKind::Dropdown => {
                if !field.options.iter().any(|option| option.value == value) {
                    return Err(HostError::Rejected(format!("{value:?} is not an option")));
                }
                value.to_string()
            }
            FieldKind::Variable => {
                if !self.variables.iter().any(|name| name == value) {
                    return Err(HostError::Rejected(format!("no variable named {value:?}")));
                }
                value.to_string()
            }
            FieldKind::Checkbox => match value {
                "TRUE" | "FALSE" => value.to_string(),
                other => return Err(HostError::Rejected(format!("{other:?} is not a checkbox state"))),
            },
        };
        let owner = field.owner;
        if let Some(field) = self.fields.get_mut(&id) {
            field.value = stored;
        }
        self.emit(ChangeEvent::BlockChange { block: owner });
        Ok(())
    }

    fn dropdown_options(&self, id: FieldId) -> Vec<DropdownOption> {
        match self.fields.get(&id) {
            Some(field) if field.kind == FieldKind::Dropdown => field.options.clone(),
            Some(field) if field.kind == FieldKind::Variable => self
                .variables
                .iter()
                .map(|name| DropdownOption::new(name.clone(), name.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn reload_view(&mut self) {
        self.reloads += 1;
        tracing::debug!(reloads = self.reloads, "canvas.reload_view");
        self.emit(ChangeEvent::FinishedLoading);
    }
}
