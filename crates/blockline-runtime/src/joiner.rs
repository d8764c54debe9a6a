#![forbid(unsafe_code)]

//! Two-slot move protocol.
//!
//! [`BlockJoiner`] relocates a block in two steps: the user picks up a block
//! (filling the block slot) and picks a connection to drop it on (filling the
//! connection slot), in either order. As soon as both slots hold an item the
//! joiner services the move.
//!
//! # Service
//!
//! 1. The connection's [`Capability`] decides which side of the moving block
//!    attaches: targets that advance forward (successor, statement, value)
//!    take the block's previous or output connection; targets that point
//!    back (predecessor, output) take its next connection or first free value
//!    input. Shadow blocks never move.
//! 2. The cycle check walks from the target's owner up through every
//!    ancestor block. If the moving block or anything it contains is on that
//!    chain the move is refused before the host is touched.
//! 3. The block is detached from its predecessor and the host is asked to
//!    bump neighbours. Failures here are logged and ignored.
//! 4. The host connects. A type mismatch is a silent no-op; a cyclic fault
//!    reported by the host demands a view reload; any other fault is logged
//!    as a warning.
//! 5. Both slots are cleared, whatever happened.
//!
//! # Invariants
//!
//! - After every service both slots are empty.
//! - A push of the same kind as an occupied slot replaces its occupant.
//! - A refused cyclic move never reaches [`BlockHost::connect`].

use ahash::AHashSet;
use blockline_core::{
    AstNode, BlockHost, BlockId, BlockInfo, ConnectError, ConnectionId, Entity, Error, HostError,
    InputKind, RecoveryAction,
};
use blockline_render::Capability;

/// Result of the last joiner step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinOutcome {
    /// One slot is filled; waiting for the other.
    Waiting,
    /// The block was connected.
    Connected,
    /// The two sides cannot connect; nothing happened.
    Mismatch,
    /// The target lies inside the moving block; nothing happened.
    CyclePrevented,
    /// The host failed unexpectedly; the action was abandoned.
    HostFault,
    /// The host reported a cyclic structure; the view must be reloaded.
    ReloadRequired,
}

impl JoinOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Connected => "connected",
            Self::Mismatch => "mismatch",
            Self::CyclePrevented => "cycle_prevented",
            Self::HostFault => "host_fault",
            Self::ReloadRequired => "reload_required",
        }
    }
}

/// The move protocol's state: one block slot and one connection slot.
#[derive(Debug, Clone, Default)]
pub struct BlockJoiner {
    block_slot: Option<AstNode>,
    connection_slot: Option<AstNode>,
    last_outcome: Option<JoinOutcome>,
    last_error: Option<Error>,
}

impl BlockJoiner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Block waiting to be moved.
    #[inline]
    #[must_use]
    pub fn held(&self) -> Option<AstNode> {
        self.block_slot
    }

    /// Connection waiting for a block.
    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<AstNode> {
        self.connection_slot
    }

    /// Whether either slot is occupied.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.block_slot.is_some() || self.connection_slot.is_some()
    }

    #[must_use]
    pub fn last_outcome(&self) -> Option<JoinOutcome> {
        self.last_outcome
    }

    /// Error behind the last non-success outcome, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Offer a node to the joiner.
    ///
    /// Block-like nodes fill the block slot and connection nodes fill the
    /// connection slot, replacing any previous occupant. Anything else is
    /// refused with `false` and leaves the state untouched. Once both slots
    /// are filled the move is serviced before returning.
    pub fn push<H: BlockHost + ?Sized>(&mut self, host: &mut H, node: AstNode) -> bool {
        match node.entity() {
            Entity::Block(_) => self.block_slot = Some(node),
            Entity::Connection(_) => self.connection_slot = Some(node),
            Entity::Workspace | Entity::Field(_) => {
                tracing::debug!(%node, "joiner.push_refused");
                return false;
            }
        }
        self.last_error = None;
        match (self.block_slot, self.connection_slot) {
            (Some(block), Some(target)) => {
                let outcome = self.service(host, block, target);
                self.finish(outcome);
            }
            _ => self.last_outcome = Some(JoinOutcome::Waiting),
        }
        true
    }

    /// Drop both slots without moving anything.
    pub fn cancel(&mut self) {
        self.block_slot = None;
        self.connection_slot = None;
    }

    /// Make the held block the root of a new stack.
    ///
    /// Clears the block slot on success. A block with no predecessor, or a
    /// host refusal, leaves the slot as it was.
    pub fn disconnect_block<H: BlockHost + ?Sized>(&mut self, host: &mut H) -> bool {
        let Some(block) = self.block_slot.and_then(|node| node.block_id()) else {
            return false;
        };
        match detach(host, block) {
            Ok(()) => {
                self.block_slot = None;
                true
            }
            Err(err) => {
                tracing::debug!(%block, error = %err, "joiner.disconnect_ignored");
                false
            }
        }
    }

    /// Clear slots that point at entities the host no longer has.
    pub fn retain_existing<H: BlockHost + ?Sized>(&mut self, host: &H) {
        if self
            .block_slot
            .and_then(|node| node.block_id())
            .is_some_and(|id| !host.contains_block(id))
        {
            self.block_slot = None;
        }
        if self
            .connection_slot
            .and_then(|node| node.connection_id())
            .is_some_and(|id| host.connection(id).is_none())
        {
            self.connection_slot = None;
        }
    }

    fn finish(&mut self, outcome: JoinOutcome) {
        self.cancel();
        self.last_outcome = Some(outcome);
        tracing::debug!(
            outcome = outcome.as_str(),
            error = self.last_error.as_ref().map(Error::error_type),
            "joiner.serviced"
        );
    }

    fn fail(&mut self, err: Error) -> JoinOutcome {
        let outcome = match err.recovery() {
            RecoveryAction::Ignore => match err {
                Error::CyclePrevented { .. } => JoinOutcome::CyclePrevented,
                _ => JoinOutcome::Mismatch,
            },
            RecoveryAction::AbandonAction => {
                tracing::warn!(error = %err, "joiner.host_fault");
                JoinOutcome::HostFault
            }
            RecoveryAction::ReloadView => {
                tracing::error!(error = %err, "joiner.cyclic_fault");
                JoinOutcome::ReloadRequired
            }
        };
        self.last_error = Some(err);
        outcome
    }

    fn service<H: BlockHost + ?Sized>(
        &mut self,
        host: &mut H,
        block: AstNode,
        target: AstNode,
    ) -> JoinOutcome {
        let Some(target_id) = target.connection_id() else {
            return JoinOutcome::Mismatch;
        };
        let Some(capability) = Capability::of_node(host, &target) else {
            return self.fail(HostError::UnknownConnection(target_id).into());
        };
        let Some(block_id) = block.block_id() else {
            return JoinOutcome::Mismatch;
        };
        let Some(moving) = host.block(block_id) else {
            return self.fail(HostError::UnknownBlock(block_id).into());
        };
        if moving.shadow {
            return self.fail(
                ConnectError::Incompatible {
                    reason: format!("{} is a shadow", moving.id),
                }
                .into(),
            );
        }

        let Some(attach) = attach_point(host, &moving, capability) else {
            return self.fail(
                ConnectError::Incompatible {
                    reason: format!("{} has no side that fits {target}", moving.id),
                }
                .into(),
            );
        };

        if would_cycle(host, moving.id, target_id) {
            return self.fail(Error::CyclePrevented {
                block: moving.id,
                target: target_id,
            });
        }

        if let Err(err) = detach(host, moving.id) {
            tracing::trace!(block = %moving.id, error = %err, "joiner.detach_skipped");
        }
        if let Err(err) = host.bump_neighbours(moving.id) {
            tracing::trace!(block = %moving.id, error = %err, "joiner.bump_skipped");
        }

        match host.connect(target_id, attach) {
            Ok(()) => JoinOutcome::Connected,
            Err(err) => self.fail(err.into()),
        }
    }
}

/// The moving block's connection that mates with a target of `capability`.
fn attach_point<H: BlockHost + ?Sized>(
    host: &H,
    moving: &BlockInfo,
    capability: Capability,
) -> Option<ConnectionId> {
    match capability {
        Capability::SuccessorConnection(_) | Capability::StatementConnection(_) => moving.previous,
        Capability::ValueConnection(_) => moving.output,
        Capability::PredecessorConnection(_) => moving.next,
        Capability::OutputConnection(_) => moving
            .inputs
            .iter()
            .filter(|input| input.kind == InputKind::Value && !input.is_return)
            .filter_map(|input| input.connection)
            .find(|conn| host.connection(*conn).is_some_and(|info| !info.is_connected())),
        Capability::LabelField(_)
        | Capability::TextField(_)
        | Capability::NumericField(_)
        | Capability::DropdownField(_)
        | Capability::CheckboxField(_)
        | Capability::VariableField(_) => None,
    }
}

/// Whether connecting `block` at `target` would nest `block` inside itself.
///
/// True when the target's owner, or any block above it, is `block` or one of
/// `block`'s descendants.
pub fn would_cycle<H: BlockHost + ?Sized>(host: &H, block: BlockId, target: ConnectionId) -> bool {
    let Some(owner) = host.connection(target).map(|info| info.owner) else {
        return false;
    };
    let subtree = descendants(host, block);
    let mut current = Some(owner);
    while let Some(id) = current {
        if subtree.contains(&id) {
            return true;
        }
        current = host.parent_block(id);
    }
    false
}

/// `block` and every block attached beneath it.
fn descendants<H: BlockHost + ?Sized>(host: &H, block: BlockId) -> AHashSet<BlockId> {
    let mut seen = AHashSet::new();
    let mut stack = vec![block];
    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            stack.extend(host.child_blocks(id));
        }
    }
    seen
}

/// Detach `block` from whatever holds it: its predecessor, or the input its
/// output is plugged into.
pub fn detach<H: BlockHost + ?Sized>(host: &mut H, block: BlockId) -> Result<(), HostError> {
    let info = host.block(block).ok_or(HostError::UnknownBlock(block))?;
    let holder = [info.previous, info.output]
        .into_iter()
        .flatten()
        .find(|conn| host.connection(*conn).is_some_and(|c| c.is_connected()));
    match holder {
        Some(conn) => host.disconnect(conn),
        None => Err(match info.previous.or(info.output) {
            Some(conn) => HostError::NotConnected(conn),
            None => HostError::Rejected(format!("{block} cannot be attached")),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockline_core::NodeKind;
    use blockline_harness::{MockCanvas, fixtures};

    fn input_node(canvas: &MockCanvas, block: BlockId, name: &str) -> AstNode {
        AstNode::connection(NodeKind::Input, canvas.input_connection(block, name).unwrap()).unwrap()
    }

    fn next_node(canvas: &MockCanvas, block: BlockId) -> AstNode {
        AstNode::connection(NodeKind::Next, canvas.next_connection(block).unwrap()).unwrap()
    }

    #[test]
    fn single_push_waits() {
        let mut canvas = MockCanvas::new();
        let a = fixtures::print_text(&mut canvas, "a");
        let mut joiner = BlockJoiner::new();
        assert!(joiner.push(&mut canvas, AstNode::block(a)));
        assert_eq!(joiner.last_outcome(), Some(JoinOutcome::Waiting));
        assert_eq!(joiner.held(), Some(AstNode::block(a)));
        assert!(joiner.is_pending());
        assert_eq!(canvas.connect_calls(), 0);
    }

    #[test]
    fn same_kind_push_overwrites() {
        let mut canvas = MockCanvas::new();
        let a = fixtures::print_text(&mut canvas, "a");
        let b = fixtures::print_text(&mut canvas, "b");
        let mut joiner = BlockJoiner::new();
        joiner.push(&mut canvas, AstNode::block(a));
        joiner.push(&mut canvas, AstNode::block(b));
        assert_eq!(joiner.held(), Some(AstNode::block(b)));
        assert_eq!(joiner.target(), None);
    }

    #[test]
    fn fields_and_workspace_are_refused() {
        let mut canvas = MockCanvas::new();
        let set = fixtures::set_variable(&mut canvas, "x");
        let field = canvas.field_named(set, "VAR").unwrap();
        let mut joiner = BlockJoiner::new();
        assert!(!joiner.push(&mut canvas, AstNode::field(field)));
        assert!(!joiner.push(&mut canvas, AstNode::workspace()));
        assert!(!joiner.is_pending());
        assert_eq!(joiner.last_outcome(), None);
    }

    #[test]
    fn block_then_connection_moves_block() {
        let mut canvas = MockCanvas::new();
        let a = fixtures::print_text(&mut canvas, "a");
        let b = fixtures::print_text(&mut canvas, "b");
        let mut joiner = BlockJoiner::new();
        joiner.push(&mut canvas, AstNode::block(b));
        let node = next_node(&canvas, a);
        joiner.push(&mut canvas, node);
        assert_eq!(joiner.last_outcome(), Some(JoinOutcome::Connected));
        assert_eq!(canvas.parent_block(b), Some(a));
        assert!(!joiner.is_pending());
    }

    #[test]
    fn connection_then_block_also_moves() {
        let mut canvas = MockCanvas::new();
        let repeat = fixtures::repeat(&mut canvas, 2.0);
        let body = fixtures::print_text(&mut canvas, "inside");
        let mut joiner = BlockJoiner::new();
        let node = input_node(&canvas, repeat, "DO");
        joiner.push(&mut canvas, node);
        assert_eq!(joiner.last_outcome(), Some(JoinOutcome::Waiting));
        joiner.push(&mut canvas, AstNode::block(body));
        assert_eq!(joiner.last_outcome(), Some(JoinOutcome::Connected));
        assert_eq!(canvas.attached(canvas.input_connection(repeat, "DO").unwrap()), Some(body));
    }

    #[test]
    fn backward_target_uses_moving_next() {
        let mut canvas = MockCanvas::new();
        let head = fixtures::print_text(&mut canvas, "head");
        let above = fixtures::print_text(&mut canvas, "above");
        let previous = canvas.previous_connection(head).unwrap();
        let mut joiner = BlockJoiner::new();
        joiner.push(&mut canvas, AstNode::block(above));
        joiner.push(
            &mut canvas,
            AstNode::connection(NodeKind::Previous, previous).unwrap(),
        );
        assert_eq!(joiner.last_outcome(), Some(JoinOutcome::Connected));
        assert_eq!(canvas.parent_block(head), Some(above));
    }

    #[test]
    fn expression_into_statement_slot_is_mismatch() {
        let mut canvas = MockCanvas::new();
        let repeat = fixtures::repeat(&mut canvas, 2.0);
        let text = fixtures::text(&mut canvas, "loose");
        let mut joiner = BlockJoiner::new();
        joiner.push(&mut canvas, AstNode::block(text));
        let node = input_node(&canvas, repeat, "DO");
        joiner.push(&mut canvas, node);
        assert_eq!(joiner.last_outcome(), Some(JoinOutcome::Mismatch));
        assert_eq!(canvas.connect_calls(), 0);
        assert!(!joiner.is_pending());
    }

    #[test]
    fn shadows_do_not_move() {
        let mut canvas = MockCanvas::new();
        let set = fixtures::set_variable(&mut canvas, "x");
        let zero = canvas
            .attached(canvas.input_connection(set, "VALUE").unwrap())
            .unwrap();
        let target = fixtures::print(&mut canvas);
        let mut joiner = BlockJoiner::new();
        joiner.push(&mut canvas, AstNode::block(zero));
        let node = input_node(&canvas, target, "TEXT");
        joiner.push(&mut canvas, node);
        assert_eq!(joiner.last_outcome(), Some(JoinOutcome::Mismatch));
        assert_eq!(canvas.connect_calls(), 0);
        assert_eq!(canvas.parent_block(zero), Some(set));
    }

    #[test]
    fn three_level_cycle_is_refused_before_connect() {
        let mut canvas = MockCanvas::new();
        let chain = fixtures::nested_repeats(&mut canvas, 3);
        let mut joiner = BlockJoiner::new();
        joiner.push(&mut canvas, AstNode::block(chain[0]));
        let node = input_node(&canvas, chain[1], "DO");
        joiner.push(&mut canvas, node);
        assert_eq!(joiner.last_outcome(), Some(JoinOutcome::CyclePrevented));
        assert_eq!(canvas.connect_calls(), 0);
        assert!(!joiner.is_pending());
        assert_eq!(canvas.parent_block(chain[1]), Some(chain[0]));
        assert!(matches!(
            joiner.last_error(),
            Some(Error::CyclePrevented { block, .. }) if *block == chain[0]
        ));
    }

    #[test]
    fn own_next_is_a_cycle() {
        let mut canvas = MockCanvas::new();
        let a = fixtures::print_text(&mut canvas, "a");
        assert!(would_cycle(&canvas, a, canvas.next_connection(a).unwrap()));
        let b = fixtures::print_text(&mut canvas, "b");
        assert!(!would_cycle(&canvas, a, canvas.next_connection(b).unwrap()));
    }

    #[test]
    fn host_faults_clear_slots() {
        let mut canvas = MockCanvas::new();
        let a = fixtures::print_text(&mut canvas, "a");
        let b = fixtures::print_text(&mut canvas, "b");
        let mut joiner = BlockJoiner::new();

        canvas.inject_connect_fault(ConnectError::Host(HostError::Rejected("busy".into())));
        joiner.push(&mut canvas, AstNode::block(b));
        let node = next_node(&canvas, a);
        joiner.push(&mut canvas, node);
        assert_eq!(joiner.last_outcome(), Some(JoinOutcome::HostFault));
        assert!(!joiner.is_pending());

        canvas.inject_connect_fault(ConnectError::Cyclic);
        joiner.push(&mut canvas, AstNode::block(b));
        let node = next_node(&canvas, a);
        joiner.push(&mut canvas, node);
        assert_eq!(joiner.last_outcome(), Some(JoinOutcome::ReloadRequired));
        assert!(!joiner.is_pending());
        assert_eq!(canvas.connect_calls(), 2);
    }

    #[test]
    fn outcome_follows_recovery_action() {
        let mut canvas = MockCanvas::new();
        let a = fixtures::print_text(&mut canvas, "a");
        let b = fixtures::print_text(&mut canvas, "b");
        let mut joiner = BlockJoiner::new();
        let faults = [
            (
                ConnectError::Incompatible { reason: "shape".into() },
                RecoveryAction::Ignore,
                JoinOutcome::Mismatch,
            ),
            (
                ConnectError::Host(HostError::Rejected("busy".into())),
                RecoveryAction::AbandonAction,
                JoinOutcome::HostFault,
            ),
            (ConnectError::Cyclic, RecoveryAction::ReloadView, JoinOutcome::ReloadRequired),
        ];
        for (fault, recovery, outcome) in faults {
            canvas.inject_connect_fault(fault);
            joiner.push(&mut canvas, AstNode::block(b));
            let node = next_node(&canvas, a);
            joiner.push(&mut canvas, node);
            assert_eq!(joiner.last_outcome(), Some(outcome));
            assert_eq!(joiner.last_error().map(Error::recovery), Some(recovery));
        }
    }

    #[test]
    fn disconnect_block_starts_new_stack() {
        let mut canvas = MockCanvas::new();
        let a = fixtures::print_text(&mut canvas, "a");
        let b = fixtures::print_text(&mut canvas, "b");
        canvas.attach_next(a, b).unwrap();
        let mut joiner = BlockJoiner::new();

        joiner.push(&mut canvas, AstNode::block(b));
        assert!(joiner.disconnect_block(&mut canvas));
        assert_eq!(joiner.held(), None);
        assert_eq!(canvas.top_blocks(), vec![a, b]);

        joiner.push(&mut canvas, AstNode::block(b));
        assert!(!joiner.disconnect_block(&mut canvas));
        assert_eq!(joiner.held(), Some(AstNode::block(b)));
    }

    #[test]
    fn vanished_slots_are_dropped() {
        let mut canvas = MockCanvas::new();
        let a = fixtures::print_text(&mut canvas, "a");
        let mut joiner = BlockJoiner::new();
        joiner.push(&mut canvas, AstNode::block(a));
        canvas.dispose(a).unwrap();
        joiner.retain_existing(&canvas);
        assert!(!joiner.is_pending());
    }
}
