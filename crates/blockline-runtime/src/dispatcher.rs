#![forbid(unsafe_code)]

//! The render pipeline.
//!
//! [`RenderDispatcher`] owns the host and every piece of overlay state. Each
//! render cycle runs synchronously to completion:
//!
//! ```text
//! host event ─► SelectionState ─► debouncer ─► LinearizationEngine ─► ViewStore
//!                                                    ▲
//! user action ─► activate ─► BlockJoiner / host ─────┘
//! ```
//!
//! Host events arrive through a channel and are only drained by
//! [`pump`](RenderDispatcher::pump), so no host callback ever re-enters the
//! pipeline mid-render. User actions are applied and rendered immediately.

use std::sync::Arc;
use std::sync::mpsc::Receiver;

use crate::config::OverlayConfig;
use crate::joiner::{BlockJoiner, JoinOutcome, detach};
use crate::selection::SelectionState;
use crate::view::{AccessibleView, ViewStore};
use blockline_core::{
    AstNode, BlockHost, ChangeDebouncer, ChangeEvent, ChangeSender, Error, FieldId, HostError,
    MutatorChange, RecoveryAction, Result, ScheduledRender,
};
use blockline_render::{Action, Control, LinearizationEngine, RenderContext};
use web_time::Instant;

/// Drives selection, moves, and rendering for one host canvas.
#[derive(Debug)]
pub struct RenderDispatcher<H: BlockHost> {
    host: H,
    config: OverlayConfig,
    engine: LinearizationEngine,
    selection: SelectionState,
    joiner: BlockJoiner,
    debouncer: ChangeDebouncer,
    events: Receiver<ChangeEvent>,
    view: Arc<ViewStore>,
    generation: u64,
}

impl<H: BlockHost> RenderDispatcher<H> {
    /// Subscribe to `host` and publish the initial workspace view.
    pub fn new(mut host: H, config: OverlayConfig) -> Self {
        let (sender, events) = ChangeSender::channel();
        host.subscribe(sender);
        let mut dispatcher = Self {
            host,
            engine: LinearizationEngine::new(),
            selection: SelectionState::new(config.cooldown()),
            joiner: BlockJoiner::new(),
            debouncer: ChangeDebouncer::new(config.debounce_window()),
            events,
            view: Arc::new(ViewStore::default()),
            generation: 0,
            config,
        };
        dispatcher.render_now();
        dispatcher
    }

    #[inline]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host access. Changes made here reach the overlay through the
    /// host's own change events.
    #[inline]
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[inline]
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    #[inline]
    pub fn joiner(&self) -> &BlockJoiner {
        &self.joiner
    }

    #[inline]
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Generation of the last committed render.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current view.
    #[must_use]
    pub fn view(&self) -> Arc<AccessibleView> {
        self.view.load()
    }

    /// Shared handle to the view store, for readers outside the UI thread.
    #[must_use]
    pub fn view_store(&self) -> Arc<ViewStore> {
        Arc::clone(&self.view)
    }

    /// Whether a debounced render is waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.debouncer.has_pending()
    }

    // ── Host events ─────────────────────────────────────────────────────

    /// Drain queued host events into the debouncer.
    ///
    /// Selection and move bookkeeping runs for every drained event, so a
    /// creation followed by auto-layout moves in the same burst still starts
    /// the cooldown. Only the render waits for the debounce window.
    ///
    /// Returns the timer handle for the latest event, if any arrived. Earlier
    /// handles from the same burst are stale.
    pub fn pump(&mut self, now: Instant) -> Option<ScheduledRender> {
        let mut scheduled = None;
        while let Ok(event) = self.events.try_recv() {
            self.track(&event, now);
            scheduled = Some(self.debouncer.notify(event, now));
        }
        scheduled
    }

    /// Timer callback. Renders if `generation` is still the latest scheduled
    /// render; stale callbacks do nothing. Returns whether it rendered.
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.debouncer.fire(generation).is_none() {
            return false;
        }
        self.render_now();
        true
    }

    /// Loop-driven alternative to timers: pump, then render if the debounce
    /// window has elapsed. Returns whether it rendered.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.pump(now);
        if self.debouncer.poll(now).is_none() {
            return false;
        }
        self.render_now();
        true
    }

    fn track(&mut self, event: &ChangeEvent, now: Instant) {
        let emptied = matches!(event, ChangeEvent::BlockDelete { .. })
            && self.host.top_blocks().is_empty();
        if event.resets_state() || emptied {
            self.joiner.cancel();
        }
        let change = self.selection.apply(event, now);
        tracing::trace!(block = ?event.primary_block(), ?change, "dispatch.track");
    }

    // ── Rendering ───────────────────────────────────────────────────────

    /// Render context for the current state.
    #[must_use]
    pub fn context(&self) -> RenderContext {
        RenderContext {
            selected: self.selection.selected(),
            branch: self.selection.branch(),
            held: self.joiner.held(),
            move_pending: self.joiner.is_pending(),
            end_labels: self.config.end_labels,
            breadcrumbs: self.config.breadcrumbs,
        }
    }

    /// Build and publish a new view now. Returns its generation.
    pub fn render_now(&mut self) -> u64 {
        self.selection.retain_existing(&self.host);
        self.joiner.retain_existing(&self.host);
        let ctx = self.context();
        let linearization = self.engine.render(&self.host, &ctx);
        self.generation += 1;
        let view = AccessibleView::present(linearization, self.generation);
        tracing::debug!(
            generation = self.generation,
            focus = ?view.focus,
            items = view.list.len(),
            move_pending = ctx.move_pending,
            "dispatch.render"
        );
        self.view.publish(view);
        self.generation
    }

    // ── User actions ────────────────────────────────────────────────────

    /// Apply the action of an activated item, then render.
    ///
    /// On error the action is abandoned, a warning is logged, and the last
    /// rendered view stays in place.
    pub fn activate(&mut self, action: &Action) -> Result<()> {
        let result = self.apply_action(action);
        self.finish_action("activate", result)
    }

    /// Write a new value into an editable field, then render.
    pub fn change_field(&mut self, field: FieldId, value: &str) -> Result<()> {
        let result = self.host.set_field_value(field, value).map_err(Error::from);
        self.finish_action("change_field", result)
    }

    /// Apply an edit made through a rendered control.
    pub fn edit(&mut self, control: &Control, value: &str) -> Result<()> {
        match control {
            Control::ArgumentName { block, index, .. } => {
                let change = MutatorChange::RenameArgument {
                    index: *index,
                    name: value.to_string(),
                };
                let result = self.host.mutate(*block, &change).map_err(Error::from);
                self.finish_action("edit", result)
            }
            Control::Text { field, .. }
            | Control::Number { field, .. }
            | Control::Dropdown { field, .. }
            | Control::Checkbox { field, .. } => self.change_field(*field, value),
        }
    }

    fn finish_action(&mut self, kind: &'static str, result: Result<()>) -> Result<()> {
        let Err(err) = result else {
            self.render_now();
            return Ok(());
        };
        match err.recovery() {
            RecoveryAction::Ignore => {
                tracing::debug!(kind, error = %err, "dispatch.action_ignored");
            }
            RecoveryAction::AbandonAction => {
                tracing::warn!(
                    kind,
                    error = %err,
                    error_type = err.error_type(),
                    "dispatch.action_abandoned"
                );
            }
            RecoveryAction::ReloadView => {
                self.reload();
                self.render_now();
            }
        }
        Err(err)
    }

    fn apply_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::SelectWorkspace => self.selection.select(AstNode::workspace()),
            Action::Select(node) => self.selection.select(*node),
            Action::SelectBranch { block, index } => self.selection.select_branch(*block, *index),
            Action::PickUp(node) | Action::PlaceAt(node) => self.push(*node)?,
            Action::Disconnect(node) => self.disconnect(*node)?,
            Action::Duplicate(block) => {
                let copy = self.host.duplicate(*block)?;
                self.selection.select(AstNode::block(copy));
            }
            Action::Delete(block) => self.host.dispose(*block)?,
            Action::Mutate { block, change } => self.host.mutate(*block, change)?,
            Action::CancelMove => self.joiner.cancel(),
        }
        Ok(())
    }

    fn push(&mut self, node: AstNode) -> Result<()> {
        if !self.joiner.push(&mut self.host, node) {
            let reason = format!("{node} is neither a block nor a connection");
            return Err(HostError::Rejected(reason).into());
        }
        if self.joiner.last_outcome() == Some(JoinOutcome::ReloadRequired) {
            self.reload();
        }
        Ok(())
    }

    fn disconnect(&mut self, node: AstNode) -> Result<()> {
        if self.joiner.held() == Some(node) {
            self.joiner.disconnect_block(&mut self.host);
            return Ok(());
        }
        let block = node
            .block_id()
            .ok_or_else(|| HostError::Rejected(format!("{node} is not a block")))?;
        detach(&mut self.host, block)?;
        Ok(())
    }

    /// Last-resort recovery after the host reported a cyclic structure.
    fn reload(&mut self) {
        tracing::error!(generation = self.generation, "dispatch.reload_view");
        self.host.reload_view();
        self.selection.clear();
        self.joiner.cancel();
        self.debouncer.clear();
    }
}
