#![forbid(unsafe_code)]

//! Change notifications emitted by the host canvas.
//!
//! The host reports every structural or UI change as a [`ChangeEvent`]. The
//! overlay never reacts to an event inline: events go through a
//! [`ChangeSender`] into the dispatcher's queue, are coalesced by the
//! debouncer, and drive exactly one render per burst.

use crate::ast::BlockId;
use std::sync::mpsc;

/// A change reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A block was dragged or reattached.
    BlockMove { block: BlockId },
    /// Blocks were created; the first id is the root of the new subtree.
    BlockCreate { blocks: Vec<BlockId> },
    /// Blocks were disposed.
    BlockDelete { blocks: Vec<BlockId> },
    /// A field value or block shape changed.
    BlockChange { block: BlockId },
    /// The host finished loading a workspace.
    FinishedLoading,
    /// The user clicked or selected a block on the canvas.
    UiSelect { block: BlockId },
    /// Any other UI event (scroll, zoom, toolbox open, ...).
    Ui,
}

/// Coarse category of a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Move,
    Create,
    Delete,
    Change,
    Load,
    Select,
    Ui,
}

impl ChangeEvent {
    /// Coarse category, used for logging and selection mapping.
    #[must_use]
    pub fn category(&self) -> EventCategory {
        match self {
            Self::BlockMove { .. } => EventCategory::Move,
            Self::BlockCreate { .. } => EventCategory::Create,
            Self::BlockDelete { .. } => EventCategory::Delete,
            Self::BlockChange { .. } => EventCategory::Change,
            Self::FinishedLoading => EventCategory::Load,
            Self::UiSelect { .. } => EventCategory::Select,
            Self::Ui => EventCategory::Ui,
        }
    }

    /// The block the event is primarily about, if any.
    #[must_use]
    pub fn primary_block(&self) -> Option<BlockId> {
        match self {
            Self::BlockMove { block }
            | Self::BlockChange { block }
            | Self::UiSelect { block } => Some(*block),
            Self::BlockCreate { blocks } | Self::BlockDelete { blocks } => blocks.first().copied(),
            Self::FinishedLoading | Self::Ui => None,
        }
    }

    /// Whether the event always resets overlay state (selection and pending
    /// move). A delete only resets it once the workspace is empty.
    #[must_use]
    pub fn resets_state(&self) -> bool {
        matches!(self, Self::FinishedLoading)
    }
}

impl EventCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Change => "change",
            Self::Load => "load",
            Self::Select => "select",
            Self::Ui => "ui",
        }
    }
}

/// Host-side handle for delivering change events to the overlay.
///
/// Cloneable; sending after the overlay is dropped is silently ignored.
#[derive(Debug, Clone)]
pub struct ChangeSender {
    inner: mpsc::Sender<ChangeEvent>,
}

impl ChangeSender {
    /// Create a connected sender/receiver pair.
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<ChangeEvent>) {
        let (inner, receiver) = mpsc::channel();
        (Self { inner }, receiver)
    }

    /// Deliver an event. Returns `false` if the overlay is gone.
    pub fn send(&self, event: ChangeEvent) -> bool {
        self.inner.send(event).is_ok()
    }
}
