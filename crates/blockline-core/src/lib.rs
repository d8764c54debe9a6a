#![forbid(unsafe_code)]

//! Core: block-tree cursor model, host interface, change events, debouncing.
//!
//! # Role in Blockline
//! `blockline-core` is the boundary with the host canvas. It defines the
//! value-typed [`AstNode`](ast::AstNode) cursor, the snapshots the overlay
//! reads, the [`BlockHost`](host::BlockHost) trait the canvas implements, and
//! the change events the canvas emits.
//!
//! # Primary responsibilities
//! - **AstNode**: positions in the block tree, compared by identity.
//! - **BlockHost**: enumeration, cursor movement, and mutations.
//! - **ChangeEvent**: host notifications, delivered through a channel.
//! - **ChangeDebouncer**: one render per burst of notifications.
//! - **Error**: failure taxonomy and its recovery table.
//!
//! # How it fits in the system
//! `blockline-render` walks the host through this crate's types to build the
//! linear view; `blockline-runtime` owns the debouncer, selection, and move
//! protocol and calls host mutations.

pub mod ast;
pub mod block;
pub mod debounce;
pub mod error;
pub mod event;
pub mod host;
pub mod logging;

pub use ast::{AstNode, BlockId, ConnectionId, Entity, FieldId, Location, NodeKind};
pub use block::{
    BlockInfo, ConnectionInfo, ConnectionKind, Construct, DropdownOption, FieldInfo, FieldKind,
    InputInfo, InputKind, MutatorChange, MutatorInfo,
};
pub use debounce::{ChangeDebouncer, ScheduledRender};
pub use error::{ConnectError, Error, HostError, RecoveryAction, Result};
pub use event::{ChangeEvent, ChangeSender, EventCategory};
pub use host::BlockHost;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
