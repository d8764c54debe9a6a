#![forbid(unsafe_code)]

//! Error model and recovery policy.
//!
//! # Design Principles
//!
//! 1. **No retries**: every failure abandons the current action and leaves
//!    prior state intact, except a cyclic fault, which forces a view reload.
//! 2. **Typed host failures**: hosts report rejections as [`HostError`] or
//!    [`ConnectError`] so the overlay can tell a benign mismatch from a fault.
//! 3. **One recovery table**: [`Error::recovery`] maps every variant to a
//!    [`RecoveryAction`]; callers never decide ad hoc.

use crate::ast::{BlockId, ConnectionId, FieldId};
use std::fmt;

// ── Host Errors ─────────────────────────────────────────────────────────

/// A host operation was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The block no longer exists.
    UnknownBlock(BlockId),
    /// The connection no longer exists.
    UnknownConnection(ConnectionId),
    /// The field no longer exists.
    UnknownField(FieldId),
    /// A disconnect was requested on a connection with nothing attached.
    NotConnected(ConnectionId),
    /// The host refused the operation for its own reasons.
    Rejected(String),
}

/// Why a connect attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The two connections are structurally incompatible (wrong type or
    /// shape). Benign: the move is simply not performed.
    Incompatible { reason: String },
    /// The host detected that the connection would make the tree cyclic.
    /// The host view cannot be trusted afterwards.
    Cyclic,
    /// Any other host failure.
    Host(HostError),
}

// ── Unified Error ───────────────────────────────────────────────────────

/// Top-level overlay error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A host operation failed.
    Host(HostError),
    /// A connect attempt failed.
    Connect(ConnectError),
    /// A move was refused because the target lies inside the moving block.
    CyclePrevented {
        block: BlockId,
        target: ConnectionId,
    },
}

/// Standard result type for overlay APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// What the overlay does after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Treat as a no-op; nothing is surfaced beyond the missing UI change.
    Ignore,
    /// Log a warning, abandon the current action, keep the last rendered view.
    AbandonAction,
    /// The host view is unrecoverable; reload it.
    ReloadView,
}

impl Error {
    /// Recovery action for this error.
    #[must_use]
    pub fn recovery(&self) -> RecoveryAction {
        match self {
            Self::Connect(ConnectError::Incompatible { .. }) => RecoveryAction::Ignore,
            Self::CyclePrevented { .. } => RecoveryAction::Ignore,
            Self::Connect(ConnectError::Cyclic) => RecoveryAction::ReloadView,
            Self::Connect(ConnectError::Host(_)) => RecoveryAction::AbandonAction,
            Self::Host(_) => RecoveryAction::AbandonAction,
        }
    }

    /// Error type label for tracing fields.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Host(_) => "host",
            Self::Connect(ConnectError::Incompatible { .. }) => "mismatch",
            Self::Connect(ConnectError::Cyclic) => "cyclic",
            Self::Connect(ConnectError::Host(_)) => "connect",
            Self::CyclePrevented { .. } => "cycle_prevented",
        }
    }
}

// ── Display ─────────────────────────────────────────────────────────────

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownBlock(id) => write!(f, "unknown {id}"),
            Self::UnknownConnection(id) => write!(f, "unknown {id}"),
            Self::UnknownField(id) => write!(f, "unknown {id}"),
            Self::NotConnected(id) => write!(f, "{id} is not connected"),
            Self::Rejected(reason) => write!(f, "host rejected operation: {reason}"),
        }
    }
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incompatible { reason } => write!(f, "incompatible connection: {reason}"),
            Self::Cyclic => f.write_str("connection would create a cycle"),
            Self::Host(err) => write!(f, "connect failed: {err}"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(err) => write!(f, "{err}"),
            Self::Connect(err) => write!(f, "{err}"),
            Self::CyclePrevented { block, target } => {
                write!(f, "moving {block} onto {target} would nest it inside itself")
            }
        }
    }
}

impl std::error::Error for HostError {}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Host(err) => Some(err),
            Self::Connect(err) => Some(err),
            Self::CyclePrevented { .. } => None,
        }
    }
}

// ── Conversions ─────────────────────────────────────────────────────────

impl From<HostError> for Error {
    fn from(err: HostError) -> Self {
        Self::Host(err)
    }
}

impl From<ConnectError> for Error {
    fn from(err: ConnectError) -> Self {
        Self::Connect(err)
    }
}

impl From<HostError> for ConnectError {
    fn from(err: HostError) -> Self {
        Self::Host(err)
    }
}
