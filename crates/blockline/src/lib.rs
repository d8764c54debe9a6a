#![forbid(unsafe_code)]

//! Blockline public facade crate.
//!
//! This crate provides the stable surface area for hosts embedding the
//! overlay. It re-exports common types from the internal crates and offers a
//! lightweight prelude.
//!
//! ```rust,ignore
//! use blockline::prelude::*;
//!
//! let mut overlay = blockline::attach(my_canvas);
//! loop {
//!     overlay.poll(Instant::now());
//!     let view = overlay.view();
//!     // hand view.breadcrumbs / view.list to the screen reader
//! }
//! ```

// --- Core re-exports -------------------------------------------------------

pub use blockline_core::{
    AstNode, BlockHost, BlockId, BlockInfo, ChangeEvent, ChangeSender, ConnectError,
    ConnectionId, Error, FieldId, HostError, MutatorChange, NodeKind, RecoveryAction, Result,
};

// --- Render re-exports -----------------------------------------------------

pub use blockline_render::{
    Action, Capability, Control, ItemFlags, Linearization, LinearizationEngine, RenderContext,
    RenderNode, Role,
};

// --- Runtime re-exports ----------------------------------------------------

pub use blockline_runtime::{
    AccessibleView, JoinOutcome, OverlayConfig, OverlayConfigError, RenderDispatcher, ViewStore,
};

/// Attach an overlay to `host`, configured from defaults and the
/// `BLOCKLINE_*` environment variables, and publish the first view.
pub fn attach<H: BlockHost>(host: H) -> RenderDispatcher<H> {
    RenderDispatcher::new(host, OverlayConfig::default().with_env_overrides())
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AccessibleView, Action, AstNode, BlockHost, BlockId, ChangeEvent, Control, Error,
        OverlayConfig, RenderDispatcher, RenderNode, Result, Role,
    };

    pub use crate::{core, render, runtime};

    pub use web_time::{Duration, Instant};
}

pub use blockline_core as core;
pub use blockline_render as render;
pub use blockline_runtime as runtime;
