#![forbid(unsafe_code)]

//! Blockline Runtime
//!
//! This crate ties the core and render crates together into a working
//! overlay: it owns the host canvas, reacts to its change events, applies
//! user actions, and publishes the accessible view.
//!
//! # Key Components
//!
//! - [`RenderDispatcher`] - Event and action pipeline; one synchronous render per cycle
//! - [`SelectionState`] - Focused node, branch, and creation cooldown
//! - [`BlockJoiner`] - Two-slot move protocol with a cycle check
//! - [`ViewStore`] - Lock-free holder of the published [`AccessibleView`]
//! - [`OverlayConfig`] - Debounce, cooldown, and render toggles
//!
//! # Role in Blockline
//! `blockline-runtime` is the orchestrator. Host events from `blockline-core`
//! pass through the debouncer into [`SelectionState`]; the render crate's
//! `LinearizationEngine` turns the result into a view, which is swapped into
//! the [`ViewStore`] in one step.
//!
//! # How it fits in the system
//! A host embeds one [`RenderDispatcher`] per canvas, calls
//! [`pump`](RenderDispatcher::pump)/[`fire`](RenderDispatcher::fire) (or
//! [`poll`](RenderDispatcher::poll)) from its event loop, and forwards item
//! activations to [`activate`](RenderDispatcher::activate).

pub mod config;
pub mod dispatcher;
pub mod joiner;
pub mod selection;
pub mod view;

pub use config::{OverlayConfig, OverlayConfigError};
pub use dispatcher::RenderDispatcher;
pub use joiner::{BlockJoiner, JoinOutcome};
pub use selection::{SelectionChange, SelectionState};
pub use view::{AccessibleView, ViewStore};
