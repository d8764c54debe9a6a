#![forbid(unsafe_code)]

//! Render: the linear, screen-reader view of a block canvas.
//!
//! # Role in Blockline
//! `blockline-render` turns the host's block tree into an accessible
//! [`RenderNode`] tree: a breadcrumb trail and a nested list. It reads the
//! host only through [`BlockHost`](blockline_core::BlockHost) and never
//! mutates it.
//!
//! # Primary responsibilities
//! - **LinearizationEngine**: tree-to-list projection in workspace and
//!   single-node modes.
//! - **NodeRenderer**: items for blocks, fields, input slots, and branches.
//! - **Branch**: on-demand arms of multi-branch constructs.
//! - **Capability**: exhaustive classification of connections and fields.
//!
//! # How it fits in the system
//! `blockline-runtime` builds a [`RenderContext`] from its selection and move
//! state, calls [`LinearizationEngine::render`], and publishes the result.
//! Activating an item hands its [`Action`] back to the runtime.

pub mod branch;
pub mod capability;
pub mod color;
pub mod linearize;
pub mod markers;
pub mod node_renderer;
pub mod render_node;
pub mod walk;

pub use branch::{Branch, branches};
pub use capability::Capability;
pub use color::Rgb;
pub use linearize::{Linearization, LinearizationEngine, RenderContext};
pub use markers::{StackMarkers, marker_for, next_marker};
pub use node_renderer::NodeRenderer;
pub use render_node::{Action, Control, ItemFlags, RenderNode, Role};
