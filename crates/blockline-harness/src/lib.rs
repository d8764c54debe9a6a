#![forbid(unsafe_code)]

//! Test harness for Blockline.
//!
//! # Role in Blockline
//! `blockline-harness` provides [`MockCanvas`], an in-memory host that
//! implements [`BlockHost`](blockline_core::BlockHost) with the documented
//! cursor shape, plus fixtures that build realistic programs on it. Render and
//! runtime tests, the benchmark, and the demo all run against it.
//!
//! # Fault injection
//! [`MockCanvas::inject_connect_fault`] makes the next `connect` fail with a
//! chosen error, and [`MockCanvas::connect_calls`] counts attempts, so tests
//! can check both recovery and that refused moves never reach the host.

pub mod canvas;
pub mod fixtures;
pub mod spec;

pub use canvas::MockCanvas;
pub use fixtures::{SampleProgram, Sketch};
pub use spec::{BlockSpec, FieldSpec, InputSpec};
