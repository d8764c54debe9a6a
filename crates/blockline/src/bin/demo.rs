#![forbid(unsafe_code)]

//! Walkthrough of the overlay on the reference canvas.
//!
//! Run with: `cargo run -p blockline --features demo --bin blockline-demo`
//!
//! Prints the linear view after each step: the workspace, a focused loop, a
//! move of the loop's last statement to the top of the program, and a burst
//! of host events collapsing into one render. Set `RUST_LOG=blockline=debug`
//! to see the pipeline's JSON logs on stderr.

use blockline::prelude::*;
use blockline_harness::{MockCanvas, fixtures};

fn show(title: &str, overlay: &RenderDispatcher<MockCanvas>) {
    let view = overlay.view();
    println!("── {title} (generation {}) ──", view.generation);
    print!("{}", view.outline());
    println!();
}

fn main() -> blockline::Result<()> {
    blockline::core::logging::init_json_logging();

    let mut canvas = MockCanvas::new();
    let program = fixtures::sample_program(&mut canvas);
    let mut overlay = blockline::attach(canvas);
    show("workspace", &overlay);

    overlay.activate(&Action::Select(AstNode::block(program.repeat)))?;
    show("focused loop", &overlay);

    overlay.activate(&Action::PickUp(AstNode::block(program.repeat)))?;
    let above_main = overlay
        .host()
        .previous_connection(program.main)
        .and_then(|conn| overlay.host().connection_node(conn));
    if let Some(target) = above_main {
        overlay.activate(&Action::PlaceAt(target))?;
    }
    overlay.activate(&Action::SelectWorkspace)?;
    show("after moving the loop to the top", &overlay);

    let start = Instant::now();
    for block in [program.main, program.helper, program.stray] {
        overlay.host_mut().select(block);
    }
    overlay.poll(start);
    let window = overlay.config().debounce_window();
    overlay.poll(start + window);
    show("after a burst of canvas clicks", &overlay);
    Ok(())
}
