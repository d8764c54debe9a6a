#![forbid(unsafe_code)]

//! Ready-made block shapes and programs.
//!
//! Builders create blocks silently with [`MockCanvas::add`] and wire them with
//! the silent attach helpers, so a fixture can be built before the overlay
//! subscribes. Wiring failures are programming errors in the fixture and
//! panic with a descriptive message.

use crate::canvas::MockCanvas;
use crate::spec::{BlockSpec, FieldSpec, InputSpec};
use blockline_core::{BlockId, Construct, MutatorInfo};

/// Category hues, in degrees.
pub mod hue {
    pub const LOGIC: u16 = 210;
    pub const LOOPS: u16 = 120;
    pub const MATH: u16 = 230;
    pub const TEXT: u16 = 160;
    pub const LISTS: u16 = 260;
    pub const VARIABLES: u16 = 330;
    pub const PROCEDURES: u16 = 290;
}

const COMPARE_OPS: [(&str, &str); 4] = [("=", "EQ"), ("≠", "NEQ"), ("<", "LT"), (">", "GT")];

fn wire(result: Result<(), blockline_core::ConnectError>, what: &str) {
    if let Err(err) = result {
        panic!("fixture wiring failed ({what}): {err}");
    }
}

// ── Value blocks ────────────────────────────────────────────────────────

/// Shadow number, the default content of numeric inputs.
pub fn number(canvas: &mut MockCanvas, value: f64) -> BlockId {
    canvas.add(
        BlockSpec::value("math_number")
            .hue(hue::MATH)
            .shadow()
            .input(InputSpec::dummy("", "").field(FieldSpec::number("NUM", value))),
    )
}

/// Editable text literal.
pub fn text(canvas: &mut MockCanvas, value: &str) -> BlockId {
    canvas.add(
        BlockSpec::value("text")
            .hue(hue::TEXT)
            .input(InputSpec::dummy("", "").field(FieldSpec::text("TEXT", value))),
    )
}

/// Variable getter. Registers the variable on the canvas.
pub fn variable(canvas: &mut MockCanvas, name: &str) -> BlockId {
    canvas.define_variable(name);
    canvas.add(
        BlockSpec::value("variables_get")
            .hue(hue::VARIABLES)
            .input(InputSpec::dummy("", "").field(FieldSpec::variable("VAR", name))),
    )
}

/// Comparison with empty operands and an operator dropdown.
pub fn compare(canvas: &mut MockCanvas, op: &str) -> BlockId {
    canvas.add(
        BlockSpec::value("logic_compare")
            .hue(hue::LOGIC)
            .input(InputSpec::value("A", ""))
            .input(InputSpec::value("B", "").field(FieldSpec::dropdown("OP", op, &COMPARE_OPS))),
    )
}

/// `variable < limit`, fully populated.
pub fn less_than(canvas: &mut MockCanvas, variable_name: &str, limit: f64) -> BlockId {
    let cmp = compare(canvas, "LT");
    let lhs = variable(canvas, variable_name);
    let rhs = number(canvas, limit);
    wire(canvas.attach_input(cmp, "A", lhs), "compare lhs");
    wire(canvas.attach_input(cmp, "B", rhs), "compare rhs");
    cmp
}

/// List builder with `count` empty item inputs.
pub fn list_of(canvas: &mut MockCanvas, count: usize) -> BlockId {
    let mut spec = BlockSpec::value("lists_create_with")
        .hue(hue::LISTS)
        .input(InputSpec::dummy("", "create list with"))
        .mutator(MutatorInfo::ItemCount { count });
    for index in 0..count {
        spec = spec.input(InputSpec::value(format!("ADD{index}"), ""));
    }
    canvas.add(spec)
}

// ── Statement blocks ────────────────────────────────────────────────────

/// Print block with an empty value input.
pub fn print(canvas: &mut MockCanvas) -> BlockId {
    canvas.add(
        BlockSpec::statement("text_print")
            .hue(hue::TEXT)
            .input(InputSpec::value("TEXT", "print")),
    )
}

/// Print block with a text literal attached.
pub fn print_text(canvas: &mut MockCanvas, message: &str) -> BlockId {
    let block = print(canvas);
    let literal = text(canvas, message);
    wire(canvas.attach_input(block, "TEXT", literal), "print text");
    block
}

/// `set <name> to 0`.
pub fn set_variable(canvas: &mut MockCanvas, name: &str) -> BlockId {
    canvas.define_variable(name);
    let block = canvas.add(
        BlockSpec::statement("variables_set")
            .hue(hue::VARIABLES)
            .input(InputSpec::dummy("", "set").field(FieldSpec::variable("VAR", name)))
            .input(InputSpec::value("VALUE", "to")),
    );
    let zero = number(canvas, 0.0);
    wire(canvas.attach_input(block, "VALUE", zero), "set value");
    block
}

/// Statement with a checkbox field.
pub fn toggle(canvas: &mut MockCanvas, label: &str, checked: bool) -> BlockId {
    canvas.add(
        BlockSpec::statement("console_toggle")
            .hue(hue::TEXT)
            .input(InputSpec::dummy("", label).field(FieldSpec::checkbox("ENABLED", checked))),
    )
}

// ── Nesting constructs ──────────────────────────────────────────────────

/// Empty conditional with `else_ifs` extra arms and an optional else.
pub fn conditional(canvas: &mut MockCanvas, else_ifs: usize, has_else: bool) -> BlockId {
    let mut spec = BlockSpec::statement("controls_if")
        .hue(hue::LOGIC)
        .construct(Construct::Conditional)
        .mutator(MutatorInfo::ElseIf {
            else_if_count: else_ifs,
            has_else,
        })
        .input(InputSpec::value("IF0", "if"))
        .input(InputSpec::statement("DO0", "do"));
    for arm in 1..=else_ifs {
        spec = spec
            .input(InputSpec::value(format!("IF{arm}"), "else if"))
            .input(InputSpec::statement(format!("DO{arm}"), "do"));
    }
    if has_else {
        spec = spec.input(InputSpec::statement("ELSE", "else"));
    }
    canvas.add(spec)
}

/// Repeat with a shadow count attached.
pub fn repeat(canvas: &mut MockCanvas, times: f64) -> BlockId {
    let block = canvas.add(
        BlockSpec::statement("controls_repeat_ext")
            .hue(hue::LOOPS)
            .construct(Construct::Repeat)
            .input(InputSpec::value("TIMES", "repeat"))
            .input(InputSpec::statement("DO", "do")),
    );
    let count = number(canvas, times);
    wire(canvas.attach_input(block, "TIMES", count), "repeat count");
    block
}

pub fn while_loop(canvas: &mut MockCanvas) -> BlockId {
    canvas.add(
        BlockSpec::statement("controls_whileUntil")
            .hue(hue::LOOPS)
            .construct(Construct::While)
            .input(InputSpec::value("BOOL", "repeat").field(FieldSpec::dropdown(
                "MODE",
                "WHILE",
                &[("while", "WHILE"), ("until", "UNTIL")],
            )))
            .input(InputSpec::statement("DO", "do")),
    )
}

pub fn for_each(canvas: &mut MockCanvas, item: &str) -> BlockId {
    canvas.define_variable(item);
    canvas.add(
        BlockSpec::statement("controls_forEach")
            .hue(hue::LOOPS)
            .construct(Construct::For)
            .input(InputSpec::value("LIST", "for each item").field(FieldSpec::variable("VAR", item)))
            .input(InputSpec::statement("DO", "do")),
    )
}

/// Function definition. With `returns`, the return input follows the body.
pub fn function(canvas: &mut MockCanvas, name: &str, args: &[&str], returns: bool) -> BlockId {
    let mut spec = BlockSpec::hat(if returns {
        "procedures_defreturn"
    } else {
        "procedures_defnoreturn"
    })
    .hue(hue::PROCEDURES)
    .construct(Construct::Function { returns })
    .mutator(MutatorInfo::Arguments {
        names: args.iter().map(|arg| (*arg).to_string()).collect(),
    })
    .input(InputSpec::dummy("", "to").field(FieldSpec::text("NAME", name)))
    .input(InputSpec::statement("STACK", ""));
    if returns {
        spec = spec.input(InputSpec::value("RETURN", "return").returns());
    }
    canvas.add(spec)
}

// ── Composite programs ──────────────────────────────────────────────────

/// Statement-sequence sketch for building random or hand-written programs.
#[derive(Debug, Clone, PartialEq)]
pub enum Sketch {
    Print(String),
    Set(String),
    Repeat { times: u32, body: Vec<Sketch> },
    While { body: Vec<Sketch> },
    /// `arms` holds one body per if / else-if arm and must not be empty.
    If {
        arms: Vec<Vec<Sketch>>,
        otherwise: Option<Vec<Sketch>>,
    },
}

impl Sketch {
    /// Number of non-inline blocks the sketch creates.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        match self {
            Self::Print(_) | Self::Set(_) => 1,
            Self::Repeat { body, .. } | Self::While { body } => 1 + count_all(body),
            Self::If { arms, otherwise } => {
                1 + arms.iter().map(|arm| count_all(arm)).sum::<usize>()
                    + otherwise.as_deref().map_or(0, count_all)
            }
        }
    }
}

/// Total non-inline blocks across a sequence of sketches.
#[must_use]
pub fn count_all(items: &[Sketch]) -> usize {
    items.iter().map(Sketch::statement_count).sum()
}

/// Build a statement sequence; returns its first block.
pub fn build_sequence(canvas: &mut MockCanvas, items: &[Sketch]) -> Option<BlockId> {
    let mut head = None;
    let mut tail: Option<BlockId> = None;
    for item in items {
        let block = build_one(canvas, item);
        match tail {
            Some(prev) => wire(canvas.attach_next(prev, block), "sequence"),
            None => head = Some(block),
        }
        tail = Some(block);
    }
    head
}

fn build_body(canvas: &mut MockCanvas, parent: BlockId, input: &str, body: &[Sketch]) {
    if let Some(first) = build_sequence(canvas, body) {
        wire(canvas.attach_input(parent, input, first), "body");
    }
}

fn build_one(canvas: &mut MockCanvas, item: &Sketch) -> BlockId {
    match item {
        Sketch::Print(message) => print_text(canvas, message),
        Sketch::Set(name) => set_variable(canvas, name),
        Sketch::Repeat { times, body } => {
            let block = repeat(canvas, f64::from(*times));
            build_body(canvas, block, "DO", body);
            block
        }
        Sketch::While { body } => {
            let block = while_loop(canvas);
            let cond = less_than(canvas, "i", 10.0);
            wire(canvas.attach_input(block, "BOOL", cond), "while condition");
            build_body(canvas, block, "DO", body);
            block
        }
        Sketch::If { arms, otherwise } => {
            let block = conditional(canvas, arms.len().saturating_sub(1), otherwise.is_some());
            for (index, arm) in arms.iter().enumerate() {
                let cond = less_than(canvas, "x", index as f64 + 1.0);
                wire(canvas.attach_input(block, &format!("IF{index}"), cond), "if condition");
                build_body(canvas, block, &format!("DO{index}"), arm);
            }
            if let Some(body) = otherwise {
                build_body(canvas, block, "ELSE", body);
            }
            block
        }
    }
}

/// `depth` repeat blocks, each nested in the previous one's body. Outermost first.
pub fn nested_repeats(canvas: &mut MockCanvas, depth: usize) -> Vec<BlockId> {
    let chain: Vec<BlockId> = (0..depth)
        .map(|level| repeat(canvas, level as f64 + 2.0))
        .collect();
    for pair in chain.windows(2) {
        wire(canvas.attach_input(pair[0], "DO", pair[1]), "nested repeat");
    }
    chain
}

/// Handles into [`sample_program`].
#[derive(Debug, Clone, Copy)]
pub struct SampleProgram {
    /// `set x`, then a repeat holding an if/else-if/else.
    pub main: BlockId,
    pub repeat: BlockId,
    pub branch: BlockId,
    /// Function definition with a return value.
    pub helper: BlockId,
    /// A lone value block sitting on the canvas.
    pub stray: BlockId,
}

/// A small program with three stacks.
pub fn sample_program(canvas: &mut MockCanvas) -> SampleProgram {
    let main = set_variable(canvas, "x");
    let repeat = repeat(canvas, 3.0);
    wire(canvas.attach_next(main, repeat), "main");
    let branch = conditional(canvas, 1, true);
    wire(canvas.attach_input(repeat, "DO", branch), "repeat body");
    for (arm, limit) in [("IF0", 2.0), ("IF1", 5.0)] {
        let cond = less_than(canvas, "x", limit);
        wire(canvas.attach_input(branch, arm, cond), "branch condition");
    }
    for (arm, message) in [("DO0", "small"), ("DO1", "medium"), ("ELSE", "large")] {
        let body = print_text(canvas, message);
        wire(canvas.attach_input(branch, arm, body), "branch body");
    }

    let helper = function(canvas, "double", &["n"], true);
    let helper_body = print_text(canvas, "doubling");
    wire(canvas.attach_input(helper, "STACK", helper_body), "helper body");
    let result = variable(canvas, "n");
    wire(canvas.attach_input(helper, "RETURN", result), "helper return");

    let stray = text(canvas, "scratch");
    SampleProgram {
        main,
        repeat,
        branch,
        helper,
        stray,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockline_core::BlockHost;

    #[test]
    fn sample_program_has_three_stacks() {
        let mut canvas = MockCanvas::new();
        let program = sample_program(&mut canvas);
        assert_eq!(
            canvas.top_blocks(),
            vec![program.main, program.helper, program.stray]
        );
    }

    #[test]
    fn sketch_counts_statements() {
        let sketch = Sketch::If {
            arms: vec![vec![Sketch::Print("a".into())], vec![]],
            otherwise: Some(vec![Sketch::Repeat {
                times: 2,
                body: vec![Sketch::Set("x".into())],
            }]),
        };
        assert_eq!(sketch.statement_count(), 4);
    }

    #[test]
    fn built_sequence_is_one_stack() {
        let mut canvas = MockCanvas::new();
        let items = vec![
            Sketch::Print("a".into()),
            Sketch::While {
                body: vec![Sketch::Print("b".into())],
            },
        ];
        let head = build_sequence(&mut canvas, &items).unwrap();
        assert_eq!(canvas.top_blocks(), vec![head]);
    }

    #[test]
    fn descriptions_include_inline_values() {
        let mut canvas = MockCanvas::new();
        let cmp = less_than(&mut canvas, "x", 3.0);
        assert_eq!(canvas.block(cmp).unwrap().description, "x < 3");
        let func = function(&mut canvas, "double", &["n"], true);
        assert_eq!(canvas.block(func).unwrap().description, "to double with: n");
    }
}
