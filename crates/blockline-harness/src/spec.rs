#![forbid(unsafe_code)]

//! Declarative block shapes for the reference canvas.

use blockline_core::{Construct, DropdownOption, FieldKind, InputKind, MutatorInfo};

/// Shape of a block to create on a [`MockCanvas`](crate::MockCanvas).
#[derive(Debug, Clone)]
pub struct BlockSpec {
    pub(crate) type_name: String,
    pub(crate) construct: Construct,
    pub(crate) hue: Option<u16>,
    pub(crate) shadow: bool,
    pub(crate) previous: bool,
    pub(crate) next: bool,
    pub(crate) output: bool,
    pub(crate) inputs: Vec<InputSpec>,
    pub(crate) mutator: Option<MutatorInfo>,
}

impl BlockSpec {
    fn bare(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            construct: Construct::Plain,
            hue: None,
            shadow: false,
            previous: false,
            next: false,
            output: false,
            inputs: Vec::new(),
            mutator: None,
        }
    }

    /// A statement block with previous and next connections.
    #[must_use]
    pub fn statement(type_name: impl Into<String>) -> Self {
        Self {
            previous: true,
            next: true,
            ..Self::bare(type_name)
        }
    }

    /// An expression block with an output connection.
    #[must_use]
    pub fn value(type_name: impl Into<String>) -> Self {
        Self {
            output: true,
            ..Self::bare(type_name)
        }
    }

    /// A block that can only sit at the top of a stack (function definitions).
    #[must_use]
    pub fn hat(type_name: impl Into<String>) -> Self {
        Self::bare(type_name)
    }

    #[must_use]
    pub fn construct(mut self, construct: Construct) -> Self {
        self.construct = construct;
        self
    }

    #[must_use]
    pub fn hue(mut self, hue: u16) -> Self {
        self.hue = Some(hue);
        self
    }

    #[must_use]
    pub fn shadow(mut self) -> Self {
        self.shadow = true;
        self
    }

    #[must_use]
    pub fn input(mut self, input: InputSpec) -> Self {
        self.inputs.push(input);
        self
    }

    #[must_use]
    pub fn mutator(mut self, mutator: MutatorInfo) -> Self {
        self.mutator = Some(mutator);
        self
    }
}

/// One input of a [`BlockSpec`].
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub(crate) name: String,
    pub(crate) label: String,
    pub(crate) kind: InputKind,
    pub(crate) is_return: bool,
    pub(crate) fields: Vec<FieldSpec>,
}

impl InputSpec {
    fn new(name: impl Into<String>, label: impl Into<String>, kind: InputKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            is_return: false,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn value(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, InputKind::Value)
    }

    #[must_use]
    pub fn statement(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, InputKind::Statement)
    }

    #[must_use]
    pub fn dummy(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, InputKind::Dummy)
    }

    /// Mark as the return-value input of a function definition.
    #[must_use]
    pub fn returns(mut self) -> Self {
        self.is_return = true;
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }
}

/// One field of an [`InputSpec`].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) value: String,
    pub(crate) options: Vec<DropdownOption>,
}

impl FieldSpec {
    fn new(name: impl Into<String>, kind: FieldKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::new("", FieldKind::Label, text)
    }

    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text, value)
    }

    #[must_use]
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, FieldKind::Number, format_number(value))
    }

    /// Dropdown with `(text, value)` options; `value` selects the initial one.
    #[must_use]
    pub fn dropdown(name: impl Into<String>, value: impl Into<String>, options: &[(&str, &str)]) -> Self {
        let mut spec = Self::new(name, FieldKind::Dropdown, value);
        spec.options = options
            .iter()
            .map(|(text, value)| DropdownOption::new(*text, *value))
            .collect();
        spec
    }

    #[must_use]
    pub fn checkbox(name: impl Into<String>, checked: bool) -> Self {
        Self::new(name, FieldKind::Checkbox, if checked { "TRUE" } else { "FALSE" })
    }

    #[must_use]
    pub fn variable(name: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Variable, variable)
    }
}

/// Format a number the way numeric fields store it (`3`, not `3.0`).
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_have_no_fraction() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(2.5), "2.5");
    }
}
