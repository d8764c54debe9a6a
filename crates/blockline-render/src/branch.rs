#![forbid(unsafe_code)]

//! Branches of multi-branch constructs.
//!
//! A [`Branch`] is derived on demand from a block's connectable inputs and is
//! never stored on the block. Inputs are paired in order into
//! `(condition, body)`; a trailing unpaired input is an `else` arm with no
//! condition.

use crate::walk::attached_block;
use blockline_core::{BlockHost, BlockInfo, ConnectionId};

/// One arm of a multi-branch construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Zero-based ordinal within the block.
    pub index: usize,
    /// Condition input; `None` for the else arm.
    pub condition: Option<ConnectionId>,
    /// Statement input holding the arm's body.
    pub body: Option<ConnectionId>,
    /// Header text, e.g. `else if x < 5` or `else`.
    pub text: String,
}

impl Branch {
    #[inline]
    #[must_use]
    pub fn is_else(&self) -> bool {
        self.condition.is_none()
    }
}

/// Derive the branches of `block`. Empty for blocks with no connectable input.
pub fn branches<H: BlockHost + ?Sized>(host: &H, block: &BlockInfo) -> Vec<Branch> {
    let inputs: Vec<_> = block.connectable_inputs().collect();
    inputs
        .chunks(2)
        .enumerate()
        .filter_map(|(index, pair)| match pair {
            [condition, body] => {
                let described = condition
                    .connection
                    .and_then(|conn| attached_block(host, conn))
                    .and_then(|id| host.block(id))
                    .map_or_else(|| "(empty condition)".to_string(), |info| info.description);
                Some(Branch {
                    index,
                    condition: condition.connection,
                    body: body.connection,
                    text: join_label(&condition.label, &described),
                })
            }
            [otherwise] => Some(Branch {
                index,
                condition: None,
                body: otherwise.connection,
                text: if otherwise.label.is_empty() {
                    "else".to_string()
                } else {
                    otherwise.label.clone()
                },
            }),
            _ => None,
        })
        .collect()
}

fn join_label(label: &str, text: &str) -> String {
    if label.is_empty() {
        text.to_string()
    } else {
        format!("{label} {text}")
    }
}
