use std::{io, path::PathBuf};

use thiserror::Error;

use crate::ds::StatusFlags;

/// A table, layout or condition that cannot be compiled into a ROM image.
#[derive(Debug, Error, PartialEq)]
pub(crate) enum ConfigError {
    #[error("Opcode 0 is reserved and cannot be defined")]
    ReservedOpcode,
    #[error("Opcode {0} defined more than once")]
    DuplicateOpcode(u8),
    #[error("Opcode {opcode} has {len} steps, but only {max} fit after the fetch cycle")]
    BodyTooLong { opcode: u8, len: usize, max: usize },
    #[error("Opcode {0} has no table entry")]
    MissingOpcode(u8),
    #[error("Fetch cycle has {fetch} steps, but instructions only have {steps}")]
    FetchTooLong { fetch: usize, steps: usize },
    #[error("Address needs {bits} bits, but the ROM only has {max} address lines")]
    AddressTooWide { bits: u32, max: u32 },
    #[error("Value {value} does not fit the {bits}-bit {field} field")]
    FieldOverflow {
        field: &'static str,
        value: usize,
        bits: u32,
    },
    #[error("Condition refers to undefined opcode {0}")]
    UnknownConditionOpcode(u8),
    #[error("Condition for opcode {opcode} must be bound to exactly one flag, got {flags:?}")]
    AmbiguousConditionFlag { opcode: u8, flags: StatusFlags },
    #[error("Condition for opcode {opcode} suppresses step {step}, outside steps {first}..{end}")]
    ConditionStepOutOfRange {
        opcode: u8,
        step: usize,
        first: usize,
        end: usize,
    },
    #[error("Opcode {0} is bound to more than one condition")]
    DuplicateCondition(u8),
}

/// The ROM image could not be written out.
#[derive(Debug, Error)]
#[error("Error writing '{}': {source}", .path.display())]
pub(crate) struct OutputError {
    path: PathBuf,
    source: io::Error,
}

impl OutputError {
    pub(crate) fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        OutputError {
            path: path.into(),
            source,
        }
    }
}
