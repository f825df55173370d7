use std::fmt;

use log::{debug, info, trace};

use crate::{
    ds::{ControlWord, Opcode, StatusFlags},
    error::ConfigError,
    layout::{Address, AddressLayout},
    table::{ConditionTable, InstructionTable},
};

/// The compiled decoder ROM: one control word per address.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RomImage {
    layout: AddressLayout,
    words: Vec<ControlWord>,
}

impl RomImage {
    pub(crate) fn len(&self) -> usize {
        self.words.len()
    }

    pub(crate) fn layout(&self) -> AddressLayout {
        self.layout
    }

    /// Raw 16-bit words in address order, as burned into the ROM.
    pub(crate) fn raw_words(&self) -> impl Iterator<Item = u16> + '_ {
        self.words.iter().map(|word| word.bits())
    }

    #[cfg(test)]
    pub(crate) fn get(&self, address: Address) -> Option<ControlWord> {
        self.words.get(usize::from(address)).copied()
    }

    #[cfg(test)]
    pub(crate) fn at(
        &self,
        flags: StatusFlags,
        opcode: u8,
        step: usize,
    ) -> Result<ControlWord, ConfigError> {
        let address = self.layout.encode(flags, opcode, step)?;
        Ok(self.words[usize::from(address)])
    }
}

/// Expands an instruction table over every (flags, opcode, step) address.
#[derive(Debug)]
pub(crate) struct RomCompiler<'a> {
    table: &'a InstructionTable,
    conditions: &'a ConditionTable,
    layout: AddressLayout,
}

impl<'a> RomCompiler<'a> {
    /// Compiler for the narrowest address layout that fits `table`.
    pub(crate) fn new(
        table: &'a InstructionTable,
        conditions: &'a ConditionTable,
    ) -> Result<Self, ConfigError> {
        let layout = AddressLayout::fitting(table.max_opcode(), table.cycle_steps())?;
        Self::with_layout(table, conditions, layout)
    }

    pub(crate) fn with_layout(
        table: &'a InstructionTable,
        conditions: &'a ConditionTable,
        layout: AddressLayout,
    ) -> Result<Self, ConfigError> {
        table.validate()?;
        // The highest opcode and last step must both be addressable.
        layout.encode(
            StatusFlags::all(),
            table.max_opcode(),
            table.cycle_steps().saturating_sub(1),
        )?;
        Ok(RomCompiler {
            table,
            conditions,
            layout,
        })
    }

    pub(crate) fn compile(&self) -> RomImage {
        info!(
            "Compiling {} opcodes ({} conditional) into {} words, {}-bit address",
            self.table.opcodes().count(),
            self.conditions.len(),
            self.layout.size(),
            self.layout.bits()
        );
        for opcode in self.table.opcodes() {
            if let Some(body) = self.table.body(opcode) {
                debug!("{:>4}: {:?}", Mnemonic(opcode), body);
            }
        }

        let addresses = self.layout.addresses();
        let words = addresses.map(|address| self.resolve(address)).collect();
        RomImage {
            layout: self.layout,
            words,
        }
    }

    fn resolve(&self, address: Address) -> ControlWord {
        // Reset leaves the instruction register at 0 with clear flags, so the first addresses must
        // hold the fetch cycle. Opcode 0 is reserved, so nothing else lives there.
        let fetch = self.table.fetch();
        if let Some(&word) = fetch.get(usize::from(address)) {
            return word;
        }
        let (flags, opcode, step) = self.layout.decode(address);
        if let Some(word) = self.conditions.suppress(flags, opcode, step) {
            trace!(
                "{:#05x}: {} step {} suppressed, flags {:?}",
                address,
                Mnemonic(opcode),
                step,
                flags
            );
            return word;
        }
        self.word(opcode, step)
    }

    /// Unconditional control word of `opcode` at `step`.
    pub(crate) fn word(&self, opcode: u8, step: usize) -> ControlWord {
        if !self.table.contains(opcode) || step >= self.table.cycle_steps() {
            return ControlWord::IDLE;
        }
        let fetch = self.table.fetch();
        if let Some(&word) = fetch.get(step) {
            return word;
        }
        let body_word = self.table.body_word(opcode, step - fetch.len());
        body_word.unwrap_or(ControlWord::IDLE)
    }
}

/// An opcode shown by mnemonic, or as `#n` outside the instruction set.
struct Mnemonic(u8);

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match Opcode::from_code(self.0) {
            Some(op) => f.pad(op.mnemonic()),
            None => write!(f, "#{}", self.0),
        }
    }
}
