use crate::{ds::StatusFlags, error::ConfigError};

/// A decoder ROM address.
pub(crate) type Address = u16;

/// Address lines available on the decoder ROM.
pub(crate) const MAX_ADDRESS_BITS: u32 = Address::BITS;

/// How a (flags, opcode, step) triple is packed into a ROM address, most significant field first:
///
/// ```text
/// | flags (N C Z) | opcode | step |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AddressLayout {
    opcode_bits: u32,
    step_bits: u32,
}

/// Number of bits needed to hold `value`.
fn bits_for(value: usize) -> u32 {
    usize::BITS - value.leading_zeros()
}

impl AddressLayout {
    pub(crate) fn new(opcode_bits: u32, step_bits: u32) -> Result<Self, ConfigError> {
        if opcode_bits > u8::BITS {
            return Err(ConfigError::AddressTooWide {
                bits: opcode_bits,
                max: u8::BITS,
            });
        }
        let bits = StatusFlags::WIDTH + opcode_bits + step_bits;
        if bits > MAX_ADDRESS_BITS {
            return Err(ConfigError::AddressTooWide {
                bits,
                max: MAX_ADDRESS_BITS,
            });
        }
        Ok(AddressLayout {
            opcode_bits,
            step_bits,
        })
    }

    /// The narrowest layout holding opcodes up to `max_opcode` and `steps` micro-steps.
    pub(crate) fn fitting(max_opcode: u8, steps: usize) -> Result<Self, ConfigError> {
        Self::new(
            bits_for(usize::from(max_opcode)),
            bits_for(steps.saturating_sub(1)),
        )
    }

    pub(crate) fn bits(&self) -> u32 {
        StatusFlags::WIDTH + self.opcode_bits + self.step_bits
    }

    /// Number of addresses, which is also the number of words in the ROM image.
    pub(crate) fn size(&self) -> usize {
        1 << self.bits()
    }

    pub(crate) fn addresses(&self) -> impl Iterator<Item = Address> {
        (0..self.size()).map(|raw| raw as Address)
    }

    pub(crate) fn encode(
        &self,
        flags: StatusFlags,
        opcode: u8,
        step: usize,
    ) -> Result<Address, ConfigError> {
        let opcode = usize::from(opcode);
        check_field("opcode", opcode, self.opcode_bits)?;
        check_field("step", step, self.step_bits)?;
        let flags = usize::from(flags.bits());
        let raw = flags << (self.opcode_bits + self.step_bits) | opcode << self.step_bits | step;
        Ok(raw as Address)
    }

    pub(crate) fn decode(&self, address: Address) -> (StatusFlags, u8, usize) {
        let raw = usize::from(address);
        let step = raw & mask(self.step_bits);
        let opcode = (raw >> self.step_bits) & mask(self.opcode_bits);
        let flags = raw >> (self.opcode_bits + self.step_bits);
        (
            StatusFlags::from_bits_truncate(flags as u8),
            opcode as u8,
            step,
        )
    }
}

fn mask(bits: u32) -> usize {
    (1 << bits) - 1
}

fn check_field(field: &'static str, value: usize, bits: u32) -> Result<(), ConfigError> {
    if value > mask(bits) {
        return Err(ConfigError::FieldOverflow { field, value, bits });
    }
    Ok(())
}
