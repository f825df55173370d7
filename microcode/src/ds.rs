use bitflags::bitflags;

bitflags! {
    /// One micro-step's worth of control lines. Bit positions are fixed by the decoder board
    /// wiring, most significant line first.
    pub(crate) struct ControlWord: u16 {
        /// Halt the clock.
        const ST = 0x8000;
        const AI = 0x4000;
        const AO = 0x2000;
        const BI = 0x1000;
        /// Display register in.
        const DO = 0x0800;
        /// ALU (sum) out.
        const EO = 0x0400;
        const SU = 0x0200;
        const RI = 0x0100;
        const RO = 0x0080;
        const MI = 0x0040;
        const PI = 0x0020;
        const PO = 0x0010;
        /// Program counter count enable.
        const PE = 0x0008;
        const II = 0x0004;
        const IO = 0x0002;
        const FI = 0x0001;
    }
}

impl ControlWord {
    /// All lines off.
    pub(crate) const IDLE: ControlWord = ControlWord::empty();
}

impl Default for ControlWord {
    fn default() -> Self {
        ControlWord::IDLE
    }
}

bitflags! {
    /// CPU status flags as they appear on the decoder ROM's address lines.
    pub(crate) struct StatusFlags: u8 {
        const N = 0b100;
        const C = 0b010;
        const Z = 0b001;
    }
}

impl StatusFlags {
    pub(crate) const WIDTH: u32 = 3;

    /// Every combination of flags, in address order.
    #[cfg(test)]
    pub(crate) fn combinations() -> impl Iterator<Item = StatusFlags> {
        (0..1u8 << Self::WIDTH).map(StatusFlags::from_bits_truncate)
    }
}

/// Instruction set of the reference CPU. Discriminants are the machine encodings shared with the
/// assembler; 0 is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub(crate) enum Opcode {
    Ldi = 1,
    Lda = 2,
    Sta = 3,
    Add = 4,
    Sub = 5,
    Hlt = 6,
    Jmp = 7,
    Nop = 8,
    Jc = 9,
    Jz = 10,
    Jn = 11,
    Out = 12,
}

impl Opcode {
    pub(crate) const ALL: [Opcode; 12] = [
        Opcode::Ldi,
        Opcode::Lda,
        Opcode::Sta,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Hlt,
        Opcode::Jmp,
        Opcode::Nop,
        Opcode::Jc,
        Opcode::Jz,
        Opcode::Jn,
        Opcode::Out,
    ];

    pub(crate) fn code(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_code(code: u8) -> Option<Opcode> {
        Opcode::ALL.iter().copied().find(|op| op.code() == code)
    }

    pub(crate) fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Ldi => "LDI",
            Opcode::Lda => "LDA",
            Opcode::Sta => "STA",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Hlt => "HLT",
            Opcode::Jmp => "JMP",
            Opcode::Nop => "NOP",
            Opcode::Jc => "JC",
            Opcode::Jz => "JZ",
            Opcode::Jn => "JN",
            Opcode::Out => "OUT",
        }
    }
}
