use std::{collections::BTreeMap, rc::Rc};

use crate::{
    ds::{ControlWord, Opcode, StatusFlags},
    error::ConfigError,
};

/// Micro-steps per instruction, fetch included.
pub(crate) const CYCLE_STEPS: usize = 5;

/// The post-fetch control words of one instruction. Instructions with identical behaviour share
/// one body.
pub(crate) type Body = Rc<[ControlWord]>;

/// Control words for every defined opcode, keyed by machine encoding.
#[derive(Debug)]
pub(crate) struct InstructionTable {
    fetch: Vec<ControlWord>,
    cycle_steps: usize,
    bodies: BTreeMap<u8, Body>,
}

impl InstructionTable {
    pub(crate) fn new(fetch: &[ControlWord], cycle_steps: usize) -> Result<Self, ConfigError> {
        if fetch.len() > cycle_steps {
            return Err(ConfigError::FetchTooLong {
                fetch: fetch.len(),
                steps: cycle_steps,
            });
        }
        Ok(InstructionTable {
            fetch: fetch.to_vec(),
            cycle_steps,
            bodies: BTreeMap::new(),
        })
    }

    /// The table for the reference 12-instruction CPU.
    pub(crate) fn reference() -> Result<Self, ConfigError> {
        use ControlWord as W;

        let fetch = [W::MI | W::PO, W::RO | W::II | W::PE];
        let mut table = InstructionTable::new(&fetch, CYCLE_STEPS)?;

        let alu_add = W::EO | W::AI | W::FI;
        let alu_sub = W::SU | W::EO | W::AI | W::FI;
        let lda: Body = Rc::from([W::IO | W::MI, W::RO | W::AI]);
        let sta: Body = Rc::from([W::IO | W::MI, W::AO | W::RI]);
        let add: Body = Rc::from([W::IO | W::MI, W::RO | W::BI, alu_add]);
        let sub: Body = Rc::from([W::IO | W::MI, W::RO | W::BI, alu_sub]);
        let jump: Body = Rc::from([W::IO | W::PI]);

        table.define(Opcode::Ldi.code(), Rc::from([W::IO | W::AI]))?;
        table.define(Opcode::Lda.code(), lda)?;
        table.define(Opcode::Sta.code(), sta)?;
        table.define(Opcode::Add.code(), add)?;
        table.define(Opcode::Sub.code(), sub)?;
        table.define(Opcode::Hlt.code(), Rc::from([W::ST]))?;
        table.define(Opcode::Jmp.code(), Rc::clone(&jump))?;
        table.define(Opcode::Nop.code(), Rc::from([]))?;
        // Conditional jumps run the jump body; the condition table turns them into no-ops.
        table.define(Opcode::Jc.code(), Rc::clone(&jump))?;
        table.define(Opcode::Jz.code(), Rc::clone(&jump))?;
        table.define(Opcode::Jn.code(), Rc::clone(&jump))?;
        table.define(Opcode::Out.code(), Rc::from([W::AO | W::DO]))?;

        table.validate()?;
        Ok(table)
    }

    pub(crate) fn define(&mut self, opcode: u8, body: Body) -> Result<(), ConfigError> {
        if opcode == 0 {
            return Err(ConfigError::ReservedOpcode);
        }
        if self.bodies.contains_key(&opcode) {
            return Err(ConfigError::DuplicateOpcode(opcode));
        }
        if body.len() > self.body_steps() {
            return Err(ConfigError::BodyTooLong {
                opcode,
                len: body.len(),
                max: self.body_steps(),
            });
        }
        self.bodies.insert(opcode, body);
        Ok(())
    }

    /// Checks that the defined opcodes form the contiguous range `1..=max_opcode`.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let mut opcodes = 1..=self.max_opcode();
        match opcodes.find(|opcode| !self.contains(*opcode)) {
            Some(missing) => Err(ConfigError::MissingOpcode(missing)),
            None => Ok(()),
        }
    }

    pub(crate) fn fetch(&self) -> &[ControlWord] {
        &self.fetch
    }

    pub(crate) fn cycle_steps(&self) -> usize {
        self.cycle_steps
    }

    /// Steps left for the instruction body once the fetch cycle has run.
    pub(crate) fn body_steps(&self) -> usize {
        self.cycle_steps - self.fetch.len()
    }

    /// Highest defined opcode, or 0 when the table is empty.
    pub(crate) fn max_opcode(&self) -> u8 {
        self.bodies.keys().next_back().copied().unwrap_or(0)
    }

    pub(crate) fn opcodes(&self) -> impl Iterator<Item = u8> + '_ {
        self.bodies.keys().copied()
    }

    pub(crate) fn contains(&self, opcode: u8) -> bool {
        self.bodies.contains_key(&opcode)
    }

    pub(crate) fn body(&self, opcode: u8) -> Option<&Body> {
        self.bodies.get(&opcode)
    }

    /// Control word for a post-fetch step, idle past the end of the body. `None` for undefined
    /// opcodes.
    pub(crate) fn body_word(&self, opcode: u8, body_step: usize) -> Option<ControlWord> {
        let body = self.bodies.get(&opcode)?;
        let word = body.get(body_step).copied();
        Some(word.unwrap_or(ControlWord::IDLE))
    }
}

/// Turns the action of a flag-conditional instruction into `fallback` whenever `flag` is clear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Condition {
    pub(crate) opcode: u8,
    pub(crate) flag: StatusFlags,
    pub(crate) step: usize,
    pub(crate) fallback: ControlWord,
}

#[derive(Debug, Default)]
pub(crate) struct ConditionTable {
    conditions: BTreeMap<u8, Condition>,
}

impl ConditionTable {
    pub(crate) fn new() -> Self {
        ConditionTable::default()
    }

    /// Conditional jumps of the reference CPU. The jump happens on step 2, right after fetch.
    pub(crate) fn reference(table: &InstructionTable) -> Result<Self, ConfigError> {
        let mut conditions = ConditionTable::new();
        for (opcode, flag) in [
            (Opcode::Jc, StatusFlags::C),
            (Opcode::Jz, StatusFlags::Z),
            (Opcode::Jn, StatusFlags::N),
        ] {
            conditions.bind(
                table,
                Condition {
                    opcode: opcode.code(),
                    flag,
                    step: 2,
                    fallback: ControlWord::IDLE,
                },
            )?;
        }
        Ok(conditions)
    }

    pub(crate) fn bind(
        &mut self,
        table: &InstructionTable,
        condition: Condition,
    ) -> Result<(), ConfigError> {
        let opcode = condition.opcode;
        if !table.contains(opcode) {
            return Err(ConfigError::UnknownConditionOpcode(opcode));
        }
        if condition.flag.bits().count_ones() != 1 {
            return Err(ConfigError::AmbiguousConditionFlag {
                opcode,
                flags: condition.flag,
            });
        }
        let first = table.fetch().len();
        let end = table.cycle_steps();
        if !(first..end).contains(&condition.step) {
            return Err(ConfigError::ConditionStepOutOfRange {
                opcode,
                step: condition.step,
                first,
                end,
            });
        }
        if self.conditions.contains_key(&opcode) {
            return Err(ConfigError::DuplicateCondition(opcode));
        }
        self.conditions.insert(opcode, condition);
        Ok(())
    }

    pub(crate) fn get(&self, opcode: u8) -> Option<&Condition> {
        self.conditions.get(&opcode)
    }

    /// The word that replaces the table's word at this address, if the condition fails there.
    pub(crate) fn suppress(
        &self,
        flags: StatusFlags,
        opcode: u8,
        step: usize,
    ) -> Option<ControlWord> {
        let condition = self.get(opcode)?;
        if condition.step == step && !flags.contains(condition.flag) {
            Some(condition.fallback)
        } else {
            None
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.conditions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::ControlWord as W;

    fn small_table() -> InstructionTable {
        InstructionTable::new(&[W::MI | W::PO], 3).unwrap()
    }

    #[test]
    fn test_reference_table_defines_every_opcode() {
        let table = InstructionTable::reference().unwrap();
        assert_eq!(table.max_opcode(), 12);
        let opcodes: Vec<u8> = table.opcodes().collect();
        assert_eq!(opcodes, (1..=12).collect::<Vec<_>>());
        assert!(!table.contains(0));
        assert!(!table.contains(13));
        assert_eq!(table.body_steps(), 3);
        assert_eq!(table.fetch(), &[W::MI | W::PO, W::RO | W::II | W::PE]);
    }

    #[test]
    fn test_conditional_jumps_share_the_jump_body() {
        let table = InstructionTable::reference().unwrap();
        let jump = table.body(Opcode::Jmp.code()).unwrap();
        for op in [Opcode::Jc, Opcode::Jz, Opcode::Jn] {
            let body = table.body(op.code()).unwrap();
            assert!(Rc::ptr_eq(jump, body), "{:?}", op);
        }
    }

    #[test]
    fn test_body_word_pads_with_idle() {
        let table = InstructionTable::reference().unwrap();
        let add = Opcode::Add.code();
        let ldi = Opcode::Ldi.code();
        let nop = Opcode::Nop.code();
        let hlt = Opcode::Hlt.code();
        assert_eq!(table.body_word(add, 2), Some(W::EO | W::AI | W::FI));
        assert_eq!(table.body_word(ldi, 0), Some(W::IO | W::AI));
        assert_eq!(table.body_word(ldi, 1), Some(W::IDLE));
        assert_eq!(table.body_word(nop, 0), Some(W::IDLE));
        assert_eq!(table.body_word(hlt, 0), Some(W::ST));
        assert_eq!(table.body_word(13, 0), None);
    }

    #[test]
    fn test_error_reserved_opcode() {
        let mut table = small_table();
        let result = table.define(0, Rc::from([]));
        assert_eq!(result, Err(ConfigError::ReservedOpcode));
    }

    #[test]
    fn test_error_duplicate_opcode() {
        let mut table = small_table();
        table.define(1, Rc::from([W::AI])).unwrap();
        let err = table.define(1, Rc::from([W::BI])).unwrap_err();
        assert_eq!(err.to_string(), "Opcode 1 defined more than once");
    }

    #[test]
    fn test_error_body_too_long() {
        let mut table = small_table();
        let body: Body = Rc::from([W::AI, W::BI, W::FI]);
        let err = table.define(1, body).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Opcode 1 has 3 steps, but only 2 fit after the fetch cycle"
        );
    }

    #[test]
    fn test_error_missing_opcode() {
        let mut table = small_table();
        table.define(1, Rc::from([W::AI])).unwrap();
        table.define(3, Rc::from([W::BI])).unwrap();
        assert_eq!(table.validate(), Err(ConfigError::MissingOpcode(2)));
        table.define(2, Rc::from([])).unwrap();
        assert_eq!(table.validate(), Ok(()));
    }

    #[test]
    fn test_error_fetch_too_long() {
        let fetch = [W::MI, W::RO, W::II];
        let err = InstructionTable::new(&fetch, 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Fetch cycle has 3 steps, but instructions only have 2"
        );
    }

    #[test]
    fn test_reference_conditions() {
        let table = InstructionTable::reference().unwrap();
        let conditions = ConditionTable::reference(&table).unwrap();
        let flag = |op: Opcode| conditions.get(op.code()).map(|c| c.flag);
        assert_eq!(conditions.len(), 3);
        assert_eq!(flag(Opcode::Jc), Some(StatusFlags::C));
        assert_eq!(flag(Opcode::Jz), Some(StatusFlags::Z));
        assert_eq!(flag(Opcode::Jn), Some(StatusFlags::N));
        assert_eq!(flag(Opcode::Jmp), None);
    }

    #[test]
    fn test_suppress() {
        let table = InstructionTable::reference().unwrap();
        let conditions = ConditionTable::reference(&table).unwrap();
        let none = StatusFlags::empty();
        let others = StatusFlags::Z | StatusFlags::N;
        let jc = Opcode::Jc.code();
        let jmp = Opcode::Jmp.code();
        assert_eq!(conditions.suppress(none, jc, 2), Some(W::IDLE));
        assert_eq!(conditions.suppress(others, jc, 2), Some(W::IDLE));
        assert_eq!(conditions.suppress(StatusFlags::C, jc, 2), None);
        assert_eq!(conditions.suppress(none, jc, 3), None);
        assert_eq!(conditions.suppress(none, jmp, 2), None);
    }

    #[test]
    fn test_error_condition_binding() {
        let table = InstructionTable::reference().unwrap();
        let mut conditions = ConditionTable::new();
        let jc = Condition {
            opcode: Opcode::Jc.code(),
            flag: StatusFlags::C,
            step: 2,
            fallback: W::IDLE,
        };

        let unknown = Condition { opcode: 13, ..jc };
        assert_eq!(
            conditions.bind(&table, unknown),
            Err(ConfigError::UnknownConditionOpcode(13))
        );
        let two_flags = Condition {
            flag: StatusFlags::C | StatusFlags::Z,
            ..jc
        };
        let err = conditions.bind(&table, two_flags).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Condition for opcode 9 must be bound to exactly one flag, got C | Z"
        );
        let no_flag = Condition {
            flag: StatusFlags::empty(),
            ..jc
        };
        assert!(conditions.bind(&table, no_flag).is_err());
        let early = Condition { step: 1, ..jc };
        let err = conditions.bind(&table, early).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Condition for opcode 9 suppresses step 1, outside steps 2..5"
        );
        let late = Condition { step: 5, ..jc };
        assert!(conditions.bind(&table, late).is_err());

        conditions.bind(&table, jc).unwrap();
        let again = Condition {
            flag: StatusFlags::Z,
            ..jc
        };
        assert_eq!(
            conditions.bind(&table, again),
            Err(ConfigError::DuplicateCondition(9))
        );
    }
}
