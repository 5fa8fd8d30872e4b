use svf_protocol::{
    Register, RegisterName, ShiftSpec, TapState,
    error::{StateError, StructuralError},
    report::FaultReport,
};

use crate::{driver::TapDriver, player::Config, shift::Segments};

/// The six persistent shift registers.
#[derive(Clone, Debug, Default)]
pub struct Registers {
    hdr: ShiftSpec,
    hir: ShiftSpec,
    sdr: ShiftSpec,
    sir: ShiftSpec,
    tdr: ShiftSpec,
    tir: ShiftSpec,
}

impl Registers {
    pub fn get(&self, name: RegisterName) -> &ShiftSpec {
        match name {
            RegisterName::Hdr => &self.hdr,
            RegisterName::Hir => &self.hir,
            RegisterName::Sdr => &self.sdr,
            RegisterName::Sir => &self.sir,
            RegisterName::Tdr => &self.tdr,
            RegisterName::Tir => &self.tir,
        }
    }

    fn get_mut(&mut self, name: RegisterName) -> &mut ShiftSpec {
        match name {
            RegisterName::Hdr => &mut self.hdr,
            RegisterName::Hir => &mut self.hir,
            RegisterName::Sdr => &mut self.sdr,
            RegisterName::Sir => &mut self.sir,
            RegisterName::Tdr => &mut self.tdr,
            RegisterName::Tir => &mut self.tir,
        }
    }

    /// Merges `delta` into the register `name` and returns its new contents.
    pub fn update(
        &mut self,
        name: RegisterName,
        delta: &ShiftSpec,
    ) -> Result<&ShiftSpec, StructuralError> {
        let register = self.get_mut(name);
        register.merge(delta, name)?;
        Ok(register)
    }

    /// Header, payload and trailer for a scan of `register`.
    pub fn segments(&self, register: Register) -> Segments<'_> {
        Segments {
            header: self.get(RegisterName::header(register)),
            payload: self.get(RegisterName::payload(register)),
            trailer: self.get(RegisterName::trailer(register)),
        }
    }
}

/// All mutable state of a single run.
///
/// A context is created when a run starts and handed back as part of its report; nothing
/// carries over from one run to the next.
#[derive(Debug)]
pub struct ExecutionContext {
    pub tap: TapDriver,
    pub registers: Registers,
    end_dr: TapState,
    end_ir: TapState,
    continue_on_fault: bool,
    pub report: FaultReport,
}

impl ExecutionContext {
    pub fn new(config: &Config) -> Result<ExecutionContext, StateError> {
        Ok(ExecutionContext {
            tap: TapDriver::new(config.spin_threshold)?,
            registers: Registers::default(),
            end_dr: TapState::Idle,
            end_ir: TapState::Idle,
            continue_on_fault: config.continue_on_fault,
            report: FaultReport::new(),
        })
    }

    /// The state entered after a scan of `register`.
    pub fn end_state(&self, register: Register) -> TapState {
        match register {
            Register::Data => self.end_dr,
            Register::Instruction => self.end_ir,
        }
    }

    pub fn set_end_state(&mut self, register: Register, state: TapState) -> Result<(), StateError> {
        if !state.is_stable() {
            return Err(StateError::NotStable(state));
        }
        match register {
            Register::Data => self.end_dr = state,
            Register::Instruction => self.end_ir = state,
        }
        Ok(())
    }

    pub fn continue_on_fault(&self) -> bool {
        self.continue_on_fault
    }

    /// Whether any verification failure was recorded.
    pub fn is_failed(&self) -> bool {
        self.report.is_failed()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn segments_pick_register_family() {
        let mut registers = Registers::default();
        registers
            .update(RegisterName::Hir, &ShiftSpec::new(4).with_tdi([0x0F]))
            .unwrap();
        registers
            .update(RegisterName::Tdr, &ShiftSpec::new(2).with_tdi([0x03]))
            .unwrap();

        let ir = registers.segments(Register::Instruction);
        assert_eq!(ir.header.length, 4);
        assert_eq!(ir.trailer.length, 0);

        let dr = registers.segments(Register::Data);
        assert_eq!(dr.header.length, 0);
        assert_eq!(dr.trailer.length, 2);
    }

    #[test]
    fn end_states_default_to_idle_and_must_be_stable() {
        let mut context = ExecutionContext::new(&Config::default()).unwrap();
        assert_eq!(context.end_state(Register::Data), TapState::Idle);
        assert_eq!(context.end_state(Register::Instruction), TapState::Idle);

        context.set_end_state(Register::Data, TapState::DrPause).unwrap();
        assert_eq!(context.end_state(Register::Data), TapState::DrPause);
        assert_eq!(
            context.set_end_state(Register::Instruction, TapState::IrExit1),
            Err(StateError::NotStable(TapState::IrExit1))
        );
    }
}
