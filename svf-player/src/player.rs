use std::{
    iter,
    time::{Duration, Instant},
};

use svf_protocol::{
    Instruction, Register, RegisterName, ShiftSpec, TapState, error::StructuralError,
    report::FaultRecord, report::FaultReport,
};

use crate::{
    JtagBus,
    context::ExecutionContext,
    error::{PlayerError, RunError},
    shift,
    timing::wait_until,
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Record verification failures and keep going instead of stopping at the first one.
    pub continue_on_fault: bool,
    /// Waits shorter than this are spun on the monotonic clock instead of slept.
    pub spin_threshold: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            continue_on_fault: false,
            spin_threshold: Duration::from_millis(2),
        }
    }
}

/// Builder to create a [Player] instance and modify configuration options
///
/// # Example
///
/// ```ignore
/// use svf_player::player::Builder;
/// use std::time::Duration;
///
/// let player = Builder::new()
///     .continue_on_fault(true)
///     .spin_threshold(Duration::from_micros(500))
///     .build(my_bus);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Keep executing after a verification failure.
    pub fn continue_on_fault(mut self, enabled: bool) -> Self {
        self.config.continue_on_fault = enabled;
        self
    }

    /// Set the remaining wait time below which the player spins instead of sleeping
    pub fn spin_threshold(mut self, threshold: Duration) -> Self {
        self.config.spin_threshold = threshold;
        self
    }

    /// Build and return the player
    pub fn build<B: JtagBus>(self, bus: B) -> Player<B> {
        Player::new(bus, self.config)
    }
}

/// Everything a run leaves behind.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub faults: FaultReport,
    /// TAP state after the last executed clock.
    pub final_state: TapState,
    /// Total number of TCK pulses issued.
    pub clock_pulses: u64,
    /// Wall-clock duration of the run, including bus setup and teardown.
    pub elapsed: Duration,
}

impl RunReport {
    fn new(context: Option<ExecutionContext>, start: Instant) -> RunReport {
        match context {
            Some(context) => RunReport {
                final_state: context.tap.state(),
                clock_pulses: context.tap.pulses(),
                faults: context.report,
                elapsed: start.elapsed(),
            },
            None => RunReport {
                faults: FaultReport::new(),
                final_state: TapState::Reset,
                clock_pulses: 0,
                elapsed: start.elapsed(),
            },
        }
    }

    /// Whether any verification failure was recorded.
    pub fn is_failed(&self) -> bool {
        self.faults.is_failed()
    }
}

/// Executes SVF instruction sequences on a [`JtagBus`].
#[derive(Debug)]
pub struct Player<B: JtagBus> {
    bus: B,
    config: Config,
}

impl<B: JtagBus> Player<B> {
    pub fn new(bus: B, config: Config) -> Player<B> {
        Player { bus, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Executes `instructions` from a freshly reset TAP.
    ///
    /// The bus is acquired before the first clock and released on every exit path. On
    /// failure the returned [`RunError`] still carries the faults recorded so far.
    pub fn run(&mut self, instructions: &[Instruction]) -> Result<RunReport, RunError> {
        let start = Instant::now();
        log::info!("Executing {} instructions", instructions.len());

        let mut context = match ExecutionContext::new(&self.config) {
            Ok(context) => context,
            Err(e) => {
                return Err(RunError {
                    error: e.into(),
                    report: RunReport::new(None, start),
                });
            }
        };

        if let Err(e) = self.bus.init() {
            log::error!("Could not initialize GPIOs: {}", e);
            return Err(RunError {
                error: e.into(),
                report: RunReport::new(None, start),
            });
        }

        let result = self.execute_all(&mut context, instructions);
        self.bus.shutdown();

        let report = RunReport::new(Some(context), start);
        log::info!(
            "Execution took {:.6} seconds ({} clock pulses, {} faults)",
            report.elapsed.as_secs_f64(),
            report.clock_pulses,
            report.faults.len()
        );

        match result {
            Ok(()) => Ok(report),
            Err(error) => {
                log::error!("Execution stopped: {}", error);
                Err(RunError { error, report })
            }
        }
    }

    fn execute_all(
        &mut self,
        context: &mut ExecutionContext,
        instructions: &[Instruction],
    ) -> Result<(), PlayerError> {
        context.tap.reset(&mut self.bus)?;
        for (index, instruction) in instructions.iter().enumerate() {
            log::debug!("Executing {} (#{})", instruction.name(), index);
            self.execute(context, instruction)?;
        }
        Ok(())
    }

    /// Process each instruction, updating the context or driving the bus.
    fn execute(
        &mut self,
        context: &mut ExecutionContext,
        instruction: &Instruction,
    ) -> Result<(), PlayerError> {
        match instruction {
            Instruction::SetEndState { register, state } => {
                context.set_end_state(*register, *state)?;
            }
            Instruction::SetFrequency { hz } => {
                context.tap.set_frequency(*hz)?;
                log::debug!("TCK delay: {:?}", context.tap.delay());
            }
            Instruction::SetHeader { register, pattern } => {
                let name = RegisterName::header(*register);
                let updated = context.registers.update(name, pattern)?;
                log::debug!("{} {}", name, updated);
            }
            Instruction::SetTrailer { register, pattern } => {
                let name = RegisterName::trailer(*register);
                let updated = context.registers.update(name, pattern)?;
                log::debug!("{} {}", name, updated);
            }
            Instruction::Shift {
                register,
                pattern,
                label,
            } => self.scan(context, *register, pattern, label.as_deref())?,
            Instruction::RunTest {
                run_state,
                run_count,
                min_time,
                max_time,
                end_state,
            } => self.run_test(
                context,
                *run_state,
                *run_count,
                seconds(*min_time)?,
                max_time.map(seconds).transpose()?,
                *end_state,
            )?,
            Instruction::GoToState { target, path: None } => {
                context.tap.route_to(&mut self.bus, *target)?;
            }
            Instruction::GoToState {
                target,
                path: Some(path),
            } => {
                for state in path.iter().chain(iter::once(target)) {
                    context.tap.step_to(&mut self.bus, *state)?;
                }
            }
            Instruction::Unsupported { command } => {
                return Err(PlayerError::Unsupported(command.to_string()));
            }
            Instruction::Unknown => {
                return Err(PlayerError::Unsupported("Unknown instruction".to_string()));
            }
        }
        Ok(())
    }

    /// Scans `delta` through `register`, between the persisted header and trailer.
    fn scan(
        &mut self,
        context: &mut ExecutionContext,
        register: Register,
        delta: &ShiftSpec,
        label: Option<&str>,
    ) -> Result<(), PlayerError> {
        let name = RegisterName::payload(register);
        let payload = context.registers.update(name, delta)?;
        log::debug!("{} {}", name, payload);

        context.tap.route_to(&mut self.bus, register.shift_state())?;
        let segments = context.registers.segments(register);
        let result = shift::shift(&mut context.tap, &mut self.bus, &segments)?;
        let passed = shift::verify(segments.payload, result.payload());
        if !passed {
            log::warn!(
                "{} mismatch{}: expected {:02x?}, got {:02x?}",
                name,
                label.map(|l| format!(" at {}", l)).unwrap_or_default(),
                segments.payload.tdo.as_deref().unwrap_or_default(),
                result.payload()
            );
            context
                .report
                .push(FaultRecord::new(label, segments.payload, result.payload()));
        }

        // Exit1 -> Pause, then on to the configured end state.
        context.tap.clock(&mut self.bus, false, false)?;
        let end_state = context.end_state(register);
        context.tap.route_to(&mut self.bus, end_state)?;

        if !passed && !context.continue_on_fault() {
            return Err(PlayerError::Verification {
                label: label.unwrap_or("unlabeled").to_string(),
            });
        }
        Ok(())
    }

    /// Idles in `run_state` for `run_count` clocks and at least `min_time`.
    ///
    /// `max_time` stops the clock loop early once exceeded. The minimum time is measured
    /// from the start of the instruction and waited out without clocking.
    fn run_test(
        &mut self,
        context: &mut ExecutionContext,
        run_state: Option<TapState>,
        run_count: u32,
        min_time: Duration,
        max_time: Option<Duration>,
        end_state: Option<TapState>,
    ) -> Result<(), PlayerError> {
        let start = Instant::now();
        if let Some(state) = run_state {
            if state != context.tap.state() {
                context.tap.route_to(&mut self.bus, state)?;
            }
        }

        let max_time = max_time.filter(|max| !max.is_zero());
        for cycle in 0..run_count {
            if let Some(max) = max_time {
                if start.elapsed() > max {
                    log::warn!(
                        "RUNTEST maximum time {:?} exceeded after {} of {} cycles",
                        max,
                        cycle,
                        run_count
                    );
                    break;
                }
            }
            context.tap.clock(&mut self.bus, false, false)?;
        }

        wait_until(start + min_time, context.tap.spin_threshold());

        if let Some(state) = end_state {
            context.tap.route_to(&mut self.bus, state)?;
        }
        Ok(())
    }
}

fn seconds(value: f64) -> Result<Duration, StructuralError> {
    Duration::try_from_secs_f64(value).map_err(|_| StructuralError::InvalidTime(value))
}

#[cfg(test)]
mod test {
    use std::io;

    use svf_protocol::{UnsupportedKind, error::StateError};

    use super::*;
    use crate::Line;

    /// Echoes TDI on TDO and tracks init/shutdown calls.
    #[derive(Default)]
    struct Echo {
        tdi: bool,
        invert: bool,
        inits: usize,
        shutdowns: usize,
        fail_init: bool,
    }

    impl JtagBus for Echo {
        fn init(&mut self) -> io::Result<()> {
            self.inits += 1;
            if self.fail_init {
                return Err(io::Error::other("no GPIO"));
            }
            Ok(())
        }

        fn write(&mut self, line: Line, level: bool) -> io::Result<()> {
            if line == Line::Tdi {
                self.tdi = level;
            }
            Ok(())
        }

        fn read(&mut self, _line: Line) -> io::Result<bool> {
            Ok(self.tdi ^ self.invert)
        }

        fn shutdown(&mut self) {
            self.shutdowns += 1;
        }
    }

    fn sdr(tdi: u8, tdo: u8, label: &str) -> Instruction {
        Instruction::Shift {
            register: Register::Data,
            pattern: ShiftSpec::new(8).with_tdi([tdi]).with_tdo([tdo]),
            label: Some(label.to_string()),
        }
    }

    #[test]
    fn empty_run_only_resets() {
        let mut player = Builder::new().build(Echo::default());
        let report = player.run(&[]).unwrap();
        assert_eq!(report.clock_pulses, 5);
        assert_eq!(report.final_state, TapState::Reset);
        assert!(!report.is_failed());
        assert_eq!(player.bus().inits, 1);
        assert_eq!(player.bus().shutdowns, 1);
    }

    #[test]
    fn scan_ends_in_end_state() {
        let mut player = Builder::new().build(Echo::default());
        let report = player
            .run(&[
                Instruction::SetEndState {
                    register: Register::Data,
                    state: TapState::DrPause,
                },
                sdr(0x5A, 0x5A, "id"),
            ])
            .unwrap();
        assert_eq!(report.final_state, TapState::DrPause);
        assert!(report.faults.is_empty());
    }

    #[test]
    fn mismatch_stops_by_default() {
        let mut player = Builder::new().build(Echo::default());
        let err = player
            .run(&[sdr(0x01, 0x02, "first"), sdr(0x01, 0x01, "second")])
            .unwrap_err();
        assert!(matches!(
            &err.error,
            PlayerError::Verification { label } if label == "first"
        ));
        assert_eq!(err.report.faults.len(), 1);
        // The exit sequence still completes.
        assert_eq!(err.report.final_state, TapState::Idle);
        assert_eq!(player.bus().shutdowns, 1);
    }

    #[test]
    fn mismatch_is_recorded_when_continuing() {
        let mut player = Builder::new()
            .continue_on_fault(true)
            .build(Echo::default());
        let report = player
            .run(&[sdr(0x01, 0x02, "first"), sdr(0x03, 0x03, "second")])
            .unwrap();
        assert!(report.is_failed());
        assert_eq!(report.faults.faults()[0].label(), "first");
        assert_eq!(report.faults.len(), 1);
    }

    #[test]
    fn unsupported_instruction_is_fatal() {
        let mut player = Builder::new().build(Echo::default());
        let err = player
            .run(&[Instruction::Unsupported {
                command: UnsupportedKind::Trst,
            }])
            .unwrap_err();
        assert_eq!(err.to_string(), "TRST is currently not implemented");
        assert_eq!(player.bus().shutdowns, 1);
    }

    #[test]
    fn failed_init_is_hardware_error() {
        let mut player = Builder::new().build(Echo {
            fail_init: true,
            ..Echo::default()
        });
        let err = player.run(&[sdr(0, 0, "x")]).unwrap_err();
        assert!(matches!(err.error, PlayerError::Hardware(_)));
        assert_eq!(err.report.clock_pulses, 0);
    }

    #[test]
    fn explicit_path_must_be_adjacent() {
        let mut player = Builder::new().build(Echo::default());
        let report = player
            .run(&[Instruction::GoToState {
                target: TapState::DrPause,
                path: Some(vec![
                    TapState::Idle,
                    TapState::DrSelect,
                    TapState::DrCapture,
                    TapState::DrExit1,
                ]),
            }])
            .unwrap();
        assert_eq!(report.final_state, TapState::DrPause);
        assert_eq!(report.clock_pulses, 5 + 5);

        let err = player
            .run(&[Instruction::GoToState {
                target: TapState::DrShift,
                path: Some(vec![TapState::Idle]),
            }])
            .unwrap_err();
        assert!(matches!(
            err.error,
            PlayerError::State(StateError::NotNeighbor {
                from: TapState::Idle,
                to: TapState::DrShift
            })
        ));
    }

    #[test]
    fn runtest_clocks_in_run_state() {
        let mut player = Builder::new().build(Echo::default());
        let report = player
            .run(&[Instruction::RunTest {
                run_state: Some(TapState::Idle),
                run_count: 10,
                min_time: 0.0,
                max_time: None,
                end_state: Some(TapState::DrPause),
            }])
            .unwrap();
        // Reset, one clock to Idle, ten idle clocks, four clocks to DrPause.
        assert_eq!(report.clock_pulses, 5 + 1 + 10 + 4);
        assert_eq!(report.final_state, TapState::DrPause);
    }

    #[test]
    fn negative_time_is_structural_error() {
        let mut player = Builder::new().build(Echo::default());
        let err = player
            .run(&[Instruction::RunTest {
                run_state: None,
                run_count: 1,
                min_time: -1.0,
                max_time: None,
                end_state: None,
            }])
            .unwrap_err();
        assert!(matches!(
            err.error,
            PlayerError::Structural(StructuralError::InvalidTime(_))
        ));
    }

    #[test]
    fn inverted_tdo_fails_verification() {
        let mut player = Builder::new()
            .continue_on_fault(true)
            .build(Echo {
                invert: true,
                ..Echo::default()
            });
        let report = player.run(&[sdr(0xF0, 0xF0, "inv")]).unwrap();
        let fault = &report.faults.faults()[0];
        assert_eq!(fault.tdo(), "F0");
        assert_eq!(fault.data(), "0F");
    }
}
