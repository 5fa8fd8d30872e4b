//! Clocking the bus while tracking the TAP controller state.
use std::time::{Duration, Instant};

use svf_protocol::{TapState, error::StateError, error::StructuralError, tap::RouteTable};

use crate::{JtagBus, Line, error::PlayerError, timing::wait_until};

/// Number of TMS high clocks that force any TAP into Test-Logic-Reset.
const RESET_CLOCKS: usize = 5;

/// Drives single clock cycles and keeps the TAP state in sync with them.
///
/// The driver does not own the bus. Every operation borrows it, so the driver can live in
/// the execution context next to the registers it is shifting.
#[derive(Debug)]
pub struct TapDriver {
    state: TapState,
    routes: RouteTable,
    delay: Option<Duration>,
    spin_threshold: Duration,
    last_rise: Option<Instant>,
    pulses: u64,
}

impl TapDriver {
    /// Builds the route table, failing if any stable pair is unreachable.
    pub fn new(spin_threshold: Duration) -> Result<TapDriver, StateError> {
        Ok(TapDriver {
            state: TapState::Reset,
            routes: RouteTable::build()?,
            delay: None,
            spin_threshold,
            last_rise: None,
            pulses: 0,
        })
    }

    pub fn state(&self) -> TapState {
        self.state
    }

    /// Minimum time between two rising TCK edges, if any.
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    /// Number of TCK pulses issued so far.
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    pub fn spin_threshold(&self) -> Duration {
        self.spin_threshold
    }

    /// Limits the clock rate to `hz` cycles per second. Zero removes the limit.
    pub fn set_frequency(&mut self, hz: f64) -> Result<(), StructuralError> {
        if hz == 0.0 {
            self.delay = None;
            return Ok(());
        }
        if !hz.is_finite() || hz < 0.0 {
            return Err(StructuralError::InvalidFrequency(hz));
        }
        let delay = Duration::try_from_secs_f64(1.0 / hz)
            .map_err(|_| StructuralError::InvalidFrequency(hz))?;
        self.delay = Some(delay);
        Ok(())
    }

    /// Performs one TCK cycle with the given TMS and TDI levels and returns the sampled TDO.
    ///
    /// TMS and TDI are set up while TCK is low. TDO is sampled after the rising edge.
    pub fn clock<B: JtagBus + ?Sized>(
        &mut self,
        bus: &mut B,
        tms: bool,
        tdi: bool,
    ) -> Result<bool, PlayerError> {
        bus.write(Line::Tms, tms)?;
        bus.write(Line::Tdi, tdi)?;
        bus.write(Line::Tck, false)?;

        if let (Some(delay), Some(last_rise)) = (self.delay, self.last_rise) {
            wait_until(last_rise + delay, self.spin_threshold);
        }

        bus.write(Line::Tck, true)?;
        self.last_rise = Some(Instant::now());
        self.pulses += 1;
        self.state = self.state.transition(tms);

        Ok(bus.read(Line::Tdo)?)
    }

    /// Clocks a TMS sequence with TDI held low.
    pub fn clock_tms<B: JtagBus + ?Sized>(
        &mut self,
        bus: &mut B,
        tms: &[bool],
    ) -> Result<(), PlayerError> {
        for &level in tms {
            self.clock(bus, level, false)?;
        }
        Ok(())
    }

    /// Forces the TAP into Test-Logic-Reset regardless of its current state.
    pub fn reset<B: JtagBus + ?Sized>(&mut self, bus: &mut B) -> Result<(), PlayerError> {
        self.clock_tms(bus, &[true; RESET_CLOCKS])?;
        debug_assert_eq!(self.state, TapState::Reset);
        Ok(())
    }

    /// Moves to the stable state `target` along the canonical route.
    pub fn route_to<B: JtagBus + ?Sized>(
        &mut self,
        bus: &mut B,
        target: TapState,
    ) -> Result<(), PlayerError> {
        // The route is copied out so the table is not borrowed while clocking.
        let route = self.routes.route_to_stable(self.state, target)?.to_vec();
        log::trace!("Route {} -> {}: {:?}", self.state, target, route);
        self.clock_tms(bus, &route)?;
        Ok(())
    }

    /// Moves to `target`, which must be reachable with a single clock.
    pub fn step_to<B: JtagBus + ?Sized>(
        &mut self,
        bus: &mut B,
        target: TapState,
    ) -> Result<(), PlayerError> {
        let tms = self
            .state
            .is_immediate_neighbor(target)
            .ok_or(StateError::NotNeighbor {
                from: self.state,
                to: target,
            })?;
        self.clock(bus, tms, false)?;
        Ok(())
    }
}
