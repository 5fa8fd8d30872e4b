//! The TAP controller state machine and routing between its stable states.
use std::collections::{HashMap, VecDeque};

use crate::error::StateError;
use crate::protocol::TapState;

impl TapState {
    /// All sixteen states, in declaration order.
    pub const ALL: [TapState; 16] = [
        TapState::Reset,
        TapState::Idle,
        TapState::DrSelect,
        TapState::DrCapture,
        TapState::DrShift,
        TapState::DrExit1,
        TapState::DrPause,
        TapState::DrExit2,
        TapState::DrUpdate,
        TapState::IrSelect,
        TapState::IrCapture,
        TapState::IrShift,
        TapState::IrExit1,
        TapState::IrPause,
        TapState::IrExit2,
        TapState::IrUpdate,
    ];

    /// States that [`RouteTable`] can route between.
    /// The two shift states are included so scans can be entered directly.
    pub const STABLE: [TapState; 6] = [
        TapState::Reset,
        TapState::Idle,
        TapState::DrPause,
        TapState::IrPause,
        TapState::DrShift,
        TapState::IrShift,
    ];

    /// The state entered on the next rising TCK edge with the given TMS level.
    pub fn transition(self, tms: bool) -> TapState {
        use TapState::*;
        match (self, tms) {
            (Reset, true) => Reset,
            (Reset, false) => Idle,
            (Idle, true) => DrSelect,
            (Idle, false) => Idle,

            (DrSelect, true) => IrSelect,
            (DrSelect, false) => DrCapture,
            (DrCapture, true) => DrExit1,
            (DrCapture, false) => DrShift,
            (DrShift, true) => DrExit1,
            (DrShift, false) => DrShift,
            (DrExit1, true) => DrUpdate,
            (DrExit1, false) => DrPause,
            (DrPause, true) => DrExit2,
            (DrPause, false) => DrPause,
            (DrExit2, true) => DrUpdate,
            (DrExit2, false) => DrShift,
            (DrUpdate, true) => DrSelect,
            (DrUpdate, false) => Idle,

            (IrSelect, true) => Reset,
            (IrSelect, false) => IrCapture,
            (IrCapture, true) => IrExit1,
            (IrCapture, false) => IrShift,
            (IrShift, true) => IrExit1,
            (IrShift, false) => IrShift,
            (IrExit1, true) => IrUpdate,
            (IrExit1, false) => IrPause,
            (IrPause, true) => IrExit2,
            (IrPause, false) => IrPause,
            (IrExit2, true) => IrUpdate,
            (IrExit2, false) => IrShift,
            (IrUpdate, true) => DrSelect,
            (IrUpdate, false) => Idle,
        }
    }

    /// Returns the TMS level that moves from `self` to `target` in a single clock,
    /// or `None` if `target` is not adjacent.
    pub fn is_immediate_neighbor(self, target: TapState) -> Option<bool> {
        [false, true]
            .into_iter()
            .find(|&tms| self.transition(tms) == target)
    }

    pub fn is_stable(self) -> bool {
        TapState::STABLE.contains(&self)
    }
}

/// Precomputed TMS sequences between every pair of [`TapState::STABLE`] states.
///
/// Routes are derived from [`TapState::transition`] by a breadth-first search that
/// tries TMS low before TMS high, so each route is the shortest path and ties resolve
/// towards the sequence with more low bits first.
#[derive(Clone, Debug)]
pub struct RouteTable {
    routes: HashMap<(TapState, TapState), Vec<bool>>,
}

impl RouteTable {
    /// Builds the table and checks that every stable pair has a route.
    pub fn build() -> Result<RouteTable, StateError> {
        let mut routes = HashMap::with_capacity(TapState::STABLE.len() * TapState::STABLE.len());
        for from in TapState::STABLE {
            for to in TapState::STABLE {
                let path = shortest_path(from, to).ok_or(StateError::NoRoute { from, to })?;
                routes.insert((from, to), path);
            }
        }
        Ok(RouteTable { routes })
    }

    /// The TMS sequence leading from `from` to `to`. Empty if both are equal.
    pub fn route_to_stable(&self, from: TapState, to: TapState) -> Result<&[bool], StateError> {
        self.routes
            .get(&(from, to))
            .map(Vec::as_slice)
            .ok_or(StateError::NoRoute { from, to })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn shortest_path(from: TapState, to: TapState) -> Option<Vec<bool>> {
    let mut visited = [false; 16];
    let mut queue = VecDeque::new();
    visited[from as usize] = true;
    queue.push_back((from, Vec::new()));

    while let Some((state, path)) = queue.pop_front() {
        if state == to {
            return Some(path);
        }
        for tms in [false, true] {
            let next = state.transition(tms);
            if !visited[next as usize] {
                visited[next as usize] = true;
                let mut next_path = path.clone();
                next_path.push(tms);
                queue.push_back((next, next_path));
            }
        }
    }
    None
}
