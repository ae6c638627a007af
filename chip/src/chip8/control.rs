//! The two small state machines that can hold the execution pipeline.
use crate::opcode::{Address, Instruction, Opcode};

/// The wait for key state, entered by `FX0A`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WaitForKey {
    /// The pipeline runs freely.
    #[default]
    Idle,
    /// Fetch, decode and execute are suspended until a key is pressed.
    Waiting { register: usize },
    /// A key arrived and still has to be stored by the execution loop.
    JustChanged { register: usize, key: usize },
}

impl WaitForKey {
    /// Starts waiting for a key which will be stored in `register`.
    pub fn wait(&mut self, register: usize) {
        match *self {
            WaitForKey::Waiting { register: previous } => {
                log::debug!(
                    "wait for key retargeted from V{:X} to V{:X}",
                    previous,
                    register
                );
            }
            _ => log::debug!("waiting for a key to store in V{:X}", register),
        }
        *self = WaitForKey::Waiting { register };
    }

    /// Reports a key press, returns if the press completed the wait.
    pub fn key_pressed(&mut self, key: usize) -> bool {
        if let WaitForKey::Waiting { register } = *self {
            log::debug!("key {:X} pressed for V{:X}", key, register);
            *self = WaitForKey::JustChanged { register, key };
            true
        } else {
            false
        }
    }

    /// Takes the completed wait as `(register, key)` and goes back to idle.
    pub fn take_completed(&mut self) -> Option<(usize, usize)> {
        match *self {
            WaitForKey::JustChanged { register, key } => {
                *self = WaitForKey::Idle;
                Some((register, key))
            }
            _ => None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, WaitForKey::Waiting { .. })
    }
}

/// Where the debugger holds the pipeline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DebugStep {
    /// The next tick fetches and decodes.
    #[default]
    ReadyToFetch,
    /// An instruction was decoded and waits for the step command.
    AwaitingStep,
    /// The next tick executes the pending instruction.
    ReadyToExecute,
}

impl DebugStep {
    /// Builds the state from the `fetch and decode` and `execute` flags, the execute flag wins.
    pub fn from_flags(fetch_and_decode: bool, execute: bool) -> Self {
        match (fetch_and_decode, execute) {
            (_, true) => DebugStep::ReadyToExecute,
            (true, false) => DebugStep::ReadyToFetch,
            (false, false) => DebugStep::AwaitingStep,
        }
    }

    pub fn fetch_and_decode(&self) -> bool {
        matches!(self, DebugStep::ReadyToFetch)
    }

    pub fn execute(&self) -> bool {
        matches!(self, DebugStep::ReadyToExecute)
    }
}

/// An instruction that was fetched and decoded, but not yet executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    /// where the instruction was fetched from
    pub address: Address,
    pub opcode: Opcode,
    pub instruction: Instruction,
}

/// The debug state, only relevant while enabled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Debugger {
    enabled: bool,
    step: DebugStep,
    pending: Option<Pending>,
}

impl Debugger {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!("debug mode {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
        if !enabled {
            self.reset();
        }
    }

    pub fn step(&self) -> DebugStep {
        self.step
    }

    pub fn pending(&self) -> Option<Pending> {
        self.pending
    }

    pub fn set_fetch_and_decode(&mut self, value: bool) {
        self.transition(DebugStep::from_flags(value, self.step.execute()));
    }

    pub fn set_execute(&mut self, value: bool) {
        self.transition(DebugStep::from_flags(self.step.fetch_and_decode(), value));
    }

    /// The `Step` command, executes the pending instruction on the next tick.
    pub fn step_once(&mut self) {
        self.transition(DebugStep::ReadyToExecute);
    }

    /// The `Continue` command, leaves the debug mode.
    pub fn resume(&mut self) {
        self.set_enabled(false);
    }

    /// The `Break` command, enters the debug mode and fetches anew.
    pub fn pause(&mut self) {
        self.set_enabled(true);
        self.reset();
    }

    /// Called by the engine after a fetch and decode.
    pub(super) fn fetched(&mut self, pending: Pending) {
        if self.enabled && self.step == DebugStep::ReadyToFetch {
            log::debug!("{:#05X}: {} awaits the next step", pending.address, pending.instruction);
            self.pending = Some(pending);
            self.step = DebugStep::AwaitingStep;
        }
    }

    /// Called by the engine to get the instruction to execute.
    pub(super) fn take_pending(&mut self) -> Option<Pending> {
        self.pending.take()
    }

    /// Called by the engine after the execution.
    pub(super) fn executed(&mut self) {
        self.transition(DebugStep::ReadyToFetch);
    }

    fn reset(&mut self) {
        self.step = DebugStep::ReadyToFetch;
        self.pending = None;
    }

    fn transition(&mut self, step: DebugStep) {
        if self.step != step {
            log::debug!("debug step {:?} -> {:?}", self.step, step);
        }
        if step == DebugStep::ReadyToFetch {
            self.pending = None;
        }
        self.step = step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_for_key() {
        let mut state = WaitForKey::default();
        assert_eq!(state, WaitForKey::Idle);
        // no one waits
        assert!(!state.key_pressed(0x4));
        assert_eq!(state.take_completed(), None);

        state.wait(0x3);
        assert!(state.is_waiting());
        assert!(state.key_pressed(0x6));
        assert_eq!(state, WaitForKey::JustChanged { register: 3, key: 6 });

        // the first key wins until the loop picks it up
        assert!(!state.key_pressed(0x7));
        assert_eq!(state.take_completed(), Some((3, 6)));
        assert_eq!(state, WaitForKey::Idle);
    }

    #[test]
    fn test_wait_for_key_retarget() {
        let mut state = WaitForKey::Idle;
        state.wait(0x1);
        state.wait(0x2);
        assert_eq!(state, WaitForKey::Waiting { register: 2 });
    }

    #[test]
    fn test_debug_flags() {
        assert_eq!(DebugStep::from_flags(true, false), DebugStep::ReadyToFetch);
        assert_eq!(DebugStep::from_flags(false, false), DebugStep::AwaitingStep);
        assert_eq!(DebugStep::from_flags(false, true), DebugStep::ReadyToExecute);
        assert_eq!(DebugStep::from_flags(true, true), DebugStep::ReadyToExecute);

        let mut debugger = Debugger::default();
        debugger.set_fetch_and_decode(false);
        assert_eq!(debugger.step(), DebugStep::AwaitingStep);
        debugger.set_execute(true);
        assert_eq!(debugger.step(), DebugStep::ReadyToExecute);
        debugger.set_execute(false);
        assert_eq!(debugger.step(), DebugStep::AwaitingStep);
    }

    #[test]
    fn test_debug_cycle() {
        let pending = Pending {
            address: 0x200,
            opcode: 0x00E0,
            instruction: Instruction::Clear,
        };

        let mut debugger = Debugger::default();
        // disabled debuggers ignore the engine
        debugger.fetched(pending);
        assert_eq!(debugger.pending(), None);

        debugger.pause();
        assert!(debugger.is_enabled());
        debugger.fetched(pending);
        assert_eq!(debugger.step(), DebugStep::AwaitingStep);
        assert_eq!(debugger.pending(), Some(pending));

        debugger.step_once();
        assert_eq!(debugger.step(), DebugStep::ReadyToExecute);
        assert_eq!(debugger.take_pending(), Some(pending));
        debugger.executed();
        assert_eq!(debugger.step(), DebugStep::ReadyToFetch);

        debugger.fetched(pending);
        debugger.resume();
        assert!(!debugger.is_enabled());
        assert_eq!(debugger.pending(), None);
        assert_eq!(debugger.step(), DebugStep::ReadyToFetch);
    }
}
