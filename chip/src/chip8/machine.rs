use {
    super::{
        control::{DebugStep, Debugger, Pending, WaitForKey},
        display::{Framebuffer, Region},
        stack::CallStack,
    },
    crate::{
        definitions::{cpu, display, keyboard, memory},
        devices::Keyboard,
        opcode::{self, Address, Instruction, Opcode, Operation, ProgramCounterStep},
        timer::{Countdown, ShutdownToken},
        LoadError, OpcodeError, ProcessError,
    },
    parking_lot::{Mutex, RwLock, RwLockReadGuard},
    rand::RngCore,
};

/// The state only the execution loop mutates, guarded by a single lock.
#[derive(Debug, Clone)]
pub struct Core {
    /// all two bytes long and stored big-endian
    pub(super) opcode: Opcode,
    /// - `0x000-0x04F` - The built in `4x5` pixel font set (`0-F`)
    /// - `0x200-0xFFF` - Program ROM and work RAM
    pub(super) memory: Vec<u8>,
    /// `8-bit` data registers named `V0` to `VF`. The `VF` register doubles as a flag for some
    /// instructions; thus, it should be avoided. In an addition operation, `VF` is the carry flag,
    /// while in subtraction, it is the "no borrow" flag. In the draw instruction `VF` is set upon
    /// pixel collision.
    pub(super) registers: [u8; cpu::register::SIZE],
    /// The index for the register, this is a special register entry
    /// called index `I`
    pub(super) index_register: Address,
    /// The program counter is a CPU register in the computer processor which has the address of the
    /// next instruction to be executed from memory.
    pub(super) program_counter: Address,
    pub(super) stack: CallStack,
}

impl Core {
    fn new() -> Self {
        // initialize all the memory with 0
        let mut memory = vec![0; memory::SIZE];

        // load fonts
        let font = display::fontset::LOCATION as usize;
        memory[font..font + display::fontset::FONTSET.len()]
            .copy_from_slice(&display::fontset::FONTSET);

        Self {
            opcode: 0,
            memory,
            registers: [0; cpu::register::SIZE],
            index_register: 0,
            program_counter: cpu::PROGRAM_COUNTER,
            stack: CallStack::new(),
        }
    }

    /// will read the opcode at the program counter, without moving it
    fn fetch(&self) -> Result<Opcode, OpcodeError> {
        opcode::build_opcode(&self.memory, self.program_counter as usize)
    }

    /// The last fetched opcode.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn index_register(&self) -> Address {
        self.index_register
    }

    pub fn program_counter(&self) -> Address {
        self.program_counter
    }

    pub fn stack(&self) -> &CallStack {
        &self.stack
    }
}

/// Delay timer: This timer is intended to be used for timing the events of games. Its value
/// can be set and read.
/// Sound timer: This timer is used for sound effects. When its value is nonzero, a beeping
/// sound is made.
/// Both count down at 60 hertz, until they reach 0.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct Timers {
    pub(super) delay: Countdown<u8>,
    pub(super) sound: Countdown<u8>,
}

/// The Machine struct represents the current state
/// of the system, it contains all the structures
/// needed for emulating an instance of the
/// Chip8 CPU.
///
/// Every field group is guarded by its own lock, the core is always locked first
/// and at most one other lock is held together with it.
pub struct Machine {
    pub(super) core: RwLock<Core>,
    pub(super) timers: RwLock<Timers>,
    /// set when a tone has to be started
    pub(super) sound_trigger: RwLock<bool>,
    pub(super) keyboard: RwLock<Keyboard>,
    pub(super) framebuffer: RwLock<Framebuffer>,
    pub(super) wait_for_key: RwLock<WaitForKey>,
    pub(super) debugger: RwLock<Debugger>,
    /// source of the `CXNN` random values, injectable so tests can fix the sequence
    pub(super) rng: Mutex<Box<dyn RngCore + Send>>,
    shutdown: ShutdownToken,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// will create a new machine, with the fonts installed and the program counter at `0x200`
    pub fn new() -> Self {
        Self::with_rng(Box::new(rand::rngs::OsRng))
    }

    /// will create a new machine that uses the given random number generator
    pub fn with_rng(rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            core: RwLock::new(Core::new()),
            timers: RwLock::default(),
            sound_trigger: RwLock::new(false),
            keyboard: RwLock::default(),
            framebuffer: RwLock::default(),
            wait_for_key: RwLock::default(),
            debugger: RwLock::default(),
            rng: Mutex::new(rng),
            shutdown: ShutdownToken::new(),
        }
    }

    /// will create a new machine and load the program
    pub fn with_program(program: &[u8]) -> Result<Self, LoadError> {
        let machine = Self::new();
        machine.load_program(program)?;
        Ok(machine)
    }

    /// Writes the program verbatim to `0x200`. A program too large for the memory
    /// leaves the state untouched.
    pub fn load_program(&self, program: &[u8]) -> Result<(), LoadError> {
        if program.len() > cpu::PROGRAM_CAPACITY {
            log::error!(
                "program with {} bytes exceeds the capacity of {} bytes",
                program.len(),
                cpu::PROGRAM_CAPACITY
            );
            return Err(LoadError::TooLarge {
                len: program.len(),
                capacity: cpu::PROGRAM_CAPACITY,
            });
        }

        let start = cpu::PROGRAM_COUNTER as usize;
        let mut core = self.core.write();
        core.memory[start..].fill(0);
        core.memory[start..start + program.len()].copy_from_slice(program);
        log::debug!("loaded program with {} bytes", program.len());
        Ok(())
    }

    /// Reads the opcode at the program counter, the program counter is not moved.
    pub fn fetch(&self) -> Result<Opcode, OpcodeError> {
        self.core.read().fetch()
    }

    /// Executes an instruction fetched earlier by the debugger, the fetched word becomes
    /// the current opcode again.
    fn execute_pending(&self, pending: Pending) -> Operation {
        let mut core = self.core.write();
        core.opcode = pending.opcode;
        self.execute_locked(&mut core, pending.instruction)
    }

    fn execute_locked(&self, core: &mut Core, instruction: Instruction) -> Operation {
        log::trace!(
            "{:#05X}: {:#06X} {}",
            core.program_counter,
            core.opcode,
            instruction
        );
        let (step, operation) = self.calc(core, instruction);
        core.program_counter = step.apply(core.program_counter);
        operation
    }

    /// will advance the program by a single fetch, decode and execute, ignoring
    /// the wait for key and debug states
    pub fn cycle(&self) -> Result<Operation, ProcessError> {
        let mut core = self.core.write();
        core.opcode = core.fetch()?;
        let instruction = Instruction::decode(core.opcode);
        Ok(self.execute_locked(&mut core, instruction))
    }

    /// A single run of the execution loop.
    ///
    /// - While waiting for a key nothing happens.
    /// - A just pressed key is stored into the waiting register and the program counter moves on.
    /// - In debug mode fetch and decode are split from the execution.
    /// - Otherwise it is a normal [`cycle`](Self::cycle).
    pub fn tick(&self) -> Result<Operation, ProcessError> {
        let wait_state = self.wait_state();
        match wait_state {
            WaitForKey::Waiting { .. } => return Ok(Operation::Wait),
            WaitForKey::JustChanged { .. } => {
                self.complete_wait_for_key();
                return Ok(Operation::None);
            }
            WaitForKey::Idle => {}
        }

        let (enabled, step) = {
            let debugger = self.debugger.read();
            (debugger.is_enabled(), debugger.step())
        };
        if !enabled {
            return self.cycle();
        }

        match step {
            DebugStep::ReadyToFetch => {
                let pending = self.fetch_and_decode()?;
                self.debugger.write().fetched(pending);
                Ok(Operation::Paused)
            }
            DebugStep::AwaitingStep => Ok(Operation::Paused),
            DebugStep::ReadyToExecute => {
                let pending = self.debugger.write().take_pending();
                let operation = match pending {
                    Some(pending) => self.execute_pending(pending),
                    // stepping without a previous fetch runs a full cycle
                    None => self.cycle()?,
                };
                self.debugger.write().executed();
                Ok(operation)
            }
        }
    }

    fn fetch_and_decode(&self) -> Result<Pending, OpcodeError> {
        let mut core = self.core.write();
        core.opcode = core.fetch()?;
        Ok(Pending {
            address: core.program_counter,
            opcode: core.opcode,
            instruction: Instruction::decode(core.opcode),
        })
    }

    fn complete_wait_for_key(&self) {
        let mut core = self.core.write();
        let completed = self.wait_for_key.write().take_completed();
        if let Some((register, key)) = completed {
            core.registers[register] = key as u8;
            core.program_counter = ProgramCounterStep::Next.apply(core.program_counter);
        }
    }

    /// A read only view on the registers, memory, program counter and stack.
    pub fn core(&self) -> RwLockReadGuard<'_, Core> {
        self.core.read()
    }

    /// Counts both timers down by one.
    pub fn decrement_timers(&self) {
        let mut timers = self.timers.write();
        timers.delay.decrement();
        if timers.sound.decrement() {
            log::trace!("sound timer reached zero");
        }
    }

    pub fn delay_timer(&self) -> u8 {
        self.timers.read().delay.get_value()
    }

    pub fn sound_timer(&self) -> u8 {
        self.timers.read().sound.get_value()
    }

    /// Will set the value of the given key, pressing a key completes a pending wait for key.
    pub fn set_key_pressed(&self, key: usize, pressed: bool) {
        if key >= keyboard::SIZE {
            log::warn!("ignoring the unknown key {:#X}", key);
            return;
        }
        self.keyboard.write().set_key(key, pressed);
        if pressed {
            self.wait_for_key.write().key_pressed(key);
        }
    }

    pub fn is_key_pressed(&self, key: usize) -> bool {
        self.keyboard.read().is_pressed(key)
    }

    /// Releases every key.
    pub fn clear_keys(&self) {
        self.keyboard.write().clear();
    }

    /// A copy of the current keyboard state.
    pub fn keyboard(&self) -> Keyboard {
        self.keyboard.read().clone()
    }

    pub fn wait_state(&self) -> WaitForKey {
        *self.wait_for_key.read()
    }

    /// Requests all loops to shut down.
    pub fn signal_quit(&self) {
        self.shutdown.cancel();
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// The token every loop of this machine is stopped with.
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Locks the framebuffer for reading, it is unlocked when the guard is dropped.
    ///
    /// The core is always locked before the framebuffer, so neither [`core`](Self::core)
    /// nor the [`Display`](std::fmt::Display) dump may be used while the guard is alive.
    /// Renderers should prefer the snapshots of [`take_frame`](Self::take_frame) and
    /// [`framebuffer`](Self::framebuffer).
    pub fn lock_framebuffer(&self) -> RwLockReadGuard<'_, Framebuffer> {
        self.framebuffer.read()
    }

    /// A snapshot of the framebuffer.
    pub fn framebuffer(&self) -> Framebuffer {
        self.framebuffer.read().clone()
    }

    /// The region changed since the last call.
    pub fn take_dirty_region(&self) -> Option<Region> {
        self.framebuffer.write().take_dirty()
    }

    /// A snapshot together with the changed region, if anything changed.
    pub fn take_frame(&self) -> Option<(Framebuffer, Region)> {
        let mut framebuffer = self.framebuffer.write();
        let region = framebuffer.take_dirty()?;
        Some((framebuffer.clone(), region))
    }

    pub fn is_sound_triggered(&self) -> bool {
        *self.sound_trigger.read()
    }

    pub fn clear_sound_trigger(&self) {
        *self.sound_trigger.write() = false;
    }

    /// Clears the trigger, returns if it was set.
    pub fn take_sound_trigger(&self) -> bool {
        std::mem::take(&mut *self.sound_trigger.write())
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.debugger.read().is_enabled()
    }

    pub fn set_debug_enabled(&self, enabled: bool) {
        self.debugger.write().set_enabled(enabled);
    }

    pub fn should_fetch_and_decode(&self) -> bool {
        self.debugger.read().step().fetch_and_decode()
    }

    pub fn should_execute(&self) -> bool {
        self.debugger.read().step().execute()
    }

    pub fn set_fetch_and_decode(&self, value: bool) {
        self.debugger.write().set_fetch_and_decode(value);
    }

    pub fn set_execute(&self, value: bool) {
        self.debugger.write().set_execute(value);
    }

    pub fn debug_step(&self) -> DebugStep {
        self.debugger.read().step()
    }

    /// The instruction fetched and decoded by the debugger, but not yet executed.
    pub fn pending_instruction(&self) -> Option<Pending> {
        self.debugger.read().pending()
    }

    /// The debugger `Step` command.
    pub fn step(&self) {
        self.debugger.write().step_once();
    }

    /// The debugger `Continue` command.
    pub fn resume(&self) {
        self.debugger.write().resume();
    }

    /// The debugger `Break` command.
    pub fn pause(&self) {
        self.debugger.write().pause();
    }
}
