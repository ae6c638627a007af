use std::{sync::Arc, time::Instant};

use crate::{
    chip8::Machine,
    definitions::{cpu, input, sound, timer},
    devices::{DisplayCommands, InputEvent, KeyboardCommands, SoundCommands},
    timer::{interval, TimedWorker, Worker},
    LoadError,
};

/// The runtime settings of the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// How many instructions are executed per second.
    pub cpu_hertz: u64,
    /// How often input is polled and the display refreshed.
    pub input_hertz: u64,
    /// How often the sound trigger is polled.
    pub sound_poll_hertz: u64,
    /// Starts with the debugger holding the first instruction.
    pub start_in_debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cpu_hertz: cpu::HERTZ,
            input_hertz: input::HERTZ,
            sound_poll_hertz: sound::POLL_HERTZ,
            start_in_debug: false,
        }
    }
}

/// Owns the pacing loops of a single machine, they all stop with the machine's
/// shutdown token.
pub struct Emulator<W: TimedWorker = Worker> {
    machine: Arc<Machine>,
    workers: Vec<W>,
}

impl<W: TimedWorker> Emulator<W> {
    /// Starts the execution, timer, sound and input loops.
    pub fn start<D, K, S>(
        machine: Arc<Machine>,
        mut display: D,
        mut keyboard: K,
        mut beeper: S,
        config: &Config,
    ) -> Self
    where
        D: DisplayCommands + Send + 'static,
        K: KeyboardCommands + Send + 'static,
        S: SoundCommands + Send + 'static,
    {
        if config.start_in_debug {
            machine.pause();
        }
        let token = machine.shutdown_token();
        let mut workers = Vec::with_capacity(4);

        // execution
        let chip = machine.clone();
        let mut worker = W::new(token.clone());
        worker.start(
            move || {
                if let Err(err) = chip.tick() {
                    log::error!("Halting the machine: {}", err);
                    chip.signal_quit();
                }
            },
            interval(config.cpu_hertz),
        );
        workers.push(worker);

        // timers, they stand still while debugging
        let chip = machine.clone();
        let mut worker = W::new(token.clone());
        worker.start(
            move || {
                if !chip.is_debug_enabled() {
                    chip.decrement_timers();
                }
            },
            interval(timer::HERTZ),
        );
        workers.push(worker);

        // sound
        let chip = machine.clone();
        let mut playing_until: Option<Instant> = None;
        let mut worker = W::new(token.clone());
        worker.start(
            move || {
                let now = Instant::now();
                if chip.take_sound_trigger() {
                    log::trace!("tone started");
                    beeper.play();
                    playing_until = Some(now + sound::DURATION);
                } else if matches!(playing_until, Some(until) if now >= until) {
                    log::trace!("tone stopped");
                    beeper.stop();
                    playing_until = None;
                }
            },
            interval(config.sound_poll_hertz),
        );
        workers.push(worker);

        // input and render
        let chip = machine.clone();
        let mut worker = W::new(token);
        worker.start(
            move || {
                for event in keyboard.poll_events() {
                    match event {
                        InputEvent::Key { key, pressed } => chip.set_key_pressed(key, pressed),
                        InputEvent::Quit => {
                            log::debug!("quit requested by the user");
                            chip.signal_quit();
                        }
                    }
                }
                if let Some((frame, region)) = chip.take_frame() {
                    display.display(&frame, region);
                }
            },
            interval(config.input_hertz),
        );
        workers.push(worker);

        Self { machine, workers }
    }

    pub fn machine(&self) -> &Arc<Machine> {
        &self.machine
    }

    /// Blocks until the machine is shut down and all loops finished.
    pub fn wait(mut self) {
        self.machine.shutdown_token().wait();
        self.join();
    }

    /// Signals the shutdown and waits for all loops to finish.
    pub fn shutdown(mut self) {
        self.machine.signal_quit();
        self.join();
    }

    fn join(&mut self) {
        for worker in self.workers.iter_mut() {
            worker.stop();
        }
        self.workers.clear();
    }
}

impl<W: TimedWorker> Drop for Emulator<W> {
    fn drop(&mut self) {
        self.machine.signal_quit();
        self.join();
    }
}

/// Loads the program and runs it until the user quits or the machine halts.
pub fn run<D, K, S>(
    program: &[u8],
    display: D,
    keyboard: K,
    beeper: S,
    config: &Config,
) -> Result<(), LoadError>
where
    D: DisplayCommands + Send + 'static,
    K: KeyboardCommands + Send + 'static,
    S: SoundCommands + Send + 'static,
{
    let machine = Arc::new(Machine::with_program(program)?);
    Emulator::<Worker>::start(machine, display, keyboard, beeper, config).wait();
    Ok(())
}
