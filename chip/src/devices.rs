use crate::{
    chip8::{Framebuffer, Region},
    definitions::keyboard,
};

#[cfg_attr(test, mockall::automock)]
/// The traits responsible for the display based code
pub trait DisplayCommands {
    /// Will display the frame, `region` is the part that changed since the last call.
    fn display(&mut self, frame: &Framebuffer, region: Region);
}

/// A single event coming from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// The chip key `0x0-0xF` was pressed or released.
    Key { key: usize, pressed: bool },
    /// The user wants to leave.
    Quit,
}

#[cfg_attr(test, mockall::automock)]
/// The trait responsible for reading the keyboard data
pub trait KeyboardCommands {
    /// Will return all events since the last poll.
    fn poll_events(&mut self) -> Vec<InputEvent>;
}

#[cfg_attr(test, mockall::automock)]
/// The trait responsible for the beeper
pub trait SoundCommands {
    /// Starts playing the tone.
    fn play(&mut self);
    /// Stops playing the tone.
    fn stop(&mut self);
}

/// Input is done with a hex keyboard that has 16 keys ranging `0-F`. The `8`, `4`, `6`, and
/// `2` keys are typically used for directional input. Three opcodes are used to detect input.
/// One skips an instruction if a specific key is pressed, while another does the same if a
/// specific key is not pressed. The third waits for a key press, and then stores it in one of
/// the data registers.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    keys: [bool; keyboard::SIZE],
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard::default()
    }

    /// Sets the state of the given key, returns `false` for keys outside of `0x0-0xF`.
    pub fn set_key(&mut self, key: usize, pressed: bool) -> bool {
        match self.keys.get_mut(key) {
            Some(entry) => {
                *entry = pressed;
                true
            }
            None => false,
        }
    }

    /// Keys outside of `0x0-0xF` are never pressed.
    pub fn is_pressed(&self, key: usize) -> bool {
        self.keys.get(key).copied().unwrap_or(false)
    }

    /// Releases every key.
    pub fn clear(&mut self) {
        self.keys.fill(false);
    }

    pub fn get_keys(&self) -> &[bool] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard() {
        let mut keys = Keyboard::new();
        assert!(keys.get_keys().iter().all(|&k| !k));

        assert!(keys.set_key(0xA, true));
        assert!(keys.is_pressed(0xA));
        assert!(!keys.is_pressed(0xB));

        assert!(!keys.set_key(keyboard::SIZE, true));
        assert!(!keys.is_pressed(keyboard::SIZE));
        assert!(!keys.is_pressed(0xFF));

        keys.set_key(0x1, true);
        keys.clear();
        assert!(keys.get_keys().iter().all(|&k| !k));
    }
}
