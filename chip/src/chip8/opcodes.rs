//! The execution of every decoded instruction against the machine.
use crate::{
    definitions::{cpu, display, keyboard, memory},
    opcode::{Address, Instruction, Operation, ProgramCounterStep},
    OpcodeError,
};

use super::machine::{Core, Machine};

/// The flag register `VF`
const FLAG: usize = cpu::register::LAST;

/// Wraps an address into the twelve bit address space.
#[inline]
fn wrap(address: usize) -> usize {
    address & memory::ADDRESS_MASK as usize
}

impl Machine {
    /// Runs the instruction and returns how the program counter has to move and what the
    /// loop has to do afterwards.
    pub(super) fn calc(
        &self,
        core: &mut Core,
        instruction: Instruction,
    ) -> (ProgramCounterStep, Operation) {
        use Instruction::*;

        let registers = &mut core.registers;
        let step = match instruction {
            MachineCall { nnn } => {
                // 0NNN
                // Calls machine code routine at address NNN, there is no such machine here.
                log::warn!("machine code routine at {:#05X} is not supported", nnn);
                ProgramCounterStep::Next
            }
            Clear => {
                // 00E0
                // clear display
                self.framebuffer.write().clear();
                return (ProgramCounterStep::Next, Operation::Draw);
            }
            Return => {
                // 00EE
                // Return from sub routine => pop from stack, the call itself is then skipped
                // by the normal step
                match core.stack.pop() {
                    Ok(pointer) => core.program_counter = pointer,
                    Err(err) => log::warn!("{} Return at {:#05X}.", err, core.program_counter),
                }
                ProgramCounterStep::Next
            }
            Jump { nnn } => {
                // 1NNN
                // Jumps to address NNN.
                ProgramCounterStep::Jump(nnn)
            }
            Call { nnn } => {
                // 2NNN
                // Calls subroutine at NNN, the address of the call itself is pushed.
                // A full stack drops the return address, the jump still happens.
                if let Err(err) = core.stack.push(core.program_counter) {
                    log::warn!("{} Call at {:#05X}.", err, core.program_counter);
                }
                ProgramCounterStep::Jump(nnn)
            }
            SkipEqual { x, nn } => {
                // 3XNN
                // Skips the next instruction if VX equals NN.
                ProgramCounterStep::cond(registers[x] == nn)
            }
            SkipNotEqual { x, nn } => {
                // 4XNN
                // Skips the next instruction if VX doesn't equal NN.
                ProgramCounterStep::cond(registers[x] != nn)
            }
            SkipRegistersEqual { x, y } => {
                // 5XY0
                // Skips the next instruction if VX equals VY.
                ProgramCounterStep::cond(registers[x] == registers[y])
            }
            Set { x, nn } => {
                // 6XNN
                // Sets VX to NN.
                registers[x] = nn;
                ProgramCounterStep::Next
            }
            Add { x, nn } => {
                // 7XNN
                // Adds NN to VX. (Carry flag is not changed)
                registers[x] = registers[x].wrapping_add(nn);
                ProgramCounterStep::Next
            }
            Assign { x, y } => {
                // 8XY0
                registers[x] = registers[y];
                ProgramCounterStep::Next
            }
            Or { x, y } => {
                // 8XY1
                registers[x] |= registers[y];
                ProgramCounterStep::Next
            }
            And { x, y } => {
                // 8XY2
                registers[x] &= registers[y];
                ProgramCounterStep::Next
            }
            Xor { x, y } => {
                // 8XY3
                registers[x] ^= registers[y];
                ProgramCounterStep::Next
            }
            AddRegisters { x, y } => {
                // 8XY4
                // Adds VY to VX. VF is set to 1 when there's a carry, and to 0 when there isn't.
                let (res, carry) = registers[x].overflowing_add(registers[y]);
                registers[x] = res;
                registers[FLAG] = carry as u8;
                ProgramCounterStep::Next
            }
            Subtract { x, y } => {
                // 8XY5
                // VY is subtracted from VX. VF is set to 0 when there's a borrow, and 1 when there
                // isn't.
                let (res, borrow) = registers[x].overflowing_sub(registers[y]);
                registers[x] = res;
                registers[FLAG] = !borrow as u8;
                ProgramCounterStep::Next
            }
            ShiftRight { x, .. } => {
                // 8XY6
                // Stores the least significant bit of VX in VF and then shifts VX to the right
                // by 1.
                let bit = registers[x] & 0x01;
                registers[x] >>= 1;
                registers[FLAG] = bit;
                ProgramCounterStep::Next
            }
            SubtractReversed { x, y } => {
                // 8XY7
                // Sets VX to VY minus VX. VF is set to 0 when there's a borrow, and 1 when there
                // isn't.
                let (res, borrow) = registers[y].overflowing_sub(registers[x]);
                registers[x] = res;
                registers[FLAG] = !borrow as u8;
                ProgramCounterStep::Next
            }
            ShiftLeft { x, .. } => {
                // 8XYE
                // Stores the most significant bit of VX in VF and then shifts VX to the left by 1.
                let bit = (registers[x] & 0x80) >> 7;
                registers[x] <<= 1;
                registers[FLAG] = bit;
                ProgramCounterStep::Next
            }
            SkipRegistersNotEqual { x, y } => {
                // 9XY0
                // Skips the next instruction if VX doesn't equal VY.
                ProgramCounterStep::cond(registers[x] != registers[y])
            }
            SetIndex { nnn } => {
                // ANNN
                // Sets I to the address NNN.
                core.index_register = nnn;
                ProgramCounterStep::Next
            }
            JumpOffset { nnn } => {
                // BNNN
                // Jumps to the address NNN plus V0.
                ProgramCounterStep::Jump(nnn.wrapping_add(registers[0] as Address))
            }
            Random { x, nn } => {
                // CXNN
                // Sets VX to the result of a bitwise and operation on a random number (0 to 255)
                // and NN.
                // using a fill bytes call here, as the trait RngCore does not
                // support random u8.
                let mut rand = [0u8; 1];
                self.rng.lock().fill_bytes(&mut rand);
                registers[x] = nn & rand[0];
                ProgramCounterStep::Next
            }
            Draw { x, y, n } => {
                self.draw(core, x, y, n);
                return (ProgramCounterStep::Next, Operation::Draw);
            }
            SkipKeyPressed { x } => {
                // EX9E
                // Skips the next instruction if the key stored in VX is pressed.
                ProgramCounterStep::cond(self.key(registers[x]))
            }
            SkipKeyNotPressed { x } => {
                // EXA1
                // Skips the next instruction if the key stored in VX isn't pressed.
                ProgramCounterStep::cond(!self.key(registers[x]))
            }
            GetDelayTimer { x } => {
                // FX07
                // Sets VX to the value of the delay timer.
                registers[x] = self.timers.read().delay.get_value();
                ProgramCounterStep::Next
            }
            AwaitKeyPress { x } => {
                // FX0A
                // A key press is awaited, and then stored in VX. The program counter moves on
                // once the key arrived.
                self.wait_for_key.write().wait(x);
                return (ProgramCounterStep::None, Operation::Wait);
            }
            SetDelayTimer { x } => {
                // FX15
                // Sets the delay timer to VX.
                self.timers.write().delay.set_value(registers[x]);
                ProgramCounterStep::Next
            }
            SetSoundTimer { x } => {
                // FX18
                // Sets the sound timer to VX, a non zero value starts the tone.
                let value = registers[x];
                self.timers.write().sound.set_value(value);
                if value > 0 {
                    *self.sound_trigger.write() = true;
                }
                ProgramCounterStep::Next
            }
            AddToIndex { x } => {
                // FX1E
                // Adds VX to I. VF is not affected.
                let index = core.index_register as usize + registers[x] as usize;
                core.index_register = wrap(index) as Address;
                ProgramCounterStep::Next
            }
            SetIndexToSprite { x } => {
                // FX29
                // Sets I to the location of the sprite for the character in VX. Characters 0-F (in
                // hexadecimal) are represented by a 4x5 font, only the low nibble is used.
                let digit = (registers[x] & 0x0F) as Address;
                core.index_register =
                    display::fontset::LOCATION + display::fontset::GLYPH_SIZE * digit;
                ProgramCounterStep::Next
            }
            StoreBcd { x } => {
                // FX33
                // Stores the binary-coded decimal representation of VX, with the most significant
                // of three digits at the address in I, the middle digit at I plus 1, and the least
                // significant digit at I plus 2.
                let i = core.index_register as usize;
                let r = registers[x];
                core.memory[wrap(i)] = r / 100; // 246u8 / 100 => 2
                core.memory[wrap(i + 1)] = r / 10 % 10; // 246u8 / 10 => 24 % 10 => 4
                core.memory[wrap(i + 2)] = r % 10; // 246u8 % 10 => 6
                ProgramCounterStep::Next
            }
            StoreRegisters { x } => {
                // FX55
                // Stores V0 to VX (including VX) in memory starting at address I. The offset from I
                // is increased by 1 for each value written, but I itself is left unmodified.
                let i = core.index_register as usize;
                for offset in 0..=x {
                    core.memory[wrap(i + offset)] = registers[offset];
                }
                ProgramCounterStep::Next
            }
            LoadRegisters { x } => {
                // FX65
                // Fills V0 to VX (including VX) with values from memory starting at address I. The
                // offset from I is increased by 1 for each value written, but I itself is left
                // unmodified.
                let i = core.index_register as usize;
                for offset in 0..=x {
                    registers[offset] = core.memory[wrap(i + offset)];
                }
                ProgramCounterStep::Next
            }
            Unknown(opcode) => {
                log::warn!(
                    "{} Skipped at {:#05X}.",
                    OpcodeError::InvalidOpcode(opcode),
                    core.program_counter
                );
                ProgramCounterStep::Next
            }
        };
        (step, Operation::None)
    }

    /// DXYN
    /// Draws a sprite at coordinate (VX, VY) that has a width of 8 pixels and a height of N
    /// pixels. Each row of 8 pixels is read as bit-coded starting from memory location I; I
    /// value doesn't change after the execution of this instruction. VF is set to 1 if any
    /// screen pixels are flipped from set to unset when the sprite is drawn, and to 0 if that
    /// doesn't happen. Pixels outside of the display wrap around.
    fn draw(&self, core: &mut Core, x: usize, y: usize, n: usize) {
        let coorx = core.registers[x] as usize;
        let coory = core.registers[y] as usize;
        let index = core.index_register as usize;

        let mut collision = false;
        {
            let mut framebuffer = self.framebuffer.write();
            for row in 0..n {
                let sprite = core.memory[wrap(index + row)];
                collision |= framebuffer.draw_row(coorx, coory + row, sprite);
            }
        }
        core.registers[FLAG] = collision as u8;
    }

    fn key(&self, key: u8) -> bool {
        if key as usize >= keyboard::SIZE {
            log::warn!("V register holds the unknown key {:#04X}", key);
        }
        self.keyboard.read().is_pressed(key as usize)
    }
}
