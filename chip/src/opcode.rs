//! Opcode abstractions, decoding and the program counter movement.
use std::fmt;

use crate::{definitions::memory, OpcodeError};

/// the base mask used for generating all the other sub masks
pub(crate) const OPCODE_MASK_FFFF: u16 = u16::MAX;

/// the mask for the first twelve bits
pub(crate) const OPCODE_MASK_FFF0: u16 = OPCODE_MASK_FFFF << 4;

/// the mask for the first eight bits
pub(crate) const OPCODE_MASK_FF00: u16 = OPCODE_MASK_FFFF << 8;

/// the mask for the first four bits
pub(crate) const OPCODE_MASK_F000: u16 = OPCODE_MASK_FFFF << 12;

/// the mask for the last four bits
pub(crate) const OPCODE_MASK_000F: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FFF0;

/// the mask for the last eight bits
pub(crate) const OPCODE_MASK_00FF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FF00;

/// the mask for the last twelve bits
pub(crate) const OPCODE_MASK_0FFF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_F000;

/// the size of a single nibble
const NIBBLE_SIZE: u16 = 0x4;

/// a wrapper type for u16 to make it clear what is meant to be used
pub type Opcode = u16;

/// An address inside of the twelve bit address space.
pub type Address = u16;

/// will build an opcode from data and the given point
/// # Arguments
///
/// - `data` - A slice of u8 data entries used to generate the opcodes
/// - `pointer` - Where in the data the opcode shall be extracted, so `pointer` and `pointer + 1` make
/// the opcode up
///
/// # Example
/// ```rust
/// # use chip::opcode::*;
/// # use chip::OpcodeError;
///  const OPCODES: [Opcode; 2] = [0x00EE, 0x1EDA];
///  const SPLIT_OPCODE: [u8; 4] = [0x00, 0xEE, 0x1E, 0xDA];
///  for (i, val) in OPCODES.iter().enumerate() {
///      let opcode = build_opcode(&SPLIT_OPCODE, i * 2).expect("This will work.");
///      assert_eq!(opcode, *val);
///  }
/// # let pointer = 3;
/// # let err = OpcodeError::MemoryInvalid {pointer, len: SPLIT_OPCODE.len() };
/// # assert_eq!(Err(err), build_opcode(&SPLIT_OPCODE, pointer));
/// ```
pub fn build_opcode(data: &[u8], pointer: usize) -> Result<Opcode, OpcodeError> {
    // controlling that there is no illegal access here
    if pointer + 1 < data.len() {
        Ok(Opcode::from_be_bytes([data[pointer], data[pointer + 1]]))
    } else {
        Err(OpcodeError::MemoryInvalid {
            pointer,
            len: data.len(),
        })
    }
}

/// These are special traits used to filter out information
/// from opcodes
pub trait OpcodeTrait {
    /// The upper eight bits of the opcode.
    fn high_byte(&self) -> u8;

    /// The lower eight bits of the opcode, the `NN` part of the opcode types.
    fn low_byte(&self) -> u8;

    /// The nibble at the given position, `0` is the least significant and `3` the
    /// most significant one.
    fn nibble_at(&self, position: u16) -> u8;

    /// this is an opcode extractor for the opcode type `TNNN`
    /// - `T` is the opcode type
    /// - `NNN` is an address
    fn nnn(&self) -> Address;

    /// this is an opcode extractor for the opcode type `TXNN`
    /// - `T` is the opcode type
    /// - `X` is a register index
    /// - `NN` is a constant
    fn xnn(&self) -> (usize, u8);

    /// this is an opcode extractor for the opcode type `TXYN`
    /// - `T` is the opcode type
    /// - `X` is a register index
    /// - `Y` is a register index
    /// - `N` is a opcode subtype or constant
    fn xyn(&self) -> (usize, usize, usize);

    /// this is an opcode extractor for the opcode type `TXTT`
    /// - `T` is the opcode type
    /// - `X` is a register index
    fn x(&self) -> usize;
}

impl OpcodeTrait for Opcode {
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.high_byte(), 0x1E);
    /// ```
    fn high_byte(&self) -> u8 {
        ((self & OPCODE_MASK_FF00) >> (2 * NIBBLE_SIZE)) as u8
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.low_byte(), 0xDA);
    /// ```
    fn low_byte(&self) -> u8 {
        (self & OPCODE_MASK_00FF) as u8
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.nibble_at(0), 0xA);
    /// assert_eq!(BASE_OPCODE.nibble_at(3), 0x1);
    /// ```
    fn nibble_at(&self, position: u16) -> u8 {
        debug_assert!(position < 4, "an opcode only has four nibbles");
        ((self >> (position * NIBBLE_SIZE)) & OPCODE_MASK_000F) as u8
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    ///  const BASE_OPCODE: Opcode = 0x1EDA;
    ///  assert_eq!(BASE_OPCODE.nnn(), 0xEDA)
    /// ```
    fn nnn(&self) -> Address {
        self & OPCODE_MASK_0FFF
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.xnn(), (0xE, 0xDA));
    /// ```
    fn xnn(&self) -> (usize, u8) {
        (self.x(), self.low_byte())
    }

    /// ```rust
    /// # use chip::opcode::*;
    ///  const BASE_OPCODE: Opcode = 0x1EDA;
    ///  assert_eq!(BASE_OPCODE.xyn(), (0xE, 0xD, 0xA));
    /// ```
    fn xyn(&self) -> (usize, usize, usize) {
        (
            self.x(),
            self.nibble_at(1) as usize,
            self.nibble_at(0) as usize,
        )
    }

    fn x(&self) -> usize {
        self.nibble_at(2) as usize
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Represents the program steps that the chip
/// can take after a single instruction.
pub enum ProgramCounterStep {
    /// Will not change the program counter
    None,
    /// Will move the program counter to the next opcode
    Next,
    /// Will skip the next opcode
    Skip,
    /// Will simply move the program counter to the given location.
    Jump(Address),
}

impl ProgramCounterStep {
    /// Will return a Skip if the condition is true.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Next, ProgramCounterStep::cond(false));
    /// assert_eq!(ProgramCounterStep::Skip, ProgramCounterStep::cond(true));
    /// ```
    #[inline]
    pub fn cond(cond: bool) -> Self {
        if cond {
            ProgramCounterStep::Skip
        } else {
            ProgramCounterStep::Next
        }
    }

    /// Resolves the program counter following `pc`. A jump target is taken verbatim,
    /// everything stays inside of the twelve bit address space.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Next.apply(0x200), 0x202);
    /// assert_eq!(ProgramCounterStep::Skip.apply(0x200), 0x204);
    /// assert_eq!(ProgramCounterStep::Jump(0x300).apply(0x200), 0x300);
    /// ```
    #[inline]
    pub fn apply(&self, pc: Address) -> Address {
        let next = match *self {
            ProgramCounterStep::None => pc,
            ProgramCounterStep::Next => pc.wrapping_add(memory::opcodes::SIZE),
            ProgramCounterStep::Skip => pc.wrapping_add(2 * memory::opcodes::SIZE),
            ProgramCounterStep::Jump(pointer) => pointer,
        };
        next & memory::ADDRESS_MASK
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Represents a command from the interpreter up to the pacing loop.
pub enum Operation {
    /// If no action has to be taken.
    None,
    /// The machine waits for the next key press.
    Wait,
    /// The framebuffer was changed.
    Draw,
    /// The debugger holds the pipeline between fetch and execute.
    Paused,
}

/// The decoded form of every documented chip8 instruction.
///
/// `X` and `Y` are register indices, `NN` is a constant byte, `N` a constant nibble
/// and `NNN` an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `0NNN` - Calls a machine code routine, unsupported on this machine.
    MachineCall { nnn: Address },
    /// `00E0` - Clears the screen.
    Clear,
    /// `00EE` - Returns from a subroutine.
    Return,
    /// `1NNN` - Jumps to address `NNN`.
    Jump { nnn: Address },
    /// `2NNN` - Calls subroutine at `NNN`.
    Call { nnn: Address },
    /// `3XNN` - Skips the next instruction if `VX` equals `NN`.
    SkipEqual { x: usize, nn: u8 },
    /// `4XNN` - Skips the next instruction if `VX` doesn't equal `NN`.
    SkipNotEqual { x: usize, nn: u8 },
    /// `5XY0` - Skips the next instruction if `VX` equals `VY`.
    SkipRegistersEqual { x: usize, y: usize },
    /// `6XNN` - Sets `VX` to `NN`.
    Set { x: usize, nn: u8 },
    /// `7XNN` - Adds `NN` to `VX`, the carry flag is not changed.
    Add { x: usize, nn: u8 },
    /// `8XY0` - Sets `VX` to the value of `VY`.
    Assign { x: usize, y: usize },
    /// `8XY1` - Sets `VX` to `VX | VY`.
    Or { x: usize, y: usize },
    /// `8XY2` - Sets `VX` to `VX & VY`.
    And { x: usize, y: usize },
    /// `8XY3` - Sets `VX` to `VX ^ VY`.
    Xor { x: usize, y: usize },
    /// `8XY4` - Adds `VY` to `VX`, `VF` is the carry.
    AddRegisters { x: usize, y: usize },
    /// `8XY5` - Subtracts `VY` from `VX`, `VF` is `0` on borrow.
    Subtract { x: usize, y: usize },
    /// `8XY6` - Stores the least significant bit of `VX` in `VF` and shifts `VX` right.
    ShiftRight { x: usize, y: usize },
    /// `8XY7` - Sets `VX` to `VY - VX`, `VF` is `0` on borrow.
    SubtractReversed { x: usize, y: usize },
    /// `8XYE` - Stores the most significant bit of `VX` in `VF` and shifts `VX` left.
    ShiftLeft { x: usize, y: usize },
    /// `9XY0` - Skips the next instruction if `VX` doesn't equal `VY`.
    SkipRegistersNotEqual { x: usize, y: usize },
    /// `ANNN` - Sets `I` to the address `NNN`.
    SetIndex { nnn: Address },
    /// `BNNN` - Jumps to the address `NNN` plus `V0`.
    JumpOffset { nnn: Address },
    /// `CXNN` - Sets `VX` to a random byte and `NN`.
    Random { x: usize, nn: u8 },
    /// `DXYN` - Draws the `8xN` sprite at `I` to `(VX, VY)`, `VF` is the collision.
    Draw { x: usize, y: usize, n: usize },
    /// `EX9E` - Skips the next instruction if the key in `VX` is pressed.
    SkipKeyPressed { x: usize },
    /// `EXA1` - Skips the next instruction if the key in `VX` isn't pressed.
    SkipKeyNotPressed { x: usize },
    /// `FX07` - Sets `VX` to the delay timer.
    GetDelayTimer { x: usize },
    /// `FX0A` - Awaits a key press and stores it in `VX`.
    AwaitKeyPress { x: usize },
    /// `FX15` - Sets the delay timer to `VX`.
    SetDelayTimer { x: usize },
    /// `FX18` - Sets the sound timer to `VX`. Only a non zero value arms the sound trigger.
    SetSoundTimer { x: usize },
    /// `FX1E` - Adds `VX` to `I`.
    AddToIndex { x: usize },
    /// `FX29` - Sets `I` to the font glyph of `VX`.
    SetIndexToSprite { x: usize },
    /// `FX33` - Stores the binary-coded decimal of `VX` at `I`.
    StoreBcd { x: usize },
    /// `FX55` - Stores `V0` to `VX` at `I`.
    StoreRegisters { x: usize },
    /// `FX65` - Fills `V0` to `VX` from `I`.
    LoadRegisters { x: usize },
    /// Any word that is not a documented instruction.
    Unknown(Opcode),
}

impl Instruction {
    /// Decodes the opcode, this is a total function, undocumented words
    /// become [`Instruction::Unknown`].
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// assert_eq!(Instruction::decode(0x00E0), Instruction::Clear);
    /// assert_eq!(Instruction::decode(0x8124), Instruction::AddRegisters { x: 1, y: 2 });
    /// assert_eq!(Instruction::decode(0x8128), Instruction::Unknown(0x8128));
    /// ```
    pub fn decode(opcode: Opcode) -> Self {
        use Instruction::*;

        let (x, y, n) = opcode.xyn();
        let nn = opcode.low_byte();
        let nnn = opcode.nnn();

        match opcode.nibble_at(3) {
            0x0 => match opcode {
                0x00E0 => Clear,
                0x00EE => Return,
                _ => MachineCall { nnn },
            },
            0x1 => Jump { nnn },
            0x2 => Call { nnn },
            0x3 => SkipEqual { x, nn },
            0x4 => SkipNotEqual { x, nn },
            0x5 if n == 0 => SkipRegistersEqual { x, y },
            0x6 => Set { x, nn },
            0x7 => Add { x, nn },
            0x8 => match n {
                0x0 => Assign { x, y },
                0x1 => Or { x, y },
                0x2 => And { x, y },
                0x3 => Xor { x, y },
                0x4 => AddRegisters { x, y },
                0x5 => Subtract { x, y },
                0x6 => ShiftRight { x, y },
                0x7 => SubtractReversed { x, y },
                0xE => ShiftLeft { x, y },
                _ => Unknown(opcode),
            },
            0x9 if n == 0 => SkipRegistersNotEqual { x, y },
            0xA => SetIndex { nnn },
            0xB => JumpOffset { nnn },
            0xC => Random { x, nn },
            0xD => Draw { x, y, n },
            0xE => match nn {
                0x9E => SkipKeyPressed { x },
                0xA1 => SkipKeyNotPressed { x },
                _ => Unknown(opcode),
            },
            0xF => match nn {
                0x07 => GetDelayTimer { x },
                0x0A => AwaitKeyPress { x },
                0x15 => SetDelayTimer { x },
                0x18 => SetSoundTimer { x },
                0x1E => AddToIndex { x },
                0x29 => SetIndexToSprite { x },
                0x33 => StoreBcd { x },
                0x55 => StoreRegisters { x },
                0x65 => LoadRegisters { x },
                _ => Unknown(opcode),
            },
            _ => Unknown(opcode),
        }
    }

    /// If the instruction is one of the documented ones.
    pub fn is_known(&self) -> bool {
        !matches!(self, Instruction::Unknown(_))
    }

    /// The documented pattern of the instruction, e.g. `8XY4`.
    pub fn pattern(&self) -> &'static str {
        use Instruction::*;
        match self {
            MachineCall { .. } => "0NNN",
            Clear => "00E0",
            Return => "00EE",
            Jump { .. } => "1NNN",
            Call { .. } => "2NNN",
            SkipEqual { .. } => "3XNN",
            SkipNotEqual { .. } => "4XNN",
            SkipRegistersEqual { .. } => "5XY0",
            Set { .. } => "6XNN",
            Add { .. } => "7XNN",
            Assign { .. } => "8XY0",
            Or { .. } => "8XY1",
            And { .. } => "8XY2",
            Xor { .. } => "8XY3",
            AddRegisters { .. } => "8XY4",
            Subtract { .. } => "8XY5",
            ShiftRight { .. } => "8XY6",
            SubtractReversed { .. } => "8XY7",
            ShiftLeft { .. } => "8XYE",
            SkipRegistersNotEqual { .. } => "9XY0",
            SetIndex { .. } => "ANNN",
            JumpOffset { .. } => "BNNN",
            Random { .. } => "CXNN",
            Draw { .. } => "DXYN",
            SkipKeyPressed { .. } => "EX9E",
            SkipKeyNotPressed { .. } => "EXA1",
            GetDelayTimer { .. } => "FX07",
            AwaitKeyPress { .. } => "FX0A",
            SetDelayTimer { .. } => "FX15",
            SetSoundTimer { .. } => "FX18",
            AddToIndex { .. } => "FX1E",
            SetIndexToSprite { .. } => "FX29",
            StoreBcd { .. } => "FX33",
            StoreRegisters { .. } => "FX55",
            LoadRegisters { .. } => "FX65",
            Unknown(_) => "????",
        }
    }
}

impl From<Opcode> for Instruction {
    fn from(opcode: Opcode) -> Self {
        Instruction::decode(opcode)
    }
}

/// Disassembles the instruction into the common mnemonic form.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            MachineCall { nnn } => write!(f, "SYS {:#05X}", nnn),
            Clear => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump { nnn } => write!(f, "JP {:#05X}", nnn),
            Call { nnn } => write!(f, "CALL {:#05X}", nnn),
            SkipEqual { x, nn } => write!(f, "SE V{:X}, {:#04X}", x, nn),
            SkipNotEqual { x, nn } => write!(f, "SNE V{:X}, {:#04X}", x, nn),
            SkipRegistersEqual { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            Set { x, nn } => write!(f, "LD V{:X}, {:#04X}", x, nn),
            Add { x, nn } => write!(f, "ADD V{:X}, {:#04X}", x, nn),
            Assign { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddRegisters { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Subtract { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x, .. } => write!(f, "SHR V{:X}", x),
            SubtractReversed { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x, .. } => write!(f, "SHL V{:X}", x),
            SkipRegistersNotEqual { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            SetIndex { nnn } => write!(f, "LD I, {:#05X}", nnn),
            JumpOffset { nnn } => write!(f, "JP V0, {:#05X}", nnn),
            Random { x, nn } => write!(f, "RND V{:X}, {:#04X}", x, nn),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipKeyPressed { x } => write!(f, "SKP V{:X}", x),
            SkipKeyNotPressed { x } => write!(f, "SKNP V{:X}", x),
            GetDelayTimer { x } => write!(f, "LD V{:X}, DT", x),
            AwaitKeyPress { x } => write!(f, "LD V{:X}, K", x),
            SetDelayTimer { x } => write!(f, "LD DT, V{:X}", x),
            SetSoundTimer { x } => write!(f, "LD ST, V{:X}", x),
            AddToIndex { x } => write!(f, "ADD I, V{:X}", x),
            SetIndexToSprite { x } => write!(f, "LD F, V{:X}", x),
            StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            StoreRegisters { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegisters { x } => write!(f, "LD V{:X}, [I]", x),
            Unknown(opcode) => write!(f, "DW {:#06X}", opcode),
        }
    }
}
