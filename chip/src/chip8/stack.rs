use tinyvec::ArrayVec;

use crate::{definitions::cpu, opcode::Address, StackError};

/// The stack is only used to store return addresses when subroutines are called. The original
/// [RCA 1802](https://de.wikipedia.org/wiki/RCA1802) version allocated `48` bytes for up to
/// `12` levels of nesting; modern implementations usually have more.
/// (here we are using `16`)
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallStack {
    entries: ArrayVec<[Address; cpu::stack::SIZE]>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Will push the pointer onto the stack, a full stack stays unchanged.
    pub fn push(&mut self, pointer: Address) -> Result<(), StackError> {
        self.entries
            .try_push(pointer)
            .map_or(Ok(()), |_| Err(StackError::Full))
    }

    /// Will pop the last pointer, an empty stack stays unchanged.
    pub fn pop(&mut self) -> Result<Address, StackError> {
        self.entries.pop().ok_or(StackError::Empty)
    }

    /// The stack pointer, always inside of `[0, 16]`.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.entries.capacity()
    }

    /// The live entries, from the oldest to the newest one.
    pub fn as_slice(&self) -> &[Address] {
        self.entries.as_slice()
    }
}
