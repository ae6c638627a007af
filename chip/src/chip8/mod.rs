//! The full implementation of the chip8 machine, from the system state and its locks
//! to the execution of the opcodes and an option to pretty print them.
mod control;
mod display;
mod machine;
mod opcodes;
mod print;
mod stack;

/// reexport the machine structs and data for simpler usage
pub use control::{DebugStep, Debugger, Pending, WaitForKey};
pub use display::{Framebuffer, Region};
pub use machine::{Core, Machine};
pub use stack::CallStack;
