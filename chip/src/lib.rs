pub mod chip8;
pub mod definitions;
pub mod devices;
pub mod opcode;
pub mod timer;
mod error;

// reexporting for convenience
mod runner;
pub use error::*;
pub use runner::*;
