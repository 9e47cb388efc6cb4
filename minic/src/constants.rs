//! Constant values of the MiniC machine model.

/// Number of integer registers.
pub const REGISTER_COUNT: usize = 8;

/// Default number of integer cells in data memory.
pub const MEM_SIZE: usize = 1024;

/// Accumulator. Expression results are left here.
pub const AC: i32 = 0;

/// Second accumulator, holds the left operand of binary operators.
pub const AC1: i32 = 1;

/// Frame-base helper. Holds computed addresses for stores and array access.
pub const BP: i32 = 2;

/// Stack pointer. Reserved by the calling convention, never written by generated code.
pub const SP: i32 = 3;

/// Global pointer. Base of the global data region, always zero.
pub const GP: i32 = 5;

/// Frame pointer of the running function.
pub const FP: i32 = 6;

/// Program counter.
pub const PC: i32 = 7;

/// Frame slot, relative to the frame pointer, that holds the return address.
pub const RETURN_SLOT: i32 = -2;

/// Frame slot, relative to the frame pointer, that holds the caller's frame pointer.
pub const SAVED_FP_SLOT: i32 = -1;

/// Halt code of a normal program end.
pub const HALT_END: i32 = 0;

/// Halt code raised by the guard in front of every array access.
pub const HALT_NEGATIVE_OFFSET: i32 = -1;

/// Names used by the register dump, indexed by register id.
pub const REGISTER_NAMES: [&str; REGISTER_COUNT] = ["AC", "AC1", "BP", "SP", "R4", "GP", "FP", "PC"];

/// Largest number of cells a single frame may reserve, leaving headroom
/// for the linkage slots and temporaries above it.
pub const MAX_FRAME_SIZE: i32 = i32::MAX / 2;
