//! Input conditioning helpers shared by the boot modes.

pub mod debounce;
