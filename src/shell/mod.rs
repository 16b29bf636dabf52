// Outer shell: configuration and wiring. The binary in main.rs drives it.

pub mod config;
pub mod state;
