//! Background Tasks Module
//!
//! # Tasks
//! - Periodic sweep: removes expired rows at a configured interval

mod cleanup;

pub use cleanup::spawn_sweep_task;
