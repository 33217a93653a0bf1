//! Run-loop hook bridge
//!
//! Embedder mendaftarkan routine-nya (begin hook, callback, end hook) di
//! registry, lalu loop driver memanggilnya per iterasi lewat handle.

mod driver;
mod handle;
mod params;

pub use driver::{loop_step, run_native, run_native_loop, run_stack, run_stack_loop, EventLoop};
pub use handle::{ForeignCall, Handle, HandleRegistry, Hook};
pub use params::LoopParams;
