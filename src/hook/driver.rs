//! Loop drivers
//!
//! Satu iterasi = begin → callback → end, berhenti di kegagalan pertama:
//!
//! ```text
//! begin ──ok──► callback ──ok──► end ──► hasil iterasi
//!   │ err          │ err
//!   └──────────────┴──────────────────► hasil iterasi (end tidak dipanggil)
//! ```
//!
//! Dua driver memakai iterasi yang sama:
//! - [`run_stack_loop`]: iterasi diserahkan ke event loop userspace stack,
//!   yang menentukan kapan dipanggil dan apa arti status-nya
//! - [`run_native_loop`]: loop sinkron tanpa henti sampai ada status negatif.
//!   Jalankan di thread sendiri.

use std::convert::Infallible;

use tracing::{debug, warn};

use super::{ForeignCall, HandleRegistry, Hook, LoopParams};
use crate::error::HookError;

/// Event loop eksternal yang memanggil step per tick
///
/// `step` mengembalikan status C: `0` sukses, negatif gagal. Status positif
/// dari hook dihitung sukses, jadi stack selalu menerima `0` untuk iterasi
/// yang berhasil.
pub trait EventLoop {
    fn run(&mut self, step: &mut dyn FnMut() -> i32);
}

/// Satu iterasi dengan bracketing begin/end
#[inline]
pub fn loop_step<C>(params: &LoopParams, calls: &mut C) -> Result<(), HookError>
where
    C: ForeignCall + ?Sized,
{
    calls.invoke(params.begin)?;
    calls.invoke(params.callback)?;
    calls.invoke(params.end)
}

/// Jalankan iterasi terus-menerus sampai salah satu hook gagal
///
/// Tidak ada retry atau backoff; kegagalan pertama dikembalikan ke caller.
pub fn run_native_loop<C>(params: &LoopParams, calls: &mut C) -> Result<Infallible, HookError>
where
    C: ForeignCall + ?Sized,
{
    debug!(?params, "native loop started");

    let mut iterations: u64 = 0;
    loop {
        if let Err(err) = loop_step(params, calls) {
            warn!(iterations, status = err.status(), error = %err, "native loop stopped");
            return Err(err);
        }
        iterations += 1;
    }
}

/// Serahkan iterasi ke event loop userspace stack
///
/// Kapan berhenti sepenuhnya ditentukan oleh `event_loop`.
pub fn run_stack_loop<C, L>(params: &LoopParams, calls: &mut C, event_loop: &mut L)
where
    C: ForeignCall + ?Sized,
    L: EventLoop + ?Sized,
{
    debug!(?params, "handing loop step to stack event loop");

    event_loop.run(&mut || match loop_step(params, &mut *calls) {
        Ok(()) => 0,
        Err(err) => err.status(),
    });
}

/// Native loop dengan satu callback tanpa begin/end hook
///
/// Handle callback dilepas dari registry saat loop berhenti.
pub fn run_native<H>(registry: &mut HandleRegistry, proc: H) -> Result<Infallible, HookError>
where
    H: Hook + 'static,
{
    let mut params = LoopParams::default();
    params.bind_proc(registry, proc);

    let result = run_native_loop(&params, registry);
    params.unbind_all(registry);
    result
}

/// Stack loop dengan satu callback tanpa begin/end hook
pub fn run_stack<H, L>(registry: &mut HandleRegistry, event_loop: &mut L, proc: H)
where
    H: Hook + 'static,
    L: EventLoop + ?Sized,
{
    let mut params = LoopParams::default();
    params.bind_proc(registry, proc);

    run_stack_loop(&params, registry, event_loop);
    params.unbind_all(registry);
}
