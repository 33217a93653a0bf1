//! Opaque handles dan registry untuk routine embedder
//!
//! Loop driver tidak pernah memegang function pointer; yang disimpan hanya
//! token numerik. Token di-resolve lewat [`ForeignCall`], sehingga embedder
//! bebas menentukan bagaimana routine-nya dipanggil.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::HookError;

/// Token numerik untuk routine yang terdaftar. `0` berarti kosong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle(u64);

impl Handle {
    /// Handle kosong: invoke selalu sukses tanpa melakukan apa pun
    pub const NONE: Handle = Handle(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Routine yang bisa dipanggil oleh loop driver
pub trait Hook: Send {
    fn invoke(&mut self) -> Result<(), HookError>;
}

/// Closure dengan konvensi status C: negatif berarti gagal
impl<F> Hook for F
where
    F: FnMut() -> i32 + Send,
{
    #[inline(always)]
    fn invoke(&mut self) -> Result<(), HookError> {
        let status = self();
        if status < 0 {
            return Err(HookError::Status(status));
        }
        Ok(())
    }
}

/// Mekanisme pemanggilan routine berdasarkan handle
pub trait ForeignCall {
    fn invoke(&mut self, handle: Handle) -> Result<(), HookError>;
}

/// Registry default: handle → boxed [`Hook`]
#[derive(Default)]
pub struct HandleRegistry {
    hooks: HashMap<Handle, Box<dyn Hook>>,
    next: u64,
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("registered", &self.hooks.len())
            .field("next", &self.next)
            .finish()
    }
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Daftarkan hook dan kembalikan handle baru (tidak pernah [`Handle::NONE`])
    pub fn register<H: Hook + 'static>(&mut self, hook: H) -> Handle {
        self.next += 1;
        let handle = Handle(self.next);
        self.hooks.insert(handle, Box::new(hook));
        debug!(%handle, "hook registered");
        handle
    }

    /// Lepas hook. Handle kosong atau tidak dikenal adalah no-op.
    pub fn unregister(&mut self, handle: Handle) -> bool {
        let removed = self.hooks.remove(&handle).is_some();
        if removed {
            debug!(%handle, "hook unregistered");
        }
        removed
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.hooks.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl ForeignCall for HandleRegistry {
    #[inline]
    fn invoke(&mut self, handle: Handle) -> Result<(), HookError> {
        if handle.is_none() {
            return Ok(());
        }
        match self.hooks.get_mut(&handle) {
            Some(hook) => hook.invoke(),
            None => Err(HookError::UnknownHandle(handle)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_none_handle_succeeds() {
        let mut registry = HandleRegistry::new();
        assert!(registry.invoke(Handle::NONE).is_ok());
    }

    #[test]
    fn test_register_and_invoke() {
        let counter = Arc::new(AtomicI32::new(0));
        let c = counter.clone();

        let mut registry = HandleRegistry::new();
        let handle = registry.register(move || c.fetch_add(1, Ordering::Relaxed));
        assert!(!handle.is_none());

        registry.invoke(handle).unwrap();
        registry.invoke(handle).unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_negative_status_is_failure() {
        let mut registry = HandleRegistry::new();
        let handle = registry.register(|| -11);
        assert_eq!(registry.invoke(handle), Err(HookError::Status(-11)));
    }

    #[test]
    fn test_unknown_handle() {
        let mut registry = HandleRegistry::new();
        let handle = registry.register(|| 0);
        assert!(registry.unregister(handle));
        assert!(!registry.unregister(handle));
        assert_eq!(
            registry.invoke(handle),
            Err(HookError::UnknownHandle(handle))
        );
    }

    #[test]
    fn test_handles_are_unique() {
        let mut registry = HandleRegistry::new();
        let a = registry.register(|| 0);
        let b = registry.register(|| 0);
        registry.unregister(a);
        let c = registry.register(|| 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.len(), 2);
    }
}
