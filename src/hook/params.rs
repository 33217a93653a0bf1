//! Loop parameters: tiga handle per iterasi

use super::{Handle, HandleRegistry, Hook};

/// Konteks per iterasi untuk loop driver
///
/// Dibangun sekali sebelum driver jalan dan read-only selama loop. Caller
/// yang melepas handle-nya ([`LoopParams::unbind_all`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopParams {
    pub begin: Handle,
    pub end: Handle,
    pub callback: Handle,
}

impl LoopParams {
    pub const fn new(begin: Handle, end: Handle, callback: Handle) -> Self {
        Self {
            begin,
            end,
            callback,
        }
    }

    /// Pasang begin hook; handle lama dilepas dulu
    pub fn bind_begin<H: Hook + 'static>(&mut self, registry: &mut HandleRegistry, hook: H) {
        registry.unregister(self.begin);
        self.begin = registry.register(hook);
    }

    /// Pasang end hook; handle lama dilepas dulu
    pub fn bind_end<H: Hook + 'static>(&mut self, registry: &mut HandleRegistry, hook: H) {
        registry.unregister(self.end);
        self.end = registry.register(hook);
    }

    /// Pasang callback utama; handle lama dilepas dulu
    pub fn bind_proc<H: Hook + 'static>(&mut self, registry: &mut HandleRegistry, hook: H) {
        registry.unregister(self.callback);
        self.callback = registry.register(hook);
    }

    /// Lepas ketiga handle dari registry dan kosongkan params
    pub fn unbind_all(&mut self, registry: &mut HandleRegistry) {
        for handle in [self.begin, self.end, self.callback] {
            registry.unregister(handle);
        }
        *self = Self::default();
    }
}
