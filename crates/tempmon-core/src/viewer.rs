//! Extension host

use tracing::{error, info, warn};

use crate::extension::{Extension, HostEvent};
use crate::host::HostHandle;

struct Slot {
    extension: Box<dyn Extension>,
    loaded: bool,
}

/// Owns the host handle and the registered extensions
pub struct Viewer {
    host: HostHandle,
    extensions: Vec<Slot>,
}

impl Viewer {
    pub fn new(host: HostHandle) -> Self {
        Self {
            host,
            extensions: Vec::new(),
        }
    }

    pub fn host(&self) -> &HostHandle {
        &self.host
    }

    pub fn register(&mut self, extension: Box<dyn Extension>) {
        self.extensions.push(Slot {
            extension,
            loaded: false,
        });
    }

    /// Names of the loaded extensions, in registration order
    pub fn loaded_extensions(&self) -> Vec<&'static str> {
        self.extensions
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.extension.name())
            .collect()
    }

    /// Load every registered extension; returns how many loaded
    pub fn load_extensions(&mut self) -> usize {
        for slot in self.extensions.iter_mut().filter(|s| !s.loaded) {
            slot.loaded = slot.extension.load();
            if !slot.loaded {
                warn!(extension = slot.extension.name(), "Extension failed to load");
            }
        }
        self.extensions.iter().filter(|s| s.loaded).count()
    }

    /// Deliver an event to every loaded extension
    ///
    /// A failing extension does not stop delivery to the others. Returns the
    /// number of failures.
    pub async fn dispatch(&mut self, event: &HostEvent) -> usize {
        let mut failures = 0;
        for slot in self.extensions.iter_mut().filter(|s| s.loaded) {
            if let Err(e) = slot.extension.on_host_event(event).await {
                error!(extension = slot.extension.name(), event = ?event, error = %e, "Extension failed to handle event");
                failures += 1;
            }
        }
        failures
    }

    /// Unload extensions in reverse registration order
    pub fn shutdown(&mut self) {
        for slot in self.extensions.iter_mut().rev().filter(|s| s.loaded) {
            slot.extension.unload();
            slot.loaded = false;
        }
        info!("Viewer shut down");
    }
}
