//! Protocols Module
//!
//! Window-manager protocol handlers (`wm protocol`). At most one handler per
//! window and protocol; registering again replaces the old one. Handlers are
//! shared (`Rc`), so a handler that unregisters itself while running stays
//! alive until its invocation returns.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, error};

use crate::platform::NativePlatform;
use crate::wm::error::WmResult;
use crate::wm::{WindowId, WindowManager};

/// Close request sent when the user closes the frame
pub const WM_DELETE_WINDOW: &str = "WM_DELETE_WINDOW";

/// Protocol handler body
pub type ProtocolCallback<P> = Rc<dyn Fn(&mut WindowManager<P>, WindowId) -> anyhow::Result<()>>;

/// One registered handler
pub struct ProtocolHandler<P: NativePlatform> {
    pub protocol: String,
    /// Script text reported back by `wm protocol window name`
    pub script: String,
    callback: ProtocolCallback<P>,
}

/// Handlers per window, most recently added protocol first
pub struct ProtocolRegistry<P: NativePlatform> {
    handlers: HashMap<WindowId, Vec<ProtocolHandler<P>>>,
}

impl<P: NativePlatform> ProtocolRegistry<P> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    fn register(&mut self, window: WindowId, handler: ProtocolHandler<P>) {
        let list = self.handlers.entry(window).or_default();
        match list.iter_mut().find(|h| h.protocol == handler.protocol) {
            // The replaced callback lives on in any invocation holding a clone
            Some(existing) => *existing = handler,
            None => list.insert(0, handler),
        }
    }

    fn unregister(&mut self, window: WindowId, protocol: &str) -> bool {
        let Some(list) = self.handlers.get_mut(&window) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| h.protocol != protocol);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(&window);
        }
        removed
    }

    fn lookup(&self, window: WindowId, protocol: &str) -> Option<&ProtocolHandler<P>> {
        self.handlers
            .get(&window)?
            .iter()
            .find(|h| h.protocol == protocol)
    }

    pub(crate) fn remove_window(&mut self, window: WindowId) {
        self.handlers.remove(&window);
    }
}

impl<P: NativePlatform> Default for ProtocolRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: NativePlatform> WindowManager<P> {
    /// Register (or replace) the handler for `protocol` on `id`
    pub fn register_protocol(
        &mut self,
        id: WindowId,
        protocol: &str,
        script: &str,
        callback: ProtocolCallback<P>,
    ) -> WmResult<()> {
        self.get(id)?;
        self.protocols.register(
            id,
            ProtocolHandler {
                protocol: protocol.to_string(),
                script: script.to_string(),
                callback,
            },
        );
        wm_trace!(self, "Protocol {} registered for {}", protocol, id);
        Ok(())
    }

    pub fn unregister_protocol(&mut self, id: WindowId, protocol: &str) -> WmResult<()> {
        self.get(id)?;
        if self.protocols.unregister(id, protocol) {
            wm_trace!(self, "Protocol {} unregistered for {}", protocol, id);
        }
        Ok(())
    }

    /// Protocols with handlers on `id`, most recently added first
    pub fn protocols(&self, id: WindowId) -> WmResult<Vec<String>> {
        self.get(id)?;
        Ok(self
            .protocols
            .handlers
            .get(&id)
            .map(|list| list.iter().map(|h| h.protocol.clone()).collect())
            .unwrap_or_default())
    }

    /// Script of the handler for `protocol`, if one is registered
    pub fn protocol_script(&self, id: WindowId, protocol: &str) -> WmResult<Option<String>> {
        self.get(id)?;
        Ok(self.protocols.lookup(id, protocol).map(|h| h.script.clone()))
    }

    /// Dispatch a protocol message. Handler failures are reported as
    /// background errors; an unhandled close request destroys the window.
    pub fn on_protocol_message(&mut self, id: WindowId, protocol: &str) {
        let callback = self
            .protocols
            .lookup(id, protocol)
            .map(|h| Rc::clone(&h.callback));

        match callback {
            Some(callback) => {
                wm_trace!(self, "Invoking {} handler of {}", protocol, id);
                if let Err(err) = callback(self, id) {
                    let message = format!("{protocol} handler of window {id} failed: {err:#}");
                    error!("{}", message);
                    self.background_errors.push(message);
                }
            }
            None if protocol == WM_DELETE_WINDOW => {
                wm_trace!(self, "No {} handler for {}; destroying it", protocol, id);
                self.dead_window(id, false);
            }
            None => debug!("Unhandled protocol {} for {}", protocol, id),
        }
    }
}
