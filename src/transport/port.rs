//! Message port to an injected content script.
//!
//! Injection spawns a listener task that owns the [`CaptureComponent`].
//! The port feeds it messages over an unbounded channel; each message
//! carries its own oneshot sender for the reply, so no correlation map is
//! needed.
//!
//! # Listener Loop
//!
//! - `Deliver` → run the component synchronously, send the reply back
//! - `Shutdown` → stop (navigation, tab close, re-injection)
//! - channel closed → stop

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::capture::CaptureComponent;
use crate::error::{Error, Result};
use crate::identifiers::TabId;

// ============================================================================
// PortCommand
// ============================================================================

/// Internal commands for the listener loop.
enum PortCommand {
    /// Deliver a message and reply on the given channel.
    Deliver {
        message: Value,
        reply_tx: oneshot::Sender<Value>,
    },
    /// Stop the listener.
    Shutdown,
}

// ============================================================================
// Port
// ============================================================================

/// Sending side of a content script's message listener.
///
/// Cloning shares the same listener.
#[derive(Clone)]
pub struct Port {
    tab_id: TabId,
    command_tx: mpsc::UnboundedSender<PortCommand>,
}

impl Port {
    /// Spawns a listener task running `component`.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(tab_id: TabId, component: CaptureComponent) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_listener(tab_id, command_rx, component));
        Self { tab_id, command_tx }
    }

    /// Returns the tab this port talks to.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Returns `true` while the listener is running.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.command_tx.is_closed()
    }

    /// Sends a message and waits for the reply.
    ///
    /// No timeout is applied here; callers that want one wrap the future.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInjected`] if the listener has already stopped
    /// - [`Error::ChannelClosed`] if it stops before replying
    pub async fn send(&self, message: Value) -> Result<Value> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(PortCommand::Deliver { message, reply_tx })
            .map_err(|_| Error::not_injected(self.tab_id))?;

        Ok(reply_rx.await?)
    }

    /// Stops the listener after the messages already queued.
    pub fn disconnect(&self) {
        let _ = self.command_tx.send(PortCommand::Shutdown);
    }

    /// Listener loop that answers messages with the capture component.
    async fn run_listener(
        tab_id: TabId,
        mut command_rx: mpsc::UnboundedReceiver<PortCommand>,
        component: CaptureComponent,
    ) {
        debug!(%tab_id, url = %component.page().url(), "Content script listening");

        while let Some(command) = command_rx.recv().await {
            match command {
                PortCommand::Deliver { message, reply_tx } => {
                    let reply = component.handle_message(&message);
                    if reply_tx.send(reply).is_err() {
                        trace!(%tab_id, "Reply dropped, sender went away");
                    }
                }
                PortCommand::Shutdown => break,
            }
        }

        debug!(%tab_id, "Content script listener terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================
