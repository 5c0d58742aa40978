//! Messaging between the controller and injected content scripts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     Deliver{message, reply_tx}    ┌──────────────────┐
//! │  Controller     │──────────────────────────────────►│  Listener task   │
//! │  (TabHost::     │            mpsc                   │  CaptureComponent│
//! │   send_message) │◄──────────────────────────────────│                  │
//! └─────────────────┘            oneshot                └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `port` | Port handle and listener loop |

// ============================================================================
// Submodules
// ============================================================================

/// Content-script port and listener loop.
pub mod port;

// ============================================================================
// Re-exports
// ============================================================================

pub use port::Port;
