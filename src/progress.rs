//! Observer trait for conversion session events.
//!
//! Inject an [`Arc<dyn SessionObserver>`] via
//! [`crate::config::CaptureConfigBuilder::observer`] to receive each state
//! transition and outcome as the session runs.
//!
//! The observer is also the only place a cross-origin fallback is reported:
//! the session itself treats it as silent success, but a front-end that wants
//! to show a soft notice can listen for [`SessionObserver::on_fallback`].
//!
//! # Example
//!
//! ```rust
//! use html2img::{CaptureConfig, SessionObserver, SessionState};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Transitions(Mutex<Vec<SessionState>>);
//!
//! impl SessionObserver for Transitions {
//!     fn on_state_change(&self, _from: SessionState, to: SessionState) {
//!         self.0.lock().unwrap().push(to);
//!     }
//! }
//!
//! let config = CaptureConfig::builder()
//!     .observer(Arc::new(Transitions::default()) as Arc<dyn SessionObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::CaptureError;
use crate::output::CaptureResult;
use crate::session::SessionState;
use std::sync::Arc;

/// Called by a [`crate::session::ConversionSession`] as it moves through its
/// state machine.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Calls arrive sequentially from the task driving the
/// session.
pub trait SessionObserver: Send + Sync {
    /// Called on every state transition, including the reset back to `Idle`.
    fn on_state_change(&self, from: SessionState, to: SessionState) {
        let _ = (from, to);
    }

    /// Called when direct capture was denied and a placeholder is drawn instead.
    ///
    /// # Arguments
    /// * `source`: the normalised address that refused embedding
    fn on_fallback(&self, source: &str) {
        let _ = source;
    }

    /// Called once a result has been registered.
    fn on_complete(&self, result: &CaptureResult) {
        let _ = result;
    }

    /// Called when the attempt ends in `Failed`.
    fn on_failure(&self, error: &CaptureError) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::CaptureConfig`].
pub type ObserverHandle = Arc<dyn SessionObserver>;
