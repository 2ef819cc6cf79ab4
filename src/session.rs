//! The conversion session: one explicit state machine per user.
//!
//! ```text
//! Idle ──▶ Validating ──▶ Acquiring ──┬──────────────▶ Encoding ──▶ Completed
//!              │              │       └─▶ FallingBack ──┘    │
//!              └──────────────┴──────────▶ Failed ◀──────────┘
//! ```
//!
//! `convert` drives one attempt to a terminal state and registers the result.
//! A second `convert` while an attempt is in flight is refused with
//! [`CaptureError::Busy`] without touching the running attempt. Because
//! `convert` borrows the session mutably this can only happen when a caller
//! drops a `convert` future half-way; [`ConversionSession::reset`] recovers
//! from that.

use crate::capture::{Acquisition, CaptureOrchestrator};
use crate::config::{CaptureConfig, OutputSpec};
use crate::error::{CaptureError, InvalidInputError};
use crate::output::{CaptureMode, CaptureResult};
use crate::pipeline::encode::encode_blocking;
use crate::pipeline::fallback;
use crate::pipeline::input::{self, RawInput};
use crate::pipeline::render::RenderingCapability;
use crate::progress::{NoopObserver, ObserverHandle};
use crate::registry::ResultRegistry;
use crate::viewport::ViewportSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Validating,
    Acquiring,
    FallingBack,
    Encoding,
    Completed,
    Failed,
}

impl SessionState {
    /// `true` while an attempt is running.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            SessionState::Validating
                | SessionState::Acquiring
                | SessionState::FallingBack
                | SessionState::Encoding
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Validating => "validating",
            SessionState::Acquiring => "acquiring",
            SessionState::FallingBack => "falling_back",
            SessionState::Encoding => "encoding",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holds the selected input and settings, and runs conversions.
pub struct ConversionSession {
    orchestrator: CaptureOrchestrator,
    observer: ObserverHandle,
    max_file_bytes: u64,
    input: Option<RawInput>,
    viewport: ViewportSpec,
    output: OutputSpec,
    state: SessionState,
    last_error: Option<CaptureError>,
}

impl fmt::Debug for ConversionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionSession")
            .field("state", &self.state)
            .field("input", &self.input)
            .field("viewport", &self.viewport)
            .field("output", &self.output)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl ConversionSession {
    pub fn new(capability: Arc<dyn RenderingCapability>, config: CaptureConfig) -> Self {
        Self {
            orchestrator: CaptureOrchestrator::new(capability, config.address_timeout_ms),
            observer: config.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
            max_file_bytes: config.max_file_bytes,
            input: None,
            viewport: config.viewport,
            output: config.output,
            state: SessionState::Idle,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Error of the last failed attempt or rejected input selection.
    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    pub fn input(&self) -> Option<&RawInput> {
        self.input.as_ref()
    }

    pub fn viewport(&self) -> &ViewportSpec {
        &self.viewport
    }

    /// Edit the viewport between conversions; setters clamp into range.
    pub fn viewport_mut(&mut self) -> &mut ViewportSpec {
        &mut self.viewport
    }

    pub fn output(&self) -> &OutputSpec {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputSpec {
        &mut self.output
    }

    /// Select the input for the next conversion and validate it eagerly.
    ///
    /// The input is stored even when rejected, so a later `convert` reports
    /// the same error. A rejection is recorded as `last_error`; the session
    /// state is left at (or returned to) `Idle`.
    pub fn select_input(&mut self, raw: RawInput) -> Result<(), InvalidInputError> {
        let checked = input::prevalidate(&raw, self.max_file_bytes);
        self.input = Some(raw);
        if !self.state.is_in_flight() {
            self.transition(SessionState::Idle);
        }
        match checked {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                debug!("Rejected input: {}", e);
                self.last_error = Some(e.clone().into());
                Err(e)
            }
        }
    }

    pub fn clear_input(&mut self) {
        self.input = None;
    }

    /// Return to `Idle`, dropping `last_error`. Input and settings are kept.
    pub fn reset(&mut self) {
        self.last_error = None;
        self.transition(SessionState::Idle);
    }

    /// Run one conversion and append its result to `registry`.
    ///
    /// Returns the new result's id. Every failure leaves the registry
    /// untouched and the session in `Failed`, except [`CaptureError::Busy`],
    /// which leaves everything as it was.
    pub async fn convert(&mut self, registry: &mut ResultRegistry) -> Result<Uuid, CaptureError> {
        if self.state.is_in_flight() {
            debug!("convert ignored: session is {}", self.state);
            return Err(CaptureError::Busy);
        }

        let started = Instant::now();
        self.last_error = None;
        self.transition(SessionState::Validating);

        let Some(raw) = self.input.clone() else {
            return self.fail(InvalidInputError::Missing.into());
        };
        let source = match input::resolve(&raw, self.max_file_bytes).await {
            Ok(source) => source,
            Err(e) => return self.fail(e.into()),
        };
        info!(
            "Converting {} at {}x{} ({})",
            source.description(),
            self.viewport.width(),
            self.viewport.height(),
            self.viewport.preset()
        );

        self.transition(SessionState::Acquiring);
        let acquired = self
            .orchestrator
            .acquire(&source, &self.viewport, &self.output)
            .await;

        let (bitmap, mode, disclosure) = match acquired {
            Ok(Acquisition::Captured(bitmap)) => (bitmap, CaptureMode::Direct, None),
            Ok(Acquisition::Blocked { origin }) => {
                self.transition(SessionState::FallingBack);
                warn!("{} blocked direct capture; drawing a synthesized preview", origin);
                self.observer.on_fallback(&source.description());
                let preview = fallback::render(&source, &self.viewport, &self.output);
                (preview.bitmap, CaptureMode::Synthesized, Some(preview.footer))
            }
            Err(e) => return self.fail(e),
        };

        self.transition(SessionState::Encoding);
        let encoded = match encode_blocking(bitmap, self.output.format(), self.output.quality()).await {
            Ok(encoded) => encoded,
            Err(e) => return self.fail(e),
        };

        let result = CaptureResult::from_encoded(
            encoded,
            source.description(),
            source.kind(),
            self.output.quality_label(),
            mode,
            disclosure,
        );
        let id = result.id;
        info!(
            "Captured {} → {} ({}, {:?}) in {:.2}s",
            result.source_description,
            result.file_name(),
            result.size_label(),
            result.mode,
            started.elapsed().as_secs_f64()
        );
        registry.add(result);

        self.transition(SessionState::Completed);
        if let Some(result) = registry.get(id) {
            self.observer.on_complete(result);
        }
        Ok(id)
    }

    fn fail(&mut self, error: CaptureError) -> Result<Uuid, CaptureError> {
        warn!("Conversion failed: {}", error);
        self.last_error = Some(error.clone());
        self.transition(SessionState::Failed);
        self.observer.on_failure(&error);
        Err(error)
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!("Session {} → {}", from, to);
        self.state = to;
        self.observer.on_state_change(from, to);
    }
}
