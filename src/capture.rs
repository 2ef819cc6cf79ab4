//! Capture orchestrator: the acquisition strategy for one attempt.
//!
//! ```text
//! render_to_surface ──▶ settle delay ──▶ rasterize ──▶ Captured(bitmap)
//!        │                                   │
//!        └──────── CrossOriginBlocked ───────┴──▶ Blocked (address only)
//! ```
//!
//! Address attempts run under a hard deadline measured from the start of the
//! load; markup and file attempts have none. The surface is owned by a
//! [`SurfaceGuard`] for the whole attempt, so it is torn down whether the
//! attempt returns, fails, panics, or is dropped by the deadline.

use crate::config::OutputSpec;
use crate::error::{CaptureError, RenderError};
use crate::pipeline::input::CaptureSource;
use crate::pipeline::render::{CaptureRegion, RenderingCapability, SurfaceGuard};
use crate::viewport::ViewportSpec;
use futures::FutureExt;
use image::RgbaImage;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a successful acquisition.
#[derive(Debug)]
pub enum Acquisition {
    /// Direct rendering produced a bitmap.
    Captured(RgbaImage),
    /// The address's origin refused capture; the caller should fall back.
    Blocked { origin: String },
}

/// Drives a [`RenderingCapability`] through one acquisition.
#[derive(Clone)]
pub struct CaptureOrchestrator {
    capability: Arc<dyn RenderingCapability>,
    address_timeout: Duration,
}

impl CaptureOrchestrator {
    pub fn new(capability: Arc<dyn RenderingCapability>, address_timeout_ms: u64) -> Self {
        Self {
            capability,
            address_timeout: Duration::from_millis(address_timeout_ms),
        }
    }

    pub fn address_timeout(&self) -> Duration {
        self.address_timeout
    }

    /// Load, settle and rasterise `source`.
    ///
    /// # Errors
    /// * [`CaptureError::Timeout`]: address attempt exceeded the deadline
    /// * [`CaptureError::AcquisitionFailed`]: capability error other than a
    ///   cross-origin denial on an address
    /// * [`CaptureError::Internal`]: the capability panicked
    pub async fn acquire(
        &self,
        source: &CaptureSource,
        viewport: &ViewportSpec,
        output: &OutputSpec,
    ) -> Result<Acquisition, CaptureError> {
        let attempt = AssertUnwindSafe(self.load_and_rasterize(
            source,
            viewport,
            output.settle_delay_ms(),
        ))
        .catch_unwind();

        match source {
            CaptureSource::Address(url) => {
                match tokio::time::timeout(self.address_timeout, attempt).await {
                    Ok(outcome) => classify(outcome, true),
                    Err(_) => {
                        let ms = self.address_timeout.as_millis() as u64;
                        warn!("Capture of {} timed out after {}ms", url, ms);
                        Err(CaptureError::Timeout { ms })
                    }
                }
            }
            // TODO: markup has no deadline; a stalled capability hangs the session
            CaptureSource::Markup(_) | CaptureSource::File { .. } => classify(attempt.await, false),
        }
    }

    async fn load_and_rasterize(
        &self,
        source: &CaptureSource,
        viewport: &ViewportSpec,
        settle_delay_ms: u64,
    ) -> Result<RgbaImage, RenderError> {
        let handle = self.capability.render_to_surface(source, viewport).await?;
        let surface = SurfaceGuard::new(Arc::clone(&self.capability), handle);
        debug!("Surface {} ready, settling {}ms", handle.id(), settle_delay_ms);

        tokio::time::sleep(Duration::from_millis(settle_delay_ms)).await;

        let region = CaptureRegion::for_viewport(viewport);
        self.capability.rasterize(surface.handle(), region).await
    }
}

fn classify(
    outcome: Result<Result<RgbaImage, RenderError>, Box<dyn std::any::Any + Send>>,
    allow_fallback: bool,
) -> Result<Acquisition, CaptureError> {
    match outcome {
        Ok(Ok(bitmap)) => Ok(Acquisition::Captured(bitmap)),
        Ok(Err(RenderError::CrossOriginBlocked { origin })) if allow_fallback => {
            Ok(Acquisition::Blocked { origin })
        }
        Ok(Err(e)) => {
            warn!("Acquisition failed: {}", e);
            Err(CaptureError::AcquisitionFailed(e.to_string()))
        }
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!("Rendering capability panicked: {}", msg);
            Err(CaptureError::Internal(format!("rendering panicked: {msg}")))
        }
    }
}
