//! Rendering capability: load a source into an isolated surface and produce a
//! bitmap of a region of it.
//!
//! The orchestrator only talks to [`RenderingCapability`], so a real browser
//! backend, the built-in [`BasicRenderer`], or a scripted test double can be
//! swapped without touching the state machine.
//!
//! ## Teardown
//!
//! Every surface handed out by `render_to_surface` is wrapped in a
//! [`SurfaceGuard`] immediately. The guard calls the synchronous
//! [`RenderingCapability::release`] from `Drop`, which runs on every exit path
//! of the acquisition future: normal return, `?` propagation, a panic
//! unwinding through it, or the future being dropped by `tokio::time::timeout`.
//!
//! ## BasicRenderer
//!
//! Markup is parsed with `scraper`, laid out as stacked text blocks and
//! painted with the `font8x8` bitmap font. Parsing and painting are CPU-bound
//! and run in `spawn_blocking`. Addresses are fetched with `reqwest`; when the
//! response forbids framing (`X-Frame-Options` or CSP `frame-ancestors`) the
//! surface is marked blocked and rasterisation reports
//! [`RenderError::CrossOriginBlocked`], mirroring what an embedded browser
//! frame would see.

use super::input::CaptureSource;
use super::layout::{self, PAGE_BACKGROUND};
use super::paint;
use crate::error::RenderError;
use crate::viewport::{ViewportSpec, MIN_DIMENSION};
use async_trait::async_trait;
use image::RgbaImage;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_SECURITY_POLICY, X_FRAME_OPTIONS};
use scraper::Html;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Tallest full-extent capture the built-in renderer will produce.
pub const MAX_FULL_EXTENT_HEIGHT: u32 = 16_384;

const USER_AGENT: &str = concat!("html2img/", env!("CARGO_PKG_VERSION"));

static RE_FRAME_ANCESTORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|;)\s*frame-ancestors\s+([^;]*)").unwrap());

/// Opaque identifier of a live rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(u64);

impl RenderHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Region to rasterise, anchored at the top-left of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRegion {
    pub width: u32,
    /// `None` captures the full content height.
    pub height: Option<u32>,
}

impl CaptureRegion {
    /// Viewport-sized region, or full height when full-extent capture is on.
    pub fn for_viewport(viewport: &ViewportSpec) -> Self {
        Self {
            width: viewport.width(),
            height: (!viewport.capture_full_extent()).then(|| viewport.height()),
        }
    }
}

/// A backend able to render a [`CaptureSource`] and rasterise the result.
#[async_trait]
pub trait RenderingCapability: Send + Sync {
    /// Load `source` into a fresh surface sized to `viewport`.
    ///
    /// For markup this is an off-screen container; for addresses an isolated
    /// frame. A surface is only considered created once this returns `Ok`.
    async fn render_to_surface(
        &self,
        source: &CaptureSource,
        viewport: &ViewportSpec,
    ) -> Result<RenderHandle, RenderError>;

    /// Produce a bitmap of `region`.
    ///
    /// Returns [`RenderError::CrossOriginBlocked`] when the surface's origin
    /// forbids reading its pixels.
    async fn rasterize(
        &self,
        handle: &RenderHandle,
        region: CaptureRegion,
    ) -> Result<RgbaImage, RenderError>;

    /// Tear down a surface. Must not block and must tolerate unknown handles.
    fn release(&self, handle: RenderHandle);
}

/// Releases its surface when dropped.
pub struct SurfaceGuard {
    capability: Arc<dyn RenderingCapability>,
    handle: RenderHandle,
}

impl SurfaceGuard {
    pub fn new(capability: Arc<dyn RenderingCapability>, handle: RenderHandle) -> Self {
        Self { capability, handle }
    }

    pub fn handle(&self) -> &RenderHandle {
        &self.handle
    }
}

impl Drop for SurfaceGuard {
    fn drop(&mut self) {
        debug!("Releasing surface {}", self.handle.id());
        self.capability.release(self.handle);
    }
}

// ── BasicRenderer ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum SurfaceContent {
    Markup(String),
    Blocked { origin: String },
}

#[derive(Debug, Clone)]
struct Surface {
    viewport_height: u32,
    content: SurfaceContent,
}

/// Pure-Rust rendering backend: block layout + bitmap font, no browser.
pub struct BasicRenderer {
    client: reqwest::Client,
    surfaces: Mutex<HashMap<u64, Surface>>,
    next_id: AtomicU64,
}

impl Default for BasicRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicRenderer {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    /// Use a preconfigured HTTP client (proxies, custom roots, etc.).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            surfaces: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of surfaces created and not yet released.
    pub fn live_surfaces(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<u64, Surface>> {
        self.surfaces.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn load_address(&self, url: &reqwest::Url) -> Result<SurfaceContent, RenderError> {
        let load_failed = |e: reqwest::Error| RenderError::LoadFailed {
            target: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url.clone()).send().await.map_err(load_failed)?;
        let status = response.status();
        if frame_policy_blocks(response.headers()) {
            info!("{} forbids embedding; surface marked blocked", url);
            return Ok(SurfaceContent::Blocked {
                origin: url.origin().ascii_serialization(),
            });
        }
        if !status.is_success() {
            warn!("{} answered {}; rendering the response body anyway", url, status);
        }

        let body = response.text().await.map_err(load_failed)?;
        debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(SurfaceContent::Markup(body))
    }
}

#[async_trait]
impl RenderingCapability for BasicRenderer {
    async fn render_to_surface(
        &self,
        source: &CaptureSource,
        viewport: &ViewportSpec,
    ) -> Result<RenderHandle, RenderError> {
        let content = match source {
            CaptureSource::Address(url) => self.load_address(url).await?,
            CaptureSource::Markup(html) | CaptureSource::File { html, .. } => {
                SurfaceContent::Markup(html.clone())
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.table().insert(
            id,
            Surface {
                viewport_height: viewport.height(),
                content,
            },
        );
        debug!("Created surface {} for {}", id, source.description());
        Ok(RenderHandle::new(id))
    }

    async fn rasterize(
        &self,
        handle: &RenderHandle,
        region: CaptureRegion,
    ) -> Result<RgbaImage, RenderError> {
        let surface = self
            .table()
            .get(&handle.id())
            .cloned()
            .ok_or_else(|| RenderError::RasterFailed(format!("unknown surface {}", handle.id())))?;

        let html = match surface.content {
            SurfaceContent::Blocked { origin } => {
                return Err(RenderError::CrossOriginBlocked { origin })
            }
            SurfaceContent::Markup(html) => html,
        };

        let width = region.width;
        let fixed_height = region.height;
        let viewport_height = surface.viewport_height;
        tokio::task::spawn_blocking(move || {
            rasterize_markup(&html, width, fixed_height, viewport_height)
        })
        .await
        .map_err(|e| RenderError::RasterFailed(format!("Paint task panicked: {}", e)))
    }

    fn release(&self, handle: RenderHandle) {
        self.table().remove(&handle.id());
    }
}

/// Lay out and paint markup. `fixed_height == None` sizes the bitmap to the
/// content, never shorter than the viewport and at most
/// [`MAX_FULL_EXTENT_HEIGHT`].
fn rasterize_markup(html: &str, width: u32, fixed_height: Option<u32>, viewport_height: u32) -> RgbaImage {
    let document = Html::parse_document(html);
    let layout = layout::layout_document(&document, width);
    let height =
        fixed_height.unwrap_or_else(|| full_extent_height(layout.content_height, viewport_height));
    debug!(
        "Painting {} blocks at {}x{} (content height {})",
        layout.blocks.len(),
        width,
        height,
        layout.content_height
    );
    let commands = layout::to_paint_commands(&layout);
    paint::paint(width, height, PAGE_BACKGROUND, &commands)
}

/// Scrollable height of a page: its content, but never less than the window.
fn full_extent_height(content_height: u32, viewport_height: u32) -> u32 {
    let floor = viewport_height.clamp(MIN_DIMENSION, MAX_FULL_EXTENT_HEIGHT);
    content_height.clamp(floor, MAX_FULL_EXTENT_HEIGHT)
}

/// `true` when response headers forbid embedding the page in a foreign frame.
pub fn frame_policy_blocks(headers: &HeaderMap) -> bool {
    let xfo_blocks = headers
        .get_all(X_FRAME_OPTIONS)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| {
            let v = v.trim();
            v.eq_ignore_ascii_case("deny") || v.eq_ignore_ascii_case("sameorigin")
        });
    if xfo_blocks {
        return true;
    }

    headers
        .get_all(CONTENT_SECURITY_POLICY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|csp| RE_FRAME_ANCESTORS.captures(csp))
        .any(|caps| !caps[1].split_whitespace().any(|src| src == "*"))
}
