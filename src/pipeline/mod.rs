//! Pipeline stages for markup/webpage-to-image capture.
//!
//! Each submodule implements one step, so every stage is testable alone and
//! the rendering backend can be replaced without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode
//!             │          ▲
//!             └▶ fallback┘   (cross-origin denial only)
//! ```
//!
//! 1. [`input`]: normalise an address, inline markup or markup file into a
//!    [`input::CaptureSource`]
//! 2. [`render`]: the [`render::RenderingCapability`] seam plus the built-in
//!    [`render::BasicRenderer`], which uses [`layout`] and [`paint`]
//! 3. [`fallback`]: deterministic synthesized preview when the origin refuses
//!    capture
//! 4. [`encode`]: PNG/JPEG encoding on the blocking pool

pub mod encode;
pub mod fallback;
pub mod input;
pub mod layout;
pub mod paint;
pub mod render;
