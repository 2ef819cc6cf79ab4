//! Synthesized preview for targets whose origin refuses direct capture.
//!
//! The frame is a browser-window mockup: an address bar carrying the source's
//! identity (with a lock for `https`), a header block and three content
//! columns, and a footer that states the viewport, the requested format and
//! that the image is synthetic. Everything is derived from the inputs only,
//! so two calls with equal arguments produce identical pixels.

use super::input::CaptureSource;
use super::paint::{self, fit_text, text_width, PaintCommand, GLYPH_SIZE};
use crate::config::OutputSpec;
use crate::viewport::ViewportSpec;
use image::{Rgba, RgbaImage};

const BACKGROUND: Rgba<u8> = Rgba([243, 244, 246, 255]);
const CHROME: Rgba<u8> = Rgba([229, 231, 235, 255]);
const ADDRESS_FIELD: Rgba<u8> = Rgba([255, 255, 255, 255]);
const ADDRESS_TEXT: Rgba<u8> = Rgba([55, 65, 81, 255]);
const LOCK: Rgba<u8> = Rgba([22, 163, 74, 255]);
const HEADER_BLOCK: Rgba<u8> = Rgba([209, 213, 219, 255]);
const COLUMN: Rgba<u8> = Rgba([229, 231, 235, 255]);
const COLUMN_LINE: Rgba<u8> = Rgba([203, 207, 214, 255]);
const FOOTER: Rgba<u8> = Rgba([17, 24, 39, 255]);
const FOOTER_TEXT: Rgba<u8> = Rgba([243, 244, 246, 255]);

const BAR_HEIGHT: u32 = 56;
const FOOTER_HEIGHT: u32 = 40;
const MARGIN: u32 = 32;
const GUTTER: u32 = 24;

/// A synthesized frame plus the disclosure line painted into its footer.
#[derive(Debug, Clone)]
pub struct SyntheticPreview {
    pub bitmap: RgbaImage,
    pub footer: String,
}

/// Footer line: `"<w>x<h> · <FORMAT> · Synthesized preview, direct capture unavailable"`.
pub fn footer_text(viewport: &ViewportSpec, output: &OutputSpec) -> String {
    format!(
        "{}x{} \u{b7} {} \u{b7} Synthesized preview, direct capture unavailable",
        viewport.width(),
        viewport.height(),
        output.format()
    )
}

/// Draw the placeholder for `source` at the viewport's dimensions. Never fails.
pub fn render(source: &CaptureSource, viewport: &ViewportSpec, output: &OutputSpec) -> SyntheticPreview {
    let (w, h) = (viewport.width(), viewport.height());
    let footer = footer_text(viewport, output);

    let mut cmds = Vec::new();
    address_bar(&mut cmds, source, w);
    content_mockup(&mut cmds, w, h);
    footer_bar(&mut cmds, &footer, w, h);

    SyntheticPreview {
        bitmap: paint::paint(w, h, BACKGROUND, &cmds),
        footer,
    }
}

fn address_bar(cmds: &mut Vec<PaintCommand>, source: &CaptureSource, w: u32) {
    cmds.push(PaintCommand::FillRect {
        x: 0,
        y: 0,
        width: w,
        height: BAR_HEIGHT,
        color: CHROME,
    });
    let field_width = w.saturating_sub(32);
    cmds.push(PaintCommand::FillRect {
        x: 16,
        y: 12,
        width: field_width,
        height: 32,
        color: ADDRESS_FIELD,
    });

    let mut text_x = 24;
    if source.is_secure() {
        // shackle over a solid body
        cmds.push(PaintCommand::StrokeRect {
            x: 26,
            y: 17,
            width: 10,
            height: 9,
            thickness: 2,
            color: LOCK,
        });
        cmds.push(PaintCommand::FillRect {
            x: 24,
            y: 24,
            width: 14,
            height: 11,
            color: LOCK,
        });
        text_x = 46;
    }

    let scale = if w >= 600 { 2 } else { 1 };
    let room = field_width.saturating_sub(text_x as u32);
    let text = fit_text(&source.description(), room, scale);
    let text_y = 28 - (GLYPH_SIZE * scale / 2) as i32;
    cmds.push(PaintCommand::Text {
        x: text_x,
        y: text_y,
        text,
        scale,
        color: ADDRESS_TEXT,
    });
}

fn content_mockup(cmds: &mut Vec<PaintCommand>, w: u32, h: u32) {
    let top = BAR_HEIGHT + GUTTER;
    let bottom = h.saturating_sub(FOOTER_HEIGHT + GUTTER);
    if bottom <= top {
        return;
    }
    let inner_width = w.saturating_sub(MARGIN * 2);
    let header_height = ((bottom - top) / 5).max(8);
    cmds.push(PaintCommand::FillRect {
        x: MARGIN as i32,
        y: top as i32,
        width: inner_width,
        height: header_height,
        color: HEADER_BLOCK,
    });

    let col_top = top + header_height + GUTTER;
    if bottom <= col_top {
        return;
    }
    let col_height = bottom - col_top;
    let col_width = inner_width.saturating_sub(GUTTER * 2) / 3;
    for i in 0..3 {
        let x = (MARGIN + i * (col_width + GUTTER)) as i32;
        cmds.push(PaintCommand::FillRect {
            x,
            y: col_top as i32,
            width: col_width,
            height: col_height,
            color: COLUMN,
        });
        // text-line placeholders, every other line shortened
        let mut line_y = col_top + 16;
        let mut n = 0;
        while line_y + 8 < bottom.saturating_sub(8) {
            let line_width = if n % 2 == 0 {
                col_width.saturating_sub(32)
            } else {
                col_width.saturating_sub(32) * 2 / 3
            };
            cmds.push(PaintCommand::FillRect {
                x: x + 16,
                y: line_y as i32,
                width: line_width,
                height: 8,
                color: COLUMN_LINE,
            });
            line_y += 20;
            n += 1;
        }
    }
}

fn footer_bar(cmds: &mut Vec<PaintCommand>, footer: &str, w: u32, h: u32) {
    let top = h.saturating_sub(FOOTER_HEIGHT);
    cmds.push(PaintCommand::FillRect {
        x: 0,
        y: top as i32,
        width: w,
        height: FOOTER_HEIGHT,
        color: FOOTER,
    });
    let scale = if text_width(footer, 2) + 32 <= w { 2 } else { 1 };
    let text = fit_text(footer, w.saturating_sub(32), scale);
    cmds.push(PaintCommand::Text {
        x: 16,
        y: (top + (FOOTER_HEIGHT - GLYPH_SIZE * scale) / 2) as i32,
        text,
        scale,
        color: FOOTER_TEXT,
    });
}
