//! Paint commands and the software canvas that executes them.
//!
//! Both the markup rasteriser and the fallback renderer describe a frame as a
//! flat list of [`PaintCommand`]s and hand it to [`paint`]. Text uses the
//! 8×8 `font8x8` bitmap font scaled by an integer factor, so output is
//! pixel-identical across platforms and needs no font files.

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgba, RgbaImage};

/// Edge of one unscaled glyph cell in pixels.
pub const GLYPH_SIZE: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    FillRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Rgba<u8>,
    },
    StrokeRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        thickness: u32,
        color: Rgba<u8>,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        scale: u32,
        color: Rgba<u8>,
    },
}

/// Width in pixels of a single line of `text` at `scale`.
pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_SIZE * scale.max(1)
}

/// Truncate `text` so it fits in `max_width` pixels, ending with `...` when cut.
pub fn fit_text(text: &str, max_width: u32, scale: u32) -> String {
    let cell = GLYPH_SIZE * scale.max(1);
    let max_chars = (max_width / cell) as usize;
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut out: String = text.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// Allocate a `width × height` canvas filled with `background` and execute
/// `commands` on it in order.
pub fn paint(width: u32, height: u32, background: Rgba<u8>, commands: &[PaintCommand]) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, background);
    for cmd in commands {
        execute(&mut img, cmd);
    }
    img
}

fn execute(img: &mut RgbaImage, cmd: &PaintCommand) {
    match cmd {
        PaintCommand::FillRect {
            x,
            y,
            width,
            height,
            color,
        } => fill_rect(img, *x, *y, *width, *height, *color),
        PaintCommand::StrokeRect {
            x,
            y,
            width,
            height,
            thickness,
            color,
        } => {
            let t = (*thickness).max(1);
            fill_rect(img, *x, *y, *width, t, *color);
            fill_rect(img, *x, *y + *height as i32 - t as i32, *width, t, *color);
            fill_rect(img, *x, *y, t, *height, *color);
            fill_rect(img, *x + *width as i32 - t as i32, *y, t, *height, *color);
        }
        PaintCommand::Text {
            x,
            y,
            text,
            scale,
            color,
        } => draw_text(img, *x, *y, text, *scale, *color),
    }
}

fn fill_rect(img: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32, color: Rgba<u8>) {
    let x0 = x.max(0) as i64;
    let y0 = y.max(0) as i64;
    let x1 = (x as i64 + width as i64).min(img.width() as i64);
    let y1 = (y as i64 + height as i64).min(img.height() as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            img.put_pixel(px as u32, py as u32, color);
        }
    }
}

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn draw_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, scale: u32, color: Rgba<u8>) {
    let s = scale.max(1) as i32;
    let cell = GLYPH_SIZE as i32 * s;
    let mut cursor_x = x;
    let mut cursor_y = y;
    for ch in text.chars() {
        if ch == '\n' {
            cursor_x = x;
            cursor_y += cell;
            continue;
        }
        for (row_idx, row) in glyph(ch).iter().enumerate() {
            for col in 0..8 {
                if (row >> col) & 1 == 0 {
                    continue;
                }
                let px = cursor_x + col * s;
                let py = cursor_y + row_idx as i32 * s;
                fill_rect(img, px, py, s as u32, s as u32, color);
            }
        }
        cursor_x += cell;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn fill_rect_clips_to_canvas() {
        let img = paint(
            10,
            10,
            WHITE,
            &[PaintCommand::FillRect {
                x: -5,
                y: 8,
                width: 100,
                height: 100,
                color: BLACK,
            }],
        );
        assert_eq!(*img.get_pixel(0, 9), BLACK);
        assert_eq!(*img.get_pixel(9, 9), BLACK);
        assert_eq!(*img.get_pixel(0, 7), WHITE);
    }

    #[test]
    fn stroke_rect_leaves_interior() {
        let img = paint(
            20,
            20,
            WHITE,
            &[PaintCommand::StrokeRect {
                x: 0,
                y: 0,
                width: 20,
                height: 20,
                thickness: 2,
                color: BLACK,
            }],
        );
        assert_eq!(*img.get_pixel(0, 0), BLACK);
        assert_eq!(*img.get_pixel(19, 19), BLACK);
        assert_eq!(*img.get_pixel(10, 10), WHITE);
    }

    #[test]
    fn text_sets_pixels_inside_its_cell() {
        let img = paint(
            32,
            16,
            WHITE,
            &[PaintCommand::Text {
                x: 0,
                y: 0,
                text: "H".into(),
                scale: 2,
                color: BLACK,
            }],
        );
        let inked = img.pixels().filter(|p| **p == BLACK).count();
        assert!(inked > 0);
        // Nothing is drawn right of the 16px glyph cell.
        for y in 0..16 {
            for x in 16..32 {
                assert_eq!(*img.get_pixel(x, y), WHITE);
            }
        }
    }

    #[test]
    fn fit_text_truncates_with_ellipsis() {
        assert_eq!(fit_text("abcdef", 48, 1), "abcdef");
        assert_eq!(fit_text("abcdefgh", 48, 1), "abc...");
        assert_eq!(text_width("abc", 2), 48);
    }
}
