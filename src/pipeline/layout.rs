//! Block layout for markup rasterisation.
//!
//! This is not a CSS engine. The document is reduced to a vertical stack of
//! blocks (headings, paragraphs, list items, preformatted text, quotes, rules
//! and image placeholders) in document order, each word-wrapped to the
//! viewport width using the fixed 8×8 glyph cell. The result is enough to give
//! a faithful visual summary of the content and a meaningful content height
//! for full-extent capture.

use super::paint::{PaintCommand, GLYPH_SIZE};
use image::Rgba;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

/// Page margin on all sides.
pub const PAGE_PADDING: u32 = 16;
/// Vertical gap between consecutive blocks.
const BLOCK_GAP: u32 = 12;
/// Text scale for body copy.
const BODY_SCALE: u32 = 2;

const DEFAULT_IMAGE_WIDTH: u32 = 200;
const DEFAULT_IMAGE_HEIGHT: u32 = 120;

pub const PAGE_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TEXT_COLOR: Rgba<u8> = Rgba([34, 34, 34, 255]);
const HEADING_COLOR: Rgba<u8> = Rgba([17, 17, 17, 255]);
const MUTED_COLOR: Rgba<u8> = Rgba([96, 96, 96, 255]);
const RULE_COLOR: Rgba<u8> = Rgba([210, 210, 210, 255]);
const PRE_BACKGROUND: Rgba<u8> = Rgba([244, 244, 244, 255]);

static BLOCK_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p, li, pre, blockquote, hr, img").unwrap()
});
static BODY_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

/// Tags whose text never reaches the page.
const HIDDEN_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

/// Tags that own their text; a block nested inside one is painted by the
/// outer block.
const TEXT_CONTAINERS: [&str; 10] = [
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "pre", "blockquote",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Preformatted,
    Quote,
    Rule,
    Image { alt: String },
}

#[derive(Debug, Clone)]
pub struct LayoutBlock {
    pub kind: BlockKind,
    pub rect: Rect,
    pub lines: Vec<String>,
    pub scale: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub blocks: Vec<LayoutBlock>,
    /// Bottom edge of the last block plus page padding.
    pub content_height: u32,
}

/// Lay out `document` in a column `page_width` pixels wide.
pub fn layout_document(document: &Html, page_width: u32) -> Layout {
    let content_width = page_width.saturating_sub(PAGE_PADDING * 2).max(GLYPH_SIZE);
    let mut y = PAGE_PADDING;
    let mut blocks = Vec::new();

    for el in document.select(&BLOCK_SEL) {
        if is_hidden(&el) || has_text_container_ancestor(&el) {
            continue;
        }
        if let Some(block) = layout_element(&el, content_width, y) {
            y += block.rect.height + BLOCK_GAP;
            blocks.push(block);
        }
    }

    if blocks.is_empty() {
        // Markup without any recognised block: treat the visible body text
        // as one paragraph.
        let text = document
            .select(&BODY_SEL)
            .next()
            .map(|body| visible_text(&body))
            .unwrap_or_else(|| visible_text(&document.root_element()));
        if !text.is_empty() {
            let block = text_block(BlockKind::Paragraph, &text, BODY_SCALE, 0, content_width, y);
            y += block.rect.height + BLOCK_GAP;
            blocks.push(block);
        }
    }

    let content_height = if blocks.is_empty() {
        PAGE_PADDING * 2
    } else {
        y - BLOCK_GAP + PAGE_PADDING
    };

    Layout {
        blocks,
        content_height,
    }
}

fn layout_element(el: &ElementRef<'_>, content_width: u32, y: u32) -> Option<LayoutBlock> {
    let name = el.value().name();
    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<u8>().unwrap_or(6);
            let scale = match level {
                1 => 4,
                2 => 3,
                _ => 2,
            };
            let text = visible_text(el);
            (!text.is_empty())
                .then(|| text_block(BlockKind::Heading(level), &text, scale, 0, content_width, y))
        }
        "p" => {
            let text = visible_text(el);
            (!text.is_empty())
                .then(|| text_block(BlockKind::Paragraph, &text, BODY_SCALE, 0, content_width, y))
        }
        "li" => {
            let text = visible_text(el);
            if text.is_empty() {
                return None;
            }
            let marker = list_marker(el);
            Some(text_block(
                BlockKind::ListItem,
                &format!("{marker} {text}"),
                BODY_SCALE,
                GLYPH_SIZE * BODY_SCALE * 2,
                content_width,
                y,
            ))
        }
        "blockquote" => {
            let text = visible_text(el);
            (!text.is_empty()).then(|| {
                text_block(
                    BlockKind::Quote,
                    &text,
                    BODY_SCALE,
                    GLYPH_SIZE * BODY_SCALE * 2,
                    content_width,
                    y,
                )
            })
        }
        "pre" => {
            let raw: String = el.text().collect();
            let cols = columns_for(content_width.saturating_sub(16), BODY_SCALE);
            let lines: Vec<String> = raw
                .trim_matches('\n')
                .lines()
                .flat_map(|line| hard_split(&line.replace('\t', "    "), cols))
                .collect();
            if lines.is_empty() {
                return None;
            }
            let height = lines.len() as u32 * line_height(BODY_SCALE) + 16;
            Some(LayoutBlock {
                kind: BlockKind::Preformatted,
                rect: Rect {
                    x: PAGE_PADDING as i32,
                    y: y as i32,
                    width: content_width,
                    height,
                },
                lines,
                scale: BODY_SCALE,
            })
        }
        "hr" => Some(LayoutBlock {
            kind: BlockKind::Rule,
            rect: Rect {
                x: PAGE_PADDING as i32,
                y: y as i32,
                width: content_width,
                height: 2,
            },
            lines: Vec::new(),
            scale: 1,
        }),
        "img" => {
            let dim = |attr: &str, default: u32| {
                el.value()
                    .attr(attr)
                    .and_then(|v| v.trim().trim_end_matches("px").parse::<u32>().ok())
                    .filter(|v| *v > 0)
                    .unwrap_or(default)
            };
            let alt = el.value().attr("alt").unwrap_or("").trim().to_string();
            Some(LayoutBlock {
                kind: BlockKind::Image { alt },
                rect: Rect {
                    x: PAGE_PADDING as i32,
                    y: y as i32,
                    width: dim("width", DEFAULT_IMAGE_WIDTH).min(content_width),
                    height: dim("height", DEFAULT_IMAGE_HEIGHT).min(4000),
                },
                lines: Vec::new(),
                scale: 1,
            })
        }
        _ => None,
    }
}

fn text_block(kind: BlockKind, text: &str, scale: u32, indent: u32, content_width: u32, y: u32) -> LayoutBlock {
    let cols = columns_for(content_width.saturating_sub(indent), scale);
    let lines = wrap_words(text, cols);
    let height = lines.len().max(1) as u32 * line_height(scale);
    LayoutBlock {
        kind,
        rect: Rect {
            x: (PAGE_PADDING + indent) as i32,
            y: y as i32,
            width: content_width.saturating_sub(indent),
            height,
        },
        lines,
        scale,
    }
}

fn line_height(scale: u32) -> u32 {
    GLYPH_SIZE * scale + 2 * scale
}

fn columns_for(width: u32, scale: u32) -> usize {
    ((width / (GLYPH_SIZE * scale.max(1))) as usize).max(1)
}

/// Greedy word wrap to at most `cols` characters per line. Words longer than
/// a line are split.
pub fn wrap_words(text: &str, cols: usize) -> Vec<String> {
    let cols = cols.max(1);
    let mut lines = Vec::new();
    let mut cur = String::new();
    let mut cur_len = 0usize;

    for word in text.split_whitespace() {
        for piece in hard_split(word, cols) {
            let len = piece.chars().count();
            if cur_len > 0 && cur_len + 1 + len > cols {
                lines.push(std::mem::take(&mut cur));
                cur_len = 0;
            }
            if cur_len > 0 {
                cur.push(' ');
                cur_len += 1;
            }
            cur.push_str(&piece);
            cur_len += len;
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

fn hard_split(s: &str, cols: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(cols.max(1)).map(|c| c.iter().collect()).collect()
}

fn list_marker(el: &ElementRef<'_>) -> String {
    let ordered = el
        .parent()
        .and_then(|p| p.value().as_element().map(|e| e.name() == "ol"))
        .unwrap_or(false);
    if !ordered {
        return "*".to_string();
    }
    let index = el
        .prev_siblings()
        .filter(|n| n.value().as_element().is_some_and(|e| e.name() == "li"))
        .count()
        + 1;
    format!("{index}.")
}

fn is_hidden(el: &ElementRef<'_>) -> bool {
    el.ancestors().any(|n| {
        n.value()
            .as_element()
            .is_some_and(|e| HIDDEN_TAGS.contains(&e.name()))
    })
}

fn has_text_container_ancestor(el: &ElementRef<'_>) -> bool {
    el.ancestors().any(|n| {
        n.value()
            .as_element()
            .is_some_and(|e| TEXT_CONTAINERS.contains(&e.name()))
    })
}

/// Whitespace-collapsed text of `el`, skipping script and style content.
fn visible_text(el: &ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_TAGS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

/// Translate a layout into paint commands.
pub fn to_paint_commands(layout: &Layout) -> Vec<PaintCommand> {
    let mut cmds = Vec::new();
    for block in &layout.blocks {
        let r = block.rect;
        match &block.kind {
            BlockKind::Rule => cmds.push(PaintCommand::FillRect {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
                color: RULE_COLOR,
            }),
            BlockKind::Image { alt } => {
                cmds.push(PaintCommand::FillRect {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                    color: PRE_BACKGROUND,
                });
                cmds.push(PaintCommand::StrokeRect {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                    thickness: 1,
                    color: RULE_COLOR,
                });
                let label = if alt.is_empty() { "image".to_string() } else { alt.clone() };
                cmds.push(PaintCommand::Text {
                    x: r.x + 6,
                    y: r.y + 6,
                    text: super::paint::fit_text(&label, r.width.saturating_sub(12), 1),
                    scale: 1,
                    color: MUTED_COLOR,
                });
            }
            BlockKind::Preformatted => {
                cmds.push(PaintCommand::FillRect {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                    color: PRE_BACKGROUND,
                });
                push_lines(&mut cmds, block, r.x + 8, r.y + 8, TEXT_COLOR);
            }
            BlockKind::Quote => {
                cmds.push(PaintCommand::FillRect {
                    x: PAGE_PADDING as i32,
                    y: r.y,
                    width: 4,
                    height: r.height,
                    color: RULE_COLOR,
                });
                push_lines(&mut cmds, block, r.x, r.y, MUTED_COLOR);
            }
            BlockKind::Heading(_) => push_lines(&mut cmds, block, r.x, r.y, HEADING_COLOR),
            BlockKind::Paragraph | BlockKind::ListItem => {
                push_lines(&mut cmds, block, r.x, r.y, TEXT_COLOR)
            }
        }
    }
    cmds
}

fn push_lines(cmds: &mut Vec<PaintCommand>, block: &LayoutBlock, x: i32, y: i32, color: Rgba<u8>) {
    let lh = line_height(block.scale) as i32;
    for (i, line) in block.lines.iter().enumerate() {
        cmds.push(PaintCommand::Text {
            x,
            y: y + i as i32 * lh,
            text: line.clone(),
            scale: block.scale,
            color,
        });
    }
}
