//! Layout painter: composites queued content into generated boxes.
//!
//! Boxes are painted largest-area first so small elements end up on top.
//! Each box consumes the head of its label's content queue, which makes the
//! box → content mapping depend on paint order, not on the order boxes came in.

use std::collections::{HashMap, VecDeque};

use image::{imageops, imageops::FilterType, DynamicImage, Rgb, RgbImage};
use thiserror::Error;
use tracing::debug;

use crate::layout::fit::fit_text;
use crate::layout::font_metrics::Typesetter;
use crate::layout::geometry::{CanvasSize, NormalizedBox, PixelRect};

/// Label ids whose boxes hold images. Every other label holds text.
pub const IMAGE_LABELS: [u32; 2] = [1, 2];

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

pub fn is_image_label(label: u32) -> bool {
    IMAGE_LABELS.contains(&label)
}

#[derive(Debug, Clone)]
pub enum ContentItem {
    Image(DynamicImage),
    Text(String),
}

impl ContentItem {
    fn kind(&self) -> &'static str {
        match self {
            ContentItem::Image(_) => "image",
            ContentItem::Text(_) => "text",
        }
    }
}

/// Per-label FIFO queues of content waiting for a box.
#[derive(Debug, Default)]
pub struct ContentQueues {
    queues: HashMap<u32, VecDeque<ContentItem>>,
}

impl ContentQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: u32, item: ContentItem) {
        self.queues.entry(label).or_default().push_back(item);
    }

    pub fn pop(&mut self, label: u32) -> Option<ContentItem> {
        self.queues.get_mut(&label)?.pop_front()
    }

    #[cfg(test)]
    pub fn remaining(&self, label: u32) -> usize {
        self.queues.get(&label).map_or(0, VecDeque::len)
    }
}

#[derive(Debug, Error)]
pub enum PaintError {
    #[error("layout has {boxes} boxes but {labels} labels")]
    LengthMismatch { boxes: usize, labels: usize },

    #[error("box {index} is not normalized: {bbox:?}")]
    InvalidBox { index: usize, bbox: [f64; 4] },

    #[error("no content left for label {label}")]
    QueueExhausted { label: u32 },

    #[error("label {label} expects {expected} content, queue head is {found}")]
    ContentMismatch {
        label: u32,
        expected: &'static str,
        found: &'static str,
    },
}

/// Indices of `boxes` sorted by area, largest first. Equal areas keep input order.
pub fn paint_order(boxes: &[NormalizedBox]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..boxes.len()).collect();
    indices.sort_by(|&a, &b| {
        boxes[b]
            .area()
            .partial_cmp(&boxes[a].area())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices
}

/// Paints every box onto a white canvas, popping content from `queues`.
///
/// Image boxes get their image resized to the exact pixel box (aspect ratio
/// is not kept). Text boxes get their text auto-fitted and drawn in black
/// from the box's top-left corner.
pub fn paint_layout(
    canvas_size: CanvasSize,
    boxes: &[NormalizedBox],
    labels: &[u32],
    queues: &mut ContentQueues,
    typesetter: &Typesetter,
) -> Result<RgbImage, PaintError> {
    if boxes.len() != labels.len() {
        return Err(PaintError::LengthMismatch {
            boxes: boxes.len(),
            labels: labels.len(),
        });
    }

    if let Some(index) = boxes.iter().position(|b| !b.is_normalized()) {
        return Err(PaintError::InvalidBox {
            index,
            bbox: boxes[index].into(),
        });
    }

    let mut canvas = RgbImage::from_pixel(canvas_size.width, canvas_size.height, BACKGROUND);

    for i in paint_order(boxes) {
        let label = labels[i];
        let rect = boxes[i].to_pixels(canvas_size);
        let item = queues
            .pop(label)
            .ok_or(PaintError::QueueExhausted { label })?;

        match (is_image_label(label), item) {
            (true, ContentItem::Image(image)) => {
                let Some(visible) = rect.clip_to(canvas_size) else {
                    debug!(index = i, label, "Skipping image paste into empty box");
                    continue;
                };
                if let Some(resized) = resize_visible(&image, rect, visible) {
                    imageops::replace(&mut canvas, &resized, visible.left, visible.top);
                }
            }
            (false, ContentItem::Text(text)) => {
                let fitted = fit_text(
                    typesetter,
                    &text,
                    rect.width() as f32,
                    rect.height() as f32,
                );
                debug!(
                    index = i,
                    label,
                    font_size = fitted.font_size,
                    "Fitted text into box"
                );
                typesetter.draw(
                    &mut canvas,
                    rect.left,
                    rect.top,
                    &fitted.text,
                    fitted.font_size,
                    TEXT_COLOR,
                );
            }
            (is_image, item) => {
                return Err(PaintError::ContentMismatch {
                    label,
                    expected: if is_image { "image" } else { "text" },
                    found: item.kind(),
                });
            }
        }
    }

    let unplaced: usize = queues.queues.values().map(VecDeque::len).sum();
    if unplaced > 0 {
        debug!(unplaced, "Content left over after painting");
    }

    Ok(canvas)
}

/// Resizes `image` to fill `rect`, producing only the `visible` part of it.
fn resize_visible(image: &DynamicImage, rect: PixelRect, visible: PixelRect) -> Option<RgbImage> {
    if image.width() == 0 || image.height() == 0 {
        return None;
    }
    let (x, width) = source_span(
        visible.left,
        visible.right,
        rect.left,
        rect.right,
        image.width(),
    );
    let (y, height) = source_span(
        visible.top,
        visible.bottom,
        rect.top,
        rect.bottom,
        image.height(),
    );
    let resized = image.crop_imm(x, y, width, height).resize_exact(
        visible.width() as u32,
        visible.height() as u32,
        FilterType::CatmullRom,
    );
    Some(resized.to_rgb8())
}

/// Source pixels `(offset, len)` that land in `[from, to)` when `size` source
/// pixels are stretched over `[start, end)`.
fn source_span(from: i64, to: i64, start: i64, end: i64, size: u32) -> (u32, u32) {
    let span = end as f64 - start as f64;
    let size_f = size as f64;
    let map = |px: i64| ((px as f64 - start as f64) / span * size_f).clamp(0.0, size_f);
    let lo = (map(from).floor() as u32).min(size - 1);
    let hi = (map(to).ceil() as u32).clamp(lo + 1, size);
    (lo, hi - lo)
}
