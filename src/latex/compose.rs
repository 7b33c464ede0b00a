//! Multi-equation compositor: stack N equations into one PNG.
//!
//! ## Layout
//!
//! Rows share a slot area `max(min_height_in, N × row_height_in)` tall. Row
//! `i` is centred at `(i + 0.5) / N` of that height from the top, which is
//! the bottom-up position `1 - (i + 0.5) / N`. Row positions depend only on
//! N: a skipped row leaves its slot empty instead of pulling the rows below
//! it up. Rows are centred horizontally on a common axis.
//!
//! A row taller than its slot grows the canvas instead of being clipped:
//! the canvas spans every row's full box. The finished
//! canvas is cropped to the bounding box of its ink and re-padded with
//! `padding_in` on every side.
//!
//! At most [`MAX_ROWS`] spans are laid out; the rest are recorded as
//! skipped.

use super::mathtext::Equation;
use crate::config::RenderConfig;
use crate::error::MathError;
use image::{imageops, DynamicImage, GrayImage, ImageFormat, Luma};
use serde::Serialize;
use std::io::Cursor;
use tracing::{debug, warn};

const PAPER: Luma<u8> = Luma([255]);

/// Spans beyond this count are not drawn.
pub const MAX_ROWS: usize = 128;

/// Result of one equation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RowOutcome {
    /// The row was drawn; size of the equation box in pixels.
    Rendered {
        index: usize,
        width: u32,
        height: u32,
    },
    /// The renderer rejected the row.
    Skipped { index: usize, reason: MathError },
}

impl RowOutcome {
    pub fn index(&self) -> usize {
        match self {
            RowOutcome::Rendered { index, .. } | RowOutcome::Skipped { index, .. } => *index,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, RowOutcome::Rendered { .. })
    }
}

/// A composed equation image.
#[derive(Debug, Clone)]
pub struct EquationImage {
    /// PNG-encoded bytes.
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// One outcome per input span, in input order.
    pub rows: Vec<RowOutcome>,
}

impl EquationImage {
    pub fn rendered_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_rendered()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.rows.len() - self.rendered_count()
    }
}

/// Render sanitised spans into one PNG, one centred row per span.
///
/// Returns `None` when `spans` is empty or no row could be rendered.
/// Per-row failures are logged and recorded in [`EquationImage::rows`].
pub fn compose_equations(spans: &[String], config: &RenderConfig) -> Option<EquationImage> {
    if spans.is_empty() {
        return None;
    }
    if spans.len() > MAX_ROWS {
        warn!(
            "Reply has {} equations; only the first {} are rendered",
            spans.len(),
            MAX_ROWS
        );
    }
    let n = spans.len().min(MAX_ROWS);
    let scale = config.glyph_scale();

    let parsed: Vec<Result<Equation, MathError>> = spans
        .iter()
        .enumerate()
        .map(|(index, span)| {
            if index < n {
                Equation::parse(&format!("${span}$"), scale)
            } else {
                Err(MathError::TooManyRows(MAX_ROWS))
            }
        })
        .collect();

    let rows: Vec<RowOutcome> = parsed
        .iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(eq) => RowOutcome::Rendered {
                index,
                width: eq.width(),
                height: eq.height(),
            },
            Err(reason) => {
                if index < n {
                    warn!(
                        "Skipping equation {} due to error: {} (equation: {})",
                        index + 1,
                        reason,
                        preview(&spans[index])
                    );
                }
                RowOutcome::Skipped {
                    index,
                    reason: reason.clone(),
                }
            }
        })
        .collect();

    if !rows.iter().any(RowOutcome::is_rendered) {
        debug!("No equation out of {} could be rendered", n);
        return None;
    }

    // Row boxes in slot coordinates: y = 0 is the top of the first slot.
    let slots_h = config
        .px(config.min_height_in)
        .max(config.px(n as f32 * config.row_height_in))
        .max(1) as i64;
    let placed: Vec<(&Equation, i64)> = parsed
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.as_ref().ok().map(|eq| (eq, i)))
        .map(|(eq, i)| {
            let center_y = (i as f64 + 0.5) / n as f64 * slots_h as f64;
            (eq, center_y.round() as i64 - eq.height() as i64 / 2)
        })
        .collect();

    let top = placed.iter().map(|&(_, y)| y).min().unwrap_or(0);
    let bottom = placed
        .iter()
        .map(|&(eq, y)| y + eq.height() as i64)
        .max()
        .unwrap_or(0);
    let widest = placed
        .iter()
        .map(|&(eq, _)| eq.width())
        .max()
        .unwrap_or(0);

    // Canvas covers the row boxes only.
    let canvas_w = widest + 2;
    let canvas_h = (bottom - top).max(1) as u32 + 2;
    let mut canvas = GrayImage::from_pixel(canvas_w, canvas_h, PAPER);

    for &(eq, y) in &placed {
        let left = (canvas_w as i64 - eq.width() as i64) / 2;
        eq.draw(&mut canvas, left, y - top + 1 + eq.ascent() as i64);
    }

    let Some(tight) = crop_to_ink(&canvas, config.px(config.padding_in)) else {
        debug!("Rendered rows left no ink on the canvas");
        return None;
    };
    let (width, height) = tight.dimensions();

    let mut png = Vec::new();
    if let Err(e) =
        DynamicImage::ImageLuma8(tight).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
    {
        warn!("Failed to encode equation image: {}", e);
        return None;
    }
    debug!(
        "Composed {} equation rows → {}x{} px, {} bytes",
        n,
        width,
        height,
        png.len()
    );

    Some(EquationImage {
        png,
        width,
        height,
        rows,
    })
}

/// Crop to the bounding box of non-paper pixels and add `pad` on every side.
fn crop_to_ink(img: &GrayImage, pad: u32) -> Option<GrayImage> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in img.enumerate_pixels() {
        if *px == PAPER {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    let (x0, y0, x1, y1) = bounds?;
    let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);
    let ink = imageops::crop_imm(img, x0, y0, w, h).to_image();
    let mut out = GrayImage::from_pixel(w + 2 * pad, h + 2 * pad, PAPER);
    imageops::replace(&mut out, &ink, pad as i64, pad as i64);
    Some(out)
}

fn preview(span: &str) -> String {
    const MAX: usize = 100;
    if span.chars().count() > MAX {
        let head: String = span.chars().take(MAX).collect();
        format!("{head}…")
    } else {
        span.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn decode(img: &EquationImage) -> GrayImage {
        image::load_from_memory_with_format(&img.png, ImageFormat::Png)
            .expect("valid png")
            .to_luma8()
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(compose_equations(&[], &RenderConfig::default()).is_none());
    }

    #[test]
    fn all_unparseable_yields_nothing() {
        let input = spans(&[r"\begin{cases} x \end{cases}", r"\text{raw}", "{"]);
        assert!(compose_equations(&input, &RenderConfig::default()).is_none());
    }

    #[test]
    fn partial_success_still_produces_image() {
        let input = spans(&["x^2+1=0", r"\unknowncommand", r"\frac{a}{b}"]);
        let img = compose_equations(&input, &RenderConfig::default()).expect("image");
        assert_eq!(img.rows.len(), 3);
        assert_eq!(img.rendered_count(), 2);
        assert_eq!(img.skipped_count(), 1);
        assert!(matches!(
            &img.rows[1],
            RowOutcome::Skipped { index: 1, reason: MathError::UnknownCommand(c) } if c == "unknowncommand"
        ));
        assert!(img.png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn image_is_tightly_cropped_with_padding() {
        let config = RenderConfig::default();
        let img = compose_equations(&spans(&["x"]), &config).unwrap();
        let pad = config.px(config.padding_in);
        let eq = Equation::parse("$x$", config.glyph_scale()).unwrap();
        assert!(img.width <= eq.width() + 2 * pad);
        assert!(img.height <= eq.height() + 2 * pad);
        let decoded = decode(&img);
        assert_eq!(decoded.dimensions(), (img.width, img.height));
        // The padding band is blank.
        for x in 0..img.width {
            assert_eq!(*decoded.get_pixel(x, 0), PAPER);
        }
    }

    #[test]
    fn skipped_rows_keep_their_slot() {
        let config = RenderConfig::default();
        let two_rows = compose_equations(&spans(&["1", "2"]), &config).unwrap();
        let with_gap = compose_equations(&spans(&["1", r"\bad", "2"]), &config).unwrap();
        assert_eq!(with_gap.rendered_count(), 2);
        // The skipped middle row still occupies one slot between the others.
        let slot = config.px(config.row_height_in);
        let extra = with_gap.height.abs_diff(two_rows.height + slot);
        assert!(
            extra <= 2,
            "with gap {} vs two rows {} (slot {slot})",
            with_gap.height,
            two_rows.height
        );
    }

    #[test]
    fn tall_rows_are_not_clipped() {
        let config = RenderConfig::default();
        let mut tall = "x".to_string();
        for _ in 0..3 {
            tall = format!(r"\frac{{{tall}}}{{{tall}}}");
        }
        let eq = Equation::parse(&format!("${tall}$"), config.glyph_scale()).unwrap();
        assert!(eq.height() > config.px(config.row_height_in));

        let ink = |img: &EquationImage| decode(img).pixels().filter(|p| p.0[0] < 255).count();
        let alone = |span: &str| compose_equations(&spans(&[span]), &config).unwrap();

        let stacked = compose_equations(&spans(&[&tall, "1", "2"]), &config).unwrap();
        assert_eq!(stacked.rendered_count(), 3);
        assert_eq!(
            ink(&stacked),
            ink(&alone(&tall)) + ink(&alone("1")) + ink(&alone("2"))
        );
        assert!(stacked.height >= alone(&tall).height);
    }

    #[test]
    fn deeply_nested_row_is_skipped() {
        let deep = format!("{}x{}", "{".repeat(3_000), "}".repeat(3_000));
        let img = compose_equations(&spans(&[&deep, "y"]), &RenderConfig::default()).unwrap();
        assert!(matches!(
            img.rows[0],
            RowOutcome::Skipped { index: 0, reason: MathError::TooDeep(_) }
        ));
        assert!(img.rows[1].is_rendered());
    }

    #[test]
    fn spans_beyond_the_row_limit_are_skipped() {
        let input: Vec<String> = (0..MAX_ROWS + 3).map(|i| (i % 10).to_string()).collect();
        let img = compose_equations(&input, &RenderConfig::default()).unwrap();
        assert_eq!(img.rows.len(), MAX_ROWS + 3);
        assert_eq!(img.rendered_count(), MAX_ROWS);
        assert!(img.rows[MAX_ROWS..].iter().all(|r| matches!(
            r,
            RowOutcome::Skipped { reason: MathError::TooManyRows(MAX_ROWS), .. }
        )));
    }

    #[test]
    fn wide_rows_widen_the_canvas() {
        let long = "x+".repeat(60) + "x";
        let img = compose_equations(&spans(&[&long]), &RenderConfig::default()).unwrap();
        let eq = Equation::parse(&format!("${long}$"), 4).unwrap();
        assert!(eq.width() > RenderConfig::default().px(10.0));
        assert!(img.width >= eq.width());
    }
}
