//! Equation rendering for chat platforms without math support.
//!
//! Model replies carry display math as `$$ … $$`. Chat clients show that as
//! raw markup, so every reply is scanned and the equations are drawn into a
//! single PNG that is attached next to the text.
//!
//! ## Data Flow
//!
//! ```text
//! reply ──▶ extract ──▶ sanitize ──▶ compose (mathtext per row) ──▶ PNG
//!          ($$ pairs)   (subset)     (skip rows that fail)
//! ```
//!
//! 1. [`extract`]: non-greedy `$$…$$` scan
//! 2. [`sanitize`]: strip sizing directives, `\text` → `\mathrm`, spacing
//! 3. [`compose`]: stack rows, crop, encode; rows the renderer rejects are
//!    skipped, and an image with no rows is discarded
//! 4. [`mathtext`]: the simplified renderer used by `compose`
//!
//! The pipeline is CPU-bound. Async callers should use
//! [`render_response_async`], which runs it on the blocking pool.

pub mod compose;
pub mod extract;
pub mod glyphs;
pub mod mathtext;
pub mod sanitize;

pub use compose::{compose_equations, EquationImage, RowOutcome};
pub use extract::extract_math_spans;
pub use sanitize::sanitize_span;

use crate::config::RenderConfig;
use tracing::{debug, warn};

/// Extract, sanitise and render every `$$…$$` span of `text`.
///
/// `None` when the text has no spans or none of them renders.
pub fn render_response(text: &str, config: &RenderConfig) -> Option<EquationImage> {
    let spans = extract_math_spans(text);
    if spans.is_empty() {
        return None;
    }
    debug!("Found {} math spans", spans.len());
    let sanitized: Vec<String> = spans.iter().map(|s| sanitize_span(s)).collect();
    compose_equations(&sanitized, config)
}

/// [`render_response`] on tokio's blocking pool.
pub async fn render_response_async(text: String, config: RenderConfig) -> Option<EquationImage> {
    match tokio::task::spawn_blocking(move || render_response(&text, &config)).await {
        Ok(image) => image,
        Err(e) => {
            warn!("Equation render task failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sanitized_spans() {
        let text = r"Solve $$x^2+1=0$$ then $$\text{note: } y=2$$";
        let img = render_response(text, &RenderConfig::default()).expect("image");
        assert_eq!(img.rendered_count(), 2);
    }

    #[test]
    fn text_without_math_has_no_image() {
        assert!(render_response("No math here.", &RenderConfig::default()).is_none());
    }

    #[test]
    fn sizing_directives_no_longer_break_rendering() {
        let text = r"$$\left( \frac{1}{2} \right)^2 \quad \Big| x \Big|$$";
        let img = render_response(text, &RenderConfig::default()).expect("image");
        assert_eq!(img.skipped_count(), 0);
    }

    #[tokio::test]
    async fn async_render_matches_sync() {
        let text = "Area: $$\\pi r^2$$".to_string();
        let img = render_response_async(text, RenderConfig::default())
            .await
            .expect("image");
        assert_eq!(img.rendered_count(), 1);
    }
}
