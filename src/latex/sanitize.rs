//! Markup sanitising: rewrite a raw math span into the renderer's subset.
//!
//! Models write full LaTeX; the simplified renderer in [`super::mathtext`]
//! understands a much smaller language. Sizing and alignment directives have
//! no counterpart there and would fail the whole equation, so they are
//! removed. `\text{…}` becomes `\mathrm{…}` so words inside math stay
//! readable.
//!
//! ## Rule Order
//!
//! 1. Strip a redundant outer `$$ … $$` pair
//! 2. Remove deny-listed sizing/alignment/style directives
//! 3. Rewrite text-mode font spans to math-mode fonts
//! 4. Replace named spacing commands with a single space
//! 5. Trim
//!
//! The five rules are re-applied until the text stops changing. One pass can
//! expose a new match (stripping `$$ $$x$$ $$` leaves another `$$x$$` pair),
//! and the fixpoint is what makes sanitising idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all sanitising rules to one raw math span.
///
/// Never fails: unknown constructs are left in place and surface later as a
/// per-equation [`crate::error::MathError`].
pub fn sanitize_span(raw: &str) -> String {
    let mut current = sanitize_pass(raw);
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn sanitize_pass(input: &str) -> String {
    let s = strip_outer_delimiters(input);
    let s = remove_denied_directives(&s);
    let s = rewrite_text_spans(&s);
    let s = collapse_spacing_commands(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip a redundant outer `$$` pair ────────────────────────────────

fn strip_outer_delimiters(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.len() >= 4 && trimmed.starts_with("$$") && trimmed.ends_with("$$") {
        trimmed[2..trimmed.len() - 2].trim().to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Remove deny-listed directives ────────────────────────────────────

// `\left.` / `\right.` are invisible delimiters: drop the dot with them.
// Everything else must end at a word boundary so `\leftarrow` and
// `\rightarrow` survive and `\bigg` is never cut down to `g`.
static RE_DENIED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\\(?:left|right)\.|\\(?:[Bb]igg?[lrm]?|left|right|displaystyle|textstyle|scriptscriptstyle|scriptstyle|qquad|quad)\b",
    )
    .unwrap()
});

fn remove_denied_directives(input: &str) -> String {
    RE_DENIED.replace_all(input, "").into_owned()
}

// ── Rule 3: Text-mode fonts → math-mode fonts ────────────────────────────────

// Only the command name changes; the braces (and anything nested in them)
// stay where they are.
static RE_TEXT_ROMAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\text(?:rm)?\{").unwrap());
static RE_TEXT_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\textbf\{").unwrap());
static RE_TEXT_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\textit\{").unwrap());

fn rewrite_text_spans(input: &str) -> String {
    let s = RE_TEXT_ROMAN.replace_all(input, r"\mathrm{");
    let s = RE_TEXT_BOLD.replace_all(&s, r"\mathbf{");
    RE_TEXT_ITALIC.replace_all(&s, r"\mathit{").into_owned()
}

// ── Rule 4: Spacing commands → single space ──────────────────────────────────

static RE_SPACING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(?:thinspace|medspace|thickspace)\b|\\[,:;]").unwrap());

fn collapse_spacing_commands(input: &str) -> String {
    RE_SPACING.replace_all(input, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_becomes_mathrm() {
        assert_eq!(sanitize_span(r"\text{note: } y=2"), r"\mathrm{note: } y=2");
    }

    #[test]
    fn strips_redundant_outer_delimiters() {
        assert_eq!(sanitize_span("  $$ x + 1 $$ "), "x + 1");
    }

    #[test]
    fn removes_sizing_directives() {
        assert_eq!(
            sanitize_span(r"\left( \frac{a}{b} \right)"),
            r"( \frac{a}{b} )"
        );
        assert_eq!(sanitize_span(r"\Bigg( x \Bigg)"), "( x )");
        assert_eq!(sanitize_span(r"\bigg| x \biggr|"), "| x |");
        assert_eq!(sanitize_span(r"\displaystyle\sum x"), r"\sum x");
    }

    #[test]
    fn invisible_delimiters_vanish_entirely() {
        assert_eq!(sanitize_span(r"\left. f \right|_0^1"), r"f |_0^1");
    }

    #[test]
    fn arrows_survive_deny_list() {
        assert_eq!(
            sanitize_span(r"a \rightarrow b \leftarrow c"),
            r"a \rightarrow b \leftarrow c"
        );
    }

    #[test]
    fn spacing_commands_become_spaces() {
        assert_eq!(sanitize_span(r"a\,b\:c\;d"), "a b c d");
        assert_eq!(sanitize_span(r"x \quad y \qquad z"), "x  y  z");
    }

    #[test]
    fn nested_text_spans_are_fully_rewritten() {
        assert_eq!(
            sanitize_span(r"\text{a \textbf{b}}"),
            r"\mathrm{a \mathbf{b}}"
        );
    }

    #[test]
    fn repeated_outer_delimiters_are_all_stripped() {
        assert_eq!(sanitize_span("$$ $$x$$ $$"), "x");
    }

    #[test]
    fn sanitized_output_is_stable() {
        let once = sanitize_span(r"\left[\displaystyle \text{area}\,=\,\pi r^2\right]");
        assert_eq!(once, r"[ \mathrm{area} = \pi r^2]");
        assert_eq!(sanitize_span(&once), once);
    }

    #[test]
    fn unknown_constructs_are_left_alone() {
        assert_eq!(
            sanitize_span(r"\begin{pmatrix} 1 & 0 \end{pmatrix}"),
            r"\begin{pmatrix} 1 & 0 \end{pmatrix}"
        );
    }
}
