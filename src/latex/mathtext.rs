//! Simplified math renderer: `$…$` mathtext → box layout → pixels.
//!
//! Supports the subset a problem-set model actually emits: groups,
//! sub/superscripts, `\frac`/`\binom`, `\sqrt[n]{…}`, font switches
//! (`\mathrm`, `\mathbf`, …), accents, Greek letters, the common operators
//! and relations, and function names such as `\sin` or `\lim`.
//!
//! Anything outside the subset is rejected with a [`MathError`] instead of
//! being drawn wrong. Sizing directives (`\left`, `\big`…), `\text{…}` and
//! named spacing commands are deliberately absent; the sanitiser in
//! [`super::sanitize`] removes or rewrites them first.
//!
//! Layout coordinates are pixels relative to the box origin: `x` grows to
//! the right from the left edge, `y` grows downwards from the baseline.

use super::glyphs::{self, ASCENT_ROWS, CELL, DESCENT_ROWS};
use crate::error::MathError;
use image::{GrayImage, Luma};

const INK: Luma<u8> = Luma([0]);

/// Maximum nesting of groups and command arguments in one equation.
pub const MAX_DEPTH: usize = 64;

/// A parsed and laid-out equation, ready to be drawn.
#[derive(Debug, Clone)]
pub struct Equation {
    layout: Layout,
}

impl Equation {
    /// Parse `$…$`-wrapped mathtext and lay it out at `scale` pixels per font unit.
    pub fn parse(text: &str, scale: u32) -> Result<Self, MathError> {
        let node = parse_math_text(text)?;
        let layout = layout(&node, 0, scale.max(1));
        if layout.ops.is_empty() {
            return Err(MathError::Empty);
        }
        Ok(Self { layout })
    }

    pub fn width(&self) -> u32 {
        self.layout.width.max(0) as u32
    }

    /// Pixels above the baseline.
    pub fn ascent(&self) -> u32 {
        self.layout.ascent.max(0) as u32
    }

    /// Pixels below the baseline.
    pub fn descent(&self) -> u32 {
        self.layout.descent.max(0) as u32
    }

    pub fn height(&self) -> u32 {
        self.ascent() + self.descent()
    }

    /// Draw with the box's left edge at `left` and its baseline at `baseline`.
    ///
    /// Pixels outside `img` are clipped.
    pub fn draw(&self, img: &mut GrayImage, left: i64, baseline: i64) {
        for op in &self.layout.ops {
            op.draw(img, left, baseline);
        }
    }
}

// ── Syntax tree ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Symbol(char),
    /// Horizontal space in font units.
    Space(u32),
    List(Vec<Node>),
    Scripts {
        base: Box<Node>,
        sup: Option<Box<Node>>,
        sub: Option<Box<Node>>,
    },
    Fraction {
        num: Box<Node>,
        den: Box<Node>,
        rule: bool,
    },
    Radical {
        index: Option<Box<Node>>,
        body: Box<Node>,
    },
    Accent {
        body: Box<Node>,
        mark: Mark,
    },
    Bold(Box<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mark {
    Bar,
    Glyph(char),
}

impl Node {
    fn text(s: &str) -> Node {
        Node::List(s.chars().map(Node::Symbol).collect())
    }
}

/// Parse mathtext; the input must be wrapped in a single pair of `$`.
fn parse_math_text(text: &str) -> Result<Node, MathError> {
    let trimmed = text.trim();
    if trimmed.len() < 2 || !trimmed.starts_with('$') || !trimmed.ends_with('$') {
        return Err(MathError::NotMathMode);
    }
    let inner = &trimmed[1..trimmed.len() - 1];
    let mut parser = Parser {
        src: inner,
        pos: 0,
        roman: false,
        depth: 0,
    };
    let nodes = parser.parse_list(Close::End)?;
    Ok(Node::List(nodes))
}

#[derive(Debug, Clone, Copy)]
enum Close {
    End,
    Brace(usize),
    Bracket(usize),
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    /// Inside `\mathrm{…}` and friends: spaces are kept.
    roman: bool,
    /// Current `parse_atom` nesting; every recursive path passes through it.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn parse_list(&mut self, close: Close) -> Result<Vec<Node>, MathError> {
        let mut nodes: Vec<Node> = Vec::new();
        loop {
            let Some(c) = self.peek() else {
                return match close {
                    Close::End => Ok(nodes),
                    Close::Brace(open) | Close::Bracket(open) => {
                        Err(MathError::UnbalancedBraces(open))
                    }
                };
            };
            match (c, close) {
                ('}', Close::Brace(_)) | (']', Close::Bracket(_)) => {
                    self.bump();
                    return Ok(nodes);
                }
                ('}', _) => return Err(MathError::UnbalancedBraces(self.pos)),
                ('^' | '_', _) => {
                    self.bump();
                    let what = if c == '^' { "superscript" } else { "subscript" };
                    let arg = self.parse_argument(&c.to_string())?;
                    let base = nodes.pop().unwrap_or(Node::List(Vec::new()));
                    nodes.push(attach_script(base, c == '^', arg, what)?);
                }
                _ => {
                    if let Some(node) = self.parse_atom()? {
                        nodes.push(node);
                    }
                }
            }
        }
    }

    /// One syntactic unit. `None` for ignorable input (math-mode whitespace).
    fn parse_atom(&mut self) -> Result<Option<Node>, MathError> {
        if self.depth >= MAX_DEPTH {
            return Err(MathError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let atom = self.parse_atom_inner();
        self.depth -= 1;
        atom
    }

    fn parse_atom_inner(&mut self) -> Result<Option<Node>, MathError> {
        let offset = self.pos;
        let Some(c) = self.bump() else {
            return Ok(None);
        };
        match c {
            c if c.is_whitespace() => Ok(self.roman.then_some(Node::Space(CELL))),
            '{' => Ok(Some(Node::List(self.parse_list(Close::Brace(offset))?))),
            '\\' => self.parse_command(offset).map(Some),
            '~' => Ok(Some(Node::Space(CELL))),
            '&' | '$' | '#' | '%' => Err(MathError::UnexpectedToken {
                token: c.to_string(),
                offset,
            }),
            c if glyphs::is_drawable(c) && !c.is_control() => Ok(Some(Node::Symbol(c))),
            c => Err(MathError::UnexpectedToken {
                token: c.to_string(),
                offset,
            }),
        }
    }

    /// Operand of `^`, `_` or a command: a group, a command, or one symbol.
    fn parse_argument(&mut self, owner: &str) -> Result<Node, MathError> {
        self.skip_whitespace();
        match self.peek() {
            None | Some('}') | Some('^') | Some('_') => {
                Err(MathError::MissingArgument(owner.to_string()))
            }
            Some(_) => match self.parse_atom()? {
                Some(node) => Ok(node),
                None => Err(MathError::MissingArgument(owner.to_string())),
            },
        }
    }

    fn parse_roman_argument(&mut self, owner: &str) -> Result<Node, MathError> {
        let outer = self.roman;
        self.roman = true;
        let arg = self.parse_argument(owner);
        self.roman = outer;
        arg
    }

    fn parse_command(&mut self, offset: usize) -> Result<Node, MathError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if self.pos == start {
            return self.parse_escape(offset);
        }
        let name = &self.src[start..self.pos];

        match name {
            "frac" | "dfrac" | "tfrac" | "cfrac" => {
                let num = self.parse_argument(name)?;
                let den = self.parse_argument(name)?;
                Ok(Node::Fraction {
                    num: Box::new(num),
                    den: Box::new(den),
                    rule: true,
                })
            }
            "binom" | "dbinom" | "tbinom" => {
                let num = self.parse_argument(name)?;
                let den = self.parse_argument(name)?;
                Ok(Node::List(vec![
                    Node::Symbol('('),
                    Node::Fraction {
                        num: Box::new(num),
                        den: Box::new(den),
                        rule: false,
                    },
                    Node::Symbol(')'),
                ]))
            }
            "sqrt" => {
                self.skip_whitespace();
                let index = if self.peek() == Some('[') {
                    let open = self.pos;
                    self.bump();
                    Some(Box::new(Node::List(self.parse_list(Close::Bracket(open))?)))
                } else {
                    None
                };
                let body = self.parse_argument(name)?;
                Ok(Node::Radical {
                    index,
                    body: Box::new(body),
                })
            }
            "mathrm" | "mathsf" | "mathtt" | "operatorname" => self.parse_roman_argument(name),
            "mathit" | "mathcal" | "mathbb" | "mathfrak" | "mathscr" => {
                self.parse_argument(name)
            }
            "mathbf" | "boldsymbol" | "bm" => {
                Ok(Node::Bold(Box::new(self.parse_argument(name)?)))
            }
            "overline" | "bar" => self.parse_accent(name, Mark::Bar),
            "hat" | "widehat" => self.parse_accent(name, Mark::Glyph('^')),
            "vec" | "overrightarrow" => self.parse_accent(name, Mark::Glyph('→')),
            "tilde" | "widetilde" => self.parse_accent(name, Mark::Glyph('~')),
            "dot" => self.parse_accent(name, Mark::Glyph('·')),
            _ => {
                if FUNCTIONS.contains(&name) {
                    Ok(Node::text(name))
                } else if let Some(node) = symbol(name) {
                    Ok(node)
                } else {
                    Err(MathError::UnknownCommand(name.to_string()))
                }
            }
        }
    }

    fn parse_accent(&mut self, name: &str, mark: Mark) -> Result<Node, MathError> {
        let body = self.parse_argument(name)?;
        Ok(Node::Accent {
            body: Box::new(body),
            mark,
        })
    }

    /// `\` followed by a non-letter.
    fn parse_escape(&mut self, offset: usize) -> Result<Node, MathError> {
        let Some(c) = self.bump() else {
            return Err(MathError::UnexpectedToken {
                token: "\\".to_string(),
                offset,
            });
        };
        match c {
            '{' | '}' | '%' | '$' | '#' | '&' | '_' => Ok(Node::Symbol(c)),
            '|' => Ok(Node::text("||")),
            ' ' => Ok(Node::Space(CELL)),
            '!' => Ok(Node::List(Vec::new())),
            other => Err(MathError::UnknownCommand(other.to_string())),
        }
    }
}

fn attach_script(base: Node, is_sup: bool, arg: Node, what: &'static str) -> Result<Node, MathError> {
    match base {
        Node::Scripts { base, sup, sub } => {
            if (is_sup && sup.is_some()) || (!is_sup && sub.is_some()) {
                return Err(MathError::DoubleScript(what));
            }
            let arg = Some(Box::new(arg));
            Ok(if is_sup {
                Node::Scripts { base, sup: arg, sub }
            } else {
                Node::Scripts { base, sup, sub: arg }
            })
        }
        base => {
            let arg = Some(Box::new(arg));
            let (sup, sub) = if is_sup { (arg, None) } else { (None, arg) };
            Ok(Node::Scripts {
                base: Box::new(base),
                sup,
                sub,
            })
        }
    }
}

const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "arcsin", "arccos", "arctan", "sinh", "cosh",
    "tanh", "log", "ln", "lg", "exp", "lim", "max", "min", "sup", "inf", "det", "gcd", "deg",
    "arg", "dim", "ker", "Pr", "mod", "bmod",
];

fn symbol(name: &str) -> Option<Node> {
    let c = match name {
        "alpha" => 'α',
        "beta" => 'β',
        "gamma" => 'γ',
        "delta" => 'δ',
        "epsilon" | "varepsilon" => 'ε',
        "zeta" => 'ζ',
        "eta" => 'η',
        "theta" | "vartheta" => 'θ',
        "iota" => 'ι',
        "kappa" => 'κ',
        "lambda" => 'λ',
        "mu" => 'μ',
        "nu" => 'ν',
        "xi" => 'ξ',
        "pi" => 'π',
        "rho" => 'ρ',
        "sigma" => 'σ',
        "tau" => 'τ',
        "upsilon" => 'υ',
        "phi" | "varphi" => 'φ',
        "chi" => 'χ',
        "psi" => 'ψ',
        "omega" => 'ω',
        "Gamma" => 'Γ',
        "Delta" | "triangle" => 'Δ',
        "Theta" => 'Θ',
        "Lambda" => 'Λ',
        "Xi" => 'Ξ',
        "Pi" | "prod" => 'Π',
        "Sigma" | "sum" => 'Σ',
        "Upsilon" => 'Υ',
        "Phi" => 'Φ',
        "Psi" => 'Ψ',
        "Omega" => 'Ω',
        "times" => '×',
        "pm" => '±',
        "mp" => '∓',
        "div" => '÷',
        "cdot" => '·',
        "ast" => '*',
        "circ" | "degree" => '°',
        "neg" | "lnot" => '¬',
        "emptyset" | "varnothing" => 'Ø',
        "leq" | "le" => '≤',
        "geq" | "ge" => '≥',
        "neq" | "ne" => '≠',
        "approx" => '≈',
        "equiv" => '≡',
        "sim" => '~',
        "in" => '∈',
        "to" | "rightarrow" => '→',
        "leftarrow" | "gets" => '←',
        "Rightarrow" | "implies" => '⇒',
        "int" | "oint" => '∫',
        "partial" => '∂',
        "nabla" => '∇',
        "infty" => '∞',
        "prime" => '\'',
        "langle" => '<',
        "rangle" => '>',
        "lfloor" | "lceil" => '[',
        "rfloor" | "rceil" => ']',
        "vert" | "mid" => '|',
        "lbrace" => '{',
        "rbrace" => '}',
        "ldots" | "dots" => return Some(Node::text("...")),
        "cdots" => return Some(Node::text("···")),
        "Vert" | "parallel" => return Some(Node::text("||")),
        _ => return None,
    };
    Some(Node::Symbol(c))
}

// ── Layout ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct Layout {
    width: i64,
    ascent: i64,
    descent: i64,
    ops: Vec<DrawOp>,
}

#[derive(Debug, Clone)]
enum DrawOp {
    Glyph {
        x: i64,
        y: i64,
        bitmap: [u8; 8],
        scale: u32,
        bold: bool,
    },
    Rule {
        x: i64,
        y: i64,
        w: i64,
        h: i64,
    },
    Line {
        x0: i64,
        y0: i64,
        x1: i64,
        y1: i64,
        thickness: i64,
    },
}

impl DrawOp {
    fn shifted(self, dx: i64, dy: i64) -> Self {
        match self {
            DrawOp::Glyph {
                x,
                y,
                bitmap,
                scale,
                bold,
            } => DrawOp::Glyph {
                x: x + dx,
                y: y + dy,
                bitmap,
                scale,
                bold,
            },
            DrawOp::Rule { x, y, w, h } => DrawOp::Rule {
                x: x + dx,
                y: y + dy,
                w,
                h,
            },
            DrawOp::Line {
                x0,
                y0,
                x1,
                y1,
                thickness,
            } => DrawOp::Line {
                x0: x0 + dx,
                y0: y0 + dy,
                x1: x1 + dx,
                y1: y1 + dy,
                thickness,
            },
        }
    }

    fn emboldened(self) -> Self {
        match self {
            DrawOp::Glyph {
                x,
                y,
                bitmap,
                scale,
                ..
            } => DrawOp::Glyph {
                x,
                y,
                bitmap,
                scale,
                bold: true,
            },
            other => other,
        }
    }

    fn draw(&self, img: &mut GrayImage, left: i64, baseline: i64) {
        match *self {
            DrawOp::Glyph {
                x,
                y,
                bitmap,
                scale,
                bold,
            } => {
                let s = scale as i64;
                for (row, &bits) in bitmap.iter().enumerate() {
                    for col in 0..8u32 {
                        if bits & (1u8 << col) == 0 {
                            continue;
                        }
                        let px = left + x + col as i64 * s;
                        let py = baseline + y + row as i64 * s;
                        fill_rect(img, px, py, s, s);
                        if bold {
                            fill_rect(img, px + 1, py, s, s);
                        }
                    }
                }
            }
            DrawOp::Rule { x, y, w, h } => fill_rect(img, left + x, baseline + y, w, h),
            DrawOp::Line {
                x0,
                y0,
                x1,
                y1,
                thickness,
            } => {
                let (dx, dy) = (x1 - x0, y1 - y0);
                let steps = dx.abs().max(dy.abs()).max(1);
                for i in 0..=steps {
                    let px = x0 + dx * i / steps;
                    let py = y0 + dy * i / steps;
                    fill_rect(
                        img,
                        left + px - thickness / 2,
                        baseline + py - thickness / 2,
                        thickness,
                        thickness,
                    );
                }
            }
        }
    }
}

fn fill_rect(img: &mut GrayImage, x: i64, y: i64, w: i64, h: i64) {
    let (iw, ih) = (img.width() as i64, img.height() as i64);
    let (x0, y0) = (x.max(0), y.max(0));
    let (x1, y1) = ((x + w).min(iw), (y + h).min(ih));
    for py in y0..y1 {
        for px in x0..x1 {
            img.put_pixel(px as u32, py as u32, INK);
        }
    }
}

impl Layout {
    fn append(&mut self, other: Layout, dx: i64, dy: i64) {
        self.ops
            .extend(other.ops.into_iter().map(|op| op.shifted(dx, dy)));
    }
}

/// Pixels per font unit at a nesting level: scripts and fraction parts shrink.
fn level_scale(level: u32, base: u32) -> i64 {
    let s = match level {
        0 => base,
        1 => base * 3 / 4,
        _ => base / 2,
    };
    s.max(1) as i64
}

fn layout(node: &Node, level: u32, base: u32) -> Layout {
    let s = level_scale(level, base);
    match node {
        Node::Symbol(c) => match glyphs::glyph(*c) {
            Some(bitmap) => Layout {
                width: CELL as i64 * s,
                ascent: ASCENT_ROWS as i64 * s,
                descent: DESCENT_ROWS as i64 * s,
                ops: vec![DrawOp::Glyph {
                    x: 0,
                    y: -(ASCENT_ROWS as i64) * s,
                    bitmap,
                    scale: s as u32,
                    bold: false,
                }],
            },
            None => Layout::default(),
        },
        Node::Space(units) => Layout {
            width: *units as i64 * s,
            ..Layout::default()
        },
        Node::List(children) => {
            let mut out = Layout::default();
            for child in children {
                let l = layout(child, level, base);
                let x = out.width;
                out.width += l.width;
                out.ascent = out.ascent.max(l.ascent);
                out.descent = out.descent.max(l.descent);
                out.append(l, x, 0);
            }
            out
        }
        Node::Bold(body) => {
            let mut l = layout(body, level, base);
            l.ops = l.ops.into_iter().map(DrawOp::emboldened).collect();
            l
        }
        Node::Scripts { base: b, sup, sub } => {
            let base_l = layout(b, level, base);
            let x = base_l.width;
            let base_ascent = base_l.ascent.max(ASCENT_ROWS as i64 * s);
            let mut out = Layout {
                width: base_l.width,
                ascent: base_l.ascent,
                descent: base_l.descent,
                ops: Vec::new(),
            };
            out.append(base_l, 0, 0);
            let mut script_width = 0;
            if let Some(sup) = sup {
                let l = layout(sup, level + 1, base);
                let shift = base_ascent - l.ascent / 2;
                script_width = script_width.max(l.width);
                out.ascent = out.ascent.max(shift + l.ascent);
                out.descent = out.descent.max(l.descent - shift);
                out.append(l, x, -shift);
            }
            if let Some(sub) = sub {
                let l = layout(sub, level + 1, base);
                let shift = s + l.ascent / 2;
                script_width = script_width.max(l.width);
                out.ascent = out.ascent.max(l.ascent - shift);
                out.descent = out.descent.max(shift + l.descent);
                out.append(l, x, shift);
            }
            out.width += script_width;
            out
        }
        Node::Fraction { num, den, rule } => {
            let inner = level.max(1);
            let num_l = layout(num, inner, base);
            let den_l = layout(den, inner, base);
            let thickness = (s / 2).max(1);
            let gap = s;
            let axis = ASCENT_ROWS as i64 * s / 2;
            let width = num_l.width.max(den_l.width) + 2 * s;
            let rule_y = -axis - thickness / 2;
            let num_baseline = rule_y - gap - num_l.descent;
            let den_baseline = rule_y + thickness + gap + den_l.ascent;
            let mut out = Layout {
                width,
                ascent: num_l.ascent - num_baseline,
                descent: den_baseline + den_l.descent,
                ops: Vec::new(),
            };
            if *rule {
                out.ops.push(DrawOp::Rule {
                    x: s / 2,
                    y: rule_y,
                    w: width - s,
                    h: thickness,
                });
            }
            let num_x = (width - num_l.width) / 2;
            let den_x = (width - den_l.width) / 2;
            out.append(num_l, num_x, num_baseline);
            out.append(den_l, den_x, den_baseline);
            out
        }
        Node::Radical { index, body } => {
            let body_l = layout(body, level, base);
            let thickness = (s / 2).max(1);
            let gap = s;
            let top = -(body_l.ascent.max(ASCENT_ROWS as i64 * s) + gap + thickness);
            let bottom = body_l.descent;
            let index_l = index.as_ref().map(|i| layout(i, level + 2, base));
            let lead = index_l
                .as_ref()
                .map(|l| (l.width - 2 * s).max(0))
                .unwrap_or(0);
            let sign_w = 3 * s;
            let body_x = lead + sign_w + s / 2;
            let width = body_x + body_l.width + s;
            let mut out = Layout {
                width,
                ascent: -top,
                descent: bottom,
                ops: vec![
                    DrawOp::Line {
                        x0: lead,
                        y0: -2 * s,
                        x1: lead + 3 * s / 2,
                        y1: bottom,
                        thickness,
                    },
                    DrawOp::Line {
                        x0: lead + 3 * s / 2,
                        y0: bottom,
                        x1: lead + sign_w,
                        y1: top,
                        thickness,
                    },
                    DrawOp::Rule {
                        x: lead + sign_w,
                        y: top - thickness / 2,
                        w: width - lead - sign_w,
                        h: thickness,
                    },
                ],
            };
            if let Some(l) = index_l {
                let baseline = -2 * s - s / 2 - l.descent;
                out.ascent = out.ascent.max(l.ascent - baseline);
                out.append(l, 0, baseline);
            }
            out.append(body_l, body_x, 0);
            out
        }
        Node::Accent { body, mark } => {
            let body_l = layout(body, level, base);
            let body_top = body_l.ascent.max(ASCENT_ROWS as i64 * s);
            let mut out = Layout {
                width: body_l.width,
                ascent: body_l.ascent,
                descent: body_l.descent,
                ops: Vec::new(),
            };
            match mark {
                Mark::Bar => {
                    let thickness = (s / 2).max(1);
                    let y = -(body_top + s);
                    out.ascent = out.ascent.max(-y);
                    out.ops.push(DrawOp::Rule {
                        x: 0,
                        y,
                        w: body_l.width,
                        h: thickness,
                    });
                }
                Mark::Glyph(c) => {
                    let l = layout(&Node::Symbol(*c), level + 1, base);
                    let baseline = -body_top - l.descent;
                    let x = (body_l.width - l.width) / 2;
                    out.ascent = out.ascent.max(l.ascent - baseline);
                    out.append(l, x, baseline);
                }
            }
            out.append(body_l, 0, 0);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ink_count(eq: &Equation) -> usize {
        let w = eq.width() + 8;
        let h = eq.height() + 8;
        let mut img = GrayImage::from_pixel(w, h, Luma([255]));
        eq.draw(&mut img, 4, 4 + eq.ascent() as i64);
        img.pixels().filter(|p| p.0[0] < 255).count()
    }

    #[test]
    fn requires_math_mode() {
        assert_eq!(Equation::parse("x+1", 4).unwrap_err(), MathError::NotMathMode);
        assert_eq!(Equation::parse("$", 4).unwrap_err(), MathError::NotMathMode);
    }

    #[test]
    fn empty_expression_is_rejected() {
        assert_eq!(Equation::parse("$$", 4).unwrap_err(), MathError::Empty);
        assert_eq!(Equation::parse("${ }$", 4).unwrap_err(), MathError::Empty);
    }

    #[test]
    fn simple_expression_has_glyph_metrics() {
        let eq = Equation::parse("$x+1$", 4).unwrap();
        assert_eq!(eq.width(), 3 * 8 * 4);
        assert_eq!(eq.ascent(), 7 * 4);
        assert_eq!(eq.descent(), 4);
        assert!(ink_count(&eq) > 0);
    }

    #[test]
    fn math_mode_ignores_spaces_but_roman_keeps_them() {
        let tight = Equation::parse("$a b$", 4).unwrap();
        assert_eq!(tight.width(), 2 * 32);
        let roman = Equation::parse(r"$\mathrm{a b}$", 4).unwrap();
        assert_eq!(roman.width(), 3 * 32);
    }

    #[test]
    fn superscript_raises_ascent() {
        let plain = Equation::parse("$x$", 4).unwrap();
        let squared = Equation::parse("$x^2$", 4).unwrap();
        assert!(squared.ascent() > plain.ascent());
        assert!(squared.width() > plain.width());
    }

    #[test]
    fn fraction_stacks_vertically() {
        let eq = Equation::parse(r"$\frac{a+b}{2}$", 4).unwrap();
        assert!(eq.height() > 2 * 8 * 3);
        assert!(ink_count(&eq) > 0);
    }

    #[test]
    fn supported_constructs_parse() {
        for src in [
            r"$\sqrt{b^2-4ac}$",
            r"$\sqrt[3]{x}$",
            r"$x_{1,2} = \frac{-b \pm \sqrt{b^2 - 4ac}}{2a}$",
            r"$\int_0^\infty e^{-x} dx = 1$",
            r"$\sum_{i=1}^{n} i = \frac{n(n+1)}{2}$",
            r"$\lim_{x \to 0} \frac{\sin x}{x} = 1$",
            r"$\vec{F} = m\vec{a}$",
            r"$\mathbf{v} \cdot \hat{n} \geq 0$",
            r"$\binom{n}{k}$",
            r"$\mathrm{note: } y=2$",
            r"$\{x \in \mathbb{R} : x \neq 0\}$",
            r"$a_1, a_2, \ldots, a_n$",
        ] {
            assert!(Equation::parse(src, 4).is_ok(), "failed to parse {src}");
        }
    }

    #[test]
    fn unsupported_markup_is_rejected() {
        assert_eq!(
            Equation::parse(r"$\text{hi}$", 4).unwrap_err(),
            MathError::UnknownCommand("text".into())
        );
        assert_eq!(
            Equation::parse(r"$\left( x \right)$", 4).unwrap_err(),
            MathError::UnknownCommand("left".into())
        );
        assert!(matches!(
            Equation::parse(r"$\begin{pmatrix} 1 & 0 \end{pmatrix}$", 4).unwrap_err(),
            MathError::UnknownCommand(_)
        ));
        assert!(matches!(
            Equation::parse("$a & b$", 4).unwrap_err(),
            MathError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn unbalanced_braces_are_rejected() {
        assert_eq!(
            Equation::parse("${x+1$", 4).unwrap_err(),
            MathError::UnbalancedBraces(0)
        );
        assert_eq!(
            Equation::parse("$x}$", 4).unwrap_err(),
            MathError::UnbalancedBraces(1)
        );
    }

    #[test]
    fn scripts_need_operands() {
        assert_eq!(
            Equation::parse("$x^$", 4).unwrap_err(),
            MathError::MissingArgument("^".into())
        );
        assert_eq!(
            Equation::parse(r"$\frac{1}$", 4).unwrap_err(),
            MathError::MissingArgument("frac".into())
        );
    }

    #[test]
    fn double_superscript_is_rejected() {
        assert_eq!(
            Equation::parse("$x^2^3$", 4).unwrap_err(),
            MathError::DoubleScript("superscript")
        );
        assert!(Equation::parse("$x^2_3$", 4).is_ok());
    }

    #[test]
    fn deep_nesting_is_rejected_not_recursed() {
        let braces = format!("${}x{}$", "{".repeat(3_000), "}".repeat(3_000));
        assert_eq!(
            Equation::parse(&braces, 4).unwrap_err(),
            MathError::TooDeep(MAX_DEPTH)
        );

        let fracs = format!("${}x$", r"\frac{1}".repeat(3_000));
        assert_eq!(
            Equation::parse(&fracs, 4).unwrap_err(),
            MathError::TooDeep(MAX_DEPTH)
        );

        let accents = format!("${}x$", r"\hat".repeat(3_000));
        assert_eq!(
            Equation::parse(&accents, 4).unwrap_err(),
            MathError::TooDeep(MAX_DEPTH)
        );
    }

    #[test]
    fn moderate_nesting_still_renders() {
        let depth = MAX_DEPTH / 2 - 1;
        let src = format!("${}x{}$", "{".repeat(depth), "}".repeat(depth));
        assert!(Equation::parse(&src, 4).is_ok());
    }

    #[test]
    fn drawing_clips_at_image_edges() {
        let eq = Equation::parse(r"$\frac{1}{2}$", 4).unwrap();
        let mut img = GrayImage::from_pixel(4, 4, Luma([255]));
        eq.draw(&mut img, -100, -100);
        eq.draw(&mut img, 1000, 1000);
    }
}
