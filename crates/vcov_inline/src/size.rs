//! Widths of expressions, constant or symbolic.
//!
//! A width that depends on a parameter or genvar stays symbolic so that one
//! instrumented module text serves every instance. [`SizeExpr`] folds
//! constant parts as it is built, so widths made only of constants collapse
//! to a single integer.

use crate::codegen::{selects, Renderer};
use vcov_elaborate::const_eval;
use vcov_model::{Design, Dimension, ExprId, ExprOp, SignalId, SignalKind};

/// A width expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SizeExpr {
    /// Known integer.
    Const(i64),
    /// Verilog text evaluated by the simulator, usually a parameter name.
    Ident(String),
    /// Sum.
    Add(Box<SizeExpr>, Box<SizeExpr>),
    /// Difference.
    Sub(Box<SizeExpr>, Box<SizeExpr>),
    /// Product.
    Mul(Box<SizeExpr>, Box<SizeExpr>),
    /// Larger of two widths.
    Max(Box<SizeExpr>, Box<SizeExpr>),
    /// Smaller of two values, such as the lower bound of a range.
    Min(Box<SizeExpr>, Box<SizeExpr>),
    /// `$clog2`.
    Clog2(Box<SizeExpr>),
    /// Absolute value.
    Abs(Box<SizeExpr>),
}

impl SizeExpr {
    /// The value, when it is a known integer.
    pub fn as_const(&self) -> Option<i64> {
        match self {
            SizeExpr::Const(n) => Some(*n),
            _ => None,
        }
    }

    /// `a + b`, folded.
    pub fn add(a: SizeExpr, b: SizeExpr) -> SizeExpr {
        match (a, b) {
            (SizeExpr::Const(x), SizeExpr::Const(y)) => SizeExpr::Const(x + y),
            (x, SizeExpr::Const(0)) | (SizeExpr::Const(0), x) => x,
            (SizeExpr::Add(x, c), SizeExpr::Const(n)) if c.as_const().is_some() => {
                let folded = c.as_const().unwrap_or(0) + n;
                SizeExpr::add(*x, SizeExpr::Const(folded))
            }
            (SizeExpr::Const(n), x) => SizeExpr::add(x, SizeExpr::Const(n)),
            (x, y) => SizeExpr::Add(Box::new(x), Box::new(y)),
        }
    }

    /// `a - b`, folded.
    pub fn sub(a: SizeExpr, b: SizeExpr) -> SizeExpr {
        match (a, b) {
            (SizeExpr::Const(x), SizeExpr::Const(y)) => SizeExpr::Const(x - y),
            (x, SizeExpr::Const(0)) => x,
            (SizeExpr::Add(x, c), SizeExpr::Const(n)) if c.as_const().is_some() => {
                let folded = c.as_const().unwrap_or(0) - n;
                SizeExpr::add(*x, SizeExpr::Const(folded))
            }
            (x, y) if x == y => SizeExpr::Const(0),
            (x, y) => SizeExpr::Sub(Box::new(x), Box::new(y)),
        }
    }

    /// `a * b`, folded.
    pub fn mul(a: SizeExpr, b: SizeExpr) -> SizeExpr {
        match (a, b) {
            (SizeExpr::Const(x), SizeExpr::Const(y)) => SizeExpr::Const(x * y),
            (x, SizeExpr::Const(1)) | (SizeExpr::Const(1), x) => x,
            (_, SizeExpr::Const(0)) | (SizeExpr::Const(0), _) => SizeExpr::Const(0),
            (x, y) => SizeExpr::Mul(Box::new(x), Box::new(y)),
        }
    }

    /// The larger of `a` and `b`, folded.
    pub fn max(a: SizeExpr, b: SizeExpr) -> SizeExpr {
        match (a, b) {
            (SizeExpr::Const(x), SizeExpr::Const(y)) => SizeExpr::Const(x.max(y)),
            (x, y) if x == y => x,
            (x, y) => SizeExpr::Max(Box::new(x), Box::new(y)),
        }
    }

    /// The smaller of `a` and `b`, folded.
    pub fn min(a: SizeExpr, b: SizeExpr) -> SizeExpr {
        match (a, b) {
            (SizeExpr::Const(x), SizeExpr::Const(y)) => SizeExpr::Const(x.min(y)),
            (x, y) if x == y => x,
            (x, y) => SizeExpr::Min(Box::new(x), Box::new(y)),
        }
    }

    /// `$clog2(a)`, folded.
    pub fn clog2(a: SizeExpr) -> SizeExpr {
        match a {
            SizeExpr::Const(n) => SizeExpr::Const(const_eval::clog2(n)),
            x => SizeExpr::Clog2(Box::new(x)),
        }
    }

    /// `|a|`, folded.
    pub fn abs(a: SizeExpr) -> SizeExpr {
        match a {
            SizeExpr::Const(n) => SizeExpr::Const(n.abs()),
            x => SizeExpr::Abs(Box::new(x)),
        }
    }

    /// Verilog text of the width.
    pub fn render(&self) -> String {
        match self {
            SizeExpr::Const(n) => n.to_string(),
            SizeExpr::Ident(text) => text.clone(),
            SizeExpr::Add(a, b) => format!("({} + {})", a.render(), b.render()),
            SizeExpr::Sub(a, b) => format!("({} - {})", a.render(), b.render()),
            SizeExpr::Mul(a, b) => format!("({} * {})", a.render(), b.render()),
            SizeExpr::Max(a, b) => {
                let (a, b) = (a.render(), b.render());
                format!("(({a} > {b}) ? {a} : {b})")
            }
            SizeExpr::Min(a, b) => {
                let (a, b) = (a.render(), b.render());
                format!("(({a} < {b}) ? {a} : {b})")
            }
            SizeExpr::Clog2(a) => format!("$clog2({})", a.render()),
            SizeExpr::Abs(a) => {
                let a = a.render();
                format!("(({a} < 0) ? -{a} : {a})")
            }
        }
    }

    /// Evaluates the width with `env` supplying identifier values.
    pub fn eval(&self, env: &dyn Fn(&str) -> Option<i64>) -> Option<i64> {
        Some(match self {
            SizeExpr::Const(n) => *n,
            SizeExpr::Ident(name) => env(name)?,
            SizeExpr::Add(a, b) => a.eval(env)? + b.eval(env)?,
            SizeExpr::Sub(a, b) => a.eval(env)? - b.eval(env)?,
            SizeExpr::Mul(a, b) => a.eval(env)? * b.eval(env)?,
            SizeExpr::Max(a, b) => a.eval(env)?.max(b.eval(env)?),
            SizeExpr::Min(a, b) => a.eval(env)?.min(b.eval(env)?),
            SizeExpr::Clog2(a) => const_eval::clog2(a.eval(env)?),
            SizeExpr::Abs(a) => a.eval(env)?.abs(),
        })
    }
}

/// Converts a constant expression (a dimension bound, a replication count)
/// into a width expression. Parameters and genvars stay symbolic.
pub fn from_expr(design: &Design, expr: ExprId) -> SizeExpr {
    let node = &design.exprs[expr];
    let operand = |id: Option<ExprId>| id.map_or(SizeExpr::Const(0), |id| from_expr(design, id));
    match node.op {
        ExprOp::Static => node
            .literal
            .as_deref()
            .and_then(const_eval::parse_literal)
            .map_or_else(|| SizeExpr::Ident(node.literal.clone().unwrap_or_default()), SizeExpr::Const),
        ExprOp::Sig | ExprOp::Param => SizeExpr::Ident(crate::codegen::reference_name(design, expr)),
        ExprOp::Add => SizeExpr::add(operand(node.left), operand(node.right)),
        ExprOp::Sub => SizeExpr::sub(operand(node.left), operand(node.right)),
        ExprOp::Mul => SizeExpr::mul(operand(node.left), operand(node.right)),
        ExprOp::SysCall if node.name.as_deref() == Some("$clog2") => SizeExpr::clog2(operand(node.left)),
        _ => SizeExpr::Ident(Renderer::new(design).wrap(expr)),
    }
}

/// `|msb - lsb| + 1`.
pub fn dim_width(design: &Design, dim: &Dimension) -> SizeExpr {
    let span = SizeExpr::sub(from_expr(design, dim.msb), from_expr(design, dim.lsb));
    SizeExpr::add(SizeExpr::abs(span), SizeExpr::Const(1))
}

/// Width of one element: the product of the packed dimensions.
pub fn packed_width(design: &Design, sig: SignalId) -> SizeExpr {
    let signal = &design.signals[sig];
    if signal.packed.is_empty() {
        return SizeExpr::Const(i64::from(signal.implicit_width()));
    }
    signal
        .packed
        .iter()
        .fold(SizeExpr::Const(1), |acc, dim| SizeExpr::mul(acc, dim_width(design, dim)))
}

/// Number of elements of a memory: the product of the unpacked dimensions.
pub fn element_count(design: &Design, sig: SignalId) -> SizeExpr {
    design.signals[sig]
        .unpacked
        .iter()
        .fold(SizeExpr::Const(1), |acc, dim| SizeExpr::mul(acc, dim_width(design, dim)))
}

fn select_width(design: &Design, sel: ExprId) -> SizeExpr {
    let node = &design.exprs[sel];
    let operand = |id: Option<ExprId>| id.map_or(SizeExpr::Const(0), |id| from_expr(design, id));
    match node.op {
        ExprOp::MbitSel => SizeExpr::add(
            SizeExpr::abs(SizeExpr::sub(operand(node.left), operand(node.right))),
            SizeExpr::Const(1),
        ),
        ExprOp::MbitPos | ExprOp::MbitNeg => operand(node.right),
        _ => SizeExpr::Const(1),
    }
}

fn reference_width(design: &Design, expr: ExprId) -> SizeExpr {
    let Some(sig) = design.exprs[expr].signal else {
        return SizeExpr::Const(1);
    };
    let sels = selects(design, expr);
    let unpacked = design.signals[sig].unpacked.len();
    if sels.is_empty() {
        return packed_width(design, sig);
    }
    if unpacked == 0 {
        return select_width(design, sels[0]);
    }
    match sels.get(unpacked) {
        Some(bits) => select_width(design, *bits),
        None => packed_width(design, sig),
    }
}

/// Width of the value of `expr`.
pub fn expr_width(design: &Design, expr: ExprId) -> SizeExpr {
    let node = &design.exprs[expr];
    let width = |id: Option<ExprId>| id.map_or(SizeExpr::Const(0), |id| expr_width(design, id));
    match node.op {
        ExprOp::Static => SizeExpr::Const(
            node.literal
                .as_deref()
                .and_then(const_eval::literal_width)
                .map_or(32, i64::from),
        ),
        ExprOp::Sig | ExprOp::Param => match node.signal {
            Some(sig) => packed_width(design, sig),
            None => SizeExpr::Const(32),
        },
        ExprOp::SbitSel | ExprOp::MbitSel | ExprOp::MbitPos | ExprOp::MbitNeg | ExprOp::Dim => {
            reference_width(design, expr)
        }
        ExprOp::Concat => width(node.left),
        ExprOp::List => SizeExpr::add(width(node.left), width(node.right)),
        ExprOp::Expand => {
            let count = node.left.map_or(SizeExpr::Const(1), |c| from_expr(design, c));
            SizeExpr::mul(count, width(node.right))
        }
        ExprOp::Not | ExprOp::Neg => width(node.left),
        ExprOp::Cond => {
            let arms = node.right.map(|r| &design.exprs[r]);
            match arms {
                Some(arms) => SizeExpr::max(width(arms.left), width(arms.right)),
                None => SizeExpr::Const(1),
            }
        }
        ExprOp::CondSel => SizeExpr::max(width(node.left), width(node.right)),
        ExprOp::Add
        | ExprOp::Sub
        | ExprOp::Mul
        | ExprOp::Div
        | ExprOp::Mod
        | ExprOp::And
        | ExprOp::Or
        | ExprOp::Xor
        | ExprOp::Nand
        | ExprOp::Nor
        | ExprOp::Nxor => SizeExpr::max(width(node.left), width(node.right)),
        ExprOp::Pow | ExprOp::Lshift | ExprOp::Rshift | ExprOp::Alshift | ExprOp::Arshift => {
            width(node.left)
        }
        ExprOp::FuncCall => node
            .funit
            .and_then(|f| design.funits[f].return_signal)
            .map_or(SizeExpr::Const(1), |sig| packed_width(design, sig)),
        ExprOp::SysCall => SizeExpr::Const(32),
        op if op.is_one_bit() => SizeExpr::Const(1),
        _ => SizeExpr::Const(1),
    }
}

/// Returns `true` if `expr` is a signed value.
pub fn is_signed(design: &Design, expr: ExprId) -> bool {
    let node = &design.exprs[expr];
    match node.op {
        ExprOp::Static => node.literal.as_deref().is_some_and(const_eval::literal_is_signed),
        ExprOp::Sig | ExprOp::Param => node.signal.is_some_and(|s| {
            let signal = &design.signals[s];
            signal.signed || (signal.kind == SignalKind::Genvar)
        }),
        ExprOp::Neg => node.left.is_some_and(|l| is_signed(design, l)),
        op if op.binary_symbol().is_some() && !op.is_one_bit() => {
            node.left.is_some_and(|l| is_signed(design, l)) && node.right.is_some_and(|r| is_signed(design, r))
        }
        _ => false,
    }
}
