//! Constant expression evaluation for generate conditions, genvar
//! assignments and instance-array ranges.
//!
//! Values are `i64`. Literals may be sized (`4'b1010`, `8'hFF`) or plain
//! decimal; `x`/`z` digits evaluate as 0. Identifiers resolve through a
//! [`ConstScope`]: genvars first, then parameters.

use vcov_model::{Design, ExprId, ExprOp, SignalKind};

/// Name lookup for constant evaluation.
pub trait ConstScope {
    /// Current value of a genvar.
    fn genvar(&self, name: &str) -> Option<i64>;

    /// Overridden value of a parameter; `None` falls back to its default.
    fn param(&self, name: &str) -> Option<i64>;
}

/// A scope with no genvars and no overrides.
pub struct EmptyScope;

impl ConstScope for EmptyScope {
    fn genvar(&self, _name: &str) -> Option<i64> {
        None
    }

    fn param(&self, _name: &str) -> Option<i64> {
        None
    }
}

/// Why an expression has no constant value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstError {
    /// A genvar with no value in scope.
    UnknownGenvar(String),
    /// A reference to something that is not a constant.
    NotConstant(String),
    /// An operator that cannot appear in a constant expression.
    UnsupportedOp(ExprOp),
}

/// Parses a Verilog numeric literal from its source text.
///
/// Handles plain decimal (`42`), sized and unsized based literals (`4'b1010`,
/// `'hFF`, `8'sd3`) and underscore separators (`1_000`).
pub fn parse_literal(text: &str) -> Option<i64> {
    let text = text.replace('_', "");

    if let Some(tick_pos) = text.find('\'') {
        let after_tick = &text[tick_pos + 1..];
        let after_sign = after_tick
            .strip_prefix('s')
            .or_else(|| after_tick.strip_prefix('S'))
            .unwrap_or(after_tick);
        let mut chars = after_sign.chars();
        let radix = match chars.next()? {
            'b' | 'B' => 2,
            'o' | 'O' => 8,
            'd' | 'D' => 10,
            'h' | 'H' => 16,
            _ => return None,
        };
        let clean: String = chars
            .map(|c| match c {
                'x' | 'X' | 'z' | 'Z' | '?' => '0',
                other => other,
            })
            .collect();
        return i64::from_str_radix(clean.trim(), radix).ok();
    }

    text.trim().parse::<i64>().ok()
}

/// Declared width of a sized literal; `None` for unsized literals.
pub fn literal_width(text: &str) -> Option<u32> {
    let tick = text.find('\'')?;
    text[..tick].trim().replace('_', "").parse().ok()
}

/// Returns `true` if the literal is declared signed (`8'sd3`) or is a
/// plain decimal.
pub fn literal_is_signed(text: &str) -> bool {
    match text.find('\'') {
        Some(tick) => matches!(text[tick + 1..].chars().next(), Some('s' | 'S')),
        None => true,
    }
}

/// Ceiling of log-base-2, with `$clog2` semantics (`clog2(0) = clog2(1) = 0`).
pub fn clog2(n: i64) -> i64 {
    if n <= 1 {
        return 0;
    }
    let mut result = 0i64;
    let mut val = n - 1;
    while val > 0 {
        result += 1;
        val >>= 1;
    }
    result
}

fn apply_binop(op: ExprOp, lhs: i64, rhs: i64) -> Option<i64> {
    use ExprOp::*;
    let b = |v: bool| i64::from(v);
    Some(match op {
        Add => lhs.wrapping_add(rhs),
        Sub => lhs.wrapping_sub(rhs),
        Mul => lhs.wrapping_mul(rhs),
        Div => lhs.checked_div(rhs)?,
        Mod => lhs.checked_rem(rhs)?,
        Pow => {
            if rhs < 0 {
                0
            } else {
                lhs.wrapping_pow(rhs as u32)
            }
        }
        Lshift | Alshift => lhs.checked_shl(rhs as u32).unwrap_or(0),
        Rshift => ((lhs as u64).checked_shr(rhs as u32).unwrap_or(0)) as i64,
        Arshift => lhs.checked_shr(rhs as u32).unwrap_or(if lhs < 0 { -1 } else { 0 }),
        And => lhs & rhs,
        Or => lhs | rhs,
        Xor => lhs ^ rhs,
        Nand => !(lhs & rhs),
        Nor => !(lhs | rhs),
        Nxor => !(lhs ^ rhs),
        LAnd => b(lhs != 0 && rhs != 0),
        LOr => b(lhs != 0 || rhs != 0),
        Lt => b(lhs < rhs),
        Gt => b(lhs > rhs),
        Le => b(lhs <= rhs),
        Ge => b(lhs >= rhs),
        Eq | Ceq => b(lhs == rhs),
        Ne | Cne => b(lhs != rhs),
        _ => return None,
    })
}

/// Evaluates `expr` to a constant.
pub fn eval(design: &Design, expr: ExprId, scope: &dyn ConstScope) -> Result<i64, ConstError> {
    let node = &design.exprs[expr];
    let operand = |id: Option<ExprId>| -> Result<i64, ConstError> {
        match id {
            Some(id) => eval(design, id, scope),
            None => Err(ConstError::NotConstant(format!(
                "operand of `{:?}` is missing",
                node.op
            ))),
        }
    };
    match node.op {
        ExprOp::Static => {
            let text = node.literal.as_deref().unwrap_or("");
            parse_literal(text)
                .ok_or_else(|| ConstError::NotConstant(format!("malformed literal `{text}`")))
        }
        ExprOp::Sig | ExprOp::Param => eval_reference(design, expr, scope),
        ExprOp::Neg => Ok(operand(node.left)?.wrapping_neg()),
        ExprOp::Not => Ok(!operand(node.left)?),
        ExprOp::LogicNot => Ok(i64::from(operand(node.left)? == 0)),
        ExprOp::UOr => Ok(i64::from(operand(node.left)? != 0)),
        ExprOp::UNor => Ok(i64::from(operand(node.left)? == 0)),
        ExprOp::Cond => {
            let cond = operand(node.left)?;
            let arms = node
                .right
                .map(|id| &design.exprs[id])
                .filter(|arms| arms.op == ExprOp::CondSel)
                .ok_or_else(|| ConstError::NotConstant("malformed conditional".into()))?;
            if cond != 0 {
                eval_opt(design, arms.left, scope)
            } else {
                eval_opt(design, arms.right, scope)
            }
        }
        ExprOp::SysCall => {
            let name = node.name.as_deref().unwrap_or("");
            if name == "$clog2" {
                Ok(clog2(operand(node.left)?))
            } else {
                Err(ConstError::NotConstant(format!(
                    "unsupported system function `{name}`"
                )))
            }
        }
        ExprOp::GenAssign => operand(node.right),
        op if op.binary_symbol().is_some() => {
            let l = operand(node.left)?;
            let r = operand(node.right)?;
            apply_binop(op, l, r).ok_or_else(|| {
                ConstError::NotConstant(format!("division by zero in `{}`", op.binary_symbol().unwrap_or("?")))
            })
        }
        op => Err(ConstError::UnsupportedOp(op)),
    }
}

fn eval_opt(design: &Design, id: Option<ExprId>, scope: &dyn ConstScope) -> Result<i64, ConstError> {
    match id {
        Some(id) => eval(design, id, scope),
        None => Err(ConstError::NotConstant("malformed conditional".into())),
    }
}

fn eval_reference(design: &Design, expr: ExprId, scope: &dyn ConstScope) -> Result<i64, ConstError> {
    let node = &design.exprs[expr];
    let Some(sig) = node.signal else {
        let name = node.name.as_deref().unwrap_or("");
        return scope
            .genvar(name)
            .or_else(|| scope.param(name))
            .ok_or_else(|| ConstError::UnknownGenvar(name.to_string()));
    };
    let signal = &design.signals[sig];
    match signal.kind {
        SignalKind::Genvar => scope
            .genvar(&signal.name)
            .ok_or_else(|| ConstError::UnknownGenvar(signal.name.clone())),
        SignalKind::Parameter => match scope.param(&signal.name) {
            Some(v) => Ok(v),
            None => match signal.value {
                Some(value) => eval(design, value, scope),
                None => Err(ConstError::NotConstant(format!(
                    "parameter `{}` has no value",
                    signal.name
                ))),
            },
        },
        _ => Err(ConstError::NotConstant(format!(
            "`{}` is not a constant",
            signal.name
        ))),
    }
}

/// Returns `true` if the tree under `expr` reads a genvar or parameter.
pub fn depends_on_scope(design: &Design, expr: ExprId) -> bool {
    design.expr_tree(expr).into_iter().any(|id| {
        let node = &design.exprs[id];
        match node.op {
            ExprOp::Sig | ExprOp::Param => node.signal.map_or(true, |s| {
                matches!(
                    design.signals[s].kind,
                    SignalKind::Genvar | SignalKind::Parameter
                )
            }),
            _ => false,
        }
    })
}
