//! Verilog text for expression trees and coverage declarations.

use crate::size::SizeExpr;
use std::collections::HashMap;
use vcov_model::{Design, ExprId, ExprOp};

/// Renders expressions back to Verilog, substituting temporaries.
pub struct Renderer<'d> {
    design: &'d Design,
    temps: HashMap<ExprId, String>,
}

impl<'d> Renderer<'d> {
    /// Creates a renderer with no temporaries.
    pub fn new(design: &'d Design) -> Self {
        Self {
            design,
            temps: HashMap::new(),
        }
    }

    /// Makes every later rendering of `expr` use `name` instead.
    pub fn substitute(&mut self, expr: ExprId, name: String) {
        self.temps.insert(expr, name);
    }

    /// Returns `true` if `expr` renders as a temporary.
    pub fn has_temp(&self, expr: ExprId) -> bool {
        self.temps.contains_key(&expr)
    }

    /// The design being rendered.
    pub fn design(&self) -> &'d Design {
        self.design
    }

    /// Verilog text of the tree rooted at `id`.
    pub fn render(&self, id: ExprId) -> String {
        if let Some(temp) = self.temps.get(&id) {
            return temp.clone();
        }
        let node = &self.design.exprs[id];
        let child = |c: Option<ExprId>| c.map(|c| self.wrap(c)).unwrap_or_default();
        match node.op {
            ExprOp::Static => node.literal.clone().unwrap_or_default(),
            ExprOp::Sig | ExprOp::Param => reference_name(self.design, id),
            ExprOp::SbitSel | ExprOp::MbitSel | ExprOp::MbitPos | ExprOp::MbitNeg | ExprOp::Dim => {
                let mut text = reference_name(self.design, id);
                for sel in selects(self.design, id) {
                    text.push_str(&self.select_suffix(sel));
                }
                text
            }
            ExprOp::Concat => format!("{{{}}}", self.render_list(node.left)),
            ExprOp::Expand => {
                let inner = match node.right {
                    Some(r) if self.design.exprs[r].op == ExprOp::Concat => self.render(r),
                    Some(r) => format!("{{{}}}", self.render(r)),
                    None => String::new(),
                };
                format!("{{{}{}}}", child(node.left), inner)
            }
            ExprOp::List => self.render_list(Some(id)),
            ExprOp::FuncCall => {
                let name = node
                    .funit
                    .map(|f| self.design.funits[f].name.clone())
                    .or_else(|| node.name.clone())
                    .unwrap_or_default();
                format!("{name}({})", self.render_list(node.left))
            }
            ExprOp::SysCall => {
                let name = node.name.clone().unwrap_or_default();
                if node.left.is_some() {
                    format!("{name}({})", self.render_list(node.left))
                } else {
                    name
                }
            }
            ExprOp::Cond => {
                let arms = node.right.map(|r| &self.design.exprs[r]);
                let (a, b) = arms.map_or((None, None), |arms| (arms.left, arms.right));
                format!("{} ? {} : {}", child(node.left), child(a), child(b))
            }
            ExprOp::CondSel => format!("{} : {}", child(node.left), child(node.right)),
            ExprOp::Posedge => format!("posedge {}", child(node.left)),
            ExprOp::Negedge => format!("negedge {}", child(node.left)),
            ExprOp::AEdge => child(node.left),
            ExprOp::Eor => format!("{} or {}", self.render_opt(node.left), self.render_opt(node.right)),
            op => {
                if let Some(symbol) = op.unary_symbol().filter(|_| node.right.is_none()) {
                    format!("{symbol}{}", child(node.left))
                } else if let Some(symbol) = op.binary_symbol() {
                    format!("{} {symbol} {}", child(node.left), child(node.right))
                } else {
                    tracing::debug!(?op, "operator has no expression form");
                    String::new()
                }
            }
        }
    }

    /// Renders `id`, parenthesized unless it is an operand that cannot be split.
    pub fn wrap(&self, id: ExprId) -> String {
        let op = self.design.exprs[id].op;
        if self.temps.contains_key(&id) || is_atomic(op) || op.unary_symbol().is_some() {
            self.render(id)
        } else {
            format!("({})", self.render(id))
        }
    }

    fn render_opt(&self, id: Option<ExprId>) -> String {
        id.map(|id| self.render(id)).unwrap_or_default()
    }

    fn render_list(&self, id: Option<ExprId>) -> String {
        let Some(id) = id else {
            return String::new();
        };
        list_items(self.design, id)
            .into_iter()
            .map(|item| self.render(item))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn select_suffix(&self, sel: ExprId) -> String {
        let node = &self.design.exprs[sel];
        let l = self.render_opt(node.left);
        let r = self.render_opt(node.right);
        match node.op {
            ExprOp::SbitSel => format!("[{l}]"),
            ExprOp::MbitSel => format!("[{l}:{r}]"),
            ExprOp::MbitPos => format!("[{l} +: {r}]"),
            ExprOp::MbitNeg => format!("[{l} -: {r}]"),
            _ => String::new(),
        }
    }
}

fn is_atomic(op: ExprOp) -> bool {
    matches!(
        op,
        ExprOp::Static
            | ExprOp::Sig
            | ExprOp::Param
            | ExprOp::SbitSel
            | ExprOp::MbitSel
            | ExprOp::MbitPos
            | ExprOp::MbitNeg
            | ExprOp::Dim
            | ExprOp::Concat
            | ExprOp::Expand
            | ExprOp::FuncCall
            | ExprOp::SysCall
    )
}

/// Name of the signal a reference or select node refers to.
pub fn reference_name(design: &Design, id: ExprId) -> String {
    let node = &design.exprs[id];
    match node.signal {
        Some(sig) => design.signals[sig].name.clone(),
        None => node.name.clone().unwrap_or_default(),
    }
}

/// Flattens a `List` chain into its items.
pub fn list_items(design: &Design, id: ExprId) -> Vec<ExprId> {
    let mut items = Vec::new();
    let mut stack = vec![id];
    while let Some(id) = stack.pop() {
        let node = &design.exprs[id];
        if node.op == ExprOp::List {
            stack.extend(node.right);
            stack.extend(node.left);
        } else {
            items.push(id);
        }
    }
    items
}

/// The selects of a reference, outermost dimension first. A `Dim` node
/// contributes the selects of both its halves.
pub fn selects(design: &Design, id: ExprId) -> Vec<ExprId> {
    let node = &design.exprs[id];
    match node.op {
        ExprOp::Dim => {
            let mut out = Vec::new();
            for half in node.left.into_iter().chain(node.right) {
                out.extend(selects(design, half));
            }
            out
        }
        op if op.is_select() => vec![id],
        _ => Vec::new(),
    }
}

/// Whether a coverage signal is a variable or a net.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetKind {
    /// Assigned procedurally.
    Reg,
    /// Assigned continuously.
    Wire,
}

/// `reg [W-1:0] name ;` (no range when one bit wide).
pub fn declaration(kind: NetKind, width: &SizeExpr, name: &str) -> String {
    let keyword = match kind {
        NetKind::Reg => "reg",
        NetKind::Wire => "wire",
    };
    format!("{keyword} {}{name};", range(width))
}

/// `[W-1:0] ` for widths other than one, else nothing.
pub fn range(width: &SizeExpr) -> String {
    if width.as_const() == Some(1) {
        String::new()
    } else {
        format!("[{}:0] ", SizeExpr::sub(width.clone(), SizeExpr::Const(1)).render())
    }
}
