//! Combinational and unary coverage selection.
//!
//! Walks the value-producing subtrees of a statement depth first and picks
//! the nodes worth measuring: two-operand logic operators get a two-bit
//! operand-polarity capture, comparisons, reductions and logical negation a
//! one-bit outcome, and a bare reference used as a condition a one-bit
//! truth value. Constant subtrees are never measured.

use crate::codegen::list_items;
use crate::oracle::CoverageOracle;
use crate::plan::{Measure, Shape};
use crate::names::CoverageKind;
use crate::size::{is_signed, SizeExpr};
use vcov_config::InlineLimits;
use vcov_model::{Design, ExprId, ExprOp, SignalKind, StmtId};

/// Collects combinational measures of one statement.
pub struct CombWalker<'a> {
    design: &'a Design,
    limits: &'a InlineLimits,
    oracle: &'a dyn CoverageOracle,
    found: Vec<Measure>,
}

impl<'a> CombWalker<'a> {
    /// Creates a walker with the configured depth budget.
    pub fn new(design: &'a Design, limits: &'a InlineLimits, oracle: &'a dyn CoverageOracle) -> Self {
        Self {
            design,
            limits,
            oracle,
            found: Vec::new(),
        }
    }

    /// Walks the measurable roots of `stmt` and returns what was found.
    pub fn statement(mut self, stmt: StmtId) -> Vec<Measure> {
        let root = &self.design.exprs[self.design.stmts[stmt].expr];
        match root.op {
            ExprOp::Assign | ExprOp::BAssign | ExprOp::NbAssign => {
                if let Some(rhs) = root.right {
                    self.walk(rhs, 0, false);
                }
            }
            ExprOp::If => {
                if let Some(cond) = root.left {
                    self.walk(cond, 0, true);
                }
            }
            ExprOp::TaskCall => {
                if let Some(args) = root.left {
                    for arg in list_items(self.design, args) {
                        self.walk(arg, 0, false);
                    }
                }
            }
            _ => {}
        }
        self.found
    }

    fn walk(&mut self, id: ExprId, depth: u32, condition: bool) {
        if is_constant(self.design, id) {
            return;
        }
        let node = &self.design.exprs[id];
        if !node.flags().comb_counted {
            if let Some((kind, shape)) = self.shape(id, condition) {
                if self.limits.depth_allows(depth) || self.oracle.is_required(self.design, id) {
                    node.update_flags(|f| f.comb_counted = true);
                    let width = match shape {
                        Shape::Polarity { .. } => SizeExpr::Const(2),
                        _ => SizeExpr::Const(1),
                    };
                    self.found.push(Measure {
                        kind,
                        span: node.span,
                        width,
                        shape,
                    });
                }
            }
        }

        let next = depth + 1;
        match node.op {
            ExprOp::Cond => {
                if let Some(cond) = node.left {
                    self.walk(cond, next, true);
                }
                if let Some(arms) = node.right {
                    let arms = &self.design.exprs[arms];
                    for arm in arms.left.into_iter().chain(arms.right) {
                        self.walk(arm, next, false);
                    }
                }
            }
            ExprOp::List => {
                for item in list_items(self.design, id) {
                    self.walk(item, depth, false);
                }
            }
            ExprOp::Sig | ExprOp::Param | ExprOp::Static => {}
            _ => {
                for child in node.left.into_iter().chain(node.right) {
                    self.walk(child, next, false);
                }
            }
        }
    }

    fn shape(&self, id: ExprId, condition: bool) -> Option<(CoverageKind, Shape)> {
        let node = &self.design.exprs[id];
        let op = node.op;
        if op.is_combinational() {
            let (left, right) = (node.left?, node.right?);
            let signed = is_signed(self.design, left) || is_signed(self.design, right);
            return Some((CoverageKind::Combinational, Shape::Polarity { left, right, signed }));
        }
        if op.is_unary_measurable() {
            let kind = if op.binary_symbol().is_some() && node.right.is_some() {
                CoverageKind::Combinational
            } else {
                CoverageKind::Unary
            };
            return Some((kind, Shape::Truth(id)));
        }
        if condition && op.is_reference() {
            return Some((CoverageKind::Unary, Shape::Truth(id)));
        }
        None
    }
}

/// Returns `true` if every leaf of the tree is a literal, parameter or genvar.
pub fn is_constant(design: &Design, id: ExprId) -> bool {
    design.expr_tree(id).into_iter().all(|e| {
        let node = &design.exprs[e];
        let constant_signal = || {
            node.signal.is_some_and(|s| {
                matches!(design.signals[s].kind, SignalKind::Parameter | SignalKind::Genvar)
            })
        };
        match node.op {
            ExprOp::Static => true,
            ExprOp::Param => node.signal.is_none() || constant_signal(),
            op if op.is_reference() => constant_signal(),
            ExprOp::FuncCall => false,
            ExprOp::SysCall => node.name.as_deref() == Some("$clog2"),
            _ => true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::NoAssertions;
    use vcov_model::DesignBuilder;

    const SRC: &str = "module top;\n  parameter P = 2;\n  always @(a) if (c) x = (a & b) | (y < P) ? z : P + 1;\nendmodule\n";

    struct Fixture {
        design: Design,
        stmt: StmtId,
        iff: StmtId,
        and: ExprId,
        or: ExprId,
        lt: ExprId,
    }

    fn fixture() -> Fixture {
        let mut b = DesignBuilder::new("top.v", SRC);
        let top = b.module("top");
        let p = b.parameter(top, "P", 2);
        let [a, bb, c, x, y, z] = ["a", "b", "c", "x", "y", "z"].map(|n| b.signal(top, n, SignalKind::Reg));
        let ea = b.sig(a, 3, 1);
        let eb = b.sig(bb, 3, 0);
        let and = b.binary(ExprOp::And, ea, eb);
        let ey = b.sig(y, 3, 0);
        let ep = b.sig(p, 3, 0);
        let lt = b.binary(ExprOp::Lt, ey, ep);
        let or = b.binary(ExprOp::Or, and, lt);
        let ez = b.sig(z, 3, 0);
        let ep2 = b.sig(p, 3, 1);
        let one = b.lit("1", 3, 0);
        let sum = b.binary(ExprOp::Add, ep2, one);
        let arms = b.binary(ExprOp::CondSel, ez, sum);
        let cond = b.binary(ExprOp::Cond, or, arms);
        let ex = b.sig(x, 3, 0);
        let stmt = b.assign(top, ExprOp::BAssign, ex, cond);
        let ec = b.sig(c, 3, 0);
        let kw = b.find(3, "if", 0);
        let end = b.design().stmts[stmt].end;
        let iff = b.compound(top, ExprOp::If, kw, Some(ec), None, end);
        Fixture {
            design: b.finish(),
            stmt,
            iff,
            and,
            or,
            lt,
        }
    }

    #[test]
    fn measures_logic_and_comparisons_but_not_constants() {
        let f = fixture();
        let limits = InlineLimits::default();
        let found = CombWalker::new(&f.design, &limits, &NoAssertions).statement(f.stmt);
        let spans: Vec<_> = found.iter().map(|m| (m.kind, m.span)).collect();
        assert_eq!(
            spans,
            vec![
                (CoverageKind::Combinational, f.design.exprs[f.or].span),
                (CoverageKind::Combinational, f.design.exprs[f.and].span),
                (CoverageKind::Combinational, f.design.exprs[f.lt].span),
            ]
        );
        assert!(matches!(found[0].shape, Shape::Polarity { signed: false, .. }));
        assert_eq!(found[2].width, SizeExpr::Const(1));
    }

    #[test]
    fn depth_budget_limits_measurement() {
        let f = fixture();
        let limits = InlineLimits {
            comb_depth: 2,
            ..InlineLimits::default()
        };
        let found = CombWalker::new(&f.design, &limits, &NoAssertions).statement(f.stmt);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].span, f.design.exprs[f.or].span);
    }

    #[test]
    fn counted_nodes_are_not_measured_twice() {
        let f = fixture();
        let limits = InlineLimits::default();
        assert_eq!(CombWalker::new(&f.design, &limits, &NoAssertions).statement(f.stmt).len(), 3);
        assert!(CombWalker::new(&f.design, &limits, &NoAssertions).statement(f.stmt).is_empty());
        f.design.reset_flags(f.stmt);
        assert_eq!(CombWalker::new(&f.design, &limits, &NoAssertions).statement(f.stmt).len(), 3);
    }

    #[test]
    fn bare_condition_gets_truth_capture() {
        let f = fixture();
        let limits = InlineLimits::default();
        let found = CombWalker::new(&f.design, &limits, &NoAssertions).statement(f.iff);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, CoverageKind::Unary);
        assert!(matches!(found[0].shape, Shape::Truth(_)));
    }

    #[test]
    fn constant_detection() {
        let f = fixture();
        let d = &f.design;
        let stmt_root = &d.exprs[d.stmts[f.stmt].expr];
        let cond = &d.exprs[stmt_root.right.unwrap()];
        let arms = &d.exprs[cond.right.unwrap()];
        assert!(is_constant(d, arms.right.unwrap()));
        assert!(!is_constant(d, arms.left.unwrap()));
    }
}
