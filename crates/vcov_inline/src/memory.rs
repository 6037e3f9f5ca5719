//! Memory access coverage.
//!
//! A memory access is a select chain that indexes every unpacked dimension
//! of a memory. Its element index is flattened row-major: each dimension's
//! offset is scaled by the product of the sizes of the dimensions to its
//! right.

use crate::codegen::{list_items, selects, Renderer};
use crate::names::CoverageKind;
use crate::plan::{Measure, Shape};
use crate::size::{dim_width, element_count, expr_width, from_expr, SizeExpr};
use vcov_elaborate::const_eval::{self, EmptyScope};
use vcov_model::{Design, ExprId, ExprOp, StmtId};

/// Returns `true` if `id` is a select chain indexing every unpacked
/// dimension of a memory.
pub fn is_access(design: &Design, id: ExprId) -> bool {
    let node = &design.exprs[id];
    if !(node.op.is_select() || node.op == ExprOp::Dim) {
        return false;
    }
    let Some(sig) = node.signal else {
        return false;
    };
    let unpacked = design.signals[sig].unpacked.len();
    if unpacked == 0 {
        return false;
    }
    let sels = selects(design, id);
    sels.len() >= unpacked && sels[..unpacked].iter().all(|s| design.exprs[*s].op == ExprOp::SbitSel)
}

/// Finds the memory writes and reads of `stmt`.
pub fn collect(design: &Design, stmt: StmtId) -> Vec<Measure> {
    let mut found = Vec::new();
    let root = &design.exprs[design.stmts[stmt].expr];
    let mut value_roots = Vec::new();
    if root.op.is_assignment() {
        if let (Some(lhs), Some(rhs)) = (root.left, root.right) {
            if is_access(design, lhs) {
                found.push(Measure {
                    kind: CoverageKind::MemoryWrite,
                    span: design.exprs[lhs].span,
                    width: SizeExpr::add(expr_width(design, lhs), index_width(design, lhs)),
                    shape: Shape::MemWrite { access: lhs, value: rhs },
                });
            }
            value_roots.extend(index_operands(design, lhs));
            value_roots.push(rhs);
        }
    } else if matches!(
        root.op,
        ExprOp::If | ExprOp::Case | ExprOp::Casex | ExprOp::Casez | ExprOp::TaskCall
    ) {
        value_roots.extend(root.left);
    }
    for id in value_roots {
        reads(design, id, &mut found);
    }
    found
}

/// Index expressions of the selects under a target, which are read even
/// though the target itself is written.
fn index_operands(design: &Design, target: ExprId) -> Vec<ExprId> {
    let node = &design.exprs[target];
    match node.op {
        ExprOp::Concat => node.left.map_or_else(Vec::new, |l| {
            list_items(design, l)
                .into_iter()
                .flat_map(|item| index_operands(design, item))
                .collect()
        }),
        _ => selects(design, target)
            .into_iter()
            .flat_map(|s| {
                let s = &design.exprs[s];
                s.left.into_iter().chain(s.right)
            })
            .collect(),
    }
}

fn reads(design: &Design, id: ExprId, found: &mut Vec<Measure>) {
    if is_access(design, id) {
        found.push(Measure {
            kind: CoverageKind::MemoryRead,
            span: design.exprs[id].span,
            width: SizeExpr::add(expr_width(design, id), index_width(design, id)),
            shape: Shape::MemRead { access: id },
        });
        for operand in index_operands(design, id) {
            reads(design, operand, found);
        }
        return;
    }
    let node = &design.exprs[id];
    if node.op == ExprOp::Dim {
        for operand in index_operands(design, id) {
            reads(design, operand, found);
        }
        return;
    }
    for child in node.left.into_iter().chain(node.right) {
        reads(design, child, found);
    }
}

/// Width of the flattened index: `$clog2(elements)`, at least one bit.
pub fn index_width(design: &Design, access: ExprId) -> SizeExpr {
    match design.exprs[access].signal {
        Some(sig) => SizeExpr::max(SizeExpr::clog2(element_count(design, sig)), SizeExpr::Const(1)),
        None => SizeExpr::Const(1),
    }
}

/// The flattened element index of `access`, rendered through `r` so that
/// temporaries are honoured.
pub fn flat_index(r: &Renderer<'_>, access: ExprId) -> SizeExpr {
    let design = r.design();
    let Some(sig) = design.exprs[access].signal else {
        return SizeExpr::Const(0);
    };
    let dims = &design.signals[sig].unpacked;
    let sels = selects(design, access);
    let mut index = SizeExpr::Const(0);
    for (k, dim) in dims.iter().enumerate() {
        let Some(idx) = sels.get(k).and_then(|s| design.exprs[*s].left) else {
            continue;
        };
        let literal = !r.has_temp(idx)
            && design
                .expr_tree(idx)
                .iter()
                .all(|e| !design.exprs[*e].op.is_reference());
        let value = match const_eval::eval(design, idx, &EmptyScope) {
            Ok(v) if literal => SizeExpr::Const(v),
            _ => SizeExpr::Ident(r.wrap(idx)),
        };
        // Offsets count from the lower bound whichever way the range runs.
        let base = SizeExpr::min(from_expr(design, dim.msb), from_expr(design, dim.lsb));
        let stride = dims[k + 1..]
            .iter()
            .fold(SizeExpr::Const(1), |acc, d| SizeExpr::mul(acc, dim_width(design, d)));
        let offset = SizeExpr::sub(value, base);
        index = SizeExpr::add(index, SizeExpr::mul(offset, stride));
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcov_model::{DesignBuilder, ExprSpan, Expression, SignalKind};

    const SRC: &str = "module top;\n  reg [7:0] m [3:0][1:4];\n  always m[i][j] = m[2][k] + d;\nendmodule\n";

    #[test]
    fn write_and_read_of_two_dimensional_memory() {
        let mut b = DesignBuilder::new("top.v", SRC);
        let top = b.module("top");
        let m = b.memory(top, "m", Some((7, 0)), &[(3, 0), (1, 4)]);
        let [i, j, k, d] = ["i", "j", "k", "d"].map(|n| b.vector(top, n, SignalKind::Reg, 3, 0));
        let ei = b.sig(i, 3, 0);
        let ej = b.sig(j, 3, 0);
        let s0 = b.select(ExprOp::SbitSel, m, 3, 0, ei, None);
        let s1 = b.select(ExprOp::SbitSel, m, 3, 0, ej, None);
        let lhs = b.dim_select(s0, s1);
        let two = b.lit("2", 3, 0);
        let ek = b.sig(k, 3, 0);
        let r0 = b.select(ExprOp::SbitSel, m, 3, 1, two, None);
        let r1 = b.select(ExprOp::SbitSel, m, 3, 1, ek, None);
        let rhs_access = b.dim_select(r0, r1);
        let ed = b.sig(d, 3, 0);
        let rhs = b.binary(ExprOp::Add, rhs_access, ed);
        let stmt = b.assign(top, ExprOp::BAssign, lhs, rhs);
        let design = b.finish();

        let found = collect(&design, stmt);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, CoverageKind::MemoryWrite);
        assert_eq!(found[1].kind, CoverageKind::MemoryRead);
        // 8-bit element plus a 4-bit index over 16 elements.
        assert_eq!(found[0].width, SizeExpr::Const(12));

        let r = Renderer::new(&design);
        assert_eq!(flat_index(&r, lhs).render(), "((i * 4) + (j - 1))");
        assert_eq!(flat_index(&r, rhs_access).render(), "((k - 1) + 8)");
    }

    /// `reg [7:0] m [lo:hi]` where one bound is `D - 1`, read as `x = m[i]`.
    fn parameterized_depth(descending: bool) -> (Design, ExprId) {
        let src = "module top;\n  reg [7:0] m [0:D-1];\n  always x = m[i];\nendmodule\n";
        let mut b = DesignBuilder::new("top.v", src);
        let top = b.module("top");
        let depth = b.parameter(top, "D", 16);
        let m = b.memory(top, "m", Some((7, 0)), &[(0, 0)]);
        let [i, x] = ["i", "x"].map(|n| b.vector(top, n, SignalKind::Reg, 3, 0));
        let one = b.constant(1);
        let d = b.design_mut();
        let ed = d.add_expr(Expression::new(ExprOp::Param, ExprSpan::default()));
        d.exprs[ed].signal = Some(depth);
        let hi = d.add_expr(Expression::new(ExprOp::Sub, ExprSpan::default()).with_children(Some(ed), Some(one)));
        let dim = &mut d.signals[m].unpacked[0];
        if descending {
            dim.msb = hi;
        } else {
            dim.lsb = hi;
        }
        let ei = b.sig(i, 3, 0);
        let sel = b.select(ExprOp::SbitSel, m, 3, 0, ei, None);
        let ex = b.sig(x, 3, 0);
        b.assign(top, ExprOp::BAssign, ex, sel);
        (b.finish(), sel)
    }

    fn env(name: &str) -> Option<i64> {
        match name {
            "D" => Some(16),
            "i" => Some(3),
            _ => None,
        }
    }

    #[test]
    fn ascending_parameterized_range_counts_from_lower_bound() {
        let (design, sel) = parameterized_depth(false);
        let r = Renderer::new(&design);
        let index = flat_index(&r, sel);
        assert_eq!(index.render(), "(i - ((0 < (D - 1)) ? 0 : (D - 1)))");
        assert_eq!(index.eval(&env), Some(3));
        assert_eq!(index_width(&design, sel).eval(&env), Some(4));
    }

    #[test]
    fn descending_parameterized_range_counts_from_lower_bound() {
        let (design, sel) = parameterized_depth(true);
        let r = Renderer::new(&design);
        assert_eq!(flat_index(&r, sel).eval(&env), Some(3));
    }

    #[test]
    fn plain_vectors_are_not_memories() {
        let src = "module top;\n  reg [7:0] v;\n  always x = v[3];\nendmodule\n";
        let mut b = DesignBuilder::new("top.v", src);
        let top = b.module("top");
        let v = b.vector(top, "v", SignalKind::Reg, 7, 0);
        let x = b.signal(top, "x", SignalKind::Reg);
        let three = b.lit("3", 3, 0);
        let sel = b.select(ExprOp::SbitSel, v, 3, 0, three, None);
        let ex = b.sig(x, 3, 0);
        let stmt = b.assign(top, ExprOp::BAssign, ex, sel);
        let design = b.finish();
        assert!(!is_access(&design, sel));
        assert!(collect(&design, stmt).is_empty());
    }
}
