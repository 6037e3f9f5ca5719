//! Event coverage and named-event triggers.

use crate::codegen::Renderer;
use crate::names::CoverageKind;
use crate::plan::{Measure, Shape};
use crate::size::SizeExpr;
use vcov_model::{Design, ExprId, ExprOp};

/// The terms of an event expression, `or`-lists flattened, in source order.
pub fn terms(design: &Design, id: ExprId) -> Vec<ExprId> {
    let mut out = Vec::new();
    let mut stack = vec![id];
    while let Some(e) = stack.pop() {
        let node = &design.exprs[e];
        if node.op == ExprOp::Eor {
            stack.extend(node.right);
            stack.extend(node.left);
        } else {
            out.push(e);
        }
    }
    out
}

/// One bit per term of the event control rooted at `root`.
pub fn measure(design: &Design, root: ExprId) -> Option<Measure> {
    let node = &design.exprs[root];
    let terms = terms(design, node.left?);
    if terms.is_empty() {
        return None;
    }
    Some(Measure {
        kind: CoverageKind::Event,
        span: node.span,
        width: SizeExpr::Const(terms.len() as i64),
        shape: Shape::Event { terms },
    })
}

/// The bit recorded for one term once the control has fired.
pub fn term_value(r: &Renderer<'_>, term: ExprId) -> String {
    let node = &r.design().exprs[term];
    match (node.op, node.left) {
        (ExprOp::Posedge, Some(sig)) => format!("({} === 1'b1)", r.wrap(sig)),
        (ExprOp::Negedge, Some(sig)) => format!("({} === 1'b0)", r.wrap(sig)),
        _ => "1'b1".to_string(),
    }
}

/// `-> e;` rewritten as a toggle of the register standing in for `e`.
pub fn trigger_text(r: &Renderer<'_>, target: ExprId) -> String {
    let e = r.render(target);
    format!("{e} = ({e} === 1'bx) ? 1'b0 : ~{e};")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::capture;
    use vcov_model::{DesignBuilder, SignalKind};

    #[test]
    fn edge_terms_capture_levels() {
        let src = "module top;\n  always @(posedge clk or negedge rst or d) q = d;\nendmodule\n";
        let mut b = DesignBuilder::new("top.v", src);
        let top = b.module("top");
        let [clk, rst, d] = ["clk", "rst", "d"].map(|n| b.signal(top, n, SignalKind::Wire));
        let eclk = b.sig(clk, 2, 0);
        let pos_kw = b.find(2, "posedge", 0);
        let last = b.design().exprs[eclk].span.last();
        let pos = b.node(ExprOp::Posedge, pos_kw, last, Some(eclk), None);
        let erst = b.sig(rst, 2, 0);
        let neg_kw = b.find(2, "negedge", 0);
        let last = b.design().exprs[erst].span.last();
        let neg = b.node(ExprOp::Negedge, neg_kw, last, Some(erst), None);
        let ed = b.sig(d, 2, 0);
        let inner = b.binary(ExprOp::Eor, neg, ed);
        let list = b.binary(ExprOp::Eor, pos, inner);
        let at = b.find(2, "@", 0);
        let close = b.find(2, ")", 0);
        let root = b.node(ExprOp::EventCtrl, at, close, Some(list), None);
        let design = b.finish();

        assert_eq!(terms(&design, list), vec![pos, neg, ed]);
        let m = measure(&design, root).unwrap();
        assert_eq!(m.width, SizeExpr::Const(3));
        let r = Renderer::new(&design);
        assert_eq!(capture(&r, &m), "{(clk === 1'b1), (rst === 1'b0), 1'b1}");
    }

    #[test]
    fn trigger_toggles() {
        let src = "module top;\n  always -> go;\nendmodule\n";
        let mut b = DesignBuilder::new("top.v", src);
        let top = b.module("top");
        let go = b.signal(top, "go", SignalKind::Event);
        let e = b.sig(go, 2, 0);
        let design = b.finish();
        let r = Renderer::new(&design);
        assert_eq!(trigger_text(&r, e), "go = (go === 1'bx) ? 1'b0 : ~go;");
    }
}
