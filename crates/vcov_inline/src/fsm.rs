//! State-transition capture signals.

use crate::codegen::{range, Renderer};
use crate::names::{coverage_name, relative_scope, CoverageKind};
use crate::size::{expr_width, SizeExpr};
use vcov_model::{Design, FunitId};

/// `wire` declarations capturing every state-transition table declared in
/// `owner` or the scopes below it, in scope order.
pub fn declarations(design: &Design, owner: FunitId) -> Vec<String> {
    let r = Renderer::new(design);
    let mut out = Vec::new();
    let mut stack = vec![owner];
    while let Some(funit) = stack.pop() {
        let unit = &design.funits[funit];
        let scope = relative_scope(design, owner, funit);
        for fsm in &unit.fsms {
            let from = r.render(fsm.from_state);
            let to = r.render(fsm.to_state);
            let from_width = expr_width(design, fsm.from_state);
            let (width, value) = if from == to {
                (from_width, from)
            } else {
                let to_width = expr_width(design, fsm.to_state);
                (SizeExpr::add(from_width, to_width), format!("{{{from}, {to}}}"))
            };
            let name = coverage_name(CoverageKind::Fsm, design.exprs[fsm.from_state].span, &scope);
            out.push(format!("wire {}{name}= {value};", range(&width)));
        }
        // Generated blocks declare their own machines under their own mark.
        stack.extend(
            unit.children
                .iter()
                .rev()
                .filter(|c| !design.funits[**c].generate_template),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcov_model::{DesignBuilder, Fsm, SignalKind};

    #[test]
    fn transition_and_shared_state_forms() {
        let src = "module top;\n  reg [2:0] state, next;\n  always state <= next;\nendmodule\n";
        let mut b = DesignBuilder::new("top.v", src);
        let top = b.module("top");
        let state = b.vector(top, "state", SignalKind::Reg, 2, 0);
        let next = b.vector(top, "next", SignalKind::Reg, 2, 0);
        let from = b.sig(state, 3, 0);
        let to = b.sig(next, 3, 0);
        let same = b.sig(state, 2, 0);
        b.design_mut().funits[top].fsms.push(Fsm { from_state: from, to_state: to });
        b.design_mut().funits[top].fsms.push(Fsm { from_state: same, to_state: same });
        let design = b.finish();

        let decls = declarations(&design, top);
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0], "wire [5:0] \\covered$F3_3_000a000e = {state, next};");
        assert!(decls[1].starts_with("wire [2:0] \\covered$F2_2_"));
        assert!(decls[1].ends_with("= state;"));
    }
}
