//! Deferred binding of late-bound hierarchical references.

use crate::errors::ElaborateError;
use crate::Elaborator;
use vcov_model::{Design, ElabKind, FunitIter, InstId, SignalId};

impl Elaborator<'_> {
    /// Binds every `Bind` item materialized during the build.
    pub(crate) fn bind_deferred(&mut self) -> Result<(), ElaborateError> {
        let mut pending = Vec::new();
        for (inst, instance) in self.design.instances.iter() {
            for (index, item) in instance.gen_items.iter().enumerate() {
                if let ElabKind::Bind { name, expr, target: None } = &item.kind {
                    pending.push((inst, index, name.clone(), *expr));
                }
            }
        }
        for (inst, index, name, expr) in pending {
            let Some(signal) = resolve_path(self.design, inst, &name) else {
                return Err(ElaborateError::Unbound {
                    scope: self.design.hierarchical_name(inst),
                    at: self.location(inst, self.design.exprs[expr].span),
                    name,
                });
            };
            if let ElabKind::Bind { target, .. } = &mut self.design.instances[inst].gen_items[index].kind {
                *target = Some(signal);
            }
            tracing::trace!(reference = %name, signal = %signal, "bound");
        }
        Ok(())
    }
}

/// Resolves a dotted reference such as `blk[2].x` starting at `inst`.
///
/// The instance path is tried from `inst` first and then from each
/// enclosing instance in turn; the last component names a signal of the
/// instance reached.
pub fn resolve_path(design: &Design, inst: InstId, name: &str) -> Option<SignalId> {
    let parts: Vec<&str> = name.split('.').map(str::trim).collect();
    let (signal, path) = parts.split_last()?;
    let mut start = Some(inst);
    while let Some(from) = start {
        if let Some(scope) = descend(design, from, path) {
            if let Some(sig) = find_signal(design, scope, signal) {
                return Some(sig);
            }
        }
        start = design.instances[from].parent;
    }
    None
}

fn descend(design: &Design, from: InstId, path: &[&str]) -> Option<InstId> {
    let mut current = from;
    for part in path {
        current = design.instances[current]
            .children
            .iter()
            .copied()
            .find(|c| design.instances[*c].name == *part)?;
    }
    Some(current)
}

/// Looks `name` up among the declared signals of the instance's scope and
/// the signals generated into the instance.
pub fn find_signal(design: &Design, inst: InstId, name: &str) -> Option<SignalId> {
    let instance = &design.instances[inst];
    let mut iter = FunitIter::new(design, instance.funit, false, true, false);
    let mut found = None;
    while let Some(sig) = iter.next_signal() {
        if design.signals[sig].name == name {
            found = Some(sig);
            break;
        }
    }
    iter.dispose();
    found.or_else(|| instance.signals().find(|s| design.signals[*s].name == name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{elaborate, ElaborateError};
    use vcov_model::{DesignBuilder, GenElem, SignalKind};

    /// ```text
    /// module top;
    ///   if (1) begin : g
    ///     wire x;
    ///   end
    ///   wire y = g.x;
    /// endmodule
    /// ```
    fn bind_design(reference: &str) -> vcov_model::Design {
        let src = "module top;\n  if (1) begin : g\n    wire x;\n  end\n  wire y = g.x;\nendmodule\n";
        let mut b = DesignBuilder::new("top.v", src);
        let top = b.module("top");
        let g = b.generate_block(top, "g");
        let x = b.signal(g, "x", SignalKind::Wire);
        b.signal(top, "y", SignalKind::Wire);
        let cond = b.lit("1", 2, 0);
        let reference_expr = b.lit("g", 5, 0);

        let g_if = b.gen(GenElem::Expr(cond));
        let g_ns = b.gen(GenElem::Namespace { funit: g, varname: None });
        let g_x = b.gen(GenElem::Signal(x));
        let g_bind = b.gen(GenElem::Bind {
            name: reference.into(),
            expr: reference_expr,
        });
        let d = b.design_mut();
        d.gen_items.set_branches(g_if, Some(g_ns), Some(g_bind));
        d.gen_items.set_branches(g_ns, Some(g_x), Some(g_bind));
        d.funits[top].gen_roots.push(g_if);
        b.finish()
    }

    #[test]
    fn binds_into_generated_scope() {
        let mut d = bind_design("g.x");
        let root = elaborate(&mut d, Some("top"), 100).unwrap();
        let bound = d.instances[root].gen_items.iter().find_map(|item| match &item.kind {
            ElabKind::Bind { target, .. } => *target,
            _ => None,
        });
        let x = bound.unwrap();
        assert_eq!(d.signals[x].name, "x");
    }

    #[test]
    fn local_signal_resolves_without_path() {
        let mut d = bind_design("y");
        let root = elaborate(&mut d, Some("top"), 100).unwrap();
        assert!(resolve_path(&d, root, "y").is_some());
    }

    #[test]
    fn missing_reference_is_fatal() {
        let mut d = bind_design("g.nope");
        let err = elaborate(&mut d, Some("top"), 100).unwrap_err();
        match err {
            ElaborateError::Unbound { name, scope, at } => {
                assert_eq!(name, "g.nope");
                assert_eq!(scope, "top");
                assert_eq!(at.unwrap().first.line, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
