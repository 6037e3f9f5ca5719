//! Generate-item resolution.
//!
//! [`Elaborator::resolve`] walks a generate graph from one item against a
//! target instance. Expression items pick a branch by value, payload items
//! are materialized into the instance they are resolved against, and
//! namespace items open a child instance that the body is resolved into.
//! The walk uses an explicit work stack; diverging successors are pushed
//! true first so the false branch is processed first.
//!
//! Edges flagged `stop_true`/`stop_false` by a connection pass rejoin an
//! item already on the chain. They are not followed out of payload or
//! namespace items. Expression items still follow them: a loop increment
//! leads back to its test, and the test ends the loop.

use crate::const_eval::{self, ConstError, ConstScope};
use crate::errors::ElaborateError;
use crate::tree::InstScope;
use crate::Elaborator;
use std::collections::HashMap;
use vcov_model::{ElabItem, ElabKind, ExprId, ExprOp, GenElem, GenItem, GenItemId, InstId};

impl Elaborator<'_> {
    /// Resolves the generate graph starting at `root` against `target`.
    ///
    /// Re-resolving items already materialized in an instance adds nothing.
    /// When `attach` is set and `target` is a module instance, its task,
    /// function and named-block scopes are announced afterwards.
    pub fn resolve(&mut self, root: GenItemId, target: InstId, attach: bool) -> Result<(), ElaborateError> {
        let mut visits: HashMap<GenItemId, u32> = HashMap::new();
        let mut work = vec![(root, target)];
        while let Some((id, inst)) = work.pop() {
            let count = visits.entry(id).or_insert(0);
            *count += 1;
            if *count > self.max_iterations {
                let span = self.item_span(id);
                return Err(ElaborateError::IterationLimit {
                    limit: self.max_iterations,
                    scope: self.design.hierarchical_name(inst),
                    at: span.and_then(|span| self.location(inst, span)),
                });
            }

            self.design.gen_items.get_mut(id).resolved = true;
            let item = self.design.gen_items.get(id).clone();
            match &item.elem {
                GenElem::Expr(expr) => {
                    let value = self.eval_item(*expr, inst)?;
                    let next = if self.design.exprs[*expr].op == ExprOp::GenAssign || value != 0 {
                        item.on_true
                    } else {
                        item.on_false
                    };
                    work.extend(next.map(|n| (n, inst)));
                }
                GenElem::Signal(sig) => {
                    self.materialize(inst, id, ElabKind::Signal(*sig));
                    push_successors(&mut work, &item, inst);
                }
                GenElem::Stmt(stmt) => {
                    self.materialize(inst, id, ElabKind::Stmt(*stmt));
                    push_successors(&mut work, &item, inst);
                }
                GenElem::Instance(decl) => {
                    self.instantiate(inst, decl)?;
                    push_successors(&mut work, &item, inst);
                }
                GenElem::Namespace { funit, varname } => {
                    let child = self.open_namespace(inst, *funit, varname.as_deref(), id)?;
                    work.extend(item.on_false.filter(|_| !item.stop_false).map(|n| (n, inst)));
                    work.extend(item.on_true.map(|n| (n, child)));
                }
                GenElem::Bind { name, expr } => {
                    let scope = InstScope {
                        design: self.design,
                        inst,
                    };
                    let name = substitute_indices(name, &scope).map_err(|e| {
                        self.const_error(e, inst, self.design.exprs[*expr].span)
                    })?;
                    self.materialize(
                        inst,
                        id,
                        ElabKind::Bind {
                            name,
                            expr: *expr,
                            target: None,
                        },
                    );
                    push_successors(&mut work, &item, inst);
                }
            }
        }

        if attach && self.is_module(target) {
            self.announce_scopes(target);
        }
        Ok(())
    }

    fn materialize(&mut self, inst: InstId, origin: GenItemId, kind: ElabKind) {
        let instance = &mut self.design.instances[inst];
        if !instance.has_item(origin) {
            instance.gen_items.push(ElabItem { origin, kind });
        }
    }

    fn open_namespace(
        &mut self,
        inst: InstId,
        funit: vcov_model::FunitId,
        varname: Option<&str>,
        item: GenItemId,
    ) -> Result<InstId, ElaborateError> {
        let base = self.design.funits[funit].name.clone();
        let (name, binding) = match varname {
            Some(var) => {
                let scope = InstScope {
                    design: self.design,
                    inst,
                };
                let Some(value) = scope.genvar(var) else {
                    let span = self.item_span(item);
                    return Err(ElaborateError::UnknownGenvar {
                        name: var.to_string(),
                        scope: self.design.hierarchical_name(inst),
                        at: span.and_then(|span| self.location(inst, span)),
                    });
                };
                (format!("{base}[{value}]"), Some((var.to_string(), value)))
            }
            None => (base, None),
        };
        if let Some(existing) = self.child_named(inst, &name) {
            return Ok(existing);
        }
        let child = self.new_instance(name, funit, Some(inst));
        let instance = &mut self.design.instances[child];
        instance.gen_resolved = true;
        if let Some((var, value)) = binding {
            instance.genvars.insert(var, value);
        }
        tracing::debug!(scope = %self.design.hierarchical_name(child), "generate scope opened");
        Ok(child)
    }

    /// Evaluates an expression item. Genvar assignments store their value
    /// into the nearest instance already holding the genvar.
    fn eval_item(&mut self, expr: ExprId, inst: InstId) -> Result<i64, ElaborateError> {
        if let Some(value) = self.cache.get(&expr) {
            return Ok(*value);
        }
        let node = &self.design.exprs[expr];
        let span = node.span;
        let is_assign = node.op == ExprOp::GenAssign;
        let scope = InstScope {
            design: self.design,
            inst,
        };
        let value = const_eval::eval(self.design, expr, &scope).map_err(|e| self.const_error(e, inst, span))?;

        if is_assign {
            let var = self.genvar_name(expr).ok_or_else(|| ElaborateError::NotConstant {
                message: "genvar assignment without a genvar target".into(),
                at: self.location(inst, span),
            })?;
            let owner = self.genvar_owner(inst, &var).unwrap_or(inst);
            self.design.instances[owner].genvars.insert(var, value);
        } else if !const_eval::depends_on_scope(self.design, expr) {
            self.design.exprs[expr].update_flags(|f| f.evaluated_once = true);
            self.cache.insert(expr, value);
        }
        Ok(value)
    }

    fn genvar_name(&self, assign: ExprId) -> Option<String> {
        let target = &self.design.exprs[self.design.exprs[assign].left?];
        match target.signal {
            Some(sig) => Some(self.design.signals[sig].name.clone()),
            None => target.name.clone(),
        }
    }

    fn genvar_owner(&self, inst: InstId, name: &str) -> Option<InstId> {
        let mut current = Some(inst);
        while let Some(id) = current {
            if self.design.instances[id].genvars.contains_key(name) {
                return Some(id);
            }
            current = self.design.instances[id].parent;
        }
        None
    }

    fn item_span(&self, item: GenItemId) -> Option<vcov_model::ExprSpan> {
        match &self.design.gen_items.get(item).elem {
            GenElem::Expr(expr) | GenElem::Bind { expr, .. } => Some(self.design.exprs[*expr].span),
            GenElem::Stmt(stmt) => Some(self.design.exprs[self.design.stmts[*stmt].expr].span),
            _ => None,
        }
    }
}

fn push_successors(work: &mut Vec<(GenItemId, InstId)>, item: &GenItem, inst: InstId) {
    let on_true = item.on_true.filter(|_| !item.stop_true);
    let on_false = item.on_false.filter(|_| !item.stop_false);
    if item.is_fallthrough() {
        work.extend(on_true.or(on_false).map(|n| (n, inst)));
    } else {
        work.extend(on_true.map(|n| (n, inst)));
        work.extend(on_false.map(|n| (n, inst)));
    }
}

/// Replaces every bracketed identifier in `name` by its genvar (or
/// parameter) value: `blk[i].x` becomes `blk[2].x`.
pub fn substitute_indices(name: &str, scope: &dyn ConstScope) -> Result<String, ConstError> {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..=open]);
        rest = &rest[open + 1..];
        let close = rest.find(']').unwrap_or(rest.len());
        let index = rest[..close].trim();
        let is_ident = index
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if is_ident {
            let value = scope
                .genvar(index)
                .or_else(|| scope.param(index))
                .ok_or_else(|| ConstError::UnknownGenvar(index.to_string()))?;
            out.push_str(&value.to_string());
        } else {
            out.push_str(&rest[..close]);
        }
        rest = &rest[close..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::const_eval::EmptyScope;
    use crate::{elaborate, ElaborateError};
    use vcov_model::{DesignBuilder, ExprOp, FunitKind, SignalKind};

    /// ```text
    /// module top;
    ///   genvar i;
    ///   for (i = 0; i < 4; i = i + 1) begin : blk
    ///     wire w;
    ///   end
    /// endmodule
    /// ```
    fn loop_design(bound: i64) -> (vcov_model::Design, GenItemId) {
        let src = "module top;\n  genvar i;\n  for (i = 0; i < 4; i = i + 1) begin : blk\n    wire w;\n  end\nendmodule\n";
        let mut b = DesignBuilder::new("top.v", src);
        let top = b.module("top");
        let blk = b.generate_block(top, "blk");
        let i = b.signal(top, "i", SignalKind::Genvar);
        let w = b.signal(blk, "w", SignalKind::Wire);

        let i0 = b.sig(i, 3, 0);
        let zero = b.lit("0", 3, 0);
        let init = b.binary(ExprOp::GenAssign, i0, zero);
        let i1 = b.sig(i, 3, 1);
        let four = b.constant(bound);
        let test = b.binary(ExprOp::Lt, i1, four);
        let i2 = b.sig(i, 3, 2);
        let i3 = b.sig(i, 3, 3);
        let one = b.lit("1", 3, 0);
        let sum = b.binary(ExprOp::Add, i3, one);
        let incr = b.binary(ExprOp::GenAssign, i2, sum);

        let g_init = b.gen(GenElem::Expr(init));
        let g_test = b.gen(GenElem::Expr(test));
        let g_ns = b.gen(GenElem::Namespace {
            funit: blk,
            varname: Some("i".into()),
        });
        let g_w = b.gen(GenElem::Signal(w));
        let g_incr = b.gen(GenElem::Expr(incr));
        let d = b.design_mut();
        d.gen_items.set_next(g_init, g_test);
        d.gen_items.set_branches(g_test, Some(g_ns), None);
        d.gen_items.set_branches(g_ns, Some(g_w), Some(g_incr));
        d.gen_items.set_next(g_incr, g_test);
        d.funits[top].gen_roots.push(g_init);
        (b.finish(), g_w)
    }

    #[test]
    fn for_generate_creates_one_scope_per_iteration() {
        let (mut d, g_w) = loop_design(4);
        let root = elaborate(&mut d, Some("top"), 100).unwrap();
        let names: Vec<String> = d.instances[root]
            .children
            .iter()
            .map(|c| d.hierarchical_name(*c))
            .collect();
        assert_eq!(names, vec!["top.blk[0]", "top.blk[1]", "top.blk[2]", "top.blk[3]"]);
        for (n, child) in d.instances[root].children.iter().enumerate() {
            let inst = &d.instances[*child];
            assert_eq!(inst.genvars.get("i"), Some(&(n as i64)));
            assert!(inst.has_item(g_w));
            assert_eq!(inst.gen_items.len(), 1);
        }
        assert_eq!(d.instances[root].genvars.get("i"), Some(&4));
        assert!(d.gen_items.get(g_w).resolved);
    }

    #[test]
    fn resolving_twice_adds_nothing() {
        let (mut d, _) = loop_design(2);
        let top = d.find_module("top").unwrap();
        let root_item = d.funits[top].gen_roots[0];
        let mut elab = crate::Elaborator::new(&mut d, 100);
        let root = elab.build(top).unwrap();
        elab.resolve(root_item, root, true).unwrap();
        let design = elab.design();
        assert_eq!(design.instances[root].children.len(), 2);
        for child in &design.instances[root].children {
            assert_eq!(design.instances[*child].gen_items.len(), 1);
        }
    }

    #[test]
    fn connected_loop_continues_after_exit() {
        let (d, g_w) = loop_design(3);
        let mut b = DesignBuilder::extend(d, "top.v", "");
        let top = b.design().find_module("top").unwrap();
        let after = b.signal(top, "after", SignalKind::Wire);
        let g_after = b.gen(GenElem::Signal(after));
        let g_init = b.design().funits[top].gen_roots[0];
        b.connect(g_init, g_after);
        let mut d = b.finish();

        let root = elaborate(&mut d, Some("top"), 100).unwrap();
        assert_eq!(d.instances[root].children.len(), 3);
        assert!(d.instances[root].has_item(g_after));
        assert_eq!(d.instances[root].gen_items.len(), 1);
        for child in &d.instances[root].children {
            assert!(d.instances[*child].has_item(g_w));
            assert!(!d.instances[*child].has_item(g_after));
        }
    }

    #[test]
    fn flagged_rejoin_between_signals_is_not_followed() {
        let src = "module top;\n  wire a, b;\nendmodule\n";
        let mut b = DesignBuilder::new("top.v", src);
        let top = b.module("top");
        let sa = b.signal(top, "a", SignalKind::Wire);
        let sb = b.signal(top, "b", SignalKind::Wire);
        let ga = b.gen(GenElem::Signal(sa));
        let gb = b.gen(GenElem::Signal(sb));
        let d = b.design_mut();
        d.gen_items.set_next(ga, gb);
        d.gen_items.set_next(gb, ga);
        let item = d.gen_items.get_mut(gb);
        item.stop_true = true;
        item.stop_false = true;
        d.funits[top].gen_roots.push(ga);
        let mut d = b.finish();

        let root = elaborate(&mut d, Some("top"), 100).unwrap();
        let items: Vec<GenItemId> = d.instances[root].gen_items.iter().map(|i| i.origin).collect();
        assert_eq!(items, vec![ga, gb]);
    }

    #[test]
    fn runaway_loop_hits_iteration_limit() {
        let (mut d, _) = loop_design(1_000_000);
        let err = elaborate(&mut d, Some("top"), 10).unwrap_err();
        assert!(matches!(err, ElaborateError::IterationLimit { limit: 10, .. }));
    }

    #[test]
    fn unknown_genvar_in_namespace_is_fatal() {
        let src = "module top;\n  begin : blk\n  end\nendmodule\n";
        let mut b = DesignBuilder::new("top.v", src);
        let top = b.module("top");
        let blk = b.generate_block(top, "blk");
        let g = b.gen(GenElem::Namespace {
            funit: blk,
            varname: Some("k".into()),
        });
        b.design_mut().funits[top].gen_roots.push(g);
        let mut d = b.finish();
        let err = elaborate(&mut d, Some("top"), 100).unwrap_err();
        match err {
            ElaborateError::UnknownGenvar { name, scope, .. } => {
                assert_eq!(name, "k");
                assert_eq!(scope, "top");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn if_generate_takes_one_branch() {
        let src = "module top;\n  parameter P = 1;\n  if (P) begin : a\n  end else begin : b\n  end\nendmodule\n";
        let mut b = DesignBuilder::new("top.v", src);
        let top = b.module("top");
        let ga = b.generate_block(top, "a");
        let gb = b.generate_block(top, "b");
        let p = b.parameter(top, "P", 1);
        let cond = b.sig(p, 3, 0);
        let g_if = b.gen(GenElem::Expr(cond));
        let g_a = b.gen(GenElem::Namespace { funit: ga, varname: None });
        let g_b = b.gen(GenElem::Namespace { funit: gb, varname: None });
        let d = b.design_mut();
        d.gen_items.set_branches(g_if, Some(g_a), Some(g_b));
        d.funits[top].gen_roots.push(g_if);
        let mut d = b.finish();
        let root = elaborate(&mut d, Some("top"), 100).unwrap();
        let names: Vec<&str> = d.instances[root]
            .children
            .iter()
            .map(|c| d.instances[*c].name.as_str())
            .collect();
        assert_eq!(names, vec!["a"]);
        assert_eq!(d.funits[ga].kind, FunitKind::NamedBlock);
    }

    #[test]
    fn index_substitution() {
        struct Scope;
        impl ConstScope for Scope {
            fn genvar(&self, name: &str) -> Option<i64> {
                (name == "i").then_some(2)
            }
            fn param(&self, _: &str) -> Option<i64> {
                None
            }
        }
        assert_eq!(substitute_indices("blk[i].x", &Scope).unwrap(), "blk[2].x");
        assert_eq!(substitute_indices("blk[3].x", &Scope).unwrap(), "blk[3].x");
        assert_eq!(
            substitute_indices("blk[j].x", &EmptyScope).unwrap_err(),
            ConstError::UnknownGenvar("j".into())
        );
    }
}
