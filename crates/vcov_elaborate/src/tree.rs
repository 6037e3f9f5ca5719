//! Depth-first instantiation of modules and task/function/named-block scopes.

use crate::const_eval::{self, ConstError, ConstScope};
use crate::errors::ElaborateError;
use crate::Elaborator;
use vcov_model::{Design, FunitId, FunitKind, InstId, Instantiation};

/// Constant scope of an instance: genvars from the instance chain, parameter
/// overrides up to the nearest module instance.
pub struct InstScope<'a> {
    /// The design.
    pub design: &'a Design,
    /// Innermost instance.
    pub inst: InstId,
}

impl ConstScope for InstScope<'_> {
    fn genvar(&self, name: &str) -> Option<i64> {
        let mut current = Some(self.inst);
        while let Some(id) = current {
            let inst = &self.design.instances[id];
            if let Some(v) = inst.genvars.get(name) {
                return Some(*v);
            }
            current = inst.parent;
        }
        None
    }

    fn param(&self, name: &str) -> Option<i64> {
        let mut current = Some(self.inst);
        while let Some(id) = current {
            let inst = &self.design.instances[id];
            if let Some(v) = inst.params.get(name) {
                return Some(*v);
            }
            if self.design.funits[inst.funit].kind == FunitKind::Module {
                return None;
            }
            current = inst.parent;
        }
        None
    }
}

impl Elaborator<'_> {
    pub(crate) fn visit(&mut self, inst: InstId, stack: &mut Vec<FunitId>) -> Result<(), ElaborateError> {
        let funit = self.design.instances[inst].funit;
        let is_module = self.is_module(inst);
        if is_module {
            if stack.contains(&funit) {
                return Err(ElaborateError::Circular(self.design.funits[funit].name.clone()));
            }
            stack.push(funit);
        }

        let decls = self.design.funits[funit].instances.clone();
        for decl in &decls {
            self.instantiate(inst, decl)?;
        }
        self.announce_scopes(inst);

        if !self.design.instances[inst].gen_resolved {
            self.design.instances[inst].gen_resolved = true;
            let roots = self.design.funits[funit].gen_roots.clone();
            for root in roots {
                self.resolve(root, inst, true)?;
            }
        }

        let mut i = 0;
        while i < self.design.instances[inst].children.len() {
            let child = self.design.instances[inst].children[i];
            self.visit(child, stack)?;
            i += 1;
        }

        if is_module {
            stack.pop();
        }
        Ok(())
    }

    /// Instantiates a module (or each element of an instance array) under
    /// `parent`. Existing children of the same name are kept.
    pub(crate) fn instantiate(&mut self, parent: InstId, decl: &Instantiation) -> Result<(), ElaborateError> {
        let mut params = Vec::with_capacity(decl.overrides.len());
        for ov in &decl.overrides {
            let scope = InstScope {
                design: self.design,
                inst: parent,
            };
            let value = const_eval::eval(self.design, ov.value, &scope)
                .map_err(|e| self.const_error(e, parent, self.design.exprs[ov.value].span))?;
            params.push((ov.name.clone(), value));
        }
        for name in decl.element_names() {
            if self.child_named(parent, &name).is_some() {
                continue;
            }
            let child = self.new_instance(name, decl.funit, Some(parent));
            self.design.instances[child].params.extend(params.iter().cloned());
            tracing::debug!(instance = %self.design.hierarchical_name(child), "instantiated");
        }
        Ok(())
    }

    /// Adds an instance for every task, function and named block declared
    /// directly in the instance's scope that does not have one yet.
    pub(crate) fn announce_scopes(&mut self, inst: InstId) {
        let funit = self.design.instances[inst].funit;
        let scopes: Vec<(FunitId, String)> = self.design.funits[funit]
            .children
            .iter()
            .filter(|c| {
                let unit = &self.design.funits[**c];
                unit.is_tfn() && !unit.generate_template
            })
            .map(|c| (*c, self.design.funits[*c].name.clone()))
            .collect();
        for (scope, name) in scopes {
            if self.child_named(inst, &name).is_none() {
                self.new_instance(name, scope, Some(inst));
            }
        }
    }

    pub(crate) fn const_error(
        &self,
        err: ConstError,
        inst: InstId,
        span: vcov_model::ExprSpan,
    ) -> ElaborateError {
        let at = self.location(inst, span);
        match err {
            ConstError::UnknownGenvar(name) => ElaborateError::UnknownGenvar {
                name,
                scope: self.design.hierarchical_name(inst),
                at,
            },
            ConstError::NotConstant(message) => ElaborateError::NotConstant { message, at },
            ConstError::UnsupportedOp(op) => ElaborateError::NotConstant {
                message: format!("operator `{op:?}` is not allowed in a constant expression"),
                at,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{elaborate, ElaborateError};
    use vcov_model::{
        Design, ExprSpan, Expression, FunctionalUnit, FunitKind, Instantiation, ParamOverride,
    };

    fn module(d: &mut Design, name: &str) -> vcov_model::FunitId {
        let mut unit = FunctionalUnit::new(name, FunitKind::Module);
        unit.file = Some(format!("{name}.v"));
        d.add_funit(unit, None)
    }

    #[test]
    fn builds_static_hierarchy_in_preorder() {
        let mut d = Design::new();
        let top = module(&mut d, "top");
        let mid = module(&mut d, "mid");
        let leaf = module(&mut d, "leaf");
        d.funits[top].instances.push(Instantiation::new("m0", mid));
        d.funits[top].instances.push(Instantiation::new("m1", mid));
        d.funits[mid].instances.push(Instantiation::new("l", leaf));
        d.add_funit(FunctionalUnit::new("helper", FunitKind::Task), Some(mid));

        let root = elaborate(&mut d, Some("top"), 100).unwrap();
        assert_eq!(d.instances[root].id, 0);
        let names: Vec<String> = d
            .instances
            .ids()
            .map(|i| d.hierarchical_name(i))
            .collect();
        assert_eq!(
            names,
            vec!["top", "top.m0", "top.m1", "top.m0.l", "top.m0.helper", "top.m1.l", "top.m1.helper"]
        );
    }

    #[test]
    fn instance_arrays_expand() {
        let mut d = Design::new();
        let top = module(&mut d, "top");
        let leaf = module(&mut d, "leaf");
        let mut decl = Instantiation::new("u", leaf);
        decl.range = Some((1, 0));
        d.funits[top].instances.push(decl);
        elaborate(&mut d, None, 100).unwrap();
        let names: Vec<String> = d.instances.ids().map(|i| d.hierarchical_name(i)).collect();
        assert_eq!(names, vec!["top", "top.u[1]", "top.u[0]"]);
    }

    #[test]
    fn parameter_overrides_are_evaluated() {
        let mut d = Design::new();
        let top = module(&mut d, "top");
        let leaf = module(&mut d, "leaf");
        let value = d.add_expr(Expression::literal("8", ExprSpan::default()));
        let mut decl = Instantiation::new("u", leaf);
        decl.overrides.push(ParamOverride {
            name: "W".into(),
            value,
        });
        d.funits[top].instances.push(decl);
        elaborate(&mut d, Some("top"), 100).unwrap();
        let u = d.instances.ids().nth(1).unwrap();
        assert_eq!(d.instances[u].params.get("W"), Some(&8));
    }

    #[test]
    fn circular_instantiation_is_fatal() {
        let mut d = Design::new();
        let a = module(&mut d, "a");
        let b = module(&mut d, "b");
        d.funits[a].instances.push(Instantiation::new("ub", b));
        d.funits[b].instances.push(Instantiation::new("ua", a));
        let err = elaborate(&mut d, Some("a"), 100).unwrap_err();
        assert_eq!(err, ElaborateError::Circular("a".into()));
    }

    #[test]
    fn unknown_top_is_reported() {
        let mut d = Design::new();
        module(&mut d, "top");
        let err = elaborate(&mut d, Some("nope"), 100).unwrap_err();
        assert_eq!(err, ElaborateError::UnknownTop("nope".into()));
    }
}
