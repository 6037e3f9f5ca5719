//! Instance-tree construction and generate-block elaboration.
//!
//! [`Elaborator::build`] instantiates the hierarchy below a top module and
//! resolves every instance's generate-item graph the first time the instance
//! is visited. Resolution turns generate `if`/`for`/`case` templates into
//! per-instance content: generated signals and statements are attached to
//! the instance's `gen_items`, generated named blocks become child instances,
//! and late-bound references are bound once the whole tree exists.

#![warn(missing_docs)]

pub mod bind;
pub mod const_eval;
pub mod errors;
pub mod generate;
pub mod query;
pub mod tree;

pub use errors::{ElaborateError, Location};
pub use bind::{find_signal, resolve_path};
pub use generate::substitute_indices;
pub use query::{generated_statements, instances_of, module_instances};

use std::collections::HashMap;
use vcov_model::{Arena, Design, ExprId, ExprSpan, FunitId, FunitKind, GenItemId, InstId, Instance};

/// Mutable state of one elaboration run.
pub struct Elaborator<'d> {
    design: &'d mut Design,
    max_iterations: u32,
    next_id: u32,
    cache: HashMap<ExprId, i64>,
}

impl<'d> Elaborator<'d> {
    /// Creates an elaborator over `design`. Any previous instance tree is discarded.
    pub fn new(design: &'d mut Design, max_iterations: u32) -> Self {
        design.instances = Arena::new();
        let ids: Vec<GenItemId> = design.gen_items.iter().map(|(id, _)| id).collect();
        for id in ids {
            design.gen_items.get_mut(id).resolved = false;
        }
        Self {
            design,
            max_iterations,
            next_id: 0,
            cache: HashMap::new(),
        }
    }

    /// The design being elaborated.
    pub fn design(&self) -> &Design {
        self.design
    }

    /// Builds the instance tree below `top` and binds late-bound references.
    pub fn build(&mut self, top: FunitId) -> Result<InstId, ElaborateError> {
        let name = self.design.funits[top].name.clone();
        let root = self.new_instance(name, top, None);
        let mut stack = Vec::new();
        self.visit(root, &mut stack)?;
        self.bind_deferred()?;
        tracing::info!(
            top = %self.design.funits[top].name,
            instances = self.design.instances.len(),
            "instance tree built"
        );
        Ok(root)
    }

    fn new_instance(&mut self, name: String, funit: FunitId, parent: Option<InstId>) -> InstId {
        let id = self
            .design
            .instances
            .alloc(Instance::new(name, funit, parent, self.next_id));
        self.next_id += 1;
        if let Some(parent) = parent {
            self.design.instances[parent].children.push(id);
        }
        id
    }

    fn child_named(&self, parent: InstId, name: &str) -> Option<InstId> {
        self.design.instances[parent]
            .children
            .iter()
            .copied()
            .find(|c| self.design.instances[*c].name == name)
    }

    fn location(&self, inst: InstId, span: ExprSpan) -> Option<Location> {
        let module = self.design.module_of(self.design.instances[inst].funit);
        let file = self.design.funits[module].file.clone()?;
        Some(Location {
            file,
            first: span.first(),
            last: span.last(),
        })
    }

    fn is_module(&self, inst: InstId) -> bool {
        self.design.funits[self.design.instances[inst].funit].kind == FunitKind::Module
    }
}

/// Elaborates the design below the module named `top`, or below the single
/// uninstantiated module when `top` is `None`.
pub fn elaborate(
    design: &mut Design,
    top: Option<&str>,
    max_iterations: u32,
) -> Result<InstId, ElaborateError> {
    let top_id = match top {
        Some(name) => design
            .find_module(name)
            .ok_or_else(|| ElaborateError::UnknownTop(name.to_string()))?,
        None => match design.top_modules().as_slice() {
            [only] => *only,
            _ => return Err(ElaborateError::UnknownTop("<unspecified>".to_string())),
        },
    };
    Elaborator::new(design, max_iterations).build(top_id)
}
