//! Lookups over the elaborated instance tree.

use std::collections::HashMap;
use vcov_model::{Design, FunitId, FunitKind, InstId, StmtId};
use vcov_source::SourcePos;

/// Maps the start of every generated statement materialized in an instance
/// whose scope lies inside `module` to that statement.
///
/// Generated statements of the same template appear once per instance; the
/// first instance in creation order wins.
pub fn generated_statements(design: &Design, module: FunitId) -> HashMap<SourcePos, (StmtId, InstId)> {
    let mut found = HashMap::new();
    for (inst, instance) in design.instances.iter() {
        if design.module_of(instance.funit) != module {
            continue;
        }
        for stmt in instance.statements() {
            found.entry(design.stmt_pos(stmt)).or_insert((stmt, inst));
        }
    }
    found
}

/// Every instance of `funit`, in creation order.
pub fn instances_of(design: &Design, funit: FunitId) -> Vec<InstId> {
    design
        .instances
        .iter()
        .filter(|(_, inst)| inst.funit == funit)
        .map(|(id, _)| id)
        .collect()
}

/// Every module instance, in creation order.
pub fn module_instances(design: &Design) -> Vec<InstId> {
    design
        .instances
        .iter()
        .filter(|(_, inst)| design.funits[inst.funit].kind == FunitKind::Module)
        .map(|(id, _)| id)
        .collect()
}
