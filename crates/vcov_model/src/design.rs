//! The design model: arenas of every entity plus whole-design queries.

use crate::arena::Arena;
use crate::expr::{ExprOp, ExprParent, Expression};
use crate::funit::{FunctionalUnit, FunitKind};
use crate::gen_item::{GenElem, GenGraph};
use crate::ids::{ExprId, FunitId, InstId, SignalId, StmtId};
use crate::instance::Instance;
use crate::signal::Signal;
use crate::stmt::Statement;
use serde::{Deserialize, Serialize};
use vcov_source::SourcePos;

/// A parsed design, as handed over by the front end, plus the instance tree
/// the elaborator builds on top of it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Design {
    /// Expression nodes.
    #[serde(default)]
    pub exprs: Arena<ExprId, Expression>,
    /// Statements.
    #[serde(default)]
    pub stmts: Arena<StmtId, Statement>,
    /// Signals.
    #[serde(default)]
    pub signals: Arena<SignalId, Signal>,
    /// Functional units.
    #[serde(default)]
    pub funits: Arena<FunitId, FunctionalUnit>,
    /// Generate items.
    #[serde(default)]
    pub gen_items: GenGraph,
    /// Elaborated instances; empty until elaboration.
    #[serde(default)]
    pub instances: Arena<InstId, Instance>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an expression.
    pub fn add_expr(&mut self, expr: Expression) -> ExprId {
        self.exprs.alloc(expr)
    }

    /// Adds a functional unit and links it under `parent`.
    pub fn add_funit(&mut self, mut funit: FunctionalUnit, parent: Option<FunitId>) -> FunitId {
        funit.parent = parent;
        let id = self.funits.alloc(funit);
        if let Some(parent) = parent {
            self.funits[parent].children.push(id);
        }
        id
    }

    /// Adds a signal to its declaring scope.
    pub fn add_signal(&mut self, signal: Signal) -> SignalId {
        let funit = signal.funit;
        let id = self.signals.alloc(signal);
        self.funits[funit].signals.push(id);
        id
    }

    /// Adds a statement to its scope's statement list.
    pub fn add_stmt(&mut self, stmt: Statement) -> StmtId {
        let funit = stmt.funit;
        let id = self.stmts.alloc(stmt);
        self.funits[funit].stmts.push(id);
        id
    }

    /// Adds a statement that only exists as generate-item payload.
    pub fn add_generated_stmt(&mut self, stmt: Statement) -> StmtId {
        self.stmts.alloc(stmt)
    }

    /// Rebuilds parent back-references and `is_lhs` flags.
    pub fn link_parents(&mut self) {
        let ids: Vec<ExprId> = self.exprs.ids().collect();
        for id in &ids {
            self.exprs[*id].parent = None;
        }
        for id in ids {
            let children: Vec<ExprId> = self.exprs[id].children().collect();
            for child in children {
                if self.exprs.contains(child) {
                    self.exprs[child].parent = Some(ExprParent::Expr(id));
                }
            }
        }
        let stmts: Vec<(StmtId, ExprId)> = self.stmts.iter().map(|(id, s)| (id, s.expr)).collect();
        for (stmt, root) in stmts {
            if !self.exprs.contains(root) {
                continue;
            }
            self.exprs[root].parent = Some(ExprParent::Stmt(stmt));
            let node = &self.exprs[root];
            if node.op.is_assignment() {
                if let Some(target) = node.left {
                    self.mark_lhs(target);
                }
            }
        }
    }

    fn mark_lhs(&self, id: ExprId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(node) = self.exprs.try_get(id) else {
                continue;
            };
            node.update_flags(|f| f.is_lhs = true);
            match node.op {
                ExprOp::Concat | ExprOp::List => stack.extend(node.children()),
                ExprOp::Dim => stack.extend(node.left.into_iter().chain(node.right)),
                _ => {}
            }
        }
    }

    /// Position of a statement's first character.
    pub fn stmt_pos(&self, stmt: StmtId) -> SourcePos {
        self.exprs[self.stmts[stmt].expr].span.first()
    }

    /// Depth-first, pre-order listing of the tree rooted at `root`.
    pub fn expr_tree(&self, root: ExprId) -> Vec<ExprId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            let node = &self.exprs[id];
            stack.extend(node.right);
            stack.extend(node.left);
        }
        order
    }

    /// Clears transient flags on every node of a statement's tree.
    pub fn reset_flags(&self, stmt: StmtId) {
        for id in self.expr_tree(self.stmts[stmt].expr) {
            self.exprs[id].reset_flags();
        }
    }

    /// The module enclosing `funit` (itself for modules).
    pub fn module_of(&self, funit: FunitId) -> FunitId {
        let mut current = funit;
        while self.funits[current].kind != FunitKind::Module {
            match self.funits[current].parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Names of the scopes from `ancestor` (exclusive) down to `funit`
    /// (inclusive), or `None` if `ancestor` does not enclose `funit`.
    /// Anonymous scopes contribute no name.
    pub fn scope_path(&self, ancestor: FunitId, funit: FunitId) -> Option<Vec<&str>> {
        let mut names = Vec::new();
        let mut current = funit;
        while current != ancestor {
            let unit = &self.funits[current];
            if !unit.is_anonymous() {
                names.push(unit.name.as_str());
            }
            current = unit.parent?;
        }
        names.reverse();
        Some(names)
    }

    /// Returns `true` if `funit` lies inside a function evaluated only at elaboration.
    pub fn in_static_function(&self, funit: FunitId) -> bool {
        let mut current = Some(funit);
        while let Some(id) = current {
            let unit = &self.funits[id];
            if unit.kind == FunitKind::Function && unit.static_only {
                return true;
            }
            current = unit.parent;
        }
        false
    }

    /// Finds a module by name.
    pub fn find_module(&self, name: &str) -> Option<FunitId> {
        self.funits
            .iter()
            .find(|(_, f)| f.kind == FunitKind::Module && f.name == name)
            .map(|(id, _)| id)
    }

    /// Modules that no other scope instantiates, in declaration order.
    pub fn top_modules(&self) -> Vec<FunitId> {
        let mut instantiated = std::collections::HashSet::new();
        for (_, unit) in self.funits.iter() {
            for inst in &unit.instances {
                instantiated.insert(inst.funit);
            }
        }
        for (_, item) in self.gen_items.iter() {
            if let GenElem::Instance(inst) = &item.elem {
                instantiated.insert(inst.funit);
            }
        }
        self.funits
            .iter()
            .filter(|(id, f)| f.kind == FunitKind::Module && !instantiated.contains(id))
            .map(|(id, _)| id)
            .collect()
    }

    /// Distinct source files of all modules, in declaration order.
    pub fn files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = Vec::new();
        for (_, unit) in self.funits.iter() {
            if let Some(file) = unit.file.as_deref() {
                if !files.contains(&file) {
                    files.push(file);
                }
            }
        }
        files
    }

    /// Every scope whose module is declared in `file`.
    pub fn funits_in_file(&self, file: &str) -> Vec<FunitId> {
        self.funits
            .ids()
            .filter(|id| self.funits[self.module_of(*id)].file.as_deref() == Some(file))
            .collect()
    }

    /// Dotted hierarchical name of an instance.
    pub fn hierarchical_name(&self, inst: InstId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(inst);
        while let Some(id) = current {
            parts.push(self.instances[id].name.as_str());
            current = self.instances[id].parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Checks that every id stored in the model refers to an existing entity.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut check = |ok: bool, what: &dyn Fn() -> String| {
            if !ok {
                problems.push(what());
            }
        };
        for (id, e) in self.exprs.iter() {
            for child in e.children() {
                check(self.exprs.contains(child), &|| format!("{id}: child {child} out of range"));
            }
            if let Some(sig) = e.signal {
                check(self.signals.contains(sig), &|| format!("{id}: signal {sig} out of range"));
            }
            if let Some(fu) = e.funit {
                check(self.funits.contains(fu), &|| format!("{id}: scope {fu} out of range"));
            }
        }
        for (id, s) in self.stmts.iter() {
            check(self.exprs.contains(s.expr), &|| format!("{id}: root {} out of range", s.expr));
            check(self.funits.contains(s.funit), &|| format!("{id}: scope {} out of range", s.funit));
            for item in &s.items {
                check(self.stmts.contains(*item), &|| format!("{id}: case item {item} out of range"));
            }
        }
        for (id, sig) in self.signals.iter() {
            check(self.funits.contains(sig.funit), &|| format!("{id}: scope {} out of range", sig.funit));
            for dim in sig.packed.iter().chain(&sig.unpacked) {
                check(
                    self.exprs.contains(dim.msb) && self.exprs.contains(dim.lsb),
                    &|| format!("{id}: dimension bound out of range"),
                );
            }
            if let Some(value) = sig.value {
                check(self.exprs.contains(value), &|| format!("{id}: value {value} out of range"));
            }
        }
        for (id, unit) in self.funits.iter() {
            let scopes = unit.parent.iter().chain(&unit.children);
            for fu in scopes {
                check(self.funits.contains(*fu), &|| format!("{id}: scope {fu} out of range"));
            }
            for stmt in &unit.stmts {
                check(self.stmts.contains(*stmt), &|| format!("{id}: statement {stmt} out of range"));
            }
            for sig in &unit.signals {
                check(self.signals.contains(*sig), &|| format!("{id}: signal {sig} out of range"));
            }
            for root in &unit.gen_roots {
                check(self.gen_items.contains(*root), &|| format!("{id}: generate item {root} out of range"));
            }
            for fsm in &unit.fsms {
                check(
                    self.exprs.contains(fsm.from_state) && self.exprs.contains(fsm.to_state),
                    &|| format!("{id}: FSM state expression out of range"),
                );
            }
            for inst in &unit.instances {
                check(self.funits.contains(inst.funit), &|| format!("{id}: instance `{}` of unknown module", inst.name));
            }
        }
        for (id, item) in self.gen_items.iter() {
            for next in item.on_true.iter().chain(&item.on_false) {
                check(self.gen_items.contains(*next), &|| format!("{id}: successor {next} out of range"));
            }
            let ok = match &item.elem {
                GenElem::Expr(e) | GenElem::Bind { expr: e, .. } => self.exprs.contains(*e),
                GenElem::Signal(s) => self.signals.contains(*s),
                GenElem::Stmt(s) => self.stmts.contains(*s),
                GenElem::Instance(inst) => self.funits.contains(inst.funit),
                GenElem::Namespace { funit, .. } => self.funits.contains(*funit),
            };
            check(ok, &|| format!("{id}: payload out of range"));
        }
        problems
    }
}
