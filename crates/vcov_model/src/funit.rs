//! Functional units: modules, functions, tasks and named blocks.

use crate::ids::{ExprId, FunitId, GenItemId, SignalId, StmtId};
use serde::{Deserialize, Serialize};
use vcov_source::SourcePos;

/// Kind of a functional unit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum FunitKind {
    /// `module ... endmodule`
    Module,
    /// `function ... endfunction`
    Function,
    /// `task ... endtask`
    Task,
    /// `begin : name ... end`
    NamedBlock,
    /// An unnamed block that still forms a scope.
    AnonBlock,
}

/// A state-transition table: the expressions holding the current and next state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Fsm {
    /// Current-state expression.
    pub from_state: ExprId,
    /// Next-state expression.
    pub to_state: ExprId,
}

/// A parameter override on an instantiation: `#(.W(8))`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamOverride {
    /// Overridden parameter name.
    pub name: String,
    /// Value, evaluated in the instantiating scope.
    pub value: ExprId,
}

/// A module instantiation inside a functional unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instantiation {
    /// Instance name.
    pub name: String,
    /// Instantiated module.
    pub funit: FunitId,
    /// Instance-array range `[msb:lsb]`.
    #[serde(default)]
    pub range: Option<(i64, i64)>,
    /// Parameter overrides.
    #[serde(default)]
    pub overrides: Vec<ParamOverride>,
}

impl Instantiation {
    /// Creates a plain (non-array) instantiation.
    pub fn new(name: impl Into<String>, funit: FunitId) -> Self {
        Self {
            name: name.into(),
            funit,
            range: None,
            overrides: Vec::new(),
        }
    }

    /// Expands an instance array into its element names, in declaration order.
    pub fn element_names(&self) -> Vec<String> {
        match self.range {
            None => vec![self.name.clone()],
            Some((msb, lsb)) => {
                let step = if msb >= lsb { -1 } else { 1 };
                let mut names = Vec::new();
                let mut i = msb;
                loop {
                    names.push(format!("{}[{}]", self.name, i));
                    if i == lsb {
                        break;
                    }
                    i += step;
                }
                names
            }
        }
    }
}

/// A named scope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionalUnit {
    /// Scope name (empty for anonymous blocks).
    pub name: String,
    /// Scope kind.
    pub kind: FunitKind,
    /// Original source file; set on modules.
    #[serde(default)]
    pub file: Option<String>,
    /// First character of the scope's text.
    pub start: SourcePos,
    /// Last character of the scope header (`;` of a module header, the
    /// block label of a named block).
    pub header_end: SourcePos,
    /// Last character of the closing keyword.
    pub end: SourcePos,
    /// Enclosing scope.
    #[serde(default)]
    pub parent: Option<FunitId>,
    /// Nested scopes, in source order.
    #[serde(default)]
    pub children: Vec<FunitId>,
    /// Statements, in source order.
    #[serde(default)]
    pub stmts: Vec<StmtId>,
    /// Declared signals.
    #[serde(default)]
    pub signals: Vec<SignalId>,
    /// Heads of the generate-item chains declared directly in this scope.
    #[serde(default)]
    pub gen_roots: Vec<GenItemId>,
    /// State-transition tables.
    #[serde(default)]
    pub fsms: Vec<Fsm>,
    /// Static module instantiations.
    #[serde(default)]
    pub instances: Vec<Instantiation>,
    /// A function only ever evaluated during elaboration.
    #[serde(default)]
    pub static_only: bool,
    /// A named block created by a generate construct; instantiated only
    /// through namespace generate items.
    #[serde(default)]
    pub generate_template: bool,
    /// Signal holding a function's return value.
    #[serde(default)]
    pub return_signal: Option<SignalId>,
}

impl FunctionalUnit {
    /// Creates an empty scope.
    pub fn new(name: impl Into<String>, kind: FunitKind) -> Self {
        Self {
            name: name.into(),
            kind,
            file: None,
            start: SourcePos::new(0, 0),
            header_end: SourcePos::new(0, 0),
            end: SourcePos::new(0, 0),
            parent: None,
            children: Vec::new(),
            stmts: Vec::new(),
            signals: Vec::new(),
            gen_roots: Vec::new(),
            fsms: Vec::new(),
            instances: Vec::new(),
            static_only: false,
            generate_template: false,
            return_signal: None,
        }
    }

    /// Returns `true` for unnamed blocks, which the iterator folds into their parent.
    pub fn is_anonymous(&self) -> bool {
        self.kind == FunitKind::AnonBlock
    }

    /// Returns `true` for functions, tasks and named blocks.
    pub fn is_tfn(&self) -> bool {
        matches!(
            self.kind,
            FunitKind::Function | FunitKind::Task | FunitKind::NamedBlock
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_names_descend_from_msb() {
        let mut inst = Instantiation::new("u", FunitId::from_raw(0));
        inst.range = Some((1, 0));
        assert_eq!(inst.element_names(), vec!["u[1]", "u[0]"]);
        inst.range = Some((0, 2));
        assert_eq!(inst.element_names(), vec!["u[0]", "u[1]", "u[2]"]);
    }

    #[test]
    fn plain_instance_has_one_name() {
        let inst = Instantiation::new("core", FunitId::from_raw(3));
        assert_eq!(inst.element_names(), vec!["core"]);
    }

    #[test]
    fn kind_predicates() {
        assert!(FunctionalUnit::new("", FunitKind::AnonBlock).is_anonymous());
        assert!(FunctionalUnit::new("f", FunitKind::Function).is_tfn());
        assert!(!FunctionalUnit::new("m", FunitKind::Module).is_tfn());
    }
}
