//! The elaborated instance tree.

use crate::ids::{ExprId, FunitId, GenItemId, InstId, SignalId, StmtId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a resolved generate item became in one instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElabKind {
    /// A generated signal.
    Signal(SignalId),
    /// A generated statement.
    Stmt(StmtId),
    /// A late-bound reference with genvar indices substituted.
    Bind {
        /// Substituted reference text, e.g. `blk[2].x`.
        name: String,
        /// Expression carrying the reference.
        expr: ExprId,
        /// Signal the reference resolved to, once bound.
        target: Option<SignalId>,
    },
}

/// A generate item materialized into an instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElabItem {
    /// Generate item this copy came from.
    pub origin: GenItemId,
    /// Materialized content.
    pub kind: ElabKind,
}

/// A node of the instance tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instance {
    /// Local instance name, e.g. `u0` or `blk[2]`.
    pub name: String,
    /// Functional unit this instance elaborates.
    pub funit: FunitId,
    /// Enclosing instance.
    pub parent: Option<InstId>,
    /// Child instances in creation order.
    pub children: Vec<InstId>,
    /// Generate items resolved against this instance.
    pub gen_items: Vec<ElabItem>,
    /// Genvar values visible in this instance.
    pub genvars: BTreeMap<String, i64>,
    /// Parameter values overridden at instantiation.
    pub params: BTreeMap<String, i64>,
    /// Generate items of the functional unit have been resolved.
    pub gen_resolved: bool,
    /// Numeric id, assigned in creation order.
    pub id: u32,
}

impl Instance {
    /// Creates an instance with no children.
    pub fn new(name: impl Into<String>, funit: FunitId, parent: Option<InstId>, id: u32) -> Self {
        Self {
            name: name.into(),
            funit,
            parent,
            children: Vec::new(),
            gen_items: Vec::new(),
            genvars: BTreeMap::new(),
            params: BTreeMap::new(),
            gen_resolved: false,
            id,
        }
    }

    /// Returns `true` if `origin` has already been materialized here.
    pub fn has_item(&self, origin: GenItemId) -> bool {
        self.gen_items.iter().any(|item| item.origin == origin)
    }

    /// Generated statements, in materialization order.
    pub fn statements(&self) -> impl Iterator<Item = StmtId> + '_ {
        self.gen_items.iter().filter_map(|item| match item.kind {
            ElabKind::Stmt(stmt) => Some(stmt),
            _ => None,
        })
    }

    /// Generated signals, in materialization order.
    pub fn signals(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.gen_items.iter().filter_map(|item| match item.kind {
            ElabKind::Signal(sig) => Some(sig),
            _ => None,
        })
    }
}
