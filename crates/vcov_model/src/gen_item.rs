//! The generate-item graph.
//!
//! Generate constructs are stored as chains of [`GenItem`]s. Every item has
//! an `on_true` and an `on_false` successor: equal successors are an
//! unconditional fallthrough, different ones a branch taken on the value of
//! an expression item. Loops close through a back-edge from the increment
//! item to the loop test, so the graph is cyclic; [`GenGraph::connect`]
//! records such edges with `stop_*` flags.

use crate::arena::Arena;
use crate::funit::Instantiation;
use crate::ids::{ExprId, FunitId, GenItemId, SignalId, StmtId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Payload of a generate item.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GenElem {
    /// A test or genvar assignment; branches on its value.
    Expr(ExprId),
    /// A signal declared inside a generate construct.
    Signal(SignalId),
    /// A statement inside a generate construct.
    Stmt(StmtId),
    /// A module instantiation inside a generate construct.
    Instance(Instantiation),
    /// A named block (or task/function) scope; `on_true` leads into its body.
    Namespace {
        /// Template scope.
        funit: FunitId,
        /// Genvar whose value indexes the instance name, e.g. `blk[2]`.
        #[serde(default)]
        varname: Option<String>,
    },
    /// A hierarchical reference bound after elaboration, e.g. `blk[i].x`.
    Bind {
        /// Reference text, possibly containing genvar indices.
        name: String,
        /// Expression carrying the reference.
        expr: ExprId,
    },
}

/// A node of the generate-item graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenItem {
    /// Payload.
    pub elem: GenElem,
    /// Successor when the item is true (or unconditional).
    #[serde(default)]
    pub on_true: Option<GenItemId>,
    /// Successor when the item is false (or unconditional).
    #[serde(default)]
    pub on_false: Option<GenItemId>,
    /// Resolved at least once.
    #[serde(skip)]
    pub resolved: bool,
    /// `on_true` leads back into an item visited during the same connection.
    #[serde(default)]
    pub stop_true: bool,
    /// `on_false` leads back into an item visited during the same connection.
    #[serde(default)]
    pub stop_false: bool,
    /// Id of the last connection pass that visited this item.
    #[serde(default)]
    pub conn_id: u32,
}

impl GenItem {
    /// Creates an item with no successors.
    pub fn new(elem: GenElem) -> Self {
        Self {
            elem,
            on_true: None,
            on_false: None,
            resolved: false,
            stop_true: false,
            stop_false: false,
            conn_id: 0,
        }
    }

    /// Returns `true` when both successors are the same edge.
    pub fn is_fallthrough(&self) -> bool {
        self.on_true == self.on_false
    }

    fn is_namespace(&self) -> bool {
        matches!(self.elem, GenElem::Namespace { .. })
    }
}

#[derive(Clone, Copy)]
enum Edge {
    True,
    False,
    Both,
}

/// Arena of generate items plus the connection-id counter.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenGraph {
    items: Arena<GenItemId, GenItem>,
    #[serde(default)]
    next_conn: u32,
}

impl GenGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item without successors.
    pub fn alloc(&mut self, elem: GenElem) -> GenItemId {
        self.items.alloc(GenItem::new(elem))
    }

    /// Returns the item with the given id.
    pub fn get(&self, id: GenItemId) -> &GenItem {
        &self.items[id]
    }

    /// Returns the item with the given id, mutably.
    pub fn get_mut(&mut self, id: GenItemId) -> &mut GenItem {
        &mut self.items[id]
    }

    /// Returns `true` if `id` names an item of this graph.
    pub fn contains(&self, id: GenItemId) -> bool {
        self.items.contains(id)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the graph has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over all items.
    pub fn iter(&self) -> impl Iterator<Item = (GenItemId, &GenItem)> {
        self.items.iter()
    }

    /// Sets an unconditional successor.
    pub fn set_next(&mut self, id: GenItemId, next: GenItemId) {
        let item = &mut self.items[id];
        item.on_true = Some(next);
        item.on_false = Some(next);
    }

    /// Sets diverging successors.
    pub fn set_branches(
        &mut self,
        id: GenItemId,
        on_true: Option<GenItemId>,
        on_false: Option<GenItemId>,
    ) {
        let item = &mut self.items[id];
        item.on_true = on_true;
        item.on_false = on_false;
    }

    /// Hands out a fresh connection id.
    pub fn next_conn_id(&mut self) -> u32 {
        self.next_conn += 1;
        self.next_conn
    }

    /// Attaches `to` to every dangling successor reachable from `from`.
    ///
    /// Edges into an item already visited by this pass are flagged with
    /// `stop_true`/`stop_false` instead of being followed. A namespace item
    /// only continues through `on_false`; its `on_true` is the body of the
    /// child scope and never falls through to siblings.
    pub fn connect(&mut self, from: GenItemId, to: GenItemId, conn_id: u32) {
        let mut visited = HashSet::new();
        let mut work = vec![from];
        visited.insert(from);
        while let Some(id) = work.pop() {
            self.items[id].conn_id = conn_id;
            let item = &self.items[id];
            let (t, f) = (item.on_true, item.on_false);
            if item.is_namespace() {
                match f {
                    None => self.items[id].on_false = Some(to),
                    Some(next) => self.follow(id, next, Edge::False, &mut visited, &mut work),
                }
            } else if t == f {
                match t {
                    None => {
                        self.items[id].on_true = Some(to);
                        self.items[id].on_false = Some(to);
                    }
                    Some(next) => self.follow(id, next, Edge::Both, &mut visited, &mut work),
                }
            } else {
                match f {
                    None => self.items[id].on_false = Some(to),
                    Some(next) => self.follow(id, next, Edge::False, &mut visited, &mut work),
                }
                match t {
                    None => self.items[id].on_true = Some(to),
                    Some(next) => self.follow(id, next, Edge::True, &mut visited, &mut work),
                }
            }
        }
    }

    fn follow(
        &mut self,
        id: GenItemId,
        next: GenItemId,
        edge: Edge,
        visited: &mut HashSet<GenItemId>,
        work: &mut Vec<GenItemId>,
    ) {
        if visited.insert(next) {
            work.push(next);
            return;
        }
        let item = &mut self.items[id];
        match edge {
            Edge::True => item.stop_true = true,
            Edge::False => item.stop_false = true,
            Edge::Both => {
                item.stop_true = true;
                item.stop_false = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(graph: &mut GenGraph, n: u32) -> GenItemId {
        graph.alloc(GenElem::Expr(ExprId::from_raw(n)))
    }

    /// init -> test -(true)-> blk -(false)-> incr -> test; test -(false)-> exit
    fn build_loop(graph: &mut GenGraph) -> (GenItemId, GenItemId, GenItemId, GenItemId, GenItemId) {
        let init = expr(graph, 0);
        let test = expr(graph, 1);
        let blk = graph.alloc(GenElem::Namespace {
            funit: FunitId::from_raw(1),
            varname: Some("i".into()),
        });
        let body = graph.alloc(GenElem::Stmt(StmtId::from_raw(0)));
        let incr = expr(graph, 2);
        graph.set_next(init, test);
        graph.set_branches(test, Some(blk), None);
        graph.set_branches(blk, Some(body), Some(incr));
        graph.set_next(incr, test);
        (init, test, blk, body, incr)
    }

    #[test]
    fn connect_fills_fallthrough_end() {
        let mut g = GenGraph::new();
        let a = g.alloc(GenElem::Signal(SignalId::from_raw(0)));
        let b = g.alloc(GenElem::Signal(SignalId::from_raw(1)));
        let id = g.next_conn_id();
        g.connect(a, b, id);
        assert_eq!(g.get(a).on_true, Some(b));
        assert_eq!(g.get(a).on_false, Some(b));
        assert_eq!(g.get(a).conn_id, id);
    }

    #[test]
    fn connect_marks_loop_back_edge() {
        let mut g = GenGraph::new();
        let (init, test, blk, body, incr) = build_loop(&mut g);
        let exit = g.alloc(GenElem::Signal(SignalId::from_raw(9)));
        let id = g.next_conn_id();
        g.connect(init, exit, id);

        assert_eq!(g.get(test).on_false, Some(exit));
        assert!(g.get(incr).stop_true && g.get(incr).stop_false);
        // The namespace body is a separate scope and stays dangling.
        assert_eq!(g.get(body).on_true, None);
        assert_eq!(g.get(blk).on_false, Some(incr));
    }

    #[test]
    fn connect_rejoins_both_branches() {
        let mut g = GenGraph::new();
        let cond = expr(&mut g, 0);
        let then_sig = g.alloc(GenElem::Signal(SignalId::from_raw(0)));
        let else_sig = g.alloc(GenElem::Signal(SignalId::from_raw(1)));
        let after = g.alloc(GenElem::Signal(SignalId::from_raw(2)));
        g.set_branches(cond, Some(then_sig), Some(else_sig));
        let id = g.next_conn_id();
        g.connect(cond, after, id);
        assert_eq!(g.get(then_sig).on_true, Some(after));
        assert_eq!(g.get(else_sig).on_true, Some(after));
        assert!(!g.get(then_sig).stop_true);
    }

    #[test]
    fn graph_serializes() {
        let mut g = GenGraph::new();
        let a = expr(&mut g, 0);
        let b = expr(&mut g, 1);
        g.set_next(a, b);
        let json = serde_json::to_string(&g).unwrap();
        let back: GenGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(a).on_true, Some(b));
        assert!(!back.get(a).resolved);
    }
}
