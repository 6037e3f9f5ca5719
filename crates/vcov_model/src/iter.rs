//! Merged statement/signal iteration over a functional unit and its
//! anonymous nested scopes.
//!
//! Statements come out in `(first line, last column)` order across all
//! scopes: smaller line first, and on the same line the larger last column
//! first, so an enclosing construct precedes the statements nested in it.

use crate::design::Design;
use crate::ids::{FunitId, SignalId, StmtId};
use std::cmp::Reverse;

#[derive(Clone, Copy)]
struct Cursor<'d> {
    list: &'d [StmtId],
    pos: usize,
}

/// Iterator over the statements and signals of one functional unit.
pub struct FunitIter<'d> {
    design: &'d Design,
    initial: Vec<Cursor<'d>>,
    cursors: Vec<Cursor<'d>>,
    signals: Vec<&'d [SignalId]>,
    sig_scope: usize,
    sig_index: usize,
}

impl<'d> FunitIter<'d> {
    /// Builds an iterator over `funit` and every descendant scope that is
    /// anonymous or, when `include_named` is set, named.
    pub fn new(
        design: &'d Design,
        funit: FunitId,
        include_stmts: bool,
        include_signals: bool,
        include_named: bool,
    ) -> Self {
        let scope_count = count_scopes(design, funit, include_named);
        let mut scopes = Vec::with_capacity(scope_count);
        collect_scopes(design, funit, include_named, &mut scopes);

        let mut initial = Vec::new();
        let mut signals = Vec::new();
        for scope in scopes {
            let unit = &design.funits[scope];
            if include_stmts && !unit.stmts.is_empty() {
                initial.push(Cursor {
                    list: unit.stmts.as_slice(),
                    pos: 0,
                });
            }
            if include_signals {
                signals.push(unit.signals.as_slice());
            }
        }

        let mut iter = Self {
            design,
            cursors: Vec::new(),
            initial,
            signals,
            sig_scope: 0,
            sig_index: 0,
        };
        iter.initial.sort_by_key(|c| iter_key(design, c));
        iter.rewind();
        iter
    }

    /// Restarts statement and signal iteration from the beginning.
    pub fn rewind(&mut self) {
        self.cursors.clone_from(&self.initial);
        self.sig_scope = 0;
        self.sig_index = 0;
    }

    /// Returns the next statement in position order.
    pub fn next_statement(&mut self) -> Option<StmtId> {
        let head = self.cursors.first_mut()?;
        let stmt = head.list[head.pos];
        head.pos += 1;
        if head.pos == head.list.len() {
            self.cursors.remove(0);
        } else {
            // Bubble the advanced cursor into place.
            let mut i = 0;
            while i + 1 < self.cursors.len()
                && iter_key(self.design, &self.cursors[i]) > iter_key(self.design, &self.cursors[i + 1])
            {
                self.cursors.swap(i, i + 1);
                i += 1;
            }
        }
        Some(stmt)
    }

    /// Returns the next signal, scope by scope.
    pub fn next_signal(&mut self) -> Option<SignalId> {
        while self.sig_scope < self.signals.len() {
            let scope = self.signals[self.sig_scope];
            if self.sig_index < scope.len() {
                let sig = scope[self.sig_index];
                self.sig_index += 1;
                return Some(sig);
            }
            self.sig_scope += 1;
            self.sig_index = 0;
        }
        None
    }

    /// Releases the iterator. The design is unaffected.
    pub fn dispose(self) {}
}

fn iter_key(design: &Design, cursor: &Cursor<'_>) -> (u32, Reverse<u32>) {
    let stmt = &design.stmts[cursor.list[cursor.pos]];
    let span = design.exprs[stmt.expr].span;
    (span.first_line, Reverse(u32::from(span.cols.last)))
}

fn included(design: &Design, child: FunitId, include_named: bool) -> bool {
    let unit = &design.funits[child];
    !unit.generate_template && (unit.is_anonymous() || (include_named && unit.is_tfn()))
}

fn count_scopes(design: &Design, funit: FunitId, include_named: bool) -> usize {
    1 + design.funits[funit]
        .children
        .iter()
        .filter(|c| included(design, **c, include_named))
        .map(|c| count_scopes(design, *c, include_named))
        .sum::<usize>()
}

fn collect_scopes(design: &Design, funit: FunitId, include_named: bool, out: &mut Vec<FunitId>) {
    out.push(funit);
    for child in &design.funits[funit].children {
        if included(design, *child, include_named) {
            collect_scopes(design, *child, include_named, out);
        }
    }
}
