//! Finding the statement that starts at a source position.

use std::cmp::Reverse;
use std::collections::HashMap;
use vcov_elaborate::generated_statements;
use vcov_model::{Design, FunitId, FunitIter, StmtId};
use vcov_source::SourcePos;

/// Answers "which statements begin here" while the replay moves forward
/// through one module.
///
/// Queries are expected in increasing position order; a query behind the
/// current line rewinds the underlying iterator.
pub struct StatementLocator<'d> {
    design: &'d Design,
    generated: HashMap<SourcePos, StmtId>,
    iter: FunitIter<'d>,
    line: u32,
    on_line: Vec<StmtId>,
    ahead: Option<StmtId>,
}

impl<'d> StatementLocator<'d> {
    /// Creates a locator over `module` and its named and anonymous scopes.
    pub fn new(design: &'d Design, module: FunitId) -> Self {
        let generated = generated_statements(design, module)
            .into_iter()
            .map(|(pos, (stmt, _))| (pos, stmt))
            .collect();
        Self {
            design,
            generated,
            iter: FunitIter::new(design, module, true, false, true),
            line: 0,
            on_line: Vec::new(),
            ahead: None,
        }
    }

    /// Statements starting exactly at `pos`, enclosing constructs first.
    ///
    /// Falls back to statements materialized by generate elaboration.
    pub fn at(&mut self, pos: SourcePos) -> Vec<StmtId> {
        if pos.line < self.line {
            self.iter.rewind();
            self.line = 0;
            self.on_line.clear();
            self.ahead = None;
        }
        if pos.line > self.line {
            self.advance_to(pos.line);
        }
        let mut found: Vec<StmtId> = self
            .on_line
            .iter()
            .copied()
            .filter(|s| self.design.stmt_pos(*s) == pos)
            .collect();
        if found.is_empty() {
            found.extend(self.generated.get(&pos).copied());
        }
        found.sort_by_key(|s| Reverse(self.design.stmts[*s].end));
        found
    }

    fn advance_to(&mut self, line: u32) {
        self.line = line;
        self.on_line.clear();
        loop {
            let Some(stmt) = self.ahead.take().or_else(|| self.iter.next_statement()) else {
                break;
            };
            let first = self.design.stmt_pos(stmt).line;
            if first < line {
                continue;
            }
            if first > line {
                self.ahead = Some(stmt);
                break;
            }
            self.on_line.push(stmt);
        }
    }
}
