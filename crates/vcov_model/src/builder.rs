//! Construction of designs whose positions match a given source text.
//!
//! Positions are looked up in the text by snippet, so tests can describe a
//! design in terms of the Verilog it came from. Lookups that fail panic with
//! the snippet and line.

use crate::design::Design;
use crate::expr::{ExprOp, ExprSpan, Expression};
use crate::funit::{FunctionalUnit, FunitKind};
use crate::gen_item::GenElem;
use crate::ids::{ExprId, FunitId, GenItemId, SignalId, StmtId};
use crate::signal::{Dimension, Signal, SignalKind};
use crate::stmt::Statement;
use vcov_source::SourcePos;

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Builds a [`Design`] for one source file.
pub struct DesignBuilder {
    design: Design,
    file: String,
    lines: Vec<Vec<char>>,
}

impl DesignBuilder {
    /// Starts a design for `file` with the given text.
    pub fn new(file: &str, source: &str) -> Self {
        Self {
            design: Design::new(),
            file: file.to_string(),
            lines: source.lines().map(|l| l.chars().collect()).collect(),
        }
    }

    /// Continues building on an existing design (for multi-file designs).
    pub fn extend(design: Design, file: &str, source: &str) -> Self {
        let mut builder = Self::new(file, source);
        builder.design = design;
        builder
    }

    /// The design built so far.
    pub fn design(&self) -> &Design {
        &self.design
    }

    /// The design built so far, mutably.
    pub fn design_mut(&mut self) -> &mut Design {
        &mut self.design
    }

    /// Links parents and returns the design.
    pub fn finish(mut self) -> Design {
        self.design.link_parents();
        self.design
    }

    fn line(&self, line: u32) -> &[char] {
        self.lines
            .get(line as usize - 1)
            .map(Vec::as_slice)
            .unwrap_or_else(|| panic!("line {line} out of range"))
    }

    fn matches_at(&self, line: &[char], idx: usize, snippet: &[char]) -> bool {
        if idx + snippet.len() > line.len() || line[idx..idx + snippet.len()] != *snippet {
            return false;
        }
        let word_start = snippet.first().is_some_and(|c| is_ident_char(*c));
        let word_end = snippet.last().is_some_and(|c| is_ident_char(*c));
        if word_start && idx > 0 && is_ident_char(line[idx - 1]) {
            return false;
        }
        if word_end && line.get(idx + snippet.len()).is_some_and(|c| is_ident_char(*c)) {
            return false;
        }
        true
    }

    /// Position of the `nth` (0-based) occurrence of `snippet` on `line`.
    pub fn find(&self, line: u32, snippet: &str, nth: usize) -> SourcePos {
        let text = self.line(line);
        let pat: Vec<char> = snippet.chars().collect();
        (0..text.len())
            .filter(|i| self.matches_at(text, *i, &pat))
            .nth(nth)
            .map(|i| SourcePos::new(line, i as u32 + 1))
            .unwrap_or_else(|| panic!("`{snippet}` #{nth} not found on line {line}"))
    }

    /// Position of the first occurrence of `snippet` strictly after `from`.
    pub fn find_after(&self, from: SourcePos, snippet: &str) -> SourcePos {
        let pat: Vec<char> = snippet.chars().collect();
        for line in from.line..=self.lines.len() as u32 {
            let text = self.line(line);
            let start = if line == from.line { from.col as usize } else { 0 };
            if let Some(i) = (start..text.len()).find(|i| self.matches_at(text, *i, &pat)) {
                return SourcePos::new(line, i as u32 + 1);
            }
        }
        panic!("`{snippet}` not found after {from}")
    }

    /// Last character of `snippet` found after `from`.
    pub fn find_last_after(&self, from: SourcePos, snippet: &str) -> SourcePos {
        self.find_after(from, snippet).last_of(snippet)
    }

    fn matching_end(&self, after: SourcePos) -> SourcePos {
        let mut depth = 1;
        for line in after.line..=self.lines.len() as u32 {
            let text = self.line(line);
            let start = if line == after.line { after.col as usize } else { 0 };
            let mut i = start;
            while i < text.len() {
                if is_ident_char(text[i]) && (i == 0 || !is_ident_char(text[i - 1])) {
                    let word: String = text[i..].iter().take_while(|c| is_ident_char(**c)).collect();
                    if word == "begin" {
                        depth += 1;
                    } else if word == "end" {
                        depth -= 1;
                        if depth == 0 {
                            return SourcePos::new(line, i as u32 + 3);
                        }
                    }
                    i += word.len();
                } else {
                    i += 1;
                }
            }
        }
        panic!("no matching `end` after {after}")
    }

    fn line_with(&self, words: &[&str]) -> u32 {
        (1..=self.lines.len() as u32)
            .find(|l| {
                let text: String = self.line(*l).iter().collect();
                let mut rest = text.as_str();
                words.iter().all(|w| match rest.find(w) {
                    Some(i) => {
                        rest = &rest[i + w.len()..];
                        true
                    }
                    None => false,
                })
            })
            .unwrap_or_else(|| panic!("no line containing {words:?}"))
    }

    /// Declares module `name`, spanning `module` to `endmodule`.
    pub fn module(&mut self, name: &str) -> FunitId {
        let line = self.line_with(&["module", name]);
        let start = self.find(line, "module", 0);
        let header_end = self.find_after(start, ";");
        let end = self.find_last_after(header_end, "endmodule");
        let mut unit = FunctionalUnit::new(name, FunitKind::Module);
        unit.file = Some(self.file.clone());
        unit.start = start;
        unit.header_end = header_end;
        unit.end = end;
        self.design.add_funit(unit, None)
    }

    /// Declares the named block `begin : name`.
    pub fn named_block(&mut self, parent: FunitId, name: &str) -> FunitId {
        self.block(parent, name, false)
    }

    /// Declares a named block created by a generate construct.
    pub fn generate_block(&mut self, parent: FunitId, name: &str) -> FunitId {
        self.block(parent, name, true)
    }

    fn block(&mut self, parent: FunitId, name: &str, template: bool) -> FunitId {
        let line = self.line_with(&["begin", ":", name]);
        let label = self.find_after(self.find(line, ":", 0), name);
        let start = self.find(line, "begin", 0);
        let header_end = label.last_of(name);
        let end = self.matching_end(header_end);
        let mut unit = FunctionalUnit::new(name, FunitKind::NamedBlock);
        unit.start = start;
        unit.header_end = header_end;
        unit.end = end;
        unit.generate_template = template;
        self.design.add_funit(unit, Some(parent))
    }

    /// Declares a function or task `name`, spanning to its closing keyword.
    pub fn subroutine(&mut self, parent: FunitId, kind: FunitKind, name: &str) -> FunitId {
        let (open, close) = match kind {
            FunitKind::Task => ("task", "endtask"),
            _ => ("function", "endfunction"),
        };
        let line = self.line_with(&[open, name]);
        let start = self.find(line, open, 0);
        let header_end = self.find_after(self.find(line, name, 0), ";");
        let end = self.find_last_after(header_end, close);
        let mut unit = FunctionalUnit::new(name, kind);
        unit.start = start;
        unit.header_end = header_end;
        unit.end = end;
        self.design.add_funit(unit, Some(parent))
    }

    /// A literal without a source position, for dimensions and defaults.
    pub fn constant(&mut self, value: i64) -> ExprId {
        self.design
            .add_expr(Expression::literal(value.to_string(), ExprSpan::default()))
    }

    /// A `[msb:lsb]` dimension with constant bounds.
    pub fn dim(&mut self, msb: i64, lsb: i64) -> Dimension {
        Dimension {
            msb: self.constant(msb),
            lsb: self.constant(lsb),
        }
    }

    /// Declares a scalar signal.
    pub fn signal(&mut self, funit: FunitId, name: &str, kind: SignalKind) -> SignalId {
        self.design.add_signal(Signal::new(name, kind, funit))
    }

    /// Declares a `[msb:lsb]` vector.
    pub fn vector(&mut self, funit: FunitId, name: &str, kind: SignalKind, msb: i64, lsb: i64) -> SignalId {
        let mut sig = Signal::new(name, kind, funit);
        sig.packed.push(self.dim(msb, lsb));
        self.design.add_signal(sig)
    }

    /// Declares a memory with optional packed range and unpacked ranges.
    pub fn memory(
        &mut self,
        funit: FunitId,
        name: &str,
        packed: Option<(i64, i64)>,
        unpacked: &[(i64, i64)],
    ) -> SignalId {
        let mut sig = Signal::new(name, SignalKind::Reg, funit);
        if let Some((msb, lsb)) = packed {
            sig.packed.push(self.dim(msb, lsb));
        }
        for (msb, lsb) in unpacked {
            let dim = self.dim(*msb, *lsb);
            sig.unpacked.push(dim);
        }
        self.design.add_signal(sig)
    }

    /// Declares a parameter with a constant default.
    pub fn parameter(&mut self, funit: FunitId, name: &str, value: i64) -> SignalId {
        let mut sig = Signal::new(name, SignalKind::Parameter, funit);
        sig.value = Some(self.constant(value));
        self.design.add_signal(sig)
    }

    /// Adds a node spanning `first..=last`.
    pub fn node(
        &mut self,
        op: ExprOp,
        first: SourcePos,
        last: SourcePos,
        left: Option<ExprId>,
        right: Option<ExprId>,
    ) -> ExprId {
        self.design.add_expr(
            Expression::new(op, ExprSpan::new(first, last)).with_children(left, right),
        )
    }

    /// A reference to `signal` at its `nth` occurrence on `line`.
    pub fn sig(&mut self, signal: SignalId, line: u32, nth: usize) -> ExprId {
        let name = self.design.signals[signal].name.clone();
        let first = self.find(line, &name, nth);
        let op = if self.design.signals[signal].kind == SignalKind::Parameter {
            ExprOp::Param
        } else {
            ExprOp::Sig
        };
        let e = self.node(op, first, first.last_of(&name), None, None);
        self.design.exprs[e].signal = Some(signal);
        e
    }

    /// A literal at its `nth` occurrence on `line`.
    pub fn lit(&mut self, text: &str, line: u32, nth: usize) -> ExprId {
        let first = self.find(line, text, nth);
        self.design.add_expr(Expression::literal(
            text,
            ExprSpan::new(first, first.last_of(text)),
        ))
    }

    /// A binary node spanning both operands.
    pub fn binary(&mut self, op: ExprOp, left: ExprId, right: ExprId) -> ExprId {
        let first = self.design.exprs[left].span.first();
        let last = self.design.exprs[right].span.last();
        self.node(op, first, last, Some(left), Some(right))
    }

    /// A unary node whose operator symbol directly precedes the operand.
    pub fn unary(&mut self, op: ExprOp, operand: ExprId) -> ExprId {
        let span = self.design.exprs[operand].span;
        let symbol = op.unary_symbol().unwrap_or("");
        let text = self.line(span.first_line);
        let mut col = span.cols.first as usize - 1;
        while col > 0 && (text[col - 1] == ' ' || text[col - 1] == '(') {
            col -= 1;
        }
        let first = SourcePos::new(span.first_line, (col - symbol.chars().count()) as u32 + 1);
        let last = self.close_parens(first, span.last());
        self.node(op, first, last, Some(operand), None)
    }

    fn close_parens(&self, first: SourcePos, last: SourcePos) -> SourcePos {
        let text = self.line(first.line);
        let opened = text[first.col as usize - 1..last.col as usize]
            .iter()
            .filter(|c| **c == '(')
            .count();
        let closed = text[first.col as usize - 1..last.col as usize]
            .iter()
            .filter(|c| **c == ')')
            .count();
        let mut last = last;
        for _ in closed..opened {
            last = self.find_after(last, ")");
        }
        last
    }

    /// A select on `signal` at its `nth` occurrence on `line`, closing at
    /// the first `]` after the index operands.
    pub fn select(
        &mut self,
        op: ExprOp,
        signal: SignalId,
        line: u32,
        nth: usize,
        left: ExprId,
        right: Option<ExprId>,
    ) -> ExprId {
        let name = self.design.signals[signal].name.clone();
        let first = self.find(line, &name, nth);
        let inner = self.design.exprs[right.unwrap_or(left)].span.last();
        let last = self.find_after(inner, "]");
        let e = self.node(op, first, last, Some(left), right);
        self.design.exprs[e].signal = Some(signal);
        e
    }

    /// A two-level access `outer[..][..]` built from two selects.
    pub fn dim_select(&mut self, outer: ExprId, inner: ExprId) -> ExprId {
        let first = self.design.exprs[outer].span.first();
        let last = self.design.exprs[inner].span.last();
        let signal = self.design.exprs[outer].signal;
        let e = self.node(ExprOp::Dim, first, last, Some(outer), Some(inner));
        self.design.exprs[e].signal = signal;
        e
    }

    /// A call of `function` at its `nth` occurrence on `line`.
    pub fn call(&mut self, function: FunitId, line: u32, nth: usize, args: Option<ExprId>) -> ExprId {
        let name = self.design.funits[function].name.clone();
        let first = self.find(line, &name, nth);
        let inner = match args {
            Some(a) => self.design.exprs[a].span.last(),
            None => first.last_of(&name),
        };
        let last = self.find_after(inner, ")");
        let e = self.node(ExprOp::FuncCall, first, last, args, None);
        self.design.exprs[e].funit = Some(function);
        e
    }

    /// An assignment statement `lhs op rhs;` in `funit`.
    pub fn assign(&mut self, funit: FunitId, op: ExprOp, lhs: ExprId, rhs: ExprId) -> StmtId {
        let root = self.binary(op, lhs, rhs);
        let end = self.find_after(self.design.exprs[rhs].span.last(), ";");
        self.design.add_stmt(Statement::simple(root, funit, end))
    }

    /// A simple statement whose root was built by hand.
    pub fn simple(&mut self, funit: FunitId, root: ExprId) -> StmtId {
        let end = self.find_after(self.design.exprs[root].span.last(), ";");
        self.design.add_stmt(Statement::simple(root, funit, end))
    }

    /// A compound statement whose header starts at `keyword` and whose
    /// header closes at the first `)` after `left` (or at `header_end`).
    pub fn compound(
        &mut self,
        funit: FunitId,
        op: ExprOp,
        keyword: SourcePos,
        left: Option<ExprId>,
        header_end: Option<SourcePos>,
        end: SourcePos,
    ) -> StmtId {
        let header_end = match (header_end, left) {
            (Some(pos), _) => pos,
            (None, Some(l)) => self.find_after(self.design.exprs[l].span.last(), ")"),
            (None, None) => keyword,
        };
        let root = self.node(op, keyword, header_end, left, None);
        self.design
            .add_stmt(Statement::compound(root, funit, header_end, end))
    }

    /// Removes a statement from its scope list so it only exists as
    /// generate-item payload.
    pub fn detach(&mut self, stmt: StmtId) {
        let funit = self.design.stmts[stmt].funit;
        self.design.funits[funit].stmts.retain(|s| *s != stmt);
    }

    /// Adds a generate item.
    pub fn gen(&mut self, elem: GenElem) -> GenItemId {
        self.design.gen_items.alloc(elem)
    }

    /// Closes every dangling successor reachable from `from` onto `to`,
    /// flagging edges that rejoin the chain.
    pub fn connect(&mut self, from: GenItemId, to: GenItemId) {
        let graph = &mut self.design.gen_items;
        let conn_id = graph.next_conn_id();
        graph.connect(from, to, conn_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "module top;\n  wire a, b, x;\n  assign x = a & b;\nendmodule\n";

    #[test]
    fn module_positions() {
        let mut b = DesignBuilder::new("top.v", SRC);
        let m = b.module("top");
        let unit = &b.design().funits[m];
        assert_eq!(unit.start, SourcePos::new(1, 1));
        assert_eq!(unit.header_end, SourcePos::new(1, 11));
        assert_eq!(unit.end, SourcePos::new(4, 9));
    }

    #[test]
    fn word_search_skips_keywords() {
        let b = DesignBuilder::new("top.v", SRC);
        // `a` inside `assign` is not a word match.
        assert_eq!(b.find(3, "a", 0), SourcePos::new(3, 14));
        assert_eq!(b.find(3, "x", 0), SourcePos::new(3, 10));
    }

    #[test]
    fn assignment_statement() {
        let mut b = DesignBuilder::new("top.v", SRC);
        let m = b.module("top");
        let a = b.signal(m, "a", SignalKind::Wire);
        let bs = b.signal(m, "b", SignalKind::Wire);
        let x = b.signal(m, "x", SignalKind::Wire);
        let ea = b.sig(a, 3, 0);
        let eb = b.sig(bs, 3, 0);
        let and = b.binary(ExprOp::And, ea, eb);
        let ex = b.sig(x, 3, 0);
        let stmt = b.assign(m, ExprOp::Assign, ex, and);
        let d = b.finish();
        let span = d.exprs[and].span;
        assert_eq!(span.first(), SourcePos::new(3, 14));
        assert_eq!(span.last(), SourcePos::new(3, 18));
        assert_eq!(d.stmts[stmt].header_end, SourcePos::new(3, 19));
        assert_eq!(d.stmt_pos(stmt), SourcePos::new(3, 10));
    }

    #[test]
    fn block_finds_matching_end() {
        let src = "module m;\n  always begin : outer\n    begin\n    end\n  end\nendmodule\n";
        let mut b = DesignBuilder::new("m.v", src);
        let m = b.module("m");
        let blk = b.named_block(m, "outer");
        let unit = &b.design().funits[blk];
        assert_eq!(unit.start, SourcePos::new(2, 10));
        assert_eq!(unit.header_end, SourcePos::new(2, 22));
        assert_eq!(unit.end, SourcePos::new(5, 5));
    }

    #[test]
    fn unary_includes_symbol() {
        let src = "module m;\n  assign y = !a;\nendmodule\n";
        let mut b = DesignBuilder::new("m.v", src);
        let m = b.module("m");
        let a = b.signal(m, "a", SignalKind::Wire);
        let ea = b.sig(a, 2, 0);
        let not = b.unary(ExprOp::LogicNot, ea);
        let span = b.design().exprs[not].span;
        assert_eq!(span.first(), SourcePos::new(2, 14));
        assert_eq!(span.last(), SourcePos::new(2, 15));
    }
}
