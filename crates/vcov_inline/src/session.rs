//! One generation session: the streaming state for one output file.
//!
//! The session sees the original text token by token. It recognizes the
//! tokens where scopes and statements begin and end, asks the planner for
//! coverage fragments and splices them into a [`SpliceBuffer`]. Everything
//! emitted before the outermost register insertion mark is popped stays in
//! the buffer so declarations can still be placed ahead of their use.

use crate::errors::InlineError;
use crate::fsm;
use crate::locate::StatementLocator;
use crate::names::INSTANCE_ID_PARAM;
use crate::oracle::CoverageOracle;
use crate::plan::{Plan, Planner};
use crate::replay::Token;
use std::collections::{HashMap, HashSet};
use vcov_common::{Ident, Interner};
use vcov_config::CoverageConfig;
use vcov_elaborate::instances_of;
use vcov_model::{Design, FunitId, FunitKind, StmtId};
use vcov_source::SourcePos;
use vcov_splice::SpliceBuffer;

/// Counters reported after a file is instrumented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Modules that received coverage code.
    pub modules: usize,
    /// Statements that received coverage code.
    pub statements: usize,
    /// Coverage signals declared.
    pub points: usize,
}

/// A module or generated block whose text is being replayed.
struct OpenScope {
    funit: FunitId,
    marked: bool,
    declared: HashSet<Ident>,
}

enum Stage {
    /// Waiting for the token holding the statement's own last character.
    Header,
    /// Waiting for the end of the construct to emit `closer`.
    Body { closer: String },
}

struct Pending {
    stmt: StmtId,
    plan: Plan,
    stage: Stage,
}

/// Streaming instrumentation of one source file.
pub struct Session<'a> {
    design: &'a Design,
    config: &'a CoverageConfig,
    planner: Planner<'a>,
    buf: SpliceBuffer,
    out: String,
    /// Scopes that open at a position, limited to instrumented modules and
    /// the generated blocks inside them.
    starts: HashMap<SourcePos, FunitId>,
    scopes: Vec<OpenScope>,
    locator: Option<StatementLocator<'a>>,
    pending: Vec<Pending>,
    interner: Interner,
    stats: SessionStats,
}

impl<'a> Session<'a> {
    /// Prepares a session for `file`. Modules with no elaborated instance
    /// are replayed unchanged.
    pub fn new(
        design: &'a Design,
        config: &'a CoverageConfig,
        oracle: &'a dyn CoverageOracle,
        file: &str,
    ) -> Self {
        let mut starts = HashMap::new();
        for funit in design.funits_in_file(file) {
            let unit = &design.funits[funit];
            let module = design.module_of(funit);
            let instrumented = !instances_of(design, module).is_empty() && !oracle.is_assertion_unit(design, module);
            let opens = match unit.kind {
                FunitKind::Module => true,
                FunitKind::NamedBlock => unit.generate_template,
                _ => false,
            };
            if instrumented && opens {
                starts.insert(unit.start, funit);
            }
        }
        Self {
            design,
            config,
            planner: Planner::new(design, config, oracle),
            buf: SpliceBuffer::new(config.inline.max_line_length),
            out: String::new(),
            starts,
            scopes: Vec::new(),
            locator: None,
            pending: Vec::new(),
            interner: Interner::new(),
            stats: SessionStats::default(),
        }
    }

    /// Processes one token of the original text.
    pub fn token(&mut self, token: &Token<'_>) -> Result<(), InlineError> {
        if !token.is_trivia() {
            self.before(token)?;
        }
        if self.coerces(token) {
            self.buf.emit_synthesized("reg")?;
        } else {
            self.buf.emit(token.text, token.pos, true)?;
        }
        if !token.is_trivia() {
            self.after(token)?;
        }
        if self.scopes.is_empty() && self.pending.is_empty() {
            self.out.push_str(&self.buf.flush_held()?);
        }
        Ok(())
    }

    /// Returns the instrumented text and the counters.
    pub fn finish(mut self) -> Result<(String, SessionStats), InlineError> {
        self.out.push_str(&self.buf.flush_held()?);
        Ok((self.out, self.stats))
    }

    fn before(&mut self, token: &Token<'_>) -> Result<(), InlineError> {
        if let Some(funit) = self.starts.get(&token.pos).copied() {
            self.open_scope(funit);
        }

        if self.scopes.last().is_some_and(|s| s.marked) {
            let found = match self.locator.as_mut() {
                Some(locator) => locator.at(token.pos),
                None => Vec::new(),
            };
            for stmt in found {
                self.start_statement(stmt)?;
            }
        }

        // Continuous assignment pairs go in front of the terminating `;`.
        if let Some(p) = self.pending.last() {
            let header_end = self.design.stmts[p.stmt].header_end;
            if p.plan.continuous && matches!(p.stage, Stage::Header) && token.covers(header_end) {
                if let Some(p) = self.pending.pop() {
                    self.buf.emit_synthesized(&p.plan.pairs.concat())?;
                }
            }
        }

        let design = self.design;
        let closing = self.scopes.last().map(|s| s.funit).filter(|f| {
            let unit = &design.funits[*f];
            let keyword = match unit.kind {
                FunitKind::Module => "endmodule",
                _ => "end",
            };
            token.text == keyword && token.covers(unit.end)
        });
        if let Some(funit) = closing {
            self.close_declarations(funit)?;
        }
        Ok(())
    }

    fn after(&mut self, token: &Token<'_>) -> Result<(), InlineError> {
        if let Some(scope) = self.scopes.last_mut() {
            if !scope.marked && token.covers(self.design.funits[scope.funit].header_end) {
                self.buf.push_mark();
                scope.marked = true;
            }
        }

        for i in (0..self.pending.len()).rev() {
            let header_end = self.design.stmts[self.pending[i].stmt].header_end;
            if matches!(self.pending[i].stage, Stage::Header) && token.covers(header_end) {
                self.finish_header(i)?;
            }
        }
        while let Some(p) = self.pending.last() {
            let end = self.design.stmts[p.stmt].end;
            match &p.stage {
                Stage::Body { closer } if token.covers(end) => {
                    let closer = closer.clone();
                    self.pending.pop();
                    self.buf.emit_synthesized(&closer)?;
                }
                _ => break,
            }
        }

        if let Some(scope) = self.scopes.last() {
            let unit = &self.design.funits[scope.funit];
            if scope.marked && token.covers(unit.end) {
                tracing::debug!(scope = %unit.name, "closing scope");
                self.buf.pop_mark()?;
                self.scopes.pop();
                if self.scopes.is_empty() {
                    self.locator = None;
                }
            }
        }
        Ok(())
    }

    fn open_scope(&mut self, funit: FunitId) {
        let unit = &self.design.funits[funit];
        if unit.kind == FunitKind::Module {
            tracing::debug!(module = %unit.name, "instrumenting module");
            self.locator = Some(StatementLocator::new(self.design, funit));
            self.stats.modules += 1;
        }
        self.scopes.push(OpenScope {
            funit,
            marked: false,
            declared: HashSet::new(),
        });
    }

    /// Declarations that belong at the end of a scope: state-transition
    /// captures, and the instance id parameter of a module.
    fn close_declarations(&mut self, funit: FunitId) -> Result<(), InlineError> {
        let mut text = String::new();
        if self.config.coverage.fsm {
            for decl in fsm::declarations(self.design, funit) {
                self.stats.points += 1;
                text.push_str(&decl);
                text.push('\n');
            }
        }
        if self.design.funits[funit].kind == FunitKind::Module {
            text.push_str(&format!("parameter {INSTANCE_ID_PARAM}= 0;\n"));
        }
        if !text.is_empty() {
            self.buf.flush_pending();
            self.buf.emit_synthesized(&text)?;
        }
        Ok(())
    }

    fn start_statement(&mut self, stmt: StmtId) -> Result<(), InlineError> {
        let Some(owner) = self.scopes.last().map(|s| s.funit) else {
            return Ok(());
        };
        self.design.reset_flags(stmt);
        self.buf.flush_pending();
        let plan = self.planner.plan(stmt, owner);
        if plan.is_empty() {
            return Ok(());
        }
        for (name, text) in &plan.decls {
            let ident = self.interner.get_or_intern(name);
            let fresh = self.scopes.last_mut().is_some_and(|s| s.declared.insert(ident));
            if fresh {
                self.buf.insert_at_mark(&format!("\n{text}"))?;
            }
        }
        self.stats.statements += 1;
        self.stats.points += plan.points();
        tracing::trace!(?stmt, "statement instrumented");
        self.pending.push(Pending {
            stmt,
            plan,
            stage: Stage::Header,
        });
        Ok(())
    }

    /// Splices what belongs around a statement once its own text has been
    /// emitted.
    fn finish_header(&mut self, index: usize) -> Result<(), InlineError> {
        let plan = &self.pending[index].plan;
        for (text, first, last) in &plan.replacements {
            self.buf.replace(text, *first, *last)?;
        }
        let wrap = !plan.pre.is_empty() || !plan.compound;
        if wrap {
            let mut open = String::from("begin ");
            for fragment in &plan.pre {
                open.push_str(fragment);
                open.push(' ');
            }
            self.buf.prepend(&open);
        }

        if !plan.compound {
            let mut close = String::from(" ");
            for fragment in &plan.post {
                close.push_str(fragment);
                close.push(' ');
            }
            close.push_str("end");
            self.buf.emit_synthesized(&close)?;
            self.pending.remove(index);
            return Ok(());
        }

        let mut closer = String::new();
        if let Some(body) = &plan.body {
            self.buf.emit_synthesized(body)?;
            closer.push_str(" end");
        }
        if wrap {
            closer.push_str(" end");
        }
        if closer.is_empty() {
            self.pending.remove(index);
        } else {
            self.pending[index].stage = Stage::Body { closer };
        }
        Ok(())
    }

    /// `event` declarations become `reg` when event coverage toggles them.
    fn coerces(&self, token: &Token<'_>) -> bool {
        token.text == "event" && self.config.coverage.event && !self.scopes.is_empty()
    }
}
