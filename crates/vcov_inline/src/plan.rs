//! Coverage planning for a single statement.
//!
//! A [`Plan`] is everything the session has to splice around one statement:
//! declarations for the insertion mark, assignments that run before and
//! after it, the pairs appended to a continuous assignment, the capture
//! that opens an event control's body, and source replacements.

use crate::codegen::{declaration, list_items, NetKind, Renderer};
use crate::comb::CombWalker;
use crate::event;
use crate::memory;
use crate::names::{coverage_name, relative_scope, CoverageKind};
use crate::oracle::CoverageOracle;
use crate::size::{expr_width, SizeExpr};
use vcov_config::CoverageConfig;
use vcov_model::{Design, ExprId, ExprOp, ExprParent, ExprSpan, FunitId, Statement, StmtId};
use vcov_source::SourcePos;

/// What a coverage signal captures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// `{(l > 0), (r > 0)}` for a two-operand logic operator.
    Polarity {
        /// Left operand.
        left: ExprId,
        /// Right operand.
        right: ExprId,
        /// Compare with `!= 0` instead of `> 0`.
        signed: bool,
    },
    /// The one-bit truth value of an expression.
    Truth(ExprId),
    /// A memory element and its index as it is written.
    MemWrite {
        /// The select chain being assigned.
        access: ExprId,
        /// The assigned value.
        value: ExprId,
    },
    /// A memory element and its index as it is read.
    MemRead {
        /// The select chain being read.
        access: ExprId,
    },
    /// Whether a case item matches its selector.
    CaseItem {
        /// The case selector.
        selector: ExprId,
        /// Item values.
        values: Vec<ExprId>,
    },
    /// Which terms of an event control fired.
    Event {
        /// Event terms in source order.
        terms: Vec<ExprId>,
    },
}

impl Shape {
    /// Expressions whose values the capture reads.
    fn operands(&self) -> Vec<ExprId> {
        match self {
            Shape::Polarity { left, right, .. } => vec![*left, *right],
            Shape::Truth(id) => vec![*id],
            Shape::MemWrite { access, value } => vec![*access, *value],
            Shape::MemRead { access } => vec![*access],
            Shape::CaseItem { selector, values } => std::iter::once(*selector).chain(values.iter().copied()).collect(),
            Shape::Event { .. } => Vec::new(),
        }
    }
}

/// One coverage signal to synthesize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Measure {
    /// Metric and name prefix.
    pub kind: CoverageKind,
    /// Span the signal name is derived from.
    pub span: ExprSpan,
    /// Declared width.
    pub width: SizeExpr,
    /// Captured value.
    pub shape: Shape,
}

/// Fragments to splice around one statement.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    /// Continuous assignment; captures become `, name = value` pairs.
    pub continuous: bool,
    /// Statement with a header distinct from its end.
    pub compound: bool,
    /// `(name, declaration)` pairs for the insertion mark.
    pub decls: Vec<(String, String)>,
    /// Assignments run before the statement.
    pub pre: Vec<String>,
    /// Assignments run after the statement.
    pub post: Vec<String>,
    /// Extra net assignments of a continuous assignment.
    pub pairs: Vec<String>,
    /// Text opening the body of an event control.
    pub body: Option<String>,
    /// `(text, first, last)` source replacements.
    pub replacements: Vec<(String, SourcePos, SourcePos)>,
}

impl Plan {
    /// Returns `true` when nothing needs to be spliced.
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
            && self.pre.is_empty()
            && self.post.is_empty()
            && self.pairs.is_empty()
            && self.body.is_none()
            && self.replacements.is_empty()
    }

    /// Number of coverage signals declared, temporaries excluded.
    pub fn points(&self) -> usize {
        self.decls
            .iter()
            .filter(|(name, _)| !name.starts_with("\\covered$X"))
            .count()
    }

    fn declare(&mut self, kind: NetKind, width: &SizeExpr, name: &str) {
        self.decls.push((name.to_string(), declaration(kind, width, name)));
    }

    fn net(&self) -> NetKind {
        if self.continuous {
            NetKind::Wire
        } else {
            NetKind::Reg
        }
    }

    fn assign(&mut self, name: &str, value: &str) {
        if self.continuous {
            self.pairs.push(format!(", {name}= {value}"));
        } else {
            self.pre.push(format!("{name}= {value};"));
        }
    }
}

/// Builds plans from the configured metrics.
pub struct Planner<'a> {
    design: &'a Design,
    config: &'a CoverageConfig,
    oracle: &'a dyn CoverageOracle,
}

impl<'a> Planner<'a> {
    /// Creates a planner.
    pub fn new(design: &'a Design, config: &'a CoverageConfig, oracle: &'a dyn CoverageOracle) -> Self {
        Self { design, config, oracle }
    }

    /// Plans coverage for `stmt`. Signal names are scoped relative to
    /// `owner`, the scope holding the active insertion mark.
    pub fn plan(&self, stmt_id: StmtId, owner: FunitId) -> Plan {
        let design = self.design;
        let stmt = &design.stmts[stmt_id];
        let root = &design.exprs[stmt.expr];
        let mut plan = Plan {
            continuous: root.op == ExprOp::Assign,
            compound: stmt.head,
            ..Plan::default()
        };
        if design.in_static_function(stmt.funit) || self.oracle.is_assertion_unit(design, stmt.funit) {
            return plan;
        }
        let scope = relative_scope(design, owner, stmt.funit);
        let metrics = &self.config.coverage;

        let mut measures = Vec::new();
        if metrics.combinational {
            measures.extend(CombWalker::new(design, &self.config.inline, self.oracle).statement(stmt_id));
            if root.op == ExprOp::Case {
                measures.extend(case_items(design, stmt));
            }
        }
        if metrics.memory {
            measures.extend(memory::collect(design, stmt_id));
        }

        let line = metrics.line && has_line_coverage(root.op);
        if line && plan.compound {
            let name = coverage_name(CoverageKind::Line, root.span, &scope);
            plan.declare(NetKind::Reg, &SizeExpr::Const(1), &name);
            plan.pre.push(format!("{name}= 1'b1;"));
        }

        let mut r = Renderer::new(design);
        if !plan.continuous {
            self.temporaries(&measures, &scope, &mut r, &mut plan);
        }
        for m in &measures {
            let name = coverage_name(m.kind, m.span, &scope);
            plan.declare(plan.net(), &m.width, &name);
            plan.assign(&name, &capture(&r, m));
        }

        if metrics.event {
            match root.op {
                ExprOp::EventCtrl => {
                    if let Some(m) = event::measure(design, stmt.expr) {
                        let name = coverage_name(m.kind, m.span, &scope);
                        plan.declare(NetKind::Reg, &m.width, &name);
                        plan.body = Some(format!(" begin {name}= {};", capture(&r, &m)));
                    }
                }
                ExprOp::Trigger => {
                    if let Some(target) = root.left {
                        let text = event::trigger_text(&r, target);
                        plan.replacements.push((text, root.span.first(), stmt.header_end));
                    }
                }
                _ => {}
            }
        }

        if line && !plan.compound {
            let name = coverage_name(CoverageKind::Line, root.span, &scope);
            if plan.continuous {
                plan.declare(NetKind::Wire, &SizeExpr::Const(1), &name);
                plan.pairs.push(format!(", {name}= 1'b1"));
            } else {
                plan.declare(NetKind::Reg, &SizeExpr::Const(1), &name);
                plan.post.push(format!("{name}= 1'b1;"));
            }
        }
        tracing::trace!(stmt = ?stmt_id, signals = plan.decls.len(), "planned statement");
        plan
    }

    /// Materializes function calls read by captures so the call runs once.
    fn temporaries(&self, measures: &[Measure], scope: &str, r: &mut Renderer<'a>, plan: &mut Plan) {
        let design = self.design;
        for m in measures {
            for operand in m.shape.operands() {
                for call in outer_calls(design, operand) {
                    let node = &design.exprs[call];
                    if node.flags().already_has_temp {
                        continue;
                    }
                    let name = coverage_name(CoverageKind::Temporary, node.span, scope);
                    plan.declare(NetKind::Reg, &expr_width(design, call), &name);
                    plan.pre.push(format!("{name}= {};", r.render(call)));
                    r.substitute(call, name.clone());
                    plan.replacements.push((name, node.span.first(), node.span.last()));
                    node.update_flags(|f| {
                        f.already_has_temp = true;
                        f.evaluated_once = true;
                    });
                }
            }
        }
    }
}

/// Statements that get a line-hit signal.
fn has_line_coverage(op: ExprOp) -> bool {
    !matches!(
        op,
        ExprOp::CaseItem
            | ExprOp::DefaultItem
            | ExprOp::EventCtrl
            | ExprOp::Delay
            | ExprOp::Wait
            | ExprOp::Null
            | ExprOp::GenAssign
    )
}

fn case_items(design: &Design, stmt: &Statement) -> Vec<Measure> {
    stmt.items
        .iter()
        .filter_map(|item| {
            let node = &design.exprs[design.stmts[*item].expr];
            if node.op != ExprOp::CaseItem {
                return None;
            }
            let selector = node.left?;
            let values = list_items(design, node.right?);
            Some(Measure {
                kind: CoverageKind::CaseItem,
                span: node.span,
                width: SizeExpr::Const(1),
                shape: Shape::CaseItem { selector, values },
            })
        })
        .collect()
}

/// Function calls in the tree under `id` that are not nested in another call.
fn outer_calls(design: &Design, id: ExprId) -> Vec<ExprId> {
    if inside_call(design, id) {
        return Vec::new();
    }
    let mut calls = Vec::new();
    let mut stack = vec![id];
    while let Some(e) = stack.pop() {
        let node = &design.exprs[e];
        if node.op == ExprOp::FuncCall {
            calls.push(e);
            continue;
        }
        stack.extend(node.right);
        stack.extend(node.left);
    }
    calls
}

fn inside_call(design: &Design, id: ExprId) -> bool {
    let mut current = design.exprs[id].parent;
    while let Some(ExprParent::Expr(parent)) = current {
        if design.exprs[parent].op == ExprOp::FuncCall {
            return true;
        }
        current = design.exprs[parent].parent;
    }
    false
}

/// Verilog text of the value a coverage signal captures.
pub fn capture(r: &Renderer<'_>, m: &Measure) -> String {
    let design = r.design();
    match &m.shape {
        Shape::Polarity { left, right, signed } => {
            let test = if *signed { "!= 0" } else { "> 0" };
            format!("{{({} {test}), ({} {test})}}", r.wrap(*left), r.wrap(*right))
        }
        Shape::Truth(id) => {
            if design.exprs[*id].op.is_one_bit() {
                r.wrap(*id)
            } else {
                format!("({} != 0)", r.wrap(*id))
            }
        }
        Shape::MemWrite { access, value } => pack(r, r.wrap(*value), *access),
        Shape::MemRead { access } => pack(r, r.render(*access), *access),
        Shape::CaseItem { selector, values } => values
            .iter()
            .map(|v| format!("({} === {})", r.wrap(*selector), r.wrap(*v)))
            .collect::<Vec<_>>()
            .join(" || "),
        Shape::Event { terms } => {
            let bits: Vec<String> = terms.iter().map(|t| event::term_value(r, *t)).collect();
            if bits.len() == 1 {
                bits.concat()
            } else {
                format!("{{{}}}", bits.join(", "))
            }
        }
    }
}

/// Places the element above its flattened index. Shifting instead of
/// concatenating keeps an unsized index expression from widening the
/// element out of the declared range.
fn pack(r: &Renderer<'_>, element: String, access: ExprId) -> String {
    let width = memory::index_width(r.design(), access);
    let index = memory::flat_index(r, access);
    format!("({element} << {}) | {}", width.render(), index.render())
}
