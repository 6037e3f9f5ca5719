//! Expression trees.
//!
//! Expressions are owned top-down by their statement through `left`/`right`
//! child ids. The `parent` link is a non-owning back-reference filled in by
//! [`Design::link_parents`](crate::Design::link_parents).

use crate::ids::{ExprId, FunitId, SignalId, StmtId};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use vcov_source::{ColumnRange, SourcePos};

/// Operator tag of an expression node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ExprOp {
    /// A numeric literal; its text is in [`Expression::literal`].
    Static,
    /// A reference to a signal.
    Sig,
    /// A reference to a parameter.
    Param,
    /// Single-bit (or single-element) select `x[i]`; `left` is the index.
    SbitSel,
    /// Part select `x[msb:lsb]`; `left` is msb, `right` is lsb.
    MbitSel,
    /// Indexed part select `x[base +: width]`.
    MbitPos,
    /// Indexed part select `x[base -: width]`.
    MbitNeg,
    /// Multi-dimensional access; `left` is the outer select, `right` the next one.
    Dim,
    /// Concatenation `{...}`; `left` is the item or item list.
    Concat,
    /// Replication `{n{...}}`; `left` is the count, `right` the value.
    Expand,
    /// Comma separated list; `left` is the first item, `right` the rest.
    List,
    /// Bitwise negation `~`.
    Not,
    /// Arithmetic negation `-`.
    Neg,
    /// Logical negation `!`.
    LogicNot,
    /// Reduction `&`.
    UAnd,
    /// Reduction `|`.
    UOr,
    /// Reduction `^`.
    UXor,
    /// Reduction `~&`.
    UNand,
    /// Reduction `~|`.
    UNor,
    /// Reduction `~^`.
    UNxor,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `<<`
    Lshift,
    /// `>>`
    Rshift,
    /// `<<<`
    Alshift,
    /// `>>>`
    Arshift,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `~&`
    Nand,
    /// `~|`
    Nor,
    /// `~^`
    Nxor,
    /// `&&`
    LAnd,
    /// `||`
    LOr,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=` used as comparison.
    Le,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `===`
    Ceq,
    /// `!==`
    Cne,
    /// `c ? a : b`; `left` is the condition, `right` a [`ExprOp::CondSel`].
    Cond,
    /// The `a : b` arms of a conditional.
    CondSel,
    /// User function call; arguments hang off `left`.
    FuncCall,
    /// System function call such as `$clog2`; name is in [`Expression::name`].
    SysCall,
    /// `posedge x`
    Posedge,
    /// `negedge x`
    Negedge,
    /// Any change of `x`, or a named event.
    AEdge,
    /// `a or b` / `a, b` in an event list.
    Eor,
    /// Continuous assignment `assign l = r;`.
    Assign,
    /// Blocking assignment `l = r;`.
    BAssign,
    /// Non-blocking assignment `l <= r;`.
    NbAssign,
    /// `if (cond)`; `left` is the condition.
    If,
    /// `while (cond)`
    While,
    /// `for (...)`; `left` is the condition.
    For,
    /// `repeat (n)`
    Repeat,
    /// `forever`
    Forever,
    /// `wait (cond)`
    Wait,
    /// `#delay`
    Delay,
    /// `@(...)`; `left` is the event expression, absent for `@*`.
    EventCtrl,
    /// `-> e;`
    Trigger,
    /// Task enable statement.
    TaskCall,
    /// `case (sel)`; `left` is the selector.
    Case,
    /// `casex (sel)`
    Casex,
    /// `casez (sel)`
    Casez,
    /// A case item; `left` is the selector, `right` the value or value list.
    CaseItem,
    /// The `default` case item.
    DefaultItem,
    /// The null statement `;`.
    Null,
    /// Genvar assignment in a generate loop header.
    GenAssign,
}

impl ExprOp {
    /// Verilog text of a binary operator.
    pub fn binary_symbol(self) -> Option<&'static str> {
        use ExprOp::*;
        Some(match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Pow => "**",
            Lshift => "<<",
            Rshift => ">>",
            Alshift => "<<<",
            Arshift => ">>>",
            And => "&",
            Or => "|",
            Xor => "^",
            Nand => "~&",
            Nor => "~|",
            Nxor => "~^",
            LAnd => "&&",
            LOr => "||",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            Eq => "==",
            Ne => "!=",
            Ceq => "===",
            Cne => "!==",
            _ => return None,
        })
    }

    /// Verilog text of a unary operator.
    pub fn unary_symbol(self) -> Option<&'static str> {
        use ExprOp::*;
        Some(match self {
            Not => "~",
            Neg => "-",
            LogicNot => "!",
            UAnd => "&",
            UOr => "|",
            UXor => "^",
            UNand => "~&",
            UNor => "~|",
            UNxor => "~^",
            _ => return None,
        })
    }

    /// Two-operand logic operators measured with a 2-bit polarity capture.
    pub fn is_combinational(self) -> bool {
        use ExprOp::*;
        matches!(self, And | Or | Xor | Nand | Nor | Nxor | LAnd | LOr)
    }

    /// Operators with a 1-bit result measured with a unary capture.
    pub fn is_unary_measurable(self) -> bool {
        use ExprOp::*;
        matches!(
            self,
            Lt | Gt | Le | Ge | Eq | Ne | Ceq | Cne | UAnd | UOr | UXor | UNand | UNor | UNxor
                | LogicNot
        )
    }

    /// Operators whose result is always one bit wide.
    pub fn is_one_bit(self) -> bool {
        use ExprOp::*;
        self.is_unary_measurable() || matches!(self, LAnd | LOr)
    }

    /// Signal references and selects.
    pub fn is_reference(self) -> bool {
        use ExprOp::*;
        matches!(self, Sig | Param | SbitSel | MbitSel | MbitPos | MbitNeg | Dim)
    }

    /// Selects applied to a bound signal.
    pub fn is_select(self) -> bool {
        use ExprOp::*;
        matches!(self, SbitSel | MbitSel | MbitPos | MbitNeg)
    }

    /// Event-list terms.
    pub fn is_event_term(self) -> bool {
        use ExprOp::*;
        matches!(self, Posedge | Negedge | AEdge | Eor)
    }

    /// Operators that only ever appear as a statement root.
    pub fn is_statement_root(self) -> bool {
        use ExprOp::*;
        matches!(
            self,
            Assign
                | BAssign
                | NbAssign
                | If
                | While
                | For
                | Repeat
                | Forever
                | Wait
                | Delay
                | EventCtrl
                | Trigger
                | TaskCall
                | Case
                | Casex
                | Casez
                | CaseItem
                | DefaultItem
                | Null
                | GenAssign
        )
    }

    /// Statement roots whose own text ends before the construct does.
    pub fn is_compound(self) -> bool {
        use ExprOp::*;
        matches!(
            self,
            If | While
                | For
                | Repeat
                | Forever
                | Wait
                | Delay
                | EventCtrl
                | Case
                | Casex
                | Casez
                | CaseItem
                | DefaultItem
        )
    }

    /// Assignments, whose `left` child is a target rather than a value.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            ExprOp::Assign | ExprOp::BAssign | ExprOp::NbAssign | ExprOp::GenAssign
        )
    }
}

/// Source extent of an expression, in the form coverage names encode it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct ExprSpan {
    /// First line (1-based).
    pub first_line: u32,
    /// Last line (1-based, inclusive).
    pub last_line: u32,
    /// First and last column.
    pub cols: ColumnRange,
}

impl ExprSpan {
    /// Builds a span from its first and last character positions.
    pub fn new(first: SourcePos, last: SourcePos) -> Self {
        Self {
            first_line: first.line,
            last_line: last.line,
            cols: ColumnRange::new(first.col as u16, last.col as u16),
        }
    }

    /// Position of the first character.
    pub fn first(&self) -> SourcePos {
        SourcePos::new(self.first_line, u32::from(self.cols.first))
    }

    /// Position of the last character.
    pub fn last(&self) -> SourcePos {
        SourcePos::new(self.last_line, u32::from(self.cols.last))
    }

    /// Returns `true` if `pos` lies inside this span.
    pub fn contains(&self, pos: SourcePos) -> bool {
        self.first() <= pos && pos <= self.last()
    }

    /// Returns `true` if `other` lies entirely inside this span.
    pub fn encloses(&self, other: &ExprSpan) -> bool {
        self.contains(other.first()) && self.contains(other.last())
    }
}

/// Non-owning link from a node to whatever holds it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ExprParent {
    /// The node is a child of another expression.
    Expr(ExprId),
    /// The node is the root expression of a statement.
    Stmt(StmtId),
}

/// Transient instrumentation flags, reset at the start of every statement.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ExprFlags {
    /// The node's value has already been computed (or captured) once.
    pub evaluated_once: bool,
    /// A temporary holding this node's value has been synthesized.
    pub already_has_temp: bool,
    /// The node is the target of an assignment.
    pub is_lhs: bool,
    /// Combinational coverage has been synthesized for this node.
    pub comb_counted: bool,
}

/// An expression node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expression {
    /// Operator tag.
    pub op: ExprOp,
    /// Source extent.
    #[serde(default)]
    pub span: ExprSpan,
    /// Left (or only) child.
    #[serde(default)]
    pub left: Option<ExprId>,
    /// Right child.
    #[serde(default)]
    pub right: Option<ExprId>,
    /// Bound signal for references, selects and genvar assignments.
    #[serde(default)]
    pub signal: Option<SignalId>,
    /// Called function or task.
    #[serde(default)]
    pub funit: Option<FunitId>,
    /// Literal text for [`ExprOp::Static`].
    #[serde(default)]
    pub literal: Option<String>,
    /// Identifier text for unbound references and system calls.
    #[serde(default)]
    pub name: Option<String>,
    /// Non-owning back-reference, rebuilt by `link_parents`.
    #[serde(skip)]
    pub parent: Option<ExprParent>,
    #[serde(skip)]
    flags: Cell<ExprFlags>,
}

impl Expression {
    /// Creates a childless node.
    pub fn new(op: ExprOp, span: ExprSpan) -> Self {
        Self {
            op,
            span,
            left: None,
            right: None,
            signal: None,
            funit: None,
            literal: None,
            name: None,
            parent: None,
            flags: Cell::new(ExprFlags::default()),
        }
    }

    /// Creates a literal node.
    pub fn literal(text: impl Into<String>, span: ExprSpan) -> Self {
        let mut e = Self::new(ExprOp::Static, span);
        e.literal = Some(text.into());
        e
    }

    /// Sets both children.
    pub fn with_children(mut self, left: Option<ExprId>, right: Option<ExprId>) -> Self {
        self.left = left;
        self.right = right;
        self
    }

    /// Binds the node to a signal.
    pub fn with_signal(mut self, signal: SignalId) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Returns the current flag set.
    pub fn flags(&self) -> ExprFlags {
        self.flags.get()
    }

    /// Replaces the flag set.
    pub fn set_flags(&self, flags: ExprFlags) {
        self.flags.set(flags);
    }

    /// Updates the flag set in place.
    pub fn update_flags(&self, f: impl FnOnce(&mut ExprFlags)) {
        let mut flags = self.flags.get();
        f(&mut flags);
        self.flags.set(flags);
    }

    /// Clears all transient flags except `is_lhs`, which is structural.
    pub fn reset_flags(&self) {
        let is_lhs = self.flags.get().is_lhs;
        self.flags.set(ExprFlags {
            is_lhs,
            ..ExprFlags::default()
        });
    }

    /// Iterates over the present children, left first.
    pub fn children(&self) -> impl Iterator<Item = ExprId> {
        self.left.into_iter().chain(self.right)
    }
}
