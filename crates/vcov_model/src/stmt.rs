//! Statements.

use crate::ids::{ExprId, FunitId, StmtId};
use serde::{Deserialize, Serialize};
use vcov_source::SourcePos;

/// A statement wrapping a root expression.
///
/// `header_end` is the last character of the statement's own text: the `;`
/// of a simple statement, the closing `)` of a compound header, the `:` of a
/// case item. `end` is the last character of the whole construct and equals
/// `header_end` for simple statements.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Statement {
    /// Root expression.
    pub expr: ExprId,
    /// Functional unit the statement belongs to.
    pub funit: FunitId,
    /// Entry point of a loop or branch.
    #[serde(default)]
    pub head: bool,
    /// Last character of the statement's own text.
    pub header_end: SourcePos,
    /// Last character of the whole construct.
    pub end: SourcePos,
    /// Case items of a `case` statement, in source order.
    #[serde(default)]
    pub items: Vec<StmtId>,
}

impl Statement {
    /// Creates a simple statement ending at `end`.
    pub fn simple(expr: ExprId, funit: FunitId, end: SourcePos) -> Self {
        Self {
            expr,
            funit,
            head: false,
            header_end: end,
            end,
            items: Vec::new(),
        }
    }

    /// Creates a compound statement whose header ends before the construct does.
    pub fn compound(expr: ExprId, funit: FunitId, header_end: SourcePos, end: SourcePos) -> Self {
        Self {
            expr,
            funit,
            head: true,
            header_end,
            end,
            items: Vec::new(),
        }
    }
}
