//! The design model consumed by the coverage instrumenter.
//!
//! An external parser/elaborator hands over functional units, statements,
//! expression trees, signals, FSM tables and generate-item graphs. Everything
//! lives in [`Arena`]s inside one [`Design`] and refers to everything else by
//! typed id. [`FunitIter`] walks a functional unit's statements in source
//! position order, merged across its anonymous nested scopes.

#![warn(missing_docs)]

pub mod arena;
#[cfg(any(test, feature = "testing"))]
pub mod builder;
pub mod design;
pub mod expr;
pub mod funit;
pub mod gen_item;
pub mod ids;
pub mod instance;
pub mod iter;
pub mod signal;
pub mod stmt;

pub use arena::{Arena, ArenaId};
#[cfg(any(test, feature = "testing"))]
pub use builder::DesignBuilder;
pub use design::Design;
pub use expr::{ExprFlags, ExprOp, ExprParent, ExprSpan, Expression};
pub use funit::{Fsm, FunctionalUnit, FunitKind, Instantiation, ParamOverride};
pub use gen_item::{GenElem, GenGraph, GenItem};
pub use ids::{ExprId, FunitId, GenItemId, InstId, SignalId, StmtId};
pub use instance::{ElabItem, ElabKind, Instance};
pub use iter::FunitIter;
pub use signal::{Dimension, Signal, SignalKind};
pub use stmt::Statement;
