//! Coverage code synthesis.
//!
//! A [`Session`] replays the text of one design file and splices coverage
//! code into it: a line-hit register per statement, operand captures for
//! combinational logic, element/index captures for memory accesses, edge
//! captures for event controls and state-transition wires for FSMs. The
//! declarations of all synthesized signals are hoisted to the start of the
//! enclosing module (or generated block) through the splice buffer's
//! register insertion marks.
//!
//! [`instrument_design`] runs a session per design file and writes the
//! results, together with the instance-id `defparam` fragment.

#![warn(missing_docs)]

pub mod codegen;
pub mod comb;
pub mod errors;
pub mod event;
pub mod fsm;
pub mod locate;
pub mod memory;
pub mod names;
pub mod oracle;
pub mod output;
pub mod plan;
pub mod replay;
pub mod session;
pub mod size;

pub use errors::InlineError;
pub use names::{coverage_name, CoverageKind, INSTANCE_ID_PARAM};
pub use oracle::{CoverageOracle, NoAssertions};
pub use output::{
    instance_id_fragment, instrument_design, instrument_source, output_path, prepare_output_dir, Summary,
};
pub use plan::{Measure, Plan, Planner, Shape};
pub use session::{Session, SessionStats};
pub use size::SizeExpr;
