//! Questions answered by the assertion-detection collaborator.

use vcov_model::{Design, ExprId, FunitId};

/// Decides which scopes and expressions coverage must treat specially.
pub trait CoverageOracle {
    /// Returns `true` for scopes that only hold assertions; they receive no
    /// coverage code.
    fn is_assertion_unit(&self, _design: &Design, _funit: FunitId) -> bool {
        false
    }

    /// Returns `true` for expressions that must be measured even past the
    /// configured depth budget.
    fn is_required(&self, _design: &Design, _expr: ExprId) -> bool {
        false
    }
}

/// Oracle for designs without assertions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAssertions;

impl CoverageOracle for NoAssertions {}
