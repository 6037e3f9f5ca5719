//! Signals and their declared dimensions.

use crate::ids::{ExprId, FunitId};
use serde::{Deserialize, Serialize};

/// What kind of object a signal declaration introduces.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SignalKind {
    /// A net.
    Wire,
    /// A variable.
    Reg,
    /// A named event.
    Event,
    /// A generate loop variable.
    Genvar,
    /// A parameter or localparam.
    Parameter,
    /// A port declared without a separate net/variable declaration.
    Port,
}

/// One declared `[msb:lsb]` range.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Dimension {
    /// Left bound.
    pub msb: ExprId,
    /// Right bound.
    pub lsb: ExprId,
}

/// A declared signal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signal {
    /// Declared name.
    pub name: String,
    /// Declaration kind.
    pub kind: SignalKind,
    /// Declared `signed`.
    #[serde(default)]
    pub signed: bool,
    /// Packed dimensions, most significant first.
    #[serde(default)]
    pub packed: Vec<Dimension>,
    /// Unpacked (memory) dimensions, most significant first.
    #[serde(default)]
    pub unpacked: Vec<Dimension>,
    /// Default value for parameters.
    #[serde(default)]
    pub value: Option<ExprId>,
    /// Declaring scope.
    pub funit: FunitId,
}

impl Signal {
    /// Creates a scalar, unsigned signal.
    pub fn new(name: impl Into<String>, kind: SignalKind, funit: FunitId) -> Self {
        Self {
            name: name.into(),
            kind,
            signed: false,
            packed: Vec::new(),
            unpacked: Vec::new(),
            value: None,
            funit,
        }
    }

    /// Returns `true` for memories.
    pub fn is_memory(&self) -> bool {
        !self.unpacked.is_empty()
    }

    /// Width of a declaration without packed dimensions.
    pub fn implicit_width(&self) -> u32 {
        match self.kind {
            SignalKind::Genvar | SignalKind::Parameter => 32,
            _ => 1,
        }
    }
}
