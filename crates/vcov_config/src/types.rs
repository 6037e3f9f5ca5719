//! Configuration types deserialized from `vcov.toml`.

use serde::Deserialize;

/// The top-level configuration parsed from `vcov.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CoverageConfig {
    /// Which coverage metrics are scored.
    #[serde(default)]
    pub coverage: ScoredMetrics,
    /// Limits applied while synthesizing coverage code.
    #[serde(default)]
    pub inline: InlineLimits,
    /// Where instrumented files are written.
    #[serde(default)]
    pub output: OutputConfig,
}

/// The "scored" metric set: one switch per coverage metric.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScoredMetrics {
    /// Line coverage.
    #[serde(default = "enabled")]
    pub line: bool,
    /// Combinational (expression sub-term) coverage.
    #[serde(default = "enabled")]
    pub combinational: bool,
    /// Memory access coverage.
    #[serde(default = "enabled")]
    pub memory: bool,
    /// Event coverage.
    #[serde(default = "enabled")]
    pub event: bool,
    /// Finite-state-machine transition coverage.
    #[serde(default = "enabled")]
    pub fsm: bool,
}

fn enabled() -> bool {
    true
}

impl Default for ScoredMetrics {
    fn default() -> Self {
        Self {
            line: true,
            combinational: true,
            memory: true,
            event: true,
            fsm: true,
        }
    }
}

impl ScoredMetrics {
    /// Returns a metric set with every metric disabled.
    pub fn none() -> Self {
        Self {
            line: false,
            combinational: false,
            memory: false,
            event: false,
            fsm: false,
        }
    }

    /// Returns `true` if at least one metric is scored.
    pub fn any(&self) -> bool {
        self.line || self.combinational || self.memory || self.event || self.fsm
    }
}

/// Limits for the coverage code synthesizer.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InlineLimits {
    /// Maximum expression depth measured by combinational coverage (0 = unlimited).
    #[serde(default)]
    pub comb_depth: u32,
    /// Maximum number of generate-loop iterations in one elaboration.
    #[serde(default = "default_generate_iterations")]
    pub max_generate_iterations: u32,
    /// Longest output line the splice buffer accepts.
    #[serde(default = "default_line_length")]
    pub max_line_length: usize,
}

/// Upper bound accepted for [`InlineLimits::comb_depth`].
pub const MAX_COMB_DEPTH: u32 = 1024;

fn default_generate_iterations() -> u32 {
    65_536
}

fn default_line_length() -> usize {
    65_536
}

impl Default for InlineLimits {
    fn default() -> Self {
        Self {
            comb_depth: 0,
            max_generate_iterations: default_generate_iterations(),
            max_line_length: default_line_length(),
        }
    }
}

impl InlineLimits {
    /// Returns `true` if an expression node at `depth` (root = 0) may be measured.
    pub fn depth_allows(&self, depth: u32) -> bool {
        self.comb_depth == 0 || depth < self.comb_depth
    }
}

/// Output locations.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving one instrumented file per original design file.
    #[serde(default = "default_output_dir")]
    pub dir: String,
    /// File name (inside `dir`) of the instance-ID override fragment.
    #[serde(default = "default_instance_ids")]
    pub instance_ids: String,
}

fn default_output_dir() -> String {
    "covered/verilog".to_string()
}

fn default_instance_ids() -> String {
    "covered_instance_ids.v".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            instance_ids: default_instance_ids(),
        }
    }
}
