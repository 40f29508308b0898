use std::fmt::Debug;
use crate::Result;
use crate::logical_plan::LogicalPlan;
use crate::tree_node::Transformed;

/// A single rewrite step in the analyzer. Rules are applied top-down inside
/// a fixed-point loop driven by `Analyzer`; each rule must be safe to apply
/// repeatedly to its own output (idempotent once it no longer matches).
pub trait AnalyzerRule: Debug {
    /// Rewrite `plan`.
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>>;

    /// A human readable name for this analyzer rule.
    fn name(&self) -> &str;
}
