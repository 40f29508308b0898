use crate::Result;
use crate::analysis::rule::AnalyzerRule;
use crate::logical_plan::LogicalPlan;

/// Drives a batch of `AnalyzerRule`s to a fixed point: each rule runs in
/// turn over the plan left by the previous one, and the whole batch repeats
/// until a full pass leaves every rule's output unchanged.
pub struct Analyzer {
    rules: Vec<Box<dyn AnalyzerRule>>,
}

const MAX_ITERATIONS: usize = 100;

impl Analyzer {
    pub fn new(rules: Vec<Box<dyn AnalyzerRule>>) -> Self {
        Self { rules }
    }

    pub fn analyze(&self, plan: LogicalPlan) -> Result<LogicalPlan> {
        let mut plan = plan;
        for _ in 0..MAX_ITERATIONS {
            let mut changed = false;
            for rule in &self.rules {
                let result = rule.analyze(plan)?;
                plan = result.data;
                changed |= result.transformed;
            }
            if !changed {
                return Ok(plan);
            }
        }
        Err(format!("analyzer did not reach a fixed point after {MAX_ITERATIONS} iterations of {:?}", self.rule_names()))
    }

    fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregation::aggregation_rules;
    use crate::expr::AttributeReference;
    use crate::logical_plan::{Distinct, Relation};
    use crate::types::DataType;
    use std::sync::Arc;

    #[test]
    fn reaches_a_fixed_point_on_an_already_resolved_plan() {
        let relation = Arc::new(LogicalPlan::Relation(Relation::new(
            "t",
            vec![AttributeReference::new("a", DataType::Int)],
        )));
        let resolved = Analyzer::new(aggregation_rules()).analyze(relation.as_ref().clone()).unwrap();
        assert_eq!(resolved, relation.as_ref().clone());
    }

    #[test]
    fn drives_distinct_all_the_way_to_a_project_over_an_aggregate() {
        let relation = Arc::new(LogicalPlan::Relation(Relation::new(
            "t",
            vec![AttributeReference::new("a", DataType::Int)],
        )));
        let plan = LogicalPlan::Distinct(Distinct::new(relation));
        let resolved = Analyzer::new(aggregation_rules()).analyze(plan).unwrap();
        assert!(matches!(resolved, LogicalPlan::Project(_)));
    }
}
