use std::sync::Arc;
use crate::Result;
use crate::expr::{
    Alias, AggregationAlias, AttributeReference, Expr, GroupingAlias, InternalAlias, SortOrder, WindowAlias,
};
use crate::tree_node::{Transformed, TreeNode, TreeNodeContainer, TreeNodeRecursion};
use crate::types::DataType;

#[derive(Clone, Debug, PartialEq)]
pub enum LogicalPlan {
    Relation(Relation),
    Project(Project),
    Filter(Filter),
    Sort(Sort),
    Distinct(Distinct),
    UnresolvedAggregate(UnresolvedAggregate),
    Aggregate(Aggregate),
    Window(Window),
}

impl LogicalPlan {
    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Relation(_) => vec![],
            LogicalPlan::Project(Project { child, .. })
            | LogicalPlan::Filter(Filter { child, .. })
            | LogicalPlan::Sort(Sort { child, .. })
            | LogicalPlan::Distinct(Distinct { child })
            | LogicalPlan::UnresolvedAggregate(UnresolvedAggregate { child, .. })
            | LogicalPlan::Aggregate(Aggregate { child, .. })
            | LogicalPlan::Window(Window { child, .. }) => vec![child.as_ref()],
        }
    }

    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            LogicalPlan::Relation(_) | LogicalPlan::Distinct(_) => vec![],
            LogicalPlan::Project(Project { project_list, .. }) => project_list.iter().collect(),
            LogicalPlan::Filter(Filter { condition, .. }) => vec![condition],
            LogicalPlan::Sort(Sort { order, .. }) => order.iter().map(|o| &o.expr).collect(),
            LogicalPlan::UnresolvedAggregate(UnresolvedAggregate {
                keys,
                project_list,
                having_conditions,
                order,
                ..
            }) => keys
                .iter()
                .chain(project_list.iter())
                .chain(having_conditions.iter())
                .chain(order.iter().map(|o| &o.expr))
                .collect(),
            LogicalPlan::Aggregate(Aggregate { key_aliases, agg_aliases, .. }) => key_aliases
                .iter()
                .map(|a| a.child())
                .chain(agg_aliases.iter().map(|a| a.child()))
                .collect(),
            LogicalPlan::Window(Window { function_aliases, .. }) => {
                function_aliases.iter().map(|a| a.child()).collect()
            }
        }
    }

    pub fn resolved(&self) -> bool {
        match self {
            LogicalPlan::Relation(_) => true,
            LogicalPlan::UnresolvedAggregate(_) => false,
            _ => self.expressions().iter().all(|e| e.resolved()) && self.children_resolved(),
        }
    }

    pub fn children_resolved(&self) -> bool {
        self.children().iter().all(|c| c.resolved())
    }

    pub fn output(&self) -> Vec<AttributeReference> {
        match self {
            LogicalPlan::Relation(Relation { output, .. }) => output.clone(),
            LogicalPlan::Project(Project { project_list, .. }) => named_output(project_list),
            LogicalPlan::Filter(Filter { child, .. }) => child.output(),
            LogicalPlan::Sort(Sort { child, .. }) => child.output(),
            LogicalPlan::Distinct(Distinct { child }) => child.output(),
            LogicalPlan::UnresolvedAggregate(UnresolvedAggregate { project_list, .. }) => named_output(project_list),
            LogicalPlan::Aggregate(Aggregate { key_aliases, agg_aliases, .. }) => key_aliases
                .iter()
                .map(|a| a.attr())
                .chain(agg_aliases.iter().map(|a| a.attr()))
                .collect(),
            LogicalPlan::Window(Window { child, function_aliases }) => {
                let mut output = child.output();
                output.extend(function_aliases.iter().map(|a| a.attr()));
                output
            }
        }
    }

    pub fn child_attributes(&self) -> Vec<AttributeReference> {
        self.children().into_iter().flat_map(|p| p.output().into_iter()).collect()
    }
}

pub(crate) fn named_output(exprs: &[Expr]) -> Vec<AttributeReference> {
    exprs
        .iter()
        .map(|e| match e {
            Expr::Alias(Alias { child, name, expr_id }) => {
                AttributeReference::new_with_expr_id(name.clone(), child.data_type().clone(), *expr_id)
            }
            Expr::AttributeReference(a) => a.clone(),
            Expr::UnresolvedAttribute(name) => {
                AttributeReference::new_with_expr_id(name.clone(), DataType::Null, 0)
            }
            e => panic!("{e:?} is not allowed in an output-producing expression list"),
        })
        .collect()
}

impl<'a> TreeNodeContainer<'a, Self> for LogicalPlan {
    fn apply_elements<F: FnMut(&'a Self) -> Result<TreeNodeRecursion>>(
        &'a self,
        mut f: F,
    ) -> Result<TreeNodeRecursion> {
        f(self)
    }

    fn map_elements<F: FnMut(Self) -> Result<Transformed<Self>>>(
        self,
        mut f: F,
    ) -> Result<Transformed<Self>> {
        f(self)
    }
}

/// A base table or view, already bound to a fixed output schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub name: String,
    pub output: Vec<AttributeReference>,
}

impl Relation {
    pub fn new(name: impl Into<String>, output: Vec<AttributeReference>) -> Self {
        Self { name: name.into(), output }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Project {
    pub project_list: Vec<Expr>,
    pub child: Arc<LogicalPlan>,
}

impl Project {
    pub fn new(project_list: Vec<Expr>, child: Arc<LogicalPlan>) -> Self {
        for expr in &project_list {
            match expr {
                Expr::Alias(_) | Expr::AttributeReference(_) | Expr::UnresolvedAttribute(_) => (),
                e => panic!("{e:?} is not allowed in project list"),
            }
        }
        Self { project_list, child }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub condition: Expr,
    pub child: Arc<LogicalPlan>,
}

impl Filter {
    pub fn new(condition: Expr, child: Arc<LogicalPlan>) -> Self {
        Self { condition, child }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sort {
    pub order: Vec<SortOrder>,
    pub child: Arc<LogicalPlan>,
}

impl Sort {
    pub fn new(order: Vec<SortOrder>, child: Arc<LogicalPlan>) -> Self {
        Self { order, child }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Distinct {
    pub child: Arc<LogicalPlan>,
}

impl Distinct {
    pub fn new(child: Arc<LogicalPlan>) -> Self {
        Self { child }
    }
}

/// The intermediate shape produced by SQL parsing for any query touching
/// `GROUP BY`, an aggregate function, `HAVING`, window functions, or
/// `DISTINCT` (after `RewriteDistinctsAsAggregates`). `ResolveAggregates`
/// replaces it with the canonical layered form once every clause is ready.
#[derive(Clone, Debug, PartialEq)]
pub struct UnresolvedAggregate {
    pub child: Arc<LogicalPlan>,
    pub keys: Vec<Expr>,
    pub project_list: Vec<Expr>,
    pub having_conditions: Vec<Expr>,
    pub order: Vec<SortOrder>,
}

impl UnresolvedAggregate {
    pub fn new(
        child: Arc<LogicalPlan>,
        keys: Vec<Expr>,
        project_list: Vec<Expr>,
        having_conditions: Vec<Expr>,
        order: Vec<SortOrder>,
    ) -> Self {
        Self { child, keys, project_list, having_conditions, order }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Aggregate {
    pub child: Arc<LogicalPlan>,
    pub key_aliases: Vec<GroupingAlias>,
    pub agg_aliases: Vec<AggregationAlias>,
}

impl Aggregate {
    pub fn new(child: Arc<LogicalPlan>, key_aliases: Vec<GroupingAlias>, agg_aliases: Vec<AggregationAlias>) -> Self {
        Self { child, key_aliases, agg_aliases }
    }
}

/// One layer of window evaluation. All `function_aliases` in a layer share
/// the same `WindowSpec`; distinct specs require stacking multiple layers.
#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    pub child: Arc<LogicalPlan>,
    pub function_aliases: Vec<WindowAlias>,
}

impl Window {
    pub fn new(child: Arc<LogicalPlan>, function_aliases: Vec<WindowAlias>) -> Self {
        Self { child, function_aliases }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn relation() -> Arc<LogicalPlan> {
        Arc::new(LogicalPlan::Relation(Relation::new(
            "t",
            vec![
                AttributeReference::new("a", DataType::Int),
                AttributeReference::new("b", DataType::Int),
            ],
        )))
    }

    #[test]
    fn relation_is_resolved_leaf() {
        let r = relation();
        assert!(r.resolved());
        assert!(r.children().is_empty());
    }

    #[test]
    fn unresolved_aggregate_is_never_resolved() {
        let r = relation();
        let output = r.output();
        let plan = LogicalPlan::UnresolvedAggregate(UnresolvedAggregate::new(
            r,
            vec![],
            output.into_iter().map(Expr::AttributeReference).collect(),
            vec![],
            vec![],
        ));
        assert!(!plan.resolved());
    }

    #[test]
    fn aggregate_output_is_keys_then_aggs() {
        let r = relation();
        let a = r.output()[0].clone();
        let key_alias = GroupingAlias::new(Expr::AttributeReference(a));
        let agg_alias = AggregationAlias::new(Expr::int_lit(1));
        let plan = LogicalPlan::Aggregate(Aggregate::new(r, vec![key_alias.clone()], vec![agg_alias.clone()]));
        let output = plan.output();
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].expr_id, key_alias.expr_id);
        assert_eq!(output[1].expr_id, agg_alias.expr_id);
    }

    #[test]
    fn project_requires_named_exprs() {
        let r = relation();
        let output = r.output();
        let plan = LogicalPlan::Project(Project::new(
            output.into_iter().map(Expr::AttributeReference).collect(),
            r,
        ));
        assert_eq!(plan.output().len(), 2);
        let _ = Value::Int(1);
    }
}
