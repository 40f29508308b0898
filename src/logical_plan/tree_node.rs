use crate::Result;
use crate::expr::{AggregationAlias, Expr, GroupingAlias, WindowAlias};
use crate::logical_plan::{
    Aggregate, Distinct, Filter, LogicalPlan, Project, Sort, UnresolvedAggregate, Window,
};
use crate::tree_node::{Transformed, TreeNode, TreeNodeContainer, TreeNodeRecursion};

impl TreeNode for LogicalPlan {
    fn apply_children<'n, F: FnMut(&'n Self) -> Result<TreeNodeRecursion>>(
        &'n self,
        mut f: F,
    ) -> Result<TreeNodeRecursion> {
        for x in self.children() {
            if f(x)? == TreeNodeRecursion::Stop {
                return Ok(TreeNodeRecursion::Stop);
            }
        }
        Ok(TreeNodeRecursion::Continue)
    }

    fn map_children<F: FnMut(Self) -> Result<Transformed<Self>>>(
        self,
        f: F,
    ) -> Result<Transformed<Self>> {
        Ok(match self {
            LogicalPlan::Relation(_) => Transformed::no(self),
            LogicalPlan::Project(Project { project_list, child }) => child
                .map_elements(f)?
                .update_data(|child| LogicalPlan::Project(Project::new(project_list, child))),
            LogicalPlan::Filter(Filter { condition, child }) => child
                .map_elements(f)?
                .update_data(|child| LogicalPlan::Filter(Filter { condition, child })),
            LogicalPlan::Sort(Sort { order, child }) => child
                .map_elements(f)?
                .update_data(|child| LogicalPlan::Sort(Sort { order, child })),
            LogicalPlan::Distinct(Distinct { child }) => child
                .map_elements(f)?
                .update_data(|child| LogicalPlan::Distinct(Distinct { child })),
            LogicalPlan::UnresolvedAggregate(UnresolvedAggregate {
                child,
                keys,
                project_list,
                having_conditions,
                order,
            }) => child.map_elements(f)?.update_data(|child| {
                LogicalPlan::UnresolvedAggregate(UnresolvedAggregate {
                    child,
                    keys,
                    project_list,
                    having_conditions,
                    order,
                })
            }),
            LogicalPlan::Aggregate(Aggregate { child, key_aliases, agg_aliases }) => child
                .map_elements(f)?
                .update_data(|child| LogicalPlan::Aggregate(Aggregate { child, key_aliases, agg_aliases })),
            LogicalPlan::Window(Window { child, function_aliases }) => child
                .map_elements(f)?
                .update_data(|child| LogicalPlan::Window(Window { child, function_aliases })),
        })
    }
}

impl LogicalPlan {
    /// Rewrites all expressions in the current `LogicalPlan` node using `f`.
    ///
    /// Returns the current node.
    ///
    /// # Notes
    /// * Similar to [`TreeNode::map_children`] but for this node's expressions.
    /// * Visits only the top level expressions (does not recurse into each expression).
    pub fn map_expressions<F: FnMut(Expr) -> Result<Transformed<Expr>>>(
        self,
        mut f: F,
    ) -> Result<Transformed<Self>> {
        match self {
            LogicalPlan::Relation(_) | LogicalPlan::Distinct(_) => Ok(Transformed::no(self)),
            LogicalPlan::Project(Project { project_list, child }) => Ok(project_list
                .map_elements(f)?
                .update_data(|project_list| LogicalPlan::Project(Project { project_list, child }))),
            LogicalPlan::Filter(Filter { condition, child }) => {
                Ok(f(condition)?.update_data(|condition| LogicalPlan::Filter(Filter { condition, child })))
            }
            LogicalPlan::Sort(Sort { order, child }) => {
                let exprs: Vec<Expr> = order.iter().map(|o| o.expr.clone()).collect();
                Ok(exprs.map_elements(f)?.update_data(|exprs| {
                    let order = order
                        .iter()
                        .zip(exprs)
                        .map(|(o, expr)| crate::expr::SortOrder {
                            expr,
                            direction: o.direction,
                            null_ordering: o.null_ordering,
                        })
                        .collect();
                    LogicalPlan::Sort(Sort { order, child })
                }))
            }
            LogicalPlan::UnresolvedAggregate(UnresolvedAggregate {
                child,
                keys,
                project_list,
                having_conditions,
                order,
            }) => {
                let order_exprs: Vec<Expr> = order.iter().map(|o| o.expr.clone()).collect();
                Ok((keys, project_list, having_conditions, order_exprs).map_elements(f)?.update_data(
                    |(keys, project_list, having_conditions, order_exprs)| {
                        let order = order
                            .iter()
                            .zip(order_exprs)
                            .map(|(o, expr)| crate::expr::SortOrder {
                                expr,
                                direction: o.direction,
                                null_ordering: o.null_ordering,
                            })
                            .collect();
                        LogicalPlan::UnresolvedAggregate(UnresolvedAggregate {
                            child,
                            keys,
                            project_list,
                            having_conditions,
                            order,
                        })
                    },
                ))
            }
            LogicalPlan::Aggregate(Aggregate { child, key_aliases, agg_aliases }) => {
                let key_children: Vec<Expr> = key_aliases.iter().map(|a| a.child.as_ref().clone()).collect();
                let agg_children: Vec<Expr> = agg_aliases.iter().map(|a| a.child.as_ref().clone()).collect();
                Ok((key_children, agg_children).map_elements(f)?.update_data(|(key_children, agg_children)| {
                    let key_aliases = key_aliases
                        .iter()
                        .zip(key_children)
                        .map(|(alias, child)| GroupingAlias { child: Box::new(child), name: alias.name.clone(), expr_id: alias.expr_id })
                        .collect();
                    let agg_aliases = agg_aliases
                        .iter()
                        .zip(agg_children)
                        .map(|(alias, child)| AggregationAlias { child: Box::new(child), name: alias.name.clone(), expr_id: alias.expr_id })
                        .collect();
                    LogicalPlan::Aggregate(Aggregate { child, key_aliases, agg_aliases })
                }))
            }
            LogicalPlan::Window(Window { child, function_aliases }) => {
                let children: Vec<Expr> = function_aliases.iter().map(|a| a.child.as_ref().clone()).collect();
                Ok(children.map_elements(f)?.update_data(|children| {
                    let function_aliases = function_aliases
                        .iter()
                        .zip(children)
                        .map(|(alias, child)| WindowAlias { child: Box::new(child), name: alias.name.clone(), expr_id: alias.expr_id })
                        .collect();
                    LogicalPlan::Window(Window { child, function_aliases })
                }))
            }
        }
    }

    pub fn transform_up_expressions<F: FnMut(Expr) -> Result<Transformed<Expr>> + Copy>(
        self,
        f: F,
    ) -> Result<Transformed<Self>> {
        self.transform_up(|plan| plan.map_expressions(|expr| expr.transform_up(f)))
    }
}
