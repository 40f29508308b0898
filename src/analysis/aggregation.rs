use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, trace};

use crate::Result;
use crate::analysis::error::*;
use crate::analysis::rule::AnalyzerRule;
use crate::expr::{
    Alias, AggregationAlias, Expr, GroupingAlias, InternalAlias, SortOrder, WindowAlias, WindowFunction, WindowSpec,
    restorer, rewriter,
};
use crate::logical_plan::logical_plan::named_output;
use crate::logical_plan::{Aggregate, Distinct, Filter, LogicalPlan, Project, Sort, UnresolvedAggregate, Window};
use crate::tree_node::{Transformed, TreeNode, TreeNodeRecursion};

// ---------------------------------------------------------------------
// Aggregate / window detection
// ---------------------------------------------------------------------

fn dedup(exprs: Vec<Expr>) -> Vec<Expr> {
    let mut out: Vec<Expr> = Vec::new();
    for e in exprs {
        if !out.contains(&e) {
            out.push(e);
        }
    }
    out
}

fn collect_matching(e: &Expr, pred: &dyn Fn(&Expr) -> bool) -> Vec<Expr> {
    let mut out = Vec::new();
    e.apply(|node| {
        if pred(node) {
            out.push(node.clone());
        }
        Ok(TreeNodeRecursion::Continue)
    })
    .expect("Expr::apply never errs");
    out
}

/// Replaces every `WindowFunction` node with a fresh `WindowAlias` attribute.
/// `Jump` stops the traversal from also descending into the node we just
/// replaced, so a window function can never be "found" twice.
fn eliminate_window_functions(e: &Expr) -> Expr {
    e.clone()
        .transform_down(|node| match node {
            Expr::WindowFunction(w) => {
                let alias = WindowAlias::new(Expr::WindowFunction(w));
                Ok(Transformed::new(Expr::AttributeReference(alias.attr()), true, TreeNodeRecursion::Jump))
            }
            other => Ok(Transformed::no(other)),
        })
        .expect("Expr::transform_down never errs")
        .data
}

fn eliminate_distinct_aggregates(e: &Expr) -> Expr {
    e.clone()
        .transform_down(|node| match &node {
            Expr::DistinctAggregateFunction(_) => {
                let alias = AggregationAlias::new(node.clone());
                Ok(Transformed::new(Expr::AttributeReference(alias.attr()), true, TreeNodeRecursion::Jump))
            }
            _ => Ok(Transformed::no(node)),
        })
        .expect("Expr::transform_down never errs")
        .data
}

/// Every `AggregateFunction`/`DistinctAggregateFunction` occurrence reachable
/// in `e`, deduplicated by structural equality. Aggregates that sit directly
/// beneath a window function (e.g. the `max(a)` in `max(a) over (...)`) are
/// excluded from the plain pass and only surface through the arguments of
/// the window's own function and partition/order expressions. The window
/// is eliminated first so those nested aggregates can't also be picked up
/// as if they belonged to the window's own call.
pub fn collect_aggregate_functions(e: &Expr) -> Vec<Expr> {
    let mut in_windows = Vec::new();
    for win in collect_window_functions(e) {
        if let Expr::WindowFunction(w) = &win {
            for child in w.function.children() {
                in_windows.extend(collect_aggregate_functions(child));
            }
            for child in w.spec.children() {
                in_windows.extend(collect_aggregate_functions(child));
            }
        }
    }

    let without_windows = eliminate_window_functions(e);
    let distinct = collect_matching(&without_windows, &|x| matches!(x, Expr::DistinctAggregateFunction(_)));
    let without_distinct = eliminate_distinct_aggregates(&without_windows);
    let plain = collect_matching(&without_distinct, &|x| matches!(x, Expr::AggregateFunction(_)));

    dedup(in_windows.into_iter().chain(distinct).chain(plain).collect())
}

pub fn collect_aggregate_functions_in(exprs: &[Expr]) -> Vec<Expr> {
    dedup(exprs.iter().flat_map(collect_aggregate_functions).collect())
}

pub fn collect_window_functions(e: &Expr) -> Vec<Expr> {
    dedup(collect_matching(e, &|x| matches!(x, Expr::WindowFunction(_))))
}

pub fn collect_window_functions_in(exprs: &[Expr]) -> Vec<Expr> {
    dedup(exprs.iter().flat_map(collect_window_functions).collect())
}

pub fn has_aggregate_function(e: &Expr) -> bool {
    !collect_aggregate_functions(e).is_empty()
}

pub fn has_aggregate_function_in(exprs: &[Expr]) -> bool {
    exprs.iter().any(has_aggregate_function)
}

pub fn has_window_function(e: &Expr) -> bool {
    e.exists(|node| matches!(node, Expr::WindowFunction(_))).unwrap_or(false)
}

pub fn has_window_function_in(exprs: &[Expr]) -> bool {
    exprs.iter().any(has_window_function)
}

pub fn has_distinct_aggregate_function(e: &Expr) -> bool {
    e.exists(|node| matches!(node, Expr::DistinctAggregateFunction(_))).unwrap_or(false)
}

fn first_aggregate_in_keys(keys: &[Expr]) -> Option<(Expr, Expr)> {
    keys.iter().find_map(|k| collect_aggregate_functions(k).into_iter().next().map(|a| (k.clone(), a)))
}

fn first_window_in<'a>(exprs: impl Iterator<Item = &'a Expr>) -> Option<(Expr, Expr)> {
    exprs.into_iter().find_map(|e| collect_window_functions(e).into_iter().next().map(|w| (e.clone(), w)))
}

// ---------------------------------------------------------------------
// HAVING / ORDER BY absorption
// ---------------------------------------------------------------------

/// Binds any still-unresolved reference in `expr` that matches the name of
/// an alias in `project_list`, then strips every `Alias` wrapper the binding
/// introduced. The net effect is that a `HAVING`/`ORDER BY` clause written
/// against a `SELECT` alias ends up holding the underlying expression
/// directly, so `collect_aggregate_functions` can still find an aggregate
/// hiding behind it.
fn resolve_and_unalias(expr: Expr, project_list: &[Expr]) -> Expr {
    let aliases: HashMap<String, Expr> = project_list
        .iter()
        .filter_map(|e| match e {
            Expr::Alias(a) => Some((a.name.clone(), e.clone())),
            _ => None,
        })
        .collect();

    let bound = expr
        .transform_up(|e| match &e {
            Expr::UnresolvedAttribute(name) => match aliases.get(name) {
                Some(found) => Ok(Transformed::yes(found.clone())),
                None => Ok(Transformed::no(e)),
            },
            _ => Ok(Transformed::no(e)),
        })
        .expect("Expr::transform_up never errs")
        .data;

    bound
        .transform_up(|e| match e {
            Expr::Alias(Alias { child, .. }) => Ok(Transformed::yes(*child)),
            other => Ok(Transformed::no(other)),
        })
        .expect("Expr::transform_up never errs")
        .data
}

/// Moves a `Filter` sitting directly over an `UnresolvedAggregate` whose
/// `SELECT` list is fully resolved into that aggregate's `having_conditions`.
#[derive(Debug)]
pub struct AbsorbHavingConditions;

impl AnalyzerRule for AbsorbHavingConditions {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_down(|plan| match plan {
            LogicalPlan::Filter(Filter { condition, child }) => {
                if let LogicalPlan::UnresolvedAggregate(agg) = child.as_ref() {
                    if agg.project_list.iter().all(Expr::resolved) {
                        let mut agg = agg.clone();
                        let rewritten = resolve_and_unalias(condition, &agg.project_list);
                        if has_window_function(&rewritten) {
                            return Err(illegal_aggregation_window_in_having(&rewritten));
                        }
                        agg.having_conditions.push(rewritten);
                        debug!("absorbing a HAVING condition into the pending aggregate");
                        return Ok(Transformed::yes(LogicalPlan::UnresolvedAggregate(agg)));
                    }
                }
                Ok(Transformed::no(LogicalPlan::Filter(Filter { condition, child })))
            }
            other => Ok(Transformed::no(other)),
        })
    }

    fn name(&self) -> &str {
        "AbsorbHavingConditions"
    }
}

/// Moves the innermost `Sort` sitting directly over an `UnresolvedAggregate`
/// whose `SELECT` list is fully resolved into that aggregate's `order`.
#[derive(Debug)]
pub struct AbsorbSorts;

impl AnalyzerRule for AbsorbSorts {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_down(|plan| match plan {
            LogicalPlan::Sort(Sort { order, child }) => {
                if let LogicalPlan::UnresolvedAggregate(agg) = child.as_ref() {
                    if agg.project_list.iter().all(Expr::resolved) {
                        let mut agg = agg.clone();
                        agg.order = order
                            .into_iter()
                            .map(|o| SortOrder {
                                expr: resolve_and_unalias(o.expr, &agg.project_list),
                                direction: o.direction,
                                null_ordering: o.null_ordering,
                            })
                            .collect();
                        debug!("absorbing an ORDER BY into the pending aggregate");
                        return Ok(Transformed::yes(LogicalPlan::UnresolvedAggregate(agg)));
                    }
                }
                Ok(Transformed::no(LogicalPlan::Sort(Sort { order, child })))
            }
            other => Ok(Transformed::no(other)),
        })
    }

    fn name(&self) -> &str {
        "AbsorbSorts"
    }
}

// ---------------------------------------------------------------------
// DISTINCT / global aggregate rewriting
// ---------------------------------------------------------------------

/// `DISTINCT` is grouping by every output column with no aggregate
/// functions: `RewriteDistinctsAsAggregates` makes that explicit so
/// `ResolveAggregates` is the only rule that ever builds an `Aggregate`.
#[derive(Debug)]
pub struct RewriteDistinctsAsAggregates;

impl AnalyzerRule for RewriteDistinctsAsAggregates {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_down(|plan| match plan {
            LogicalPlan::Distinct(Distinct { child }) if child.resolved() => {
                let cols: Vec<Expr> = child.output().into_iter().map(Expr::AttributeReference).collect();
                debug!("rewriting DISTINCT over {} columns as a GROUP BY", cols.len());
                Ok(Transformed::yes(LogicalPlan::UnresolvedAggregate(UnresolvedAggregate::new(
                    child,
                    cols.clone(),
                    cols,
                    vec![],
                    vec![],
                ))))
            }
            other => Ok(Transformed::no(other)),
        })
    }

    fn name(&self) -> &str {
        "RewriteDistinctsAsAggregates"
    }
}

/// A `Project` whose list contains an aggregate function but has no `GROUP
/// BY` is a global aggregate, one group covering the whole input.
#[derive(Debug)]
pub struct RewriteProjectsAsGlobalAggregates;

impl AnalyzerRule for RewriteProjectsAsGlobalAggregates {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_down(|plan| match plan {
            LogicalPlan::Project(Project { project_list, child })
                if child.resolved()
                    && (has_aggregate_function_in(&project_list) || has_window_function_in(&project_list)) =>
            {
                debug!("rewriting aggregate projection with no GROUP BY as a global aggregate");
                Ok(Transformed::yes(LogicalPlan::UnresolvedAggregate(UnresolvedAggregate::new(
                    child,
                    vec![],
                    project_list,
                    vec![],
                    vec![],
                ))))
            }
            other => Ok(Transformed::no(other)),
        })
    }

    fn name(&self) -> &str {
        "RewriteProjectsAsGlobalAggregates"
    }
}

// ---------------------------------------------------------------------
// ResolveAggregates
// ---------------------------------------------------------------------

/// `rewrite_aggs`, with the one exception the plain substitution gets wrong:
/// an aggregate that is also used standalone elsewhere in the query must
/// not be replaced when it sits directly under a `WindowFunction`; that
/// occurrence is evaluated per window frame, not folded per group. The
/// function itself is restored and only its own arguments are re-rewritten.
/// Substitutes any subexpression structurally equal to an aggregate alias's
/// child with that alias's attribute, except inside a `WindowFunction`'s own
/// `function` field, which must stay an `AggregateFunction`/`RankingFunction`
/// (`WindowFunction::new` asserts it). A plain `transform_up(rewriter(...))`
/// would reconstruct that field unconditionally and panic the moment the
/// same aggregate also appears standalone elsewhere in the query. Window
/// functions are therefore walked by hand: their own call keeps its wrapper
/// and only its arguments (and the surrounding partition/order expressions)
/// go through the ordinary substitution.
fn rewrite_aggs(expr: Expr, agg_aliases: &[AggregationAlias]) -> Result<Expr> {
    expr.transform_down(|node| match node {
        Expr::WindowFunction(boxed) => {
            let WindowFunction { function, spec } = *boxed;
            let new_function = match *function {
                Expr::AggregateFunction(af) => {
                    let new_args = af
                        .args()
                        .into_iter()
                        .cloned()
                        .map(|a| a.transform_up(rewriter(agg_aliases)).map(|t| t.data))
                        .collect::<Result<Vec<_>>>()?;
                    Expr::AggregateFunction(af.rewrite_args(new_args))
                }
                other => other,
            };
            let new_partition_by = spec
                .partition_by
                .into_iter()
                .map(|e| e.transform_up(rewriter(agg_aliases)).map(|t| t.data))
                .collect::<Result<Vec<_>>>()?;
            let new_order_by = spec
                .order_by
                .into_iter()
                .map(|o| -> Result<SortOrder> {
                    Ok(SortOrder {
                        expr: o.expr.transform_up(rewriter(agg_aliases))?.data,
                        direction: o.direction,
                        null_ordering: o.null_ordering,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let new_wf = Expr::WindowFunction(Box::new(WindowFunction::new(
                new_function,
                WindowSpec::new(new_partition_by, new_order_by, spec.frame),
            )));
            Ok(Transformed::new(new_wf, true, TreeNodeRecursion::Jump))
        }
        other => rewriter(agg_aliases)(other),
    })
    .map(|t| t.data)
}

fn rewrite_keys_and_aggs(expr: Expr, key_aliases: &[GroupingAlias], agg_aliases: &[AggregationAlias]) -> Result<Expr> {
    let keyed = expr.transform_up(rewriter(key_aliases))?.data;
    rewrite_aggs(keyed, agg_aliases)
}

fn rewrite_all(
    expr: Expr,
    key_aliases: &[GroupingAlias],
    agg_aliases: &[AggregationAlias],
    window_aliases: &[WindowAlias],
) -> Result<Expr> {
    let keyed_and_aggd = rewrite_keys_and_aggs(expr, key_aliases, agg_aliases)?;
    Ok(keyed_and_aggd.transform_up(rewriter(window_aliases))?.data)
}

fn restore_all(
    expr: &Expr,
    key_aliases: &[GroupingAlias],
    agg_aliases: &[AggregationAlias],
    window_aliases: &[WindowAlias],
) -> Expr {
    let e = expr.clone().transform_up(restorer(window_aliases)).expect("Expr::transform_up never errs").data;
    let e = e.transform_up(restorer(agg_aliases)).expect("Expr::transform_up never errs").data;
    e.transform_up(restorer(key_aliases)).expect("Expr::transform_up never errs").data
}

fn reject_dangling(
    e: &Expr,
    component: &str,
    whitelist: &HashSet<u32>,
    key_aliases: &[GroupingAlias],
    agg_aliases: &[AggregationAlias],
    window_aliases: &[WindowAlias],
) -> Result<()> {
    for attr in e.references() {
        if !attr.internal && !whitelist.contains(&attr.expr_id) {
            let restored = restore_all(e, key_aliases, agg_aliases, window_aliases);
            return Err(illegal_aggregation_dangling_reference(component, &attr, &restored));
        }
    }
    Ok(())
}

/// Checks only a window's `partition_by`/`order_by` expressions, not its own
/// function's arguments: those are wrapped in an aggregate (or are a
/// zero-arg ranking function) exactly like any other aggregate's arguments,
/// which `reject_dangling` never checks either. Only the expressions that
/// feed the window's framing need to be a grouping key or another aggregate.
fn reject_dangling_window(
    wf: &WindowFunction,
    key_aliases: &[GroupingAlias],
    agg_aliases: &[AggregationAlias],
    window_aliases: &[WindowAlias],
) -> Result<()> {
    for e in wf.spec.children() {
        reject_dangling(e, "window function", &HashSet::new(), key_aliases, agg_aliases, window_aliases)?;
    }
    Ok(())
}

/// The core of the pipeline: turns an `UnresolvedAggregate` whose clauses
/// are all resolved into the canonical layered form: `Aggregate`, with an
/// optional `Filter` for `HAVING`, `Window` layers for any window functions
/// (one per distinct `WindowSpec`), an optional `Sort` for `ORDER BY`, and a
/// `Project` on top restoring the original output shape.
#[derive(Debug)]
pub struct ResolveAggregates;

impl AnalyzerRule for ResolveAggregates {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_up(|plan| match plan {
            LogicalPlan::UnresolvedAggregate(agg) => resolve_aggregate(agg),
            other => Ok(Transformed::no(other)),
        })
    }

    fn name(&self) -> &str {
        "ResolveAggregates"
    }
}

fn resolve_aggregate(agg: UnresolvedAggregate) -> Result<Transformed<LogicalPlan>> {
    let UnresolvedAggregate { child, keys, project_list, having_conditions, order } = agg;

    let all_resolved = child.resolved()
        && keys.iter().all(Expr::resolved)
        && project_list.iter().all(Expr::resolved)
        && having_conditions.iter().all(Expr::resolved)
        && order.iter().all(|o| o.expr.resolved());
    if !all_resolved || project_list.iter().any(has_distinct_aggregate_function) {
        trace!("UnresolvedAggregate not yet ready to resolve (resolved={all_resolved})");
        return Ok(Transformed::no(LogicalPlan::UnresolvedAggregate(UnresolvedAggregate::new(
            child,
            keys,
            project_list,
            having_conditions,
            order,
        ))));
    }

    if let Some((key, aggregate)) = first_aggregate_in_keys(&keys) {
        return Err(illegal_aggregation_in_grouping_key(&key, &aggregate));
    }
    if let Some((location, window)) = first_window_in(keys.iter().chain(having_conditions.iter())) {
        return Err(illegal_aggregation_window_in_grouping_key(&location, &window));
    }

    // 1. grouping keys get their own synthetic attribute.
    let key_aliases: Vec<GroupingAlias> = keys.into_iter().map(GroupingAlias::new).collect();

    // 2. collect aggregates from project_list ++ having_conditions ++ order,
    // after binding grouping keys, so an aggregate argument that happens to
    // equal a key is recognized as using that key.
    let order_exprs: Vec<Expr> = order.iter().map(|o| o.expr.clone()).collect();
    let keyed: Vec<Expr> = project_list
        .iter()
        .chain(having_conditions.iter())
        .chain(order_exprs.iter())
        .cloned()
        .map(|e| e.transform_up(rewriter(&key_aliases)).map(|t| t.data))
        .collect::<Result<Vec<_>>>()?;
    let aggs = collect_aggregate_functions_in(&keyed);

    // 3. an aggregate's own arguments must not contain another aggregate.
    for a in &aggs {
        let grandchildren: Vec<&Expr> = match a {
            Expr::DistinctAggregateFunction(d) => d.inner.children(),
            _ => a.children(),
        };
        for gc in grandchildren {
            if has_aggregate_function(gc) {
                return Err(illegal_aggregation_nested_aggregate(a, gc));
            }
        }
    }

    // 4. aggregate functions get their own synthetic attribute.
    let agg_aliases: Vec<AggregationAlias> = aggs.into_iter().map(AggregationAlias::new).collect();

    // 5. collect windows from project_list ++ order, after binding keys and
    // aggregates.
    let keyed_and_aggd: Vec<Expr> = project_list
        .iter()
        .chain(order_exprs.iter())
        .cloned()
        .map(|e| rewrite_keys_and_aggs(e, &key_aliases, &agg_aliases))
        .collect::<Result<Vec<_>>>()?;
    let wins = collect_window_functions_in(&keyed_and_aggd);
    let window_aliases: Vec<WindowAlias> = wins.iter().cloned().map(WindowAlias::new).collect();

    // 6/7. apply the full composed rewrite to every remaining clause.
    let rewritten_conditions: Vec<Expr> = having_conditions
        .into_iter()
        .map(|e| rewrite_all(e, &key_aliases, &agg_aliases, &window_aliases))
        .collect::<Result<Vec<_>>>()?;
    let rewritten_order: Vec<SortOrder> = order
        .into_iter()
        .map(|o| {
            Ok(SortOrder {
                expr: rewrite_all(o.expr, &key_aliases, &agg_aliases, &window_aliases)?,
                direction: o.direction,
                null_ordering: o.null_ordering,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let rewritten_project_list: Vec<Expr> = project_list
        .into_iter()
        .map(|e| {
            let original_name_and_id = match &e {
                Expr::Alias(a) => Some((a.name.clone(), a.expr_id)),
                Expr::AttributeReference(a) => Some((a.name.clone(), a.expr_id)),
                _ => None,
            };
            let rewritten = rewrite_all(e, &key_aliases, &agg_aliases, &window_aliases)?;
            Ok(match (&rewritten, original_name_and_id) {
                (Expr::AttributeReference(a), Some((name, expr_id))) if a.internal => {
                    Expr::Alias(Alias::new_with_expr_id(rewritten, name, expr_id))
                }
                _ => rewritten,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // 8. every surviving non-internal reference must be a SELECT output
    // (HAVING/ORDER BY only) or it is dangling. A query with no grouping key
    // and no plain aggregate at all (pure window functions over the raw
    // input) has no grouping discipline to enforce.
    let has_aggregation = !key_aliases.is_empty() || !agg_aliases.is_empty();
    let project_output_ids: HashSet<u32> =
        named_output(&rewritten_project_list).into_iter().map(|a| a.expr_id).collect();
    let none: HashSet<u32> = HashSet::new();

    if has_aggregation {
        for win in &wins {
            if let Expr::WindowFunction(wf) = win {
                reject_dangling_window(wf, &key_aliases, &agg_aliases, &window_aliases)?;
            }
        }
        for e in &rewritten_project_list {
            reject_dangling(e, "SELECT field", &none, &key_aliases, &agg_aliases, &window_aliases)?;
        }
        for e in &rewritten_conditions {
            reject_dangling(e, "HAVING condition", &project_output_ids, &key_aliases, &agg_aliases, &window_aliases)?;
        }
        for o in &rewritten_order {
            reject_dangling(&o.expr, "ORDER BY expression", &project_output_ids, &key_aliases, &agg_aliases, &window_aliases)?;
        }
    }

    // 9. assemble the layered plan: Aggregate, then Filter, then one Window
    // layer per distinct WindowSpec, then Sort, then Project. A query with no
    // grouping key and no plain aggregate skips the Aggregate layer entirely,
    // since there is nothing to fold and the windows operate directly on the
    // child's rows.
    let key_aliases_len = key_aliases.len();
    let agg_aliases_len = agg_aliases.len();
    let mut plan = if has_aggregation {
        Arc::new(LogicalPlan::Aggregate(Aggregate::new(child, key_aliases, agg_aliases)))
    } else {
        child
    };

    if !rewritten_conditions.is_empty() {
        let condition = rewritten_conditions.into_iter().reduce(Expr::and).expect("checked non-empty above");
        plan = Arc::new(LogicalPlan::Filter(Filter::new(condition, plan)));
    }

    let mut distinct_specs: Vec<WindowSpec> = Vec::new();
    for alias in &window_aliases {
        if let Expr::WindowFunction(wf) = alias.child.as_ref() {
            if !distinct_specs.contains(&wf.spec) {
                distinct_specs.push(wf.spec.clone());
            }
        }
    }
    for spec in &distinct_specs {
        let layer: Vec<WindowAlias> = window_aliases
            .iter()
            .filter(|a| matches!(a.child.as_ref(), Expr::WindowFunction(wf) if &wf.spec == spec))
            .cloned()
            .collect();
        plan = Arc::new(LogicalPlan::Window(Window::new(plan, layer)));
    }

    if !rewritten_order.is_empty() {
        plan = Arc::new(LogicalPlan::Sort(Sort::new(rewritten_order, plan)));
    }

    debug!(
        "resolved aggregate: {} key(s), {} aggregate(s), {} window layer(s)",
        key_aliases_len,
        agg_aliases_len,
        distinct_specs.len()
    );
    Ok(Transformed::yes(LogicalPlan::Project(Project::new(rewritten_project_list, plan))))
}

/// `DISTINCT` inside an aggregate function (`count(distinct x)`) is a
/// feature this pipeline does not implement; anything left over once
/// `ResolveAggregates` has run is a hard error, not a silent pass-through.
#[derive(Debug)]
pub struct RewriteDistinctAggregateFunctions;

impl AnalyzerRule for RewriteDistinctAggregateFunctions {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.apply(|node| {
            let exprs: Vec<&Expr> = match node {
                LogicalPlan::Aggregate(Aggregate { agg_aliases, .. }) => {
                    agg_aliases.iter().map(|a| a.child.as_ref()).collect()
                }
                LogicalPlan::UnresolvedAggregate(UnresolvedAggregate { project_list, .. }) => {
                    project_list.iter().collect()
                }
                _ => vec![],
            };
            for e in exprs {
                if has_distinct_aggregate_function(e) {
                    return Err(unsupported_distinct_aggregate_function(e));
                }
            }
            Ok(TreeNodeRecursion::Continue)
        })?;
        Ok(Transformed::no(plan))
    }

    fn name(&self) -> &str {
        "RewriteDistinctAggregateFunctions"
    }
}

/// The rule batch this pipeline applies, in the order `Analyzer` requires:
/// `DISTINCT` and bare aggregate projections must become `UnresolvedAggregate`
/// before `HAVING`/`ORDER BY` can be absorbed into them, which in turn must
/// happen before `ResolveAggregates` sees a stable set of clauses to resolve.
pub fn aggregation_rules() -> Vec<Box<dyn AnalyzerRule>> {
    vec![
        Box::new(RewriteDistinctsAsAggregates),
        Box::new(RewriteProjectsAsGlobalAggregates),
        Box::new(AbsorbHavingConditions),
        Box::new(AbsorbSorts),
        Box::new(ResolveAggregates),
        Box::new(RewriteDistinctAggregateFunctions),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::Analyzer;
    use crate::expr::{AttributeReference, Count, DenseRank, Max, RowNumber, Sum};
    use crate::logical_plan::Relation;
    use crate::types::DataType;

    fn relation() -> Arc<LogicalPlan> {
        Arc::new(LogicalPlan::Relation(Relation::new(
            "orders",
            vec![
                AttributeReference::new("region", DataType::String),
                AttributeReference::new("amount", DataType::Int),
            ],
        )))
    }

    fn col(plan: &Arc<LogicalPlan>, i: usize) -> Expr {
        Expr::AttributeReference(plan.output()[i].clone())
    }

    #[test]
    fn collects_aggregates_while_excluding_window_internals() {
        let t = relation();
        let standalone = Expr::AggregateFunction(Box::new(Max::new(col(&t, 1))));
        let windowed = Expr::WindowFunction(Box::new(WindowFunction::new(
            Expr::AggregateFunction(Box::new(Max::new(col(&t, 1)))),
            WindowSpec::new(vec![col(&t, 0)], vec![], None),
        )));
        let aggs = collect_aggregate_functions_in(&[standalone.clone(), windowed]);
        assert_eq!(aggs, vec![standalone]);
    }

    #[test]
    fn resolve_and_unalias_exposes_the_aggregate_behind_a_select_alias() {
        let t = relation();
        let total = Expr::AggregateFunction(Box::new(Sum::new(col(&t, 1)))).alias("total");
        let condition = Expr::UnresolvedAttribute("total".to_string()).gt(Expr::int_lit(10));
        let rewritten = resolve_and_unalias(condition, &[total]);
        assert!(has_aggregate_function(&rewritten));
    }

    #[test]
    fn distinct_becomes_an_unresolved_aggregate_over_every_output_column() {
        let t = relation();
        let plan = LogicalPlan::Distinct(Distinct::new(t.clone()));
        let rewritten = RewriteDistinctsAsAggregates.analyze(plan).unwrap();
        assert!(rewritten.transformed);
        match rewritten.data {
            LogicalPlan::UnresolvedAggregate(agg) => {
                assert_eq!(agg.keys.len(), 2);
                assert_eq!(agg.project_list.len(), 2);
            }
            other => panic!("expected UnresolvedAggregate, got {other:?}"),
        }
    }

    #[test]
    fn project_with_aggregate_and_no_group_by_becomes_a_global_aggregate() {
        let t = relation();
        let project_list = vec![Expr::AggregateFunction(Box::new(Sum::new(col(&t, 1)))).alias("total")];
        let plan = LogicalPlan::Project(Project::new(project_list, t));
        let rewritten = RewriteProjectsAsGlobalAggregates.analyze(plan).unwrap();
        match rewritten.data {
            LogicalPlan::UnresolvedAggregate(agg) => assert!(agg.keys.is_empty()),
            other => panic!("expected UnresolvedAggregate, got {other:?}"),
        }
    }

    #[test]
    fn full_pipeline_resolves_distinct_to_a_canonical_aggregate() {
        let t = relation();
        let plan = LogicalPlan::Distinct(Distinct::new(t.clone()));
        let resolved = Analyzer::new(aggregation_rules()).analyze(plan).unwrap();

        let original_ids: HashSet<u32> = t.output().iter().map(|a| a.expr_id).collect();
        let output_ids: HashSet<u32> = resolved.output().iter().map(|a| a.expr_id).collect();
        assert_eq!(original_ids, output_ids);

        match resolved {
            LogicalPlan::Project(Project { child, .. }) => match child.as_ref() {
                LogicalPlan::Aggregate(Aggregate { key_aliases, agg_aliases, .. }) => {
                    assert_eq!(key_aliases.len(), 2);
                    assert!(agg_aliases.is_empty());
                }
                other => panic!("expected Aggregate, got {other:?}"),
            },
            other => panic!("expected Project, got {other:?}"),
        }
    }

    #[test]
    fn full_pipeline_layers_filter_and_sort_around_the_aggregate() {
        let t = relation();
        let region = col(&t, 0);
        let amount = col(&t, 1);
        let total = Expr::AggregateFunction(Box::new(Sum::new(amount))).alias("total");
        let aggregate = LogicalPlan::UnresolvedAggregate(UnresolvedAggregate::new(
            t,
            vec![region.clone()],
            vec![region, total],
            vec![],
            vec![],
        ));
        let filtered = LogicalPlan::Filter(Filter::new(
            Expr::UnresolvedAttribute("total".to_string()).gt(Expr::long_lit(100)),
            Arc::new(aggregate),
        ));
        let sorted = LogicalPlan::Sort(
            Sort::new(vec![SortOrder::asc(Expr::UnresolvedAttribute("total".to_string()))], Arc::new(filtered)),
        );

        let resolved = Analyzer::new(aggregation_rules()).analyze(sorted).unwrap();
        match resolved {
            LogicalPlan::Project(Project { child, .. }) => match child.as_ref() {
                LogicalPlan::Sort(Sort { child, .. }) => match child.as_ref() {
                    LogicalPlan::Filter(Filter { child, .. }) => {
                        assert!(matches!(child.as_ref(), LogicalPlan::Aggregate(_)));
                    }
                    other => panic!("expected Filter, got {other:?}"),
                },
                other => panic!("expected Sort, got {other:?}"),
            },
            other => panic!("expected Project, got {other:?}"),
        }
    }

    #[test]
    fn aggregate_in_grouping_key_is_rejected() {
        let t = relation();
        let bad_key = Expr::AggregateFunction(Box::new(Count::new(col(&t, 1))));
        let plan = LogicalPlan::UnresolvedAggregate(UnresolvedAggregate::new(
            t.clone(),
            vec![bad_key],
            vec![col(&t, 0)],
            vec![],
            vec![],
        ));
        let err = Analyzer::new(aggregation_rules()).analyze(plan).unwrap_err();
        assert!(err.contains("IllegalAggregation"));
    }

    #[test]
    fn dangling_reference_outside_keys_and_aggregates_is_rejected() {
        let t = relation();
        let plan = LogicalPlan::UnresolvedAggregate(UnresolvedAggregate::new(
            t.clone(),
            vec![col(&t, 0)],
            vec![col(&t, 1)],
            vec![],
            vec![],
        ));
        let err = Analyzer::new(aggregation_rules()).analyze(plan).unwrap_err();
        assert!(err.contains("IllegalAggregation"));
    }

    #[test]
    fn window_function_alongside_its_own_standalone_aggregate_is_not_double_counted() {
        let t = relation();
        let region = col(&t, 0);
        let amount = col(&t, 1);
        let windowed = Expr::WindowFunction(Box::new(WindowFunction::new(
            Expr::AggregateFunction(Box::new(Max::new(amount.clone()))),
            WindowSpec::new(vec![region.clone()], vec![], None),
        )))
        .alias("running_max");
        let standalone = Expr::AggregateFunction(Box::new(Max::new(amount))).alias("overall_max");
        let plan = LogicalPlan::UnresolvedAggregate(UnresolvedAggregate::new(
            t,
            vec![region.clone()],
            vec![region, windowed, standalone],
            vec![],
            vec![],
        ));
        let resolved = Analyzer::new(aggregation_rules()).analyze(plan).unwrap();
        match resolved {
            LogicalPlan::Project(Project { child, .. }) => match child.as_ref() {
                LogicalPlan::Window(Window { child, function_aliases, .. }) => {
                    assert_eq!(function_aliases.len(), 1);
                    assert!(matches!(child.as_ref(), LogicalPlan::Aggregate(_)));
                }
                other => panic!("expected Window, got {other:?}"),
            },
            other => panic!("expected Project, got {other:?}"),
        }
    }

    #[test]
    fn ranking_function_is_a_valid_window_alongside_an_aggregate() {
        let t = relation();
        let rank = Expr::WindowFunction(Box::new(WindowFunction::new(
            Expr::RankingFunction(Box::new(DenseRank)),
            WindowSpec::new(vec![col(&t, 0)], vec![SortOrder::desc(col(&t, 1))], None),
        )))
        .alias("rnk");
        let row_number = Expr::WindowFunction(Box::new(WindowFunction::new(
            Expr::RankingFunction(Box::new(RowNumber)),
            WindowSpec::new(vec![], vec![SortOrder::asc(col(&t, 1))], None),
        )))
        .alias("rn");
        let plan = LogicalPlan::UnresolvedAggregate(UnresolvedAggregate::new(
            t,
            vec![],
            vec![rank, row_number],
            vec![],
            vec![],
        ));
        let resolved = Analyzer::new(aggregation_rules()).analyze(plan).unwrap();
        // two distinct WindowSpecs stack as two separate Window layers.
        match resolved {
            LogicalPlan::Project(Project { child, .. }) => match child.as_ref() {
                LogicalPlan::Window(Window { child, .. }) => {
                    assert!(matches!(child.as_ref(), LogicalPlan::Window(_)));
                }
                other => panic!("expected Window, got {other:?}"),
            },
            other => panic!("expected Project, got {other:?}"),
        }
    }

    #[test]
    fn window_only_project_skips_the_aggregate_layer_entirely() {
        let t = relation();
        let rn = Expr::WindowFunction(Box::new(WindowFunction::new(
            Expr::RankingFunction(Box::new(RowNumber)),
            WindowSpec::new(vec![col(&t, 0)], vec![SortOrder::asc(col(&t, 1))], None),
        )))
        .alias("rn");
        let plan = LogicalPlan::Project(Project::new(vec![col(&t, 0), col(&t, 1), rn], t));

        let resolved = Analyzer::new(aggregation_rules()).analyze(plan).unwrap();
        match resolved {
            LogicalPlan::Project(Project { child, .. }) => match child.as_ref() {
                LogicalPlan::Window(Window { child, function_aliases }) => {
                    assert_eq!(function_aliases.len(), 1);
                    assert!(matches!(child.as_ref(), LogicalPlan::Relation(_)));
                }
                other => panic!("expected Window, got {other:?}"),
            },
            other => panic!("expected Project, got {other:?}"),
        }
    }
}
