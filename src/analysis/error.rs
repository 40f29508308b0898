use crate::expr::{AttributeReference, Expr};

/// Formats the user-facing error messages `ResolveAggregates` and its
/// companion rules raise. Every message is built from the *restored* form of
/// the offending expression; synthetic `$g`/`$a`/`$w` names never leak.

pub fn illegal_aggregation_in_grouping_key(key: &Expr, aggregate: &Expr) -> String {
    format!("IllegalAggregation: aggregate function {aggregate:?} is not allowed in GROUP BY key {key:?}")
}

pub fn illegal_aggregation_window_in_grouping_key(key: &Expr, window: &Expr) -> String {
    format!("IllegalAggregation: window function {window:?} is not allowed in GROUP BY key {key:?}")
}

pub fn illegal_aggregation_window_in_having(condition: &Expr) -> String {
    format!("IllegalAggregation: window function is not allowed in HAVING condition {condition:?}")
}

pub fn illegal_aggregation_nested_aggregate(outer: &Expr, inner: &Expr) -> String {
    format!("IllegalAggregation: aggregate function {inner:?} cannot be nested inside {outer:?}")
}

pub fn illegal_aggregation_dangling_reference(
    component: &str,
    attr: &AttributeReference,
    restored_expr: &Expr,
) -> String {
    format!(
        "IllegalAggregation: {component} {restored_expr:?} references column `{}` that is neither a GROUP BY key \
         nor wrapped in an aggregate function",
        attr.name,
    )
}

pub fn unsupported_distinct_aggregate_function(expr: &Expr) -> String {
    format!("Unsupported: distinct aggregate function is not supported yet: {expr:?}")
}
