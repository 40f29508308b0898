use crate::expr::{AttributeReference, Expr, ExprIdGenerator};
use crate::tree_node::Transformed;
use crate::Result;

/// A synthetic named expression minted by the aggregation rewriter: wraps a
/// child expression and exposes an `InternalAttribute` carrying a fresh
/// identity. Never visible past the top-level `Project` the rule builds.
pub trait InternalAlias {
    fn child(&self) -> &Expr;
    fn name(&self) -> &str;
    fn expr_id(&self) -> u32;

    fn attr(&self) -> AttributeReference {
        AttributeReference::new_internal(self.name(), self.child().data_type().clone(), self.expr_id())
    }
}

macro_rules! internal_alias {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name {
            pub child: Box<Expr>,
            pub name: String,
            pub expr_id: u32,
        }

        impl $name {
            pub fn new(child: Expr) -> Self {
                let expr_id = ExprIdGenerator::get_next_expr_id();
                let name = format!("{}{}", $prefix, expr_id);
                Self { child: Box::new(child), name, expr_id }
            }
        }

        impl InternalAlias for $name {
            fn child(&self) -> &Expr {
                &self.child
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn expr_id(&self) -> u32 {
                self.expr_id
            }
        }
    };
}

internal_alias!(GroupingAlias, "$g");
internal_alias!(AggregationAlias, "$a");
internal_alias!(WindowAlias, "$w");

/// A partial function mapping any expression structurally equal to some
/// `aliases[i].child` to `aliases[i].attr`. First alias in declaration order
/// wins ties. Intended for use with `Expr::transform_up`.
pub fn rewriter<'a, A: InternalAlias>(aliases: &'a [A]) -> impl Fn(Expr) -> Result<Transformed<Expr>> + 'a {
    move |e: Expr| {
        for alias in aliases {
            if &e == alias.child() {
                return Ok(Transformed::yes(Expr::AttributeReference(alias.attr())));
            }
        }
        Ok(Transformed::no(e))
    }
}

/// The inverse of `rewriter`: maps each `aliases[i].attr` back to
/// `aliases[i].child`. Used only to format user-facing error messages so
/// synthetic names never leak.
pub fn restorer<'a, A: InternalAlias>(aliases: &'a [A]) -> impl Fn(Expr) -> Result<Transformed<Expr>> + 'a {
    move |e: Expr| {
        if let Expr::AttributeReference(a) = &e {
            for alias in aliases {
                if a.expr_id == alias.expr_id() {
                    return Ok(Transformed::yes(alias.child().clone()));
                }
            }
        }
        Ok(Transformed::no(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_node::TreeNode;
    use crate::types::DataType;

    #[test]
    fn rewriter_substitutes_matching_child() {
        let col = Expr::attr("x", DataType::Int);
        let alias = GroupingAlias::new(col.clone());
        let aliases = vec![alias];
        let rewritten = col.transform_up(rewriter(&aliases)).unwrap().data;
        assert_eq!(rewritten, Expr::AttributeReference(aliases[0].attr()));
    }

    #[test]
    fn restorer_is_the_inverse() {
        let col = Expr::attr("x", DataType::Int);
        let alias = GroupingAlias::new(col.clone());
        let aliases = vec![alias];
        let attr = Expr::AttributeReference(aliases[0].attr());
        let restored = attr.transform_up(restorer(&aliases)).unwrap().data;
        assert_eq!(restored, col);
    }

    #[test]
    fn first_declared_alias_wins_ties() {
        let col = Expr::attr("x", DataType::Int);
        let a0 = GroupingAlias::new(col.clone());
        let a1 = GroupingAlias::new(col.clone());
        let expected_id = a0.expr_id;
        let aliases = vec![a0, a1];
        let rewritten = col.transform_up(rewriter(&aliases)).unwrap().data;
        match rewritten {
            Expr::AttributeReference(a) => assert_eq!(a.expr_id, expected_id),
            _ => panic!("expected an attribute reference"),
        }
    }
}
