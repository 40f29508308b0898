use std::any::Any;
use std::cmp::PartialEq;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use dyn_clone::DynClone;
use crate::expr::Expr;
use crate::types::DataType;

/// A window function with no aggregate semantics of its own; its value is
/// defined purely by row position within a partition, not by folding
/// argument values.
pub trait RankingFunction: Debug + Send + Sync + DynClone {
    fn as_any(&self) -> &dyn Any;
    fn name(&self) -> &str;
    fn data_type(&self) -> &DataType;
}

dyn_clone::clone_trait_object!(RankingFunction);

impl PartialEq for Box<dyn RankingFunction> {
    fn eq(&self, other: &Self) -> bool {
        self.as_any().type_id() == other.as_any().type_id()
    }
}

impl Eq for Box<dyn RankingFunction> {}

impl Hash for Box<dyn RankingFunction> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

macro_rules! ranking_function {
    ($name:ident, $fn_name:literal) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name;

        impl RankingFunction for $name {
            fn as_any(&self) -> &dyn Any {
                self
            }

            fn name(&self) -> &str {
                $fn_name
            }

            fn data_type(&self) -> &DataType {
                &DataType::Long
            }
        }
    };
}

ranking_function!(RowNumber, "row_number");
ranking_function!(Rank, "rank");
ranking_function!(DenseRank, "dense_rank");

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NullOrdering {
    NullsFirst,
    NullsLast,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SortOrder {
    pub expr: Expr,
    pub direction: SortDirection,
    pub null_ordering: NullOrdering,
}

impl SortOrder {
    pub fn asc(expr: Expr) -> Self {
        Self { expr, direction: SortDirection::Asc, null_ordering: NullOrdering::NullsFirst }
    }

    pub fn desc(expr: Expr) -> Self {
        Self { expr, direction: SortDirection::Desc, null_ordering: NullOrdering::NullsLast }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FrameType {
    Rows,
    Range,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(u64),
    CurrentRow,
    Following(u64),
    UnboundedFollowing,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct WindowFrame {
    pub frame_type: FrameType,
    pub lower: FrameBound,
    pub upper: FrameBound,
}

impl WindowFrame {
    /// The implicit frame a window with an ORDER BY but no explicit frame
    /// clause gets: everything from the start of the partition to the
    /// current row.
    pub fn default_for_ordered() -> Self {
        Self {
            frame_type: FrameType::Range,
            lower: FrameBound::UnboundedPreceding,
            upper: FrameBound::CurrentRow,
        }
    }

    /// The implicit frame for a window with neither ORDER BY nor an explicit
    /// frame clause: the whole partition.
    pub fn default_for_unordered() -> Self {
        Self {
            frame_type: FrameType::Range,
            lower: FrameBound::UnboundedPreceding,
            upper: FrameBound::UnboundedFollowing,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct WindowSpec {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<SortOrder>,
    pub frame: Option<WindowFrame>,
}

impl WindowSpec {
    pub fn new(partition_by: Vec<Expr>, order_by: Vec<SortOrder>, frame: Option<WindowFrame>) -> Self {
        Self { partition_by, order_by, frame }
    }

    pub fn children(&self) -> Vec<&Expr> {
        self.partition_by
            .iter()
            .chain(self.order_by.iter().map(|o| &o.expr))
            .collect()
    }
}

/// A call of an `AggregateFunction` or `RankingFunction` evaluated over a
/// `WindowSpec` rather than folded down to one row per group.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct WindowFunction {
    pub function: Box<Expr>,
    pub spec: WindowSpec,
}

impl WindowFunction {
    pub fn new(function: Expr, spec: WindowSpec) -> Self {
        assert!(
            matches!(function, Expr::AggregateFunction(_) | Expr::RankingFunction(_)),
            "WindowFunction must wrap an AggregateFunction or RankingFunction, got {function:?}"
        );
        Self { function: Box::new(function), spec }
    }

    pub fn data_type(&self) -> &DataType {
        self.function.data_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::aggregate::Sum;

    #[test]
    #[should_panic(expected = "must wrap an AggregateFunction or RankingFunction")]
    fn window_function_rejects_non_aggregate() {
        WindowFunction::new(Expr::attr("x", DataType::Int), WindowSpec::new(vec![], vec![], None));
    }

    #[test]
    fn window_function_over_ranking_function() {
        let wf = WindowFunction::new(
            Expr::RankingFunction(Box::new(RowNumber)),
            WindowSpec::new(vec![], vec![SortOrder::asc(Expr::attr("x", DataType::Int))], None),
        );
        assert_eq!(wf.data_type(), &DataType::Long);
        assert_eq!(wf.spec.children().len(), 1);
    }

    #[test]
    fn window_function_over_aggregate() {
        let wf = WindowFunction::new(
            Expr::AggregateFunction(Box::new(Sum::new(Expr::attr("x", DataType::Int)))),
            WindowSpec::new(vec![Expr::attr("g", DataType::String)], vec![], None),
        );
        assert_eq!(wf.spec.children().len(), 1);
    }
}
