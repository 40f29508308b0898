use std::any::Any;
use std::cmp::PartialEq;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use dyn_clone::DynClone;
use crate::Result;
use crate::expr::Expr;
use crate::types::{AbstractDataType, DataType};

/// A scalar whose value depends on an entire group of input rows.
///
/// Arguments may be any expression but must not themselves contain another
/// `AggregateFunction`; nesting is rejected by the aggregation pipeline,
/// not here.
pub trait AggregateFunction: Debug + Send + Sync + DynClone {
    fn as_any(&self) -> &dyn Any;
    fn name(&self) -> &str;
    fn data_type(&self) -> &DataType;
    fn args(&self) -> Vec<&Expr>;
    fn expects_input_types(&self) -> Vec<AbstractDataType>;
    fn rewrite_args(&self, args: Vec<Expr>) -> Box<dyn AggregateFunction>;

    fn check_input_data_types(&self) -> Result<()> {
        let expected = self.expects_input_types();
        if expected.is_empty() {
            return Ok(());
        }
        for (arg, expected_type) in self.args().into_iter().zip(expected.iter()) {
            if !expected_type.accepts_type(arg.data_type()) {
                return Err(format!(
                    "{} requires an argument of a different type, not {}",
                    self.name(),
                    arg.data_type()
                ));
            }
        }
        Ok(())
    }
}

dyn_clone::clone_trait_object!(AggregateFunction);

impl PartialEq for Box<dyn AggregateFunction> {
    fn eq(&self, other: &Self) -> bool {
        if self.as_any().type_id() != other.as_any().type_id() {
            return false;
        }
        let args1 = self.args();
        let args2 = other.args();
        args1.len() == args2.len() && args1.iter().zip(args2.iter()).all(|(a, b)| a == b)
    }
}

impl Eq for Box<dyn AggregateFunction> {}

impl Hash for Box<dyn AggregateFunction> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
        for x in self.args() {
            x.hash(state);
        }
    }
}

macro_rules! unary_aggregate {
    ($name:ident, $fn_name:literal, $data_type:expr, $expects:expr) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name {
            pub child: Box<Expr>,
        }

        impl $name {
            pub fn new(child: Expr) -> Self {
                Self { child: Box::new(child) }
            }
        }

        impl AggregateFunction for $name {
            fn as_any(&self) -> &dyn Any {
                self
            }

            fn name(&self) -> &str {
                $fn_name
            }

            fn data_type(&self) -> &DataType {
                $data_type(self)
            }

            fn args(&self) -> Vec<&Expr> {
                vec![self.child.as_ref()]
            }

            fn expects_input_types(&self) -> Vec<AbstractDataType> {
                $expects
            }

            fn rewrite_args(&self, mut args: Vec<Expr>) -> Box<dyn AggregateFunction> {
                assert_eq!(args.len(), 1, "{} takes exactly one argument", $fn_name);
                Box::new(Self::new(args.remove(0)))
            }
        }
    };
}

unary_aggregate!(Count, "count", |_: &Count| -> &DataType { &DataType::Long }, vec![]);
unary_aggregate!(Max, "max", |s: &Max| s.child.data_type(), vec![]);
unary_aggregate!(Min, "min", |s: &Min| s.child.data_type(), vec![]);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sum {
    pub child: Box<Expr>,
}

impl Sum {
    pub fn new(child: Expr) -> Self {
        Self { child: Box::new(child) }
    }
}

impl AggregateFunction for Sum {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        "sum"
    }

    fn data_type(&self) -> &DataType {
        match self.child.data_type() {
            DataType::Int | DataType::Long => &DataType::Long,
            _ => &DataType::Double,
        }
    }

    fn args(&self) -> Vec<&Expr> {
        vec![self.child.as_ref()]
    }

    fn expects_input_types(&self) -> Vec<AbstractDataType> {
        vec![AbstractDataType::Numeric]
    }

    fn rewrite_args(&self, mut args: Vec<Expr>) -> Box<dyn AggregateFunction> {
        assert_eq!(args.len(), 1, "sum takes exactly one argument");
        Box::new(Self::new(args.remove(0)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Avg {
    pub child: Box<Expr>,
}

impl Avg {
    pub fn new(child: Expr) -> Self {
        Self { child: Box::new(child) }
    }
}

impl AggregateFunction for Avg {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        "avg"
    }

    fn data_type(&self) -> &DataType {
        &DataType::Double
    }

    fn args(&self) -> Vec<&Expr> {
        vec![self.child.as_ref()]
    }

    fn expects_input_types(&self) -> Vec<AbstractDataType> {
        vec![AbstractDataType::Numeric]
    }

    fn rewrite_args(&self, mut args: Vec<Expr>) -> Box<dyn AggregateFunction> {
        assert_eq!(args.len(), 1, "avg takes exactly one argument");
        Box::new(Self::new(args.remove(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn sum_widens_int_to_long() {
        let sum = Sum::new(Expr::attr("x", DataType::Int));
        assert_eq!(sum.data_type(), &DataType::Long);
    }

    #[test]
    fn avg_is_always_double() {
        let avg = Avg::new(Expr::attr("x", DataType::Long));
        assert_eq!(avg.data_type(), &DataType::Double);
    }

    #[test]
    fn count_rewrite_args_swaps_the_child_and_keeps_its_name() {
        let count = Count::new(Expr::attr("x", DataType::Int));
        let rewritten = count.rewrite_args(vec![Expr::attr("y", DataType::String)]);
        assert_eq!(rewritten.name(), "count");
        assert_eq!(rewritten.args(), vec![&Expr::attr("y", DataType::String)]);
    }

    #[test]
    #[should_panic(expected = "takes exactly one argument")]
    fn count_rewrite_args_panics_on_wrong_arity() {
        let count = Count::new(Expr::attr("x", DataType::Int));
        count.rewrite_args(vec![Expr::attr("x", DataType::Int), Expr::attr("y", DataType::Int)]);
    }
}
