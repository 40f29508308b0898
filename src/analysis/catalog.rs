use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use crate::Result;
use crate::expr::{AggregateFunction, Avg, Count, Expr, Max, Min, Sum};

/// The builder side of a `FunctionInfo`: takes the call's arguments and
/// produces the `Expr` that represents the resolved call. Variadic;
/// arity checking is the builder's job.
type AggregateBuilder = dyn Fn(Vec<Expr>) -> Result<Box<dyn AggregateFunction>> + Send + Sync;

/// A catalog entry: the canonical name and how to build a call to it.
/// `lookup_function` is the only piece of the surrounding catalog this
/// pipeline depends on; table lookup, DDL, and persistence live entirely
/// outside this crate.
pub struct FunctionInfo {
    pub name: &'static str,
    builder: Box<AggregateBuilder>,
}

impl FunctionInfo {
    pub fn build(&self, args: Vec<Expr>) -> Result<Box<dyn AggregateFunction>> {
        (self.builder)(args)
    }
}

struct Catalog {
    functions: HashMap<String, FunctionInfo>,
}

impl Catalog {
    fn lookup_function(&self, name: &str) -> Result<&FunctionInfo> {
        self.functions
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| format!("undefined aggregate function: {name}"))
    }
}

static CATALOG: LazyLock<Mutex<Catalog>> = LazyLock::new(|| Mutex::new(builtin_catalog()));

fn unary(args: Vec<Expr>, name: &str) -> Result<Expr> {
    let mut args = args;
    if args.len() != 1 {
        return Err(format!("{name} takes exactly one argument, got {}", args.len()));
    }
    Ok(args.remove(0))
}

fn builtin_catalog() -> Catalog {
    let mut functions = HashMap::new();
    functions.insert(
        "count".to_string(),
        FunctionInfo { name: "count", builder: Box::new(|args| Ok(Box::new(Count::new(unary(args, "count")?)))) },
    );
    functions.insert(
        "sum".to_string(),
        FunctionInfo { name: "sum", builder: Box::new(|args| Ok(Box::new(Sum::new(unary(args, "sum")?)))) },
    );
    functions.insert(
        "max".to_string(),
        FunctionInfo { name: "max", builder: Box::new(|args| Ok(Box::new(Max::new(unary(args, "max")?)))) },
    );
    functions.insert(
        "min".to_string(),
        FunctionInfo { name: "min", builder: Box::new(|args| Ok(Box::new(Min::new(unary(args, "min")?)))) },
    );
    functions.insert(
        "avg".to_string(),
        FunctionInfo { name: "avg", builder: Box::new(|args| Ok(Box::new(Avg::new(unary(args, "avg")?)))) },
    );
    Catalog { functions }
}

/// Look up an aggregate function by name (case-insensitive) and build it
/// against `args`. `FunctionNotFound` surfaces as a plain `Err` string, the
/// same convention as the rest of this pipeline's error handling.
pub fn lookup_function(name: &str, args: Vec<Expr>) -> Result<Box<dyn AggregateFunction>> {
    let catalog = CATALOG.lock().unwrap();
    catalog.lookup_function(name)?.build(args)
}

/// The `expression_id` minting service. The aggregation pipeline itself
/// mints ids through `ExprIdGenerator`; this wraps the same counter for
/// callers outside the `expr` module that only need a fresh identity.
pub fn fresh_id() -> u64 {
    crate::expr::ExprIdGenerator::get_next_expr_id() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn lookup_known_function() {
        let args = vec![Expr::attr("x", DataType::Int)];
        let f = lookup_function("COUNT", args).unwrap();
        assert_eq!(f.name(), "count");
    }

    #[test]
    fn lookup_unknown_function_errs() {
        assert!(lookup_function("bogus", vec![]).is_err());
    }

    #[test]
    fn wrong_arity_errs() {
        assert!(lookup_function("sum", vec![]).is_err());
    }
}
