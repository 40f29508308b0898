use std::any::Any;
use std::cmp::PartialEq;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use dyn_clone::DynClone;
use crate::{Operator, Result};
use crate::data::Value;
use crate::expr::binary_expr;
use crate::expr::aggregate::AggregateFunction;
use crate::expr::window::{RankingFunction, WindowFunction};
use crate::tree_node::{Transformed, TreeNode, TreeNodeContainer, TreeNodeRecursion};
use crate::types::DataType;

#[derive(Clone, Debug)]
pub enum Expr {
    UnresolvedAttribute(String),
    AttributeReference(AttributeReference),
    Alias(Alias),
    Cast(Cast),
    Literal(Literal),
    UnresolvedFunction(UnresolvedFunction),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    BinaryOperator(BinaryOperator),
    Like(Like),
    In(In),
    ScalarFunction(Box<dyn ScalarFunction>),
    AggregateFunction(Box<dyn AggregateFunction>),
    DistinctAggregateFunction(DistinctAggregateFunction),
    RankingFunction(Box<dyn RankingFunction>),
    WindowFunction(Box<WindowFunction>),
}

impl Expr {
    pub fn foldable(&self) -> bool {
        match self {
            Expr::UnresolvedAttribute(_) | Expr::UnresolvedFunction(_) => false,
            // Never fold named expressions, or anything whose value depends on a
            // group of rows rather than the current one.
            Expr::AttributeReference(_)
            | Expr::Alias(_)
            | Expr::AggregateFunction(_)
            | Expr::DistinctAggregateFunction(_)
            | Expr::RankingFunction(_)
            | Expr::WindowFunction(_) => false,
            Expr::Literal(_) => true,
            Expr::ScalarFunction(f) => f.foldable(),
            _ => self.children().iter().all(|c| c.foldable()),
        }
    }

    pub fn data_type(&self) -> &DataType {
        match self {
            Expr::UnresolvedAttribute(_) | Expr::UnresolvedFunction(_) =>
                panic!("unresolved expression has no data type: {:?}", self),
            Expr::AttributeReference(a) => &a.data_type,
            Expr::Alias(e) => e.child.data_type(),
            Expr::Literal(l) => &l.data_type,
            Expr::Cast(c) => &c.data_type,
            Expr::Not(_) | Expr::IsNull(_) | Expr::IsNotNull(_) => &DataType::Boolean,
            Expr::BinaryOperator(BinaryOperator { left, op, right: _ }) => match op {
                Operator::Plus | Operator::Minus | Operator::Multiply | Operator::Divide | Operator::Modulo =>
                    left.data_type(),
                Operator::Eq | Operator::NotEq | Operator::Lt | Operator::LtEq | Operator::Gt | Operator::GtEq =>
                    &DataType::Boolean,
                Operator::And | Operator::Or => &DataType::Boolean,
            },
            Expr::Like(_) => &DataType::Boolean,
            Expr::In(_) => &DataType::Boolean,
            Expr::ScalarFunction(f) => f.data_type(),
            Expr::AggregateFunction(f) => f.data_type(),
            Expr::DistinctAggregateFunction(d) => d.aggregate().data_type(),
            Expr::RankingFunction(f) => f.data_type(),
            Expr::WindowFunction(w) => w.function.data_type(),
        }
    }

    pub fn resolved(&self) -> bool {
        match self {
            Expr::UnresolvedAttribute(_) | Expr::UnresolvedFunction(_) => false,
            _ => self.children_resolved() && self.check_input_data_types().is_ok(),
        }
    }

    pub fn children_resolved(&self) -> bool {
        self.children().iter().all(|c| c.resolved())
    }

    pub fn check_input_data_types(&self) -> Result<()> {
        match self {
            Expr::UnresolvedAttribute(_)
            | Expr::UnresolvedFunction(_)
            | Expr::AttributeReference(_)
            | Expr::Literal(_)
            | Expr::Alias(_) => Ok(()),
            Expr::Cast(_) => Ok(()),
            Expr::Not(child) => {
                if child.data_type() != &DataType::Boolean {
                    Err(format!("{:?} requires boolean type, not {}", self, child.data_type()))
                } else {
                    Ok(())
                }
            }
            Expr::IsNull(_) | Expr::IsNotNull(_) => Ok(()),
            Expr::BinaryOperator(BinaryOperator { left, op, right }) => {
                if left.data_type() != right.data_type() {
                    return Err(format!("differing types in {:?}", self));
                }
                match op {
                    Operator::Plus | Operator::Minus | Operator::Multiply | Operator::Divide | Operator::Modulo => {
                        if !left.data_type().is_numeric_type() {
                            Err(format!("{:?} requires numeric type, not {}", self, left.data_type()))
                        } else {
                            Ok(())
                        }
                    }
                    Operator::Eq | Operator::NotEq | Operator::Lt | Operator::LtEq | Operator::Gt | Operator::GtEq =>
                        if !left.data_type().is_numeric_type() && left.data_type() != &DataType::String {
                            Err(format!("{:?} requires numeric/string type, not {}", self, left.data_type()))
                        } else {
                            Ok(())
                        },
                    Operator::And | Operator::Or =>
                        if left.data_type() != &DataType::Boolean {
                            Err(format!("{:?} requires boolean type, not {}", self, left.data_type()))
                        } else {
                            Ok(())
                        },
                }
            }
            Expr::Like(Like { expr, pattern }) => {
                if expr.data_type() != &DataType::String {
                    Err(format!("{:?} requires string type, not {}", self, expr.data_type()))
                } else if pattern.data_type() != &DataType::String {
                    Err(format!("{:?} requires string type, not {}", self, pattern.data_type()))
                } else {
                    Ok(())
                }
            }
            Expr::In(In { value, list }) => {
                if list.iter().any(|e| value.data_type() != e.data_type()) {
                    Err(format!("{:?} requires same type", self))
                } else {
                    Ok(())
                }
            }
            Expr::ScalarFunction(f) => f.check_input_data_types(),
            Expr::AggregateFunction(f) => f.check_input_data_types(),
            Expr::DistinctAggregateFunction(d) => d.aggregate().check_input_data_types(),
            Expr::RankingFunction(_) => Ok(()),
            Expr::WindowFunction(_) => Ok(()),
        }
    }

    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::UnresolvedAttribute(_) | Expr::AttributeReference(_) | Expr::Literal(_) => Vec::new(),
            Expr::Alias(Alias { child, .. })
            | Expr::Cast(Cast { child, .. })
            | Expr::Not(child)
            | Expr::IsNull(child)
            | Expr::IsNotNull(child) => vec![child],
            Expr::BinaryOperator(BinaryOperator { left, right, .. }) => vec![left, right],
            Expr::Like(Like { expr, pattern }) => vec![expr, pattern],
            Expr::In(In { value, list }) => vec![value.as_ref()].into_iter().chain(list.iter()).collect(),
            Expr::ScalarFunction(f) => f.args(),
            Expr::UnresolvedFunction(UnresolvedFunction { arguments, .. }) => arguments.iter().collect(),
            Expr::AggregateFunction(f) => f.args(),
            Expr::DistinctAggregateFunction(d) => vec![d.inner.as_ref()],
            Expr::RankingFunction(_) => Vec::new(),
            Expr::WindowFunction(w) => {
                let mut children = vec![w.function.as_ref()];
                children.extend(w.spec.children());
                children
            }
        }
    }

    /// The `AttributeRef` leaves reachable in this subtree, deduplicated by
    /// `expression_id`.
    pub fn references(&self) -> Vec<AttributeReference> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        self.apply(|e| {
            if let Expr::AttributeReference(a) = e {
                if seen.insert(a.expr_id) {
                    out.push(a.clone());
                }
            }
            Ok(TreeNodeRecursion::Continue)
        })
        .expect("Expr::apply over references never errs");
        out
    }

    /// Stable structural equality: `AttributeReference`s compare by
    /// `expr_id`, everything else compares by value.
    pub fn same_or_equal(&self, other: &Expr) -> bool {
        self == other
    }

    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias(Alias::new(self, name.into()))
    }

    pub fn cast(self, data_type: DataType) -> Expr {
        Expr::Cast(Cast::new(self, data_type))
    }

    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Box::new(self))
    }

    pub fn attr(name: impl Into<String>, data_type: DataType) -> Expr {
        Expr::AttributeReference(AttributeReference::new(name, data_type))
    }

    pub fn lit(value: Value, data_type: DataType) -> Expr {
        Expr::Literal(Literal::new(value, data_type))
    }

    pub fn int_lit(v: i32) -> Expr {
        Expr::Literal(Literal::new(Value::Int(v), DataType::Int))
    }

    pub fn long_lit(v: i64) -> Expr {
        Expr::Literal(Literal::new(Value::Long(v), DataType::Long))
    }

    pub fn string_lit(s: impl Into<String>) -> Expr {
        Expr::Literal(Literal::new(Value::string(s), DataType::String))
    }

    /// Return `self == other`
    pub fn eq(self, other: Expr) -> Expr {
        binary_expr(self, Operator::Eq, other)
    }

    /// Return `self > other`
    pub fn gt(self, other: Expr) -> Expr {
        binary_expr(self, Operator::Gt, other)
    }

    /// Return `self LIKE other`
    pub fn like(self, other: Expr) -> Expr {
        Expr::Like(Like::new(Box::new(self), Box::new(other)))
    }

    /// Return `self AND other`
    pub fn and(self, other: Expr) -> Expr {
        binary_expr(self, Operator::And, other)
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expr::UnresolvedAttribute(a), Expr::UnresolvedAttribute(b)) => a == b,
            (Expr::AttributeReference(a), Expr::AttributeReference(b)) => a == b,
            (Expr::Alias(a), Expr::Alias(b)) => a == b,
            (Expr::Cast(a), Expr::Cast(b)) => a == b,
            (Expr::Literal(a), Expr::Literal(b)) => a == b,
            (Expr::UnresolvedFunction(a), Expr::UnresolvedFunction(b)) => a == b,
            (Expr::Not(a), Expr::Not(b)) => a == b,
            (Expr::IsNull(a), Expr::IsNull(b)) => a == b,
            (Expr::IsNotNull(a), Expr::IsNotNull(b)) => a == b,
            (Expr::BinaryOperator(a), Expr::BinaryOperator(b)) => a == b,
            (Expr::Like(a), Expr::Like(b)) => a == b,
            (Expr::In(a), Expr::In(b)) => a == b,
            (Expr::ScalarFunction(a), Expr::ScalarFunction(b)) => a == b,
            (Expr::AggregateFunction(a), Expr::AggregateFunction(b)) => a == b,
            (Expr::DistinctAggregateFunction(a), Expr::DistinctAggregateFunction(b)) => a == b,
            (Expr::RankingFunction(a), Expr::RankingFunction(b)) => a == b,
            (Expr::WindowFunction(a), Expr::WindowFunction(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Expr::UnresolvedAttribute(a) => a.hash(state),
            Expr::AttributeReference(a) => a.hash(state),
            Expr::Alias(a) => a.hash(state),
            Expr::Cast(a) => a.hash(state),
            Expr::Literal(a) => a.hash(state),
            Expr::UnresolvedFunction(a) => a.hash(state),
            Expr::Not(a) | Expr::IsNull(a) | Expr::IsNotNull(a) => a.hash(state),
            Expr::BinaryOperator(a) => a.hash(state),
            Expr::Like(a) => a.hash(state),
            Expr::In(a) => a.hash(state),
            Expr::ScalarFunction(a) => a.hash(state),
            Expr::AggregateFunction(a) => a.hash(state),
            Expr::DistinctAggregateFunction(a) => a.hash(state),
            Expr::RankingFunction(a) => a.hash(state),
            Expr::WindowFunction(a) => a.hash(state),
        }
    }
}

impl<'a> TreeNodeContainer<'a, Self> for Expr {
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

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Alias {
    pub child: Box<Expr>,
    pub name: String,
    pub expr_id: u32,
}

impl Alias {
    pub fn new(expr: Expr, name: impl Into<String>) -> Self {
        Self {
            child: Box::new(expr),
            name: name.into(),
            expr_id: ExprIdGenerator::get_next_expr_id(),
        }
    }

    pub fn new_with_expr_id(expr: Expr, name: impl Into<String>, expr_id: u32) -> Self {
        Self { child: Box::new(expr), name: name.into(), expr_id }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Cast {
    pub child: Box<Expr>,
    pub data_type: DataType,
}

impl Cast {
    pub fn new(expr: Expr, data_type: DataType) -> Self {
        Self { child: Box::new(expr), data_type }
    }
}

/// A resolved, named leaf. Equality and hashing are by `expr_id` only: two
/// references to the same binding compare equal even if cloned, renamed, or
/// (in principle) retyped along the way.
#[derive(Clone, Debug)]
pub struct AttributeReference {
    pub name: String,
    pub data_type: DataType,
    pub expr_id: u32,
    /// Set only for attributes minted by `GroupingAlias`/`AggregationAlias`/
    /// `WindowAlias`. Never appears in user-visible output.
    pub internal: bool,
}

impl AttributeReference {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let expr_id = ExprIdGenerator::get_next_expr_id();
        AttributeReference { name: name.into(), data_type, expr_id, internal: false }
    }

    pub fn new_with_expr_id(name: impl Into<String>, data_type: DataType, expr_id: u32) -> Self {
        AttributeReference { name: name.into(), data_type, expr_id, internal: false }
    }

    pub fn new_internal(name: impl Into<String>, data_type: DataType, expr_id: u32) -> Self {
        AttributeReference { name: name.into(), data_type, expr_id, internal: true }
    }

    pub fn with_expr_id(&self, expr_id: u32) -> Self {
        AttributeReference { name: self.name.clone(), data_type: self.data_type.clone(), expr_id, internal: self.internal }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        AttributeReference { name: name.into(), data_type: self.data_type.clone(), expr_id: self.expr_id, internal: self.internal }
    }
}

impl PartialEq for AttributeReference {
    fn eq(&self, other: &Self) -> bool {
        self.expr_id == other.expr_id
    }
}

impl Eq for AttributeReference {}

impl Hash for AttributeReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.expr_id.hash(state);
    }
}

pub(crate) struct ExprIdGenerator {
    counter: std::sync::atomic::AtomicU32,
}

impl ExprIdGenerator {
    pub(crate) fn get_next_expr_id() -> u32 {
        static INSTANCE: ExprIdGenerator = ExprIdGenerator {
            counter: std::sync::atomic::AtomicU32::new(0),
        };
        INSTANCE.counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Literal {
    pub value: Value,
    pub data_type: DataType,
}

impl Literal {
    pub fn new(value: Value, data_type: DataType) -> Self {
        Self { value, data_type }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnresolvedFunction {
    pub name: String,
    pub arguments: Vec<Expr>,
}

/// Binary operator
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct BinaryOperator {
    pub left: Box<Expr>,
    pub op: Operator,
    pub right: Box<Expr>,
}

impl BinaryOperator {
    pub fn new(left: Box<Expr>, op: Operator, right: Box<Expr>) -> Self {
        Self { left, op, right }
    }
}

/// LIKE expression
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Like {
    pub expr: Box<Expr>,
    pub pattern: Box<Expr>,
}

impl Like {
    pub fn new(expr: Box<Expr>, pattern: Box<Expr>) -> Self {
        Self { expr, pattern }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct In {
    pub value: Box<Expr>,
    pub list: Vec<Expr>,
}

impl In {
    pub fn new(value: Box<Expr>, list: Vec<Expr>) -> Self {
        Self { value, list }
    }
}

/// A wrapper that marks an `AggregateFunction` as `DISTINCT`, e.g.
/// `count(DISTINCT x)`. `inner` is always `Expr::AggregateFunction(_)`; kept
/// boxed as a plain `Expr` so tree traversal needs no special case to reach
/// into it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DistinctAggregateFunction {
    pub inner: Box<Expr>,
}

impl DistinctAggregateFunction {
    pub fn new(inner: Box<dyn AggregateFunction>) -> Self {
        Self { inner: Box::new(Expr::AggregateFunction(inner)) }
    }

    pub fn aggregate(&self) -> &dyn AggregateFunction {
        match self.inner.as_ref() {
            Expr::AggregateFunction(f) => f.as_ref(),
            _ => unreachable!("DistinctAggregateFunction::inner is always an AggregateFunction"),
        }
    }
}

pub trait ScalarFunction: Debug + Send + Sync + DynClone {
    fn as_any(&self) -> &dyn Any;
    fn name(&self) -> &str;
    fn foldable(&self) -> bool {
        self.args().iter().all(|arg| arg.foldable())
    }
    fn data_type(&self) -> &DataType;
    fn args(&self) -> Vec<&Expr>;
    fn check_input_data_types(&self) -> Result<()>;
    fn rewrite_args(&self, args: Vec<Expr>) -> Box<dyn ScalarFunction>;
}

dyn_clone::clone_trait_object!(ScalarFunction);

impl PartialEq for Box<dyn ScalarFunction> {
    fn eq(&self, other: &Self) -> bool {
        if self.as_any().type_id() != other.as_any().type_id() {
            return false;
        }
        let args1 = self.args();
        let args2 = other.args();
        args1.len() == args2.len() && args1.iter().zip(args2.iter()).all(|(a, b)| a == b)
    }
}

impl Eq for Box<dyn ScalarFunction> {}

impl Hash for Box<dyn ScalarFunction> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for x in self.args() {
            x.hash(state);
        }
    }
}
