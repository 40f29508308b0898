use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum DataType {
    Null,
    Int,
    Long,
    Float,
    Double,
    String,
    Boolean,
}

impl DataType {
    pub fn null_type() -> DataType {
        DataType::Null
    }

    pub fn int_type() -> DataType {
        DataType::Int
    }

    pub fn long_type() -> DataType {
        DataType::Long
    }

    pub fn float_type() -> DataType {
        DataType::Float
    }

    pub fn double_type() -> DataType {
        DataType::Double
    }

    pub fn string_type() -> DataType {
        DataType::String
    }

    pub fn boolean_type() -> DataType {
        DataType::Boolean
    }

    pub fn is_numeric_type(&self) -> bool {
        matches!(self, DataType::Int | DataType::Long | DataType::Float | DataType::Double)
    }

    /// All types left in this engine are atomic; kept as a predicate so call
    /// sites read the same way they would over a richer type system.
    pub fn is_atomic_type(&self) -> bool {
        true
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Null => "null",
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::String => "string",
            DataType::Boolean => "boolean",
        };
        write!(f, "{s}")
    }
}

/// A type-class describing what concrete `DataType`s an argument slot will
/// accept, used by aggregate functions to type-check before a concrete type
/// has been chosen.
#[derive(Clone, Debug)]
pub enum AbstractDataType {
    Numeric,
    Type(DataType),
    Collection(Vec<AbstractDataType>),
}

impl AbstractDataType {
    pub fn accepts_type(&self, data_type: &DataType) -> bool {
        match self {
            AbstractDataType::Numeric => data_type.is_numeric_type(),
            AbstractDataType::Type(t) => t == data_type,
            AbstractDataType::Collection(types) => types.iter().any(|t| t.accepts_type(data_type)),
        }
    }

    pub fn is_numeric_type(&self) -> bool {
        match self {
            AbstractDataType::Numeric => true,
            AbstractDataType::Type(t) => t.is_numeric_type(),
            AbstractDataType::Collection(types) => types.iter().all(|t| t.is_numeric_type()),
        }
    }

    pub fn default_concrete_type(&self) -> DataType {
        match self {
            AbstractDataType::Numeric => DataType::Double,
            AbstractDataType::Type(t) => t.clone(),
            AbstractDataType::Collection(types) => types
                .first()
                .map(|t| t.default_concrete_type())
                .unwrap_or(DataType::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_predicate() {
        assert!(DataType::Long.is_numeric_type());
        assert!(!DataType::String.is_numeric_type());
    }

    #[test]
    fn abstract_type_accepts() {
        let numeric = AbstractDataType::Numeric;
        assert!(numeric.accepts_type(&DataType::Int));
        assert!(!numeric.accepts_type(&DataType::String));

        let any_of = AbstractDataType::Collection(vec![
            AbstractDataType::Type(DataType::String),
            AbstractDataType::Numeric,
        ]);
        assert!(any_of.accepts_type(&DataType::String));
        assert!(any_of.accepts_type(&DataType::Double));
        assert!(!any_of.accepts_type(&DataType::Boolean));
    }
}
