use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// Float wrapper over f32/f64. We cannot derive std::hash::Hash for floats directly,
// so route through a newtype that hashes the bit pattern instead.
struct Fl<T>(T);

macro_rules! hash_float_value {
    ($(($t:ty, $i:ty)),+) => {
        $(impl std::hash::Hash for Fl<$t> {
            #[inline]
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                state.write(&<$i>::from_ne_bytes(self.0.to_ne_bytes()).to_ne_bytes())
            }
        })+
    };
}

hash_float_value!((f64, u64), (f32, u32));

/// A literal value carried by `Expr::Literal`.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Arc<String>),
    Boolean(bool),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Arc::new(s.into()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "'{v}'"),
            Value::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use Value::*;
        match self {
            Null => 0.hash(state),
            Int(v) => v.hash(state),
            Long(v) => v.hash(state),
            Float(v) => Fl(*v).hash(state),
            Double(v) => Fl(*v).hash(state),
            String(v) => v.hash(state),
            Boolean(v) => v.hash(state),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Int(v1), Int(v2)) => v1.eq(v2),
            (Int(_), _) => false,
            (Long(v1), Long(v2)) => v1.eq(v2),
            (Long(_), _) => false,
            (Float(v1), Float(v2)) => v1.eq(v2),
            (Float(_), _) => false,
            (Double(v1), Double(v2)) => v1.eq(v2),
            (Double(_), _) => false,
            (String(v1), String(v2)) => v1.eq(v2),
            (String(_), _) => false,
            (Boolean(v1), Boolean(v2)) => v1.eq(v2),
            (Boolean(_), _) => false,
            (Null, Null) => true,
            (Null, _) => false,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use Value::*;
        match (self, other) {
            (Int(v1), Int(v2)) => v1.partial_cmp(v2),
            (Int(_), _) => None,
            (Long(v1), Long(v2)) => v1.partial_cmp(v2),
            (Long(_), _) => None,
            (Float(v1), Float(v2)) => Some(v1.total_cmp(v2)),
            (Float(_), _) => None,
            (Double(v1), Double(v2)) => Some(v1.total_cmp(v2)),
            (Double(_), _) => None,
            (String(v1), String(v2)) => v1.partial_cmp(v2),
            (String(_), _) => None,
            (Boolean(v1), Boolean(v2)) => v1.partial_cmp(v2),
            (Boolean(_), _) => None,
            (Null, Null) => Some(std::cmp::Ordering::Equal),
            (Null, _) => None,
        }
    }
}
