use std::cell::RefCell;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

use jcode_core::Literal;

use crate::callable::{Callable, Class, Function, Instance, Native};

#[derive(Clone)]
pub enum Value {
    Null,
    Number(f64),
    Str(Rc<String>),
    List(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    Native(Rc<Native>),
    Class(Rc<Class>),
    Instance(Rc<RefCell<Instance>>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Native(_) => "native function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }

    /// Only the number zero is false.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Number(n) if *n == 0.0)
    }

    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(values)))
    }

    pub(crate) fn as_callable(&self) -> Option<Rc<dyn Callable>> {
        match self {
            Value::Function(function) => Some(Rc::clone(function) as Rc<dyn Callable>),
            Value::Native(native) => Some(Rc::clone(native) as Rc<dyn Callable>),
            _ => None,
        }
    }

    /// Like `Display`, but strings are quoted. Used for values nested in lists.
    pub fn repr(&self) -> String {
        Repr(self).to_string()
    }

    // `seen` holds the lists currently being written. A list that contains itself is shown
    // as `[...]` at the point it repeats.
    fn write(
        &self,
        f: &mut Formatter<'_>,
        quoted: bool,
        seen: &mut Vec<ListPtr>,
    ) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Number(val) => write!(f, "{}", val),
            Value::Str(val) if quoted => write!(f, "\"{}\"", val),
            Value::Str(val) => write!(f, "{}", val),
            Value::List(values) => {
                let ptr = Rc::as_ptr(values);
                if seen.contains(&ptr) {
                    return write!(f, "[...]");
                }

                seen.push(ptr);
                write!(f, "[")?;
                for (i, value) in values.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    value.write(f, true, seen)?;
                }
                seen.pop();
                write!(f, "]")
            }
            Value::Function(function) => write!(f, "<{}>", function.context()),
            Value::Native(native) => write!(f, "<built-in function {}>", native.name()),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => write!(f, "<{} instance>", instance.borrow().class.name),
        }
    }

    // Pairs of lists already under comparison count as equal, which ends the walk when both
    // sides are cyclic.
    fn equals(&self, other: &Value, seen: &mut Vec<(ListPtr, ListPtr)>) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Number(lhs), Value::Number(rhs)) => lhs == rhs,
            (Value::Str(lhs), Value::Str(rhs)) => lhs == rhs,
            (Value::List(lhs), Value::List(rhs)) => {
                let pair = (Rc::as_ptr(lhs), Rc::as_ptr(rhs));
                if Rc::ptr_eq(lhs, rhs) || seen.contains(&pair) {
                    return true;
                }

                let (lhs, rhs) = (lhs.borrow(), rhs.borrow());
                if lhs.len() != rhs.len() {
                    return false;
                }
                seen.push(pair);
                let equal = lhs.iter().zip(rhs.iter()).all(|(l, r)| l.equals(r, seen));
                seen.pop();
                equal
            }
            (Value::Function(lhs), Value::Function(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Native(lhs), Value::Native(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Class(lhs), Value::Class(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Instance(lhs), Value::Instance(rhs)) => Rc::ptr_eq(lhs, rhs),
            _ => false,
        }
    }
}

type ListPtr = *const RefCell<Vec<Value>>;

struct Repr<'a>(&'a Value);

impl Display for Repr<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.write(f, true, &mut Vec::new())
    }
}

impl From<Literal> for Value {
    fn from(value: Literal) -> Self {
        match value {
            Literal::Str(val) => Value::Str(Rc::new(val)),
            Literal::Num(val) => Value::Number(val),
            Literal::Nil => Value::Null,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Number(if value { 1.0 } else { 0.0 })
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::new(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::new(String::from(value)))
    }
}

macro_rules! impl_from_num_for_value {
    ( $( $t:ident )* ) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Value {
                    Value::Number(n as f64)
                }
            }
        )*
    }
}

impl_from_num_for_value!(u8 i8 u16 i16 u32 i32 u64 i64 usize isize f32 f64);

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::list(values)
    }
}

// Lists compare by content, everything with identity compares by pointer.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, &mut Vec::new())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write(f, false, &mut Vec::new())
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Repr(self).fmt(f)
    }
}

/// A type named in a declaration or a parameter list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeclaredType {
    Int,
    Float,
    String,
    List,
    Function,
    Class(String),
}

impl DeclaredType {
    pub(crate) fn from_name(name: &str) -> Self {
        match name {
            "int" => DeclaredType::Int,
            "float" => DeclaredType::Float,
            "string" => DeclaredType::String,
            "list" => DeclaredType::List,
            "function" => DeclaredType::Function,
            other => DeclaredType::Class(String::from(other)),
        }
    }

    pub(crate) fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (DeclaredType::Int, Value::Number(n)) => n.fract() == 0.0,
            (DeclaredType::Float, Value::Number(_)) => true,
            (DeclaredType::String, Value::Str(_)) => true,
            (DeclaredType::List, Value::List(_)) => true,
            (DeclaredType::Function, Value::Function(_) | Value::Native(_)) => true,
            (DeclaredType::Class(name), Value::Instance(instance)) => {
                instance.borrow().class.is_a(name)
            }
            _ => false,
        }
    }
}

impl Display for DeclaredType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeclaredType::Int => write!(f, "int"),
            DeclaredType::Float => write!(f, "float"),
            DeclaredType::String => write!(f, "string"),
            DeclaredType::List => write!(f, "list"),
            DeclaredType::Function => write!(f, "function"),
            DeclaredType::Class(name) => write!(f, "{}", name),
        }
    }
}
