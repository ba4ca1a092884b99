use std::cell::RefCell;
use std::rc::Rc;

use jcode_core::Span;

use crate::callable::{Callable, Native};
use crate::env::Environment;
use crate::error::{Error, ErrorKind};
use crate::value::Value;

/// Installs the builtin functions and constants into a global scope.
pub(crate) fn install(globals: &Rc<RefCell<Environment>>) {
    let mut env = globals.borrow_mut();

    env.define_constant("null", Value::Null);
    env.define_constant("true", Value::from(true));
    env.define_constant("false", Value::from(false));

    let natives = [
        Native::new(Box::new(len), "len", 1),
        Native::new(Box::new(append), "append", 2),
        Native::new(Box::new(pop), "pop", 2),
        Native::new(Box::new(type_of), "type", 1),
    ];
    for native in natives {
        let name = String::from(native.name());
        env.define(&name, Value::Native(Rc::new(native)));
    }
}

fn len(args: &[Value], span: &Span) -> Result<Value, Error> {
    match &args[0] {
        Value::List(values) => Ok(Value::from(values.borrow().len())),
        Value::Str(val) => Ok(Value::from(val.chars().count())),
        other => Err(mismatch(span, "len", "a list or string", other)),
    }
}

fn append(args: &[Value], span: &Span) -> Result<Value, Error> {
    match &args[0] {
        Value::List(values) => {
            values.borrow_mut().push(args[1].clone());
            Ok(args[0].clone())
        }
        other => Err(mismatch(span, "append", "a list", other)),
    }
}

fn pop(args: &[Value], span: &Span) -> Result<Value, Error> {
    let Value::List(values) = &args[0] else {
        return Err(mismatch(span, "pop", "a list", &args[0]));
    };
    let Value::Number(index) = args[1] else {
        return Err(mismatch(span, "pop", "a number index", &args[1]));
    };

    let mut values = values.borrow_mut();
    if index.fract() != 0.0 || index < 0.0 || index as usize >= values.len() {
        return Err(Error::new(
            ErrorKind::IndexOutOfRange,
            span,
            format_args!(
                "pop() index {} is out of range for a list of length {}",
                index,
                values.len()
            ),
        ));
    }
    Ok(values.remove(index as usize))
}

fn type_of(args: &[Value], _: &Span) -> Result<Value, Error> {
    Ok(Value::from(args[0].type_name()))
}

fn mismatch(span: &Span, name: &str, expected: &str, got: &Value) -> Error {
    Error::new(
        ErrorKind::TypeMismatch,
        span,
        format_args!("{}() expects {}, got {}", name, expected, got.type_name()),
    )
}
