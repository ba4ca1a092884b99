use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::value::{DeclaredType, Value};

#[derive(Debug)]
struct Binding {
    value: Value,
    constant: bool,
    ty: Option<DeclaredType>,
}

#[derive(Debug)]
pub(crate) struct Environment {
    enclosing: Option<Rc<RefCell<Environment>>>,
    values: AHashMap<String, Binding>,

    // Loop scopes only own their loop variable. Declarations inside a loop body go to the
    // enclosing scope so they survive the loop.
    transparent: bool,
}

#[derive(Debug, PartialEq)]
pub(crate) enum BindingError {
    ConstantReassignment,
    TypeMismatch(DeclaredType),
}

impl Environment {
    pub(crate) fn new() -> Self {
        Environment {
            enclosing: None,
            values: AHashMap::new(),
            transparent: false,
        }
    }

    pub(crate) fn with(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            enclosing: Some(enclosing),
            values: AHashMap::new(),
            transparent: false,
        }
    }

    pub(crate) fn loop_scope(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            transparent: true,
            ..Environment::with(enclosing)
        }
    }

    /// Binds `key` in this scope with no checks. Used for parameters, loop variables and
    /// builtins.
    pub(crate) fn define(&mut self, key: &str, value: Value) {
        self.values.insert(
            String::from(key),
            Binding {
                value,
                constant: false,
                ty: None,
            },
        );
    }

    pub(crate) fn define_constant(&mut self, key: &str, value: Value) {
        self.values.insert(
            String::from(key),
            Binding {
                value,
                constant: true,
                ty: None,
            },
        );
    }

    pub(crate) fn get(&self, key: &str) -> Option<Value> {
        if let Some(binding) = self.values.get(key) {
            Some(binding.value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.as_ref().borrow().get(key)
        } else {
            None
        }
    }

    /// Handles `var x : ...` and `int x = ...`. A constant binding in the target scope can not
    /// be replaced, and a redeclared name keeps the type it was first declared with.
    pub(crate) fn declare(
        &mut self,
        key: &str,
        value: Value,
        constant: bool,
        ty: Option<DeclaredType>,
    ) -> Result<(), BindingError> {
        if self.transparent && !self.values.contains_key(key) {
            if let Some(enclosing) = &self.enclosing {
                return enclosing
                    .as_ref()
                    .borrow_mut()
                    .declare(key, value, constant, ty);
            }
        }

        let ty = match self.values.get(key) {
            Some(existing) if existing.constant => return Err(BindingError::ConstantReassignment),
            Some(existing) => ty.or_else(|| existing.ty.clone()),
            None => ty,
        };

        if let Some(ty) = &ty {
            if !ty.admits(&value) {
                return Err(BindingError::TypeMismatch(ty.clone()));
            }
        }

        self.values.insert(
            String::from(key),
            Binding {
                value,
                constant,
                ty,
            },
        );
        Ok(())
    }
}
