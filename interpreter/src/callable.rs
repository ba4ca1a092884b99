use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use ahash::AHashMap;
use jcode_core::Span;

use crate::ast::FunctionDecl;
use crate::env::Environment;
use crate::error::{Error, ErrorKind};
use crate::interpreter::{Flow, Interpreter};
use crate::value::{DeclaredType, Value};

pub(crate) const CONSTRUCTOR: &str = "__init__";

pub(crate) trait Callable {
    fn name(&self) -> &str;
    fn arity(&self) -> usize;

    /// Label used for stack trace frames.
    fn context(&self) -> String;

    fn execute(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: &[Value],
        call_site: &Span,
    ) -> Result<Value, Error>;
}

impl Debug for dyn Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.context())
    }
}

pub(crate) type BoxedFunction = Box<dyn Fn(&[Value], &Span) -> Result<Value, Error>>;

// `Native` bridges rust closures and JCode calls. All of them live in the global scope.
pub struct Native {
    func: BoxedFunction,
    name: String,
    arity: usize,
}

impl Native {
    pub(crate) fn new(func: BoxedFunction, name: &str, arity: usize) -> Self {
        Native {
            func,
            name: String::from(name),
            arity,
        }
    }
}

impl Debug for Native {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<built-in function {}>", self.name)
    }
}

impl Callable for Native {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn context(&self) -> String {
        format!("built-in function {}", self.name)
    }

    fn execute(
        self: Rc<Self>,
        _: &mut Interpreter,
        args: &[Value],
        call_site: &Span,
    ) -> Result<Value, Error> {
        (self.func)(args, call_site)
    }
}

/// A user function or method. Methods are stored unbound in their class and bound to an
/// instance on access, which only clones the `Rc`s.
pub struct Function {
    pub(crate) decl: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    owner: Option<String>,
    this: Option<Rc<RefCell<Instance>>>,
}

impl Function {
    pub(crate) fn new(decl: Rc<FunctionDecl>, closure: Rc<RefCell<Environment>>) -> Self {
        Function {
            decl,
            closure,
            owner: None,
            this: None,
        }
    }

    pub(crate) fn method(
        decl: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        owner: &str,
    ) -> Self {
        Function {
            owner: Some(String::from(owner)),
            ..Function::new(decl, closure)
        }
    }

    pub(crate) fn bind(&self, instance: Rc<RefCell<Instance>>) -> Rc<Function> {
        Rc::new(Function {
            decl: Rc::clone(&self.decl),
            closure: Rc::clone(&self.closure),
            owner: self.owner.clone(),
            this: Some(instance),
        })
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.context())
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        self.decl
            .name
            .as_ref()
            .map_or("<anonymous>", |name| name.lexeme.as_str())
    }

    fn arity(&self) -> usize {
        self.decl.params.len()
    }

    fn context(&self) -> String {
        match (&self.owner, self.decl.is_constructor) {
            (Some(owner), true) => format!("constructor of {}", owner),
            (Some(owner), false) => format!("method {}.{}", owner, self.name()),
            (None, _) if self.decl.name.is_none() => String::from("anonymous function"),
            (None, _) => format!("function {}", self.name()),
        }
    }

    fn execute(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: &[Value],
        _: &Span,
    ) -> Result<Value, Error> {
        let mut env = Environment::with(Rc::clone(&self.closure));
        if let Some(instance) = &self.this {
            env.define("this", Value::Instance(Rc::clone(instance)));
        }

        for (param, arg) in self.decl.params.iter().zip(args) {
            if let Some(ty) = &param.ty {
                let declared = DeclaredType::from_name(&ty.lexeme);
                if !declared.admits(arg) {
                    return Err(Error::new(
                        ErrorKind::TypeMismatch,
                        &param.name.span,
                        format_args!(
                            "Parameter '{}' of {} expects {}, got {}",
                            param.name.lexeme,
                            self.context(),
                            declared,
                            arg.type_name()
                        ),
                    ));
                }
            }
            env.define(&param.name.lexeme, arg.clone());
        }

        match interpreter.evaluate(&self.decl.body, Rc::new(RefCell::new(env)))? {
            Flow::Value(value) if self.decl.auto_return => Ok(value),
            Flow::Value(_) => Ok(Value::Null),
            Flow::Return(value) => Ok(value),
            Flow::Break(span) => Err(outside_loop(&span, "break")),
            Flow::Continue(span) => Err(outside_loop(&span, "continue")),
        }
    }
}

pub(crate) fn outside_loop(span: &Span, keyword: &str) -> Error {
    Error::new(
        ErrorKind::ControlFlowOutsideLoop,
        span,
        format_args!("'{}' used outside of a loop", keyword),
    )
}

pub struct Class {
    pub(crate) name: String,
    parent: Option<Rc<Class>>,
    methods: AHashMap<String, Rc<Function>>,
}

impl Class {
    pub(crate) fn new(
        name: &str,
        parent: Option<Rc<Class>>,
        methods: AHashMap<String, Rc<Function>>,
    ) -> Rc<Self> {
        Rc::new(Class {
            name: String::from(name),
            parent,
            methods,
        })
    }

    pub(crate) fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            Some(Rc::clone(method))
        } else if let Some(parent) = &self.parent {
            parent.find_method(name)
        } else {
            None
        }
    }

    pub(crate) fn constructor(&self) -> Option<Rc<Function>> {
        self.find_method(CONSTRUCTOR)
    }

    /// Whether this class is `name` or inherits from it.
    pub(crate) fn is_a(&self, name: &str) -> bool {
        self.name == name || self.parent.as_ref().map_or(false, |parent| parent.is_a(name))
    }
}

impl Debug for Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

pub struct Instance {
    pub(crate) class: Rc<Class>,
    fields: AHashMap<String, Value>,
}

impl Instance {
    pub(crate) fn new(class: Rc<Class>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Instance {
            class,
            fields: AHashMap::new(),
        }))
    }

    pub(crate) fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    /// Own attributes first, then methods bound to `instance`.
    pub(crate) fn get(instance: &Rc<RefCell<Self>>, name: &str) -> Option<Value> {
        let this = instance.borrow();
        if let Some(field) = this.fields.get(name) {
            Some(field.clone())
        } else {
            this.class
                .find_method(name)
                .map(|method| Value::Function(method.bind(Rc::clone(instance))))
        }
    }

    pub(crate) fn set(&mut self, name: &str, value: Value) -> Value {
        self.fields.insert(String::from(name), value.clone());
        value
    }
}

// Fields can point back at the instance, so only the class is printed.
impl Debug for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}
