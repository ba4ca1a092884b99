use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use ahash::AHashMap;
use jcode_core::{Span, Token, Type};
use tracing::{debug, trace};

use crate::ast::{Case, ElseCase, FunctionDecl, Node, Visitor};
use crate::callable::{outside_loop, Callable, Class, Function, Instance};
use crate::env::{BindingError, Environment};
use crate::error::{Error, ErrorKind};
use crate::limits::{MAX_CALL_DEPTH, MAX_STRING_LEN, STACK_RED_ZONE, STACK_SEGMENT_SIZE};
use crate::value::{DeclaredType, Value};

/// The outcome of evaluating a node: a value, or a signal travelling up to the construct that
/// absorbs it.
#[derive(Debug, PartialEq)]
pub(crate) enum Flow {
    Value(Value),
    Return(Value),
    Break(Span),
    Continue(Span),
}

// Unwraps a plain value or hands the signal back to the caller.
macro_rules! value {
    ($flow:expr) => {
        match $flow {
            Flow::Value(value) => value,
            signal => return Ok(signal),
        }
    };
}

type FlowResult = Result<Flow, Error>;

pub(crate) struct Interpreter {
    env: Rc<RefCell<Environment>>,
    depth: usize,
}

impl Interpreter {
    pub(crate) fn new(globals: Rc<RefCell<Environment>>) -> Self {
        Interpreter {
            env: globals,
            depth: 0,
        }
    }

    /// Evaluates a whole program. Every top-level statement contributes its value to the
    /// resulting list; a top-level `return` stops the program after contributing its value.
    pub(crate) fn interpret(&mut self, program: &Node) -> Result<Value, Error> {
        let statements = match program {
            Node::Sequence { statements, .. } => statements.as_slice(),
            other => std::slice::from_ref(other),
        };

        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            match self.visit_node(statement)? {
                Flow::Value(value) => results.push(value),
                Flow::Return(value) => {
                    results.push(value);
                    break;
                }
                Flow::Break(span) => return Err(outside_loop(&span, "break")),
                Flow::Continue(span) => return Err(outside_loop(&span, "continue")),
            }
        }

        Ok(Value::list(results))
    }

    /// Evaluates `node` with `env` as the current scope, restoring the previous scope after.
    pub(crate) fn evaluate(&mut self, node: &Node, env: Rc<RefCell<Environment>>) -> FlowResult {
        let previous = mem::replace(&mut self.env, env);
        let result = self.visit_node(node);
        self.env = previous;
        result
    }

    fn call(&mut self, callee: &Value, args: &[Value], span: &Span) -> Result<Value, Error> {
        match callee.as_callable() {
            Some(callable) => self.invoke(callable, args, span),
            None => match callee {
                Value::Class(class) => Err(Error::new(
                    ErrorKind::NotCallable,
                    span,
                    format_args!(
                        "Class '{0}' is not callable. Use 'new {0}(...)' to create an instance",
                        class.name
                    ),
                )),
                other => Err(Error::new(
                    ErrorKind::NotCallable,
                    span,
                    format_args!("A {} value is not callable", other.type_name()),
                )),
            },
        }
    }

    fn invoke(
        &mut self,
        callable: Rc<dyn Callable>,
        args: &[Value],
        span: &Span,
    ) -> Result<Value, Error> {
        if args.len() != callable.arity() {
            return Err(Error::new(
                ErrorKind::ArityMismatch,
                span,
                format_args!(
                    "{} expects {} argument(s), got {}",
                    callable.context(),
                    callable.arity(),
                    args.len()
                ),
            ));
        }

        if self.depth >= MAX_CALL_DEPTH {
            return Err(Error::new(
                ErrorKind::StackOverflow,
                span,
                format_args!("Maximum call depth of {} exceeded", MAX_CALL_DEPTH),
            ));
        }

        self.depth += 1;
        trace!(callee = callable.name(), depth = self.depth, "call");
        let context = callable.context();
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || {
            callable.execute(self, args, span)
        });
        self.depth -= 1;

        result.map_err(|err| err.with_frame(span, context))
    }

    fn bind(
        &mut self,
        name: &Token,
        value: Value,
        constant: bool,
        ty: Option<DeclaredType>,
        span: &Span,
    ) -> Result<(), Error> {
        let res = self
            .env
            .borrow_mut()
            .declare(&name.lexeme, value.clone(), constant, ty);

        res.map_err(|err| match err {
            BindingError::ConstantReassignment => Error::new(
                ErrorKind::ConstantReassignment,
                span,
                format_args!("Cannot reassign constant '{}'", name.lexeme),
            ),
            BindingError::TypeMismatch(ty) => Error::new(
                ErrorKind::TypeMismatch,
                span,
                format_args!(
                    "Cannot assign a {} to '{}' declared as {}",
                    value.type_name(),
                    name.lexeme,
                    ty
                ),
            ),
        })
    }

    fn lookup(&self, name: &Token) -> Result<Value, Error> {
        self.env.borrow().get(&name.lexeme).ok_or_else(|| {
            Error::new(
                ErrorKind::UndefinedVariable,
                &name.span,
                format_args!("'{}' is not defined", name.lexeme),
            )
        })
    }

    fn number(&mut self, node: &Node, role: &str) -> Result<Result<f64, Flow>, Error> {
        match self.visit_node(node)? {
            Flow::Value(Value::Number(n)) => Ok(Ok(n)),
            Flow::Value(other) => Err(Error::new(
                ErrorKind::TypeMismatch,
                node.span(),
                format_args!("Loop {} must be a number, got {}", role, other.type_name()),
            )),
            signal => Ok(Err(signal)),
        }
    }

    fn binary_op(
        &self,
        left: Value,
        operator: &Token,
        right: Value,
        span: &Span,
    ) -> Result<Value, Error> {
        use Value::{List, Number, Str};

        let value = match (operator.ty, &left, &right) {
            (Type::EqualEqual, _, _) => Value::from(left == right),
            (Type::BangEqual, _, _) => Value::from(left != right),

            (Type::Plus, Number(l), Number(r)) => Value::from(l + r),
            (Type::Plus, Str(l), Str(r)) => Value::from(format!("{}{}", l, r)),
            (Type::Plus, List(l), List(r)) => {
                let mut values = l.borrow().clone();
                values.extend(r.borrow().iter().cloned());
                Value::list(values)
            }
            (Type::Minus, Number(l), Number(r)) => Value::from(l - r),
            (Type::Star, Number(l), Number(r)) => Value::from(l * r),
            (Type::Star, Str(s), Number(n)) | (Type::Star, Number(n), Str(s)) => {
                if n.fract() != 0.0 || *n < 0.0 {
                    return Err(Error::new(
                        ErrorKind::TypeMismatch,
                        span,
                        format_args!("Can only repeat a string a whole number of times, got {}", n),
                    ));
                }
                let len = s.len().checked_mul(*n as usize).filter(|len| *len <= MAX_STRING_LEN);
                if len.is_none() {
                    return Err(Error::new(
                        ErrorKind::TypeMismatch,
                        span,
                        format_args!(
                            "Repeating a string {} times exceeds the string size limit",
                            n
                        ),
                    ));
                }
                Value::from(s.repeat(*n as usize))
            }
            (Type::Slash | Type::Percent, Number(_), Number(r)) if *r == 0.0 => {
                let op = if operator.is(Type::Slash) { "Division" } else { "Modulo" };
                return Err(Error::new(
                    ErrorKind::DivisionByZero,
                    span,
                    format_args!("{} by zero", op),
                ));
            }
            (Type::Slash, Number(l), Number(r)) => Value::from(l / r),
            (Type::Percent, Number(l), Number(r)) => Value::from(l % r),
            (Type::Caret, Number(l), Number(r)) => Value::from(l.powf(*r)),

            (Type::Less, Number(l), Number(r)) => Value::from(l < r),
            (Type::LessEqual, Number(l), Number(r)) => Value::from(l <= r),
            (Type::Greater, Number(l), Number(r)) => Value::from(l > r),
            (Type::GreaterEqual, Number(l), Number(r)) => Value::from(l >= r),
            (Type::Less, Str(l), Str(r)) => Value::from(l < r),
            (Type::LessEqual, Str(l), Str(r)) => Value::from(l <= r),
            (Type::Greater, Str(l), Str(r)) => Value::from(l > r),
            (Type::GreaterEqual, Str(l), Str(r)) => Value::from(l >= r),

            _ => {
                return Err(Error::new(
                    ErrorKind::TypeMismatch,
                    span,
                    format_args!(
                        "Unsupported operand types for '{}': {} and {}",
                        operator.lexeme,
                        left.type_name(),
                        right.type_name()
                    ),
                ))
            }
        };

        Ok(value)
    }

    fn index_of(index: &Value, len: usize, span: &Span) -> Result<usize, Error> {
        let Value::Number(n) = index else {
            return Err(Error::new(
                ErrorKind::TypeMismatch,
                span,
                format_args!("Index must be a number, got {}", index.type_name()),
            ));
        };

        if n.fract() != 0.0 {
            return Err(Error::new(
                ErrorKind::TypeMismatch,
                span,
                format_args!("Index must be a whole number, got {}", n),
            ));
        }

        if *n < 0.0 || *n as usize >= len {
            return Err(Error::new(
                ErrorKind::IndexOutOfRange,
                span,
                format_args!("Index {} is out of range for length {}", n, len),
            ));
        }

        Ok(*n as usize)
    }

    /// Folds one loop iteration into `results`. Returns the loop's outcome once it has to stop.
    fn collect_loop(
        flow: Flow,
        results: &mut Vec<Value>,
        should_return_null: bool,
    ) -> Option<Flow> {
        match flow {
            Flow::Value(value) => {
                if !should_return_null {
                    results.push(value);
                }
                None
            }
            Flow::Continue(_) => None,
            Flow::Break(_) => Some(Flow::Value(Value::Null)),
            ret @ Flow::Return(_) => Some(ret),
        }
    }
}

impl Visitor for Interpreter {
    type Item = Flow;

    fn visit_number(&mut self, token: &Token) -> FlowResult {
        Ok(Flow::Value(Value::from(token.value.clone())))
    }

    fn visit_string(&mut self, token: &Token) -> FlowResult {
        Ok(Flow::Value(Value::from(token.value.clone())))
    }

    fn visit_list(&mut self, elements: &[Node]) -> FlowResult {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(value!(self.visit_node(element)?));
        }
        Ok(Flow::Value(Value::list(values)))
    }

    // A nested block is worth its last statement.
    fn visit_sequence(&mut self, statements: &[Node], _: &Span) -> FlowResult {
        let mut last = Value::Null;
        for statement in statements {
            last = value!(self.visit_node(statement)?);
        }
        Ok(Flow::Value(last))
    }

    fn visit_var_access(&mut self, name: &Token) -> FlowResult {
        self.lookup(name).map(Flow::Value)
    }

    fn visit_var_assign(
        &mut self,
        name: &Token,
        value: &Node,
        declared: Option<&Token>,
        constant: bool,
        span: &Span,
    ) -> FlowResult {
        let value = value!(self.visit_node(value)?);
        let ty = declared.map(|ty| DeclaredType::from_name(&ty.lexeme));
        self.bind(name, value.clone(), constant, ty, span)?;
        Ok(Flow::Value(value))
    }

    fn visit_binary(
        &mut self,
        left: &Node,
        operator: &Token,
        right: &Node,
        span: &Span,
    ) -> FlowResult {
        match operator.ty {
            Type::And => {
                if !value!(self.visit_node(left)?).is_truthy() {
                    return Ok(Flow::Value(Value::from(false)));
                }
                let right = value!(self.visit_node(right)?);
                Ok(Flow::Value(Value::from(right.is_truthy())))
            }
            Type::Or => {
                if value!(self.visit_node(left)?).is_truthy() {
                    return Ok(Flow::Value(Value::from(true)));
                }
                let right = value!(self.visit_node(right)?);
                Ok(Flow::Value(Value::from(right.is_truthy())))
            }
            _ => {
                let left = value!(self.visit_node(left)?);
                let right = value!(self.visit_node(right)?);
                self.binary_op(left, operator, right, span).map(Flow::Value)
            }
        }
    }

    fn visit_unary(&mut self, operator: &Token, operand: &Node, span: &Span) -> FlowResult {
        let operand = value!(self.visit_node(operand)?);
        let value = match (operator.ty, &operand) {
            (Type::Not, _) => Value::from(!operand.is_truthy()),
            (Type::Minus, Value::Number(n)) => Value::from(-n),
            (Type::Plus, Value::Number(n)) => Value::from(*n),
            _ => {
                return Err(Error::new(
                    ErrorKind::TypeMismatch,
                    span,
                    format_args!(
                        "Unsupported operand type for '{}': {}",
                        operator.lexeme,
                        operand.type_name()
                    ),
                ))
            }
        };
        Ok(Flow::Value(value))
    }

    fn visit_if(&mut self, cases: &[Case], else_case: Option<&ElseCase>) -> FlowResult {
        for case in cases {
            let condition = value!(self.visit_node(&case.condition)?);
            if condition.is_truthy() {
                let body = value!(self.visit_node(&case.body)?);
                let value = if case.should_return_null {
                    Value::Null
                } else {
                    body
                };
                return Ok(Flow::Value(value));
            }
        }

        if let Some(else_case) = else_case {
            let body = value!(self.visit_node(&else_case.body)?);
            let value = if else_case.should_return_null {
                Value::Null
            } else {
                body
            };
            return Ok(Flow::Value(value));
        }

        Ok(Flow::Value(Value::Null))
    }

    fn visit_for(
        &mut self,
        var: &Token,
        start: &Node,
        end: &Node,
        step: Option<&Node>,
        body: &Node,
        should_return_null: bool,
        _: &Span,
    ) -> FlowResult {
        let from = match self.number(start, "start")? {
            Ok(n) => n,
            Err(signal) => return Ok(signal),
        };
        let to = match self.number(end, "end")? {
            Ok(n) => n,
            Err(signal) => return Ok(signal),
        };
        let step = match step {
            Some(step) => match self.number(step, "step")? {
                Ok(n) => n,
                Err(signal) => return Ok(signal),
            },
            None if from <= to => 1.0,
            None => -1.0,
        };

        let env = Rc::new(RefCell::new(Environment::loop_scope(Rc::clone(&self.env))));
        let mut results = Vec::new();

        // Equal bounds and a zero step give an empty range.
        if from != to && step != 0.0 {
            // Derived from the iteration count so fractional steps don't accumulate error.
            let mut count: u64 = 0;
            loop {
                let i = from + count as f64 * step;
                if !((step > 0.0 && i <= to) || (step < 0.0 && i >= to)) {
                    break;
                }

                env.borrow_mut().define(&var.lexeme, Value::Number(i));
                let flow = self.evaluate(body, Rc::clone(&env))?;
                if let Some(flow) = Self::collect_loop(flow, &mut results, should_return_null) {
                    return Ok(flow);
                }
                count += 1;
            }
        }

        if should_return_null {
            Ok(Flow::Value(Value::Null))
        } else {
            Ok(Flow::Value(Value::list(results)))
        }
    }

    fn visit_while(&mut self, condition: &Node, body: &Node, should_return_null: bool) -> FlowResult {
        let env = Rc::new(RefCell::new(Environment::loop_scope(Rc::clone(&self.env))));
        let mut results = Vec::new();

        loop {
            let check = value!(self.evaluate(condition, Rc::clone(&env))?);
            if !check.is_truthy() {
                break;
            }

            let flow = self.evaluate(body, Rc::clone(&env))?;
            if let Some(flow) = Self::collect_loop(flow, &mut results, should_return_null) {
                return Ok(flow);
            }
        }

        if should_return_null {
            Ok(Flow::Value(Value::Null))
        } else {
            Ok(Flow::Value(Value::list(results)))
        }
    }

    fn visit_func_def(&mut self, decl: &Rc<FunctionDecl>) -> FlowResult {
        let function = Value::Function(Rc::new(Function::new(
            Rc::clone(decl),
            Rc::clone(&self.env),
        )));

        if let Some(name) = &decl.name {
            self.bind(name, function.clone(), false, None, &decl.span)?;
        }
        Ok(Flow::Value(function))
    }

    fn visit_call(&mut self, callee: &Node, args: &[Node], span: &Span) -> FlowResult {
        let callee = value!(self.visit_node(callee)?);
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(value!(self.visit_node(arg)?));
        }

        self.call(&callee, &values, span).map(Flow::Value)
    }

    fn visit_index(&mut self, target: &Node, index: &Node, span: &Span) -> FlowResult {
        let target = value!(self.visit_node(target)?);
        let index = value!(self.visit_node(index)?);

        let value = match &target {
            Value::List(values) => {
                let values = values.borrow();
                values[Self::index_of(&index, values.len(), span)?].clone()
            }
            Value::Str(val) => {
                let chars: Vec<char> = val.chars().collect();
                let ch = chars[Self::index_of(&index, chars.len(), span)?];
                Value::from(ch.to_string())
            }
            other => {
                return Err(Error::new(
                    ErrorKind::NotIndexable,
                    span,
                    format_args!("A {} value is not indexable", other.type_name()),
                ))
            }
        };
        Ok(Flow::Value(value))
    }

    fn visit_index_assign(
        &mut self,
        target: &Node,
        index: &Node,
        value: &Node,
        span: &Span,
    ) -> FlowResult {
        let target = value!(self.visit_node(target)?);
        let index = value!(self.visit_node(index)?);
        let value = value!(self.visit_node(value)?);

        match &target {
            Value::List(values) => {
                let mut values = values.borrow_mut();
                let idx = Self::index_of(&index, values.len(), span)?;
                values[idx] = value.clone();
                Ok(Flow::Value(value))
            }
            Value::Str(_) => Err(Error::new(
                ErrorKind::TypeMismatch,
                span,
                format_args!("Strings can not be changed in place"),
            )),
            other => Err(Error::new(
                ErrorKind::NotIndexable,
                span,
                format_args!("A {} value is not indexable", other.type_name()),
            )),
        }
    }

    fn visit_attribute_access(&mut self, object: &Node, name: &Token, span: &Span) -> FlowResult {
        let object = value!(self.visit_node(object)?);
        let found = match &object {
            Value::Instance(instance) => Instance::get(instance, &name.lexeme),
            _ => None,
        };

        found.map(Flow::Value).ok_or_else(|| {
            Error::new(
                ErrorKind::UnknownAttribute,
                span,
                format_args!("{} has no attribute '{}'", object, name.lexeme),
            )
        })
    }

    fn visit_attribute_assign(
        &mut self,
        object: &Node,
        name: &Token,
        value: &Node,
        span: &Span,
    ) -> FlowResult {
        let object = value!(self.visit_node(object)?);
        let value = value!(self.visit_node(value)?);

        match &object {
            Value::Instance(instance) => {
                Ok(Flow::Value(instance.borrow_mut().set(&name.lexeme, value)))
            }
            other => Err(Error::new(
                ErrorKind::TypeMismatch,
                span,
                format_args!(
                    "Can not set attribute '{}' on a {} value",
                    name.lexeme,
                    other.type_name()
                ),
            )),
        }
    }

    fn visit_method_call(
        &mut self,
        object: &Node,
        name: &Token,
        args: &[Node],
        span: &Span,
    ) -> FlowResult {
        let object = value!(self.visit_node(object)?);
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(value!(self.visit_node(arg)?));
        }

        let Value::Instance(instance) = &object else {
            return Err(Error::new(
                ErrorKind::UnknownMethod,
                span,
                format_args!("A {} value has no method '{}'", object.type_name(), name.lexeme),
            ));
        };

        // An attribute holding a function shadows a method of the same name.
        let field = instance.borrow().field(&name.lexeme);
        if let Some(field) = field {
            return self.call(&field, &values, span).map(Flow::Value);
        }

        let method = instance.borrow().class.find_method(&name.lexeme);
        match method {
            Some(method) => {
                let bound = method.bind(Rc::clone(instance));
                self.invoke(bound, &values, span).map(Flow::Value)
            }
            None => Err(Error::new(
                ErrorKind::UnknownMethod,
                span,
                format_args!("{} has no method '{}'", object, name.lexeme),
            )),
        }
    }

    fn visit_class_def(
        &mut self,
        name: &Token,
        parent: Option<&Token>,
        methods: &[Rc<FunctionDecl>],
        span: &Span,
    ) -> FlowResult {
        let parent = match parent {
            Some(parent) => match self.lookup(parent)? {
                Value::Class(class) => Some(class),
                other => {
                    return Err(Error::new(
                        ErrorKind::TypeMismatch,
                        &parent.span,
                        format_args!(
                            "Can only extend a class, '{}' is a {}",
                            parent.lexeme,
                            other.type_name()
                        ),
                    ))
                }
            },
            None => None,
        };

        let mut table = AHashMap::new();
        for decl in methods {
            if let Some(method_name) = &decl.name {
                let method = Function::method(Rc::clone(decl), Rc::clone(&self.env), &name.lexeme);
                table.insert(method_name.lexeme.clone(), Rc::new(method));
            }
        }

        debug!(class = name.lexeme.as_str(), methods = table.len(), "defined class");
        let class = Value::Class(Class::new(&name.lexeme, parent, table));
        self.bind(name, class.clone(), false, None, span)?;
        Ok(Flow::Value(class))
    }

    fn visit_new(&mut self, class: &Token, args: &[Node], span: &Span) -> FlowResult {
        let class = match self.lookup(class)? {
            Value::Class(class) => class,
            other => {
                return Err(Error::new(
                    ErrorKind::NotCallable,
                    span,
                    format_args!(
                        "'new' expects a class, '{}' is a {}",
                        class.lexeme,
                        other.type_name()
                    ),
                ))
            }
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(value!(self.visit_node(arg)?));
        }

        let instance = Instance::new(Rc::clone(&class));
        match class.constructor() {
            Some(constructor) => {
                let bound = constructor.bind(Rc::clone(&instance));
                self.invoke(bound, &values, span)?;
            }
            None if !values.is_empty() => {
                return Err(Error::new(
                    ErrorKind::ArityMismatch,
                    span,
                    format_args!(
                        "Class '{}' has no constructor and takes no arguments, got {}",
                        class.name,
                        values.len()
                    ),
                ))
            }
            None => {}
        }

        Ok(Flow::Value(Value::Instance(instance)))
    }

    fn visit_return(&mut self, value: Option<&Node>, _: &Span) -> FlowResult {
        let value = match value {
            Some(value) => value!(self.visit_node(value)?),
            None => Value::Null,
        };
        Ok(Flow::Return(value))
    }

    fn visit_continue(&mut self, span: &Span) -> FlowResult {
        Ok(Flow::Continue(span.clone()))
    }

    fn visit_break(&mut self, span: &Span) -> FlowResult {
        Ok(Flow::Break(span.clone()))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{Error, ErrorKind};
    use crate::session::Session;
    use crate::value::Value;

    fn run(src: &str) -> Result<Value, Error> {
        Session::new().run("<test>", src)
    }

    // The value of the last top-level statement.
    fn eval(src: &str) -> Value {
        match run(src) {
            Ok(Value::List(values)) => values.borrow().last().cloned().unwrap_or(Value::Null),
            Ok(other) => panic!("expected a list of results, got {:?}", other),
            Err(err) => panic!("{} failed: {}", src, err.render()),
        }
    }

    fn error_kind(src: &str) -> ErrorKind {
        match run(src) {
            Ok(value) => panic!("{} should fail, got {}", src, value),
            Err(err) => err.kind,
        }
    }

    fn numbers(values: &[f64]) -> Value {
        Value::list(values.iter().map(|n| Value::from(*n)).collect())
    }

    #[test]
    fn test_arithmetic() {
        let tests = [
            ("1 + 2 * 3", 7.0),
            ("2 ^ 3 ^ 2", 512.0),
            ("(1 + 2) * 3", 9.0),
            ("10 % 4", 2.0),
            ("7 / 2", 3.5),
            ("-3 + 1", -2.0),
            ("--3", 3.0),
            ("2 * -2 ^ 2", -8.0),
        ];

        for (src, expected) in tests {
            assert_eq!(eval(src), Value::from(expected), "source: {}", src);
        }
    }

    #[test]
    fn test_strings_lists_and_comparisons() {
        let tests = [
            ("\"ab\" + \"cd\"", Value::from("abcd")),
            ("\"ab\" * 3", Value::from("ababab")),
            ("[1] + [2, 3]", numbers(&[1.0, 2.0, 3.0])),
            ("1 == \"1\"", Value::from(0)),
            ("[1, 2] == [1, 2]", Value::from(1)),
            ("null == null", Value::from(1)),
            ("\"a\" < \"b\"", Value::from(1)),
            ("3 >= 4", Value::from(0)),
            ("1 != 2", Value::from(1)),
        ];

        for (src, expected) in tests {
            assert_eq!(eval(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_logic_short_circuits() {
        let tests = [
            ("1 and 0", 0.0),
            ("0 or 5", 1.0),
            ("not 0", 1.0),
            ("not 3", 0.0),
            ("0 and missing", 0.0),
            ("1 or missing", 1.0),
            ("true and not false", 1.0),
        ];

        for (src, expected) in tests {
            assert_eq!(eval(src), Value::from(expected), "source: {}", src);
        }
    }

    #[test]
    fn test_operand_errors() {
        let tests = [
            ("1 + \"a\"", ErrorKind::TypeMismatch),
            ("-\"a\"", ErrorKind::TypeMismatch),
            ("\"a\" < 1", ErrorKind::TypeMismatch),
            ("5 / 0", ErrorKind::DivisionByZero),
            ("5 % 0", ErrorKind::DivisionByZero),
            ("missing", ErrorKind::UndefinedVariable),
            ("5(1)", ErrorKind::NotCallable),
            ("\"ab\" * 100000000000000000000", ErrorKind::TypeMismatch),
            ("1 @ 2", ErrorKind::IllegalToken),
            ("\"open", ErrorKind::IllegalToken),
        ];

        for (src, expected) in tests {
            assert_eq!(error_kind(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_division_by_zero_points_at_the_operation() {
        let err = run("var x : 5 / 0").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
        assert_eq!((err.span.start.col, err.span.end.col), (8, 13));
    }

    #[test]
    fn test_session_keeps_globals() {
        let mut session = Session::new();
        session.run("<stdin>", "var x : 5").unwrap();
        assert_eq!(
            session.run("<stdin>", "x").unwrap(),
            Value::list(vec![Value::from(5)])
        );

        session.run("<stdin>", "var x : 6").unwrap();
        assert_eq!(
            session.run("<stdin>", "x + 1").unwrap(),
            Value::list(vec![Value::from(7)])
        );
    }

    #[test]
    fn test_declarations() {
        let tests = [
            ("var x : 5\nvar x : 6\nx", Value::from(6)),
            ("int x = 5", Value::from(5)),
            ("float f : 2\nf", Value::from(2)),
            ("list xs = [1]\nappend(xs, 2)\nxs", numbers(&[1.0, 2.0])),
            ("function f = len\nf(\"abc\")", Value::from(3)),
        ];

        for (src, expected) in tests {
            assert_eq!(eval(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_declaration_errors() {
        let tests = [
            ("int x = 5\nx = 6", ErrorKind::ConstantReassignment),
            ("int x = 5\nvar x : 6", ErrorKind::ConstantReassignment),
            ("var true : 2", ErrorKind::ConstantReassignment),
            ("int x : 2.5", ErrorKind::TypeMismatch),
            ("string s : 1", ErrorKind::TypeMismatch),
            ("int n : 1\nvar n : \"one\"", ErrorKind::TypeMismatch),
        ];

        for (src, expected) in tests {
            assert_eq!(error_kind(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_for_loops() {
        let tests = [
            ("for i = 1 to 5 { i }", numbers(&[1.0, 2.0, 3.0, 4.0, 5.0])),
            ("for i = 5 to 1 step -1 { i }", numbers(&[5.0, 4.0, 3.0, 2.0, 1.0])),
            ("for i = 1 to 1 { i }", numbers(&[])),
            ("for i = 0 to 10 step 5: i * 2", numbers(&[0.0, 10.0, 20.0])),
            ("for i = 1 to 5 step -1 { i }", numbers(&[])),
            ("for i = 1 to 3 step 0 { i }", numbers(&[])),
            ("for i = 1 to 3 {\n  i\n}", Value::Null),
            ("for i = 1 to 5 { if i == 3: continue\n i }", numbers(&[1.0, 2.0, 4.0, 5.0])),
            ("for i = 1 to 5 { if i == 2 { break }; i }", Value::Null),
            ("var total : 0\nfor i = 1 to 4:\n  var total : total + i\nend\ntotal", Value::from(10)),
        ];

        for (src, expected) in tests {
            assert_eq!(eval(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_fractional_step_lands_on_bound() {
        let values = match eval("for i = 0 to 1 step 0.1 { i }") {
            Value::List(values) => values,
            other => panic!("expected a list, got {}", other),
        };
        let values = values.borrow();
        assert_eq!(values.len(), 11);
        assert_eq!(values[3], Value::from(0.30000000000000004));
        assert_eq!(values[10], Value::from(1));
    }

    #[test]
    fn test_while_loops() {
        let tests = [
            ("var i : 0\nwhile i < 3 { var i : i + 1 }", numbers(&[1.0, 2.0, 3.0])),
            (
                "var n : 0\nwhile 1 {\n  var n : n + 1\n  if n == 4 { break }\n}\nn",
                Value::from(4),
            ),
            ("var n : 0\nwhile n < 2\n  var n : n + 1\nend", Value::Null),
            ("while 0: 1", numbers(&[])),
        ];

        for (src, expected) in tests {
            assert_eq!(eval(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_if_values() {
        let tests = [
            ("if 1 { \"yes\" }", Value::from("yes")),
            ("if 0 { 1 } else { 2 }", Value::from(2)),
            ("if 0: 1 elif 1: 2 else: 3", Value::from(2)),
            ("if 0: 1", Value::Null),
            ("if 1:\n  5\nend", Value::Null),
            ("var x : if 1: 10 else: 20\nx", Value::from(10)),
        ];

        for (src, expected) in tests {
            assert_eq!(eval(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_control_flow_outside_loop() {
        let tests = [
            "break",
            "continue",
            "func f() {\n  break\n}\nf()",
            "if 1 { continue }",
        ];

        for src in tests {
            assert_eq!(
                error_kind(src),
                ErrorKind::ControlFlowOutsideLoop,
                "source: {}",
                src
            );
        }
    }

    #[test]
    fn test_top_level_return_ends_program() {
        assert_eq!(
            run("1\nreturn 2\n3").unwrap(),
            numbers(&[1.0, 2.0])
        );
    }

    #[test]
    fn test_functions() {
        let tests = [
            ("func add(int a, int b) => a + b\nadd(2, 3)", Value::from(5)),
            ("func one() return 1\none()", Value::from(1)),
            ("func f() {\n  1\n}\nf()", Value::Null),
            ("func f(x) {\n  if x > 0 { return \"pos\" }\n  return \"neg\"\n}\nf(-1)", Value::from("neg")),
            (
                "func fib(n) => if n < 2: n else: fib(n - 1) + fib(n - 2)\nfib(10)",
                Value::from(55),
            ),
            (
                "func make(n) {\n  return func (x) => x + n\n}\nvar add2 : make(2)\nadd2(3)",
                Value::from(5),
            ),
            (
                "func first(list xs) {\n  for i = 0 to 10 {\n    if xs[i] > 1 { return xs[i] }\n  }\n}\nfirst([1, 5, 7])",
                Value::from(5),
            ),
            ("var f : func (x) => x * 2\nf(4)", Value::from(8)),
        ];

        for (src, expected) in tests {
            assert_eq!(eval(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_call_errors() {
        let tests = [
            ("func add(int a, int b) => a + b\nadd(2)", ErrorKind::ArityMismatch),
            ("func add(int a, int b) => a + b\nadd(1.5, 2)", ErrorKind::TypeMismatch),
            ("len(1, 2)", ErrorKind::ArityMismatch),
            ("len(3)", ErrorKind::TypeMismatch),
        ];

        for (src, expected) in tests {
            assert_eq!(error_kind(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_errors_carry_call_frames() {
        let err = run("func inner() => 1 / 0\n\nfunc outer() => inner()\n\nouter()").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);

        let contexts: Vec<&str> = err
            .trace
            .frames()
            .iter()
            .map(|frame| frame.context.as_str())
            .collect();
        assert_eq!(contexts, vec!["function inner", "function outer"]);
        assert_eq!(err.trace.frames()[1].span.start.line, 4);
    }

    #[test]
    fn test_classes() {
        let tests = [
            (
                "class Animal { func speak() => \"...\" }\nclass Dog extends Animal { }\nnew Dog().speak()",
                Value::from("..."),
            ),
            (
                "class P {\n  func __init__(x) {\n    this.x = x\n  }\n}\nvar p : new P(3)\np.x",
                Value::from(3),
            ),
            (
                "class A {\n  func __init__(v) {\n    this.v = v\n  }\n}\nclass B extends A { }\nnew B(7).v",
                Value::from(7),
            ),
            (
                "class A {\n  func name() => \"a\"\n  func greet() => \"hi \" + this.name()\n}\nclass B extends A {\n  func name() => \"b\"\n}\nnew B().greet()",
                Value::from("hi b"),
            ),
            (
                "class C {\n  func get() => this.n\n}\nvar c : new C()\nc.n = 4\nvar g : c.get\ng()",
                Value::from(4),
            ),
            (
                "class C { }\nvar c : new C()\nc.f = func (x) => x + 1\nc.f(1)",
                Value::from(2),
            ),
            ("class C { }\ntype(new C())", Value::from("instance")),
        ];

        for (src, expected) in tests {
            assert_eq!(eval(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_class_errors() {
        let tests = [
            (
                "class A {\n  func __init__() {\n    this.a = 1\n  }\n}\nclass B extends A {\n  func __init__() {\n    this.b = 2\n  }\n}\nnew B().a",
                ErrorKind::UnknownAttribute,
            ),
            ("class E { }\nnew E(1)", ErrorKind::ArityMismatch),
            ("class E { }\nE()", ErrorKind::NotCallable),
            ("class E { }\nnew E().fly()", ErrorKind::UnknownMethod),
            ("var x : 1\nclass E extends x { }", ErrorKind::TypeMismatch),
            ("class E extends Missing { }", ErrorKind::UndefinedVariable),
            ("var x : 1\nnew x()", ErrorKind::NotCallable),
            ("1.x", ErrorKind::UnknownAttribute),
        ];

        for (src, expected) in tests {
            assert_eq!(error_kind(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_class_typed_parameter() {
        let src = "class Animal { }\nclass Dog extends Animal { }\nfunc pet(Animal a) => 1\npet(new Dog())";
        assert_eq!(eval(src), Value::from(1));
        assert_eq!(
            error_kind("class Animal { }\nfunc pet(Animal a) => 1\npet(2)"),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_indexing() {
        let tests = [
            ("var xs : [1, 2, 3]\nxs[1] = 20\nxs", numbers(&[1.0, 20.0, 3.0])),
            ("[[1, 2], [3]][0][1]", Value::from(2)),
            ("\"abc\"[1]", Value::from("b")),
        ];

        for (src, expected) in tests {
            assert_eq!(eval(src), expected, "source: {}", src);
        }

        let errors = [
            ("[1][5]", ErrorKind::IndexOutOfRange),
            ("[1][-1]", ErrorKind::IndexOutOfRange),
            ("[1][0.5]", ErrorKind::TypeMismatch),
            ("5[0]", ErrorKind::NotIndexable),
            ("var s : \"ab\"\ns[0] = \"c\"", ErrorKind::TypeMismatch),
        ];

        for (src, expected) in errors {
            assert_eq!(error_kind(src), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_builtins() {
        let tests = [
            ("len([1, 2, 3])", Value::from(3)),
            ("len(\"hello\")", Value::from(5)),
            ("var xs : [1, 2, 3]\npop(xs, 0)", Value::from(1)),
            ("var xs : [1, 2, 3]\npop(xs, 0)\nxs", numbers(&[2.0, 3.0])),
            ("type(1)", Value::from("number")),
            ("type(\"s\")", Value::from("string")),
            ("type(len)", Value::from("native function")),
            ("type(null)", Value::from("null")),
        ];

        for (src, expected) in tests {
            assert_eq!(eval(src), expected, "source: {}", src);
        }

        assert_eq!(error_kind("pop([], 0)"), ErrorKind::IndexOutOfRange);
    }

    #[test]
    fn test_recursion_limit() {
        let tests = [
            "func f(n) => f(n + 1)\nf(0)",
            "func f(n) {\n  if n > -1 {\n    return f(n + 1)\n  }\n}\nf(0)",
        ];

        // Runs on the default test thread stack.
        for src in tests {
            let err = run(src).unwrap_err();
            assert_eq!(err.kind, ErrorKind::StackOverflow, "source: {}", src);
            assert_eq!(err.trace.frames().len(), 20, "source: {}", src);
        }
    }

    #[test]
    fn test_self_appended_list_prints() {
        let xs = eval("var xs : [1]\nappend(xs, xs)");
        assert_eq!(xs.to_string(), "[1, [...]]");
        assert_eq!(xs.repr(), "[1, [...]]");
        assert_eq!(xs, xs.clone());

        if let Value::List(values) = xs {
            values.borrow_mut().clear();
        }
    }
}
