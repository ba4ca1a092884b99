use std::rc::Rc;

use jcode_core::{Span, Token};

use crate::error::Error;

/// A declared parameter, `int a` or just `a`.
#[derive(Debug, PartialEq, Clone)]
pub struct Param {
    pub ty: Option<Token>,
    pub name: Token,
}

/// One `if`/`elif` branch.
#[derive(Debug, PartialEq)]
pub struct Case {
    pub condition: Node,
    pub body: Node,
    pub should_return_null: bool,
}

#[derive(Debug, PartialEq)]
pub struct ElseCase {
    pub body: Node,
    pub should_return_null: bool,
}

/// Shared by function definitions and class methods. Function values hold it through an `Rc`.
#[derive(Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Option<Token>,
    pub params: Vec<Param>,
    pub body: Node,
    pub auto_return: bool,
    pub is_constructor: bool,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum Node {
    Number {
        token: Token,
    },
    Str {
        token: Token,
    },
    List {
        elements: Vec<Node>,
        span: Span,
    },
    Sequence {
        statements: Vec<Node>,
        span: Span,
    },
    VarAccess {
        name: Token,
    },
    VarAssign {
        name: Token,
        value: Box<Node>,
        declared: Option<Token>,
        constant: bool,
        span: Span,
    },
    BinaryOp {
        left: Box<Node>,
        operator: Token,
        right: Box<Node>,
        span: Span,
    },
    UnaryOp {
        operator: Token,
        operand: Box<Node>,
        span: Span,
    },
    If {
        cases: Vec<Case>,
        else_case: Option<Box<ElseCase>>,
        span: Span,
    },
    For {
        var: Token,
        start: Box<Node>,
        end: Box<Node>,
        step: Option<Box<Node>>,
        body: Box<Node>,
        should_return_null: bool,
        span: Span,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
        should_return_null: bool,
        span: Span,
    },
    FuncDef(Rc<FunctionDecl>),
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
        span: Span,
    },
    Index {
        target: Box<Node>,
        index: Box<Node>,
        span: Span,
    },
    IndexAssign {
        target: Box<Node>,
        index: Box<Node>,
        value: Box<Node>,
        span: Span,
    },
    AttributeAccess {
        object: Box<Node>,
        name: Token,
        span: Span,
    },
    AttributeAssign {
        object: Box<Node>,
        name: Token,
        value: Box<Node>,
        span: Span,
    },
    MethodCall {
        object: Box<Node>,
        name: Token,
        args: Vec<Node>,
        span: Span,
    },
    ClassDef {
        name: Token,
        parent: Option<Token>,
        methods: Vec<Rc<FunctionDecl>>,
        span: Span,
    },
    New {
        class: Token,
        args: Vec<Node>,
        span: Span,
    },
    Return {
        value: Option<Box<Node>>,
        span: Span,
    },
    Continue {
        span: Span,
    },
    Break {
        span: Span,
    },
}

pub(crate) trait Visitor {
    type Item;

    fn visit_node(&mut self, node: &Node) -> Result<Self::Item, Error> {
        match node {
            Node::Number { token } => self.visit_number(token),
            Node::Str { token } => self.visit_string(token),
            Node::List { elements, .. } => self.visit_list(elements),
            Node::Sequence { statements, span } => self.visit_sequence(statements, span),
            Node::VarAccess { name } => self.visit_var_access(name),
            Node::VarAssign {
                name,
                value,
                declared,
                constant,
                span,
            } => self.visit_var_assign(name, value, declared.as_ref(), *constant, span),
            Node::BinaryOp {
                left,
                operator,
                right,
                span,
            } => self.visit_binary(left, operator, right, span),
            Node::UnaryOp {
                operator,
                operand,
                span,
            } => self.visit_unary(operator, operand, span),
            Node::If {
                cases, else_case, ..
            } => self.visit_if(cases, else_case.as_deref()),
            Node::For {
                var,
                start,
                end,
                step,
                body,
                should_return_null,
                span,
            } => self.visit_for(
                var,
                start,
                end,
                step.as_deref(),
                body,
                *should_return_null,
                span,
            ),
            Node::While {
                condition,
                body,
                should_return_null,
                ..
            } => self.visit_while(condition, body, *should_return_null),
            Node::FuncDef(decl) => self.visit_func_def(decl),
            Node::Call { callee, args, span } => self.visit_call(callee, args, span),
            Node::Index {
                target,
                index,
                span,
            } => self.visit_index(target, index, span),
            Node::IndexAssign {
                target,
                index,
                value,
                span,
            } => self.visit_index_assign(target, index, value, span),
            Node::AttributeAccess { object, name, span } => {
                self.visit_attribute_access(object, name, span)
            }
            Node::AttributeAssign {
                object,
                name,
                value,
                span,
            } => self.visit_attribute_assign(object, name, value, span),
            Node::MethodCall {
                object,
                name,
                args,
                span,
            } => self.visit_method_call(object, name, args, span),
            Node::ClassDef {
                name,
                parent,
                methods,
                span,
            } => self.visit_class_def(name, parent.as_ref(), methods, span),
            Node::New { class, args, span } => self.visit_new(class, args, span),
            Node::Return { value, span } => self.visit_return(value.as_deref(), span),
            Node::Continue { span } => self.visit_continue(span),
            Node::Break { span } => self.visit_break(span),
        }
    }

    fn visit_number(&mut self, token: &Token) -> Result<Self::Item, Error>;
    fn visit_string(&mut self, token: &Token) -> Result<Self::Item, Error>;
    fn visit_list(&mut self, elements: &[Node]) -> Result<Self::Item, Error>;
    fn visit_sequence(&mut self, statements: &[Node], span: &Span)
        -> Result<Self::Item, Error>;
    fn visit_var_access(&mut self, name: &Token) -> Result<Self::Item, Error>;
    fn visit_var_assign(
        &mut self,
        name: &Token,
        value: &Node,
        declared: Option<&Token>,
        constant: bool,
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_binary(
        &mut self,
        left: &Node,
        operator: &Token,
        right: &Node,
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_unary(
        &mut self,
        operator: &Token,
        operand: &Node,
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_if(
        &mut self,
        cases: &[Case],
        else_case: Option<&ElseCase>,
    ) -> Result<Self::Item, Error>;
    #[allow(clippy::too_many_arguments)]
    fn visit_for(
        &mut self,
        var: &Token,
        start: &Node,
        end: &Node,
        step: Option<&Node>,
        body: &Node,
        should_return_null: bool,
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_while(
        &mut self,
        condition: &Node,
        body: &Node,
        should_return_null: bool,
    ) -> Result<Self::Item, Error>;
    fn visit_func_def(&mut self, decl: &Rc<FunctionDecl>) -> Result<Self::Item, Error>;
    fn visit_call(
        &mut self,
        callee: &Node,
        args: &[Node],
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_index(
        &mut self,
        target: &Node,
        index: &Node,
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_index_assign(
        &mut self,
        target: &Node,
        index: &Node,
        value: &Node,
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_attribute_access(
        &mut self,
        object: &Node,
        name: &Token,
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_attribute_assign(
        &mut self,
        object: &Node,
        name: &Token,
        value: &Node,
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_method_call(
        &mut self,
        object: &Node,
        name: &Token,
        args: &[Node],
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_class_def(
        &mut self,
        name: &Token,
        parent: Option<&Token>,
        methods: &[Rc<FunctionDecl>],
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_new(
        &mut self,
        class: &Token,
        args: &[Node],
        span: &Span,
    ) -> Result<Self::Item, Error>;
    fn visit_return(&mut self, value: Option<&Node>, span: &Span) -> Result<Self::Item, Error>;
    fn visit_continue(&mut self, span: &Span) -> Result<Self::Item, Error>;
    fn visit_break(&mut self, span: &Span) -> Result<Self::Item, Error>;
}

impl Node {
    pub fn span(&self) -> &Span {
        match self {
            Node::Number { token } | Node::Str { token } => &token.span,
            Node::VarAccess { name } => &name.span,
            Node::FuncDef(decl) => &decl.span,
            Node::List { span, .. }
            | Node::Sequence { span, .. }
            | Node::VarAssign { span, .. }
            | Node::BinaryOp { span, .. }
            | Node::UnaryOp { span, .. }
            | Node::If { span, .. }
            | Node::For { span, .. }
            | Node::While { span, .. }
            | Node::Call { span, .. }
            | Node::Index { span, .. }
            | Node::IndexAssign { span, .. }
            | Node::AttributeAccess { span, .. }
            | Node::AttributeAssign { span, .. }
            | Node::MethodCall { span, .. }
            | Node::ClassDef { span, .. }
            | Node::New { span, .. }
            | Node::Return { span, .. }
            | Node::Continue { span }
            | Node::Break { span } => span,
        }
    }

    pub fn is_function_definition(&self) -> bool {
        matches!(self, Node::FuncDef(_))
    }

    // Creator methods. Each one derives the node's span from its children.
    pub(crate) fn binary(left: Node, operator: Token, right: Node) -> Self {
        let span = Span::between(left.span(), right.span());
        Node::BinaryOp {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span,
        }
    }

    pub(crate) fn unary(operator: Token, operand: Node) -> Self {
        let span = Span::between(&operator.span, operand.span());
        Node::UnaryOp {
            operator,
            operand: Box::new(operand),
            span,
        }
    }

    pub(crate) fn var_assign(
        start: &Span,
        name: Token,
        value: Node,
        declared: Option<Token>,
        constant: bool,
    ) -> Self {
        let span = Span::between(start, value.span());
        Node::VarAssign {
            name,
            value: Box::new(value),
            declared,
            constant,
            span,
        }
    }

    pub(crate) fn call(callee: Node, args: Vec<Node>, close: &Span) -> Self {
        let span = Span::between(callee.span(), close);
        Node::Call {
            callee: Box::new(callee),
            args,
            span,
        }
    }

    pub(crate) fn index(target: Node, index: Node, close: &Span) -> Self {
        let span = Span::between(target.span(), close);
        Node::Index {
            target: Box::new(target),
            index: Box::new(index),
            span,
        }
    }

    pub(crate) fn index_assign(target: Node, index: Node, value: Node) -> Self {
        let span = Span::between(target.span(), value.span());
        Node::IndexAssign {
            target: Box::new(target),
            index: Box::new(index),
            value: Box::new(value),
            span,
        }
    }

    pub(crate) fn attribute_access(object: Node, name: Token) -> Self {
        let span = Span::between(object.span(), &name.span);
        Node::AttributeAccess {
            object: Box::new(object),
            name,
            span,
        }
    }

    pub(crate) fn attribute_assign(object: Node, name: Token, value: Node) -> Self {
        let span = Span::between(object.span(), value.span());
        Node::AttributeAssign {
            object: Box::new(object),
            name,
            value: Box::new(value),
            span,
        }
    }

    pub(crate) fn method_call(object: Node, name: Token, args: Vec<Node>, close: &Span) -> Self {
        let span = Span::between(object.span(), close);
        Node::MethodCall {
            object: Box::new(object),
            name,
            args,
            span,
        }
    }
}
