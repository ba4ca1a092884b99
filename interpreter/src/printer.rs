use std::fmt;
use std::rc::Rc;

use jcode_core::{Span, Token};

use crate::ast::{Case, ElseCase, FunctionDecl, Node, Visitor};
use crate::error::Error;

/// Renders a tree as an s-expression. Used by `jcode --ast` and by the parser tests.
struct Printer;

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = Printer.visit_node(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", text)
    }
}

impl Printer {
    fn all(&mut self, nodes: &[Node]) -> Result<String, Error> {
        let parts = nodes
            .iter()
            .map(|node| self.visit_node(node))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parts.join(" "))
    }

    fn form(&mut self, head: &str, nodes: &[Node]) -> Result<String, Error> {
        if nodes.is_empty() {
            Ok(format!("({})", head))
        } else {
            Ok(format!("({} {})", head, self.all(nodes)?))
        }
    }

    fn function(&mut self, decl: &FunctionDecl) -> Result<String, Error> {
        let params = decl
            .params
            .iter()
            .map(|param| match &param.ty {
                Some(ty) => format!("{} {}", ty.lexeme, param.name.lexeme),
                None => param.name.lexeme.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ");

        let name = match &decl.name {
            Some(name) => format!(" {}", name.lexeme),
            None => String::new(),
        };
        let arrow = if decl.auto_return { "=> " } else { "" };
        Ok(format!(
            "(func{} [{}] {}{})",
            name,
            params,
            arrow,
            self.visit_node(&decl.body)?
        ))
    }
}

impl Visitor for Printer {
    type Item = String;

    fn visit_number(&mut self, token: &Token) -> Result<String, Error> {
        Ok(token.lexeme.clone())
    }

    fn visit_string(&mut self, token: &Token) -> Result<String, Error> {
        Ok(token.lexeme.clone())
    }

    fn visit_list(&mut self, elements: &[Node]) -> Result<String, Error> {
        self.form("list", elements)
    }

    fn visit_sequence(&mut self, statements: &[Node], _: &Span) -> Result<String, Error> {
        self.form("seq", statements)
    }

    fn visit_var_access(&mut self, name: &Token) -> Result<String, Error> {
        Ok(name.lexeme.clone())
    }

    fn visit_var_assign(
        &mut self,
        name: &Token,
        value: &Node,
        declared: Option<&Token>,
        constant: bool,
        _: &Span,
    ) -> Result<String, Error> {
        let head = if constant { "const" } else { "var" };
        let ty = declared.map_or(String::new(), |ty| format!(" {}", ty.lexeme));
        Ok(format!(
            "({}{} {} {})",
            head,
            ty,
            name.lexeme,
            self.visit_node(value)?
        ))
    }

    fn visit_binary(
        &mut self,
        left: &Node,
        operator: &Token,
        right: &Node,
        _: &Span,
    ) -> Result<String, Error> {
        Ok(format!(
            "({} {} {})",
            operator.lexeme,
            self.visit_node(left)?,
            self.visit_node(right)?
        ))
    }

    fn visit_unary(&mut self, operator: &Token, operand: &Node, _: &Span) -> Result<String, Error> {
        Ok(format!("({} {})", operator.lexeme, self.visit_node(operand)?))
    }

    fn visit_if(&mut self, cases: &[Case], else_case: Option<&ElseCase>) -> Result<String, Error> {
        let mut parts = Vec::new();
        for case in cases {
            parts.push(format!(
                "({} {})",
                self.visit_node(&case.condition)?,
                self.visit_node(&case.body)?
            ));
        }
        if let Some(else_case) = else_case {
            parts.push(format!("(else {})", self.visit_node(&else_case.body)?));
        }
        Ok(format!("(if {})", parts.join(" ")))
    }

    fn visit_for(
        &mut self,
        var: &Token,
        start: &Node,
        end: &Node,
        step: Option<&Node>,
        body: &Node,
        _: bool,
        _: &Span,
    ) -> Result<String, Error> {
        let step = match step {
            Some(step) => format!(" (step {})", self.visit_node(step)?),
            None => String::new(),
        };
        Ok(format!(
            "(for {} {} {}{} {})",
            var.lexeme,
            self.visit_node(start)?,
            self.visit_node(end)?,
            step,
            self.visit_node(body)?
        ))
    }

    fn visit_while(&mut self, condition: &Node, body: &Node, _: bool) -> Result<String, Error> {
        Ok(format!(
            "(while {} {})",
            self.visit_node(condition)?,
            self.visit_node(body)?
        ))
    }

    fn visit_func_def(&mut self, decl: &Rc<FunctionDecl>) -> Result<String, Error> {
        self.function(decl)
    }

    fn visit_call(&mut self, callee: &Node, args: &[Node], _: &Span) -> Result<String, Error> {
        let callee = self.visit_node(callee)?;
        self.form(&format!("call {}", callee), args)
    }

    fn visit_index(&mut self, target: &Node, index: &Node, _: &Span) -> Result<String, Error> {
        Ok(format!(
            "(index {} {})",
            self.visit_node(target)?,
            self.visit_node(index)?
        ))
    }

    fn visit_index_assign(
        &mut self,
        target: &Node,
        index: &Node,
        value: &Node,
        _: &Span,
    ) -> Result<String, Error> {
        Ok(format!(
            "(index= {} {} {})",
            self.visit_node(target)?,
            self.visit_node(index)?,
            self.visit_node(value)?
        ))
    }

    fn visit_attribute_access(
        &mut self,
        object: &Node,
        name: &Token,
        _: &Span,
    ) -> Result<String, Error> {
        Ok(format!("(. {} {})", self.visit_node(object)?, name.lexeme))
    }

    fn visit_attribute_assign(
        &mut self,
        object: &Node,
        name: &Token,
        value: &Node,
        _: &Span,
    ) -> Result<String, Error> {
        Ok(format!(
            "(.= {} {} {})",
            self.visit_node(object)?,
            name.lexeme,
            self.visit_node(value)?
        ))
    }

    fn visit_method_call(
        &mut self,
        object: &Node,
        name: &Token,
        args: &[Node],
        _: &Span,
    ) -> Result<String, Error> {
        let object = self.visit_node(object)?;
        self.form(&format!("call-method {} {}", object, name.lexeme), args)
    }

    fn visit_class_def(
        &mut self,
        name: &Token,
        parent: Option<&Token>,
        methods: &[Rc<FunctionDecl>],
        _: &Span,
    ) -> Result<String, Error> {
        let mut text = format!("(class {}", name.lexeme);
        if let Some(parent) = parent {
            text.push_str(&format!(" extends {}", parent.lexeme));
        }
        for method in methods {
            text.push(' ');
            text.push_str(&self.function(method)?);
        }
        text.push(')');
        Ok(text)
    }

    fn visit_new(&mut self, class: &Token, args: &[Node], _: &Span) -> Result<String, Error> {
        self.form(&format!("new {}", class.lexeme), args)
    }

    fn visit_return(&mut self, value: Option<&Node>, _: &Span) -> Result<String, Error> {
        match value {
            Some(value) => Ok(format!("(return {})", self.visit_node(value)?)),
            None => Ok(String::from("(return)")),
        }
    }

    fn visit_continue(&mut self, _: &Span) -> Result<String, Error> {
        Ok(String::from("(continue)"))
    }

    fn visit_break(&mut self, _: &Span) -> Result<String, Error> {
        Ok(String::from("(break)"))
    }
}
