use std::rc::Rc;

use jcode_core::{Span, Token, Type};
use tracing::debug;

use crate::ast::{Case, ElseCase, FunctionDecl, Node, Param};
use crate::callable::CONSTRUCTOR;
use crate::error::{Error, ErrorKind};
use crate::parse_result::{Attempt, Checkpoint, ParseResult};

/// Identifiers that start a typed declaration when followed by another identifier.
const TYPE_KEYWORDS: [&str; 5] = ["int", "float", "string", "list", "function"];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum BlockStyle {
    Brace,
    Colon,
}

impl BlockStyle {
    fn closer(self) -> Type {
        match self {
            BlockStyle::Brace => Type::RightBrace,
            BlockStyle::Colon => Type::End,
        }
    }

    fn unclosed(self) -> &'static str {
        match self {
            BlockStyle::Brace => "Expected '}' to close block opened with '{'",
            BlockStyle::Colon => "Expected 'end' to close block opened with ':'",
        }
    }
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with an `Eof` token, which is what the scanner always produces.
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, current: 0 }
    }

    /// Parses the whole token stream into a statement `Sequence`.
    pub fn parse(&mut self) -> Result<Node, Error> {
        let program = self.statements()?;
        if !self.is_at_end() {
            return Err(self.unexpected());
        }

        if let Node::Sequence { statements, .. } = &program {
            debug!(statements = statements.len(), "parsed program");
        }
        Ok(program)
    }

    fn unexpected(&self) -> Error {
        let token = self.peek();
        match token.ty {
            Type::Identifier if self.peek_at(1).is(Type::Equal) => {
                self.reassignment(token, self.peek_at(1))
            }
            Type::Equal if self.current > 0 && self.previous().is(Type::Identifier) => {
                self.reassignment(self.previous(), token)
            }
            Type::Identifier => Error::syntax(
                &token.span,
                &format!(
                    "Unexpected identifier '{}'. Did you forget to use 'var' for variable declaration?",
                    token.lexeme
                ),
            ),
            _ => Error::syntax(
                &token.span,
                &format!("Unexpected token '{}'", token.describe()),
            ),
        }
    }

    fn reassignment(&self, name: &Token, equal: &Token) -> Error {
        Error::new(
            ErrorKind::ConstantReassignment,
            &Span::between(&name.span, &equal.span),
            format_args!(
                "Cannot reassign '{0}'. Use 'var {0} : ...' to give it a new value",
                name.lexeme
            ),
        )
    }

    fn statements(&mut self) -> ParseResult<Node> {
        let start = self.peek().span.start.clone();
        let mut statements: Vec<Node> = Vec::new();
        let mut previous_function: Option<Span> = None;

        self.skip_newlines();
        loop {
            if self.is_at_end() {
                break;
            }

            if !statements.is_empty() {
                let separators_start = self.current;
                let newlines = self.skip_newlines();
                if self.is_at_end() || newlines == 0 {
                    break;
                }

                if let Some(end) = &previous_function {
                    // `;` separates statements but does not count as a line.
                    let line_breaks = self.tokens[separators_start..self.current]
                        .iter()
                        .filter(|token| token.lexeme == "\n")
                        .count();
                    if line_breaks < 2 && self.check(Type::Func) {
                        return Err(Error::syntax(
                            end,
                            "Expected at least one blank line after this function definition",
                        ));
                    }
                }
            }

            match self.attempt(Self::statement)? {
                Attempt::Matched(statement) => {
                    previous_function = if statement.is_function_definition() {
                        Some(Span::point(&statement.span().end))
                    } else {
                        None
                    };
                    statements.push(statement);
                }
                Attempt::Declined => break,
            }
        }

        let end = match statements.last() {
            Some(last) => last.span().end.clone(),
            None => start.clone(),
        };
        Ok(Node::Sequence {
            statements,
            span: Span::new(start, end),
        })
    }

    fn statement(&mut self) -> ParseResult<Node> {
        if self.match_one(Type::Return) {
            let keyword = self.previous().span.clone();
            let value = self.attempt(Self::expression)?.matched();
            let span = match &value {
                Some(value) => Span::between(&keyword, value.span()),
                None => keyword,
            };
            return Ok(Node::Return {
                value: value.map(Box::new),
                span,
            });
        }

        if self.match_one(Type::Continue) {
            let span = self.previous().span.clone();
            return Ok(Node::Continue { span });
        }

        if self.match_one(Type::Break) {
            let span = self.previous().span.clone();
            return Ok(Node::Break { span });
        }

        self.expression()
    }

    fn expression(&mut self) -> ParseResult<Node> {
        if self.match_one(Type::Var) {
            let start = self.previous().span.clone();
            let name = self.consume(Type::Identifier, "Expected identifier")?.clone();
            self.consume(Type::Colon, "Expected ':'")?;
            let value = self.expression()?;
            return Ok(Node::var_assign(&start, name, value, None, false));
        }

        if self.is_typed_declaration() {
            let ty = self.advance().clone();
            let name = self.advance().clone();
            let constant = if self.match_one(Type::Equal) {
                true
            } else if self.match_one(Type::Colon) {
                false
            } else {
                return Err(Error::syntax(
                    &self.peek().span,
                    "Expected '=' (for constants) or ':' (for variables)",
                ));
            };

            let value = self.expression()?;
            let start = ty.span.clone();
            return Ok(Node::var_assign(&start, name, value, Some(ty), constant));
        }

        if self.check(Type::Class) {
            return self.class_definition();
        }

        let mut expr = self.comparison()?;
        while self.match_either(&[Type::And, Type::Or]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Node::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn is_typed_declaration(&self) -> bool {
        let token = self.peek();
        token.is(Type::Identifier)
            && TYPE_KEYWORDS.contains(&token.lexeme.as_str())
            && self.peek_at(1).is(Type::Identifier)
    }

    fn comparison(&mut self) -> ParseResult<Node> {
        if self.match_one(Type::Not) {
            let operator = self.previous().clone();
            let operand = self.comparison()?;
            return Ok(Node::unary(operator, operand));
        }

        let mut expr = self.arithmetic()?;
        while self.match_either(&[
            Type::EqualEqual,
            Type::BangEqual,
            Type::Less,
            Type::Greater,
            Type::LessEqual,
            Type::GreaterEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.arithmetic()?;
            expr = Node::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn arithmetic(&mut self) -> ParseResult<Node> {
        let mut expr = self.term()?;
        while self.match_either(&[Type::Plus, Type::Minus]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Node::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Node> {
        let mut expr = self.factor()?;
        while self.match_either(&[Type::Star, Type::Slash, Type::Percent]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Node::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Node> {
        if self.match_either(&[Type::Plus, Type::Minus]) {
            let operator = self.previous().clone();
            let operand = self.factor()?;
            return Ok(Node::unary(operator, operand));
        }

        self.power()
    }

    // The right operand goes through `factor`, which parses a whole power expression again, so
    // `2 ^ 3 ^ 2` groups to the right.
    fn power(&mut self) -> ParseResult<Node> {
        let mut expr = self.postfix()?;
        while self.match_one(Type::Caret) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Node::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn postfix(&mut self) -> ParseResult<Node> {
        let mut expr = self.atom()?;

        loop {
            if self.match_one(Type::LeftParen) {
                let args = self.arguments(Type::RightParen)?;
                let close = self.previous().span.clone();
                expr = Node::call(expr, args, &close);
            } else if self.match_one(Type::LeftSquare) {
                let index = self.expression()?;
                let close = self.consume(Type::RightSquare, "Expected ']'")?.span.clone();
                if self.match_one(Type::Equal) {
                    let value = self.expression()?;
                    return Ok(Node::index_assign(expr, index, value));
                }
                expr = Node::index(expr, index, &close);
            } else if self.match_one(Type::Dot) {
                let name = self
                    .consume(
                        Type::Identifier,
                        "Expected attribute or method name after '.'",
                    )?
                    .clone();

                if self.match_one(Type::LeftParen) {
                    let args = self.arguments(Type::RightParen)?;
                    let close = self.previous().span.clone();
                    expr = Node::method_call(expr, name, args, &close);
                } else if self.match_one(Type::Equal) {
                    let value = self.expression()?;
                    return Ok(Node::attribute_assign(expr, name, value));
                } else {
                    expr = Node::attribute_access(expr, name);
                }
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn atom(&mut self) -> ParseResult<Node> {
        let token = self.peek().clone();
        match token.ty {
            Type::Int | Type::Float => {
                self.advance();
                Ok(Node::Number { token })
            }
            Type::String => {
                self.advance();
                Ok(Node::Str { token })
            }
            Type::Identifier => {
                self.advance();
                Ok(Node::VarAccess { name: token })
            }
            Type::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(Type::RightParen, "Expected ')'")?;
                Ok(expr)
            }
            Type::LeftSquare => {
                self.advance();
                let elements = self.arguments(Type::RightSquare)?;
                let span = self.span_from(&token.span);
                Ok(Node::List { elements, span })
            }
            Type::If => self.if_expression(),
            Type::For => self.for_expression(),
            Type::While => self.while_expression(),
            Type::Func => Ok(Node::FuncDef(Rc::new(self.function_definition()?))),
            Type::Class => self.class_definition(),
            Type::New => self.instance_creation(),
            _ => Err(Error::syntax(
                &token.span,
                "Expected int, float, string, identifier, '+', '-', '(', '[', 'if', 'for', \
                 'while', 'func', 'class', 'new' or 'not'",
            )),
        }
    }

    /// Comma separated expressions up to `closing`, which is consumed.
    fn arguments(&mut self, closing: Type) -> ParseResult<Vec<Node>> {
        let mut args = Vec::new();
        if self.match_one(closing) {
            return Ok(args);
        }

        loop {
            args.push(self.expression()?);
            if !self.match_one(Type::Comma) {
                break;
            }
        }

        let msg = format!("Expected ',' or '{}'", closing);
        self.consume(closing, &msg)?;
        Ok(args)
    }

    fn if_expression(&mut self) -> ParseResult<Node> {
        let start = self.advance().span.clone();
        let mut cases = Vec::new();
        let mut else_case = None;
        let mut chain_style: Option<BlockStyle> = None;
        let mut needs_end = false;

        loop {
            let condition = self.expression()?;
            let style = self.block_opener()?;
            self.check_chain_style(&mut chain_style, style)?;

            let (body, multi_line) = self.block_body(style)?;
            needs_end |= style == BlockStyle::Colon && multi_line;
            cases.push(Case {
                condition,
                body,
                should_return_null: multi_line,
            });

            if style == BlockStyle::Brace {
                self.skip_newlines_before(&[Type::Elif, Type::Else]);
            }
            if self.match_one(Type::Elif) {
                continue;
            }

            if self.match_one(Type::Else) {
                let style = self.block_opener()?;
                self.check_chain_style(&mut chain_style, style)?;

                let (body, multi_line) = self.block_body(style)?;
                needs_end |= style == BlockStyle::Colon && multi_line;
                else_case = Some(Box::new(ElseCase {
                    body,
                    should_return_null: multi_line,
                }));
            }
            break;
        }

        if needs_end {
            self.skip_newlines_before(&[Type::End]);
            self.close_block(BlockStyle::Colon)?;
        }

        Ok(Node::If {
            cases,
            else_case,
            span: self.span_from(&start),
        })
    }

    fn check_chain_style(
        &self,
        chain: &mut Option<BlockStyle>,
        style: BlockStyle,
    ) -> ParseResult<()> {
        match chain {
            Some(expected) if *expected != style => Err(Error::syntax(
                &self.previous().span,
                "Cannot mix '{' and ':' blocks in the same if statement",
            )),
            _ => {
                *chain = Some(style);
                Ok(())
            }
        }
    }

    fn for_expression(&mut self) -> ParseResult<Node> {
        let start = self.advance().span.clone();
        let var = self.consume(Type::Identifier, "Expected identifier")?.clone();
        self.consume(Type::Equal, "Expected '='")?;
        let from = self.expression()?;
        self.consume(Type::To, "Expected 'to'")?;
        let to = self.expression()?;

        let step = if self.match_one(Type::Step) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };

        let style = self.block_opener()?;
        let (body, multi_line) = self.loop_body(style)?;

        Ok(Node::For {
            var,
            start: Box::new(from),
            end: Box::new(to),
            step,
            body: Box::new(body),
            should_return_null: multi_line,
            span: self.span_from(&start),
        })
    }

    fn while_expression(&mut self) -> ParseResult<Node> {
        let start = self.advance().span.clone();
        let condition = self.expression()?;

        // A line break right after the condition opens a colon style body.
        let (body, multi_line) = if self.check(Type::Newline) {
            let body = self.statements()?;
            self.close_block(BlockStyle::Colon)?;
            (body, true)
        } else {
            let style = self.block_opener()?;
            self.loop_body(style)?
        };

        Ok(Node::While {
            condition: Box::new(condition),
            body: Box::new(body),
            should_return_null: multi_line,
            span: self.span_from(&start),
        })
    }

    fn loop_body(&mut self, style: BlockStyle) -> ParseResult<(Node, bool)> {
        let (body, multi_line) = self.block_body(style)?;
        if style == BlockStyle::Colon && multi_line {
            self.close_block(BlockStyle::Colon)?;
        }
        Ok((body, multi_line))
    }

    fn block_opener(&mut self) -> ParseResult<BlockStyle> {
        if self.match_one(Type::LeftBrace) {
            Ok(BlockStyle::Brace)
        } else if self.match_one(Type::Colon) {
            Ok(BlockStyle::Colon)
        } else {
            Err(Error::syntax(&self.peek().span, "Expected ':' or '{'"))
        }
    }

    /// Parses a body after its opener. Brace blocks are closed here, multi-line colon blocks are
    /// left for the caller since an if chain shares a single `end`. The flag tells whether the
    /// body spans multiple lines.
    fn block_body(&mut self, style: BlockStyle) -> ParseResult<(Node, bool)> {
        let multi_line = self.check(Type::Newline);
        match style {
            BlockStyle::Brace => {
                let body = self.statements()?;
                self.close_block(BlockStyle::Brace)?;
                Ok((body, multi_line))
            }
            BlockStyle::Colon if multi_line => Ok((self.statements()?, true)),
            BlockStyle::Colon => Ok((self.statement()?, false)),
        }
    }

    fn close_block(&mut self, style: BlockStyle) -> ParseResult<()> {
        if self.match_one(style.closer()) {
            return Ok(());
        }

        let token = self.peek();
        if token.is(Type::Equal) && self.previous().is(Type::Identifier) {
            return Err(self.reassignment(self.previous(), token));
        }
        Err(Error::syntax(&token.span, style.unclosed()))
    }

    fn function_definition(&mut self) -> ParseResult<FunctionDecl> {
        let start = self.advance().span.clone();
        let name = if self.check(Type::Identifier) {
            Some(self.advance().clone())
        } else {
            None
        };

        let msg = if name.is_some() {
            "Expected '('"
        } else {
            "Expected identifier or '('"
        };
        self.consume(Type::LeftParen, msg)?;
        let params = self.parameters()?;
        let (body, auto_return) = self.function_body()?;

        let is_constructor = name
            .as_ref()
            .map_or(false, |name| name.lexeme == CONSTRUCTOR);
        Ok(FunctionDecl {
            name,
            params,
            body,
            auto_return,
            is_constructor,
            span: self.span_from(&start),
        })
    }

    fn parameters(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.match_one(Type::RightParen) {
            return Ok(params);
        }

        loop {
            let first = self
                .consume(Type::Identifier, "Expected parameter name")?
                .clone();
            let param = if self.check(Type::Identifier) {
                let name = self.advance().clone();
                Param {
                    ty: Some(first),
                    name,
                }
            } else {
                Param {
                    ty: None,
                    name: first,
                }
            };
            params.push(param);

            if !self.match_one(Type::Comma) {
                break;
            }
        }

        self.consume(Type::RightParen, "Expected ')', ',' or identifier")?;
        Ok(params)
    }

    fn function_body(&mut self) -> ParseResult<(Node, bool)> {
        if self.match_one(Type::Arrow) {
            return Ok((self.expression()?, true));
        }

        if self.check(Type::Return) {
            let ret = self.statement()?;
            let span = ret.span().clone();
            let body = Node::Sequence {
                statements: vec![ret],
                span,
            };
            return Ok((body, false));
        }

        let style = match self.block_opener() {
            Ok(style) => style,
            Err(err) => {
                return Err(Error::syntax(&err.span, "Expected '=>', 'return', ':' or '{'"));
            }
        };
        let body = self.statements()?;
        self.close_block(style)?;
        Ok((body, false))
    }

    fn class_definition(&mut self) -> ParseResult<Node> {
        let start = self.advance().span.clone();
        let name = self.consume(Type::Identifier, "Expected class name")?.clone();

        let parent = if self.match_one(Type::Extends) {
            Some(
                self.consume(
                    Type::Identifier,
                    "Expected parent class name after 'extends'",
                )?
                .clone(),
            )
        } else {
            None
        };

        self.consume(Type::LeftBrace, "Expected '{'")?;
        self.skip_newlines();

        let mut methods = Vec::new();
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            if !self.check(Type::Func) {
                return Err(Error::syntax(
                    &self.peek().span,
                    "Expected method definition or '}'",
                ));
            }

            let method = self.function_definition()?;
            if method.name.is_none() {
                return Err(Error::syntax(&method.span, "Expected method name"));
            }
            methods.push(Rc::new(method));
            self.skip_newlines();
        }

        self.consume(Type::RightBrace, "Expected '}'")?;
        Ok(Node::ClassDef {
            name,
            parent,
            methods,
            span: self.span_from(&start),
        })
    }

    fn instance_creation(&mut self) -> ParseResult<Node> {
        let start = self.advance().span.clone();
        let class = self.consume(Type::Identifier, "Expected class name")?.clone();
        self.consume(Type::LeftParen, "Expected '('")?;
        let args = self.arguments(Type::RightParen)?;

        Ok(Node::New {
            class,
            args,
            span: self.span_from(&start),
        })
    }

    /// Runs `rule` speculatively. See `Attempt`.
    fn attempt<T>(
        &mut self,
        rule: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Attempt<T>> {
        let checkpoint = self.checkpoint();
        match rule(self) {
            Ok(value) => Ok(Attempt::Matched(value)),
            Err(_) if self.checkpoint() == checkpoint => Ok(Attempt::Declined),
            Err(err) => Err(err),
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.current)
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.current = checkpoint.0;
    }

    fn skip_newlines(&mut self) -> usize {
        let mut count = 0;
        while self.match_one(Type::Newline) {
            count += 1;
        }
        count
    }

    /// Skips line breaks only when one of `types` follows them.
    fn skip_newlines_before(&mut self, types: &[Type]) {
        let checkpoint = self.checkpoint();
        self.skip_newlines();
        if !types.iter().any(|ty| self.check(*ty)) {
            self.restore(checkpoint);
        }
    }

    fn span_from(&self, start: &Span) -> Span {
        Span::between(start, &self.previous().span)
    }

    fn is_at_end(&self) -> bool {
        self.peek().ty == Type::Eof
    }

    fn check(&self, ty: Type) -> bool {
        self.peek().ty == ty
    }

    fn consume(&mut self, ty: Type, msg: &str) -> Result<&Token, Error> {
        if self.check(ty) {
            Ok(self.advance())
        } else {
            Err(Error::syntax(&self.peek().span, msg))
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn match_either(&mut self, types: &[Type]) -> bool {
        for ty in types {
            if self.match_one(*ty) {
                return true;
            }
        }

        false
    }

    fn match_one(&mut self, ty: Type) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use jcode_core::{Scanner, Token};

    use crate::ast::Node;
    use crate::error::ErrorKind;
    use crate::parser::Parser;

    fn tokens(src: &str) -> Vec<Token> {
        Scanner::new().scan_all("<test>", src).unwrap()
    }

    fn parse(src: &str) -> Node {
        Parser::new(&tokens(src)).parse().unwrap()
    }

    fn parse_err(src: &str) -> (ErrorKind, String) {
        let err = Parser::new(&tokens(src)).parse().unwrap_err();
        (err.kind, err.msg)
    }

    #[test]
    fn test_expressions() {
        let tests = [
            ("1 + 2 * 3", "(seq (+ 1 (* 2 3)))"),
            ("2 ^ 3 ^ 2", "(seq (^ 2 (^ 3 2)))"),
            ("-2 ^ 2", "(seq (- (^ 2 2)))"),
            ("(1 + 2) % 4", "(seq (% (+ 1 2) 4))"),
            ("not a == b and c", "(seq (and (not (== a b)) c))"),
            ("a < b or a >= 3", "(seq (or (< a b) (>= a 3)))"),
            ("\"x\" + [1, 2]", "(seq (+ \"x\" (list 1 2)))"),
            ("[]", "(seq (list))"),
            ("f(1)(2)[0]", "(seq (index (call (call f 1) 2) 0))"),
            ("xs[0] = 5", "(seq (index= xs 0 5))"),
            ("p.x", "(seq (. p x))"),
            ("p.x = 1 + 1", "(seq (.= p x (+ 1 1)))"),
            ("d.speak(1, 2).len", "(seq (. (call-method d speak 1 2) len))"),
            ("new Dog(\"rex\")", "(seq (new Dog \"rex\"))"),
        ];

        for (src, expected) in tests {
            assert_eq!(parse(src).to_string(), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_declarations() {
        let tests = [
            ("var x : 5", "(seq (var x 5))"),
            ("int x = 5", "(seq (const int x 5))"),
            ("float y : 2.5", "(seq (var float y 2.5))"),
            ("list xs : []", "(seq (var list xs (list)))"),
            // a type keyword on its own is just a name
            ("int", "(seq int)"),
            ("var x : var y : 1", "(seq (var x (var y 1)))"),
        ];

        for (src, expected) in tests {
            assert_eq!(parse(src).to_string(), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_blocks() {
        let tests = [
            ("if x { 1 }", "(if (x (seq 1)))"),
            ("if x: 1 elif y: 2 else: 3", "(if (x 1) (y 2) (else 3))"),
            (
                "if x:\n  1\nelif y:\n  2\nelse:\n  3\nend",
                "(if (x (seq 1)) (y (seq 2)) (else (seq 3)))",
            ),
            (
                "if x {\n  1\n}\nelif y {\n  2\n}\nelse {\n  3\n}",
                "(if (x (seq 1)) (y (seq 2)) (else (seq 3)))",
            ),
            ("for i = 1 to 5 { i }", "(for i 1 5 (seq i))"),
            ("for i = 5 to 1 step -1: i", "(for i 5 1 (step (- 1)) i)"),
            ("for i = 0 to 3:\n  i\nend", "(for i 0 3 (seq i))"),
            ("while x < 3 { var x : x + 1 }", "(while (< x 3) (seq (var x (+ x 1))))"),
            ("while x\n  break\nend", "(while x (seq (break)))"),
            ("while x: continue", "(while x (continue))"),
        ];

        for (src, expected) in tests {
            let program = parse(src);
            match &program {
                Node::Sequence { statements, .. } => {
                    assert_eq!(statements.len(), 1, "source: {}", src);
                    assert_eq!(statements[0].to_string(), expected, "source: {}", src);
                }
                other => panic!("expected a sequence, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_should_return_null_follows_block_shape() {
        let program = parse("for i = 1 to 3 { i }\nfor i = 1 to 3 {\n  i\n}");
        let Node::Sequence { statements, .. } = program else {
            panic!("expected a sequence")
        };

        let flags: Vec<bool> = statements
            .iter()
            .map(|stmt| match stmt {
                Node::For {
                    should_return_null, ..
                } => *should_return_null,
                _ => panic!("expected a for loop"),
            })
            .collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[test]
    fn test_functions_and_classes() {
        let tests = [
            ("func add(int a, int b) => a + b", "(func add [int a, int b] => (+ a b))"),
            ("func (x) => x", "(func [x] => x)"),
            ("func one() return 1", "(func one [] (seq (return 1)))"),
            ("func f() {\n  return\n}", "(func f [] (seq (return)))"),
            ("func f():\n  var a : 1\n  a\nend", "(func f [] (seq (var a 1) a))"),
            (
                "class Dog extends Animal {\n  func __init__(n) {\n    this.n = n\n  }\n\n  func speak() => \"woof\"\n}",
                "(class Dog extends Animal (func __init__ [n] (seq (.= this n n))) (func speak [] => \"woof\"))",
            ),
            ("class Empty { }", "(class Empty)"),
        ];

        for (src, expected) in tests {
            let program = parse(src);
            let Node::Sequence { statements, .. } = program else {
                panic!("expected a sequence")
            };
            assert_eq!(statements[0].to_string(), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_constructor_flag() {
        let program = parse("class A { func __init__() { } }");
        let Node::Sequence { statements, .. } = program else {
            panic!("expected a sequence")
        };
        let Node::ClassDef { methods, .. } = &statements[0] else {
            panic!("expected a class")
        };
        assert!(methods[0].is_constructor);
    }

    #[test]
    fn test_statement_sequences() {
        let tests = [
            ("", "(seq)"),
            ("\n\n", "(seq)"),
            ("1\n2;3\n\n", "(seq 1 2 3)"),
            ("return", "(seq (return))"),
            ("return 1 + 1", "(seq (return (+ 1 1)))"),
            ("break\ncontinue", "(seq (break) (continue))"),
            ("# only a comment", "(seq)"),
        ];

        for (src, expected) in tests {
            assert_eq!(parse(src).to_string(), expected, "source: {}", src);
        }
    }

    #[test]
    fn test_blank_line_between_functions() {
        let (kind, msg) = parse_err("func a() => 1\nfunc b() => 2");
        assert_eq!(kind, ErrorKind::InvalidSyntax);
        assert_eq!(
            msg,
            "Expected at least one blank line after this function definition"
        );

        assert_eq!(
            parse("func a() => 1\n\nfunc b() => 2").to_string(),
            "(seq (func a [] => 1) (func b [] => 2))"
        );
    }

    #[test]
    fn test_semicolons_do_not_count_as_blank_lines() {
        for src in ["func a() => 1;\nfunc b() => 2", "func a() => 1;;func b() => 2"] {
            let (kind, _) = parse_err(src);
            assert_eq!(kind, ErrorKind::InvalidSyntax, "source: {:?}", src);
        }

        assert_eq!(
            parse("func a() => 1;\n\nfunc b() => 2").to_string(),
            "(seq (func a [] => 1) (func b [] => 2))"
        );
    }

    #[test]
    fn test_blank_line_error_points_at_previous_function() {
        let err = Parser::new(&tokens("func a() => 1\nfunc b() => 2"))
            .parse()
            .unwrap_err();
        assert_eq!(err.span.start.line, 0);
        assert_eq!(err.span.start.col, 13);
        assert_eq!(err.span.start, err.span.end);
    }

    #[test]
    fn test_errors() {
        let tests = [
            ("int x = 5\nx = 6", ErrorKind::ConstantReassignment),
            ("x = 6", ErrorKind::ConstantReassignment),
            ("func f() {\n  x = 1\n}", ErrorKind::ConstantReassignment),
            ("var x : 1 y", ErrorKind::InvalidSyntax),
            ("if x { 1 end", ErrorKind::InvalidSyntax),
            ("if x:\n  1\nelif y {\n  2\n}", ErrorKind::InvalidSyntax),
            ("for i = 1 to 3:\n  i\n}", ErrorKind::InvalidSyntax),
            ("(1 + 2", ErrorKind::InvalidSyntax),
            ("var : 1", ErrorKind::InvalidSyntax),
            ("int x 5", ErrorKind::InvalidSyntax),
            ("class A { var x : 1 }", ErrorKind::InvalidSyntax),
            ("1 +", ErrorKind::InvalidSyntax),
        ];

        for (src, expected) in tests {
            assert_eq!(parse_err(src).0, expected, "source: {}", src);
        }
    }

    #[test]
    fn test_error_messages() {
        let tests = [
            (
                "var x : 1 y",
                "Unexpected identifier 'y'. Did you forget to use 'var' for variable declaration?",
            ),
            ("var x : 1 )", "Unexpected token ')'"),
            ("if x { 1 end", "Expected '}' to close block opened with '{'"),
            ("for i = 1 to 3:\n  i\n}", "Expected 'end' to close block opened with ':'"),
            (
                "if x:\n  1\nelif y {\n  2\n}",
                "Cannot mix '{' and ':' blocks in the same if statement",
            ),
        ];

        for (src, expected) in tests {
            assert_eq!(parse_err(src).1, expected, "source: {}", src);
        }
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let src = "class A {\n  func f(int x) => x * 2\n}\nvar a : new A()\nfor i = 1 to 3 {\n  a.f(i)\n}";
        let tokens = tokens(src);

        let first = Parser::new(&tokens).parse().unwrap();
        let second = Parser::new(&tokens).parse().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_spans_cover_children() {
        let program = parse("var total : 10 / 2");
        let Node::Sequence { statements, .. } = program else {
            panic!("expected a sequence")
        };
        let Node::VarAssign { value, span, .. } = &statements[0] else {
            panic!("expected a declaration")
        };

        assert_eq!((span.start.col, span.end.col), (0, 18));
        assert_eq!((value.span().start.col, value.span().end.col), (12, 18));
    }
}
