//! Recursive-descent parser for Lua 5.1 chunks.

use crate::ast::*;
use crate::error::CompileError;
use crate::lexer::Lexer;
use crate::token::{SpannedToken, Token};
use std::rc::Rc;

/// Max nesting of blocks and expressions in one chunk.
const MAX_SYNTAX_LEVELS: u32 = 200;

/// Parse `source` into a chunk named `chunk_name`.
pub fn parse(source: &[u8], chunk_name: &str) -> Result<Chunk, CompileError> {
    let mut parser = Parser::new(source, chunk_name);
    let block = parser.block()?;
    if !parser.check(&Token::Eof)? {
        return Err(parser.error_near("'<eof>' expected"));
    }
    Ok(Chunk {
        name: parser.chunk.clone(),
        body: Rc::new(FuncBody {
            params: Vec::new(),
            is_vararg: true,
            block,
            line: 0,
        }),
    })
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    chunk: Rc<str>,
    /// One entry per enclosing function: whether it accepts `...`.
    vararg_stack: Vec<bool>,
    /// Enclosing loop count per function, for `break` checking.
    loop_depth: Vec<u32>,
    /// Current nesting of blocks and subexpressions.
    level: u32,
}

impl<'a> Parser<'a> {
    fn new(source: &'a [u8], chunk_name: &str) -> Self {
        Parser {
            lexer: Lexer::new(source),
            chunk: Rc::from(chunk_name),
            vararg_stack: vec![true],
            loop_depth: vec![0],
            level: 0,
        }
    }

    // ---- Token helpers ----

    fn lex_error(&self, message: &str, line: u32) -> CompileError {
        CompileError {
            chunk: self.chunk.to_string(),
            line,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Result<&Token, CompileError> {
        match self.lexer.current() {
            Ok(tok) => Ok(&tok.token),
            Err(e) => Err(self.lex_error(&e.message, e.line)),
        }
    }

    fn line(&self) -> u32 {
        match self.lexer.current() {
            Ok(tok) => tok.span.line,
            Err(e) => e.line,
        }
    }

    fn next(&mut self) -> Result<SpannedToken, CompileError> {
        self.lexer
            .advance()
            .map_err(|e| self.lex_error(&e.message, e.line))
    }

    fn check(&self, token: &Token) -> Result<bool, CompileError> {
        Ok(self.peek()? == token)
    }

    /// Consume `token` if it is current.
    fn accept(&mut self, token: &Token) -> Result<bool, CompileError> {
        if self.check(token)? {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), CompileError> {
        if self.accept(token)? {
            Ok(())
        } else {
            Err(self.error_near(&format!("'{token}' expected")))
        }
    }

    /// Expect the closing `what` of a construct opened on `open_line`.
    fn expect_match(&mut self, what: &Token, who: &Token, open_line: u32) -> Result<(), CompileError> {
        if self.accept(what)? {
            return Ok(());
        }
        if open_line == self.line() {
            Err(self.error_near(&format!("'{what}' expected")))
        } else {
            Err(self.error_near(&format!(
                "'{what}' expected (to close '{who}' at line {open_line})"
            )))
        }
    }

    fn error_near(&self, message: &str) -> CompileError {
        let near = match self.lexer.current() {
            Ok(tok) if tok.token == Token::Eof => "<eof>".to_string(),
            _ => format!("'{}'", self.lexer.token_text),
        };
        CompileError {
            chunk: self.chunk.to_string(),
            line: self.line(),
            message: format!("{message} near {near}"),
        }
    }

    /// Run `parse` one syntax level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        if self.level >= MAX_SYNTAX_LEVELS {
            return Err(self.error_near("chunk has too many syntax levels"));
        }
        self.level += 1;
        let result = parse(self);
        self.level -= 1;
        result
    }

    fn name(&mut self) -> Result<Rc<str>, CompileError> {
        if let Token::Name(_) = self.peek()? {
            if let Token::Name(name) = self.next()?.token {
                return Ok(Rc::from(name));
            }
        }
        Err(self.error_near("<name> expected"))
    }

    // ---- Statements ----

    fn block(&mut self) -> Result<Block, CompileError> {
        self.nested(Self::block_stats)
    }

    fn block_stats(&mut self) -> Result<Block, CompileError> {
        let mut stats = Vec::new();
        loop {
            let tok = self.peek()?;
            if tok.is_block_end() {
                break;
            }
            match tok {
                Token::Return => {
                    stats.push(self.return_stat()?);
                    break;
                }
                Token::Break => {
                    let line = self.line();
                    self.next()?;
                    if self.loop_depth.last().copied().unwrap_or(0) == 0 {
                        return Err(self.error_near("no loop to break"));
                    }
                    self.accept(&Token::Semi)?;
                    stats.push(Stat::Break { line });
                    break;
                }
                _ => {
                    stats.push(self.statement()?);
                    self.accept(&Token::Semi)?;
                }
            }
        }
        Ok(Block { stats })
    }

    fn loop_block(&mut self) -> Result<Block, CompileError> {
        if let Some(depth) = self.loop_depth.last_mut() {
            *depth += 1;
        }
        let block = self.block();
        if let Some(depth) = self.loop_depth.last_mut() {
            *depth -= 1;
        }
        block
    }

    fn return_stat(&mut self) -> Result<Stat, CompileError> {
        let line = self.line();
        self.next()?;
        let exprs = if self.peek()?.is_block_end() || self.check(&Token::Semi)? {
            Vec::new()
        } else {
            self.expr_list()?
        };
        self.accept(&Token::Semi)?;
        Ok(Stat::Return { exprs, line })
    }

    fn statement(&mut self) -> Result<Stat, CompileError> {
        let line = self.line();
        match self.peek()? {
            Token::If => self.if_stat(line),
            Token::While => {
                self.next()?;
                let cond = self.expr()?;
                self.expect(&Token::Do)?;
                let block = self.loop_block()?;
                self.expect_match(&Token::End, &Token::While, line)?;
                Ok(Stat::While { cond, block, line })
            }
            Token::Do => {
                self.next()?;
                let block = self.block()?;
                self.expect_match(&Token::End, &Token::Do, line)?;
                Ok(Stat::Do(block))
            }
            Token::For => self.for_stat(line),
            Token::Repeat => {
                self.next()?;
                let block = self.loop_block()?;
                self.expect_match(&Token::Until, &Token::Repeat, line)?;
                let cond = self.expr()?;
                Ok(Stat::Repeat { block, cond, line })
            }
            Token::Function => {
                self.next()?;
                let mut path = vec![self.name()?];
                while self.accept(&Token::Dot)? {
                    path.push(self.name()?);
                }
                let method = if self.accept(&Token::Colon)? {
                    Some(self.name()?)
                } else {
                    None
                };
                let body = self.func_body(method.is_some(), line)?;
                Ok(Stat::Function {
                    name: FuncName { path, method },
                    body,
                    line,
                })
            }
            Token::Local => {
                self.next()?;
                if self.accept(&Token::Function)? {
                    let name = self.name()?;
                    let body = self.func_body(false, line)?;
                    return Ok(Stat::LocalFunction { name, body, line });
                }
                let mut names = vec![self.name()?];
                while self.accept(&Token::Comma)? {
                    names.push(self.name()?);
                }
                let exprs = if self.accept(&Token::Assign)? {
                    self.expr_list()?
                } else {
                    Vec::new()
                };
                Ok(Stat::Local { names, exprs, line })
            }
            _ => self.expr_stat(line),
        }
    }

    fn if_stat(&mut self, line: u32) -> Result<Stat, CompileError> {
        self.next()?;
        let mut clauses = Vec::new();
        let cond = self.expr()?;
        self.expect(&Token::Then)?;
        clauses.push((cond, self.block()?));
        let mut else_block = None;
        loop {
            if self.accept(&Token::ElseIf)? {
                let cond = self.expr()?;
                self.expect(&Token::Then)?;
                clauses.push((cond, self.block()?));
            } else if self.accept(&Token::Else)? {
                else_block = Some(self.block()?);
                self.expect_match(&Token::End, &Token::If, line)?;
                break;
            } else {
                self.expect_match(&Token::End, &Token::If, line)?;
                break;
            }
        }
        Ok(Stat::If {
            clauses,
            else_block,
            line,
        })
    }

    fn for_stat(&mut self, line: u32) -> Result<Stat, CompileError> {
        self.next()?;
        let first = self.name()?;
        if self.accept(&Token::Assign)? {
            let start = self.expr()?;
            self.expect(&Token::Comma)?;
            let limit = self.expr()?;
            let step = if self.accept(&Token::Comma)? {
                Some(self.expr()?)
            } else {
                None
            };
            self.expect(&Token::Do)?;
            let block = self.loop_block()?;
            self.expect_match(&Token::End, &Token::For, line)?;
            return Ok(Stat::NumericFor {
                var: first,
                start,
                limit,
                step,
                block,
                line,
            });
        }
        let mut names = vec![first];
        while self.accept(&Token::Comma)? {
            names.push(self.name()?);
        }
        if !self.accept(&Token::In)? {
            return Err(self.error_near("'=' or 'in' expected"));
        }
        let exprs = self.expr_list()?;
        self.expect(&Token::Do)?;
        let block = self.loop_block()?;
        self.expect_match(&Token::End, &Token::For, line)?;
        Ok(Stat::GenericFor {
            names,
            exprs,
            block,
            line,
        })
    }

    fn expr_stat(&mut self, line: u32) -> Result<Stat, CompileError> {
        let first = self.suffixed_expr()?;
        if self.check(&Token::Assign)? || self.check(&Token::Comma)? {
            let mut targets = vec![first];
            while self.accept(&Token::Comma)? {
                targets.push(self.suffixed_expr()?);
            }
            if targets
                .iter()
                .any(|t| !matches!(t, Expr::Name(_) | Expr::Index { .. }))
            {
                return Err(self.error_near("syntax error"));
            }
            self.expect(&Token::Assign)?;
            let exprs = self.expr_list()?;
            return Ok(Stat::Assign {
                targets,
                exprs,
                line,
            });
        }
        match first {
            Expr::Call { .. } | Expr::Method { .. } => Ok(Stat::Call { call: first, line }),
            _ => Err(self.error_near("syntax error")),
        }
    }

    fn func_body(&mut self, is_method: bool, line: u32) -> Result<Rc<FuncBody>, CompileError> {
        self.expect(&Token::LParen)?;
        let mut params: Vec<Rc<str>> = Vec::new();
        if is_method {
            params.push(Rc::from("self"));
        }
        let mut is_vararg = false;
        if !self.check(&Token::RParen)? {
            loop {
                if self.accept(&Token::DotDotDot)? {
                    is_vararg = true;
                    break;
                }
                params.push(self.name()?);
                if !self.accept(&Token::Comma)? {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        self.vararg_stack.push(is_vararg);
        self.loop_depth.push(0);
        let block = self.block();
        self.loop_depth.pop();
        self.vararg_stack.pop();
        let block = block?;
        self.expect_match(&Token::End, &Token::Function, line)?;
        Ok(Rc::new(FuncBody {
            params,
            is_vararg,
            block,
            line,
        }))
    }

    // ---- Expressions ----

    fn expr_list(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut exprs = vec![self.expr()?];
        while self.accept(&Token::Comma)? {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    fn expr(&mut self) -> Result<Expr, CompileError> {
        self.subexpr(0)
    }

    fn subexpr(&mut self, limit: u8) -> Result<Expr, CompileError> {
        self.nested(|p| p.subexpr_at_level(limit))
    }

    fn subexpr_at_level(&mut self, limit: u8) -> Result<Expr, CompileError> {
        let line = self.line();
        let unary = match self.peek()? {
            Token::Not => Some(UnOp::Not),
            Token::Minus => Some(UnOp::Neg),
            Token::Hash => Some(UnOp::Len),
            _ => None,
        };
        let lhs = match unary {
            Some(op) => {
                self.next()?;
                let expr = self.subexpr(UNARY_PRIORITY)?;
                Expr::Unary {
                    op,
                    expr: Box::new(expr),
                    line,
                }
            }
            None => self.simple_expr()?,
        };
        self.binary_tail(lhs, limit)
    }

    fn binary_tail(&mut self, mut lhs: Expr, limit: u8) -> Result<Expr, CompileError> {
        loop {
            let op = match self.peek()? {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                Token::Caret => BinOp::Pow,
                Token::DotDot => BinOp::Concat,
                Token::Equal => BinOp::Eq,
                Token::NotEqual => BinOp::Ne,
                Token::Less => BinOp::Lt,
                Token::LessEq => BinOp::Le,
                Token::Greater => BinOp::Gt,
                Token::GreaterEq => BinOp::Ge,
                Token::And => BinOp::And,
                Token::Or => BinOp::Or,
                _ => return Ok(lhs),
            };
            let (left, right) = op.priority();
            if left <= limit {
                return Ok(lhs);
            }
            let line = self.line();
            self.next()?;
            let rhs = self.subexpr(right)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
    }

    fn simple_expr(&mut self) -> Result<Expr, CompileError> {
        let line = self.line();
        let expr = match self.peek()? {
            Token::Number(n) => Expr::Number(*n),
            Token::String(s) => Expr::Str(Rc::from(s.as_str())),
            Token::Nil => Expr::Nil,
            Token::True => Expr::True,
            Token::False => Expr::False,
            Token::DotDotDot => {
                if !self.vararg_stack.last().copied().unwrap_or(false) {
                    return Err(self.error_near("cannot use '...' outside a vararg function"));
                }
                Expr::Vararg
            }
            Token::LBrace => return self.table_constructor(),
            Token::Function => {
                self.next()?;
                return Ok(Expr::Function(self.func_body(false, line)?));
            }
            _ => return self.suffixed_expr(),
        };
        self.next()?;
        Ok(expr)
    }

    fn primary_expr(&mut self) -> Result<Expr, CompileError> {
        match self.peek()? {
            Token::Name(_) => Ok(Expr::Name(self.name()?)),
            Token::LParen => {
                let line = self.line();
                self.next()?;
                let inner = self.expr()?;
                self.expect_match(&Token::RParen, &Token::LParen, line)?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            _ => Err(self.error_near("unexpected symbol")),
        }
    }

    fn suffixed_expr(&mut self) -> Result<Expr, CompileError> {
        let primary = self.primary_expr()?;
        self.suffixed_tail(primary)
    }

    fn suffixed_tail(&mut self, mut expr: Expr) -> Result<Expr, CompileError> {
        loop {
            let line = self.line();
            match self.peek()? {
                Token::Dot => {
                    self.next()?;
                    let name = self.name()?;
                    expr = Expr::Index {
                        obj: Box::new(expr),
                        key: Box::new(Expr::Str(name)),
                        line,
                    };
                }
                Token::LBracket => {
                    self.next()?;
                    let key = self.expr()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Index {
                        obj: Box::new(expr),
                        key: Box::new(key),
                        line,
                    };
                }
                Token::Colon => {
                    self.next()?;
                    let name = self.name()?;
                    let args = self.call_args()?;
                    expr = Expr::Method {
                        obj: Box::new(expr),
                        name,
                        args,
                        line,
                    };
                }
                Token::LParen | Token::String(_) | Token::LBrace => {
                    let args = self.call_args()?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                        line,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, CompileError> {
        match self.peek()? {
            Token::String(s) => {
                let arg = Expr::Str(Rc::from(s.as_str()));
                self.next()?;
                Ok(vec![arg])
            }
            Token::LBrace => Ok(vec![self.table_constructor()?]),
            Token::LParen => {
                let line = self.line();
                self.next()?;
                if self.accept(&Token::RParen)? {
                    return Ok(Vec::new());
                }
                let args = self.expr_list()?;
                self.expect_match(&Token::RParen, &Token::LParen, line)?;
                Ok(args)
            }
            _ => Err(self.error_near("function arguments expected")),
        }
    }

    fn table_constructor(&mut self) -> Result<Expr, CompileError> {
        let line = self.line();
        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace)? {
            fields.push(self.table_field()?);
            if !self.accept(&Token::Comma)? && !self.accept(&Token::Semi)? {
                break;
            }
        }
        self.expect_match(&Token::RBrace, &Token::LBrace, line)?;
        Ok(Expr::Table(fields))
    }

    fn table_field(&mut self) -> Result<TableField, CompileError> {
        match self.peek()? {
            Token::LBracket => {
                self.next()?;
                let key = self.expr()?;
                self.expect(&Token::RBracket)?;
                self.expect(&Token::Assign)?;
                let value = self.expr()?;
                Ok(TableField::Keyed(key, value))
            }
            Token::Name(_) => {
                // `name = v` needs a second token of lookahead: take the name,
                // then either finish the keyed field or resume the expression.
                let name = self.name()?;
                if self.accept(&Token::Assign)? {
                    let value = self.expr()?;
                    return Ok(TableField::Keyed(Expr::Str(name), value));
                }
                let expr = self.suffixed_tail(Expr::Name(name))?;
                Ok(TableField::Positional(self.binary_tail(expr, 0)?))
            }
            _ => Ok(TableField::Positional(self.expr()?)),
        }
    }
}
