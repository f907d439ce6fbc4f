//! Syntax tree produced by the parser and walked by the interpreter.

use std::rc::Rc;

/// A parsed chunk: the body of an implicit vararg function.
#[derive(Debug)]
pub struct Chunk {
    /// Name reported in error positions (file base name, `<string>`, `<stdin>`).
    pub name: Rc<str>,
    pub body: Rc<FuncBody>,
}

#[derive(Debug, Default)]
pub struct Block {
    pub stats: Vec<Stat>,
}

#[derive(Debug)]
pub struct FuncBody {
    pub params: Vec<Rc<str>>,
    pub is_vararg: bool,
    pub block: Block,
    /// Line of the `function` keyword (0 for the main chunk).
    pub line: u32,
}

/// Target of a `function a.b.c:m() end` statement.
#[derive(Debug)]
pub struct FuncName {
    pub path: Vec<Rc<str>>,
    pub method: Option<Rc<str>>,
}

#[derive(Debug)]
pub enum Stat {
    Local {
        names: Vec<Rc<str>>,
        exprs: Vec<Expr>,
        line: u32,
    },
    Assign {
        targets: Vec<Expr>,
        exprs: Vec<Expr>,
        line: u32,
    },
    Call {
        call: Expr,
        line: u32,
    },
    Do(Block),
    While {
        cond: Expr,
        block: Block,
        line: u32,
    },
    Repeat {
        block: Block,
        cond: Expr,
        line: u32,
    },
    If {
        clauses: Vec<(Expr, Block)>,
        else_block: Option<Block>,
        line: u32,
    },
    NumericFor {
        var: Rc<str>,
        start: Expr,
        limit: Expr,
        step: Option<Expr>,
        block: Block,
        line: u32,
    },
    GenericFor {
        names: Vec<Rc<str>>,
        exprs: Vec<Expr>,
        block: Block,
        line: u32,
    },
    Function {
        name: FuncName,
        body: Rc<FuncBody>,
        line: u32,
    },
    LocalFunction {
        name: Rc<str>,
        body: Rc<FuncBody>,
        line: u32,
    },
    Return {
        exprs: Vec<Expr>,
        line: u32,
    },
    Break {
        line: u32,
    },
}

impl Stat {
    /// Source line where the statement starts.
    pub fn line(&self) -> u32 {
        match self {
            Stat::Local { line, .. }
            | Stat::Assign { line, .. }
            | Stat::Call { line, .. }
            | Stat::While { line, .. }
            | Stat::Repeat { line, .. }
            | Stat::If { line, .. }
            | Stat::NumericFor { line, .. }
            | Stat::GenericFor { line, .. }
            | Stat::Function { line, .. }
            | Stat::LocalFunction { line, .. }
            | Stat::Return { line, .. }
            | Stat::Break { line } => *line,
            Stat::Do(block) => block.stats.first().map(Stat::line).unwrap_or(0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Left and right binding priorities (Lua 5.1 precedence table).
    pub fn priority(self) -> (u8, u8) {
        match self {
            BinOp::Or => (1, 1),
            BinOp::And => (2, 2),
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => (3, 3),
            BinOp::Concat => (5, 4),
            BinOp::Add | BinOp::Sub => (6, 6),
            BinOp::Mul | BinOp::Div | BinOp::Mod => (7, 7),
            BinOp::Pow => (10, 9),
        }
    }
}

/// Priority of unary operators.
pub const UNARY_PRIORITY: u8 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    Len,
}

#[derive(Debug)]
pub enum TableField {
    /// `[k] = v` or `name = v`
    Keyed(Expr, Expr),
    /// Positional `v`
    Positional(Expr),
}

#[derive(Debug)]
pub enum Expr {
    Nil,
    True,
    False,
    Number(f64),
    Str(Rc<str>),
    Vararg,
    Function(Rc<FuncBody>),
    Name(Rc<str>),
    Index {
        obj: Box<Expr>,
        key: Box<Expr>,
        line: u32,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        line: u32,
    },
    Method {
        obj: Box<Expr>,
        name: Rc<str>,
        args: Vec<Expr>,
        line: u32,
    },
    Table(Vec<TableField>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        line: u32,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
        line: u32,
    },
    /// Parenthesized expression; truncates multiple results to one.
    Paren(Box<Expr>),
}

impl Expr {
    /// Calls and `...` can produce more than one value.
    pub fn is_multi(&self) -> bool {
        matches!(self, Expr::Call { .. } | Expr::Method { .. } | Expr::Vararg)
    }
}
