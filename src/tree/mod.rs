//! Type-resolved program tree consumed by the engine
//!
//! Parsing and type checking happen upstream. What arrives here is a tree whose
//! every node carries its resolved [`CxType`] and, where the source provided one,
//! the [`Token`] it was built from. Trees can be constructed in code via
//! [`build`] or deserialized from JSON via [`Program::from_json`].

pub mod build;
mod program;
mod types;

pub use program::{
    CompoundDef, CompoundKind, ConstructorRef, FieldDecl, FunctionDef, GlobalDef, Param,
    PriorConstructor, Program,
};
pub use types::{CxType, PrimitiveKind};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default)]
    pub file: Option<String>,
    pub line: usize,
    #[serde(default)]
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        SourceLocation {
            file: None,
            line,
            column,
        }
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", file, self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// A lexical token: its text plus where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub image: String,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

impl Token {
    pub fn new(image: impl Into<String>) -> Self {
        Token {
            image: image.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Same location, different text
    pub fn renamed(&self, image: impl Into<String>) -> Self {
        Token {
            image: image.into(),
            location: self.location.clone(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}({})", self.image, location),
            None => write!(f, "{}", self.image),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

/// Prefix unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Increment,
    Decrement,
    Plus,
    Neg,
    BitNot,
    Not,
}

/// Postfix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

/// Plain `=` or an operator-assignment such as `+=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

/// Literal payloads as written in the source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integral(i64),
    Floating(f64),
    Char(u8),
}

/// A tree node: its variant, its resolved type and the token it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default)]
    pub ty: CxType,
    #[serde(default)]
    pub token: Option<Token>,
}

/// Every node variant the engine understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    // Literals and names
    Literal(Literal),
    True,
    False,
    StringLiteral(String),
    Id(String),

    // Operators
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Postfix {
        op: PostfixOp,
        operand: Box<Node>,
    },
    Ternary {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
    Assignment {
        op: AssignOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Cast(Box<Node>),
    SizeOf(CxType),

    // Access
    Index {
        array: Box<Node>,
        index: Box<Node>,
    },
    FieldGet {
        owner: Box<Node>,
        field: String,
    },
    Indirection(Box<Node>),
    AddressOf(Box<Node>),

    // Calls
    FunctionCall {
        name: Token,
        args: Vec<Node>,
    },
    MethodCall {
        owner: Box<Node>,
        method: Token,
        args: Vec<Node>,
    },
    ConstructorCall {
        constructor: ConstructorRef,
        args: Vec<Node>,
    },

    // Declarations; the node's `ty` is the declared type
    Declaration {
        name: String,
        #[serde(default)]
        dims: Vec<Node>,
    },
    InitializedDeclaration {
        decl: Box<Node>,
        init: Box<Node>,
    },
    Declarations(Vec<Node>),

    // Statements
    Compound(Vec<Node>),
    Sequence(Vec<Node>),
    If {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
    While {
        cond: Box<Node>,
        body: Box<Node>,
    },
    DoWhile {
        body: Box<Node>,
        cond: Box<Node>,
    },
    For {
        init: Option<Box<Node>>,
        cond: Option<Box<Node>>,
        step: Option<Box<Node>>,
        body: Box<Node>,
    },
    Return(Option<Box<Node>>),
    Break,
    Continue,
    Empty,
}

impl Node {
    pub fn new(kind: NodeKind, ty: CxType) -> Self {
        Node {
            kind,
            ty,
            token: None,
        }
    }

    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Short name of the node variant, used in diagnostics
    pub fn describe(&self) -> &'static str {
        match &self.kind {
            NodeKind::Literal(_) => "literal",
            NodeKind::True | NodeKind::False => "boolean literal",
            NodeKind::StringLiteral(_) => "string literal",
            NodeKind::Id(_) => "identifier",
            NodeKind::Binary { .. } => "binary expression",
            NodeKind::Unary { .. } => "unary expression",
            NodeKind::Postfix { .. } => "postfix expression",
            NodeKind::Ternary { .. } => "ternary expression",
            NodeKind::Assignment { .. } => "assignment",
            NodeKind::Cast(_) => "cast",
            NodeKind::SizeOf(_) => "sizeof",
            NodeKind::Index { .. } => "array index",
            NodeKind::FieldGet { .. } => "field access",
            NodeKind::Indirection(_) => "indirection",
            NodeKind::AddressOf(_) => "address-of",
            NodeKind::FunctionCall { .. } => "function call",
            NodeKind::MethodCall { .. } => "method call",
            NodeKind::ConstructorCall { .. } => "constructor call",
            NodeKind::Declaration { .. } => "declaration",
            NodeKind::InitializedDeclaration { .. } => "initialized declaration",
            NodeKind::Declarations(_) => "declarations",
            NodeKind::Compound(_) => "compound statement",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::If { .. } => "if statement",
            NodeKind::While { .. } => "while loop",
            NodeKind::DoWhile { .. } => "do-while loop",
            NodeKind::For { .. } => "for loop",
            NodeKind::Return(_) => "return",
            NodeKind::Break => "break",
            NodeKind::Continue => "continue",
            NodeKind::Empty => "empty statement",
        }
    }

    /// First token found in a pre-order walk of this subtree
    pub fn closest_token(&self) -> Option<&Token> {
        if let Some(token) = &self.token {
            return Some(token);
        }
        match &self.kind {
            NodeKind::FunctionCall { name, .. } => Some(name),
            NodeKind::MethodCall { owner, method, .. } => {
                owner.closest_token().or(Some(method))
            }
            NodeKind::Binary { lhs, rhs, .. } => lhs.closest_token().or_else(|| rhs.closest_token()),
            NodeKind::Unary { operand, .. }
            | NodeKind::Postfix { operand, .. }
            | NodeKind::Cast(operand)
            | NodeKind::Indirection(operand)
            | NodeKind::AddressOf(operand) => operand.closest_token(),
            NodeKind::Assignment { lhs, rhs, .. } => {
                lhs.closest_token().or_else(|| rhs.closest_token())
            }
            NodeKind::Index { array, index } => {
                array.closest_token().or_else(|| index.closest_token())
            }
            NodeKind::FieldGet { owner, .. } => owner.closest_token(),
            NodeKind::InitializedDeclaration { decl, init } => {
                decl.closest_token().or_else(|| init.closest_token())
            }
            NodeKind::Compound(children)
            | NodeKind::Sequence(children)
            | NodeKind::Declarations(children) => {
                children.iter().find_map(|child| child.closest_token())
            }
            NodeKind::ConstructorCall { args, .. } => {
                args.iter().find_map(|arg| arg.closest_token())
            }
            NodeKind::Ternary { cond, .. }
            | NodeKind::If { cond, .. }
            | NodeKind::While { cond, .. } => cond.closest_token(),
            NodeKind::DoWhile { body, .. } => body.closest_token(),
            NodeKind::For { body, .. } => body.closest_token(),
            NodeKind::Return(Some(value)) => value.closest_token(),
            _ => None,
        }
    }

    /// Location of the closest token carrying one
    pub fn location(&self) -> Option<&SourceLocation> {
        self.closest_token().and_then(|token| token.location.as_ref())
    }
}
