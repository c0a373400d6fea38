//! Helpers for constructing program trees in code
//!
//! Result types follow the usual arithmetic conversions so that trees built
//! here look like what the type checker would hand over.

use super::{
    AssignOp, BinaryOp, CompoundDef, CompoundKind, ConstructorRef, CxType, FieldDecl,
    FunctionDef, GlobalDef, Literal, Node, NodeKind, Param, PostfixOp, PrimitiveKind,
    PriorConstructor, Token, UnaryOp,
};

pub fn tok(image: &str) -> Token {
    Token::new(image)
}

// ---------------------------------------------------------------------------
// Literals and names
// ---------------------------------------------------------------------------

pub fn int(value: i64) -> Node {
    Node::new(NodeKind::Literal(Literal::Integral(value)), CxType::int())
}

pub fn long(value: i64) -> Node {
    Node::new(NodeKind::Literal(Literal::Integral(value)), CxType::long())
}

pub fn double(value: f64) -> Node {
    Node::new(NodeKind::Literal(Literal::Floating(value)), CxType::double())
}

pub fn chr(value: u8) -> Node {
    Node::new(NodeKind::Literal(Literal::Char(value)), CxType::char())
}

pub fn string(value: &str) -> Node {
    Node::new(
        NodeKind::StringLiteral(value.to_string()),
        CxType::char().pointer_to(),
    )
}

pub fn boolean(value: bool) -> Node {
    let kind = if value { NodeKind::True } else { NodeKind::False };
    Node::new(kind, CxType::char())
}

pub fn id(name: &str, ty: CxType) -> Node {
    Node::new(NodeKind::Id(name.to_string()), ty).with_token(tok(name))
}

pub fn this(class: &str) -> Node {
    id("this", CxType::class(class).pointer_to())
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Result type of `lhs op rhs` under the usual arithmetic conversions
pub fn binary_type(op: BinaryOp, lhs: &CxType, rhs: &CxType) -> CxType {
    if op.is_comparison() || op.is_logical() {
        return CxType::int();
    }
    match (lhs.pointee(), rhs.pointee()) {
        (Some(_), Some(_)) => CxType::long(),
        (Some(target), None) | (None, Some(target)) => target.clone().pointer_to(),
        (None, None) => arithmetic_type(lhs, rhs),
    }
}

fn arithmetic_type(lhs: &CxType, rhs: &CxType) -> CxType {
    let (Some((lk, lu)), Some((rk, ru))) = (lhs.as_primitive(), rhs.as_primitive()) else {
        return lhs.clone();
    };
    let kind = lk.max(rk);
    if kind.is_floating() {
        return CxType::primitive(kind);
    }
    let kind = kind.max(PrimitiveKind::Int);
    let unsigned = (lk == kind && lu) || (rk == kind && ru);
    CxType::Primitive { kind, unsigned }
}

fn promoted(ty: &CxType) -> CxType {
    match ty.as_primitive() {
        Some((kind, unsigned)) if kind.is_integral() && kind < PrimitiveKind::Int => CxType::Primitive {
            kind: PrimitiveKind::Int,
            unsigned,
        },
        _ => ty.unqualified().clone(),
    }
}

pub fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
    let ty = binary_type(op, &lhs.ty, &rhs.ty);
    Node::new(
        NodeKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
    )
}

pub fn unary(op: UnaryOp, operand: Node) -> Node {
    let ty = match op {
        UnaryOp::Not => CxType::int(),
        UnaryOp::Increment | UnaryOp::Decrement => operand.ty.clone(),
        UnaryOp::Plus | UnaryOp::Neg | UnaryOp::BitNot => promoted(&operand.ty),
    };
    Node::new(
        NodeKind::Unary {
            op,
            operand: Box::new(operand),
        },
        ty,
    )
}

pub fn postfix(op: PostfixOp, operand: Node) -> Node {
    let ty = operand.ty.clone();
    Node::new(
        NodeKind::Postfix {
            op,
            operand: Box::new(operand),
        },
        ty,
    )
}

pub fn ternary(cond: Node, then: Node, otherwise: Node) -> Node {
    let ty = then.ty.clone();
    Node::new(
        NodeKind::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        },
        ty,
    )
}

pub fn assign(lhs: Node, rhs: Node) -> Node {
    op_assign(AssignOp::Assign, lhs, rhs)
}

pub fn op_assign(op: AssignOp, lhs: Node, rhs: Node) -> Node {
    let ty = lhs.ty.clone();
    Node::new(
        NodeKind::Assignment {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
    )
}

pub fn cast(operand: Node, ty: CxType) -> Node {
    Node::new(NodeKind::Cast(Box::new(operand)), ty)
}

pub fn size_of(ty: CxType) -> Node {
    Node::new(NodeKind::SizeOf(ty), CxType::unsigned(PrimitiveKind::Long))
}

// ---------------------------------------------------------------------------
// Access
// ---------------------------------------------------------------------------

pub fn index(array: Node, index: Node) -> Node {
    let ty = array.ty.pointee().cloned().unwrap_or_default();
    Node::new(
        NodeKind::Index {
            array: Box::new(array),
            index: Box::new(index),
        },
        ty,
    )
}

pub fn field(owner: Node, name: &str, ty: CxType) -> Node {
    Node::new(
        NodeKind::FieldGet {
            owner: Box::new(owner),
            field: name.to_string(),
        },
        ty,
    )
}

/// `owner->name`
pub fn arrow(owner: Node, name: &str, ty: CxType) -> Node {
    field(deref(owner), name, ty)
}

pub fn deref(operand: Node) -> Node {
    let ty = operand.ty.pointee().cloned().unwrap_or_default();
    Node::new(NodeKind::Indirection(Box::new(operand)), ty)
}

pub fn address_of(operand: Node) -> Node {
    let ty = operand.ty.clone().pointer_to();
    Node::new(NodeKind::AddressOf(Box::new(operand)), ty)
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

pub fn call(name: &str, args: Vec<Node>, returns: CxType) -> Node {
    Node::new(
        NodeKind::FunctionCall {
            name: tok(name),
            args,
        },
        returns,
    )
}

pub fn method(owner: Node, name: &str, args: Vec<Node>, returns: CxType) -> Node {
    Node::new(
        NodeKind::MethodCall {
            owner: Box::new(owner),
            method: tok(name),
            args,
        },
        returns,
    )
}

pub fn construct(class: &str, index: usize, args: Vec<Node>) -> Node {
    Node::new(
        NodeKind::ConstructorCall {
            constructor: ConstructorRef {
                class: class.to_string(),
                index,
            },
            args,
        },
        CxType::class(class).pointer_to(),
    )
}

// ---------------------------------------------------------------------------
// Declarations and statements
// ---------------------------------------------------------------------------

pub fn declare(name: &str, ty: CxType) -> Node {
    Node::new(
        NodeKind::Declaration {
            name: name.to_string(),
            dims: Vec::new(),
        },
        ty,
    )
    .with_token(tok(name))
}

/// Array declaration whose dimensions are evaluated at run time
pub fn declare_array(name: &str, ty: CxType, dims: Vec<Node>) -> Node {
    Node::new(
        NodeKind::Declaration {
            name: name.to_string(),
            dims,
        },
        ty,
    )
    .with_token(tok(name))
}

pub fn declare_init(name: &str, ty: CxType, init: Node) -> Node {
    let decl = declare(name, ty.clone());
    Node::new(
        NodeKind::InitializedDeclaration {
            decl: Box::new(decl),
            init: Box::new(init),
        },
        ty,
    )
}

pub fn declarations(decls: Vec<Node>) -> Node {
    Node::new(NodeKind::Declarations(decls), CxType::void())
}

pub fn block(statements: Vec<Node>) -> Node {
    Node::new(NodeKind::Compound(statements), CxType::void())
}

pub fn sequence(nodes: Vec<Node>) -> Node {
    Node::new(NodeKind::Sequence(nodes), CxType::void())
}

pub fn if_then(cond: Node, then: Node) -> Node {
    Node::new(
        NodeKind::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: None,
        },
        CxType::void(),
    )
}

pub fn if_else(cond: Node, then: Node, otherwise: Node) -> Node {
    Node::new(
        NodeKind::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Some(Box::new(otherwise)),
        },
        CxType::void(),
    )
}

pub fn while_loop(cond: Node, body: Node) -> Node {
    Node::new(
        NodeKind::While {
            cond: Box::new(cond),
            body: Box::new(body),
        },
        CxType::void(),
    )
}

pub fn do_while(body: Node, cond: Node) -> Node {
    Node::new(
        NodeKind::DoWhile {
            body: Box::new(body),
            cond: Box::new(cond),
        },
        CxType::void(),
    )
}

pub fn for_loop(init: Option<Node>, cond: Option<Node>, step: Option<Node>, body: Node) -> Node {
    Node::new(
        NodeKind::For {
            init: init.map(Box::new),
            cond: cond.map(Box::new),
            step: step.map(Box::new),
            body: Box::new(body),
        },
        CxType::void(),
    )
}

pub fn ret(value: Node) -> Node {
    Node::new(NodeKind::Return(Some(Box::new(value))), CxType::void())
}

pub fn ret_void() -> Node {
    Node::new(NodeKind::Return(None), CxType::void())
}

pub fn brk() -> Node {
    Node::new(NodeKind::Break, CxType::void())
}

pub fn cont() -> Node {
    Node::new(NodeKind::Continue, CxType::void())
}

pub fn empty() -> Node {
    Node::new(NodeKind::Empty, CxType::void())
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

pub fn param(name: &str, ty: CxType) -> Param {
    Param {
        name: name.to_string(),
        ty,
    }
}

pub fn function(name: &str, params: Vec<Param>, returns: CxType, body: Vec<Node>) -> FunctionDef {
    FunctionDef {
        name: tok(name),
        params,
        return_type: returns,
        body: block(body),
        prior: None,
    }
}

pub fn constructor(class: &str, params: Vec<Param>, body: Vec<Node>) -> FunctionDef {
    function(class, params, CxType::void(), body)
}

pub fn prior(class: &str, index: usize, args: Vec<Node>) -> PriorConstructor {
    PriorConstructor {
        target: ConstructorRef {
            class: class.to_string(),
            index,
        },
        args,
    }
}

pub fn member(name: &str, ty: CxType) -> FieldDecl {
    FieldDecl {
        name: name.to_string(),
        ty,
    }
}

pub fn class(name: &str, parent: Option<&str>, fields: Vec<FieldDecl>) -> CompoundDef {
    CompoundDef {
        name: name.to_string(),
        kind: CompoundKind::Class,
        parent: parent.map(str::to_string),
        fields,
        methods: Vec::new(),
        constructors: Vec::new(),
    }
}

pub fn structure(name: &str, fields: Vec<FieldDecl>) -> CompoundDef {
    CompoundDef {
        name: name.to_string(),
        kind: CompoundKind::Struct,
        parent: None,
        fields,
        methods: Vec::new(),
        constructors: Vec::new(),
    }
}

pub fn global(name: &str, ty: CxType, init: Option<Node>) -> GlobalDef {
    GlobalDef {
        name: tok(name),
        ty,
        init,
    }
}
