//! Node dispatch and leaf expressions
//!
//! [`Interpreter::evaluate`] is the single recursive entry point of the tree
//! walk. Expressions leave at most one value on the value stack; statements
//! report how they finished through [`Outcome`].

use crate::interpreter::constants::{RECEIVER_NAME, STACK_RED_ZONE, STACK_SEGMENT_SIZE};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Outcome, RuntimeError};
use crate::interpreter::type_system::{conform_to_node, is_truthy};
use crate::memory::create_string;
use crate::memory::value::{InstanceRef, Payload, PointerInstance, Primitive};
use crate::tree::{CxType, Literal, Node, NodeKind, PrimitiveKind};

impl Interpreter {
    /// Evaluate one node. Faults leaving this node get its location unless a
    /// deeper node already supplied one.
    pub(crate) fn evaluate(&mut self, node: &Node) -> Result<Outcome, RuntimeError> {
        if let Some(token) = &node.token {
            if token.location.is_some() {
                self.nearest_token = Some(token.clone());
            }
        }
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || self.evaluate_node(node))
            .map_err(|error| error.or_location(node.location()))
    }

    fn evaluate_node(&mut self, node: &Node) -> Result<Outcome, RuntimeError> {
        match &node.kind {
            NodeKind::Literal(literal) => self.evaluate_literal(node, *literal),
            NodeKind::True => self.push_value(Primitive::char(1)),
            NodeKind::False => self.push_value(Primitive::char(0)),
            NodeKind::StringLiteral(text) => {
                self.state.push(create_string(text));
                Ok(Outcome::Normal)
            }
            NodeKind::Id(name) => self.evaluate_id(name),

            NodeKind::Binary { op, lhs, rhs } => self.evaluate_binary(node, *op, lhs, rhs),
            NodeKind::Unary { op, operand } => self.evaluate_unary(node, *op, operand),
            NodeKind::Postfix { op, operand } => self.evaluate_postfix(*op, operand),
            NodeKind::Ternary {
                cond,
                then,
                otherwise,
            } => self.evaluate_ternary(node, cond, then, otherwise),
            NodeKind::Assignment { op, lhs, rhs } => self.evaluate_assignment(*op, lhs, rhs),
            NodeKind::Cast(operand) => self.evaluate_cast(node, operand),
            NodeKind::SizeOf(ty) => self.evaluate_sizeof(ty),

            NodeKind::Index { array, index } => self.evaluate_index(array, index),
            NodeKind::FieldGet { owner, field } => self.evaluate_field(owner, field),
            NodeKind::Indirection(operand) => self.evaluate_indirection(operand),
            NodeKind::AddressOf(operand) => self.evaluate_address_of(operand),

            NodeKind::FunctionCall { name, args } => self.evaluate_function_call(node, name, args),
            NodeKind::MethodCall {
                owner,
                method,
                args,
            } => self.evaluate_method_call(owner, method, args),
            NodeKind::ConstructorCall { constructor, args } => {
                self.evaluate_constructor_call(constructor, args)
            }

            NodeKind::Declaration { name, dims } => {
                self.execute_declaration(node, name, dims)?;
                Ok(Outcome::Normal)
            }
            NodeKind::InitializedDeclaration { decl, init } => {
                self.execute_initialized_declaration(decl, init)
            }
            NodeKind::Declarations(decls) => self.execute_all(decls),

            NodeKind::Compound(statements) => self.execute_compound(statements),
            NodeKind::Sequence(nodes) => self.evaluate_sequence(nodes),
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => self.execute_if(cond, then, otherwise.as_deref()),
            NodeKind::While { cond, body } => self.execute_while(cond, body),
            NodeKind::DoWhile { body, cond } => self.execute_do_while(body, cond),
            NodeKind::For {
                init,
                cond,
                step,
                body,
            } => self.execute_for(init.as_deref(), cond.as_deref(), step.as_deref(), body),
            NodeKind::Return(value) => self.execute_return(value.as_deref()),
            NodeKind::Break => Ok(Outcome::Break),
            NodeKind::Continue => Ok(Outcome::Continue),
            NodeKind::Empty => Ok(Outcome::Normal),
        }
    }

    /// Evaluate an expression that must produce exactly one value, and pop it
    pub(crate) fn evaluate_value(&mut self, node: &Node) -> Result<InstanceRef, RuntimeError> {
        let depth = self.state.value_depth();
        let outcome = self.evaluate(node)?;
        if !outcome.is_normal() {
            return Err(RuntimeError::malformed(format!(
                "{} used as a value",
                node.describe()
            ))
            .or_location(node.location()));
        }
        if self.state.value_depth() <= depth {
            return Err(RuntimeError::malformed(format!(
                "{} produced no value",
                node.describe()
            ))
            .or_location(node.location()));
        }
        self.state.pop()
    }

    fn push_value(&mut self, primitive: Primitive) -> Result<Outcome, RuntimeError> {
        self.state.push_primitive(primitive);
        Ok(Outcome::Normal)
    }

    fn evaluate_literal(&mut self, node: &Node, literal: Literal) -> Result<Outcome, RuntimeError> {
        let payload = match literal {
            Literal::Integral(value) => Payload::Integral(value),
            Literal::Floating(value) => Payload::Floating(value),
            Literal::Char(value) => Payload::Integral(value as i64),
        };
        let value = match node.ty.unqualified() {
            CxType::Primitive { kind, unsigned } if !kind.is_void() => {
                InstanceRef::primitive(Primitive::new(*kind, *unsigned, payload))
            }
            CxType::Pointer(target) if payload == Payload::Integral(0) => {
                InstanceRef::pointer(PointerInstance::null((**target).clone()))
            }
            // Untyped literal: take the natural kind of the payload
            _ => {
                let kind = match literal {
                    Literal::Integral(value) if i32::try_from(value).is_ok() => PrimitiveKind::Int,
                    Literal::Integral(_) => PrimitiveKind::Long,
                    Literal::Floating(_) => PrimitiveKind::Double,
                    Literal::Char(_) => PrimitiveKind::Char,
                };
                InstanceRef::primitive(Primitive::new(kind, false, payload))
            }
        };
        self.state.push(value);
        Ok(Outcome::Normal)
    }

    /// Push the binding itself, so the result is assignable
    fn evaluate_id(&mut self, name: &str) -> Result<Outcome, RuntimeError> {
        if name == RECEIVER_NAME {
            if let Some(receiver) = self.state.receiver() {
                self.state.push(receiver);
                return Ok(Outcome::Normal);
            }
        }
        let value = self
            .state
            .lookup(name)
            .ok_or_else(|| RuntimeError::undefined(name))?;
        self.state.push(value);
        Ok(Outcome::Normal)
    }

    fn evaluate_ternary(
        &mut self,
        node: &Node,
        cond: &Node,
        then: &Node,
        otherwise: &Node,
    ) -> Result<Outcome, RuntimeError> {
        let condition = self.evaluate_value(cond)?;
        let chosen = if is_truthy(&condition)? { then } else { otherwise };
        let value = self.evaluate_value(chosen)?;
        self.state.push(conform_to_node(value, &node.ty));
        Ok(Outcome::Normal)
    }

    /// Evaluate each node in order, keeping everything they push
    fn evaluate_sequence(&mut self, nodes: &[Node]) -> Result<Outcome, RuntimeError> {
        for node in nodes {
            let outcome = self.evaluate(node)?;
            if !outcome.is_normal() {
                return Ok(outcome);
            }
        }
        Ok(Outcome::Normal)
    }
}
