//! Calls: free functions, methods and constructors
//!
//! Every call follows the same protocol. Arguments are evaluated left to
//! right onto the value stack, then a dispatch context, a diagnostic frame and
//! a call frame are opened. The callee pops its arguments and binds them in
//! declared order, runs its body, and everything is closed again in reverse
//! whether the body returned or faulted.
//!
//! Methods dispatch on the runtime class of the receiver: the lookup starts at
//! that class and walks up through its ancestors, taking the first method
//! whose name and arity match. Within a class an exact parameter match wins,
//! then the accepting overload needing the smallest numeric conversion, with
//! declaration order breaking ties.

use crate::interpreter::constants::CONSTRUCTOR_SUFFIX;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Outcome, RuntimeError};
use crate::interpreter::type_system::conform;
use crate::memory::create_value;
use crate::memory::value::{Instance, InstanceRef};
use crate::tree::{ConstructorRef, CxType, FunctionDef, Node, Param, PriorConstructor, Program, Token};
use std::rc::Rc;

/// Find the method `name` for a receiver of runtime class `class`
pub fn resolve_method<'p>(
    program: &'p Program,
    class: &str,
    name: &str,
    args: &[CxType],
) -> Result<&'p FunctionDef, RuntimeError> {
    for def in program.lineage(class) {
        let candidates: Vec<&FunctionDef> = def
            .methods
            .iter()
            .filter(|method| method.name.image == name && method.arity() == args.len())
            .collect();
        let exact = candidates.iter().find(|method| {
            method
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| param.ty.unqualified() == arg.unqualified())
        });
        let compatible = || {
            candidates
                .iter()
                .filter(|method| {
                    method
                        .params
                        .iter()
                        .zip(args)
                        .all(|(param, arg)| program.accepts(&param.ty, arg))
                })
                .min_by_key(|method| {
                    method
                        .params
                        .iter()
                        .zip(args)
                        .map(|(param, arg)| conversion_cost(&param.ty, arg))
                        .sum::<u32>()
                })
        };
        if let Some(method) = exact.or_else(compatible) {
            return Ok(*method);
        }
    }
    Err(RuntimeError::UnresolvedMethod {
        class: class.to_string(),
        name: name.to_string(),
        args: args
            .iter()
            .map(CxType::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        location: None,
    })
}

/// How far an argument is from a parameter: switching between integral and
/// floating costs more than any widening or narrowing within one family
fn conversion_cost(param: &CxType, arg: &CxType) -> u32 {
    match (param.unqualified(), arg.unqualified()) {
        (CxType::Primitive { kind: to, .. }, CxType::Primitive { kind: from, .. }) => {
            let family = if to.is_floating() == from.is_floating() { 0 } else { 16 };
            family + (*to as u32).abs_diff(*from as u32)
        }
        _ => 0,
    }
}

/// Receiver pointer and runtime class name for a method call owner, which
/// may be the compound itself or a pointer to it
pub(crate) fn class_of(owner: &InstanceRef) -> Result<(InstanceRef, String), RuntimeError> {
    let owner = owner.flatten();
    let (receiver, compound) = match &*owner.borrow() {
        Instance::Compound(_) => (owner.to_pointer(), owner.clone()),
        Instance::Pointer(pointer) => {
            if pointer.is_null() {
                return Err(RuntimeError::segfault("method call through a null pointer"));
            }
            (owner.clone(), pointer.slot()?.flatten())
        }
        Instance::Nullable(_) => {
            return Err(RuntimeError::segfault("method call on an absent value"));
        }
        other => {
            return Err(RuntimeError::malformed(format!(
                "method call on a {} value",
                other.kind_name()
            )))
        }
    };
    let class = match &*compound.borrow() {
        Instance::Compound(compound) => compound.class_name().map(str::to_string),
        _ => None,
    };
    let class = class.ok_or_else(|| RuntimeError::malformed("method receiver is not an object"))?;
    Ok((receiver, class))
}

fn constructor_site(class: &str, constructor: &FunctionDef) -> Token {
    constructor
        .name
        .renamed(format!("{}::{}", class, CONSTRUCTOR_SUFFIX))
}

impl Interpreter {
    /// Run `function` with its arguments already on the value stack
    #[tracing::instrument(level = "debug", skip_all, fields(call = %call_site.image))]
    pub(crate) fn invoke(
        &mut self,
        function: &FunctionDef,
        call_site: Token,
        receiver: Option<InstanceRef>,
    ) -> Result<Option<InstanceRef>, RuntimeError> {
        self.with_dispatch(receiver, |this| {
            this.with_diagnostic_frame(call_site, |this| {
                this.with_call_frame(|this| this.run_function(function))
            })
        })
    }

    fn run_function(&mut self, function: &FunctionDef) -> Result<Option<InstanceRef>, RuntimeError> {
        self.bind_parameters(&function.params)?;
        // Parameters are bound first so delegation arguments can use them
        if let Some(prior) = &function.prior {
            self.invoke_prior_constructor(prior)?;
        }
        self.log_state();
        match self.evaluate(&function.body)? {
            Outcome::Returned(Some(value)) => Ok(Some(conform(&value, &function.return_type)?)),
            Outcome::Returned(None) | Outcome::Normal => Ok(None),
            Outcome::Break | Outcome::Continue => Err(RuntimeError::malformed(
                "break or continue outside of a loop",
            )),
        }
    }

    /// Pop one argument per parameter and bind them in declared order
    fn bind_parameters(&mut self, params: &[Param]) -> Result<(), RuntimeError> {
        let mut args = Vec::with_capacity(params.len());
        for _ in params {
            args.push(self.state.pop()?);
        }
        args.reverse();
        for (param, arg) in params.iter().zip(args) {
            let bound = conform(&arg, &param.ty)?;
            self.state.bind(&param.name, bound);
        }
        Ok(())
    }

    fn invoke_prior_constructor(&mut self, prior: &PriorConstructor) -> Result<(), RuntimeError> {
        let program = Rc::clone(&self.program);
        let target = program
            .constructor(&prior.target)
            .ok_or_else(|| unresolved_constructor(&prior.target))?;
        let receiver = self
            .state
            .receiver()
            .ok_or_else(|| RuntimeError::malformed("prior constructor outside of a constructor"))?;
        self.push_arguments(&prior.args, target.arity())?;
        let call_site = constructor_site(&prior.target.class, target);
        self.invoke(target, call_site, Some(receiver))?;
        Ok(())
    }

    /// Evaluate call arguments left to right onto the value stack
    fn push_arguments(&mut self, args: &[Node], arity: usize) -> Result<(), RuntimeError> {
        if args.len() != arity {
            return Err(RuntimeError::malformed(format!(
                "call with {} argument(s) to a function taking {}",
                args.len(),
                arity
            )));
        }
        for arg in args {
            let value = self.evaluate_value(arg)?;
            self.state.push(value);
        }
        Ok(())
    }

    pub(crate) fn evaluate_function_call(
        &mut self,
        node: &Node,
        name: &Token,
        args: &[Node],
    ) -> Result<Outcome, RuntimeError> {
        if let Some(builtin) = super::builtins::Builtin::from_name(&name.image) {
            self.call_builtin(builtin, node, name, args)?;
            return Ok(Outcome::Normal);
        }
        let program = Rc::clone(&self.program);
        let function = program
            .function(&name.image)
            .ok_or_else(|| RuntimeError::undefined(&name.image))?;
        self.push_arguments(args, function.arity())?;
        if let Some(value) = self.invoke(function, name.clone(), None)? {
            self.state.push(value);
        }
        Ok(Outcome::Normal)
    }

    pub(crate) fn evaluate_method_call(
        &mut self,
        owner: &Node,
        method: &Token,
        args: &[Node],
    ) -> Result<Outcome, RuntimeError> {
        let owner = self.evaluate_value(owner)?;
        let (receiver, class) = class_of(&owner)?;

        let depth = self.state.value_depth();
        for arg in args {
            let value = self.evaluate_value(arg)?;
            self.state.push(value);
        }
        let arg_types: Vec<CxType> = self.state.values()[depth..]
            .iter()
            .map(InstanceRef::ty)
            .collect();

        let program = Rc::clone(&self.program);
        let function = resolve_method(&program, &class, &method.image, &arg_types)?;
        let call_site = method.renamed(format!("{}::{}", class, method.image));
        if let Some(value) = self.invoke(function, call_site, Some(receiver))? {
            self.state.push(value);
        }
        Ok(Outcome::Normal)
    }

    /// Allocate a zeroed object, run the constructor against it and push a
    /// pointer to it
    pub(crate) fn evaluate_constructor_call(
        &mut self,
        constructor: &ConstructorRef,
        args: &[Node],
    ) -> Result<Outcome, RuntimeError> {
        let program = Rc::clone(&self.program);
        let class = program
            .compound(&constructor.class)
            .ok_or_else(|| RuntimeError::undefined(&constructor.class))?;
        let object = create_value(&class.ty(), &program)?;
        let receiver = object.to_pointer();

        if class.constructors.is_empty() && args.is_empty() {
            self.state.push(receiver);
            return Ok(Outcome::Normal);
        }
        let function = class
            .constructors
            .get(constructor.index)
            .ok_or_else(|| unresolved_constructor(constructor))?;
        self.push_arguments(args, function.arity())?;
        let call_site = constructor_site(&constructor.class, function);
        self.invoke(function, call_site, Some(receiver.clone()))?;
        self.state.push(receiver);
        Ok(Outcome::Normal)
    }
}

fn unresolved_constructor(target: &ConstructorRef) -> RuntimeError {
    RuntimeError::UnresolvedMethod {
        class: target.class.clone(),
        name: format!("{} #{}", CONSTRUCTOR_SUFFIX, target.index),
        args: String::new(),
        location: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build::{class, function, param, ret, int};

    fn scale(ty: CxType, result: i64) -> FunctionDef {
        function("scale", vec![param("factor", ty)], CxType::int(), vec![ret(int(result))])
    }

    #[test]
    fn test_closest_overload_wins_over_declaration_order() {
        let shape = class("Shape", None, vec![])
            .with_method(scale(CxType::int(), 1))
            .with_method(scale(CxType::double(), 2));
        let program = Program::new().with_compound(shape);

        let chosen = resolve_method(&program, "Shape", "scale", &[CxType::float()]).unwrap();
        assert_eq!(chosen.params[0].ty, CxType::double());
        let chosen = resolve_method(&program, "Shape", "scale", &[CxType::char()]).unwrap();
        assert_eq!(chosen.params[0].ty, CxType::int());
        let chosen = resolve_method(&program, "Shape", "scale", &[CxType::int()]).unwrap();
        assert_eq!(chosen.params[0].ty, CxType::int());
    }

    #[test]
    fn test_unknown_method_is_unresolved() {
        let program = Program::new().with_compound(class("Shape", None, vec![]));
        assert!(matches!(
            resolve_method(&program, "Shape", "scale", &[CxType::int()]),
            Err(RuntimeError::UnresolvedMethod { .. })
        ));
    }
}
