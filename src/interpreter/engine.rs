//! Interpreter entry points and frame helpers
//!
//! [`Interpreter`] owns the program, the execution state and the output sink.
//! Evaluation itself is split across sibling modules, each adding
//! `impl Interpreter` methods for one family of nodes.
//!
//! Every paired state operation (call frame, lexical scope, diagnostic frame,
//! dispatch context) is opened and closed by one helper that runs the body in
//! between, so the close happens on both the normal and the fault path.

use crate::interpreter::constants::{ENTRY_SYMBOL, FAILURE_STATUS};
use crate::interpreter::dispatch::{class_of, resolve_method};
use crate::interpreter::errors::{Outcome, RuntimeError};
use crate::memory::create_string;
use crate::memory::stack::ExecutionState;
use crate::memory::value::{ArrayInstance, InstanceRef, Primitive};
use crate::output::OutputSink;
use crate::tree::{CxType, GlobalDef, Node, Program, Token};
use std::collections::VecDeque;
use std::rc::Rc;

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Function `run` invokes
    pub entry_symbol: String,
    /// Render the full execution state into the fault report
    pub dump_state_on_fault: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            entry_symbol: ENTRY_SYMBOL.to_string(),
            dump_state_on_fault: false,
        }
    }
}

pub struct Interpreter {
    pub(crate) program: Rc<Program>,
    pub(crate) config: EngineConfig,
    pub(crate) state: ExecutionState,
    pub(crate) output: OutputSink,
    /// Most recent token with a location, for the innermost trace line
    pub(crate) nearest_token: Option<Token>,
    pub(crate) fault_trace: Option<Vec<String>>,
    pub(crate) fault_state: Option<String>,
}

impl Interpreter {
    /// Interpreter writing to stdout with the default entry point.
    /// Globals are materialized immediately.
    pub fn new(program: Program) -> Result<Self, RuntimeError> {
        Self::with_options(program, EngineConfig::default(), OutputSink::stdout())
    }

    pub fn with_options(
        program: Program,
        config: EngineConfig,
        output: OutputSink,
    ) -> Result<Self, RuntimeError> {
        let mut interpreter = Interpreter {
            program: Rc::new(program),
            config,
            state: ExecutionState::new(),
            output,
            nearest_token: None,
            fault_trace: None,
            fault_state: None,
        };
        interpreter.initialize_globals()?;
        Ok(interpreter)
    }

    /// Evaluate global initializers in order. A global whose initializer
    /// refers to a symbol not yet defined is retried after the others; a
    /// full pass without progress is an error.
    fn initialize_globals(&mut self) -> Result<(), RuntimeError> {
        let program = Rc::clone(&self.program);
        let mut pending: VecDeque<&GlobalDef> = program.globals.iter().collect();
        let mut stalled = 0;
        while let Some(global) = pending.pop_front() {
            match self.initialize_global(global) {
                Ok(()) => stalled = 0,
                Err(RuntimeError::UndefinedSymbol { name, .. }) if stalled <= pending.len() => {
                    tracing::debug!(
                        global = %global.name.image,
                        missing = %name,
                        "deferring global initializer"
                    );
                    pending.push_back(global);
                    stalled += 1;
                }
                Err(error) => return Err(error.or_location(global.name.location.as_ref())),
            }
        }
        tracing::debug!(count = program.globals.len(), "globals initialized");
        Ok(())
    }

    fn initialize_global(&mut self, global: &GlobalDef) -> Result<(), RuntimeError> {
        let value = match &global.init {
            Some(init) => {
                let depth = self.state.value_depth();
                let initial = self.evaluate_value(init);
                self.state.truncate_values(depth);
                self.initialized_binding(&global.ty, &initial?)?
            }
            None => crate::memory::create_value(&global.ty, &self.program)?,
        };
        self.state.bind(&global.name.image, value);
        // Later initializers may call functions that read this global
        self.state.seal_globals();
        Ok(())
    }

    /// Run the entry point with `args` as `argc`/`argv` and return its status.
    ///
    /// The status is the entry point's returned integer. A fault prints the
    /// reconstructed call stack to stderr and yields [`FAILURE_STATUS`], as
    /// does finishing without a return value.
    pub fn run(&mut self, args: &[String]) -> i32 {
        match self.run_entry(args) {
            Ok(Some(value)) => match value.as_primitive() {
                Some(status) => status.as_i64() as i32,
                None => {
                    tracing::warn!(returned = %value, "entry point returned a non-numeric value");
                    FAILURE_STATUS
                }
            },
            Ok(None) => FAILURE_STATUS,
            Err(error) => {
                self.report_fault(&error);
                FAILURE_STATUS
            }
        }
    }

    /// Run the entry point and hand back whatever it returned
    pub fn run_entry(&mut self, args: &[String]) -> Result<Option<InstanceRef>, RuntimeError> {
        self.reset_fault();
        let program = Rc::clone(&self.program);
        let entry = program
            .function(&self.config.entry_symbol)
            .ok_or_else(|| RuntimeError::MissingEntryPoint {
                name: self.config.entry_symbol.clone(),
            })?;

        let depth = self.state.value_depth();
        self.state
            .push_primitive(Primitive::int(args.len() as i64));
        let argv = args.iter().map(|arg| create_string(arg)).collect();
        self.state.push(InstanceRef::array(ArrayInstance::from_elements(
            CxType::char().pointer_to(),
            argv,
        )));
        tracing::info!(entry = %entry.name.image, argc = args.len(), "running program");

        let result = self.invoke(entry, entry.name.clone(), None);
        self.state.truncate_values(depth);
        result
    }

    /// Call a free function with already-evaluated arguments
    pub fn call_function(
        &mut self,
        name: &str,
        args: Vec<InstanceRef>,
    ) -> Result<Option<InstanceRef>, RuntimeError> {
        self.reset_fault();
        let program = Rc::clone(&self.program);
        let function = program
            .function(name)
            .ok_or_else(|| RuntimeError::undefined(name))?;
        if function.arity() != args.len() {
            return Err(RuntimeError::malformed(format!(
                "'{}' takes {} argument(s), got {}",
                name,
                function.arity(),
                args.len()
            )));
        }
        let depth = self.state.value_depth();
        for arg in args {
            self.state.push(arg);
        }
        let result = self.invoke(function, function.name.clone(), None);
        self.state.truncate_values(depth);
        result
    }

    /// Call a method on `receiver` (a compound or a pointer to one) with
    /// already-evaluated arguments, dispatching on its runtime class
    pub fn call_method(
        &mut self,
        receiver: &InstanceRef,
        name: &str,
        args: Vec<InstanceRef>,
    ) -> Result<Option<InstanceRef>, RuntimeError> {
        self.reset_fault();
        let (receiver, class) = class_of(receiver)?;
        let arg_types: Vec<CxType> = args.iter().map(InstanceRef::ty).collect();
        let program = Rc::clone(&self.program);
        let method = resolve_method(&program, &class, name, &arg_types)?;
        let depth = self.state.value_depth();
        for arg in args {
            self.state.push(arg);
        }
        let call_site = method.name.renamed(format!("{}::{}", class, name));
        let result = self.invoke(method, call_site, Some(receiver));
        self.state.truncate_values(depth);
        result
    }

    /// Evaluate an expression in the current context and return its value
    pub fn evaluate_expression(&mut self, node: &Node) -> Result<Option<InstanceRef>, RuntimeError> {
        let depth = self.state.value_depth();
        let result = self.evaluate(node).and_then(|_| {
            if self.state.value_depth() > depth {
                self.state.pop().map(Some)
            } else {
                Ok(None)
            }
        });
        self.state.truncate_values(depth);
        result
    }

    /// Execute a statement in the current context
    pub fn execute(&mut self, node: &Node) -> Result<Outcome, RuntimeError> {
        self.execute_statement(node)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputSink {
        &mut self.output
    }

    /// Call stack captured by the most recent fault, innermost first
    pub fn fault_trace(&self) -> Option<&[String]> {
        self.fault_trace.as_deref()
    }

    fn reset_fault(&mut self) {
        self.fault_trace = None;
        self.fault_state = None;
    }

    // ---------------------------------------------------------------------
    // Paired state helpers
    // ---------------------------------------------------------------------

    pub(crate) fn with_call_frame<R>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<R, RuntimeError>,
    ) -> Result<R, RuntimeError> {
        self.state.open_call();
        let result = body(self);
        self.state.close_call();
        result
    }

    pub(crate) fn with_lexical_scope<R>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<R, RuntimeError>,
    ) -> Result<R, RuntimeError> {
        self.state.open_scope();
        let result = body(self);
        self.state.close_scope();
        result
    }

    /// Run `body` under a diagnostic frame. The first fault to leave a frame
    /// records the whole diagnostic stack before anything is popped.
    pub(crate) fn with_diagnostic_frame<R>(
        &mut self,
        call_site: Token,
        body: impl FnOnce(&mut Self) -> Result<R, RuntimeError>,
    ) -> Result<R, RuntimeError> {
        self.state.enter_diagnostic(call_site);
        let result = body(self);
        if result.is_err() {
            self.capture_fault_trace();
        }
        self.state.exit_diagnostic();
        result
    }

    pub(crate) fn with_dispatch<R>(
        &mut self,
        receiver: Option<InstanceRef>,
        body: impl FnOnce(&mut Self) -> Result<R, RuntimeError>,
    ) -> Result<R, RuntimeError> {
        match receiver {
            Some(receiver) => self.state.push_receiver(receiver),
            None => self.state.push_free_context(),
        }
        let result = body(self);
        self.state.pop_dispatch();
        result
    }
}
