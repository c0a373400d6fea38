//! `while`, `do`/`while` and `for`
//!
//! `break` ends the innermost loop and `continue` skips to its next condition
//! check (after the step, for `for`). A `return` inside the body propagates
//! out of the loop unchanged.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Outcome, RuntimeError};
use crate::tree::Node;

/// What a loop does after one pass of its body
enum Flow {
    Next,
    Exit,
    Propagate(Outcome),
}

fn after_body(outcome: Outcome) -> Flow {
    match outcome {
        Outcome::Normal | Outcome::Continue => Flow::Next,
        Outcome::Break => Flow::Exit,
        returned @ Outcome::Returned(_) => Flow::Propagate(returned),
    }
}

impl Interpreter {
    pub(crate) fn execute_while(&mut self, cond: &Node, body: &Node) -> Result<Outcome, RuntimeError> {
        while self.condition_holds(cond)? {
            match after_body(self.execute_statement(body)?) {
                Flow::Next => {}
                Flow::Exit => break,
                Flow::Propagate(outcome) => return Ok(outcome),
            }
        }
        Ok(Outcome::Normal)
    }

    pub(crate) fn execute_do_while(
        &mut self,
        body: &Node,
        cond: &Node,
    ) -> Result<Outcome, RuntimeError> {
        loop {
            match after_body(self.execute_statement(body)?) {
                Flow::Next => {}
                Flow::Exit => break,
                Flow::Propagate(outcome) => return Ok(outcome),
            }
            if !self.condition_holds(cond)? {
                break;
            }
        }
        Ok(Outcome::Normal)
    }

    /// The init clause gets its own scope, so a loop variable declared there
    /// is gone once the loop ends. A missing condition always holds.
    pub(crate) fn execute_for(
        &mut self,
        init: Option<&Node>,
        cond: Option<&Node>,
        step: Option<&Node>,
        body: &Node,
    ) -> Result<Outcome, RuntimeError> {
        self.with_lexical_scope(|this| {
            if let Some(init) = init {
                this.execute_statement(init)?;
            }
            loop {
                if let Some(cond) = cond {
                    if !this.condition_holds(cond)? {
                        break;
                    }
                }
                match after_body(this.execute_statement(body)?) {
                    Flow::Next => {}
                    Flow::Exit => break,
                    Flow::Propagate(outcome) => return Ok(outcome),
                }
                if let Some(step) = step {
                    this.execute_statement(step)?;
                }
            }
            Ok(Outcome::Normal)
        })
    }
}
