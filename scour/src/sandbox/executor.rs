//! Sandboxed evaluation of generated transformation code.
//!
//! The executor interprets a parsed program against an environment that
//! starts with exactly one binding: [`RESULT_BINDING`] holding a working copy
//! of the step's input frame. The input itself is never mutated; callers
//! decide what to do with the outcome.

use std::collections::HashMap;

use crate::core::frame::Frame;
use crate::sandbox::lang::{self, Lit, Operand, Stmt};
use crate::sandbox::ops;

/// Name the generated code must assign its result to.
pub const RESULT_BINDING: &str = "df";

/// What happened when a piece of generated code ran against a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// The program ran to completion and left a frame bound.
    Success {
        frame: Frame,
        /// True when the result is structurally identical to the input.
        noop: bool,
    },
    /// The code ran (or parsed) but broke the binding contract.
    ContractViolation { reason: String },
    /// The code failed to parse or a statement failed to evaluate.
    ExecutionError { error: String },
}

#[derive(Debug, Clone)]
enum Binding {
    Frame(Frame),
    Scalar(Lit),
}

/// Run `code` against `input` inside the sandbox.
pub fn execute(code: &str, input: &Frame) -> ExecOutcome {
    let program = match lang::parse_program(code) {
        Ok(program) => program,
        Err(error) => return ExecOutcome::ExecutionError { error },
    };

    let mut env: HashMap<String, Binding> = HashMap::new();
    env.insert(RESULT_BINDING.to_string(), Binding::Frame(input.clone()));
    let mut rebound = false;

    for stmt in &program.stmts {
        let value = match evaluate(stmt, &env) {
            Ok(value) => value,
            Err(error) => return ExecOutcome::ExecutionError { error },
        };
        if stmt.target == RESULT_BINDING {
            rebound = true;
        }
        env.insert(stmt.target.clone(), value);
    }

    if !rebound {
        return ExecOutcome::ContractViolation {
            reason: format!("generated code never assigns to '{RESULT_BINDING}'"),
        };
    }
    match env.remove(RESULT_BINDING) {
        Some(Binding::Frame(frame)) => {
            let noop = frame == *input;
            ExecOutcome::Success { frame, noop }
        }
        Some(Binding::Scalar(lit)) => ExecOutcome::ContractViolation {
            reason: format!("'{RESULT_BINDING}' ended up bound to the scalar {lit}, not a dataset"),
        },
        // unreachable: the binding is seeded above and insert never removes
        None => ExecOutcome::ContractViolation {
            reason: format!("'{RESULT_BINDING}' is unbound"),
        },
    }
}

fn evaluate(stmt: &Stmt, env: &HashMap<String, Binding>) -> Result<Binding, String> {
    let mut current = match &stmt.expr.base {
        Operand::Ident(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| format!("line {}: unknown name '{name}'", stmt.line))?,
        Operand::Literal(lit) => Binding::Scalar(lit.clone()),
    };

    for call in &stmt.expr.calls {
        let Binding::Frame(frame) = &current else {
            return Err(format!(
                "line {}: '{}' called on a scalar value",
                call.line, call.name
            ));
        };
        let next = ops::apply(frame, call)
            .map_err(|e| format!("line {}: {e}", call.line))?;
        current = Binding::Frame(next);
    }
    Ok(current)
}
