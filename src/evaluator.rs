use crate::environment::Environment;
use crate::types::Expr;
use log::{trace, warn};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Default recursion bound, low enough to stay inside a 2 MiB thread stack.
///
/// Depth grows with nesting under binders, `let` and argument positions, and
/// with each beta-reduction whose body reduces further. The arguments of a
/// single application spine share one level.
pub const DEFAULT_MAX_DEPTH: usize = 512;
pub const DEFAULT_MAX_STEPS: usize = 1_000_000;

/// Which bound an evaluation ran into.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Limit {
    Depth,
    Steps,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Depth => write!(f, "recursion depth"),
            Limit::Steps => write!(f, "step count"),
        }
    }
}

// --- Evaluation Error ---
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The term did not reach a normal form within the configured limits.
    #[error("Runtime limit exceeded: {limit} went past {bound}")]
    RuntimeLimitExceeded { limit: Limit, bound: usize },
}

// Result type alias for convenience
pub type EvalResult<T = Expr> = Result<T, EvalError>;

/// Bounds on a single evaluation. `None` leaves that dimension unbounded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: Option<usize>,
    pub max_steps: Option<usize>,
}

impl Limits {
    /// No bounds at all: a diverging term recurses until the native stack runs out.
    pub fn unbounded() -> Self {
        Limits {
            max_depth: None,
            max_steps: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            max_steps: Some(DEFAULT_MAX_STEPS),
        }
    }
}

// --- Evaluate Function ---

/// Reduces `expr` to normal form under `env` with the default limits.
pub fn evaluate(expr: &Expr, env: &Environment) -> EvalResult {
    evaluate_with_limits(expr, env, Limits::default())
}

/// Reduces `expr` to normal form under `env`.
///
/// Both sides of an application are evaluated before a beta-reduction, and
/// abstraction bodies are normalized under their binder. Unbound names come back
/// as [`Expr::FreeVariable`] and applications of anything but an abstraction are
/// left stuck; neither is an error.
pub fn evaluate_with_limits(expr: &Expr, env: &Environment, limits: Limits) -> EvalResult {
    let mut evaluator = Evaluator { limits, steps: 0 };
    evaluator.eval(expr, env, 0).inspect_err(|err| warn!("{}", err))
}

struct Evaluator {
    limits: Limits,
    steps: usize,
}

impl Evaluator {
    fn check_limits(&mut self, depth: usize) -> EvalResult<()> {
        self.steps += 1;
        if let Some(bound) = self.limits.max_depth
            && depth > bound
        {
            return Err(EvalError::RuntimeLimitExceeded {
                limit: Limit::Depth,
                bound,
            });
        }
        if let Some(bound) = self.limits.max_steps
            && self.steps > bound
        {
            return Err(EvalError::RuntimeLimitExceeded {
                limit: Limit::Steps,
                bound,
            });
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr, env: &Environment, depth: usize) -> EvalResult {
        self.check_limits(depth)?;
        let depth = depth + 1;

        match expr {
            // Call-by-value: the bound value is reduced before the body sees it
            Expr::Binding { name, value, body } => {
                let value = self.eval(value, env, depth)?;
                self.eval(body, &env.bind(name.as_str(), value), depth)
            }

            // The caller decides whether to keep the binding
            Expr::ReplBinding { name, value } => {
                let value = self.eval(value, env, depth)?;
                Ok(Expr::repl_binding(name.as_str(), value))
            }

            // Binding the parameter to itself hides any outer binding of the same
            // name and keeps its occurrences in the body as plain variables.
            Expr::Abstraction { param, body } => {
                let scope = env.bind(param.as_str(), Expr::Variable(param.clone()));
                let body = self.eval(body, &scope, depth)?;
                Ok(Expr::abstraction(param.as_str(), body))
            }

            // `f a b c` is `((f a) b) c`; its left spine is walked in a loop so a
            // long run of arguments costs steps but no depth.
            Expr::Application { .. } => {
                let mut arguments = Vec::new();
                let mut head = expr;
                while let Expr::Application { left, right } = head {
                    arguments.push(right);
                    head = Rc::as_ref(left);
                }
                let mut function = self.eval(head, env, depth)?;
                for argument in arguments.into_iter().rev() {
                    let argument = self.eval(argument, env, depth)?;
                    function = self.apply(function, argument, env, depth)?;
                }
                Ok(function)
            }

            Expr::Variable(name) => Ok(env
                .lookup(name)
                .cloned()
                .unwrap_or_else(|| Expr::FreeVariable(name.clone()))),

            Expr::FreeVariable(_) => Ok(expr.clone()),
        }
    }

    /// Beta-reduces when `function` is an abstraction, otherwise leaves the application stuck.
    fn apply(
        &mut self,
        function: Expr,
        argument: Expr,
        env: &Environment,
        depth: usize,
    ) -> EvalResult {
        if let Expr::Abstraction { param, body } = &function {
            trace!("beta: {} := {}", param, argument);
            return self.eval(body, &env.bind(param.as_str(), argument), depth);
        }
        Ok(Expr::application(function, argument))
    }
}
