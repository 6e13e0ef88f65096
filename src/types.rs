use crate::lexer::LAMBDA;
use std::fmt; // For custom display formatting
use std::mem;
use std::rc::Rc;

/// A lambda calculus expression.
///
/// Nodes are never mutated once built; children are shared through `Rc`, so
/// cloning an expression is cheap and evaluation always builds fresh nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A reference to a binder, resolved through the environment when evaluated.
    Variable(String),
    /// A variable whose lookup failed: nothing in scope binds it.
    FreeVariable(String),
    Abstraction {
        param: String,
        body: Rc<Expr>,
    },
    Application {
        left: Rc<Expr>,
        right: Rc<Expr>,
    },
    /// `let name = value in body`
    Binding {
        name: String,
        value: Rc<Expr>,
        body: Rc<Expr>,
    },
    /// `' name = value`, a declaration the caller keeps for later lines.
    ReplBinding {
        name: String,
        value: Rc<Expr>,
    },
}

impl Expr {
    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn free_variable(name: impl Into<String>) -> Self {
        Expr::FreeVariable(name.into())
    }

    pub fn abstraction(param: impl Into<String>, body: Expr) -> Self {
        Expr::Abstraction {
            param: param.into(),
            body: Rc::new(body),
        }
    }

    pub fn application(left: Expr, right: Expr) -> Self {
        Expr::Application {
            left: Rc::new(left),
            right: Rc::new(right),
        }
    }

    pub fn binding(name: impl Into<String>, value: Expr, body: Expr) -> Self {
        Expr::Binding {
            name: name.into(),
            value: Rc::new(value),
            body: Rc::new(body),
        }
    }

    pub fn repl_binding(name: impl Into<String>, value: Expr) -> Self {
        Expr::ReplBinding {
            name: name.into(),
            value: Rc::new(value),
        }
    }

    fn children_mut(&mut self) -> [Option<&mut Rc<Expr>>; 2] {
        match self {
            Expr::Variable(_) | Expr::FreeVariable(_) => [None, None],
            Expr::Abstraction { body, .. } => [Some(body), None],
            Expr::Application { left, right } => [Some(left), Some(right)],
            Expr::Binding { value, body, .. } => [Some(value), Some(body)],
            Expr::ReplBinding { value, .. } => [Some(value), None],
        }
    }

    /// Moves every child this node alone keeps alive onto `stack`, leaving `hole` behind.
    fn detach_children(&mut self, hole: &Rc<Expr>, stack: &mut Vec<Rc<Expr>>) {
        for child in self.children_mut().into_iter().flatten() {
            if owns_subtree(child) {
                stack.push(mem::replace(child, Rc::clone(hole)));
            }
        }
    }
}

// True when dropping `child` would go on to free nodes below it.
fn owns_subtree(child: &Rc<Expr>) -> bool {
    Rc::strong_count(child) == 1
        && !matches!(**child, Expr::Variable(_) | Expr::FreeVariable(_))
}

// Long application chains and deep nesting would otherwise be freed recursively.
impl Drop for Expr {
    fn drop(&mut self) {
        if !self.children_mut().into_iter().flatten().any(|child| owns_subtree(child)) {
            return;
        }
        let hole = Rc::new(Expr::Variable(String::new()));
        let mut stack = Vec::new();
        self.detach_children(&hole, &mut stack);
        while let Some(child) = stack.pop() {
            if let Ok(mut expr) = Rc::try_unwrap(child) {
                expr.detach_children(&hole, &mut stack);
            }
        }
    }
}

/// Writes `expr`, parenthesizing `let` forms that would not re-parse where they sit.
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            expr @ (Expr::Binding { .. } | Expr::ReplBinding { .. }) => write!(f, "({})", expr),
            expr => write!(f, "{}", expr),
        }
    }
}

// Canonical form: every abstraction and application is parenthesized, bare names are not.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Variable(name) | Expr::FreeVariable(name) => write!(f, "{}", name),
            Expr::Abstraction { param, body } => write!(f, "({}{}.{})", LAMBDA, param, body),
            Expr::Application { .. } => {
                // The left spine is walked in a loop: `x x ... x` nests one level per atom.
                let mut arguments = Vec::new();
                let mut head = self;
                while let Expr::Application { left, right } = head {
                    arguments.push(right);
                    head = Rc::as_ref(left);
                }
                for _ in 0..arguments.len() {
                    f.write_str("(")?;
                }
                write!(f, "{}", Operand(head))?;
                for argument in arguments.into_iter().rev() {
                    write!(f, " {})", Operand(argument))?;
                }
                Ok(())
            }
            Expr::Binding { name, value, body } => {
                write!(f, "let {} = {} in ", name, Operand(value))?;
                match &**body {
                    body @ Expr::ReplBinding { .. } => write!(f, "{}", Operand(body)),
                    body => write!(f, "{}", body),
                }
            }
            Expr::ReplBinding { name, value } => write!(f, "let {} = {}", name, Operand(value)),
        }
    }
}
