use crate::types::Expr;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

// --- Environment Definition ---

struct Frame {
    name: String,
    value: Expr,
    outer: Option<Rc<Frame>>,
}

/// A persistent chain of bindings.
///
/// `bind` returns a new handle whose tail is shared with the old one; the old
/// handle never sees the new binding. Cloning is a reference count bump, so two
/// branches of an evaluation can each extend their own copy.
#[derive(Clone, Default)]
pub struct Environment {
    head: Option<Rc<Frame>>,
    len: usize,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Environment::default()
    }

    /// Returns this environment extended with `name ↦ value`.
    /// A later binding shadows any earlier one with the same name.
    pub fn bind(&self, name: impl Into<String>, value: Expr) -> Environment {
        Environment {
            head: Some(Rc::new(Frame {
                name: name.into(),
                value,
                outer: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Looks up the most recent binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<&Expr> {
        self.iter()
            .find(|(bound, _)| *bound == name)
            .map(|(_, value)| value)
    }

    /// Walks the bindings from the most recent to the oldest, shadowed ones included.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Gets the set of all names bound in the environment
    pub fn get_identifiers(&self) -> BTreeSet<String> {
        self.iter().map(|(name, _)| name.to_string()).collect()
    }
}

pub struct Iter<'a> {
    next: Option<&'a Frame>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Expr);

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.next?;
        self.next = frame.outer.as_deref();
        Some((frame.name.as_str(), &frame.value))
    }
}

// Long chains would otherwise be dropped recursively, one stack frame per binding.
impl Drop for Environment {
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(frame) = next {
            match Rc::try_unwrap(frame) {
                Ok(mut frame) => next = frame.outer.take(),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(name, value)| (name, value.to_string())))
            .finish()
    }
}
