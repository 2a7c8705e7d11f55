use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// A single frame of the environment chain: a name→value map plus an optional
/// link to the enclosing frame. The chain is rooted at the globals frame and
/// may outlive any particular call (closures keep their defining frame alive).
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Looks `name` up through the whole chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            Some(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            None
        }
    }

    /// Assigns to an existing binding somewhere in the chain. Returns `false`
    /// when the name is bound nowhere.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            true
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            false
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

// Shallow by hand: the chain is cyclic through closure captures, so a derived
// Debug would not terminate.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .field("has_enclosing", &self.enclosing.is_some())
            .finish()
    }
}

/// Climbs exactly `distance` enclosing links. `None` when the chain is
/// shorter, which means a resolver depth and the runtime chain disagree.
pub fn ancestor(
    env: &Rc<RefCell<Environment>>,
    distance: usize,
) -> Option<Rc<RefCell<Environment>>> {
    let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

    for _ in 0..distance {
        let enclosing = current.borrow().enclosing.clone()?;
        current = enclosing;
    }

    Some(current)
}

/// Reads `name` in the frame exactly `distance` hops up the chain.
pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
    let frame = ancestor(env, distance)?;
    let value = frame.borrow().values.get(name).cloned();
    value
}

/// Writes `name` in the frame exactly `distance` hops up the chain. Returns
/// `false` when the frame does not hold the name.
pub fn assign_at(
    env: &Rc<RefCell<Environment>>,
    distance: usize,
    name: &str,
    value: Value,
) -> bool {
    match ancestor(env, distance) {
        Some(frame) => {
            let mut frame = frame.borrow_mut();
            if frame.values.contains_key(name) {
                frame.values.insert(name.to_string(), value);
                true
            } else {
                false
            }
        }
        None => false,
    }
}
