use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a frame.  Closures, bound methods and the interpreter all
/// hold these; a mutation through one handle is visible through every other.
pub type Env = Rc<RefCell<Environment>>;

/// One lexical frame: a name → value table plus the enclosing frame.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Env>,
}

impl Environment {
    /// A frame with no parent (the global frame).
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Env) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a frame in a shared handle.
    pub fn shared(self) -> Env {
        Rc::new(RefCell::new(self))
    }

    /// Insert or overwrite `name` in *this* frame only.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Names bound directly in this frame.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Read `name` from this frame only.
    pub fn get_here(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Search outward by name.  Used only for globals.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            Some(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            None
        }
    }

    /// Overwrite the nearest existing binding of `name`.  Returns `false` if
    /// no frame in the chain defines it.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            true
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            false
        }
    }
}

/// Walk `distance` parent links from `env`.  `None` if the chain is shorter.
pub fn ancestor(env: &Env, distance: usize) -> Option<Env> {
    let mut current: Env = Rc::clone(env);

    for _ in 0..distance {
        let parent: Env = current.borrow().enclosing.clone()?;
        current = parent;
    }

    Some(current)
}

/// Read `name` directly from the frame `distance` hops out.
pub fn get_at(env: &Env, distance: usize, name: &str) -> Option<Value> {
    ancestor(env, distance)?.borrow().get_here(name)
}

/// Overwrite `name` directly in the frame `distance` hops out.  Returns
/// `false` if that frame does not exist or does not define the name.
pub fn assign_at(env: &Env, distance: usize, name: &str, value: Value) -> bool {
    match ancestor(env, distance) {
        Some(frame) => {
            let mut frame = frame.borrow_mut();
            match frame.values.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            }
        }
        None => false,
    }
}
