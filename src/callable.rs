use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::class::Instance;
use crate::environment::{self, Env, Environment};
use crate::error::Result;
use crate::interpreter::{Completion, Interpreter};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// Anything that can appear as the callee of a call expression.
pub trait Callable {
    /// Number of arguments the call site must supply.
    fn arity(&self) -> usize;

    /// Invoke with already evaluated arguments.  The interpreter checks the
    /// argument count against [`arity`](Callable::arity) before calling.
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value>;
}

/// A host function exposed to scripts.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Value,
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling native function '{}'", self.name);

        Ok((self.func)(&arguments))
    }
}

/// A user function or method together with the frame it closes over.
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Env,
    is_initializer: bool,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Env, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Produce a method whose closure additionally defines `this`.
    pub fn bind(&self, instance: Rc<Instance>) -> Function {
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.define("this", Value::Instance(instance));

        Function {
            declaration: Rc::clone(&self.declaration),
            closure: env.shared(),
            is_initializer: self.is_initializer,
        }
    }

    fn this(&self) -> Value {
        environment::get_at(&self.closure, 0, "this").unwrap_or(Value::Nil)
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            env.define(&param.lexeme, argument);
        }

        let completion = interpreter.execute_block(&self.declaration.body, env.shared())?;

        if self.is_initializer {
            return Ok(self.this());
        }

        Ok(match completion {
            Completion::Return(value) => value,
            Completion::Normal => Value::Nil,
        })
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}
