//! Tree‑walking evaluator.
//!
//! Statements produce a [`Completion`]: either they ran to the end, or a
//! `return` is unwinding toward the nearest function call.  Runtime errors
//! travel separately as `Err(LoxError::Runtime)`, so a `return` never looks
//! like a failure and an error never looks like a `return`.
//!
//! Local names are read and written at the hop count recorded by the
//! resolver; anything the resolver left out is a global.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use log::{debug, info};

use crate::callable::{Function, NativeFunction};
use crate::class::{Class, Instance, INITIALIZER};
use crate::environment::{self, Env, Environment};
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::resolver::Locals;
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Deepest chain of active calls before a runtime "Stack overflow." error.
pub const MAX_CALL_DEPTH: usize = 2048;

/// Below this much remaining native stack, a call first grows the stack.
const RED_ZONE: usize = 100 * 1024;

/// Size of each stack segment allocated on growth.
const STACK_GROWTH: usize = 1024 * 1024;

/// How a statement finished.
#[derive(Debug)]
pub enum Completion {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Env,
    environment: Env,
    locals: HashMap<ExprId, usize>,
    output: Rc<RefCell<dyn Write>>,
    repl: bool,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Seconds since the Unix epoch.
fn clock(_args: &[Value]) -> Value {
    let now = chrono::Utc::now();
    Value::Number(now.timestamp_millis() as f64 / 1000.0)
}

impl Interpreter {
    /// Interpreter writing `print` output to stdout.
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(std::io::stdout())))
    }

    /// Interpreter writing `print` output to `output`.
    pub fn with_output(output: Rc<RefCell<dyn Write>>) -> Self {
        info!("Initializing Interpreter");

        let globals: Env = Environment::new().shared();

        let interpreter = Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
            repl: false,
            depth: 0,
        };

        interpreter.define_native(NativeFunction {
            name: "clock",
            arity: 0,
            func: clock,
        });

        interpreter
    }

    /// Echo the value of every expression statement (interactive prompt).
    pub fn set_repl(&mut self, repl: bool) {
        self.repl = repl;
    }

    /// Inject a host function into the global frame.
    pub fn define_native(&self, native: NativeFunction) {
        debug!("Defining native function '{}'", native.name);

        self.globals
            .borrow_mut()
            .define(native.name, Value::Native(Rc::new(native)));
    }

    /// Every name currently defined in the global frame.
    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().names().cloned().collect()
    }

    /// Merge a binding table produced by the resolver.
    ///
    /// Entries are never removed: ids are process-unique, and a closure from
    /// an earlier REPL line may still evaluate the nodes they key.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Recording {} resolved local(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Runs a program unit.  A runtime error aborts the remaining statements.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match stmt {
                // The prompt echoes top-level expression values.
                Stmt::Expression(expr) if self.repl => {
                    let value = self.evaluate(expr)?;
                    self.emit(&value)?;
                }
                _ => {
                    self.execute(stmt)?;
                }
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Completion> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.emit(&value)?;
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {:?}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment)).shared();
                return self.execute_block(statements, env);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_stmt) = else_branch {
                    return self.execute(else_stmt);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Completion::Return(value) = self.execute(body)? {
                        return Ok(Completion::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                let function = Function::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {:?}", value);
                return Ok(Completion::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass: Option<Rc<Class>> = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Class(class) => Some(class),
                        _ => {
                            let token = match expr {
                                Expr::Variable { name, .. } => name,
                                _ => name,
                            };
                            return Err(LoxError::runtime(token, "Superclass must be a class."));
                        }
                    },
                    None => None,
                };

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Nil);

                // Methods close over a frame holding `super`, one hop outside
                // the frame `bind` adds for `this`.
                let method_env: Env = match &superclass {
                    Some(superclass) => {
                        let mut env = Environment::with_enclosing(Rc::clone(&self.environment));
                        env.define("super", Value::Class(Rc::clone(superclass)));
                        env.shared()
                    }
                    None => Rc::clone(&self.environment),
                };

                let methods: HashMap<String, Rc<Function>> = methods
                    .iter()
                    .map(|decl| {
                        let function = Function::new(
                            Rc::clone(decl),
                            Rc::clone(&method_env),
                            decl.name.lexeme == INITIALIZER,
                        );
                        (decl.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let class = Class::new(name.lexeme.clone(), superclass, methods);
                info!("Class '{}' defined", name.lexeme);

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Class(Rc::new(class)));
            }
        }

        Ok(Completion::Normal)
    }

    /// Run `statements` in `env`, restoring the current frame on every exit
    /// path: normal end, `return`, or error.
    pub fn execute_block(&mut self, statements: &[Stmt], env: Env) -> Result<Completion> {
        let mut scope = self.enter(env);

        for stmt in statements {
            if let Completion::Return(value) = scope.execute(stmt)? {
                return Ok(Completion::Return(value));
            }
        }

        Ok(Completion::Normal)
    }

    fn enter(&mut self, env: Env) -> ScopeGuard<'_> {
        let previous = std::mem::replace(&mut self.environment, env);

        ScopeGuard {
            interpreter: self,
            previous: Some(previous),
        }
    }

    fn enter_call(&mut self) -> CallGuard<'_> {
        self.depth += 1;

        CallGuard { interpreter: self }
    }

    fn emit(&self, value: &Value) -> Result<()> {
        writeln!(self.output.borrow_mut(), "{}", value)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                self.evaluate_unary(operator, right)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                evaluate_binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuit = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => {
                        environment::assign_at(&self.environment, distance, &name.lexeme, value.clone())
                    }
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone()),
                };

                if !assigned {
                    return Err(undefined_variable(name));
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                let Some(callable) = callee.as_callable() else {
                    return Err(LoxError::runtime(
                        paren,
                        "Can only call functions and classes.",
                    ));
                };

                if args.len() != callable.arity() {
                    return Err(LoxError::runtime(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            args.len()
                        ),
                    ));
                }

                if self.depth >= MAX_CALL_DEPTH {
                    return Err(LoxError::runtime(paren, "Stack overflow."));
                }

                let mut frame = self.enter_call();
                stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || {
                    callable.call(&mut frame, args)
                })
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value = self.evaluate(value)?;
                instance.set(name, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&self, operator: &Token, right: Value) -> Result<Value> {
        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
            },
            _ => Ok(Value::Bool(!right.is_truthy())),
        }
    }

    /// `super.method` starts the lookup at the superclass of the class whose
    /// body contains the expression, then binds the method to the current
    /// `this`.
    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(undefined_variable(keyword));
        };

        let superclass = match environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,
            _ => return Err(LoxError::runtime(keyword, "Superclass must be a class.")),
        };

        let object = match distance
            .checked_sub(1)
            .and_then(|d| environment::get_at(&self.environment, d, "this"))
        {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(LoxError::runtime(keyword, "Can't use 'super' without 'this'.")),
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(object)))),
            None => Err(LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        let value = match self.locals.get(&id) {
            Some(&distance) => environment::get_at(&self.environment, distance, &name.lexeme),
            None => self.globals.borrow().get(&name.lexeme),
        };

        value.ok_or_else(|| undefined_variable(name))
    }
}

/// Restores the interpreter's previous frame when dropped.
struct ScopeGuard<'i> {
    interpreter: &'i mut Interpreter,
    previous: Option<Env>,
}

impl Deref for ScopeGuard<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Interpreter {
        self.interpreter
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Interpreter {
        self.interpreter
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.interpreter.environment = previous;
        }
    }
}

/// Counts one active call; the count drops again however the call ends.
struct CallGuard<'i> {
    interpreter: &'i mut Interpreter,
}

impl Deref for CallGuard<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Interpreter {
        self.interpreter
    }
}

impl DerefMut for CallGuard<'_> {
    fn deref_mut(&mut self) -> &mut Interpreter {
        self.interpreter
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.interpreter.depth -= 1;
    }
}

fn undefined_variable(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
    }
}

fn evaluate_binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    let value = match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(a), Value::String(b)) => Value::String(a + &b),
            _ => {
                return Err(LoxError::runtime(
                    operator,
                    "Operands must be two numbers or strings.",
                ))
            }
        },

        TokenType::MINUS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Number(a - b)
        }

        TokenType::STAR => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Number(a * b)
        }

        TokenType::SLASH => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Number(a / b)
        }

        TokenType::GREATER => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a > b)
        }

        TokenType::GREATER_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a >= b)
        }

        TokenType::LESS => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a < b)
        }

        TokenType::LESS_EQUAL => {
            let (a, b) = number_operands(operator, &left, &right)?;
            Value::Bool(a <= b)
        }

        TokenType::EQUAL_EQUAL => Value::Bool(left == right),

        TokenType::BANG_EQUAL => Value::Bool(left != right),

        _ => {
            return Err(LoxError::runtime(
                operator,
                format!("Unknown binary operator '{}'.", operator.lexeme),
            ))
        }
    };

    Ok(value)
}
