//! Session driver: pushes one program unit at a time through
//! scan → parse → resolve → interpret and reports what happened.
//!
//! A `Lox` keeps its interpreter between calls to [`Lox::run`], so globals,
//! functions and classes declared on one REPL line are visible on the next.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use log::{debug, info};

use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan_tokens;

/// Result of running one program unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every statement ran.
    Ok,

    /// Lexical, syntax or resolution diagnostics; nothing was evaluated.
    StaticError,

    /// Evaluation started and was aborted by a runtime error.
    RuntimeError,
}

pub struct Lox {
    interpreter: Interpreter,
    diagnostics: Rc<RefCell<dyn Write>>,
    repl: bool,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// Program output on stdout, diagnostics on stderr.
    pub fn new() -> Self {
        Self::with_sinks(
            Rc::new(RefCell::new(std::io::stdout())),
            Rc::new(RefCell::new(std::io::stderr())),
        )
    }

    pub fn with_sinks(output: Rc<RefCell<dyn Write>>, diagnostics: Rc<RefCell<dyn Write>>) -> Self {
        info!("Starting Lox session");

        Self {
            interpreter: Interpreter::with_output(output),
            diagnostics,
            repl: false,
        }
    }

    /// Interactive mode: optional `;` and echoed expression values.
    pub fn repl(mut self, repl: bool) -> Self {
        self.repl = repl;
        self.interpreter.set_repl(repl);
        self
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Run one program unit.  Diagnostics are written to the diagnostic
    /// sink; `Err` is returned only when a sink itself fails.
    pub fn run(&mut self, source: &str) -> Result<RunOutcome> {
        let (tokens, lex_errors) = scan_tokens(source);

        // Parse even after lexical errors so one pass reports both kinds.
        let parsed = Parser::new(tokens).repl(self.repl).parse();

        let mut static_errors: Vec<LoxError> = lex_errors;
        let statements = match parsed {
            Ok(statements) if static_errors.is_empty() => statements,
            Ok(_) => Vec::new(),
            Err(errors) => {
                static_errors.extend(errors);
                Vec::new()
            }
        };

        if !static_errors.is_empty() {
            debug!("Unit rejected with {} static error(s)", static_errors.len());
            self.report(&static_errors)?;
            return Ok(RunOutcome::StaticError);
        }

        let resolver = Resolver::with_globals(self.interpreter.global_names());
        match resolver.resolve(&statements) {
            Ok(locals) => self.interpreter.resolve(locals),
            Err(errors) => {
                debug!("Unit rejected with {} resolution error(s)", errors.len());
                self.report(&errors)?;
                return Ok(RunOutcome::StaticError);
            }
        }

        match self.interpreter.interpret(&statements) {
            Ok(()) => Ok(RunOutcome::Ok),
            Err(LoxError::Io(e)) => Err(LoxError::Io(e)),
            Err(e) => {
                self.report(std::slice::from_ref(&e))?;
                Ok(RunOutcome::RuntimeError)
            }
        }
    }

    fn report(&self, errors: &[LoxError]) -> Result<()> {
        let mut sink = self.diagnostics.borrow_mut();
        for error in errors {
            writeln!(sink, "{}", error)?;
        }
        Ok(())
    }
}
