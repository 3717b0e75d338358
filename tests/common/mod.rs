#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use rlox::{Lox, RunOutcome};

/// Captured result of running one program.
#[derive(Debug)]
pub struct Run {
    pub outcome: RunOutcome,
    pub stdout: String,
    pub stderr: String,
}

/// Session whose output and diagnostics land in shared buffers.
pub struct Session {
    pub lox: Lox,
    stdout: Rc<RefCell<Vec<u8>>>,
    stderr: Rc<RefCell<Vec<u8>>>,
}

impl Session {
    pub fn new(repl: bool) -> Self {
        let stdout = Rc::new(RefCell::new(Vec::new()));
        let stderr = Rc::new(RefCell::new(Vec::new()));
        let lox = Lox::with_sinks(stdout.clone(), stderr.clone()).repl(repl);

        Self {
            lox,
            stdout,
            stderr,
        }
    }

    /// Run `source` and drain whatever it wrote.
    pub fn run(&mut self, source: &str) -> Run {
        let outcome = self.lox.run(source).expect("sinks never fail");

        Run {
            outcome,
            stdout: String::from_utf8(self.stdout.take()).expect("utf-8 output"),
            stderr: String::from_utf8(self.stderr.take()).expect("utf-8 diagnostics"),
        }
    }
}

pub fn run(source: &str) -> Run {
    Session::new(false).run(source)
}
