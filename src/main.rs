use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rlox::ast_printer::AstPrinter;
use rlox::parser::Parser;
use rlox::scanner::{scan_tokens, Scanner};
use rlox::{Lox, RunOutcome};

/// Exit status for lexical, syntax and resolution errors.
const EXIT_STATIC: u8 = 65;

/// Exit status for runtime errors.
const EXIT_RUNTIME: u8 = 70;

#[derive(ClapParser, Debug)]
#[command(
    version,
    about = "Lox language interpreter",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Script to run; starts the interactive prompt when omitted
    script: Option<PathBuf>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts the interactive prompt
    Repl,
}

/// Reads the contents of a file into a String
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // `[module:line] - message`, crate prefix stripped
    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rlox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn tokenize(filename: &PathBuf, json: bool) -> Result<ExitCode> {
    info!("Running Tokenize subcommand");
    let source = read_file(filename)?;
    let mut tokenized = true;

    if json {
        let (tokens, errors) = scan_tokens(&source);
        for e in &errors {
            eprintln!("{}", e);
        }
        tokenized = errors.is_empty();

        let rendered = serde_json::to_string_pretty(&tokens).context("Failed to encode tokens")?;
        println!("{}", rendered);
    } else {
        for token in Scanner::new(&source) {
            match token {
                Ok(token) => {
                    debug!("Scanned token: {}", token);
                    println!("{}", token);
                }

                Err(e) => {
                    tokenized = false;
                    eprintln!("{}", e);
                }
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC);
        return Ok(ExitCode::from(EXIT_STATIC));
    }

    info!("Tokenization completed successfully");
    Ok(ExitCode::SUCCESS)
}

fn parse(filename: &PathBuf) -> Result<ExitCode> {
    info!("Running Parse subcommand");
    let source = read_file(filename)?;
    let (tokens, lex_errors) = scan_tokens(&source);

    for e in &lex_errors {
        eprintln!("{}", e);
    }

    match Parser::new(tokens).parse_expression() {
        Ok(expr) if lex_errors.is_empty() => {
            let ast_str = AstPrinter::print(&expr);
            debug!("AST: {}", ast_str);
            println!("{}", ast_str);
            Ok(ExitCode::SUCCESS)
        }

        Ok(_) => Ok(ExitCode::from(EXIT_STATIC)),

        Err(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            Ok(ExitCode::from(EXIT_STATIC))
        }
    }
}

fn run(filename: &PathBuf) -> Result<ExitCode> {
    info!("Running Run subcommand");
    let source = read_file(filename)?;
    debug!("Provided input:\n{}", source);

    let mut lox = Lox::new();

    let code = match lox.run(&source)? {
        RunOutcome::Ok => ExitCode::SUCCESS,
        RunOutcome::StaticError => ExitCode::from(EXIT_STATIC),
        RunOutcome::RuntimeError => ExitCode::from(EXIT_RUNTIME),
    };

    info!("Run subcommand completed");
    Ok(code)
}

/// One line per program unit.  Errors are reported and the prompt continues.
fn repl() -> Result<ExitCode> {
    info!("Starting REPL");
    let mut lox = Lox::new().repl(true);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        let outcome = lox.run(&line)?;
        debug!("REPL line finished: {:?}", outcome);
    }

    info!("REPL closed");
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match (args.command, args.script) {
        (Some(Commands::Tokenize { filename, json }), _) => tokenize(&filename, json),
        (Some(Commands::Parse { filename }), _) => parse(&filename),
        (Some(Commands::Run { filename }), _) | (None, Some(filename)) => run(&filename),
        (Some(Commands::Repl), _) | (None, None) => repl(),
    }
}
