use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::{Builder, Env};
use log::{debug, info};

use rox as lox;

use lox::ast_printer::AstPrinter;
use lox::scanner::Scanner;
use lox::session::{self, Session};
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    /// Starts the interactive prompt when omitted
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to a file (level taken from RUST_LOG, default debug)
    #[arg(long, global = true)]
    log: bool,

    /// Where --log writes its records
    #[arg(long, global = true, default_value = "app.log")]
    log_file: PathBuf,
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

    /// Parses a program from a file and prints it back in canonical form
    Parse {
        filename: PathBuf,

        /// Print the syntax tree as JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Reads and runs one line at a time from standard input
    Repl,
}

/// Reads the contents of a file into a String
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger(path: &Path) -> Result<()> {
    let log_file = File::create(path).context(format!("Failed to create {:?}", path))?;

    // RUST_LOG overrides the default level
    Builder::from_env(Env::default().default_filter_or("debug"))
        .format(|buf, record| {
            let module_path = record.module_path().unwrap_or("<unnamed>");
            let module = module_path.strip_prefix("rox::").unwrap_or(module_path);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

fn tokenize(filename: &Path, json: bool) -> Result<()> {
    let source = read_file(filename)?;
    let mut tokens: Vec<Token> = Vec::new();
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                if !json {
                    println!("{}", token);
                }
                tokens.push(token);
            }

            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if json {
        let out = serde_json::to_string_pretty(&tokens).context("Failed to encode tokens")?;
        println!("{}", out);
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(65);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &Path, json: bool) -> Result<()> {
    let source = read_file(filename)?;

    match session::parse_program(&source) {
        Ok(statements) if json => {
            info!("Program parsed successfully");
            let out = serde_json::to_string_pretty(&statements)
                .context("Failed to encode syntax tree")?;
            println!("{}", out);
        }

        Ok(statements) => {
            info!("Program parsed successfully");
            println!("{}", AstPrinter::print_program(&statements));
        }

        Err(diagnostics) => {
            debug!("Parse debug: {}", diagnostics);
            eprintln!("{}", diagnostics);
            std::process::exit(65);
        }
    }

    Ok(())
}

fn evaluate(filename: &Path) -> Result<()> {
    let source = read_file(filename)?;

    match Session::new().evaluate(&source) {
        Ok(value) => println!("{}", value),

        Err(e) => {
            debug!("Evaluation debug: {}", e);
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn run(filename: &Path) -> Result<()> {
    let source = read_file(filename)?;
    info!("Provided input:\n {}", source);

    if let Err(e) = Session::new().run(&source) {
        debug!("Run debug: {}", e);
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }

    info!("Program executed successfully");
    Ok(())
}

fn repl() -> Result<()> {
    let mut session = Session::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        line.clear();
        if lines.read_line(&mut line).context("Failed to read input")? == 0 {
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        // Errors end the line, never the session.
        if let Err(e) = session.run(&line) {
            debug!("REPL debug: {}", e);
            eprintln!("{}", e);
        }
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger(&args.log_file)?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Some(Commands::Tokenize { filename, json }) => tokenize(&filename, json),
        Some(Commands::Parse { filename, json }) => parse(&filename, json),
        Some(Commands::Evaluate { filename }) => evaluate(&filename),
        Some(Commands::Run { filename }) => run(&filename),
        Some(Commands::Repl) | None => repl(),
    }
}
