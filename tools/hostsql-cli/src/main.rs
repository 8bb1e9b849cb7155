///
/// hostsql CLI - run SQLite command scripts
///
/// Provides commands for driving the integer-handle bindings from a shell:
/// - hostsql run <script>: evaluate every form in a script file
/// - hostsql eval "<forms>": evaluate forms given on the command line
/// - hostsql config: print the effective configuration as TOML
///

mod diagnostic;
mod printer;
mod reader;
mod session;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

use hostsql_sqlite3::{Config, DbError};
use miette::Report;
use tracing::{Level, debug};

use crate::diagnostic::report_read_error;
use crate::reader::read_forms;
use crate::session::Session;

#[derive(Parser)]
#[command(name = "hostsql")]
#[command(author, version, about = "Run SQLite command scripts through integer handles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every form in a script file
    Run {
        /// The script to run
        script: PathBuf,

        /// Stop at the first failing form
        #[arg(long)]
        fail_fast: bool,
    },

    /// Evaluate forms given on the command line
    Eval {
        /// Forms to evaluate, e.g. '(sqlite3-open ":memory:")'
        forms: String,

        /// Stop at the first failing form
        #[arg(long)]
        fail_fast: bool,
    },

    /// Print the effective configuration
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:?}", Report::new(e));
            process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Run { script, fail_fast } => run_file(&script, config, fail_fast),
        Commands::Eval { forms, fail_fast } => run_source("<eval>", &forms, config, fail_fast),
        Commands::Config => print_config(&config),
    };
    process::exit(code);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config, DbError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            Ok(Config::from_path(path)?)
        }
        None => Ok(Config::default()),
    }
}

fn run_file(script: &Path, config: Config, fail_fast: bool) -> i32 {
    let source = match std::fs::read_to_string(script) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading script: {}", e);
            return 1;
        }
    };
    run_source(&script.display().to_string(), &source, config, fail_fast)
}

fn run_source(name: &str, source: &str, config: Config, fail_fast: bool) -> i32 {
    let forms = match read_forms(source) {
        Ok(forms) => forms,
        Err(e) => {
            report_read_error(&e, name, source);
            return 1;
        }
    };

    let mut session = Session::new(config).fail_fast(fail_fast);
    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    match session.run(forms, &mut stdout.lock(), &mut stderr.lock()) {
        Ok(outcome) => {
            debug!(
                evaluated = outcome.evaluated,
                failed = outcome.failed,
                open_connections = session.registry().connection_count(),
                "script finished"
            );
            if outcome.failed == 0 { 0 } else { 1 }
        }
        Err(e) => {
            eprintln!("Output error: {}", e);
            1
        }
    }
}

fn print_config(config: &Config) -> i32 {
    match config.to_toml() {
        Ok(text) => {
            print!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("{:?}", Report::new(DbError::from(e)));
            1
        }
    }
}
