use clap::{Parser as ClapParser, Subcommand};
use jex_lang::cli::{self, CliError, RunOptions};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "jex")]
#[command(about = "JEX - transform JSON documents with a compile-once, execute-many script language")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a script against a JSON input
    Run {
        /// The script source, or a path when --file is given
        script: String,

        /// Treat the script argument as a file path
        #[arg(short, long)]
        file: bool,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Optional JSON metadata document ($meta)
        #[arg(short, long)]
        meta: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Fail on missing variables and paths instead of yielding null
        #[arg(long)]
        strict: bool,
    },

    /// Compile a script without executing it
    Check {
        /// The script source, or a path when --file is given
        script: String,

        /// Treat the script argument as a file path
        #[arg(short, long)]
        file: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            script,
            file,
            input,
            meta,
            pretty,
            strict,
        } => run(script, file, input, meta, pretty, strict),
        Commands::Check { script, file } => check(script, file),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn load_script(script: String, from_file: bool) -> Result<String, CliError> {
    if from_file {
        Ok(std::fs::read_to_string(script)?)
    } else {
        Ok(script)
    }
}

fn run(
    script: String,
    from_file: bool,
    input: Option<String>,
    meta: Option<String>,
    pretty: bool,
    strict: bool,
) -> Result<(), CliError> {
    let script = load_script(script, from_file)?;
    let input = match input {
        Some(text) => Some(text),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = RunOptions {
        script,
        input,
        meta,
        strict,
    };
    let output = cli::execute_run(&options)?;

    let rendered = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .map_err(CliError::InvalidInput)?;
    println!("{}", rendered);
    Ok(())
}

fn check(script: String, from_file: bool) -> Result<(), CliError> {
    let script = load_script(script, from_file)?;
    let functions = cli::execute_check(&script)?;
    if functions.is_empty() {
        println!("Syntax is valid");
    } else {
        println!("Syntax is valid; functions: {}", functions.join(", "));
    }
    Ok(())
}
