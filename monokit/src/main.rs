mod commands;
mod formatting;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{timed, timed_stderr, DispatchArgs};
use formatting::print_error;

#[derive(Parser)]
#[command(name = "monokit")]
#[command(version)]
#[command(about = "Run test runners, linters and bundlers across JavaScript workspace packages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory to start workspace discovery from.
    #[arg(long, global = true, default_value = ".")]
    cwd: PathBuf,

    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long, global = true, action)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Bundle packages with rollup.
    Build {
        #[command(flatten)]
        dispatch: DispatchArgs,
        /// Rebuild on changes.
        #[arg(short, long, action)]
        watch: bool,
        /// Development bundle (`NODE_ENV=development`).
        #[arg(long, action)]
        dev: bool,
    },
    /// Generate a changelog from conventional commits.
    Changelog {
        /// Start after this ref instead of the latest tag.
        #[arg(long)]
        from: Option<String>,
    },
    /// Generate package stubs for quick development.
    Dev { packages: Vec<String> },
    /// Run a script or command.
    Run {
        file: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
        /// Run in every workspace package.
        #[arg(short, long, action)]
        workspaces: bool,
        /// Run one package at a time.
        #[arg(short, long, action)]
        sequential: bool,
    },
    /// Run jest.
    Test {
        #[command(flatten)]
        dispatch: DispatchArgs,
    },
    /// Run eslint.
    Lint {
        #[command(flatten)]
        dispatch: DispatchArgs,
    },
    /// Run any registered tool.
    Tool {
        name: String,
        #[command(flatten)]
        dispatch: DispatchArgs,
    },
    /// List workspace packages.
    List {
        #[arg(long, action)]
        json: bool,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env("MONOKIT_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cwd = cli
        .cwd
        .canonicalize()
        .with_context(|| format!("Invalid --cwd: {}", cli.cwd.display()))?;

    match cli.command {
        Commands::Build {
            dispatch,
            watch,
            dev,
        } => timed("building", || commands::cmd_build(&cwd, dispatch, watch, dev)),
        Commands::Changelog { from } => {
            timed_stderr("changelog", || commands::cmd_changelog(&cwd, from))
        }
        Commands::Dev { packages } => timed("stubbing", || commands::cmd_dev(&cwd, packages)),
        Commands::Run {
            file,
            args,
            workspaces,
            sequential,
        } => timed("running", || {
            commands::cmd_run(&cwd, &file, &args, workspaces, sequential)
        }),
        Commands::Test { dispatch } => timed("testing", || commands::cmd_test(&cwd, dispatch)),
        Commands::Lint { dispatch } => timed("linting", || commands::cmd_lint(&cwd, dispatch)),
        Commands::Tool { name, dispatch } => {
            timed(&name, || commands::cmd_tool(&cwd, &name, dispatch))
        }
        Commands::List { json } => commands::cmd_list(&cwd, json),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(err) = run(cli) {
        print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}
