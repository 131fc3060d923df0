pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::customer::CustomerCommand;

#[derive(Debug, Parser)]
#[command(
    name = "sachet",
    about = "Sachet water customer analytics CLI",
    long_about = "Capture customers, inspect the dashboard, and request a customer analysis.",
    after_help = concat!(
        "Examples:\n",
        "  sachet migrate\n",
        "  sachet customer add --business-name \"Osu Kiosk\" --phone 0244000000 \\\n",
        "      --lat 5.6037 --lng -0.187 --bags 60\n",
        "  sachet dashboard\n",
        "  sachet doctor --json",
    )
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo customer base around Accra")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, analysis readiness, and database schema")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Capture or list customers")]
    Customer {
        #[command(subcommand)]
        command: CustomerCommand,
    },
    #[command(about = "Print the dashboard snapshot: totals, segments, and top customers")]
    Dashboard,
    #[command(about = "Request an analysis of the customer base from the configured model")]
    Analyze,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Customer { command } => commands::customer::run(command),
        Command::Dashboard => commands::dashboard::run(),
        Command::Analyze => commands::analyze::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
