pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "tipbot",
    about = "Tipbot operator CLI",
    long_about = "Operate the tipbot webhook: apply migrations, inspect configuration, and list known Slack users.",
    after_help = "Examples:\n  tipbot migrate\n  tipbot config\n  tipbot users --team T024BE7LD"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "List Slack users the bot has met in one team")]
    Users {
        #[arg(long, help = "Slack team id, e.g. T024BE7LD")]
        team: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Users { team } => commands::users::run(&team),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
