use crate::commands;
use crate::common::CommonParams;
use crate::log_debug;
use crate::providers::Provider;
use crate::ui;
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand, crate_version};
use colored::Colorize;

const LOG_FILE: &str = "mahaguru-debug.log";

/// CLI structure defining the available commands and global arguments
#[derive(Parser)]
#[command(
    author,
    version = crate_version!(),
    about = "Mahaguru: AI study assistant with query refinement",
    long_about = "Mahaguru answers simple questions directly and turns vague learning requests into precise ones through a short clarifying dialogue.",
    disable_version_flag = true,
    after_help = get_dynamic_help(),
    styles = get_styles(),
)]
pub struct Cli {
    /// Subcommands available for the CLI
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub common: CommonParams,

    /// Log debug messages to a file
    #[arg(
        short = 'l',
        long = "log",
        global = true,
        help = "Log debug messages to a file"
    )]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(
        long = "log-file",
        global = true,
        help = "Specify a custom log file path"
    )]
    pub log_file: Option<String>,

    /// Suppress non-essential output (spinners, waiting messages, etc.)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress non-essential output"
    )]
    pub quiet: bool,

    /// Display the version
    #[arg(
        short = 'v',
        long = "version",
        global = true,
        help = "Display the version"
    )]
    pub version: bool,
}

/// Enumeration of available subcommands
#[derive(Subcommand)]
#[command(subcommand_negates_reqs = true)]
#[command(subcommand_precedence_over_arg = true)]
pub enum Commands {
    /// Ask a question and follow the refinement dialogue to the end
    #[command(
        about = "Ask a question",
        long_about = "Classify the question, answer it directly when it is simple, or run the clarifying dialogue until a refined request is produced."
    )]
    Ask {
        /// The question or learning request
        #[arg(help = "The question or learning request")]
        query: String,
    },

    /// Classify a query as simple or complex
    #[command(about = "Classify a query as simple or complex")]
    Classify {
        #[arg(help = "The query to classify")]
        query: String,
    },

    /// Run the first refinement round only
    #[command(about = "Run the first refinement round for a query")]
    Refine {
        #[arg(help = "The query to refine")]
        query: String,
    },

    /// Continue a refinement dialogue without a stored session
    #[command(
        about = "Continue a refinement dialogue from explicit answers",
        long_about = "Continue a refinement dialogue statelessly: pass the original query, every answer so far and the number of question rounds already answered."
    )]
    Continue {
        /// The original query
        #[arg(long, help = "The original query")]
        query: String,

        /// Answers in `question_id=answer` form
        #[arg(
            long = "answer",
            help = "An answer in question_id=answer form (repeatable)",
            value_parser = parse_answer_arg
        )]
        answers: Vec<(String, String)>,

        /// Question rounds already answered
        #[arg(long, default_value_t = 1, help = "Question rounds already answered")]
        rounds: u32,
    },

    /// Show the rule-based domain profile of a query
    #[command(about = "Show the rule-based academic profile of a query")]
    Profile {
        #[arg(help = "The query to profile")]
        query: String,
    },

    /// Configure providers and models
    #[command(about = "Show or update Mahaguru configuration")]
    Config {
        /// Set API key for the active provider
        #[arg(long, help = "Set API key for the active provider")]
        api_key: Option<String>,

        /// Set model for the active provider
        #[arg(long, help = "Set model for the active provider")]
        model: Option<String>,

        /// Set fast model for the active provider
        #[arg(long, help = "Set fast model for the active provider")]
        fast_model: Option<String>,

        /// Set additional parameters for the active provider
        #[arg(
            long,
            help = "Set additional parameters for the active provider (key=value)"
        )]
        param: Option<Vec<String>>,
    },
}

fn parse_answer_arg(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((id, answer)) if !id.trim().is_empty() => {
            Ok((id.trim().to_string(), answer.trim().to_string()))
        }
        _ => Err(format!("Expected question_id=answer, got '{s}'")),
    }
}

/// Define custom styles for Clap
fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

fn get_dynamic_help() -> String {
    let mut providers = Provider::all_names();
    providers.sort_unstable();

    let providers_list = providers
        .iter()
        .map(|p| format!("{}", p.bold()))
        .collect::<Vec<_>>()
        .join(" • ");

    format!("\nAvailable LLM Providers: {providers_list}")
}

/// Main function to parse arguments and handle the command
pub async fn main() -> anyhow::Result<()> {
    let cli = parse_args();

    if cli.version {
        ui::print_version(crate_version!());
        return Ok(());
    }

    if cli.log {
        crate::logger::enable_logging();
        let log_file = cli.log_file.as_deref().unwrap_or(LOG_FILE);
        crate::logger::set_log_file(log_file)?;
        log_debug!("Logging to {}", log_file);
    } else {
        crate::logger::disable_logging();
    }

    if cli.quiet || cli.common.json {
        ui::set_quiet_mode(true);
    }

    if let Some(command) = cli.command {
        handle_command(command, &cli.common).await
    } else {
        // If no subcommand is provided, print the help
        let _ = Cli::parse_from(["mahaguru", "--help"]);
        Ok(())
    }
}

/// Dispatch a parsed subcommand
pub async fn handle_command(command: Commands, common: &CommonParams) -> anyhow::Result<()> {
    match command {
        Commands::Ask { query } => commands::handle_ask_command(common, &query).await,
        Commands::Classify { query } => {
            commands::handle_classify_command(common, &query);
            Ok(())
        }
        Commands::Refine { query } => commands::handle_refine_command(common, &query).await,
        Commands::Continue {
            query,
            answers,
            rounds,
        } => commands::handle_continue_command(common, &query, answers, rounds).await,
        Commands::Profile { query } => {
            commands::handle_profile_command(common, &query);
            Ok(())
        }
        Commands::Config {
            api_key,
            model,
            fast_model,
            param,
        } => {
            log_debug!(
                "Handling 'config' command with provider: {:?}, model: {:?}, fast_model: {:?}, param: {:?}",
                common.provider,
                model,
                fast_model,
                param
            );
            commands::handle_config_command(common, api_key, model, fast_model, param)
        }
    }
}
