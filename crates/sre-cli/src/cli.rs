use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the SRE bot
#[derive(Parser, Debug)]
#[command(name = "sre-bot")]
#[command(
    about = "Answers SRE questions from the incident knowledge base",
    long_about = None
)]
pub struct Cli {
    /// Subcommand to run; defaults to an interactive session
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file to use instead of `~/.sre-bot/config.toml`
    #[arg(long, global = true, value_name = "PATH", help = "Path to the config file")]
    pub config: Option<PathBuf>,

    /// Log debug output from every crate
    #[arg(short, long, global = true, help = "Enable debug logging on stderr")]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Ask a single question and print the answer")]
    Ask {
        #[arg(help = "The question to answer")]
        question: String,
    },

    #[command(about = "Ask questions one per line until EOF, `exit` or `quit`")]
    Interactive,

    #[command(about = "Show configuration")]
    Config {
        #[arg(long, help = "Show full configuration including defaults")]
        full: bool,
    },
}
