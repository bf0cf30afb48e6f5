//! Command line definitions.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "veriweb")]
#[command(about = "Check web pages by their visible text")]
#[command(version)]
pub(crate) struct Cli {
    /// Settings file (YAML). `veriweb.yaml` is read when present.
    #[arg(short, long, global = true, env = "VERIWEB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Browser alias (chrome, firefox, edge, safari, ie)
    #[arg(short, long, global = true)]
    pub browser: Option<String>,

    /// Run the browser without a window
    #[arg(long, global = true)]
    pub headless: bool,

    /// Comma separated browser arguments
    #[arg(long, global = true, default_value = "")]
    pub browser_options: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Print the effective search options
    Config,

    /// Open a page and require every text to be on it
    Verify {
        url: String,

        #[arg(required = true)]
        texts: Vec<String>,

        /// Descend into shadow roots
        #[arg(long)]
        shadow_dom: bool,

        /// Per-text time budget, e.g. `5s`
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
    },

    /// Open a page and probe every link on it
    Links {
        url: String,

        /// Log every link, not only broken ones
        #[arg(long)]
        log_all: bool,

        /// Do not retry failed HEAD requests with GET
        #[arg(long)]
        header_only: bool,
    },
}
