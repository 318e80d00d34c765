use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILE;

const REQUIRED_FILES: &str = "\
Files (looked up in [files].template_dir):
  spatula_template.png   quicktime spatula icon (required)
  select_menu.png        recipe selection screen
  cookingdone.png        finished dish
  cancook.png            start button, ingredients available
  cannotcook.png         start button, ingredients exhausted
  spatula_region.json    search area {\"region\": [x1, y1, x2, y2]}, see `calibrate`

Press Esc or Space to stop a run.";

#[derive(Parser, Debug)]
#[command(name = "cookbot", version)]
#[command(about = "Screen-driven cooking bot", long_about = None)]
#[command(after_help = REQUIRED_FILES)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// Skip the region outline preview
    #[arg(long, global = true)]
    pub no_preview: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (default)
    Run,
    /// Click two corners to save the search region
    Calibrate,
    /// Print the pointer position on every click
    Position,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }

    /// Default log filter
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
