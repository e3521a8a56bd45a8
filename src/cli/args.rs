//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Form-tree capacity engine: clone conditions, formulas and tables with
/// reference rewriting and linked-set maintenance
#[derive(Parser, Debug)]
#[command(name = "treecap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase debug output (repeat for more)
    #[arg(short = 'd', long = "debug", action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Tree snapshot file (default: store_path from config)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clone a capacity and its dependencies onto a node
    Copy {
        /// Capacity kind: condition | formula | table
        kind: String,
        /// Source capacity id
        id: String,
        /// New owner node id
        #[arg(short, long)]
        node: String,
        /// Numeric suffix unique to the overall tree-copy operation
        #[arg(short, long)]
        suffix: u32,
        /// Seed node mapping, old=new (repeatable)
        #[arg(long = "map-node", value_name = "OLD=NEW")]
        map_nodes: Vec<String>,
    },

    /// List the references embedded in a capacity payload
    Scan {
        /// Capacity kind: condition | formula | table
        kind: String,
        /// Capacity id
        id: String,
    },

    /// Show a node's linked capacity sets
    Links {
        /// Node id
        node: String,
    },

    /// Recompute the linking index entries for a capacity
    Relink {
        /// Capacity kind: condition | formula | table
        kind: String,
        /// Capacity id
        id: String,
    },

    /// Remove a capacity from the linking index
    Unlink {
        /// Capacity kind: condition | formula | table
        kind: String,
        /// Capacity id
        id: String,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a template config file
    Template,
}
