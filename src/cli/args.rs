//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Explore object reference graphs in heap snapshots
#[derive(Parser, Debug)]
#[command(name = "refgraph")]
#[command(about = "Explore object reference graphs in heap snapshots")]
#[command(version)]
pub struct Args {
    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Options shared by the diagram commands
#[derive(clap::Args, Debug, Clone)]
pub struct GraphArgs {
    /// Path to the JSON heap snapshot
    pub snapshot: PathBuf,

    /// Object ids to start from (can be repeated)
    #[arg(long = "root", required = true)]
    pub roots: Vec<u64>,

    /// Max traversal depth
    #[arg(long)]
    pub depth: Option<usize>,

    /// Max neighbors drawn per object
    #[arg(long)]
    pub too_many: Option<usize>,

    /// Output file (.dot or image), or `-` for DOT on stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Highlight objects whose type matches this glob
    #[arg(long)]
    pub highlight: Option<String>,

    /// Leave out objects whose type matches this glob (can be repeated)
    #[arg(long)]
    pub exclude_type: Vec<String>,

    /// Use module-qualified type names
    #[arg(long)]
    pub long_names: bool,

    /// Show referrer counts next to type names
    #[arg(long)]
    pub refcounts: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Draw what refers to the given objects
    Backrefs(GraphArgs),

    /// Draw what the given objects refer to
    Refs(GraphArgs),

    /// Find the shortest reference chain to an object of some type
    Chain {
        /// Path to the JSON heap snapshot
        snapshot: PathBuf,

        /// Object id to start from
        #[arg(long)]
        from: u64,

        /// Glob the type of the far end must match
        #[arg(long)]
        to_type: String,

        /// Follow references instead of referrers
        #[arg(long)]
        forward: bool,

        /// Max search depth
        #[arg(long)]
        depth: Option<usize>,

        /// Also draw the chain to this file, or `-` for DOT on stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Count objects of a type
    Count {
        /// Path to the JSON heap snapshot
        snapshot: PathBuf,

        /// Type name, optionally module-qualified
        typename: String,
    },

    /// Show the most common types
    Stats {
        /// Path to the JSON heap snapshot
        snapshot: PathBuf,

        /// Number of types to list
        #[arg(short, long)]
        limit: Option<usize>,

        /// Use module-qualified type names
        #[arg(long)]
        long_names: bool,
    },

    /// List objects nothing refers to
    Leaks {
        /// Path to the JSON heap snapshot
        snapshot: PathBuf,
    },

    /// Show version information
    Version,
}
