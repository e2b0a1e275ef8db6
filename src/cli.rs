use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Clone, Debug, Parser)]
pub struct PostboardArgs {
    /// Load configuration from a custom location. Defaults to: $XDG_CONFIG/postboard/config.yml
    #[arg(short, long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Print a config template
    ConfigTemplate,
    /// Create a config file. Defaults to: $XDG_CONFIG/postboard/config.yml
    ConfigInit {
        /// Create configuration at a custom location.
        #[arg(short, long = "config", value_name = "FILE")]
        config_path: Option<PathBuf>,
    },
    /// Apply pending database migrations
    Migrate {
        #[command(flatten)]
        args: PostboardArgs,
    },
    /// Fill the database with fake users and posts
    Seed {
        #[command(flatten)]
        args: PostboardArgs,

        /// Number of users to create
        #[arg(long, default_value_t = 3)]
        users: usize,

        /// Number of posts to create
        #[arg(long, default_value_t = 10)]
        posts: usize,
    },
}

/// Serves the post board when no command is given.
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
#[command(subcommand_negates_reqs(true))]
#[command(args_conflicts_with_subcommands(true))]
pub struct Cli {
    #[command(flatten)]
    pub args: PostboardArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}
