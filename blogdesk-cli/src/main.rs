//! Blogdesk command-line admin
//!
//! ```bash
//! blogdesk seed
//! blogdesk blogs list --status DRAFT --sort title
//! blogdesk blogs list --query 'page=2&sort=created_at.desc'
//! blogdesk blogs list --restore
//! ```

mod commands;
mod error;
mod paths;
mod render;
mod settings;

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use simplelog::Config;
use simplelog::LevelFilter;
use simplelog::WriteLogger;

#[derive(Parser)]
#[command(name = "blogdesk")]
#[command(about = "Blog and organization admin tables", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database file (defaults to the platform data directory)
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    /// Settings database file (defaults to the platform data directory)
    #[arg(long, value_name = "PATH", global = true)]
    settings: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Fill an empty database with a sample organization, members and posts
    Seed,

    /// Manage blog posts
    Blogs {
        #[command(subcommand)]
        command: BlogCommand,
    },

    /// Manage organizations
    Orgs {
        #[command(subcommand)]
        command: OrgCommand,
    },

    /// Manage organization members
    Members {
        #[command(subcommand)]
        command: MemberCommand,
    },

    /// Show the saved view of each table as a query string
    Views,
}

/// Options shared by every `list` command.
#[derive(Args)]
struct ViewArgs {
    /// Shareable query string to open, e.g. 'page=2&sort=title.asc'
    #[arg(long, value_name = "QUERY")]
    query: Option<String>,

    /// Reopen the view saved by the previous `list`
    #[arg(long, conflicts_with = "query")]
    restore: bool,

    /// Page number, starting at 1
    #[arg(long, value_name = "N")]
    page: Option<usize>,

    /// Rows per page
    #[arg(long, value_name = "N")]
    per_page: Option<usize>,

    /// Sort column, optionally suffixed with .asc or .desc
    #[arg(long, value_name = "COL[.desc]")]
    sort: Option<String>,
}

#[derive(Subcommand)]
enum BlogCommand {
    /// List one page of posts
    List {
        #[command(flatten)]
        view: ViewArgs,

        /// Only posts whose title contains TEXT
        #[arg(long, value_name = "TEXT")]
        title: Option<String>,

        /// Only posts with this status (repeatable)
        #[arg(long, value_name = "STATUS")]
        status: Vec<String>,
    },

    /// Write a new post
    Create {
        /// Member id of the author
        #[arg(long)]
        author: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        body: String,

        /// Organization id (defaults to the author's organization)
        #[arg(long)]
        organization: Option<String>,

        #[arg(long)]
        image: Option<String>,

        /// Tag (repeatable)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// PUBLISHED or DRAFT
        #[arg(long, default_value = "DRAFT")]
        status: String,
    },

    /// Change fields of a post
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        body: Option<String>,

        #[arg(long, conflicts_with = "clear_image")]
        image: Option<String>,

        /// Remove the cover image
        #[arg(long)]
        clear_image: bool,

        /// Replace the tags (repeatable)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Option<Vec<String>>,

        /// PUBLISHED or DRAFT
        #[arg(long)]
        status: Option<String>,
    },

    /// Delete posts as one batch
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum OrgCommand {
    /// List one page of organizations
    List {
        #[command(flatten)]
        view: ViewArgs,

        /// Only organizations whose name contains TEXT
        #[arg(long, value_name = "TEXT")]
        name: Option<String>,
    },

    /// Create an organization
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        logo: String,

        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
enum MemberCommand {
    /// Add a user to an organization
    Add {
        /// Organization id
        #[arg(long)]
        org: String,

        #[arg(long)]
        user: String,

        /// Name shown as the author of the member's posts
        #[arg(long)]
        name: String,

        /// OWNER, ADMIN or MEMBER
        #[arg(long, default_value = "MEMBER")]
        role: String,
    },

    /// List the members of an organization
    List {
        /// Organization id
        org: String,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let Some(dir) = paths::log_dir() else { return };
    let file = paths::rotate_logs(&dir).and_then(File::create);
    match file {
        Ok(file) => {
            if let Err(e) = WriteLogger::init(level, Config::default(), file) {
                eprintln!("Failed to initialize logger: {}", e);
            }
        }
        Err(e) => eprintln!("Failed to open log in {}: {}", dir.display(), e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
