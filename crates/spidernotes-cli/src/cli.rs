use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "spidernotes")]
#[command(about = "Short notes attached to web pages, from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Quick capture: spidernotes "my thought here"
    #[arg(trailing_var_arg = true)]
    pub note: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note body
        body: Vec<String>,
        /// Page URL or words the note is attached to
        #[arg(short, long, default_value = "")]
        url: String,
    },
    /// List notes, newest first
    List {
        /// Number of notes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Show deleted notes instead
        #[arg(long)]
        deleted: bool,
    },
    /// Search notes by words in body or URL
    Search {
        /// Search query
        query: String,
        /// Number of notes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing note (opens $EDITOR without --body/--url)
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// Replace the body
        #[arg(long)]
        body: Option<String>,
        /// Replace the URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Delete a note
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Restore a deleted note
    Restore {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Export readable notes as JSON
    Export {
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import notes from a JSON backup
    Import {
        /// Backup file
        path: PathBuf,
    },
    /// Synchronize with the server
    Sync {
        /// Send every local note instead of the pending changes
        #[arg(long)]
        all: bool,
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Manage note encryption
    Encryption {
        #[command(subcommand)]
        command: EncryptionCommands,
    },
    /// Manage the server account
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Configure the CLI
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Turn synchronization on and run a full sync
    Enable,
    /// Turn synchronization off
    Disable,
    /// Show synchronization state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sync pending changes if the last sync is older than eight hours
    Periodic,
}

#[derive(Subcommand)]
pub enum EncryptionCommands {
    /// Encrypt every note with a key derived from the password
    Enable {
        /// Encryption password
        #[arg(long)]
        password: String,
    },
    /// Decrypt every note and forget the key
    Disable,
    /// Show encryption state and undecryptable note count
    Status,
    /// Delete notes the current key cannot decrypt
    Purge,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Show the connected account
    Show,
    /// Disconnect this device from the account
    Disconnect,
    /// Delete the server account and all local data
    Delete {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write server settings to the CLI config file
    Init {
        /// Sync server base URL
        #[arg(long)]
        server_url: Option<String>,
        /// Messaging token issued by the server
        #[arg(long)]
        token: Option<String>,
    },
}
