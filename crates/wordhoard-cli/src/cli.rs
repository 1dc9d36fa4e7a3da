use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use wordhoard_core::sync::Answer;

#[derive(Parser)]
#[command(name = "wordhoard")]
#[command(about = "Keep a vocabulary notebook and sync it with private and shared dictionaries")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name holding identity and remote store settings
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a word
    #[command(alias = "new")]
    Add {
        /// The word or phrase
        headword: String,
        /// First meaning
        #[arg(short, long)]
        definition: Option<String>,
        /// Example sentence for the first meaning (repeatable)
        #[arg(short, long = "example", value_name = "TEXT")]
        examples: Vec<String>,
        /// Part of speech, e.g. noun
        #[arg(long = "pos", value_name = "POS")]
        part_of_speech: Option<String>,
        #[arg(long)]
        phonetic: Option<String>,
        /// Tag name (repeatable)
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Language code, defaults to "en"
        #[arg(long)]
        language: Option<String>,
        /// Add to a shared dictionary instead of the private one
        #[arg(long, value_name = "DICTIONARY_ID")]
        dict: Option<String>,
    },
    /// List words
    List {
        /// Number of words to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Filter words by tag name
        #[arg(long)]
        tag: Option<String>,
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Only words of this shared dictionary
        #[arg(long, value_name = "DICTIONARY_ID", conflicts_with = "private")]
        dict: Option<String>,
        /// Only words of the private dictionary
        #[arg(long)]
        private: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one word with all meanings
    Show {
        /// Word ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a word's fields
    Edit {
        /// Word ID or unique ID prefix
        id: String,
        #[arg(long)]
        headword: Option<String>,
        #[arg(long = "pos", value_name = "POS")]
        part_of_speech: Option<String>,
        /// Empty string clears it
        #[arg(long)]
        phonetic: Option<String>,
        #[arg(long)]
        language: Option<String>,
    },
    /// Replace a meaning's definition, or add a meaning
    Define {
        /// Word ID or unique ID prefix
        id: String,
        definition: String,
        /// 1-based meaning number; one past the last adds a meaning
        #[arg(short, long, default_value = "1")]
        meaning: usize,
    },
    /// Append an example sentence to a meaning
    Example {
        /// Word ID or unique ID prefix
        id: String,
        example: String,
        /// 1-based meaning number
        #[arg(short, long, default_value = "1")]
        meaning: usize,
    },
    /// Delete a word
    Delete {
        /// Word ID or unique ID prefix
        id: String,
    },
    /// Mark or unmark a word as favorite
    Favorite {
        /// Word ID or unique ID prefix
        id: String,
        /// Remove the favorite mark
        #[arg(long)]
        off: bool,
    },
    /// Record a quiz answer for a private word
    Answer {
        /// Word ID or unique ID prefix
        id: String,
        #[arg(value_enum)]
        result: AnswerArg,
    },
    /// Replace a word's tags, or list all tags when no word is given
    Tag {
        /// Word ID or unique ID prefix
        id: Option<String>,
        /// New tag set; empty clears all tags
        tags: Vec<String>,
    },
    /// Push local changes and pull remote ones
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Sign in, listen to every dictionary and print changes until interrupted
    Watch {
        /// Remote store poll interval in milliseconds
        #[arg(long, default_value = "1000", value_name = "MS")]
        interval_ms: u64,
    },
    /// Shared dictionaries
    Dict {
        #[command(subcommand)]
        command: DictCommands,
    },
    /// Export words
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
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
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the identity of a CLI profile
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl From<ExportFormat> for wordhoard_core::export::ExportFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Json => Self::Json,
            ExportFormat::Markdown => Self::Markdown,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum AnswerArg {
    Correct,
    Wrong,
}

impl From<AnswerArg> for Answer {
    fn from(answer: AnswerArg) -> Self {
        match answer {
            AnswerArg::Correct => Self::Correct,
            AnswerArg::Wrong => Self::Wrong,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum MemberRole {
    Editor,
    Viewer,
}

impl From<MemberRole> for wordhoard_core::models::Role {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Editor => Self::Editor,
            MemberRole::Viewer => Self::Viewer,
        }
    }
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Push unsynced words and queued deletes
    Push,
    /// Pull the private dictionary and every known shared dictionary
    Pull,
    /// List recently rejected remote versions
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum DictCommands {
    /// Turn the private dictionary into a new shared dictionary
    Share {
        /// Name of the new dictionary
        name: String,
    },
    /// List dictionaries you belong to
    List {
        /// Use the local cache instead of the remote store
        #[arg(long)]
        cached: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pull a shared dictionary and list its words
    Open {
        dictionary_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a collaborator to a dictionary you own
    Invite {
        dictionary_id: String,
        #[arg(long, value_name = "USER_ID")]
        user_id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long, value_enum, default_value_t = MemberRole::Editor)]
        role: MemberRole,
    },
    /// Remove a collaborator from a dictionary you own
    Remove {
        dictionary_id: String,
        #[arg(long, value_name = "USER_ID")]
        user_id: String,
    },
    /// Toggle your like on a shared word
    Like {
        /// Word ID or unique ID prefix
        id: String,
    },
    /// Record your quiz answer for a shared word
    Answer {
        /// Word ID or unique ID prefix
        id: String,
        #[arg(value_enum)]
        result: AnswerArg,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// JSON file holding the remote document store
        #[arg(long, value_name = "PATH")]
        remote_path: Option<PathBuf>,
        /// Whether this profile's subscription allows syncing
        #[arg(long, value_name = "BOOL")]
        can_sync: Option<bool>,
        /// Operations per remote commit (1-500)
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,
        /// Attempts per chunk
        #[arg(long, value_name = "N")]
        max_attempts: Option<u32>,
        /// Delay between attempts in milliseconds
        #[arg(long, value_name = "MS")]
        retry_delay_ms: Option<u64>,
        /// Delete local shared words that vanish from a dictionary snapshot
        #[arg(long, value_name = "BOOL")]
        infer_shared_deletions: Option<bool>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show {
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store the identity used for sync in the profile
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        #[arg(long, value_name = "USER_ID")]
        user_id: String,
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "NAME")]
        display_name: Option<String>,
    },
    /// Show the identity of a profile
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Forget the identity of a profile
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
