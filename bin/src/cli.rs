use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line interface configuration
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file, instead of the discovered `.quill/config.toml`
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log file or directory
    #[arg(long, global = true, env = "QUILL_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Backend base URL, overriding the config file
    #[arg(long, global = true, env = "QUILL_BACKEND")]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the backend answers
    Health,

    /// List available models, local and cloud
    Models,

    /// Print the manuscript tree with word counts
    Tree,

    /// Edit a scene with autosave
    Edit {
        /// Scene id
        scene: String,
    },

    /// Run one prompt against several models side by side
    Compare {
        /// Model id, given two to four times
        #[arg(short, long = "model", required = true)]
        models: Vec<String>,

        prompt: String,
    },

    /// Run an AI tool template
    Generate {
        #[arg(short, long, default_value = "generate")]
        template: String,

        /// Model id. Defaults to the profile for --task.
        #[arg(short, long)]
        model: Option<String>,

        /// Task type used to pick a model when --model is not given
        #[arg(long, default_value = "draft")]
        task: String,

        /// Scene whose text is sent along
        #[arg(long)]
        scene: Option<String>,

        prompt: String,
    },

    /// Create a project through the creation wizard
    New {
        /// `field=value` pairs, e.g. `title="Low Tide"`
        fields: Vec<String>,
    },

    /// Set up a project from example passages of your writing
    Init {
        /// Project name, lowercase with dashes
        name: String,

        #[arg(long, default_value = "literary")]
        genre: String,

        #[arg(long, default_value = "")]
        goals: String,

        /// File holding one example passage, given three to five times
        #[arg(long = "passage", required = true)]
        passages: Vec<PathBuf>,

        /// Reference document, may be repeated
        #[arg(long = "doc")]
        docs: Vec<PathBuf>,

        /// NotebookLM URL, may be repeated
        #[arg(long = "notebook")]
        notebooks: Vec<String>,

        /// Patterns to avoid and other style rules
        #[arg(long, default_value = "")]
        style_guide: String,

        /// Scene file to score with the generated analyzer before creating
        #[arg(long)]
        test_scene: Option<PathBuf>,
    },

    /// Ask the knowledge base about the story
    Ask {
        question: String,

        /// `cognee` or `notebooklm`
        #[arg(long, default_value = "cognee")]
        source: String,
    },

    /// List craft skills, or run one on a scene
    Craft {
        /// Skill id; lists the skills when omitted
        skill: Option<String>,

        /// Scene whose text the skill runs on
        #[arg(long, requires = "skill")]
        scene: Option<String>,
    },

    /// List research notebooks, or ask them a question
    Research {
        question: Option<String>,

        /// Notebook id to ask; the backend picks one when omitted
        #[arg(long)]
        notebook: Option<String>,

        /// Link the NotebookLM notebook at this URL instead of asking
        #[arg(long, requires = "name", conflicts_with = "question")]
        add: Option<String>,

        /// Name for the notebook given with --add
        #[arg(long)]
        name: Option<String>,

        /// Comma-separated tags for the notebook given with --add
        #[arg(long, default_value = "")]
        tags: String,
    },

    /// List characters, or analyze one
    Characters {
        /// Character id to analyze
        id: Option<String>,
    },

    /// Show what this backend session has cost
    Cost,

    /// Talk to the setup assistant for a project
    Setup {
        project: String,

        /// Research notebook the assistant reads from
        #[arg(long)]
        notebook_url: String,
    },

    /// Store provider API keys
    Keys {
        /// `provider=key` pairs
        keys: Vec<String>,

        /// Read keys from the provider environment variables
        #[arg(long)]
        from_env: bool,
    },

    /// Show or change preferences
    Prefs {
        #[arg(long, value_enum)]
        economy: Option<Toggle>,

        /// `task=model`, may be repeated
        #[arg(long = "profile")]
        profiles: Vec<String>,

        /// Remove the profile for a task
        #[arg(long = "clear-profile")]
        clear: Vec<String>,

        #[arg(long)]
        reset_profiles: bool,

        /// Hide the quick-start hint
        #[arg(long)]
        dismiss_quickstart: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> Self {
        toggle == Toggle::On
    }
}

/// Split `key=value`, trimming both sides.
pub fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let (key, value) = pair.split_once('=')?;
    let (key, value) = (key.trim(), value.trim());
    (!key.is_empty() && !value.is_empty()).then_some((key, value))
}
