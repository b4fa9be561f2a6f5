use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mts",
    about = "Metrics Topic Store — append-only metric topics on disk",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Storage directory (defaults to $METRICS_STORE_DATAPATH)
    #[arg(long, global = true)]
    pub root: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Create a new topic
    Create(TopicArgs),
    /// Append a JSON record to a topic
    Put(PutArgs),
    /// Show the newest record of a topic
    Latest(TopicArgs),
    /// Print every record of a topic
    Data(TopicArgs),
    /// List topics
    Topics(TopicsArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<String>,
    /// TOML config file
    #[arg(long)]
    pub config: Option<String>,
    #[arg(long)]
    pub sync: bool,
}

#[derive(Args)]
pub struct TopicArgs {
    pub topic: String,
}

#[derive(Args)]
pub struct PutArgs {
    pub topic: String,
    /// Record as JSON, e.g. '{"v":1}'
    pub data: String,
}

#[derive(Args)]
pub struct TopicsArgs {}
