use anyhow::anyhow;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use wd_core::{parse_upload_date, BackendSelector, Error, RecordStorage, Result, SourceDocument, SourceMetadata};
use wd_inference::models::ollama::DEFAULT_MODEL_URL;
use wd_inference::models::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use wd_inference::{Config, ModelRegistry, OllamaConfig, OpenAiConfig, Pipeline};
use wd_storage::{JsonFileStorage, DEFAULT_OUTPUT_DIR};

mod logging;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_number = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| "Duration too large".to_string())?;
                current_number.clear();
                has_number = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A trailing bare number counts as seconds
        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(num)
                .ok_or_else(|| "Duration too large".to_string())?;
            has_number = true;
        }

        if !has_number {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Summarize, flag and draft posts for council meeting transcripts", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    openai_api_key: Option<String>,
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    openai_base_url: String,
    #[arg(long, env = "WD_OPENAI_MODEL", default_value = DEFAULT_MODEL, global = true)]
    openai_model: String,
    /// Local Ollama server and model, e.g. http://localhost:11434/llama3.1
    #[arg(long, env = "WD_MODEL_URL", default_value = DEFAULT_MODEL_URL, global = true)]
    model_url: String,
    /// Executable used by the ollama-cli backend
    #[arg(long, env = "WD_OLLAMA_BIN", default_value = "ollama", global = true)]
    ollama_binary: String,
    /// Per-call timeout (e.g. 30s, 5m, 1h15m); 0 disables it
    #[arg(long, default_value = "5m", global = true)]
    timeout: HumanDuration,
    /// Maximum number of backend calls in flight
    #[arg(long, default_value_t = wd_inference::DEFAULT_MAX_CONCURRENT_CALLS, global = true)]
    max_concurrent: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct ProcessArgs {
    /// Backend to use (see `wd backends`)
    #[arg(long, short, env = "WD_BACKEND", default_value = BackendSelector::OPENAI)]
    backend: String,
    /// Transcript file, or - for stdin
    #[arg(long, default_value = "-")]
    transcript: String,
    #[arg(long, default_value = wd_core::types::UNKNOWN_TITLE)]
    title: String,
    /// Upload date as YYYY-MM-DD or an RFC 3339 timestamp
    #[arg(long)]
    date: Option<String>,
    #[arg(long, default_value_t = wd_inference::DEFAULT_PARTITIONS)]
    parts: usize,
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: String,
    /// Opening sentence of every prompt
    #[arg(long)]
    context: Option<String>,
    /// Check that the backend answers before dispatching
    #[arg(long)]
    check: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a transcript through the pipeline and save the record
    Process(ProcessArgs),
    /// List available backends
    Backends {
        /// Also check whether each backend can be reached
        #[arg(long)]
        check: bool,
    },
    /// Print a stored record
    Show {
        /// Record file, relative to the output directory or a path
        record: String,
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: String,
    },
}

impl Cli {
    /// `--model-url` is only parsed when an Ollama backend will be built.
    fn config(&self, with_ollama: bool) -> Result<Config> {
        let mut config = Config {
            openai: OpenAiConfig {
                api_key: self.openai_api_key.clone(),
                base_url: self.openai_base_url.clone(),
                model: self.openai_model.clone(),
            },
            call_timeout: Some(self.timeout.0).filter(|t| !t.is_zero()),
            max_concurrent_calls: self.max_concurrent,
            ..Config::default()
        };
        config.ollama_cli.binary = self.ollama_binary.clone();

        if with_ollama {
            let ollama = OllamaConfig::from_model_url(&self.model_url)?;
            config.ollama_cli.model = ollama.model.clone();
            config.ollama = ollama;
        }
        Ok(config)
    }
}

fn uses_ollama(selector: &BackendSelector) -> bool {
    matches!(
        ModelRegistry::default().canonical_name(selector),
        BackendSelector::OLLAMA | BackendSelector::OLLAMA_CLI
    )
}

async fn read_transcript(source: &str) -> Result<String> {
    let text = if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(source)
            .await
            .map_err(|e| Error::Input(format!("cannot read transcript {}: {}", source, e)))?
    };

    if text.trim().is_empty() {
        return Err(Error::Input("transcript is empty".to_string()));
    }
    Ok(text)
}

fn metadata(title: &str, date: Option<&str>) -> SourceMetadata {
    let upload_date = date.and_then(|raw| {
        let parsed = parse_upload_date(raw);
        if parsed.is_none() {
            warn!("⚠️ Could not parse upload date `{}`, using Unknown_Date", raw);
        }
        parsed
    });
    SourceMetadata::new(title, upload_date)
}

async fn list_backends(config: &Config, check: bool) -> Result<()> {
    let registry = ModelRegistry::default();
    for name in registry.names() {
        let aliases = registry.aliases_of(name);
        let label = if aliases.is_empty() {
            name.to_string()
        } else {
            format!("{} (alias: {})", name, aliases.join(", "))
        };

        if !check {
            println!("  - {}", label);
            continue;
        }

        let status = match registry.resolve(&BackendSelector::new(name), config) {
            Ok(model) => match model.health_check().await {
                Ok(()) => "ok".to_string(),
                Err(e) => format!("unavailable: {}", e),
            },
            Err(e) => format!("not configured: {}", e),
        };
        println!("  - {}: {}", label, status);
    }
    Ok(())
}

async fn show_record(record: &str, output_dir: &str) -> Result<()> {
    let storage = JsonFileStorage::with_root(PathBuf::from(output_dir));
    let record = storage.load_record(record).await?;

    println!("{} ({})", record.source_title, record.source_date);
    println!("{} words, {} parts", record.full_text.split_whitespace().count(), record.partition_count());
    for (index, summary) in &record.summary_by_partition {
        println!("\n== Part {} ==", index);
        println!("Summary:\n{}", summary);
        if let Some(flags) = record.compliance_by_partition.get(index) {
            println!("Legal and ethical flags:\n{}", flags);
        }
        if let Some(posts) = record.posts_by_partition.get(index) {
            println!("Nextdoor posts:\n{}", posts);
        }
    }
    Ok(())
}

/// Runs one transcript end to end and returns the path of the saved record.
async fn process(cli: &Cli, args: &ProcessArgs) -> Result<(BackendSelector, String)> {
    let selector: BackendSelector = args.backend.parse()?;
    let mut config = cli.config(uses_ollama(&selector))?;
    config.partitions = args.parts;
    if let Some(context) = &args.context {
        config.context = context.clone();
    }

    let document = SourceDocument::new(
        metadata(&args.title, args.date.as_deref()),
        read_transcript(&args.transcript).await?,
    );
    info!(
        "🎬 \"{}\" ({}), {} words",
        document.metadata.title,
        document.metadata.date_label(),
        document.transcript.split_whitespace().count()
    );

    let model = wd_inference::create_model(&selector, &config)?;
    if args.check {
        model.health_check().await?;
        info!("🩺 {} is reachable", model.name());
    }

    let record = Pipeline::from_config(model, &config).run(&document).await?;
    let storage = wd_storage::create_storage("json", Some(&args.output_dir)).await?;
    let path = storage.store_record(&record).await?;
    Ok((selector, path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match &cli.command {
        Commands::Process(args) => {
            let (selector, path) = tokio::select! {
                outcome = process(&cli, args) => outcome?,
                _ = tokio::signal::ctrl_c() => {
                    return Err(Error::External(anyhow!("interrupted, in-flight generation calls were cancelled")));
                }
            };
            println!("Data processed successfully using {}. JSON saved to {}.", selector, path);
        }
        Commands::Backends { check } => {
            let config = cli.config(*check)?;
            println!("Available backends:");
            list_backends(&config, *check).await?;
        }
        Commands::Show { record, output_dir } => {
            show_record(record, output_dir).await?;
        }
    }

    Ok(())
}
