//! CLI for Vogue Studio.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vogue_studio::{
    GeminiModel, GeminiTransformer, Studio, StudioConfig, TransformOutcome, ViewPhase,
    STYLE_INSTRUCTION,
};

#[derive(Parser)]
#[command(name = "vogue-studio")]
#[command(about = "Restyle a portrait into a Vogue cowboy look via Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a portrait, transform it and save the result
    Transform(TransformArgs),

    /// Verify the API key and model are reachable
    Check(ConnectionArgs),

    /// Print the styling instruction sent with every portrait
    Prompt,
}

#[derive(Args)]
struct TransformArgs {
    /// Portrait to transform
    input: PathBuf,

    /// Directory the edited image is saved into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Args)]
struct ConnectionArgs {
    /// API key (defaults to GOOGLE_API_KEY, then API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Model to use
    #[arg(short, long, value_enum, default_value = "nano-banana")]
    model: ModelArg,

    /// Override the Gemini API base URL
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    NanoBanana,
    NanoBananaPro,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::NanoBanana => GeminiModel::NanoBanana,
            ModelArg::NanoBananaPro => GeminiModel::NanoBananaPro,
        }
    }
}

impl ConnectionArgs {
    fn to_config(&self) -> StudioConfig {
        let mut config = StudioConfig::from_env().with_model(self.model.into());
        if let Some(ref key) = self.api_key {
            config = config.with_api_key(key);
        }
        if let Some(ref endpoint) = self.endpoint {
            config = config.with_endpoint(endpoint);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Transform(args) => {
            transform(args, cli.json).await?;
        }
        Commands::Check(args) => {
            check(args, cli.json).await?;
        }
        Commands::Prompt => {
            println!("{STYLE_INSTRUCTION}");
        }
    }

    Ok(())
}

async fn transform(args: TransformArgs, json_output: bool) -> anyhow::Result<()> {
    let transformer = GeminiTransformer::new(args.connection.to_config());
    let model = transformer.config().model;
    let studio = Studio::new(transformer);

    if !json_output {
        let mut updates = studio.subscribe();
        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let state = updates.borrow_and_update().clone();
                if state.is_processing {
                    eprintln!("Developing film... ({model})");
                } else if state.phase == ViewPhase::Preview && state.error.is_none() {
                    eprintln!("Portrait loaded");
                }
            }
        });
    }

    studio
        .upload(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    match studio.transform().await {
        TransformOutcome::Completed => {}
        TransformOutcome::Failed(message) => anyhow::bail!("Error: {message}"),
        other => anyhow::bail!("transform did not run: {other:?}"),
    }

    tokio::fs::create_dir_all(&args.output_dir).await?;
    let path = studio.download(&args.output_dir).await?;
    let state = studio.snapshot();

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "phase": state.phase.to_string(),
            "input": args.input.display().to_string(),
            "output": path.display().to_string(),
            "model": model.as_str(),
            "transformer": studio.transformer_name(),
            "mime_type": state.edited_image.as_ref().map(|img| img.mime_type()),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Saved edited portrait: {} via {} ({})",
            path.display(),
            studio.transformer_name(),
            model
        );
    }

    Ok(())
}

async fn check(args: ConnectionArgs, json_output: bool) -> anyhow::Result<()> {
    let transformer = GeminiTransformer::new(args.to_config());
    let model = transformer.config().model;

    let result = transformer.health_check().await;

    if json_output {
        let output = serde_json::json!({
            "model": model.as_str(),
            "ok": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.user_message()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    result?;
    println!("Gemini model {model} is reachable");
    Ok(())
}
