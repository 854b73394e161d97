use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use windplay::app::coordinator::{GenerationOutcome, GenerationResponse};
use windplay::app::dispatch;
use windplay::app::playground::Playground;
use windplay::app::session::SessionStore;
use windplay::app::validation;
use windplay::domain::model::GenerationTarget;
use windplay::infra::config::{self, Config, DeploymentMode, EnvOverrides};
use windplay::infra::generation::HttpGenerationClient;
use windplay::infra::logging;
use windplay::infra::schema::SchemaValidator;
use windplay::ui::app::{AppOptions, UiApp};

#[derive(Debug, Parser)]
#[command(
    name = "windplay",
    version,
    about = "Edit a windfile and preview the generated CI pipelines",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Windfile to edit. Without it the last saved session (or the sample) is loaded.
    file: Option<PathBuf>,

    #[command(flatten)]
    generation: GenerationArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Args)]
struct GenerationArgs {
    /// Initial generation target.
    #[arg(long, short, value_enum)]
    target: Option<GenerationTarget>,

    /// Deployment mode selecting the generation endpoint.
    #[arg(long, value_enum)]
    mode: Option<DeploymentMode>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a windfile, generate once, and print the result.
    Generate {
        file: PathBuf,
        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Print shell completions.
    Completions { shell: Shell },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Generate { file, generation }) => {
            logging::init_stderr();
            generate(file, generation).await
        }
        Some(Command::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "windplay", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        None => {
            let root = config::workspace_root()?;
            logging::init_file(&SessionStore::new(&root).state_dir())?;
            let options = AppOptions {
                file: cli.file,
                target: cli.generation.target,
                mode: cli.generation.mode,
            };
            let mut app = UiApp::bootstrap(options, root).await?;
            app.run().await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn generate(file: PathBuf, args: GenerationArgs) -> Result<ExitCode> {
    let config = Config::load()?;
    let text = fs::read_to_string(&file)
        .with_context(|| format!("failed to read windfile {}", file.display()))?;
    let target = args.target.unwrap_or(config.defaults.target);
    let mode = DeploymentMode::resolve(args.mode, EnvOverrides::from_env().mode());
    let endpoint = config.endpoint.resolve(mode);
    let timeout = config.endpoint.timeout();

    let validator = SchemaValidator::load(&config.schema, timeout).await?;
    let markers = validator.validate(&text);
    if !validation::is_valid(&markers) {
        for marker in &markers {
            eprintln!(
                "{}:{}:{}: {}: {}",
                file.display(),
                marker.position.line,
                marker.position.column,
                marker.severity.label(),
                marker.message
            );
        }
        return Ok(ExitCode::FAILURE);
    }

    let client = HttpGenerationClient::new(&endpoint, timeout)?;
    let mut playground = Playground::new(text, target);
    let request = playground
        .validate(markers)
        .ok_or_else(|| anyhow!("no generation request for a valid windfile"))?;
    tracing::info!(url = %client.url_for(target), "requesting generation");

    let outcome = dispatch::execute(&client, &request).await;
    if let GenerationOutcome::Failed(reason) = &outcome {
        eprintln!("generation failed: {reason}");
        return Ok(ExitCode::FAILURE);
    }
    playground.apply(GenerationResponse::new(request.id, outcome));
    println!("{}", playground.selected_tab().body);
    Ok(ExitCode::SUCCESS)
}
