use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use selfpatch::cli::Cli;
use selfpatch::config::Config;
use selfpatch::llm::create_llm_provider;
use selfpatch::notify::{DiscordNotifier, LogNotifier, Notifier};
use selfpatch::pipeline::outputs::{self, CHANGELOG, COMMIT_MESSAGE};
use selfpatch::pipeline::{Pipeline, RunPaths};
use selfpatch::proposer::ChangeProposer;
use selfpatch::workspace::WorkspaceLoader;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("selfpatch=info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_cli(cli)?;

    let llm = create_llm_provider(&config.llm)?;
    let proposer = ChangeProposer::new(llm).with_max_tokens(config.llm.max_tokens);

    let notifier: Arc<dyn Notifier> = match DiscordNotifier::from_config(&config.notify) {
        Some(discord) => Arc::new(discord),
        None => {
            tracing::info!("No Discord channel configured, notifications go to the log");
            Arc::new(LogNotifier)
        }
    };

    let rng = match config.pipeline.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut pipeline = Pipeline::new(RunPaths::from(&config.pipeline), proposer, notifier, rng)
        .with_loader(WorkspaceLoader::new().with_ignore(config.pipeline.ignore.clone()))
        .with_dry_run(config.pipeline.dry_run);

    let report = pipeline.run().await?;

    let named = [
        (COMMIT_MESSAGE, report.proposal.commit_message.as_str()),
        (CHANGELOG, report.proposal.changelog.as_str()),
    ];
    match &config.pipeline.output_file {
        Some(path) => {
            outputs::write_outputs(path, &named)?;
            tracing::info!("Wrote run outputs to {}", path.display());
        }
        None => {
            for (name, value) in named {
                tracing::info!("{} = {}", name, value);
            }
        }
    }

    if report.apply.write_failures() > 0 {
        tracing::warn!(
            "{} file(s) could not be written back",
            report.apply.write_failures()
        );
    }

    Ok(())
}
