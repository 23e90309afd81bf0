use maintainer_response::github::GitHubClient;
use maintainer_response::output::ConsoleCsvSink;
use maintainer_response::{AnalyzerSettings, AppConfig, IssueFilter, RepoAnalyzer, ReportAggregator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maintainer_response=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    config.validate()?;
    let settings = AnalyzerSettings::from_config(&config)?;

    let client = GitHubClient::new(config.github_token.clone())?;
    let login = client.verify_credentials(config.request_timeout()).await?;
    tracing::info!(
        user = %login,
        repos = config.repositories.len(),
        maintainers = config.maintainers.len(),
        cutoff = %settings.cutoff,
        "Authenticated with GitHub"
    );

    let analyzer = RepoAnalyzer::new(
        client.clone(),
        client,
        IssueFilter::new(config.maintainers.clone()),
        settings,
    );
    let aggregator = ReportAggregator::new(analyzer).skip_failed_repos(config.skip_failed_repos);
    let sink = ConsoleCsvSink::new(&config.issues_csv_path, &config.summary_csv_path);

    aggregator
        .run_and_present(&config.repositories, &sink)
        .await?;

    Ok(())
}
