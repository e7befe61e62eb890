use clap::Parser;
use slack_history_mail::Cli;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = slack_history_mail::commands::run_export(cli).await {
        tracing::error!(error = %e, "export aborted");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
