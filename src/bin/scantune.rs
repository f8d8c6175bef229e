use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    use scantune::util::cli::*;

    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scantune=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = Options::parse();
    if let Err(e) = run_cli_action(opts).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
