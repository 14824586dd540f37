use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use recipe_relay::config::{Cli, Config};
use recipe_relay::server::recipe_api::{build_router, AppState};
use recipe_relay::upstream::anthropic::AnthropicProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "recipe_relay=debug,tower_http=debug"
    } else {
        "recipe_relay=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("recipe-relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }

    info!(
        route = config.server.route,
        model = config.upstream.model,
        max_tokens = config.upstream.max_tokens,
        output_format = %config.recipes.output_format,
        warmup = config.recipes.warmup_fragment.is_some(),
        "Configuration loaded"
    );

    // Read the API key once; requests fail with 500 while it is missing.
    let credential = config.credential_from_env();
    if credential.is_none() {
        warn!(
            env = config.upstream.credential_env,
            "API key not set, recipe requests will be rejected"
        );
    }

    let provider = Arc::new(AnthropicProvider::from_config(&config.upstream));
    let listen_addr = config.server.listen.clone();

    // Build application state.
    let state = Arc::new(AppState::new(Arc::new(config), provider, credential));

    // Build the HTTP router.
    let app = build_router(state);

    // Start the server.
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
