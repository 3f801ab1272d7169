mod cli;

use tubeproxy::{
    config,
    resolver::{VideoResolver, YoutubeResolver, YoutubeSearch},
    server::{self, AppContext},
    upstream::{HttpFetcher, MediaFetcher},
};
use tubeproxy_common::select_format;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting tubeproxy server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!(
        "Upstream limits: {} connections, {}s connect, {}s idle",
        config.upstream.max_connections,
        config.upstream.connect_timeout_secs,
        config.upstream.idle_timeout_secs
    );

    let fetcher = Arc::new(HttpFetcher::new(&config.upstream)?);
    let resolver = Arc::new(YoutubeResolver::new());
    let search = Arc::new(YoutubeSearch::new()?);

    let ctx = AppContext::new(config.clone(), resolver, fetcher, search);

    server::start_server(config, ctx).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tubeproxy=trace,tubeproxy_common=debug,tower_http=debug".to_string()
        } else {
            "tubeproxy=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Probe { id, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_video(&id, json, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("tubeproxy {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn probe_video(
    id: &str,
    json: bool,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let info = YoutubeResolver::new().resolve(id).await?;
    let Some(format) = select_format(&info.formats) else {
        anyhow::bail!(
            "No suitable format found for streaming ({} formats offered)",
            info.formats.len()
        );
    };

    let fetcher = HttpFetcher::new(&config.upstream)?;
    let probe = fetcher.fetch_head(&format.url).await?;

    if json {
        let out = serde_json::json!({
            "format": format,
            "contentLength": probe.content_length,
            "contentType": probe.content_type,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Video: {}", id);
        println!("Formats offered: {}", info.formats.len());
        println!("Selected: {}", format);
        match probe.content_length {
            Some(len) => println!("Size: {} bytes", len),
            None => println!("Size: unknown (stream would fail)"),
        }
        println!(
            "Type: {}",
            probe.content_type.as_deref().unwrap_or("unknown")
        );
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!(
                "  Static dir: {}",
                config
                    .server
                    .static_dir
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!(
                "  Upstream: {} connections, proxy {}",
                config.upstream.max_connections,
                config.upstream.proxy_url.as_deref().unwrap_or("(direct)")
            );
            println!(
                "  Search: default limit {}, max {}",
                config.search.default_limit, config.search.max_limit
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
