//! csscrape server
//!
//! Run with: cargo run --bin csscrape-server -- --port 3000
//!
//! Then: curl 'http://localhost:3000/api/get-css?url=example.com'

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use csscrape_common::net::{DEFAULT_USER_AGENT, FetchConfig, HttpFetcher};
use csscrape_common::warning::info;
use csscrape_server::routes;
use csscrape_walker::{WalkLimits, Walker};

/// csscrape - serve the CSS of any page, in cascade order
#[derive(Parser, Debug)]
#[command(name = "csscrape-server")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Serve on localhost:3000
    csscrape-server

    # Listen on every interface with a short timeout
    csscrape-server --host 0.0.0.0 --port 8080 --timeout 5

    # Follow at most two levels of @import
    csscrape-server --max-depth 2
"#)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Per-request fetch timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 10)]
    timeout: u64,

    /// Deepest stylesheet nesting to follow
    #[arg(long, default_value_t = WalkLimits::default().max_depth)]
    max_depth: usize,

    /// Most stylesheets fetched per scrape
    #[arg(long, default_value_t = WalkLimits::default().max_fetches)]
    max_fetches: usize,

    /// Most stylesheet fetches in flight per scrape
    #[arg(long, default_value_t = WalkLimits::default().max_concurrency)]
    max_concurrency: usize,

    /// User-Agent header sent upstream
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = FetchConfig {
        timeout: Duration::from_secs(cli.timeout),
        user_agent: cli.user_agent,
        ..FetchConfig::default()
    };
    // The blocking client owns its own runtime and must be built outside ours.
    let fetcher = HttpFetcher::new(&config).context("failed to build the HTTP client")?;
    let limits = WalkLimits {
        max_depth: cli.max_depth,
        max_fetches: cli.max_fetches,
        max_concurrency: cli.max_concurrency.max(1),
    };
    let walker = Arc::new(Walker::with_limits(fetcher, limits));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let address = SocketAddr::new(cli.host, cli.port);
    info("server", &format!("listening on http://{address}"));
    runtime.block_on(warp::serve(routes(walker)).run(address));

    Ok(())
}
