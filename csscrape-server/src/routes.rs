//! Request handling.
//!
//! A scrape does blocking network I/O, so every scrape runs on tokio's
//! blocking pool and the reactor threads only shuffle requests and replies.

use std::sync::Arc;
use std::time::{Duration, Instant};

use csscrape_common::net::Fetcher;
use csscrape_common::warning::{info, warn};
use csscrape_walker::{ScrapeError, ScrapeResult, Walker};
use serde::Deserialize;
use warp::http::StatusCode;
use warp::http::header::CONTENT_TYPE;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

/// Body of the `400` answered when the `url` parameter is missing or blank.
pub const MISSING_URL: &str = "missing `url` parameter: specify a url like ?url=example.com";

/// Body of the `500` answered when a scrape fails without a known status.
pub const SCRAPE_FAILED: &str = "error while scraping css";

/// Query string of `/api/get-css`.
#[derive(Debug, Default, Deserialize)]
pub struct CssQuery {
    /// Page to scrape. Missing is treated like blank.
    #[serde(default)]
    pub url: String,
    /// Rewrite embedded URLs to absolute form.
    #[serde(default)]
    pub absolute: bool,
}

/// Query string of `/api/get-origins`.
#[derive(Debug, Default, Deserialize)]
pub struct OriginsQuery {
    /// Page to scrape. Missing is treated like blank.
    #[serde(default)]
    pub url: String,
}

/// All routes, sharing one walker.
#[must_use]
pub fn routes<F>(
    walker: Arc<Walker<F>>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    F: Fetcher + 'static,
{
    let with_walker = warp::any().map(move || Arc::clone(&walker));

    let get_css = warp::path!("api" / "get-css")
        .and(warp::get())
        .and(warp::query::<CssQuery>())
        .and(with_walker.clone())
        .and_then(css_handler::<F>);

    let get_origins = warp::path!("api" / "get-origins")
        .and(warp::get())
        .and(warp::query::<OriginsQuery>())
        .and(with_walker)
        .and_then(origins_handler::<F>);

    let healthz = warp::path!("healthz")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({})));

    get_css.or(get_origins).or(healthz)
}

async fn css_handler<F>(query: CssQuery, walker: Arc<Walker<F>>) -> Result<Response, Rejection>
where
    F: Fetcher + 'static,
{
    let (result, elapsed) = match scrape(walker, &query.url).await {
        Ok(scraped) => scraped,
        Err(reply) => return Ok(reply),
    };

    let css = if query.absolute {
        result.absolute_css()
    } else {
        result.css()
    };

    let reply = warp::reply::with_header(css, CONTENT_TYPE, "text/css; charset=utf-8");
    let reply = warp::reply::with_header(
        reply,
        "Server-Timing",
        format!("scrape;dur={}", elapsed.as_millis()),
    );
    let reply = warp::reply::with_header(
        reply,
        "X-Skipped-Stylesheets",
        result.skipped.len().to_string(),
    );
    Ok(reply.into_response())
}

async fn origins_handler<F>(query: OriginsQuery, walker: Arc<Walker<F>>) -> Result<Response, Rejection>
where
    F: Fetcher + 'static,
{
    let (result, elapsed) = match scrape(walker, &query.url).await {
        Ok(scraped) => scraped,
        Err(reply) => return Ok(reply),
    };

    let reply = warp::reply::with_header(
        warp::reply::json(&result),
        "Server-Timing",
        format!("scrape;dur={}", elapsed.as_millis()),
    );
    Ok(reply.into_response())
}

/// Validate the url, run the scrape off the reactor, and map failures to
/// the reply the client gets.
async fn scrape<F>(
    walker: Arc<Walker<F>>,
    url: &str,
) -> Result<(ScrapeResult, Duration), Response>
where
    F: Fetcher + 'static,
{
    let url = url.trim();
    if url.is_empty() {
        return Err(plain(StatusCode::BAD_REQUEST, MISSING_URL.to_string()));
    }

    let started = Instant::now();
    let target = url.to_string();
    let joined = tokio::task::spawn_blocking(move || walker.get_css(&target)).await;
    let elapsed = started.elapsed();

    match joined {
        Ok(Ok(result)) => {
            info(
                "server",
                &format!(
                    "{url}: {} origins, {} skipped in {} ms",
                    result.origins.len(),
                    result.skipped.len(),
                    elapsed.as_millis()
                ),
            );
            Ok((result, elapsed))
        }
        Ok(Err(error)) => Err(scrape_error(url, &error)),
        Err(join_error) => {
            warn("server", &format!("{url}: scrape task failed: {join_error}"));
            Err(plain(StatusCode::INTERNAL_SERVER_ERROR, SCRAPE_FAILED.to_string()))
        }
    }
}

/// Errors that carry a status are the caller's problem and are explained;
/// anything else is ours and is not.
fn scrape_error(url: &str, error: &ScrapeError) -> Response {
    warn("server", &format!("{url}: {error}"));
    match error.status_code() {
        Some(_) => plain(StatusCode::BAD_REQUEST, error.to_string()),
        None => plain(StatusCode::INTERNAL_SERVER_ERROR, SCRAPE_FAILED.to_string()),
    }
}

fn plain(status: StatusCode, body: String) -> Response {
    warp::reply::with_status(body, status).into_response()
}
