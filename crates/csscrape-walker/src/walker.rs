//! The stylesheet walk.
//!
//! A scrape proceeds level by level. Every reference discovered while
//! settling one level is claimed on the calling thread in discovery order,
//! then the whole next level is fetched by a pool of scoped workers. Fetched
//! bodies are attached to a discovery tree that is flattened in pre-order at
//! the end, so the order fetches complete in never shows up in the result.

use std::collections::HashSet;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use csscrape_common::net::{DataUrl, FetchError, FetchedResource, Fetcher};
use csscrape_common::url::{resolve, resolve_against};
use csscrape_common::warning::WarningLog;
use csscrape_css::imports::extract_imports;
use csscrape_css::origin::{
    CssOrigin, FileOrigin, ImportOrigin, InlineOrigin, LinkResource, LocalFileOrigin, OriginKind,
    StyleOrigin,
};
use url::Url;

use crate::document::{DocumentStyle, scan_document};
use crate::error::ScrapeError;
use crate::result::{ScrapeResult, SkipReason, SkippedReference};

/// Bounds on the work one scrape may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimits {
    /// Deepest stylesheet nesting followed. A `<link>` is depth 1 and each
    /// `@import` adds one.
    pub max_depth: usize,
    /// Most stylesheets fetched per scrape, not counting the root document
    /// or `data:` URLs.
    pub max_fetches: usize,
    /// Most fetches in flight at once.
    pub max_concurrency: usize,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_fetches: 200,
            max_concurrency: 8,
        }
    }
}

/// What to scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeRequest {
    /// The page or stylesheet URL, possibly partial (`example.com`).
    pub url: String,
    /// CSS the caller already has. Emitted ahead of everything found on the
    /// page; its `@import`s resolve against the page URL.
    pub local_files: Vec<LocalFileOrigin>,
}

impl ScrapeRequest {
    /// A request for `url` with no local files.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            local_files: Vec::new(),
        }
    }

    /// Add a caller-supplied stylesheet.
    #[must_use]
    pub fn with_local_file(mut self, name: impl Into<String>, css: impl Into<String>) -> Self {
        self.local_files.push(LocalFileOrigin {
            name: name.into(),
            css: css.into(),
        });
        self
    }
}

/// Collects the CSS of a page through a [`Fetcher`].
#[derive(Debug, Clone)]
pub struct Walker<F> {
    fetcher: F,
    limits: WalkLimits,
}

impl<F: Fetcher> Walker<F> {
    /// A walker with the default [`WalkLimits`].
    #[must_use]
    pub fn new(fetcher: F) -> Self {
        Self::with_limits(fetcher, WalkLimits::default())
    }

    /// A walker with explicit limits.
    #[must_use]
    pub const fn with_limits(fetcher: F, limits: WalkLimits) -> Self {
        Self { fetcher, limits }
    }

    /// The limits this walker applies.
    #[must_use]
    pub const fn limits(&self) -> &WalkLimits {
        &self.limits
    }

    /// Scrape every stylesheet reachable from `root_url`.
    ///
    /// # Errors
    ///
    /// See [`Walker::scrape`].
    pub fn get_css(&self, root_url: &str) -> Result<ScrapeResult, ScrapeError> {
        self.scrape(ScrapeRequest::new(root_url))
    }

    /// Scrape every stylesheet reachable from the request's root URL.
    ///
    /// Failures of individual stylesheets are recorded in
    /// [`ScrapeResult::skipped`] and never abort the scrape.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::InvalidRootUrl`] if the URL does not resolve
    /// - [`ScrapeError::RootFetch`] if the root document cannot be fetched
    /// - [`ScrapeError::RootParse`] if it is neither HTML nor CSS
    pub fn scrape(&self, request: ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
        let ScrapeRequest { url, local_files } = request;

        // STEP 1: Resolve the root URL.
        let Some(root_url) = resolve(&url, None) else {
            return Err(ScrapeError::InvalidRootUrl { input: url });
        };

        // STEP 2: Fetch and classify the root.
        let mut walk = Walk::new(self.limits);
        let _ = walk.claimed.insert(claim_key(&root_url));
        let root = self
            .fetch_one(&root_url)
            .map_err(ScrapeError::RootFetch)?;
        let page_url = root.url.clone();
        // A redirected root is also known by its final URL.
        let _ = walk.claimed.insert(claim_key(&page_url));
        let kind = classify_root(&root);
        if let RootKind::Unsupported(content_type) = &kind {
            return Err(ScrapeError::RootParse {
                url: page_url,
                content_type: content_type.clone(),
            });
        }

        // STEP 3: Caller-supplied CSS comes first.
        let mut level = Vec::new();
        for local in local_files {
            let node = walk.add_node(Walk::ROOT);
            walk.expand_imports(node, 1, &local.css, &page_url, &mut level);
            walk.set_origin(node, CssOrigin::LocalFile(local));
        }

        // STEP 4: The root itself.
        match kind {
            RootKind::Stylesheet => {
                let node = walk.add_node(Walk::ROOT);
                walk.expand_imports(node, 1, &root.body, &page_url, &mut level);
                walk.set_origin(
                    node,
                    CssOrigin::File(FileOrigin {
                        href: page_url,
                        css: root.body,
                    }),
                );
            }
            RootKind::Document => walk.scan_page(&root.body, &page_url, &mut level),
            RootKind::Unsupported(_) => {}
        }

        // STEP 5: Fetch level by level until nothing new is discovered.
        while !level.is_empty() {
            let outcomes = self.fetch_level(&level);
            let mut next = Vec::new();
            for (job, outcome) in level.into_iter().zip(outcomes) {
                walk.settle(job, outcome, &mut next);
            }
            level = next;
        }

        Ok(walk.finish())
    }

    /// Fetch every job of a level on at most `max_concurrency` scoped
    /// workers. Each worker takes the next unstarted job as soon as it is
    /// free, so one slow stylesheet only ever occupies one slot. Outcomes
    /// line up with `jobs`.
    fn fetch_level(&self, jobs: &[Job]) -> Vec<Result<FetchedResource, FetchError>> {
        let next_job = &AtomicUsize::new(0);
        let workers = self.limits.max_concurrency.clamp(1, jobs.len().max(1));
        let mut outcomes: Vec<Option<Result<FetchedResource, FetchError>>> =
            jobs.iter().map(|_| None).collect();

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut fetched = Vec::new();
                        loop {
                            let index = next_job.fetch_add(1, Ordering::Relaxed);
                            let Some(job) = jobs.get(index) else {
                                break;
                            };
                            fetched.push((index, self.fetch_one(job.target.url())));
                        }
                        fetched
                    })
                })
                .collect();

            for handle in handles {
                // A panicked worker loses its outcomes; those jobs are
                // reported as failed below.
                if let Ok(fetched) = handle.join() {
                    for (index, outcome) in fetched {
                        outcomes[index] = Some(outcome);
                    }
                }
            }
        });

        outcomes
            .into_iter()
            .zip(jobs)
            .map(|(outcome, job)| {
                outcome.unwrap_or_else(|| {
                    Err(FetchError::Network {
                        url: job.target.url().clone(),
                        message: "fetch thread panicked".to_string(),
                    })
                })
            })
            .collect()
    }

    fn fetch_one(&self, url: &Url) -> Result<FetchedResource, FetchError> {
        if url.scheme() == "data" {
            DataUrl::fetch(url)
        } else {
            self.fetcher.fetch(url)
        }
    }
}

/// How the root response is treated.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RootKind {
    Document,
    Stylesheet,
    Unsupported(String),
}

/// [§ 3.2 Response](https://mimesniff.spec.whatwg.org/#understanding-mime-types)
///
/// `text/css` is a stylesheet. A missing or generic content type falls back
/// to the path extension. HTML, XHTML and other text is parsed as a
/// document.
fn classify_root(resource: &FetchedResource) -> RootKind {
    match resource.mime_essence().as_deref() {
        Some("text/css") => RootKind::Stylesheet,
        None | Some("application/octet-stream") => {
            if has_css_extension(&resource.url) {
                RootKind::Stylesheet
            } else {
                RootKind::Document
            }
        }
        Some("application/xhtml+xml") => RootKind::Document,
        Some(mime) if mime.starts_with("text/") => RootKind::Document,
        Some(mime) => RootKind::Unsupported(mime.to_string()),
    }
}

fn has_css_extension(url: &Url) -> bool {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .is_some_and(|(_, extension)| extension.eq_ignore_ascii_case("css"))
}

/// Servers answer missing stylesheets with HTML error pages more often than
/// with a 404. Such bodies are not CSS.
fn check_stylesheet(resource: &FetchedResource) -> Result<(), String> {
    if let Some(mime) = resource.mime_essence() {
        if mime == "text/html" || mime == "application/xhtml+xml" {
            return Err(format!("expected a stylesheet but got `{mime}`"));
        }
    }

    let head = resource
        .body
        .trim_start()
        .chars()
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return Err("expected a stylesheet but got an HTML document".to_string());
    }

    Ok(())
}

/// The key a URL is claimed under. Fragments never change what is fetched.
fn claim_key(url: &Url) -> Url {
    let mut key = url.clone();
    key.set_fragment(None);
    key
}

/// A stylesheet waiting to be fetched.
#[derive(Debug, Clone)]
enum Target {
    Link(LinkResource),
    Import { href: String, url: Url },
}

impl Target {
    const fn url(&self) -> &Url {
        match self {
            Self::Link(link) => &link.url,
            Self::Import { url, .. } => url,
        }
    }

    const fn kind(&self) -> OriginKind {
        match self {
            Self::Link(_) => OriginKind::Link,
            Self::Import { .. } => OriginKind::Import,
        }
    }

    fn into_origin(self, css: String) -> CssOrigin {
        match self {
            Self::Link(link) => link.with_css(css).into(),
            Self::Import { href, url } => ImportOrigin { href, css, url }.into(),
        }
    }

    fn into_skipped(self, reason: SkipReason) -> SkippedReference {
        let kind = self.kind();
        match self {
            Self::Link(link) => SkippedReference {
                kind,
                href: link.href,
                url: Some(link.url),
                reason,
            },
            Self::Import { href, url } => SkippedReference {
                kind,
                href,
                url: Some(url),
                reason,
            },
        }
    }
}

/// A claimed target and the tree node its origin will fill.
#[derive(Debug, Clone)]
struct Job {
    node: usize,
    depth: usize,
    target: Target,
}

/// A slot in the discovery tree. Skipped fetches leave `origin` empty.
#[derive(Debug, Default)]
struct Node {
    origin: Option<CssOrigin>,
    children: Vec<usize>,
}

/// Per-scrape state. Owned by the calling thread for the whole scrape.
#[derive(Debug)]
struct Walk {
    limits: WalkLimits,
    nodes: Vec<Node>,
    claimed: HashSet<Url>,
    fetches: usize,
    skipped: Vec<SkippedReference>,
    warnings: WarningLog,
}

impl Walk {
    const ROOT: usize = 0;

    fn new(limits: WalkLimits) -> Self {
        Self {
            limits,
            nodes: vec![Node::default()],
            claimed: HashSet::new(),
            fetches: 0,
            skipped: Vec::new(),
            warnings: WarningLog::new(),
        }
    }

    fn add_node(&mut self, parent: usize) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node::default());
        self.nodes[parent].children.push(index);
        index
    }

    fn set_origin(&mut self, node: usize, origin: CssOrigin) {
        self.nodes[node].origin = Some(origin);
    }

    /// Emit the page's in-document CSS and claim its links, in document
    /// order.
    fn scan_page(&mut self, html: &str, page_url: &Url, level: &mut Vec<Job>) {
        let scanned = scan_document(html, page_url);

        for style in scanned.styles {
            match style {
                DocumentStyle::Link { href, media, rel } => {
                    let Some(url) = self.resolve_or_skip(OriginKind::Link, &href, &scanned.base_url)
                    else {
                        continue;
                    };
                    let link = LinkResource {
                        href,
                        url,
                        media,
                        rel,
                    };
                    self.claim(Self::ROOT, 1, Target::Link(link), level);
                }
                DocumentStyle::Style(css) => {
                    let node = self.add_node(Self::ROOT);
                    self.expand_imports(node, 1, &css, &scanned.base_url, level);
                    self.set_origin(
                        node,
                        CssOrigin::Style(StyleOrigin {
                            css,
                            url: scanned.base_url.clone(),
                        }),
                    );
                }
                DocumentStyle::Inline(css) => {
                    let node = self.add_node(Self::ROOT);
                    self.set_origin(
                        node,
                        CssOrigin::Inline(InlineOrigin {
                            css,
                            url: scanned.base_url.clone(),
                        }),
                    );
                }
            }
        }
    }

    /// Claim every top-level `@import` of `css` as a child of `parent`.
    fn expand_imports(
        &mut self,
        parent: usize,
        depth: usize,
        css: &str,
        base: &Url,
        level: &mut Vec<Job>,
    ) {
        for rule in extract_imports(css) {
            let Some(url) = self.resolve_or_skip(OriginKind::Import, &rule.href, base) else {
                continue;
            };
            let target = Target::Import {
                href: rule.href,
                url,
            };
            self.claim(parent, depth, target, level);
        }
    }

    fn resolve_or_skip(&mut self, kind: OriginKind, href: &str, base: &Url) -> Option<Url> {
        let url = resolve_against(href, base);
        if url.is_none() {
            self.skip(SkippedReference {
                kind,
                href: href.to_string(),
                url: None,
                reason: SkipReason::UnresolvableUrl,
            });
        }
        url
    }

    /// Schedule `target` for the next level unless it was seen before or a
    /// limit stops it. Repeats are dropped silently.
    fn claim(&mut self, parent: usize, depth: usize, target: Target, level: &mut Vec<Job>) {
        if !self.claimed.insert(claim_key(target.url())) {
            return;
        }

        if depth > self.limits.max_depth {
            let limit = self.limits.max_depth;
            self.skip(target.into_skipped(SkipReason::DepthLimit { limit }));
            return;
        }

        if target.url().scheme() != "data" {
            if self.fetches >= self.limits.max_fetches {
                let limit = self.limits.max_fetches;
                self.skip(target.into_skipped(SkipReason::FetchLimit { limit }));
                return;
            }
            self.fetches += 1;
        }

        let node = self.add_node(parent);
        level.push(Job {
            node,
            depth,
            target,
        });
    }

    /// Record a fetch outcome and claim the imports it contains.
    fn settle(
        &mut self,
        job: Job,
        outcome: Result<FetchedResource, FetchError>,
        next: &mut Vec<Job>,
    ) {
        let resource = match outcome {
            Ok(resource) => resource,
            Err(error) => {
                self.skip(job.target.into_skipped(SkipReason::Fetch { error }));
                return;
            }
        };

        if let Err(message) = check_stylesheet(&resource) {
            self.skip(job.target.into_skipped(SkipReason::Parse { message }));
            return;
        }

        // Imports resolve against where the stylesheet actually came from.
        self.expand_imports(job.node, job.depth + 1, &resource.body, &resource.url, next);
        self.set_origin(job.node, job.target.into_origin(resource.body));
    }

    fn skip(&mut self, skipped: SkippedReference) {
        let location = skipped
            .url
            .as_ref()
            .map_or(skipped.href.as_str(), Url::as_str);
        let message = format!("skipping {} {location}: {}", skipped.kind, skipped.reason);
        let _ = self.warnings.warn_once("walker", &message);
        self.skipped.push(skipped);
    }

    /// Flatten the discovery tree in pre-order.
    fn finish(mut self) -> ScrapeResult {
        let mut origins = Vec::new();
        let mut stack = vec![Self::ROOT];

        while let Some(index) = stack.pop() {
            let node = &mut self.nodes[index];
            if let Some(origin) = node.origin.take() {
                origins.push(origin);
            }
            let children = mem::take(&mut node.children);
            stack.extend(children.into_iter().rev());
        }

        ScrapeResult {
            origins,
            skipped: self.skipped,
        }
    }
}
