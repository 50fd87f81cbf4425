//! Subcommand runners
//!
//! Each runner drives one pagination session (or the route guard) and returns
//! the rendered output; printing is left to the caller. `browse` is the
//! exception: it reads navigation keys from stdin until `q` or end of input.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::error::Result;
use crate::formatter::Formatter;
use crate::guard::{AuthSession, GuardDecision, Role, RouteGuard, User};
use crate::pagination::{InfinitePaginator, Navigation, PageBookmark, PagedPaginator, QuerySpec};
use crate::store::DocumentStore;

const BROWSE_HELP: &str = "keys: n(ext) p(revious) f(irst) r(efresh) q(uit)";

/// Open one page of `spec`.
///
/// An explicit `page` wins over the bookmark file. The bookmark file, when
/// given, is rewritten with the final position.
pub async fn run_page(
    store: Arc<dyn DocumentStore>,
    spec: QuerySpec,
    page: Option<usize>,
    bookmark: Option<&Path>,
    formatter: &Formatter,
) -> Result<String> {
    let pager = PagedPaginator::new(store, spec.clone())?;

    let saved = match bookmark {
        Some(path) if page.is_none() && path.exists() => Some(PageBookmark::load(path)?),
        _ => None,
    };

    let outcome = match (page, saved) {
        (Some(page), _) => pager.restore(&PageBookmark::capture(&spec, page)).await?,
        (None, Some(saved)) if saved.matches(&spec) => pager.restore(&saved).await?,
        (None, Some(saved)) => {
            warn!(
                "Bookmark for '{}' does not match this query, starting at the first page",
                saved.collection
            );
            pager.initialize().await?
        }
        (None, None) => pager.initialize().await?,
    };
    debug!("page: {}", outcome);

    if let Some(path) = bookmark {
        pager.bookmark().save(path)?;
    }

    formatter.format_page(&pager.view())
}

/// Load up to `batches` fetches of an infinite feed
pub async fn run_scroll(
    store: Arc<dyn DocumentStore>,
    spec: QuerySpec,
    batches: usize,
    formatter: &Formatter,
) -> Result<String> {
    let feed = InfinitePaginator::new(store, spec)?;
    feed.initialize().await?;

    for _ in 1..batches.max(1) {
        if !feed.has_more() {
            break;
        }
        let outcome = feed.load_more().await?;
        debug!("scroll: {}", outcome);
        if outcome != Navigation::Loaded {
            break;
        }
    }

    formatter.format_feed(&feed.view())
}

/// Evaluate the guard for `path` as `role`, or as an anonymous visitor
pub fn run_route(
    guard: &RouteGuard,
    path: &str,
    role: Option<Role>,
    resolving: bool,
    formatter: &Formatter,
) -> Result<String> {
    let session = match (resolving, role) {
        (true, _) => AuthSession::resolving(),
        (false, Some(role)) => AuthSession::signed_in(User::new("cli", role)),
        (false, None) => AuthSession::anonymous(),
    };

    let decision = guard.check(path, &session);
    if let GuardDecision::Redirect(to) = &decision {
        debug!("{} redirected to {}", path, to);
    }
    formatter.format_decision(path, role, &decision)
}

/// One navigation key of the browse loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseKey {
    Next,
    Previous,
    First,
    Refresh,
    Quit,
}

impl BrowseKey {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "n" | "next" => Some(BrowseKey::Next),
            "p" | "prev" | "previous" => Some(BrowseKey::Previous),
            "f" | "first" => Some(BrowseKey::First),
            "r" | "refresh" => Some(BrowseKey::Refresh),
            "q" | "quit" | "exit" => Some(BrowseKey::Quit),
            _ => None,
        }
    }

    /// Run the navigation the key stands for; `Quit` is a no-op
    pub async fn apply(self, pager: &PagedPaginator) -> Result<Option<Navigation>> {
        let outcome = match self {
            BrowseKey::Next => pager.next().await?,
            BrowseKey::Previous => pager.previous().await?,
            BrowseKey::First => pager.go_to_first_page().await?,
            BrowseKey::Refresh => pager.refresh().await?,
            BrowseKey::Quit => return Ok(None),
        };
        Ok(Some(outcome))
    }
}

/// Interactive paging over stdin
pub async fn browse(store: Arc<dyn DocumentStore>, spec: QuerySpec, formatter: &Formatter) -> Result<()> {
    let pager = PagedPaginator::new(store, spec)?;
    pager.initialize().await?;
    println!("{}", formatter.format_page(&pager.view())?);
    println!("{BROWSE_HELP}");
    prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            prompt()?;
            continue;
        }

        match BrowseKey::parse(&line) {
            None => println!("{BROWSE_HELP}"),
            Some(BrowseKey::Quit) => break,
            Some(key) => match key.apply(&pager).await {
                Ok(Some(Navigation::Loaded | Navigation::Recovered)) => {
                    println!("{}", formatter.format_page(&pager.view())?);
                }
                Ok(Some(other)) => println!("{other}"),
                Ok(None) => {}
                Err(e) => eprintln!("Error: {}", e),
            },
        }
        prompt()?;
    }

    pager.close();
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}
