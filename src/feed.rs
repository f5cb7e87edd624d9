//! Alert feed client.
//!
//! Fetches the regional Atom feed, keeps entries whose title names the target
//! region, parses each entry's embedded report into typed [`AlertItem`]s and
//! folds the ones matching an [`AlertRule`] into [`AlertFlags`].
//!
//! Failure policy: the outer feed must be reachable and well-formed, otherwise
//! the run fails with `FeedUnavailable`. A malformed embedded report skips its
//! entry and an item lacking a field skips that item; neither aborts the run.

use roxmltree::{Document, Node};
use tracing::{debug, info};

use crate::error::{FetchError, MalformedAlertItem, MalformedEntry, PipelineError};
use crate::models::{AlertFeedEntry, AlertFlags, AlertItem, AlertKind};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

// ---

/// Matching rule applied to every alert item.
///
/// An item matches when its area name contains `municipality` and its kind
/// name equals one of the two labels exactly.
#[derive(Debug, Clone)]
pub struct AlertRule {
    // ---
    pub municipality: String,
    pub dry_label: String,
    pub wind_label: String,
}

impl AlertRule {
    pub fn classify(&self, item: &AlertItem) -> Option<AlertKind> {
        // ---
        if !item.area.contains(&self.municipality) {
            return None;
        }
        if item.kind == self.dry_label {
            Some(AlertKind::Dry)
        } else if item.kind == self.wind_label {
            Some(AlertKind::Wind)
        } else {
            None
        }
    }
}

pub struct AlertFeedClient {
    http: reqwest::Client,
    feed_url: String,
    dry_label: String,
    wind_label: String,
}

impl AlertFeedClient {
    pub fn new(
        http: reqwest::Client,
        feed_url: impl Into<String>,
        dry_label: impl Into<String>,
        wind_label: impl Into<String>,
    ) -> Self {
        // ---
        AlertFeedClient {
            http,
            feed_url: feed_url.into(),
            dry_label: dry_label.into(),
            wind_label: wind_label.into(),
        }
    }

    /// Fetch the feed and report whether a drying or strong-wind alert is
    /// active for `municipality_name` in any entry about `region_name`.
    pub async fn fetch_flags(
        &self,
        region_name: &str,
        municipality_name: &str,
    ) -> Result<AlertFlags, PipelineError> {
        // ---
        let body = self
            .fetch_feed()
            .await
            .map_err(|source| PipelineError::FeedUnavailable {
                url: self.feed_url.clone(),
                source,
            })?;

        let entries = parse_feed(&body).map_err(|source| PipelineError::FeedUnavailable {
            url: self.feed_url.clone(),
            source,
        })?;

        let rule = AlertRule {
            municipality: municipality_name.to_string(),
            dry_label: self.dry_label.clone(),
            wind_label: self.wind_label.clone(),
        };
        let flags = collect_flags(&entries, region_name, &rule);

        info!(
            "Alert feed: {} entries, dry={} wind={}",
            entries.len(),
            flags.dry,
            flags.wind
        );
        Ok(flags)
    }

    async fn fetch_feed(&self) -> Result<String, FetchError> {
        // ---
        debug!("Fetching alert feed from: {}", self.feed_url);

        let bytes = self
            .http
            .get(&self.feed_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let (text, _) = encoding_rs::UTF_8.decode_with_bom_removal(&bytes);
        Ok(text.into_owned())
    }
}

/// Fold the flags of every entry about `region_name` into one pair.
pub fn collect_flags(entries: &[AlertFeedEntry], region_name: &str, rule: &AlertRule) -> AlertFlags {
    // ---
    let mut flags = AlertFlags::default();

    for entry in entries.iter().filter(|e| e.title.contains(region_name)) {
        let Some(content) = entry.content.as_deref().filter(|c| !c.trim().is_empty()) else {
            debug!("Entry '{}' has no embedded report, skipping", entry.title);
            continue;
        };

        let items = match parse_report(&entry.title, content) {
            Ok(items) => items,
            Err(e) => {
                debug!("{}", e);
                continue;
            }
        };

        for item in items {
            match item {
                Ok(item) => {
                    if let Some(kind) = rule.classify(&item) {
                        debug!("Matched {:?} alert '{}' in '{}'", kind, item.kind, item.area);
                        flags.raise(kind);
                    }
                }
                Err(e) => debug!("Skipping item in '{}': {}", entry.title, e),
            }
        }
    }

    flags
}

/// Parse the outer Atom feed into its entries.
pub fn parse_feed(xml: &str) -> Result<Vec<AlertFeedEntry>, FetchError> {
    // ---
    let doc = Document::parse(xml)?;

    let entries = doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name((ATOM_NS, "entry")))
        .map(|entry| AlertFeedEntry {
            title: child_text(entry, (ATOM_NS, "title")).unwrap_or_default(),
            content: child_text(entry, (ATOM_NS, "content")),
        })
        .collect();

    Ok(entries)
}

/// Parse an embedded report into one result per `Item` element.
///
/// Elements are matched by local name so namespaced and plain reports are read
/// the same way.
pub fn parse_report(
    title: &str,
    xml: &str,
) -> Result<Vec<Result<AlertItem, MalformedAlertItem>>, MalformedEntry> {
    // ---
    let doc = Document::parse(xml).map_err(|source| MalformedEntry {
        title: title.to_string(),
        source,
    })?;

    let items = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Item")
        .map(extract_item)
        .collect();

    Ok(items)
}

fn extract_item(item: Node<'_, '_>) -> Result<AlertItem, MalformedAlertItem> {
    // ---
    let area = path_text(item, &["Area", "Name"]).ok_or(MalformedAlertItem::MissingArea)?;
    let kind = path_text(item, &["Kind", "Name"]).ok_or(MalformedAlertItem::MissingKind)?;

    Ok(AlertItem { area, kind })
}

/// Text of the first element reached by following `path` by local name.
fn path_text(node: Node<'_, '_>, path: &[&str]) -> Option<String> {
    // ---
    let mut current = node;
    for name in path {
        current = current
            .children()
            .find(|c| c.is_element() && c.tag_name().name() == *name)?;
    }
    current.text().map(|t| t.trim().to_string())
}

fn child_text(node: Node<'_, '_>, name: (&str, &str)) -> Option<String> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .and_then(|c| c.text())
        .map(str::to_string)
}
