//! Line matcher: turns one query log line into a [`ParsedQuery`].
//!
//! Processing order for a line:
//!
//! 1. Apply the pattern. No match yields an empty, unmatched result; most
//!    lines of a mixed BIND log are not queries, so this is the common case.
//! 2. Lowercase the queried name.
//! 3. Apply the name filter.
//! 4. Optionally replace the client address with its reverse-resolved name.
//! 5. Apply the client filter to the (possibly resolved) client.
//!
//! Name filtering runs before enrichment so discarded lines never cost a
//! lookup. Client filtering runs after it because client lists are written
//! in terms of resolved names when enrichment is on.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::error::ConfigError;
use crate::filter::FilterSet;
use crate::resolve::ReverseResolver;
use crate::types::ParsedQuery;

/// Matches BIND's query log format, e.g.
/// `client @0xadfc0030 192.168.0.123#59542 (bitnebula.com): query: bitnebula.com IN A + (192.168.0.456)`.
pub const DEFAULT_PATTERN: &str = r"client(?: @0x[0-9a-f]+)? ([^\s#]+).*query: ([^\s]+).*IN ([^\s]+)";

/// A validated query pattern: exactly three capture groups, in order client,
/// queried name, query type.
#[derive(Debug, Clone)]
pub struct QueryPattern(Regex);

impl QueryPattern {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern)?;
        // captures_len counts the implicit whole-match group
        let groups = regex.captures_len() - 1;
        if groups != 3 {
            return Err(ConfigError::CaptureGroups(groups));
        }
        Ok(Self(regex))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for QueryPattern {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN).expect("default query pattern must compile with three groups")
    }
}

/// Reverse-lookup settings for client enrichment.
#[derive(Clone)]
struct Enrichment {
    resolver: Arc<dyn ReverseResolver>,
    timeout: Duration,
}

impl Enrichment {
    async fn resolve(&self, client: &str) -> Option<String> {
        let addr: IpAddr = client.parse().ok()?;
        match tokio::time::timeout(self.timeout, self.resolver.reverse(addr)).await {
            Ok(Some(name)) => {
                let name = name.strip_suffix('.').unwrap_or(&name);
                (!name.is_empty()).then(|| name.to_string())
            }
            Ok(None) => None,
            Err(_) => {
                tracing::debug!(client, timeout_ms = self.timeout.as_millis() as u64, "reverse lookup timed out");
                None
            }
        }
    }
}

/// Pattern, filters and optional enrichment for one aggregator.
#[derive(Clone)]
pub struct LineMatcher {
    pattern: QueryPattern,
    filters: FilterSet,
    enrichment: Option<Enrichment>,
}

impl LineMatcher {
    pub fn new(pattern: QueryPattern) -> Self {
        Self {
            pattern,
            filters: FilterSet::default(),
            enrichment: None,
        }
    }

    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    /// Enable client enrichment; each lookup is abandoned after `timeout`.
    pub fn with_reverse_lookup(mut self, resolver: Arc<dyn ReverseResolver>, timeout: Duration) -> Self {
        self.enrichment = Some(Enrichment { resolver, timeout });
        self
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn reverse_lookup_enabled(&self) -> bool {
        self.enrichment.is_some()
    }

    /// Pattern, name normalization and the name filter. Never
    /// performs a lookup.
    pub fn capture(&self, line: &str) -> ParsedQuery {
        let Some(caps) = self.pattern.0.captures(line) else {
            return ParsedQuery::default();
        };
        let group = |i| caps.get(i).map_or("", |m| m.as_str());

        let query = ParsedQuery {
            matched: true,
            client: group(1).to_string(),
            query_name: group(2).to_lowercase(),
            query_type: group(3).to_string(),
        };

        if !self.filters.names.permits(&query.query_name) {
            return ParsedQuery { matched: false, ..query };
        }
        query
    }

    /// Full extraction, including enrichment and the client filter.
    pub async fn extract(&self, line: &str) -> ParsedQuery {
        let mut query = self.capture(line);
        if !query.matched {
            return query;
        }

        if let Some(enrichment) = &self.enrichment {
            if let Some(name) = enrichment.resolve(&query.client).await {
                query.client = name;
            }
        }

        if !self.filters.clients.permits(&query.client) {
            query.matched = false;
        }
        query
    }
}

impl Default for LineMatcher {
    fn default() -> Self {
        Self::new(QueryPattern::default())
    }
}

impl std::fmt::Debug for LineMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineMatcher")
            .field("pattern", &self.pattern.as_str())
            .field("filters", &self.filters)
            .field("reverse_lookup", &self.reverse_lookup_enabled())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, Normalization};
    use futures::future::BoxFuture;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    const SAMPLE: &str = "05-Jun-2021 07:24:47.780 queries: info: client @0xadfc0030 192.168.0.123#59542 (bitnebula.com): query: bitnebula.com IN A + (192.168.0.456)";

    struct Answer(Option<&'static str>);

    impl ReverseResolver for Answer {
        fn reverse(&self, _addr: IpAddr) -> BoxFuture<'_, Option<String>> {
            Box::pin(async move { self.0.map(str::to_string) })
        }
    }

    struct Hang;

    impl ReverseResolver for Hang {
        fn reverse(&self, _addr: IpAddr) -> BoxFuture<'_, Option<String>> {
            Box::pin(futures::future::pending())
        }
    }

    fn names(include: &[&str], exclude: &[&str]) -> FilterSet {
        FilterSet::new(
            Filter::new(include.iter().copied(), exclude.iter().copied(), Normalization::Lowercase),
            Filter::default(),
        )
    }

    fn clients(include: &[&str], exclude: &[&str]) -> FilterSet {
        FilterSet::new(
            Filter::default(),
            Filter::new(include.iter().copied(), exclude.iter().copied(), Normalization::Verbatim),
        )
    }

    #[tokio::test]
    async fn sample_line_extracts_all_fields() {
        let query = LineMatcher::default().extract(SAMPLE).await;
        assert_eq!(
            query,
            ParsedQuery {
                matched: true,
                client: "192.168.0.123".into(),
                query_name: "bitnebula.com".into(),
                query_type: "A".into(),
            }
        );
    }

    #[test]
    fn line_without_hex_annotation_matches() {
        let line = "22-Mar-2020 14:54:27.568 queries: info: client 192.168.0.1#63519 (www.google.com): query: www.google.com IN AAAA + (192.168.0.100)";
        let query = LineMatcher::default().capture(line);
        assert!(query.matched);
        assert_eq!(query.client, "192.168.0.1");
        assert_eq!(query.query_type, "AAAA");
    }

    #[rstest]
    #[case("05-Jun-2021 07:24:47.780 general: info: zone example.com/IN: loaded serial 42")]
    #[case("client @0xadfc0030 192.168.0.123#59542 (bitnebula.com): bitnebula.com IN A")]
    #[case("")]
    fn non_query_lines_do_not_match(#[case] line: &str) {
        assert_eq!(LineMatcher::default().capture(line), ParsedQuery::default());
    }

    #[test]
    fn mixed_case_names_are_lowercased() {
        let line = SAMPLE.replace("query: bitnebula.com", "query: BitNebula.COM");
        assert_eq!(LineMatcher::default().capture(&line).query_name, "bitnebula.com");
    }

    #[test]
    fn include_set_rejects_absent_names() {
        let matcher = LineMatcher::default().with_filters(names(&["example.com"], &[]));
        assert!(!matcher.capture(SAMPLE).matched);
    }

    #[test]
    fn include_set_is_case_insensitive() {
        let matcher = LineMatcher::default().with_filters(names(&["BITNEBULA.com"], &[]));
        assert!(matcher.capture(SAMPLE).matched);
    }

    #[test]
    fn exclude_set_rejects_present_names_even_when_included() {
        let matcher = LineMatcher::default().with_filters(names(&["bitnebula.com"], &["bitnebula.com"]));
        assert!(!matcher.capture(SAMPLE).matched);
    }

    #[test]
    fn exclude_set_passes_other_names() {
        let matcher = LineMatcher::default().with_filters(names(&[], &["example.com"]));
        assert!(matcher.capture(SAMPLE).matched);
    }

    #[tokio::test]
    async fn enrichment_replaces_client_and_strips_trailing_dot() {
        let matcher = LineMatcher::default()
            .with_reverse_lookup(Arc::new(Answer(Some("desk.lan."))), Duration::from_secs(1));
        let query = matcher.extract(SAMPLE).await;
        assert!(query.matched);
        assert_eq!(query.client, "desk.lan");
    }

    #[tokio::test]
    async fn failed_enrichment_keeps_address() {
        let matcher =
            LineMatcher::default().with_reverse_lookup(Arc::new(Answer(None)), Duration::from_secs(1));
        let query = matcher.extract(SAMPLE).await;
        assert!(query.matched);
        assert_eq!(query.client, "192.168.0.123");
    }

    #[tokio::test(start_paused = true)]
    async fn enrichment_timeout_keeps_address() {
        let matcher = LineMatcher::default().with_reverse_lookup(Arc::new(Hang), Duration::from_millis(50));
        let query = matcher.extract(SAMPLE).await;
        assert!(query.matched);
        assert_eq!(query.client, "192.168.0.123");
    }

    #[tokio::test]
    async fn client_filter_sees_resolved_name() {
        let matcher = LineMatcher::default()
            .with_filters(clients(&[], &["desk.lan"]))
            .with_reverse_lookup(Arc::new(Answer(Some("desk.lan."))), Duration::from_secs(1));
        assert!(!matcher.extract(SAMPLE).await.matched);
    }

    #[tokio::test]
    async fn client_include_is_exact() {
        let matcher = LineMatcher::default().with_filters(clients(&["192.168.0.123"], &[]));
        assert!(matcher.extract(SAMPLE).await.matched);

        let matcher = LineMatcher::default().with_filters(clients(&["192.168.0.12"], &[]));
        assert!(!matcher.extract(SAMPLE).await.matched);
    }

    #[rstest]
    #[case(r"client ([^\s#]+).*query: ([^\s]+)", 2)]
    #[case(r"(a)(b)(c)(d)", 4)]
    #[case(r"no groups", 0)]
    fn wrong_group_count_is_rejected(#[case] pattern: &str, #[case] found: usize) {
        assert!(matches!(QueryPattern::new(pattern), Err(ConfigError::CaptureGroups(n)) if n == found));
    }

    #[test]
    fn unparsable_pattern_is_rejected() {
        assert!(matches!(QueryPattern::new("client ([^"), Err(ConfigError::InvalidPattern(_))));
    }

    proptest! {
        #[test]
        fn matched_names_are_always_lowercase(name in "[A-Za-z0-9]{1,20}\\.[A-Za-z]{2,6}") {
            let line = format!("client 10.0.0.1#5353 ({name}): query: {name} IN A + (10.0.0.2)");
            let query = LineMatcher::default().capture(&line);
            prop_assert!(query.matched);
            prop_assert_eq!(query.query_name.clone(), query.query_name.to_lowercase());
            prop_assert_eq!(query.query_name, name.to_lowercase());
        }

        #[test]
        fn lines_without_query_token_never_match(line in "[^q]*") {
            prop_assert!(!LineMatcher::default().capture(&line).matched);
        }
    }
}
