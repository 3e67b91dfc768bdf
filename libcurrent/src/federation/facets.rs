//! Rich-text facets for Bluesky posts
//!
//! Bluesky does not render markdown. Before a post is federated its content
//! is rewritten into plain text plus a list of facets, annotations that mark
//! a UTF-8 byte range of the text as a link or a mention.
//!
//! The passes run in a fixed order:
//!
//! 1. emphasis delimiters (`**`, `__`, `*`, `~~`, `` ` ``) are removed,
//! 2. every `[text](target)` becomes `text` with a link facet,
//! 3. `@handle` mentions are resolved to DIDs and get a mention facet.
//!
//! Links must be rewritten before mentions are scanned: every rewrite shrinks
//! the text and shifts the byte offsets of everything after it.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::{Arc, LazyLock};

use super::resolver::HandleResolver;

// Regex patterns - these are valid static patterns that cannot fail

/// `[text](target)`
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

/// `@` + DNS-style handle, preceded by start of text or a non-word character.
/// Labels are at most 63 characters and the last one starts with a letter.
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|\W)(@(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)",
    )
    .unwrap()
});

static BOLD_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

static BOLD_UNDERSCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(.+?)__").unwrap());

static STRIKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~~(.+?)~~").unwrap());

static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+)\*").unwrap());

static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());

/// Stand-in for a link target while emphasis is stripped, see `strip_emphasis`
static MASKED_TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}([0-9]+)\u{E001}").unwrap());

/// Byte range of a facet, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

impl Facet {
    pub fn link(byte_start: usize, byte_end: usize, uri: impl Into<String>) -> Self {
        Self {
            index: ByteSlice {
                byte_start,
                byte_end,
            },
            features: vec![FacetFeature::Link { uri: uri.into() }],
        }
    }

    pub fn mention(byte_start: usize, byte_end: usize, did: impl Into<String>) -> Self {
        Self {
            index: ByteSlice {
                byte_start,
                byte_end,
            },
            features: vec![FacetFeature::Mention { did: did.into() }],
        }
    }

    /// The annotated slice of `text`, if the range is valid for it
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.index.byte_start..self.index.byte_end)
    }
}

/// Text ready to be sent as a Bluesky post record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContent {
    pub text: String,
    pub facets: Vec<Facet>,
}

/// Remove markdown emphasis delimiters, keeping the emphasized text
///
/// Link targets are masked first so URLs such as `/__init__.py` reach
/// link extraction byte for byte. Labels are stripped like any other text.
pub fn strip_emphasis(content: &str) -> String {
    let mut targets: Vec<String> = Vec::new();
    let masked = LINK_RE.replace_all(content, |caps: &Captures| {
        targets.push(caps[2].to_string());
        format!("[{}](\u{E000}{}\u{E001})", &caps[1], targets.len() - 1)
    });

    let text = BOLD_STAR_RE.replace_all(&masked, "${1}");
    let text = BOLD_UNDERSCORE_RE.replace_all(&text, "${1}");
    let text = STRIKE_RE.replace_all(&text, "${1}");
    let text = ITALIC_RE.replace_all(&text, "${1}");
    let text = INLINE_CODE_RE.replace_all(&text, "${1}");

    if targets.is_empty() {
        return text.into_owned();
    }

    MASKED_TARGET_RE
        .replace_all(&text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| targets.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn next_link(text: &str) -> Option<(Range<usize>, String, String)> {
    let caps = LINK_RE.captures(text)?;
    let whole = caps.get(0)?;
    let label = caps.get(1)?.as_str().to_string();
    let target = caps.get(2)?.as_str().to_string();
    Some((whole.range(), label, target))
}

/// Replace every `[text](target)` with `text` and return one link facet per link
///
/// The first remaining match is rewritten on each round, so every facet's
/// range is computed against the text as it is after all earlier rewrites.
pub fn extract_links(content: &str) -> (String, Vec<Facet>) {
    let mut text = content.to_string();
    let mut facets = Vec::new();

    while let Some((range, label, target)) = next_link(&text) {
        let start = range.start;
        facets.push(Facet::link(start, start + label.len(), target));
        text.replace_range(range, &label);
    }

    (text, facets)
}

/// Every mention candidate as (byte range of `@handle`, handle without `@`)
pub fn find_mentions(text: &str) -> Vec<(Range<usize>, String)> {
    MENTION_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| (m.range(), m.as_str()[1..].to_string()))
        .collect()
}

/// Converts markdown post content into Bluesky rich text
#[derive(Clone)]
pub struct FacetParser {
    resolver: Arc<dyn HandleResolver>,
    strip_emphasis: bool,
}

impl FacetParser {
    pub fn new(resolver: Arc<dyn HandleResolver>) -> Self {
        Self {
            resolver,
            strip_emphasis: true,
        }
    }

    /// Enable or disable the emphasis-stripping pre-pass
    pub fn with_emphasis_stripping(mut self, enabled: bool) -> Self {
        self.strip_emphasis = enabled;
        self
    }

    /// Rewrite `content` and compute its facets
    ///
    /// Never fails: mentions that cannot be resolved stay plain text and
    /// malformed link syntax is left untouched. Handles are resolved one
    /// after another, so latency grows with the number of mentions.
    pub async fn parse(&self, content: &str) -> ParsedContent {
        let content = if self.strip_emphasis {
            strip_emphasis(content)
        } else {
            content.to_string()
        };

        let (text, mut facets) = extract_links(&content);

        for (range, handle) in find_mentions(&text) {
            match self.resolver.resolve(&handle).await {
                Some(did) if !did.is_empty() => {
                    facets.push(Facet::mention(range.start, range.end, did));
                }
                _ => {
                    tracing::debug!(handle = %handle, "Mention left as plain text");
                }
            }
        }

        ParsedContent { text, facets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::mock::StaticResolver;

    fn parser_with(handles: &[(&str, &str)]) -> FacetParser {
        FacetParser::new(Arc::new(StaticResolver::new(handles)))
    }

    #[test]
    fn test_single_link_is_rewritten() {
        let (text, facets) = extract_links("See [my site](https://ex.com) now");

        assert_eq!(text, "See my site now");
        assert_eq!(facets, vec![Facet::link(4, 11, "https://ex.com")]);
        assert_eq!(facets[0].slice(&text), Some("my site"));
    }

    #[test]
    fn test_multiple_links_shift_offsets() {
        let (text, facets) = extract_links("[a](https://a.example) and [bee](https://b.example)!");

        assert_eq!(text, "a and bee!");
        assert_eq!(facets.len(), 2);
        assert_eq!(facets[0].slice(&text), Some("a"));
        assert_eq!(facets[1].slice(&text), Some("bee"));
        assert_eq!(
            facets[1].features,
            vec![FacetFeature::Link {
                uri: "https://b.example".to_string()
            }]
        );
    }

    #[test]
    fn test_link_offsets_are_bytes_not_chars() {
        let (text, facets) = extract_links("Čau 👋 [odkaz](https://ex.com)");

        assert_eq!(text, "Čau 👋 odkaz");
        // "Čau " is 5 bytes and the emoji plus space another 5
        assert_eq!(facets[0].index, ByteSlice { byte_start: 10, byte_end: 15 });
        assert_eq!(facets[0].slice(&text), Some("odkaz"));
    }

    #[test]
    fn test_malformed_links_are_untouched() {
        let content = "[no target] and (no label) and [empty]()";
        let (text, facets) = extract_links(content);

        assert_eq!(text, content);
        assert!(facets.is_empty());
    }

    #[test]
    fn test_strip_emphasis_keeps_inner_text() {
        assert_eq!(
            strip_emphasis("**bold** __strong__ *it* ~~gone~~ `code`"),
            "bold strong it gone code"
        );
        assert_eq!(strip_emphasis("2 * 3 = 6"), "2 * 3 = 6");
    }

    #[test]
    fn test_strip_emphasis_leaves_link_targets_alone() {
        assert_eq!(
            strip_emphasis("[docs](https://ex.com/__init__.py)"),
            "[docs](https://ex.com/__init__.py)"
        );
        assert_eq!(
            strip_emphasis("[**a**](https://ex.com/*x*) and [b](https://ex.com/~~y~~/`z`)"),
            "[a](https://ex.com/*x*) and [b](https://ex.com/~~y~~/`z`)"
        );
        assert_eq!(
            strip_emphasis("*see [a](https://ex.com/__x__)*"),
            "see [a](https://ex.com/__x__)"
        );
    }

    #[test]
    fn test_find_mentions_excludes_boundary() {
        let mentions = find_mentions("hi @alice.bsky.social, (@bob.example.com)");

        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0], (3..21, "alice.bsky.social".to_string()));
        assert_eq!(mentions[1].1, "bob.example.com");
    }

    #[test]
    fn test_find_mentions_at_start_and_not_in_emails() {
        let mentions = find_mentions("@carol.dev wrote to dave@example.com");

        assert_eq!(mentions, vec![(0..10, "carol.dev".to_string())]);
    }

    #[test]
    fn test_find_mentions_requires_alphabetic_tld() {
        assert!(find_mentions("ping @192.168.0.1").is_empty());
        assert!(find_mentions("just @nodots here").is_empty());
    }

    #[test]
    fn test_find_mentions_rejects_overlong_labels() {
        let long_label = "a".repeat(64);
        let content = format!("@{}.com", long_label);
        assert!(find_mentions(&content).is_empty());

        let ok_label = "a".repeat(63);
        let content = format!("@{}.com", ok_label);
        assert_eq!(find_mentions(&content).len(), 1);
    }

    #[tokio::test]
    async fn test_parse_end_to_end() {
        let parser = parser_with(&[("alice.bsky.social", "did:plc:abc")]);

        let parsed = parser
            .parse("Check [my site](https://ex.com) and @alice.bsky.social")
            .await;

        assert_eq!(parsed.text, "Check my site and @alice.bsky.social");
        assert_eq!(
            parsed.facets,
            vec![
                Facet::link(6, 13, "https://ex.com"),
                Facet::mention(18, 36, "did:plc:abc"),
            ]
        );
        assert_eq!(parsed.facets[0].slice(&parsed.text), Some("my site"));
        assert_eq!(
            parsed.facets[1].slice(&parsed.text),
            Some("@alice.bsky.social")
        );
    }

    #[tokio::test]
    async fn test_unresolved_mention_stays_plain_text() {
        let parser = parser_with(&[]);

        let parsed = parser.parse("hello @ghost.bsky.social!").await;

        assert_eq!(parsed.text, "hello @ghost.bsky.social!");
        assert!(parsed.facets.is_empty());
    }

    #[tokio::test]
    async fn test_empty_did_counts_as_unresolved() {
        let parser = parser_with(&[("blank.bsky.social", "")]);

        let parsed = parser.parse("@blank.bsky.social").await;

        assert!(parsed.facets.is_empty());
    }

    #[tokio::test]
    async fn test_links_come_before_mentions() {
        let parser = parser_with(&[("bob.test", "did:plc:bob")]);

        let parsed = parser
            .parse("@bob.test likes [this](https://x.example)")
            .await;

        assert_eq!(parsed.text, "@bob.test likes this");
        assert!(matches!(
            parsed.facets[0].features[0],
            FacetFeature::Link { .. }
        ));
        assert!(matches!(
            parsed.facets[1].features[0],
            FacetFeature::Mention { .. }
        ));
        assert_eq!(parsed.facets[1].index, ByteSlice { byte_start: 0, byte_end: 9 });
    }

    #[tokio::test]
    async fn test_mentions_see_link_rewritten_offsets() {
        let parser = parser_with(&[("eve.test", "did:plc:eve")]);

        let parsed = parser
            .parse("[a long label](https://long.example/path) @eve.test")
            .await;

        assert_eq!(parsed.text, "a long label @eve.test");
        assert_eq!(parsed.facets[1].slice(&parsed.text), Some("@eve.test"));
    }

    #[tokio::test]
    async fn test_emphasis_stripping_is_optional() {
        let resolver = Arc::new(StaticResolver::new(&[]));

        let stripping = FacetParser::new(resolver.clone());
        let parsed = stripping.parse("**[bold link](https://ex.com)**").await;
        assert_eq!(parsed.text, "bold link");
        assert_eq!(parsed.facets[0].slice(&parsed.text), Some("bold link"));

        let keeping = FacetParser::new(resolver).with_emphasis_stripping(false);
        let parsed = keeping.parse("**[bold link](https://ex.com)**").await;
        assert_eq!(parsed.text, "**bold link**");
        assert_eq!(parsed.facets[0].index.byte_start, 2);
    }

    #[tokio::test]
    async fn test_link_target_with_underscores_survives_parse() {
        let parser = parser_with(&[]);

        let parsed = parser
            .parse("read __the__ [docs](https://ex.com/pkg/__init__.py)")
            .await;

        assert_eq!(parsed.text, "read the docs");
        assert_eq!(
            parsed.facets,
            vec![Facet::link(9, 13, "https://ex.com/pkg/__init__.py")]
        );
    }

    #[tokio::test]
    async fn test_resolver_called_once_per_mention_in_order() {
        let resolver = Arc::new(StaticResolver::new(&[("a.test", "did:plc:a")]));
        let parser = FacetParser::new(resolver.clone());

        parser.parse("@b.test @a.test @c.test").await;

        assert_eq!(
            resolver.lookups(),
            vec!["b.test".to_string(), "a.test".to_string(), "c.test".to_string()]
        );
    }

    #[test]
    fn test_facet_json_shape() {
        let facets = vec![
            Facet::link(0, 4, "https://ex.com"),
            Facet::mention(5, 10, "did:plc:abc"),
        ];

        let json = serde_json::to_value(&facets).unwrap();

        assert_eq!(
            json,
            serde_json::json!([
                {
                    "index": {"byteStart": 0, "byteEnd": 4},
                    "features": [{"$type": "app.bsky.richtext.facet#link", "uri": "https://ex.com"}]
                },
                {
                    "index": {"byteStart": 5, "byteEnd": 10},
                    "features": [{"$type": "app.bsky.richtext.facet#mention", "did": "did:plc:abc"}]
                }
            ])
        );
    }
}
