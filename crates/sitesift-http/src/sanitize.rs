//! Allowlist sanitization for untrusted snippet markup.
//!
//! The service's `html_snippet` field is arbitrary markup and must never
//! reach a render boundary unsanitized. This is a strip-style sanitizer:
//! disallowed nodes are removed (not escaped), safe text content is kept.
//! It is total over arbitrary input; unparseable markup degrades to
//! reduced/empty output rather than an error.

use ego_tree::NodeRef;
use html_scraper::node::Node;
use html_scraper::Html;

/// The allowlist, as an explicit structure so callers and tests can assert
/// the exact policy rather than inferring it from behavior.
#[derive(Debug, Clone)]
pub struct SanitizePolicy {
    pub allowed_tags: &'static [&'static str],
    pub allowed_attributes: &'static [&'static str],
}

impl SanitizePolicy {
    /// Structural tags plus the single `class` styling hook. No URL-bearing
    /// attributes and no event handlers are allowlisted, so `javascript:`
    /// URLs and `on*` hooks fall out without special-casing.
    pub const DISPLAY: SanitizePolicy = SanitizePolicy {
        allowed_tags: &["p", "strong", "em", "span", "div", "br"],
        allowed_attributes: &["class"],
    };
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self::DISPLAY
    }
}

/// Elements whose entire subtree is dropped, text included. Everything else
/// that is disallowed is treated as transparent: the wrapper goes away, safe
/// descendants are kept.
const DROP_SUBTREE: &[&str] = &[
    "script", "style", "iframe", "noscript", "object", "embed", "template", "svg", "math", "title",
    "textarea",
];

/// Void elements among the allowlisted tags (no closing tag emitted).
const VOID: &[&str] = &["br"];

fn push_escaped_text(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn push_escaped_attr(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

fn emit(node: NodeRef<'_, Node>, policy: &SanitizePolicy, out: &mut String) {
    match node.value() {
        Node::Text(t) => push_escaped_text(out, t),
        Node::Element(el) => {
            let name = el.name();
            if DROP_SUBTREE.contains(&name) {
                return;
            }
            if !policy.allowed_tags.contains(&name) {
                // Transparent: drop the tag, keep safe descendants.
                for child in node.children() {
                    emit(child, policy, out);
                }
                return;
            }
            out.push('<');
            out.push_str(name);
            for (attr, value) in el.attrs() {
                if !policy.allowed_attributes.contains(&attr) {
                    continue;
                }
                out.push(' ');
                out.push_str(attr);
                out.push_str("=\"");
                push_escaped_attr(out, value);
                out.push('"');
            }
            out.push('>');
            if VOID.contains(&name) {
                return;
            }
            for child in node.children() {
                emit(child, policy, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        // Comments, doctypes, and processing instructions never survive;
        // document/fragment wrappers are traversed via children below.
        _ => {
            for child in node.children() {
                emit(child, policy, out);
            }
        }
    }
}

/// Strip `html` down to `policy`'s allowlist.
///
/// The output is always a tag/attribute subset of the input: nothing is
/// added, text is entity-escaped, and the function is idempotent.
pub fn sanitize(html: &str, policy: &SanitizePolicy) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    for child in fragment.tree.root().children() {
        emit(child, policy, &mut out);
    }
    out
}
