//! Prompt templates for grounded answers.
//!
//! A template is plain text with two markers, [`QUERY_MARKER`] and
//! [`SOURCES_MARKER`]. Substitution is literal and single-pass: text that is
//! inserted for one marker is never scanned for the other, so a query that
//! happens to contain `{sources}` stays as typed.
//!
//! A template that is empty or lacks either marker is not an error; the
//! built-in [`DEFAULT_TEMPLATE`] is used instead.

pub const QUERY_MARKER: &str = "{query}";
pub const SOURCES_MARKER: &str = "{sources}";

pub const DEFAULT_TEMPLATE: &str = "\
You are a helpful assistant. Answer the question using only the sources below.
If the sources do not contain the answer, say that you do not know.

Sources:
{sources}

Question: {query}

Answer:";

/// A validated prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    custom: bool,
}

impl PromptTemplate {
    /// Use `template` if it is usable, otherwise the default.
    pub fn new(template: Option<String>) -> Self {
        match template {
            Some(t) if is_usable(&t) => Self {
                template: t,
                custom: true,
            },
            _ => Self::default(),
        }
    }

    /// `true` when a caller-supplied template is in effect.
    pub fn is_custom(&self) -> bool {
        self.custom
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn build_prompt(&self, query: &str, sources: &str) -> String {
        substitute(&self.template, query, sources)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            custom: false,
        }
    }
}

/// Build a prompt from an optional template, falling back to the default.
pub fn build_prompt(query: &str, sources: &str, template: Option<&str>) -> String {
    match template {
        Some(t) if is_usable(t) => substitute(t, query, sources),
        _ => substitute(DEFAULT_TEMPLATE, query, sources),
    }
}

fn is_usable(template: &str) -> bool {
    !template.trim().is_empty()
        && template.contains(QUERY_MARKER)
        && template.contains(SOURCES_MARKER)
}

fn substitute(template: &str, query: &str, sources: &str) -> String {
    let mut out = String::with_capacity(template.len() + query.len() + sources.len());
    let mut rest = template;

    loop {
        let next_query = rest.find(QUERY_MARKER);
        let next_sources = rest.find(SOURCES_MARKER);
        let (pos, marker, value) = match (next_query, next_sources) {
            (Some(q), Some(s)) if s < q => (s, SOURCES_MARKER, sources),
            (Some(q), _) => (q, QUERY_MARKER, query),
            (None, Some(s)) => (s, SOURCES_MARKER, sources),
            (None, None) => break,
        };
        out.push_str(&rest[..pos]);
        out.push_str(value);
        rest = &rest[pos + marker.len()..];
    }

    out.push_str(rest);
    out
}
