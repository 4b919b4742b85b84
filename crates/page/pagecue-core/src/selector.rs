//! The CSS selector subset the page markup relies on.
//!
//! Supported: type (`a`), class (`.card`), id (`#navbar`) and attribute
//! selectors (`[data-counter]`, `[href="x"]`, `[href^="#"]`, `[href$=".html"]`)
//! combined into compounds, and comma-separated groups of compounds.
//! Combinators are not supported; scoped lookups go through
//! [`crate::Document::query_within`] instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CueError, Result};

/// Read access to the element properties a selector can test.
pub trait Matchable {
    fn tag(&self) -> &str;
    fn dom_id(&self) -> Option<&str>;
    fn has_class(&self, class: &str) -> bool;
    fn attribute(&self, name: &str) -> Option<&str>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
    Suffix(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Class(String),
    Id(String),
    Attr { name: String, op: AttrOp },
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    parts: Vec<Part>,
}

impl Compound {
    fn matches<M: Matchable + ?Sized>(&self, el: &M) -> bool {
        if let Some(tag) = &self.tag {
            if !el.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.parts.iter().all(|part| match part {
            Part::Class(c) => el.has_class(c),
            Part::Id(id) => el.dom_id() == Some(id.as_str()),
            Part::Attr { name, op } => match (el.attribute(name), op) {
                (None, _) => false,
                (Some(_), AttrOp::Exists) => true,
                (Some(v), AttrOp::Equals(want)) => v == want,
                // CSS: an empty operand never matches for ^= and $=
                (Some(v), AttrOp::Prefix(want)) => !want.is_empty() && v.starts_with(want.as_str()),
                (Some(v), AttrOp::Suffix(want)) => !want.is_empty() && v.ends_with(want.as_str()),
            },
        })
    }
}

/// A parsed selector. Keeps its source text so hosts with a native query
/// engine can run it unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Selector {
    source: String,
    groups: Vec<Compound>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        input.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches<M: Matchable + ?Sized>(&self, el: &M) -> bool {
        self.groups.iter().any(|g| g.matches(el))
    }
}

impl FromStr for Selector {
    type Err = CueError;

    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CueError::selector(input, "empty selector"));
        }
        let groups = trimmed
            .split(',')
            .map(|g| parse_compound(g.trim(), input))
            .collect::<Result<Vec<_>>>()?;
        Ok(Selector {
            source: trimmed.to_string(),
            groups,
        })
    }
}

impl TryFrom<String> for Selector {
    type Error = CueError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Selector> for String {
    fn from(s: Selector) -> Self {
        s.source
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident<'a>(rest: &mut &'a str) -> &'a str {
    let end = rest
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let (ident, tail) = rest.split_at(end);
    *rest = tail;
    ident
}

fn parse_compound(group: &str, input: &str) -> Result<Compound> {
    if group.is_empty() {
        return Err(CueError::selector(input, "empty selector group"));
    }
    if group.contains(char::is_whitespace) {
        return Err(CueError::selector(input, "combinators are not supported"));
    }
    let mut compound = Compound::default();
    let mut rest = group;

    if rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        compound.tag = Some(take_ident(&mut rest).to_ascii_lowercase());
    }

    while let Some(c) = rest.chars().next() {
        match c {
            '.' | '#' => {
                rest = &rest[1..];
                let ident = take_ident(&mut rest);
                if ident.is_empty() {
                    return Err(CueError::selector(input, format!("missing name after `{c}`")));
                }
                compound.parts.push(if c == '.' {
                    Part::Class(ident.to_string())
                } else {
                    Part::Id(ident.to_string())
                });
            }
            '[' => {
                let close = rest
                    .find(']')
                    .ok_or_else(|| CueError::selector(input, "unterminated attribute selector"))?;
                compound.parts.push(parse_attr(&rest[1..close], input)?);
                rest = &rest[close + 1..];
            }
            other => {
                return Err(CueError::selector(
                    input,
                    format!("unexpected character `{other}`"),
                ))
            }
        }
    }
    Ok(compound)
}

fn parse_attr(body: &str, input: &str) -> Result<Part> {
    let mut rest = body;
    let name = take_ident(&mut rest);
    if name.is_empty() {
        return Err(CueError::selector(input, "missing attribute name"));
    }
    let name = name.to_ascii_lowercase();
    if rest.is_empty() {
        return Ok(Part::Attr {
            name,
            op: AttrOp::Exists,
        });
    }
    let (kind, value) = if let Some(v) = rest.strip_prefix("^=") {
        ('^', v)
    } else if let Some(v) = rest.strip_prefix("$=") {
        ('$', v)
    } else if let Some(v) = rest.strip_prefix('=') {
        ('=', v)
    } else {
        return Err(CueError::selector(input, format!("unsupported operator in `[{body}]`")));
    };
    let value = unquote(value)
        .ok_or_else(|| CueError::selector(input, format!("bad attribute value in `[{body}]`")))?
        .to_string();
    let op = match kind {
        '^' => AttrOp::Prefix(value),
        '$' => AttrOp::Suffix(value),
        _ => AttrOp::Equals(value),
    };
    Ok(Part::Attr { name, op })
}

fn unquote(v: &str) -> Option<&str> {
    for q in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(q) {
            return inner.strip_suffix(q);
        }
    }
    if !v.is_empty() && v.chars().all(is_ident_char) {
        Some(v)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct El {
        tag: &'static str,
        id: Option<&'static str>,
        classes: Vec<&'static str>,
        attrs: HashMap<&'static str, &'static str>,
    }

    impl Matchable for El {
        fn tag(&self) -> &str {
            self.tag
        }
        fn dom_id(&self) -> Option<&str> {
            self.id
        }
        fn has_class(&self, class: &str) -> bool {
            self.classes.iter().any(|c| *c == class)
        }
        fn attribute(&self, name: &str) -> Option<&str> {
            self.attrs.get(name).copied()
        }
    }

    fn link(href: &'static str) -> El {
        El {
            tag: "a",
            id: None,
            classes: vec![],
            attrs: HashMap::from([("href", href)]),
        }
    }

    #[test]
    fn class_and_id() {
        let card = El {
            tag: "div",
            id: Some("first"),
            classes: vec!["stat-card", "wide"],
            attrs: HashMap::new(),
        };
        assert!(Selector::parse(".stat-card").unwrap().matches(&card));
        assert!(Selector::parse("div.stat-card.wide").unwrap().matches(&card));
        assert!(Selector::parse("#first").unwrap().matches(&card));
        assert!(!Selector::parse("span.stat-card").unwrap().matches(&card));
        assert!(!Selector::parse(".info-card").unwrap().matches(&card));
    }

    #[test]
    fn attribute_operators() {
        let anchor = Selector::parse(r##"a[href^="#"]"##).unwrap();
        let page = Selector::parse(r#"a[href$=".html"]"#).unwrap();
        assert!(anchor.matches(&link("#top")));
        assert!(!anchor.matches(&link("about.html")));
        assert!(page.matches(&link("about.html")));
        assert!(!page.matches(&link("#top")));

        let counter = Selector::parse("[data-counter]").unwrap();
        let mut el = link("x");
        assert!(!counter.matches(&el));
        el.attrs.insert("data-counter", "150");
        assert!(counter.matches(&el));

        let body = Selector::parse(r#"[id$="Body"]"#).unwrap();
        let mut el = link("x");
        el.id = Some("caseModalBody");
        el.attrs.insert("id", "caseModalBody");
        assert!(body.matches(&el));
    }

    #[test]
    fn groups_match_any() {
        let icons = Selector::parse(".finding-icon, .objective-number, .citation-number").unwrap();
        let el = El {
            tag: "span",
            id: None,
            classes: vec!["citation-number"],
            attrs: HashMap::new(),
        };
        assert!(icons.matches(&el));
        assert_eq!(icons.as_str(), ".finding-icon, .objective-number, .citation-number");
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse(".a .b").is_err());
        assert!(Selector::parse(".a > .b").is_err());
        assert!(Selector::parse("[href").is_err());
        assert!(Selector::parse("[href~=x]").is_err());
        assert!(Selector::parse(".").is_err());
        assert!(Selector::parse("a,").is_err());
    }
}
