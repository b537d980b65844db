//! Small CSS selector engine covering the storefront markup contract.
//!
//! Supported grammar: compound selectors made of a tag name, `.class`
//! repetitions and `[attr="value"]` tests, combined with the descendant
//! combinator (whitespace). That is exactly the subset the storefront
//! widgets bind against, so anything fancier is rejected at parse time.

use anyhow::{bail, Context, Result};

use crate::dom::{Document, NodeId};

/// One parsed selector, ancestors first and the subject compound last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    parts: Vec<Compound>,
}

/// A single compound: `tag.class1.class2[attr="value"]`, all pieces optional
/// but at least one present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
}

impl Selector {
    /// Parses `input`, rejecting empty selectors and unsupported syntax.
    pub fn parse(input: &str) -> Result<Self> {
        let parts: Vec<Compound> = input
            .split_whitespace()
            .map(parse_compound)
            .collect::<Result<_>>()?;
        if parts.is_empty() {
            bail!("empty selector");
        }
        Ok(Self { parts })
    }

    /// Returns true when `node` is matched by this selector, i.e. the last
    /// compound matches the node itself and every earlier compound matches
    /// some strict ancestor, in order.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let (subject, ancestors) = match self.parts.split_last() {
            Some(split) => split,
            None => return false,
        };
        if !subject.matches(doc, node) {
            return false;
        }
        let mut current = node;
        for part in ancestors.iter().rev() {
            loop {
                current = match doc.parent(current) {
                    Some(parent) => parent,
                    None => return false,
                };
                if part.matches(doc, current) {
                    break;
                }
            }
        }
        true
    }
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if let Some(tag) = &self.tag {
            if doc.tag(node) != tag.as_str() {
                return false;
            }
        }
        if !self.classes.iter().all(|class| doc.has_class(node, class)) {
            return false;
        }
        self.attrs
            .iter()
            .all(|(name, value)| doc.attr(node, name) == Some(value.as_str()))
    }
}

fn parse_compound(token: &str) -> Result<Compound> {
    let mut out = Compound::default();
    let mut rest = token;

    let tag_end = rest
        .find(|c: char| c == '.' || c == '[')
        .unwrap_or(rest.len());
    if tag_end > 0 {
        out.tag = Some(rest[..tag_end].to_string());
        rest = &rest[tag_end..];
    }

    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('.') {
            let end = tail
                .find(|c: char| c == '.' || c == '[')
                .unwrap_or(tail.len());
            let class = &tail[..end];
            if class.is_empty() {
                bail!("empty class in selector {token:?}");
            }
            out.classes.push(class.to_string());
            rest = &tail[end..];
        } else if let Some(tail) = rest.strip_prefix('[') {
            let end = tail
                .find(']')
                .with_context(|| format!("unterminated attribute test in {token:?}"))?;
            let (name, value) = tail[..end]
                .split_once('=')
                .with_context(|| format!("attribute test without `=` in {token:?}"))?;
            if name.is_empty() {
                bail!("attribute test without a name in {token:?}");
            }
            let value = value.trim_matches('"');
            out.attrs.push((name.to_string(), value.to_string()));
            rest = &tail[end + 1..];
        } else {
            bail!("unsupported selector syntax near {rest:?}");
        }
    }
    Ok(out)
}
