//! Small helpers over `scraper`'s tree: reading is done through selectors,
//! writing is queued in [`DomEdits`] and applied once all reads are done.

use ego_tree::NodeId;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Elements matching `css` in document order; an invalid selector matches nothing.
pub(crate) fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

pub(crate) fn select_within<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => element.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Text of an element with every text node trimmed and the pieces joined.
pub(crate) fn stripped_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

pub(crate) fn first_text(document: &Html, css: &str) -> Option<String> {
    select_all(document, css)
        .into_iter()
        .next()
        .map(stripped_text)
        .filter(|t| !t.is_empty())
}

/// Non-empty value of `attr`.
pub(crate) fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// `rel="shortcut icon"` style token lists.
pub(crate) fn has_rel(element: ElementRef, token: &str) -> bool {
    element
        .value()
        .attr("rel")
        .map(|rel| {
            rel.split_whitespace()
                .any(|t| t.eq_ignore_ascii_case(token))
        })
        .unwrap_or(false)
}

#[derive(Debug, Default)]
pub(crate) struct DomEdits {
    attributes: Vec<(NodeId, &'static str, String)>,
    removals: Vec<NodeId>,
}

impl DomEdits {
    pub(crate) fn set_attr(&mut self, node: NodeId, name: &'static str, value: String) {
        self.attributes.push((node, name, value));
    }

    pub(crate) fn remove(&mut self, node: NodeId) {
        if !self.removals.contains(&node) {
            self.removals.push(node);
        }
    }

    pub(crate) fn is_removed(&self, node: NodeId) -> bool {
        self.removals.contains(&node)
    }

    /// Apply queued attribute rewrites, then detach removed subtrees.
    ///
    /// Only existing attributes are rewritten, so the element's attribute
    /// order is never disturbed.
    pub(crate) fn apply(self, document: &mut Html) {
        for (id, name, value) in self.attributes {
            let Some(mut node) = document.tree.get_mut(id) else {
                continue;
            };
            if let Node::Element(element) = node.value() {
                for (key, current) in element.attrs.iter_mut() {
                    if &*key.local == name {
                        *current = value.as_str().into();
                    }
                }
            }
        }
        for id in self.removals {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}
