//! The hosted page as seen by the injector and decorators.
//!
//! Only the operations Midnight performs are modelled: appending to `<head>`,
//! removing `<link>` elements by `rel`, and adding a class to an element found
//! by id. [`Document`] is the in-memory implementation, renderable to HTML.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// An element Midnight inserts into `<head>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadElement {
    /// Inline `<style>` with text content.
    Style { id: String, css: String },
    /// `<link>`; `kind` is the `type` attribute.
    Link {
        rel: String,
        href: String,
        kind: Option<String>,
    },
}

impl HeadElement {
    pub fn stylesheet_link(href: impl Into<String>) -> Self {
        Self::Link {
            rel: "stylesheet".into(),
            href: href.into(),
            kind: Some("text/css".into()),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Style { id, css } => {
                format!("<style type=\"text/css\" id=\"{}\">{}</style>", escape_attr(id), css)
            }
            Self::Link { rel, href, kind } => {
                let mut out = format!("<link rel=\"{}\" href=\"{}\"", escape_attr(rel), escape_attr(href));
                if let Some(kind) = kind {
                    let _ = write!(out, " type=\"{}\"", escape_attr(kind));
                }
                out.push('>');
                out
            }
        }
    }
}

/// DOM operations used by the injector and decorators.
pub trait Page {
    fn append_to_head(&mut self, element: HeadElement);

    /// Remove every head `<link>` whose `rel` matches (ASCII case-insensitive).
    /// Returns how many were removed.
    fn remove_head_links(&mut self, rel: &str) -> usize;

    /// Add `class` to the element with `id`. Returns false when there is no
    /// such element.
    fn add_class(&mut self, id: &str, class: &str) -> bool;
}

/// In-memory page: a head element list plus id -> class set for body elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    head: Vec<HeadElement>,
    elements: BTreeMap<String, BTreeSet<String>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a body element with the given id.
    pub fn with_element(mut self, id: &str) -> Self {
        self.elements.entry(id.to_string()).or_default();
        self
    }

    /// Pre-populate the head (e.g. the player's own favicon link).
    pub fn with_head(mut self, element: HeadElement) -> Self {
        self.head.push(element);
        self
    }

    pub fn head(&self) -> &[HeadElement] {
        &self.head
    }

    pub fn classes(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.elements.get(id)
    }

    /// `<head>` markup, one element per line.
    pub fn render_head(&self) -> String {
        let mut out = String::from("<head>\n");
        for el in &self.head {
            let _ = writeln!(out, "  {}", el.render());
        }
        out.push_str("</head>");
        out
    }

    /// Full markup: head followed by the tracked body elements.
    pub fn render(&self) -> String {
        let mut out = self.render_head();
        out.push_str("\n<body>\n");
        for (id, classes) in &self.elements {
            let class_list = classes.iter().cloned().collect::<Vec<_>>().join(" ");
            let _ = writeln!(
                out,
                "  <div id=\"{}\" class=\"{}\"></div>",
                escape_attr(id),
                escape_attr(&class_list)
            );
        }
        out.push_str("</body>");
        out
    }
}

impl Page for Document {
    fn append_to_head(&mut self, element: HeadElement) {
        self.head.push(element);
    }

    fn remove_head_links(&mut self, rel: &str) -> usize {
        let before = self.head.len();
        self.head.retain(|el| match el {
            HeadElement::Link { rel: r, .. } => !r.eq_ignore_ascii_case(rel),
            HeadElement::Style { .. } => true,
        });
        before - self.head.len()
    }

    fn add_class(&mut self, id: &str, class: &str) -> bool {
        match self.elements.get_mut(id) {
            Some(classes) => {
                classes.insert(class.to_string());
                true
            }
            None => false,
        }
    }
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
