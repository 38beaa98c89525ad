//! Component library catalog shown in the library panel.
//!
//! Entries turn into `AddComponent` intents; the panel never touches the
//! page directly.

use crate::id::NodeId;
use crate::intent::EditIntent;
use crate::model::{ComponentKind, PropValue, Properties};

/// A library entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Stable library id (`contact-form`).
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ComponentKind,
    /// Properties a freshly added component starts with.
    pub defaults: Properties,
}

impl CatalogEntry {
    /// The intent the library panel emits when this entry is added or dropped.
    pub fn intent(&self, parent_id: Option<NodeId>, index: Option<usize>) -> EditIntent {
        EditIntent::AddComponent {
            kind: self.kind.clone(),
            properties: self.defaults.clone(),
            parent_id,
            index,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.description.to_lowercase().contains(needle)
    }
}

/// A named group of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: &'static str,
    pub entries: Vec<CatalogEntry>,
}

/// The full library.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub categories: Vec<Category>,
    /// Search phrases offered above the search box, best first.
    pub suggestions: Vec<&'static str>,
}

const FEATURED_SUGGESTIONS: usize = 2;

fn defaults(pairs: &[(&str, PropValue)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn entry(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    kind: ComponentKind,
    props: &[(&str, PropValue)],
) -> CatalogEntry {
    CatalogEntry {
        id,
        name,
        description,
        kind,
        defaults: defaults(props),
    }
}

impl Catalog {
    /// The builder's standard component set.
    pub fn builtin() -> Self {
        use ComponentKind as K;
        let text = |s: &str| PropValue::from(s);

        Self {
            categories: vec![
                Category {
                    name: "Layout",
                    entries: vec![
                        entry("section", "Section", "A full-width container for content", K::Section, &[]),
                        entry(
                            "container",
                            "Container",
                            "A centered content container with max-width",
                            K::Container,
                            &[("maxWidth", PropValue::Number(1200.0))],
                        ),
                        entry(
                            "grid",
                            "Grid",
                            "A responsive grid layout system",
                            K::Grid,
                            &[("columns", PropValue::Number(3.0)), ("gap", PropValue::Number(16.0))],
                        ),
                    ],
                },
                Category {
                    name: "Content",
                    entries: vec![
                        entry(
                            "heading",
                            "Heading",
                            "A text heading with multiple levels",
                            K::Heading,
                            &[("text", text("Heading")), ("level", PropValue::Number(2.0))],
                        ),
                        entry(
                            "paragraph",
                            "Paragraph",
                            "A block of text content",
                            K::Paragraph,
                            &[("text", text("Write something here."))],
                        ),
                        entry(
                            "button",
                            "Button",
                            "An interactive button element",
                            K::Button,
                            &[("label", text("Click me"))],
                        ),
                    ],
                },
                Category {
                    name: "Media",
                    entries: vec![
                        entry("image", "Image", "A responsive image component", K::Image, &[("alt", text(""))]),
                        entry(
                            "video",
                            "Video",
                            "An embedded video player",
                            K::Video,
                            &[("controls", PropValue::Bool(true))],
                        ),
                        entry(
                            "carousel",
                            "Carousel",
                            "A slideshow for cycling through elements",
                            K::Carousel,
                            &[("interval", PropValue::Number(5000.0))],
                        ),
                    ],
                },
                Category {
                    name: "Forms",
                    entries: vec![
                        entry("input", "Input", "A text input field", K::Input, &[("placeholder", text(""))]),
                        entry("textarea", "Textarea", "A multi-line text input", K::Textarea, &[]),
                        entry(
                            "contact-form",
                            "Contact Form",
                            "A complete contact form with validation",
                            K::ContactForm,
                            &[("title", text("Contact us")), ("submitLabel", text("Send"))],
                        ),
                    ],
                },
                Category {
                    name: "Sections",
                    entries: vec![
                        entry(
                            "hero",
                            "Hero Section",
                            "A prominent banner section",
                            K::Hero,
                            &[("title", text("Your headline")), ("ctaLabel", text("Get Started"))],
                        ),
                        entry(
                            "features",
                            "Features Grid",
                            "A grid of feature cards or items",
                            K::Features,
                            &[("columns", PropValue::Number(3.0))],
                        ),
                        entry(
                            "testimonials",
                            "Testimonials",
                            "A section for customer testimonials",
                            K::Testimonials,
                            &[],
                        ),
                        entry(
                            "pricing",
                            "Pricing Table",
                            "A comparison table for pricing plans",
                            K::Pricing,
                            &[],
                        ),
                        entry("footer", "Footer", "A page footer with links and info", K::Footer, &[]),
                    ],
                },
            ],
            suggestions: vec![
                "Hero sections for landing pages",
                "Contact forms with validation",
                "Pricing tables for SaaS",
                "Testimonial carousels",
            ],
        }
    }

    /// The suggestions the panel has room for.
    pub fn featured_suggestions(&self) -> &[&'static str] {
        &self.suggestions[..self.suggestions.len().min(FEATURED_SUGGESTIONS)]
    }

    /// Case-insensitive filter on entry name or description. Categories
    /// left without entries are dropped; a blank query keeps everything.
    pub fn search(&self, query: &str) -> Vec<Category> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.categories.clone();
        }
        self.categories
            .iter()
            .filter_map(|cat| {
                let entries: Vec<CatalogEntry> = cat
                    .entries
                    .iter()
                    .filter(|e| e.matches(&needle))
                    .cloned()
                    .collect();
                (!entries.is_empty()).then(|| Category {
                    name: cat.name,
                    entries,
                })
            })
            .collect()
    }

    /// Look up an entry by library id.
    pub fn find(&self, id: &str) -> Option<&CatalogEntry> {
        self.categories
            .iter()
            .flat_map(|c| c.entries.iter())
            .find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
