//! `<Layout>` / `<DefaultLayout>` directives.

use std::path::Path;

use super::xml::Element;
use crate::error::ParseError;

/// Default `inline_limit`.
const DEFAULT_INLINE_LIMIT: usize = 4;

/// Which allocated items a `<Merge>` directive inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Submenus not placed explicitly.
    Menus,
    /// Entries not placed explicitly.
    Files,
    /// Both, sorted together.
    All,
}

impl MergeKind {
    fn parse(value: &str) -> Self {
        match value {
            "menus" => Self::Menus,
            "files" => Self::Files,
            _ => Self::All,
        }
    }

    /// Attribute value written back to markup.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Menus => "menus",
            Self::Files => "files",
            Self::All => "all",
        }
    }
}

/// Inline options of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineOptions {
    /// Show the menu even when nothing in it is visible.
    pub show_empty: bool,
    /// Splice the menu's items into its parent.
    pub inline: bool,
    /// Maximum item count for inlining; `0` means no limit.
    pub inline_limit: usize,
    /// Put a header item in front of inlined items.
    pub inline_header: bool,
    /// A single inlined item takes the menu's name.
    pub inline_alias: bool,
}

impl Default for InlineOptions {
    fn default() -> Self {
        Self {
            show_empty: false,
            inline: false,
            inline_limit: DEFAULT_INLINE_LIMIT,
            inline_header: true,
            inline_alias: false,
        }
    }
}

impl InlineOptions {
    /// Apply the explicit attributes of `overrides`.
    #[must_use]
    pub fn with(self, overrides: &InlineOverrides) -> Self {
        Self {
            show_empty: overrides.show_empty.unwrap_or(self.show_empty),
            inline: overrides.inline.unwrap_or(self.inline),
            inline_limit: overrides.inline_limit.unwrap_or(self.inline_limit),
            inline_header: overrides.inline_header.unwrap_or(self.inline_header),
            inline_alias: overrides.inline_alias.unwrap_or(self.inline_alias),
        }
    }
}

/// Inline attributes given explicitly on an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineOverrides {
    /// `show_empty`
    pub show_empty: Option<bool>,
    /// `inline`
    pub inline: Option<bool>,
    /// `inline_limit`
    pub inline_limit: Option<usize>,
    /// `inline_header`
    pub inline_header: Option<bool>,
    /// `inline_alias`
    pub inline_alias: Option<bool>,
}

impl InlineOverrides {
    fn from_element(element: &Element) -> Self {
        let flag = |key: &str| element.attribute(key).map(|v| v == "true");
        Self {
            show_empty: flag("show_empty"),
            inline: flag("inline"),
            inline_limit: element
                .attribute("inline_limit")
                .and_then(|v| v.trim().parse().ok()),
            inline_header: flag("inline_header"),
            inline_alias: flag("inline_alias"),
        }
    }

    fn write_to(&self, element: &mut Element) {
        let flag = |v: bool| if v { "true" } else { "false" };
        if let Some(v) = self.show_empty {
            element.set_attribute("show_empty", flag(v));
        }
        if let Some(v) = self.inline {
            element.set_attribute("inline", flag(v));
        }
        if let Some(v) = self.inline_limit {
            element.set_attribute("inline_limit", &v.to_string());
        }
        if let Some(v) = self.inline_header {
            element.set_attribute("inline_header", flag(v));
        }
        if let Some(v) = self.inline_alias {
            element.set_attribute("inline_alias", flag(v));
        }
    }
}

impl From<InlineOptions> for InlineOverrides {
    fn from(options: InlineOptions) -> Self {
        Self {
            show_empty: Some(options.show_empty),
            inline: Some(options.inline),
            inline_limit: Some(options.inline_limit),
            inline_header: Some(options.inline_header),
            inline_alias: Some(options.inline_alias),
        }
    }
}

/// One directive of a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutItem {
    /// Place the named submenu here.
    Menuname {
        /// Submenu name.
        name: String,
        /// Inline attributes given on the `<Menuname>` element.
        overrides: InlineOverrides,
    },
    /// Place the entry with this desktop-file id here.
    Filename(String),
    /// A separator.
    Separator,
    /// Insert everything not placed explicitly.
    Merge(MergeKind),
}

/// Ordering directives plus inline options for a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Directives in order.
    pub order: Vec<LayoutItem>,
    /// Layout-level inline options.
    pub options: InlineOptions,
}

impl Default for Layout {
    /// Submenus first, then entries.
    fn default() -> Self {
        Self {
            order: vec![
                LayoutItem::Merge(MergeKind::Menus),
                LayoutItem::Merge(MergeKind::Files),
            ],
            options: InlineOptions::default(),
        }
    }
}

impl Layout {
    /// Parse a `<Layout>` or `<DefaultLayout>` element.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::EmptyElement`] for an empty `<Menuname>` or
    /// `<Filename>`.
    pub fn from_element(element: &Element, path: &Path) -> Result<Self, ParseError> {
        let empty = |child: &Element| ParseError::EmptyElement {
            element: child.name.clone(),
            path: path.to_path_buf(),
        };

        let mut order = Vec::new();
        for child in &element.children {
            let item = match child.name.as_str() {
                "Menuname" => {
                    let name = child.trimmed_text();
                    if name.is_empty() {
                        return Err(empty(child));
                    }
                    LayoutItem::Menuname {
                        name: name.to_string(),
                        overrides: InlineOverrides::from_element(child),
                    }
                }
                "Filename" => {
                    let id = child.trimmed_text();
                    if id.is_empty() {
                        return Err(empty(child));
                    }
                    LayoutItem::Filename(id.to_string())
                }
                "Separator" => LayoutItem::Separator,
                "Merge" => LayoutItem::Merge(MergeKind::parse(child.attribute("type").unwrap_or("all"))),
                _ => continue,
            };
            order.push(item);
        }

        Ok(Self {
            order,
            options: InlineOptions::default().with(&InlineOverrides::from_element(element)),
        })
    }

    /// Serialize as an element named `name` (`Layout` or `DefaultLayout`).
    #[must_use]
    pub fn to_element(&self, name: &str) -> Element {
        let mut element = Element::new(name);
        if self.options != InlineOptions::default() {
            InlineOverrides::from(self.options).write_to(&mut element);
        }
        for item in &self.order {
            let child = match item {
                LayoutItem::Menuname { name, overrides } => {
                    let mut child = Element::with_text("Menuname", name.as_str());
                    overrides.write_to(&mut child);
                    child
                }
                LayoutItem::Filename(id) => Element::with_text("Filename", id.as_str()),
                LayoutItem::Separator => Element::new("Separator"),
                LayoutItem::Merge(kind) => Element::new("Merge").attr("type", kind.as_str()),
            };
            element.children.push(child);
        }
        element
    }

    /// Whether `order` places this submenu explicitly.
    #[must_use]
    pub fn names_menu(&self, menu: &str) -> bool {
        self.order
            .iter()
            .any(|item| matches!(item, LayoutItem::Menuname { name, .. } if name == menu))
    }

    /// Whether `order` places this entry explicitly.
    #[must_use]
    pub fn names_file(&self, desktop_file_id: &str) -> bool {
        self.order
            .iter()
            .any(|item| matches!(item, LayoutItem::Filename(id) if id == desktop_file_id))
    }
}
