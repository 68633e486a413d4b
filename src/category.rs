//! Defines the [`Category`] type, which represents a [`crate::post::Post`]
//! category.

use gtmpl::Value;
use std::hash::{Hash, Hasher};
use url::Url;

/// Represents a [`crate::post::Post`] category. The `url` field is filled in by
/// the [`crate::parser::Parser`] from the categories base URL, the category
/// name, and the configured [`crate::index::Style`].
#[derive(Clone, Debug)]
pub struct Category {
    /// The category's label. When slugification is enabled this is already
    /// slugified, so e.g., `Rust Lang` and `rust-lang` resolve to the same
    /// value.
    pub name: String,

    /// The URL for the category's index page. Given a `categories_url`, this
    /// looks like `{categories_url}/{name}/index.html` or
    /// `{categories_url}/{name}.html` depending on the style.
    pub url: Url,
}

impl Hash for Category {
    /// Implements [`Hash`] for [`Category`] by delegating directly to the
    /// `name` field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialEq for Category {
    /// Implements [`PartialEq`] and [`Eq`] for [`Category`] by delegating
    /// directly to the `name` field.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Category {}

impl From<&Category> for Value {
    /// Converts [`Category`]s into [`Value`]s for templating.
    fn from(c: &Category) -> Value {
        use std::collections::HashMap;
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("category".to_owned(), Value::String(c.name.clone()));
        m.insert("url".to_owned(), Value::String(c.url.to_string()));
        Value::Object(m)
    }
}
