//! Groups [`Post`]s by category and renders one [`CategoryIndex`] per
//! category. The [`Builder`] never touches the filesystem: rendering is
//! delegated to a [`Layouts`] implementation and writing to a [`Sink`].

use crate::layout::Layouts;
use crate::post::Post;
use crate::write::Sink;
use gtmpl::Value;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// The shape of the generated category pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// One directory per category: `{category}/index.html`, rendered with the
    /// `post_with_categories` layout.
    Nested,

    /// One file per category: `{category}.html`, rendered with the `category`
    /// layout.
    Flat,
}

impl Default for Style {
    fn default() -> Self {
        Style::Nested
    }
}

impl Style {
    /// The name of the layout required to render pages in this style.
    pub fn layout(self) -> &'static str {
        match self {
            Style::Nested => "post_with_categories",
            Style::Flat => "category",
        }
    }

    /// The page location for `category` relative to the categories
    /// directory (or the categories URL).
    pub fn file_name(self, category: &str) -> String {
        match self {
            Style::Nested => format!("{}/index.html", category),
            Style::Flat => format!("{}.html", category),
        }
    }
}

/// Derives the output path of a category page from the label alone.
pub fn output_path(style: Style, category_directory: &Path, category: &str) -> PathBuf {
    category_directory.join(style.file_name(category))
}

/// Derives the public URL of a category page from the categories base URL.
/// The label is percent-encoded as a single path segment. Returns `None` if
/// `categories_url` can't be a base (e.g., `mailto:` URLs).
pub fn page_url(style: Style, categories_url: &Url, category: &str) -> Option<Url> {
    let mut url = categories_url.clone();
    {
        let mut segments = url.path_segments_mut().ok()?;
        segments.pop_if_empty();
        match style {
            Style::Nested => {
                segments.push(category).push("index.html");
            }
            Style::Flat => {
                segments.push(&format!("{}.html", category));
            }
        }
    }
    Some(url)
}

/// The rendered index page for a single category.
#[derive(Debug)]
pub struct CategoryIndex<'a> {
    /// The category label. Unique within a single [`Builder::build`]
    /// result.
    pub category: String,

    /// Where the page is written, relative to the output directory.
    pub output_path: PathBuf,

    /// The public URL of the page.
    pub url: Url,

    /// The posts that listed this category, newest first.
    pub posts: Vec<&'a Post>,

    /// The rendered page.
    pub body: String,
}

/// Builds [`CategoryIndex`] pages from a set of [`Post`]s.
pub struct Builder<'a, L: ?Sized> {
    /// Renders the pages and tells us whether the layout exists at all.
    pub layouts: &'a L,

    /// The page shape, which also selects the layout.
    pub style: Style,

    /// The directory (relative to the output directory) that holds the
    /// category pages, e.g., `categories`.
    pub category_directory: &'a Path,
}

impl<'a, L: Layouts + ?Sized> Builder<'a, L> {
    /// Groups `posts` by category and renders one page per category. Returns
    /// an empty map when the style's layout isn't registered. The first
    /// rendering error aborts the build and is returned as-is.
    pub fn build<'p>(
        &self,
        posts: &'p [Post],
    ) -> Result<BTreeMap<String, CategoryIndex<'p>>, L::Error> {
        let layout = self.style.layout();
        if !self.layouts.has_layout(layout) {
            info!(layout, "layout not found; skipping category pages");
            return Ok(BTreeMap::new());
        }

        let groups = group_by_category(posts);

        let mut indices = BTreeMap::new();
        for (category, (url, posts)) in groups {
            debug!(%category, posts = posts.len(), "rendering category page");
            let body = self
                .layouts
                .render(layout, context(&category, &url, &posts))?;
            indices.insert(
                category.clone(),
                CategoryIndex {
                    output_path: output_path(self.style, self.category_directory, &category),
                    category,
                    url,
                    posts,
                    body,
                },
            );
        }
        Ok(indices)
    }
}

/// Writes every index to `sink`, stopping at the first failure.
pub fn write_all<S: Sink + ?Sized>(
    indices: &BTreeMap<String, CategoryIndex>,
    sink: &mut S,
) -> std::io::Result<()> {
    for index in indices.values() {
        sink.write(&index.output_path, index.body.as_bytes())?;
    }
    Ok(())
}

/// Maps each category label to its page URL and the posts that list it,
/// newest first.
fn group_by_category(posts: &[Post]) -> BTreeMap<String, (Url, Vec<&Post>)> {
    let mut groups: BTreeMap<String, (Url, Vec<&Post>)> = BTreeMap::new();
    for post in posts {
        for category in post.categories.iter() {
            groups
                .entry(category.name.clone())
                .or_insert_with(|| (category.url.clone(), Vec::new()))
                .1
                .push(post);
        }
    }
    for (_, posts) in groups.values_mut() {
        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
    }
    groups
}

/// Builds the template context for a category page: `category`, `url`, and
/// `items` (the post summaries).
fn context(category: &str, url: &Url, posts: &[&Post]) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("category".to_owned(), Value::String(category.to_owned()));
    m.insert("url".to_owned(), Value::String(url.to_string()));
    m.insert(
        "items".to_owned(),
        Value::Array(posts.iter().map(|p| p.summarize()).collect()),
    );
    Value::Object(m)
}
