//! Defines the [`Parser`] and [`Error`] types, and the logic for parsing posts
//! from the file system into memory.

use std::{
    collections::HashSet,
    fmt,
    fs::File,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use pulldown_cmark::{html, Options, Parser as MarkdownParser};
use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use tracing::debug;
use url::Url;
use walkdir::{DirEntry, WalkDir};

use crate::{
    category::Category,
    index::{page_url, Style},
    post::Post,
};

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// `posts_url` is the base URL for post pages. It's used to prefix post
    /// page URLs (i.e., the URL for a post is `{posts_url}/{post_id}.html`).
    posts_url: &'a Url,

    /// `categories_url` is the base URL for category pages. Each
    /// [`Category`] URL is derived from it with [`page_url`].
    categories_url: &'a Url,

    /// The category page style, which determines the shape of category URLs.
    style: Style,

    /// Whether category labels are slugified before grouping.
    slugify: bool,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(
        posts_url: &'a Url,
        categories_url: &'a Url,
        style: Style,
        slugify: bool,
    ) -> Parser<'a> {
        Parser {
            posts_url,
            categories_url,
            style,
            slugify,
        }
    }

    /// Searches a provided `source_directory` (recursively) for post files
    /// (extension `.md` or `.markdown`) and returns a list of [`Post`]
    /// objects sorted by date (most recent first). Unpublished posts are
    /// left out. Each post file must be structured as follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter with fields `title`, and optionally `date`,
    ///    `categories`, `category`, and `published`
    /// 3. Terminal frontmatter fence (`---`)
    /// 4. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// date: 2021-04-16
    /// categories: [greetings, meta]
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    ///
    /// `categories` may also be a whitespace-separated string
    /// (`categories: greetings meta`). If `date` is missing, it is taken
    /// from a `YYYY-MM-DD-` file name prefix.
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let walker = WalkDir::new(source_directory)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
        for result in walker {
            let entry = result?;
            if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                continue;
            }
            if let Some(post) = self.parse_post(entry.path())? {
                posts.push(post);
            }
        }

        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        debug!(
            directory = %source_directory.display(),
            posts = posts.len(),
            "parsed posts"
        );
        Ok(posts)
    }

    /// Parses a single [`Post`] from a source file. Returns `None` for
    /// unpublished posts.
    fn parse_post(&self, path: &Path) -> Result<Option<Post>> {
        use std::io::Read;
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|e| annotate(path, Error::Io(e)))?;
        self.parse_source(path, &contents)
            .map_err(|e| annotate(path, e))
    }

    /// Parses a [`Post`] from the `input` contents of the file at `path`.
    /// `path` only contributes the post ID and, if needed, the date.
    fn parse_source(&self, path: &Path, input: &str) -> Result<Option<Post>> {
        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        let frontmatter: Frontmatter =
            serde_yaml::from_str(&input[yaml_start..yaml_stop])?;
        if !frontmatter.published {
            debug!(path = %path.display(), "skipping unpublished post");
            return Ok(None);
        }

        let title = frontmatter.title.clone().ok_or(Error::MissingTitle)?;
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::InvalidFileName(path.to_owned()))?;
        let (file_date, id) = split_date_prefix(stem);
        let date = match &frontmatter.date {
            Some(date) => parse_date(date)?,
            None => file_date.ok_or(Error::MissingDate)?,
        };

        let mut categories = HashSet::new();
        for label in frontmatter.labels()? {
            if let Some(name) = self.category_name(&label)? {
                let url = page_url(self.style, self.categories_url, &name)
                    .ok_or_else(|| Error::NotABaseUrl(self.categories_url.clone()))?;
                categories.insert(Category { name, url });
            }
        }

        let mut options = Options::empty();
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        let mut body = String::new();
        html::push_html(&mut body, MarkdownParser::new_ext(&input[body_start..], options));

        Ok(Some(Post {
            title,
            url: self.posts_url.join(&format!("{}.html", id))?,
            id: id.to_owned(),
            date,
            categories,
            body,
        }))
    }

    /// Normalizes a raw category label. Empty labels yield `None`. Labels
    /// that would escape the categories directory are rejected.
    fn category_name(&self, label: &str) -> Result<Option<String>> {
        let label = label.trim();
        let name = match self.slugify {
            true => slug::slugify(label),
            false => label.to_owned(),
        };
        if name.is_empty() {
            return Ok(None);
        }
        if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
            return Err(Error::InvalidCategory(name));
        }
        Ok(Some(name))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_markdown(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => MARKDOWN_EXTENSIONS.iter().any(|known| *known == ext),
        None => false,
    }
}

fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
    const FENCE: &str = "---";
    const CLOSING_FENCE: &str = "\n---";
    if !input.starts_with(FENCE) {
        return Err(Error::FrontmatterMissingStartFence);
    }
    match input[FENCE.len()..].find(CLOSING_FENCE) {
        None => Err(Error::FrontmatterMissingEndFence),
        Some(offset) => Ok((
            FENCE.len(),                                // yaml_start
            FENCE.len() + offset,                       // yaml_stop
            FENCE.len() + offset + CLOSING_FENCE.len(), // body_start
        )),
    }
}

/// Splits a `YYYY-MM-DD-` prefix off a file stem. Returns the parsed date (if
/// any) and the remainder, which becomes the post ID. A stem that is only a
/// date keeps its full name as the ID.
fn split_date_prefix(stem: &str) -> (Option<NaiveDate>, &str) {
    const DATE_LEN: usize = "YYYY-MM-DD".len();
    let (prefix, rest) = match (stem.get(..DATE_LEN), stem.get(DATE_LEN..)) {
        (Some(prefix), Some(rest)) => (prefix, rest),
        _ => return (None, stem),
    };
    let id = match rest {
        "" => stem,
        rest if rest.len() > 1 && rest.starts_with('-') => &rest[1..],
        _ => return (None, stem),
    };
    match NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
        Ok(date) => (Some(date), id),
        Err(_) => (None, stem),
    }
}

/// Parses a frontmatter date. Anything after the `YYYY-MM-DD` part (such as a
/// time or an offset) is ignored.
fn parse_date(value: &str) -> Result<NaiveDate> {
    let day = value.split_whitespace().next().unwrap_or("");
    let day = day.split('T').next().unwrap_or(day);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|err| Error::InvalidDate {
        value: value.to_owned(),
        err,
    })
}

fn annotate(path: &Path, err: Error) -> Error {
    Error::Annotated(format!("parsing post `{}`", path.display()), Box::new(err))
}

#[derive(Deserialize, Clone)]
struct Frontmatter {
    /// The title of the post.
    #[serde(default, alias = "Title")]
    pub title: Option<String>,

    /// The date of the post.
    #[serde(default, alias = "Date")]
    pub date: Option<String>,

    /// The categories associated with the post: a list of labels or a
    /// whitespace-separated string.
    #[serde(default, alias = "Categories")]
    pub categories: Option<serde_yaml::Value>,

    /// A single category, merged with `categories`.
    #[serde(default, alias = "Category")]
    pub category: Option<serde_yaml::Value>,

    /// Whether the post is published.
    #[serde(default = "published_default")]
    pub published: bool,
}

impl Frontmatter {
    /// Collects the raw labels from `categories` and `category`. Numbers and
    /// booleans are taken as written (`categories: [2021, rust]`).
    fn labels(&self) -> Result<Vec<String>> {
        let mut labels = Vec::new();
        match &self.categories {
            None | Some(YamlValue::Null) => {}
            Some(YamlValue::String(words)) => {
                labels.extend(words.split_whitespace().map(str::to_owned))
            }
            Some(YamlValue::Sequence(items)) => {
                for item in items {
                    if let Some(label) = scalar_label(item)? {
                        labels.push(label);
                    }
                }
            }
            Some(other) => labels.extend(scalar_label(other)?),
        }
        if let Some(category) = &self.category {
            labels.extend(scalar_label(category)?);
        }
        Ok(labels)
    }
}

// Turns a YAML scalar into a label. Null yields `None`; lists and maps are
// rejected.
fn scalar_label(value: &YamlValue) -> Result<Option<String>> {
    match value {
        YamlValue::Null => Ok(None),
        YamlValue::String(s) => Ok(Some(s.clone())),
        YamlValue::Number(n) => Ok(Some(n.to_string())),
        YamlValue::Bool(b) => Ok(Some(b.to_string())),
        other => Err(Error::InvalidCategory(format!("{:?}", other))),
    }
}

fn published_default() -> bool {
    true
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a post source file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the frontmatter date isn't a `YYYY-MM-DD` date.
    InvalidDate {
        value: String,
        err: chrono::ParseError,
    },

    /// Returned when neither the frontmatter nor the file name has a date.
    MissingDate,

    /// Returned when a published post has no `title` in its frontmatter.
    MissingTitle,

    /// Returned for category labels that can't be used as a path segment.
    InvalidCategory(String),

    /// Returned when the categories URL can't have path segments.
    NotABaseUrl(Url),

    /// Returned when there is a problem parsing URLs.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned when a source file name isn't valid UTF-8.
    InvalidFileName(PathBuf),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::InvalidDate { value, err } => {
                write!(f, "invalid date `{}`: {}", value, err)
            }
            Error::MissingDate => write!(
                f,
                "missing `date` in frontmatter and no `YYYY-MM-DD-` file name prefix"
            ),
            Error::MissingTitle => write!(f, "missing `title` in frontmatter"),
            Error::InvalidCategory(name) => {
                write!(f, "invalid category `{}`", name)
            }
            Error::NotABaseUrl(url) => {
                write!(f, "categories URL `{}` cannot be a base", url)
            }
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::InvalidFileName(path) => {
                write!(f, "invalid file name: {:?}", path)
            }
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidDate { value: _, err } => Some(err),
            Error::MissingDate => None,
            Error::MissingTitle => None,
            Error::InvalidCategory(_) => None,
            Error::NotABaseUrl(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::InvalidFileName(_) => None,
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for directory traversal.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn urls() -> (Url, Url) {
        (
            Url::parse("https://example.com/posts/").unwrap(),
            Url::parse("https://example.com/categories/").unwrap(),
        )
    }

    fn names(post: &Post) -> Vec<&str> {
        let mut names: Vec<&str> = post.categories.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn test_parse_posts() -> Result<()> {
        let (posts_url, categories_url) = urls();
        let parser = Parser::new(&posts_url, &categories_url, Style::Nested, false);
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("2021-01-01-first.md"),
            "---\ntitle: First\ncategories: [rust, meta]\n---\nHello <!-- more --> world",
        )?;
        fs::create_dir(dir.path().join("nested"))?;
        fs::write(
            dir.path().join("nested/second.markdown"),
            "---\nTitle: Second\nDate: 2021-02-01 10:00:00 +0000\ncategories: rust go\ncategory: misc\n---\n# Hi",
        )?;
        fs::write(
            dir.path().join("2021-01-03-empty.md"),
            "---\ntitle: Empty\ncategories:\n---\n",
        )?;
        fs::write(dir.path().join("notes.txt"), "not a post")?;
        fs::create_dir(dir.path().join(".drafts"))?;
        fs::write(dir.path().join(".drafts/draft.md"), "no frontmatter")?;

        let posts = parser.parse_posts(dir.path())?;

        assert_eq!(3, posts.len());
        let second = &posts[0];
        assert_eq!("second", second.id);
        assert_eq!("Second", second.title);
        assert_eq!(NaiveDate::from_ymd(2021, 2, 1), second.date);
        assert_eq!(vec!["go", "misc", "rust"], names(second));
        assert_eq!("https://example.com/posts/second.html", second.url.as_str());
        assert_eq!("<h1>Hi</h1>\n", second.body);

        assert_eq!("empty", posts[1].id);
        assert!(posts[1].categories.is_empty());

        let first = &posts[2];
        assert_eq!("first", first.id);
        assert_eq!(NaiveDate::from_ymd(2021, 1, 1), first.date);
        assert_eq!(vec!["meta", "rust"], names(first));
        let rust = first.categories.iter().find(|c| c.name == "rust").unwrap();
        assert_eq!("https://example.com/categories/rust/index.html", rust.url.as_str());
        Ok(())
    }

    #[test]
    fn test_parse_source_unpublished() -> Result<()> {
        let (posts_url, categories_url) = urls();
        let parser = Parser::new(&posts_url, &categories_url, Style::Nested, false);
        let post = parser.parse_source(
            Path::new("2021-01-01-draft.md"),
            "---\ntitle: Draft\npublished: false\n---\nbody",
        )?;
        assert!(post.is_none());
        Ok(())
    }

    #[test]
    fn test_parse_source_slugifies_categories() -> Result<()> {
        let (posts_url, categories_url) = urls();
        let parser = Parser::new(&posts_url, &categories_url, Style::Flat, true);
        let post = parser
            .parse_source(
                Path::new("2021-01-01-slugs.md"),
                "---\ntitle: Slugs\ncategories: [Rust Lang, rust-lang, '  ', '!!!']\n---\n",
            )?
            .unwrap();
        assert_eq!(vec!["rust-lang"], names(&post));
        let category = post.categories.iter().next().unwrap();
        assert_eq!("https://example.com/categories/rust-lang.html", category.url.as_str());
        Ok(())
    }

    #[test]
    fn test_parse_source_scalar_categories() -> Result<()> {
        let (posts_url, categories_url) = urls();
        let parser = Parser::new(&posts_url, &categories_url, Style::Nested, false);
        let path = Path::new("2021-01-01-years.md");

        let post = parser
            .parse_source(path, "---\ntitle: Years\ncategories: [2021, rust, true]\n---\n")?
            .unwrap();
        assert_eq!(vec!["2021", "rust", "true"], names(&post));

        let post = parser
            .parse_source(path, "---\ntitle: Years\ncategories: 2021\ncategory: 7\n---\n")?
            .unwrap();
        assert_eq!(vec!["2021", "7"], names(&post));

        assert!(matches!(
            parser.parse_source(path, "---\ntitle: Nested\ncategories: [[a, b]]\n---\n"),
            Err(Error::InvalidCategory(_))
        ));
        Ok(())
    }

    #[test]
    fn test_parse_source_missing_title() -> Result<()> {
        let (posts_url, categories_url) = urls();
        let parser = Parser::new(&posts_url, &categories_url, Style::Nested, false);
        let path = Path::new("2021-01-01-untitled.md");
        assert!(matches!(
            parser.parse_source(path, "---\ncategories: [x]\n---\n"),
            Err(Error::MissingTitle)
        ));
        // drafts are skipped before the title is checked
        assert!(parser
            .parse_source(path, "---\npublished: false\n---\n")?
            .is_none());
        Ok(())
    }

    #[test]
    fn test_parse_source_rejects_path_categories() {
        let (posts_url, categories_url) = urls();
        let parser = Parser::new(&posts_url, &categories_url, Style::Nested, false);
        for label in &["../escape", "a/b", ".."] {
            let source = format!("---\ntitle: Bad\ncategories: ['{}']\n---\n", label);
            match parser.parse_source(Path::new("2021-01-01-bad.md"), &source) {
                Err(Error::InvalidCategory(name)) => assert_eq!(*label, name),
                Err(e) => panic!("wanted an invalid category error, got: {}", e),
                Ok(_) => panic!("wanted an invalid category error for {}", label),
            }
        }
    }

    #[test]
    fn test_parse_source_missing_date() {
        let (posts_url, categories_url) = urls();
        let parser = Parser::new(&posts_url, &categories_url, Style::Nested, false);
        let result = parser.parse_source(Path::new("undated.md"), "---\ntitle: Undated\n---\n");
        assert!(matches!(result, Err(Error::MissingDate)));
    }

    #[test]
    fn test_parse_source_missing_fences() {
        let (posts_url, categories_url) = urls();
        let parser = Parser::new(&posts_url, &categories_url, Style::Nested, false);
        let path = Path::new("2021-01-01-x.md");
        assert!(matches!(
            parser.parse_source(path, "title: x\n"),
            Err(Error::FrontmatterMissingStartFence)
        ));
        assert!(matches!(
            parser.parse_source(path, "---\ntitle: x\n"),
            Err(Error::FrontmatterMissingEndFence)
        ));
    }

    #[test]
    fn test_split_date_prefix() {
        assert_eq!(
            (Some(NaiveDate::from_ymd(2021, 4, 16)), "hello-world"),
            split_date_prefix("2021-04-16-hello-world")
        );
        assert_eq!(
            (Some(NaiveDate::from_ymd(2021, 4, 16)), "2021-04-16"),
            split_date_prefix("2021-04-16")
        );
        assert_eq!((None, "2021-13-01-bad"), split_date_prefix("2021-13-01-bad"));
        assert_eq!((None, "hello"), split_date_prefix("hello"));
    }

    #[test]
    fn test_parse_date() -> Result<()> {
        assert_eq!(NaiveDate::from_ymd(2021, 4, 16), parse_date("2021-04-16")?);
        assert_eq!(
            NaiveDate::from_ymd(2021, 4, 16),
            parse_date("2021-04-16 08:30:00 -0500")?
        );
        assert_eq!(NaiveDate::from_ymd(2021, 4, 16), parse_date("2021-04-16T08:30:00Z")?);
        assert!(parse_date("April 16").is_err());
        Ok(())
    }
}
