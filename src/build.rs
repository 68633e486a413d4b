//! Exports the [`build_site`] function which stitches together one generation
//! pass: parsing the posts ([`crate::parser`]), loading the layouts
//! ([`crate::layout`]), building the category indices ([`crate::index`]), and
//! writing them out ([`crate::write`]).

use crate::config::{Config, Error as ConfigError};
use crate::index::{write_all, Builder};
use crate::layout::{Error as LayoutError, LayoutRegistry};
use crate::parser::{Error as ParseError, Parser as PostParser};
use crate::write::DirectorySink;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Summarizes a completed generation pass.
#[derive(Debug, Default)]
pub struct Report {
    /// The number of published posts that were parsed.
    pub posts: usize,

    /// The category pages that were written, in category order.
    pub pages: Vec<PathBuf>,
}

/// Builds the category pages for the project described by `config` into
/// `output_directory`. Existing files at the generated paths are overwritten;
/// nothing else in `output_directory` is touched.
pub fn build_site(config: &Config, output_directory: &Path) -> Result<Report> {
    let post_parser = PostParser::new(
        &config.posts_url,
        &config.categories_url,
        config.style,
        config.slugify,
    );

    // collect all posts
    let posts = post_parser.parse_posts(&config.posts_directory)?;

    let layouts = LayoutRegistry::load(&config.layouts_directory, &config.includes)?;

    let builder = Builder {
        layouts: &layouts,
        style: config.style,
        category_directory: &config.category_directory,
    };
    let indices = builder.build(&posts)?;

    let mut sink = DirectorySink::new(output_directory);
    write_all(&indices, &mut sink).map_err(Error::Write)?;

    info!(
        posts = posts.len(),
        categories = indices.len(),
        output = %output_directory.display(),
        "built category pages"
    );
    Ok(Report {
        posts: posts.len(),
        pages: sink.written().to_vec(),
    })
}

/// Finds the project configuration from `project_directory` (see
/// [`Config::from_directory`]) and calls [`build_site`]. When
/// `output_directory` is `None`, pages go to `_site` in the project root.
pub fn build_project(
    project_directory: &Path,
    output_directory: Option<&Path>,
) -> Result<Report> {
    let config = Config::from_directory(project_directory)?;
    let output_directory = match output_directory {
        Some(dir) => dir.to_owned(),
        None => config.root_directory.join("_site"),
    };
    build_site(&config, &output_directory)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during configuration
/// loading, parsing, loading or rendering layouts, and writing pages.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors loading the project configuration.
    Config(ConfigError),

    /// Returned for errors parsing posts.
    Parse(ParseError),

    /// Returned for errors loading or rendering layouts.
    Layout(LayoutError),

    /// Returned for I/O problems writing category pages.
    Write(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(err) => err.fmt(f),
            Error::Parse(err) => err.fmt(f),
            Error::Layout(err) => err.fmt(f),
            Error::Write(err) => write!(f, "Writing category page: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(err) => Some(err),
            Error::Parse(err) => Some(err),
            Error::Layout(err) => Some(err),
            Error::Write(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    /// Converts [`ConfigError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ConfigError) -> Error {
        Error::Config(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<LayoutError> for Error {
    /// Converts [`LayoutError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: LayoutError) -> Error {
        Error::Layout(err)
    }
}
