//! Loads the project configuration from a `catgen.yaml` file.

use crate::index::Style;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "catgen.yaml";

#[derive(Deserialize)]
struct Project {
    site_root: Url,

    #[serde(default = "default_posts_directory")]
    posts_directory: PathBuf,

    #[serde(default = "default_layouts_directory")]
    layouts_directory: PathBuf,

    #[serde(default)]
    includes: Vec<PathBuf>,

    #[serde(default = "default_category_directory")]
    category_directory: String,

    #[serde(default)]
    style: Style,

    #[serde(default)]
    slugify: bool,
}

fn default_posts_directory() -> PathBuf {
    PathBuf::from("_posts")
}

fn default_layouts_directory() -> PathBuf {
    PathBuf::from("_layouts")
}

fn default_category_directory() -> String {
    String::from("categories")
}

/// The resolved project configuration. All directories except
/// `category_directory` are absolute (or relative to the working directory,
/// if the project root was given that way).
#[derive(Debug, Clone)]
pub struct Config {
    /// The directory containing `catgen.yaml`.
    pub root_directory: PathBuf,

    /// The site's base URL, always with a trailing slash.
    pub site_root: Url,

    /// The base URL for post pages (`{site_root}/posts/`).
    pub posts_url: Url,

    /// The base URL for category pages (`{site_root}/{category_directory}/`).
    pub categories_url: Url,

    /// The directory searched for post sources.
    pub posts_directory: PathBuf,

    /// The directory holding the layout templates.
    pub layouts_directory: PathBuf,

    /// Partial templates prepended to every layout.
    pub includes: Vec<PathBuf>,

    /// Where category pages go, relative to the output directory.
    pub category_directory: PathBuf,

    /// The category page style.
    pub style: Style,

    /// Whether category labels are slugified.
    pub slugify: bool,
}

impl Config {
    /// Finds `catgen.yaml` in `dir` or the nearest ancestor that has one and
    /// loads it.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        for ancestor in dir.ancestors() {
            let path = ancestor.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
        }
        Err(Error::NotFound(dir.to_owned()))
    }

    /// Loads a project file. Relative directories are resolved against the
    /// directory containing it.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = serde_yaml::from_reader(file)?;
        let root_directory = match path.parent() {
            Some(parent) => parent.to_owned(),
            None => PathBuf::from("."),
        };
        Config::from_project(root_directory, project)
    }

    /// Parses project YAML as though it were read from a project file in
    /// `root_directory`.
    pub fn from_yaml(root_directory: &Path, yaml: &str) -> Result<Config> {
        Config::from_project(root_directory.to_owned(), serde_yaml::from_str(yaml)?)
    }

    fn from_project(root_directory: PathBuf, project: Project) -> Result<Config> {
        let category_directory = project.category_directory.trim_matches('/');
        if category_directory.is_empty()
            || category_directory
                .split('/')
                .any(|part| part.is_empty() || part == "." || part == "..")
        {
            return Err(Error::InvalidCategoryDirectory(project.category_directory));
        }

        let mut site_root = project.site_root;
        if !site_root.path().ends_with('/') {
            let path = format!("{}/", site_root.path());
            site_root.set_path(&path);
        }
        let posts_url = site_root.join("posts/")?;
        let categories_url = site_root.join(&format!("{}/", category_directory))?;
        let layouts_directory = root_directory.join(&project.layouts_directory);

        Ok(Config {
            posts_directory: root_directory.join(&project.posts_directory),
            includes: project
                .includes
                .iter()
                .map(|relpath| layouts_directory.join(relpath))
                .collect(),
            layouts_directory,
            category_directory: PathBuf::from(category_directory),
            style: project.style,
            slugify: project.slugify,
            site_root,
            posts_url,
            categories_url,
            root_directory,
        })
    }
}

/// The result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading the project configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when no ancestor of the directory has a `catgen.yaml`.
    NotFound(PathBuf),

    /// Returned for I/O problems while opening the project file.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid YAML or is missing fields.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the categories directory is empty or escapes the output
    /// directory.
    InvalidCategoryDirectory(String),

    /// Returned when a derived URL can't be built from `site_root`.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound(dir) => write!(
                f,
                "Could not find `{}` in `{}` or any parent directory",
                PROJECT_FILE,
                dir.display()
            ),
            Error::Open { path, err } => {
                write!(f, "Opening project file '{}': {}", path.display(), err)
            }
            Error::DeserializeYaml(err) => write!(f, "Loading configuration: {}", err),
            Error::InvalidCategoryDirectory(dir) => {
                write!(f, "invalid category_directory `{}`", dir)
            }
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotFound(_) => None,
            Error::Open { path: _, err } => Some(err),
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidCategoryDirectory(_) => None,
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}
