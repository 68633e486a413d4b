//! Defines the [`Layouts`] trait, through which category pages are rendered,
//! and [`LayoutRegistry`], its implementation on top of [`gtmpl`] templates
//! loaded from a layouts directory.

use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Looks up and renders named layouts.
pub trait Layouts {
    /// The error returned when rendering fails.
    type Error: std::error::Error;

    /// Returns whether a layout called `name` is registered.
    fn has_layout(&self, name: &str) -> bool;

    /// Applies the layout called `name` to `context`.
    fn render(&self, name: &str, context: Value) -> std::result::Result<String, Self::Error>;
}

/// A set of parsed layouts keyed by name (the layout file's stem, e.g.,
/// `post_with_categories` for `post_with_categories.html`).
pub struct LayoutRegistry {
    layouts: HashMap<String, Template>,
}

impl LayoutRegistry {
    /// Loads every `*.html` file in `directory` as a layout. Each layout is
    /// parsed from the contents of `includes` (in order) followed by the
    /// layout file itself, so layouts can share `{{ define }}` blocks. A
    /// missing directory yields an empty registry.
    pub fn load<P: AsRef<Path>>(directory: &Path, includes: &[P]) -> Result<LayoutRegistry> {
        let mut prelude = String::new();
        for include in includes {
            read_template_file(include.as_ref(), &mut prelude)?;
        }

        let entries = match std::fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(directory = %directory.display(), "layouts directory not found");
                return Ok(LayoutRegistry {
                    layouts: HashMap::new(),
                });
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let includes: Vec<&Path> = includes.iter().map(|include| include.as_ref()).collect();
        let mut layouts = HashMap::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "html") {
                continue;
            }
            // partials are part of every layout, not layouts themselves
            if includes.iter().any(|include| *include == path) {
                continue;
            }
            let name = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(name) => name.to_owned(),
                None => continue,
            };

            let mut contents = prelude.clone();
            read_template_file(&path, &mut contents)?;
            let mut template = Template::default();
            template
                .parse(&contents)
                .map_err(|err| Error::ParseTemplate {
                    path: path.clone(),
                    err,
                })?;
            debug!(layout = %name, path = %path.display(), "loaded layout");
            layouts.insert(name, template);
        }

        Ok(LayoutRegistry { layouts })
    }

    /// Returns the registered layout names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.layouts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Layouts for LayoutRegistry {
    type Error = Error;

    fn has_layout(&self, name: &str) -> bool {
        self.layouts.contains_key(name)
    }

    fn render(&self, name: &str, context: Value) -> Result<String> {
        let template = self
            .layouts
            .get(name)
            .ok_or_else(|| Error::UnknownLayout(name.to_owned()))?;
        let render_err = |err: String| Error::Render {
            layout: name.to_owned(),
            err,
        };
        let context = Context::from(context).map_err(render_err)?;
        let mut output: Vec<u8> = Vec::new();
        template.execute(&mut output, &context).map_err(render_err)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

// Appends the contents of `path` to `contents`, separated by a space.
fn read_template_file(path: &Path, contents: &mut String) -> Result<()> {
    use std::io::Read;
    File::open(path)
        .and_then(|mut file| file.read_to_string(contents))
        .map_err(|err| Error::OpenTemplateFile {
            path: path.to_owned(),
            err,
        })?;
    contents.push(' ');
    Ok(())
}

/// The result of a fallible layout operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading or rendering layouts.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate { path: PathBuf, err: String },

    /// Returned when templating a page fails, e.g., because the layout
    /// refers to a template that was never defined.
    Render { layout: String, err: String },

    /// Returned when asked to render a layout that isn't registered.
    UnknownLayout(String),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate { path, err } => {
                write!(f, "Parsing template file '{}': {}", path.display(), err)
            }
            Error::Render { layout, err } => {
                write!(f, "Rendering layout '{}': {}", layout, err)
            }
            Error::UnknownLayout(name) => write!(f, "Unknown layout '{}'", name),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate { .. } => None,
            Error::Render { .. } => None,
            Error::UnknownLayout(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
