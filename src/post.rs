//! Defines the [`Post`] type, the content item that category indices are
//! built from. See [`Post::summarize`] for details on how posts are converted
//! into template values.

use crate::category::Category;
use chrono::NaiveDate;
use gtmpl::Value;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Marks the end of a post's summary. Everything before the first occurrence
/// is shown on index pages.
const FOLD_TAG: &str = "<!-- more -->";

/// Represents a published blog post.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The post's identifier: the source file stem without any `YYYY-MM-DD-`
    /// prefix.
    pub id: String,

    /// The title of the post.
    pub title: String,

    /// The publication date of the post.
    pub date: NaiveDate,

    /// The URL of the post's own page.
    pub url: Url,

    /// The categories the post belongs to.
    pub categories: HashSet<Category>,

    /// The post's body, already rendered to HTML.
    pub body: String,
}

impl Post {
    /// Returns the portion of the body before the fold tag, and whether the
    /// body was actually folded.
    pub fn summary(&self) -> (&str, bool) {
        match self.body.find(FOLD_TAG) {
            Some(i) => (&self.body[..i], true),
            None => (&self.body, false),
        }
    }

    /// Converts a [`Post`] into a template value for index pages. The body is
    /// replaced by `summary` and `summarized` is true when the post had more
    /// content past the fold.
    pub fn summarize(&self) -> Value {
        let (summary, summarized) = self.summary();
        let mut m = self.fields();
        m.insert("summary".to_owned(), Value::String(summary.to_owned()));
        m.insert("summarized".to_owned(), Value::Bool(summarized));
        Value::Object(m)
    }

    fn fields(&self) -> HashMap<String, Value> {
        // sort for stable rendering; `categories` is a set
        let mut categories: Vec<&Category> = self.categories.iter().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("id".to_owned(), Value::String(self.id.clone()));
        m.insert("title".to_owned(), Value::String(self.title.clone()));
        m.insert(
            "date".to_owned(),
            Value::String(self.date.format("%Y-%m-%d").to_string()),
        );
        m.insert("url".to_owned(), Value::String(self.url.to_string()));
        m.insert(
            "categories".to_owned(),
            Value::Array(categories.into_iter().map(Value::from).collect()),
        );
        m
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn post(body: &str) -> Post {
        Post {
            id: "hello".to_owned(),
            title: "Hello".to_owned(),
            date: NaiveDate::from_ymd(2021, 4, 16),
            url: Url::parse("https://example.com/posts/hello.html").unwrap(),
            categories: HashSet::new(),
            body: body.to_owned(),
        }
    }

    #[test]
    fn test_summary_folds_at_marker() {
        let p = post("<p>intro</p><!-- more --><p>rest</p>");
        assert_eq!(("<p>intro</p>", true), p.summary());
    }

    #[test]
    fn test_summary_without_marker() {
        let p = post("<p>all of it</p>");
        assert_eq!(("<p>all of it</p>", false), p.summary());
    }

    #[test]
    fn test_summarize_fields() {
        let p = post("<p>intro</p><!-- more --><p>rest</p>");
        let m = match p.summarize() {
            Value::Object(m) => m,
            _ => panic!("wanted an object"),
        };
        assert!(matches!(m.get("date"), Some(Value::String(d)) if d == "2021-04-16"));
        assert!(matches!(m.get("summarized"), Some(Value::Bool(true))));
        assert!(!m.contains_key("body"));
    }
}
