//! Route template compilation.
//!
//! A template such as `/users/:id/posts/:post` compiles into an anchored
//! regular expression where each `:name` placeholder becomes `([^/]+)` and
//! every other character is matched literally. Parameter names are recorded
//! in declaration order, so capture `i` always belongs to `param_names()[i]`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":([A-Za-z0-9_]+)").expect("placeholder pattern is valid")
});

/// A compiled route template. Immutable once built.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    regex: Regex,
    param_names: Vec<String>,
}

impl PathPattern {
    /// Compiles `template` into a full-path matcher.
    ///
    /// ```rust
    /// use spry::PathPattern;
    ///
    /// let pattern = PathPattern::compile("/users/:id").unwrap();
    /// assert_eq!(pattern.param_names(), ["id"]);
    /// assert_eq!(pattern.captures("/users/42"), Some(vec!["42".to_owned()]));
    /// assert_eq!(pattern.captures("/users/42/posts"), None);
    /// ```
    pub fn compile(template: &str) -> Result<Self, Error> {
        let mut source = String::with_capacity(template.len() + 8);
        let mut param_names = Vec::new();
        let mut last = 0;

        source.push('^');
        for caps in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            source.push_str(&regex::escape(&template[last..whole.start()]));
            source.push_str("([^/]+)");
            param_names.push(name.as_str().to_owned());
            last = whole.end();
        }
        source.push_str(&regex::escape(&template[last..]));
        source.push('$');

        let regex = Regex::new(&source).map_err(|source| Error::InvalidRoute {
            template: template.to_owned(),
            source,
        })?;

        Ok(Self { template: template.to_owned(), regex, param_names })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names, left to right.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Tests `path` (query string already removed) against the template.
    ///
    /// Returns one captured value per placeholder, in declaration order, or
    /// `None` when the whole path does not match.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(path)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_owned()))
                .collect(),
        )
    }
}
