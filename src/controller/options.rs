//! Controller options and their stored representation.
//!
//! Options live in the option store under these keys:
//!
//! | Key | Type | Default |
//! |-----|------|---------|
//! | `onlyIfURIMatchesRegEx` | regex string | `^.+$` |
//! | `showFileChooserDialog` | bool | `true` |
//! | `resultNameSuffix` | string | `-result-utc()` |
//! | `ifConflictThen` | `uniquify` \| `overwrite` | `uniquify` |
//! | `respectHTMLIsNotXML` | bool | `true` |
//!
//! # Example
//!
//! ```
//! use download_serialized_dom::controller::Options;
//!
//! let options = Options::new()
//!     .with_pattern(r"^https://")?
//!     .with_result_name_suffix("-saved")
//!     .with_show_file_chooser(false);
//!
//! assert!(options.matches("https://example.com/"));
//! assert!(!options.matches("http://example.com/"));
//! # Ok::<(), download_serialized_dom::Error>(())
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::browser::{ConflictAction, StorageChange};
use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Store key of the URL pattern.
pub const KEY_PATTERN: &str = "onlyIfURIMatchesRegEx";

/// Store key of the save-as flag.
pub const KEY_SHOW_FILE_CHOOSER: &str = "showFileChooserDialog";

/// Store key of the filename suffix.
pub const KEY_RESULT_NAME_SUFFIX: &str = "resultNameSuffix";

/// Store key of the conflict policy.
pub const KEY_IF_CONFLICT_THEN: &str = "ifConflictThen";

/// Store key of the plain-markup permission.
pub const KEY_RESPECT_HTML_IS_NOT_XML: &str = "respectHTMLIsNotXML";

/// Pattern matching every non-empty URL.
pub const DEFAULT_PATTERN: &str = "^.+$";

/// Suffix inserted before the extension by default.
pub const DEFAULT_RESULT_NAME_SUFFIX: &str = "-result-utc()";

// ============================================================================
// UrlPattern
// ============================================================================

/// A compiled URL predicate that remembers its source text.
#[derive(Clone)]
pub struct UrlPattern {
    source: String,
    regex: Regex,
}

impl UrlPattern {
    /// Compiles `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`](crate::Error::InvalidPattern) if the
    /// regex does not compile.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let regex = Regex::new(&source)?;
        Ok(Self { source, regex })
    }

    /// Returns the pattern text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if `url` contains a match.
    #[inline]
    #[must_use]
    pub fn is_match(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}

impl Default for UrlPattern {
    fn default() -> Self {
        Self {
            source: DEFAULT_PATTERN.to_string(),
            regex: Regex::new(DEFAULT_PATTERN).expect("Is a valid regex"),
        }
    }
}

impl PartialEq for UrlPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for UrlPattern {}

impl fmt::Debug for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UrlPattern").field(&self.source).finish()
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ============================================================================
// Options
// ============================================================================

/// One immutable snapshot of the controller options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Pages the page action is shown on and captures are allowed for.
    pub pattern: UrlPattern,

    /// Ask the download facility for a file chooser.
    pub show_file_chooser: bool,

    /// Suffix inserted before the filename extension; `utc()` expands to a
    /// timestamp.
    pub result_name_suffix: String,

    /// Policy for existing files.
    pub conflict_action: ConflictAction,

    /// Let plain HTML documents be saved as raw markup.
    pub respect_html_is_not_xml: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Options {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pattern: UrlPattern::default(),
            show_file_chooser: true,
            result_name_suffix: DEFAULT_RESULT_NAME_SUFFIX.to_string(),
            conflict_action: ConflictAction::Uniquify,
            respect_html_is_not_xml: true,
        }
    }

    /// Builds options from stored values, starting from `base`.
    ///
    /// A missing or empty pattern keeps `base` unchanged as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`](crate::Error::InvalidPattern) if the
    /// stored pattern does not compile.
    pub fn from_values(base: &Self, values: &Map<String, Value>) -> Result<Self> {
        let Some(pattern) = values
            .get(KEY_PATTERN)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        else {
            return Ok(base.clone());
        };

        let mut options = base.clone().with_pattern(pattern)?;
        for key in [
            KEY_SHOW_FILE_CHOOSER,
            KEY_RESULT_NAME_SUFFIX,
            KEY_IF_CONFLICT_THEN,
            KEY_RESPECT_HTML_IS_NOT_XML,
        ] {
            if let Some(value) = values.get(key) {
                options.apply_value(key, value);
            }
        }
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Options {
    /// Sets the URL pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`](crate::Error::InvalidPattern) if
    /// `pattern` does not compile.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Result<Self> {
        self.pattern = UrlPattern::new(pattern)?;
        Ok(self)
    }

    /// Sets whether to request a file chooser.
    #[inline]
    #[must_use]
    pub fn with_show_file_chooser(mut self, show: bool) -> Self {
        self.show_file_chooser = show;
        self
    }

    /// Sets the filename suffix.
    #[inline]
    #[must_use]
    pub fn with_result_name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.result_name_suffix = suffix.into();
        self
    }

    /// Sets the conflict policy.
    #[inline]
    #[must_use]
    pub fn with_conflict_action(mut self, action: ConflictAction) -> Self {
        self.conflict_action = action;
        self
    }

    /// Sets whether plain HTML may be saved as raw markup.
    #[inline]
    #[must_use]
    pub fn with_respect_html_is_not_xml(mut self, respect: bool) -> Self {
        self.respect_html_is_not_xml = respect;
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl Options {
    /// Returns `true` if captures are allowed for `url`.
    #[inline]
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    /// Converts the options to store values, usable as `get` defaults.
    #[must_use]
    pub fn to_values(&self) -> Map<String, Value> {
        let mut values = Map::with_capacity(5);
        values.insert(KEY_PATTERN.to_string(), self.pattern.as_str().into());
        values.insert(KEY_SHOW_FILE_CHOOSER.to_string(), self.show_file_chooser.into());
        values.insert(
            KEY_RESULT_NAME_SUFFIX.to_string(),
            self.result_name_suffix.clone().into(),
        );
        values.insert(
            KEY_IF_CONFLICT_THEN.to_string(),
            self.conflict_action.as_str().into(),
        );
        values.insert(
            KEY_RESPECT_HTML_IS_NOT_XML.to_string(),
            self.respect_html_is_not_xml.into(),
        );
        values
    }

    /// Returns a new snapshot with `changes` applied.
    ///
    /// Unknown keys are ignored. An empty or null pattern keeps the current
    /// one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`](crate::Error::InvalidPattern) if a
    /// changed pattern does not compile; nothing is applied in that case.
    pub fn apply_changes(&self, changes: &[StorageChange]) -> Result<Self> {
        let mut options = self.clone();
        for change in changes {
            if change.key == KEY_PATTERN {
                match change.new_value.as_str() {
                    Some(pattern) if !pattern.is_empty() => {
                        options.pattern = UrlPattern::new(pattern)?;
                    }
                    _ => {}
                }
            } else {
                options.apply_value(&change.key, &change.new_value);
            }
        }
        Ok(options)
    }

    /// Applies one non-pattern value.
    fn apply_value(&mut self, key: &str, value: &Value) {
        match key {
            KEY_SHOW_FILE_CHOOSER => {
                if let Some(show) = value.as_bool() {
                    self.show_file_chooser = show;
                }
            }
            KEY_RESULT_NAME_SUFFIX => {
                self.result_name_suffix = value.as_str().unwrap_or_default().to_string();
            }
            KEY_IF_CONFLICT_THEN => {
                self.conflict_action = value
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        warn!(%value, "Unknown conflict action, using uniquify");
                        ConflictAction::Uniquify
                    });
            }
            KEY_RESPECT_HTML_IS_NOT_XML => {
                if let Some(respect) = value.as_bool() {
                    self.respect_html_is_not_xml = respect;
                }
            }
            _ => {}
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::error::Error;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.pattern.as_str(), "^.+$");
        assert!(options.show_file_chooser);
        assert_eq!(options.result_name_suffix, "-result-utc()");
        assert_eq!(options.conflict_action, ConflictAction::Uniquify);
        assert!(options.respect_html_is_not_xml);
        assert!(options.matches("https://example.com/"));
        assert!(!options.matches(""));
    }

    #[test]
    fn test_to_values() {
        assert_eq!(
            Value::Object(Options::new().to_values()),
            json!({
                "onlyIfURIMatchesRegEx": "^.+$",
                "showFileChooserDialog": true,
                "resultNameSuffix": "-result-utc()",
                "ifConflictThen": "uniquify",
                "respectHTMLIsNotXML": true
            })
        );
    }

    #[test]
    fn test_from_values() {
        let values = map(json!({
            "onlyIfURIMatchesRegEx": "\\.svg$",
            "showFileChooserDialog": false,
            "resultNameSuffix": null,
            "ifConflictThen": "overwrite",
            "respectHTMLIsNotXML": false
        }));
        let options = Options::from_values(&Options::new(), &values).expect("valid");

        assert!(options.matches("https://example.com/a.svg"));
        assert!(!options.matches("https://example.com/a.html"));
        assert!(!options.show_file_chooser);
        assert_eq!(options.result_name_suffix, "");
        assert_eq!(options.conflict_action, ConflictAction::Overwrite);
        assert!(!options.respect_html_is_not_xml);
    }

    #[test]
    fn test_from_values_empty_pattern_keeps_base() {
        let base = Options::new().with_result_name_suffix("-kept");
        let values = map(json!({
            "onlyIfURIMatchesRegEx": "",
            "resultNameSuffix": "-ignored"
        }));
        let options = Options::from_values(&base, &values).expect("valid");
        assert_eq!(options, base);
    }

    #[test]
    fn test_from_values_invalid_pattern() {
        let values = map(json!({ "onlyIfURIMatchesRegEx": "([" }));
        let err = Options::from_values(&Options::new(), &values).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn test_apply_changes() {
        let options = Options::new()
            .apply_changes(&[
                StorageChange::new(KEY_PATTERN, json!("^https://")),
                StorageChange::new(KEY_IF_CONFLICT_THEN, json!("prompt")),
                StorageChange::new(KEY_RESULT_NAME_SUFFIX, json!("")),
                StorageChange::new("unrelated", json!(1)),
            ])
            .expect("valid");

        assert_eq!(options.pattern.as_str(), "^https://");
        assert_eq!(options.conflict_action, ConflictAction::Uniquify);
        assert_eq!(options.result_name_suffix, "");
    }

    #[test]
    fn test_apply_changes_empty_pattern_keeps_previous() {
        let options = Options::new().with_pattern("^file:").expect("valid");
        let changed = options
            .apply_changes(&[StorageChange::new(KEY_PATTERN, json!(""))])
            .expect("valid");
        assert_eq!(changed.pattern.as_str(), "^file:");
    }

    #[test]
    fn test_apply_changes_invalid_pattern_applies_nothing() {
        let options = Options::new();
        let err = options
            .apply_changes(&[
                StorageChange::new(KEY_SHOW_FILE_CHOOSER, json!(false)),
                StorageChange::new(KEY_PATTERN, json!("(")),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
        assert!(options.show_file_chooser);
    }
}
