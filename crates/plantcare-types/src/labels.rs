//! Disease category labels.
//!
//! The classifier ships with a `categories.json` mapping raw category keys to
//! output indices, e.g. `{"Tomato___Early_blight": 1, "Tomato___healthy": 2}`.
//! Keys follow the `genus___disease` convention and are turned into display
//! labels with [`format_label`].

use std::collections::HashMap;

use crate::error::{ParseError, ParseResult};

/// Turn a raw category key into a display label.
///
/// ```
/// use plantcare_types::labels::format_label;
///
/// assert_eq!(format_label("Tomato___Early_blight"), "Tomato - Early blight");
/// assert_eq!(format_label("Pepper,_bell___healthy"), "Pepper, bell - healthy");
/// ```
pub fn format_label(key: &str) -> String {
    key.replace("___", " - ").replace('_', " ")
}

/// Display labels indexed by model output position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    /// Build a label map from raw `key -> index` categories.
    ///
    /// Indices must cover `0..n` exactly once.
    pub fn from_categories(categories: HashMap<String, usize>) -> ParseResult<Self> {
        let count = categories.len();
        let mut slots: Vec<Option<String>> = vec![None; count];

        for (key, index) in categories {
            let slot = slots.get_mut(index).ok_or_else(|| ParseError::InvalidValue {
                field: "categories",
                value: format!("index {} out of range for {} categories ({})", index, count, key),
            })?;
            if slot.is_some() {
                return Err(ParseError::InvalidValue {
                    field: "categories",
                    value: format!("duplicate index {} ({})", index, key),
                });
            }
            *slot = Some(format_label(&key));
        }

        // With `count` keys and no duplicates or out-of-range indices every slot is filled.
        let labels = slots.into_iter().flatten().collect();
        Ok(Self { labels })
    }

    /// Parse a `categories.json` document.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> ParseResult<Self> {
        let categories: HashMap<String, usize> =
            serde_json::from_str(json).map_err(|e| ParseError::Json(e.to_string()))?;
        Self::from_categories(categories)
    }

    /// Label for a model output index.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
