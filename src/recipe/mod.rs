//! Recipe request data model.
//!
//! - [`PantryItem`] / [`RecipeRequest`]: what the caller sends
//! - [`prompt`]: turning a validated request into a model prompt

pub mod prompt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),

    #[error("No items provided")]
    NoItems,
}

/// One entry from the caller's pantry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PantryItem {
    pub name: String,

    #[serde(default, deserialize_with = "optional_text")]
    pub quantity: Option<String>,

    #[serde(default, deserialize_with = "optional_text")]
    pub expiration_date: Option<String>,
}

impl PantryItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: None,
            expiration_date: None,
        }
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into()).filter(|q| !q.is_empty());
        self
    }

    pub fn with_expiration_date(mut self, date: impl Into<String>) -> Self {
        self.expiration_date = Some(date.into()).filter(|d| !d.is_empty());
        self
    }
}

/// A validated, non-empty list of pantry items.
#[derive(Debug, Clone)]
pub struct RecipeRequest {
    items: Vec<PantryItem>,
}

impl RecipeRequest {
    /// Wrap an item list, rejecting an empty one.
    pub fn new(items: Vec<PantryItem>) -> Result<Self, RecipeError> {
        if items.is_empty() {
            return Err(RecipeError::NoItems);
        }
        Ok(Self { items })
    }

    /// Parse and validate a raw request body.
    ///
    /// The body must be JSON. `items` must be present, an array and non-empty;
    /// each element must carry a string `name`.
    pub fn from_body(body: &[u8]) -> Result<Self, RecipeError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| RecipeError::InvalidBody(e.to_string()))?;

        let items = match value.get("items") {
            Some(Value::Array(items)) if !items.is_empty() => items.clone(),
            _ => return Err(RecipeError::NoItems),
        };

        let items = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value::<PantryItem>(item)
                    .map_err(|e| RecipeError::InvalidBody(format!("items[{i}]: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(items)
    }

    pub fn items(&self) -> &[PantryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Accept a string, number or null; empty strings count as absent.
fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}
