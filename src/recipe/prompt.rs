//! Prompt construction.
//!
//! A [`RecipeProfile`] bundles everything that distinguishes one deployment
//! of the relay from another: the output format the model is asked for, the
//! prompt template, and an optional warm-up fragment sent to the client
//! before the first model output arrives.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::recipe::{PantryItem, RecipeRequest};

const PANTRY_LIST: &str = "{pantry_list}";
const RECIPE_COUNT: &str = "{recipe_count}";

const JSON_TEMPLATE: &str = "\
I have the following ingredients in my pantry:
{pantry_list}

Please generate {recipe_count} creative and healthy recipes that I can make with these ingredients.
You can assume I have basic staples like oil, salt, pepper, and water.

IMPORTANT: Return ONLY a raw JSON array of objects. Do not wrap it in markdown code blocks.

The JSON structure must be:
[
  {
    \"name\": \"Recipe Name\",
    \"calories\": \"Approx calories\",
    \"macros\": \"Protein/Carbs/Fat\",
    \"ingredients\": [\"Item 1\", \"Item 2\"],
    \"instructions\": [\"Step 1\", \"Step 2\"]
  }
]";

const MARKDOWN_TEMPLATE: &str = "\
I have the following ingredients in my pantry:
{pantry_list}

Please generate {recipe_count} creative and healthy recipes that I can make with these ingredients.
You can assume I have basic staples like oil, salt, pepper, and water.
Prefer ingredients that expire soonest.

Format the answer as Markdown. For each recipe use:
## Recipe Name
**Calories:** approx calories | **Macros:** Protein/Carbs/Fat
### Ingredients
- one bullet per ingredient
### Instructions
1. one numbered step per line";

/// Shape of the answer the model is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A raw JSON array of recipe objects.
    #[default]
    Json,
    /// A Markdown document.
    Markdown,
}

impl OutputFormat {
    fn builtin_template(self) -> &'static str {
        match self {
            OutputFormat::Json => JSON_TEMPLATE,
            OutputFormat::Markdown => MARKDOWN_TEMPLATE,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Prompt and output configuration for the relay.
#[derive(Debug, Clone)]
pub struct RecipeProfile {
    output_format: OutputFormat,
    template: Option<String>,
    recipe_count: usize,
    warmup: Option<String>,
}

impl RecipeProfile {
    pub fn new(output_format: OutputFormat) -> Self {
        Self {
            output_format,
            template: None,
            recipe_count: 3,
            warmup: None,
        }
    }

    /// Replace the built-in template for the output format.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_recipe_count(mut self, count: usize) -> Self {
        self.recipe_count = count;
        self
    }

    /// Send `fragment` to the client before any model output.
    pub fn with_warmup(mut self, fragment: impl Into<String>) -> Self {
        self.warmup = Some(fragment.into()).filter(|w| !w.is_empty());
        self
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn warmup(&self) -> Option<&str> {
        self.warmup.as_deref()
    }

    /// Render the prompt for a validated request.
    pub fn build_prompt(&self, request: &RecipeRequest) -> String {
        let template = self
            .template
            .as_deref()
            .unwrap_or_else(|| self.output_format.builtin_template());

        template
            .replace(RECIPE_COUNT, &self.recipe_count.to_string())
            .replace(PANTRY_LIST, &render_pantry_list(request.items()))
    }
}

impl Default for RecipeProfile {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

/// Render one line per item: `- name (quantity) [Expires: date]`.
pub fn render_pantry_list(items: &[PantryItem]) -> String {
    items.iter().map(render_item).collect::<Vec<_>>().join("\n")
}

fn render_item(item: &PantryItem) -> String {
    let mut line = format!("- {}", single_line(&item.name));
    if let Some(quantity) = &item.quantity {
        line.push_str(&format!(" ({})", single_line(quantity)));
    }
    if let Some(date) = &item.expiration_date {
        line.push_str(&format!(" [Expires: {}]", single_line(date)));
    }
    line
}

/// Join the lines of a caller-supplied field with single spaces.
fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
