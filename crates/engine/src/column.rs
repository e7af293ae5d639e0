//! Column configuration
//!
//! A column's kind decides how its cells render and behave. Kinds move one
//! way: a `plain` column can be configured into any other kind, configured
//! columns can switch between non-plain kinds, and nothing goes back to
//! `plain`. Every (re)configuration resets the column's cells.

use serde::{Deserialize, Serialize};

use crate::cell::Column;
use crate::error::{GridError, Result};

/// Behavioral/rendering mode of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnKind {
    #[default]
    Plain,
    Text,
    Dropdown,
    App,
    Agent,
    Prompt,
    JasperIq,
    BlogPost,
}

impl ColumnKind {
    pub const ALL: [ColumnKind; 8] = [
        ColumnKind::Plain,
        ColumnKind::Text,
        ColumnKind::Dropdown,
        ColumnKind::App,
        ColumnKind::Agent,
        ColumnKind::Prompt,
        ColumnKind::JasperIq,
        ColumnKind::BlogPost,
    ];

    /// Cells hold run slots instead of text and count toward credits.
    pub fn is_executable(self) -> bool {
        matches!(
            self,
            ColumnKind::App | ColumnKind::Agent | ColumnKind::Prompt | ColumnKind::BlogPost
        )
    }

    /// Cells pick from a fixed option list.
    pub fn requires_options(self) -> bool {
        matches!(self, ColumnKind::Dropdown | ColumnKind::JasperIq)
    }

    /// Wire name, as used in persisted configs.
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Plain => "plain",
            ColumnKind::Text => "text",
            ColumnKind::Dropdown => "dropdown",
            ColumnKind::App => "app",
            ColumnKind::Agent => "agent",
            ColumnKind::Prompt => "prompt",
            ColumnKind::JasperIq => "jasper-iq",
            ColumnKind::BlogPost => "blog-post",
        }
    }

    /// Whether a column of kind `self` may be reconfigured to `next`.
    pub fn can_transition_to(self, next: ColumnKind) -> bool {
        self == ColumnKind::Plain || next != ColumnKind::Plain
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt payload for `prompt` columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSpec {
    pub text: String,
    /// Column whose value feeds the prompt for the same row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_column: Option<Column>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnConfig {
    pub display_name: String,
    pub kind: ColumnKind,
    pub options: Vec<String>,
    pub allow_multiple: bool,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound_app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptSpec>,
}

impl ColumnConfig {
    pub fn new(kind: ColumnKind) -> Self {
        Self { kind, ..Default::default() }
    }

    /// Dropdown column with the given options.
    pub fn dropdown(options: Vec<String>) -> Self {
        Self::new(ColumnKind::Dropdown).with_options(options)
    }

    /// App column bound to `app`.
    pub fn app(app: impl Into<String>) -> Self {
        Self::new(ColumnKind::App).with_bound_app(app)
    }

    /// Prompt column, optionally reading another column of the same row.
    pub fn prompt(text: impl Into<String>, context_column: Option<Column>) -> Self {
        Self {
            prompt: Some(PromptSpec { text: text.into(), context_column }),
            ..Self::new(ColumnKind::Prompt)
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_bound_app(mut self, app: impl Into<String>) -> Self {
        self.bound_app_name = Some(app.into());
        self
    }

    pub fn with_allow_multiple(mut self, allow: bool) -> Self {
        self.allow_multiple = allow;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Check that this config is complete for its kind and that `col` can
    /// move to it from `current`. `column_count` bounds prompt context refs.
    pub fn validate(&self, col: Column, column_count: usize, current: ColumnKind) -> Result<()> {
        let invalid = |reason: &str| GridError::InvalidConfig { col, reason: reason.to_string() };

        if !current.can_transition_to(self.kind) {
            return Err(invalid("a configured column cannot go back to plain"));
        }

        if self.kind.requires_options() {
            if self.options.is_empty() {
                return Err(invalid("at least one option is required"));
            }
            if self.options.iter().any(|o| o.trim().is_empty()) {
                return Err(invalid("options must not be blank"));
            }
        }

        match self.kind {
            ColumnKind::App => {
                let bound = self.bound_app_name.as_deref().map(str::trim).unwrap_or("");
                if bound.is_empty() {
                    return Err(invalid("app columns need an app to bind"));
                }
            }
            ColumnKind::Prompt => {
                let Some(prompt) = &self.prompt else {
                    return Err(invalid("prompt text is required"));
                };
                if prompt.text.trim().is_empty() {
                    return Err(invalid("prompt text is required"));
                }
                if let Some(ctx) = prompt.context_column {
                    if ctx == col {
                        return Err(invalid("prompt cannot use its own column as context"));
                    }
                    if ctx.index() >= column_count {
                        return Err(invalid("prompt context column is out of range"));
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Static label written into a cell when its simulated run completes.
    pub fn completed_output(&self) -> String {
        match self.kind {
            ColumnKind::App => {
                format!("{} output", self.bound_app_name.as_deref().unwrap_or("App"))
            }
            ColumnKind::Agent => {
                format!("{} finished", self.bound_app_name.as_deref().unwrap_or("Agent"))
            }
            ColumnKind::Prompt => "Prompt response".to_string(),
            ColumnKind::BlogPost => "Blog post draft".to_string(),
            _ => String::new(),
        }
    }
}
