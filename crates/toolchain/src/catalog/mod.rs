//! Tool registry.
//!
//! A [`Catalog`] is an immutable, explicitly constructed table of
//! [`ToolDescriptor`]s keyed by name. The engine receives one at startup;
//! tests build their own with [`Catalog::builder`].
//!
//! # Built-in tools
//!
//! - [`builtin`] - the curated table shipped with getkit

pub mod builtin;

use crate::error::{Error, Result};
use crate::types::ToolDescriptor;
use std::collections::BTreeMap;

/// Immutable tool registry.
///
/// # Example
///
/// ```
/// use toolchain::{Catalog, ToolDescriptor};
/// use toolchain::template::Template;
///
/// let catalog = Catalog::builder()
///     .tool(
///         ToolDescriptor::new("kind", "kubernetes-sigs", "kind")
///             .binary_template(Template::new("{name}-{os}-amd64")),
///     )
///     .build()
///     .unwrap();
///
/// assert!(catalog.get("kind").is_ok());
/// assert!(catalog.get("Kind").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl Catalog {
    /// Start building a catalogue.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// The curated built-in catalogue.
    #[must_use]
    pub fn builtin() -> Self {
        let tools = builtin::tools()
            .into_iter()
            .map(|tool| (tool.name.clone(), tool))
            .collect();
        Self { tools }
    }

    /// Look a tool up by exact, case-sensitive name.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownTool` with a suggestion when the name is not
    /// registered.
    pub fn get(&self, name: &str) -> Result<&ToolDescriptor> {
        self.tools.get(name).ok_or_else(|| Error::UnknownTool {
            name: name.to_string(),
            suggestion: self.suggest(name),
        })
    }

    /// Whether a tool is registered under exactly this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tools sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the catalogue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn suggest(&self, name: &str) -> Option<String> {
        let lower = name.to_lowercase();
        if let Some(found) = self.tools.keys().find(|k| k.to_lowercase() == lower) {
            return Some(format!("did you mean '{found}'? Tool names are case-sensitive"));
        }

        let mut close = self
            .tools
            .keys()
            .filter(|k| !lower.is_empty() && (k.starts_with(&lower) || lower.starts_with(k.as_str())));
        if let Some(found) = close.next() {
            return Some(format!("did you mean '{found}'?"));
        }

        Some("run 'getkit list' to see the available tools".to_string())
    }
}

/// Builder for [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    tools: Vec<ToolDescriptor>,
}

impl CatalogBuilder {
    /// Register a tool.
    #[must_use]
    pub fn tool(mut self, tool: ToolDescriptor) -> Self {
        self.tools.push(tool);
        self
    }

    /// Register several tools.
    #[must_use]
    pub fn tools(mut self, tools: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Freeze the catalogue.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for duplicate or empty names.
    pub fn build(self) -> Result<Catalog> {
        let mut tools = BTreeMap::new();
        for tool in self.tools {
            if tool.name.trim().is_empty() {
                return Err(Error::Config("tool with an empty name".to_string()));
            }
            if tools.contains_key(&tool.name) {
                return Err(Error::Config(format!("duplicate tool name '{}'", tool.name)));
            }
            tools.insert(tool.name.clone(), tool);
        }
        Ok(Catalog { tools })
    }
}
