//! Tool catalog: tool names and their advertised input schemas.
//!
//! The schemas are static metadata for callers; enforcement lives in
//! [`super::params`]. Both describe the same constraints except at the edges:
//! the validator treats a negative `limit` as absent and rejects an `offset`
//! that does not fit in `u64`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::types::Error;

// =============================================================================
// Tool names
// =============================================================================

/// The four read-only ledger tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolName {
    ListProviders,
    ShowProvider,
    ListEnvironments,
    ShowEnvironment,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::ListProviders,
        ToolName::ShowProvider,
        ToolName::ListEnvironments,
        ToolName::ShowEnvironment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::ListProviders => "list-providers",
            ToolName::ShowProvider => "show-provider",
            ToolName::ListEnvironments => "list-environments",
            ToolName::ShowEnvironment => "show-environment",
        }
    }

    /// Family whose circuit breaker guards this tool.
    pub fn family(self) -> ToolFamily {
        match self {
            ToolName::ListProviders | ToolName::ShowProvider => ToolFamily::Providers,
            ToolName::ListEnvironments | ToolName::ShowEnvironment => ToolFamily::Environments,
        }
    }

    pub fn is_listing(self) -> bool {
        matches!(self, ToolName::ListProviders | ToolName::ListEnvironments)
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolName::ListProviders => {
                "List providers registered in the Overlock Network with optional creator filter and pagination"
            }
            ToolName::ShowProvider => "Get detailed information for a specific provider by its ID",
            ToolName::ListEnvironments => {
                "List environments in the Overlock Network with optional creator filter and pagination"
            }
            ToolName::ShowEnvironment => {
                "Get detailed information for a specific environment by its ID"
            }
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::unknown_tool(s))
    }
}

/// Tools sharing one remote entity kind, and therefore one circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFamily {
    Providers,
    Environments,
}

impl ToolFamily {
    /// Entity name used in caller-facing sentences.
    pub fn entity_kind(self) -> &'static str {
        match self {
            ToolFamily::Providers => "Provider",
            ToolFamily::Environments => "Environment",
        }
    }

    /// Default circuit breaker name.
    pub fn breaker_name(self) -> &'static str {
        match self {
            ToolFamily::Providers => "ledger-providers",
            ToolFamily::Environments => "ledger-environments",
        }
    }
}

// =============================================================================
// Input shapes (schema only)
// =============================================================================

/// Arguments accepted by the listing tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListInput {
    /// Filter by creator address (optional)
    #[serde(default)]
    pub creator: Option<String>,

    /// Maximum number of entries to return (default: 100, max: 1000)
    #[serde(default)]
    #[schemars(range(min = 0, max = 1000))]
    pub limit: Option<u64>,

    /// Number of entries to skip for pagination (default: 0)
    #[serde(default)]
    pub offset: Option<u64>,
}

/// Arguments accepted by the single-entity tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntityInput {
    /// ID of the entity to retrieve (required)
    #[schemars(range(min = 1))]
    pub id: u64,
}

// =============================================================================
// Catalog
// =============================================================================

/// Advertised tool metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ToolEntry {
    pub name: ToolName,
    pub description: String,
    pub input_schema: Value,
}

impl ToolEntry {
    pub fn for_tool(name: ToolName) -> Self {
        let schema = if name.is_listing() {
            schemars::schema_for!(ListInput)
        } else {
            schemars::schema_for!(EntityInput)
        };

        Self {
            name,
            description: name.description().to_string(),
            // RootSchema is plain data; encoding it cannot fail.
            input_schema: serde_json::to_value(schema).unwrap_or(Value::Null),
        }
    }
}

/// All advertised tools in stable order.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    entries: Vec<ToolEntry>,
}

impl ToolCatalog {
    pub fn standard() -> Self {
        Self {
            entries: ToolName::ALL.into_iter().map(ToolEntry::for_tool).collect(),
        }
    }

    pub fn get(&self, name: ToolName) -> Option<&ToolEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[ToolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// Tests
// =============================================================================
