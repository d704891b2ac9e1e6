//! Compiler settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Settings that apply to every compiled request.
#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompilerSettings {
    /// The page size of reads of types that declare no limit of their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<u32>,
}
