//! Metadata information regarding the graph database and tracked information.

pub mod authorization;
pub mod database;

// re-export without modules
pub use authorization::*;
pub use database::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata information.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub entities: EntitiesInfo,
    #[serde(default)]
    pub interfaces: InterfacesInfo,
    #[serde(default)]
    pub unions: UnionsInfo,
}

impl Metadata {
    pub fn empty() -> Self {
        Metadata {
            entities: EntitiesInfo::empty(),
            interfaces: InterfacesInfo::empty(),
            unions: UnionsInfo::empty(),
        }
    }
}
