//! The request file read by the command line.

use std::path::Path;

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use query_engine_models::{QueryRequest, RequestContext, SelectionField};

/// A root field selection together with the authorization context it is compiled for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestFile {
    pub operation: SelectionField,
    #[serde(default)]
    pub context: RequestContext,
}

impl RequestFile {
    pub async fn read(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("unable to read request file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("malformed request file {}", path.display()))
    }

    pub fn query_request(&self) -> QueryRequest {
        QueryRequest {
            operation: self.operation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_defaults_to_anonymous() {
        let request: RequestFile = serde_json::from_value(serde_json::json!({
            "operation": { "name": "movies" }
        }))
        .expect("valid request");
        assert!(!request.context.is_authenticated());
        assert_eq!(request.query_request().operation.name.as_str(), "movies");
    }
}
