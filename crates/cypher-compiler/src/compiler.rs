//! Hold the runtime configuration and compile requests against it.

use std::path::Path;

use anyhow::Context;
use tracing::info;

use cypher_compiler_configuration::{make_runtime_configuration, parse_configuration, Configuration};
use query_engine_cypher::cypher::execution_plan::{ExecutionPlan, Query};
use query_engine_translation::translation::ast::print_tree;
use query_engine_translation::translation::error::Error;
use query_engine_translation::translation::helpers::Env;
use query_engine_translation::translation::query;

use crate::request::RequestFile;

/// One entry of the root field listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootFieldEntry {
    pub name: String,
    pub operation: &'static str,
    pub type_name: String,
}

#[derive(Debug, Clone)]
pub struct Compiler {
    configuration: Configuration,
}

impl Compiler {
    pub fn new(configuration: Configuration) -> Self {
        Compiler { configuration }
    }

    /// Read and validate the configuration found in `configuration_dir`.
    pub async fn load(configuration_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let configuration_dir = configuration_dir.as_ref();
        let parsed = parse_configuration(configuration_dir).await.with_context(|| {
            format!(
                "unable to read the configuration in {}",
                configuration_dir.display()
            )
        })?;
        let configuration =
            make_runtime_configuration(parsed).context("the schema model is invalid")?;
        info!(
            entities = configuration.metadata.entities.0.len(),
            interfaces = configuration.metadata.interfaces.0.len(),
            unions = configuration.metadata.unions.0.len(),
            "loaded configuration"
        );
        Ok(Compiler::new(configuration))
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Compile a request into an execution plan.
    pub fn translate(&self, request: &RequestFile) -> Result<ExecutionPlan<Query>, Error> {
        query::translate(
            &self.configuration.metadata,
            &request.query_request(),
            &request.context,
        )
    }

    /// The indented outline of the query AST a request compiles to.
    pub fn outline(&self, request: &RequestFile) -> Result<String, Error> {
        let env = Env::new(&self.configuration.metadata, &request.context);
        let operation = query::compile(&env, &request.query_request())?;
        Ok(print_tree(&operation))
    }

    pub fn root_fields(&self) -> Vec<RootFieldEntry> {
        let context = query_engine_models::RequestContext::anonymous();
        let env = Env::new(&self.configuration.metadata, &context);
        env.root_fields()
            .into_iter()
            .map(|(name, root_field)| RootFieldEntry {
                name: name.to_string(),
                operation: root_field.operation(),
                type_name: root_field.type_name().to_string(),
            })
            .collect()
    }
}
