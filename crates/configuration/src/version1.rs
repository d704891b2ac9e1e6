//! Version 1 of the configuration file format.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::configuration::{CONFIGURATION_FILENAME, CONFIGURATION_JSONSCHEMA_FILENAME};
use crate::error::{ParseConfigurationError, WriteParsedConfigurationError};
use crate::settings::CompilerSettings;
use query_engine_metadata::metadata;

const CURRENT_VERSION: u32 = 1;

/// The configuration file as it is written to disk: the schema model and the
/// compiler settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    // Which version of the configuration format are we using
    pub version: u32,
    #[serde(default)]
    pub settings: CompilerSettings,
    #[serde(default)]
    pub metadata: metadata::Metadata,
}

impl ParsedConfiguration {
    pub fn initial() -> Self {
        ParsedConfiguration::empty()
    }

    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            settings: CompilerSettings::default(),
            metadata: metadata::Metadata::default(),
        }
    }
}

/// The JSON schema of the configuration file.
pub fn generate_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(ParsedConfiguration)
}

/// Parse the configuration file found in the given directory.
pub async fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_file = configuration_dir.as_ref().join(CONFIGURATION_FILENAME);
    let contents = fs::read_to_string(&configuration_file).await?;
    let parsed: ParsedConfiguration =
        serde_json::from_str(&contents).map_err(|error| ParseConfigurationError::ParseError {
            file_path: configuration_file.clone(),
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        })?;
    if parsed.version != CURRENT_VERSION {
        return Err(ParseConfigurationError::UnsupportedVersion(parsed.version));
    }
    tracing::debug!(
        file = %configuration_file.display(),
        entities = parsed.metadata.entities.0.len(),
        "parsed configuration"
    );
    Ok(parsed)
}

/// Write the configuration and its JSON schema into the given directory.
pub async fn write_parsed_configuration(
    parsed_config: &ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir).await?;

    let configuration = serde_json::to_string_pretty(parsed_config)?;
    fs::write(out_dir.join(CONFIGURATION_FILENAME), configuration + "\n").await?;

    let schema = serde_json::to_string_pretty(&generate_schema())?;
    fs::write(out_dir.join(CONFIGURATION_JSONSCHEMA_FILENAME), schema + "\n").await?;
    Ok(())
}
