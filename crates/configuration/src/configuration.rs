use query_engine_metadata::metadata;

use crate::settings::CompilerSettings;

pub const CONFIGURATION_FILENAME: &str = "configuration.json";
pub const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";

/// The 'Configuration' type collects all the information necessary to compile requests at runtime.
///
/// 'ParsedConfiguration' deals with the serialized format of the configuration file, and is
/// responsible for interpreting it into the current 'Configuration'. Values of this type are
/// produced from a 'ParsedConfiguration' using 'make_runtime_configuration', which validates the
/// schema model on the way.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub metadata: metadata::Metadata,
    pub settings: CompilerSettings,
}
