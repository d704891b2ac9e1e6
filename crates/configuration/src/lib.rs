pub mod configuration;
pub mod error;
pub mod settings;
mod to_runtime_configuration;
pub mod version1;

pub use configuration::{Configuration, CONFIGURATION_FILENAME, CONFIGURATION_JSONSCHEMA_FILENAME};
pub use settings::CompilerSettings;
pub use to_runtime_configuration::make_runtime_configuration;
pub use version1::{
    generate_schema, parse_configuration, write_parsed_configuration, ParsedConfiguration,
};
