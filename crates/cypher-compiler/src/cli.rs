//! The command line: compile a request file, or inspect the configuration.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use cypher_compiler_configuration::{
    generate_schema, write_parsed_configuration, ParsedConfiguration, CONFIGURATION_FILENAME,
};

use crate::compiler::Compiler;
use crate::request::RequestFile;

#[derive(Debug, Parser)]
#[command(name = "cypher-compiler", version, about = "Compile query-intent requests into Cypher")]
pub struct Cli {
    /// The directory holding configuration.json.
    #[arg(long, short = 'c', env = "CYPHER_COMPILER_CONFIGURATION", default_value = ".")]
    pub configuration: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the Cypher statement a request compiles to.
    Cypher { request: PathBuf },
    /// Print the parameters of a compiled request as JSON.
    Params { request: PathBuf },
    /// Print the query AST of a request as an indented outline.
    Tree { request: PathBuf },
    /// List the root fields the schema model exposes.
    RootFields,
    /// Print the JSON schema of the configuration file.
    Schema,
    /// Write an empty configuration and its JSON schema.
    Initialize,
}

impl Cli {
    pub async fn run(self, out: &mut impl Write) -> anyhow::Result<()> {
        match self.command {
            Command::Cypher { request } => {
                let (compiler, request) = load(&self.configuration, &request).await?;
                let plan = compiler.translate(&request)?;
                writeln!(out, "{}", plan.query.query_cypher().cypher)?;
            }
            Command::Params { request } => {
                let (compiler, request) = load(&self.configuration, &request).await?;
                let plan = compiler.translate(&request)?;
                let params = serde_json::to_string_pretty(&plan.query.query_cypher().params)?;
                writeln!(out, "{params}")?;
            }
            Command::Tree { request } => {
                let (compiler, request) = load(&self.configuration, &request).await?;
                write!(out, "{}", compiler.outline(&request)?)?;
            }
            Command::RootFields => {
                let compiler = Compiler::load(&self.configuration).await?;
                for entry in compiler.root_fields() {
                    writeln!(out, "{}\t{}\t{}", entry.name, entry.operation, entry.type_name)?;
                }
            }
            Command::Schema => {
                writeln!(out, "{}", serde_json::to_string_pretty(&generate_schema())?)?;
            }
            Command::Initialize => {
                let file = self.configuration.join(CONFIGURATION_FILENAME);
                if tokio::fs::try_exists(&file).await? {
                    bail!("{} already exists", file.display());
                }
                write_parsed_configuration(&ParsedConfiguration::initial(), &self.configuration)
                    .await
                    .with_context(|| format!("unable to initialize {}", self.configuration.display()))?;
                writeln!(out, "wrote {}", file.display())?;
            }
        }
        Ok(())
    }
}

async fn load(configuration: &Path, request: &Path) -> anyhow::Result<(Compiler, RequestFile)> {
    let compiler = Compiler::load(configuration).await?;
    let request = RequestFile::read(request).await?;
    Ok((compiler, request))
}
