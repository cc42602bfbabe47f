//! Command-line interface for the SBML model creator
//!
//! This binary builds, flattens and validates SBML documents:
//! - Building documents from JSON descriptor modules
//! - Flattening hierarchical models into a single model
//! - Validating documents with the staged consistency checks
//! - Printing the JSON schema of descriptor modules
//!
//! # Usage
//!
//! ```bash
//! # Build a model from two descriptor modules and flatten it
//! sbmlutils build core.json extension.json --out model.xml --flatten
//!
//! # Flatten a hierarchical model
//! sbmlutils flatten comp_model.xml --out flat.xml
//!
//! # Validate a model including units and modeling practice
//! sbmlutils validate model.xml --units --practice
//! ```
//!
//! Exit codes: 0 on success, 1 on build, flatten or validation errors and
//! 2 on usage errors.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use sbmlutils::{
    builder::BuildOptionsBuilder,
    comp::{flatten_file, CompositionError},
    io::{build_files, IOError},
    report::{ReportRenderer, SummaryRenderer},
    sbml::{read_sbml_file, write_sbml_file, SBMLError},
    validation::schema::{descriptor_schema, SchemaError},
    validation::{check_consistency, Report, ValidationOptionsBuilder},
};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Io(#[from] IOError),

    #[error(transparent)]
    Sbml(#[from] SBMLError),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    File(#[from] std::io::Error),

    #[error("Invalid options: {0}")]
    Options(String),
}

/// Main CLI configuration struct
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Build an SBML document from descriptor modules
    Build {
        /// JSON descriptor modules, merged in the given order
        #[arg(required = true)]
        modules: Vec<PathBuf>,

        /// Path of the SBML file to write
        #[arg(short, long)]
        out: PathBuf,

        /// Flatten the hierarchical model before writing
        #[arg(long)]
        flatten: bool,

        /// Skip the units consistency checks
        #[arg(long)]
        no_units_check: bool,

        /// SBML Level 3 version
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=2))]
        sbml_version: u32,

        /// Print a summary of the built model
        #[arg(long)]
        summary: bool,
    },
    /// Flatten a hierarchical SBML document
    Flatten {
        /// Path of the SBML document
        input: PathBuf,

        /// Path of the flattened SBML file
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Validate an SBML document
    Validate {
        /// Path of the SBML document
        input: PathBuf,

        /// Check units consistency
        #[arg(long)]
        units: bool,

        /// Check modeling practice
        #[arg(long)]
        practice: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the JSON schema of descriptor modules
    Schema {
        /// Write the schema to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Main entry point for the CLI application
pub fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Build {
            modules,
            out,
            flatten,
            no_units_check,
            sbml_version,
            summary,
        } => build(&modules, &out, flatten, !no_units_check, sbml_version, summary),
        Commands::Flatten { input, out } => flatten(&input, &out),
        Commands::Validate {
            input,
            units,
            practice,
            json,
        } => validate(&input, units, practice, json),
        Commands::Schema { out } => schema(out.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {error}", "Error:".bold().red());
            ExitCode::FAILURE
        }
    }
}

fn build(
    modules: &[PathBuf],
    out: &Path,
    flatten: bool,
    units_check: bool,
    version: u32,
    summary: bool,
) -> Result<ExitCode, CliError> {
    let mut options = BuildOptionsBuilder::default();
    options
        .version(version)
        .units_check(units_check)
        .flatten(flatten);
    if let Some(dir) = modules.first().and_then(|m| m.parent()) {
        options.base_dir(dir);
    }
    let options = options
        .build()
        .map_err(|e| CliError::Options(e.to_string()))?;

    let result = match build_files(modules, &options, out) {
        Ok(result) => result,
        Err(IOError::Build(failure)) => {
            for warning in &failure.warnings {
                eprintln!("{} {warning}", "Warning:".bold().yellow());
            }
            return Err(IOError::Build(failure).into());
        }
        Err(error) => return Err(error.into()),
    };

    for warning in &result.warnings {
        eprintln!("{} {warning}", "Warning:".bold().yellow());
    }
    if let Some(report) = &result.validation {
        print_report(report);
    }
    if summary {
        match SummaryRenderer.render(&result.document) {
            Ok(table) => println!("{table}"),
            Err(error) => log::warn!("{error}"),
        }
    }
    println!("{} {}", "Written".bold().green(), out.display());
    Ok(ExitCode::SUCCESS)
}

fn flatten(input: &Path, out: &Path) -> Result<ExitCode, CliError> {
    let flat = flatten_file(input)?;
    write_sbml_file(&flat, out)?;
    println!("{} {}", "Flattened".bold().green(), out.display());
    Ok(ExitCode::SUCCESS)
}

fn validate(
    input: &Path,
    units: bool,
    practice: bool,
    json: bool,
) -> Result<ExitCode, CliError> {
    let doc = read_sbml_file(input)?;
    let options = ValidationOptionsBuilder::default()
        .units(units)
        .practice(practice)
        .build()
        .map_err(|e| CliError::Options(e.to_string()))?;
    let report = check_consistency(&doc, &options);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.is_valid {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn schema(out: Option<&Path>) -> Result<ExitCode, CliError> {
    let schema = descriptor_schema()?;
    let content = serde_json::to_string_pretty(&schema)?;
    match out {
        Some(path) => std::fs::write(path, content)?,
        None => println!("{content}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &Report) {
    if report.results.is_empty() {
        println!("{}", "Document is valid".bold().green());
    } else {
        println!("{report}");
    }
}
