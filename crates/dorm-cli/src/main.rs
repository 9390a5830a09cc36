//! DORM command-line front end.
//!
//! Thin wrapper over `dorm-core`: loads domain/design/query documents,
//! runs the checker, and prints the statements the compilers produce.
//! Exit codes: 0 success, 2 invalid input, 3 checker or translation failure,
//! 4 sink/serialization error, 5 cancelled.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dorm_core::loader;
use dorm_core::{
    Catalog, Checker, Error, MigrationPlanner, Paradigm, QuerySpec, QueryTranslator,
    SchemaGenerator,
};

/// Compile domain models and physical designs into schemas, queries, and
/// migrations.
#[derive(Parser, Debug)]
#[command(name = "dorm")]
#[command(version, about = "DORM catalog tools")]
struct Cli {
    /// Silence warnings.
    #[arg(long, global = true)]
    hide_warnings: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load, check, and persist a catalog; optionally emit its schema.
    CatalogAction(CatalogAction),
    /// Translate a batch of abstract queries against an installed design.
    QueryExecutor(QueryExecutor),
    /// Plan the data migration between two persisted catalogs.
    Migrate(Migrate),
}

#[derive(Args, Debug)]
struct CatalogAction {
    /// Domain document (JSON).
    #[arg(long)]
    domain_file: PathBuf,

    /// Design document (JSON); without it only the domain is handled.
    #[arg(long)]
    design_file: Option<PathBuf>,

    /// Physical paradigm (FLAT or JSON_NESTED).
    #[arg(long, default_value = "FLAT")]
    paradigm: String,

    /// Check the catalog and report every violation.
    #[arg(long)]
    check: bool,

    /// Emit the schema-creation statements.
    #[arg(long)]
    translate: bool,

    /// Persist the catalog blob to this file.
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct QueryExecutor {
    /// Persisted catalog blob.
    #[arg(long)]
    catalog: PathBuf,

    /// Physical paradigm (FLAT or JSON_NESTED).
    #[arg(long)]
    paradigm: String,

    /// Query batch document (JSON).
    #[arg(long)]
    query_file: PathBuf,
}

#[derive(Args, Debug)]
struct Migrate {
    /// Persisted source catalog blob.
    #[arg(long)]
    source: PathBuf,

    /// Paradigm of the installed source design.
    #[arg(long, default_value = "FLAT")]
    source_paradigm: String,

    /// Persisted target catalog blob.
    #[arg(long)]
    target: PathBuf,

    /// Paradigm for the target design.
    #[arg(long, default_value = "FLAT")]
    target_paradigm: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dorm_core=warn".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();
    let hide_warnings = cli.hide_warnings;
    let result = match cli.command {
        Command::CatalogAction(args) => catalog_action(args, hide_warnings),
        Command::QueryExecutor(args) => query_executor(args, hide_warnings),
        Command::Migrate(args) => migrate(args, hide_warnings),
    };
    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.family())
        }
    }
}

fn catalog_action(args: CatalogAction, hide_warnings: bool) -> Result<ExitCode, Error> {
    let paradigm: Paradigm = args.paradigm.parse()?;
    let domain = loader::parse_domain(&read(&args.domain_file)?)?;
    let catalog = match &args.design_file {
        Some(path) => {
            let design = loader::parse_design(&read(path)?)?;
            loader::build_design(&domain, &design)?
        }
        None => loader::build_domain(&domain)?,
    };

    if args.check {
        let checker = if args.design_file.is_some() {
            Checker::for_design().with_paradigm(paradigm)
        } else {
            Checker::for_domain()
        };
        let report = checker.check(&catalog);
        if !hide_warnings {
            for warning in report.warnings() {
                eprintln!("{warning}");
            }
        }
        if !report.is_ok() {
            for error in report.errors() {
                eprintln!("{error}");
            }
            return Ok(ExitCode::from(3));
        }
        println!("the catalog is consistent");
    }

    if args.translate {
        let batch = SchemaGenerator::new(paradigm).generate(&catalog)?;
        if !hide_warnings {
            for warning in &batch.warnings {
                eprintln!("{warning}");
            }
        }
        println!("{}", batch.script());
    }

    if let Some(path) = &args.save {
        std::fs::write(path, catalog.to_bytes()?)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        tracing::info!(path = %path.display(), "catalog saved");
    }
    Ok(ExitCode::SUCCESS)
}

fn query_executor(args: QueryExecutor, hide_warnings: bool) -> Result<ExitCode, Error> {
    let paradigm: Paradigm = args.paradigm.parse()?;
    let blob = std::fs::read(&args.catalog).map_err(|e| Error::Deserialization(e.to_string()))?;
    let catalog = Catalog::from_bytes(&blob)?;
    let batch = loader::parse_queries(&read(&args.query_file)?)?;

    let translator = QueryTranslator::new(paradigm);
    for (i, doc) in batch.queries.into_iter().enumerate() {
        println!("-- query {i}");
        let translation = translator.translate(&catalog, &QuerySpec::from(doc))?;
        if !hide_warnings {
            for warning in &translation.warnings {
                eprintln!("{warning}");
            }
        }
        println!("{};", translation.sql);
    }
    Ok(ExitCode::SUCCESS)
}

fn migrate(args: Migrate, hide_warnings: bool) -> Result<ExitCode, Error> {
    let source_paradigm: Paradigm = args.source_paradigm.parse()?;
    let target_paradigm: Paradigm = args.target_paradigm.parse()?;
    let source = Catalog::from_bytes(
        &std::fs::read(&args.source).map_err(|e| Error::Deserialization(e.to_string()))?,
    )?;
    let target = Catalog::from_bytes(
        &std::fs::read(&args.target).map_err(|e| Error::Deserialization(e.to_string()))?,
    )?;

    let plan = MigrationPlanner::new(source_paradigm, target_paradigm).plan(&source, &target)?;
    if !hide_warnings {
        for warning in &plan.warnings {
            eprintln!("{warning}");
        }
    }
    println!("{}", plan.script());
    Ok(ExitCode::SUCCESS)
}

fn read(path: &PathBuf) -> Result<String, Error> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::Parse(format!("cannot read '{}': {e}", path.display())))
}
