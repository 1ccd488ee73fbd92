use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use pokedex_ingest::assets::{AssetMaterializer, AssetOptions};
use pokedex_ingest::client::CatalogHttpClient;
use pokedex_ingest::config::{ConfigLoader, ResolvedConfig};
use pokedex_ingest::domain::EntityRecord;
use pokedex_ingest::error::DexError;
use pokedex_ingest::importer::{CancelFlag, ImportOptions, ImportOutcome, ImportReport, Importer};
use pokedex_ingest::output::{JsonOutput, OutputMode, TextOutput};
use pokedex_ingest::progress::{ConsoleProgress, LogProgress, ProgressSink};
use pokedex_ingest::query::{Pokedex, SearchQuery};
use pokedex_ingest::store::Store;

#[derive(Parser)]
#[command(name = "pokedex")]
#[command(about = "Import the PokeAPI catalog into a local record store")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    store: Option<String>,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Import every entity of the catalog")]
    Import(ImportArgs),
    #[command(about = "Import a single entity by name")]
    Fetch(FetchArgs),
    #[command(about = "Import alternate forms from the form listing")]
    Forms,
    #[command(about = "Download and embed missing sprites")]
    Sprites(SpritesArgs),
    #[command(about = "Import the catalog, then embed sprites")]
    Sync,
    #[command(about = "List stored records")]
    List,
    #[command(about = "Show one stored record")]
    Show(ShowArgs),
    #[command(about = "Search stored records")]
    Search(SearchArgs),
}

#[derive(Args)]
struct ImportArgs {
    #[arg(long)]
    skip_variants: bool,

    #[arg(long)]
    forms: bool,
}

#[derive(Args)]
struct FetchArgs {
    name: String,
}

#[derive(Args)]
struct SpritesArgs {
    #[arg(long)]
    ceiling: Option<u32>,
}

#[derive(Args)]
struct ShowArgs {
    id: u32,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long)]
    name: Option<String>,

    #[arg(long = "type")]
    types: Vec<String>,

    #[arg(long)]
    ability: Option<String>,

    #[arg(long = "move")]
    move_name: Option<String>,

    #[arg(long)]
    generation: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<DexError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DexError) -> u8 {
    match error {
        DexError::RecordNotFound(_) => 2,
        err if err.is_remote() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(path) = &cli.store {
        config.store_path = Utf8PathBuf::from(path);
    }
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let sink: Box<dyn ProgressSink> = if cli.json || cli.quiet {
        Box::new(LogProgress)
    } else {
        Box::new(ConsoleProgress)
    };

    let store = Store::open(&config.store_path)?.with_flush_every(config.store_flush_every);
    let cancel = CancelFlag::new();

    match cli.command {
        Commands::Import(args) => {
            let client = CatalogHttpClient::new(&config)?;
            let mut options = ImportOptions::from_config(&config);
            options.discover_variants = !args.skip_variants;
            let importer = Importer::new(&client, &store, options);
            let report = importer.import_all(sink.as_ref(), &cancel)?;
            print_import(&report, output_mode)?;
            if args.forms {
                let report = importer.import_forms(sink.as_ref(), &cancel)?;
                print_import(&report, output_mode)?;
            }
            Ok(())
        }
        Commands::Fetch(args) => {
            let client = CatalogHttpClient::new(&config)?;
            let importer = Importer::new(&client, &store, ImportOptions::from_config(&config));
            match importer.import_one(&args.name, sink.as_ref())? {
                ImportOutcome::Created(record) | ImportOutcome::Existing(record) => {
                    print_records(std::slice::from_ref(&record), output_mode, true)
                }
                ImportOutcome::InFlight => Err(DexError::RecordNotFound(args.name).into()),
            }
        }
        Commands::Forms => {
            let client = CatalogHttpClient::new(&config)?;
            let importer = Importer::new(&client, &store, ImportOptions::from_config(&config));
            let report = importer.import_forms(sink.as_ref(), &cancel)?;
            print_import(&report, output_mode)
        }
        Commands::Sprites(args) => run_sprites(
            &config,
            &store,
            args.ceiling,
            sink.as_ref(),
            &cancel,
            output_mode,
        ),
        Commands::Sync => {
            let client = CatalogHttpClient::new(&config)?;
            let importer = Importer::new(&client, &store, ImportOptions::from_config(&config));
            let report = importer.import_all(sink.as_ref(), &cancel)?;
            print_import(&report, output_mode)?;
            run_sprites(&config, &store, None, sink.as_ref(), &cancel, output_mode)
        }
        Commands::List => {
            let records = Pokedex::new(&store).get_all()?;
            print_records(&records, output_mode, false)
        }
        Commands::Show(args) => {
            let record = Pokedex::new(&store)
                .find_by_id(args.id)?
                .ok_or_else(|| DexError::RecordNotFound(args.id.to_string()))?;
            print_records(std::slice::from_ref(&record), output_mode, true)
        }
        Commands::Search(args) => {
            let query = SearchQuery {
                name: args.name,
                types: args.types,
                ability: args.ability,
                move_name: args.move_name,
                generation: args.generation,
            };
            let records = Pokedex::new(&store).advanced_search(&query)?;
            print_records(&records, output_mode, false)
        }
    }
}

fn run_sprites(
    config: &ResolvedConfig,
    store: &Store,
    ceiling: Option<u32>,
    sink: &dyn ProgressSink,
    cancel: &CancelFlag,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let client = CatalogHttpClient::new(config)?;
    let mut options = AssetOptions::from_config(config);
    options.identity_ceiling = ceiling;
    let report = AssetMaterializer::new(&client, store, options).materialize(sink, cancel)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_assets(&report).into_diagnostic(),
        OutputMode::Human => {
            TextOutput::print_assets(&report);
            Ok(())
        }
    }
}

fn print_import(report: &ImportReport, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::Json => JsonOutput::print_import(report).into_diagnostic(),
        OutputMode::Human => {
            TextOutput::print_import(report);
            Ok(())
        }
    }
}

fn print_records(
    records: &[EntityRecord],
    output_mode: OutputMode,
    detailed: bool,
) -> miette::Result<()> {
    match (output_mode, detailed) {
        (OutputMode::Json, true) if records.len() == 1 => {
            JsonOutput::print_record(&records[0]).into_diagnostic()
        }
        (OutputMode::Json, _) => JsonOutput::print_records(records).into_diagnostic(),
        (OutputMode::Human, true) => {
            records.iter().for_each(TextOutput::print_record);
            Ok(())
        }
        (OutputMode::Human, false) => {
            TextOutput::print_records(records);
            Ok(())
        }
    }
}
