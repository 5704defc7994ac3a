//! recdedup CLI
//!
//! Entity resolution for tabular records: block, compare, classify and
//! deduplicate a dataset according to a pipeline config file

mod config;
mod progress;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use recdedup_core::{PipelineBuilder, PipelineConfig, PipelineOutput, Table};
use recdedup_formats::{open_dataset, open_dataset_with, write_json, write_rows};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use progress::StageProgress;

#[derive(Parser)]
#[command(name = "recdedup")]
#[command(version, about = "Entity resolution and record deduplication", long_about = None)]
#[command(author = "recdedup")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output statistics in JSON format
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full resolution pipeline on a dataset
    Run {
        /// Input file (JSON array or JSON Lines, optionally gzipped)
        #[arg(short, long)]
        input: PathBuf,

        /// Pipeline config file (YAML or TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Format of the written tables
        #[arg(long, value_enum, default_value_t = TableFormat::Json)]
        format: TableFormat,

        /// Also write the intermediate table of every stage
        #[arg(long)]
        emit_stages: bool,

        /// Number the records 0..n instead of reading their `ID` column
        #[arg(long)]
        assign_ids: bool,

        /// Worker threads for pair comparison (defaults to all cores)
        #[arg(short = 't', long)]
        threads: Option<usize>,

        /// Show statistics without writing output
        #[arg(long)]
        dry_run: bool,

        /// Fail on malformed JSON Lines instead of skipping them
        #[arg(long)]
        strict: bool,
    },

    /// Validate a pipeline config file without running it
    CheckConfig {
        /// Pipeline config file (YAML or TOML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Write a starter pipeline config file
    InitConfig {
        /// Destination (.yaml, .yml or .toml)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Inspect a dataset file
    Inspect {
        /// Path to the dataset file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Number of records to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Count records in a dataset
    Count {
        /// Path to the dataset file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TableFormat {
    Json,
    Jsonl,
}

impl TableFormat {
    fn extension(self) -> &'static str {
        match self {
            TableFormat::Json => "json",
            TableFormat::Jsonl => "jsonl",
        }
    }
}

struct RunArgs {
    input: PathBuf,
    config: PathBuf,
    output: PathBuf,
    format: TableFormat,
    emit_stages: bool,
    assign_ids: bool,
    threads: Option<usize>,
    dry_run: bool,
    strict: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.json) // Disable colors if JSON output
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            input,
            config,
            output,
            format,
            emit_stages,
            assign_ids,
            threads,
            dry_run,
            strict,
        } => {
            let args = RunArgs {
                input,
                config,
                output,
                format,
                emit_stages,
                assign_ids,
                threads,
                dry_run,
                strict,
            };
            run_pipeline(args, cli.json)?;
        }
        Commands::CheckConfig { config } => {
            check_config(&config, cli.json)?;
        }
        Commands::InitConfig { output } => {
            config::save(&config::example(), &output)?;
            info!("Wrote starter config to {:?}", output);
        }
        Commands::Inspect { input, limit } => {
            inspect_dataset(&input, limit)?;
        }
        Commands::Count { input } => {
            count_dataset(&input)?;
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
    }

    Ok(())
}

/// Read a dataset into a table, showing progress while loading
fn load_table(input: &Path, assign_ids: bool, strict: bool, show_progress: bool) -> Result<Table> {
    let mut reader = open_dataset_with(input, strict)
        .with_context(|| format!("Failed to open dataset: {}", input.display()))?;
    let bar = progress::load_bar(reader.total_bytes(), show_progress);

    let mut rows: Vec<Map<String, Value>> = Vec::new();
    while let Some(result) = reader.next() {
        let record = result.with_context(|| format!("Failed to read {}", input.display()))?;
        rows.push(record.into_object()?);

        if rows.len() % 1000 == 0 {
            bar.set_position(reader.bytes_processed());
            bar.set_message(format!("{} records", rows.len()));
        }
    }
    bar.finish_and_clear();
    info!("Loaded {} records from {:?}", rows.len(), input);
    if reader.skipped_records() > 0 {
        warn!(
            "Skipped {} malformed records (pass --strict to fail instead)",
            reader.skipped_records()
        );
    }

    let table = if assign_ids {
        Table::from_rows_assigning_ids(rows)
    } else {
        Table::from_json_records(rows.into_iter().map(Value::Object).collect())
            .context("Dataset rows need a unique integer ID column (or pass --assign-ids)")?
    };
    Ok(table)
}

fn build_pipeline(config: &PipelineConfig, threads: Option<usize>) -> Result<recdedup_core::Pipeline> {
    let mut builder = PipelineBuilder::new()
        .blocking(config.blocking.clone())
        .comparison(config.comparison.clone())
        .classification(config.classification.clone());
    if let Some(preprocessing) = &config.preprocessing {
        builder = builder.preprocessing(preprocessing.clone());
    }
    if let Some(threads) = threads {
        builder = builder.num_threads(threads);
    }
    Ok(builder.build()?)
}

fn run_pipeline(args: RunArgs, json_output: bool) -> Result<()> {
    info!("Running resolution pipeline");
    info!("  Input: {:?}", args.input);
    if !args.dry_run {
        info!("  Output: {:?}", args.output);
    }
    info!("  Config: {:?}", args.config);

    let config = config::load(&args.config)?;
    let pipeline = build_pipeline(&config, args.threads).context("Invalid pipeline configuration")?;
    let table = load_table(&args.input, args.assign_ids, args.strict, !json_output)?;

    let mut stages = StageProgress::new(!json_output);
    let output = pipeline
        .run_with(&table, |stage| stages.start(stage))
        .context("Pipeline failed")?;
    let timings = stages.finish();

    if !args.dry_run {
        write_outputs(&output, &args.output, args.format, args.emit_stages)?;
    }

    let stats = output.stats();
    let statistics = &output.evaluation.statistics;

    if json_output {
        let report = json!({
            "input": args.input.to_string_lossy().to_string(),
            "output": if args.dry_run { Value::Null } else { Value::String(args.output.to_string_lossy().to_string()) },
            "total_records": stats.total_records,
            "exact_duplicates": stats.exact_duplicates,
            "blocks": stats.blocks,
            "candidate_pairs": stats.candidate_pairs,
            "matches": stats.matches,
            "unique_records": stats.unique_records,
            "deduplication_rate": stats.deduplication_rate(),
            "statistics": statistics,
            "steps": output.steps(),
            "dry_run": args.dry_run,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        progress::print_summary_report(
            &args.input,
            if args.dry_run { None } else { Some(&args.output) },
            &stats,
            statistics,
            &timings,
        );
    }

    Ok(())
}

/// Write the evaluation views, plus every stage table when asked
fn write_outputs(
    output: &PipelineOutput,
    dir: &Path,
    format: TableFormat,
    emit_stages: bool,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    let table_path = |name: &str| dir.join(format!("{}.{}", name, format.extension()));

    let evaluation = &output.evaluation;
    write_table(&table_path("deduplicated"), &evaluation.deduplicated.to_json_records())?;
    write_table(&table_path("matches"), &evaluation.matches_to_json())?;
    let statistics_path = dir.join("statistics.json");
    write_json(&statistics_path, &evaluation.statistics)
        .with_context(|| format!("Failed to write {}", statistics_path.display()))?;

    if emit_stages {
        if let Some(preprocessed) = &output.preprocessed {
            write_table(&table_path("preprocessed"), &preprocessed.table.to_json_records())?;
            if !preprocessed.warnings.is_empty() {
                warn!(
                    "{} preprocessing warnings, see steps.json",
                    preprocessed.warnings.len()
                );
            }
        }
        write_table(&table_path("blocks"), &output.blocked.to_json_records())?;
        write_table(&table_path("comparisons"), &output.comparisons.to_json_records())?;
        write_table(&table_path("classified"), &output.classified.to_json_records())?;

        let steps_path = dir.join("steps.json");
        let warnings = output
            .preprocessed
            .as_ref()
            .map(|p| p.warnings.clone())
            .unwrap_or_default();
        write_json(
            &steps_path,
            &json!({"steps": output.steps(), "warnings": warnings}),
        )
        .with_context(|| format!("Failed to write {}", steps_path.display()))?;
    }

    info!("Wrote results to {:?}", dir);
    Ok(())
}

fn write_table(path: &Path, rows: &[Value]) -> Result<()> {
    write_rows(path, rows).with_context(|| format!("Failed to write {}", path.display()))
}

fn check_config(path: &Path, json_output: bool) -> Result<()> {
    let config = config::load(path)?;
    config
        .validate()
        .with_context(|| format!("Invalid pipeline configuration: {}", path.display()))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let blocking = config.blocking.strategy()?;
        println!("Configuration OK: {}", path.display());
        println!(
            "  Preprocessing:  {}",
            if config.preprocessing.is_some() { "enabled" } else { "disabled" }
        );
        println!(
            "  Blocking:       {} on {}",
            blocking.name(),
            config.blocking.columns.join(", ")
        );
        let metrics: Vec<String> = config
            .comparison
            .metrics()?
            .into_iter()
            .map(|(column, metric)| format!("{}={}", column, metric))
            .collect();
        println!("  Comparison:     {}", metrics.join(", "));
        println!(
            "  Classification: {}",
            config.classification.method()?.name()
        );
    }

    Ok(())
}

fn inspect_dataset(input: &Path, limit: usize) -> Result<()> {
    info!("Inspecting dataset: {:?}", input);

    let mut reader = open_dataset(input)?;
    let mut count = 0;

    while let Some(result) = reader.next() {
        let record = result?;
        println!(
            "Record #{}: {}",
            record.source_line,
            serde_json::to_string_pretty(&record.data)?
        );

        count += 1;
        if count >= limit {
            break;
        }
    }

    info!(
        "Processed {} records ({} bytes)",
        reader.records_processed(),
        reader.bytes_processed()
    );

    Ok(())
}

fn count_dataset(input: &Path) -> Result<()> {
    info!("Counting records in: {:?}", input);

    let mut reader = open_dataset(input)?;
    let bar = reader
        .total_bytes()
        .map(|total| progress::load_bar(Some(total), true));

    let mut count = 0;
    while let Some(result) = reader.next() {
        let _record = result?;
        count += 1;

        if let Some(ref bar) = bar {
            bar.set_position(reader.bytes_processed());
        }

        if count % 10000 == 0 {
            info!("Processed {} records...", count);
        }
    }

    if let Some(bar) = bar {
        bar.finish();
    }

    println!("Total records: {}", count);
    info!("Processed {} bytes", reader.bytes_processed());

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "recdedup",
            "run",
            "-i",
            "people.json",
            "-c",
            "pipeline.yaml",
            "-o",
            "out",
            "--emit-stages",
            "--format",
            "jsonl",
            "--strict",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                emit_stages,
                format,
                assign_ids,
                strict,
                ..
            } => {
                assert!(emit_stages);
                assert!(strict);
                assert!(!assign_ids);
                assert_eq!(format, TableFormat::Jsonl);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("people.jsonl");
        std::fs::write(
            &input,
            concat!(
                "{\"name\": \"meyer\", \"city\": \"berlin\"}\n",
                "{\"name\": \"meyer\", \"city\": \"berlin\"}\n",
                "{\"name\": \"schulz\", \"city\": \"hamburg\"}\n",
            ),
        )
        .unwrap();
        let config_path = dir.path().join("pipeline.yaml");
        std::fs::write(
            &config_path,
            r#"
blocking:
  algorithm: standardBlocking
  columns: [name]
comparison:
  selectedAlgorithms:
    name: Levenshtein
    city: Levenshtein
classification:
  classificationType: threshold
  thresholdMatch: 0.9
"#,
        )
        .unwrap();
        let out = dir.path().join("out");

        run_pipeline(
            RunArgs {
                input,
                config: config_path,
                output: out.clone(),
                format: TableFormat::Json,
                emit_stages: true,
                assign_ids: true,
                threads: None,
                dry_run: false,
                strict: true,
            },
            true,
        )
        .unwrap();

        let deduplicated = recdedup_formats::load_rows(out.join("deduplicated.json")).unwrap();
        assert_eq!(deduplicated.len(), 2);
        assert_eq!(deduplicated[0]["ID"], 0);
        assert_eq!(deduplicated[1]["ID"], 2);

        let matches = recdedup_formats::load_rows(out.join("matches.json")).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1]["dropped"], "YES");

        let statistics: Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("statistics.json")).unwrap())
                .unwrap();
        assert_eq!(statistics["detected_duplicates"], 1);

        for stage in ["blocks", "comparisons", "classified"] {
            assert!(out.join(format!("{}.json", stage)).exists());
        }
        assert!(out.join("steps.json").exists());
        assert!(!out.join("preprocessed.json").exists());
    }

    #[test]
    fn test_missing_ids_need_assign_flag() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("people.json");
        std::fs::write(&input, r#"[{"name": "meyer"}]"#).unwrap();

        assert!(load_table(&input, false, false, false).is_err());
        let table = load_table(&input, true, false, false).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_strict_rejects_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("people.jsonl");
        std::fs::write(&input, "{\"name\": \"meyer\"}\n{broken\n{\"name\": \"schulz\"}\n").unwrap();

        let table = load_table(&input, true, false, false).unwrap();
        assert_eq!(table.len(), 2);

        let err = load_table(&input, true, true, false).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
