//! MCDC CLI - Command-line interface
//!
//! Commands:
//!   analyze   - Extract decisions from C source, generate truth tables and
//!               minimal MC/DC test vectors (writes the vector dataset)
//!   coverage  - Map executed test results onto a vector dataset and report
//!               MC/DC coverage achieved
//!   schema    - Print JSON schema for the serialized record types

use mcdc::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "analyze" => cmd_analyze(&args[2..]).map(|_| ExitCode::SUCCESS),
        "coverage" => cmd_coverage(&args[2..]),
        "schema" => cmd_schema(&args[2..]).map(|_| ExitCode::SUCCESS),
        "version" | "--version" | "-v" => {
            println!("mcdc {}", VERSION);
            Ok(ExitCode::SUCCESS)
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(ExitCode::SUCCESS)
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err("Unknown command".into())
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"
mcdc - MC/DC coverage analysis for safety-critical C

USAGE:
    mcdc <COMMAND> [OPTIONS]

COMMANDS:
    analyze [options] <file.c> ...   Extract compound boolean decisions,
                                     build truth tables and minimal MC/DC
                                     test vectors, write the vector dataset
    coverage --vectors <json>        Map test results onto a vector dataset
             --results <json>        and report MC/DC coverage achieved
    schema [name]                    Print JSON schema for an output type
    version                          Print version

OPTIONS (analyze):
    -I, --include <dir>              Include directory (repeatable)
    --project <name>                 Project name for the dataset
    --sil <level>                    Safety integrity level (default: 3)
    --syntax-tree                    Use the syntax-tree extraction path
    --preprocess                     Run cc -E before syntax-tree parsing
    --config <mcdc.yaml>             Project config file (default: probe cwd)
    -o, --output <file>              Dataset path (default: MC-DC-Vectors.json)

OPTIONS (coverage):
    --vectors <file>                 Vector dataset from a prior analyze run
    --results <file>                 Executed test results
    --project <name>                 Override the dataset's project name
    --sil <level>                    Override the dataset's SIL level
    -o, --output <file>              Report path (default: MC-DC-Coverage.json)

EXAMPLES:
    mcdc analyze -I src --project train_door_control src/*.c
    mcdc coverage --vectors MC-DC-Vectors.json --results test-results.json
    mcdc schema dataset
"#
    );
}

struct AnalyzeArgs {
    sources: Vec<PathBuf>,
    include_dirs: Vec<PathBuf>,
    project: Option<String>,
    sil_level: Option<u32>,
    syntax_tree: bool,
    preprocess: bool,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn parse_analyze_args(args: &[String]) -> Result<AnalyzeArgs> {
    let mut parsed = AnalyzeArgs {
        sources: Vec::new(),
        include_dirs: Vec::new(),
        project: None,
        sil_level: None,
        syntax_tree: false,
        preprocess: false,
        config: None,
        output: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-I" | "--include" => {
                i += 1;
                let dir = args.get(i).ok_or("missing value for --include")?;
                parsed.include_dirs.push(PathBuf::from(dir));
            }
            arg if arg.starts_with("-I") && arg.len() > 2 => {
                parsed.include_dirs.push(PathBuf::from(&arg[2..]));
            }
            "--project" => {
                i += 1;
                parsed.project = Some(args.get(i).ok_or("missing value for --project")?.clone());
            }
            "--sil" => {
                i += 1;
                let value = args.get(i).ok_or("missing value for --sil")?;
                parsed.sil_level = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid SIL level: {}", value))?,
                );
            }
            "--syntax-tree" => parsed.syntax_tree = true,
            "--preprocess" => parsed.preprocess = true,
            "--config" => {
                i += 1;
                parsed.config = Some(PathBuf::from(
                    args.get(i).ok_or("missing value for --config")?,
                ));
            }
            "-o" | "--output" => {
                i += 1;
                parsed.output = Some(PathBuf::from(
                    args.get(i).ok_or("missing value for --output")?,
                ));
            }
            arg if arg.starts_with('-') => {
                return Err(format!("unknown option: {}", arg).into());
            }
            arg => parsed.sources.push(PathBuf::from(arg)),
        }
        i += 1;
    }
    Ok(parsed)
}

fn cmd_analyze(args: &[String]) -> Result<()> {
    let parsed = parse_analyze_args(args)?;

    let config = match &parsed.config {
        Some(path) => ProjectConfig::load(path)?,
        None => ProjectConfig::discover(".")?.unwrap_or_default(),
    };

    let mut sources = parsed.sources;
    if sources.is_empty() {
        sources = config.sources.iter().map(PathBuf::from).collect();
    }
    if sources.is_empty() {
        return Err("No source files specified. Usage: mcdc analyze [options] <file.c> ...".into());
    }

    let c_files: Vec<PathBuf> = sources
        .into_iter()
        .filter(|p| {
            let is_c = p.extension().is_some_and(|ext| ext == "c");
            if !is_c {
                eprintln!("[WARN] Skipping non-C file: {}", p.display());
            }
            is_c
        })
        .collect();
    if c_files.is_empty() {
        return Err("No .c files found in the provided paths.".into());
    }

    let mut include_dirs = parsed.include_dirs;
    if include_dirs.is_empty() {
        include_dirs = config.include_dirs.iter().map(PathBuf::from).collect();
    }
    let project = parsed.project.unwrap_or(config.project);
    let sil_level = parsed.sil_level.unwrap_or(config.sil_level);
    let syntax_tree = parsed.syntax_tree || config.syntax_tree;

    println!("[INFO] Analyzing {} source file(s)...", c_files.len());

    let mut session = ExtractionSession::new();
    let decisions = if syntax_tree {
        let ast_config = AstConfig {
            preprocess: parsed.preprocess,
            ..AstConfig::default()
        };
        AstExtractor::with_config(ast_config).extract(&mut session, &c_files, &include_dirs)
    } else {
        Extractor::new().extract(&mut session, &c_files)
    };

    if !session.any_usable_input() {
        return Err("No usable source files (all missing or unreadable).".into());
    }

    println!(
        "[INFO] Found {} compound boolean decision(s)",
        decisions.len()
    );
    if decisions.is_empty() {
        eprintln!("[WARN] No compound boolean decisions found. Check source paths.");
    }

    let results = analyze_all(&decisions);
    for result in &results {
        for warning in &result.warnings {
            eprintln!("[WARN] {}", warning);
        }
    }

    let total_vectors: usize = results.iter().map(|r| r.minimal_vectors.len()).sum();
    let achievable = results.iter().filter(|r| r.is_achievable).count();

    let mut dataset = VectorDataset::from_results(&results, &project, sil_level);
    for file in &c_files {
        if let Ok(content) = std::fs::read_to_string(file) {
            dataset.record_digest(&file.to_string_lossy(), &content);
        }
    }

    let output = parsed.output.unwrap_or_else(|| {
        let dir = config.output_dir.as_deref().unwrap_or(".");
        Path::new(dir).join("MC-DC-Vectors.json")
    });
    dataset.save(&output)?;

    println!();
    println!("[SUMMARY] MC/DC Analysis Complete");
    println!("  Decisions:       {}", results.len());
    println!("  Total vectors:   {}", total_vectors);
    println!("  Achievable:      {}/{}", achievable, results.len());
    println!("  Vectors JSON:    {}", output.display());

    Ok(())
}

fn cmd_coverage(args: &[String]) -> Result<ExitCode> {
    let mut vectors: Option<PathBuf> = None;
    let mut results_path: Option<PathBuf> = None;
    let mut project: Option<String> = None;
    let mut sil_level: Option<u32> = None;
    let mut output: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--vectors" => {
                i += 1;
                vectors = Some(PathBuf::from(
                    args.get(i).ok_or("missing value for --vectors")?,
                ));
            }
            "--results" => {
                i += 1;
                results_path = Some(PathBuf::from(
                    args.get(i).ok_or("missing value for --results")?,
                ));
            }
            "--project" => {
                i += 1;
                project = Some(args.get(i).ok_or("missing value for --project")?.clone());
            }
            "--sil" => {
                i += 1;
                let value = args.get(i).ok_or("missing value for --sil")?;
                sil_level = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid SIL level: {}", value))?,
                );
            }
            "-o" | "--output" => {
                i += 1;
                output = Some(PathBuf::from(
                    args.get(i).ok_or("missing value for --output")?,
                ));
            }
            arg => return Err(format!("unknown option: {}", arg).into()),
        }
        i += 1;
    }

    let vectors = vectors.ok_or("--vectors <MC-DC-Vectors.json> is required")?;
    let results_path = results_path.ok_or("--results <test-results.json> is required")?;

    println!("[INFO] Loading vectors from: {}", vectors.display());
    let mut dataset = VectorDataset::load(&vectors)?;
    if let Some(project) = project {
        dataset.project = project;
    }
    if let Some(sil_level) = sil_level {
        dataset.sil_level = sil_level;
    }

    println!("[INFO] Loading test results from: {}", results_path.display());
    let executed = TestResults::load(&results_path)?;

    println!("[INFO] Computing MC/DC coverage...");
    let report = compute_coverage(&dataset, &executed);

    let output = output.unwrap_or_else(|| PathBuf::from("MC-DC-Coverage.json"));
    report.save(&output)?;

    println!();
    println!("[SUMMARY] MC/DC Coverage Report Complete");
    println!("  Project:           {}", report.project);
    println!("  SIL Level:         {}", report.sil_level);
    println!("  Decisions:         {}", report.total_decisions);
    println!(
        "  Fully covered:     {}/{}",
        report.fully_covered_decisions, report.total_decisions
    );
    println!("  Overall coverage:  {:.1}%", report.overall_coverage_pct);
    println!(
        "  Vector coverage:   {:.1}%",
        report.overall_vector_coverage_pct
    );
    println!(
        "  SIL {} requirement: {}",
        report.sil_level,
        if report.meets_requirement { "PASS" } else { "FAIL" }
    );
    if !report.gap_summary.is_empty() {
        println!();
        println!("  Coverage gaps:");
        for gap in &report.gap_summary {
            println!("    - {}", gap);
        }
    }
    println!();
    println!("  Coverage report:   {}", output.display());

    Ok(if report.meets_requirement {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn cmd_schema(args: &[String]) -> Result<()> {
    let schema_name = args.first().map(|s| s.as_str()).unwrap_or("list");

    match schema_name {
        "list" => {
            println!("Available schemas: dataset, results, report, config");
            Ok(())
        }
        "dataset" => print_schema::<VectorDataset>(),
        "results" => print_schema::<TestResults>(),
        "report" => print_schema::<CoverageReport>(),
        "config" => print_schema::<ProjectConfig>(),
        _ => Err(format!("Unknown schema: {}", schema_name).into()),
    }
}

fn print_schema<T: schemars::JsonSchema>() -> Result<()> {
    let schema = schemars::schema_for!(T);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
