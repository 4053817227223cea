use std::path::{Path, PathBuf};
use std::process::ExitCode;

use budget_pdf::config;
use budget_pdf::error::BudgetPdfError;
use budget_pdf::pipeline::service::Pipeline;
use tracing_subscriber::EnvFilter;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

fn print_usage() {
    eprintln!("Usage: budget_pdf [--settings <settings.yaml>] <command> ...");
    eprintln!("  image <input> <output.jpg>          Normalize and validate one image.");
    eprintln!("  pdf <output.pdf> <image>...         Build a size-bounded PDF from images.");
    eprintln!("  merge <output.pdf> <document.pdf>...  Merge PDFs into one size-bounded PDF.");
}

fn main() -> ExitCode {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("budget_pdf {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings_path = match take_option(&mut args, "--settings") {
        Ok(p) => p.map(PathBuf::from),
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    let settings = match config::load_settings(settings_path.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: Failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match Pipeline::new(&settings) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match args.split_first() {
        Some((command, rest)) => match command.as_str() {
            "image" => run_image(&pipeline, rest),
            "pdf" => run_pdf(&pipeline, rest),
            "merge" => run_merge(&pipeline, rest),
            other => {
                eprintln!("ERROR: Unknown command '{other}'");
                print_usage();
                return ExitCode::FAILURE;
            }
        },
        None => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `image <input> <output>`: the JPEG is only written when every criterion passes.
fn run_image(pipeline: &Pipeline, args: &[String]) -> budget_pdf::error::Result<ExitCode> {
    let [input, output] = args else {
        return Err(BudgetPdfError::invalid_input(
            "image expects <input> <output.jpg>",
        ));
    };
    check_extension(input, IMAGE_EXTENSIONS)?;

    let raw = std::fs::read(input)?;
    let outcome = pipeline.process_single_image(&raw)?;

    let report = serde_json::to_string_pretty(&outcome.report)
        .map_err(|e| BudgetPdfError::encode(format!("failed to render report: {e}")))?;
    println!("{report}");

    if !outcome.accepted() {
        eprintln!(
            "ERROR: {input}: processed but does not meet criteria: {}",
            outcome.report.failed().join(", ")
        );
        return Ok(ExitCode::FAILURE);
    }

    std::fs::write(output, outcome.asset.bytes())?;
    eprintln!("OK: {input} -> {output} ({} bytes)", outcome.asset.len());
    Ok(ExitCode::SUCCESS)
}

/// `pdf <output> <image>...`
fn run_pdf(pipeline: &Pipeline, args: &[String]) -> budget_pdf::error::Result<ExitCode> {
    let Some((output, inputs)) = args.split_first() else {
        return Err(BudgetPdfError::invalid_input(
            "pdf expects <output.pdf> <image>...",
        ));
    };
    let raws = read_inputs(inputs, IMAGE_EXTENSIONS)?;

    let document = pipeline.generate_document_from_images(&raws)?;
    std::fs::write(output, document.bytes())?;
    eprintln!(
        "OK: {} images -> {output} ({} bytes)",
        inputs.len(),
        document.len()
    );
    Ok(ExitCode::SUCCESS)
}

/// `merge <output> <document>...`
fn run_merge(pipeline: &Pipeline, args: &[String]) -> budget_pdf::error::Result<ExitCode> {
    let Some((output, inputs)) = args.split_first() else {
        return Err(BudgetPdfError::invalid_input(
            "merge expects <output.pdf> <document.pdf>...",
        ));
    };
    let raws = read_inputs(inputs, DOCUMENT_EXTENSIONS)?;

    let document = pipeline.merge_documents(&raws)?;
    std::fs::write(output, document.bytes())?;
    eprintln!(
        "OK: {} documents -> {output} ({} bytes)",
        inputs.len(),
        document.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn read_inputs(paths: &[String], extensions: &[&str]) -> budget_pdf::error::Result<Vec<Vec<u8>>> {
    if paths.is_empty() {
        return Err(BudgetPdfError::invalid_input("no input files given"));
    }
    for path in paths {
        check_extension(path, extensions)?;
    }
    paths
        .iter()
        .map(|p| std::fs::read(p).map_err(BudgetPdfError::from))
        .collect()
}

/// Reject files whose extension is not in `allowed` (case-insensitive).
fn check_extension(path: &str, allowed: &[&str]) -> budget_pdf::error::Result<()> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(()),
        _ => Err(BudgetPdfError::invalid_input(format!(
            "file type not allowed: {path} (expected {})",
            allowed.join(", ")
        ))),
    }
}

/// Remove `--name <value>` from `args`, returning the value.
fn take_option(args: &mut Vec<String>, name: &str) -> Result<Option<String>, String> {
    let Some(pos) = args.iter().position(|a| a == name) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        return Err(format!("{name} requires a value"));
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}
