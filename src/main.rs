//! Tsubame CLI - bidirectional Python / TypeScript converter

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tsubame::semantic::ApiSurface;
use tsubame::{
    convert_py_to_ts, convert_ts_to_py, default_surface, ConvertOptions, IdeQuery, PyEmitOptions,
    QueryKind,
};

/// Tsubame - Python to TypeScript converter, and back again
#[derive(Parser, Debug)]
#[command(name = "tsb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert Python source to TypeScript, or converter IR back to Python", long_about = None)]
struct Cli {
    /// Input file: Python source, or a JSON statement list with --reverse
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (default: <INPUT> with the extension swapped)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Reverse mode: read target-language IR as JSON and emit Python
    #[arg(short, long)]
    reverse: bool,

    /// Check only (don't generate output)
    #[arg(short, long)]
    check: bool,

    /// Emit JSON diagnostics to stderr (on failure only)
    #[arg(long)]
    diag_json: bool,

    /// API surface description (JSON); defaults to the builtin surface
    #[arg(long, value_name = "SURFACE")]
    api: Option<PathBuf>,

    /// Dump the parsed Python AST and exit
    #[arg(long)]
    dump_ast: bool,

    /// Also write the source map next to the output as <OUTPUT>.map.json
    #[arg(long)]
    source_map: bool,

    /// Answer an IDE query instead of writing output:
    /// symbol, signature, memberCompletion, or identifierCompletion
    #[arg(long, value_name = "KIND", requires = "position")]
    query: Option<String>,

    /// Byte offset for --query
    #[arg(long, value_name = "OFFSET")]
    position: Option<u32>,

    /// Disallow lambda output in reverse mode
    #[arg(long)]
    no_lambda: bool,

    /// Disallow class output in reverse mode
    #[arg(long)]
    no_classes: bool,

    /// Show conversion progress on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "tsubame=debug".into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let text = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("cannot read {}", cli.input.display()))?;

    if cli.reverse {
        return run_reverse(&cli, &text);
    }
    run_forward(&cli, &text)
}

fn run_forward(cli: &Cli, source: &str) -> Result<()> {
    let file_name = cli.input.display().to_string();

    if cli.dump_ast {
        let parsed = tsubame::parser::parse(source, Some(&file_name));
        for (i, &root) in parsed.body.iter().enumerate() {
            println!("[{:03}] {:?}", i, parsed.ast.kind(root));
        }
        print!("{}", parsed.diagnostics.to_text());
        return Ok(());
    }

    let surface = match &cli.api {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            Arc::new(
                ApiSurface::from_json(&json)
                    .with_context(|| format!("invalid API surface in {}", path.display()))?,
            )
        }
        None => default_surface(),
    };

    let options = ConvertOptions {
        query: parse_query(cli)?,
        ..Default::default()
    };
    let result = convert_py_to_ts(&[(file_name.as_str(), source)], &surface, &options);

    if let Some(answer) = &result.query_result {
        println!("{}", serde_json::to_string_pretty(answer)?);
        return Ok(());
    }

    if !result.success {
        print!("{}", result.diagnostics.to_text());
        if cli.diag_json {
            eprintln!("{}", result.diagnostics.to_json());
        }
        std::process::exit(1);
    }
    // warnings still print on success
    print!("{}", result.diagnostics.to_text());

    if cli.check {
        println!("OK: {} converts cleanly", cli.input.display());
        return Ok(());
    }

    let output = &result.outputs[0];
    let output_path = output_path(cli, "ts");
    std::fs::write(&output_path, &output.text)
        .with_context(|| format!("cannot write {}", output_path.display()))?;
    if cli.source_map {
        let map_path = output_path.with_extension("ts.map.json");
        std::fs::write(&map_path, serde_json::to_string_pretty(&output.source_map)?)
            .with_context(|| format!("cannot write {}", map_path.display()))?;
    }
    println!("Converted to: {}", output_path.display());
    Ok(())
}

fn run_reverse(cli: &Cli, json: &str) -> Result<()> {
    let stmts: Vec<tsubame::ir::TsStmt> =
        serde_json::from_str(json).context("input is not a JSON statement list")?;
    let options = PyEmitOptions {
        allow_lambda: !cli.no_lambda,
        allow_classes: !cli.no_classes,
    };
    let python = convert_ts_to_py(&stmts, &options)?;

    if cli.check {
        println!("OK: {} converts cleanly", cli.input.display());
        return Ok(());
    }
    let output_path = output_path(cli, "py");
    std::fs::write(&output_path, python)
        .with_context(|| format!("cannot write {}", output_path.display()))?;
    println!("Converted to: {}", output_path.display());
    Ok(())
}

fn parse_query(cli: &Cli) -> Result<Option<IdeQuery>> {
    let Some(kind) = &cli.query else {
        return Ok(None);
    };
    let kind = match kind.as_str() {
        "symbol" => QueryKind::Symbol,
        "signature" => QueryKind::Signature,
        "memberCompletion" => QueryKind::MemberCompletion,
        "identifierCompletion" => QueryKind::IdentifierCompletion,
        other => bail!(
            "unknown query kind `{other}` (expected symbol, signature, \
             memberCompletion, or identifierCompletion)"
        ),
    };
    // clap enforces the pairing
    let position = cli.position.expect("--query requires --position");
    Ok(Some(IdeQuery { position, kind }))
}

fn output_path(cli: &Cli, extension: &str) -> PathBuf {
    cli.output.clone().unwrap_or_else(|| {
        let mut p = cli.input.clone();
        p.set_extension(extension);
        match p.file_name() {
            Some(filename) => PathBuf::from(filename),
            None => p,
        }
    })
}
