use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;
use xpi_lint::cli::{AnalyzeArgs, Args, Command, OutputFormat};
use xpi_lint::level::Severity;
use xpi_lint::{CompatContext, Diagnostic, Engine, ErrorBundle, LintSettings, Metadata, catalog, config};

fn main() -> ExitCode {
    xpi_lint::telemetry::init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Some(Command::ListHazards) => {
            list_hazards();
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Explain { path }) => {
            explain_path(&path)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Analyze(analyze)) => analyze_command(analyze),
        None => analyze_command(args.analyze),
    }
}

fn list_hazards() {
    let catalog = catalog::global();
    for (path, entity) in catalog.entries() {
        let mut flags = Vec::new();
        if entity.on_read.is_some() {
            flags.push("on-read");
        }
        if entity.on_call.is_some() {
            flags.push("on-call");
        }
        if entity.read_only {
            flags.push("read-only");
        }
        if entity.frozen {
            flags.push("frozen");
        }
        if let Some(alias) = entity.alias {
            println!("{path}\t-> {alias}\t{}", entity.summary);
            continue;
        }
        println!("{path}\t[{}]\t{}", flags.join(","), entity.summary);
    }
    for name in catalog.banned_identifiers() {
        println!("{name}\t[banned]\tidentifier may not be used");
    }
}

fn explain_path(path: &str) -> anyhow::Result<()> {
    let catalog = catalog::global();
    let Some(entity) = catalog.entity(path) else {
        if catalog.banned_identifier(path) {
            println!("path: {path}");
            println!("banned identifier: any use is an error");
            return Ok(());
        }
        anyhow::bail!("unknown catalog path: {path}");
    };
    let resolved = catalog.resolve(path);

    println!("path: {path}");
    if resolved != path {
        println!("alias of: {resolved}");
    }
    println!("summary: {}", entity.summary);
    println!("read-only: {}", catalog.is_read_only(path));
    if let Some(target) = catalog.resolved(path) {
        for (when, hazard) in [("read", target.on_read), ("call", target.on_call)] {
            let Some(hazard) = hazard else {
                continue;
            };
            let id = format!(
                "javascript/{}/{}",
                hazard.function,
                hazard.reason.unwrap_or(resolved)
            );
            println!("on {when}: {} {id}", hazard.severity.as_str());
            if let catalog::HazardMessage::Static { message, .. } = hazard.message {
                println!("  message: {message}");
            } else {
                println!("  message: computed from call arguments");
            }
            if hazard.applies.bootstrap_only {
                println!("  applies: bootstrapped add-ons only");
            }
            if hazard.applies.jetpack_only {
                println!("  applies: SDK add-ons only");
            }
            for range in hazard.applies.versions {
                let max = range.max.unwrap_or("*");
                println!("  applies: {} [{}, {max})", range.app, range.min);
            }
        }
    }
    Ok(())
}

fn analyze_command(args: AnalyzeArgs) -> anyhow::Result<ExitCode> {
    let start_dir = infer_start_dir(&args)?;
    let loaded_cfg = config::load_config(args.config.as_deref(), &start_dir)?;

    let (settings, mut metadata, mut compat) = match loaded_cfg.as_ref() {
        Some((_path, cfg)) => (cfg.settings(), cfg.metadata()?, cfg.compat()),
        None => (LintSettings::default(), Metadata::new(), CompatContext::new()),
    };
    // CLI flag takes precedence over config
    let settings = if args.strict { settings.strict(true) } else { settings };
    for entry in &args.metadata {
        let (key, value) = split_pair(entry, "--metadata")?;
        metadata.set(key, parse_metadata_value(value));
    }
    for entry in &args.targets {
        let (app, version) = split_pair(entry, "--target")?;
        compat.add_target(app, version);
    }

    let engine = Engine::new_with_settings(settings)
        .with_metadata(metadata)
        .with_compat(compat);

    let mut bundles = Vec::new();
    if args.paths.is_empty() {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        bundles.push(engine.analyze_named(&source, Some("stdin"))?);
    } else {
        for path in collect_estree_files(&args.paths)? {
            let bundle = engine
                .analyze_file(&path)
                .with_context(|| format!("failed to analyze {}", path.display()))?;
            bundles.push(bundle);
        }
    }

    let failed = bundles.iter().any(ErrorBundle::failed);
    let mut diagnostics: Vec<Diagnostic> = bundles
        .into_iter()
        .flat_map(ErrorBundle::into_diagnostics)
        .collect();

    match args.format {
        OutputFormat::Json => {
            diagnostics.sort_by(|a, b| {
                (a.file.as_deref(), a.position, &a.id).cmp(&(b.file.as_deref(), b.position, &b.id))
            });
            println!("{}", serde_json::to_string_pretty(&diagnostics)?);
        }
        OutputFormat::Pretty => {
            for diag in &diagnostics {
                println!("{}", diag.render());
                for line in &diag.description {
                    println!("    {line}");
                }
            }
            let count = |severity: Severity| diagnostics.iter().filter(|d| d.severity == severity).count();
            println!(
                "{} errors, {} warnings, {} notices",
                count(Severity::Error),
                count(Severity::Warning),
                count(Severity::Notice)
            );
        }
    }

    Ok(if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

fn split_pair<'s>(entry: &'s str, flag: &str) -> anyhow::Result<(&'s str, &'s str)> {
    entry
        .split_once('=')
        .with_context(|| format!("{flag} expects KEY=VALUE, got `{entry}`"))
}

/// `true`/`false`/numbers become JSON scalars; everything else is a string.
fn parse_metadata_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn collect_estree_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        if !path.is_dir() {
            out.push(path.clone());
            continue;
        }
        let walker = WalkDir::new(path)
            .into_iter()
            .filter_entry(|e| !should_skip_dir(e.path()));
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some("json")
            {
                out.push(entry.into_path());
            }
        }
    }

    out.sort();
    out.dedup();
    Ok(out)
}

fn should_skip_dir(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };

    path.is_dir() && matches!(name, ".git" | "target" | "node_modules")
}

fn infer_start_dir(args: &AnalyzeArgs) -> anyhow::Result<PathBuf> {
    let base = if let Some(p) = args.paths.first() {
        p.clone()
    } else {
        std::env::current_dir()?
    };

    let base = if base.is_file() {
        base.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        base
    };

    Ok(base)
}
