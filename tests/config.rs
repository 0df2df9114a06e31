mod support;

use std::path::Path;
use support::*;
use xpi_lint::compat::FIREFOX_GUID;
use xpi_lint::config;
use xpi_lint::level::Severity;
use xpi_lint::{Engine, ErrorBundle};

const CONFIG: &str = r#"
strict = true

[metadata]
"em:bootstrap" = true

[target]
"{ec8030f7-c20a-464f-9b0e-13a3a9e97384}" = ["21.0"]

[lints]
disabled = ["javascript/set_innerHTML"]
"javascript/dangerous_global/eval" = "error"
"#;

fn engine_from(path: &Path) -> Engine {
    let cfg = config::load_config_file(path).expect("config should load");
    Engine::new_with_settings(cfg.settings())
        .with_metadata(cfg.metadata().expect("metadata should convert"))
        .with_compat(cfg.compat())
}

fn run(engine: &Engine, ast: &serde_json::Value) -> ErrorBundle {
    engine
        .analyze_source(&ast.to_string())
        .expect("analysis should succeed")
}

#[test]
fn config_is_found_from_nested_directories() {
    let tmp = tempfile::tempdir().expect("temp dir should create");
    let nested = tmp.path().join("chrome/content");
    std::fs::create_dir_all(&nested).expect("dirs should create");
    std::fs::write(tmp.path().join(config::DEFAULT_CONFIG_FILE_NAME), CONFIG)
        .expect("config should write");

    let (found, cfg) = config::load_config(None, &nested)
        .expect("config should load")
        .expect("config should be discovered");
    assert_eq!(found, tmp.path().join(config::DEFAULT_CONFIG_FILE_NAME));
    assert!(cfg.strict);
    assert_eq!(cfg.lints.disabled, vec!["javascript/set_innerHTML"]);
}

#[test]
fn invalid_config_reports_the_path() {
    let tmp = tempfile::tempdir().expect("temp dir should create");
    let cfg_path = tmp.path().join(config::DEFAULT_CONFIG_FILE_NAME);
    std::fs::write(&cfg_path, "[lints]\n\"javascript/x\" = \"loud\"\n")
        .expect("config should write");

    let err = config::load_config_file(&cfg_path).expect_err("level should be rejected");
    assert!(format!("{err:#}").contains("failed to parse config file"));
}

#[test]
fn config_levels_promote_and_disable() {
    let tmp = tempfile::tempdir().expect("temp dir should create");
    let cfg_path = tmp.path().join(config::DEFAULT_CONFIG_FILE_NAME);
    std::fs::write(&cfg_path, CONFIG).expect("config should write");
    let engine = engine_from(&cfg_path);

    let ast = program(vec![
        expr(call(ident("eval"), vec![lit("x")])),
        expr(assign(member(ident("el"), "innerHTML"), ident("markup"))),
    ]);
    let bundle = run(&engine, &ast);

    assert_eq!(ids(bundle.diagnostics()), vec!["javascript/dangerous_global/eval"]);
    assert_eq!(bundle.diagnostics()[0].severity, Severity::Error);
    assert!(bundle.failed());
}

#[test]
fn config_seeds_metadata_and_targets() {
    let tmp = tempfile::tempdir().expect("temp dir should create");
    let cfg_path = tmp.path().join(config::DEFAULT_CONFIG_FILE_NAME);
    std::fs::write(&cfg_path, CONFIG).expect("config should write");
    let cfg = config::load_config_file(&cfg_path).expect("config should load");

    assert!(cfg.metadata().expect("metadata").is_bootstrapped());
    let compat = cfg.compat();
    assert!(!compat.is_empty());
    assert_eq!(
        compat.matching(&[xpi_lint::compat::VersionRange::firefox("20.0a1")])[FIREFOX_GUID],
        vec!["21.0".to_string()]
    );

    let engine = engine_from(&cfg_path);
    let ast = program(vec![expr(call(
        path("Services.obs.addObserver"),
        vec![ident("observer"), lit("topic"), lit(false)],
    ))]);
    let bundle = run(&engine, &ast);
    assert_eq!(bundle.count(Severity::Notice), 1);
    // Strict mode fails on warnings, not notices.
    assert!(!bundle.failed());
}
