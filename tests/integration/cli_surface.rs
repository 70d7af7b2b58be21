//! Command-line surface: layered configuration, report formats, exit codes

use crate::integration::test_utils::{with_xdg_env, Roots};
use clap::Parser;
use relocase::cli::{Cli, RunContext, EXIT_OK, EXIT_PROBLEMS};
use relocase::sync::OccupiedPolicy;
use relocase::{RelocaseConfig, SyncError};
use std::ffi::OsString;
use std::path::Path;
use tempfile::TempDir;

fn parse(roots: &Roots, extra: &[&str]) -> Cli {
    let mut args: Vec<OsString> = vec![
        "relocase".into(),
        roots.source().into_os_string(),
        roots.target().into_os_string(),
    ];
    args.extend(extra.iter().map(OsString::from));
    Cli::try_parse_from(args).unwrap()
}

fn execute(cli: &Cli) -> (i32, String) {
    let context = RunContext::with_config(RelocaseConfig::default(), false);
    let mut out = Vec::new();
    let code = context.execute(cli, &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

#[test]
fn test_clean_run_exits_zero() {
    let roots = Roots::new(&[("a.txt", "X"), ("c.txt", "Y")], &[("old/b.txt", "X")]);

    let (code, text) = execute(&parse(&roots, &[]));

    assert_eq!(code, EXIT_OK);
    assert!(text.contains("move       old/b.txt -> a.txt"));
    assert!(text.contains("copy       c.txt"));
}

#[test]
fn test_conflict_exits_one() {
    let roots = Roots::new(&[("a.txt", "new")], &[("a.txt", "old")]);

    let (code, text) = execute(&parse(&roots, &[]));

    assert_eq!(code, EXIT_PROBLEMS);
    assert!(text.contains("CONFLICT   a.txt (copy)"));
}

#[test]
fn test_dry_run_lines_and_summary() {
    let roots = Roots::new(&[("a.txt", "X"), ("c.txt", "Y")], &[("old/b.txt", "X")]);

    let (code, text) = execute(&parse(&roots, &["--dry-run"]));

    assert_eq!(code, EXIT_OK);
    assert!(text.contains("would move old/b.txt -> a.txt"));
    assert!(text.contains("would copy c.txt"));
    assert!(text.contains("Dry run summary"));
    assert!(roots.target().join("old").join("b.txt").exists());
}

#[test]
fn test_json_report() {
    let roots = Roots::new(&[("a.txt", "X"), ("d.txt", "Z")], &[("old/b.txt", "X"), ("d.txt", "Z")]);

    let (code, text) = execute(&parse(&roots, &["--format", "json"]));
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(code, EXIT_OK);
    assert_eq!(json["counts"]["moved"], 1);
    assert_eq!(json["counts"]["skipped"], 1);
    assert_eq!(json["entries"][0]["action"]["kind"], "move");
    assert_eq!(json["entries"][0]["action"]["from"], "old/b.txt");
    assert_eq!(json["entries"][1]["outcome"], "SKIPPED");
    assert_eq!(json["dry_run"], false);
}

#[test]
fn test_quiet_prints_only_problems() {
    let roots = Roots::new(&[("a.txt", "new"), ("b.txt", "B")], &[("a.txt", "old")]);

    let (code, text) = execute(&parse(&roots, &["--quiet"]));

    assert_eq!(code, EXIT_PROBLEMS);
    assert!(text.contains("CONFLICT"));
    assert!(!text.contains("copy       b.txt"));
    assert!(text.contains("Sync summary"));
}

fn write_config(path: &Path, body: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

#[test]
fn test_configuration_layers() {
    let test_dir = TempDir::new().unwrap();
    let explicit = test_dir.path().join("explicit.toml");
    write_config(
        &test_dir.path().join("relocase").join("config.toml"),
        "[sync]\non_occupied = \"overwrite\"\n\n[index]\ndir_name = \".from-global\"\n",
    );
    write_config(&explicit, "[index]\ndir_name = \".from-file\"\n");

    with_xdg_env(&test_dir, || {
        let bare = Cli::try_parse_from(["relocase", "s", "t"]).unwrap();
        let config = RunContext::new(&bare).unwrap().config().clone();
        assert_eq!(config.sync.on_occupied, OccupiedPolicy::Overwrite);
        assert_eq!(config.index.dir_name, ".from-global");

        let with_file = Cli::try_parse_from([
            OsString::from("relocase"),
            "s".into(),
            "t".into(),
            "--config".into(),
            explicit.clone().into_os_string(),
        ])
        .unwrap();
        let config = RunContext::new(&with_file).unwrap().config().clone();
        assert_eq!(config.index.dir_name, ".from-file");
        assert_eq!(config.sync.on_occupied, OccupiedPolicy::Overwrite);

        std::env::set_var("RELOCASE__INDEX__DIR_NAME", ".from-env");
        let from_env = RunContext::new(&with_file).map(|c| c.config().index.dir_name.clone());

        let overridden = Cli::try_parse_from([
            OsString::from("relocase"),
            "s".into(),
            "t".into(),
            "--config".into(),
            explicit.clone().into_os_string(),
            "--index-name".into(),
            ".from-cli".into(),
        ])
        .unwrap();
        let from_cli = RunContext::new(&overridden).map(|c| c.config().index.dir_name.clone());
        std::env::remove_var("RELOCASE__INDEX__DIR_NAME");

        assert_eq!(from_env.unwrap(), ".from-env");
        assert_eq!(from_cli.unwrap(), ".from-cli");
    });
}

#[test]
fn test_missing_explicit_config_is_error() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let cli = Cli::try_parse_from([
            OsString::from("relocase"),
            "s".into(),
            "t".into(),
            "--config".into(),
            test_dir.path().join("absent.toml").into_os_string(),
        ])
        .unwrap();
        assert!(matches!(RunContext::new(&cli), Err(SyncError::ConfigError(_))));
    });
}

#[test]
fn test_invalid_config_values_rejected() {
    let test_dir = TempDir::new().unwrap();
    let explicit = test_dir.path().join("bad.toml");
    write_config(
        &explicit,
        "[logging]\nlevel = \"loud\"\n\n[scan]\nignore = [\"a/b\"]\n",
    );
    with_xdg_env(&test_dir, || {
        let cli = Cli::try_parse_from([
            OsString::from("relocase"),
            "s".into(),
            "t".into(),
            "--config".into(),
            explicit.clone().into_os_string(),
        ])
        .unwrap();
        match RunContext::new(&cli) {
            Err(SyncError::ConfigError(msg)) => {
                assert!(msg.contains("Logging"));
                assert!(msg.contains("Scan"));
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("invalid configuration accepted"),
        }
    });
}

#[test]
fn test_same_root_is_fatal() {
    let roots = Roots::new(&[("a.txt", "X")], &[]);
    let cli = Cli::try_parse_from([
        OsString::from("relocase"),
        roots.source().into_os_string(),
        roots.source().into_os_string(),
    ])
    .unwrap();
    let context = RunContext::with_config(RelocaseConfig::default(), false);
    let mut out = Vec::new();
    assert!(matches!(
        context.execute(&cli, &mut out),
        Err(SyncError::Path { .. })
    ));
}
