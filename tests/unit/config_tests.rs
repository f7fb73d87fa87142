use std::fs;
use std::path::PathBuf;

use runt::config::{HarnessConfig, PROJECT_CONFIG_FILE};
use runt::test_utils::{TestCase, run_table_tests};
use runt::{Cancellation, RuntError, TestingContext, run, t_error};
use serial_test::serial;

#[test]
fn parses_documents() {
    let cases = vec![
        TestCase {
            name: "empty",
            input: "",
            expected: ("runt-".to_string(), None, false, true, false),
        },
        TestCase {
            name: "full",
            input: r#"
                [temp]
                prefix = "suite-"
                root = "/var/tmp/runt"
                keep = true

                [diagnostics]
                capture_traces = false
                echo_logs = true
            "#,
            expected: (
                "suite-".to_string(),
                Some(PathBuf::from("/var/tmp/runt")),
                true,
                false,
                true,
            ),
        },
    ];

    run_table_tests(cases, |raw: &str| {
        let config = HarnessConfig::from_toml(raw).expect("parse config");
        (
            config.temp.prefix,
            config.temp.root,
            config.temp.keep,
            config.diagnostics.capture_traces,
            config.diagnostics.echo_logs,
        )
    })
    .unwrap();
}

#[test]
#[serial]
fn project_file_is_loaded() {
    let project = tempfile::tempdir().unwrap();
    fs::write(
        project.path().join(PROJECT_CONFIG_FILE),
        "[temp]\nprefix = \"project-\"\n",
    )
    .unwrap();

    run(Cancellation::new(), |t| {
        let absent = project.path().join("absent.toml");
        t.setenv("RUNT_CONFIG", &absent.display().to_string());
        let config = HarnessConfig::load(None, project.path()).unwrap();
        if config.temp.prefix != "runt-" {
            t.error(&"RUNT_CONFIG must bypass the project file");
        }
    })
    .unwrap();

    // RUNT_CONFIG is unset again here.
    let config = HarnessConfig::load(None, project.path()).unwrap();
    assert_eq!(config.temp.prefix, "project-");
}

#[test]
#[serial]
fn explicit_path_wins() {
    let dir = tempfile::tempdir().unwrap();
    let explicit = dir.path().join("explicit.toml");
    fs::write(&explicit, "[diagnostics]\necho_logs = true\n").unwrap();

    let config = HarnessConfig::load(Some(explicit.as_path()), dir.path()).unwrap();
    assert!(config.diagnostics.echo_logs);
}

#[test]
#[serial]
fn env_overrides_apply_last() {
    let dir = tempfile::tempdir().unwrap();
    let explicit = dir.path().join("explicit.toml");
    fs::write(&explicit, "[temp]\nprefix = \"file-\"\nkeep = false\n").unwrap();

    run(Cancellation::new(), |t| {
        t.setenv("RUNT_TEMP_PREFIX", "env-");
        t.setenv("RUNT_TEMP_KEEP", "yes");
        t.setenv("RUNT_TEMP_ROOT", "");
        t.setenv("RUNT_CAPTURE_TRACES", "off");
        let config = HarnessConfig::load(Some(explicit.as_path()), dir.path()).unwrap();
        if config.temp.prefix != "env-" || !config.temp.keep || config.diagnostics.capture_traces {
            t_error!(t, "overrides not applied: {config:?}");
        }
        if config.temp.root.is_some() {
            t.error(&"empty RUNT_TEMP_ROOT must clear the root");
        }
    })
    .unwrap();
}

#[test]
#[serial]
fn invalid_boolean_override_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("absent.toml");
    run(Cancellation::new(), |t| {
        t.setenv("RUNT_ECHO_LOGS", "sometimes");
        match HarnessConfig::load(Some(absent.as_path()), dir.path()) {
            Err(RuntError::Config(message)) if message.contains("RUNT_ECHO_LOGS") => {}
            other => t_error!(t, "unexpected result: {other:?}"),
        }
    })
    .unwrap();
}
