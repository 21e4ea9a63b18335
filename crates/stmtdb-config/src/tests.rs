use super::*;

#[test]
fn empty_document_yields_defaults() {
    let config = StorageConfig::from_toml_str("").expect("empty config should parse");

    assert_eq!(config, StorageConfig::default());
    assert_eq!(config.pipeline.queue_capacity, None);
    assert_eq!(config.pipeline.shutdown, ShutdownPolicy::Drain);
    assert_eq!(config.pipeline.query_mode, QueryMode::Queued);
    assert_eq!(config.pipeline.tag, DEFAULT_PIPELINE_TAG);
    assert!(config.statements.cache, "statement cache should default to on");
}

#[test]
fn full_document_round_trips_every_field() {
    let source = r#"
        [pipeline]
        queue_capacity = 64
        shutdown = "discard"
        instrumentation = true
        tag = "front-end"
        query_mode = "bypass"
        worker_name = "agent-writer"

        [statements]
        cache = false
    "#;

    let config = StorageConfig::from_toml_str(source).expect("full config should parse");

    assert_eq!(config.pipeline.queue_capacity, Some(64));
    assert!(config.pipeline.is_bounded());
    assert_eq!(config.pipeline.shutdown, ShutdownPolicy::Discard);
    assert!(config.pipeline.instrumentation);
    assert_eq!(config.pipeline.tag, "front-end");
    assert_eq!(config.pipeline.query_mode, QueryMode::Bypass);
    assert_eq!(config.pipeline.worker_name, "agent-writer");
    assert!(!config.statements.cache);
}

#[test]
fn zero_capacity_is_rejected() {
    let err = StorageConfig::from_toml_str("[pipeline]\nqueue_capacity = 0\n")
        .expect_err("zero capacity should fail validation");

    assert!(
        matches!(
            err,
            ConfigError::Invalid {
                field: "pipeline.queue_capacity",
                ..
            }
        ),
        "unexpected error: {err}"
    );
}

#[test]
fn blank_tag_is_rejected() {
    let err = StorageConfig::from_toml_str("[pipeline]\ntag = \"  \"\n")
        .expect_err("blank tag should fail validation");

    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "pipeline.tag",
            ..
        }
    ));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = StorageConfig::from_toml_str("[pipeline]\nworkers = 4\n")
        .expect_err("unknown key should fail parsing");

    assert!(matches!(err, ConfigError::Parse(_)), "unexpected error: {err}");
}

#[test]
fn unknown_shutdown_policy_is_rejected() {
    let err = StorageConfig::from_toml_str("[pipeline]\nshutdown = \"abandon\"\n")
        .expect_err("unknown policy should fail parsing");

    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn missing_file_reports_path() {
    let err = StorageConfig::load("/nonexistent/stmtdb/config.toml")
        .expect_err("missing file should fail");

    assert!(
        err.to_string().contains("/nonexistent/stmtdb/config.toml"),
        "io error should name the path: {err}"
    );
}
