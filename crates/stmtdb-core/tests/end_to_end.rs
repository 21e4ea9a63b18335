use serde_json::json;
use std::sync::{Arc, Mutex};
use stmtdb_config::{QueryMode, StorageConfig};
use stmtdb_core::{
    db::{
        executor::{
            DocumentBackend, DocumentDriver, DocumentRequest, DriverReply, ExecutionError,
            MemoryBackend,
        },
        pipeline::{OperationState, PipelineError},
        statement::{SemanticError, StatementDescriptor},
    },
    error::{ErrorClass, StatementError},
    prelude::*,
    schema::CategoryRegistryError,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn storage(config: &StorageConfig) -> Storage {
    init_tracing();
    Storage::new(config, Arc::new(MemoryBackend::new())).expect("storage should start")
}

fn cpu_stats() -> Category {
    Category::new(
        "cpu-stats",
        vec![
            Key::string("agentId"),
            Key::list("perProcessorUsage", ScalarKind::Double),
            Key::long("timeStamp"),
        ],
    )
    .expect("cpu-stats should build")
}

const ADD_CPU: &str =
    "ADD cpu-stats SET 'agentId' = ?s , 'perProcessorUsage' = ?d[ , 'timeStamp' = ?l";
const LATEST_CPU: &str =
    "QUERY cpu-stats WHERE 'agentId' = ?s SORT 'timeStamp' DSC LIMIT ?i";
const COUNT_CPU: &str = "QUERY-COUNT cpu-stats WHERE 'timeStamp' >= ?l";

fn add_cpu(storage: &Storage, add: &StatementDescriptor, agent: &str, stamp: i64) {
    let mut stmt = storage.prepare(add).expect("add should prepare");
    stmt.set_string(0, agent)
        .and_then(|s| s.set_double_list(1, vec![0.1, 0.2]))
        .and_then(|s| s.set_long(2, stamp))
        .expect("add should bind");

    let result = storage.execute(stmt).expect("add should execute");
    assert_eq!(result.affected, 1);
}

#[test]
fn write_then_read_through_the_queue() {
    let storage = storage(&StorageConfig::default());
    storage
        .register_category(cpu_stats())
        .expect("cpu-stats should register");

    let add = storage
        .descriptor("cpu-stats", ADD_CPU)
        .expect("category is registered");
    let latest = storage
        .descriptor("cpu-stats", LATEST_CPU)
        .expect("category is registered");
    let count = storage
        .descriptor("cpu-stats", COUNT_CPU)
        .expect("category is registered");
    assert_eq!(
        storage
            .self_test(&[add.clone(), latest.clone(), count.clone()])
            .expect("descriptors should pass self-test"),
        3
    );

    for stamp in [100, 300, 200] {
        add_cpu(&storage, &add, "agent-1", stamp);
    }
    add_cpu(&storage, &add, "agent-2", 400);

    let mut query = storage.prepare(&latest).expect("query should prepare");
    query
        .set_string(0, "agent-1")
        .and_then(|s| s.set_integer(1, 2))
        .expect("query should bind");
    let rows = storage
        .execute_query(query)
        .expect("query should run")
        .collect_documents()
        .expect("rows should decode");
    let stamps: Vec<i64> = rows
        .iter()
        .map(|row| row.get_long("timeStamp").expect("timestamp should be present"))
        .collect();
    assert_eq!(stamps, [300, 200]);
    assert_eq!(rows[0].get_double_list("perProcessorUsage"), Ok(&[0.1, 0.2][..]));

    let mut counting = storage.prepare(&count).expect("count should prepare");
    counting.set_long(0, 200).expect("count should bind");
    assert_eq!(storage.count(counting).expect("count should run"), 3);

    let stats = storage.cache_stats();
    assert_eq!(stats.size, 3);
    assert!(stats.hits >= 4, "repeated prepares should hit the cache");

    let report = storage.report();
    assert_eq!(report.failed, 0);
    assert_eq!(report.submitted, report.completed);

    storage.shutdown().expect("shutdown should succeed");
}

///
/// InsertLog
///
/// Document driver that acknowledges every request and keeps the rendered
/// commands.
///

#[derive(Default)]
struct InsertLog {
    commands: Mutex<Vec<serde_json::Value>>,
}

impl DocumentDriver for InsertLog {
    fn send(&self, request: DocumentRequest) -> Result<DriverReply, ExecutionError> {
        self.commands
            .lock()
            .expect("command lock should not be poisoned")
            .push(request.to_json());

        Ok(DriverReply::Acknowledged { affected: 1 })
    }
}

#[test]
fn desc_tester_insert_reaches_the_document_store() {
    init_tracing();
    let driver = Arc::new(InsertLog::default());
    let storage = Storage::new(
        &StorageConfig::default(),
        Arc::new(DocumentBackend::new(Arc::clone(&driver))),
    )
    .expect("storage should start");
    storage
        .register_category(
            Category::new("desc-tester-category", vec![Key::long("bar")])
                .expect("category should build"),
        )
        .expect("category should register");

    let add = storage
        .descriptor("desc-tester-category", "ADD desc-tester-category SET 'bar' = ?l")
        .expect("category is registered");
    let mut stmt = storage.prepare(&add).expect("add should prepare");
    stmt.set_long(0, 42).expect("bar should bind");

    let completion = storage.submit(stmt).expect("add should queue");
    storage.barrier();

    assert_eq!(completion.state(), OperationState::Completed);
    assert_eq!(
        completion.wait_mutation().expect("insert should succeed").affected,
        1
    );
    assert_eq!(
        *driver.commands.lock().expect("command lock should not be poisoned"),
        vec![json!({
            "insert": "desc-tester-category",
            "document": { "bar": 42 },
        })]
    );
}

#[test]
fn non_finite_doubles_never_reach_the_document_store() {
    init_tracing();
    let driver = Arc::new(InsertLog::default());
    let storage = Storage::new(
        &StorageConfig::default(),
        Arc::new(DocumentBackend::new(Arc::clone(&driver))),
    )
    .expect("storage should start");
    storage
        .register_category(cpu_stats())
        .expect("cpu-stats should register");
    let add = storage
        .descriptor("cpu-stats", ADD_CPU)
        .expect("category is registered");

    let mut stmt = storage.prepare(&add).expect("add should prepare");
    stmt.set_string(0, "agent-1")
        .and_then(|s| s.set_double_list(1, vec![f64::NAN, 1.0]))
        .and_then(|s| s.set_long(2, 7))
        .expect("add should bind");

    let err = storage.execute(stmt).expect_err("NaN should be refused");
    assert!(matches!(
        err,
        StatementError::Execution(ExecutionError::Unrepresentable { .. })
    ));
    assert!(
        driver
            .commands
            .lock()
            .expect("command lock should not be poisoned")
            .is_empty()
    );
    assert_eq!(storage.report().failed, 1);
}

#[test]
fn self_test_reports_the_first_bad_descriptor() {
    let storage = storage(&StorageConfig::default());
    storage
        .register_category(
            Category::new("desc-tester-category", vec![Key::long("bar")])
                .expect("category should build"),
        )
        .expect("category should register");

    let good = storage
        .descriptor("desc-tester-category", "ADD desc-tester-category SET 'bar' = ?l")
        .expect("category is registered");
    let bad = storage
        .descriptor("desc-tester-category", "ADD desc-tester-category SET 'foo' = ?l")
        .expect("category is registered");

    let err = storage
        .self_test(&[good, bad])
        .expect_err("unknown key should fail self-test");

    assert!(matches!(
        err,
        StatementError::Semantic(SemanticError::UnknownKey { .. })
    ));
    assert_eq!(err.class(), ErrorClass::Semantic);
    assert!(!err.is_retryable());
    assert_eq!(
        err.display_with_class(),
        "semantic: unknown key 'foo' in category 'desc-tester-category'"
    );
}

#[test]
fn descriptors_need_the_registered_category() {
    let storage = storage(&StorageConfig::default());

    assert!(matches!(
        storage.descriptor("cpu-stats", "QUERY cpu-stats"),
        Err(StatementError::Registry(CategoryRegistryError::CategoryNotFound(_)))
    ));

    // a descriptor built against an unregistered definition
    let stray = StatementDescriptor::new(Arc::new(cpu_stats()), "QUERY cpu-stats");
    assert!(matches!(
        storage.prepare(&stray),
        Err(StatementError::Registry(CategoryRegistryError::CategoryNotFound(_)))
    ));

    storage
        .register_category(cpu_stats())
        .expect("cpu-stats should register");
    let conflicting = Category::new("cpu-stats", vec![Key::string("agentId")])
        .expect("category should build");
    assert!(matches!(
        storage.register_category(conflicting.clone()),
        Err(StatementError::Registry(CategoryRegistryError::CategoryConflict(_)))
    ));

    let stale = StatementDescriptor::new(Arc::new(conflicting), "QUERY cpu-stats");
    assert!(matches!(
        storage.prepare(&stale),
        Err(StatementError::Registry(CategoryRegistryError::CategoryConflict(_)))
    ));

    // an identical definition resolves to the registered one
    storage
        .register_category(cpu_stats())
        .expect("identical re-registration should succeed");
    assert_eq!(storage.registry().len(), 1);
}

#[test]
fn bypass_queries_see_every_prior_write() {
    let config = StorageConfig::from_toml_str(
        r#"
        [pipeline]
        queue_capacity = 8
        query_mode = "bypass"
        "#,
    )
    .expect("config should parse");
    assert_eq!(config.pipeline.query_mode, QueryMode::Bypass);

    let storage = storage(&config);
    storage
        .register_category(cpu_stats())
        .expect("cpu-stats should register");
    let add = storage
        .descriptor("cpu-stats", ADD_CPU)
        .expect("category is registered");
    let count = storage
        .descriptor("cpu-stats", COUNT_CPU)
        .expect("category is registered");

    // submit without waiting; the bypass read must still observe them
    for stamp in 0..32 {
        let mut stmt = storage.prepare(&add).expect("add should prepare");
        stmt.set_string(0, "agent-1")
            .and_then(|s| s.set_double_list(1, Vec::new()))
            .and_then(|s| s.set_long(2, stamp))
            .expect("add should bind");
        storage.submit(stmt).expect("add should queue");
    }

    let mut counting = storage.prepare(&count).expect("count should prepare");
    counting.set_long(0, 0).expect("count should bind");
    assert_eq!(storage.count(counting).expect("bypass count should run"), 32);

    storage.shutdown().expect("shutdown should succeed");

    let mut late = storage.prepare(&count).expect("prepare does not need the pipeline");
    late.set_long(0, 0).expect("count should bind");
    assert!(matches!(
        storage.count(late),
        Err(StatementError::Pipeline(PipelineError::Closed))
    ));
}

#[test]
fn mutations_and_queries_keep_to_their_entry_points() {
    let storage = storage(&StorageConfig::default());
    storage
        .register_category(cpu_stats())
        .expect("cpu-stats should register");
    let count = storage
        .descriptor("cpu-stats", COUNT_CPU)
        .expect("category is registered");

    let mut stmt = storage.prepare(&count).expect("count should prepare");
    stmt.set_long(0, 0).expect("count should bind");

    let err = storage
        .execute(stmt)
        .expect_err("a count is not a mutation");
    assert_eq!(err.class(), ErrorClass::Binding);
    assert_eq!(storage.report().submitted, 0, "nothing reaches the queue");
}

#[test]
fn bad_config_is_rejected_before_start() {
    let err = StorageConfig::from_toml_str("[pipeline]\nqueue_capacity = 0\n")
        .expect_err("zero capacity should be invalid");

    assert!(err.to_string().contains("pipeline.queue_capacity"));
}
