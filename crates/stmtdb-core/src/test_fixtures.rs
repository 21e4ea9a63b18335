//! Shared categories and backends for unit tests.

use crate::{
    db::{
        executor::{Backend, ExecutionError, ExecutionOutcome, MemoryBackend},
        statement::{BoundStatement, CompiledStatement, PreparedStatement, StatementDescriptor},
    },
    schema::{Category, Key, ScalarKind},
    value::Value,
};
use std::sync::{Arc, Mutex};

pub(crate) fn cpu_stats() -> Arc<Category> {
    Arc::new(
        Category::new(
            "cpu-stats",
            vec![
                Key::string("agentId"),
                Key::list("perProcessorUsage", ScalarKind::Double),
                Key::long("timeStamp"),
            ],
        )
        .expect("cpu-stats should build"),
    )
}

pub(crate) fn vm_thread_session() -> Arc<Category> {
    Arc::new(
        Category::new(
            "vm-thread-session",
            vec![
                Key::string("agentId"),
                Key::string("vmId"),
                Key::long("timeStamp"),
                Key::string("session"),
                Key::boolean("live"),
            ],
        )
        .expect("vm-thread-session should build"),
    )
}

pub(crate) fn desc_tester() -> Arc<Category> {
    Arc::new(
        Category::new("desc-tester-category", vec![Key::long("bar")])
            .expect("desc-tester-category should build"),
    )
}

pub(crate) fn compile(category: &Arc<Category>, raw: &str) -> Arc<CompiledStatement> {
    let compiled = StatementDescriptor::new(Arc::clone(category), raw)
        .compile()
        .expect("descriptor should compile");

    Arc::new(compiled)
}

/// Compile and bind `values` in slot order.
pub(crate) fn bound(category: &Arc<Category>, raw: &str, values: Vec<Value>) -> BoundStatement {
    let mut prepared = PreparedStatement::new(compile(category, raw));
    for (index, value) in values.into_iter().enumerate() {
        prepared.bind(index, value).expect("fixture value should bind");
    }

    prepared.into_bound().expect("fixture should be fully bound")
}

///
/// ScriptedBackend
///
/// Memory backend that records execution order and fails or panics on
/// statements whose first bound string value says so.
///

#[derive(Debug, Default)]
pub(crate) struct ScriptedBackend {
    inner: MemoryBackend,
    pub(crate) seen: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("seen lock should not be poisoned").clone()
    }
}

impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn execute(&self, statement: &BoundStatement) -> Result<ExecutionOutcome, ExecutionError> {
        let marker = statement
            .values()
            .iter()
            .find_map(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.seen
            .lock()
            .expect("seen lock should not be poisoned")
            .push(marker.clone());

        match marker.as_str() {
            "fail" => Err(ExecutionError::Unavailable {
                backend: "scripted".to_string(),
                reason: "scripted failure".to_string(),
            }),
            "panic" => panic!("scripted panic"),
            _ => self.inner.execute(statement),
        }
    }
}
