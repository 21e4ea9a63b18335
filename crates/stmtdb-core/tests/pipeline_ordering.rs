use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    thread,
};
use stmtdb_config::StorageConfig;
use stmtdb_core::{
    db::{
        executor::{Backend, ExecutionError, ExecutionOutcome, MemoryBackend},
        statement::{BoundStatement, StatementKind},
    },
    prelude::*,
};

const WRITERS: usize = 4;
const WRITES_PER_THREAD: i64 = 100;

///
/// OrderedBackend
///
/// Memory backend that logs the `(agentId, timeStamp)` of every ADD in the
/// order the worker ran it.
///

#[derive(Default)]
struct OrderedBackend {
    inner: MemoryBackend,
    log: Mutex<Vec<(String, i64)>>,
}

impl Backend for OrderedBackend {
    fn name(&self) -> &str {
        "ordered"
    }

    fn execute(&self, statement: &BoundStatement) -> Result<ExecutionOutcome, ExecutionError> {
        if statement.kind() == StatementKind::Add {
            let record = statement.assigned_document();
            let agent = record.get_string("agentId")?.to_string();
            let stamp = record.get_long("timeStamp")?;
            self.log
                .lock()
                .expect("log lock should not be poisoned")
                .push((agent, stamp));
        }

        self.inner.execute(statement)
    }
}

fn sessions() -> Category {
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
    .expect("vm-thread-session should build")
}

#[test]
fn each_submitter_sees_its_own_order_preserved() {
    let backend = Arc::new(OrderedBackend::default());
    let storage = Arc::new(
        Storage::new(&StorageConfig::default(), backend.clone()).expect("storage should start"),
    );
    storage
        .register_category(sessions())
        .expect("category should register");
    let add = storage
        .descriptor(
            "vm-thread-session",
            "ADD vm-thread-session SET 'agentId' = ?s , 'timeStamp' = ?l",
        )
        .expect("category is registered");

    let writers: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let storage = Arc::clone(&storage);
            let add = add.clone();
            thread::spawn(move || {
                let agent = format!("agent-{writer}");
                let mut last_seq = 0;
                let mut completions = Vec::new();

                for stamp in 0..WRITES_PER_THREAD {
                    let mut stmt = storage.prepare(&add).expect("add should prepare");
                    stmt.set_string(0, agent.as_str())
                        .and_then(|s| s.set_long(1, stamp))
                        .expect("add should bind");
                    let completion = storage.submit(stmt).expect("add should queue");

                    assert!(completion.seq() > last_seq, "sequence numbers must grow");
                    last_seq = completion.seq();
                    completions.push(completion);
                }

                for completion in completions {
                    completion.wait_mutation().expect("add should succeed");
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().expect("writer thread should not panic");
    }

    let log = backend
        .log
        .lock()
        .expect("log lock should not be poisoned")
        .clone();
    assert_eq!(log.len(), WRITERS * WRITES_PER_THREAD as usize);

    let mut per_agent: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for (agent, stamp) in log {
        per_agent.entry(agent).or_default().push(stamp);
    }
    for (agent, stamps) in per_agent {
        assert_eq!(
            stamps,
            (0..WRITES_PER_THREAD).collect::<Vec<_>>(),
            "{agent} writes ran out of order"
        );
    }
}

#[test]
fn queued_reads_observe_earlier_writes() {
    let storage = Storage::new(&StorageConfig::default(), Arc::new(MemoryBackend::new()))
        .expect("storage should start");
    storage
        .register_category(sessions())
        .expect("category should register");
    let add = storage
        .descriptor(
            "vm-thread-session",
            "ADD vm-thread-session SET 'vmId' = ?s , 'live' = ?b",
        )
        .expect("category is registered");
    let live = storage
        .descriptor(
            "vm-thread-session",
            "QUERY-COUNT vm-thread-session WHERE 'vmId' = ?s AND 'live' = ?b",
        )
        .expect("category is registered");

    for round in 1..=10_u64 {
        let mut write = storage.prepare(&add).expect("add should prepare");
        write
            .set_string(0, "vm-1")
            .and_then(|s| s.set_boolean(1, true))
            .expect("add should bind");
        // fire and forget; the count behind it in the queue must see it
        storage.submit(write).expect("add should queue");

        let mut read = storage.prepare(&live).expect("count should prepare");
        read.set_string(0, "vm-1")
            .and_then(|s| s.set_boolean(1, true))
            .expect("count should bind");

        assert_eq!(storage.count(read).expect("count should run"), round);
    }
}
