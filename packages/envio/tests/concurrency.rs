use std::sync::Arc;
use std::thread;

use envio::{Engine, EngineConfig, Error, MemoryEnv};

#[derive(Debug, Default, Clone, PartialEq)]
struct Worker {
    id: u32,
    name: String,
    weight: f64,
    enabled: bool,
}

envio::record!(Worker {
    id: "WORKER_ID" => required,
    name: "WORKER_NAME",
    weight: "WORKER_WEIGHT",
    enabled: "WORKER_ENABLED",
});

fn store() -> MemoryEnv {
    MemoryEnv::from_pairs([
        ("WORKER_ID", "17"),
        ("WORKER_NAME", "indexer"),
        ("WORKER_WEIGHT", "0.75"),
        ("WORKER_ENABLED", "true"),
    ])
}

#[test]
fn test_concurrent_gets_agree() {
    let engine = Engine::new(store());

    let results: Vec<Worker> = thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                scope.spawn(|| {
                    let mut worker = Worker::default();
                    engine.get(&mut worker).unwrap();
                    worker
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let expected = Worker {
        id: 17,
        name: "indexer".to_string(),
        weight: 0.75,
        enabled: true,
    };
    assert!(results.iter().all(|w| *w == expected));
    assert_eq!(engine.cached_types(), 1);
}

#[test]
fn test_concurrent_failures_release_contexts() {
    let engine = Engine::with_config(
        MemoryEnv::new(),
        EngineConfig::default().with_pool_capacity(4),
    );

    thread::scope(|scope| {
        for _ in 0..16 {
            scope.spawn(|| {
                for _ in 0..10 {
                    let err = engine.get(&mut Worker::default()).unwrap_err();
                    assert!(matches!(err, Error::MissingRequired { key: "WORKER_ID" }));
                }
            });
        }
    });

    assert!(engine.idle_contexts() >= 1);
    assert!(engine.idle_contexts() <= 4);
}

#[test]
fn test_shared_engine_across_owned_threads() {
    let engine = Arc::new(Engine::new(MemoryEnv::new()));

    let writers: Vec<_> = (0..8u32)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine
                    .set(&Worker {
                        id: i + 1,
                        name: format!("worker-{}", i),
                        weight: 1.0,
                        enabled: true,
                    })
                    .unwrap();
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let mut worker = Worker::default();
    engine.get(&mut worker).unwrap();
    assert!((1..=8).contains(&worker.id));
    assert_eq!(worker.weight, 1.0);
    assert!(worker.enabled);
}
