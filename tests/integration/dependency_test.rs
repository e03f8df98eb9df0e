//! Integration tests for dependency-ordered loading and batch error handling.

mod helpers;

use nitro_dispatch::prelude::*;
use nitro_dispatch::PluginState;

use helpers::{PluginBuilder, entries, journal, manager_with};

#[tokio::test]
async fn test_cycle_rejected_before_any_load() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::LogAndContinue);
    manager.register(PluginBuilder::new("solo").build(&log)).await.unwrap();
    manager
        .register(PluginBuilder::new("a").depends_on(&["b"]).build(&log))
        .await
        .unwrap();
    manager
        .register(PluginBuilder::new("b").depends_on(&["c"]).build(&log))
        .await
        .unwrap();
    manager
        .register(PluginBuilder::new("c").depends_on(&["a"]).build(&log))
        .await
        .unwrap();

    let err = manager.load_all().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DependencyCycle);
    for name in ["a", "b", "c"] {
        assert!(err.message.contains(name));
    }
    assert!(entries(&log).is_empty());
    assert!(manager.get_loaded_names().is_empty());

    // Plugins outside the cycle can still be loaded on their own.
    manager.load("solo").await.unwrap();
    let err = manager.load("a").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DependencyCycle);
}

#[tokio::test]
async fn test_missing_dependency_reported() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::LogAndContinue);
    manager
        .register(PluginBuilder::new("app").depends_on(&["db", "cache"]).build(&log))
        .await
        .unwrap();

    let err = manager.load_all().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingDependency);
    assert!(err.message.contains("db"));
    assert!(err.message.contains("cache"));

    let err = manager.load("app").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingDependency);
    assert_eq!(manager.plugin_state("app"), Some(PluginState::Registered));
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn test_load_all_orders_dependencies_first() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager
        .register(PluginBuilder::new("b").depends_on(&["a"]).build(&log))
        .await
        .unwrap();
    manager.register(PluginBuilder::new("a").build(&log)).await.unwrap();

    let loaded = manager.load_all().await.unwrap();
    assert_eq!(loaded, vec!["a", "b"]);
    assert_eq!(manager.get_loaded_names(), vec!["a", "b"]);
    assert_eq!(entries(&log), vec!["load:a:none", "load:b:none"]);

    // A second pass has nothing left to do.
    assert!(manager.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_single_load_pulls_in_dependency_closure() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager.register(PluginBuilder::new("base").build(&log)).await.unwrap();
    manager
        .register(PluginBuilder::new("store").depends_on(&["base"]).build(&log))
        .await
        .unwrap();
    manager
        .register(PluginBuilder::new("api").depends_on(&["store"]).build(&log))
        .await
        .unwrap();
    manager.register(PluginBuilder::new("unrelated").build(&log)).await.unwrap();

    manager.load("api").await.unwrap();
    assert_eq!(manager.get_loaded_names(), vec!["base", "store", "api"]);
    assert!(!manager.is_loaded("unrelated"));
}

#[tokio::test]
async fn test_fail_fast_stops_batch_at_first_failure() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager.register(PluginBuilder::new("first").build(&log)).await.unwrap();
    manager
        .register(PluginBuilder::new("broken").failing().build(&log))
        .await
        .unwrap();
    manager.register(PluginBuilder::new("last").build(&log)).await.unwrap();

    let err = manager.load_all().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginLoad);
    assert_eq!(manager.get_loaded_names(), vec!["first"]);
    assert_eq!(manager.plugin_state("broken"), Some(PluginState::Failed));
    assert_eq!(manager.plugin_state("last"), Some(PluginState::Registered));
}

#[tokio::test]
async fn test_collect_all_skips_dependents_and_aggregates() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::CollectAll);
    manager
        .register(PluginBuilder::new("broken").failing().build(&log))
        .await
        .unwrap();
    manager
        .register(PluginBuilder::new("child").depends_on(&["broken"]).build(&log))
        .await
        .unwrap();
    manager.register(PluginBuilder::new("fine").build(&log)).await.unwrap();

    let err = manager.load_all().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Aggregate);
    assert_eq!(err.related.len(), 2);
    assert!(err.related.iter().all(|e| e.kind == ErrorKind::PluginLoad));
    assert!(err.related[1].message.contains("child"));

    assert_eq!(manager.get_loaded_names(), vec!["fine"]);
    assert_eq!(manager.plugin_state("child"), Some(PluginState::Registered));
    assert!(!entries(&log).iter().any(|e| e.starts_with("load:child")));
}

#[tokio::test]
async fn test_log_and_continue_loads_everything_it_can() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::LogAndContinue);
    manager
        .register(PluginBuilder::new("broken").failing().build(&log))
        .await
        .unwrap();
    manager.register(PluginBuilder::new("fine").build(&log)).await.unwrap();

    let loaded = manager.load_all().await.unwrap();
    assert_eq!(loaded, vec!["fine"]);

    // A failed plugin stays failed until it is registered again.
    let err = manager.load("broken").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginLoad);
    manager.unregister("broken").await.unwrap();
    manager.register(PluginBuilder::new("broken").build(&log)).await.unwrap();
    manager.load("broken").await.unwrap();
    assert!(manager.is_loaded("broken"));
}

#[tokio::test]
async fn test_dependency_failure_during_single_load() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager
        .register(PluginBuilder::new("driver").failing().build(&log))
        .await
        .unwrap();
    manager
        .register(PluginBuilder::new("app").depends_on(&["driver"]).build(&log))
        .await
        .unwrap();

    let err = manager.load("app").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginLoad);
    assert!(err.contains_kind(ErrorKind::PluginLoad));
    assert_eq!(err.related.len(), 1);
    assert_eq!(manager.plugin_state("app"), Some(PluginState::Registered));
}

#[tokio::test]
async fn test_shutdown_unloads_in_reverse_load_order() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager
        .register(PluginBuilder::new("web").depends_on(&["db"]).build(&log))
        .await
        .unwrap();
    manager.register(PluginBuilder::new("db").build(&log)).await.unwrap();
    manager
        .register(PluginBuilder::new("jobs").depends_on(&["db"]).build(&log))
        .await
        .unwrap();

    let started = manager.start().await.unwrap();
    assert_eq!(started, vec!["db", "web", "jobs"]);
    log.lock().clear();

    let stopped = manager.shutdown().await.unwrap();
    assert_eq!(stopped, vec!["jobs", "web", "db"]);
    assert_eq!(entries(&log), vec!["unload:jobs", "unload:web", "unload:db"]);
    assert!(manager.get_loaded_names().is_empty());
}
