//! Integration tests for replacing plugins at runtime.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use nitro_dispatch::prelude::*;
use nitro_dispatch::{PluginCatalog, PluginState};

use helpers::{PluginBuilder, entries, journal, labels, manager_with, tag};

#[tokio::test]
async fn test_reload_swaps_in_catalog_definition() {
    let log = journal();
    let catalog = Arc::new(PluginCatalog::new());
    catalog.insert(
        PluginBuilder::new("pricing")
            .hooks(|| {
                vec![
                    HookDescriptor::new("cart.total", tag("v1")),
                    HookDescriptor::new("cart.legacy", tag("v1")),
                ]
            })
            .build(&log),
    );

    let manager = manager_with(ErrorStrategy::FailFast);
    manager.set_reload_source(catalog.clone());
    manager
        .register(catalog.get("pricing").unwrap())
        .await
        .unwrap();
    manager.load("pricing").await.unwrap();

    catalog.insert(
        PluginBuilder::new("pricing")
            .version("2.0.0")
            .hooks(|| vec![HookDescriptor::new("cart.total", tag("v2"))])
            .build(&log),
    );
    manager.reload("pricing").await.unwrap();

    let outcome = manager.trigger("cart.total", json!([])).unwrap();
    assert_eq!(labels(&outcome.payload), vec!["v2"]);
    assert_eq!(manager.get_events(), vec!["cart.total"]);
    assert_eq!(manager.get_plugin("pricing").unwrap().info.version, "2.0.0");
    assert_eq!(
        entries(&log),
        vec!["load:pricing:none", "unload:pricing", "load:pricing:none"]
    );
}

#[tokio::test]
async fn test_reload_without_source_builds_fresh_instance() {
    let log = journal();
    let instances = Arc::new(AtomicUsize::new(0));
    let manager = manager_with(ErrorStrategy::FailFast);
    manager
        .register(
            PluginBuilder::new("counter")
                .hooks(|| vec![HookDescriptor::new("tick", tag("counter")).priority(70)])
                .count_instances(&instances)
                .build(&log),
        )
        .await
        .unwrap();
    manager.load("counter").await.unwrap();
    manager.reload("counter").await.unwrap();
    manager.reload("counter").await.unwrap();

    assert_eq!(instances.load(Ordering::SeqCst), 3);
    assert_eq!(manager.hook_registry().binding_count(), 1);
    let outcome = manager.trigger("tick", json!([])).unwrap();
    assert_eq!(labels(&outcome.payload), vec!["counter"]);
}

#[tokio::test]
async fn test_reload_of_registered_plugin_loads_it() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager.register(PluginBuilder::new("lazy").build(&log)).await.unwrap();

    manager.reload("lazy").await.unwrap();
    assert_eq!(manager.plugin_state("lazy"), Some(PluginState::Loaded));
    assert_eq!(entries(&log), vec!["load:lazy:none"]);
}

#[tokio::test]
async fn test_reload_of_disabled_plugin_comes_back_enabled() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager
        .register(
            PluginBuilder::new("toggle")
                .hooks(|| vec![HookDescriptor::new("e", tag("toggle"))])
                .build(&log),
        )
        .await
        .unwrap();
    manager.load("toggle").await.unwrap();
    manager.disable_plugin("toggle").await.unwrap();

    manager.reload("toggle").await.unwrap();
    assert_eq!(manager.plugin_state("toggle"), Some(PluginState::Loaded));
    let outcome = manager.trigger("e", json!([])).unwrap();
    assert_eq!(labels(&outcome.payload), vec!["toggle"]);
}

#[tokio::test]
async fn test_reload_of_failed_plugin_is_rejected() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager
        .register(PluginBuilder::new("wreck").failing().build(&log))
        .await
        .unwrap();
    assert!(manager.load("wreck").await.is_err());

    let err = manager.reload("wreck").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginLoad);
    assert_eq!(manager.plugin_state("wreck"), Some(PluginState::Failed));

    let err = manager.reload("ghost").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginNotFound);
}

#[tokio::test]
async fn test_failed_fetch_leaves_plugin_loaded() {
    let log = journal();
    let catalog = Arc::new(PluginCatalog::new());
    catalog.insert(
        PluginBuilder::new("sticky")
            .hooks(|| vec![HookDescriptor::new("e", tag("sticky"))])
            .build(&log),
    );
    let manager = manager_with(ErrorStrategy::FailFast);
    manager.set_reload_source(catalog.clone());
    manager
        .register(catalog.get("sticky").unwrap())
        .await
        .unwrap();
    manager.load("sticky").await.unwrap();

    assert!(catalog.remove("sticky"));
    let err = manager.reload("sticky").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginNotFound);

    assert!(manager.is_loaded("sticky"));
    let outcome = manager.trigger("e", json!([])).unwrap();
    assert_eq!(labels(&outcome.payload), vec!["sticky"]);
    assert_eq!(entries(&log), vec!["load:sticky:none"]);
}

#[tokio::test]
async fn test_failed_reload_marks_plugin_failed() {
    let log = journal();
    let catalog = Arc::new(PluginCatalog::new());
    catalog.insert(PluginBuilder::new("flaky").build(&log));
    let manager = manager_with(ErrorStrategy::FailFast);
    manager.set_reload_source(catalog.clone());
    manager
        .register(catalog.get("flaky").unwrap())
        .await
        .unwrap();
    manager.load("flaky").await.unwrap();

    catalog.insert(PluginBuilder::new("flaky").failing().build(&log));
    let err = manager.reload("flaky").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginLoad);
    assert_eq!(manager.plugin_state("flaky"), Some(PluginState::Failed));
    assert!(manager.get_events().is_empty());
}
