//! Integration tests for plugin registration, loading and lifecycle events.

mod helpers;

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};

use nitro_dispatch::prelude::*;
use nitro_dispatch::{ManagerConfig, PluginCatalog, PluginManager, PluginState};

use helpers::{Journal, PluginBuilder, entries, journal, labels, manager_with, tag};

/// Records `"<event>:<plugin_name>"` whenever `event` fires.
fn watch(manager: &PluginManager, log: &Journal, event: &'static str) {
    let log = Arc::clone(log);
    manager
        .register_hook(
            HookDescriptor::new(
                event,
                HookCallback::blocking(move |payload: &Value| {
                    let plugin = payload["plugin_name"].as_str().unwrap_or("-");
                    log.lock().push(format!("{event}:{plugin}"));
                    Ok(HookAction::Continue)
                }),
            ),
            None,
        )
        .unwrap();
}

#[tokio::test]
async fn test_disable_enable_restores_original_order() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager
        .register_hook(HookDescriptor::new("render", tag("hi")).priority(100), None)
        .unwrap();
    manager
        .register(
            PluginBuilder::new("theme")
                .hooks(|| vec![HookDescriptor::new("render", tag("mid")).priority(50)])
                .build(&log),
        )
        .await
        .unwrap();
    manager.load("theme").await.unwrap();
    manager
        .register_hook(HookDescriptor::new("render", tag("late")).priority(50), None)
        .unwrap();
    manager
        .register_hook(HookDescriptor::new("render", tag("lo")).priority(10), None)
        .unwrap();

    let before = manager.trigger("render", json!([])).unwrap();
    assert_eq!(labels(&before.payload), vec!["hi", "mid", "late", "lo"]);

    manager.disable_plugin("theme").await.unwrap();
    assert_eq!(manager.plugin_state("theme"), Some(PluginState::Disabled));
    assert!(manager.is_loaded("theme"));
    let disabled = manager.trigger("render", json!([])).unwrap();
    assert_eq!(labels(&disabled.payload), vec!["hi", "late", "lo"]);

    manager.enable_plugin("theme").await.unwrap();
    let after = manager.trigger("render", json!([])).unwrap();
    assert_eq!(labels(&after.payload), labels(&before.payload));
}

#[tokio::test]
async fn test_enable_and_disable_require_loaded_plugin() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager.register(PluginBuilder::new("idle").build(&log)).await.unwrap();

    let err = manager.enable_plugin("idle").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginNotFound);
    let err = manager.disable_plugin("ghost").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginNotFound);
    let err = manager.unload("idle").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginNotFound);
}

#[tokio::test]
async fn test_register_unregister_register_round_trip() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    let definition = || {
        PluginBuilder::new("audit")
            .hooks(|| vec![HookDescriptor::new("user.login", tag("audit"))])
            .build(&log)
    };

    manager.register(definition()).await.unwrap();
    let err = manager.register(definition()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginRegistration);

    manager.load("audit").await.unwrap();
    assert_eq!(manager.get_events(), vec!["user.login"]);

    manager.unregister("audit").await.unwrap();
    assert!(manager.get_registered_names().is_empty());
    assert!(manager.get_events().is_empty());
    assert!(manager.plugin_state("audit").is_none());

    manager.register(definition()).await.unwrap();
    manager.load("audit").await.unwrap();
    let outcome = manager.trigger("user.login", json!([])).unwrap();
    assert_eq!(labels(&outcome.payload), vec!["audit"]);
    assert_eq!(
        entries(&log),
        vec!["load:audit:none", "unload:audit", "load:audit:none"]
    );
}

#[tokio::test]
async fn test_lifecycle_events_are_dispatched() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::LogAndContinue);
    for event in [
        "plugin.registered",
        "plugin.loaded",
        "plugin.unloaded",
        "plugin.unregistered",
        "plugin.error",
        "app.startup",
        "app.shutdown",
    ] {
        watch(&manager, &log, event);
    }

    manager.register(PluginBuilder::new("good").build(&log)).await.unwrap();
    manager
        .register(PluginBuilder::new("bad").failing().build(&log))
        .await
        .unwrap();
    manager.start().await.unwrap();
    manager.shutdown().await.unwrap();
    manager.unregister("good").await.unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "plugin.registered:good",
            "plugin.registered:bad",
            "load:good:none",
            "plugin.loaded:good",
            "load-failed:bad",
            "error:bad:PLUGIN_LOAD",
            "plugin.error:bad",
            "app.startup:-",
            "app.shutdown:-",
            "unload:good",
            "plugin.unloaded:good",
            "plugin.unregistered:good",
        ]
    );
    assert_eq!(manager.plugin_state("bad"), Some(PluginState::Failed));
}

#[tokio::test]
async fn test_plugin_reads_its_own_config_section() {
    let config = ManagerConfig::from_toml_str(
        r#"
error_strategy = "fail_fast"

[plugins.greeter]
greeting = "hello"

[plugins.other]
greeting = "not yours"
"#,
    )
    .unwrap();
    let manager = PluginManager::with_config(config).unwrap();
    assert_eq!(manager.error_strategy(), ErrorStrategy::FailFast);

    let log = journal();
    manager.register(PluginBuilder::new("greeter").build(&log)).await.unwrap();
    manager.register(PluginBuilder::new("silent").build(&log)).await.unwrap();
    manager.load_all().await.unwrap();

    assert_eq!(entries(&log), vec!["load:greeter:hello", "load:silent:none"]);
    assert_eq!(
        manager.get_plugin_config("greeter", "greeting"),
        Some(json!("hello"))
    );
    assert!(manager.get_plugin_config("silent", "greeting").is_none());
}

#[tokio::test]
async fn test_invalid_metadata_rejected_when_validation_enabled() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    let err = manager
        .register(PluginBuilder::new("x").version("").build(&log))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(manager.get_registered_names().is_empty());
}

#[tokio::test]
async fn test_plugin_summary_reports_state_and_hooks() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager
        .register(
            PluginBuilder::new("search")
                .version("2.1.0")
                .hooks(|| {
                    vec![
                        HookDescriptor::new("doc.saved", tag("index")),
                        HookDescriptor::new("doc.*", tag("watch")),
                    ]
                })
                .build(&log),
        )
        .await
        .unwrap();

    let summary = manager.get_plugin("search").unwrap();
    assert_eq!(summary.state, PluginState::Registered);
    assert!(summary.hooks.is_empty());
    assert!(summary.loaded_at.is_none());

    manager.load("search").await.unwrap();
    let summary = manager.get_plugin("search").unwrap();
    assert_eq!(summary.info.version, "2.1.0");
    assert_eq!(summary.state, PluginState::Loaded);
    assert!(summary.enabled);
    assert!(summary.loaded_at.is_some());
    let mut hooks = summary.hooks.clone();
    hooks.sort();
    assert_eq!(hooks, vec!["doc.*", "doc.saved"]);

    assert_eq!(manager.get_all_plugins().len(), 1);
    assert!(manager.get_plugin("ghost").is_none());
}

#[tokio::test]
async fn test_discovered_plugins_are_registered() {
    let log = journal();
    let catalog = PluginCatalog::new();
    catalog.insert_at("plugins", PluginBuilder::new("auth_basic").build(&log));
    catalog.insert_at("plugins", PluginBuilder::new("auth_oauth").build(&log));
    catalog.insert_at("plugins", PluginBuilder::new("metrics").build(&log));
    catalog.insert_at("plugins/extra", PluginBuilder::new("auth_saml").build(&log));

    let manager = manager_with(ErrorStrategy::FailFast);
    let found = manager
        .discover_plugins(&catalog, Path::new("plugins"), "auth_*", false)
        .await
        .unwrap();
    assert_eq!(found, vec!["auth_basic", "auth_oauth"]);

    let found = manager
        .discover_plugins(&catalog, Path::new("plugins"), "auth_*", true)
        .await
        .unwrap();
    // Already registered entries are skipped.
    assert_eq!(found, vec!["auth_saml"]);
    assert_eq!(
        manager.get_registered_names(),
        vec!["auth_basic", "auth_oauth", "auth_saml"]
    );
}

#[tokio::test]
async fn test_owned_hooks_inactive_until_loaded() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager.register(PluginBuilder::new("late").build(&log)).await.unwrap();
    manager
        .register_hook(HookDescriptor::new("tick", tag("owned")), Some("late"))
        .unwrap();

    let outcome = manager.trigger("tick", json!([])).unwrap();
    assert_eq!(outcome.executed, 0);

    manager.load("late").await.unwrap();
    let outcome = manager.trigger("tick", json!([])).unwrap();
    assert_eq!(labels(&outcome.payload), vec!["owned"]);

    manager.unload("late").await.unwrap();
    assert!(manager.get_events().is_empty());
    assert_eq!(manager.plugin_state("late"), Some(PluginState::Unloaded));
}

#[tokio::test]
async fn test_load_is_idempotent() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager
        .register(
            PluginBuilder::new("once")
                .hooks(|| vec![HookDescriptor::new("e", tag("once"))])
                .build(&log),
        )
        .await
        .unwrap();
    manager.load("once").await.unwrap();
    manager.load("once").await.unwrap();

    assert_eq!(entries(&log), vec!["load:once:none"]);
    assert_eq!(manager.hook_registry().binding_count(), 1);
}

#[tokio::test]
async fn test_context_hooks_live_until_unload() {
    let log = journal();
    let context = Arc::new(Mutex::new(None));
    let definition = {
        let log = Arc::clone(&log);
        let context = Arc::clone(&context);
        PluginDefinition::from_fn(PluginInfo::new("relay", "1.0.0"), move || Relay {
            journal: Arc::clone(&log),
            context: Arc::clone(&context),
        })
    };
    let manager = manager_with(ErrorStrategy::FailFast);
    manager.register(definition).await.unwrap();
    manager.load("relay").await.unwrap();

    assert_eq!(entries(&log), vec!["load-trigger:0"]);
    assert_eq!(manager.get_events(), vec!["feed.*"]);
    assert_eq!(manager.get_plugin("relay").unwrap().hooks, vec!["feed.*"]);

    let ctx = context.lock().clone().unwrap();
    let outcome = ctx.trigger_async("feed.item", json!([])).await.unwrap();
    assert_eq!(labels(&outcome.payload), vec!["relay"]);
    let outcome = manager.trigger("feed.item", json!([])).unwrap();
    assert_eq!(labels(&outcome.payload), vec!["relay"]);

    manager.unload("relay").await.unwrap();
    assert!(manager.get_events().is_empty());
    let outcome = ctx.trigger("feed.item", json!([])).unwrap();
    assert_eq!(outcome.executed, 0);
}

#[tokio::test]
async fn test_invalid_hook_unloads_before_failing() {
    let log = journal();
    let manager = manager_with(ErrorStrategy::FailFast);
    manager
        .register(
            PluginBuilder::new("bad")
                .hooks(|| {
                    vec![
                        HookDescriptor::new("user.login", tag("ok")),
                        HookDescriptor::new("user.*.x", tag("never")),
                    ]
                })
                .build(&log),
        )
        .await
        .unwrap();

    let err = manager.load("bad").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginLoad);
    assert_eq!(
        entries(&log),
        vec!["load:bad:none", "unload:bad", "error:bad:PLUGIN_LOAD"]
    );
    assert_eq!(manager.plugin_state("bad"), Some(PluginState::Failed));
    assert!(manager.get_events().is_empty());
}
