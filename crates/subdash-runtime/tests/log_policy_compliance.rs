#![forbid(unsafe_code)]

//! Log policy compliance for the history and settings services.
//!
//! Verifies, against events the crate actually emits:
//! - routine stack and settings transitions log at DEBUG with structured fields
//! - lifecycle milestones (ready, reset, import) log at INFO
//! - closure failures, rejected imports and failed writes log at WARN with an
//!   `error` field
//! - notification fan-out runs inside `history.notify` / `settings.notify`
//!
//! Run:
//!   cargo test -p subdash-runtime --test log_policy_compliance

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

use subdash_runtime::settings::{LayoutSettingsUpdate, Theme};
use subdash_runtime::{
    ActionBuilder, CommandError, MemoryStorage, SettingsManager, StorageBackend, UndoRedoManager,
};

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
#[allow(dead_code)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    fields: HashMap<String, String>,
    message: Option<String>,
    parent_span_name: Option<String>,
}

impl CapturedEvent {
    fn has_structured_fields(&self) -> bool {
        self.fields.keys().any(|k| k != "message")
    }

    fn message_contains(&self, needle: &str) -> bool {
        self.message.as_deref().is_some_and(|m| m.contains(needle))
    }
}

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    level: tracing::Level,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

struct EventCaptureHandle {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

impl EventCaptureHandle {
    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    fn events_at_level(&self, level: tracing::Level) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }

    fn span_names(&self) -> Vec<String> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            level: *attrs.metadata().level(),
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);

        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned();

        let parent_span_name = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span_ref| span_ref.name().to_string());

        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields,
            message,
            parent_span_name,
        });
    }
}

fn with_captured_events<F>(f: F) -> EventCaptureHandle
where
    F: FnOnce(),
{
    let events = Arc::new(Mutex::new(Vec::new()));
    let spans = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: events.clone(),
        spans: spans.clone(),
    };
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(layer);
    tracing::subscriber::with_default(subscriber, f);
    EventCaptureHandle { events, spans }
}

fn ok_action(description: &str) -> subdash_runtime::UndoRedoAction {
    ActionBuilder::renewal(description).build(|| Ok(()), || Ok(()))
}

fn ready_settings(storage: MemoryStorage) -> SettingsManager {
    let (settings, load) = SettingsManager::open(Rc::new(storage), "log-test");
    load.run();
    settings
}

// ============================================================================
// History
// ============================================================================

#[test]
fn history_transitions_log_at_debug_with_fields() {
    let handle = with_captured_events(|| {
        let history = UndoRedoManager::default();
        history.push(ok_action("Renew Acme"));
        history.undo();
        history.redo();
        history.clear();
    });

    let debug = handle.events_at_level(tracing::Level::DEBUG);
    assert!(debug.len() >= 4, "expected push/undo/redo/clear events, got {debug:?}");
    for event in &debug {
        assert!(
            event.has_structured_fields(),
            "DEBUG event '{}' lacks structured fields",
            event.message.as_deref().unwrap_or("<none>")
        );
    }
    let recorded = debug
        .iter()
        .find(|e| e.message_contains("action recorded"))
        .expect("push should log");
    assert!(recorded.fields.contains_key("action_id"));
    assert!(handle.events_at_level(tracing::Level::WARN).is_empty());
}

#[test]
fn failed_reversal_warns_with_error_field() {
    let handle = with_captured_events(|| {
        let history = UndoRedoManager::default();
        history.push(ActionBuilder::data_import("Import 3 rows").build(
            || Err(CommandError::TargetNotFound("subscriptions table".into())),
            || Ok(()),
        ));
        assert!(matches!(history.undo(), Some(Err(_))));
    });

    let warns = handle.events_at_level(tracing::Level::WARN);
    assert_eq!(warns.len(), 1);
    let warn = &warns[0];
    assert!(warn.fields.get("error").is_some_and(|e| e.contains("subscriptions table")));
    assert_eq!(warn.fields.get("kind").map(String::as_str), Some("data.import"));
    assert_eq!(warn.fields.get("op").map(String::as_str), Some("undo"));
}

#[test]
fn history_listeners_run_inside_notify_span() {
    let handle = with_captured_events(|| {
        let history = UndoRedoManager::default();
        let _sub = history.subscribe(|| tracing::trace!(source = "toolbar", "history changed"));
        history.push(ok_action("Renew Acme"));
    });

    assert!(handle.span_names().iter().any(|n| n == "history.notify"));
    let from_listener = handle
        .events()
        .into_iter()
        .find(|e| e.message_contains("history changed"))
        .expect("listener event captured");
    assert_eq!(from_listener.parent_span_name.as_deref(), Some("history.notify"));
}

#[test]
fn empty_undo_is_silent() {
    let handle = with_captured_events(|| {
        let history = UndoRedoManager::default();
        assert!(history.undo().is_none());
    });
    assert!(handle.events().is_empty());
    assert!(handle.span_names().is_empty());
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn settings_lifecycle_logs_at_info() {
    let handle = with_captured_events(|| {
        let settings = ready_settings(MemoryStorage::new());
        settings.reset_settings();
        let exported = settings.export_settings().unwrap();
        settings.import_settings(&exported).unwrap();
    });

    let info = handle.events_at_level(tracing::Level::INFO);
    for needle in ["settings ready", "settings reset", "settings imported"] {
        let event = info
            .iter()
            .find(|e| e.message_contains(needle))
            .unwrap_or_else(|| panic!("missing INFO '{needle}' in {info:?}"));
        assert_eq!(event.fields.get("key").map(String::as_str), Some("log-test"));
    }
}

#[test]
fn rejected_import_warns() {
    let handle = with_captured_events(|| {
        let settings = ready_settings(MemoryStorage::new());
        assert!(settings.import_settings("not valid json").is_err());
    });

    let warns = handle.events_at_level(tracing::Level::WARN);
    assert_eq!(warns.len(), 1);
    assert!(warns[0].message_contains("import rejected"));
    assert!(warns[0].fields.contains_key("error"));
}

#[test]
fn failed_write_warns_but_still_notifies() {
    let handle = with_captured_events(|| {
        let settings = ready_settings(MemoryStorage::with_quota(4));
        let _sub = settings.subscribe(|s| tracing::trace!(theme = ?s.theme, "settings seen"));
        settings.update_layout_settings(LayoutSettingsUpdate {
            theme: Some(Theme::Dark),
            ..Default::default()
        });
    });

    let warns = handle.events_at_level(tracing::Level::WARN);
    assert_eq!(warns.len(), 1);
    assert!(warns[0].message_contains("failed to persist"));
    assert_eq!(warns[0].fields.get("storage").map(String::as_str), Some("memory"));

    let seen = handle
        .events()
        .into_iter()
        .find(|e| e.message_contains("settings seen"))
        .expect("listener ran despite the write failure");
    assert_eq!(seen.parent_span_name.as_deref(), Some("settings.notify"));
}

#[test]
fn malformed_persisted_blob_warns_once() {
    let storage = MemoryStorage::new();
    storage.set("log-test", "{ truncated").unwrap();
    let handle = with_captured_events(|| {
        let settings = ready_settings(storage);
        assert_eq!(settings.get_layout_settings().theme, Theme::System);
    });

    let warns = handle.events_at_level(tracing::Level::WARN);
    assert_eq!(warns.len(), 1);
    assert!(warns[0].message_contains("malformed persisted settings"));
    assert!(warns[0].fields.contains_key("error"));
}

#[test]
fn unreadable_persisted_field_warns_with_its_name() {
    let storage = MemoryStorage::new();
    storage
        .set("log-test", r#"{"theme": 42, "sidebarCollapsed": true}"#)
        .unwrap();
    let handle = with_captured_events(|| {
        let settings = ready_settings(storage);
        let layout = settings.get_layout_settings();
        assert_eq!(layout.theme, Theme::System);
        assert!(layout.sidebar_collapsed);
    });

    let warns = handle.events_at_level(tracing::Level::WARN);
    assert_eq!(warns.len(), 1);
    assert!(warns[0].message_contains("unreadable persisted setting"));
    assert_eq!(warns[0].fields.get("field").map(String::as_str), Some("theme"));
}

#[test]
fn notify_spans_are_debug_level() {
    let handle = with_captured_events(|| {
        let history = UndoRedoManager::default();
        history.push(ok_action("Renew"));
        let settings = ready_settings(MemoryStorage::new());
        settings.toggle_widget("charts");
    });

    let spans = handle.spans.lock().unwrap().clone();
    assert!(!spans.is_empty());
    for span in spans {
        assert_eq!(span.level, tracing::Level::DEBUG, "span {} not at DEBUG", span.name);
    }
}
