//! Integration tests for prompt and view options.

use async_trait::async_trait;
use chrono::NaiveDate;
use notegen::collab::{
    ChronoDateFormatter, ClassCatalog, ClassSchema, FileSystem, StaticClassCatalog,
    StaticFileSystem, StaticPeriodFormats, folders_for,
};
use notegen::config::{
    AppConfig, ConfigResolver, DEFAULT_CLASSES_YAML, DefaultValue, OptionsFactory, OptionsVariant,
    RawTypeTable, ResolvedTypeConfig,
};
use notegen::error::{EngineError, EngineResult, ErrorCode};
use notegen::logging::{DiagnosticKind, DiagnosticLog};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Test helpers
// ============================================================================

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, 8).unwrap()
}

fn factory_with(config: AppConfig, files: impl FileSystem + 'static) -> OptionsFactory {
    OptionsFactory::new(config, Arc::new(files))
        .with_date_formatter(Arc::new(ChronoDateFormatter::fixed(today())))
}

fn factory(files: impl FileSystem + 'static) -> OptionsFactory {
    factory_with(AppConfig::default(), files)
}

fn no_files() -> StaticFileSystem {
    StaticFileSystem::default()
}

fn default_class(type_name: &str) -> Arc<ResolvedTypeConfig> {
    ConfigResolver::with_config(
        RawTypeTable::from_yaml_str(DEFAULT_CLASSES_YAML).unwrap(),
        &AppConfig::default(),
        DiagnosticLog::new(),
    )
    .resolve(type_name)
    .unwrap()
}

fn inline_class(raw: Value, type_name: &str) -> Arc<ResolvedTypeConfig> {
    ConfigResolver::with_config(
        RawTypeTable::from_value(raw).unwrap(),
        &AppConfig::default(),
        DiagnosticLog::new(),
    )
    .resolve(type_name)
    .unwrap()
}

/// Vault whose existence checks always fail.
struct BrokenFileSystem;

#[async_trait]
impl FileSystem for BrokenFileSystem {
    async fn exists(&self, path: &str) -> EngineResult<bool> {
        Err(EngineError::file_check(path, "permission denied"))
    }
}

// ============================================================================
// Periodic classes
// ============================================================================

#[tokio::test]
async fn test_daily_prompt_options() {
    let files = StaticFileSystem::new(["_templates/include/daily.md"]);
    let options = factory(files)
        .create_prompt_options(&default_class("daily"))
        .await
        .unwrap();

    assert_eq!(options.variant, OptionsVariant::Periodic);
    assert_eq!(options.title_prefix, "");
    assert_eq!(options.title_suffix, "2024-02-08");
    assert_eq!(options.title(), "2024-02-08");
    assert!(!options.prompt_for_title);
    assert!(options.prompt_for_suffix);
    assert!(options.prompt_for_task);
    assert!(options.task_assume_yes);

    for field in ["cssClasses", "created", "modified", "bar", "tags", "series"] {
        assert!(options.ignores(field), "expected {} to be ignored", field);
    }

    assert_eq!(options.value_for_field("series"), Some(&json!(true)));
    assert_eq!(
        options.value_for_field("day_planner"),
        Some(&json!("[[_templates/include/day-planner]]"))
    );
    assert_eq!(
        options.value_for_field("includeFile"),
        Some(&json!("[[_templates/include/daily]]"))
    );
}

#[tokio::test]
async fn test_period_format_overrides_date_format() {
    let periods = StaticPeriodFormats::default().with("weekly", "gggg-[W]ww");
    let options = factory(no_files())
        .with_period_formats(Arc::new(periods))
        .create_prompt_options(&default_class("weekly"))
        .await
        .unwrap();

    assert_eq!(options.variant, OptionsVariant::Periodic);
    assert_eq!(options.date_fmt, "gggg-[W]ww");
    assert_eq!(options.title(), "2024-W06");
    assert!(!options.prompt_for_task);
    assert_eq!(options.value_for_field("day_planner"), None);
}

#[tokio::test]
async fn test_period_formats_from_config() {
    let mut config = AppConfig::default();
    config.period_formats = HashMap::from([
        ("monthly".to_string(), "YYYY-MM".to_string()),
        ("quarterly".to_string(), "YYYY-[Q]Q".to_string()),
    ]);
    let factory = factory_with(config, no_files());

    let monthly = factory
        .create_prompt_options(&default_class("monthly"))
        .await
        .unwrap();
    assert_eq!(monthly.title(), "2024-02");

    let quarterly = factory
        .create_prompt_options(&default_class("quarterly"))
        .await
        .unwrap();
    assert_eq!(quarterly.title(), "2024-Q1");
}

#[tokio::test]
async fn test_configured_title_is_kept_for_periodic() {
    let resolved = inline_class(
        json!({
            "periodic": {},
            "sprint": {"_extends": "periodic", "title_prefix": "sprint", "title_suffix": "planning"}
        }),
        "sprint",
    );
    let options = factory(no_files())
        .create_prompt_options(&resolved)
        .await
        .unwrap();
    assert_eq!(options.title(), "sprint-planning");
}

// ============================================================================
// Chat and default classes
// ============================================================================

#[tokio::test]
async fn test_chat_prompt_options() {
    let options = factory(no_files())
        .create_prompt_options(&default_class("chat"))
        .await
        .unwrap();

    assert_eq!(options.variant, OptionsVariant::Chat);
    assert_eq!(options.value_for_field("temperature"), Some(&json!(0.1)));
    assert_eq!(options.value_for_field("top_p"), Some(&json!(1)));
    assert_eq!(options.value_for_field("stream"), Some(&json!(true)));
    assert_eq!(options.value_for_field("n"), Some(&json!(1)));
    assert_eq!(options.default_values.len(), 6);
    for field in ["stop", "top_p", "presence_penalty", "frequency_penalty", "stream", "n"] {
        assert!(options.ignores(field), "expected {} to be ignored", field);
    }

    let chat = options.chat.as_ref().unwrap();
    assert_eq!(chat.system_prompts, "_templates/chat/system");
    assert_eq!(chat.prompt_templates, "_templates/chat/prompt");
    // Parameters are consumed, not left as unrecognized fields
    assert!(options.extra.is_empty());
}

#[tokio::test]
async fn test_chat_child_inherits_and_overrides_params() {
    let resolved = inline_class(
        json!({
            "chat": {"temperature": 0.1, "n": 1},
            "brainstorm": {
                "_extends": "chat",
                "temperature": 0.9,
                "default_values": [{"name": "n", "value": 3}]
            }
        }),
        "brainstorm",
    );
    let options = factory(no_files())
        .create_prompt_options(&resolved)
        .await
        .unwrap();

    assert_eq!(options.variant, OptionsVariant::Chat);
    assert_eq!(options.value_for_field("temperature"), Some(&json!(0.9)));
    // Explicit default values win over the parameter
    assert_eq!(options.value_for_field("n"), Some(&json!(3)));
    assert_eq!(
        options.default_values.iter().filter(|dv| dv.name == "n").count(),
        1
    );
    // Missing parameters fall back
    assert_eq!(options.value_for_field("stream"), Some(&json!(true)));
}

#[tokio::test]
async fn test_default_class_options() {
    let options = factory(no_files())
        .create_prompt_options(&default_class("yt-video"))
        .await
        .unwrap();

    assert_eq!(options.variant, OptionsVariant::Default);
    assert_eq!(options.title(), "YT-yt-video");
    assert!(!options.prompt_for_suffix);
    assert!(options.prompt_for_title);
    assert!(options.chat.is_none());
    assert_eq!(options.extra.get("url"), Some(&Value::Null));
    assert_eq!(options.suffix_from_text("What's  New: Rust!"), "whats new rust");
}

#[tokio::test]
async fn test_stringified_suffix() {
    let resolved = inline_class(json!({"clip": {"title_suffix_stringify": true}}), "clip");
    let options = factory(no_files())
        .create_prompt_options(&resolved)
        .await
        .unwrap();
    assert_eq!(options.title(), "2024-02-08-clip");
    assert_eq!(options.suffix_from_text("What's  New: Rust!"), "whats-new-rust");
}

// ============================================================================
// Include templates
// ============================================================================

#[tokio::test]
async fn test_include_file_added_when_template_exists() {
    let files = StaticFileSystem::new(["_templates/include/meeting.md"]);
    let options = factory(files)
        .create_prompt_options(&default_class("meeting"))
        .await
        .unwrap();
    assert_eq!(
        options.default_values.last(),
        Some(&DefaultValue::new("includeFile", "[[_templates/include/meeting]]"))
    );
}

#[tokio::test]
async fn test_include_file_skipped_when_template_missing() {
    let diagnostics = DiagnosticLog::new();
    let options = factory(no_files())
        .with_diagnostics(diagnostics.clone())
        .create_prompt_options(&default_class("meeting"))
        .await
        .unwrap();

    assert_eq!(options.value_for_field("includeFile"), None);
    let records = diagnostics.of_kind(DiagnosticKind::MissingIncludeTemplate);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].type_name, "meeting");
}

#[tokio::test]
async fn test_include_file_not_checked_when_disabled() {
    // A failing vault is never consulted
    let options = factory(BrokenFileSystem)
        .create_prompt_options(&default_class("book"))
        .await
        .unwrap();
    assert!(!options.include_default_templates);
    assert!(options.default_values.is_empty());
}

#[tokio::test]
async fn test_include_check_failure_propagates() {
    let err = factory(BrokenFileSystem)
        .create_prompt_options(&default_class("meeting"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::FileCheckFailed);
    assert!(err.to_string().contains("_templates/include/meeting.md"));
}

#[tokio::test]
async fn test_existing_include_file_is_kept() {
    let resolved = inline_class(
        json!({"note": {
            "include_default_templates": true,
            "default_values": [{"name": "includeFile", "value": "[[custom]]"}]
        }}),
        "note",
    );
    let files = StaticFileSystem::new(["_templates/include/note.md"]);
    let options = factory(files)
        .create_prompt_options(&resolved)
        .await
        .unwrap();
    assert_eq!(options.default_values, vec![DefaultValue::new("includeFile", "[[custom]]")]);
}

#[tokio::test]
async fn test_include_dir_follows_config() {
    let mut config = AppConfig::default();
    config.paths.include_template_dir = Some("inc".to_string());
    let files = StaticFileSystem::new(["inc/meeting.md"]);
    let options = factory_with(config, files)
        .create_prompt_options(&default_class("meeting"))
        .await
        .unwrap();
    assert_eq!(options.value_for_field("includeFile"), Some(&json!("[[inc/meeting]]")));
}

// ============================================================================
// Invalid configuration
// ============================================================================

#[tokio::test]
async fn test_non_string_ignore_field_fails() {
    let resolved = inline_class(json!({"bad": {"ignore_fields": ["ok", 3]}}), "bad");
    let err = factory(no_files())
        .create_prompt_options(&resolved)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotAString);
    assert_eq!(err.type_name.as_deref(), Some("bad"));
}

#[tokio::test]
async fn test_wrong_field_type_fails() {
    let resolved = inline_class(json!({"bad": {"prompt_for_task": "yes"}}), "bad");
    let err = factory(no_files())
        .create_prompt_options(&resolved)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfig);
}

// ============================================================================
// View options
// ============================================================================

#[test]
fn test_view_periods_of_periodic_classes() {
    let factory = factory(no_files());
    let period = |class: &str, title: &str| {
        factory
            .create_view_options(&default_class(class), title)
            .unwrap()
            .period
    };

    assert_eq!(period("daily", "2024-02-08"), 0);
    assert_eq!(period("weekly", "2024-W06"), 7);
    assert_eq!(period("monthly", "2024-02"), 29);
    assert_eq!(period("monthly", "2023-02"), 28);
    assert_eq!(period("quarterly", "2024-Q1"), 90);
    assert_eq!(period("yearly", "2024"), 366);
    assert_eq!(period("yearly", "2023"), 365);
    // Undated titles fall back to today
    assert_eq!(period("monthly", "February review"), 29);
}

#[test]
fn test_view_options_of_daily() {
    let options = factory(no_files())
        .create_view_options(&default_class("daily"), "2024-02-08")
        .unwrap();

    assert_eq!(options.title, "2024-02-08");
    assert!(!options.linked);
    assert_eq!(options.tags.len(), 7);
    assert!(options.tags.has("journal"));
    assert!(options.tags.has("project"));
}

#[test]
fn test_view_options_of_non_periodic_class() {
    let options = factory(no_files())
        .create_view_options(&default_class("game-company"), "Acme Games")
        .unwrap();

    assert_eq!(options.period, -1);
    assert!(options.linked);
    assert_eq!(
        options.tags.to_vec(),
        vec!["games-job", "meeting", "reference", "resource"]
    );
}

#[test]
fn test_explicit_view_period_wins() {
    let resolved = inline_class(
        json!({"sprint": {"view": {"period": 14, "tags": "sprint", "columns": 3}}}),
        "sprint",
    );
    let options = factory(no_files())
        .create_view_options(&resolved, "Sprint 4")
        .unwrap();

    assert_eq!(options.period, 14);
    assert_eq!(options.tags.to_vec(), vec!["sprint"]);
    assert_eq!(options.extra.get("columns"), Some(&json!(3)));
}

#[test]
fn test_view_without_section() {
    let options = factory(no_files())
        .create_view_options(&default_class("book"), "Dune")
        .unwrap();
    assert_eq!(options.period, -1);
    assert!(options.tags.is_empty());
    assert!(!options.linked);
}

// ============================================================================
// Folders
// ============================================================================

#[tokio::test]
async fn test_folders_for_configured_and_catalog() {
    let factory = factory(no_files());
    let catalog = StaticClassCatalog::new().with(
        "book",
        ClassSchema {
            files_paths: vec!["books".to_string()],
            ..Default::default()
        },
    );

    let resource = factory
        .create_prompt_options(&default_class("resource"))
        .await
        .unwrap();
    let schema = catalog.resolved_fields("resource");
    assert_eq!(folders_for(&resource, schema.as_ref()), vec!["library"]);

    let book = factory
        .create_prompt_options(&default_class("book"))
        .await
        .unwrap();
    let schema = catalog.resolved_fields("book");
    assert_eq!(folders_for(&book, schema.as_ref()), vec!["books"]);
    assert!(folders_for(&book, None).is_empty());
}
