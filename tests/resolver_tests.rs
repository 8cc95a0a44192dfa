//! Integration tests for class resolution.
//!
//! Covers inheritance, the array operators, view merging, template
//! rendering and the failure modes, against small inline tables and the
//! embedded default class table.

use notegen::config::{
    AppConfig, ConfigResolver, DEFAULT_CLASSES_YAML, RawTypeTable, resolve,
};
use notegen::error::ErrorCode;
use notegen::logging::{DiagnosticKind, DiagnosticLog};
use serde_json::{Value, json};

fn resolver_for(raw: Value) -> ConfigResolver {
    ConfigResolver::with_config(
        RawTypeTable::from_value(raw).expect("valid table"),
        &AppConfig::default(),
        DiagnosticLog::new(),
    )
}

fn default_resolver() -> ConfigResolver {
    ConfigResolver::with_config(
        RawTypeTable::from_yaml_str(DEFAULT_CLASSES_YAML).expect("embedded table parses"),
        &AppConfig::default(),
        DiagnosticLog::new(),
    )
}

// ============================================================================
// Root classes and isolation
// ============================================================================

#[test]
fn test_root_resolves_to_copy_of_raw() {
    let raw = json!({
        "book": {
            "files_paths": ["library"],
            "default_values": [{"name": "series", "value": true}]
        }
    });
    let table = RawTypeTable::from_value(raw.clone()).unwrap();

    let book = resolve(&table, "book").unwrap();
    let mut value = book.to_value();
    assert_eq!(
        value,
        json!({
            "files_paths": ["library"],
            "default_values": [{"name": "series", "value": true}],
            "_type": "book"
        })
    );

    // Mutating the output leaves the table alone
    value["files_paths"].as_array_mut().unwrap().push(json!("other"));
    assert_eq!(table.get("book").unwrap()["files_paths"], json!(["library"]));
    assert_eq!(resolve(&table, "book").unwrap().get("files_paths"), Some(&json!(["library"])));
}

#[test]
fn test_sibling_resolutions_are_isolated() {
    let r = resolver_for(json!({
        "base": {"ignore_fields": ["status"]},
        "left": {"_extends": "base", "_ignore_fields_add": ["tags"]},
        "right": {"_extends": "base", "_ignore_fields_add": ["tags"]}
    }));

    let left = r.resolve("left").unwrap();
    let right = r.resolve("right").unwrap();

    assert_eq!(left.get("ignore_fields"), Some(&json!(["status", "tags"])));
    assert_eq!(right.get("ignore_fields"), Some(&json!(["status", "tags"])));
    assert_eq!(r.resolve("base").unwrap().get("ignore_fields"), Some(&json!(["status"])));
}

// ============================================================================
// Inheritance
// ============================================================================

#[test]
fn test_three_level_chain() {
    let r = resolver_for(json!({
        "root": {"only_root": 1, "shared": "root", "view": {"tags": ["a"]}},
        "middle": {"_extends": "root", "shared": "middle", "only_middle": true},
        "leaf": {"_extends": "middle", "shared": "leaf"}
    }));

    let leaf = r.resolve("leaf").unwrap();
    assert_eq!(leaf.get("only_root"), Some(&json!(1)));
    assert_eq!(leaf.get("only_middle"), Some(&json!(true)));
    assert_eq!(leaf.get("shared"), Some(&json!("leaf")));
    assert_eq!(leaf.view().unwrap()["tags"], json!(["a"]));

    // Topmost ancestor, not the immediate parent
    assert_eq!(leaf.root(), Some("root"));
    assert_eq!(leaf.parent(), Some("middle"));
    let value = leaf.to_value();
    assert_eq!(value["_extends"], "root");
    assert_eq!(value["_type"], "leaf");
}

#[test]
fn test_middle_override_beats_root() {
    let r = resolver_for(json!({
        "root": {"shared": "root"},
        "middle": {"_extends": "root", "shared": "middle"},
        "leaf": {"_extends": "middle"}
    }));
    assert_eq!(r.resolve("leaf").unwrap().get_str("shared"), Some("middle"));
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_add_operator() {
    let r = resolver_for(json!({
        "parent": {"ignore_fields": ["status"]},
        "child": {"_extends": "parent", "_ignore_fields_add": ["tags"]}
    }));
    let child = r.resolve("child").unwrap();
    assert_eq!(child.get("ignore_fields"), Some(&json!(["status", "tags"])));
    assert!(child.get("_ignore_fields_add").is_none());
}

#[test]
fn test_replace_operator_in_view() {
    let r = resolver_for(json!({
        "company": {"view": {"tags": ["job-post", "meeting"]}},
        "game-company": {"_extends": "company", "view": {"_tags_replace": {"job-post": "games-job"}}}
    }));
    let resolved = r.resolve("game-company").unwrap();
    assert_eq!(resolved.view().unwrap()["tags"], json!(["games-job", "meeting"]));
}

#[test]
fn test_delete_operator() {
    let r = resolver_for(json!({
        "parent": {"x": ["a", "b", "c"]},
        "child": {"_extends": "parent", "_x_delete": ["b"]},
        "noop": {"_extends": "parent", "_x_delete": ["zzz"]}
    }));
    assert_eq!(r.resolve("child").unwrap().get("x"), Some(&json!(["a", "c"])));
    assert_eq!(r.resolve("noop").unwrap().get("x"), Some(&json!(["a", "b", "c"])));
}

#[test]
fn test_operators_follow_yaml_order() {
    let table = RawTypeTable::from_yaml_str(
        r#"
base:
  t: []
  pair: [a, b]
child:
  _extends: base
  _t_replace: {x: z}
  _t_add: [x]
  _pair_replace:
    b: c
    a: b
"#,
    )
    .unwrap();

    let child = resolve(&table, "child").unwrap();
    assert_eq!(child.get("t"), Some(&json!(["x"])));
    assert_eq!(child.get("pair"), Some(&json!(["b", "c"])));
}

#[test]
fn test_operator_on_non_array_is_skipped_with_warning() {
    let r = resolver_for(json!({
        "parent": {"tags": "journal"},
        "child": {"_extends": "parent", "_tags_add": ["x"]}
    }));
    let child = r.resolve("child").unwrap();
    assert_eq!(child.get("tags"), Some(&json!("journal")));

    let warnings = r.diagnostics().of_kind(DiagnosticKind::MergeTypeMismatch);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].type_name, "child");
}

#[test]
fn test_root_operator_is_not_applied() {
    let r = resolver_for(json!({"root": {"tags": ["a"], "_tags_add": ["b"]}}));

    let root = r.resolve("root").unwrap();
    assert_eq!(root.to_value(), json!({"tags": ["a"], "_type": "root"}));

    let inert = r.diagnostics().of_kind(DiagnosticKind::InertOperator);
    assert_eq!(inert.len(), 1);
    assert_eq!(inert[0].type_name, "root");
}

// ============================================================================
// Templates
// ============================================================================

#[test]
fn test_templates_compiled_against_requesting_class() {
    let r = resolver_for(json!({
        "meeting": {"default_values": [{"name": "includeFile", "value": "[[${'INCLUDE_TEMPLATE_DIR'}/${type}]]"}]},
        "interview": {"_extends": "meeting"},
        "standup": {
            "_extends": "meeting",
            "default_values": [{"name": "includeFile", "value": "[[${'INCLUDE_TEMPLATE_DIR'}/${type}]]"}]
        }
    }));

    let interview = r.resolve("interview").unwrap();
    assert_eq!(
        interview.get("default_values").unwrap()[0]["value"],
        "[[_templates/include/meeting]]"
    );
    let standup = r.resolve("standup").unwrap();
    assert_eq!(
        standup.get("default_values").unwrap()[0]["value"],
        "[[_templates/include/standup]]"
    );
}

#[test]
fn test_template_bindings_follow_config() {
    let mut config = AppConfig::default();
    config.paths.template_root = "tpl".to_string();
    let r = ConfigResolver::with_config(
        RawTypeTable::from_value(json!({"chat": {"system_prompts": "${TEMPLATE_ROOT}/chat/system"}}))
            .unwrap(),
        &config,
        DiagnosticLog::new(),
    );
    assert_eq!(r.resolve("chat").unwrap().get_str("system_prompts"), Some("tpl/chat/system"));
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_cycle_is_detected() {
    let r = resolver_for(json!({
        "A": {"_extends": "B"},
        "B": {"_extends": "A"}
    }));
    let err = r.resolve("A").unwrap_err();
    assert_eq!(err.code, ErrorCode::ExtendsCycle);
    assert_eq!(err.to_string(), "extends cycle: A -> B -> A");
    assert!(r.resolve_all().is_err());
}

#[test]
fn test_long_cycle_names_whole_chain() {
    let r = resolver_for(json!({
        "leaf": {"_extends": "a"},
        "a": {"_extends": "b"},
        "b": {"_extends": "c"},
        "c": {"_extends": "a"}
    }));
    let err = r.resolve("leaf").unwrap_err();
    assert_eq!(err.message, "extends cycle: leaf -> a -> b -> c -> a");
}

#[test]
fn test_unknown_type_resolves_empty() {
    let r = resolver_for(json!({"book": {"x": 1}}));
    let missing = r.resolve("nonexistent").unwrap();

    assert_eq!(missing.to_value(), json!({"_type": "nonexistent"}));
    let warnings = r.diagnostics().of_kind(DiagnosticKind::UnknownType);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].type_name, "nonexistent");
}

// ============================================================================
// Embedded default classes
// ============================================================================

#[test]
fn test_default_daily_view_tags() {
    let r = default_resolver();
    let daily = r.resolve("daily").unwrap();

    assert_eq!(daily.root(), Some("periodic"));
    assert_eq!(
        daily.view().unwrap()["tags"],
        json!(["reference", "resource", "chat", "yt", "goal", "project", "journal"])
    );
    assert_eq!(
        daily.get("default_values").unwrap()[1]["value"],
        "[[_templates/include/day-planner]]"
    );
}

#[test]
fn test_default_weekly_chain() {
    let r = default_resolver();
    let weekly = r.resolve("weekly").unwrap();

    assert_eq!(weekly.parent(), Some("periodic-review"));
    assert_eq!(weekly.root(), Some("periodic"));
    assert_eq!(weekly.get_bool("prompt_for_task"), Some(false));
    assert_eq!(weekly.get_bool("prompt_for_suffix"), Some(true));
    assert_eq!(weekly.view().unwrap()["tags"], json!(["daily"]));
    assert_eq!(
        r.chain("weekly").unwrap(),
        vec!["weekly", "periodic-review", "periodic"]
    );
}

#[test]
fn test_default_company_variants() {
    let r = default_resolver();
    let games = r.resolve("game-company").unwrap();
    let vfx = r.resolve("vfx-company").unwrap();

    assert_eq!(
        games.view().unwrap()["tags"],
        json!(["games-job", "meeting", "reference", "resource"])
    );
    assert_eq!(
        vfx.view().unwrap()["tags"],
        json!(["vfx-job", "meeting", "reference", "resource"])
    );
    assert_eq!(games.get("ignore_fields"), Some(&json!(["location", "link"])));
}

#[test]
fn test_default_table_resolves_cleanly() {
    let r = default_resolver();
    let all = r.resolve_all().unwrap();

    assert_eq!(all.len(), 27);
    assert!(all.windows(2).all(|w| w[0].type_name() < w[1].type_name()));
    assert!(r.diagnostics().records().is_empty());
}
