//! Integration tests for the transform registry, work item handler and JSON host

use std::io::Write;
use std::sync::Arc;
use std::thread;

use serde_json::json;
use transform_workitem::{
    CompletionSlot, CompletionStatus, DynValue, HandlerConfig, NdjsonReader, TransformError,
    TransformRegistry, TransformWorkItemHandler, TypeKey, TypedValue, WorkItem, WorkItemHandler,
    WorkOutcome, WorkRequest, INPUT_OBJECT, OUTPUT_OBJECT, OUTPUT_TYPE,
};

fn scalar_registry() -> TransformRegistry {
    let registry = TransformRegistry::new();
    registry.alias::<i64>("Integer");
    registry.alias::<String>("String");
    registry.alias::<bool>("Boolean");
    registry
}

fn run_item(handler: &TransformWorkItemHandler, item: WorkItem) -> WorkOutcome {
    let slot = CompletionSlot::new();
    handler.execute_work_item(item, &slot);
    slot.into_outcome().expect("work item left incomplete").1
}

#[test]
fn test_integer_formatted_as_string() {
    let registry = scalar_registry();
    registry.register(|n: i64| n.to_string());

    let out = registry
        .execute(DynValue::new(42i64), TypeKey::of::<String>())
        .unwrap();
    assert_eq!(out.downcast::<String>().unwrap(), "42");
}

#[test]
fn test_boolean_to_integer_without_registration_fails() {
    let registry = scalar_registry();
    registry.register(|n: i64| n.to_string());

    let err = registry
        .execute_named(DynValue::new(true), "Integer")
        .unwrap_err();
    assert!(matches!(err, TransformError::NoTransform { .. }));
    assert_eq!(
        err.to_string(),
        format!("No transform available from bool to {}", TypeKey::of::<i64>())
    );
}

#[test]
fn test_overwrite_observed_by_later_execute() {
    let registry = scalar_registry();
    registry.register(|n: i64| format!("f:{}", n));
    let first = registry.lookup_typed::<i64, String>().unwrap();

    registry.register(|n: i64| format!("g:{}", n));
    let second = registry.lookup_typed::<i64, String>().unwrap();

    assert!(!first.ptr_eq(&second));
    assert_eq!(registry.convert::<i64, String>(5).unwrap(), "g:5");
}

#[test]
fn test_handler_end_to_end() {
    let registry = scalar_registry();
    registry.register(|n: i64| n.to_string());
    let handler = TransformWorkItemHandler::new(Arc::new(registry));

    let item = WorkItem::new()
        .parameter(INPUT_OBJECT, 42i64)
        .parameter(OUTPUT_TYPE, "String".to_string());

    match run_item(&handler, item) {
        WorkOutcome::Completed(mut results) => {
            let out = results.remove(OUTPUT_OBJECT).unwrap();
            assert_eq!(out.downcast::<String>().unwrap(), "42");
        }
        WorkOutcome::Failed(e) => panic!("unexpected failure: {e}"),
    }

    let item = WorkItem::new()
        .parameter(INPUT_OBJECT, true)
        .parameter(OUTPUT_TYPE, "Integer".to_string());
    assert!(matches!(
        run_item(&handler, item),
        WorkOutcome::Failed(TransformError::NoTransform { .. })
    ));
}

#[test]
fn test_failed_request_leaves_registry_intact() {
    let registry = scalar_registry();
    registry.register_fallible(|s: String| s.parse::<i64>());
    registry.register(|_: bool| -> String { panic!("unsupported") });
    let handler = TransformWorkItemHandler::new(Arc::new(registry)).with_log_errors(false);

    let bad = WorkItem::new()
        .parameter(INPUT_OBJECT, "abc".to_string())
        .parameter(OUTPUT_TYPE, "Integer".to_string());
    assert!(matches!(run_item(&handler, bad), WorkOutcome::Failed(_)));

    let panics = WorkItem::new()
        .parameter(INPUT_OBJECT, false)
        .parameter(OUTPUT_TYPE, "String".to_string());
    assert!(matches!(
        run_item(&handler, panics),
        WorkOutcome::Failed(TransformError::Invocation { .. })
    ));

    let good = WorkItem::new()
        .parameter(INPUT_OBJECT, "12".to_string())
        .parameter(OUTPUT_TYPE, "Integer".to_string());
    assert!(matches!(run_item(&handler, good), WorkOutcome::Completed(_)));
}

#[test]
fn test_concurrent_handlers_share_registry() {
    let registry = Arc::new(scalar_registry());
    registry.register(|n: i64| n.to_string());
    let handler = TransformWorkItemHandler::new(Arc::clone(&registry));

    let workers: Vec<_> = (0..8i64)
        .map(|t| {
            let handler = handler.clone();
            thread::spawn(move || {
                (0..100i64)
                    .map(|i| {
                        let n = t * 100 + i;
                        let item = WorkItem::new()
                            .parameter(INPUT_OBJECT, n)
                            .parameter(OUTPUT_TYPE, "String".to_string());
                        match run_item(&handler, item) {
                            WorkOutcome::Completed(mut results) => results
                                .remove(OUTPUT_OBJECT)
                                .and_then(|v| v.downcast::<String>().ok())
                                .map(|s| s == n.to_string())
                                .unwrap_or(false),
                            WorkOutcome::Failed(_) => false,
                        }
                    })
                    .filter(|ok| *ok)
                    .count()
            })
        })
        .collect();

    // Registration keeps going while the workers run
    for _ in 0..50 {
        registry.register(|b: bool| b.to_string());
    }

    let total: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(total, 800);
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_host_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "log_errors: false").unwrap();
    writeln!(file, "aliases:").unwrap();
    writeln!(file, "  Long: Integer").unwrap();
    writeln!(file, "  Text: String").unwrap();

    let config = HandlerConfig::load_from_file(file.path()).unwrap();
    assert!(!config.log_errors);

    let host = config.build_host().unwrap();
    let completion = host.process(WorkRequest::new(TypedValue::new("Long", json!(42)), "Text"));

    assert_eq!(completion.status, CompletionStatus::Completed);
    assert_eq!(completion.output, Some(TypedValue::new("Text", json!("42"))));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = HandlerConfig::load_from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.contains("Failed to read config file"));
}

#[test]
fn test_ndjson_requests_through_host() {
    let host = HandlerConfig::default().build_host().unwrap();
    let input = concat!(
        r#"{"InputObject": {"type": "Integer", "value": 42}, "OutputType": "String"}"#, "\n",
        r#"{"InputObject": {"type": "Boolean", "value": true}, "OutputType": "Integer"}"#, "\n",
        r#"{"InputObject": {"type": "String", "value": "3.5"}, "OutputType": "Double"}"#, "\n",
        r#"{"OutputType": "String"}"#, "\n",
        "{broken\n",
    );

    let completions: Vec<_> = NdjsonReader::<_, WorkRequest>::new(input.as_bytes())
        .map(|request| match request {
            Ok(request) => host.process(request),
            Err(message) => host.reject(message),
        })
        .collect();

    let kinds: Vec<Option<String>> = completions
        .iter()
        .map(|c| c.error.as_ref().map(|e| e.kind.clone()))
        .collect();

    assert_eq!(
        kinds,
        vec![
            None,
            Some("no_transform".to_string()),
            None,
            Some("missing_parameter".to_string()),
            Some("invalid_request".to_string()),
        ]
    );
    assert_eq!(completions[0].output.as_ref().unwrap().value, json!("42"));
    assert_eq!(completions[2].output.as_ref().unwrap().value, json!(3.5));
}

#[test]
fn test_non_finite_double_request_fails() {
    let host = HandlerConfig::default().build_host().unwrap();

    for text in ["NaN", "inf", "1e400"] {
        let completion = host.process(WorkRequest::new(TypedValue::new("String", json!(text)), "Double"));

        assert_eq!(completion.status, CompletionStatus::Failed, "{} completed", text);
        assert!(completion.output.is_none());
        assert_eq!(completion.error.unwrap().kind, "invocation_failed");
    }
}

#[test]
fn test_env_overrides_config_file_server() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "server:").unwrap();
    writeln!(file, "  host: 127.0.0.1").unwrap();
    writeln!(file, "  port: 9090").unwrap();

    std::env::set_var("HOST", "10.0.0.1");
    std::env::set_var("PORT", "7000");
    let config = HandlerConfig::load_from_file(file.path())
        .unwrap()
        .with_env_overrides();
    std::env::remove_var("HOST");
    std::env::remove_var("PORT");

    assert_eq!(config.server.host, "10.0.0.1");
    assert_eq!(config.server.port, 7000);
}
