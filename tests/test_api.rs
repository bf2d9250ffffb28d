//! End-to-end tests of the plugin runtime: snapshots on disk, configuration
//! files, per-plugin APIs and stopping plugins.

extern crate bdshim;
extern crate tempfile;

use std::fs;
use std::rc::Rc;

use bdshim::runner::ds::builder::ObjectBuilder;
use bdshim::runner::ds::error::ShimError;
use bdshim::runner::ds::function_object::{call, function_to_string};
use bdshim::runner::ds::operations::object::get_v;
use bdshim::runner::ds::operations::test_and_comparison::same_value;
use bdshim::runner::ds::value::JsValue;
use bdshim::runner::logger::{LogLevel, RecordingLogger};
use bdshim::runner::patcher::PatchTarget;
use bdshim::runner::plugin::{CompatRuntime, KnownModules, ShimConfig};
use bdshim::runner::webpack::registry::{ModuleId, ModuleRegistry, SharedRegistry};

const SNAPSHOT: &str = r#"[
    { "id": 1, "exports": { "$host": "window" } },
    {
        "id": 2,
        "exports": {
            "dispatch": { "$fn": "function dispatch(e){return e}" },
            "subscribe": { "$fn": "function subscribe(t,n){}" }
        },
        "source": "e.exports=new Dispatcher"
    },
    {
        "id": "user-store",
        "exports": {
            "__esModule": true,
            "default": {
                "getCurrentUser": { "$fn": "function(){return this.user}" },
                "_dispatchToken": "ID_1"
            }
        }
    },
    { "id": 3, "exports": { "wrapper": "wrapper_a1b2", "inner": "inner_c3d4" } }
]"#;

fn registry_from(json: &str) -> SharedRegistry {
    let registry = ModuleRegistry::shared();
    registry.load_snapshot(json).unwrap();
    registry
}

/// A live dispatcher whose `dispatch` echoes its first argument.
fn live_dispatcher() -> JsValue {
    ObjectBuilder::new()
        .add_method("dispatch", |_, args| {
            Ok(args.first().cloned().unwrap_or(JsValue::Undefined))
        })
        .add_method("register", |_, _| Ok(JsValue::Undefined))
        .build_value()
}

/// The snapshot plus a live dispatcher registered as module 50.
fn runtime() -> (CompatRuntime, Rc<RecordingLogger>) {
    let logger = Rc::new(RecordingLogger::new());
    let registry = registry_from(SNAPSHOT);
    registry.register(50u64, live_dispatcher());
    let runtime = CompatRuntime::new(registry, logger.clone(), ShimConfig::default());
    (runtime, logger)
}

fn invoke(target: &JsValue, method: &str, args: Vec<JsValue>) -> JsValue {
    let f = get_v(target, method).unwrap();
    let mut args = args;
    call(&f, target, &mut args).unwrap()
}

// ============================================================================
// Snapshots
// ============================================================================

mod snapshot_tests {
    use super::*;

    #[test]
    fn test_snapshot_file_round_trip_through_resolver() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modules.json");
        fs::write(&path, SNAPSHOT).unwrap();

        let registry = ModuleRegistry::shared();
        assert_eq!(registry.load_snapshot_file(&path).unwrap(), 4);
        assert_eq!(
            registry.ids(),
            vec![
                ModuleId::Num(1),
                ModuleId::Num(2),
                ModuleId::Str("user-store".to_string()),
                ModuleId::Num(3),
            ]
        );
        let record = registry.get(&ModuleId::Num(2)).unwrap();
        assert_eq!(record.source.as_deref(), Some("e.exports=new Dispatcher"));

        let runtime = CompatRuntime::with_registry(registry);
        let dispatch = runtime.resolver().get_by_strings(&["dispatch(e)"]);
        assert!(dispatch.is_none());
        let dispatcher = runtime.resolver().get_by_keys(&["dispatch", "subscribe"]).unwrap();
        let f = get_v(&dispatcher, "dispatch").unwrap();
        assert_eq!(
            function_to_string(f.as_object().unwrap()).unwrap(),
            "function dispatch(e){return e}"
        );
    }

    #[test]
    fn test_missing_snapshot_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModuleRegistry::shared()
            .load_snapshot_file(&dir.path().join("absent.json"))
            .unwrap_err();
        assert!(matches!(err, ShimError::Io(_)));
    }

    #[test]
    fn test_malformed_snapshot_is_json_error() {
        let err = ModuleRegistry::shared().load_snapshot("{ not json").unwrap_err();
        assert!(matches!(err, ShimError::Json(_)));
    }

    #[test]
    fn test_es_module_default_from_snapshot() {
        let (runtime, _) = runtime();
        let store = runtime.resolver().get_by_keys(&["getCurrentUser"]).unwrap();
        assert_eq!(get_v(&store, "_dispatchToken").unwrap(), JsValue::from("ID_1"));
    }

    #[test]
    fn test_classname_module_from_snapshot() {
        let (runtime, _) = runtime();
        let classes = runtime.resolver().get_by_keys(&["wrapper", "inner"]).unwrap();
        assert_eq!(get_v(&classes, "wrapper").unwrap(), JsValue::from("wrapper_a1b2"));
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_runtime_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shim.toml");
        fs::write(
            &path,
            "[resolver]\nsearch_exports = true\n\n[patcher]\nforce_patch = false\n",
        )
        .unwrap();

        let logger = Rc::new(RecordingLogger::new());
        let runtime =
            CompatRuntime::from_config_file(registry_from(SNAPSHOT), logger.clone(), &path).unwrap();
        assert!(runtime.config().resolver.search_exports);
        assert!(runtime.resolver().defaults().search_exports);

        // `dispatch` lives one level down, found only by searching exports.
        assert!(runtime.resolver().get_by_strings(&["dispatch(e)"]).is_some());

        // No placeholder is installed on an empty slot.
        let api = runtime.api(Some("P"));
        let dispatcher = runtime.resolver().get_by_keys(&["dispatch"]).unwrap();
        assert!(api
            .patcher
            .before(dispatcher.clone(), "missing", |_, _| Ok(()))
            .is_none());
        assert_eq!(logger.count(LogLevel::Warn), 1);
    }

    #[test]
    fn test_unreadable_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shim.toml");
        fs::write(&path, "[patcher]\nforce_patch = 3\n").unwrap();

        let result = CompatRuntime::from_config_file(
            ModuleRegistry::shared(),
            Rc::new(RecordingLogger::new()),
            &path,
        );
        assert!(matches!(result, Err(ShimError::ConfigParse(_))));

        let missing = ShimConfig::load(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ShimError::Io(_))));
    }
}

// ============================================================================
// Plugin lifecycle
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_api_labels() {
        let (runtime, _) = runtime();
        let named = runtime.api(Some("Named"));
        let anonymous = runtime.api(None);
        let empty = runtime.api(Some(""));

        assert_eq!(named.label(), "Named");
        assert_eq!(anonymous.label().len(), 36);
        assert_ne!(anonymous.label(), empty.label());
        assert_eq!(runtime.labels().len(), 3);

        runtime.stop_plugin("Named");
        assert_eq!(runtime.labels(), vec![anonymous.label(), empty.label()]);
    }

    #[test]
    fn test_plugins_patch_known_modules_independently() {
        let (runtime, logger) = runtime();
        let dispatcher = runtime.resolver().get_by_keys(&["dispatch", "register"]).unwrap();
        runtime.setup(KnownModules::from_lookups(
            runtime.resolver(),
            &[
                ("Dispatcher", &["dispatch", "register"][..]),
                ("Nothing", &["nope"][..]),
            ],
        ));
        assert!(runtime.patcher().known_modules().contains("Dispatcher"));
        assert!(!runtime.patcher().known_modules().contains("Nothing"));

        let original = get_v(&dispatcher, "dispatch").unwrap();
        let first = runtime.api(Some("First"));
        let second = runtime.api(Some("Second"));

        first.patcher.after("Dispatcher", "dispatch", |_, _, ret| {
            Ok(JsValue::from(format!("{}+first", ret)))
        });
        second.patcher.before(
            PatchTarget::by_properties(&["dispatch", "register"]),
            "dispatch",
            |_, args| {
                args[0] = JsValue::from("rewritten");
                Ok(())
            },
        );
        assert_eq!(
            invoke(&dispatcher, "dispatch", vec![JsValue::from("e")]),
            JsValue::from("rewritten+first")
        );

        runtime.stop_plugin("First");
        assert_eq!(
            invoke(&dispatcher, "dispatch", vec![JsValue::from("e")]),
            JsValue::from("rewritten")
        );
        runtime.stop_plugin("Second");
        assert!(same_value(&get_v(&dispatcher, "dispatch").unwrap(), &original));
        assert_eq!(runtime.patcher().active_patch_names().len(), 0);

        let debug: Vec<String> = logger
            .entries()
            .into_iter()
            .filter(|e| e.level == LogLevel::Debug)
            .map(|e| e.message)
            .collect();
        assert!(debug.contains(&"Stopped First (1 patches removed)".to_string()));
    }

    #[test]
    fn test_stopping_unknown_plugin_is_harmless() {
        let (runtime, _) = runtime();
        runtime.stop_plugin("Ghost");
        assert!(runtime.labels().is_empty());
    }

    #[test]
    fn test_plugin_failure_is_contained() {
        let (runtime, logger) = runtime();
        let dispatcher = runtime.resolver().get_by_keys(&["dispatch", "register"]).unwrap();
        let api = runtime.api(Some("Buggy"));
        api.patcher.before(dispatcher.clone(), "dispatch", |_, args| {
            let options = args.get(1).cloned().unwrap_or(JsValue::Undefined);
            get_v(&options, "missing")?;
            Ok(())
        });

        let out = invoke(&dispatcher, "dispatch", vec![JsValue::from("e")]);
        assert_eq!(out, JsValue::from("e"));
        let errors: Vec<_> = logger
            .entries()
            .into_iter()
            .filter(|e| e.level == LogLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Could not fire before callback of Object.dispatch for Buggy");
    }
}
