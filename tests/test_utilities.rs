//! Tests for the lookups layered on the resolver: id lookups, keyed
//! matches, mangled views and bulk queries.

extern crate bdshim;

use std::rc::Rc;

use bdshim::runner::ds::builder::ObjectBuilder;
use bdshim::runner::ds::error::ShimError;
use bdshim::runner::ds::function_object::call;
use bdshim::runner::ds::operations::object::{get, get_v, own_keys, set};
use bdshim::runner::ds::operations::test_and_comparison::same_value;
use bdshim::runner::ds::value::JsValue;
use bdshim::runner::logger::RecordingLogger;
use bdshim::runner::webpack::filters::{self, Filter};
use bdshim::runner::webpack::registry::{ModuleId, ModuleRegistry, SharedRegistry};
use bdshim::runner::webpack::resolver::{ModuleMatch, ModuleResolver};
use bdshim::runner::webpack::utilities::{BulkQuery, KeyMapper, MANGLED_MODULE_KEY};

fn fixture() -> (SharedRegistry, ModuleResolver) {
    let registry = ModuleRegistry::shared();
    let resolver = ModuleResolver::new(registry.clone(), Rc::new(RecordingLogger::new()));
    (registry, resolver)
}

/// A minified module: `{ a: openModal, b: closeModal, c: "v1" }` where the
/// functions are only recognisable by their source.
fn minified() -> JsValue {
    ObjectBuilder::new()
        .add_method_with_source("a", "function(e){return openModal(e)}", |_, _| {
            Ok(JsValue::from("opened"))
        })
        .add_method_with_source("b", "function(){return closeAll()}", |_, _| {
            Ok(JsValue::from("closed"))
        })
        .add_property("c", JsValue::from("v1"))
        .build_value()
}

fn mappers() -> Vec<KeyMapper> {
    vec![
        ("open".to_string(), filters::by_strings(&["openModal"])),
        ("close".to_string(), filters::by_strings(&["closeAll"])),
        ("missing".to_string(), filters::by_strings(&["nowhere"])),
    ]
}

fn modal_module() -> Filter {
    Filter::simple(|m| get_v(m, "c").map(|v| v.is_truthy()).unwrap_or(false))
}

// ============================================================================
// Lookup by id
// ============================================================================

mod by_id_tests {
    use super::*;

    #[test]
    fn test_get_by_id_returns_plain_objects_only() {
        let (registry, resolver) = fixture();
        let exports = minified();
        registry.register(10u64, exports.clone());
        let f = get_v(&exports, "a").unwrap();
        registry.register("fn", f);
        registry.register(11u64, JsValue::from("text"));

        match resolver.get_by_id(&ModuleId::Num(10), false) {
            Some(ModuleMatch::Exports(v)) => assert!(same_value(&v, &exports)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(resolver.get_by_id(&ModuleId::parse("fn"), false).is_none());
        assert!(resolver.get_by_id(&ModuleId::Num(11), false).is_none());
        assert!(resolver.get_by_id(&ModuleId::Num(12), false).is_none());
    }

    #[test]
    fn test_get_by_id_raw() {
        let (registry, resolver) = fixture();
        registry.register(10u64, minified());
        let m = resolver.get_by_id(&ModuleId::parse("10"), true).unwrap();
        assert_eq!(m.record().unwrap().id, ModuleId::Num(10));
    }

    #[test]
    fn test_get_by_id_fatal_names_the_id() {
        let (_, resolver) = fixture();
        let err = resolver.get_by_id_fatal(&ModuleId::Num(404), false).unwrap_err();
        assert!(matches!(err, ShimError::ModuleNotFound(ref id) if id == "404"));
        assert_eq!(
            err.to_string(),
            "[WebpackModules] Module with id \"404\" not found."
        );
    }
}

// ============================================================================
// Keyed and mangled lookups
// ============================================================================

mod mangled_tests {
    use super::*;

    #[test]
    fn test_get_module_with_key_reports_member() {
        let (registry, resolver) = fixture();
        let exports = minified();
        registry.register(1u64, exports.clone());

        let (found, key) = resolver
            .get_module_with_key(&filters::by_strings(&["closeAll"]))
            .unwrap();
        assert!(same_value(&found, &exports));
        assert_eq!(key.as_deref(), Some("b"));
    }

    #[test]
    fn test_get_module_with_key_whole_exports() {
        let (registry, resolver) = fixture();
        registry.register(1u64, minified());
        let (_, key) = resolver.get_module_with_key(&modal_module()).unwrap();
        assert_eq!(key, None);
        assert!(resolver
            .get_module_with_key(&filters::by_strings(&["nowhere"]))
            .is_none());
    }

    #[test]
    fn test_mangled_view_reads_through() {
        let (registry, resolver) = fixture();
        registry.register(1u64, minified());

        let view = resolver.get_mangled(&modal_module(), &mappers());
        let open = get(&view, "open").unwrap();
        let out = call(&open, &JsValue::Undefined, &mut vec![]).unwrap();
        assert_eq!(out, JsValue::from("opened"));
        assert_eq!(own_keys(&view), vec!["open", "close", "missing"]);
    }

    #[test]
    fn test_mangled_view_writes_through() {
        let (registry, resolver) = fixture();
        let exports = minified();
        registry.register(1u64, exports.clone());

        let view = resolver.get_mangled(&modal_module(), &mappers());
        let replacement = ObjectBuilder::new()
            .add_method("x", |_, _| Ok(JsValue::from("patched")))
            .build();
        let x = get(&replacement, "x").unwrap();
        set(&view, "close", x.clone()).unwrap();

        assert!(same_value(&get_v(&exports, "b").unwrap(), &x));
        assert!(same_value(&get(&view, "close").unwrap(), &x));
    }

    #[test]
    fn test_unmapped_names_are_frozen_undefined() {
        let (registry, resolver) = fixture();
        registry.register(1u64, minified());

        let view = resolver.get_mangled(&modal_module(), &mappers());
        assert_eq!(get(&view, "missing").unwrap(), JsValue::Undefined);
        assert!(set(&view, "missing", JsValue::from(1)).is_err());
    }

    #[test]
    fn test_mangled_view_exposes_module_hidden() {
        let (registry, resolver) = fixture();
        let exports = minified();
        registry.register(1u64, exports.clone());

        let view = resolver.get_mangled(&modal_module(), &mappers());
        assert!(same_value(&get(&view, MANGLED_MODULE_KEY).unwrap(), &exports));
        assert!(!own_keys(&view).contains(&MANGLED_MODULE_KEY.to_string()));
    }

    #[test]
    fn test_mangled_view_of_missing_module_is_empty() {
        let (_, resolver) = fixture();
        let view = resolver.get_mangled(&modal_module(), &mappers());
        assert!(own_keys(&view).is_empty());
        assert_eq!(get(&view, MANGLED_MODULE_KEY).unwrap(), JsValue::Undefined);
    }

    #[test]
    fn test_each_export_maps_once() {
        let (registry, resolver) = fixture();
        registry.register(1u64, minified());
        let greedy = vec![
            ("first".to_string(), filters::by_strings(&["openModal"])),
            ("second".to_string(), filters::by_strings(&["openModal"])),
        ];
        let view = resolver.get_mangled(&modal_module(), &greedy);
        assert!(get(&view, "first").unwrap().is_callable());
        assert_eq!(get(&view, "second").unwrap(), JsValue::Undefined);
    }
}

// ============================================================================
// Bulk queries
// ============================================================================

mod bulk_tests {
    use super::*;

    #[test]
    fn test_bulk_results_follow_query_order() {
        let (registry, resolver) = fixture();
        let exports = minified();
        registry.register(1u64, exports.clone());
        registry.register(2u64, ObjectBuilder::new().add_property("c", JsValue::from("v2")).build_value());

        let results = resolver
            .get_bulk(&[
                BulkQuery::new(filters::by_keys(&["nope"])),
                BulkQuery::new(modal_module()).all(),
                BulkQuery::new(modal_module()),
                BulkQuery::new(modal_module()).map(mappers()),
            ])
            .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0], JsValue::Undefined);
        assert_eq!(get_v(&results[1], "length").unwrap(), JsValue::from(2));
        assert!(same_value(&results[2], &exports));
        assert!(get_v(&results[3], "open").unwrap().is_callable());
    }

    #[test]
    fn test_bulk_fatal_miss_fails_the_call() {
        let (registry, resolver) = fixture();
        registry.register(1u64, minified());

        for query in vec![
            BulkQuery::new(filters::by_keys(&["nope"])).fatal(),
            BulkQuery::new(filters::by_keys(&["nope"])).fatal().all(),
            BulkQuery::new(filters::by_keys(&["nope"])).fatal().map(mappers()),
        ] {
            let err = resolver
                .get_bulk(&[BulkQuery::new(modal_module()), query])
                .unwrap_err();
            assert!(matches!(err, ShimError::ModuleSearchFailed));
        }
    }

    #[test]
    fn test_bulk_non_fatal_misses() {
        let (_, resolver) = fixture();
        let results = resolver
            .get_bulk(&[
                BulkQuery::new(modal_module()).all(),
                BulkQuery::new(modal_module()).map(mappers()),
            ])
            .unwrap();
        assert_eq!(get_v(&results[0], "length").unwrap(), JsValue::from(0));
        assert!(own_keys(results[1].as_object().unwrap()).is_empty());
    }

    #[test]
    fn test_bulk_keyed() {
        let (registry, resolver) = fixture();
        registry.register(1u64, minified());
        let results = resolver
            .get_bulk_keyed(&[
                ("modal".to_string(), BulkQuery::new(modal_module())),
                ("none".to_string(), BulkQuery::new(filters::by_keys(&["nope"]))),
            ])
            .unwrap();
        let names: Vec<&String> = results.keys().collect();
        assert_eq!(names, vec!["modal", "none"]);
        assert!(results["modal"].is_object_like());
        assert_eq!(results["none"], JsValue::Undefined);
    }
}
