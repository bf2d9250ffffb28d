//! Tests for the legacy single-callback patch helper.

extern crate bdshim;

use std::cell::Cell;
use std::rc::Rc;

use bdshim::runner::ds::builder::ObjectBuilder;
use bdshim::runner::ds::error::JErrorType;
use bdshim::runner::ds::function_object::call;
use bdshim::runner::ds::operations::object::get;
use bdshim::runner::ds::operations::test_and_comparison::same_value;
use bdshim::runner::ds::value::{JsObjectType, JsValue};
use bdshim::runner::logger::{LogLevel, RecordingLogger};
use bdshim::runner::patcher::monkey_patch::{MonkeyPatchData, MonkeyPatchOptions, DEFAULT_CALLER_ID};
use bdshim::runner::patcher::{BoundPatcher, Patcher};

fn new_patcher() -> (Rc<Patcher>, Rc<RecordingLogger>) {
    let logger = Rc::new(RecordingLogger::new());
    (Rc::new(Patcher::new(logger.clone())), logger)
}

/// `greet(name)` returning `"Hi " + name`, counting its own invocations.
fn greeter(calls: &Rc<Cell<usize>>) -> JsObjectType {
    let calls = calls.clone();
    ObjectBuilder::new()
        .add_method("greet", move |_, args| {
            calls.set(calls.get() + 1);
            let name = args.first().cloned().unwrap_or(JsValue::Undefined);
            Ok(JsValue::from(format!("Hi {}", name)))
        })
        .build()
}

fn greet(o: &JsObjectType, name: &str) -> JsValue {
    let f = get(o, "greet").unwrap();
    call(&f, &JsValue::Object(o.clone()), &mut vec![JsValue::from(name)]).unwrap()
}

// ============================================================================
// Phases
// ============================================================================

mod phase_tests {
    use super::*;

    #[test]
    fn test_before_rewrites_arguments() {
        let (patcher, _) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);

        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::before(|data| {
                data.method_arguments[0] = JsValue::from("Ann");
                Ok(JsValue::Undefined)
            }),
        );
        assert_eq!(greet(&target, "bob"), JsValue::from("Hi Ann"));
    }

    #[test]
    fn test_after_return_value_sources() {
        let (patcher, _) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);

        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::after(|data| {
                data.return_value = JsValue::from(format!("{}?", data.return_value));
                Ok(JsValue::Undefined)
            }),
        );
        assert_eq!(greet(&target, "bob"), JsValue::from("Hi bob?"));

        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::after(|_| Ok(JsValue::from("explicit"))),
        );
        assert_eq!(greet(&target, "bob"), JsValue::from("explicit"));
    }

    #[test]
    fn test_instead_calls_original_on_demand() {
        let (patcher, _) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);

        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::instead(|data| {
                if data.method_arguments[0].to_string() == "skip" {
                    return Ok(JsValue::from("skipped"));
                }
                data.call_original_method()?;
                Ok(JsValue::Undefined)
            }),
        );
        assert_eq!(greet(&target, "skip"), JsValue::from("skipped"));
        assert_eq!(calls.get(), 0);
        assert_eq!(greet(&target, "amy"), JsValue::from("Hi amy"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_original_method_is_unpatched_function() {
        let (patcher, _) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);
        let original = get(&target, "greet").unwrap();

        patcher.before("Other", &target, "greet", |_, _| Ok(()));
        let seen = Rc::new(Cell::new(false));
        let s = seen.clone();
        let expected = original.clone();
        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::before(move |data| {
                s.set(same_value(&data.original_method, &expected));
                Ok(JsValue::Undefined)
            }),
        );
        greet(&target, "x");
        assert!(seen.get());
    }

    #[test]
    fn test_before_wins_over_other_callbacks() {
        let (patcher, _) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);
        let fired = Rc::new(Cell::new(0));

        let f = fired.clone();
        let mut options = MonkeyPatchOptions::before(move |_| {
            f.set(f.get() + 1);
            Ok(JsValue::Undefined)
        });
        options.after = Some(Rc::new(
            |_: &mut MonkeyPatchData| -> Result<JsValue, JErrorType> { Ok(JsValue::from("after")) },
        ));
        options.instead = Some(Rc::new(
            |_: &mut MonkeyPatchData| -> Result<JsValue, JErrorType> { Ok(JsValue::from("instead")) },
        ));

        patcher.monkey_patch(&target, "greet", options);
        assert_eq!(greet(&target, "bob"), JsValue::from("Hi bob"));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_each_call_gets_fresh_data() {
        let (patcher, _) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);

        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::after(|data| {
                assert_eq!(data.method_arguments.len(), 1);
                data.method_arguments.push(JsValue::Null);
                Ok(JsValue::Undefined)
            }),
        );
        greet(&target, "a");
        greet(&target, "b");
        assert_eq!(calls.get(), 2);
    }
}

// ============================================================================
// Lifetime and ownership
// ============================================================================

mod lifetime_tests {
    use super::*;

    #[test]
    fn test_once_removes_itself() {
        let (patcher, _) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);
        let original = get(&target, "greet").unwrap();

        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::after(|_| Ok(JsValue::from("once"))).once(),
        );
        assert_eq!(greet(&target, "bob"), JsValue::from("once"));
        assert_eq!(greet(&target, "bob"), JsValue::from("Hi bob"));
        assert!(same_value(&get(&target, "greet").unwrap(), &original));
    }

    #[test]
    fn test_cancel_patch_from_callback() {
        let (patcher, _) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);
        let fired = Rc::new(Cell::new(0));

        let f = fired.clone();
        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::before(move |data| {
                f.set(f.get() + 1);
                if f.get() == 2 {
                    data.cancel_patch();
                }
                Ok(JsValue::Undefined)
            }),
        );
        for _ in 0..4 {
            greet(&target, "bob");
        }
        assert_eq!(fired.get(), 2);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_default_and_custom_caller_ids() {
        let (patcher, _) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);

        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::before(|_| Ok(JsValue::Undefined)),
        );
        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::before(|_| Ok(JsValue::Undefined)).caller_id("Legacy"),
        );
        assert_eq!(patcher.get_patches_by_caller(DEFAULT_CALLER_ID).len(), 1);
        assert_eq!(patcher.get_patches_by_caller("Legacy").len(), 1);
    }

    #[test]
    fn test_bound_patcher_uses_its_label() {
        let (patcher, _) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);
        let bound = BoundPatcher::new("Plugin", patcher.clone());

        bound.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::after(|_| Ok(JsValue::Undefined)).caller_id("Ignored"),
        );
        assert_eq!(bound.get_patches().len(), 1);
        assert!(patcher.get_patches_by_caller("Ignored").is_empty());

        bound.unpatch_all();
        assert!(!patcher.is_patched(&target, "greet"));
    }
}

// ============================================================================
// Failures
// ============================================================================

mod failure_tests {
    use super::*;

    #[test]
    fn test_missing_callback_is_refused() {
        let (patcher, logger) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);

        let unpatch = patcher.monkey_patch(&target, "greet", MonkeyPatchOptions::default());
        assert!(unpatch.is_none());
        assert!(!patcher.is_patched(&target, "greet"));
        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Error);
        assert_eq!(entries[0].scope, "BdApi");
        assert_eq!(entries[0].message, "Must provide one of: after, before, instead");
    }

    #[test]
    fn test_failing_callback_is_logged_with_caller_scope() {
        let (patcher, logger) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);

        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::after(|_| Err(JErrorType::Error("bad plugin".to_string())))
                .caller_id("Broken"),
        );
        assert_eq!(greet(&target, "bob"), JsValue::from("Hi bob"));

        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].scope, "Broken:monkeyPatch");
        assert_eq!(entries[0].message, "Error in the after of greet");
        assert_eq!(entries[0].error, Some(JErrorType::Error("bad plugin".to_string())));
    }

    #[test]
    fn test_failing_instead_yields_undefined() {
        let (patcher, logger) = new_patcher();
        let calls = Rc::new(Cell::new(0));
        let target = greeter(&calls);

        patcher.monkey_patch(
            &target,
            "greet",
            MonkeyPatchOptions::instead(|_| Err(JErrorType::TypeError("x".to_string()))),
        );
        assert_eq!(greet(&target, "bob"), JsValue::Undefined);
        assert_eq!(calls.get(), 0);
        assert_eq!(logger.count(LogLevel::Error), 1);
    }
}
