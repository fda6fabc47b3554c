use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::error::ConfigError;
use crate::config::manager::ConfigManager;
use crate::config::schema::{ConfigSpec, ConfigValue};

fn manager_with_boilerplate() -> ConfigManager {
    let manager = ConfigManager::new();
    manager
        .load_project(
            "boilerplate",
            vec![
                ("CONFIG".to_string(), ConfigSpec::string()),
                (
                    "LOG_LEVEL".to_string(),
                    ConfigSpec::string().with_default("info"),
                ),
            ],
        )
        .unwrap();
    manager
        .load_project(
            "test",
            vec![("CONFIG".to_string(), ConfigSpec::string())],
        )
        .unwrap();
    manager
}

#[test]
fn defaults_seed_at_registration() {
    let manager = manager_with_boilerplate();
    assert_eq!(
        manager.get("boilerplate", "LOG_LEVEL").unwrap(),
        ConfigValue::String("info".into())
    );
    // No default declared, no value yet.
    assert!(matches!(
        manager.get("boilerplate", "CONFIG"),
        Err(ConfigError::Unset { .. })
    ));
}

#[test]
fn set_then_get_returns_the_new_value() {
    let manager = manager_with_boilerplate();
    manager.set("boilerplate", "LOG_LEVEL", "debug").unwrap();
    assert_eq!(
        manager.get("boilerplate", "LOG_LEVEL").unwrap(),
        ConfigValue::String("debug".into())
    );
    // Case-insensitive key resolution on both paths.
    manager.set("boilerplate", "log_level", "trace").unwrap();
    assert_eq!(
        manager.get("boilerplate", "LOG_level").unwrap(),
        ConfigValue::String("trace".into())
    );
}

#[test]
fn set_rejects_unknown_targets() {
    let manager = manager_with_boilerplate();
    assert!(matches!(
        manager.set("boilerplate", "NOPE", "x"),
        Err(ConfigError::UnknownKey { .. })
    ));
    assert!(matches!(
        manager.set("ghost", "CONFIG", "x"),
        Err(ConfigError::UnknownModule(_))
    ));
}

#[test]
fn whole_module_assignment_is_rejected() {
    let manager = manager_with_boilerplate();
    assert!(matches!(
        manager.set("boilerplate", "", "anything"),
        Err(ConfigError::NonLeafWrite { .. })
    ));
}

#[test]
fn set_type_checks_against_the_spec() {
    let manager = ConfigManager::new();
    manager
        .load_project(
            "m",
            vec![("PORT".to_string(), ConfigSpec::number().with_default(80_i64))],
        )
        .unwrap();

    manager.set("m", "PORT", 8080_i64).unwrap();
    // Strings re-parse against the declared kind.
    manager.set("m", "PORT", "9090").unwrap();
    assert_eq!(manager.get("m", "PORT").unwrap(), ConfigValue::Number(9090.0));
    // Other kinds do not.
    assert!(matches!(
        manager.set("m", "PORT", true),
        Err(ConfigError::TypeMismatch { .. })
    ));
}

#[test]
fn watchers_fire_once_per_matching_set() {
    let manager = manager_with_boilerplate();
    let calls = Arc::new(AtomicUsize::new(0));

    let counted = calls.clone();
    manager.on_update(
        move |update| {
            assert_eq!(update.module, "boilerplate");
            assert_eq!(update.key, "CONFIG");
            assert_eq!(update.value, ConfigValue::String("debug".into()));
            counted.fetch_add(1, Ordering::SeqCst);
        },
        Some("boilerplate"),
        Some("config"),
    );

    // Case-insensitive key filter: "config" matches CONFIG.
    manager.set("boilerplate", "CONFIG", "debug").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Different key, same module: no call.
    manager.set("boilerplate", "LOG_LEVEL", "warn").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Same key, different module: no call.
    manager.set("test", "CONFIG", "other").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn watchers_fire_in_registration_order_after_the_write() {
    let manager = manager_with_boilerplate();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    for tag in ["first", "second"] {
        let order = order.clone();
        let probe = manager.clone();
        manager.on_update(
            move |_| {
                // The value is already written when watchers run.
                assert_eq!(
                    probe.get("boilerplate", "CONFIG").unwrap(),
                    ConfigValue::String("set".into())
                );
                order.lock().unwrap().push(tag);
            },
            Some("boilerplate"),
            Some("CONFIG"),
        );
    }

    manager.set("boilerplate", "CONFIG", "set").unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}

#[test]
fn removed_watchers_stay_silent() {
    let manager = manager_with_boilerplate();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let id = manager.on_update(
        move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        },
        None,
        None,
    );
    assert!(manager.remove_watcher(id));
    assert!(!manager.remove_watcher(id));
    manager.set("boilerplate", "CONFIG", "x").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn merge_overrides_and_skips_unknown_entries() {
    let manager = manager_with_boilerplate();
    let mut partial = HashMap::new();
    partial.insert("boilerplate".to_string(), {
        let mut entries = HashMap::new();
        entries.insert(
            "LOG_LEVEL".to_string(),
            ConfigValue::String("error".into()),
        );
        entries.insert("GHOST".to_string(), ConfigValue::String("x".into()));
        entries
    });
    partial.insert("nobody".to_string(), HashMap::new());

    manager.merge(&partial);
    assert_eq!(
        manager.get("boilerplate", "LOG_LEVEL").unwrap(),
        ConfigValue::String("error".into())
    );
}

#[test]
fn required_specs_without_values_fail_validation() {
    let manager = ConfigManager::new();
    manager
        .load_project(
            "lib",
            vec![(
                "REQUIRED_CONFIG".to_string(),
                ConfigSpec::string().required(),
            )],
        )
        .unwrap();

    match manager.validate_required() {
        Err(ConfigError::MissingRequired(missing)) => {
            assert_eq!(missing, vec!["lib.REQUIRED_CONFIG".to_string()]);
        }
        other => panic!("expected MissingRequired, got {:?}", other),
    }

    manager.set("lib", "REQUIRED_CONFIG", "supplied").unwrap();
    assert!(manager.validate_required().is_ok());
}

#[test]
fn schema_registration_after_sealing_is_late() {
    let manager = manager_with_boilerplate();
    manager.seal();
    let result = manager.load_project("late", Vec::<(String, ConfigSpec)>::new());
    match result {
        Err(e @ ConfigError::LateConfigure { .. }) => assert_eq!(e.code(), "LateConfigure"),
        other => panic!("expected LateConfigure, got {:?}", other),
    }
}

#[test]
fn duplicate_module_registration_is_rejected() {
    let manager = manager_with_boilerplate();
    assert!(matches!(
        manager.load_project("test", Vec::<(String, ConfigSpec)>::new()),
        Err(ConfigError::ModuleAlreadyRegistered(_))
    ));
}

#[test]
fn introspection_reports_modules_and_keys() {
    let manager = manager_with_boilerplate();
    assert_eq!(manager.keys(), vec!["boilerplate", "test"]);
    assert!(manager.has("boilerplate"));
    assert!(!manager.has("ghost"));
    assert_eq!(
        manager.entries("boilerplate").unwrap(),
        vec!["CONFIG".to_string(), "LOG_LEVEL".to_string()]
    );
}
