use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cache::MemoryCache;
use crate::config::manager::ConfigManager;
use crate::container::error::ContainerError;
use crate::container::wiring::{ServiceContainer, WiringFacilities};
use crate::event::EventBus;
use crate::lifecycle::ModuleLifecycle;
use crate::registry::definition::{service_factory, ServiceApi, ServiceFactory};
use crate::scheduler::manager::SchedulerManager;

fn facilities() -> WiringFacilities {
    WiringFacilities {
        config: ConfigManager::new(),
        scheduler: SchedulerManager::new(),
        cache: Arc::new(MemoryCache::new(None)),
        event: Arc::new(EventBus::new()),
    }
}

fn noop_factory() -> ServiceFactory {
    service_factory(|_params| async { Ok(None) })
}

struct GreeterApi {
    greeting: String,
}

#[tokio::test]
async fn factories_run_exactly_once_per_service() {
    let facilities = facilities();
    let mut container = ServiceContainer::new();
    let lifecycle = ModuleLifecycle::new("m");
    let calls = Arc::new(AtomicUsize::new(0));

    let counted = calls.clone();
    let factory = service_factory(move |_params| {
        let counted = counted.clone();
        async move {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    });

    let services = vec![("only".to_string(), factory)];
    container
        .wire_module(&facilities, &lifecycle, "m", &[], &services)
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(container.is_wired("m", "only"));
}

#[tokio::test]
async fn duplicate_binding_is_rejected() {
    let facilities = facilities();
    let mut container = ServiceContainer::new();
    let lifecycle = ModuleLifecycle::new("m");

    container
        .wire_service(&facilities, &lifecycle, "m", "svc", &noop_factory())
        .await
        .unwrap();
    let result = container
        .wire_service(&facilities, &lifecycle, "m", "svc", &noop_factory())
        .await;
    match result {
        Err(e @ ContainerError::DuplicateService { .. }) => {
            assert_eq!(e.code(), "DuplicateService");
        }
        other => panic!("expected DuplicateService, got {:?}", other),
    }
}

#[tokio::test]
async fn wiring_after_seal_is_late() {
    let facilities = facilities();
    let mut container = ServiceContainer::new();
    let lifecycle = ModuleLifecycle::new("m");
    container.seal();

    let result = container
        .wire_service(&facilities, &lifecycle, "m", "svc", &noop_factory())
        .await;
    match result {
        Err(e @ ContainerError::LateServerRegister { .. }) => {
            assert_eq!(e.code(), "LateServerRegister");
        }
        other => panic!("expected LateServerRegister, got {:?}", other),
    }
}

#[tokio::test]
async fn factory_failure_is_fatal_for_wiring() {
    let facilities = facilities();
    let mut container = ServiceContainer::new();
    let lifecycle = ModuleLifecycle::new("m");

    let failing = service_factory(|_params| async { Err("out of sockets".into()) });
    let result = container
        .wire_service(&facilities, &lifecycle, "m", "svc", &failing)
        .await;
    match result {
        Err(ContainerError::ServiceFactoryFailure { context, message }) => {
            assert_eq!(context, "m:svc");
            assert!(message.contains("out of sockets"));
        }
        other => panic!("expected ServiceFactoryFailure, got {:?}", other),
    }
    assert!(!container.is_wired("m", "svc"));
}

#[tokio::test]
async fn params_carry_the_module_service_context() {
    let facilities = facilities();
    let mut container = ServiceContainer::new();
    let lifecycle = ModuleLifecycle::new("weather");
    let seen = Arc::new(std::sync::Mutex::new(String::new()));

    let observed = seen.clone();
    let factory = service_factory(move |params| {
        let observed = observed.clone();
        async move {
            *observed.lock().unwrap() = params.context.clone();
            assert_eq!(params.logger.context(), params.context);
            assert_eq!(params.scheduler.context(), params.context);
            assert_eq!(params.lifecycle.module(), "weather");
            Ok(None)
        }
    });
    container
        .wire_service(&facilities, &lifecycle, "weather", "station", &factory)
        .await
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), "weather:station");
}

#[tokio::test]
async fn earlier_services_are_visible_as_peers_and_later_ones_are_not() {
    let facilities = facilities();
    let mut container = ServiceContainer::new();
    let lifecycle = ModuleLifecycle::new("m");

    let greeter = service_factory(|_params| async {
        Ok(Some(Arc::new(GreeterApi {
            greeting: "hello".to_string(),
        }) as ServiceApi))
    });
    container
        .wire_service(&facilities, &lifecycle, "m", "greeter", &greeter)
        .await
        .unwrap();

    let consumer = service_factory(|params| async move {
        let api = params
            .peers
            .get::<GreeterApi>("m", "greeter")
            .expect("earlier service must be visible");
        assert_eq!(api.greeting, "hello");
        // Not yet wired: invisible.
        assert!(params.peers.api("m", "straggler").is_none());
        Ok(None)
    });
    container
        .wire_service(&facilities, &lifecycle, "m", "consumer", &consumer)
        .await
        .unwrap();
    container
        .wire_service(&facilities, &lifecycle, "m", "straggler", &noop_factory())
        .await
        .unwrap();

    assert_eq!(container.loaded_modules(), vec!["m".to_string()]);
    assert!(container.api("m", "greeter").is_some());
}

#[tokio::test]
async fn priority_services_wire_before_the_rest() {
    let facilities = facilities();
    let mut container = ServiceContainer::new();
    let lifecycle = ModuleLifecycle::new("m");
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    let tracking = |label: &'static str| {
        let order = order.clone();
        service_factory(move |_params| {
            let order = order.clone();
            async move {
                order.lock().unwrap().push(label);
                Ok(None)
            }
        })
    };

    let services = vec![
        ("first-declared".to_string(), tracking("first-declared")),
        ("prioritised".to_string(), tracking("prioritised")),
    ];
    container
        .wire_module(
            &facilities,
            &lifecycle,
            "m",
            &["prioritised".to_string()],
            &services,
        )
        .await
        .unwrap();
    assert_eq!(
        *order.lock().unwrap(),
        vec!["prioritised", "first-declared"]
    );
}

#[tokio::test]
async fn clear_resets_the_container() {
    let facilities = facilities();
    let mut container = ServiceContainer::new();
    let lifecycle = ModuleLifecycle::new("m");
    container
        .wire_service(&facilities, &lifecycle, "m", "svc", &noop_factory())
        .await
        .unwrap();
    container.seal();

    container.clear();
    assert!(!container.is_wired("m", "svc"));
    // Unsealed again: wiring works for the next bootstrap.
    container
        .wire_service(&facilities, &lifecycle, "m", "svc", &noop_factory())
        .await
        .unwrap();
}
