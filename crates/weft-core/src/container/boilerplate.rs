//! The built-in `boilerplate` module.
//!
//! Wired before every other module, it declares the kernel's own config
//! schema and exports the shared facilities (configuration, logger, cache,
//! scheduler) as ordinary peer APIs so user services can reach them the same
//! way they reach each other.

use std::sync::Arc;

use crate::kernel::constants::{
    BOILERPLATE_MODULE, CACHE_PREFIX_KEY, CACHE_PROVIDER_KEY, CACHE_TTL_KEY, CONFIG_FILE_KEY,
    LOG_LEVEL_KEY,
};
use crate::config::schema::ConfigSpec;
use crate::logging::LogLevel;
use crate::registry::definition::{LibraryBuilder, LibraryDefinition, ServiceApi};
use crate::registry::error::RegistryError;

/// Build the boilerplate library definition.
pub fn boilerplate_library() -> Result<Arc<LibraryDefinition>, RegistryError> {
    LibraryBuilder::new(BOILERPLATE_MODULE)
        .config(
            LOG_LEVEL_KEY,
            ConfigSpec::string()
                .with_default("info")
                .one_of(["trace", "debug", "info", "warn", "error", "fatal"])
                .describe("Minimum severity that reaches the log output"),
        )
        .config(
            CONFIG_FILE_KEY,
            ConfigSpec::string()
                .describe("Single configuration file overriding the search path"),
        )
        .config(
            CACHE_PROVIDER_KEY,
            ConfigSpec::string()
                .with_default("memory")
                .one_of(["memory"])
                .describe("Cache backend"),
        )
        .config(
            CACHE_TTL_KEY,
            ConfigSpec::number()
                .with_default(86_400_i64)
                .describe("Default cache TTL in seconds"),
        )
        .config(
            CACHE_PREFIX_KEY,
            ConfigSpec::string().describe("Namespace prefix for cache keys"),
        )
        .priority_init(["configuration", "logger"])
        .service_fn("configuration", |params| async move {
            Ok(Some(Arc::new(params.config.clone()) as ServiceApi))
        })
        .service_fn("logger", |params| async move {
            let config = params.config.clone();
            let logger = params.logger.clone();

            // Apply LOG_LEVEL once values are resolved, then follow updates.
            let apply = move |raw: &str| match raw.parse::<LogLevel>() {
                Ok(level) => log::set_max_level(filter_for(level)),
                Err(e) => log::warn!("ignoring LOG_LEVEL update: {}", e),
            };
            let apply_on_update = apply.clone();
            params.config.on_update(
                move |update| {
                    if let Some(raw) = update.value.as_str() {
                        apply_on_update(raw);
                    }
                },
                Some(BOILERPLATE_MODULE),
                Some(LOG_LEVEL_KEY),
            );
            params.lifecycle.on_post_config(None, move || async move {
                if let Ok(value) = config.get(LOG_LEVEL_KEY) {
                    if let Some(raw) = value.as_str() {
                        apply(raw);
                    }
                }
                Ok(())
            });

            Ok(Some(Arc::new(logger) as ServiceApi))
        })
        .service_fn("cache", |params| async move {
            let config = params.config.clone();
            params.lifecycle.on_post_config(None, move || async move {
                if let Ok(value) = config.get(CACHE_PROVIDER_KEY) {
                    if let Some(name) = value.as_str() {
                        if name != "memory" {
                            log::warn!(
                                "cache provider '{}' is not built in; the memory provider stays active",
                                name
                            );
                        }
                    }
                }
                Ok(())
            });
            Ok(Some(Arc::new(params.cache.clone()) as ServiceApi))
        })
        .service_fn("scheduler", |params| async move {
            Ok(Some(Arc::new(params.scheduler.clone()) as ServiceApi))
        })
        .build()
}

fn filter_for(level: LogLevel) -> log::LevelFilter {
    match level {
        LogLevel::Trace => log::LevelFilter::Trace,
        LogLevel::Debug => log::LevelFilter::Debug,
        LogLevel::Info => log::LevelFilter::Info,
        LogLevel::Warn => log::LevelFilter::Warn,
        LogLevel::Error | LogLevel::Fatal => log::LevelFilter::Error,
    }
}
