//! The demo application served by the bare `weft` binary: a heartbeat
//! service that exercises configuration, lifecycle and scheduling.

use std::time::Duration;

use weft_core::registry::error::RegistryError;
use weft_core::{ApplicationBuilder, ApplicationDefinition, ConfigSpec};

pub fn demo_application() -> Result<ApplicationDefinition, RegistryError> {
    ApplicationBuilder::new("weft-demo")
        .config(
            "GREETING",
            ConfigSpec::string()
                .with_default("hello from weft")
                .describe("Message logged when the application becomes ready"),
        )
        .config(
            "BEAT_SECONDS",
            ConfigSpec::number()
                .with_default(30_i64)
                .describe("Heartbeat period in seconds"),
        )
        .service_fn("heartbeat", |params| async move {
            let config = params.config.clone();
            let logger = params.logger.clone();
            let scheduler = params.scheduler.clone();

            params.lifecycle.on_ready(None, move || async move {
                let greeting = config
                    .get("GREETING")?
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                logger.info(&greeting);

                let period = config
                    .get("BEAT_SECONDS")?
                    .as_number()
                    .filter(|n| n.is_finite() && *n > 0.0)
                    .unwrap_or(30.0);
                let beat_logger = logger.clone();
                scheduler.interval(Duration::from_secs_f64(period), move || {
                    let beat_logger = beat_logger.clone();
                    async move {
                        beat_logger.debug("heartbeat");
                        Ok(())
                    }
                });
                Ok(())
            });
            Ok(None)
        })
        .build()
}
