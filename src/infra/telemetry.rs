use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::preview;
use crate::cache;
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            cache::METRIC_CACHE_HIT,
            Unit::Count,
            "Stylesheet lookups answered from the generation cache."
        );
        describe_counter!(
            cache::METRIC_CACHE_MISS,
            Unit::Count,
            "Stylesheet lookups that required a fresh render."
        );
        describe_counter!(
            cache::METRIC_CACHE_EVICT,
            Unit::Count,
            "Cached stylesheets evicted due to capacity."
        );
        describe_counter!(
            cache::METRIC_CACHE_EXPIRED,
            Unit::Count,
            "Cached stylesheets dropped after their lifetime elapsed."
        );
        describe_counter!(
            cache::METRIC_CACHE_INVALIDATE,
            Unit::Count,
            "Cache flushes caused by settings writes, labelled by event."
        );
        describe_histogram!(
            cache::METRIC_GENERATE_MS,
            Unit::Milliseconds,
            "Stylesheet render latency in milliseconds."
        );
        describe_counter!(
            preview::METRIC_PREVIEW_DELIVERED,
            Unit::Count,
            "Preview requests that delivered freshly merged CSS."
        );
        describe_counter!(
            preview::METRIC_PREVIEW_SUPERSEDED,
            Unit::Count,
            "Preview requests discarded because a newer one exists."
        );
        describe_counter!(
            preview::METRIC_PREVIEW_FALLBACK,
            Unit::Count,
            "Preview requests answered with an earlier stylesheet."
        );
        describe_gauge!(
            preview::METRIC_PREVIEW_SESSIONS,
            Unit::Count,
            "Preview sessions currently tracked."
        );
    });
}
