//! Format layer creation

use tracing_subscriber::{Layer, Registry, fmt};

use crate::config::{DisplayConfig, Format};

/// Apply the shared display options, then box the layer with or without timestamps.
macro_rules! finish_layer {
    ($layer:expr, $display:expr) => {{
        let layer = $layer
            .with_writer(std::io::stderr)
            .with_ansi($display.colors)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
            .with_thread_ids($display.thread_ids)
            .with_thread_names($display.thread_names);
        if $display.time {
            layer.boxed()
        } else {
            layer.without_time().boxed()
        }
    }};
}

pub(super) fn fmt_layer(
    format: Format,
    display: &DisplayConfig,
) -> Box<dyn Layer<Registry> + Send + Sync + 'static> {
    match format {
        Format::Pretty => finish_layer!(fmt::layer().pretty(), display),
        Format::Compact => finish_layer!(fmt::layer().compact(), display),
        Format::Json => finish_layer!(
            fmt::layer()
                .json()
                .with_current_span(true)
                .flatten_event(display.flatten),
            display
        ),
    }
}
