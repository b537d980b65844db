use tracing_subscriber::EnvFilter;

/// Initialise the tracing subscriber for the storefront shell.
///
/// The default level is `info`; passing `debug = true` (the settings file
/// flag) raises it to `debug` and additionally lets `RUST_LOG` take over
/// entirely. Without the flag `RUST_LOG` is ignored so a stray environment
/// variable cannot flood the output.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
