use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_DIRECTIVES: &str = "tab_summarizer=info,tower_http=info";

/// Installs the global subscriber. `RUST_LOG` wins over the built-in
/// directives when set.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
    }
}
