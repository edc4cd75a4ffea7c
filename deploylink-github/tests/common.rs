use std::sync::OnceLock;

use deploylink_common::observability::{LogConfig, LogFormat, init_logging};

static INIT: OnceLock<()> = OnceLock::new();

pub fn init_test_tracing() {
    INIT.get_or_init(|| {
        let config = LogConfig {
            app_name: "deploylink-tests",
            format: if std::env::var("DEPLOYLINK_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".into(),
            ..LogConfig::default()
        };

        let _ = init_logging(config);
    });
}
