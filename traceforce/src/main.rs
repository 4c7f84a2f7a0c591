use tfplug::ServerConfig;
use traceforce::TraceforceProvider;
use tracing_subscriber::EnvFilter;

/// Terraform's TF_LOG names; JSON is trace output in Terraform's own format
fn tf_log_level(value: &str) -> &'static str {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => "trace",
        "DEBUG" => "debug",
        "WARN" => "warn",
        "ERROR" => "error",
        "OFF" => "off",
        _ => "info",
    }
}

fn log_filter() -> EnvFilter {
    if let Ok(level) = std::env::var("TF_LOG") {
        return EnvFilter::new(tf_log_level(&level));
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the go-plugin handshake line
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tfplug::serve(TraceforceProvider::new(), ServerConfig::default()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terraform_levels_map_to_filters() {
        assert_eq!(tf_log_level("TRACE"), "trace");
        assert_eq!(tf_log_level("JSON"), "trace");
        assert_eq!(tf_log_level("debug"), "debug");
        assert_eq!(tf_log_level("WARN"), "warn");
        assert_eq!(tf_log_level("OFF"), "off");
    }

    #[test]
    fn unrecognised_levels_fall_back_to_info() {
        assert_eq!(tf_log_level("1"), "info");
        assert_eq!(tf_log_level(""), "info");
        assert_eq!(tf_log_level("traceforce=debug"), "info");
    }
}
