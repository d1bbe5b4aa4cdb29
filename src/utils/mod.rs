use url::Url;

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Hide proxy credentials before the proxy is logged or written out.
///
/// Proxies without credentials are returned unchanged.
pub fn redact_proxy(proxy: &str) -> String {
    let mut parsed = match Url::parse(proxy) {
        Ok(parsed) if !parsed.cannot_be_a_base() => parsed,
        // `host:port` or `user:pass@host` without a scheme
        _ if proxy.contains('@') => return "<redacted>".to_string(),
        _ => return proxy.to_string(),
    };

    let hidden = if parsed.password().is_some() {
        parsed.set_password(Some("***"))
    } else if !parsed.username().is_empty() {
        parsed.set_username("***")
    } else {
        return proxy.to_string();
    };
    if hidden.is_err() {
        return "<redacted>".to_string();
    }

    let mut redacted = parsed.to_string();
    if redacted.ends_with('/') && !proxy.ends_with('/') {
        redacted.pop();
    }
    redacted
}

/// Dataset file name used when only an output directory is given
pub fn default_dataset_filename() -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("transcripts_{}.jsonl", timestamp)
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!(
            "{} - required to download YouTube subtitles",
            yt_dlp_path
        ));
    }

    missing
}

/// Check if a command is available in PATH
pub async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
