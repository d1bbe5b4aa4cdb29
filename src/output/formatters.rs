use std::time::Duration;

use crate::cli::OutputFormat;
use crate::transcribe::processor::TranscriptLine;

/// Format a cue start as `[HH:MM:SS]`, dropping the milliseconds
pub fn format_cue_timestamp(start: Duration) -> String {
    let total_seconds = start.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("[{:02}:{:02}:{:02}]", hours, minutes, seconds)
}

/// All kept lines joined with single spaces
pub fn format_as_plain(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One line per kept cue line, prefixed with its cue start
pub fn format_as_timestamped(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(|line| format!("{} {}", format_cue_timestamp(line.start), line.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the final transcript text for the requested format
pub fn render_transcript(format: OutputFormat, lines: &[TranscriptLine], raw_vtt: &str) -> String {
    match format {
        OutputFormat::Plain => format_as_plain(lines),
        OutputFormat::Timestamped => format_as_timestamped(lines),
        OutputFormat::Raw => raw_vtt.trim().to_string(),
    }
}
