use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::TranscriptError;

/// One timed block of a WebVTT file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start: Duration,
    pub end: Duration,
    pub lines: Vec<String>,
}

/// A parsed WebVTT file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    /// Value of the `Language:` header that YouTube tracks carry
    pub language: Option<String>,
    pub cues: Vec<Cue>,
}

/// A cue line that survived cleaning, with the start of the cue it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub start: Duration,
    pub text: String,
}

/// A markup pattern and what to replace it with
pub struct MarkupRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: &'static str,
}

impl MarkupRule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            replacement,
        }
    }
}

/// Applied in order. Tags go before entities so that an escaped `&lt;b&gt;`
/// survives as text, and `&amp;` goes last so it is decoded only once.
static MARKUP_RULES: LazyLock<Vec<MarkupRule>> = LazyLock::new(|| {
    vec![
        MarkupRule::new("karaoke timestamp", r"<\d{1,2}:\d{2}(?::\d{2})?\.\d{3}>", ""),
        MarkupRule::new("class span", r"</?c(?:\.[\w.-]+)?>", ""),
        MarkupRule::new("styling", r"</?[biu](?:\.[\w.-]+)?>", ""),
        MarkupRule::new("voice", r"</?v(?:[.\s][^>]*)?>", ""),
        MarkupRule::new("lang", r"</?lang(?:[.\s][^>]*)?>", ""),
        MarkupRule::new("ruby", r"</?(?:ruby|rt)>", ""),
        MarkupRule::new("any tag", r"<[^>]*>", ""),
        MarkupRule::new("override directive", r"\{\\[^}]*\}", ""),
        MarkupRule::new("nbsp", r"&nbsp;", " "),
        MarkupRule::new("lt", r"&lt;", "<"),
        MarkupRule::new("gt", r"&gt;", ">"),
        MarkupRule::new("quot", r"&quot;", "\""),
        MarkupRule::new("apos", r"&#0?39;|&apos;", "'"),
        MarkupRule::new("direction marks", r"&lrm;|&rlm;", ""),
        MarkupRule::new("amp", r"&amp;", "&"),
    ]
});

/// Parse a WebVTT timestamp (`HH:MM:SS.mmm` or `MM:SS.mmm`)
pub fn parse_timestamp(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (clock, millis) = raw.split_once(['.', ','])?;
    if millis.len() != 3 || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return None,
    };
    if minutes.len() != 2 || seconds.len() != 2 {
        return None;
    }
    let minutes = minutes.parse::<u64>().ok()?;
    let seconds = seconds.parse::<u64>().ok()?;
    if minutes > 59 || seconds > 59 {
        return None;
    }

    let millis = millis.parse::<u64>().ok()?;
    let total = hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)?
        .checked_mul(1000)?
        .checked_add(millis)?;
    Some(Duration::from_millis(total))
}

/// Parse WebVTT content into cues
pub fn parse_vtt(content: &str) -> Result<SubtitleDocument, TranscriptError> {
    let content = content.trim_start_matches('\u{feff}');
    // Only truly empty lines separate blocks; whitespace-only lines are cue text
    let lines: Vec<&str> = content.lines().collect();

    let mut index = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .ok_or_else(|| TranscriptError::parse("subtitle file is empty"))?;

    if !lines[index].trim_start().starts_with("WEBVTT") {
        return Err(TranscriptError::parse("missing WEBVTT header"));
    }

    let mut document = SubtitleDocument::default();

    // Header block: metadata lines until the first blank line
    index += 1;
    while index < lines.len() && !lines[index].is_empty() {
        if let Some(language) = lines[index].trim().strip_prefix("Language:") {
            let language = language.trim();
            if !language.is_empty() {
                document.language = Some(language.to_string());
            }
        }
        index += 1;
    }

    for block in lines[index..].split(|line| line.is_empty()) {
        if block.is_empty() {
            continue;
        }

        let first = block[0].trim();
        if first.starts_with("NOTE") || first.starts_with("STYLE") || first.starts_with("REGION") {
            continue;
        }

        // Optional cue identifier precedes the timing line
        let Some(timing_index) = block.iter().take(2).position(|line| line.contains("-->")) else {
            tracing::debug!("Skipping VTT block without timing line: {}", first);
            continue;
        };

        let (start, end) = parse_timing_line(block[timing_index])?;
        let mut cue = Cue {
            start,
            end,
            lines: Vec::new(),
        };

        // A timing line always ends the current cue, even without a blank line before it
        for line in &block[timing_index + 1..] {
            if line.contains("-->") {
                let (start, end) = parse_timing_line(line)?;
                let finished = std::mem::replace(
                    &mut cue,
                    Cue {
                        start,
                        end,
                        lines: Vec::new(),
                    },
                );
                document.cues.push(finished);
            } else {
                cue.lines.push(line.trim().to_string());
            }
        }

        document.cues.push(cue);
    }

    Ok(document)
}

fn parse_timing_line(line: &str) -> Result<(Duration, Duration), TranscriptError> {
    let malformed = || TranscriptError::parse(format!("malformed cue timing: {}", line.trim()));

    let (start, rest) = line.split_once("-->").ok_or_else(malformed)?;
    let end = rest.split_whitespace().next().ok_or_else(malformed)?;

    let start = parse_timestamp(start).ok_or_else(malformed)?;
    let end = parse_timestamp(end).ok_or_else(malformed)?;
    Ok((start, end))
}

/// Ordered markup stripping and overlap deduplication for cue text
pub struct TextCleaner {
    rules: &'static [MarkupRule],
}

impl TextCleaner {
    pub fn new() -> Self {
        Self {
            rules: MARKUP_RULES.as_slice(),
        }
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> {
        let rules: &'static [MarkupRule] = self.rules;
        rules.iter().map(|rule| rule.name)
    }

    /// Remove inline markup from one line and normalize its whitespace
    pub fn strip_markup(&self, line: &str) -> String {
        let stripped = self
            .rules
            .iter()
            .fold(line.to_string(), |text, rule| {
                rule.pattern.replace_all(&text, rule.replacement).into_owned()
            });

        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Clean every cue line and drop lines that repeat the previous kept line.
    ///
    /// Rolling auto-captions repeat the last line of one cue as the first line
    /// of the next, so only the immediately preceding line is compared.
    pub fn clean(&self, cues: &[Cue]) -> Vec<TranscriptLine> {
        let mut kept: Vec<TranscriptLine> = Vec::new();

        for cue in cues {
            for line in &cue.lines {
                let text = self.strip_markup(line);
                if text.is_empty() {
                    continue;
                }
                if kept.last().is_some_and(|previous| previous.text == text) {
                    continue;
                }
                kept.push(TranscriptLine {
                    start: cue.start,
                    text,
                });
            }
        }

        kept
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse and clean a WebVTT file, failing when nothing readable remains
pub fn process_vtt(content: &str) -> Result<(SubtitleDocument, Vec<TranscriptLine>), TranscriptError> {
    let document = parse_vtt(content)?;
    let lines = TextCleaner::new().clean(&document.cues);

    if lines.is_empty() {
        return Err(TranscriptError::parse("no transcript content found in subtitle file"));
    }

    tracing::debug!(
        cues = document.cues.len(),
        lines = lines.len(),
        "Processed subtitle file"
    );

    Ok((document, lines))
}
