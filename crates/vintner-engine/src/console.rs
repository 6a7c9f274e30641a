//! Console command parsing.
//!
//! Each input line is one trigger. Time only moves on an explicit `tick`.

/// Upper bound on `tick N` so a typo cannot run for hours.
pub const MAX_BATCH_TICKS: u32 = 520;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Advance this many weeks, one tick at a time.
    Tick(u32),
    /// Log the current date, economy, and counters.
    Status,
    /// Queue a blocking prompt that the next tick must resolve.
    Prompt(String),
    /// Toggle store write failures.
    FailWrites(bool),
    /// Leave the loop.
    Quit,
    /// Anything else.
    Unknown(String),
}

impl Command {
    /// Parse one console line. An empty line means `tick`.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        match word.to_ascii_lowercase().as_str() {
            "" | "tick" | "t" => parse_tick_count(rest)
                .map_or_else(|| Self::Unknown(line.to_owned()), Self::Tick),
            "status" | "s" => Self::Status,
            "prompt" if !rest.is_empty() => Self::Prompt(rest.to_owned()),
            "fail-writes" => match rest {
                "on" => Self::FailWrites(true),
                "off" => Self::FailWrites(false),
                _ => Self::Unknown(line.to_owned()),
            },
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(line.to_owned()),
        }
    }
}

/// Parse the optional count after `tick`. Missing means one.
fn parse_tick_count(rest: &str) -> Option<u32> {
    if rest.is_empty() {
        return Some(1);
    }
    rest.parse::<u32>()
        .ok()
        .filter(|n| (1..=MAX_BATCH_TICKS).contains(n))
}
