//! Per-tick notification accumulator.
//!
//! Phases that can fire in the same tick as a season rollover (season
//! change, economy shift, wage payment) append message fragments to a
//! [`TickDigest`] instead of publishing directly. The sequencer owns the
//! digest: with aggregation on it folds the fragments into one notification
//! at the end of the tick, otherwise it splits them into separate
//! notifications as soon as the phase that produced them finishes.

use vintner_types::{GameDate, Notification, NotificationCategory};

/// Source tag stamped on folded notifications.
pub const DIGEST_SOURCE: &str = "calendar";

/// One message produced by a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DigestFragment {
    /// Source tag of the producing phase.
    source: &'static str,
    /// Heading used when the fragment is delivered on its own.
    title: String,
    /// Message body.
    text: String,
    /// UI grouping used when the fragment is delivered on its own.
    category: NotificationCategory,
}

/// Message fragments collected during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickDigest {
    fragments: Vec<DigestFragment>,
}

impl TickDigest {
    /// An empty digest.
    pub const fn new() -> Self {
        Self {
            fragments: Vec::new(),
        }
    }

    /// Append a fragment.
    pub fn push(
        &mut self,
        source: &'static str,
        category: NotificationCategory,
        title: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.fragments.push(DigestFragment {
            source,
            title: title.into(),
            text: text.into(),
            category,
        });
    }

    /// Whether no phase contributed a message.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fold every fragment into a single notification headed by the new
    /// date. Returns `None` when the digest is empty.
    pub fn fold(self, date: GameDate, new_year: bool) -> Option<Notification> {
        if self.fragments.is_empty() {
            return None;
        }
        let title = if new_year {
            format!("Happy New Year: {} {}", date.season, date.year)
        } else {
            format!("{} has arrived", date.season)
        };
        let text = self
            .fragments
            .into_iter()
            .map(|f| f.text)
            .collect::<Vec<_>>()
            .join("\n");
        Some(Notification::new(
            text,
            DIGEST_SOURCE,
            title,
            NotificationCategory::Time,
        ))
    }

    /// Turn every fragment into its own notification.
    pub fn split(self) -> Vec<Notification> {
        self.fragments
            .into_iter()
            .map(|f| Notification::new(f.text, f.source, f.title, f.category))
            .collect()
    }
}
