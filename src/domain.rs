//! Core records served by the TOP manager API.
//!
//! A [`Sitzung`] is a single meeting. A [`Top`] (Tagesordnungspunkt) is one
//! agenda item of a Sitzung; its `weight` determines the agenda order.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display format for meeting dates, e.g. `01.03.2024 18:30`.
const DATUM_FORMAT: &str = "%d.%m.%Y %H:%M";

/// A meeting as returned by `GET /api/topmanager/sitzungen/`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Sitzung {
    pub name: String,
    pub datum: NaiveDateTime,
    pub id: Uuid,
}

impl Sitzung {
    pub fn display_datum(&self) -> String {
        self.datum.format(DATUM_FORMAT).to_string()
    }

    /// Single-line label used in list views.
    pub fn list_label(&self) -> String {
        format!("{} {}", self.name, self.display_datum())
    }
}

/// An agenda item as returned by `GET /api/topmanager/sitzung/{id}/tops/`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Top {
    pub name: String,
    pub id: Uuid,
    pub inhalt: String,
    pub weight: i32,
}

impl Top {
    /// First line of `inhalt`, cut to `max_chars` characters.
    ///
    /// A trailing `…` marks a cut. Multi-line content always counts as cut.
    pub fn summary(&self, max_chars: usize) -> String {
        let mut lines = self.inhalt.lines();
        let first = lines.next().unwrap_or("").trim_end();
        let more_lines = lines.next().is_some();

        let char_count = first.chars().count();
        if char_count <= max_chars && !more_lines {
            return first.to_string();
        }

        // The `…` counts towards `max_chars`.
        let keep = char_count.min(max_chars.saturating_sub(1));
        let mut out: String = first.chars().take(keep).collect();
        out.push('…');
        out
    }
}

/// Order TOPs by ascending weight. Equal weights keep server order.
pub fn sort_tops(tops: &mut [Top]) {
    tops.sort_by_key(|t| t.weight);
}
