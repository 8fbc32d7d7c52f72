// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Grouping of the library by when each score was last opened.

use chrono::{DateTime, Utc};

use super::score::Score;

/// Library section a score falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecencyGroup {
    /// Never opened in the player
    Unopened,
    /// Opened less than a day ago
    Today,
    /// Opened one to three days ago
    WithinThreeDays,
    /// Opened four to seven days ago
    WithinWeek,
    /// Opened more than a week ago
    Older,
}

impl RecencyGroup {
    /// Display order of the sections
    pub const ORDER: [RecencyGroup; 5] = [
        RecencyGroup::Unopened,
        RecencyGroup::Today,
        RecencyGroup::WithinThreeDays,
        RecencyGroup::WithinWeek,
        RecencyGroup::Older,
    ];

    /// Classify a last-opened timestamp relative to `now`
    pub fn classify(last_opened: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(opened) = last_opened else {
            return RecencyGroup::Unopened;
        };
        match (now - opened).num_days() {
            d if d <= 0 => RecencyGroup::Today,
            1..=3 => RecencyGroup::WithinThreeDays,
            4..=7 => RecencyGroup::WithinWeek,
            _ => RecencyGroup::Older,
        }
    }

    /// Section heading
    pub fn label(&self) -> &'static str {
        match self {
            RecencyGroup::Unopened => "Not opened yet",
            RecencyGroup::Today => "Today",
            RecencyGroup::WithinThreeDays => "Last 3 days",
            RecencyGroup::WithinWeek => "Last week",
            RecencyGroup::Older => "Older",
        }
    }
}

/// Group scores into sections in display order, newest first within each.
///
/// Empty sections are omitted.
pub fn group_by_recency<'a>(
    scores: impl IntoIterator<Item = &'a Score>,
    now: DateTime<Utc>,
) -> Vec<(RecencyGroup, Vec<&'a Score>)> {
    let mut sections: Vec<(RecencyGroup, Vec<&'a Score>)> =
        RecencyGroup::ORDER.iter().map(|g| (*g, Vec::new())).collect();

    for score in scores {
        let group = RecencyGroup::classify(score.last_opened, now);
        if let Some((_, bucket)) = sections.iter_mut().find(|(g, _)| *g == group) {
            bucket.push(score);
        }
    }

    for (_, bucket) in sections.iter_mut() {
        // Stable sort: ties keep library order
        bucket.sort_by(|a, b| b.last_opened.cmp(&a.last_opened));
    }

    sections.retain(|(_, bucket)| !bucket.is_empty());
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScoreId;
    use chrono::Duration;

    fn score(name: &str, opened: Option<DateTime<Utc>>) -> Score {
        Score {
            id: ScoreId::new(),
            name: name.to_string(),
            pdf_parts: Vec::new(),
            mp3_parts: Vec::new(),
            full_mix: None,
            last_opened: opened,
        }
    }

    #[test]
    fn test_classify_boundaries() {
        let now = Utc::now();
        assert_eq!(RecencyGroup::classify(None, now), RecencyGroup::Unopened);
        assert_eq!(
            RecencyGroup::classify(Some(now - Duration::hours(5)), now),
            RecencyGroup::Today
        );
        assert_eq!(
            RecencyGroup::classify(Some(now - Duration::days(3)), now),
            RecencyGroup::WithinThreeDays
        );
        assert_eq!(
            RecencyGroup::classify(Some(now - Duration::days(7)), now),
            RecencyGroup::WithinWeek
        );
        assert_eq!(
            RecencyGroup::classify(Some(now - Duration::days(30)), now),
            RecencyGroup::Older
        );
    }

    #[test]
    fn test_group_order_and_sorting() {
        let now = Utc::now();
        let scores = vec![
            score("old", Some(now - Duration::days(40))),
            score("fresh", None),
            score("morning", Some(now - Duration::hours(6))),
            score("noon", Some(now - Duration::hours(1))),
        ];

        let groups = group_by_recency(&scores, now);
        let labels: Vec<RecencyGroup> = groups.iter().map(|(g, _)| *g).collect();
        assert_eq!(
            labels,
            vec![RecencyGroup::Unopened, RecencyGroup::Today, RecencyGroup::Older]
        );

        let today: Vec<&str> = groups[1].1.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(today, vec!["noon", "morning"]);
    }
}
