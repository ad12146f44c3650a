use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::api::HistoryEntry;

/// Past uploads made on one calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryGroup {
    pub date: NaiveDate,
    /// Newest first
    pub entries: Vec<HistoryEntry>,
}

/// Group uploads by their calendar date in `tz`, newest day first.
///
/// Entries without a timestamp cannot be placed on a day and are left out.
pub fn group_by_date<Tz: TimeZone>(entries: Vec<HistoryEntry>, tz: &Tz) -> Vec<HistoryGroup> {
    let total = entries.len();
    let mut dated: Vec<(DateTime<Utc>, HistoryEntry)> = entries
        .into_iter()
        .filter_map(|entry| entry.created_at.map(|at| (at, entry)))
        .collect();
    if dated.len() < total {
        log::warn!("Skipping {} history record(s) without a date", total - dated.len());
    }
    dated.sort_by(|a, b| b.0.cmp(&a.0));

    let mut groups: Vec<HistoryGroup> = Vec::new();
    for (created_at, entry) in dated {
        let date = created_at.with_timezone(tz).date_naive();
        match groups.last_mut() {
            Some(group) if group.date == date => group.entries.push(entry),
            _ => groups.push(HistoryGroup {
                date,
                entries: vec![entry],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use fieldcap_forms::FieldValues;

    fn entry(id: &str, created_at: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.into(),
            form_name: "골조검측".into(),
            data: FieldValues::new(),
            thumbnails: Vec::new(),
            image_urls: Vec::new(),
            created_at: Some(created_at.parse::<DateTime<Utc>>().unwrap()),
        }
    }

    fn ids(group: &HistoryGroup) -> Vec<&str> {
        group.entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_groups_newest_first() {
        let entries = vec![
            entry("a", "2026-10-18T09:00:00Z"),
            entry("b", "2026-10-19T08:00:00Z"),
            entry("c", "2026-10-19T10:00:00Z"),
        ];
        let groups = group_by_date(entries, &Utc);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(ids(&groups[0]), vec!["c", "b"]);
        assert_eq!(ids(&groups[1]), vec!["a"]);
    }

    #[test]
    fn test_grouping_uses_the_given_time_zone() {
        // 16:30 UTC is already the next day in Seoul
        let entries = vec![
            entry("late", "2026-10-18T16:30:00Z"),
            entry("early", "2026-10-18T01:00:00Z"),
        ];
        let seoul = FixedOffset::east_opt(9 * 3600).unwrap();

        let utc_groups = group_by_date(entries.clone(), &Utc);
        assert_eq!(utc_groups.len(), 1);

        let local_groups = group_by_date(entries, &seoul);
        assert_eq!(local_groups.len(), 2);
        assert_eq!(local_groups[0].date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    }

    #[test]
    fn test_undated_entries_are_left_out() {
        let undated = HistoryEntry {
            created_at: None,
            ..entry("lost", "2026-10-19T00:00:00Z")
        };
        let entries = vec![undated, entry("kept", "2026-10-19T08:00:00Z")];
        let groups = group_by_date(entries, &Utc);

        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec!["kept"]);
    }

    #[test]
    fn test_empty_history() {
        assert!(group_by_date(Vec::new(), &Utc).is_empty());
    }
}
