//! In-process calendar used by tests and `serve --backend memory`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use calagent_application::ports::calendar_backend::{BackendError, CalendarBackend};
use calagent_domain::{CalendarEvent, NewEvent, TimeRange};
use tokio::sync::Mutex;

/// Calendar held in memory.
///
/// Ids are `E1`, `E2`, ... in creation order and are never reused.
#[derive(Default)]
pub struct InMemoryCalendar {
    events: Mutex<BTreeMap<String, CalendarEvent>>,
    next_id: AtomicU64,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calendar pre-populated with `events`; ids continue after them.
    pub fn with_events(events: impl IntoIterator<Item = NewEvent>) -> Self {
        let calendar = Self::new();
        let mut stored = BTreeMap::new();
        for event in events {
            let id = calendar.allocate_id();
            stored.insert(id.clone(), CalendarEvent::from_new(id, event));
        }
        Self {
            events: Mutex::new(stored),
            next_id: calendar.next_id,
        }
    }

    fn allocate_id(&self) -> String {
        format!("E{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }
}

#[async_trait]
impl CalendarBackend for InMemoryCalendar {
    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent, BackendError> {
        let id = self.allocate_id();
        let created = CalendarEvent::from_new(id.clone(), event);
        self.events.lock().await.insert(id, created.clone());
        Ok(created)
    }

    async fn list_events(&self, range: TimeRange) -> Result<Vec<CalendarEvent>, BackendError> {
        let events = self.events.lock().await;
        let mut matching: Vec<CalendarEvent> = events
            .values()
            .filter(|e| range.overlaps(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| id_order(&a.id, &b.id)));
        Ok(matching)
    }

    async fn delete_event(&self, id: &str) -> Result<(), BackendError> {
        self.events
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }
}

// E2 sorts before E10
fn id_order(a: &str, b: &str) -> std::cmp::Ordering {
    let num = |s: &str| s.strip_prefix('E').and_then(|n| n.parse::<u64>().ok());
    match (num(a), num(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, hour, minute, 0).unwrap()
    }

    fn new_event(summary: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> NewEvent {
        NewEvent::new(summary, None, start, end).unwrap()
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let calendar = InMemoryCalendar::new();
        let a = calendar.create_event(new_event("a", at(9, 0), at(10, 0))).await.unwrap();
        let b = calendar.create_event(new_event("b", at(9, 0), at(10, 0))).await.unwrap();
        assert_eq!(a.id, "E1");
        assert_eq!(b.id, "E2");

        calendar.delete_event("E2").await.unwrap();
        let c = calendar.create_event(new_event("c", at(9, 0), at(10, 0))).await.unwrap();
        assert_eq!(c.id, "E3");
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let calendar = InMemoryCalendar::with_events([
            new_event("late", at(15, 0), at(16, 0)),
            new_event("early", at(8, 0), at(9, 0)),
            new_event("outside", at(20, 0), at(21, 0)),
        ]);

        let range = TimeRange::new(at(8, 30), at(18, 0)).unwrap();
        let events = calendar.list_events(range).await.unwrap();
        let names: Vec<_> = events.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_end_of_range_is_exclusive() {
        let calendar = InMemoryCalendar::with_events([new_event("at end", at(18, 0), at(19, 0))]);
        let range = TimeRange::new(at(8, 0), at(18, 0)).unwrap();
        assert!(calendar.list_events(range).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let calendar = InMemoryCalendar::new();
        assert_eq!(
            calendar.delete_event("E1").await,
            Err(BackendError::NotFound("E1".into()))
        );
    }

    #[test]
    fn test_id_order_is_numeric() {
        assert_eq!(id_order("E2", "E10"), std::cmp::Ordering::Less);
    }
}
