use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use crate::session::clock::{Clock, SystemClock};

/// Menu tag a session lands in when it is created implicitly by a context
/// write rather than an explicit `set_state`.
pub const MAIN_MENU: &str = "main";

const DEFAULT_TIMEOUT_MINS: i64 = 30;

/// Snapshot of one user's conversation position: where they are in the menu
/// graph and whatever per-turn side data the message handler has stashed.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationState {
    pub current_menu: String,
    pub context: HashMap<String, Value>,
    pub last_activity: DateTime<Utc>,
}

/// Process-wide conversation store, one live session per owner key.
///
/// Menu tags are opaque to the store; the message handler defines the menu
/// graph and drives every transition through [`SessionStore::set_state`]. The
/// store's only own transition is expiry back to "no session".
///
/// Sessions expire on a sliding window: every successful read or write of a
/// live entry refreshes `last_activity`. Expired entries are evicted lazily
/// on read and in bulk by [`super::SessionSweeper`]; callers cannot
/// distinguish "expired" from "never existed" and must treat both as the
/// start of a fresh session.
///
/// Backed by a sharded concurrent map, so read-modify-write sequences are
/// atomic per key and traffic on different keys does not contend.
pub struct SessionStore {
    entries: DashMap<String, ConversationState>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self::with_clock(timeout, Arc::new(SystemClock))
    }

    pub fn with_clock(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { entries: DashMap::new(), timeout, clock }
    }

    /// Returns the live state for `key`, refreshing its activity window.
    /// A state past the inactivity window is evicted here as a side effect
    /// and reported as absent.
    pub fn get_state(&self, key: &str) -> Option<ConversationState> {
        let now = self.clock.now();
        self.evict_if_expired(key, now);
        let mut entry = self.entries.get_mut(key)?;
        entry.last_activity = now;
        Some(entry.clone())
    }

    /// Moves `key` into `menu`. Passing `None` for `context` keeps whatever
    /// context the live session already carried; passing a map (even an
    /// empty one) replaces the context wholesale.
    pub fn set_state(&self, key: &str, menu: &str, context: Option<HashMap<String, Value>>) {
        let now = self.clock.now();
        self.evict_if_expired(key, now);
        match self.entries.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut();
                state.current_menu = menu.to_owned();
                if let Some(context) = context {
                    state.context = context;
                }
                state.last_activity = now;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ConversationState {
                    current_menu: menu.to_owned(),
                    context: context.unwrap_or_default(),
                    last_activity: now,
                });
            }
        }
    }

    /// Unconditional removal, used for explicit session resets ("cancel",
    /// "back to main menu").
    pub fn clear_state(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Merges `field: value` into the live session's context, creating a
    /// fresh session in the main menu when none exists.
    pub fn set_context(&self, key: &str, field: &str, value: Value) {
        let now = self.clock.now();
        self.evict_if_expired(key, now);
        let mut entry = self.entries.entry(key.to_owned()).or_insert_with(|| ConversationState {
            current_menu: MAIN_MENU.to_owned(),
            context: HashMap::new(),
            last_activity: now,
        });
        entry.context.insert(field.to_owned(), value);
        entry.last_activity = now;
    }

    pub fn get_context(&self, key: &str, field: &str) -> Option<Value> {
        let now = self.clock.now();
        self.evict_if_expired(key, now);
        let mut entry = self.entries.get_mut(key)?;
        entry.last_activity = now;
        entry.context.get(field).cloned()
    }

    /// Full context snapshot; an empty map (not an error) when no live
    /// session exists.
    pub fn get_all_context(&self, key: &str) -> HashMap<String, Value> {
        let now = self.clock.now();
        self.evict_if_expired(key, now);
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.last_activity = now;
                entry.context.clone()
            }
            None => HashMap::new(),
        }
    }

    /// True iff a live session exists and sits in `menu`.
    pub fn is_in_menu(&self, key: &str, menu: &str) -> bool {
        self.get_state(key).is_some_and(|state| state.current_menu == menu)
    }

    /// True iff any live session exists for `key`.
    pub fn is_in_menu_state(&self, key: &str) -> bool {
        self.get_state(key).is_some()
    }

    /// Removes every entry older than the inactivity window and returns how
    /// many were evicted. Holds each shard lock only long enough to drop the
    /// stale entries in that shard.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        // Counted inside the closure: writers may insert concurrently, so a
        // before/after length difference is not a removal count.
        let mut evicted = 0;
        self.entries.retain(|_, state| {
            let stale = self.is_expired(state, now);
            if stale {
                evicted += 1;
            }
            !stale
        });
        if evicted > 0 {
            debug!(
                event_name = "session.store.swept",
                evicted,
                live = self.entries.len(),
                "evicted stale conversation sessions"
            );
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, state: &ConversationState, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(state.last_activity) > self.timeout
    }

    fn evict_if_expired(&self, key: &str, now: DateTime<Utc>) {
        self.entries.remove_if(key, |_, state| self.is_expired(state, now));
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_TIMEOUT_MINS))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    use super::{SessionStore, MAIN_MENU};
    use crate::session::clock::ManualClock;

    fn store_with_clock() -> (SessionStore, Arc<ManualClock>) {
        let start = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).single().expect("valid timestamp");
        let clock = Arc::new(ManualClock::starting_at(start));
        (SessionStore::with_clock(Duration::minutes(30), clock.clone()), clock)
    }

    #[test]
    fn context_write_lazily_creates_a_main_menu_session() {
        let (store, _clock) = store_with_clock();

        store.set_context("user-1", "a", json!(1));

        let state = store.get_state("user-1").expect("live state");
        assert_eq!(state.current_menu, MAIN_MENU);
        assert_eq!(state.context.get("a"), Some(&json!(1)));
    }

    #[test]
    fn omitted_context_is_preserved_and_explicit_context_replaces_wholesale() {
        let (store, _clock) = store_with_clock();
        store.set_context("user-1", "cart", json!(["rice"]));

        store.set_state("user-1", "debt_management", None);
        let state = store.get_state("user-1").expect("live state");
        assert_eq!(state.current_menu, "debt_management");
        assert_eq!(state.context.get("cart"), Some(&json!(["rice"])));

        store.set_state("user-1", "more_details", Some(HashMap::new()));
        let state = store.get_state("user-1").expect("live state");
        assert_eq!(state.current_menu, "more_details");
        assert!(state.context.is_empty());
    }

    #[test]
    fn expired_sessions_read_as_absent_and_are_evicted() {
        let (store, clock) = store_with_clock();
        store.set_state("user-1", "main", None);

        clock.advance(Duration::minutes(31));

        assert!(store.get_state("user-1").is_none());
        assert!(!store.is_in_menu_state("user-1"));
        assert!(store.is_empty());
    }

    #[test]
    fn reads_within_the_window_slide_it_forward() {
        let (store, clock) = store_with_clock();
        store.set_state("user-1", "main", None);

        // Touch at minute 20, then check at minute 40: still inside a
        // 30-minute window measured from the most recent touch.
        clock.advance(Duration::minutes(20));
        assert!(store.get_state("user-1").is_some());
        clock.advance(Duration::minutes(20));
        assert!(store.get_state("user-1").is_some());
    }

    #[test]
    fn expired_context_does_not_leak_into_a_recreated_session() {
        let (store, clock) = store_with_clock();
        store.set_context("user-1", "cart", json!(["rice"]));

        clock.advance(Duration::minutes(31));
        store.set_state("user-1", "checkout", None);

        let state = store.get_state("user-1").expect("live state");
        assert_eq!(state.current_menu, "checkout");
        assert!(state.context.is_empty(), "stale context must not survive expiry");
    }

    #[test]
    fn clear_state_removes_immediately() {
        let (store, _clock) = store_with_clock();
        store.set_state("user-1", "main", None);

        store.clear_state("user-1");

        assert!(store.get_state("user-1").is_none());
        assert!(store.get_all_context("user-1").is_empty());
    }

    #[test]
    fn context_accessors_merge_and_read_single_fields() {
        let (store, _clock) = store_with_clock();
        store.set_context("user-1", "a", json!(1));
        store.set_context("user-1", "b", json!("two"));
        store.set_context("user-1", "a", json!(3));

        assert_eq!(store.get_context("user-1", "a"), Some(json!(3)));
        assert_eq!(store.get_context("user-1", "b"), Some(json!("two")));
        assert_eq!(store.get_context("user-1", "missing"), None);
        assert_eq!(store.get_all_context("user-1").len(), 2);
        assert!(store.get_all_context("stranger").is_empty());
    }

    #[test]
    fn menu_predicates_report_live_position_only() {
        let (store, clock) = store_with_clock();
        assert!(!store.is_in_menu("user-1", "main"));

        store.set_state("user-1", "debt_management", None);
        assert!(store.is_in_menu("user-1", "debt_management"));
        assert!(!store.is_in_menu("user-1", "main"));
        assert!(store.is_in_menu_state("user-1"));

        clock.advance(Duration::minutes(31));
        assert!(!store.is_in_menu("user-1", "debt_management"));
        assert!(!store.is_in_menu_state("user-1"));
    }

    #[test]
    fn sweep_removes_only_stale_entries() {
        let (store, clock) = store_with_clock();
        store.set_state("stale", "main", None);
        clock.advance(Duration::minutes(20));
        store.set_state("fresh", "main", None);
        clock.advance(Duration::minutes(15));

        let evicted = store.sweep();

        assert_eq!(evicted, 1);
        assert!(store.get_state("stale").is_none());
        let fresh = store.get_state("fresh").expect("fresh survives the sweep");
        assert_eq!(fresh.current_menu, "main");
    }

    #[test]
    fn sessions_are_isolated_per_owner_key() {
        let (store, _clock) = store_with_clock();
        store.set_state("user-1", "checkout", None);
        store.set_context("user-2", "cart", json!(["salt"]));

        assert!(store.is_in_menu("user-1", "checkout"));
        assert!(store.is_in_menu("user-2", MAIN_MENU));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn concurrent_context_merges_on_one_key_lose_no_updates() {
        let (store, _clock) = store_with_clock();
        let store = Arc::new(store);

        let writers = (0..8)
            .map(|writer| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for field in 0..50 {
                        store.set_context(
                            "user-1",
                            &format!("w{writer}-f{field}"),
                            json!(writer),
                        );
                    }
                })
            })
            .collect::<Vec<_>>();
        for writer in writers {
            writer.join().expect("writer thread");
        }

        assert_eq!(store.get_all_context("user-1").len(), 8 * 50);
    }

    #[test]
    fn sweep_stays_total_while_writers_insert_concurrently() {
        let (store, clock) = store_with_clock();
        let store = Arc::new(store);
        for i in 0..100 {
            store.set_state(&format!("stale-{i}"), "main", None);
        }
        clock.advance(Duration::minutes(31));

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    store.set_state(&format!("live-{i}"), "main", None);
                }
            })
        };
        let mut evicted = 0;
        for _ in 0..2_000 {
            evicted += store.sweep();
        }
        writer.join().expect("writer thread");

        assert_eq!(evicted, 100);
        assert_eq!(store.len(), 2_000);
    }
}
