use std::collections::HashMap;

use tracing::debug;

use crate::protocol::ClientEvent;
use crate::puzzle::{Player, PuzzleId, roster_index};
use crate::session::Identity;

/// Number of distinct lock colours; roster positions wrap around it.
pub const PALETTE_SIZE: usize = 4;

/// Someone's claim on a cell they are currently editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLock {
    pub holder: Identity,
    /// Index into the lock palette; `None` when the holder is not on the roster.
    pub color_index: Option<usize>,
}

/// Tracks which player is editing which cell.
#[derive(Debug, Clone)]
pub struct LockTracker {
    puzzle_id: PuzzleId,
    identity: Identity,
    locks: HashMap<(u8, u8), CellLock>,
    held: Option<(u8, u8)>,
}

impl LockTracker {
    pub fn new(puzzle_id: PuzzleId, identity: Identity) -> Self {
        Self {
            puzzle_id,
            identity,
            locks: HashMap::new(),
            held: None,
        }
    }

    /// Local player focused a cell.
    pub fn acquire(&mut self, x: u8, y: u8) -> ClientEvent {
        self.held = Some((x, y));
        ClientEvent::AddLock {
            puzzle_id: self.puzzle_id,
            x,
            y,
            player: self.identity.clone(),
        }
    }

    /// Local player left a cell.
    pub fn release(&mut self, x: u8, y: u8) -> ClientEvent {
        if self.held == Some((x, y)) {
            self.held = None;
        }
        if self
            .locks
            .get(&(x, y))
            .is_some_and(|lock| lock.holder == self.identity)
        {
            self.locks.remove(&(x, y));
        }
        ClientEvent::RemoveLock {
            puzzle_id: self.puzzle_id,
            x,
            y,
        }
    }

    /// Cell the local player currently holds, if any.
    pub fn held(&self) -> Option<(u8, u8)> {
        self.held
    }

    pub fn on_lock_added(&mut self, x: u8, y: u8, holder: Identity, roster: &[Player]) {
        let color_index = roster_index(roster, &holder).map(|i| i % PALETTE_SIZE);
        if let Some(previous) = self.locks.get(&(x, y)) {
            if previous.holder != holder {
                debug!(x, y, from = %previous.holder.email, to = %holder.email, "lock taken over");
            }
        }
        self.locks.insert((x, y), CellLock { holder, color_index });
    }

    pub fn on_lock_removed(&mut self, x: u8, y: u8) {
        self.locks.remove(&(x, y));
    }

    pub fn lock_at(&self, x: u8, y: u8) -> Option<&CellLock> {
        self.locks.get(&(x, y))
    }

    /// Lock on the cell held by someone other than the local player.
    pub fn locked_by_other(&self, x: u8, y: u8) -> Option<&CellLock> {
        self.lock_at(x, y)
            .filter(|lock| lock.holder != self.identity)
    }

    /// Recompute colours after the roster changed.
    pub fn recolor(&mut self, roster: &[Player]) {
        for lock in self.locks.values_mut() {
            lock.color_index = roster_index(roster, &lock.holder).map(|i| i % PALETTE_SIZE);
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Forget every lock, e.g. after the channel dropped.
    pub fn clear(&mut self) {
        self.locks.clear();
        self.held = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn me() -> Identity {
        Identity::new("Me", "me@example.com")
    }

    fn player(id: u64, email: &str) -> Player {
        Player {
            id,
            first_name: format!("p{}", id),
            last_name: None,
            email: email.into(),
        }
    }

    #[test]
    fn acquire_then_release_leaves_no_entry() {
        let mut tracker = LockTracker::new(5, me());
        let add = tracker.acquire(2, 3);
        assert_eq!(
            add,
            ClientEvent::AddLock {
                puzzle_id: 5,
                x: 2,
                y: 3,
                player: me()
            }
        );
        assert_eq!(tracker.held(), Some((2, 3)));

        let remove = tracker.release(2, 3);
        assert_eq!(
            remove,
            ClientEvent::RemoveLock {
                puzzle_id: 5,
                x: 2,
                y: 3
            }
        );
        assert!(tracker.lock_at(2, 3).is_none());
        assert_eq!(tracker.held(), None);
    }

    #[test]
    fn release_drops_echoed_own_lock() {
        let mut tracker = LockTracker::new(5, me());
        tracker.acquire(2, 3);
        tracker.on_lock_added(2, 3, me(), &[]);
        tracker.release(2, 3);
        assert!(tracker.is_empty());
    }

    #[test]
    fn color_index_follows_roster_position() {
        let roster = vec![
            player(1, "a@x.io"),
            player(2, "b@x.io"),
            player(3, "c@x.io"),
            player(4, "d@x.io"),
            player(5, "e@x.io"),
        ];
        let mut tracker = LockTracker::new(1, me());
        tracker.on_lock_added(0, 0, Identity::new("B", "b@x.io"), &roster);
        tracker.on_lock_added(1, 0, Identity::new("E", "e@x.io"), &roster);
        tracker.on_lock_added(2, 0, Identity::new("Z", "z@x.io"), &roster);

        assert_eq!(tracker.lock_at(0, 0).unwrap().color_index, Some(1));
        // Fifth player wraps back onto the first colour.
        assert_eq!(tracker.lock_at(1, 0).unwrap().color_index, Some(0));
        assert_eq!(tracker.lock_at(2, 0).unwrap().color_index, None);
    }

    #[test]
    fn last_lock_add_wins() {
        let roster = vec![player(1, "a@x.io"), player(2, "b@x.io")];
        let mut tracker = LockTracker::new(1, me());
        tracker.on_lock_added(4, 4, Identity::new("A", "a@x.io"), &roster);
        tracker.on_lock_added(4, 4, Identity::new("B", "b@x.io"), &roster);

        assert_eq!(tracker.len(), 1);
        let lock = tracker.lock_at(4, 4).unwrap();
        assert_eq!(lock.holder.email, "b@x.io");
        assert_eq!(lock.color_index, Some(1));
    }

    #[test]
    fn own_lock_is_not_locked_by_other() {
        let mut tracker = LockTracker::new(1, me());
        tracker.on_lock_added(0, 0, me(), &[]);
        tracker.on_lock_added(1, 0, Identity::new("O", "o@x.io"), &[]);
        assert!(tracker.locked_by_other(0, 0).is_none());
        assert!(tracker.locked_by_other(1, 0).is_some());
    }

    #[test]
    fn remove_and_clear() {
        let mut tracker = LockTracker::new(1, me());
        tracker.on_lock_added(0, 0, Identity::new("O", "o@x.io"), &[]);
        tracker.on_lock_added(1, 1, Identity::new("P", "p@x.io"), &[]);
        tracker.on_lock_removed(0, 0);
        assert!(tracker.lock_at(0, 0).is_none());
        assert_eq!(tracker.len(), 1);
        tracker.acquire(3, 3);
        tracker.clear();
        assert!(tracker.is_empty());
        assert_eq!(tracker.held(), None);
    }

    #[test]
    fn recolor_after_roster_change() {
        let mut tracker = LockTracker::new(1, me());
        tracker.on_lock_added(0, 0, Identity::new("B", "b@x.io"), &[]);
        assert_eq!(tracker.lock_at(0, 0).unwrap().color_index, None);
        tracker.recolor(&[player(1, "a@x.io"), player(2, "b@x.io")]);
        assert_eq!(tracker.lock_at(0, 0).unwrap().color_index, Some(1));
    }
}
