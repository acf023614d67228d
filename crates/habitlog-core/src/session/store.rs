//! Concurrent per-user session map with TTL.
//!
//! Backed by `DashMap`, so every operation locks only the shard holding the
//! user's entry. Sessions are cloned out on read; no `DashMap` guard ever
//! escapes this module, and none is held across an `.await`.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use habitlog_types::error::HabitError;
use habitlog_types::session::{Session, SessionId};
use habitlog_types::user::UserId;

use crate::clock::Clock;

/// Lifecycle-scoped store of in-progress sessions.
///
/// Cloning produces a shared view of the same underlying map (backed by `Arc`),
/// so one store can be handed to the conversation service and the reaper.
/// An expired session is treated as absent by every accessor, whether or
/// not the reaper has swept it yet.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<UserId, Session>>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: TimeDelta) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            clock,
            ttl,
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Current instant according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// `now - last_touched_at > ttl`.
    pub fn is_expired(session: &Session, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        session.is_expired(now, ttl)
    }

    /// Return the live session for `user_id`, creating one at the first step
    /// if there is none (or only an expired one).
    pub fn get_or_create(&self, user_id: UserId) -> Session {
        let now = self.clock.now();
        match self.sessions.entry(user_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired(now, self.ttl) {
                    let fresh = Session::new(user_id, now);
                    entry.insert(fresh.clone());
                    tracing::debug!(%user_id, "expired session replaced on access");
                    fresh
                } else {
                    entry.get().clone()
                }
            }
            Entry::Vacant(entry) => {
                let fresh = Session::new(user_id, now);
                entry.insert(fresh.clone());
                fresh
            }
        }
    }

    /// Install a fresh session over whatever the user holds.
    ///
    /// Returns the new session and the live session it displaced, if any.
    /// A live session whose record is being persisted is kept and the call
    /// fails with `CommitInProgress`.
    pub fn replace(&self, user_id: UserId) -> Result<(Session, Option<Session>), HabitError> {
        let now = self.clock.now();
        let fresh = Session::new(user_id, now);
        match self.sessions.entry(user_id) {
            Entry::Occupied(mut entry) => {
                let live = !entry.get().is_expired(now, self.ttl);
                if live && entry.get().finalizing {
                    return Err(HabitError::CommitInProgress);
                }
                let previous = entry.insert(fresh.clone());
                Ok((fresh, live.then_some(previous)))
            }
            Entry::Vacant(entry) => {
                entry.insert(fresh.clone());
                Ok((fresh, None))
            }
        }
    }

    /// Install a fresh session only if the user has no live one.
    pub fn create_if_absent(&self, user_id: UserId) -> Result<Session, HabitError> {
        let now = self.clock.now();
        match self.sessions.entry(user_id) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_expired(now, self.ttl) {
                    return Err(HabitError::SessionAlreadyActive);
                }
                let fresh = Session::new(user_id, now);
                entry.insert(fresh.clone());
                Ok(fresh)
            }
            Entry::Vacant(entry) => {
                let fresh = Session::new(user_id, now);
                entry.insert(fresh.clone());
                Ok(fresh)
            }
        }
    }

    /// Snapshot of the live session, evicting it if it has expired.
    pub fn get(&self, user_id: UserId) -> Option<Session> {
        let now = self.clock.now();
        match self.sessions.entry(user_id) {
            Entry::Occupied(entry) => {
                if entry.get().is_expired(now, self.ttl) {
                    entry.remove();
                    None
                } else {
                    Some(entry.get().clone())
                }
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Atomically apply `mutator` to the user's live session.
    ///
    /// The mutator works on a copy: if it returns `Err`, the stored session
    /// is left exactly as it was. On success the copy replaces the stored
    /// session with `last_touched_at` refreshed. Fails with
    /// `NoActiveSession` when there is no session or it has expired.
    pub fn update<T>(
        &self,
        user_id: UserId,
        mutator: impl FnOnce(&mut Session) -> Result<T, HabitError>,
    ) -> Result<T, HabitError> {
        let now = self.clock.now();
        match self.sessions.entry(user_id) {
            Entry::Vacant(_) => Err(HabitError::NoActiveSession),
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired(now, self.ttl) {
                    entry.remove();
                    tracing::debug!(%user_id, "expired session evicted on update");
                    return Err(HabitError::NoActiveSession);
                }
                let mut draft = entry.get().clone();
                let out = mutator(&mut draft)?;
                draft.last_touched_at = now;
                entry.insert(draft);
                Ok(out)
            }
        }
    }

    /// Delete and return the user's session, expired or not.
    pub fn remove(&self, user_id: UserId) -> Option<Session> {
        self.sessions.remove(&user_id).map(|(_, session)| session)
    }

    /// Delete the user's session if `predicate` holds, evaluated under the
    /// entry lock.
    pub fn remove_if(
        &self,
        user_id: UserId,
        predicate: impl FnOnce(&Session) -> bool,
    ) -> Option<Session> {
        self.sessions
            .remove_if(&user_id, |_, session| predicate(session))
            .map(|(_, session)| session)
    }

    /// Delete the user's session only if it is still `session_id`.
    pub fn remove_if_current(&self, user_id: UserId, session_id: SessionId) -> Option<Session> {
        self.remove_if(user_id, |session| session.id == session_id)
    }

    /// Evict every expired session and return how many were removed.
    ///
    /// Expiry wins over `finalizing`: a commit that outlives the TTL still
    /// writes its record, but a failure after that point has no session
    /// left to retry from.
    ///
    /// Keys are snapshotted first and each one is re-checked under its own
    /// entry lock, so the sweep never holds more than one entry at a time.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let user_ids = self.user_ids();
        user_ids
            .iter()
            .filter(|user_id| {
                self.sessions
                    .remove_if(user_id, |_, session| session.is_expired(now, self.ttl))
                    .is_some()
            })
            .count()
    }

    /// Snapshot of all user ids currently holding an entry (live or expired).
    pub fn user_ids(&self) -> Vec<UserId> {
        self.sessions.iter().map(|r| *r.key()).collect()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
