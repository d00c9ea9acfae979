//! Ephemeral per-chat game session tracker.
//!
//! Answers "is user U currently mid-game G in chat C?" and gates duplicate
//! game starts. Sessions live only in process memory: the two states are
//! absent and active, and absence after an end is indistinguishable from
//! never having started. Prompt expiry is a cancellable timer owned by the
//! session, armed by the caller via [`GameTracker::expire_after`].

use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use {tokio_util::sync::CancellationToken, tracing::debug};

/// Which game a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameKind {
    Dice,
    Rps,
}

impl GameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dice => "dice",
            Self::Rps => "rps",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dice" => Ok(Self::Dice),
            "rps" => Ok(Self::Rps),
            _ => Err(()),
        }
    }
}

/// Per-session state: only the expiry token. Existence of the entry is
/// the session.
struct SessionEntry {
    expiry: CancellationToken,
}

type SessionMap = HashMap<i64, HashMap<GameKind, HashMap<u64, SessionEntry>>>;

/// Registry of active game sessions, keyed by (chat, game, user).
///
/// Cloning is cheap and shares the underlying map. The mutex is only held
/// for map operations, never across an await.
#[derive(Clone, Default)]
pub struct GameTracker {
    sessions: Arc<Mutex<SessionMap>>,
}

impl GameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a session active. Idempotent: a second start for the same key
    /// is a no-op and still reports success. Exclusivity therefore needs
    /// an `is_active` check by the caller before starting.
    pub fn start(&self, chat: i64, game: GameKind, user: u64) -> bool {
        let mut sessions = self.lock();
        sessions
            .entry(chat)
            .or_default()
            .entry(game)
            .or_default()
            .entry(user)
            .or_insert_with(|| SessionEntry {
                expiry: CancellationToken::new(),
            });
        debug!(chat, %game, user, "session started");
        true
    }

    /// End a session. Returns false when no such session exists. Empty
    /// per-game and per-chat containers are pruned so abandoned keys do
    /// not accumulate, and the session's pending expiry timer is
    /// cancelled.
    pub fn end(&self, chat: i64, game: GameKind, user: u64) -> bool {
        let mut sessions = self.lock();
        let Some(games) = sessions.get_mut(&chat) else {
            return false;
        };
        let Some(users) = games.get_mut(&game) else {
            return false;
        };
        let Some(entry) = users.remove(&user) else {
            return false;
        };
        entry.expiry.cancel();
        if users.is_empty() {
            games.remove(&game);
        }
        if games.is_empty() {
            sessions.remove(&chat);
        }
        debug!(chat, %game, user, "session ended");
        true
    }

    /// Pure lookup, no side effects.
    pub fn is_active(&self, chat: i64, game: GameKind, user: u64) -> bool {
        self.lock()
            .get(&chat)
            .and_then(|games| games.get(&game))
            .is_some_and(|users| users.contains_key(&user))
    }

    /// Arm an expiry timer for an active session. When `ttl` elapses and
    /// the session is still active, it is ended and `on_expire` runs.
    /// Ending the session through [`GameTracker::end`] cancels the timer.
    ///
    /// The fired path re-checks activity through `end`, so a session that
    /// already finished by other means is left alone.
    pub fn expire_after<F>(
        &self,
        chat: i64,
        game: GameKind,
        user: u64,
        ttl: Duration,
        on_expire: F,
    ) -> Option<tokio::task::JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = {
            let sessions = self.lock();
            let entry = sessions
                .get(&chat)
                .and_then(|games| games.get(&game))
                .and_then(|users| users.get(&user))?;
            entry.expiry.clone()
        };

        let tracker = self.clone();
        Some(tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(ttl) => {
                    if tracker.end(chat, game, user) {
                        debug!(chat, %game, user, "session expired");
                        on_expire.await;
                    }
                }
            }
        }))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionMap> {
        // Map mutations cannot panic, so the lock cannot be poisoned.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    fn chat_count(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc as StdArc,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;

    #[test]
    fn start_then_lookup() {
        let tracker = GameTracker::new();
        assert!(tracker.start(100, GameKind::Rps, 7));
        assert!(tracker.is_active(100, GameKind::Rps, 7));
        // Different user, different game, different chat: all inactive.
        assert!(!tracker.is_active(100, GameKind::Rps, 8));
        assert!(!tracker.is_active(100, GameKind::Dice, 7));
        assert!(!tracker.is_active(101, GameKind::Rps, 7));
    }

    #[test]
    fn end_removes_and_second_end_reports_absent() {
        let tracker = GameTracker::new();
        tracker.start(100, GameKind::Rps, 7);
        assert!(tracker.end(100, GameKind::Rps, 7));
        assert!(!tracker.is_active(100, GameKind::Rps, 7));
        assert!(!tracker.end(100, GameKind::Rps, 7));
    }

    #[test]
    fn start_is_idempotent() {
        let tracker = GameTracker::new();
        assert!(tracker.start(1, GameKind::Dice, 2));
        assert!(tracker.start(1, GameKind::Dice, 2));
        assert!(tracker.is_active(1, GameKind::Dice, 2));
        // Exactly one logical session: a single end empties the tracker.
        assert!(tracker.end(1, GameKind::Dice, 2));
        assert!(!tracker.end(1, GameKind::Dice, 2));
    }

    #[test]
    fn empty_containers_are_pruned() {
        let tracker = GameTracker::new();
        tracker.start(1, GameKind::Dice, 2);
        tracker.start(1, GameKind::Rps, 3);
        tracker.end(1, GameKind::Dice, 2);
        assert_eq!(tracker.chat_count(), 1);
        tracker.end(1, GameKind::Rps, 3);
        assert_eq!(tracker.chat_count(), 0);
    }

    #[test]
    fn end_on_unknown_chat_is_false() {
        let tracker = GameTracker::new();
        assert!(!tracker.end(42, GameKind::Dice, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_ends_the_session_and_runs_the_action() {
        let tracker = GameTracker::new();
        tracker.start(5, GameKind::Dice, 9);

        let fired = StdArc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = tracker
            .expire_after(5, GameKind::Dice, 9, Duration::from_secs(30), async move {
                flag.store(true, Ordering::SeqCst);
            })
            .unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        handle.await.unwrap();

        assert!(fired.load(Ordering::SeqCst));
        assert!(!tracker.is_active(5, GameKind::Dice, 9));
    }

    #[tokio::test(start_paused = true)]
    async fn ending_a_session_cancels_its_timer() {
        let tracker = GameTracker::new();
        tracker.start(5, GameKind::Rps, 9);

        let fired = StdArc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = tracker
            .expire_after(5, GameKind::Rps, 9, Duration::from_secs(30), async move {
                flag.store(true, Ordering::SeqCst);
            })
            .unwrap();

        assert!(tracker.end(5, GameKind::Rps, 9));
        handle.await.unwrap();

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn expire_after_on_absent_session_is_a_no_op() {
        let tracker = GameTracker::new();
        assert!(
            tracker
                .expire_after(1, GameKind::Dice, 2, Duration::from_secs(1), async {})
                .is_none()
        );
    }

    #[test]
    fn game_kind_round_trips_through_str() {
        for kind in [GameKind::Dice, GameKind::Rps] {
            assert_eq!(kind.as_str().parse::<GameKind>(), Ok(kind));
        }
        assert!("poker".parse::<GameKind>().is_err());
    }
}
