//! Stale-response guard for overlapping fetches.
//!
//! Every fetch mints a `FetchToken` for its key. Minting a new token
//! supersedes all earlier tokens for the same key, and a result may only be
//! applied while its token is still current. Network requests are never
//! cancelled; superseded results simply fail the `is_current` check.

use std::collections::HashMap;

/// What a fetch is for. Tokens are only compared within the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKey {
    Profile,
    Connections,
    Requests,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken {
    key: FetchKey,
    seq: u64,
}

impl FetchToken {
    pub fn key(&self) -> FetchKey {
        self.key
    }

    /// Position in the guard's global issue order
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    seq: u64,
    settled: bool,
}

#[derive(Debug, Default)]
pub struct FetchGuard {
    last_issued: u64,
    latest: HashMap<FetchKey, Slot>,
}

impl FetchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a token for `key`, superseding every earlier token for it
    pub fn begin_fetch(&mut self, key: FetchKey) -> FetchToken {
        self.last_issued += 1;
        let seq = self.last_issued;
        self.latest.insert(key, Slot { seq, settled: false });
        FetchToken { key, seq }
    }

    pub fn is_current(&self, token: FetchToken) -> bool {
        self.latest
            .get(&token.key)
            .map(|slot| slot.seq == token.seq)
            .unwrap_or(false)
    }

    /// Record that the current token's result has been handled.
    /// Returns false (and changes nothing) for a stale token.
    pub fn settle(&mut self, token: FetchToken) -> bool {
        match self.latest.get_mut(&token.key) {
            Some(slot) if slot.seq == token.seq => {
                slot.settled = true;
                true
            }
            _ => false,
        }
    }

    /// Supersede every outstanding token for `key` without issuing a new fetch
    pub fn invalidate(&mut self, key: FetchKey) {
        self.last_issued += 1;
        self.latest.insert(
            key,
            Slot {
                seq: self.last_issued,
                settled: true,
            },
        );
    }

    /// Whether the latest fetch for `key` is still waiting for its result
    pub fn has_outstanding(&self, key: FetchKey) -> bool {
        self.latest.get(&key).map(|slot| !slot.settled).unwrap_or(false)
    }

    /// Sequence number of the most recently minted token, across all keys
    pub fn last_issued(&self) -> u64 {
        self.last_issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_token_supersedes_older() {
        let mut guard = FetchGuard::new();
        let a = guard.begin_fetch(FetchKey::Connections);
        let b = guard.begin_fetch(FetchKey::Connections);

        assert!(!guard.is_current(a));
        assert!(guard.is_current(b));
        assert!(b.seq() > a.seq());
    }

    #[test]
    fn test_keys_are_independent() {
        let mut guard = FetchGuard::new();
        let friends = guard.begin_fetch(FetchKey::Connections);
        let requests = guard.begin_fetch(FetchKey::Requests);

        assert!(guard.is_current(friends));
        assert!(guard.is_current(requests));
    }

    #[test]
    fn test_settle_only_current() {
        let mut guard = FetchGuard::new();
        let a = guard.begin_fetch(FetchKey::Requests);
        let b = guard.begin_fetch(FetchKey::Requests);

        assert!(guard.has_outstanding(FetchKey::Requests));
        assert!(!guard.settle(a));
        assert!(guard.has_outstanding(FetchKey::Requests));
        assert!(guard.settle(b));
        assert!(!guard.has_outstanding(FetchKey::Requests));
        // Settling keeps the token current until a newer one is minted
        assert!(guard.is_current(b));
    }

    #[test]
    fn test_invalidate() {
        let mut guard = FetchGuard::new();
        let a = guard.begin_fetch(FetchKey::Profile);
        guard.invalidate(FetchKey::Profile);

        assert!(!guard.is_current(a));
        assert!(!guard.has_outstanding(FetchKey::Profile));
    }

    #[test]
    fn test_unknown_key_not_outstanding() {
        let guard = FetchGuard::new();
        assert!(!guard.has_outstanding(FetchKey::Connections));
        assert_eq!(guard.last_issued(), 0);
    }
}
