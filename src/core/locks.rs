use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

use crate::core::{AccountId, LedgerError, LedgerResult};

/// Shared flag a caller flips to give up waiting for an account lock.
///
/// Only checked while waiting: once the lock is held the operation runs to
/// completion.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

type AccountLock = Arc<Mutex<()>>;

/// Exclusive hold on one account. Dropping it releases the lock, so every
/// exit path of the holder releases it.
pub struct AccountGuard {
    account_id: AccountId,
    _held: ArcMutexGuard<RawMutex, ()>
}

impl AccountGuard {
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }
}

/// One lazily created lock per account id.
///
/// The registry map is locked only to find, create or retire an account's
/// lock, never while an account lock is awaited.
#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<AccountId, AccountLock>>
}

impl LockRegistry {
    const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(5);

    pub fn new() -> LockRegistry {
        LockRegistry::default()
    }

    /// Blocks until `account_id` is free and takes it.
    pub fn acquire(&self, account_id: AccountId) -> AccountGuard {
        let held = self.lock_for(account_id).lock_arc();
        AccountGuard { account_id, _held: held }
    }

    /// Like [`acquire`](Self::acquire), but gives up with
    /// [`LedgerError::Cancelled`] once `cancel` fires.
    pub fn acquire_cancellable(&self, account_id: AccountId, cancel: &CancelToken) -> LedgerResult<AccountGuard> {
        let lock = self.lock_for(account_id);
        // a cancelled caller that finds the lock free still gets it
        if let Some(held) = lock.try_lock_arc() {
            return Ok(AccountGuard { account_id, _held: held });
        }
        loop {
            if cancel.is_cancelled() {
                return Err(LedgerError::Cancelled(account_id));
            }
            if let Some(held) = lock.try_lock_arc_for(Self::CANCEL_POLL_INTERVAL) {
                return Ok(AccountGuard { account_id, _held: held });
            }
        }
    }

    /// Non-blocking attempt, `None` if another operation holds the account.
    pub fn try_acquire(&self, account_id: AccountId) -> Option<AccountGuard> {
        let held = self.lock_for(account_id).try_lock_arc()?;
        Some(AccountGuard { account_id, _held: held })
    }

    /// Releases `guard` and forgets the account's lock unless someone else
    /// holds or awaits it. Used once the account is known to be gone.
    pub fn retire(&self, guard: AccountGuard) {
        let mut locks = self.locks.lock();
        let account_id = guard.account_id;
        drop(guard);
        // the map's own clone is the only reference left
        if locks.get(&account_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&account_id);
        }
    }

    fn lock_for(&self, account_id: AccountId) -> AccountLock {
        self.locks.lock().entry(account_id).or_default().clone()
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
