/*
 * Arbitration for the shared I2C bus.
 *
 * The sensor and the display hang off the same bus, and each transaction
 * needs the bus to itself. Rather than having every call site take and give a
 * mutex, the arbiter hands out a guard: the bus is usable only through the
 * guard, and dropping the guard (on success, error, or early return alike)
 * gives the bus back. Releasing twice, or releasing a bus that was never
 * taken, cannot be written.
 *
 * Every acquire carries a timeout. A task that does not get the bus in time
 * skips what it was going to do this cycle.
 */

use core::ops::{Deref, DerefMut};

use embassy_sync::{
    blocking_mutex::raw::RawMutex,
    mutex::{Mutex, MutexGuard},
};
use embassy_time::{Duration, with_timeout};

use crate::error::Error;

pub struct BusArbiter<M: RawMutex, B> {
    bus: Mutex<M, B>,
}

/// Exclusive access to the bus, held until dropped or released.
pub struct BusGuard<'a, M: RawMutex, B> {
    inner: MutexGuard<'a, M, B>,
}

impl<M: RawMutex, B> BusArbiter<M, B> {
    pub const fn new(bus: B) -> Self {
        Self {
            bus: Mutex::new(bus),
        }
    }

    /// Wait up to `timeout` for the bus.
    pub async fn acquire(&self, timeout: Duration) -> Result<BusGuard<'_, M, B>, Error> {
        match with_timeout(timeout, self.bus.lock()).await {
            Ok(inner) => Ok(BusGuard { inner }),
            Err(_) => {
                trace!("bus not acquired within {} ms", timeout.as_millis());
                Err(Error::BusContention)
            }
        }
    }

    /// Take the bus only if nobody holds it right now.
    pub fn try_acquire(&self) -> Result<BusGuard<'_, M, B>, Error> {
        self.bus
            .try_lock()
            .map(|inner| BusGuard { inner })
            .map_err(|_| Error::BusContention)
    }
}

impl<M: RawMutex, B> BusGuard<'_, M, B> {
    /// Give the bus back. Same as dropping the guard, but reads better at the
    /// end of a transaction.
    pub fn release(self) {}
}

impl<M: RawMutex, B> Deref for BusGuard<'_, M, B> {
    type Target = B;

    fn deref(&self) -> &B {
        &self.inner
    }
}

impl<M: RawMutex, B> DerefMut for BusGuard<'_, M, B> {
    fn deref_mut(&mut self) -> &mut B {
        &mut self.inner
    }
}
