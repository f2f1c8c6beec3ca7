/*
 * The bounded queue carrying samples from the sampler to the presenter.
 *
 * What happens when the queue is full is decided per send, by the producer:
 * wait a bounded time for room, drop the new item, or evict the oldest one.
 * The mailbox itself never decides for it. Items come out in the order they
 * went in, whichever policy put them there.
 */

use embassy_sync::{
    blocking_mutex::raw::RawMutex,
    channel::{Channel, TrySendError},
};
use embassy_time::{Duration, with_timeout};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendPolicy {
    /// Wait up to the given time for room.
    Blocking(Duration),
    /// Never wait. On a full queue the new item is dropped.
    BestEffort,
    /// Never wait. On a full queue the oldest item is dropped to make room.
    Overwrite,
}

pub struct Mailbox<M: RawMutex, T, const N: usize> {
    channel: Channel<M, T, N>,
}

impl<M: RawMutex, T, const N: usize> Mailbox<M, T, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    pub async fn send(&self, item: T, policy: SendPolicy) -> Result<(), Error> {
        match policy {
            SendPolicy::Blocking(timeout) => with_timeout(timeout, self.channel.send(item))
                .await
                .map_err(|_| Error::MailboxTimeout),
            SendPolicy::BestEffort => self.try_send(item),
            SendPolicy::Overwrite => {
                self.overwrite(item);
                Ok(())
            }
        }
    }

    /// Non-blocking send for interrupt handlers. Drops the item when full.
    pub fn send_from_interrupt(&self, item: T) -> Result<(), Error> {
        self.try_send(item)
    }

    fn try_send(&self, item: T) -> Result<(), Error> {
        self.channel
            .try_send(item)
            .map_err(|_| Error::MailboxFull)
    }

    fn overwrite(&self, mut item: T) {
        loop {
            match self.channel.try_send(item) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    item = rejected;
                    // A consumer may have emptied a slot since, then there is
                    // nothing to evict and the next attempt succeeds.
                    if self.channel.try_receive().is_ok() {
                        debug!("mailbox full, dropped oldest item");
                    }
                }
            }
        }
    }

    /// Wait for the next item. `None` waits forever.
    pub async fn receive(&self, timeout: Option<Duration>) -> Result<T, Error> {
        match timeout {
            Some(timeout) => with_timeout(timeout, self.channel.receive())
                .await
                .map_err(|_| Error::ReceiveTimeout),
            None => Ok(self.channel.receive().await),
        }
    }

    pub fn try_receive(&self) -> Option<T> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }

    pub fn clear(&self) {
        self.channel.clear()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<M: RawMutex, T, const N: usize> Default for Mailbox<M, T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_time::{Instant, Timer};

    type Queue<const N: usize> = Mailbox<CriticalSectionRawMutex, u32, N>;

    fn drain<const N: usize>(mailbox: &Queue<N>) -> std::vec::Vec<u32> {
        core::iter::from_fn(|| mailbox.try_receive()).collect()
    }

    #[tokio::test]
    async fn delivers_in_enqueue_order() {
        let mailbox = Queue::<5>::new();
        for item in [3, 1, 4, 1, 5] {
            mailbox.send(item, SendPolicy::BestEffort).await.unwrap();
        }
        for item in [3, 1, 4, 1, 5] {
            assert_eq!(mailbox.receive(None).await, Ok(item));
        }
        assert!(mailbox.is_empty());
    }

    #[tokio::test]
    async fn best_effort_on_full_keeps_queued_items() {
        let mailbox = Queue::<3>::new();
        for item in 0..3 {
            mailbox.send(item, SendPolicy::BestEffort).await.unwrap();
        }

        let started = Instant::now();
        assert_eq!(mailbox.send(99, SendPolicy::BestEffort).await, Err(Error::MailboxFull));
        assert_eq!(mailbox.send_from_interrupt(98), Err(Error::MailboxFull));
        assert!(started.elapsed() < Duration::from_millis(50));

        assert_eq!(drain(&mailbox), [0, 1, 2]);
    }

    #[tokio::test]
    async fn overwrite_evicts_oldest() {
        let mailbox = Queue::<3>::new();
        for item in 0..5 {
            mailbox.send(item, SendPolicy::Overwrite).await.unwrap();
        }
        assert_eq!(drain(&mailbox), [2, 3, 4]);
    }

    #[tokio::test]
    async fn single_slot_overwrite_keeps_latest() {
        let mailbox = Queue::<1>::new();
        for item in 10..20 {
            mailbox.send(item, SendPolicy::Overwrite).await.unwrap();
        }
        assert_eq!(mailbox.try_receive(), Some(19));
    }

    #[tokio::test]
    async fn blocking_send_times_out_when_nobody_receives() {
        let mailbox = Queue::<1>::new();
        mailbox.send(1, SendPolicy::BestEffort).await.unwrap();

        let policy = SendPolicy::Blocking(Duration::from_millis(20));
        assert_eq!(mailbox.send(2, policy).await, Err(Error::MailboxTimeout));
        assert_eq!(drain(&mailbox), [1]);
    }

    #[tokio::test]
    async fn blocking_send_completes_once_room_is_made() {
        let mailbox = Queue::<1>::new();
        mailbox.send(1, SendPolicy::BestEffort).await.unwrap();

        let producer = mailbox.send(2, SendPolicy::Blocking(Duration::from_millis(500)));
        let consumer = async {
            Timer::after_millis(10).await;
            mailbox.receive(None).await
        };
        let (sent, received) = tokio::join!(producer, consumer);

        assert_eq!(sent, Ok(()));
        assert_eq!(received, Ok(1));
        assert_eq!(mailbox.try_receive(), Some(2));
    }

    #[tokio::test]
    async fn bounded_receive_times_out_on_empty() {
        let mailbox = Queue::<2>::new();
        assert_eq!(
            mailbox.receive(Some(Duration::from_millis(10))).await,
            Err(Error::ReceiveTimeout)
        );
    }

    #[test]
    fn interrupt_send_reports_instead_of_waiting() {
        let mailbox = Queue::<2>::new();
        assert_eq!(mailbox.send_from_interrupt(7), Ok(()));
        assert_eq!(mailbox.send_from_interrupt(8), Ok(()));
        assert_eq!(mailbox.send_from_interrupt(9), Err(Error::MailboxFull));
        assert!(mailbox.is_full());
        assert_eq!(mailbox.len(), mailbox.capacity());

        mailbox.clear();
        assert!(mailbox.is_empty());
    }
}
