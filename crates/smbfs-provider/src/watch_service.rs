//! Signaled-key delivery for watch registrations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{Result, SmbError};
use crate::filesystem::SmbFileSystem;
use crate::path::SmbPath;
use crate::poller::StandardSmbPoller;
use crate::watch_key::{SmbWatchKey, WatchEventKind};

struct QueueState {
    pending: VecDeque<Arc<SmbWatchKey>>,
    closed: bool,
}

/// MPMC deque of signaled keys, shared between the poller worker, the
/// keys themselves and the consuming threads.
pub(crate) struct ServiceQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl ServiceQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Appends a signaled key. Ignored once the queue is closed.
    pub(crate) fn enqueue(&self, key: Arc<SmbWatchKey>) {
        let mut state = self.state.lock().expect("lock poisoned");
        if !state.closed {
            state.pending.push_back(key);
            self.available.notify_one();
        }
    }

    fn poll(&self) -> Result<Option<Arc<SmbWatchKey>>> {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.closed {
            return Err(SmbError::ClosedWatchService);
        }
        Ok(state.pending.pop_front())
    }

    fn poll_timeout(&self, timeout: Duration) -> Result<Option<Arc<SmbWatchKey>>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().expect("lock poisoned");
        loop {
            if state.closed {
                return Err(SmbError::ClosedWatchService);
            }
            if let Some(key) = state.pending.pop_front() {
                return Ok(Some(key));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let (next, _timed_out) = self
                .available
                .wait_timeout(state, deadline - now)
                .expect("lock poisoned");
            state = next;
        }
    }

    fn take(&self) -> Result<Arc<SmbWatchKey>> {
        let mut state = self.state.lock().expect("lock poisoned");
        loop {
            if state.closed {
                return Err(SmbError::ClosedWatchService);
            }
            if let Some(key) = state.pending.pop_front() {
                return Ok(key);
            }
            state = self.available.wait(state).expect("lock poisoned");
        }
    }

    fn close(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.closed = true;
        state.pending.clear();
        self.available.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.state.lock().expect("lock poisoned").pending.len()
    }

    #[cfg(test)]
    pub(crate) fn poll_one(&self) -> Option<Arc<SmbWatchKey>> {
        self.state
            .lock()
            .expect("lock poisoned")
            .pending
            .pop_front()
    }
}

/// Watch service over one file system, backed by a dedicated poller
/// thread.
///
/// Keys signaled by the poller queue up here and are handed out in
/// enqueue order by `poll`/`take`. Closing is idempotent: it shuts the
/// poller down, clears the queue and wakes every blocked consumer, which
/// then observes `ClosedWatchService`.
pub struct SmbWatchService {
    queue: Arc<ServiceQueue>,
    poller: Arc<StandardSmbPoller>,
    closed: AtomicBool,
}

impl SmbWatchService {
    pub(crate) fn open(file_system: Arc<SmbFileSystem>, interval: Duration) -> Self {
        let queue = Arc::new(ServiceQueue::new());
        let poller = StandardSmbPoller::start(file_system, interval, Arc::clone(&queue));
        Self {
            queue,
            poller,
            closed: AtomicBool::new(false),
        }
    }

    /// Registers `path` for the given event kinds and returns its key.
    pub fn register(
        &self,
        path: &SmbPath,
        kinds: &[WatchEventKind],
    ) -> Result<Arc<SmbWatchKey>> {
        self.check_open()?;
        self.poller.register(path, kinds)
    }

    /// Dequeues one signaled key, without blocking.
    pub fn poll(&self) -> Result<Option<Arc<SmbWatchKey>>> {
        self.check_open()?;
        let key = self.queue.poll()?;
        tracing::debug!(
            "poll: dequeued {} key(s)",
            if key.is_some() { 1 } else { 0 }
        );
        Ok(key)
    }

    /// Dequeues one signaled key, waiting up to `timeout`.
    pub fn poll_timeout(&self, timeout: Duration) -> Result<Option<Arc<SmbWatchKey>>> {
        self.check_open()?;
        self.queue.poll_timeout(timeout)
    }

    /// Dequeues one signaled key, blocking until one is signaled or the
    /// service closes.
    pub fn take(&self) -> Result<Arc<SmbWatchKey>> {
        self.check_open()?;
        self.queue.take()
    }

    /// Shuts the service down. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!("closing watch service");
        let result = self.poller.close();
        self.queue.close();
        match result {
            Ok(()) | Err(SmbError::ClosedWatchService) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(SmbError::ClosedWatchService)
        } else {
            Ok(())
        }
    }
}

impl Drop for SmbWatchService {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SmbFileSystemProvider;
    use smbfs_client::{MemoryClient, SmbClient};
    use std::collections::HashMap;
    use url::Url;

    const AUTH: &str = "u@h";

    fn watched_service() -> (Arc<MemoryClient>, SmbWatchService, SmbPath) {
        let client = Arc::new(MemoryClient::new());
        client.put_file(AUTH, "/share/dir/file.bin", b"data");
        let provider = SmbFileSystemProvider::new(Arc::clone(&client) as Arc<dyn SmbClient>);
        let env: HashMap<String, String> = [
            ("smb.watchservice.enabled".to_string(), "true".to_string()),
            // Long cadence keeps the worker quiet during queue tests.
            ("smb.watchservice.pollInterval".to_string(), "60000".to_string()),
        ]
        .into_iter()
        .collect();
        let fs = provider
            .new_file_system(&Url::parse("smb://u@h/").unwrap(), &env)
            .unwrap();
        let service = fs.new_watch_service().unwrap();
        let path = fs.path("/share/dir/");
        // Keep the provider alive: `fs` only holds a Weak reference to it,
        // and the registry lookups behind `is_open()` would otherwise see
        // the file system as closed as soon as `watched_service()` returns.
        std::mem::forget(provider);
        (client, service, path)
    }

    fn all_kinds() -> Vec<WatchEventKind> {
        vec![
            WatchEventKind::Create,
            WatchEventKind::Modify,
            WatchEventKind::Delete,
        ]
    }

    #[test]
    fn poll_on_a_quiet_service_returns_none() {
        let (_client, service, _path) = watched_service();
        assert!(service.poll().unwrap().is_none());
        assert!(service
            .poll_timeout(Duration::from_millis(20))
            .unwrap()
            .is_none());
    }

    #[test]
    fn register_returns_a_key_bound_to_the_path() {
        let (_client, service, path) = watched_service();
        let key = service.register(&path, &all_kinds()).unwrap();
        assert_eq!(key.path(), &path);
        assert_eq!(key.kinds().len(), 3);
    }

    #[test]
    fn register_with_only_overflow_is_rejected() {
        let (_client, service, path) = watched_service();
        let err = service
            .register(&path, &[WatchEventKind::Overflow])
            .unwrap_err();
        assert!(matches!(err, SmbError::InvalidArgument { .. }));
    }

    #[test]
    fn register_of_a_missing_path_propagates_not_found() {
        let (_client, service, path) = watched_service();
        let missing = path.resolve_str("nothing.bin").unwrap();
        let err = service.register(&missing, &all_kinds()).unwrap_err();
        assert!(matches!(err, SmbError::NotFound { .. }));
    }

    #[test]
    fn signaled_keys_are_delivered_in_enqueue_order() {
        let (_client, service, path) = watched_service();
        let first = service.register(&path, &all_kinds()).unwrap();
        let file = path.resolve_str("file.bin").unwrap();
        let second = service.register(&file, &all_kinds()).unwrap();

        first.signal_event(WatchEventKind::Create, Some(file.clone()));
        second.signal_event(WatchEventKind::Modify, Some(file.clone()));

        let a = service.take().unwrap();
        let b = service.take().unwrap();
        assert!(Arc::ptr_eq(&a, &first));
        assert!(Arc::ptr_eq(&b, &second));
    }

    #[test]
    fn close_is_idempotent_and_rejects_further_use() {
        let (_client, service, path) = watched_service();
        service.close().unwrap();
        service.close().unwrap();
        assert!(matches!(service.poll(), Err(SmbError::ClosedWatchService)));
        assert!(matches!(service.take(), Err(SmbError::ClosedWatchService)));
        assert!(matches!(
            service.register(&path, &all_kinds()),
            Err(SmbError::ClosedWatchService)
        ));
    }

    #[test]
    fn close_wakes_a_blocked_take() {
        let (_client, service, _path) = watched_service();
        let service = Arc::new(service);
        let consumer = {
            let service = Arc::clone(&service);
            std::thread::spawn(move || service.take())
        };
        // Give the consumer a moment to block on the deque.
        std::thread::sleep(Duration::from_millis(50));
        service.close().unwrap();
        let result = consumer.join().unwrap();
        assert!(matches!(result, Err(SmbError::ClosedWatchService)));
    }
}
