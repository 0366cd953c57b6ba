//! Polling engine behind the watch service.
//!
//! The server offers no push notifications, so a dedicated worker thread
//! diffs observed state against a cache at a fixed cadence and synthesizes
//! CREATE/MODIFY/DELETE events. Callers talk to the worker through a
//! request channel; every request carries a one-shot reply slot the caller
//! blocks on until the worker has executed it in FIFO order.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use smbfs_client::SmbResource;

use crate::error::{Result, SmbError};
use crate::filesystem::SmbFileSystem;
use crate::path::SmbPath;
use crate::watch_key::{SmbWatchKey, WatchEventKind};
use crate::watch_service::ServiceQueue;

enum PollerRequest {
    Register {
        path: SmbPath,
        kinds: HashSet<WatchEventKind>,
        reply: Sender<Result<Arc<SmbWatchKey>>>,
    },
    Cancel {
        key: Arc<SmbWatchKey>,
        reply: Sender<Result<()>>,
    },
    Close {
        reply: Sender<Result<()>>,
    },
}

/// Control plane of the poll worker. Requests enqueue onto the worker's
/// channel; once shutdown has begun further requests fail with
/// `ClosedWatchService`.
pub struct StandardSmbPoller {
    requests: Mutex<Option<Sender<PollerRequest>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StandardSmbPoller {
    pub(crate) fn start(
        file_system: Arc<SmbFileSystem>,
        interval: Duration,
        queue: Arc<ServiceQueue>,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel();
        let poller = Arc::new(Self {
            requests: Mutex::new(Some(sender)),
            worker: Mutex::new(None),
        });
        let state = PollerState::new(file_system, queue, Arc::downgrade(&poller));
        let handle = thread::Builder::new()
            .name("smbfs-watch-poller".to_string())
            .spawn(move || state.run(receiver, interval))
            .expect("failed to spawn the watch poller thread");
        *poller.worker.lock().expect("lock poisoned") = Some(handle);
        poller
    }

    /// Registers `path` for `kinds`. Overflow is accepted but not
    /// actionable; at least one of create/modify/delete is required.
    pub(crate) fn register(
        &self,
        path: &SmbPath,
        kinds: &[WatchEventKind],
    ) -> Result<Arc<SmbWatchKey>> {
        let filtered: HashSet<WatchEventKind> = kinds
            .iter()
            .copied()
            .filter(|kind| *kind != WatchEventKind::Overflow)
            .collect();
        if filtered.is_empty() {
            return Err(SmbError::invalid_argument(
                "no actionable event kinds to register",
            ));
        }
        let (reply, result) = mpsc::channel();
        self.send(PollerRequest::Register {
            path: path.clone(),
            kinds: filtered,
            reply,
        })?;
        result.recv().map_err(|_| SmbError::ClosedWatchService)?
    }

    /// Withdraws a registration.
    pub(crate) fn cancel(&self, key: &Arc<SmbWatchKey>) -> Result<()> {
        let (reply, result) = mpsc::channel();
        self.send(PollerRequest::Cancel {
            key: Arc::clone(key),
            reply,
        })?;
        result.recv().map_err(|_| SmbError::ClosedWatchService)?
    }

    /// Shuts the worker down and joins it.
    pub(crate) fn close(&self) -> Result<()> {
        let (reply, result) = mpsc::channel();
        self.send(PollerRequest::Close { reply })?;
        let outcome = result.recv().map_err(|_| SmbError::ClosedWatchService)?;
        *self.requests.lock().expect("lock poisoned") = None;
        let worker = self.worker.lock().expect("lock poisoned").take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
        outcome
    }

    fn send(&self, request: PollerRequest) -> Result<()> {
        let requests = self.requests.lock().expect("lock poisoned");
        match requests.as_ref() {
            Some(sender) => sender
                .send(request)
                .map_err(|_| SmbError::ClosedWatchService),
            None => Err(SmbError::ClosedWatchService),
        }
    }
}

/// One observation scheduled for delivery.
struct PollEvent {
    key: Arc<SmbWatchKey>,
    kind: WatchEventKind,
    path: SmbPath,
}

/// Deliver deletes before creates before modifies within one pass.
fn delivery_rank(kind: WatchEventKind) -> u8 {
    match kind {
        WatchEventKind::Delete => 0,
        WatchEventKind::Create => 1,
        WatchEventKind::Modify => 2,
        WatchEventKind::Overflow => 3,
    }
}

/// Worker-owned state: the path↔key registry plus the per-path
/// last-modified and directory-content caches the diff runs against.
struct PollerState {
    file_system: Arc<SmbFileSystem>,
    queue: Arc<ServiceQueue>,
    poller: Weak<StandardSmbPoller>,
    registry: HashMap<SmbPath, Arc<SmbWatchKey>>,
    modified_times: HashMap<SmbPath, SystemTime>,
    known_dir_content: HashMap<SmbPath, HashSet<SmbPath>>,
}

impl PollerState {
    fn new(
        file_system: Arc<SmbFileSystem>,
        queue: Arc<ServiceQueue>,
        poller: Weak<StandardSmbPoller>,
    ) -> Self {
        Self {
            file_system,
            queue,
            poller,
            registry: HashMap::new(),
            modified_times: HashMap::new(),
            known_dir_content: HashMap::new(),
        }
    }

    fn run(mut self, requests: Receiver<PollerRequest>, interval: Duration) {
        tracing::debug!("watch poller started, interval {:?}", interval);
        // Seed the deadline in the past so the first cycle diffs
        // immediately instead of sleeping out a full interval.
        let mut next_poll = Instant::now();
        loop {
            if Instant::now() >= next_poll {
                self.poll();
                next_poll = Instant::now() + interval;
            }
            let timeout = next_poll.saturating_duration_since(Instant::now());
            match requests.recv_timeout(timeout) {
                Ok(request) => {
                    if self.handle_request(request) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!("watch poller stopped");
    }

    /// Executes one request; true means shutdown was requested.
    fn handle_request(&mut self, request: PollerRequest) -> bool {
        match request {
            PollerRequest::Register { path, kinds, reply } => {
                let result = self.register(path, kinds);
                let _ = reply.send(result);
                false
            }
            PollerRequest::Cancel { key, reply } => {
                self.cancel(&key);
                let _ = reply.send(Ok(()));
                false
            }
            PollerRequest::Close { reply } => {
                self.close();
                let _ = reply.send(Ok(()));
                true
            }
        }
    }

    fn register(
        &mut self,
        path: SmbPath,
        kinds: HashSet<WatchEventKind>,
    ) -> Result<Arc<SmbWatchKey>> {
        let rendered = path.to_string();
        let resource = self.file_system.resource(&path)?;
        let modified = resource
            .last_modified()
            .map_err(|err| SmbError::from_client(err, &rendered))?;
        let is_directory = resource
            .is_directory()
            .map_err(|err| SmbError::from_client(err, &rendered))?;
        let children = if is_directory {
            Some(self.list_children(&path)?)
        } else {
            None
        };

        let key = SmbWatchKey::new(
            path.clone(),
            kinds,
            Arc::clone(&self.queue),
            self.poller.clone(),
        );
        self.registry.insert(path.clone(), Arc::clone(&key));
        self.modified_times.insert(path.clone(), modified);
        if let Some(children) = children {
            self.known_dir_content.insert(path.clone(), children);
        }
        tracing::debug!("registered watch on {}", path);
        Ok(key)
    }

    fn cancel(&mut self, key: &Arc<SmbWatchKey>) {
        let path = key.path();
        let registered = self
            .registry
            .get(path)
            .is_some_and(|existing| Arc::ptr_eq(existing, key));
        if registered {
            self.registry.remove(path);
            self.modified_times.remove(path);
            self.known_dir_content.remove(path);
            tracing::debug!("cancelled watch on {}", path);
        }
    }

    fn close(&mut self) {
        self.registry.clear();
        self.modified_times.clear();
        self.known_dir_content.clear();
    }

    /// One pass: diff every registered path, then deliver the collected
    /// events in delete-create-modify order.
    fn poll(&mut self) {
        let events = self.collect_events();
        self.signal_events(events);
    }

    fn collect_events(&mut self) -> Vec<PollEvent> {
        let entries: Vec<(SmbPath, Arc<SmbWatchKey>)> = self
            .registry
            .iter()
            .map(|(path, key)| (path.clone(), Arc::clone(key)))
            .collect();
        let mut events = Vec::new();
        for (path, key) in entries {
            match self.observe(&path, &key) {
                Ok(observed) => events.extend(observed),
                Err(err) => {
                    // One failing registration must not starve the rest.
                    tracing::error!("failed to poll watched path {}: {}", path, err);
                }
            }
        }
        events
    }

    fn observe(&mut self, path: &SmbPath, key: &Arc<SmbWatchKey>) -> Result<Vec<PollEvent>> {
        let rendered = path.to_string();
        let resource = self.file_system.resource(path)?;
        let exists = resource
            .exists()
            .map_err(|err| SmbError::from_client(err, &rendered))?;

        let mut events = Vec::new();
        if !exists {
            events.push(PollEvent {
                key: Arc::clone(key),
                kind: WatchEventKind::Delete,
                path: path.clone(),
            });
            return Ok(events);
        }

        if !self.is_modified(path, resource.as_ref())? {
            return Ok(events);
        }

        if self.known_dir_content.contains_key(path) {
            let actual = self.list_children(path)?;
            let mut cached = self.known_dir_content.remove(path).unwrap_or_default();

            let removed: Vec<SmbPath> = cached
                .iter()
                .filter(|child| !actual.contains(*child))
                .cloned()
                .collect();
            for child in removed {
                cached.remove(&child);
                // A registered directory reports its own removal; a
                // leaf-delete here would be spurious.
                if !self.known_dir_content.contains_key(&child) {
                    events.push(PollEvent {
                        key: Arc::clone(key),
                        kind: WatchEventKind::Delete,
                        path: child,
                    });
                }
            }
            for child in actual {
                if cached.insert(child.clone()) {
                    events.push(PollEvent {
                        key: Arc::clone(key),
                        kind: WatchEventKind::Create,
                        path: child,
                    });
                }
            }
            self.known_dir_content.insert(path.clone(), cached);
        } else {
            events.push(PollEvent {
                key: Arc::clone(key),
                kind: WatchEventKind::Modify,
                path: path.clone(),
            });
        }
        Ok(events)
    }

    fn is_modified(&mut self, path: &SmbPath, resource: &dyn SmbResource) -> Result<bool> {
        let last = resource
            .last_modified()
            .map_err(|err| SmbError::from_client(err, &path.to_string()))?;
        let modified = match self.modified_times.get(path) {
            Some(cached) => last > *cached,
            None => true,
        };
        self.modified_times.insert(path.clone(), last);
        Ok(modified)
    }

    fn list_children(&self, path: &SmbPath) -> Result<HashSet<SmbPath>> {
        let rendered = path.to_string();
        let resource = self.file_system.resource(path)?;
        let names = resource
            .list()
            .map_err(|err| SmbError::from_client(err, &rendered))?;
        let mut children = HashSet::with_capacity(names.len());
        for name in names {
            children.insert(path.resolve_str(&name)?);
        }
        Ok(children)
    }

    fn signal_events(&mut self, mut events: Vec<PollEvent>) {
        events.sort_by_key(|event| delivery_rank(event.kind));
        for event in events {
            if event.key.kinds().contains(&event.kind) {
                event
                    .key
                    .signal_event(event.kind, Some(event.path.clone()));
            }
            if event.kind == WatchEventKind::Delete {
                self.modified_times.remove(&event.path);
                self.known_dir_content.remove(&event.path);
            }
        }
    }
}
