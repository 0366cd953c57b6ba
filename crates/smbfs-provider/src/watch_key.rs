//! Watch registrations and their coalescing event buffers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::path::SmbPath;
use crate::poller::StandardSmbPoller;
use crate::watch_service::ServiceQueue;

/// Upper bound on buffered events per key; reaching it collapses the
/// buffer into a single overflow event.
pub const MAX_EVENT_LIST_SIZE: usize = 512;

/// Kind of change event a watch can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchEventKind {
    Create,
    Modify,
    Delete,
    /// Synthetic event marking lost history after a buffer overflow.
    Overflow,
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WatchEventKind::Create => "create",
            WatchEventKind::Modify => "modify",
            WatchEventKind::Delete => "delete",
            WatchEventKind::Overflow => "overflow",
        };
        f.write_str(name)
    }
}

/// One delivered event: a kind, the affected path (absent for overflow),
/// and how many occurrences were coalesced into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    kind: WatchEventKind,
    context: Option<SmbPath>,
    count: u64,
}

impl WatchEvent {
    pub fn kind(&self) -> WatchEventKind {
        self.kind
    }

    pub fn context(&self) -> Option<&SmbPath> {
        self.context.as_ref()
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyState {
    Ready,
    Signalled,
}

struct KeyInner {
    state: KeyState,
    events: Vec<WatchEvent>,
    /// Index into `events` of the youngest coalesceable modify per child.
    last_modify: HashMap<SmbPath, usize>,
}

/// Token for one active watch registration.
///
/// All state sits behind a single per-key mutex; `signal_event`,
/// `poll_events` and `reset` contend only within one key.
pub struct SmbWatchKey {
    path: SmbPath,
    kinds: HashSet<WatchEventKind>,
    queue: Arc<ServiceQueue>,
    poller: Weak<StandardSmbPoller>,
    inner: Mutex<KeyInner>,
}

impl SmbWatchKey {
    pub(crate) fn new(
        path: SmbPath,
        kinds: HashSet<WatchEventKind>,
        queue: Arc<ServiceQueue>,
        poller: Weak<StandardSmbPoller>,
    ) -> Arc<Self> {
        Arc::new(Self {
            path,
            kinds,
            queue,
            poller,
            inner: Mutex::new(KeyInner {
                state: KeyState::Ready,
                events: Vec::new(),
                last_modify: HashMap::new(),
            }),
        })
    }

    /// The watched path.
    pub fn path(&self) -> &SmbPath {
        &self.path
    }

    /// The kinds this registration asked for.
    pub fn kinds(&self) -> &HashSet<WatchEventKind> {
        &self.kinds
    }

    pub fn is_valid(&self) -> bool {
        true
    }

    /// Drains the buffered events, resetting the coalescing state.
    pub fn poll_events(&self) -> Vec<WatchEvent> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.last_modify.clear();
        std::mem::take(&mut inner.events)
    }

    /// Rearms the key: back to ready when drained, re-queued while events
    /// remain.
    pub fn reset(self: &Arc<Self>) -> bool {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.state == KeyState::Signalled {
            if inner.events.is_empty() {
                inner.state = KeyState::Ready;
            } else {
                self.queue.enqueue(Arc::clone(self));
            }
        }
        self.is_valid()
    }

    /// Withdraws this registration from the poller.
    pub fn cancel(self: &Arc<Self>) -> Result<()> {
        match self.poller.upgrade() {
            Some(poller) => poller.cancel(self),
            None => Ok(()),
        }
    }

    /// Queues one occurrence of `kind` on `context`. Pollers call this;
    /// it is public so alternative event sources can feed a key.
    ///
    /// Coalescing, in order: a tail event of the same kind and context (or
    /// a tail overflow) absorbs the occurrence; a buffered modify for the
    /// same child absorbs a repeated modify; a full buffer collapses into
    /// a single overflow event. Appending transitions the key from ready
    /// to signalled and enqueues it with the watch service.
    pub fn signal_event(self: &Arc<Self>, kind: WatchEventKind, context: Option<SmbPath>) {
        let mut kind = kind;
        let mut context = context;
        let mut modify = kind == WatchEventKind::Modify;

        let mut guard = self.inner.lock().expect("lock poisoned");
        let inner = &mut *guard;
        if let Some(last) = inner.events.last_mut() {
            if last.kind == WatchEventKind::Overflow
                || (kind == last.kind && context == last.context)
            {
                last.count += 1;
                return;
            }

            if modify {
                let buffered = context
                    .as_ref()
                    .and_then(|child| inner.last_modify.get(child).copied());
                if let Some(index) = buffered {
                    inner.events[index].count += 1;
                    return;
                }
            } else if let Some(child) = context.as_ref() {
                inner.last_modify.remove(child);
            }

            if inner.events.len() >= MAX_EVENT_LIST_SIZE {
                kind = WatchEventKind::Overflow;
                modify = false;
                context = None;
            }
        }

        if kind == WatchEventKind::Overflow {
            inner.events.clear();
            inner.last_modify.clear();
        }
        if modify {
            if let Some(child) = context.clone() {
                let index = inner.events.len();
                inner.last_modify.insert(child, index);
            }
        }
        inner.events.push(WatchEvent {
            kind,
            context,
            count: 1,
        });

        if inner.state == KeyState::Ready {
            inner.state = KeyState::Signalled;
            self.queue.enqueue(Arc::clone(self));
        }
    }
}

impl fmt::Debug for SmbWatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().expect("lock poisoned");
        f.debug_struct("SmbWatchKey")
            .field("path", &self.path)
            .field("kinds", &self.kinds)
            .field("state", &inner.state)
            .field("events", &inner.events.len())
            .finish()
    }
}
