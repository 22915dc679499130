//! Readiness gate
//!
//! One async mutex guards the shared bus together with the [`LinkState`].
//! The bus lives inside the lock, so no register access can happen without
//! holding it. A lock-free flag mirrors `state == Ready` for callers that
//! only want to peek.
//!
//! Ordering rules enforced by [`BusGuard::apply`]:
//! - the flag is cleared before any transition out of `Ready` is stored
//! - on entering `Ready` the generation is bumped first and the flag set last

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::link::{LinkEvent, LinkState};

struct Shared<B> {
    bus: B,
    state: LinkState,
}

/// Bus lock plus readiness signal shared by the sequencer and touch side
pub struct ReadinessGate<M: RawMutex, B> {
    shared: Mutex<M, Shared<B>>,
    ready: AtomicBool,
    generation: AtomicU32,
}

impl<M: RawMutex, B> ReadinessGate<M, B> {
    /// Gate around a bus, link uninitialized
    pub const fn new(bus: B) -> Self {
        Self {
            shared: Mutex::new(Shared {
                bus,
                state: LinkState::Uninitialized,
            }),
            ready: AtomicBool::new(false),
            generation: AtomicU32::new(0),
        }
    }

    /// Acquire exclusive access to the bus and link state
    pub async fn lock(&self) -> BusGuard<'_, M, B> {
        BusGuard {
            shared: self.shared.lock().await,
            ready: &self.ready,
            generation: &self.generation,
        }
    }

    /// Acquire the lock only if nobody holds it
    pub fn try_lock(&self) -> Option<BusGuard<'_, M, B>> {
        let shared = self.shared.try_lock().ok()?;
        Some(BusGuard {
            shared,
            ready: &self.ready,
            generation: &self.generation,
        })
    }

    /// Lock-free readiness check
    ///
    /// Never true before the Ready commit, false as soon as a suspend has
    /// been applied. Callers that act on the answer must recheck under the
    /// lock.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Number of times the link has reached Ready
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Exclusive access to the bus, released on drop
pub struct BusGuard<'a, M: RawMutex, B> {
    shared: MutexGuard<'a, M, Shared<B>>,
    ready: &'a AtomicBool,
    generation: &'a AtomicU32,
}

impl<M: RawMutex, B> BusGuard<'_, M, B> {
    /// The shared bus
    pub fn bus(&mut self) -> &mut B {
        &mut self.shared.bus
    }

    pub fn link_state(&self) -> LinkState {
        self.shared.state
    }

    pub fn is_ready(&self) -> bool {
        self.shared.state.is_ready()
    }

    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    /// Feed an event to the link state machine and publish the result
    pub fn apply(&mut self, event: LinkEvent) -> LinkState {
        let prev = self.shared.state;
        let next = prev.transition(event);

        if prev.is_ready() && !next.is_ready() {
            self.ready.store(false, Ordering::Release);
        }

        self.shared.state = next;

        if next.is_ready() && !prev.is_ready() {
            self.generation.fetch_add(1, Ordering::AcqRel);
            self.ready.store(true, Ordering::Release);
        }

        next
    }
}
