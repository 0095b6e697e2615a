//! FIFO gate around the link.
//!
//! Callers take a ticket and are let through strictly in ticket order, one
//! at a time. A plain `Mutex` gives exclusion but no ordering guarantee.

use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::trace;

#[derive(Debug, Default)]
struct Tickets {
    next: u64,
    serving: u64,
}

#[derive(Debug)]
pub(crate) struct Turnstile<T> {
    tickets: Mutex<Tickets>,
    turn_changed: Condvar,
    inner: Mutex<T>,
}

impl<T> Turnstile<T> {
    pub(crate) fn new(inner: T) -> Self {
        Self {
            tickets: Mutex::new(Tickets::default()),
            turn_changed: Condvar::new(),
            inner: Mutex::new(inner),
        }
    }

    /// Block until every earlier caller has left, then enter.
    pub(crate) fn enter(&self) -> Turn<'_, T> {
        let mut tickets = self.tickets.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = tickets.next;
        tickets.next += 1;
        while tickets.serving != ticket {
            tickets = self
                .turn_changed
                .wait(tickets)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(tickets);
        trace!(ticket, "entered turnstile");

        // Waits at most for the previous holder to finish dropping its turn.
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Turn { gate: self, guard }
    }

    /// Exclusive access without queueing; `&mut self` proves no one waits.
    pub(crate) fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn leave(&self) {
        let mut tickets = self.tickets.lock().unwrap_or_else(PoisonError::into_inner);
        tickets.serving += 1;
        drop(tickets);
        self.turn_changed.notify_all();
    }
}

/// Exclusive access to the inner value until dropped.
pub(crate) struct Turn<'a, T> {
    gate: &'a Turnstile<T>,
    guard: MutexGuard<'a, T>,
}

impl<T> Deref for Turn<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for Turn<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for Turn<'_, T> {
    fn drop(&mut self) {
        self.gate.leave();
    }
}
