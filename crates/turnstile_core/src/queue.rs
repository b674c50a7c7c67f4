//! # Fair Request Queue
//!
//! One FIFO queue holds every pending request, readers and writers alike.
//! Each request gets a ticket with a monotonically increasing sequence
//! number, so the queue is always sorted by arrival.
//!
//! ## Turn Rule
//!
//! ```text
//!   head                                  tail
//!    │                                     │
//!    ▼                                     ▼
//!   [R1] [R2] [R3] [W4] [R5] [R6] [W7] [R8]
//!   └──── batch ───┘  │   └─ wait for W4 ─┘
//!                     └─ waits for R1..R3 to finish
//! ```
//!
//! - A writer's turn comes only when it is at the head.
//! - A reader's turn comes when every ticket ahead of it is a reader, so the
//!   leading run of readers is admitted together.
//!
//! Turn is necessary but not sufficient for admission: the monitor also
//! checks compatibility with the current holders.

use std::collections::VecDeque;

use crate::actor::{ActorId, ActorKind};

/// A queued request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Ticket {
    /// Arrival order.
    pub(crate) seq: u64,
    /// Requested access.
    pub(crate) kind: ActorKind,
    /// Requesting actor.
    pub(crate) id: ActorId,
}

/// FIFO queue of pending requests, sorted by `seq`.
#[derive(Debug, Default)]
pub(crate) struct RequestQueue {
    tickets: VecDeque<Ticket>,
    next_seq: u64,
    waiting_writers: usize,
}

impl RequestQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a request and returns its sequence number.
    pub(crate) fn push(&mut self, kind: ActorKind, id: ActorId) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if kind == ActorKind::Writer {
            self.waiting_writers += 1;
        }
        self.tickets.push_back(Ticket { seq, kind, id });
        seq
    }

    /// Removes the ticket with `seq`. Returns the removed ticket, if any.
    pub(crate) fn remove(&mut self, seq: u64) -> Option<Ticket> {
        let index = self
            .tickets
            .binary_search_by_key(&seq, |ticket| ticket.seq)
            .ok()?;
        let ticket = self.tickets.remove(index)?;
        if ticket.kind == ActorKind::Writer {
            self.waiting_writers -= 1;
        }
        Some(ticket)
    }

    /// Returns true if the ticket with `seq` may be admitted by queue order.
    pub(crate) fn is_turn(&self, seq: u64) -> bool {
        for (index, ticket) in self.tickets.iter().enumerate() {
            if ticket.seq == seq {
                return ticket.kind == ActorKind::Reader || index == 0;
            }
            if ticket.kind == ActorKind::Writer {
                return false;
            }
        }
        false
    }

    /// Returns true if a request of `kind` arriving now would have its turn
    /// immediately.
    pub(crate) fn would_be_turn(&self, kind: ActorKind) -> bool {
        match kind {
            ActorKind::Reader => self.waiting_writers == 0,
            ActorKind::Writer => self.tickets.is_empty(),
        }
    }

    /// Returns true if `(kind, id)` has a pending ticket.
    pub(crate) fn contains(&self, kind: ActorKind, id: ActorId) -> bool {
        self.tickets
            .iter()
            .any(|ticket| ticket.kind == kind && ticket.id == id)
    }

    /// Kind of the request at the head of the queue.
    pub(crate) fn head_kind(&self) -> Option<ActorKind> {
        self.tickets.front().map(|ticket| ticket.kind)
    }

    /// Number of pending requests of `kind`.
    pub(crate) fn waiting(&self, kind: ActorKind) -> usize {
        match kind {
            ActorKind::Reader => self.tickets.len() - self.waiting_writers,
            ActorKind::Writer => self.waiting_writers,
        }
    }

    /// Total number of pending requests.
    pub(crate) fn len(&self) -> usize {
        self.tickets.len()
    }
}
