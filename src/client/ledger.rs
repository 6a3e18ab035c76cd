use tokio::sync::oneshot;

use crate::protocol::{Command, Method};
use crate::{Error, Result};

/// What a settled request receives: the still-encoded response payload, or
/// the reason it failed.
pub(crate) type Reply = Result<Option<String>>;

/// Opaque handle identifying one ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Ticket(u64);

/// One call awaiting its response.
///
/// `reply` is `None` once the caller gave up on a sent entry. The entry then
/// stays in place so the late response still lines up with it.
struct PendingRequest {
    // ---
    ticket: Ticket,
    method: Method,
    frame: String,
    reply: Option<oneshot::Sender<Reply>>,
    sent: bool,
}

/// Tracks in-flight calls in submission order.
///
/// Responses carry no correlation id, only a method, so a response settles
/// the oldest *sent* entry of its method. Entries are only ever appended or
/// removed; their relative order never changes.
pub(crate) struct RequestLedger {
    // ---
    entries: Vec<PendingRequest>,
    next_ticket: u64,
}

impl RequestLedger {
    // ---

    /// Create an empty ledger
    pub fn new() -> Self {
        // ---
        Self {
            entries: Vec::new(),
            next_ticket: 0,
        }
    }

    /// Append an unsent entry for `command`.
    ///
    /// The command is encoded here so that a flush cannot fail on
    /// serialization. Returns the entry's ticket and the receiver that will
    /// be settled exactly once.
    pub fn enqueue(&mut self, command: Command) -> Result<(Ticket, oneshot::Receiver<Reply>)> {
        // ---
        let frame = command.encode()?;
        let (tx, rx) = oneshot::channel();

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;

        self.entries.push(PendingRequest {
            ticket,
            method: command.method,
            frame,
            reply: Some(tx),
            sent: false,
        });

        Ok((ticket, rx))
    }

    /// Send every unsent entry, in order, through `send`.
    ///
    /// Stops at the first send error; that entry and those after it stay
    /// unsent. Returns how many entries were sent.
    pub fn flush_unsent<F>(&mut self, mut send: F) -> Result<usize>
    where
        F: FnMut(String) -> Result<()>,
    {
        // ---
        let mut count = 0;

        for entry in self.entries.iter_mut().filter(|entry| !entry.sent) {
            send(entry.frame.clone())?;
            entry.sent = true;
            count += 1;
        }

        Ok(count)
    }

    /// Settle the oldest sent entry for `method` with `reply`.
    ///
    /// An expired entry in that position absorbs the response. Returns false
    /// (and drops `reply`) when no waiting caller received it.
    pub fn resolve(&mut self, method: Method, reply: Reply) -> bool {
        // ---
        let Some(index) = self
            .entries
            .iter()
            .position(|entry| entry.sent && entry.method == method)
        else {
            return false;
        };

        match self.entries.remove(index).reply {
            Some(tx) => {
                // Ignore send failure: the caller stopped waiting.
                let _ = tx.send(reply);
                true
            }
            None => false,
        }
    }

    /// Fail every entry, sent or not, and empty the ledger.
    ///
    /// Returns how many waiting callers were rejected.
    pub fn reject_all<F>(&mut self, make_error: F) -> usize
    where
        F: Fn() -> Error,
    {
        // ---
        let mut count = 0;

        for tx in self.entries.drain(..).filter_map(|entry| entry.reply) {
            let _ = tx.send(Err(make_error()));
            count += 1;
        }

        count
    }

    /// Give up on an entry without settling it.
    ///
    /// An unsent entry is removed. A sent one is kept without its reply
    /// channel until its response arrives, so that response cannot settle a
    /// later call of the same method.
    pub fn expire(&mut self, ticket: Ticket) -> bool {
        // ---
        let Some(index) = self.entries.iter().position(|entry| entry.ticket == ticket) else {
            return false;
        };

        if self.entries[index].sent {
            self.entries[index].reply = None;
        } else {
            self.entries.remove(index);
        }
        true
    }

    /// Get the number of calls still waiting for a response
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.reply.is_some()).count()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
