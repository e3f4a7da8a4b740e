/// Fetch lifecycle and stale-response guarding
///
/// Every view moves through the same four states:
///
/// ```text
/// Idle ──begin──▶ Loading ──finish(ok)──▶ Loaded ──begin──▶ Loading ...
///                    │
///                    └──finish(err)──▶ Error ──(user action) begin──▶ Loading
/// ```
///
/// # Sequencing
///
/// `begin()` hands out a [`FetchTicket`] carrying a monotonically increasing
/// sequence number. A response is applied only if its ticket is the most
/// recently issued one; anything older is [`Delivery::Superseded`] and must
/// be dropped without touching view state. Once a view is detached (the
/// consumer went away) every response is [`Delivery::Detached`].

use log::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Banner text for the failed fetch
    Error(String),
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Proof that a response belongs to a particular request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket {
    sequence: u64,
}

impl FetchTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// What a caller may do with a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Newest request; apply it
    Current,
    /// A newer request has been issued since; drop it
    Superseded,
    /// The view is gone; drop it
    Detached,
}

#[derive(Debug, Clone, Default)]
pub struct FetchTracker {
    state: FetchState,
    /// Sequence of the most recently issued ticket (0 = none yet)
    issued: u64,
    detached: bool,
}

impl FetchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn latest_sequence(&self) -> u64 {
        self.issued
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Start a new request; any earlier ticket becomes stale
    pub fn begin(&mut self) -> FetchTicket {
        self.issued += 1;
        self.state = FetchState::Loading;
        debug!("fetch #{} started", self.issued);
        FetchTicket { sequence: self.issued }
    }

    pub fn check(&self, ticket: FetchTicket) -> Delivery {
        if self.detached {
            Delivery::Detached
        } else if ticket.sequence == self.issued {
            Delivery::Current
        } else {
            Delivery::Superseded
        }
    }

    /// Record the outcome of a request.
    ///
    /// Returns the delivery verdict; state only changes for `Current`.
    pub fn finish<T, E: std::fmt::Display>(&mut self, ticket: FetchTicket, outcome: &Result<T, E>) -> Delivery {
        let delivery = self.check(ticket);
        match delivery {
            Delivery::Current => {
                self.state = match outcome {
                    Ok(_) => FetchState::Loaded,
                    Err(err) => FetchState::Error(err.to_string()),
                };
                debug!("fetch #{} applied", ticket.sequence);
            }
            Delivery::Superseded => {
                warn!(
                    "dropping response for fetch #{} (latest is #{})",
                    ticket.sequence, self.issued
                );
            }
            Delivery::Detached => {
                warn!("dropping response for fetch #{}: view detached", ticket.sequence);
            }
        }
        delivery
    }

    /// The consumer went away; ignore every later response
    pub fn detach(&mut self) {
        self.detached = true;
    }
}
