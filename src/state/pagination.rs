/// Cursor bookkeeping for one paginated listing.
///
/// Every request gets a ticket stamped with the track generation. Resetting
/// the track (conversation switch) bumps the generation, so responses to
/// tickets issued earlier are recognised as stale and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTrack {
    next: Option<String>,
    previous: Option<String>,
    generation: u64,
    in_flight: bool,
}

/// Proof that a request was issued on a [`PageTrack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    pub generation: u64,
    pub cursor: Option<String>,
}

impl PageTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Forgets cursors and invalidates every outstanding ticket.
    pub fn reset(&mut self) {
        self.next = None;
        self.previous = None;
        self.in_flight = false;
        self.generation += 1;
    }

    /// Starts a request for `cursor`; `None` when one is already in flight.
    pub fn begin(&mut self, cursor: Option<String>) -> Option<PageTicket> {
        if self.in_flight {
            return None;
        }
        self.in_flight = true;
        Some(PageTicket { generation: self.generation, cursor })
    }

    pub fn is_current(&self, ticket: &PageTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Records the cursors of a successful response. Returns `false` (and
    /// changes nothing) if the ticket is stale.
    pub fn complete(
        &mut self,
        ticket: &PageTicket,
        next: Option<String>,
        previous: Option<String>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = false;
        self.next = next;
        self.previous = previous;
        true
    }

    /// Releases the in-flight flag after a failed request.
    pub fn fail(&mut self, ticket: &PageTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = false;
        true
    }
}
