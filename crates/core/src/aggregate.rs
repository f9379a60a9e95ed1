//! Aggregate trait for event-sourced state.

/// Event-sourced aggregate.
///
/// State is never mutated directly: it is rebuilt by applying recorded events,
/// in recording order, on top of an initial state.
pub trait Aggregate {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Event type folded into this aggregate.
    type Event;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Number of events applied so far.
    fn version(&self) -> u64;

    /// Evolve in-memory state from a single event.
    ///
    /// Implementations must stay deterministic and bump `version()` by one per
    /// applied event.
    fn apply(&mut self, event: &Self::Event);
}

/// Apply `events` to `aggregate` in iteration order and return it.
pub fn replay<'a, A, I>(mut aggregate: A, events: I) -> A
where
    A: Aggregate,
    A::Event: 'a,
    I: IntoIterator<Item = &'a A::Event>,
{
    for event in events {
        aggregate.apply(event);
    }
    aggregate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter {
        id: u8,
        total: i64,
        version: u64,
    }

    impl Aggregate for Counter {
        type Id = u8;
        type Event = i64;

        fn id(&self) -> &u8 {
            &self.id
        }

        fn version(&self) -> u64 {
            self.version
        }

        fn apply(&mut self, event: &i64) {
            self.total += event;
            self.version += 1;
        }
    }

    #[test]
    fn replay_applies_every_event_in_order() {
        let start = Counter { id: 1, total: 10, version: 0 };
        let folded = replay(start, &[5, -3, 2]);
        assert_eq!(folded.total, 14);
        assert_eq!(folded.version(), 3);
        assert_eq!(*folded.id(), 1);
    }

    #[test]
    fn replay_of_nothing_keeps_initial_state() {
        let folded = replay(Counter { id: 1, total: 7, version: 0 }, &[]);
        assert_eq!(folded.total, 7);
        assert_eq!(folded.version(), 0);
    }
}
