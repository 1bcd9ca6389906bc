//! Optimistic transitions as an explicit two-phase commit: phase one produces
//! a local, revocable proposed state; phase two is the authoritative write
//! that either commits it or restores the prior state. No transition is ever
//! silently dropped.

/// A transition that has been validated locally but not yet persisted.
#[derive(Debug, Clone)]
pub struct PendingTransition<T> {
    prior: T,
    proposed: T,
}

/// The final word on a pending transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Committed(T),
    RolledBack(T),
}

impl<T> PendingTransition<T> {
    pub fn new(prior: T, proposed: T) -> Self {
        PendingTransition { prior, proposed }
    }

    pub fn prior(&self) -> &T {
        &self.prior
    }

    pub fn proposed(&self) -> &T {
        &self.proposed
    }

    /// The authoritative write succeeded: the proposed state stands.
    pub fn commit(self) -> T {
        self.proposed
    }

    /// The authoritative write was refused: the prior state stands.
    pub fn roll_back(self) -> T {
        self.prior
    }

    pub fn resolve(self, accepted: bool) -> Resolution<T> {
        if accepted {
            Resolution::Committed(self.proposed)
        } else {
            Resolution::RolledBack(self.prior)
        }
    }
}

impl<T> Resolution<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Resolution::Committed(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Resolution::Committed(value) | Resolution::RolledBack(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_commits_or_restores() {
        let pending = PendingTransition::new("Upcoming", "Cancelled");
        assert_eq!(pending.clone().resolve(true), Resolution::Committed("Cancelled"));
        assert_eq!(pending.resolve(false), Resolution::RolledBack("Upcoming"));
    }
}
