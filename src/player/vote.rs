use std::collections::HashSet;

use poise::serenity_prelude::UserId;

/// Votes needed out of `listeners`: a strict majority.
pub fn majority(listeners: usize) -> usize {
    listeners / 2 + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Passed,
    /// An earlier vote already passed for this track.
    AlreadyPassed,
    Pending {
        needed: usize,
        /// The voter had already voted for this track.
        already_voted: bool,
    },
}

/// Listeners who asked for something to happen to the current track.
#[derive(Debug, Default)]
pub struct VoteTally {
    voters: HashSet<UserId>,
    passed: bool,
}

impl VoteTally {
    /// Count `voter`'s vote against the current `listeners`.
    ///
    /// Voters who are no longer listening are dropped first. The vote passes
    /// on a majority, for a lone listener, or when the voter requested the
    /// track in the first place. Once passed, the tally stays spent until
    /// it is cleared for the next track.
    pub fn register(
        &mut self,
        voter: UserId,
        listeners: &[UserId],
        voter_is_requester: bool,
    ) -> VoteOutcome {
        if self.passed {
            return VoteOutcome::AlreadyPassed;
        }
        self.voters.retain(|user| listeners.contains(user));
        let already_voted = !self.voters.insert(voter);

        let needed = majority(listeners.len());
        if self.voters.len() >= needed || listeners.len() == 1 || voter_is_requester {
            self.passed = true;
            return VoteOutcome::Passed;
        }

        VoteOutcome::Pending {
            needed: needed - self.voters.len(),
            already_voted,
        }
    }

    pub fn clear(&mut self) {
        self.voters.clear();
        self.passed = false;
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.voters.len()
    }

    #[cfg(test)]
    pub fn contains(&self, user: UserId) -> bool {
        self.voters.contains(&user)
    }
}
