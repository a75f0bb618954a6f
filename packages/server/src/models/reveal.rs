use serde::Serialize;

use super::player::PlayerId;

/// Which drip reveal a scheduler task is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealKind {
    Morning,
    /// Primary or runoff votes, whichever the phase says.
    Votes,
    EndGameVotes,
    Roles,
}

impl RevealKind {
    /// Whether the reveal ends with an explicit completion call.
    pub fn needs_completion(self) -> bool {
        !matches!(self, RevealKind::Votes)
    }
}

/// One item handed out by a drip reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revealed<T> {
    #[serde(flatten)]
    pub item: T,
    pub is_last: bool,
}

/// A materialized reveal order with a cursor.
///
/// The order is fixed when the reveal starts so that repeated view requests during
/// the drip always agree. The cursor only moves forward through [`RevealSequence::advance`]
/// and is only rewound by starting a new sequence.
#[derive(Debug, Clone, Default)]
pub struct RevealSequence {
    order: Vec<PlayerId>,
    cursor: usize,
    started: bool,
    complete: bool,
}

impl RevealSequence {
    pub fn start(&mut self, order: Vec<PlayerId>) {
        self.order = order;
        self.cursor = 0;
        self.started = true;
        self.complete = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns the id under the cursor and moves past it.
    pub fn advance(&mut self) -> Option<(PlayerId, bool)> {
        let id = *self.order.get(self.cursor)?;
        self.cursor += 1;
        Some((id, self.is_exhausted()))
    }

    /// Items shown so far, in reveal order.
    pub fn revealed(&self) -> &[PlayerId] {
        &self.order[..self.cursor]
    }

    pub fn order(&self) -> &[PlayerId] {
        &self.order
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_exhausted(&self) -> bool {
        self.started && self.cursor >= self.order.len()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Marks the sequence finished. Only valid once every item has been shown.
    pub fn mark_complete(&mut self) -> bool {
        if !self.is_exhausted() {
            return false;
        }
        self.complete = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_walks_the_order_once() {
        let mut seq = RevealSequence::default();
        seq.start(vec![3, 1, 2]);

        assert_eq!(seq.advance(), Some((3, false)));
        assert_eq!(seq.revealed(), &[3]);
        assert_eq!(seq.advance(), Some((1, false)));
        assert_eq!(seq.advance(), Some((2, true)));
        assert_eq!(seq.advance(), None);
        assert_eq!(seq.cursor(), 3);
        assert!(seq.is_exhausted());
    }

    #[test]
    fn completion_waits_for_exhaustion() {
        let mut seq = RevealSequence::default();
        assert!(!seq.mark_complete());

        seq.start(vec![7, 8]);
        seq.advance();
        assert!(!seq.mark_complete());
        assert!(!seq.is_complete());

        seq.advance();
        assert!(seq.mark_complete());
        assert!(seq.is_complete());
    }

    #[test]
    fn restarting_clears_completion() {
        let mut seq = RevealSequence::default();
        seq.start(vec![1]);
        seq.advance();
        seq.mark_complete();

        seq.start(vec![4, 5]);
        assert_eq!(seq.cursor(), 0);
        assert!(!seq.is_complete());
        assert!(seq.revealed().is_empty());
    }

    #[test]
    fn empty_sequence_is_immediately_exhausted_once_started() {
        let mut seq = RevealSequence::default();
        assert!(!seq.is_exhausted());
        seq.start(Vec::new());
        assert!(seq.is_exhausted());
        assert_eq!(seq.advance(), None);
    }
}
