//! Idempotent-producer state (spec §3): the producer id/epoch assigned by
//! `InitProducerId`, per-partition sequence counters, and the round-robin
//! cursor used when a message has neither an explicit partition nor a key.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ProducerState {
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub initialized: bool,
    sequences: HashMap<(String, i32), u32>,
    round_robin: HashMap<String, u32>,
}

impl ProducerState {
    /// The first sequence number the next batch to `(topic,partition)`
    /// should carry, without advancing the counter (spec §3 invariant,
    /// §4.7.3 "only on success").
    pub fn peek_first_sequence(&self, topic: &str, partition: i32) -> u32 {
        self.sequences.get(&(topic.to_string(), partition)).copied().unwrap_or(0)
    }

    /// Advances `(topic,partition)`'s sequence by `count`, called only after
    /// the broker has accepted the batch (spec §4.7.3, P5).
    pub fn advance_sequence(&mut self, topic: &str, partition: i32, count: u32) {
        let entry = self.sequences.entry((topic.to_string(), partition)).or_insert(0);
        *entry += count;
    }

    /// Next round-robin partition index for `topic`, wrapping via the
    /// caller's modulo against the live partition count (spec §4.7.2).
    pub fn next_round_robin(&mut self, topic: &str) -> u32 {
        let entry = self.round_robin.entry(topic.to_string()).or_insert(0);
        let value = *entry;
        *entry = entry.wrapping_add(1);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_progression_matches_p5() {
        let mut state = ProducerState::default();
        let mut first_sequences = Vec::new();
        for size in [3u32, 2, 4] {
            first_sequences.push(state.peek_first_sequence("T", 0));
            state.advance_sequence("T", 0, size);
        }
        assert_eq!(first_sequences, vec![0, 3, 5]);
        assert_eq!(state.peek_first_sequence("T", 0), 9);
    }

    #[test]
    fn round_robin_wraps_per_topic_independently() {
        let mut state = ProducerState::default();
        assert_eq!(state.next_round_robin("a"), 0);
        assert_eq!(state.next_round_robin("a"), 1);
        assert_eq!(state.next_round_robin("b"), 0);
    }
}
