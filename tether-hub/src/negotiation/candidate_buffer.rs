use crate::error::BufferExhausted;
use std::collections::VecDeque;
use tether_core::IceCandidate;

/// Candidates that arrived before the remote description could take them.
///
/// Append-only until drained once; a drained buffer refuses further candidates,
/// which then go straight to the transport.
#[derive(Debug)]
pub struct CandidateBuffer {
    queue: VecDeque<IceCandidate>,
    limit: usize,
    exhausted: bool,
    dropped: usize,
}

impl CandidateBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            limit: limit.max(1),
            exhausted: false,
            dropped: 0,
        }
    }

    /// Queue a candidate. When the buffer is full the oldest one is evicted and returned.
    pub fn append(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<Option<IceCandidate>, BufferExhausted> {
        if self.exhausted {
            return Err(BufferExhausted(candidate));
        }

        let evicted = if self.queue.len() >= self.limit {
            self.dropped += 1;
            self.queue.pop_front()
        } else {
            None
        };
        self.queue.push_back(candidate);
        Ok(evicted)
    }

    /// Take every buffered candidate in arrival order and retire the buffer.
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        self.exhausted = true;
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Candidates lost to overflow.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
