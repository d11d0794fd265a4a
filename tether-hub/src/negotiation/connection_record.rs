use crate::error::BufferExhausted;
use crate::negotiation::{CandidateBuffer, NegotiationState, Step};
use crate::transport::{DataChannel, Transport};
use futures::future::AbortHandle;
use std::collections::VecDeque;
use std::sync::Arc;
use tether_core::{IceCandidate, RemoteId};

/// What happened to an inbound candidate.
#[derive(Debug, PartialEq, Eq)]
pub enum CandidateAdmission {
    /// Remote description is in place; the candidate goes to the transport.
    Queued,
    /// Held until the remote description arrives.
    Buffered { evicted: Option<IceCandidate> },
}

/// Everything the hub holds for one remote.
pub struct ConnectionRecord {
    remote_id: RemoteId,
    epoch: u64,
    state: NegotiationState,
    transport: Option<Arc<dyn Transport>>,
    data_channel: Option<Arc<dyn DataChannel>>,
    buffer: CandidateBuffer,
    awaiting_answer: bool,
    restarts_used: u32,
    steps: VecDeque<Step>,
    in_flight: Option<AbortHandle>,
    released: bool,
}

impl ConnectionRecord {
    /// A fresh record in `Idle` whose first step builds the transport.
    pub(crate) fn new(remote_id: RemoteId, epoch: u64, buffer_limit: usize) -> Self {
        Self {
            remote_id,
            epoch,
            state: NegotiationState::Idle,
            transport: None,
            data_channel: None,
            buffer: CandidateBuffer::new(buffer_limit),
            awaiting_answer: false,
            restarts_used: 0,
            steps: VecDeque::from([Step::Open]),
            in_flight: None,
            released: false,
        }
    }

    pub fn remote_id(&self) -> &RemoteId {
        &self.remote_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Move to `next` if the state machine allows it; returns the previous state.
    pub fn advance(&mut self, next: NegotiationState) -> Option<NegotiationState> {
        if !self.state.can_transition_to(next) {
            return None;
        }
        let previous = self.state;
        self.state = next;
        Some(previous)
    }

    pub fn buffered_candidates(&self) -> usize {
        self.buffer.len()
    }

    /// Early candidates lost to buffer overflow.
    pub fn dropped_candidates(&self) -> usize {
        self.buffer.dropped()
    }

    pub fn awaiting_answer(&self) -> bool {
        self.awaiting_answer
    }

    pub(crate) fn set_awaiting_answer(&mut self, awaiting: bool) {
        self.awaiting_answer = awaiting;
    }

    pub(crate) fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport.clone()
    }

    pub(crate) fn attach_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = Some(transport);
    }

    pub(crate) fn attach_data_channel(&mut self, channel: Arc<dyn DataChannel>) {
        self.data_channel = Some(channel);
    }

    pub(crate) fn detach_data_channel(&mut self) -> Option<Arc<dyn DataChannel>> {
        self.data_channel.take()
    }

    /// Spend one automatic connectivity restart if any are left.
    pub(crate) fn try_restart(&mut self, budget: u32) -> bool {
        if self.restarts_used >= budget {
            return false;
        }
        self.restarts_used += 1;
        true
    }

    pub(crate) fn reset_restarts(&mut self) {
        self.restarts_used = 0;
    }

    pub(crate) fn admit_candidate(&mut self, candidate: IceCandidate) -> CandidateAdmission {
        match self.buffer.append(candidate) {
            Ok(evicted) => CandidateAdmission::Buffered { evicted },
            Err(BufferExhausted(candidate)) => {
                self.steps.push_back(Step::AddCandidate(candidate));
                CandidateAdmission::Queued
            }
        }
    }

    /// Record that a remote description is in place and schedule every
    /// buffered candidate ahead of the remaining steps. Returns how many were drained.
    pub(crate) fn remote_description_applied(&mut self) -> usize {
        let drained = self.buffer.drain();
        let count = drained.len();
        for candidate in drained.into_iter().rev() {
            self.steps.push_front(Step::AddCandidate(candidate));
        }
        count
    }

    pub(crate) fn push_step(&mut self, step: Step) {
        self.steps.push_back(step);
    }

    pub(crate) fn push_front_step(&mut self, step: Step) {
        self.steps.push_front(step);
    }

    /// Next step to start, unless one is still running.
    pub(crate) fn take_next_step(&mut self) -> Option<Step> {
        if self.in_flight.is_some() {
            return None;
        }
        self.steps.pop_front()
    }

    pub(crate) fn set_in_flight(&mut self, handle: AbortHandle) {
        self.in_flight = Some(handle);
    }

    pub(crate) fn step_finished(&mut self) {
        self.in_flight = None;
    }

    /// Cancel pending work and hand out the native handles for closing.
    /// Returns `None` when the record was already released.
    pub(crate) fn release(
        &mut self,
    ) -> Option<(Option<Arc<dyn Transport>>, Option<Arc<dyn DataChannel>>)> {
        if self.released {
            return None;
        }
        self.released = true;

        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.steps.clear();
        self.buffer.drain();

        Some((self.transport.take(), self.data_channel.take()))
    }
}
