use crate::config::{HubConfig, NegotiationRole};
use crate::error::NegotiationError;
use crate::hub::{HubCommand, HubContext, HubEvent, HubHandle, HubObserver};
use crate::negotiation::{
    CandidateAdmission, ConnectionRecord, LifecycleManager, NegotiationState, RemovalReason,
    Step, StepDone, StepKind, StepOutput, StepRunner,
};
use crate::signaling::{IceServerProvider, LocalIdentity, SignalingOutput, StaticIceServers};
use crate::transport::{
    ConnectivityState, TransportEvent, TransportEventKind, TransportFactory,
    WebRtcTransportFactory,
};
use futures::future::{AbortHandle, Abortable, BoxFuture};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tether_core::{
    IceCandidate, InboundSignal, OutboundSignal, RemoteId, SdpKind, SessionDescription,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Work the event loop is waiting on.
enum Completion {
    Step(StepDone),
    Session {
        session_key: String,
        result: Result<RemoteId, NegotiationError>,
    },
}

/// Owns one connection record per remote and serializes everything that
/// touches them: signaling input, transport events and step completions.
pub struct Hub {
    config: HubConfig,
    observer: Box<dyn HubObserver>,
    records: HashMap<RemoteId, ConnectionRecord>,
    runner: StepRunner,
    context: HubContext,
    command_rx: mpsc::Receiver<HubCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
    next_epoch: u64,
}

impl Hub {
    pub fn new(
        config: HubConfig,
        observer: Box<dyn HubObserver>,
        signaling: Arc<dyn SignalingOutput>,
        identity: LocalIdentity,
    ) -> (Self, HubHandle) {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (transport_tx, transport_rx) = mpsc::channel(config.transport_event_capacity.max(1));

        let lifecycle = LifecycleManager::new(
            Arc::new(WebRtcTransportFactory::default()),
            Arc::new(StaticIceServers::default()),
            transport_tx,
        );
        let runner = StepRunner::new(&config, lifecycle, signaling, identity);
        let context = HubContext::default();

        let hub = Self {
            config,
            observer,
            records: HashMap::new(),
            runner,
            context: context.clone(),
            command_rx,
            transport_rx,
            in_flight: FuturesUnordered::new(),
            next_epoch: 0,
        };

        (hub, HubHandle::new(command_tx, context))
    }

    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.runner.lifecycle.set_factory(factory);
        self
    }

    pub fn with_ice_servers(mut self, ice_servers: Arc<dyn IceServerProvider>) -> Self {
        self.runner.lifecycle.set_ice_servers(ice_servers);
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("Hub event loop started ({:?} role)", self.config.role);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(HubCommand::Shutdown) => {
                            info!("Shutdown requested");
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down hub.");
                            break;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_transport_event(e).await,
                        None => {
                            warn!("Transport channel closed unexpectedly");
                            break;
                        }
                    }
                }

                Some(done) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.handle_completion(done).await;
                }
            }
        }

        self.shutdown().await;
        info!("Hub event loop finished");
    }

    async fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Signal(signal) => self.handle_signal(signal).await,
            HubCommand::CreateSession { session_key } => self.create_session(session_key),
            HubCommand::Shutdown => {}
        }
    }

    async fn handle_signal(&mut self, signal: InboundSignal) {
        match signal {
            InboundSignal::SessionError { message } => {
                error!("Session error from signaling: {}", message);
                self.notify(HubEvent::SessionError { message }).await;
            }
            InboundSignal::CounterJoined { counter_id } => self.on_join(counter_id).await,
            InboundSignal::CounterLeft { counter_id } => {
                if !self.remove(&counter_id, RemovalReason::Left).await {
                    debug!("Leave for unknown remote {}", counter_id);
                }
            }
            InboundSignal::Offer { from, offer } => self.on_offer(from, offer).await,
            InboundSignal::Answer { from, answer } => self.on_answer(from, answer).await,
            InboundSignal::IceCandidate { from, candidate } => {
                self.on_candidate(from, candidate).await
            }
        }
    }

    async fn on_join(&mut self, remote_id: RemoteId) {
        info!("Remote {} joined", remote_id);

        if self.records.contains_key(&remote_id) {
            self.remove(&remote_id, RemovalReason::Replaced).await;
        }

        self.next_epoch += 1;
        let mut record = ConnectionRecord::new(
            remote_id.clone(),
            self.next_epoch,
            self.config.candidate_buffer_limit,
        );
        if self.config.role == NegotiationRole::Offerer {
            record.push_step(Step::Offer);
        }
        self.records.insert(remote_id.clone(), record);
        self.context.set_state(&remote_id, NegotiationState::Idle);

        self.notify(HubEvent::RemoteJoined {
            remote_id: remote_id.clone(),
        })
        .await;
        self.pump(&remote_id);
    }

    async fn on_offer(&mut self, remote_id: RemoteId, offer: SessionDescription) {
        let Some(state) = self.records.get(&remote_id).map(ConnectionRecord::state) else {
            warn!("Offer from unknown remote {}; ignoring", remote_id);
            return;
        };

        if self.config.role == NegotiationRole::Offerer {
            self.reject(remote_id, "offer", "hub is the offering side".to_owned())
                .await;
            return;
        }
        if offer.kind != SdpKind::Offer {
            let err = NegotiationError::Description {
                stage: "apply offer",
                reason: format!("expected an offer, got {:?}", offer.kind),
            };
            self.fail(&remote_id, err).await;
            return;
        }
        if state != NegotiationState::Idle {
            self.reject(remote_id, "offer", format!("negotiation already {state}"))
                .await;
            return;
        }

        if let Some(record) = self.records.get_mut(&remote_id) {
            record.push_step(Step::ApplyRemote(offer));
            record.push_step(Step::Answer);
        }
        self.transition(&remote_id, NegotiationState::OfferReceived)
            .await;
        self.pump(&remote_id);
    }

    async fn on_answer(&mut self, remote_id: RemoteId, answer: SessionDescription) {
        let Some(record) = self.records.get_mut(&remote_id) else {
            warn!("Answer from unknown remote {}; ignoring", remote_id);
            return;
        };

        if !record.awaiting_answer() {
            let reason = format!("no offer outstanding ({})", record.state());
            self.reject(remote_id, "answer", reason).await;
            return;
        }
        if answer.kind != SdpKind::Answer {
            let err = NegotiationError::Description {
                stage: "apply answer",
                reason: format!("expected an answer, got {:?}", answer.kind),
            };
            self.fail(&remote_id, err).await;
            return;
        }

        record.set_awaiting_answer(false);
        record.push_step(Step::ApplyRemote(answer));
        self.pump(&remote_id);
    }

    async fn on_candidate(&mut self, remote_id: RemoteId, candidate: IceCandidate) {
        let Some(record) = self.records.get_mut(&remote_id) else {
            debug!("Candidate from unknown remote {}; discarding", remote_id);
            return;
        };

        match record.admit_candidate(candidate) {
            CandidateAdmission::Queued => self.pump(&remote_id),
            CandidateAdmission::Buffered { evicted: None } => {
                debug!(
                    "Buffered candidate for {} ({} pending)",
                    remote_id,
                    record.buffered_candidates()
                );
            }
            CandidateAdmission::Buffered { evicted: Some(_) } => {
                warn!(
                    "Candidate buffer for {} is full; dropped the oldest candidate ({} so far)",
                    remote_id,
                    record.dropped_candidates()
                );
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let TransportEvent {
            remote_id,
            epoch,
            kind,
        } = event;

        let current = self.records.get(&remote_id).map(ConnectionRecord::epoch);
        if current != Some(epoch) {
            debug!("Dropping stale transport event for {}", remote_id);
            return;
        }

        match kind {
            TransportEventKind::ConnectivityChanged(state) => {
                self.on_connectivity(remote_id, state).await
            }

            TransportEventKind::DataChannelOpen(channel) => {
                let label = channel.label();
                info!("Data channel '{}' open for {}", label, remote_id);
                if let Some(record) = self.records.get_mut(&remote_id) {
                    record.attach_data_channel(channel.clone());
                }
                self.context.attach_channel(&remote_id, channel);
                self.notify(HubEvent::DataChannelOpen { remote_id, label })
                    .await;
            }

            TransportEventKind::DataChannelClosed => {
                let had_channel = self
                    .records
                    .get_mut(&remote_id)
                    .and_then(ConnectionRecord::detach_data_channel)
                    .is_some();
                self.context.detach_channel(&remote_id);
                if had_channel {
                    info!("Data channel closed for {}", remote_id);
                    self.notify(HubEvent::DataChannelClosed { remote_id }).await;
                }
            }

            TransportEventKind::Message(data) => {
                self.notify(HubEvent::Message { remote_id, data }).await;
            }

            TransportEventKind::CandidateGenerated(candidate) => {
                if let Some(record) = self.records.get_mut(&remote_id) {
                    record.push_step(Step::Forward(candidate));
                }
                self.pump(&remote_id);
            }
        }
    }

    async fn on_connectivity(&mut self, remote_id: RemoteId, state: ConnectivityState) {
        debug!("Connectivity for {} is now {:?}", remote_id, state);

        match state {
            ConnectivityState::New | ConnectivityState::Checking => {}

            ConnectivityState::Connected | ConnectivityState::Completed => {
                if let Some(record) = self.records.get_mut(&remote_id) {
                    record.reset_restarts();
                }
                self.transition(&remote_id, NegotiationState::Connected)
                    .await;
            }

            ConnectivityState::Disconnected => {
                self.transition(&remote_id, NegotiationState::Degraded)
                    .await;
            }

            ConnectivityState::Failed => {
                let budget = self.config.max_connectivity_restarts;
                let restarted = match self.records.get_mut(&remote_id) {
                    Some(record) => record.try_restart(budget),
                    None => return,
                };

                if !restarted {
                    warn!("Connectivity to {} failed again; closing", remote_id);
                    self.remove(&remote_id, RemovalReason::ConnectivityLost)
                        .await;
                    return;
                }

                warn!("Connectivity to {} failed; restarting", remote_id);
                self.transition(&remote_id, NegotiationState::Degraded)
                    .await;
                if let Some(record) = self.records.get_mut(&remote_id) {
                    record.push_step(Step::Restart);
                }
                self.pump(&remote_id);
            }

            ConnectivityState::Closed => {
                info!("Transport for {} closed", remote_id);
                self.remove(&remote_id, RemovalReason::TransportClosed)
                    .await;
            }
        }
    }

    async fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Step(done) => self.handle_step_done(done).await,
            Completion::Session {
                session_key,
                result,
            } => match result {
                Ok(hub_id) => {
                    info!("Session '{}' announced as {}", session_key, hub_id);
                }
                Err(e) => {
                    error!("Could not announce session '{}': {}", session_key, e);
                    self.notify(HubEvent::SessionError {
                        message: e.to_string(),
                    })
                    .await;
                }
            },
        }
    }

    async fn handle_step_done(&mut self, done: StepDone) {
        let StepDone {
            remote_id,
            epoch,
            kind,
            result,
        } = done;

        let Ok(result) = result else {
            debug!("{:?} step for {} was cancelled", kind, remote_id);
            return;
        };
        let current = self
            .records
            .get_mut(&remote_id)
            .filter(|record| record.epoch() == epoch);
        let Some(record) = current else {
            debug!("{:?} step for {} outlived its record", kind, remote_id);
            // Finished just before the abort landed; nobody else will close it.
            if let Ok(StepOutput::Opened(transport)) = result {
                tokio::spawn(async move {
                    let _ = transport.close().await;
                });
            }
            return;
        };
        record.step_finished();

        match result {
            Ok(output) => self.apply_output(&remote_id, output).await,
            Err(e) => match kind {
                StepKind::AddCandidate | StepKind::Forward => {
                    warn!("{:?} step for {} failed: {}", kind, remote_id, e);
                }
                StepKind::Open | StepKind::OpenDataChannel => {
                    error!("Transport for {} unavailable: {}", remote_id, e);
                    self.remove(&remote_id, RemovalReason::TransportUnavailable(e))
                        .await;
                }
                StepKind::Restart => {
                    error!("Connectivity restart for {} failed: {}", remote_id, e);
                    self.remove(&remote_id, RemovalReason::ConnectivityLost)
                        .await;
                }
                StepKind::ApplyRemote | StepKind::Offer | StepKind::Answer => {
                    self.fail(&remote_id, e).await;
                }
            },
        }

        self.pump(&remote_id);
    }

    async fn apply_output(&mut self, remote_id: &RemoteId, output: StepOutput) {
        let Some(record) = self.records.get_mut(remote_id) else {
            return;
        };

        match output {
            StepOutput::Opened(transport) => {
                debug!("Transport ready for {}", remote_id);
                record.attach_transport(transport);
                // The record owns the transport before the channel is requested.
                if self.config.role == NegotiationRole::Offerer {
                    record.push_front_step(Step::OpenDataChannel);
                }
            }
            StepOutput::RemoteApplied(kind) => {
                let drained = record.remote_description_applied();
                if drained > 0 {
                    debug!("Applying {} buffered candidate(s) for {}", drained, remote_id);
                }
                if kind == SdpKind::Answer {
                    self.transition(remote_id, NegotiationState::DescriptionSet)
                        .await;
                }
            }
            StepOutput::LocalSent(SdpKind::Answer) => {
                self.transition(remote_id, NegotiationState::DescriptionSet)
                    .await;
            }
            StepOutput::LocalSent(SdpKind::Offer) => {
                record.set_awaiting_answer(true);
                self.transition(remote_id, NegotiationState::OfferCreated)
                    .await;
            }
            StepOutput::Restarted { offered } => {
                if offered {
                    record.set_awaiting_answer(true);
                }
            }
            StepOutput::DataChannelRequested
            | StepOutput::CandidateApplied
            | StepOutput::Forwarded => {}
        }
    }

    /// Start the record's next step unless one is already running.
    fn pump(&mut self, remote_id: &RemoteId) {
        let Some(record) = self.records.get_mut(remote_id) else {
            return;
        };
        let Some(step) = record.take_next_step() else {
            return;
        };

        let epoch = record.epoch();
        let kind = step.kind();
        let work = self
            .runner
            .run(remote_id.clone(), epoch, record.transport(), step);

        let (handle, registration) = AbortHandle::new_pair();
        record.set_in_flight(handle);

        let remote_id = remote_id.clone();
        self.in_flight.push(
            async move {
                let result = Abortable::new(work, registration).await;
                Completion::Step(StepDone {
                    remote_id,
                    epoch,
                    kind,
                    result,
                })
            }
            .boxed(),
        );
    }

    async fn transition(&mut self, remote_id: &RemoteId, next: NegotiationState) -> bool {
        let Some(record) = self.records.get_mut(remote_id) else {
            return false;
        };
        let Some(from) = record.advance(next) else {
            debug!(
                "Ignoring {} -> {} for {}",
                record.state(),
                next,
                remote_id
            );
            return false;
        };

        info!("{}: {} -> {}", remote_id, from, next);
        self.context.set_state(remote_id, next);
        self.notify(HubEvent::StateChanged {
            remote_id: remote_id.clone(),
            from,
            to: next,
        })
        .await;
        true
    }

    async fn fail(&mut self, remote_id: &RemoteId, err: NegotiationError) {
        error!("Negotiation with {} failed: {}", remote_id, err);
        self.transition(remote_id, NegotiationState::Failed).await;
        self.remove(remote_id, RemovalReason::Failed(err)).await;
    }

    async fn reject(&mut self, remote_id: RemoteId, event: &'static str, reason: String) {
        warn!("Rejected {} from {}: {}", event, remote_id, reason);
        self.notify(HubEvent::SignalRejected {
            remote_id,
            event,
            reason,
        })
        .await;
    }

    /// Drop the record and release its transport. Returns `false` when
    /// there was nothing to remove.
    async fn remove(&mut self, remote_id: &RemoteId, reason: RemovalReason) -> bool {
        if !self.records.contains_key(remote_id) {
            return false;
        }

        self.transition(remote_id, NegotiationState::Closed).await;

        let Some(mut record) = self.records.remove(remote_id) else {
            return false;
        };
        self.runner.lifecycle.release(&mut record);
        self.context.forget(remote_id);

        info!("Removed {} ({})", remote_id, reason);
        self.notify(HubEvent::RemoteRemoved {
            remote_id: remote_id.clone(),
            reason,
        })
        .await;
        true
    }

    fn create_session(&mut self, session_key: String) {
        let identity = self.runner.identity.clone();
        let signaling = self.runner.signaling.clone();
        let timeout = self.runner.identity_timeout;

        self.in_flight.push(
            async move {
                let result = match identity.wait(timeout).await {
                    Ok(hub_id) => {
                        signaling
                            .send(OutboundSignal::CreateSession {
                                session_key: session_key.clone(),
                                hub_id: hub_id.clone(),
                            })
                            .await;
                        Ok(hub_id)
                    }
                    Err(e) => Err(e),
                };
                Completion::Session {
                    session_key,
                    result,
                }
            }
            .boxed(),
        );
    }

    async fn shutdown(&mut self) {
        let remotes: Vec<RemoteId> = self.records.keys().cloned().collect();
        for remote_id in remotes {
            self.remove(&remote_id, RemovalReason::Shutdown).await;
        }

        // Cancelled steps resolve at once; finished ones may still hold a transport.
        while let Some(done) = self.in_flight.next().await {
            self.handle_completion(done).await;
        }
    }

    async fn notify(&mut self, event: HubEvent) {
        self.observer.on_event(&self.context, event).await;
    }
}
