use crate::config::HubConfig;
use crate::error::NegotiationError;
use crate::negotiation::LifecycleManager;
use crate::signaling::{LocalIdentity, SignalingOutput};
use crate::transport::Transport;
use futures::FutureExt;
use futures::future::{Aborted, BoxFuture};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{IceCandidate, OutboundSignal, RemoteId, SdpKind, SessionDescription};
use tracing::{debug, info};

/// One unit of transport work for a single remote.
///
/// A record runs its steps strictly one after another.
#[derive(Debug)]
pub(crate) enum Step {
    Open,
    OpenDataChannel,
    ApplyRemote(SessionDescription),
    Offer,
    Answer,
    AddCandidate(IceCandidate),
    Forward(IceCandidate),
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepKind {
    Open,
    OpenDataChannel,
    ApplyRemote,
    Offer,
    Answer,
    AddCandidate,
    Forward,
    Restart,
}

impl Step {
    pub(crate) fn kind(&self) -> StepKind {
        match self {
            Step::Open => StepKind::Open,
            Step::OpenDataChannel => StepKind::OpenDataChannel,
            Step::ApplyRemote(_) => StepKind::ApplyRemote,
            Step::Offer => StepKind::Offer,
            Step::Answer => StepKind::Answer,
            Step::AddCandidate(_) => StepKind::AddCandidate,
            Step::Forward(_) => StepKind::Forward,
            Step::Restart => StepKind::Restart,
        }
    }
}

pub(crate) enum StepOutput {
    Opened(Arc<dyn Transport>),
    DataChannelRequested,
    RemoteApplied(SdpKind),
    LocalSent(SdpKind),
    CandidateApplied,
    Forwarded,
    Restarted { offered: bool },
}

pub(crate) type StepResult = Result<StepOutput, NegotiationError>;

/// Result of a step, tagged with the record generation it was started for.
pub(crate) struct StepDone {
    pub remote_id: RemoteId,
    pub epoch: u64,
    pub kind: StepKind,
    pub result: Result<StepResult, Aborted>,
}

/// Everything a step needs besides the record itself.
#[derive(Clone)]
pub(crate) struct StepRunner {
    pub lifecycle: LifecycleManager,
    pub signaling: Arc<dyn SignalingOutput>,
    pub identity: LocalIdentity,
    pub data_channel_label: String,
    pub negotiation_timeout: Duration,
    pub identity_timeout: Duration,
}

impl StepRunner {
    pub(crate) fn new(
        config: &HubConfig,
        lifecycle: LifecycleManager,
        signaling: Arc<dyn SignalingOutput>,
        identity: LocalIdentity,
    ) -> Self {
        Self {
            lifecycle,
            signaling,
            identity,
            data_channel_label: config.data_channel_label.clone(),
            negotiation_timeout: config.negotiation_timeout(),
            identity_timeout: config.identity_timeout(),
        }
    }

    pub(crate) fn run(
        &self,
        remote_id: RemoteId,
        epoch: u64,
        transport: Option<Arc<dyn Transport>>,
        step: Step,
    ) -> BoxFuture<'static, StepResult> {
        let runner = self.clone();
        runner.execute(remote_id, epoch, transport, step).boxed()
    }

    async fn execute(
        self,
        remote_id: RemoteId,
        epoch: u64,
        transport: Option<Arc<dyn Transport>>,
        step: Step,
    ) -> StepResult {
        match step {
            Step::Open => self.open(remote_id, epoch).await,
            Step::OpenDataChannel => {
                let transport = require(transport, &remote_id)?;
                transport
                    .open_data_channel(&self.data_channel_label)
                    .await
                    .map_err(|e| {
                        NegotiationError::TransportUnavailable(format!(
                            "data channel for {remote_id}: {e:#}"
                        ))
                    })?;
                Ok(StepOutput::DataChannelRequested)
            }
            Step::ApplyRemote(desc) => {
                let transport = require(transport, &remote_id)?;
                let kind = desc.kind;
                self.bounded("apply remote description", transport.set_remote_description(desc))
                    .await?;
                Ok(StepOutput::RemoteApplied(kind))
            }
            Step::Offer => {
                let transport = require(transport, &remote_id)?;
                let offer = self
                    .bounded("create offer", async {
                        let offer = transport.create_offer().await?;
                        transport.set_local_description(offer.clone()).await?;
                        Ok(offer)
                    })
                    .await?;
                let from = self.identity.wait(self.identity_timeout).await?;
                info!("Sending offer to {}", remote_id);
                self.signaling
                    .send(OutboundSignal::Offer {
                        to: remote_id,
                        from,
                        offer,
                    })
                    .await;
                Ok(StepOutput::LocalSent(SdpKind::Offer))
            }
            Step::Answer => {
                let transport = require(transport, &remote_id)?;
                let answer = self
                    .bounded("create answer", async {
                        let answer = transport.create_answer().await?;
                        transport.set_local_description(answer.clone()).await?;
                        Ok(answer)
                    })
                    .await?;
                let from = self.identity.wait(self.identity_timeout).await?;
                info!("Sending answer to {}", remote_id);
                self.signaling
                    .send(OutboundSignal::Answer {
                        to: remote_id,
                        from,
                        answer,
                    })
                    .await;
                Ok(StepOutput::LocalSent(SdpKind::Answer))
            }
            Step::AddCandidate(candidate) => {
                let transport = require(transport, &remote_id)?;
                debug!("Applying candidate from {}", remote_id);
                transport
                    .add_candidate(candidate)
                    .await
                    .map_err(|e| NegotiationError::Candidate(format!("{e:#}")))?;
                Ok(StepOutput::CandidateApplied)
            }
            Step::Forward(candidate) => {
                let from = self.identity.wait(self.identity_timeout).await?;
                self.signaling
                    .send(OutboundSignal::IceCandidate {
                        to: remote_id,
                        from,
                        candidate,
                    })
                    .await;
                Ok(StepOutput::Forwarded)
            }
            Step::Restart => {
                let transport = require(transport, &remote_id)?;
                let offer = self
                    .bounded("restart connectivity", transport.restart_connectivity())
                    .await?;
                let Some(offer) = offer else {
                    return Ok(StepOutput::Restarted { offered: false });
                };
                let from = self.identity.wait(self.identity_timeout).await?;
                info!("Sending restart offer to {}", remote_id);
                self.signaling
                    .send(OutboundSignal::Offer {
                        to: remote_id,
                        from,
                        offer,
                    })
                    .await;
                Ok(StepOutput::Restarted { offered: true })
            }
        }
    }

    async fn open(&self, remote_id: RemoteId, epoch: u64) -> StepResult {
        let after = self.negotiation_timeout;
        let transport = tokio::time::timeout(after, self.lifecycle.open(remote_id.clone(), epoch))
            .await
            .map_err(|_| NegotiationError::Timeout {
                stage: "transport creation",
                after,
            })??;

        Ok(StepOutput::Opened(transport))
    }

    async fn bounded<T>(
        &self,
        stage: &'static str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, NegotiationError> {
        let after = self.negotiation_timeout;
        match tokio::time::timeout(after, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(NegotiationError::description(stage, e)),
            Err(_) => Err(NegotiationError::Timeout { stage, after }),
        }
    }
}

fn require(
    transport: Option<Arc<dyn Transport>>,
    remote_id: &RemoteId,
) -> Result<Arc<dyn Transport>, NegotiationError> {
    transport.ok_or_else(|| NegotiationError::TransportUnavailable(format!("no transport for {remote_id}")))
}
