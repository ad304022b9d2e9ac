//! Routes dispatcher frames to the task handler for this agent's role.
//!
//! Each WebSocket text message is one JSON frame. On connect the agent
//! sends a `register` frame, then answers each inbound task with at most
//! one reply until the dispatcher sends Close.

use alloy::primitives::Address;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use x402::{PaymentSigner, Transport, X402Client};

use crate::error::AgentError;
use crate::messages::{
    parse_inbound, FrameError, Inbound, Outbound, Registration, Role, TaskResult,
};
use crate::{provenance, scout, verifier};

pub struct TaskRouter<T: Transport, S: PaymentSigner> {
    role: Role,
    agent_id: String,
    address: Option<Address>,
    client: X402Client<T, S>,
}

impl<T: Transport, S: PaymentSigner> TaskRouter<T, S> {
    pub fn new(role: Role, agent_id: impl Into<String>, client: X402Client<T, S>) -> Self {
        Self {
            role,
            agent_id: agent_id.into(),
            address: None,
            client,
        }
    }

    /// Payer address advertised at registration.
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn client(&self) -> &X402Client<T, S> {
        &self.client
    }

    pub fn registration(&self) -> Outbound {
        Outbound::Register(Registration {
            role: self.role,
            agent_id: self.agent_id.clone(),
            address: self.address.map(|a| a.to_checksum(None)),
            capabilities: self.role.capabilities(),
        })
    }

    /// Reply to one decoded message, if this role handles it.
    pub async fn dispatch(&self, message: Inbound) -> Option<Outbound> {
        match (self.role, message) {
            (_, Inbound::Ping) => Some(Outbound::Pong {
                agent_id: self.agent_id.clone(),
            }),
            (Role::Scout, Inbound::QueryQuest(quest)) => Some(Outbound::TaskResult(
                scout::run_quest(&self.client, &self.agent_id, &quest).await,
            )),
            (Role::Verifier, Inbound::VerifyTask(task)) => Some(Outbound::TaskResult(
                verifier::verify(&self.agent_id, &task),
            )),
            (Role::Synthesizer, Inbound::SynthesizeTask(task)) => Some(Outbound::TaskResult(
                provenance::synthesize(&self.agent_id, &task),
            )),
            (role, other) => {
                tracing::debug!(role = %role, message = ?other, "task not handled by this role");
                None
            }
        }
    }

    /// Reply to one raw frame.
    ///
    /// Frames that are not JSON, or carry an unknown `type`, are dropped. A
    /// task frame for this role whose body does not decode is answered with
    /// an error result so the dispatcher is not left waiting.
    pub async fn handle(&self, text: &str) -> Option<String> {
        let reply = match parse_inbound(text) {
            Ok(Some(message)) => self.dispatch(message).await?,
            Ok(None) => {
                tracing::debug!("ignoring frame with unknown type");
                return None;
            }
            Err(FrameError::NotJson(e)) => {
                tracing::warn!(error = %e, "invalid frame");
                return None;
            }
            Err(FrameError::InvalidBody {
                kind,
                quest_id,
                source,
            }) => {
                if kind != self.role.task_type() {
                    tracing::debug!(kind = %kind, "ignoring invalid frame for another role");
                    return None;
                }
                tracing::warn!(quest_id = %quest_id, error = %source, "rejecting malformed task");
                let error = format!("invalid {kind} frame: {source}");
                Outbound::TaskResult(TaskResult::failed(&quest_id, &self.agent_id, error))
            }
        };

        match serde_json::to_string(&reply) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode reply");
                None
            }
        }
    }

    /// Register, then serve frames until the dispatcher closes the socket.
    pub async fn run<Io>(&self, socket: WebSocketStream<Io>) -> Result<(), AgentError>
    where
        Io: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut write, mut read) = socket.split();

        let registration = serde_json::to_string(&self.registration())?;
        write.send(Message::Text(registration.into())).await?;
        tracing::info!(agent_id = %self.agent_id, role = %self.role, "registered with dispatcher");

        while let Some(message) = read.next().await {
            match message? {
                Message::Text(text) => {
                    if let Some(reply) = self.handle(text.as_str()).await {
                        write.send(Message::Text(reply.into())).await?;
                    }
                }
                Message::Close(frame) => {
                    tracing::info!(agent_id = %self.agent_id, ?frame, "dispatcher closed the connection");
                    break;
                }
                _ => {}
            }
        }

        Ok(())
    }
}
