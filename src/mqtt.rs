//! MQTT surface of the bridge.
//!
//! Commands arrive on `<topic>/<entity>/set`, state leaves on
//! `<topic>/<entity>/state`. The event loop only moves packets and never
//! waits on the client's request queue, which only the event loop drains.
//! Commands are executed one at a time by a worker task so they keep their
//! arrival order, and session setup after each ConnAck runs in its own task.

use crate::command::{parse_source, parse_switch, parse_volume, LogicalCommand};
use crate::config::MqttConfig;
use crate::discovery::Discovery;
use crate::error::{BridgeError, Result};
use crate::processor::CommandProcessor;
use crate::subscription::StateReceiver;
use crate::types::StateSnapshot;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const CLIENT_CAPACITY: usize = 32;

const VOLUME: &str = "volume";
const MUTE: &str = "mute";
const DIMMED: &str = "dimmed";
const SOURCE: &str = "source";

/// Topic layout under a base topic
#[derive(Debug, Clone)]
pub struct Topics {
    base: String,
}

impl Topics {
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Wildcard covering every topic under the base
    pub fn subscription(&self) -> String {
        format!("{}/#", self.base)
    }

    pub fn command(&self, entity: &str) -> String {
        format!("{}/{}/set", self.base, entity)
    }

    pub fn state(&self, entity: &str) -> String {
        format!("{}/{}/state", self.base, entity)
    }

    /// Turn an incoming message into a command
    ///
    /// Returns `Ok(None)` for topics that are not commands, including the
    /// bridge's own state messages echoed back by the wildcard subscription.
    pub fn parse(&self, topic: &str, payload: &[u8]) -> Result<Option<LogicalCommand>> {
        let Some(entity) = topic
            .strip_prefix(self.base.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| rest.strip_suffix("/set"))
        else {
            return Ok(None);
        };

        let payload = std::str::from_utf8(payload)
            .map_err(|_| BridgeError::InvalidValue(format!("payload on {topic} is not UTF-8")))?;

        let command = match entity {
            VOLUME => LogicalCommand::VolumeSet(parse_volume(payload)?),
            MUTE => LogicalCommand::Mute(parse_switch(payload)?),
            DIMMED => LogicalCommand::Dim(parse_switch(payload)?),
            SOURCE => LogicalCommand::SourceSet(parse_source(payload)?),
            other => {
                return Err(BridgeError::InvalidCommand(format!(
                    "unknown command topic entity '{other}'"
                )))
            }
        };
        Ok(Some(command))
    }

    /// The four state messages for a snapshot, in publish order
    pub fn state_messages(&self, snapshot: &StateSnapshot) -> [(String, String); 4] {
        [
            (self.state(VOLUME), snapshot.volume.to_string()),
            (self.state(MUTE), snapshot.muted_label().to_string()),
            (self.state(DIMMED), snapshot.dimmed_label().to_string()),
            (self.state(SOURCE), snapshot.source.to_string()),
        ]
    }
}

/// Connects the command processor to an MQTT broker
pub struct MqttBridge {
    options: MqttOptions,
    topics: Topics,
    discovery: Discovery,
    processor: Arc<CommandProcessor>,
}

impl MqttBridge {
    pub fn new(config: &MqttConfig, processor: Arc<CommandProcessor>) -> Self {
        let mut options = MqttOptions::new(config.client_id.as_str(), config.host.as_str(), config.port);
        options.set_keep_alive(KEEP_ALIVE);

        let topics = Topics::new(config.topic.as_str());
        let discovery = Discovery::new(config.discovery_prefix.as_str(), &topics);

        Self {
            options,
            topics,
            discovery,
            processor,
        }
    }

    /// Run until the process exits
    ///
    /// `states` feeds the state topics; it should be subscribed to the same
    /// publisher the processor was built with.
    pub async fn run(self, states: StateReceiver) {
        let (client, eventloop) = AsyncClient::new(self.options.clone(), CLIENT_CAPACITY);
        let (command_tx, command_rx) = mpsc::unbounded_channel::<(String, Vec<u8>)>();

        tokio::spawn(forward_states(client.clone(), self.topics.clone(), states));
        tokio::spawn(run_commands(
            self.processor.clone(),
            self.topics.clone(),
            command_rx,
        ));

        self.poll(client, eventloop, command_tx).await;
    }

    async fn poll(
        &self,
        client: AsyncClient,
        mut eventloop: EventLoop,
        command_tx: mpsc::UnboundedSender<(String, Vec<u8>)>,
    ) {
        let mut session: Option<JoinHandle<()>> = None;
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!(broker = ?self.options.broker_address(), "Connected to MQTT broker");
                    if let Some(previous) = session.take() {
                        previous.abort();
                    }
                    session = Some(tokio::spawn(start_session(
                        client.clone(),
                        self.topics.clone(),
                        self.discovery.clone(),
                        self.processor.clone(),
                    )));
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if command_tx
                        .send((publish.topic, publish.payload.to_vec()))
                        .is_err()
                    {
                        tracing::error!("Command worker stopped, leaving MQTT loop");
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("MQTT connection error: {}, reconnecting in {:?}", e, RECONNECT_DELAY);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}

/// Subscribe, announce entities and publish the current state
async fn start_session(
    client: AsyncClient,
    topics: Topics,
    discovery: Discovery,
    processor: Arc<CommandProcessor>,
) {
    if let Err(e) = set_up_session(&client, &topics, &discovery, &processor).await {
        tracing::error!("Failed to set up MQTT session: {}", e);
    }
}

async fn set_up_session(
    client: &AsyncClient,
    topics: &Topics,
    discovery: &Discovery,
    processor: &CommandProcessor,
) -> Result<()> {
    client
        .subscribe(topics.subscription(), QoS::AtLeastOnce)
        .await?;

    for message in discovery.messages(topics)? {
        client
            .publish(message.topic, QoS::AtLeastOnce, true, message.payload)
            .await?;
    }

    publish_state(client, topics, &processor.snapshot()).await
}

async fn publish_state(client: &AsyncClient, topics: &Topics, snapshot: &StateSnapshot) -> Result<()> {
    for (topic, payload) in topics.state_messages(snapshot) {
        client.publish(topic, QoS::AtLeastOnce, true, payload).await?;
    }
    Ok(())
}

async fn forward_states(client: AsyncClient, topics: Topics, mut states: StateReceiver) {
    loop {
        match states.recv().await {
            Ok(snapshot) => {
                if let Err(e) = publish_state(&client, &topics, &snapshot).await {
                    tracing::warn!("Failed to publish state: {}", e);
                }
            }
            Err(BridgeError::ConnectionClosed) => break,
            // the next snapshot carries the full state
            Err(e) => tracing::warn!("State forwarding: {}", e),
        }
    }
}

async fn run_commands(
    processor: Arc<CommandProcessor>,
    topics: Topics,
    mut commands: mpsc::UnboundedReceiver<(String, Vec<u8>)>,
) {
    while let Some((topic, payload)) = commands.recv().await {
        if let Err(e) = handle_message(&processor, &topics, &topic, &payload).await {
            if e.is_transmission() {
                tracing::error!(%topic, "Command not delivered: {}", e);
            } else {
                tracing::warn!(%topic, "Dropping MQTT command: {}", e);
            }
        }
    }
}

async fn handle_message(
    processor: &CommandProcessor,
    topics: &Topics,
    topic: &str,
    payload: &[u8],
) -> Result<()> {
    let Some(command) = topics.parse(topic, payload)? else {
        tracing::trace!(%topic, "Ignoring non-command topic");
        return Ok(());
    };
    let outcome = processor.execute(command).await?;
    tracing::debug!(%topic, ?outcome, "MQTT command handled");
    Ok(())
}
