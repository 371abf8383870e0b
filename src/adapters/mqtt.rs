//! MQTT broker link.
//!
//! Wraps `EspMqttClient` behind [`PubSubPort`]. The client connects in
//! the background; a small reader thread drains the connection's event
//! stream, tracking session state in an atomic and queueing inbound
//! publishes for the tick loop to collect via `poll_inbound`. esp-mqtt
//! reconnects on its own, so the thread only has to mirror the
//! connected flag.
//!
//! The simulation backend connects instantly and records every publish
//! and subscription so tests can inspect the advertised topics.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::ports::{InboundMessage, NetError, PubSubPort};

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

#[cfg(target_os = "espidf")]
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicBool, Ordering},
    sync::{Arc, Mutex},
};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};

/// One publish as seen by the simulation backend.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPublish {
    pub topic: String,
    pub payload: String,
    pub qos: u8,
    pub retained: bool,
}

pub struct MqttBrokerLink {
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    connected: Arc<AtomicBool>,
    #[cfg(target_os = "espidf")]
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,

    #[cfg(not(target_os = "espidf"))]
    sim_connected: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_published: Vec<SimPublish>,
    #[cfg(not(target_os = "espidf"))]
    sim_subscriptions: Vec<String>,
    #[cfg(not(target_os = "espidf"))]
    sim_inbound: VecDeque<InboundMessage>,
}

#[cfg(target_os = "espidf")]
fn qos_from(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

impl MqttBrokerLink {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            connected: Arc::new(AtomicBool::new(false)),
            #[cfg(target_os = "espidf")]
            inbound: Arc::new(Mutex::new(VecDeque::new())),

            #[cfg(not(target_os = "espidf"))]
            sim_connected: false,
            #[cfg(not(target_os = "espidf"))]
            sim_published: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_subscriptions: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_inbound: VecDeque::new(),
        }
    }

    /// Everything published so far, oldest first.
    #[cfg(not(target_os = "espidf"))]
    pub fn published(&self) -> &[SimPublish] {
        &self.sim_published
    }

    /// Queue a message as if the broker had delivered it.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject_inbound(&mut self, topic: &str, payload: &str) {
        self.sim_inbound.push_back(InboundMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        });
    }
}

impl Default for MqttBrokerLink {
    fn default() -> Self {
        Self::new()
    }
}

impl PubSubPort for MqttBrokerLink {
    #[cfg(target_os = "espidf")]
    fn connect_broker(&mut self, host: &str, client_id: &str) -> Result<(), NetError> {
        // Scheme default covers the port (1883); a host:port value
        // passes through unchanged.
        let url = format!("mqtt://{host}");
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };
        let (client, mut connection) = EspMqttClient::new(&url, &conf).map_err(|e| {
            warn!("mqtt: client init failed: {e}");
            NetError::BrokerConnectFailed
        })?;

        let connected = self.connected.clone();
        let inbound = self.inbound.clone();
        std::thread::Builder::new()
            .name("mqtt-events".to_string())
            .stack_size(6 * 1024)
            .spawn(move || {
                while let Ok(event) = connection.next() {
                    match event.payload() {
                        EventPayload::Connected(_) => {
                            connected.store(true, Ordering::SeqCst);
                        }
                        EventPayload::Disconnected => {
                            connected.store(false, Ordering::SeqCst);
                        }
                        EventPayload::Received {
                            topic: Some(topic),
                            data,
                            ..
                        } => {
                            if let (Ok(payload), Ok(mut queue)) =
                                (core::str::from_utf8(data), inbound.lock())
                            {
                                queue.push_back(InboundMessage {
                                    topic: topic.to_string(),
                                    payload: payload.to_string(),
                                });
                            }
                        }
                        _ => {}
                    }
                }
                info!("mqtt: event stream closed");
            })
            .map_err(|e| {
                warn!("mqtt: event thread spawn failed: {e}");
                NetError::BrokerConnectFailed
            })?;

        self.client = Some(client);
        info!("mqtt: connecting to {url} as '{client_id}'");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn connect_broker(&mut self, host: &str, client_id: &str) -> Result<(), NetError> {
        info!("mqtt: sim session to {host} as '{client_id}'");
        self.sim_connected = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn is_broker_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    #[cfg(not(target_os = "espidf"))]
    fn is_broker_connected(&self) -> bool {
        self.sim_connected
    }

    #[cfg(target_os = "espidf")]
    fn publish(&mut self, topic: &str, payload: &str, qos: u8, retained: bool) -> Result<(), NetError> {
        if !self.is_broker_connected() {
            return Err(NetError::NotConnected);
        }
        let Some(client) = self.client.as_mut() else {
            return Err(NetError::NotConnected);
        };
        client
            .publish(topic, qos_from(qos), retained, payload.as_bytes())
            .map_err(|e| {
                warn!("mqtt: publish to '{topic}' failed: {e}");
                NetError::PublishFailed
            })?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn publish(&mut self, topic: &str, payload: &str, qos: u8, retained: bool) -> Result<(), NetError> {
        if !self.sim_connected {
            return Err(NetError::NotConnected);
        }
        self.sim_published.push(SimPublish {
            topic: topic.to_string(),
            payload: payload.to_string(),
            qos,
            retained,
        });
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn subscribe(&mut self, filter: &str, qos: u8) -> Result<(), NetError> {
        let Some(client) = self.client.as_mut() else {
            return Err(NetError::NotConnected);
        };
        client.subscribe(filter, qos_from(qos)).map_err(|e| {
            warn!("mqtt: subscribe '{filter}' failed: {e}");
            NetError::SubscribeFailed
        })?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn subscribe(&mut self, filter: &str, qos: u8) -> Result<(), NetError> {
        if !self.sim_connected {
            return Err(NetError::NotConnected);
        }
        let _ = qos;
        self.sim_subscriptions.push(filter.to_string());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn poll_inbound(&mut self) -> Option<InboundMessage> {
        self.inbound.lock().ok()?.pop_front()
    }

    #[cfg(not(target_os = "espidf"))]
    fn poll_inbound(&mut self) -> Option<InboundMessage> {
        self.sim_inbound.pop_front()
    }
}
