//! UdpSink - UDP fire-and-forget streaming

use contracts::{ContractError, MeasurementSink, SyncedMeasurement};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Serialization format for datagram payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// Configuration for UdpSink
#[derive(Debug, Clone)]
pub struct UdpSinkConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Serialization format
    pub format: WireFormat,
    /// Max datagram size (UDP typically 65507 for IPv4)
    pub max_datagram_size: usize,
}

impl UdpSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => WireFormat::Bincode,
            Some("json") | None => WireFormat::Json,
            Some(other) => return Err(format!("unknown format '{}'", other)),
        };

        let max_datagram_size = params
            .get("max_datagram_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_datagram_size,
        })
    }
}

/// Sink that sends measurements over UDP
pub struct UdpSink {
    name: String,
    config: UdpSinkConfig,
    socket: Option<UdpSocket>,
}

impl UdpSink {
    /// Create a new UdpSink
    #[instrument(name = "udp_sink_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: UdpSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        // Bind to any available port
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&config.addr).await?;

        debug!(
            sink = %name,
            target = %config.addr,
            "UdpSink connected"
        );

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "udp_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = UdpSinkConfig::from_params(params)
            .map_err(|e| ContractError::sink_write(&name, e))?;

        Self::new(&name, config)
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: name,
                message: e.to_string(),
            })
    }

    fn serialize_measurement(&self, synced: &SyncedMeasurement) -> Result<Vec<u8>, String> {
        match self.config.format {
            WireFormat::Json => {
                serde_json::to_vec(synced).map_err(|e| format!("json error: {}", e))
            }
            WireFormat::Bincode => {
                bincode::serialize(synced).map_err(|e| format!("bincode error: {}", e))
            }
        }
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))
    }

    fn prepare_payload(&self, synced: &SyncedMeasurement) -> Result<Vec<u8>, ContractError> {
        let data = self
            .serialize_measurement(synced)
            .map_err(|e| ContractError::sink_write(&self.name, e))?;

        if data.len() > self.config.max_datagram_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_datagram_size,
                "Datagram exceeds configured max size"
            );
        }

        Ok(data)
    }

    async fn transmit(&self, socket: &UdpSocket, data: &[u8], timestamp: i64) {
        match socket.send(data).await {
            Ok(sent) => {
                debug!(sink = %self.name, timestamp, bytes = sent, "Sent");
            }
            Err(e) => {
                // Log but don't fail - UDP is best-effort
                error!(sink = %self.name, error = %e, "UDP send failed");
            }
        }
    }
}

impl MeasurementSink for UdpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "udp_sink_write",
        skip(self, synced),
        fields(sink = %self.name, timestamp = synced.timestamp)
    )]
    async fn write(&mut self, synced: &SyncedMeasurement) -> Result<(), ContractError> {
        let socket = self.socket()?;
        let data = self.prepare_payload(synced)?;
        self.transmit(socket, &data, synced.timestamp).await;
        Ok(())
    }

    #[instrument(name = "udp_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // UDP doesn't buffer
        Ok(())
    }

    #[instrument(name = "udp_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "UdpSink closed");
        Ok(())
    }
}
