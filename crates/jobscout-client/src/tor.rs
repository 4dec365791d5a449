//! Tor circuit control and the Tor executor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jobscout_core::error::AppError;
use jobscout_core::fetch::{FetchMode, RawResponse, StrategyKind};
use jobscout_core::traits::FetchExecutor;
use jobscout_core::util::host_of;
use reqwest::{Client, Proxy};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::fingerprint::SessionFingerprints;
use crate::guard::validate_target;
use crate::http::{client_builder, get_page};

#[derive(Debug, Clone)]
pub struct TorConfig {
    pub host: String,
    pub socks_port: u16,
    pub control_port: u16,
    pub password: Option<String>,
    /// Never ask for a new circuit more often than this.
    pub min_rotation_interval: Duration,
    /// Wait after `NEWNYM` before using the new circuit.
    pub settle_delay: Duration,
    pub control_timeout: Duration,
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            socks_port: 9050,
            control_port: 9051,
            password: None,
            min_rotation_interval: Duration::from_secs(10),
            settle_delay: Duration::from_secs(3),
            control_timeout: Duration::from_secs(5),
        }
    }
}

/// Talks to the Tor control port.
#[derive(Clone)]
pub struct TorController {
    config: Arc<TorConfig>,
    last_rotation: Arc<Mutex<Option<Instant>>>,
}

impl TorController {
    pub fn new(config: TorConfig) -> Self {
        Self {
            config: Arc::new(config),
            last_rotation: Arc::new(Mutex::new(None)),
        }
    }

    /// `Some(controller)` if the control port accepts connections.
    pub async fn detect(config: TorConfig) -> Option<Self> {
        let reachable = tokio::time::timeout(
            config.control_timeout,
            TcpStream::connect((config.host.as_str(), config.control_port)),
        )
        .await;
        match reachable {
            Ok(Ok(_)) => {
                tracing::info!(host = %config.host, port = config.control_port, "Tor control port reachable");
                Some(Self::new(config))
            }
            Ok(Err(e)) => {
                tracing::info!(error = %e, "Tor not available");
                None
            }
            Err(_) => {
                tracing::info!("Tor control port timed out");
                None
            }
        }
    }

    pub fn config(&self) -> &TorConfig {
        &self.config
    }

    /// Ask Tor for a new circuit.
    ///
    /// Returns `Ok(false)` without contacting Tor when the last rotation was
    /// less than `min_rotation_interval` ago.
    pub async fn rotate_circuit(&self) -> Result<bool, AppError> {
        let mut last = self.last_rotation.lock().await;
        if last.is_some_and(|at| at.elapsed() < self.config.min_rotation_interval) {
            tracing::debug!("Circuit rotated recently, skipping");
            return Ok(false);
        }

        tokio::time::timeout(self.config.control_timeout, self.send_newnym())
            .await
            .map_err(|_| AppError::Timeout(self.config.control_timeout.as_secs()))??;
        *last = Some(Instant::now());
        tracing::info!("Tor circuit rotated");

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
        Ok(true)
    }

    async fn send_newnym(&self) -> Result<(), AppError> {
        let stream = TcpStream::connect((self.config.host.as_str(), self.config.control_port))
            .await
            .map_err(|e| AppError::NetworkError(format!("Tor control connect failed: {e}")))?;
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let auth = match &self.config.password {
            Some(password) => format!("AUTHENTICATE \"{}\"\r\n", password.replace('"', "\\\"")),
            None => "AUTHENTICATE\r\n".to_string(),
        };
        command(&mut writer, &mut reader, &auth).await?;
        command(&mut writer, &mut reader, "SIGNAL NEWNYM\r\n").await?;
        let _ = writer.write_all(b"QUIT\r\n").await;
        Ok(())
    }
}

/// Send one control command and require a `250` reply.
async fn command<W, R>(writer: &mut W, reader: &mut R, line: &str) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| AppError::NetworkError(format!("Tor control write failed: {e}")))?;
    let mut reply = String::new();
    reader
        .read_line(&mut reply)
        .await
        .map_err(|e| AppError::NetworkError(format!("Tor control read failed: {e}")))?;
    if reply.starts_with("250") {
        Ok(())
    } else {
        let verb = line.split_whitespace().next().unwrap_or_default();
        Err(AppError::ExecutorUnavailable(format!(
            "Tor rejected {verb}: {}",
            reply.trim()
        )))
    }
}

/// Executor that fetches through the local Tor SOCKS proxy, on a fresh
/// circuit when the rotation interval allows.
#[derive(Clone)]
pub struct TorExecutor {
    controller: TorController,
    client: Client,
    fingerprints: SessionFingerprints,
    timeout: Duration,
}

impl TorExecutor {
    pub fn new(
        controller: TorController,
        fingerprints: SessionFingerprints,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let config = controller.config();
        let proxy = Proxy::all(format!("socks5h://{}:{}", config.host, config.socks_port))
            .map_err(|e| AppError::ConfigError(format!("Tor proxy: {e}")))?;
        let client = client_builder(timeout)
            .proxy(proxy)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        Ok(Self {
            controller,
            client,
            fingerprints,
            timeout,
        })
    }
}

impl FetchExecutor for TorExecutor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Tor
    }

    async fn prepare(&self, _url: &str, _mode: FetchMode) {
        if let Err(e) = self.controller.rotate_circuit().await {
            tracing::warn!(error = %e, "Tor circuit rotation failed, using current circuit");
        }
    }

    async fn fetch(&self, url: &str, _mode: FetchMode) -> Result<RawResponse, AppError> {
        validate_target(url).await?;
        let fingerprint = self.fingerprints.for_domain(&host_of(url).unwrap_or_default());
        let response = get_page(&self.client, url, &fingerprint, self.timeout).await?;
        tracing::debug!(url, status = response.status, "Tor fetch");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Fake control port: answers every line with `reply`, records commands.
    async fn fake_control(reply: &'static str) -> (u16, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let log = log.clone();
                tokio::spawn(async move {
                    let (reader, mut writer) = stream.into_split();
                    let mut lines = BufReader::new(reader).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        log.lock().await.push(line);
                        if writer.write_all(reply.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        (port, seen)
    }

    fn config(port: u16) -> TorConfig {
        TorConfig {
            control_port: port,
            password: Some("secret".into()),
            settle_delay: Duration::ZERO,
            ..TorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_rotation_sends_authenticate_then_newnym() {
        let (port, seen) = fake_control("250 OK\r\n").await;
        let controller = TorController::detect(config(port)).await.unwrap();

        assert!(controller.rotate_circuit().await.unwrap());
        let commands = seen.lock().await.clone();
        assert_eq!(commands[0], "AUTHENTICATE \"secret\"");
        assert_eq!(commands[1], "SIGNAL NEWNYM");
    }

    #[tokio::test]
    async fn test_rotation_is_rate_limited() {
        let (port, _) = fake_control("250 OK\r\n").await;
        let controller = TorController::new(config(port));

        assert!(controller.rotate_circuit().await.unwrap());
        assert!(!controller.rotate_circuit().await.unwrap());
    }

    #[tokio::test]
    async fn test_rejected_authentication() {
        let (port, _) = fake_control("515 Authentication failed\r\n").await;
        let controller = TorController::new(config(port));

        let err = controller.rotate_circuit().await.unwrap_err();
        assert!(err.to_string().contains("515"));
    }

    #[tokio::test]
    async fn test_detect_without_daemon() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(TorController::detect(config(port)).await.is_none());
    }
}
