// ABOUTME: Engine client over the local unix socket.
// ABOUTME: Opens streaming requests on dedicated hyper connections and runs sessions over them.

use crate::runtime::error::EngineError;
use crate::runtime::request::StreamRequest;
use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    AttachOptions, EventsOptions, ExecConfig, ExecInfo, ExecOps, ExecStartOptions, LogOptions,
    StatsOptions, StreamOps,
};
use crate::runtime::types::{RuntimeInfo, RuntimeType};
use crate::stream::{
    BodySource, DEFAULT_MAX_PAYLOAD, Frame, FrameDecoder, FramingMode, JsonDecoder, Outcome,
    StreamCallback, StreamingSession,
};
use crate::types::{ContainerId, ExecId, ServiceId, TaskId};
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::InspectContainerOptions;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::sync::OnceCell;
use tokio::task::AbortHandle;

/// API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "v1.41";

/// Connection settings shared by every request of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Path prefix of every request, e.g. `v1.41`.
    pub api_version: String,
    /// Bound on connecting and receiving response headers.
    pub connect_timeout: Duration,
    /// Largest multiplexed payload accepted.
    pub max_payload: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            connect_timeout: Duration::from_secs(120),
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// A streaming response whose status has been checked.
pub struct OpenedStream {
    pub source: BodySource,
    pub content_type: Option<String>,
}

/// Aborts the connection task unless disarmed, so failed opens leave no socket behind.
struct AbortOnDrop {
    handle: AbortHandle,
    armed: bool,
}

impl AbortOnDrop {
    fn new(handle: AbortHandle) -> Self {
        Self {
            handle,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.handle.abort();
        }
    }
}

/// Client for one engine socket.
///
/// Short request/response calls (inspection, exec creation) go through
/// bollard, created on first use. Every streaming call opens its own
/// connection so that releasing a session closes exactly that stream.
pub struct EngineClient {
    docker: OnceCell<Docker>,
    info: RuntimeInfo,
    settings: ClientSettings,
}

impl EngineClient {
    /// Create a client for a detected or configured engine. Does not touch the socket.
    pub fn connect(info: &RuntimeInfo, settings: ClientSettings) -> Result<Self, EngineError> {
        if info.socket_path.is_empty() {
            return Err(EngineError::InvalidRequest("empty socket path".to_string()));
        }
        Ok(Self {
            docker: OnceCell::new(),
            info: info.clone(),
            settings,
        })
    }

    /// bollard client for short calls. A missing socket is a connect error.
    async fn docker(&self) -> Result<&Docker, EngineError> {
        self.docker
            .get_or_try_init(|| async {
                Docker::connect_with_unix(
                    &self.info.socket_path,
                    self.settings.connect_timeout.as_secs(),
                    bollard::API_DEFAULT_VERSION,
                )
                .map_err(EngineError::from)
            })
            .await
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.info.runtime_type
    }

    pub fn socket_path(&self) -> &str {
        &self.info.socket_path
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Check that the engine answers.
    pub async fn ping(&self) -> Result<(), EngineError> {
        self.docker().await?.ping().await?;
        Ok(())
    }

    /// Whether a container was created with a TTY.
    pub async fn container_tty(&self, container: &ContainerId) -> Result<bool, EngineError> {
        let details = self
            .docker()
            .await?
            .inspect_container(container.as_str(), None::<InspectContainerOptions>)
            .await?;
        Ok(details.config.and_then(|c| c.tty).unwrap_or(false))
    }

    /// Send a request on a new connection and wait for a successful response head.
    ///
    /// Bounded by the connect timeout. A non-success status is turned into an
    /// error carrying the engine's message.
    pub async fn open_stream(&self, request: StreamRequest) -> Result<OpenedStream, EngineError> {
        let uri = request.uri(&self.settings.api_version);
        tracing::debug!(method = %request.method(), %uri, socket = %self.info.socket_path, "opening stream");

        let request = request.into_hyper(&self.settings.api_version)?;
        let timeout = self.settings.connect_timeout;
        tokio::time::timeout(timeout, self.send(request))
            .await
            .map_err(|_| EngineError::ConnectTimeout(timeout))?
    }

    async fn send(&self, request: hyper::Request<Full<Bytes>>) -> Result<OpenedStream, EngineError> {
        let stream = UnixStream::connect(&self.info.socket_path)
            .await
            .map_err(|source| EngineError::Connect {
                path: self.info.socket_path.clone(),
                source,
            })?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(EngineError::Handshake)?;

        let connection = tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("stream connection closed: {}", e);
            }
        });
        let guard = AbortOnDrop::new(connection.abort_handle());

        let response = sender
            .send_request(request)
            .await
            .map_err(EngineError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(EngineError::Request)?
                .to_bytes();
            return Err(EngineError::from_status(status.as_u16(), &body));
        }

        let content_type = response
            .headers()
            .get(hyper::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        guard.disarm();

        Ok(OpenedStream {
            source: BodySource::new(response.into_body(), connection),
            content_type,
        })
    }

    async fn run_frames<C>(
        &self,
        request: StreamRequest,
        tty: bool,
        callback: C,
        timeout: Duration,
        label: String,
    ) -> Result<Outcome, EngineError>
    where
        C: StreamCallback<Frame> + 'static,
    {
        let opened = self.open_stream(request).await?;
        let mode = FramingMode::resolve(opened.content_type.as_deref(), tty);
        tracing::debug!(session = %label, ?mode, "stream opened");

        let decoder = FrameDecoder::new(mode).with_max_payload(self.settings.max_payload);
        let outcome = StreamingSession::new(opened.source, decoder, timeout)
            .with_label(label)
            .spawn(callback)
            .wait()
            .await?;
        Ok(outcome)
    }

    async fn run_json<T, C>(
        &self,
        request: StreamRequest,
        callback: C,
        timeout: Duration,
        label: String,
    ) -> Result<Outcome, EngineError>
    where
        T: DeserializeOwned + Send + 'static,
        C: StreamCallback<T> + 'static,
    {
        let opened = self.open_stream(request).await?;
        let decoder = JsonDecoder::<T>::new().with_max_payload(self.settings.max_payload);
        let outcome = StreamingSession::new(opened.source, decoder, timeout)
            .with_label(label)
            .spawn(callback)
            .wait()
            .await?;
        Ok(outcome)
    }
}

impl Sealed for EngineClient {}

#[async_trait]
impl StreamOps for EngineClient {
    async fn attach<C>(
        &self,
        container: &ContainerId,
        opts: &AttachOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        C: StreamCallback<Frame> + 'static,
    {
        let tty = match opts.tty {
            Some(tty) => tty,
            None => self.container_tty(container).await?,
        };
        let request = opts.apply(StreamRequest::post(format!(
            "/containers/{}/attach",
            container.path_segment()
        )));
        let label = format!("attach {}", container.short());
        self.run_frames(request, tty, callback, timeout, label).await
    }

    async fn logs<C>(
        &self,
        container: &ContainerId,
        opts: &LogOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        C: StreamCallback<Frame> + 'static,
    {
        let tty = match opts.tty {
            Some(tty) => tty,
            None => self.container_tty(container).await?,
        };
        let request = opts.apply(StreamRequest::get(format!(
            "/containers/{}/logs",
            container.path_segment()
        )));
        let label = format!("logs {}", container.short());
        self.run_frames(request, tty, callback, timeout, label).await
    }

    async fn service_logs<C>(
        &self,
        service: &ServiceId,
        opts: &LogOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        C: StreamCallback<Frame> + 'static,
    {
        let request = opts.apply(StreamRequest::get(format!(
            "/services/{}/logs",
            service.path_segment()
        )));
        let label = format!("service logs {}", service);
        self.run_frames(request, opts.tty.unwrap_or(false), callback, timeout, label)
            .await
    }

    async fn task_logs<C>(
        &self,
        task: &TaskId,
        opts: &LogOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        C: StreamCallback<Frame> + 'static,
    {
        let request = opts.apply(StreamRequest::get(format!(
            "/tasks/{}/logs",
            task.path_segment()
        )));
        let label = format!("task logs {}", task.short());
        self.run_frames(request, opts.tty.unwrap_or(false), callback, timeout, label)
            .await
    }

    async fn exec_start<C>(
        &self,
        exec: &ExecId,
        opts: &ExecStartOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        C: StreamCallback<Frame> + 'static,
    {
        let tty = match opts.tty {
            Some(tty) => tty,
            None => self.exec_inspect(exec).await?.tty,
        };
        let request = StreamRequest::post(format!("/exec/{}/start", exec.path_segment()))
            .json_body(json!({ "Detach": false, "Tty": tty }));
        let label = format!("exec {}", exec.short());
        self.run_frames(request, tty, callback, timeout, label).await
    }

    async fn stats<T, C>(
        &self,
        container: &ContainerId,
        opts: &StatsOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        T: DeserializeOwned + Send + 'static,
        C: StreamCallback<T> + 'static,
    {
        let request = opts.apply(StreamRequest::get(format!(
            "/containers/{}/stats",
            container.path_segment()
        )));
        let label = format!("stats {}", container.short());
        self.run_json(request, callback, timeout, label).await
    }

    async fn events<T, C>(
        &self,
        opts: &EventsOptions,
        callback: C,
        timeout: Duration,
    ) -> Result<Outcome, EngineError>
    where
        T: DeserializeOwned + Send + 'static,
        C: StreamCallback<T> + 'static,
    {
        let request = opts.apply(StreamRequest::get("/events"));
        self.run_json(request, callback, timeout, "events".to_string())
            .await
    }
}

#[async_trait]
impl ExecOps for EngineClient {
    async fn exec_create(
        &self,
        container: &ContainerId,
        config: &ExecConfig,
    ) -> Result<ExecId, EngineError> {
        let opts = bollard::models::ExecConfig {
            cmd: Some(config.cmd.clone()),
            env: if config.env.is_empty() {
                None
            } else {
                Some(config.env.clone())
            },
            working_dir: config.working_dir.clone(),
            user: config.user.clone(),
            attach_stdin: Some(false),
            attach_stdout: Some(config.attach_stdout),
            attach_stderr: Some(config.attach_stderr),
            tty: Some(config.tty),
            privileged: Some(config.privileged),
            ..Default::default()
        };

        let response = self
            .docker()
            .await?
            .create_exec(container.as_str(), opts)
            .await?;
        tracing::debug!(container = %container.short(), exec = %response.id, "exec created");
        Ok(ExecId::new(response.id))
    }

    async fn exec_inspect(&self, exec: &ExecId) -> Result<ExecInfo, EngineError> {
        let details = self.docker().await?.inspect_exec(exec.as_str()).await?;
        Ok(ExecInfo {
            running: details.running.unwrap_or(false),
            exit_code: details.exit_code,
            tty: details
                .process_config
                .and_then(|p| p.tty)
                .unwrap_or(false),
        })
    }
}
