// ABOUTME: Test support utilities.
// ABOUTME: Scripted byte sources, recording callbacks and tracing setup.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use dockstream::stream::{
    ByteSource, CallbackError, CancelHandle, MultiplexHeader, StreamCallback, StreamError,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive(
            "dockstream=debug"
                .parse()
                .expect("static directive parses"),
        );
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// One step of a scripted connection.
pub enum Step {
    Chunk(Bytes),
    Delay(Duration),
    Fail(io::ErrorKind),
    /// Block forever, like an idle follow stream.
    Hang,
}

impl Step {
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Step::Chunk(Bytes::from(data.into()))
    }
}

/// Byte source replaying a script, counting how often it was released.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    releases: Arc<AtomicUsize>,
}

/// Shared view of how many times a source was dropped.
#[derive(Clone, Default)]
pub struct Releases(Arc<AtomicUsize>);

impl Releases {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> (Self, Releases) {
        let releases = Releases::default();
        let source = Self {
            steps: steps.into(),
            releases: releases.0.clone(),
        };
        (source, releases)
    }
}

#[async_trait]
impl ByteSource for ScriptedSource {
    async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            match self.steps.pop_front() {
                None => return Ok(None),
                Some(Step::Chunk(chunk)) => return Ok(Some(chunk)),
                Some(Step::Delay(delay)) => tokio::time::sleep(delay).await,
                Some(Step::Fail(kind)) => return Err(io::Error::new(kind, "scripted failure")),
                Some(Step::Hang) => std::future::pending::<()>().await,
            }
        }
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Multiplexed wire bytes of one frame.
pub fn frame_bytes(id: u8, payload: &[u8]) -> Vec<u8> {
    let header = MultiplexHeader {
        id,
        length: payload.len() as u32,
    };
    let mut bytes = header.encode().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

/// Everything a `Recorder` saw.
pub struct Record<T> {
    pub items: Vec<T>,
    pub started: usize,
    pub finished: usize,
    pub failures: Vec<String>,
    pub handle: Option<CancelHandle>,
}

impl<T> Default for Record<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            started: 0,
            finished: 0,
            failures: Vec::new(),
            handle: None,
        }
    }
}

impl<T> Record<T> {
    pub fn terminal_callbacks(&self) -> usize {
        self.finished + self.failures.len()
    }
}

/// Callback that records every event and handles failures itself.
pub struct Recorder<T> {
    record: Arc<Mutex<Record<T>>>,
    cancel_on_start: bool,
    reject_after: Option<usize>,
}

impl<T> Recorder<T> {
    pub fn new() -> (Self, Arc<Mutex<Record<T>>>) {
        let record = Arc::new(Mutex::new(Record::default()));
        let recorder = Self {
            record: record.clone(),
            cancel_on_start: false,
            reject_after: None,
        };
        (recorder, record)
    }

    /// Cancel from inside `on_starting`.
    pub fn cancel_on_start(mut self) -> Self {
        self.cancel_on_start = true;
        self
    }

    /// Return an error from `on_next` once `n` items were accepted.
    pub fn reject_after(mut self, n: usize) -> Self {
        self.reject_after = Some(n);
        self
    }
}

impl<T: Send> StreamCallback<T> for Recorder<T> {
    fn on_starting(&mut self, cancel: CancelHandle) {
        let mut record = self.record.lock();
        record.started += 1;
        record.handle = Some(cancel.clone());
        if self.cancel_on_start {
            cancel.cancel();
        }
    }

    fn on_next(&mut self, item: T) -> Result<(), CallbackError> {
        let mut record = self.record.lock();
        if self.reject_after == Some(record.items.len()) {
            return Err("consumer rejected item".into());
        }
        record.items.push(item);
        Ok(())
    }

    fn on_failed(&mut self, error: StreamError) -> Result<(), StreamError> {
        self.record.lock().failures.push(error.to_string());
        Ok(())
    }

    fn on_finished(&mut self) {
        self.record.lock().finished += 1;
    }
}
