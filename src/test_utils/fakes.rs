use std::collections::HashMap;
use std::sync::Mutex;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::core::EngineError;
use crate::engine::ContainerEngine;
use crate::upgrade::http::{Transport, TransportError};
use crate::upgrade::report::{Reporter, Status};

#[derive(Debug, Clone)]
enum Canned {
    Body(Vec<u8>),
    Status(u16),
}

/// In-memory [`Transport`].
///
/// Unknown URLs fail with a network error. Every requested URL is recorded
/// in order.
#[derive(Debug, Default)]
pub struct FakeTransport {
    routes: HashMap<String, Canned>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    /// Transport with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `body`.
    #[must_use]
    pub fn serve(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(url.to_string(), Canned::Body(body.into()));
        self
    }

    /// Answer `url` with a non-success `status`.
    #[must_use]
    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(url.to_string(), Canned::Status(status));
        self
    }

    /// URLs requested so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.routes.get(url) {
            Some(Canned::Body(body)) => Ok(body.clone()),
            Some(Canned::Status(status)) => Err(TransportError::Status(*status)),
            None => Err(TransportError::Network(format!("no route to {url}"))),
        }
    }
}

impl Transport for FakeTransport {
    async fn get_text(&self, url: &str) -> Result<String, TransportError> {
        let body = self.lookup(url)?;
        String::from_utf8(body).map_err(|e| TransportError::Network(e.to_string()))
    }

    async fn download(&self, url: &str, dest: &mut File) -> Result<u64, TransportError> {
        let body = self.lookup(url)?;
        dest.write_all(&body).await.map_err(|e| TransportError::Write(e.to_string()))?;
        dest.flush().await.map_err(|e| TransportError::Write(e.to_string()))?;
        Ok(body.len() as u64)
    }
}

/// In-memory [`ContainerEngine`].
#[derive(Debug)]
pub struct FakeEngine {
    installed: bool,
    images: Result<Vec<String>, EngineError>,
    failing: Vec<String>,
    pulled: Mutex<Vec<String>>,
}

impl FakeEngine {
    /// Installed engine with the given local images.
    pub fn with_images<I, S>(images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            installed: true,
            images: Ok(images.into_iter().map(Into::into).collect()),
            failing: Vec::new(),
            pulled: Mutex::new(Vec::new()),
        }
    }

    /// Engine whose binary is absent.
    pub fn missing() -> Self {
        Self {
            installed: false,
            ..Self::with_images(Vec::<String>::new())
        }
    }

    /// Installed engine whose image listing fails.
    pub fn broken_listing() -> Self {
        Self {
            images: Err(EngineError::CommandFailed {
                engine: "docker".to_string(),
                operation: "images".to_string(),
                stderr: "Cannot connect to the Docker daemon".to_string(),
            }),
            ..Self::with_images(Vec::<String>::new())
        }
    }

    /// Make pulls of `image` fail.
    #[must_use]
    pub fn failing_pull(mut self, image: &str) -> Self {
        self.failing.push(image.to_string());
        self
    }

    /// Images pulled so far, in order, including failed attempts.
    pub fn pulled(&self) -> Vec<String> {
        self.pulled.lock().unwrap().clone()
    }
}

impl ContainerEngine for FakeEngine {
    fn name(&self) -> &str {
        "docker"
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    async fn list_images(&self) -> Result<Vec<String>, EngineError> {
        self.images.clone()
    }

    async fn pull(&self, image: &str) -> Result<(), EngineError> {
        self.pulled.lock().unwrap().push(image.to_string());
        if self.failing.iter().any(|f| f == image) {
            return Err(EngineError::CommandFailed {
                engine: "docker".to_string(),
                operation: "pull".to_string(),
                stderr: format!("manifest for {image} not found"),
            });
        }
        Ok(())
    }
}

/// [`Reporter`] that keeps every line.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<(Status, String)>>,
}

impl RecordingReporter {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded lines.
    pub fn lines(&self) -> Vec<(Status, String)> {
        self.lines.lock().unwrap().clone()
    }

    /// Whether a line with `status` contains `needle`.
    pub fn contains(&self, status: Status, needle: &str) -> bool {
        self.lines.lock().unwrap().iter().any(|(s, line)| *s == status && line.contains(needle))
    }

    /// The last recorded line.
    pub fn last(&self) -> Option<(Status, String)> {
        self.lines.lock().unwrap().last().cloned()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, status: Status, message: &str) {
        self.lines.lock().unwrap().push((status, message.to_string()));
    }
}
