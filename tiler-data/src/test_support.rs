//! In-memory stand-ins for the network seams.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::io;

use async_trait::async_trait;

use crate::overpass::OverpassSource;
use crate::transport::{TileTransport, TransportError};

/// Stub [`TileTransport`] serving canned bodies by URL.
///
/// Unknown URLs fail with a 404. Every request is recorded in order.
#[derive(Debug, Default)]
pub struct StubTransport {
    bodies: HashMap<String, Vec<u8>>,
    failures_before_success: RefCell<HashMap<String, usize>>,
    requests: RefCell<Vec<String>>,
}

impl StubTransport {
    /// Transport with no canned responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// Fail the first `count` requests for `url` before serving its body.
    #[must_use]
    pub fn failing_first(self, url: impl Into<String>, count: usize) -> Self {
        self.failures_before_success
            .borrow_mut()
            .insert(url.into(), count);
        self
    }

    /// URLs requested so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl TileTransport for StubTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.requests.borrow_mut().push(url.to_owned());
        if let Some(remaining) = self.failures_before_success.borrow_mut().get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportError::Network {
                    url: url.to_owned(),
                    source: io::Error::new(io::ErrorKind::ConnectionReset, "stubbed failure"),
                });
            }
        }
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Http {
                url: url.to_owned(),
                status: 404,
                message: "not found".to_owned(),
            })
    }
}

/// Stub [`OverpassSource`] returning one canned response.
#[derive(Debug, Default)]
pub struct StubOverpass {
    response: Option<Vec<u8>>,
    queries: RefCell<Vec<String>>,
}

impl StubOverpass {
    /// Source answering every query with `response`.
    #[must_use]
    pub fn with_response(response: impl Into<Vec<u8>>) -> Self {
        Self {
            response: Some(response.into()),
            queries: RefCell::default(),
        }
    }

    /// Source failing every query with a 504.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Queries received so far.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

#[async_trait(?Send)]
impl OverpassSource for StubOverpass {
    async fn query(&self, query: &str) -> Result<Vec<u8>, TransportError> {
        self.queries.borrow_mut().push(query.to_owned());
        self.response.clone().ok_or_else(|| TransportError::Http {
            url: "stub://overpass".to_owned(),
            status: 504,
            message: "gateway timeout".to_owned(),
        })
    }
}

/// Drive a future to completion on a current-thread Tokio runtime.
///
/// # Panics
/// Panics when the runtime cannot be built.
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| panic!("failed to build test runtime: {err}"))
        .block_on(future)
}
