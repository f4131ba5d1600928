//! In-memory transport with scripted responses, for exercising the session store and
//! navigation without a backend.
//!
//! Test seam only: nothing outside `#[cfg(test)]` code and `tests/` uses it, and the
//! console always wires [`crate::transport::HttpTransport`].

use std::collections::{HashMap, VecDeque};

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{AppResult, ClassifiedError};
use crate::transport::{Method, Transport};

type Held = (oneshot::Receiver<()>, AppResult<Value>);

#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, AppResult<Value>>>,
    held: Mutex<HashMap<String, VecDeque<Held>>>,
    calls: Mutex<Vec<(Method, String, Option<Value>)>>,
}

/// Releases one held response when `release` is called or the gate is dropped.
pub struct Gate(Option<oneshot::Sender<()>>);

impl Gate {
    pub fn release(mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response returned for every call to `path` from now on.
    pub fn respond(&self, path: &str, result: AppResult<Value>) {
        self.responses.lock().insert(path.to_string(), result);
    }

    /// Next call to `path` waits for the returned gate, then yields `result`.
    pub fn hold(&self, path: &str, result: AppResult<Value>) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.held.lock().entry(path.to_string()).or_default().push_back((rx, result));
        Gate(Some(tx))
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|(_, p, _)| p == path).count()
    }

    pub fn last_body(&self, path: &str) -> Option<Value> {
        self.calls.lock().iter().rev().find(|(_, p, _)| p == path).and_then(|(_, _, b)| b.clone())
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(&'a self, method: Method, path: &'a str, body: Option<Value>) -> BoxFuture<'a, AppResult<Value>> {
        self.calls.lock().push((method, path.to_string(), body));
        let held = self.held.lock().get_mut(path).and_then(|q| q.pop_front());
        Box::pin(async move {
            if let Some((rx, result)) = held {
                let _ = rx.await;
                return result;
            }
            self.responses
                .lock()
                .get(path)
                .cloned()
                .unwrap_or_else(|| Err(ClassifiedError::unknown(Some(404), format!("no scripted response for {}", path))))
        })
    }
}
