//! Scripted executor for facade unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpExecutor, HttpMethod, HttpRequest};

#[derive(Debug, Clone)]
enum Reply {
    Ok(Value),
    Err { status: u16, message: String },
}

/// Answers requests by `(method, path)`. Replies queued for the same route
/// are served in order; the last one repeats. Unscripted routes answer 404.
#[derive(Debug, Default)]
pub struct MockExecutor {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<Reply>>>,
    recorded: Mutex<Vec<HttpRequest>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, method: HttpMethod, path: &str, body: Value) -> Self {
        self.push(method, path, Reply::Ok(body));
        self
    }

    pub fn fail(self, method: HttpMethod, path: &str, status: u16, message: &str) -> Self {
        self.push(
            method,
            path,
            Reply::Err {
                status,
                message: message.to_string(),
            },
        );
        self
    }

    pub fn recorded(&self) -> Vec<HttpRequest> {
        self.recorded.lock().unwrap().clone()
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }
}

#[async_trait]
impl HttpExecutor for MockExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<Value, ApiError> {
        self.recorded.lock().unwrap().push(request.clone());
        let reply = {
            let mut routes = self.routes.lock().unwrap();
            let queue = routes.get_mut(&(request.method, request.path.clone()));
            match queue {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        match reply {
            Some(Reply::Ok(body)) => Ok(body),
            Some(Reply::Err { status, message }) => Err(ApiError::Remote { status, message }),
            None => Err(ApiError::Remote {
                status: 404,
                message: format!("no route for {} {}", request.method.as_str(), request.path),
            }),
        }
    }
}
