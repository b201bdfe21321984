//! Testing utilities for code built on the waiters.
//!
//! These fakes stand in for a vendor SDK so pollers, listers, and bindings can
//! be exercised without a network.
//!
//! # Example
//!
//! ```ignore
//! use provider_waiters::testing::ScriptedDescribe;
//! use provider_waiters::poller::{wait_for_state, PollSpec};
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_waits_for_running() {
//!     let script = ScriptedDescribe::from_states("i-1", ["Pending", "Running"]);
//!     let spec = PollSpec::new(["Running".to_string()]);
//!
//!     let result = wait_for_state("i-1", &spec, || script.describe()).await.unwrap();
//!     assert_eq!(script.calls(), 2);
//! }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{json, Map, Value};

use crate::client::ApiClient;
use crate::error::{ApiError, Error, ErrorClassifier};
use crate::pager::{Cursor, Page, PageRequest};
use crate::poller::Observed;

/// Code reported by fakes when a resource is absent.
pub const NOT_FOUND_CODE: &str = "ResourceNotFound";

/// One scripted describe response.
#[derive(Debug, Clone, PartialEq)]
pub enum DescribeStep<T, S> {
    /// The resource exists in the given state.
    Observed(T, S),
    /// The resource does not exist.
    NotFound,
    /// The call fails with a vendor error.
    Error(ApiError),
}

/// A describe function that replays a fixed script.
///
/// Once the script runs out, the last step repeats forever.
#[derive(Debug)]
pub struct ScriptedDescribe<T, S> {
    id: String,
    steps: Vec<DescribeStep<T, S>>,
    calls: AtomicUsize,
}

impl<T: Clone, S: Clone> ScriptedDescribe<T, S> {
    /// Create a script for the resource `id`.
    pub fn new(id: impl Into<String>, steps: Vec<DescribeStep<T, S>>) -> Self {
        Self {
            id: id.into(),
            steps,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of describe calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Replay the next step.
    pub async fn describe(&self) -> Result<Observed<T, S>, Error> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.get(n).or_else(|| self.steps.last()).cloned();

        match step {
            Some(DescribeStep::Observed(object, state)) => Ok(Observed::new(object, state)),
            Some(DescribeStep::Error(err)) => Err(Error::from_api(
                &ErrorClassifier::new(),
                self.id.clone(),
                "Describe",
                err,
            )),
            Some(DescribeStep::NotFound) | None => Err(Error::NotFound {
                id: self.id.clone(),
                code: NOT_FOUND_CODE.to_string(),
            }),
        }
    }
}

impl ScriptedDescribe<Value, String> {
    /// Script a resource that moves through the given states.
    ///
    /// Each object is `{"Id": id, "Status": state}`.
    pub fn from_states<I, S>(id: impl Into<String>, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        let steps: Vec<_> = states
            .into_iter()
            .map(|state| {
                let state: String = state.into();
                DescribeStep::Observed(json!({"Id": id, "Status": state}), state)
            })
            .collect();
        Self::new(id, steps)
    }
}

/// A list API over a fixed item set that serves either pagination idiom.
///
/// With page numbers, page `n` holds items `(n-1)*size .. n*size`. With next
/// tokens, the token is the offset of the next item.
#[derive(Debug)]
pub struct ScriptedPages<T> {
    items: Vec<T>,
    fail_on_call: Option<(usize, ApiError)>,
    calls: AtomicUsize,
}

impl<T: Clone> ScriptedPages<T> {
    /// Serve the given items.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            fail_on_call: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail the `n`th fetch (1-based) with the given error.
    pub fn fail_on_call(mut self, n: usize, err: ApiError) -> Self {
        self.fail_on_call = Some((n, err));
        self
    }

    /// Number of pages fetched so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Serve the page described by `request`.
    pub async fn fetch(&self, request: PageRequest) -> Result<Page<T>, Error> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((fail_at, err)) = &self.fail_on_call {
            if *fail_at == n {
                return Err(Error::from_api(
                    &ErrorClassifier::new(),
                    "list",
                    "List",
                    err.clone(),
                ));
            }
        }

        let size = request.page_size() as usize;
        let offset = match request.cursor() {
            Cursor::Page(page) => (*page as usize).saturating_sub(1) * size,
            Cursor::Token(None) => 0,
            Cursor::Token(Some(token)) => token
                .parse()
                .map_err(|_| Error::Configuration(format!("bad token {}", token)))?,
        };
        let start = offset.min(self.items.len());
        let end = (offset + size).min(self.items.len());
        let items = self.items[start..end].to_vec();

        let page = Page::new(items);
        Ok(match request.cursor() {
            Cursor::Token(_) if end < self.items.len() => page.with_next_token(end.to_string()),
            _ => page,
        })
    }
}

/// An [`ApiClient`] that answers from canned responses per action.
///
/// Responses for an action are consumed in order; the last one repeats.
/// Unknown actions fail with `InvalidAction.NotFound`.
#[derive(Debug, Default)]
pub struct FakeClient {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, ApiError>>>>,
    requests: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl FakeClient {
    /// Create a client with no canned responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `action`.
    pub fn respond(self, action: &str, response: Result<Value, ApiError>) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses
                .entry(action.to_string())
                .or_default()
                .push_back(response);
        }
        self
    }

    /// Every request made so far, in order.
    pub fn requests(&self) -> Vec<(String, Map<String, Value>)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of requests made for `action`.
    pub fn calls(&self, action: &str) -> usize {
        self.requests()
            .iter()
            .filter(|(a, _)| a == action)
            .count()
    }
}

#[async_trait::async_trait]
impl ApiClient for FakeClient {
    async fn do_request(
        &self,
        action: &str,
        params: &Map<String, Value>,
    ) -> Result<Value, ApiError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((action.to_string(), params.clone()));
        }

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| ApiError::transport("fake client lock poisoned"))?;
        match responses.get_mut(action) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::new("InvalidAction.NotFound", action))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ApiError::new("InvalidAction.NotFound", action))),
            None => Err(ApiError::new("InvalidAction.NotFound", action)),
        }
    }
}
