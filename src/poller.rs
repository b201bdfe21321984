//! Poll a resource until it reaches a goal state.
//!
//! [`wait_for_state`] drives a caller-supplied describe function on a fixed
//! cadence. It stops when the observed state is a goal, when it is a failure,
//! when the resource disappears during a deletion wait, or when the deadline
//! passes.
//!
//! The describe call is never retried here. Transient errors abort the wait;
//! wrap the describe in [`crate::retry::retry`] if that is not what you want.
//!
//! # Example
//!
//! ```ignore
//! use provider_waiters::poller::{wait_for_state, Observed, PollSpec};
//!
//! let spec = PollSpec::new(["Available".to_string()])
//!     .with_fail_states(["Failed".to_string()]);
//!
//! let result = wait_for_state("vpc-123", &spec, || async {
//!     let object = client.describe_vpc("vpc-123").await?;
//!     let status = object["Status"].as_str().unwrap_or_default().to_string();
//!     Ok(Observed::new(object, status))
//! })
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, warn};

use crate::error::Error;
use crate::status::Status;

/// Default time between describe calls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default deadline for a wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// What to wait for and how long.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSpec<S> {
    /// States that end the wait successfully. Empty means any state that is
    /// not a failure ends the wait, unless `until_absent` is set.
    pub goal_states: Vec<S>,
    /// States that end the wait with [`Error::TargetStatus`].
    pub fail_states: Vec<S>,
    /// Treat a not-found describe result as success (deletion waits).
    pub until_absent: bool,
    /// Time between describe calls.
    pub interval: Duration,
    /// Deadline, measured from the start of the wait.
    pub timeout: Duration,
    /// Wait before the first describe call. Counts against `timeout`.
    pub delay: Duration,
}

impl<S: Status> PollSpec<S> {
    /// Wait for any of the given states.
    pub fn new(goal_states: impl IntoIterator<Item = S>) -> Self {
        Self {
            goal_states: goal_states.into_iter().collect(),
            fail_states: Vec::new(),
            until_absent: false,
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            delay: Duration::ZERO,
        }
    }

    /// Wait for the resource to disappear.
    pub fn until_absent() -> Self {
        Self {
            until_absent: true,
            ..Self::new(Vec::new())
        }
    }

    /// Set the states that abort the wait.
    pub fn with_fail_states(mut self, fail_states: impl IntoIterator<Item = S>) -> Self {
        self.fail_states = fail_states.into_iter().collect();
        self
    }

    /// Set the time between describe calls.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the initial delay before the first describe call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Check that the spec can be polled.
    ///
    /// Goal and failure states must be disjoint, and both the interval and the
    /// timeout must be non-zero.
    pub fn validate(&self) -> Result<(), Error> {
        if self.interval.is_zero() {
            return Err(Error::Configuration(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::Configuration(
                "poll timeout must be greater than zero".to_string(),
            ));
        }
        if let Some(state) = self.goal_states.iter().find(|s| self.fail_states.contains(s)) {
            return Err(Error::Configuration(format!(
                "state {} is both a goal and a failure state",
                state
            )));
        }
        Ok(())
    }

    fn is_goal(&self, state: &S) -> bool {
        if self.goal_states.is_empty() {
            !self.until_absent
        } else {
            self.goal_states.contains(state)
        }
    }
}

/// One describe result: the object and the state read from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Observed<T, S> {
    /// The described object.
    pub object: T,
    /// The state extracted from the object.
    pub state: S,
}

impl<T, S> Observed<T, S> {
    /// Create a new observation.
    pub fn new(object: T, state: S) -> Self {
        Self { object, state }
    }
}

/// The outcome of a successful wait.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResult<T, S> {
    /// The last described object. `None` when the wait ended because the
    /// resource is gone.
    pub object: Option<T>,
    /// The state that ended the wait. `None` when the resource is gone.
    pub state: Option<S>,
    /// Number of describe calls made.
    pub attempts: u32,
    /// Time spent waiting.
    pub elapsed: Duration,
}

impl<T, S> PollResult<T, S> {
    /// Whether the wait ended because the resource no longer exists.
    pub fn is_absent(&self) -> bool {
        self.object.is_none()
    }
}

/// Poll `describe` until the resource reaches one of the goal states.
///
/// The deadline is checked before every describe call, so with no initial
/// delay a wait that never settles makes `floor(timeout / interval) + 1`
/// calls before returning [`Error::Timeout`].
///
/// # Errors
///
/// - [`Error::TargetStatus`] as soon as a failure state is observed
/// - [`Error::Timeout`] when the deadline passes
/// - any error returned by `describe`, unchanged, except a not-found error
///   while `until_absent` is set
pub async fn wait_for_state<T, S, F, Fut>(
    id: &str,
    spec: &PollSpec<S>,
    mut describe: F,
) -> Result<PollResult<T, S>, Error>
where
    S: Status,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observed<T, S>, Error>>,
{
    spec.validate()?;
    let start = Instant::now();
    if !spec.delay.is_zero() {
        sleep(spec.delay).await;
    }

    let mut attempts = 0u32;
    let mut last_state: Option<S> = None;

    loop {
        let elapsed = start.elapsed();
        if elapsed > spec.timeout {
            let last_state = last_state.map(|s| s.to_string());
            warn!(id, ?elapsed, ?last_state, "timed out waiting for target status");
            return Err(Error::Timeout {
                id: id.to_string(),
                elapsed,
                last_state,
            });
        }

        attempts += 1;
        let observed = match describe().await {
            Ok(observed) => observed,
            Err(err) if spec.until_absent && err.is_not_found() => {
                debug!(id, attempts, "resource is gone");
                return Ok(PollResult {
                    object: None,
                    state: None,
                    attempts,
                    elapsed: start.elapsed(),
                });
            }
            Err(err) => return Err(err),
        };

        let state = &observed.state;
        if last_state.as_ref() != Some(state) {
            debug!(id, attempts, state = %state, "observed state");
        }

        if spec.fail_states.contains(state) {
            warn!(id, state = %state, "resource entered a failure state");
            return Err(Error::TargetStatus {
                id: id.to_string(),
                state: state.to_string(),
            });
        }

        if spec.is_goal(state) {
            return Ok(PollResult {
                object: Some(observed.object),
                state: Some(observed.state),
                attempts,
                elapsed: start.elapsed(),
            });
        }

        last_state = Some(observed.state);
        sleep(spec.interval).await;
    }
}

/// Like [`wait_for_state`] but instrumented with a span named after the action.
#[instrument(level = "debug", skip(spec, describe))]
pub async fn wait_for_action<T, S, F, Fut>(
    action: &str,
    id: &str,
    spec: &PollSpec<S>,
    describe: F,
) -> Result<PollResult<T, S>, Error>
where
    S: Status,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observed<T, S>, Error>>,
{
    wait_for_state(id, spec, describe).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::testing::{DescribeStep, ScriptedDescribe};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn running_spec() -> PollSpec<String> {
        PollSpec::new(["Running".to_string()])
            .with_fail_states(["Failed".to_string()])
            .with_interval(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(3))
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_goal_state() {
        let script = ScriptedDescribe::from_states("i-1", ["Creating", "Creating", "Running"]);

        let result = assert_ok!(wait_for_state("i-1", &running_spec(), || script.describe()).await);

        assert_eq!(result.state.as_deref(), Some("Running"));
        assert_eq!(result.object.unwrap()["Status"], "Running");
        assert_eq!(result.attempts, 3);
        assert_eq!(script.calls(), 3);
        assert!(result.elapsed <= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_state_stops_polling() {
        let script = ScriptedDescribe::from_states("i-1", ["Creating", "Failed", "Running"]);

        let err = assert_err!(wait_for_state("i-1", &running_spec(), || script.describe()).await);

        match err {
            Error::TargetStatus { id, state } => {
                assert_eq!(id, "i-1");
                assert_eq!(state, "Failed");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_call_count() {
        let script = ScriptedDescribe::from_states("i-1", ["Creating"]);

        let err = assert_err!(wait_for_state("i-1", &running_spec(), || script.describe()).await);

        match err {
            Error::Timeout { id, last_state, elapsed } => {
                assert_eq!(id, "i-1");
                assert_eq!(last_state.as_deref(), Some("Creating"));
                assert!(elapsed > Duration::from_secs(3));
            }
            other => panic!("unexpected error: {}", other),
        }
        // floor(3s / 1s) + 1
        assert_eq!(script.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_call_count_uneven_interval() {
        let script = ScriptedDescribe::from_states("i-1", ["Creating"]);
        let spec = running_spec()
            .with_interval(Duration::from_secs(2))
            .with_timeout(Duration::from_secs(7));

        assert_err!(wait_for_state("i-1", &spec, || script.describe()).await);
        assert_eq!(script.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deletion_wait_not_found_immediately() {
        let script: ScriptedDescribe<serde_json::Value, String> =
            ScriptedDescribe::new("i-1", vec![DescribeStep::NotFound]);
        let spec = PollSpec::until_absent().with_interval(Duration::from_secs(1));

        let result = assert_ok!(wait_for_state("i-1", &spec, || script.describe()).await);

        assert!(result.is_absent());
        assert_eq!(result.state, None);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deletion_wait_polls_until_gone() {
        let script = ScriptedDescribe::new(
            "i-1",
            vec![
                DescribeStep::Observed(json!({"Status": "Deleting"}), "Deleting".to_string()),
                DescribeStep::Observed(json!({"Status": "Deleting"}), "Deleting".to_string()),
                DescribeStep::NotFound,
            ],
        );
        let spec = PollSpec::until_absent().with_interval(Duration::from_secs(1));

        let result = assert_ok!(wait_for_state("i-1", &spec, || script.describe()).await);
        assert!(result.is_absent());
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_propagates_when_not_deleting() {
        let script: ScriptedDescribe<serde_json::Value, String> =
            ScriptedDescribe::new("i-1", vec![DescribeStep::NotFound]);

        let err = assert_err!(wait_for_state("i-1", &running_spec(), || script.describe()).await);
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_describe_error_is_not_retried() {
        let script: ScriptedDescribe<serde_json::Value, String> = ScriptedDescribe::new(
            "i-1",
            vec![DescribeStep::Error(ApiError::new("Throttling.User", "slow down"))],
        );

        let err = assert_err!(wait_for_state("i-1", &running_spec(), || script.describe()).await);
        assert_eq!(err.code(), Some("Throttling.User"));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_goal_accepts_first_non_failure() {
        let script = ScriptedDescribe::from_states("i-1", ["Modifying"]);
        let spec = PollSpec::new(Vec::<String>::new())
            .with_fail_states(["Failed".to_string()])
            .with_interval(Duration::from_secs(1));

        let result = assert_ok!(wait_for_state("i-1", &spec, || script.describe()).await);
        assert_eq!(result.state.as_deref(), Some("Modifying"));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_counts_against_timeout() {
        let script = ScriptedDescribe::from_states("i-1", ["Creating"]);
        let spec = running_spec().with_delay(Duration::from_secs(2));

        assert_err!(wait_for_state("i-1", &spec, || script.describe()).await);
        // describes at 2s and 3s
        assert_eq!(script.calls(), 2);
    }

    #[test]
    fn test_validate_rejects_bad_specs() {
        let spec = PollSpec::new(["Running".to_string()]).with_interval(Duration::ZERO);
        assert!(matches!(spec.validate(), Err(Error::Configuration(_))));

        let spec = PollSpec::new(["Running".to_string()]).with_timeout(Duration::ZERO);
        assert!(matches!(spec.validate(), Err(Error::Configuration(_))));

        let spec = PollSpec::new(["Running".to_string()]).with_fail_states(["Running".to_string()]);
        assert!(matches!(spec.validate(), Err(Error::Configuration(_))));

        assert!(running_spec().validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_spec_never_describes() {
        let script = ScriptedDescribe::from_states("i-1", ["Running"]);
        let spec = running_spec().with_interval(Duration::ZERO);

        assert_err!(wait_for_state("i-1", &spec, || script.describe()).await);
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_action_delegates() {
        let script = ScriptedDescribe::from_states("i-1", ["Running"]);
        let result = assert_ok!(
            wait_for_action("StartInstance", "i-1", &running_spec(), || script.describe()).await
        );
        assert_eq!(result.attempts, 1);
    }
}
