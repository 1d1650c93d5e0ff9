use crate::error::{Result, TurnError, TurnStage};
use crate::extract::{extract_reply, ReplyBoundary};
use crate::policy::PollPolicy;
use crate::status::{classify, Classification, FailureReason};
use relay_openai::{AssistantsApi, ListMessagesQuery, MessageRole, Run, RunStatus, SortOrder};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Page size used when reading back the thread after a run
const REPLY_PAGE_SIZE: u32 = 100;

/// Assistant reply for one completed turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub thread_id: String,
    pub run_id: String,
    pub text: String,
    /// Status checks made before the run finished
    pub polls: u32,
}

/// Result of [`TurnOrchestrator::send_message`]
///
/// `thread_id` is set whenever a thread was resolved, including a freshly
/// created one whose turn then failed.
#[derive(Debug)]
pub struct ConversationTurn {
    pub thread_id: Option<String>,
    pub created_thread: bool,
    pub outcome: Result<TurnReply>,
}

/// Drives one conversational turn: submit, run, poll, read back the reply.
///
/// Holds only the shared client and the poll policy. Every call owns its own
/// run handle, so one orchestrator serves concurrent turns.
#[derive(Clone)]
pub struct TurnOrchestrator {
    client: Arc<dyn AssistantsApi>,
    policy: PollPolicy,
}

impl TurnOrchestrator {
    pub fn new(client: Arc<dyn AssistantsApi>, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Run a turn, creating a thread first when none is given
    pub async fn send_message(
        &self,
        thread_id: Option<&str>,
        assistant_id: &str,
        message: &str,
    ) -> ConversationTurn {
        let existing = thread_id.map(str::trim).filter(|id| !id.is_empty());

        let (thread_id, created_thread) = match existing {
            Some(id) => (id.to_string(), false),
            None => {
                if let Err(e) = validate(assistant_id, message) {
                    return ConversationTurn {
                        thread_id: None,
                        created_thread: false,
                        outcome: Err(e),
                    };
                }
                match self.client.create_thread().await {
                    Ok(thread) => {
                        tracing::info!(thread_id = %thread.id, "Created new thread");
                        (thread.id, true)
                    }
                    Err(e) => {
                        return ConversationTurn {
                            thread_id: None,
                            created_thread: false,
                            outcome: Err(TurnError::submission(TurnStage::CreateThread)(e)),
                        };
                    }
                }
            }
        };

        let outcome = self.execute_turn(&thread_id, assistant_id, message).await;
        ConversationTurn {
            thread_id: Some(thread_id),
            created_thread,
            outcome,
        }
    }

    /// Submit `message` to an existing thread and wait for the assistant's reply
    pub async fn execute_turn(
        &self,
        thread_id: &str,
        assistant_id: &str,
        message: &str,
    ) -> Result<TurnReply> {
        if thread_id.trim().is_empty() {
            return Err(TurnError::InvalidInput("thread_id must not be empty".to_string()));
        }
        validate(assistant_id, message)?;

        let trigger = self
            .client
            .create_message(thread_id, MessageRole::User, message)
            .await
            .map_err(TurnError::submission(TurnStage::CreateMessage))?;

        let run = self
            .client
            .create_run(thread_id, assistant_id)
            .await
            .map_err(TurnError::submission(TurnStage::CreateRun))?;

        tracing::info!(
            thread_id = %thread_id,
            run_id = %run.id,
            status = %run.status,
            "Run created"
        );

        let (run, polls) = self.poll_run(run).await?;

        let messages = self
            .client
            .list_messages(
                thread_id,
                ListMessagesQuery::new(SortOrder::Desc).limit(REPLY_PAGE_SIZE),
            )
            .await
            .map_err(TurnError::submission(TurnStage::ListMessages))?;

        let boundary = ReplyBoundary::new(trigger.id, run.id.clone());
        let text = extract_reply(&messages, SortOrder::Desc, &boundary).map_err(|e| {
            tracing::error!(run_id = %run.id, "Run completed without an assistant reply");
            e
        })?;

        tracing::info!(run_id = %run.id, polls, "Turn completed");

        Ok(TurnReply {
            thread_id: thread_id.to_string(),
            run_id: run.id,
            text,
            polls,
        })
    }

    /// Poll `run` until it reaches a terminal status or the policy's bounds.
    ///
    /// Returns the completed run and the number of status checks made.
    pub async fn poll_run(&self, mut run: Run) -> Result<(Run, u32)> {
        let started = Instant::now();
        let mut delay = self.policy.interval;
        let mut attempts: u32 = 0;

        loop {
            match classify(&run.status) {
                Classification::Success => return Ok((run, attempts)),
                Classification::Failure(reason) => return Err(self.run_failed(&run, reason).await),
                Classification::Pending => {}
            }

            let elapsed = started.elapsed();
            if attempts >= self.policy.max_attempts || elapsed >= self.policy.max_wait {
                return Err(self.poll_timeout(&run, attempts, elapsed));
            }

            // the last sleep is cut short so the final check lands on the deadline
            tokio::time::sleep(delay.min(self.policy.max_wait - elapsed)).await;
            delay = self.policy.next_delay(delay);
            attempts += 1;

            let previous = run.status.clone();
            run = self.fetch_run(&run, attempts, started, &mut delay).await?;

            if run.status != previous {
                tracing::debug!(
                    run_id = %run.id,
                    from = %previous,
                    to = %run.status,
                    attempt = attempts,
                    "Run status changed"
                );
            }
        }
    }

    /// One status check, retrying transient errors within the wall-clock bound
    async fn fetch_run(
        &self,
        run: &Run,
        attempts: u32,
        started: Instant,
        delay: &mut Duration,
    ) -> Result<Run> {
        let mut retries: u32 = 0;

        loop {
            let err = match self.client.get_run(&run.thread_id, &run.id).await {
                Ok(fresh) => return Ok(fresh),
                Err(e) => e,
            };

            if !err.is_transient() || retries >= self.policy.transient_retries {
                return Err(TurnError::submission(TurnStage::PollRun)(err));
            }
            let elapsed = started.elapsed();
            if elapsed >= self.policy.max_wait {
                tracing::warn!(run_id = %run.id, error = %err, "Poll deadline reached while retrying");
                return Err(self.poll_timeout(run, attempts, elapsed));
            }

            retries += 1;
            tracing::warn!(
                run_id = %run.id,
                retry = retries,
                error = %err,
                "Transient error polling run, retrying"
            );
            tokio::time::sleep((*delay).min(self.policy.max_wait - elapsed)).await;
            *delay = self.policy.next_delay(*delay);
        }
    }

    async fn run_failed(&self, run: &Run, reason: FailureReason) -> TurnError {
        let detail = run.failure_detail();
        tracing::warn!(
            run_id = %run.id,
            status = %run.status,
            detail = detail.as_deref().unwrap_or(""),
            "Run ended without completing"
        );

        if reason == FailureReason::RequiresAction {
            // Tool outputs are never submitted, so the run would hold the
            // thread until it expires.
            if let Err(e) = self.client.cancel_run(&run.thread_id, &run.id).await {
                tracing::warn!(run_id = %run.id, error = %e, "Failed to cancel run awaiting tool outputs");
            }
        }

        TurnError::RunFailure {
            status: run.status.clone(),
            detail,
        }
    }

    fn poll_timeout(&self, run: &Run, attempts: u32, elapsed: Duration) -> TurnError {
        tracing::warn!(
            run_id = %run.id,
            status = %run.status,
            attempts,
            elapsed_ms = elapsed.as_millis() as u64,
            "Gave up waiting for run"
        );
        TurnError::PollTimeout {
            attempts,
            elapsed,
            last_status: run.status.clone(),
        }
    }

    /// Ask the service to cancel a run; polling callers are unaffected
    pub async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<RunStatus> {
        let run = self
            .client
            .cancel_run(thread_id, run_id)
            .await
            .map_err(TurnError::submission(TurnStage::CancelRun))?;
        Ok(run.status)
    }
}

fn validate(assistant_id: &str, message: &str) -> Result<()> {
    if assistant_id.trim().is_empty() {
        return Err(TurnError::InvalidInput("assistant_id must not be empty".to_string()));
    }
    if message.trim().is_empty() {
        return Err(TurnError::InvalidInput("message must not be empty".to_string()));
    }
    Ok(())
}
