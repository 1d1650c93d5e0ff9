//! In-memory `AssistantsApi` for tests.
//!
//! Runs follow a script: each `create_run` pops the next [`RunScript`], and
//! each `get_run` advances the run one step through the scripted statuses.
//! When a run reaches `completed`, the scripted reply (if any) is appended to
//! the thread as an assistant message.

use crate::error::{ClientError, Result};
use crate::traits::AssistantsApi;
use crate::types::{
    Assistant, CreateAssistantRequest, ListMessagesQuery, MessageContent, MessageRole, Run,
    RunStatus, SortOrder, Thread, ThreadMessage, UpdateAssistantRequest,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Scripted behaviour of one run
#[derive(Debug)]
pub struct RunScript {
    /// Statuses observed in order; the first is returned by `create_run`.
    /// The last status repeats forever once reached.
    pub statuses: Vec<RunStatus>,
    /// Assistant reply appended when the run reaches `completed`
    pub reply: Option<Vec<String>>,
    /// Failures injected on consecutive `get_run` calls before statuses advance
    pub poll_errors: Vec<ClientError>,
}

impl RunScript {
    pub fn new(statuses: Vec<RunStatus>) -> Self {
        Self {
            statuses,
            reply: None,
            poll_errors: Vec::new(),
        }
    }

    /// `queued -> in_progress -> completed` with a single-segment reply
    pub fn completes_with(reply: impl Into<String>) -> Self {
        Self::new(vec![RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed])
            .with_reply(vec![reply.into()])
    }

    pub fn with_reply(mut self, segments: Vec<String>) -> Self {
        self.reply = Some(segments);
        self
    }

    pub fn with_poll_errors(mut self, errors: Vec<ClientError>) -> Self {
        self.poll_errors = errors;
        self
    }
}

/// Operations that can be made to fail on their next call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    CreateThread,
    CreateMessage,
    CreateRun,
    ListMessages,
    CancelRun,
}

struct RunState {
    run: Run,
    script: RunScript,
    step: usize,
    replied: bool,
}

#[derive(Default)]
struct State {
    next_seq: u64,
    assistants: Vec<Assistant>,
    threads: HashMap<String, Vec<ThreadMessage>>,
    runs: HashMap<String, RunState>,
    scripts: VecDeque<RunScript>,
    failures: HashMap<FakeOp, ClientError>,
    runs_created: usize,
    polls: usize,
    cancelled: Vec<String>,
}

impl State {
    fn next_id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
    }

    /// Monotonic timestamps so message order is unambiguous
    fn tick(&mut self) -> chrono::DateTime<Utc> {
        self.next_seq += 1;
        Utc.timestamp_opt(1_700_000_000 + self.next_seq as i64, 0)
            .single()
            .unwrap_or_default()
    }

    fn take_failure(&mut self, op: FakeOp) -> Result<()> {
        match self.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn push_message(
        &mut self,
        thread_id: &str,
        role: MessageRole,
        segments: Vec<String>,
        run: Option<&Run>,
    ) -> Result<ThreadMessage> {
        let id = self.next_id("msg");
        let created_at = self.tick();
        let messages = self
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| ClientError::NotFound(format!("thread {}", thread_id)))?;

        let message = ThreadMessage {
            id,
            thread_id: thread_id.to_string(),
            role,
            content: segments.into_iter().map(MessageContent::text).collect(),
            created_at,
            run_id: run.map(|r| r.id.clone()),
            assistant_id: run.map(|r| r.assistant_id.clone()),
        };
        messages.push(message.clone());
        Ok(message)
    }
}

/// In-memory Assistants API with scripted runs
#[derive(Default)]
pub struct FakeAssistants {
    state: Mutex<State>,
}

impl FakeAssistants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the script for the next created run
    pub fn script_run(&self, script: RunScript) {
        self.lock().scripts.push_back(script);
    }

    /// Make the next call of `op` fail with `err`
    pub fn fail_next(&self, op: FakeOp, err: ClientError) {
        self.lock().failures.insert(op, err);
    }

    /// Register a thread with a fixed id
    pub fn insert_thread(&self, thread_id: impl Into<String>) {
        self.lock().threads.insert(thread_id.into(), Vec::new());
    }

    /// Register an assistant as stored by the service
    pub fn insert_assistant(&self, assistant: Assistant) {
        self.lock().assistants.push(assistant);
    }

    /// Append a message directly, bypassing the API surface
    pub fn insert_message(&self, thread_id: &str, role: MessageRole, text: &str) -> ThreadMessage {
        self.lock()
            .push_message(thread_id, role, vec![text.to_string()], None)
            .expect("thread must exist")
    }

    pub fn messages(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.lock().threads.get(thread_id).cloned().unwrap_or_default()
    }

    pub fn thread_count(&self) -> usize {
        self.lock().threads.len()
    }

    pub fn runs_created(&self) -> usize {
        self.lock().runs_created
    }

    /// Number of `get_run` calls served, including injected failures
    pub fn polls(&self) -> usize {
        self.lock().polls
    }

    pub fn cancelled_runs(&self) -> Vec<String> {
        self.lock().cancelled.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AssistantsApi for FakeAssistants {
    async fn create_assistant(&self, request: CreateAssistantRequest) -> Result<Assistant> {
        let mut state = self.lock();
        let assistant = Assistant {
            id: state.next_id("asst"),
            name: Some(request.name),
            model: request.model,
            instructions: Some(request.instructions),
            description: None,
            created_at: state.tick(),
        };
        state.assistants.push(assistant.clone());
        Ok(assistant)
    }

    async fn list_assistants(&self, limit: u32) -> Result<Vec<Assistant>> {
        let state = self.lock();
        Ok(state
            .assistants
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant> {
        self.lock()
            .assistants
            .iter()
            .find(|a| a.id == assistant_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("assistant {}", assistant_id)))
    }

    async fn update_assistant(
        &self,
        assistant_id: &str,
        request: UpdateAssistantRequest,
    ) -> Result<Assistant> {
        let mut state = self.lock();
        let assistant = state
            .assistants
            .iter_mut()
            .find(|a| a.id == assistant_id)
            .ok_or_else(|| ClientError::NotFound(format!("assistant {}", assistant_id)))?;

        if let Some(name) = request.name {
            assistant.name = Some(name);
        }
        if let Some(instructions) = request.instructions {
            assistant.instructions = Some(instructions);
        }
        if let Some(model) = request.model {
            assistant.model = model;
        }
        Ok(assistant.clone())
    }

    async fn create_thread(&self) -> Result<Thread> {
        let mut state = self.lock();
        state.take_failure(FakeOp::CreateThread)?;

        let id = state.next_id("thread");
        let created_at = state.tick();
        state.threads.insert(id.clone(), Vec::new());
        Ok(Thread {
            id,
            created_at,
            metadata: None,
        })
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        text: &str,
    ) -> Result<ThreadMessage> {
        let mut state = self.lock();
        state.take_failure(FakeOp::CreateMessage)?;
        state.push_message(thread_id, role, vec![text.to_string()], None)
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let mut state = self.lock();
        state.take_failure(FakeOp::CreateRun)?;

        if !state.threads.contains_key(thread_id) {
            return Err(ClientError::NotFound(format!("thread {}", thread_id)));
        }
        let script = state
            .scripts
            .pop_front()
            .unwrap_or_else(|| RunScript::new(vec![RunStatus::Completed]));
        let status = script
            .statuses
            .first()
            .cloned()
            .unwrap_or(RunStatus::Completed);

        let run = Run {
            id: state.next_id("run"),
            thread_id: thread_id.to_string(),
            assistant_id: assistant_id.to_string(),
            status,
            created_at: state.tick(),
            last_error: None,
            incomplete_details: None,
        };
        state.runs_created += 1;
        state.runs.insert(
            run.id.clone(),
            RunState {
                run: run.clone(),
                script,
                step: 0,
                replied: false,
            },
        );
        Ok(run)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let mut state = self.lock();
        state.polls += 1;

        let entry = state
            .runs
            .get_mut(run_id)
            .filter(|r| r.run.thread_id == thread_id)
            .ok_or_else(|| ClientError::NotFound(format!("run {}", run_id)))?;

        if !entry.script.poll_errors.is_empty() {
            return Err(entry.script.poll_errors.remove(0));
        }

        if entry.step + 1 < entry.script.statuses.len() {
            entry.step += 1;
            entry.run.status = entry.script.statuses[entry.step].clone();
        }

        let run = entry.run.clone();
        let pending_reply = if run.status == RunStatus::Completed && !entry.replied {
            entry.replied = true;
            entry.script.reply.clone()
        } else {
            None
        };

        if let Some(segments) = pending_reply {
            state.push_message(thread_id, MessageRole::Assistant, segments, Some(&run))?;
        }

        Ok(run)
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let mut state = self.lock();
        state.take_failure(FakeOp::CancelRun)?;

        let entry = state
            .runs
            .get_mut(run_id)
            .filter(|r| r.run.thread_id == thread_id)
            .ok_or_else(|| ClientError::NotFound(format!("run {}", run_id)))?;
        entry.run.status = RunStatus::Cancelling;
        let run = entry.run.clone();
        state.cancelled.push(run_id.to_string());
        Ok(run)
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        query: ListMessagesQuery,
    ) -> Result<Vec<ThreadMessage>> {
        let mut state = self.lock();
        state.take_failure(FakeOp::ListMessages)?;

        let messages = state
            .threads
            .get(thread_id)
            .ok_or_else(|| ClientError::NotFound(format!("thread {}", thread_id)))?;

        let limit = query.limit as usize;
        let page: Vec<ThreadMessage> = match query.order {
            SortOrder::Asc => messages.iter().take(limit).cloned().collect(),
            SortOrder::Desc => messages.iter().rev().take(limit).cloned().collect(),
        };
        Ok(page)
    }
}
