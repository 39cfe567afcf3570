//! Test-only exports for integration tests: a scripted in-memory
//! [`JobStateClient`] and fixture builders.

mod fixtures;

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use omni_jenkins::{
    ConsoleChunk, ExecutionInfo, ExecutionLookup, JenkinsError, JobDefinition, JobStateClient,
    QueueHandle, QueueItem,
};

pub use fixtures::{
    console, definition, downstream, execution, fast_options, queue_item_cancelled,
    queue_item_executing, queue_item_waiting, root_execution,
};

/// One call made against [`ScriptedJobStateClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Definition(String),
    Execution(String, u64),
    Console(String, u64),
    Enqueue(String, Option<Vec<(String, String)>>),
    PollQueue(String),
}

/// Scripted reply: a value, or an HTTP status to fail with.
type Scripted<T> = Result<T, u16>;

/// Replies queued per URL. The last reply of a queue repeats forever.
#[derive(Debug)]
struct ReplyQueue<T>(VecDeque<Scripted<T>>);

impl<T: Clone> ReplyQueue<T> {
    fn pop(&mut self) -> Option<Scripted<T>> {
        if self.0.len() > 1 {
            self.0.pop_front()
        } else {
            self.0.front().cloned()
        }
    }
}

impl<T> Default for ReplyQueue<T> {
    fn default() -> Self {
        Self(VecDeque::new())
    }
}

#[derive(Debug, Default)]
struct Script {
    definitions: HashMap<String, ReplyQueue<JobDefinition>>,
    executions: HashMap<(String, u64), ReplyQueue<ExecutionLookup>>,
    consoles: HashMap<String, ReplyQueue<ConsoleChunk>>,
    queue_items: ReplyQueue<QueueItem>,
    queue_url: Option<String>,
    calls: Vec<ClientCall>,
}

/// In-memory Jenkins whose answers are scripted per URL.
///
/// Unscripted executions answer `NotFound`; other unscripted reads fail with
/// status 500 so a missing fixture shows up as a run error.
#[derive(Debug, Default)]
pub struct ScriptedJobStateClient {
    script: Mutex<Script>,
}

impl ScriptedJobStateClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut script)
    }

    /// Queue a definition reply for `definition_url`.
    pub fn push_definition(&self, definition_url: &str, definition: JobDefinition) -> &Self {
        self.with_script(|script| {
            script
                .definitions
                .entry(definition_url.to_string())
                .or_default()
                .0
                .push_back(Ok(definition));
        });
        self
    }

    /// Queue a reply for execution `number` of `definition_url`.
    pub fn push_execution(&self, definition_url: &str, number: u64, info: ExecutionInfo) -> &Self {
        self.push_execution_lookup(definition_url, number, ExecutionLookup::Found(info))
    }

    /// Queue a 404 for execution `number` of `definition_url`.
    pub fn push_execution_missing(&self, definition_url: &str, number: u64) -> &Self {
        self.push_execution_lookup(definition_url, number, ExecutionLookup::NotFound)
    }

    /// Queue a failing status for execution `number` of `definition_url`.
    pub fn push_execution_status(&self, definition_url: &str, number: u64, status: u16) -> &Self {
        self.with_script(|script| {
            script
                .executions
                .entry((definition_url.to_string(), number))
                .or_default()
                .0
                .push_back(Err(status));
        });
        self
    }

    fn push_execution_lookup(
        &self,
        definition_url: &str,
        number: u64,
        lookup: ExecutionLookup,
    ) -> &Self {
        self.with_script(|script| {
            script
                .executions
                .entry((definition_url.to_string(), number))
                .or_default()
                .0
                .push_back(Ok(lookup));
        });
        self
    }

    /// Queue a console chunk for `execution_url`.
    pub fn push_console(&self, execution_url: &str, chunk: ConsoleChunk) -> &Self {
        self.with_script(|script| {
            script
                .consoles
                .entry(execution_url.to_string())
                .or_default()
                .0
                .push_back(Ok(chunk));
        });
        self
    }

    /// Queue a queue-item poll reply. `enqueue` answers with `queue_url`.
    pub fn push_queue_item(&self, queue_url: &str, item: QueueItem) -> &Self {
        self.with_script(|script| {
            script.queue_url = Some(queue_url.to_string());
            script.queue_items.0.push_back(Ok(item));
        });
        self
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ClientCall> {
        self.with_script(|script| script.calls.clone())
    }

    /// Number of execution lookups made for `number` of `definition_url`.
    #[must_use]
    pub fn execution_calls(&self, definition_url: &str, number: u64) -> usize {
        self.with_script(|script| {
            script
                .calls
                .iter()
                .filter(|call| {
                    matches!(
                        call,
                        ClientCall::Execution(url, n) if url == definition_url && *n == number
                    )
                })
                .count()
        })
    }
}

fn scripted<T>(reply: Option<Scripted<T>>, context: String) -> omni_jenkins::Result<T> {
    match reply {
        Some(Ok(value)) => Ok(value),
        Some(Err(status)) => Err(JenkinsError::UnexpectedStatus { status, context }),
        None => Err(JenkinsError::UnexpectedStatus {
            status: 500,
            context: format!("{context} (unscripted)"),
        }),
    }
}

#[async_trait]
impl JobStateClient for ScriptedJobStateClient {
    async fn get_definition(&self, definition_url: &str) -> omni_jenkins::Result<JobDefinition> {
        let reply = self.with_script(|script| {
            script
                .calls
                .push(ClientCall::Definition(definition_url.to_string()));
            script
                .definitions
                .get_mut(definition_url)
                .and_then(ReplyQueue::pop)
        });
        scripted(reply, format!("fetching definition {definition_url}"))
    }

    async fn get_execution(
        &self,
        definition_url: &str,
        number: u64,
    ) -> omni_jenkins::Result<ExecutionLookup> {
        let reply = self.with_script(|script| {
            script
                .calls
                .push(ClientCall::Execution(definition_url.to_string(), number));
            script
                .executions
                .get_mut(&(definition_url.to_string(), number))
                .and_then(ReplyQueue::pop)
        });
        scripted(
            Some(reply.unwrap_or(Ok(ExecutionLookup::NotFound))),
            format!("fetching execution {definition_url} #{number}"),
        )
    }

    async fn get_console(
        &self,
        execution_url: &str,
        offset: u64,
    ) -> omni_jenkins::Result<ConsoleChunk> {
        let reply = self.with_script(|script| {
            script
                .calls
                .push(ClientCall::Console(execution_url.to_string(), offset));
            script
                .consoles
                .get_mut(execution_url)
                .and_then(ReplyQueue::pop)
        });
        scripted(reply, format!("reading console {execution_url}"))
    }

    async fn enqueue(
        &self,
        definition_url: &str,
        parameters: Option<&[(String, String)]>,
    ) -> omni_jenkins::Result<QueueHandle> {
        let queue_url = self.with_script(|script| {
            script.calls.push(ClientCall::Enqueue(
                definition_url.to_string(),
                parameters.map(<[_]>::to_vec),
            ));
            script.queue_url.clone()
        });
        queue_url
            .map(|url| QueueHandle { url })
            .ok_or(JenkinsError::MissingHeader("Location"))
    }

    async fn poll_queue_item(&self, handle: &QueueHandle) -> omni_jenkins::Result<QueueItem> {
        let reply = self.with_script(|script| {
            script.calls.push(ClientCall::PollQueue(handle.url.clone()));
            script.queue_items.pop()
        });
        scripted(reply, format!("polling queue item {}", handle.url))
    }
}
