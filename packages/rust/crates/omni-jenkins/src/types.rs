//! Wire types for the subset of the Jenkins JSON API the tracker reads.

use serde::Deserialize;

/// Reference to a numbered execution inside a job definition.
///
/// Jenkins normally sends `{ "number": 12, "url": "..." }`; a bare number is
/// accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "BuildRefWire")]
pub struct BuildRef {
    /// Execution number.
    pub number: u64,
    /// Execution URL, when the server reports one.
    pub url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BuildRefWire {
    Number(u64),
    Object {
        number: u64,
        #[serde(default)]
        url: Option<String>,
    },
}

impl From<BuildRefWire> for BuildRef {
    fn from(wire: BuildRefWire) -> Self {
        match wire {
            BuildRefWire::Number(number) => Self { number, url: None },
            BuildRefWire::Object { number, url } => Self { number, url },
        }
    }
}

/// Downstream project declared by a job definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownstreamProject {
    /// Job name.
    pub name: String,
    /// Job definition URL.
    pub url: String,
}

/// Job definition metadata (`<job>/api/json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDefinition {
    /// Job name.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether an execution of this job is waiting in the build queue.
    #[serde(default)]
    pub in_queue: bool,
    /// Number the next execution will receive.
    #[serde(default)]
    pub next_build_number: u64,
    /// Most recently started execution.
    #[serde(default)]
    pub last_build: Option<BuildRef>,
    /// Most recently completed execution.
    #[serde(default)]
    pub last_completed_build: Option<BuildRef>,
    /// Jobs triggered when this one completes.
    #[serde(default)]
    pub downstream_projects: Vec<DownstreamProject>,
}

impl JobDefinition {
    /// Most likely execution number for a run triggered just now: the queued
    /// one when something is in queue, else the last started one.
    #[must_use]
    pub fn initial_search_number(&self) -> u64 {
        if self.in_queue {
            return self.next_build_number;
        }
        self.last_build
            .as_ref()
            .map_or(self.next_build_number, |build| build.number)
    }

    /// Number of the last completed execution, if any.
    #[must_use]
    pub fn last_completed_number(&self) -> Option<u64> {
        self.last_completed_build.as_ref().map(|build| build.number)
    }
}

/// One recorded reason for an execution to run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cause {
    /// Human-readable description.
    #[serde(default)]
    pub short_description: Option<String>,
    /// Upstream job name, for upstream-triggered causes.
    #[serde(default)]
    pub upstream_project: Option<String>,
    /// Upstream execution number, for upstream-triggered causes.
    #[serde(default)]
    pub upstream_build: Option<u64>,
    /// Upstream execution URL (relative), for upstream-triggered causes.
    #[serde(default)]
    pub upstream_url: Option<String>,
}

impl Cause {
    /// Build an upstream cause; mostly useful for tests and fixtures.
    #[must_use]
    pub fn upstream(project: &str, build: u64) -> Self {
        Self {
            short_description: Some(format!("Started by upstream project \"{project}\"")),
            upstream_project: Some(project.to_string()),
            upstream_build: Some(build),
            upstream_url: Some(format!("job/{project}/")),
        }
    }
}

/// Action entry of an execution; only causes are read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExecutionAction {
    /// Causes carried by this action (empty for unrelated actions).
    #[serde(default)]
    pub causes: Vec<Cause>,
}

/// Numbered execution metadata (`<job>/<number>/api/json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExecutionInfo {
    /// Execution number.
    #[serde(default)]
    pub number: Option<u64>,
    /// Execution URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Start time in epoch millis.
    #[serde(default)]
    pub timestamp: i64,
    /// Still running.
    #[serde(default)]
    pub building: bool,
    /// Result code; absent until the execution finishes.
    #[serde(default)]
    pub result: Option<String>,
    /// Actions; the cause list lives in one of them.
    #[serde(default)]
    pub actions: Vec<ExecutionAction>,
}

impl ExecutionInfo {
    /// Causes of this execution, in server order. The first one is the
    /// trigger that actually scheduled it; the rest were coalesced into it.
    #[must_use]
    pub fn causes(&self) -> &[Cause] {
        self.actions
            .iter()
            .find(|action| !action.causes.is_empty())
            .map_or(&[], |action| action.causes.as_slice())
    }
}

/// Lookup of a numbered execution that may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionLookup {
    /// The execution exists.
    Found(ExecutionInfo),
    /// 404: not created (yet).
    NotFound,
}

/// One progressive console read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleChunk {
    /// Text returned from the requested offset.
    pub text: String,
    /// `X-More-Data: true`: the execution is still producing output.
    pub more_data: bool,
    /// `X-Text-Size`: offset to request next.
    pub next_offset: u64,
}

/// Handle returned by an accepted enqueue request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    /// Queue item JSON API URL.
    pub url: String,
}

/// Executable assigned to a queue item once it leaves the queue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueExecutable {
    /// Execution number.
    pub number: u64,
    /// Execution URL.
    pub url: String,
}

/// Job a queue item belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueTask {
    /// Job name.
    pub name: String,
    /// Job definition URL.
    pub url: String,
}

/// Queue item (`<queue item>/api/json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueueItem {
    /// Cancelled by a user or the server.
    #[serde(default)]
    pub cancelled: bool,
    /// Misspelled variant some Jenkins versions emit.
    #[serde(default)]
    pub canceled: bool,
    /// Present once the item started executing.
    #[serde(default)]
    pub executable: Option<QueueExecutable>,
    /// Job this item belongs to.
    #[serde(default)]
    pub task: Option<QueueTask>,
}

impl QueueItem {
    /// Whether the item was cancelled under either spelling.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled || self.canceled
    }
}
