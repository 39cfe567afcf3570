use std::time::Duration;

use omni_jenkins::{
    BuildRef, Cause, ConsoleChunk, DownstreamProject, ExecutionAction, ExecutionInfo,
    JobDefinition, QueueExecutable, QueueItem, QueueTask, execution_url,
};

use crate::jobs::{RootExecution, TrackingOptions};

/// Idle definition: last build `last_build` (if any), next `next_build_number`.
#[must_use]
pub fn definition(next_build_number: u64, last_build: Option<u64>) -> JobDefinition {
    JobDefinition {
        next_build_number,
        last_build: last_build.map(|number| BuildRef { number, url: None }),
        last_completed_build: last_build.map(|number| BuildRef { number, url: None }),
        ..JobDefinition::default()
    }
}

#[must_use]
pub fn downstream(name: &str, url: &str) -> DownstreamProject {
    DownstreamProject {
        name: name.to_string(),
        url: url.to_string(),
    }
}

/// Execution `number` of `definition_url` started at `timestamp`.
#[must_use]
pub fn execution(
    definition_url: &str,
    number: u64,
    timestamp: i64,
    result: Option<&str>,
    causes: Vec<Cause>,
) -> ExecutionInfo {
    ExecutionInfo {
        number: Some(number),
        url: Some(execution_url(definition_url, number)),
        timestamp,
        building: result.is_none(),
        result: result.map(str::to_string),
        actions: vec![ExecutionAction::default(), ExecutionAction { causes }],
    }
}

#[must_use]
pub fn console(text: &str, more_data: bool, next_offset: u64) -> ConsoleChunk {
    ConsoleChunk {
        text: text.to_string(),
        more_data,
        next_offset,
    }
}

#[must_use]
pub fn root_execution(definition_url: &str, name: &str, number: u64) -> RootExecution {
    RootExecution {
        name: name.to_string(),
        definition_url: definition_url.to_string(),
        execution_url: execution_url(definition_url, number),
        execution_number: number,
    }
}

/// Options with millisecond intervals so scripted runs finish quickly.
#[must_use]
pub fn fast_options(capture_console: bool, capture_pipeline: bool) -> TrackingOptions {
    TrackingOptions {
        capture_console,
        capture_pipeline,
        poll_interval: Duration::from_millis(1),
        tick_interval: Duration::from_millis(1),
        search_restart_limit: None,
    }
}

#[must_use]
pub fn queue_item_waiting() -> QueueItem {
    QueueItem::default()
}

#[must_use]
pub fn queue_item_cancelled() -> QueueItem {
    QueueItem {
        cancelled: true,
        ..QueueItem::default()
    }
}

#[must_use]
pub fn queue_item_executing(definition_url: &str, name: &str, number: u64) -> QueueItem {
    QueueItem {
        executable: Some(QueueExecutable {
            number,
            url: execution_url(definition_url, number),
        }),
        task: Some(QueueTask {
            name: name.to_string(),
            url: definition_url.to_string(),
        }),
        ..QueueItem::default()
    }
}
