//! Request-file to topic assignment, and the round-robin partition of the
//! resulting clients over parallel workers.
//!
//! Both steps are pure: the same files, topics, strategy and worker count
//! always produce the same plan.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::RequestSource;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicAssignment {
    /// Every response goes to the single configured topic.
    OneTopic,
    /// Topic is the configured base name followed by the request file name.
    #[default]
    TopicPerRequest,
    /// Topic list is positional: file `i` goes to topic `i`.
    CustomAssignment,
}

impl TopicAssignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicAssignment::OneTopic => "ONE_TOPIC",
            TopicAssignment::TopicPerRequest => "TOPIC_PER_REQUEST",
            TopicAssignment::CustomAssignment => "CUSTOM_ASSIGNMENT",
        }
    }
}

impl fmt::Display for TopicAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicAssignment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ONE_TOPIC" => Ok(TopicAssignment::OneTopic),
            "TOPIC_PER_REQUEST" => Ok(TopicAssignment::TopicPerRequest),
            "CUSTOM_ASSIGNMENT" => Ok(TopicAssignment::CustomAssignment),
            other => Err(ConfigError::UnknownAssignment(other.to_string())),
        }
    }
}

/// One request file bound to its destination topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    /// Position of the file in the configured list.
    pub index: usize,
    pub source: RequestSource,
    pub channel: String,
}

/// Derives the topic of every request file. `prefix` is prepended to each name.
pub fn assign_channels(
    files: &[RequestSource],
    topics: &[String],
    strategy: TopicAssignment,
    prefix: &str,
) -> Result<Vec<Assignment>, ConfigError> {
    let channel_for = |i: usize, file: &RequestSource| -> String {
        match strategy {
            TopicAssignment::OneTopic => format!("{prefix}{}", topics[0]),
            TopicAssignment::TopicPerRequest => format!("{prefix}{}{}", topics[0], file.file_name()),
            TopicAssignment::CustomAssignment => format!("{prefix}{}", topics[i]),
        }
    };

    match strategy {
        TopicAssignment::OneTopic | TopicAssignment::TopicPerRequest => {
            if topics.len() != 1 {
                return Err(ConfigError::SingleTopicExpected {
                    strategy,
                    count: topics.len(),
                });
            }
        }
        TopicAssignment::CustomAssignment => {
            if topics.len() != files.len() {
                return Err(ConfigError::TopicCountMismatch {
                    files: files.len(),
                    topics: topics.len(),
                });
            }
        }
    }

    Ok(files
        .iter()
        .enumerate()
        .map(|(i, file)| Assignment {
            index: i,
            source: file.clone(),
            channel: channel_for(i, file),
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerGroup {
    pub worker: usize,
    pub assignments: Vec<Assignment>,
}

impl WorkerGroup {
    pub fn files(&self) -> impl Iterator<Item = &RequestSource> {
        self.assignments.iter().map(|a| &a.source)
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.assignments.iter().map(|a| a.channel.as_str())
    }
}

/// Partition of assignments into `min(workers, files)` groups.
///
/// File `i` lands in group `i mod groups`, so group sizes differ by at most one
/// and earlier groups are never handed a contiguous block of extra files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentPlan {
    pub strategy: TopicAssignment,
    pub groups: Vec<WorkerGroup>,
}

impl AssignmentPlan {
    pub fn build(
        assignments: &[Assignment],
        strategy: TopicAssignment,
        requested_workers: usize,
    ) -> Result<Self, ConfigError> {
        if requested_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        let group_count = requested_workers.min(assignments.len());
        let mut groups: Vec<WorkerGroup> = (0..group_count)
            .map(|worker| WorkerGroup {
                worker,
                assignments: Vec::new(),
            })
            .collect();
        for (i, assignment) in assignments.iter().enumerate() {
            groups[i % group_count].assignments.push(assignment.clone());
        }
        Ok(Self { strategy, groups })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
