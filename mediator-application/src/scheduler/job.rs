use super::trigger::Trigger;
use crate::command::SchedulableCommand;
use crate::error::AppResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 调度任务的稳定标识
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// 持久化的命令载荷：`{command, version, data}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPayload {
    pub command: String,
    pub version: usize,
    pub data: Value,
}

impl ScheduledPayload {
    pub fn encode<C: SchedulableCommand>(cmd: &C) -> AppResult<Self> {
        Ok(Self {
            command: C::NAME.to_string(),
            version: C::PAYLOAD_VERSION,
            data: serde_json::to_value(cmd)?,
        })
    }
}

/// 交给触发服务的调度任务
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCommandJob {
    job_key: JobKey,
    payload: ScheduledPayload,
    trigger: Trigger,
    created_at: DateTime<Utc>,
}

impl ScheduledCommandJob {
    pub fn new(job_key: JobKey, payload: ScheduledPayload, trigger: Trigger) -> Self {
        Self {
            job_key,
            payload,
            trigger,
            created_at: Utc::now(),
        }
    }

    pub fn job_key(&self) -> &JobKey {
        &self.job_key
    }

    pub fn command(&self) -> &str {
        &self.payload.command
    }

    pub fn payload(&self) -> &ScheduledPayload {
        &self.payload
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
