use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// 调度触发条件
///
/// - `Once`：在指定时刻触发一次；
/// - `Every`：固定间隔重复触发（首次在一个间隔之后）；
/// - `Cron`：按 cron 表达式触发（秒 分 时 日 月 周 [年]）。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Once { at: DateTime<Utc> },
    Every { interval: Duration },
    Cron { expression: String },
}

impl Trigger {
    pub fn once(at: DateTime<Utc>) -> Self {
        Trigger::Once { at }
    }

    pub fn after(delay: Duration) -> AppResult<Self> {
        let delay = chrono::Duration::from_std(delay)
            .map_err(|e| AppError::invalid_trigger(format!("delay out of range: {e}")))?;
        Ok(Trigger::Once {
            at: Utc::now() + delay,
        })
    }

    pub fn every(interval: Duration) -> Self {
        Trigger::Every { interval }
    }

    pub fn cron(expression: impl Into<String>) -> Self {
        Trigger::Cron {
            expression: expression.into(),
        }
    }

    pub fn is_one_shot(&self) -> bool {
        matches!(self, Trigger::Once { .. })
    }

    /// 校验触发条件：过去的时刻、零间隔、非法或永不触发的 cron 表达式都会被拒绝
    pub fn validate(&self, now: DateTime<Utc>) -> AppResult<()> {
        match self {
            Trigger::Once { at } if *at <= now => Err(AppError::invalid_trigger(format!(
                "one-shot trigger at {at} is not in the future"
            ))),
            Trigger::Once { .. } => Ok(()),
            Trigger::Every { interval } if interval.is_zero() => {
                Err(AppError::invalid_trigger("interval must be greater than zero"))
            }
            Trigger::Every { .. } => Ok(()),
            Trigger::Cron { expression } => {
                let schedule = parse_cron(expression)?;
                if schedule.after(&now).next().is_none() {
                    return Err(AppError::invalid_trigger(format!(
                        "cron expression `{expression}` never fires after {now}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// `now` 之后的下一次触发时刻
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Once { at } => (*at > now).then_some(*at),
            Trigger::Every { interval } => {
                chrono::Duration::from_std(*interval).ok().map(|d| now + d)
            }
            Trigger::Cron { expression } => parse_cron(expression).ok()?.after(&now).next(),
        }
    }
}

fn parse_cron(expression: &str) -> AppResult<Schedule> {
    Schedule::from_str(expression)
        .map_err(|e| AppError::invalid_trigger(format!("invalid cron expression `{expression}`: {e}")))
}
