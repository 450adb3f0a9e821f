//! 载荷上抬（Payload Upcasting）
//!
//! 已持久化的调度任务可能早于命令结构的演进。触发时先经过上抬链，
//! 把旧版本载荷逐步转换（改名/补字段/丢弃）为当前版本再解码。
//!
use super::job::ScheduledPayload;
use mediator_domain::error::{DomainError, DomainResult as Result};
use std::sync::Arc;

// 防止不提升版本的上抬器造成死循环
const MAX_UPCAST_ROUNDS: usize = 32;

/// 载荷版本升级器
pub trait PayloadUpcaster: Send + Sync {
    fn applies(&self, command: &str, version: usize) -> bool;

    fn upcast(&self, payload: ScheduledPayload) -> Result<PayloadUpcasterResult>;
}

impl<T> PayloadUpcaster for Arc<T>
where
    T: PayloadUpcaster + ?Sized,
{
    fn applies(&self, command: &str, version: usize) -> bool {
        (**self).applies(command, version)
    }

    fn upcast(&self, payload: ScheduledPayload) -> Result<PayloadUpcasterResult> {
        (**self).upcast(payload)
    }
}

/// 升级结果：新的载荷，或丢弃（该任务触发时不再分发）
pub enum PayloadUpcasterResult {
    One(ScheduledPayload),
    Drop,
}

/// 载荷升级链：按顺序应用多个 Upcaster，直到不再有升级发生
#[derive(Clone, Default)]
pub struct PayloadUpcasterChain {
    stages: Vec<Arc<dyn PayloadUpcaster>>,
}

impl PayloadUpcasterChain {
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// 返回 `None` 表示载荷被丢弃
    pub fn upcast(&self, mut payload: ScheduledPayload) -> Result<Option<ScheduledPayload>> {
        for _ in 0..MAX_UPCAST_ROUNDS {
            let mut changed = false;
            for stage in &self.stages {
                if !stage.applies(&payload.command, payload.version) {
                    continue;
                }
                changed = true;
                match stage.upcast(payload)? {
                    PayloadUpcasterResult::One(next) => payload = next,
                    PayloadUpcasterResult::Drop => return Ok(None),
                }
            }
            if !changed {
                return Ok(Some(payload));
            }
        }
        Err(DomainError::UpcastFailed {
            payload_type: payload.command,
            from_version: payload.version,
            stage: None,
            reason: format!("payload still upcasting after {MAX_UPCAST_ROUNDS} rounds"),
        })
    }
}

impl FromIterator<Arc<dyn PayloadUpcaster>> for PayloadUpcasterChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn PayloadUpcaster>>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

impl Extend<Arc<dyn PayloadUpcaster>> for PayloadUpcasterChain {
    fn extend<I: IntoIterator<Item = Arc<dyn PayloadUpcaster>>>(&mut self, iter: I) {
        self.stages.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mk(command: &str, version: usize, data: serde_json::Value) -> ScheduledPayload {
        ScheduledPayload {
            command: command.into(),
            version,
            data,
        }
    }

    struct RenameRecipient; // v1 { to } -> v2 { recipient }
    impl PayloadUpcaster for RenameRecipient {
        fn applies(&self, command: &str, version: usize) -> bool {
            command == "SendReminder" && version == 1
        }
        fn upcast(&self, payload: ScheduledPayload) -> Result<PayloadUpcasterResult> {
            let to = payload.data.get("to").cloned().unwrap_or_default();
            Ok(PayloadUpcasterResult::One(mk(
                "SendReminder",
                2,
                json!({ "recipient": to }),
            )))
        }
    }

    struct AddChannel; // v2 -> v3 { channel: "email" }
    impl PayloadUpcaster for AddChannel {
        fn applies(&self, command: &str, version: usize) -> bool {
            command == "SendReminder" && version == 2
        }
        fn upcast(&self, mut payload: ScheduledPayload) -> Result<PayloadUpcasterResult> {
            payload.data["channel"] = json!("email");
            payload.version = 3;
            Ok(PayloadUpcasterResult::One(payload))
        }
    }

    struct DropRetired;
    impl PayloadUpcaster for DropRetired {
        fn applies(&self, command: &str, _version: usize) -> bool {
            command == "RetiredCommand"
        }
        fn upcast(&self, _payload: ScheduledPayload) -> Result<PayloadUpcasterResult> {
            Ok(PayloadUpcasterResult::Drop)
        }
    }

    fn chain() -> PayloadUpcasterChain {
        // 故意倒序：链会多轮应用直到稳定
        vec![
            Arc::new(AddChannel) as Arc<dyn PayloadUpcaster>,
            Arc::new(RenameRecipient) as Arc<dyn PayloadUpcaster>,
            Arc::new(DropRetired) as Arc<dyn PayloadUpcaster>,
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn upcasts_until_stable() {
        let out = chain()
            .upcast(mk("SendReminder", 1, json!({"to": "ada"})))
            .unwrap()
            .unwrap();
        assert_eq!(out.version, 3);
        assert_eq!(out.data, json!({"recipient": "ada", "channel": "email"}));
    }

    #[test]
    fn current_payload_passes_through() {
        let current = mk("SendReminder", 3, json!({"recipient": "x", "channel": "sms"}));
        assert_eq!(chain().upcast(current.clone()).unwrap(), Some(current));
    }

    #[test]
    fn dropped_payload_yields_none() {
        assert_eq!(chain().upcast(mk("RetiredCommand", 1, json!({}))).unwrap(), None);
    }

    struct Stuck;
    impl PayloadUpcaster for Stuck {
        fn applies(&self, _command: &str, _version: usize) -> bool {
            true
        }
        fn upcast(&self, payload: ScheduledPayload) -> Result<PayloadUpcasterResult> {
            Ok(PayloadUpcasterResult::One(payload))
        }
    }

    #[test]
    fn non_converging_chain_fails() {
        let chain: PayloadUpcasterChain = vec![Arc::new(Stuck) as Arc<dyn PayloadUpcaster>]
            .into_iter()
            .collect();
        let err = chain.upcast(mk("Any", 1, json!({}))).unwrap_err();
        assert!(matches!(err, DomainError::UpcastFailed { stage: None, .. }));
    }
}
