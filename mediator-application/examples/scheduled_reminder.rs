/// 命令调度示例
/// 基于 tokio-cron-scheduler 的触发服务：一次性提醒与周期性对账
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use mediator_application::command_handler::CommandHandler;
use mediator_application::context::AppContext;
use mediator_application::error::AppResult;
use mediator_application::scheduler::{CronTriggerService, Trigger};
use mediator_application::{CommandsDispatcher, CommandsScheduler};
use mediator_domain::unit_of_work::InMemoryResource;
use mediator_macros::Command;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Command, Debug, Serialize, Deserialize)]
#[command(name = "SendReminder", schedulable)]
struct SendReminder {
    order_id: u64,
}

#[derive(Command, Debug, Serialize, Deserialize)]
#[command(name = "ReconcileLedger", schedulable)]
struct ReconcileLedger;

struct SendReminderHandler;

#[async_trait]
impl CommandHandler<SendReminder> for SendReminderHandler {
    async fn handle(&self, ctx: &AppContext, cmd: SendReminder) -> AppResult<()> {
        println!(
            "⏰ reminder for order {} (correlation={:?})",
            cmd.order_id,
            ctx.correlation_id()
        );
        Ok(())
    }
}

#[derive(Default)]
struct ReconcileLedgerHandler {
    runs: AtomicUsize,
}

#[async_trait]
impl CommandHandler<ReconcileLedger> for ReconcileLedgerHandler {
    async fn handle(&self, _ctx: &AppContext, _cmd: ReconcileLedger) -> AppResult<()> {
        let n = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        println!("🧮 ledger reconciled (run #{n})");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let reconcile = Arc::new(ReconcileLedgerHandler::default());
    let dispatcher = CommandsDispatcher::builder()
        .resource(Arc::new(InMemoryResource::new()))
        .command::<SendReminder, _>(Arc::new(SendReminderHandler))
        .command::<ReconcileLedger, _>(reconcile.clone())
        .build()?;

    let triggers = CronTriggerService::start().await?;
    let scheduler = CommandsScheduler::builder()
        .dispatcher(dispatcher)
        .trigger_service(Arc::new(triggers))
        .build();

    let reminder = scheduler
        .schedule(&SendReminder { order_id: 7 }, Trigger::after(Duration::from_secs(1))?)
        .await?;
    let ledger = scheduler
        .schedule(&ReconcileLedger, Trigger::every(Duration::from_millis(700)))
        .await?;
    println!("📅 scheduled {reminder} and {ledger}");

    tokio::time::sleep(Duration::from_secs(3)).await;

    scheduler.cancel(&ledger).await?;
    // 已触发的一次性任务再次取消不会报错
    scheduler.cancel(&reminder).await?;
    scheduler.shutdown().await?;

    println!(
        "✅ done, ledger runs = {}",
        reconcile.runs.load(Ordering::SeqCst)
    );
    Ok(())
}
