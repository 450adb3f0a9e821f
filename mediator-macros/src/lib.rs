//! 中介者过程宏
//!
//! - `#[domain_event]`：为事件枚举补齐 `id` 字段并实现 `DomainEvent`；
//! - `#[derive(Command)]` / `#[derive(Query)]`：以属性声明请求名称与返回类型。
//!
use proc_macro::TokenStream;

mod domain_event;
mod request;
mod utils;

/// 仅支持具名字段变体或单元变体：
/// ```ignore
/// #[domain_event(version = 1)]
/// pub enum OrderEvent {
///     #[event(event_type = "order.placed")]
///     Placed { order_id: String },
///     Cancelled,
/// }
/// ```
/// 每个变体缺少 `id` 字段时追加 `id: IdType`（默认 `String`），单元变体改写为具名字段变体。
/// - `#[domain_event(id = IdType, version = N)]`：id 类型与默认版本号
/// - 变体可通过 `#[event(event_type = "...", event_version = N)]` 覆写事件类型与版本号
#[proc_macro_attribute]
pub fn domain_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    domain_event::expand(attr, item)
}

/// 实现 `mediator_application::command::Command`
///
/// `#[command(name = "CreateOrder", output = OrderId)]`，`name` 缺省为类型名，`output` 缺省为 `()`。
/// 追加 `schedulable`（可选 `payload_version = N`）同时实现 `SchedulableCommand`。
#[proc_macro_derive(Command, attributes(command))]
pub fn derive_command(item: TokenStream) -> TokenStream {
    request::expand_command(item)
}

/// 实现 `mediator_application::query::Query`
///
/// `#[query(name = "GetOrder", dto = OrderDto)]`，`dto` 必填。
#[proc_macro_derive(Query, attributes(query))]
pub fn derive_query(item: TokenStream) -> TokenStream {
    request::expand_query(item)
}
