use mediator_application::command::{Command, SchedulableCommand};
use mediator_application::dto::Dto;
use mediator_application::query::Query;
use mediator_macros::{Command, Query};
use serde::{Deserialize, Serialize};

#[derive(Command)]
struct Ping;

#[derive(Command)]
#[command(name = "order.create", output = String)]
struct CreateOrder {
    #[allow(dead_code)]
    sku: String,
}

#[derive(Command, Serialize, Deserialize)]
#[command(name = "reminder.send", schedulable, payload_version = 2)]
struct SendReminder {
    recipient: String,
}

#[derive(Serialize)]
struct OrderDto {
    id: String,
}
impl Dto for OrderDto {}

#[derive(Query)]
#[query(name = "order.get", dto = OrderDto)]
struct GetOrder {
    #[allow(dead_code)]
    id: String,
}

fn output_of<C: Command>(_: &C) -> &'static str {
    std::any::type_name::<C::Output>()
}

fn main() {
    assert_eq!(<Ping as Command>::NAME, "Ping");
    assert_eq!(output_of(&Ping), "()");
    assert_eq!(<CreateOrder as Command>::NAME, "order.create");
    assert_eq!(output_of(&CreateOrder { sku: "a".into() }), "alloc::string::String");
    assert_eq!(<SendReminder as Command>::NAME, "reminder.send");
    assert_eq!(<SendReminder as SchedulableCommand>::PAYLOAD_VERSION, 2);
    assert_eq!(<GetOrder as Query>::NAME, "order.get");

    let reminder = SendReminder { recipient: "ada".into() };
    assert_eq!(reminder.recipient, "ada");
    let dto = OrderDto { id: "o-1".into() };
    assert_eq!(dto.id, "o-1");
}
