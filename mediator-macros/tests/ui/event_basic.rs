use mediator_domain::domain_event::DomainEvent;
use mediator_macros::domain_event;

#[domain_event(version = 1)]
enum OrderEvent {
    #[event(event_type = "order.placed")]
    Placed { order_id: String, total: u64 },
    #[event(event_type = "order.repriced", event_version = 2)]
    Repriced { id: String, order_id: String, total: u64 },
    Cancelled,
}

fn main() {
    let placed = OrderEvent::Placed {
        id: "e1".to_string(),
        order_id: "o-1".to_string(),
        total: 10,
    };
    assert_eq!(placed.event_id(), "e1");
    assert_eq!(placed.event_type(), "order.placed");
    assert_eq!(placed.event_version(), 1);

    let repriced = OrderEvent::Repriced {
        id: "e2".to_string(),
        order_id: "o-1".to_string(),
        total: 12,
    };
    assert_eq!(repriced.event_version(), 2);

    let cancelled = OrderEvent::Cancelled { id: "e3".to_string() };
    assert_eq!(cancelled.event_type(), "OrderEvent.Cancelled");

    let json = serde_json::to_value(&placed).unwrap();
    let back: OrderEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, placed);
}
