use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Domain events emitted after successful operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ProductCreated(Uuid),
    PriceTierAdded {
        product_id: Uuid,
        tier: String,
    },
    StockReceived {
        product_id: Uuid,
        quantity: i32,
        on_hand: i32,
    },
    StockWithdrawn {
        product_id: Uuid,
        quantity: i32,
        on_hand: i32,
    },
    SupplierCreated(Uuid),
    SupplyRecorded {
        supplier_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    PurchaseOrderCreated {
        order_id: Uuid,
        total: Decimal,
    },
    PurchaseOrderReplaced(Uuid),
    PickCreated {
        transaction_id: Uuid,
        payment_id: Uuid,
        total: Decimal,
    },
    PickUpdated {
        transaction_id: Uuid,
        total: Decimal,
    },
    PickConfirmed(Uuid),
    PaymentRecorded {
        payment_id: Uuid,
        amount_paid: Decimal,
        status: String,
    },
    PaymentSettled {
        payment_id: Uuid,
        paid_on: NaiveDate,
    },
}

/// Thin wrapper around an mpsc sender so services stay decoupled from the
/// channel type.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates an event channel with the given buffer size.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}
