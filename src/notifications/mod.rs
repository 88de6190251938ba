use crate::entities::item::Model as Item;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::{self, Sender};
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ItemEvent {
    Created(Item),
    Updated(Item),
    /// Code of the deleted item.
    Deleted(String),
}

#[derive(Clone)]
pub struct NotificationHub {
    sender: Sender<ItemEvent>,
}

impl NotificationHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    pub fn sender(&self) -> Sender<ItemEvent> {
        self.sender.clone()
    }

    /// Sends `event` to current subscribers; having none is fine.
    pub fn publish(&self, event: ItemEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> BroadcastStream<ItemEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }

    pub async fn handle_socket(socket: WebSocket, sender: Sender<ItemEvent>) {
        let (mut sender_ws, mut receiver) = socket.split();
        let mut receiver_stream = BroadcastStream::new(sender.subscribe());

        let mut send_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver_stream.next().await {
                if let Ok(json) = serde_json::to_string(&msg) {
                    if sender_ws.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
            }
        });

        let mut recv_task = tokio::spawn(async move {
            // Clients only listen; drain until they hang up.
            while let Some(Ok(_)) = receiver.next().await {}
        });

        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }
        debug!("item event socket closed");
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::item::Status;
    use tokio::sync::broadcast::error::TryRecvError;

    fn create_test_item(id: i32) -> Item {
        use chrono::Utc;

        Item {
            id,
            code: format!("TOL-{:011}", id),
            name: format!("Test Item {}", id),
            category_id: 1,
            status: Status::Funcional,
            quantity: 10,
            description: "Test Description".to_string(),
            created_at: Utc::now().into(),
            qr_target: None,
            qr_code: None,
        }
    }

    #[tokio::test]
    async fn test_notification_hub_creation() {
        let hub = NotificationHub::new();
        assert!(hub.sender.receiver_count() == 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let hub = NotificationHub::new();
        hub.publish(ItemEvent::Deleted("TOL-00000000001".into()));
    }

    #[tokio::test]
    async fn test_event_broadcasting() {
        let hub = NotificationHub::new();
        let sender = hub.sender();
        let mut receiver1 = sender.subscribe();
        let mut receiver2 = sender.subscribe();

        let item = create_test_item(1);
        hub.publish(ItemEvent::Created(item.clone()));

        let timeout = tokio::time::Duration::from_secs(1);

        let result1 = tokio::time::timeout(timeout, receiver1.recv()).await;
        assert!(result1.is_ok(), "Receiver 1 timed out");
        if let Ok(Ok(ItemEvent::Created(received_item))) = result1 {
            assert_eq!(received_item.id, 1);
            assert_eq!(received_item.name, "Test Item 1");
        } else {
            panic!("Failed to receive Created event on receiver 1");
        }

        let result2 = tokio::time::timeout(timeout, receiver2.recv()).await;
        assert!(result2.is_ok(), "Receiver 2 timed out");
        if let Ok(Ok(ItemEvent::Created(received_item))) = result2 {
            assert_eq!(received_item.code, "TOL-00000000001");
        } else {
            panic!("Failed to receive Created event on receiver 2");
        }
    }

    #[tokio::test]
    async fn test_multiple_events() {
        let hub = NotificationHub::new();
        let mut receiver = hub.sender().subscribe();
        let timeout = tokio::time::Duration::from_secs(1);

        let item1 = create_test_item(1);
        let item2 = create_test_item(2);

        hub.publish(ItemEvent::Created(item1.clone()));
        hub.publish(ItemEvent::Updated(item2.clone()));
        hub.publish(ItemEvent::Deleted(item1.code.clone()));

        let events = vec![
            ItemEvent::Created(item1.clone()),
            ItemEvent::Updated(item2),
            ItemEvent::Deleted(item1.code),
        ];

        for expected_event in events {
            let result = tokio::time::timeout(timeout, receiver.recv()).await;
            assert!(result.is_ok(), "Receiver timed out");
            if let Ok(Ok(received_event)) = result {
                assert_eq!(received_event, expected_event);
            } else {
                panic!("Failed to receive expected event");
            }
        }
    }

    #[tokio::test]
    async fn test_receiver_after_sender_dropped() {
        let hub = NotificationHub::new();
        let sender = hub.sender();
        let mut receiver = sender.subscribe();

        let item = create_test_item(1);
        sender.send(ItemEvent::Created(item.clone())).unwrap();

        match receiver.try_recv() {
            Ok(ItemEvent::Created(received_item)) => assert_eq!(received_item.id, item.id),
            Ok(_) => panic!("Expected Created event"),
            Err(_) => panic!("Expected to receive the message"),
        }

        drop(sender);
        drop(hub);

        match receiver.try_recv() {
            Err(TryRecvError::Closed) | Err(TryRecvError::Empty) => (),
            _ => panic!("Expected channel to be closed or empty"),
        }
    }

    #[test]
    fn test_event_json_shape() -> anyhow::Result<()> {
        let json = serde_json::to_value(ItemEvent::Deleted("HER-00000000007".into()))?;
        assert_eq!(json["event"], "deleted");
        assert_eq!(json["data"], "HER-00000000007");

        let json = serde_json::to_value(ItemEvent::Created(create_test_item(3)))?;
        assert_eq!(json["data"]["status"], "FUNCIONAL");
        assert!(json["data"].get("qr_code").is_none());
        Ok(())
    }
}
