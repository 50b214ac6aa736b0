// Lock-free notification channel (engine → control thread)

use crate::messaging::notification::Notification;
use ringbuf::{HeapRb, traits::Split};

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

/// Drain every pending notification
pub fn drain_notifications(consumer: &mut NotificationConsumer) -> Vec<Notification> {
    let mut drained = Vec::new();
    while let Some(notification) = ringbuf::traits::Consumer::try_pop(consumer) {
        drained.push(notification);
    }
    drained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::notification::NotificationCategory;
    use ringbuf::traits::Producer;

    #[test]
    fn test_channel_capacity_drops_overflow() {
        let (mut tx, mut rx) = create_notification_channel(2);
        for i in 0..3 {
            let _ = tx.try_push(Notification::info(
                NotificationCategory::Sequencer,
                format!("message {}", i),
            ));
        }

        let drained = drain_notifications(&mut rx);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "message 0");
        assert!(drain_notifications(&mut rx).is_empty());
    }
}
