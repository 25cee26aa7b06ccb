use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, Weak},
};

use anyhow::Result;
use log::debug;
use tokio::sync::watch;

use crate::db::{ComfortPrediction, Database, SensorReading};

use super::events::LiveEvent;

pub type SubscriberId = u64;

type Slot = Option<LiveEvent>;

struct Subscriber {
    /// One slot per event kind. A newer update overwrites one the client has
    /// not read yet, so a stalled client holds at most two pending events.
    readings: watch::Sender<Slot>,
    predictions: watch::Sender<Slot>,
    /// Ids of the newest rows already handed to this subscriber; older
    /// updates arriving late are skipped so nobody regresses to stale state.
    reading_seen: Option<i64>,
    prediction_seen: Option<i64>,
}

impl Subscriber {
    fn offer_reading(&mut self, reading: &SensorReading, event: &LiveEvent) -> bool {
        if self.reading_seen.is_some_and(|seen| seen >= reading.id) {
            return true;
        }
        self.reading_seen = Some(reading.id);
        self.readings.send(Some(event.clone())).is_ok()
    }

    fn offer_prediction(&mut self, prediction: &ComfortPrediction, event: &LiveEvent) -> bool {
        if self.prediction_seen.is_some_and(|seen| seen >= prediction.id) {
            return true;
        }
        self.prediction_seen = Some(prediction.id);
        self.predictions.send(Some(event.clone())).is_ok()
    }
}

#[derive(Default)]
struct HubState {
    next_id: SubscriberId,
    subscribers: HashMap<SubscriberId, Subscriber>,
}

fn lock(state: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Live fan-out of the latest reading and prediction.
///
/// The mutex guards membership and the per-subscriber "seen" marks. Updates
/// only replace the value in each subscriber's slot while it is held; writing
/// to the network happens in each subscriber's own task, so a slow client
/// never holds up the others.
#[derive(Clone)]
pub struct BroadcastHub {
    db: Database,
    state: Arc<Mutex<HubState>>,
}

/// A registered live subscriber. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriberId,
    readings: watch::Receiver<Slot>,
    predictions: watch::Receiver<Slot>,
    state: Weak<Mutex<HubState>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next update. Returns `None` once the hub has dropped
    /// this subscriber.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        loop {
            if let Some(event) = self.try_recv() {
                return Some(event);
            }

            let (changed, is_reading) = tokio::select! {
                biased;
                changed = self.readings.changed() => (changed, true),
                changed = self.predictions.changed() => (changed, false),
            };
            changed.ok()?;

            let slot = if is_reading {
                &mut self.readings
            } else {
                &mut self.predictions
            };
            let latest = slot.borrow_and_update().clone();
            if latest.is_some() {
                return latest;
            }
        }
    }

    /// Next pending update without waiting, readings before predictions.
    pub fn try_recv(&mut self) -> Option<LiveEvent> {
        for slot in [&mut self.readings, &mut self.predictions] {
            if !slot.has_changed().unwrap_or(false) {
                continue;
            }
            let latest = slot.borrow_and_update().clone();
            if latest.is_some() {
                return latest;
            }
        }
        None
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            if lock(&state).subscribers.remove(&self.id).is_some() {
                debug!("Live subscriber {} disconnected", self.id);
            }
        }
    }
}

impl BroadcastHub {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            state: Arc::new(Mutex::new(HubState::default())),
        }
    }

    /// Registers a subscriber and hands it the current latest reading and
    /// prediction before returning.
    ///
    /// The subscriber joins the set before the snapshot is read, so an
    /// update committed concurrently reaches it either through the snapshot
    /// or through the normal publish path.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let (readings_tx, readings) = watch::channel(None);
        let (predictions_tx, predictions) = watch::channel(None);
        let id = {
            let mut state = lock(&self.state);
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.insert(
                id,
                Subscriber {
                    readings: readings_tx,
                    predictions: predictions_tx,
                    reading_seen: None,
                    prediction_seen: None,
                },
            );
            id
        };

        let subscription = Subscription {
            id,
            readings,
            predictions,
            state: Arc::downgrade(&self.state),
        };

        // On error the subscription drops here and leaves the set.
        let reading = self.db.latest_reading().await?;
        let prediction = self.db.latest_prediction().await?;

        {
            let mut state = lock(&self.state);
            if let Some(subscriber) = state.subscribers.get_mut(&id) {
                send_snapshot(subscriber, reading.as_ref(), prediction.as_ref());
            }
        }

        debug!("Live subscriber {id} connected");
        Ok(subscription)
    }

    /// Removes a subscriber. Returns whether it was still registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = lock(&self.state).subscribers.remove(&id).is_some();
        if removed {
            debug!("Live subscriber {id} unsubscribed");
        }
        removed
    }

    /// Hands `reading` to every subscriber that has not seen it or anything
    /// newer. Returns the number of subscribers still connected.
    pub fn publish_reading_update(&self, reading: &SensorReading) -> usize {
        let event = LiveEvent::sensor_data(Some(reading));
        self.fan_out(|subscriber| subscriber.offer_reading(reading, &event))
    }

    pub fn publish_prediction_update(&self, prediction: &ComfortPrediction) -> usize {
        let event = LiveEvent::people_count(Some(prediction));
        self.fan_out(|subscriber| subscriber.offer_prediction(prediction, &event))
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }

    fn fan_out<F>(&self, mut offer: F) -> usize
    where
        F: FnMut(&mut Subscriber) -> bool,
    {
        let mut state = lock(&self.state);
        let total = state.subscribers.len();

        state.subscribers.retain(|id, subscriber| {
            let alive = offer(subscriber);
            if !alive {
                debug!("Pruning closed live subscriber {id}");
            }
            alive
        });

        let delivered = state.subscribers.len();
        if delivered < total {
            debug!("Dropped {} closed live subscribers", total - delivered);
        }
        delivered
    }
}

fn send_snapshot(
    subscriber: &mut Subscriber,
    reading: Option<&SensorReading>,
    prediction: Option<&ComfortPrediction>,
) {
    match reading {
        Some(reading) => {
            subscriber.offer_reading(reading, &LiveEvent::sensor_data(Some(reading)));
        }
        None if subscriber.reading_seen.is_none() => {
            let _ = subscriber.readings.send(Some(LiveEvent::sensor_data(None)));
        }
        None => {}
    }

    match prediction {
        Some(prediction) => {
            subscriber.offer_prediction(prediction, &LiveEvent::people_count(Some(prediction)));
        }
        None if subscriber.prediction_seen.is_none() => {
            let _ = subscriber.predictions.send(Some(LiveEvent::people_count(None)));
        }
        None => {}
    }
}
