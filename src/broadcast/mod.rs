mod events;
mod hub;

pub use events::{display_timestamp, LiveEvent, LiveRow, PEOPLE_COUNT_EVENT, SENSOR_DATA_EVENT};
pub use hub::{BroadcastHub, SubscriberId, Subscription};
