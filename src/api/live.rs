use rocket::{
    response::stream::{Event, EventStream},
    tokio::select,
    Shutdown, State,
};

use crate::ingest::IngestionGateway;

use super::error::ApiError;

/// Server-sent events carrying `sensor_data` and `people_count` updates.
/// The current state is pushed as soon as the stream opens.
#[get("/live")]
pub async fn live(
    gateway: &State<IngestionGateway>,
    mut shutdown: Shutdown,
) -> Result<EventStream![], ApiError> {
    let mut subscription = gateway.hub().subscribe().await.map_err(ApiError::internal)?;

    Ok(EventStream! {
        loop {
            let event = select! {
                event = subscription.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = &mut shutdown => break,
            };

            yield Event::json(&event).event(event.name());
        }
    })
}
