use rocket::{
    response::stream::EventStream,
    tokio::{select, sync::broadcast::error::RecvError},
    Route, Shutdown, State,
};

use crate::broadcast::DashboardBroadcaster;

pub fn routes() -> Vec<Route> {
    routes![events]
}

/// The live dashboard feed. Each subscriber gets every event sent after it
/// connects; a subscriber that falls behind the channel capacity skips the
/// overwritten events and keeps going.
#[get("/dashboard/events")]
async fn events(broadcaster: &State<DashboardBroadcaster>, mut end: Shutdown) -> EventStream![] {
    let mut receiver = broadcaster.subscribe();
    EventStream! {
        loop {
            let event = select! {
                event = receiver.recv() => match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Dashboard subscriber lagged, skipped {skipped} event(s)");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = &mut end => break,
            };
            yield event.into_sse();
        }
    }
}
