// WebSocket /ws/fleet: pushes every poll round's report

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant, interval_at, timeout};

use super::AggregatorAppState;
use crate::models::FleetReport;

const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn ws_fleet(
    ws: WebSocketUpgrade,
    State(state): State<AggregatorAppState>,
) -> impl IntoResponse {
    // Subscribe before reading the latest report so no round falls between the two.
    let mut rx = state.report_tx.subscribe();
    let latest = state.aggregator.last_report();
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_fleet(socket, &mut rx, latest).await {
            tracing::info!("Fleet stream error: {}", e);
        }
    })
}

/// Sends `text`; false when the client is gone or too slow.
async fn send_text(socket: &mut WebSocket, text: String) -> bool {
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(text.into()))).await;
    matches!(r, Ok(Ok(())))
}

async fn stream_fleet(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<FleetReport>,
    latest: Option<FleetReport>,
) -> anyhow::Result<()> {
    tracing::info!("Client connected to fleet stream");

    // New clients get the last completed round right away instead of waiting a full interval.
    if let Some(report) = latest
        && !send_text(&mut socket, serde_json::to_string(&report)?).await
    {
        return Ok(());
    }

    let mut ping_interval = interval_at(Instant::now() + WS_PING_INTERVAL, WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(report) => {
                        if !send_text(&mut socket, serde_json::to_string(&report)?).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket /ws/fleet client lagged, skipped {} reports", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    Ok(())
}
