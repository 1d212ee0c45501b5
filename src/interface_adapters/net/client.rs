use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{
    ChargeResultDto, ClientMessage, HazardUpdateDto, LocationDto, ServerMessage,
    place_charge_rejection,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::unique_id;
use crate::use_cases::{HazardUpdate, SessionEvent, SessionHandle, SessionState};

use axum::{
    Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn};

use crate::domain::{ChargeDuration, Coordinate};

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_DISPLAY_NAME_LEN: usize = 64;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
// The session loop answers placement requests on its event branch, so a
// reply should arrive well within one tick.
const PLACE_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
    PlacementReplyLost,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct SessionQuery {
    // The session id the client wants to join.
    #[serde(default)]
    session_id: Option<String>,
}

pub async fn hazard_update_serializer(
    mut update_rx: broadcast::Receiver<HazardUpdate>,
    update_bytes_tx: broadcast::Sender<Utf8Bytes>,
    update_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each hazard update once and broadcast the shared bytes.
    loop {
        match update_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::HazardUpdate(HazardUpdateDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize hazard update");
                        continue;
                    }
                };

                // Convert once and broadcast shared UTF-8 bytes to all clients.
                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes for lag recovery.
                let _ = update_latest_tx.send(bytes.clone());
                let _ = update_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "hazard serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("hazard updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_session_serializer(session: &SessionHandle) {
    // Spawn a task that serializes hazard updates for this session.
    tokio::spawn(hazard_update_serializer(
        session.update_tx.subscribe(),
        session.update_bytes_tx.clone(),
        session.update_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> impl IntoResponse {
    let session_id = query
        .session_id
        .unwrap_or_else(|| state.default_session_id.to_string());

    let session = match state.session_registry.get_session(&session_id).await {
        Some(session) => session,
        None => {
            // Keep not-found responses consistent with the JSON error schema.
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "session not found".to_string(),
                }),
            )
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, session))
}

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

struct ConnCtx {
    pub player_id: u64,
    pub team_id: u64,
    pub display_name: String,
    // Session id this connection is attached to.
    pub session_id: Arc<str>,
    pub input_tx: mpsc::Sender<SessionEvent>,
    pub update_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub update_latest_rx: watch::Receiver<Utf8Bytes>,
    pub session_state_rx: watch::Receiver<SessionState>,

    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_input_full_log: Instant,
    pub last_update_lag_log: Instant,
    pub last_invalid_location_log: Instant,
}

async fn handle_socket(socket: WebSocket, session: SessionHandle) {
    // Separate connection id for correlating logs before a player_id exists.
    let conn_id = unique_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    let _enter = span.enter();

    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut ctx = match bootstrap_connection(&mut ws_tx, &mut ws_rx, &session).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = send_close_with_reason(&mut ws_tx, close_code::POLICY, "bootstrap failed").await;
            return;
        }
    };

    span.record("player_id", ctx.player_id);
    info!(
        player_id = ctx.player_id,
        team_id = ctx.team_id,
        display_name = %ctx.display_name,
        session_id = %ctx.session_id,
        "client connected"
    );

    // Main client loop.
    if let Err(e) = run_client_loop(&mut ws_tx, &mut ws_rx, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }

    // Best-effort despawn so the session drops the player's hazard state.
    let _ = ctx
        .input_tx
        .send(SessionEvent::Leave {
            player_id: ctx.player_id,
        })
        .await;

    info!(
        player_id = ctx.player_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        lag_recoveries = ctx.lag_recovery_count,
        "client disconnected"
    );
}

async fn send_message(ws_tx: &mut WsSink, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    ws_tx
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    ws_tx: &mut WsSink,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    ws_tx
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    ws_tx.close().await.map_err(NetError::Ws)
}

struct JoinHandshake {
    team_id: u64,
    display_name: String,
    bytes_in: u64,
    msgs_in: u64,
}

async fn bootstrap_connection(
    ws_tx: &mut WsSink,
    ws_rx: &mut WsStream,
    session: &SessionHandle,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* doing anything else (awaits) to not
    // miss packets.
    let update_bytes_rx = session.update_bytes_tx.subscribe();
    let update_latest_rx = session.update_latest_tx.subscribe();
    let session_state_rx = session.session_state_tx.subscribe();

    // The very first meaningful client message must be the join handshake.
    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(ws_tx, ws_rx)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(ws_tx, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // Handshake & id assignment. Identity is connection-scoped: the
    // session tracks players by this assigned id.
    let player_id = unique_id();
    let identity_msg = ServerMessage::Identity {
        player_id: player_id.to_string(),
    };
    send_message(ws_tx, &identity_msg).await?;

    // Tell the hazard loop to track this player. Join happens before the
    // initial state so the next update can include them.
    session
        .input_tx
        .send(SessionEvent::Join {
            player_id,
            team_id: join.team_id,
            display_name: join.display_name.clone(),
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    // Send initial session state. Clone as soon as we borrow so the watch
    // lock is not held across the await.
    let initial_state = session_state_rx.borrow().clone();
    let state_msg = ServerMessage::GameState(initial_state.into());
    if let Err(e) = send_message(ws_tx, &state_msg).await {
        // Compensate with Leave to avoid "joined but never connected".
        session
            .input_tx
            .send(SessionEvent::Leave { player_id })
            .await
            .map_err(|_| NetError::InputClosed)?; // InputClosed takes precedence
        return Err(e);
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        team_id: join.team_id,
        display_name: join.display_name,
        session_id: session.session_id.clone(),
        input_tx: session.input_tx.clone(),
        update_bytes_rx,
        update_latest_rx,
        session_state_rx,
        lag_recovery_count: 0,

        msgs_in: join.msgs_in,
        msgs_out: 0,
        bytes_in: join.bytes_in,
        bytes_out: 0,

        invalid_json: 0,

        last_input_full_log: now,
        last_update_lag_log: now,
        last_invalid_location_log: now,
    })
}

async fn read_join_handshake(
    ws_tx: &mut WsSink,
    ws_rx: &mut WsStream,
) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = ws_rx.next().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(_) => {
                        let _ =
                            send_close_with_reason(ws_tx, close_code::POLICY, "join required").await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            ws_tx,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                let display_name = payload.display_name.trim();
                if display_name.is_empty() || display_name.len() > MAX_DISPLAY_NAME_LEN {
                    let _ =
                        send_close_with_reason(ws_tx, close_code::POLICY, "invalid display name")
                            .await;
                    return Err(NetError::JoinRequired);
                }

                return Ok(JoinHandshake {
                    team_id: payload.team_id,
                    display_name: display_name.to_string(),
                    bytes_in,
                    msgs_in: 1,
                });
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    ws_tx,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

// Device samples can carry NaN/inf or out-of-range values; drop them
// rather than feeding the simulation a fabricated fix.
fn sanitize_location(location: LocationDto) -> Option<Coordinate> {
    if !location.lat_deg.is_finite() || !location.lon_deg.is_finite() {
        return None;
    }
    if !(-90.0..=90.0).contains(&location.lat_deg) {
        return None;
    }
    if !(-180.0..=180.0).contains(&location.lon_deg) {
        return None;
    }
    Some(location.into())
}

fn process_location_message(
    player_id: u64,
    input_tx: &mpsc::Sender<SessionEvent>,
    location: LocationDto,
    last_input_full_log: &mut Instant,
    last_invalid_location_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    let Some(location) = sanitize_location(location) else {
        if should_log(last_invalid_location_log) {
            warn!(player_id, "invalid location sample; dropping");
        }
        return Ok(LoopControl::Continue);
    };

    match input_tx.try_send(SessionEvent::LocationUpdate {
        player_id,
        location,
    }) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            // Dropping is safe: the next sample supersedes this one anyway.
            if should_log(last_input_full_log) {
                warn!(player_id, "input channel full; dropping location sample");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn process_place_charge(
    ws_tx: &mut WsSink,
    ctx_player_id: u64,
    input_tx: &mpsc::Sender<SessionEvent>,
    duration_secs: u32,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> Result<LoopControl, NetError> {
    let Some(duration) = ChargeDuration::from_secs(duration_secs) else {
        let msg = ServerMessage::ChargeResult(ChargeResultDto::Rejected {
            reason: "unsupported_duration".to_string(),
        });
        *bytes_out += send_message(ws_tx, &msg).await? as u64;
        *msgs_out += 1;
        return Ok(LoopControl::Continue);
    };

    let (reply, reply_rx) = oneshot::channel();
    input_tx
        .send(SessionEvent::PlaceCharge {
            player_id: ctx_player_id,
            duration,
            reply,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    // The reply is synchronous from the client's point of view.
    let result = match timeout(PLACE_REPLY_TIMEOUT, reply_rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) | Err(_) => return Err(NetError::PlacementReplyLost),
    };

    let dto = match result {
        Ok(snapshot) => ChargeResultDto::Placed {
            charge: (&snapshot).into(),
        },
        Err(e) => {
            debug!(player_id = ctx_player_id, reason = place_charge_rejection(e), "charge placement rejected");
            ChargeResultDto::Rejected {
                reason: place_charge_rejection(e).to_string(),
            }
        }
    };
    let msg = ServerMessage::ChargeResult(dto);
    *bytes_out += send_message(ws_tx, &msg).await? as u64;
    *msgs_out += 1;
    Ok(LoopControl::Continue)
}

async fn forward_update_bytes(
    bytes: Utf8Bytes,
    ws_tx: &mut WsSink,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let len = bytes.len() as u64;
    match ws_tx.send(Message::Text(bytes.into())).await {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += len;
            LoopControl::Continue
        }
        Err(_) => LoopControl::Disconnect,
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_incoming_ws(
    ws_tx: &mut WsSink,
    incoming: Option<Result<Message, axum::Error>>,
    player_id: u64,
    input_tx: &mpsc::Sender<SessionEvent>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
    last_input_full_log: &mut Instant,
    last_invalid_location_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    let Some(incoming) = incoming else {
        return Ok(LoopControl::Disconnect);
    };
    let message = incoming.map_err(NetError::Ws)?;

    match message {
        Message::Text(text) => {
            *msgs_in += 1;
            *bytes_in += text.len() as u64;

            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Location(location)) => process_location_message(
                    player_id,
                    input_tx,
                    location,
                    last_input_full_log,
                    last_invalid_location_log,
                ),
                Ok(ClientMessage::PlaceCharge(request)) => {
                    process_place_charge(
                        ws_tx,
                        player_id,
                        input_tx,
                        request.duration_secs,
                        msgs_out,
                        bytes_out,
                    )
                    .await
                }
                Ok(ClientMessage::Join(_)) => {
                    // Already joined; repeated handshakes are dropped.
                    debug!(player_id, "duplicate join message ignored");
                    Ok(LoopControl::Continue)
                }
                Err(_) => {
                    *invalid_json += 1;
                    if *invalid_json >= MAX_INVALID_JSON {
                        warn!(player_id, "too many invalid messages; disconnecting");
                        let _ =
                            send_close_with_reason(ws_tx, close_code::POLICY, "invalid messages")
                                .await;
                        return Ok(LoopControl::Disconnect);
                    }
                    Ok(LoopControl::Continue)
                }
            }
        }
        Message::Binary(_) => {
            // The protocol is text-only; drop binary frames.
            Ok(LoopControl::Continue)
        }
        Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
        Message::Close(_) => Ok(LoopControl::Disconnect),
    }
}

async fn run_client_loop(
    ws_tx: &mut WsSink,
    ws_rx: &mut WsStream,
    ctx: &mut ConnCtx,
) -> Result<(), NetError> {
    let player_id = ctx.player_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        input_tx,
        update_bytes_rx,
        update_latest_rx,
        session_state_rx,
        lag_recovery_count,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_input_full_log,
        last_update_lag_log,
        last_invalid_location_log,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming message from the client.
            incoming = ws_rx.next() => {
                match handle_incoming_ws(
                    ws_tx,
                    incoming,
                    player_id,
                    input_tx,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    msgs_out,
                    bytes_out,
                    last_input_full_log,
                    last_invalid_location_log,
                ).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing hazard update.
            update_msg = update_bytes_rx.recv() => {
                match update_msg {
                    Ok(bytes) => match forward_update_bytes(bytes, ws_tx, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_update_lag_log) {
                            warn!(missed = n, "hazard updates lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest serialized update.
                        let latest = update_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            *lag_recovery_count += 1;
                            match forward_update_bytes(latest, ws_tx, msgs_out, bytes_out).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Session removed; close the connection cleanly.
                        let _ = send_close_with_reason(ws_tx, close_code::AWAY, "session closed").await;
                        true
                    }
                }
            }

            // Session lifecycle changes (briefing, start, end).
            changed = session_state_rx.changed() => {
                match changed {
                    Ok(()) => {
                        let state = session_state_rx.borrow_and_update().clone();
                        let msg = ServerMessage::GameState(state.into());
                        match send_message(ws_tx, &msg).await {
                            Ok(sent) => {
                                *msgs_out += 1;
                                *bytes_out += sent as u64;
                                false
                            }
                            Err(e) => {
                                fatal = Some(e);
                                true
                            }
                        }
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(ws_tx, close_code::AWAY, "session closed").await;
                        true
                    }
                }
            }
        };

        if disconnect {
            break;
        }
    }

    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
