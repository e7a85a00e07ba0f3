//! WebSocket runtime connecting a [`Session`] to the simulation server.

use anyhow::{anyhow, Context, Result as AnyResult};
use futures_util::{SinkExt, StreamExt};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::Instant,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use tribe_war_core::protocol::ClientRequest;
use tribe_war_rendering::RenderingBackend;

use crate::{
    action::UserAction,
    decode::InboundFrame,
    pacer::BatchPacer,
    session::{Notice, Outgoing, Session},
};

/// Drives `session` over a WebSocket connection to `url`.
///
/// Inbound frames and user actions are handled one at a time on the calling
/// task. The loop ends when the server closes the connection or the action
/// channel is closed, and hands the session back to the caller.
pub async fn run<R>(
    url: &str,
    mut session: Session<R>,
    mut actions: UnboundedReceiver<UserAction>,
    clock: Instant,
) -> AnyResult<Session<R>>
where
    R: RenderingBackend,
{
    let (socket, _) = connect_async(url)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    info!(%url, "connected");

    let (mut sink, mut stream) = socket.split();
    let (requests, mut pending) = mpsc::unbounded_channel::<ClientRequest>();
    let writer = tokio::spawn(async move {
        while let Some(request) = pending.recv().await {
            let text = serde_json::to_string(&request).context("failed to encode request")?;
            sink.send(Message::Text(text))
                .await
                .context("failed to send request")?;
        }
        let _ = sink.close().await;
        Ok::<(), anyhow::Error>(())
    });
    let mut pacer = BatchPacer::new(requests.clone());

    let result = loop {
        tokio::select! {
            message = stream.next() => match message {
                Some(Ok(Message::Binary(bytes))) => {
                    let outcome = session.handle_frame(InboundFrame::Binary(bytes));
                    debug!(?outcome, "binary frame handled");
                }
                Some(Ok(Message::Text(text))) => {
                    let outcome = session.handle_frame(InboundFrame::Text(text));
                    debug!(?outcome, "text frame handled");
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("server closed the connection");
                    break Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => break Err(anyhow::Error::new(error).context("websocket failure")),
            },
            action = actions.recv() => match action {
                Some(action) => {
                    let _ = session.perform(action, clock.elapsed());
                }
                None => {
                    info!("input closed, disconnecting");
                    break Ok(());
                }
            },
        }

        if let Err(error) = flush(&mut session, &requests, &mut pacer) {
            break Err(error);
        }
    };

    pacer.cancel_all();
    drop(pacer);
    drop(requests);
    match writer.await.context("writer task failed")? {
        Ok(()) => {}
        Err(error) => warn!(?error, "outbound stream ended early"),
    }

    result.map(|()| session)
}

/// Hands queued traffic to the transport and reports queued notices.
fn flush<R>(
    session: &mut Session<R>,
    requests: &UnboundedSender<ClientRequest>,
    pacer: &mut BatchPacer,
) -> AnyResult<()>
where
    R: RenderingBackend,
{
    for outgoing in session.drain_outgoing() {
        match outgoing {
            Outgoing::Send(request) => requests
                .send(request)
                .map_err(|_| anyhow!("connection writer stopped"))?,
            Outgoing::Paced(schedule) => {
                pacer.start(schedule);
                debug!(in_flight = pacer.in_flight(), "paced schedule started");
            }
            Outgoing::CancelPaced => pacer.cancel_all(),
        }
    }
    for notice in session.drain_notices() {
        match notice {
            Notice::Info(message) => info!(%message, "notice"),
            Notice::Rejected(message) => warn!(%message, "rejected"),
        }
    }
    Ok(())
}
