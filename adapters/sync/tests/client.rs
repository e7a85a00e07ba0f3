use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use glam::Vec2;
use tokio::{net::TcpListener, sync::mpsc, time::Instant};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tribe_war_core::{
    protocol::{ClientRequest, Placement},
    BuilderPhase, CellCode, CellCoord, GRID_CELL_COUNT,
};
use tribe_war_rendering::{Frame, RenderingBackend, Viewport};
use tribe_war_sync::{run, BatchPacer, Session, UserAction};
use tribe_war_system_flood_fill::BatchSchedule;
use tribe_war_world::query;

#[derive(Debug, Default)]
struct Counter {
    presented: usize,
}

impl RenderingBackend for Counter {
    fn present(&mut self, _frame: &Frame, _viewport: &Viewport) -> anyhow::Result<()> {
        self.presented += 1;
        Ok(())
    }
}

#[tokio::test]
async fn client_exchanges_frames_with_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("address");

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut socket = accept_async(stream).await.expect("handshake");

        let mut grid = vec![0_u8; GRID_CELL_COUNT];
        grid[0] = CellCode::Snow.code();
        socket
            .send(Message::Binary(grid))
            .await
            .expect("send snapshot");

        let request = loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(_)) => continue,
                other => panic!("client went away: {other:?}"),
            }
        };

        socket.close(None).await.expect("close");
        while socket.next().await.is_some() {}
        request
    });

    let session = Session::new(Counter::default(), Vec2::new(800.0, 600.0), 0).expect("canvas");
    let (actions, inbox) = mpsc::unbounded_channel();
    actions
        .send(UserAction::PaintCell(CellCoord::new(3, 4)))
        .expect("queue action");

    let session = run(&format!("ws://{address}"), session, inbox, Instant::now())
        .await
        .expect("session ends cleanly");
    drop(actions);

    let request: serde_json::Value =
        serde_json::from_str(&server.await.expect("server task")).expect("json request");
    assert_eq!(
        request,
        serde_json::json!({"action": "place_batch", "places": [{"x": 3, "y": 4, "type": 1}]})
    );
    assert_eq!(
        query::grid(session.world()).code(CellCoord::new(0, 0)),
        Some(CellCode::Snow)
    );
    assert_eq!(session.builder().phase(), BuilderPhase::Terrain);
    assert!(session.backend().presented >= 1);
}

#[tokio::test]
async fn connection_failure_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("address");
    drop(listener);

    let session = Session::new(Counter::default(), Vec2::new(800.0, 600.0), 0).expect("canvas");
    let (_actions, inbox) = mpsc::unbounded_channel();

    let error = run(&format!("ws://{address}"), session, inbox, Instant::now())
        .await
        .expect_err("nothing is listening");

    assert!(error.to_string().contains("failed to connect"));
}

fn placements(count: u32) -> Vec<Placement> {
    (0..count)
        .map(|index| Placement::new(CellCoord::new(index % 100, index / 100), CellCode::Grass))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn pacer_releases_one_batch_per_interval() {
    let (requests, mut sent) = mpsc::unbounded_channel();
    let mut pacer = BatchPacer::new(requests);
    let started = Instant::now();

    pacer.start(BatchSchedule::paced(placements(1_200)));

    let mut sizes = Vec::new();
    let mut elapsed = Vec::new();
    for _ in 0..3 {
        match sent.recv().await.expect("batch") {
            ClientRequest::PlaceBatch { places } => sizes.push(places.len()),
            other => panic!("unexpected request {other:?}"),
        }
        elapsed.push(started.elapsed());
    }

    assert_eq!(sizes, [500, 500, 200]);
    assert!(elapsed[0] < Duration::from_millis(100));
    assert!(elapsed[1] >= Duration::from_millis(100) && elapsed[1] < Duration::from_millis(200));
    assert!(elapsed[2] >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn cancelled_schedules_stop_sending() {
    let (requests, mut sent) = mpsc::unbounded_channel();
    let mut pacer = BatchPacer::new(requests);

    pacer.start(BatchSchedule::paced(placements(2_000)));
    let _first = sent.recv().await.expect("first batch");
    assert_eq!(pacer.in_flight(), 1);
    pacer.cancel_all();
    assert_eq!(pacer.in_flight(), 0);
    drop(pacer);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(sent.recv().await.is_none());
}
