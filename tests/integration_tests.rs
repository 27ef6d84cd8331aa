//! Integration tests for the hub server over real WebSocket connections
//!
//! Each test starts the axum router on an ephemeral port and drives it with
//! tokio-tungstenite clients, the same way the terminal client does.

use assert_approx_eq::assert_approx_eq;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use futures::{SinkExt, StreamExt};
use server::hub::HubConfig;
use server::network::{self, CreatedHub};
use server::registry::SessionRegistry;
use shared::{ResponseView, ServerMessage, Snapshot, INITIAL_SCORE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    registry: Arc<SessionRegistry>,
}

impl TestServer {
    async fn start(config: HubConfig, max_players: usize) -> Self {
        let registry = Arc::new(SessionRegistry::new(config, max_players));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = network::router(Arc::clone(&registry));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer { addr, registry }
    }

    async fn with_defaults() -> Self {
        Self::start(HubConfig::default(), shared::MAX_PLAYERS).await
    }

    async fn hub(&self) -> String {
        self.registry.create_session().await
    }

    fn url(&self, hub: &str, name: &str) -> String {
        client::network::join_url(&self.addr.to_string(), hub, name)
            .unwrap()
            .to_string()
    }

    async fn try_join(&self, hub: &str, name: &str) -> Result<WsStream, tungstenite::Error> {
        connect_async(self.url(hub, name)).await.map(|(ws, _)| ws)
    }

    async fn join(&self, hub: &str, name: &str) -> WsStream {
        self.try_join(hub, name).await.unwrap()
    }

    /// Joins a whole table and waits until the last player sees everyone
    async fn seat_all(&self, hub: &str, names: &[&str]) -> Vec<WsStream> {
        let mut sockets = Vec::new();
        for name in names {
            sockets.push(self.join(hub, name).await);
        }
        if let Some(last) = sockets.last_mut() {
            next_matching(last, |m| {
                matches!(m, ServerMessage::State(s) if s.players.len() == names.len())
            })
            .await;
        }
        sockets
    }
}

async fn next_message(ws: &mut WsStream) -> ServerMessage {
    loop {
        let frame = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream closed")
            .expect("ws error");
        if let Message::Text(text) = frame {
            return ServerMessage::from_json(text.as_str()).unwrap();
        }
    }
}

async fn next_matching<F>(ws: &mut WsStream, matches: F) -> ServerMessage
where
    F: Fn(&ServerMessage) -> bool,
{
    loop {
        let message = next_message(ws).await;
        if matches(&message) {
            return message;
        }
    }
}

async fn next_result(ws: &mut WsStream) -> Snapshot {
    match next_matching(ws, |m| {
        matches!(m, ServerMessage::Result(_) | ServerMessage::Gameover(_))
    })
    .await
    {
        ServerMessage::Result(snapshot) | ServerMessage::Gameover(snapshot) => snapshot,
        other => panic!("Unexpected message: {:?}", other),
    }
}

async fn send(ws: &mut WsStream, text: &str) {
    ws.send(Message::text(text.to_string())).await.unwrap();
}

fn rejection_status(result: Result<WsStream, tungstenite::Error>) -> u16 {
    match result {
        Err(tungstenite::Error::Http(response)) => response.status().as_u16(),
        Err(other) => panic!("Unexpected error: {}", other),
        Ok(_) => panic!("Join should have been rejected"),
    }
}

/// HUB CREATION AND HEALTH
mod http_tests {
    use super::*;

    async fn call(registry: &Arc<SessionRegistry>, method: Method, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = network::router(Arc::clone(registry))
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn created_hub_accepts_players() {
        let server = TestServer::with_defaults().await;

        let (status, body) = call(&server.registry, Method::POST, "/create-hub").await;
        assert_eq!(status, StatusCode::OK);
        let created: CreatedHub = serde_json::from_str(&body).unwrap();

        let mut alice = server.join(&created.hub, "alice").await;
        match next_message(&mut alice).await {
            ServerMessage::State(snapshot) => {
                assert_eq!(snapshot.players.len(), 1);
                assert_eq!(snapshot.players[0].score, INITIAL_SCORE);
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn created_hubs_are_distinct() {
        let server = TestServer::with_defaults().await;

        let (_, first) = call(&server.registry, Method::POST, "/create-hub").await;
        let (_, second) = call(&server.registry, Method::POST, "/create-hub").await;

        assert_ne!(first, second);
        assert_eq!(server.registry.session_count().await, 2);
    }

    #[tokio::test]
    async fn health_check() {
        let server = TestServer::with_defaults().await;

        let (status, body) = call(&server.registry, Method::GET, "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}

/// JOIN ADMISSION
mod admission_tests {
    use super::*;

    #[tokio::test]
    async fn unknown_hub_rejected() {
        let server = TestServer::with_defaults().await;

        let status = rejection_status(server.try_join("deadbeef", "alice").await);

        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn duplicate_name_rejected() {
        let server = TestServer::with_defaults().await;
        let hub = server.hub().await;
        let _alice = server.join(&hub, "alice").await;

        let status = rejection_status(server.try_join(&hub, "alice").await);

        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn full_hub_rejected() {
        let server = TestServer::start(HubConfig::default(), 2).await;
        let hub = server.hub().await;
        let _table = server.seat_all(&hub, &["alice", "bob"]).await;

        let status = rejection_status(server.try_join(&hub, "carol").await);

        assert_eq!(status, 403);
    }

    #[tokio::test]
    async fn name_free_after_disconnect() {
        let server = TestServer::with_defaults().await;
        let hub = server.hub().await;

        let mut alice = server.join(&hub, "alice").await;
        alice.close(None).await.unwrap();
        drop(alice);

        // the old seat is released once the server sees the close
        let mut rejoined = None;
        for _ in 0..50 {
            if let Ok(ws) = server.try_join(&hub, "alice").await {
                rejoined = Some(ws);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let mut alice = rejoined.expect("name was never released");
        assert!(matches!(next_message(&mut alice).await, ServerMessage::State(_)));
    }
}

/// FULL ROUNDS OVER THE WIRE
mod round_tests {
    use super::*;

    #[tokio::test]
    async fn three_player_round() {
        let server = TestServer::with_defaults().await;
        let hub = server.hub().await;
        let mut table = server.seat_all(&hub, &["alice", "bob", "carol"]).await;

        for (ws, value) in table.iter_mut().zip(["10", "20", "30"]) {
            send(ws, value).await;
        }

        for ws in table.iter_mut() {
            let snapshot = next_result(ws).await;
            assert_approx_eq!(snapshot.average.unwrap(), 20.0);
            assert_approx_eq!(snapshot.target.unwrap(), 16.0);
            assert_eq!(snapshot.winners, Some(vec!["bob".to_string()]));

            let scores: Vec<i32> = snapshot.players.iter().map(|p| p.score).collect();
            assert_eq!(scores, vec![INITIAL_SCORE - 1, INITIAL_SCORE, INITIAL_SCORE - 1]);
        }
    }

    #[tokio::test]
    async fn two_player_hand_game() {
        let server = TestServer::with_defaults().await;
        let hub = server.hub().await;
        let mut table = server.seat_all(&hub, &["alice", "bob"]).await;

        send(&mut table[0], "0").await;
        send(&mut table[1], "100").await;

        let snapshot = next_result(&mut table[1]).await;
        assert_eq!(snapshot.target, None);
        assert_eq!(snapshot.average, None);
        assert_eq!(snapshot.winners, Some(vec!["alice".to_string()]));
        assert_eq!(snapshot.players[1].score, INITIAL_SCORE - 1);

        let text = client::rendering::render(&ServerMessage::Result(snapshot));
        assert!(text.contains("Hand game"));
        assert!(text.contains("Winners: alice"));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected() {
        let server = TestServer::with_defaults().await;
        let hub = server.hub().await;
        let mut table = server.seat_all(&hub, &["alice", "bob"]).await;

        for bad in ["abc", "150", "-1", "4.5"] {
            send(&mut table[0], bad).await;
            let reply = next_matching(&mut table[0], |m| {
                matches!(m, ServerMessage::Error { .. })
            })
            .await;
            assert!(matches!(reply, ServerMessage::Error { message } if !message.is_empty()));
        }

        // a bad answer does not count as a response
        send(&mut table[1], "50").await;
        let state = next_matching(&mut table[0], |m| {
            matches!(m, ServerMessage::State(s)
                if s.players.len() == 2 && s.players[1].response == Some(ResponseView::Value(50)))
        })
        .await;
        let snapshot = state.snapshot().unwrap();
        assert_eq!(snapshot.players[0].response, Some(ResponseView::pending()));
    }

    #[tokio::test]
    async fn round_reopens_after_delay() {
        let config = HubConfig {
            reset_delay: Duration::from_millis(200),
            ..HubConfig::default()
        };
        let server = TestServer::start(config, shared::MAX_PLAYERS).await;
        let hub = server.hub().await;
        let mut table = server.seat_all(&hub, &["alice", "bob", "carol"]).await;

        for (ws, value) in table.iter_mut().zip(["10", "20", "30"]) {
            send(ws, value).await;
        }
        next_result(&mut table[0]).await;

        match next_message(&mut table[0]).await {
            ServerMessage::State(snapshot) => {
                assert!(snapshot
                    .players
                    .iter()
                    .all(|p| p.response == Some(ResponseView::pending())));
            }
            other => panic!("Unexpected message: {:?}", other),
        }

        // the new round takes answers again
        send(&mut table[0], "42").await;
        let state = next_matching(&mut table[1], |m| {
            matches!(m, ServerMessage::State(s)
                if s.players[0].response == Some(ResponseView::Value(42)))
        })
        .await;
        assert!(state.snapshot().is_some());
    }

    #[tokio::test]
    async fn departure_completes_round() {
        let server = TestServer::with_defaults().await;
        let hub = server.hub().await;
        let mut table = server.seat_all(&hub, &["alice", "bob", "carol", "dave"]).await;

        for (ws, value) in table.iter_mut().zip(["10", "20", "30"]) {
            send(ws, value).await;
        }
        let mut dave = table.pop().unwrap();
        tokio_test::assert_ok!(dave.close(None).await);

        let snapshot = next_result(&mut table[0]).await;
        assert_eq!(snapshot.players.len(), 3);
        assert_eq!(snapshot.winners, Some(vec!["bob".to_string()]));
    }

    #[tokio::test]
    async fn lone_player_ends_game() {
        let server = TestServer::with_defaults().await;
        let hub = server.hub().await;
        let mut table = server.seat_all(&hub, &["solo"]).await;

        send(&mut table[0], "33").await;

        match next_matching(&mut table[0], |m| !matches!(m, ServerMessage::State(_))).await {
            ServerMessage::Gameover(snapshot) => {
                assert_eq!(snapshot.winners, Some(vec!["solo".to_string()]));
                assert_approx_eq!(snapshot.target.unwrap(), 26.4);
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }
}
