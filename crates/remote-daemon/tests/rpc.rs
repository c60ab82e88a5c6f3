//! The daemon's router driven through the panel's own HTTP gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use remote_daemon::{server, Backend};
use remote_panel::gateway::{invoke, no_args, RpcError, RpcGateway};
use remote_panel::HttpGateway;
use remote_proto::config::Config;
use remote_proto::protocol::{Method, NowPlaying, RpcFault, Status};
use serde_json::json;

async fn spawn_daemon() -> (SocketAddr, Arc<Backend>) {
    let backend = Arc::new(Backend::new(None, &Config::default()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::router(backend.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, backend)
}

fn gateway(addr: SocketAddr) -> HttpGateway {
    HttpGateway::new(format!("http://{addr}"), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn status_round_trips_through_the_panel_gateway() {
    let (addr, _) = spawn_daemon().await;
    let gw = gateway(addr);

    let status: Status = invoke(&gw, Method::GetStatus, no_args()).await.unwrap();
    assert!(!status.available);
    assert!(!status.playing);
    assert_eq!(status.volume, 70);
    assert!(status.autoconnect);

    let np: NowPlaying = invoke(&gw, Method::GetNowPlaying, no_args()).await.unwrap();
    assert_eq!(np, NowPlaying::default());
}

#[tokio::test]
async fn commands_update_backend_state() {
    let (addr, backend) = spawn_daemon().await;
    let gw = gateway(addr);

    let status: Status = invoke(&gw, Method::SetAutoconnect, json!({ "enabled": false }))
        .await
        .unwrap();
    assert!(!status.autoconnect);

    gw.call(Method::SetVolume, json!({ "volume": 130 }))
        .await
        .unwrap();
    assert_eq!(backend.get_status().await.volume, 100);

    gw.call(Method::Stop, no_args()).await.unwrap();
    assert!(!backend.get_status().await.playing);
}

#[tokio::test]
async fn play_without_player_is_reported_as_backend_error() {
    let (addr, _) = spawn_daemon().await;
    let gw = gateway(addr);

    match gw.call(Method::Play, json!({ "channel": 1 })).await {
        Err(RpcError::Backend { method, message }) => {
            assert_eq!(method, Method::Play);
            assert!(message.starts_with("No player found"), "{message}");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_method_and_bad_arguments_get_client_errors() {
    let (addr, _) = spawn_daemon().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/rpc/rewind"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    let fault: RpcFault = resp.json().await.unwrap();
    assert_eq!(fault.error, "unknown method: rewind");

    let resp = client
        .post(format!("http://{addr}/rpc/set_volume"))
        .json(&json!({ "volume": "loud" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("http://{addr}/rpc/play"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_body_counts_as_no_arguments() {
    let (addr, _) = spawn_daemon().await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/rpc/get_status"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["result"]["playing"], json!(false));
}
