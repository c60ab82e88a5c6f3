//! HttpGateway against a throwaway axum server speaking the daemon's
//! `POST /rpc/{method}` transport.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::Path, http::StatusCode, routing::post, Json, Router};
use remote_panel::gateway::{invoke, no_args, RpcError, RpcGateway};
use remote_panel::HttpGateway;
use remote_proto::protocol::{Channel, Method, Status};
use serde_json::{json, Value};

async fn fake_rpc(Path(method): Path<String>, Json(args): Json<Value>) -> (StatusCode, Json<Value>) {
    match method.as_str() {
        "get_status" => (
            StatusCode::OK,
            Json(json!({ "result": {
                "available": true,
                "playing": true,
                "channel": 1,
                "player": "mpv",
                "volume": 55,
                "autoconnect": true
            }})),
        ),
        // echo the arguments back so the test can see what was sent
        "set_volume" => (StatusCode::OK, Json(json!({ "result": args }))),
        "play" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "No player found" })),
        ),
        "stop" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, Json(json!({ "result": null })))
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown method" }))),
    }
}

async fn spawn_backend() -> SocketAddr {
    let app = Router::new().route("/rpc/:method", post(fake_rpc));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn gateway(addr: SocketAddr, timeout: Duration) -> HttpGateway {
    HttpGateway::new(format!("http://{addr}/"), timeout).unwrap()
}

#[tokio::test]
async fn decodes_result_envelope() {
    let addr = spawn_backend().await;
    let gw = gateway(addr, Duration::from_secs(5));

    let status: Status = invoke(&gw, Method::GetStatus, no_args()).await.unwrap();
    assert!(status.playing);
    assert_eq!(status.channel, Some(Channel::One));
    assert_eq!(status.volume, 55);
}

#[tokio::test]
async fn posts_arguments_as_json_body() {
    let addr = spawn_backend().await;
    let gw = gateway(addr, Duration::from_secs(5));

    let echoed = gw
        .call(Method::SetVolume, json!({ "volume": 30 }))
        .await
        .unwrap();
    assert_eq!(echoed, json!({ "volume": 30 }));
}

#[tokio::test]
async fn error_envelope_becomes_backend_error() {
    let addr = spawn_backend().await;
    let gw = gateway(addr, Duration::from_secs(5));

    let err = gw
        .call(Method::Play, json!({ "channel": 1 }))
        .await
        .unwrap_err();
    match err {
        RpcError::Backend { method, message } => {
            assert_eq!(method, Method::Play);
            assert_eq!(message, "No player found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_backend_times_out() {
    let addr = spawn_backend().await;
    let gw = gateway(addr, Duration::from_millis(200));

    let err = gw.call(Method::Stop, no_args()).await.unwrap_err();
    assert!(matches!(err, RpcError::Timeout { method: Method::Stop }));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    // bind and drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gw = gateway(addr, Duration::from_secs(2));
    let err = gw.call(Method::GetStatus, no_args()).await.unwrap_err();
    assert!(matches!(err, RpcError::Transport(_)));
}

#[tokio::test]
async fn malformed_result_is_a_decode_error() {
    let addr = spawn_backend().await;
    let gw = gateway(addr, Duration::from_secs(5));

    // set_volume echoes its args, which are not a Status
    let err = invoke::<Status>(&gw, Method::SetVolume, json!({ "volume": 3 }))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RpcError::Decode {
            method: Method::SetVolume,
            ..
        }
    ));
}
