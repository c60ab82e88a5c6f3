use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use remote_proto::protocol::{Method, RpcFault, RpcReply, RPC_PATH_PREFIX};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendError};

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = match &self {
            BackendError::UnknownMethod(_) => StatusCode::NOT_FOUND,
            BackendError::InvalidArguments { .. } => StatusCode::BAD_REQUEST,
            BackendError::NoPlayer | BackendError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = RpcFault {
            error: format!("{:#}", anyhow::Error::from(self)),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(backend: Arc<Backend>) -> Router {
    Router::new()
        .route(&format!("{}/:method", RPC_PATH_PREFIX), post(rpc))
        .with_state(backend)
}

async fn rpc(
    State(backend): State<Arc<Backend>>,
    Path(method): Path<String>,
    body: Bytes,
) -> Result<Json<RpcReply>, BackendError> {
    // an empty body is the same as `{}`
    let args = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(serde_json::Map::new())
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                return Err(match Method::from_name(&method) {
                    Some(m) => BackendError::InvalidArguments {
                        method: m,
                        message: e.to_string(),
                    },
                    None => BackendError::UnknownMethod(method),
                })
            }
        }
    };

    debug!("rpc: {} {}", method, args);
    match backend.handle(&method, args).await {
        Ok(result) => Ok(Json(RpcReply { result })),
        Err(e) => {
            warn!("rpc: {} failed: {}", method, e);
            Err(e)
        }
    }
}

/// Serve the RPC router on `addr` until `shutdown` resolves.
pub async fn serve(
    addr: &str,
    backend: Arc<Backend>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("rpc: listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(backend))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
