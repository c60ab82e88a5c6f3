//! Now/next show metadata from the NTS live API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use remote_proto::protocol::{NowPlaying, ShowInfo};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::Backend;

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("nts-remote/", env!("CARGO_PKG_VERSION"));

static NULL: Value = Value::Null;

pub async fn fetch(client: &reqwest::Client, url: &str) -> anyhow::Result<NowPlaying> {
    let payload: Value = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(extract(&payload, Utc::now()))
}

/// Build a [`NowPlaying`] out of a live API payload.
///
/// `results` is normally an array ordered by channel; an object keyed
/// `channel1` / `channel2` is accepted too.  Missing pieces become `None`.
pub fn extract(payload: &Value, fetched_at: DateTime<Utc>) -> NowPlaying {
    let results = &payload["results"];
    NowPlaying {
        ch1: Some(extract_channel(channel_entry(results, 1))),
        ch2: Some(extract_channel(channel_entry(results, 2))),
        fetched_at: Some(fetched_at),
    }
}

fn channel_entry(results: &Value, number: usize) -> &Value {
    if let Some(list) = results.as_array() {
        let name = number.to_string();
        return list
            .iter()
            .find(|c| c["channel_name"].as_str() == Some(name.as_str()))
            .or_else(|| list.get(number - 1))
            .unwrap_or(&NULL);
    }
    &results[format!("channel{}", number)]
}

fn extract_channel(channel: &Value) -> ShowInfo {
    let now = &channel["now"];
    let next = &channel["next"];
    ShowInfo {
        now_title: show_title(now),
        now_image: show_image(now),
        next_title: show_title(next),
        next_image: show_image(next),
    }
}

fn show_title(show: &Value) -> Option<String> {
    non_empty(&show["broadcast_title"]).or_else(|| non_empty(&show["title"]))
}

fn show_image(show: &Value) -> Option<String> {
    let media = &show["embeds"]["details"]["media"];
    non_empty(&media["background_large"]).or_else(|| non_empty(&media["background"]))
}

fn non_empty(v: &Value) -> Option<String> {
    v.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

/// Refresh the backend's metadata every `period` until cancelled.  The
/// first fetch happens right away; failures keep the previous value.
pub async fn run_refresher(backend: Arc<Backend>, token: CancellationToken, period: Duration) {
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tick.tick() => {}
        }

        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            r = fetch(backend.http(), backend.live_api_url()) => r,
        };
        match fetched {
            Ok(np) => {
                debug!("metadata: refreshed");
                backend.set_now_playing(np).await;
            }
            // offline or API hiccup; keep what we have
            Err(e) => debug!("metadata: fetch failed: {:#}", e),
        }
    }
    info!("metadata: refresher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_extract_from_channel_array() {
        let payload = json!({
            "results": [
                {
                    "channel_name": "1",
                    "now": {
                        "broadcast_title": "Early Bird",
                        "embeds": { "details": { "media": {
                            "background_large": "https://img/large.jpg",
                            "background": "https://img/small.jpg"
                        }}}
                    },
                    "next": { "broadcast_title": "Lunch" }
                },
                {
                    "channel_name": "2",
                    "now": {
                        "title": "Fallback Title",
                        "embeds": { "details": { "media": { "background": "https://img/bg.jpg" } } }
                    },
                    "next": {}
                }
            ]
        });

        let np = extract(&payload, at());
        let ch1 = np.ch1.unwrap();
        assert_eq!(ch1.now_title.as_deref(), Some("Early Bird"));
        assert_eq!(ch1.now_image.as_deref(), Some("https://img/large.jpg"));
        assert_eq!(ch1.next_title.as_deref(), Some("Lunch"));
        assert_eq!(ch1.next_image, None);

        let ch2 = np.ch2.unwrap();
        assert_eq!(ch2.now_title.as_deref(), Some("Fallback Title"));
        assert_eq!(ch2.now_image.as_deref(), Some("https://img/bg.jpg"));
        assert_eq!(ch2.next_title, None);
        assert_eq!(np.fetched_at, Some(at()));
    }

    #[test]
    fn test_extract_from_keyed_object() {
        let payload = json!({
            "results": {
                "channel2": { "now": { "broadcast_title": "Night Shift" } }
            }
        });
        let np = extract(&payload, at());
        assert_eq!(np.ch1, Some(ShowInfo::default()));
        assert_eq!(np.ch2.unwrap().now_title.as_deref(), Some("Night Shift"));
    }

    #[test]
    fn test_extract_garbage_yields_empty_shows() {
        let np = extract(&json!({ "unexpected": true }), at());
        assert_eq!(np.ch1, Some(ShowInfo::default()));
        assert_eq!(np.ch2, Some(ShowInfo::default()));
    }
}
