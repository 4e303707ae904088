use crate::error::{ClientError, ClientResult};
use crate::event::AppEvent;
use crate::stream::PushEvent;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use std::future::Future;
use std::sync::mpsc;
use tokio::time::{self, Duration};

/// Fixed delay between push-channel connection attempts. There is no backoff
/// and no retry limit.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Runs `connect` forever, waiting `delay` after every drop.
///
/// Each call to `connect` owns one connection for its whole lifetime and
/// returns when that connection ends. Stops only when the UI side of `tx` is
/// gone.
pub async fn run_with_reconnect<F, Fut>(mut connect: F, tx: mpsc::Sender<AppEvent>, delay: Duration)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<()>>,
{
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        tracing::debug!(attempt, "opening push channel");
        let reason = match connect().await {
            Ok(()) => "push channel closed by server".to_string(),
            Err(err) => err.to_string(),
        };
        tracing::warn!(
            attempt,
            %reason,
            delay_secs = delay.as_secs(),
            "push channel dropped, scheduling reconnect"
        );
        if tx.send(AppEvent::StreamDisconnected(reason)).is_err() {
            tracing::debug!("event receiver dropped, stopping push channel");
            return;
        }
        time::sleep(delay).await;
    }
}

/// Opens `/api/stream` once and forwards its events until it ends.
pub async fn open_stream(
    http: reqwest::Client,
    url: String,
    tx: mpsc::Sender<AppEvent>,
) -> ClientResult<()> {
    let response = http
        .get(&url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Transport(format!(
            "push channel returned HTTP {}",
            status.as_u16()
        )));
    }

    tracing::info!(%url, "push channel connected");
    let _ = tx.send(AppEvent::StreamConnected);
    forward_events(response.bytes_stream(), &tx).await
}

/// Decodes SSE frames from `stream` and sends each JSON payload as an
/// [`AppEvent::Push`]. Malformed payloads are logged and skipped.
pub async fn forward_events<S, B, E>(stream: S, tx: &mpsc::Sender<AppEvent>) -> ClientResult<()>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error,
{
    let mut events = Box::pin(stream.eventsource());
    while let Some(item) = events.next().await {
        let event = item.map_err(|err| ClientError::Transport(format!("push channel error: {err}")))?;
        let data = event.data.trim();
        if data.is_empty() {
            continue;
        }

        match PushEvent::parse(data) {
            Ok(push) => {
                if tx.send(AppEvent::Push(push)).is_err() {
                    return Ok(());
                }
            }
            Err(err) => tracing::warn!(error = %err, %data, "skipping malformed push event"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{forward_events, run_with_reconnect, RECONNECT_DELAY};
    use crate::error::ClientError;
    use crate::event::AppEvent;
    use crate::stream::PushEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use tokio::time::{self, Duration};

    #[tokio::test]
    async fn forwards_parsed_events_and_skips_garbage() {
        let frames: Vec<Result<&str, std::io::Error>> = vec![
            Ok("data: {\"type\": \"chunk\", \"content\": \"Hel\", \"session_id\": \"default\"}\n\n"),
            Ok("data: not json\n\n"),
            Ok(": comment line\n\n"),
            Ok("data: {\"type\": \"ping\"}\n\n"),
        ];
        let (tx, rx) = mpsc::channel();

        forward_events(futures_util::stream::iter(frames), &tx)
            .await
            .expect("stream ends cleanly");

        let events: Vec<AppEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            AppEvent::Push(PushEvent::Chunk { content, .. }) if content == "Hel"
        ));
        assert!(matches!(events[1], AppEvent::Push(PushEvent::Ping)));
    }

    #[tokio::test]
    async fn transport_error_ends_the_connection() {
        let frames: Vec<Result<&str, std::io::Error>> = vec![
            Ok("data: {\"type\": \"ping\"}\n\n"),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let (tx, _rx) = mpsc::channel();

        let error = forward_events(futures_util::stream::iter(frames), &tx)
            .await
            .expect_err("reset should surface");
        assert!(matches!(error, ClientError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_every_five_seconds_indefinitely() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        let counter = Arc::clone(&attempts);
        let handle = tokio::spawn(run_with_reconnect(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ClientError::Transport("connection refused".to_string()))
                }
            },
            tx,
            RECONNECT_DELAY,
        ));

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(4)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);

        time::sleep(Duration::from_secs(50)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 12);

        let notices = rx
            .try_iter()
            .filter(|event| matches!(event, AppEvent::StreamDisconnected(_)))
            .count();
        assert_eq!(notices, 12);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_ui_is_gone() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let handle = tokio::spawn(run_with_reconnect(
            || async { Ok(()) },
            tx,
            RECONNECT_DELAY,
        ));
        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should exit without sleeping")
            .expect("task should not panic");
    }
}
