use crate::api::StreamDecoder;
use crate::types::StreamEvent;
use anyhow::Result;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What one chat turn produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Concatenated `Delta` text, in arrival order.
    pub text: String,
    /// Set once a `Complete` record arrives.
    pub order_summary: Option<String>,
    /// Server-reported error; the turn stops at the first one.
    pub error: Option<String>,
    pub cancelled: bool,
}

impl TurnOutcome {
    pub fn is_complete(&self) -> bool {
        self.order_summary.is_some() && self.error.is_none() && !self.cancelled
    }

    // Returns false once the turn must stop consuming events.
    fn apply(
        &mut self,
        event: StreamEvent,
        updates: Option<&mpsc::UnboundedSender<StreamEvent>>,
    ) -> bool {
        emit_update(updates, event.clone());
        match event {
            StreamEvent::Delta { text } => {
                self.text.push_str(&text);
                true
            }
            StreamEvent::Complete { summary } => {
                self.order_summary = Some(summary);
                true
            }
            StreamEvent::Error { message } => {
                tracing::warn!(%message, "server reported an error for this turn");
                self.error = Some(message);
                false
            }
        }
    }
}

/// Drive one streamed reply to completion: read a chunk, decode it, hand the events on,
/// and repeat until the body ends, the server reports an error, or `cancel` fires.
///
/// Transport failures while reading come back as `Err`; everything the server said
/// before that point has already been forwarded to `updates`.
pub async fn run_turn<S>(
    mut stream: S,
    cancel: &CancellationToken,
    updates: Option<&mpsc::UnboundedSender<StreamEvent>>,
) -> Result<TurnOutcome>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let mut decoder = StreamDecoder::new();
    let mut outcome = TurnOutcome::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(received = outcome.text.len(), "turn cancelled");
                outcome.cancelled = true;
                return Ok(outcome);
            }
            next = stream.next() => next,
        };

        let (events, finished) = match next {
            Some(chunk) => (decoder.feed(&chunk?), false),
            None => (decoder.finish(), true),
        };

        for event in events {
            if !outcome.apply(event, updates) {
                return Ok(outcome);
            }
        }

        if finished {
            break;
        }
    }

    if outcome.order_summary.is_none() {
        tracing::debug!("stream ended without a completion record");
    }
    Ok(outcome)
}

fn emit_update(updates: Option<&mpsc::UnboundedSender<StreamEvent>>, event: StreamEvent) {
    if let Some(tx) = updates {
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn byte_stream(chunks: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes>> + Unpin {
        stream::iter(
            chunks
                .iter()
                .copied()
                .map(|chunk| Ok(Bytes::from_static(chunk)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_turn_collects_text_and_summary() {
        // "개" is EA B0 9C; the chunk boundary falls inside it.
        let body = byte_stream(&[
            "data: {\"chunk\":\"치즈버거 \",\"complete\":false}\n\nda".as_bytes(),
            b"ta: {\"chunk\":\"2\xea\xb0",
            b"\x9c\"}\n\n",
            b"data: {\"chunk\":\"\",\"complete\":true,\"order_summary\":\"2x cheese\"}",
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = run_turn(body, &CancellationToken::new(), Some(&tx))
            .await
            .expect("turn should succeed");

        assert_eq!(outcome.text, "치즈버거 2개");
        assert_eq!(outcome.order_summary.as_deref(), Some("2x cheese"));
        assert!(outcome.is_complete());

        let mut forwarded = Vec::new();
        while let Ok(event) = rx.try_recv() {
            forwarded.push(event);
        }
        assert_eq!(forwarded.len(), 3);
    }

    #[tokio::test]
    async fn test_turn_stops_at_first_error() {
        let body = byte_stream(&[
            b"data: {\"chunk\":\"partial \"}\n\n",
            b"data: {\"error\":\"kitchen closed\",\"complete\":true}\n\n",
            b"data: {\"chunk\":\"ignored\"}\n\n",
        ]);

        let outcome = run_turn(body, &CancellationToken::new(), None)
            .await
            .expect("server errors are not transport errors");

        assert_eq!(outcome.text, "partial ");
        assert_eq!(outcome.error.as_deref(), Some("kitchen closed"));
        assert_eq!(outcome.order_summary, None);
        assert!(!outcome.is_complete());
    }

    #[tokio::test]
    async fn test_transport_error_is_returned() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"chunk\":\"hi\"}\n\n")),
            Err(anyhow::anyhow!("connection reset")),
        ]);

        let error = run_turn(body, &CancellationToken::new(), None)
            .await
            .expect_err("transport failure must surface");
        assert!(error.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_cancelled_turn_stops_reading() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let body = byte_stream(&[b"data: {\"chunk\":\"never\"}\n\n"]);

        let outcome = run_turn(body, &cancel, None).await.expect("cancel is not an error");
        assert!(outcome.cancelled);
        assert!(outcome.text.is_empty());
    }

    #[tokio::test]
    async fn test_pending_stream_is_cancellable() {
        let cancel = CancellationToken::new();
        let body = stream::pending::<Result<Bytes>>();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let outcome = run_turn(body, &cancel, None).await.expect("cancel is not an error");
        assert!(outcome.cancelled);
    }
}
