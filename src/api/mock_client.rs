use crate::api::client::{ByteStream, MockStreamProducer};
use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};

/// Replays canned chat replies, one per turn. Each reply is a list of raw body chunks
/// delivered exactly as given, so tests can split records at arbitrary byte offsets.
#[derive(Clone)]
pub struct MockApiClient {
    responses: Arc<Mutex<Vec<Vec<Vec<u8>>>>>,
    seen_messages: Arc<Mutex<Vec<String>>>,
}

impl MockApiClient {
    pub fn new(responses: Vec<Vec<Vec<u8>>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            seen_messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// One reply per turn, each record framed with the blank-line separator.
    pub fn from_records(turns: Vec<Vec<&str>>) -> Self {
        let responses = turns
            .into_iter()
            .map(|records| {
                records
                    .into_iter()
                    .map(|record| format!("data: {record}\n\n").into_bytes())
                    .collect()
            })
            .collect();
        Self::new(responses)
    }

    pub fn seen_messages(&self) -> Vec<String> {
        self.seen_messages.lock().unwrap().clone()
    }
}

impl MockStreamProducer for MockApiClient {
    fn create_mock_stream(&self, _session_id: &str, message: &str) -> Result<ByteStream> {
        self.seen_messages.lock().unwrap().push(message.to_string());

        let mut responses_guard = self.responses.lock().unwrap();
        if responses_guard.is_empty() {
            return Err(anyhow::anyhow!(
                "MockApiClient: No more responses configured"
            ));
        }
        let chunks: Vec<Result<Bytes>> = responses_guard
            .remove(0)
            .into_iter()
            .map(|chunk| Ok(Bytes::from(chunk)))
            .collect();

        Ok(Box::pin(stream::iter(chunks)))
    }
}
