use crowdsafe_core::store::AnalysisRecord;

/// Event decoded from the service's insert stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Insert(Box<AnalysisRecord>),
    /// The service dropped notifications; reload the window.
    Resync { skipped: u64 },
}

/// Incremental decoder for `text/event-stream` bodies.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every event completed by it.
    ///
    /// Blocks are split on raw bytes so a character cut by a chunk boundary
    /// is only decoded once its block is complete.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<FeedEvent> {
        let bytes = chunk.iter().filter(|&&byte| byte != b'\r');
        self.buffer.extend(bytes);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|pair| pair == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            match std::str::from_utf8(&block) {
                Ok(text) => events.extend(parse_block(text)),
                Err(err) => log::warn!("skipping event with invalid utf-8: {}", err),
            }
        }
        events
    }
}

fn parse_block(block: &str) -> Option<FeedEvent> {
    let mut name = "message";
    let mut data = String::new();
    for line in block.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            name = value.trim();
        } else if let Some(value) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    match name {
        "INSERT" => match serde_json::from_str::<AnalysisRecord>(&data) {
            Ok(record) => Some(FeedEvent::Insert(Box::new(record))),
            Err(err) => {
                log::warn!("skipping undecodable insert event: {}", err);
                None
            }
        },
        "RESYNC" => Some(FeedEvent::Resync {
            skipped: data.trim().parse().unwrap_or(0),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crowdsafe_core::analysis::Scenario;
    use crowdsafe_core::prelude::VideoReference;

    #[test]
    fn events_split_across_chunks_are_joined() {
        let record = AnalysisRecord::new(
            &Scenario::get(4).unwrap().to_result(),
            &VideoReference::from_url("https://youtu.be/x"),
        );
        let frame = format!(
            "event:INSERT\ndata:{}\n\n",
            serde_json::to_string(&record).unwrap()
        );
        let (head, tail) = frame.split_at(frame.len() / 2);

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(head.as_bytes()).is_empty());
        let events = decoder.push(tail.as_bytes());
        assert_eq!(events, vec![FeedEvent::Insert(Box::new(record))]);
    }

    #[test]
    fn character_split_across_chunks_survives() {
        let record = AnalysisRecord::new(
            &Scenario::get(0).unwrap().to_result(),
            &VideoReference::from_path("public/1-vidéo.mp4"),
        );
        let frame = format!(
            "event:INSERT\ndata:{}\n\n",
            serde_json::to_string(&record).unwrap()
        );
        let bytes = frame.as_bytes();
        let accent = frame.find('é').unwrap();

        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&bytes[..accent + 1]).is_empty());
        let events = decoder.push(&bytes[accent + 1..]);

        match events.as_slice() {
            [FeedEvent::Insert(decoded)] => {
                assert_eq!(decoded.file_path.as_deref(), Some("public/1-vidéo.mp4"));
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event:RESYNC\r\ndata:4\r\n\r\n");
        assert_eq!(events, vec![FeedEvent::Resync { skipped: 4 }]);
    }

    #[test]
    fn keep_alive_comments_are_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b":\n\nevent:RESYNC\ndata:3\n\n");
        assert_eq!(events, vec![FeedEvent::Resync { skipped: 3 }]);
    }
}
