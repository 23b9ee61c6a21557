use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use binnai_model::{ErrorKind, ModelResponse, ModelResponseEvent};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::Sse;
use crate::proto::{self, GenerateContentResponse};

struct PartialState {
    sse: Sse,
    // One SSE payload may carry several text parts plus a finish reason,
    // they are handed out one event at a time.
    pending_events: VecDeque<ModelResponseEvent>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct GeminiResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl GeminiResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            pending_events: VecDeque::new(),
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for GeminiResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    loop {
        if let Some(event) = partial_state.pending_events.pop_front() {
            return Ok((Some(event), partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => return Ok((None, partial_state)),
            Err(err) => {
                error!("failed to read event stream: {err:?}");
                return Err(Error::new("", ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");

        // Details are only logged, the message stays empty.
        let chunk = serde_json::from_str::<GenerateContentResponse>(&sse_event)
            .map_err(|err| {
                error!("malformed stream payload: {err}");
                Error::new("", ErrorKind::Other)
            })?;
        proto::check_prompt_feedback(&chunk)?;

        let finish_reason = chunk
            .candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
            .map(proto::finish_reason);

        // Always emit message deltas first, then the finish reason.
        for part in proto::first_candidate_parts(chunk) {
            match part.text {
                Some(text) if !text.is_empty() => partial_state
                    .pending_events
                    .push_back(ModelResponseEvent::MessageDelta(text)),
                _ => {}
            }
        }
        if let Some(finish_reason) = finish_reason {
            partial_state
                .pending_events
                .push_back(ModelResponseEvent::Completed(finish_reason));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use binnai_model::ModelFinishReason;
    use bytes::Bytes;

    use super::*;
    use crate::io::Chunks;

    async fn collect_events(
        chunks: Chunks,
    ) -> Result<Vec<ModelResponseEvent>, Error> {
        let sse = Sse::new(chunks);
        let mut resp = pin!(GeminiResponse::from_sse(sse));
        let mut events = Vec::new();
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            events.push(event);
        }
        Ok(events)
    }

    #[tokio::test]
    async fn test_stream_events() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(include_bytes!(
                "../fixtures/stream_response.txt"
            ))]
            .into(),
        );
        let events = collect_events(chunks).await.unwrap();
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Halo".to_owned()),
                ModelResponseEvent::MessageDelta("! ".to_owned()),
                ModelResponseEvent::MessageDelta("Baik".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(
                    b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hai\"}]}}]}\n\n",
                ),
                Bytes::from_static(b"data: {not json\n\n"),
            ]
            .into(),
        );
        let sse = Sse::new(chunks);
        let mut resp = pin!(GeminiResponse::from_sse(sse));
        let first = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await;
        assert_eq!(
            first.unwrap(),
            Some(ModelResponseEvent::MessageDelta("Hai".to_owned()))
        );
        let second = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await;
        let err = second.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Other);
        assert_eq!(err.to_string(), "");
        // Exhausted after an error.
        let third = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await;
        assert_eq!(third.unwrap(), None);
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"data: {\"promptFeedback\":{\"blockReason\":\"SAFETY\"}}\r\n\r\n",
            )]
            .into(),
        );
        let err = collect_events(chunks).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Moderated);
    }

    #[tokio::test]
    async fn test_invalid_event_stream() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(
                    b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hai\"}]}}]}\n\n",
                ),
                Bytes::from_static(b"garbage line\n\n"),
            ]
            .into(),
        );
        let sse = Sse::new(chunks);
        let mut resp = pin!(GeminiResponse::from_sse(sse));
        let first = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await;
        assert_eq!(
            first.unwrap(),
            Some(ModelResponseEvent::MessageDelta("Hai".to_owned()))
        );
        let err = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Other);
        assert_eq!(err.message(), "");
    }
}
