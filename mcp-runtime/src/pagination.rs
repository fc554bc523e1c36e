//! Cursor-threading driver for the paginated list endpoints.

use std::time::Duration;

use futures::Stream;
use futures::TryStreamExt;
use mcp_types::PaginatedRequest;

use crate::error::PeerError;
use crate::peer::Peer;

enum PageState {
    Start,
    Next(String),
    Done,
}

/// Lazily iterate a list endpoint one page at a time.
///
/// The first poll issues the request with no cursor; each page's
/// `nextCursor` becomes the next request's cursor, and an absent cursor
/// ends the stream. The first error ends the stream with that error.
/// Dropping the stream early persists nothing.
pub fn paginate<R>(
    peer: &Peer,
    timeout: Option<Duration>,
) -> impl Stream<Item = Result<Vec<R::Item>, PeerError>> + '_
where
    R: PaginatedRequest,
{
    futures::stream::try_unfold(PageState::Start, move |state| async move {
        let cursor = match state {
            PageState::Start => None,
            PageState::Next(cursor) => Some(cursor),
            PageState::Done => return Ok(None),
        };
        let result = peer
            .send_request::<R>(R::params_for_cursor(cursor), timeout)
            .await?;
        let (items, next_cursor) = R::into_page(result);
        let next_state = match next_cursor {
            Some(cursor) => PageState::Next(cursor),
            None => PageState::Done,
        };
        Ok(Some((items, next_state)))
    })
}

/// Drain every page of a list endpoint into one vector.
pub async fn collect_all<R>(
    peer: &Peer,
    timeout: Option<Duration>,
) -> Result<Vec<R::Item>, PeerError>
where
    R: PaginatedRequest,
{
    paginate::<R>(peer, timeout).try_concat().await
}
