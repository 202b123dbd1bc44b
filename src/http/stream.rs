//! Streaming file bodies
//!
//! Files go out in fixed-size frames read on demand, so a download holds at
//! most one chunk in memory however large the file is.

use std::io;

use futures_util::stream;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Bytes, Frame};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::response::Body;

/// Bytes read from disk per body frame
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Stream exactly `len` bytes of `file`, starting at its current position
///
/// A file that shrinks while being sent ends the body with `UnexpectedEof`;
/// hyper then aborts the connection instead of sending a short message.
pub fn file_body(file: File, len: u64) -> Body {
    let chunks = stream::unfold((file, len), |(mut file, remaining)| async move {
        if remaining == 0 {
            return None;
        }

        let want = usize::try_from(remaining).map_or(CHUNK_SIZE, |r| r.min(CHUNK_SIZE));
        let mut buf = vec![0; want];
        match file.read(&mut buf).await {
            Ok(0) => Some((Err(io::Error::from(io::ErrorKind::UnexpectedEof)), (file, 0))),
            Ok(n) => {
                buf.truncate(n);
                let read = u64::try_from(n).unwrap_or(remaining);
                Some((
                    Ok(Frame::data(Bytes::from(buf))),
                    (file, remaining.saturating_sub(read)),
                ))
            }
            Err(e) => Some((Err(e), (file, 0))),
        }
    });

    StreamBody::new(chunks).boxed_unsync()
}
