//! The boundary to the chat backend: one request in, one byte stream out.

pub mod http;

use std::future::Future;

use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::errors::WidgetError;
use crate::models::ChatRequest;

pub use http::HttpTransport;

/// Raw response body, delivered in arbitrarily sized chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, WidgetError>>;

pub trait Transport {
    /// Sends `request` and resolves once the response body is readable.
    fn open(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ByteStream, WidgetError>> + Send;
}
