use std::future::Future;

use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::WidgetConfig;
use crate::errors::WidgetError;
use crate::models::ChatRequest;

use super::{ByteStream, Transport};

/// Posts chat requests to the SSE endpoint over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &WidgetConfig) -> Result<Self, WidgetError> {
        let mut builder = Client::builder();
        // Only the connection attempt is bounded; replies may stream for a long time.
        if let Some(timeout) = config.request_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn open(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ByteStream, WidgetError>> + Send {
        let endpoint = self.endpoint.clone();
        let pending = self.client.post(&self.endpoint).json(request).send();

        async move {
            debug!("Posting chat request to {endpoint}");
            let response = pending.await?;

            if !response.status().is_success() {
                return Err(WidgetError::HttpStatus { status: response.status().as_u16() });
            }
            info!(status = %response.status(), "Reply stream opened");

            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| WidgetError::stream(e.to_string())))
                .boxed();
            Ok(body)
        }
    }
}
