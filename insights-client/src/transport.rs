// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::error::ClientError;

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Response of the ingestion endpoint, reduced to what the client inspects.
#[derive(Debug)]
pub(crate) struct Response {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Posts JSON payloads over HTTP(S). Shared by the ingestion channel and live metrics.
#[derive(Clone)]
pub(crate) struct Transport {
    client: HttpsClient,
    timeout: Duration,
}

impl Transport {
    pub fn new(timeout: Duration) -> Self {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, timeout }
    }

    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        payload: Vec<u8>,
    ) -> Result<Response, ClientError> {
        debug!(url, payload_size = payload.len(), "Posting telemetry payload");

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(CONTENT_TYPE, "application/json");
        for (key, value) in headers {
            builder = builder.header(*key, value.as_str());
        }
        let req = builder
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.request(req))
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        let body = tokio::time::timeout(self.timeout, response.into_body().collect())
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(|e| ClientError::Network(e.to_string()))?
            .to_bytes();

        debug!(status = status.as_u16(), "Received response");
        Ok(Response { status, body })
    }
}
