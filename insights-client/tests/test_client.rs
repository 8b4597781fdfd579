// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
mod ingestion_tests {
    use std::time::Duration;

    use chrono::Utc;
    use httpmock::prelude::*;
    use insights_client::{
        AppInsightsClient, ClientError, ConnectionString, MetricTelemetry, RequestTelemetry,
        TelemetryClient,
    };

    const IKEY: &str = "00000000-0000-0000-0000-000000000001";

    fn connection_string(server: &MockServer) -> ConnectionString {
        ConnectionString::parse(&format!(
            "InstrumentationKey={IKEY};IngestionEndpoint={};LiveEndpoint={}",
            server.base_url(),
            server.base_url()
        ))
        .unwrap()
    }

    fn request(success: bool) -> RequestTelemetry {
        RequestTelemetry::new(
            "jmeter",
            Utc::now(),
            Duration::from_millis(120),
            if success { "200" } else { "500" },
            success,
        )
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_flush_posts_buffered_items() {
        let server = MockServer::start();
        let track = server.mock(|when, then| {
            when.method(POST)
                .path("/v2.1/track")
                .header("content-type", "application/json");
            then.status(200)
                .body(r#"{"itemsReceived":2,"itemsAccepted":2,"errors":[]}"#);
        });

        let client = AppInsightsClient::builder(connection_string(&server))
            .build()
            .unwrap();
        client.track_request(request(true)).unwrap();
        client
            .track_metric(MetricTelemetry::new("jmeter.Latency", 12.0, Utc::now()))
            .unwrap();

        assert_eq!(client.buffered(), 2);
        assert_eq!(track.hits(), 0);

        client.flush().unwrap();

        assert_eq!(track.hits(), 1);
        assert_eq!(client.buffered(), 0);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_batch_threshold_sends_inline() {
        let server = MockServer::start();
        let track = server.mock(|when, then| {
            when.method(POST).path("/v2.1/track");
            then.status(200);
        });

        let client = AppInsightsClient::builder(connection_string(&server))
            .set_max_batch_size(2)
            .build()
            .unwrap();
        client.track_request(request(true)).unwrap();
        assert_eq!(track.hits(), 0);
        client.track_request(request(true)).unwrap();
        assert_eq!(track.hits(), 1);
        client.track_request(request(true)).unwrap();
        assert_eq!(client.buffered(), 1);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_empty_flush_sends_nothing() {
        let server = MockServer::start();
        let track = server.mock(|when, then| {
            when.method(POST).path("/v2.1/track");
            then.status(200);
        });

        let client = AppInsightsClient::builder(connection_string(&server))
            .build()
            .unwrap();
        client.flush().unwrap();
        assert_eq!(track.hits(), 0);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_partial_success_is_not_an_error() {
        let server = MockServer::start();
        let track = server.mock(|when, then| {
            when.method(POST).path("/v2.1/track");
            then.status(206).body(
                r#"{"itemsReceived":2,"itemsAccepted":1,"errors":[{"index":1,"statusCode":400,"message":"invalid"}]}"#,
            );
        });

        let client = AppInsightsClient::builder(connection_string(&server))
            .build()
            .unwrap();
        client.track_request(request(true)).unwrap();
        client.track_request(request(false)).unwrap();
        client.flush().unwrap();
        assert_eq!(track.hits(), 1);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_rejected_batch_is_an_error() {
        let server = MockServer::start();
        let _track = server.mock(|when, then| {
            when.method(POST).path("/v2.1/track");
            then.status(400).body("Invalid instrumentation key");
        });

        let client = AppInsightsClient::builder(connection_string(&server))
            .build()
            .unwrap();
        client.track_request(request(true)).unwrap();

        match client.flush() {
            Err(ClientError::Http { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "Invalid instrumentation key");
            }
            other => panic!("unexpected result {other:?}"),
        }
        // Items of a rejected batch are not kept for another attempt.
        assert_eq!(client.buffered(), 0);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_unreachable_endpoint() {
        let cs = ConnectionString::parse(&format!(
            "InstrumentationKey={IKEY};IngestionEndpoint=http://127.0.0.1:1"
        ))
        .unwrap();
        let client = AppInsightsClient::builder(cs)
            .set_timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        client.track_request(request(true)).unwrap();

        let err = client.flush().unwrap_err();
        assert!(
            matches!(err, ClientError::Network(_) | ClientError::Timeout),
            "unexpected error {err:?}"
        );
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_live_metrics_published_on_flush() {
        let server = MockServer::start();
        let _track = server.mock(|when, then| {
            when.method(POST).path("/v2.1/track");
            then.status(200);
        });
        let live = server.mock(|when, then| {
            when.method(POST)
                .path("/QuickPulseService.svc/post")
                .query_param("ikey", IKEY);
            then.status(200);
        });

        let client = AppInsightsClient::builder(connection_string(&server))
            .set_live_metrics(true)
            .build()
            .unwrap();
        client.track_request(request(false)).unwrap();
        client.flush().unwrap();

        assert_eq!(live.hits(), 1);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_live_metrics_failure_is_swallowed() {
        let server = MockServer::start();
        let _track = server.mock(|when, then| {
            when.method(POST).path("/v2.1/track");
            then.status(200);
        });
        let live = server.mock(|when, then| {
            when.method(POST).path("/QuickPulseService.svc/post");
            then.status(503);
        });

        let client = AppInsightsClient::builder(connection_string(&server))
            .set_live_metrics(true)
            .build()
            .unwrap();
        client.track_request(request(true)).unwrap();
        client.flush().unwrap();

        assert_eq!(live.hits(), 1);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_live_metrics_disabled() {
        let server = MockServer::start();
        let _track = server.mock(|when, then| {
            when.method(POST).path("/v2.1/track");
            then.status(200);
        });
        let live = server.mock(|when, then| {
            when.method(POST).path("/QuickPulseService.svc/post");
            then.status(200);
        });

        let client = AppInsightsClient::builder(connection_string(&server))
            .build()
            .unwrap();
        client.track_request(request(true)).unwrap();
        client.flush().unwrap();

        assert_eq!(live.hits(), 0);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_live_metrics_skipped_without_requests() {
        let server = MockServer::start();
        let track = server.mock(|when, then| {
            when.method(POST).path("/v2.1/track");
            then.status(200);
        });
        let live = server.mock(|when, then| {
            when.method(POST).path("/QuickPulseService.svc/post");
            then.status(200);
        });

        let client = AppInsightsClient::builder(connection_string(&server))
            .set_live_metrics(true)
            .build()
            .unwrap();
        client
            .track_metric(MetricTelemetry::new("jmeter.Latency", 12.0, Utc::now()))
            .unwrap();
        client.flush().unwrap();
        client.flush().unwrap();

        assert_eq!(track.hits(), 1);
        assert_eq!(live.hits(), 0);
    }
}
