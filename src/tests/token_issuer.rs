#[cfg(test)]
mod test {
    use chrono::TimeDelta;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::credentials::CredentialOverrides;
    use crate::observability::metrics::get_metrics;
    use prometheus::{Encoder, TextEncoder};
    use crate::tests::common::*;

    #[tokio::test]
    async fn token_is_reused_inside_window_and_refreshed_after() {
        let (handle, token_url, endpoint) = spawn_token_endpoint(vec![
            (200, token_body("tok1")),
            (200, token_body("tok2")),
        ])
        .await;
        let clock = ManualClock::new();
        let issuer = build_issuer(credential_defaults(&token_url), clock.clone());
        let overrides = CredentialOverrides::default();

        // t0: empty cache
        let first = issuer.get_valid_token(&overrides).await.expect("first token");
        assert_eq!(first, "tok1");
        assert_eq!(endpoint.calls(), 1);

        // t0 + 1h: cached
        clock.advance(TimeDelta::hours(1));
        let second = issuer.get_valid_token(&overrides).await.expect("cached token");
        assert_eq!(second, "tok1");
        assert_eq!(endpoint.calls(), 1, "no exchange inside the window");

        // t0 + 25h: stale, refreshed
        clock.advance(TimeDelta::hours(24));
        let third = issuer.get_valid_token(&overrides).await.expect("refreshed token");
        assert_eq!(third, "tok2");
        assert_eq!(endpoint.calls(), 2);

        let cached = issuer.cache().get(CLIENT_A).await.expect("cache entry");
        assert_eq!(cached.value, "tok2");
        assert_eq!(cached.acquired_at, clock_start() + TimeDelta::hours(25));

        handle.abort();
    }

    #[tokio::test]
    async fn exchange_posts_resolved_form_fields() {
        let (handle, token_url, endpoint) =
            spawn_token_endpoint(vec![(200, token_body("tok"))]).await;
        let issuer = build_issuer(credential_defaults(&token_url), ManualClock::new());

        let overrides = CredentialOverrides {
            scope: Some("openid".to_owned()),
            ..Default::default()
        };
        issuer.get_valid_token(&overrides).await.expect("token");

        let requests = endpoint.requests();
        assert_eq!(requests.len(), 1);
        let form = &requests[0];
        assert_eq!(form.get("client_id").map(String::as_str), Some(CLIENT_A));
        assert_eq!(form.get("client_secret").map(String::as_str), Some(SECRET_A));
        assert_eq!(
            form.get("grant_type").map(String::as_str),
            Some("client_credentials")
        );
        assert_eq!(form.get("scope").map(String::as_str), Some("openid"));

        handle.abort();
    }

    #[tokio::test]
    async fn identities_are_cached_independently() {
        let (handle, token_url, endpoint) = spawn_token_endpoint(vec![
            (200, token_body("tok-A")),
            (200, token_body("tok-B")),
        ])
        .await;
        let issuer = build_issuer(credential_defaults(&token_url), ManualClock::new());

        let as_b = CredentialOverrides {
            client_id: Some("client-B".to_owned()),
            client_secret: Some("secret-B".to_owned()),
            ..Default::default()
        };

        let a = issuer
            .get_valid_token(&CredentialOverrides::default())
            .await
            .expect("token A");
        let b = issuer.get_valid_token(&as_b).await.expect("token B");
        assert_eq!(a, "tok-A");
        assert_eq!(b, "tok-B");
        assert_eq!(endpoint.calls(), 2, "B must not reuse A's token");

        // both now served from cache
        assert_eq!(
            issuer
                .get_valid_token(&CredentialOverrides::default())
                .await
                .unwrap(),
            "tok-A"
        );
        assert_eq!(issuer.get_valid_token(&as_b).await.unwrap(), "tok-B");
        assert_eq!(endpoint.calls(), 2);
        assert_eq!(issuer.cache().len().await, 2);

        let forms = endpoint.requests();
        assert_eq!(forms[1].get("client_id").map(String::as_str), Some("client-B"));
        assert_eq!(forms[1].get("client_secret").map(String::as_str), Some("secret-B"));

        handle.abort();
    }

    #[tokio::test]
    async fn rejected_exchange_caches_nothing_and_next_call_retries() {
        let (handle, token_url, endpoint) = spawn_token_endpoint(vec![
            (500, r#"{"error":"server_error"}"#.to_owned()),
            (200, token_body("tok-after")),
        ])
        .await;
        let issuer = build_issuer(credential_defaults(&token_url), ManualClock::new());
        let overrides = CredentialOverrides::default();

        let failure = issuer
            .get_valid_token(&overrides)
            .await
            .expect_err("500 must fail");
        assert_eq!(failure.message, "Failed to generate access token");
        assert_eq!(failure.status, Some(500));
        assert_eq!(failure.upstream_details, json!({ "error": "server_error" }));
        assert_eq!(failure.reason(), "rejected");
        assert!(issuer.cache().is_empty().await);

        let token = issuer.get_valid_token(&overrides).await.expect("retry");
        assert_eq!(token, "tok-after");
        assert_eq!(endpoint.calls(), 2);

        handle.abort();
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_entry_untouched() {
        let (handle, token_url, _endpoint) = spawn_token_endpoint(vec![
            (200, token_body("tok-old")),
            (401, r#"{"error":"invalid_client"}"#.to_owned()),
        ])
        .await;
        let clock = ManualClock::new();
        let issuer = build_issuer(credential_defaults(&token_url), clock.clone());
        let overrides = CredentialOverrides::default();

        issuer.get_valid_token(&overrides).await.expect("initial token");
        clock.advance(TimeDelta::hours(30));

        let failure = issuer.get_valid_token(&overrides).await.unwrap_err();
        assert_eq!(failure.status, Some(401));

        let cached = issuer.cache().get(CLIENT_A).await.expect("stale entry kept");
        assert_eq!(cached.value, "tok-old");
        assert_eq!(cached.acquired_at, clock_start());
        assert!(issuer.cache().get_fresh(CLIENT_A).await.is_none());

        handle.abort();
    }

    #[tokio::test]
    async fn success_without_access_token_is_a_failure() {
        let (handle, token_url, _endpoint) =
            spawn_token_endpoint(vec![(200, r#"{"token_type":"bearer"}"#.to_owned())]).await;
        let issuer = build_issuer(credential_defaults(&token_url), ManualClock::new());

        let failure = issuer
            .get_valid_token(&CredentialOverrides::default())
            .await
            .unwrap_err();
        assert_eq!(failure.status, Some(200));
        assert_eq!(failure.reason(), "malformed");
        assert_eq!(
            failure.upstream_details["body"],
            json!({ "token_type": "bearer" })
        );
        assert!(issuer.cache().is_empty().await);

        handle.abort();
    }

    #[tokio::test]
    async fn unreachable_token_endpoint_is_a_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let defaults = credential_defaults(&format!("http://{}/token", addr));
        let issuer = build_issuer(defaults, ManualClock::new());

        let failure = issuer
            .get_valid_token(&CredentialOverrides::default())
            .await
            .unwrap_err();
        assert_eq!(failure.status, None);
        assert_eq!(failure.reason(), "transport");
        assert!(failure.upstream_details.is_string());
        assert!(issuer.cache().is_empty().await);
    }

    #[tokio::test]
    async fn exchange_is_bounded_by_timeout() {
        let (handle, token_url, _endpoint) =
            spawn_token_endpoint(vec![(200, token_body("unused"))]).await;
        let slow_url = token_url.replace("/token", "/slow");
        let issuer = build_issuer_with_timeout(
            credential_defaults(&slow_url),
            ManualClock::new(),
            Duration::from_millis(100),
        );

        let started = std::time::Instant::now();
        let failure = issuer
            .get_valid_token(&CredentialOverrides::default())
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(failure.reason(), "transport");

        handle.abort();
    }

    #[tokio::test]
    async fn concurrent_misses_all_succeed_with_one_entry() {
        let (handle, token_url, endpoint) =
            spawn_token_endpoint(vec![(200, token_body("tok"))]).await;
        let issuer = Arc::new(build_issuer(
            credential_defaults(&token_url),
            ManualClock::new(),
        ));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let issuer = issuer.clone();
            tasks.spawn(async move {
                issuer
                    .get_valid_token(&CredentialOverrides::default())
                    .await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            let token = joined.expect("task panicked").expect("token");
            assert_eq!(token, "tok");
        }

        // no single-flight: between 1 and 8 exchanges, one cache entry
        let calls = endpoint.calls();
        assert!((1..=8).contains(&calls), "calls = {}", calls);
        assert_eq!(issuer.cache().len().await, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn exchange_metrics_do_not_label_by_client_id() {
        let (handle, token_url, _endpoint) =
            spawn_token_endpoint(vec![(200, token_body("tok"))]).await;
        let issuer = build_issuer(credential_defaults(&token_url), ManualClock::new());
        let metrics = get_metrics().await;
        let overridden = || {
            metrics
                .token_exchange_requests
                .with_label_values(&["override"])
                .get()
        };
        let before = overridden();

        let as_other = CredentialOverrides {
            client_id: Some("client-from-browser-42".to_owned()),
            ..Default::default()
        };
        issuer.get_valid_token(&as_other).await.expect("token");
        assert!(overridden() > before);

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metrics.registry.gather(), &mut buffer)
            .expect("encode metrics");
        let exposition = String::from_utf8(buffer).expect("utf8");
        assert!(exposition.contains("eventconsole_token_exchange_requests_total"));
        assert!(!exposition.contains("client-from-browser"), "{}", exposition);

        handle.abort();
    }
}
