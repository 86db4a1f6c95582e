use assert_matches::assert_matches;
use httpdns::config::{EnterpriseConfig, HttpClientConfig, RetryConfig, UpstreamConfig};
use httpdns::error::UpstreamError;
use httpdns::upstream::{
    create_resolver, DesCipher, EnterpriseResolver, HttpClient, PlainResolver, UpstreamResolver,
};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "k3y-8byt";

fn plain_resolver(server: &MockServer, config: &HttpClientConfig) -> PlainResolver {
    let client = HttpClient::create(&UpstreamConfig::default(), config).unwrap();
    PlainResolver::new(client, format!("{}/d", server.uri()))
}

#[tokio::test]
async fn test_plain_resolve() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .and(query_param("dn", "www.163.com"))
        .and(query_param("ip", "1.2.3.4"))
        .and(query_param("ttl", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1.2.3.4;5.6.7.8,300"))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = plain_resolver(&server, &HttpClientConfig::default());
    let answer = resolver.resolve("www.163.com", "1.2.3.4").await.unwrap();

    assert_eq!(answer.server_ip_list, vec!["1.2.3.4", "5.6.7.8"]);
    assert_eq!(answer.ttl, 300);
}

#[tokio::test]
async fn test_non_200_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(ResponseTemplate::new(500).set_body_string("1.2.3.4,300"))
        .mount(&server)
        .await;

    let resolver = plain_resolver(&server, &HttpClientConfig::default());
    assert_matches!(
        resolver.resolve("www.163.com", "1.2.3.4").await,
        Err(UpstreamError::Status(status)) if status.as_u16() == 500
    );

    // 其他 2xx 同样视为失败
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    assert_matches!(
        resolver.resolve("www.163.com", "1.2.3.4").await,
        Err(UpstreamError::Status(_))
    );
}

#[tokio::test]
async fn test_empty_and_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .and(query_param("dn", "empty.com"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .and(query_param("dn", "bad.com"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1.2.3.4"))
        .mount(&server)
        .await;

    let resolver = plain_resolver(&server, &HttpClientConfig::default());
    assert_matches!(
        resolver.resolve("empty.com", "1.2.3.4").await,
        Err(UpstreamError::EmptyBody)
    );
    assert_matches!(
        resolver.resolve("bad.com", "1.2.3.4").await,
        Err(UpstreamError::Malformed(_))
    );
}

#[tokio::test]
async fn test_non_utf8_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(b"1.2.3.\xff;5.6.7.8,300".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    // 非 UTF-8 响应体整体拒绝，不做有损替换
    let resolver = plain_resolver(&server, &HttpClientConfig::default());
    assert_matches!(
        resolver.resolve("www.163.com", "1.2.3.4").await,
        Err(UpstreamError::Malformed(_))
    );
}

#[tokio::test]
async fn test_default_request_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .and(header("accept", "text/plain"))
        .and(header(
            "user-agent",
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("1.2.3.4,60"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .and(header("user-agent", "custom-agent/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("5.6.7.8,60"))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = plain_resolver(&server, &HttpClientConfig::default());
    let answer = resolver.resolve("www.163.com", "1.2.3.4").await.unwrap();
    assert_eq!(answer.server_ip_list, vec!["1.2.3.4"]);

    // 配置的 agent 覆盖默认值
    let config = HttpClientConfig {
        agent: Some("custom-agent/1.0".to_string()),
        ..Default::default()
    };
    let resolver = plain_resolver(&server, &config);
    let answer = resolver.resolve("www.163.com", "1.2.3.4").await.unwrap();
    assert_eq!(answer.server_ip_list, vec!["5.6.7.8"]);
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("1.2.3.4,300")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = HttpClientConfig {
        request_timeout: 1,
        ..Default::default()
    };
    let resolver = plain_resolver(&server, &config);
    assert_matches!(
        resolver.resolve("www.163.com", "1.2.3.4").await,
        Err(UpstreamError::Request(_))
    );
}

#[tokio::test]
async fn test_retry_on_transient_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(ResponseTemplate::new(200).set_body_string("9.9.9.9,60"))
        .mount(&server)
        .await;

    let upstream = UpstreamConfig {
        retry: Some(RetryConfig {
            attempts: 2,
            delay: 1,
        }),
        ..Default::default()
    };
    let client = HttpClient::create(&upstream, &HttpClientConfig::default()).unwrap();
    let resolver = PlainResolver::new(client, format!("{}/d", server.uri()));

    let answer = resolver.resolve("www.163.com", "1.2.3.4").await.unwrap();
    assert_eq!(answer.server_ip_list, vec!["9.9.9.9"]);
    assert_eq!(answer.ttl, 60);
}

#[tokio::test]
async fn test_enterprise_resolve() {
    let cipher = DesCipher::new(SECRET).unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .and(query_param("dn", cipher.encrypt_hex("www.163.com").unwrap()))
        .and(query_param("ip", "1.2.3.4"))
        .and(query_param("ttl", "1"))
        .and(query_param("id", "1234"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(cipher.encrypt_hex("10.0.0.1;10.0.0.2,60").unwrap()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client =
        HttpClient::create(&UpstreamConfig::default(), &HttpClientConfig::default()).unwrap();
    let resolver =
        EnterpriseResolver::new(client, format!("{}/d", server.uri()), "1234", SECRET).unwrap();

    let answer = resolver.resolve("www.163.com", "1.2.3.4").await.unwrap();
    assert_eq!(answer.server_ip_list, vec!["10.0.0.1", "10.0.0.2"]);
    assert_eq!(answer.ttl, 60);
}

#[tokio::test]
async fn test_enterprise_rejects_plain_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1.2.3.4,60"))
        .mount(&server)
        .await;

    let client =
        HttpClient::create(&UpstreamConfig::default(), &HttpClientConfig::default()).unwrap();
    let resolver =
        EnterpriseResolver::new(client, format!("{}/d", server.uri()), "1234", SECRET).unwrap();

    assert_matches!(
        resolver.resolve("www.163.com", "1.2.3.4").await,
        Err(UpstreamError::Cipher(_))
    );
}

#[test]
fn test_create_resolver_mode() {
    let http_config = HttpClientConfig::default();

    let plain = create_resolver(&UpstreamConfig::default(), &http_config).unwrap();
    assert_eq!(plain.mode().label(), "plain");

    let enterprise = UpstreamConfig {
        enterprise: Some(EnterpriseConfig {
            id: "1234".to_string(),
            secret: SECRET.to_string(),
        }),
        ..Default::default()
    };
    let resolver = create_resolver(&enterprise, &http_config).unwrap();
    assert_eq!(resolver.mode().label(), "enterprise");

    let bad_secret = UpstreamConfig {
        enterprise: Some(EnterpriseConfig {
            id: "1234".to_string(),
            secret: "short".to_string(),
        }),
        ..Default::default()
    };
    assert!(create_resolver(&bad_secret, &http_config).is_err());
}
