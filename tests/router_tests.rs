/// Router tests: the real axum app on an ephemeral port, LinkedIn and the
/// webhook mocked with wiremock, driven through reqwest
use linkedin_lead_sync::config::Config;
use linkedin_lead_sync::handlers::{self, AppState};
use reqwest::{header, Client, StatusCode};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use wiremock::matchers::{body_string_contains, header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestApp {
    addr: SocketAddr,
    client: Client,
}

impl TestApp {
    async fn spawn(config: Config) -> Self {
        let state = AppState::new(config).expect("state");
        let app = handlers::router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self { addr, client }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Runs /login and returns (state, state cookie pair).
    async fn start_login(&self) -> (String, String) {
        let resp = self.client.get(self.url("/login")).send().await.unwrap();
        assert!(resp.status().is_redirection());

        let location = resp.headers()[header::LOCATION].to_str().unwrap().to_string();
        let url = url::Url::parse(&location).unwrap();
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .expect("state param");

        (state, cookie_pair(&resp, "lead_sync_oauth_state").expect("state cookie"))
    }

    /// Full login against the mocked OAuth endpoints; returns the session cookie pair.
    async fn login(&self) -> String {
        let (state, state_cookie) = self.start_login().await;
        let resp = self
            .client
            .get(self.url(&format!("/login/authorized?code=auth-code&state={}", state)))
            .header(header::COOKIE, state_cookie)
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_redirection(), "callback status {}", resp.status());
        assert_eq!(resp.headers()[header::LOCATION], "/ads_accounts");
        cookie_pair(&resp, "lead_sync_session").expect("session cookie")
    }
}

/// `name=value` of the first non-empty Set-Cookie for `name`.
fn cookie_pair(resp: &reqwest::Response, name: &str) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", name)) && pair.len() > name.len() + 1)
        .map(str::to_string)
}

fn test_config(mock: &MockServer, webhook_url: Option<String>, export_path: Option<PathBuf>) -> Config {
    Config {
        port: 0,
        client_id: "client-123".to_string(),
        client_secret: "secret".to_string(),
        redirect_uri: "http://localhost:5000/login/authorized".to_string(),
        api_version: "202406".to_string(),
        webhook_url,
        cmt_account_id: None,
        secret_key: Some("router-test-secret".to_string()),
        api_base_url: mock.uri(),
        oauth_base_url: format!("{}/oauth/v2", mock.uri()),
        request_timeout_secs: 5,
        lead_lookback_days: 180,
        export_path: export_path.map(|p| p.to_string_lossy().into_owned()),
        session_ttl_secs: 600,
    }
}

fn lead(id: &str, question_id: u64, answer: &str) -> Value {
    json!({
        "id": id,
        "submittedAt": 0,
        "owner": { "sponsoredAccount": "urn:li:sponsoredAccount:507" },
        "ownerInfo": { "sponsoredAccountInfo": { "name": "Acme Ads" } },
        "leadMetadataInfo": {
            "sponsoredLeadMetadataInfo": {
                "campaign": { "id": "urn:li:sponsoredCampaign:88", "name": "Spring push" }
            }
        },
        "associatedEntityInfo": { "associatedCreative": { "id": "urn:li:sponsoredCreative:9" } },
        "versionedLeadGenFormUrn": "urn:li:versionedLeadGenForm:(urn:li:leadGenForm:42,1)",
        "formResponse": {
            "answers": [
                { "questionId": question_id, "answerDetails": { "textQuestionAnswer": { "answer": answer } } }
            ]
        }
    })
}

async fn mount_oauth(mock: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/v2/accessToken"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "expires_in": 5_184_000
        })))
        .mount(mock)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/me"))
        .and(header_matcher("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "member-1",
            "localizedFirstName": "Ada",
            "localizedLastName": "Lovelace"
        })))
        .mount(mock)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/emailAddress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "elements": [ { "handle~": { "emailAddress": "ada@example.com" } } ]
        })))
        .mount(mock)
        .await;
}

async fn mount_leads(mock: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/leadFormResponses"))
        .and(header_matcher("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "elements": [lead("r-1", 1, "Ada"), lead("r-2", 2, "ada@example.com")]
        })))
        .mount(mock)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/leadForms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "elements": [{
                "id": 42,
                "name": "Demo request",
                "content": { "questions": [
                    { "questionId": 1, "question": { "localized": { "en_US": "First name" } } },
                    { "questionId": 2, "question": { "localized": { "en_US": "Email" } } }
                ]}
            }]
        })))
        .mount(mock)
        .await;
}

fn temp_export_path() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lead-sync-router-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join("leads.csv")
}

#[tokio::test]
async fn test_health_and_index_are_public() {
    let mock = MockServer::start().await;
    let app = TestApp::spawn(test_config(&mock, None, None)).await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    let resp = app.client.get(app.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("href=\"/login\""));
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let mock = MockServer::start().await;
    let app = TestApp::spawn(test_config(&mock, None, None)).await;

    for path in ["/chat", "/ads_accounts", "/sync_leads?account_id=507"] {
        let resp = app.client.get(app.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", path);
    }

    // A forged cookie is not accepted
    let resp = app
        .client
        .get(app.url("/chat"))
        .header(header::COOKIE, "lead_sync_session=not-signed")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_redirects_to_authorization() {
    let mock = MockServer::start().await;
    let app = TestApp::spawn(test_config(&mock, None, None)).await;

    let resp = app.client.get(app.url("/login")).send().await.unwrap();
    assert!(resp.status().is_redirection());
    let location = resp.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with(&format!("{}/oauth/v2/authorization?", mock.uri())));
    assert!(location.contains("client_id=client-123"));
    assert!(location.contains("response_type=code"));
    assert!(cookie_pair(&resp, "lead_sync_oauth_state").is_some());
}

#[tokio::test]
async fn test_callback_error_is_400() {
    let mock = MockServer::start().await;
    let app = TestApp::spawn(test_config(&mock, None, None)).await;

    let resp = app
        .client
        .get(app.url("/login/authorized?error=user_cancelled_login"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.text().await.unwrap(),
        "Error received: user_cancelled_login"
    );
}

#[tokio::test]
async fn test_callback_rejects_state_mismatch() {
    let mock = MockServer::start().await;
    mount_oauth(&mock).await;
    let app = TestApp::spawn(test_config(&mock, None, None)).await;

    let (_, state_cookie) = app.start_login().await;
    let resp = app
        .client
        .get(app.url("/login/authorized?code=auth-code&state=forged"))
        .header(header::COOKIE, state_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .client
        .get(app.url("/login/authorized?state=forged"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_without_access_token_is_400() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/v2/accessToken"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "authorization code expired"
        })))
        .mount(&mock)
        .await;
    let app = TestApp::spawn(test_config(&mock, None, None)).await;

    let (state, state_cookie) = app.start_login().await;
    let resp = app
        .client
        .get(app.url(&format!("/login/authorized?code=stale&state={}", state)))
        .header(header::COOKIE, state_cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "Failed to obtain access token.");
}

#[tokio::test]
async fn test_login_then_chat_then_logout() {
    let mock = MockServer::start().await;
    mount_oauth(&mock).await;
    let app = TestApp::spawn(test_config(&mock, None, None)).await;

    let session = app.login().await;

    let resp = app
        .client
        .post(app.url("/chat"))
        .header(header::COOKIE, session.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.text().await.unwrap(),
        "Protected route, restricted to logged-in users only!"
    );

    let resp = app
        .client
        .get(app.url("/logout"))
        .header(header::COOKIE, session.clone())
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(resp.headers()[header::LOCATION], "/");

    let resp = app
        .client
        .get(app.url("/chat"))
        .header(header::COOKIE, session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ads_accounts_page() {
    let mock = MockServer::start().await;
    mount_oauth(&mock).await;
    Mock::given(method("GET"))
        .and(path("/rest/adAccounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "elements": [ { "id": 507, "name": "Acme <Ads>" } ]
        })))
        .mount(&mock)
        .await;
    let app = TestApp::spawn(test_config(&mock, None, None)).await;
    let session = app.login().await;

    let resp = app
        .client
        .get(app.url("/ads_accounts"))
        .header(header::COOKIE, session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Ada Lovelace"));
    assert!(html.contains("Acme &lt;Ads&gt;"));
    assert!(html.contains("value=\"507\""));
}

#[tokio::test]
async fn test_ads_accounts_upstream_failure_renders_empty() {
    let mock = MockServer::start().await;
    mount_oauth(&mock).await;
    Mock::given(method("GET"))
        .and(path("/rest/adAccounts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock)
        .await;
    let app = TestApp::spawn(test_config(&mock, None, None)).await;
    let session = app.login().await;

    let resp = app
        .client
        .get(app.url("/ads_accounts"))
        .header(header::COOKIE, session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("No active ad accounts found."));
}

#[tokio::test]
async fn test_sync_leads_renders_exports_and_posts() {
    let mock = MockServer::start().await;
    mount_oauth(&mock).await;
    mount_leads(&mock).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header_matcher("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock)
        .await;

    let export_path = temp_export_path();
    let app = TestApp::spawn(test_config(
        &mock,
        Some(format!("{}/hook", mock.uri())),
        Some(export_path.clone()),
    ))
    .await;
    let session = app.login().await;

    let resp = app
        .client
        .post(app.url("/sync_leads"))
        .header(header::COOKIE, session)
        .form(&[("account_id", "507")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let html = resp.text().await.unwrap();
    assert!(html.contains("<td>First name</td>"));
    assert!(html.contains("<td>ada@example.com</td>"));
    assert!(html.contains("<td>1970-01-01 00:00:00</td>"));
    assert!(html.contains("2 record(s)"));

    let csv = std::fs::read_to_string(&export_path).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.lines().next().unwrap().starts_with("question,answer,form name"));

    if let Some(dir) = export_path.parent() {
        std::fs::remove_dir_all(dir).ok();
    }
}

#[tokio::test]
async fn test_sync_leads_json_without_webhook() {
    let mock = MockServer::start().await;
    mount_oauth(&mock).await;
    mount_leads(&mock).await;
    // Nothing may be posted anywhere when WEBHOOK_URL is unset
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock)
        .await;

    let app = TestApp::spawn(test_config(&mock, None, None)).await;
    let session = app.login().await;

    let resp = app
        .client
        .get(app.url("/sync_leads?account_id=507"))
        .header(header::COOKIE, session)
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["account id"], "507");
    assert_eq!(data[0]["campaign id"], "88");
    assert_eq!(data[0]["creative id"], "9");
    assert_eq!(data[1]["question"], "Email");
}

#[tokio::test]
async fn test_sync_leads_webhook_failure_still_succeeds() {
    let mock = MockServer::start().await;
    mount_oauth(&mock).await;
    mount_leads(&mock).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(1)
        .mount(&mock)
        .await;

    let app = TestApp::spawn(test_config(&mock, Some(format!("{}/hook", mock.uri())), None)).await;
    let session = app.login().await;

    let resp = app
        .client
        .post(app.url("/sync_leads"))
        .header(header::COOKIE, session)
        .form(&[("account_id", "507")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_sync_leads_upstream_failure_is_500() {
    let mock = MockServer::start().await;
    mount_oauth(&mock).await;
    Mock::given(method("GET"))
        .and(path("/rest/leadFormResponses"))
        .respond_with(ResponseTemplate::new(403).set_body_string("{\"message\":\"Not enough permissions\"}"))
        .mount(&mock)
        .await;

    let app = TestApp::spawn(test_config(&mock, None, None)).await;
    let session = app.login().await;

    let resp = app
        .client
        .post(app.url("/sync_leads"))
        .header(header::COOKIE, session)
        .form(&[("account_id", "507")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Request error");
    assert_eq!(body["status"], 403);
    assert!(body["response_text"]
        .as_str()
        .unwrap()
        .contains("Not enough permissions"));
}

#[tokio::test]
async fn test_sync_leads_account_id_required() {
    let mock = MockServer::start().await;
    mount_oauth(&mock).await;
    let app = TestApp::spawn(test_config(&mock, None, None)).await;
    let session = app.login().await;

    let resp = app
        .client
        .post(app.url("/sync_leads"))
        .header(header::COOKIE, session)
        .form(&[("account_id", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Account ID not provided");
}

#[tokio::test]
async fn test_sync_leads_uses_configured_account() {
    let mock = MockServer::start().await;
    mount_oauth(&mock).await;
    mount_leads(&mock).await;

    let mut config = test_config(&mock, None, None);
    config.cmt_account_id = Some("507".to_string());
    let app = TestApp::spawn(config).await;
    let session = app.login().await;

    let resp = app
        .client
        .get(app.url("/sync_leads"))
        .header(header::COOKIE, session)
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}
