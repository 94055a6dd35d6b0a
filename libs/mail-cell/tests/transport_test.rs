use assert_matches::assert_matches;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_json, header, method, path};

use mail_cell::*;
use shared_utils::test_utils::TestConfig;

fn message() -> MailMessage {
    MailMessage {
        from: "Agenda <noreply@agenda.test>".to_string(),
        to: "Diego <diego@example.com>".to_string(),
        subject: "Agendamento cancelado".to_string(),
        html: "<p>Olá</p>".to_string(),
    }
}

#[tokio::test]
async fn test_http_transport_posts_message_with_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/send"))
        .and(header("authorization", "Bearer mail-token"))
        .and(body_json(json!({
            "from": "Agenda <noreply@agenda.test>",
            "to": "Diego <diego@example.com>",
            "subject": "Agendamento cancelado",
            "html": "<p>Olá</p>"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = HttpMailTransport::new(&format!("{}/send", mock_server.uri()), Some("mail-token".to_string()));
    transport.send(&message()).await.expect("mail API should accept the message");
}

#[tokio::test]
async fn test_http_transport_reports_rejections() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("relay down"))
        .mount(&mock_server)
        .await;

    let transport = HttpMailTransport::new(&mock_server.uri(), None);

    assert_matches!(
        transport.send(&message()).await,
        Err(MailError::SendFailed(reason)) if reason.contains("relay down")
    );
}

#[tokio::test]
async fn test_http_transport_requires_url() {
    let config = TestConfig::default().to_app_config();

    assert_matches!(
        HttpMailTransport::from_config(&config),
        Err(MailError::InvalidConfiguration(_))
    );
}

#[tokio::test]
async fn test_log_transport_always_succeeds() {
    assert!(LogMailTransport.send(&message()).await.is_ok());
}
