//! WS-Federation exchanges checked by an external token service.

use std::time::{Duration, Instant};

use fb_broker::Outcome;
use fb_protocol::{protocol_id, RejectReason, TargetDescriptor};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{wsfed_response, TestEnv, REALM, REPLY, STS};

const STATUS_VALID: &str = "http://docs.oasis-open.org/ws-sx/ws-trust/200512/status/valid";
const STATUS_INVALID: &str = "http://docs.oasis-open.org/ws-sx/ws-trust/200512/status/invalid";

fn status_envelope(code: &str) -> String {
    format!(
        r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body><trust:RequestSecurityTokenResponseCollection xmlns:trust="http://docs.oasis-open.org/ws-sx/ws-trust/200512"><trust:RequestSecurityTokenResponse><trust:Status><trust:Code>{code}</trust:Code></trust:Status></trust:RequestSecurityTokenResponse></trust:RequestSecurityTokenResponseCollection></s:Body></s:Envelope>"#
    )
}

fn env_for(server: &MockServer) -> anyhow::Result<TestEnv> {
    let toml = format!(
        r#"
[ws_federation]
sts_url = "{STS}"
realm = "{REALM}"
reply_url = "{REPLY}"

[ws_federation.token_service]
endpoint = "{}/trust"
timeout_ms = 500

[trace]
enabled = true
"#,
        server.uri()
    );
    TestEnv::from_toml(&toml, true)
}

async fn run_exchange(env: &TestEnv, session: &str, deadline: Option<Instant>) -> anyhow::Result<Outcome> {
    let instruction = env
        .dispatcher
        .initiate(None, &TargetDescriptor::new(), session)
        .await?;
    let wctx = instruction
        .query_param("wctx")
        .ok_or_else(|| anyhow::anyhow!("no wctx"))?;

    let mut inbound = wsfed_response(&wctx, REPLY);
    if let Some(deadline) = deadline {
        inbound = inbound.with_deadline(deadline);
    }
    Ok(env
        .dispatcher
        .complete(protocol_id::WS_FEDERATION, session, &inbound)
        .await)
}

#[tokio::test]
async fn test_token_accepted_by_service() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trust"))
        .and(body_string_contains("saml:Assertion"))
        .respond_with(ResponseTemplate::new(200).set_body_string(status_envelope(STATUS_VALID)))
        .expect(1)
        .mount(&server)
        .await;
    let env = env_for(&server)?;

    let outcome = run_exchange(&env, "sts-ok", None).await?;

    let Outcome::Success { user_id, .. } = outcome else {
        anyhow::bail!("expected success, got {outcome:?}");
    };
    assert_eq!(user_id, "alice@example.com");
    Ok(())
}

#[tokio::test]
async fn test_token_refused_by_service() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trust"))
        .respond_with(ResponseTemplate::new(200).set_body_string(status_envelope(STATUS_INVALID)))
        .mount(&server)
        .await;
    let env = env_for(&server)?;

    let outcome = run_exchange(&env, "sts-refused", None).await?;

    assert_eq!(outcome, Outcome::failure(RejectReason::SignatureInvalid));
    Ok(())
}

#[tokio::test]
async fn test_slow_service_expires_the_exchange() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trust"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(status_envelope(STATUS_VALID))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let env = env_for(&server)?;

    let deadline = Instant::now() + Duration::from_millis(100);
    let outcome = run_exchange(&env, "sts-slow", Some(deadline)).await?;

    assert_eq!(outcome, Outcome::failure(RejectReason::Expired));
    assert_eq!(
        outcome.user_message(),
        "The sign-in attempt has expired. Please try again."
    );
    Ok(())
}

#[tokio::test]
async fn test_server_error_expires_the_exchange() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trust"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<s:Envelope/>"))
        .mount(&server)
        .await;
    let env = env_for(&server)?;

    let outcome = run_exchange(&env, "sts-500", None).await?;

    assert_eq!(outcome, Outcome::failure(RejectReason::Expired));
    Ok(())
}

#[tokio::test]
async fn test_soap_fault_rejects_the_token() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/trust"))
        .respond_with(ResponseTemplate::new(500).set_body_string(
            r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body><s:Fault><s:Code><s:Value>s:Sender</s:Value></s:Code><s:Reason><s:Text xml:lang="en">ID3082: bad token</s:Text></s:Reason></s:Fault></s:Body></s:Envelope>"#,
        ))
        .mount(&server)
        .await;
    let env = env_for(&server)?;

    let outcome = run_exchange(&env, "sts-fault", None).await?;

    assert_eq!(outcome, Outcome::failure(RejectReason::SignatureInvalid));
    Ok(())
}
