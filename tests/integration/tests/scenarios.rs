//! Reference exchanges, one per documented scenario.

use fb_broker::Outcome;
use fb_core::DefaultAttribute;
use fb_protocol::{protocol_id, OutboundInstruction, RejectReason, TargetDescriptor};

use crate::common::{
    openid_assertion, openid_return_to, saml_request_id, saml_response, TestEnv, ACS, IDP_SSO,
    RETURN_TO,
};

/// SAML happy path: the surname arrives mapped to the generic attribute.
#[tokio::test]
async fn test_saml_exchange_succeeds_with_mapped_surname() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let target = TargetDescriptor::new().with_relay_state("/basket");

    let instruction = env
        .dispatcher
        .initiate(Some(protocol_id::SAML2), &target, "sess1")
        .await?;

    assert!(matches!(instruction, OutboundInstruction::AutoPostForm { .. }));
    assert_eq!(instruction.url(), IDP_SSO);
    let request_id = saml_request_id(&instruction)?;

    let outcome = env
        .dispatcher
        .complete(protocol_id::SAML2, "sess1", &saml_response(&request_id, ACS))
        .await;

    let Outcome::Success {
        user_id,
        attributes,
        relay_state,
    } = outcome
    else {
        anyhow::bail!("expected success, got {outcome:?}");
    };
    assert_eq!(user_id, "alice");
    assert_eq!(
        attributes
            .get_default(DefaultAttribute::LastName)
            .and_then(|v| v.first()),
        Some("Doe")
    );
    assert_eq!(relay_state.as_deref(), Some("/basket"));
    assert!(env.store.is_empty());

    Ok(())
}

/// OpenID response returned to another address than the one requested.
#[tokio::test]
async fn test_openid_return_to_mismatch() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let instruction = env
        .dispatcher
        .initiate(Some(protocol_id::OPENID), &TargetDescriptor::new(), "sess2")
        .await?;
    assert!(openid_return_to(&instruction)?.starts_with(RETURN_TO));

    let elsewhere = openid_assertion("https://rp.example.com/openid/other")?;
    let outcome = env
        .dispatcher
        .complete(protocol_id::OPENID, "sess2", &elsewhere)
        .await;

    assert_eq!(outcome, Outcome::failure(RejectReason::RecipientMismatch));
    Ok(())
}

/// A response for a session that never started an exchange.
#[tokio::test]
async fn test_completion_without_initiation() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let outcome = env
        .dispatcher
        .complete(protocol_id::SAML2, "sess3", &saml_response("_anything", ACS))
        .await;

    assert_eq!(outcome, Outcome::failure(RejectReason::Unverified));
    assert_eq!(
        outcome.user_message(),
        "Authentication failed. Please try again."
    );
    Ok(())
}

/// A second initiation replaces the first; the first response no longer
/// completes.
#[tokio::test]
async fn test_overwritten_exchange_rejects_first_response() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let target = TargetDescriptor::new();

    let first = env
        .dispatcher
        .initiate(Some(protocol_id::SAML2), &target, "sess1")
        .await?;
    let second = env
        .dispatcher
        .initiate(Some(protocol_id::SAML2), &target, "sess1")
        .await?;

    let first_id = saml_request_id(&first)?;
    assert_ne!(first_id, saml_request_id(&second)?);
    assert_eq!(env.store.len(), 1);

    let outcome = env
        .dispatcher
        .complete(protocol_id::SAML2, "sess1", &saml_response(&first_id, ACS))
        .await;

    assert_eq!(outcome, Outcome::failure(RejectReason::Unverified));
    Ok(())
}

/// The configured default protocol is used when the caller names none.
#[tokio::test]
async fn test_default_protocol_is_used() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let instruction = env
        .dispatcher
        .initiate(None, &TargetDescriptor::new(), "sess4")
        .await?;

    assert_eq!(instruction.url(), IDP_SSO);
    assert_eq!(
        env.dispatcher.registry().list_protocols(),
        vec![
            protocol_id::OPENID,
            protocol_id::SAML2,
            protocol_id::WS_FEDERATION
        ]
    );
    Ok(())
}

/// Exchanges for different protocols in one session do not interfere.
#[tokio::test]
async fn test_protocols_hold_separate_slots() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let saml = env
        .dispatcher
        .initiate(Some(protocol_id::SAML2), &TargetDescriptor::new(), "sess5")
        .await?;
    let openid = env
        .dispatcher
        .initiate(Some(protocol_id::OPENID), &TargetDescriptor::new(), "sess5")
        .await?;
    assert_eq!(env.store.len(), 2);

    let openid = env
        .dispatcher
        .complete(
            protocol_id::OPENID,
            "sess5",
            &openid_assertion(&openid_return_to(&openid)?)?,
        )
        .await;
    assert!(openid.is_success());

    let saml = env
        .dispatcher
        .complete(
            protocol_id::SAML2,
            "sess5",
            &saml_response(&saml_request_id(&saml)?, ACS),
        )
        .await;
    assert!(saml.is_success());
    Ok(())
}
