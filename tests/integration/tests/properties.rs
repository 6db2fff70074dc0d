//! Properties that hold for every protocol.

use fb_broker::{BrokerConfig, Outcome};
use fb_core::{AttributeKey, DefaultAttribute, RawAttributes};
use fb_protocol::{
    protocol_id, InboundMessage, OutboundInstruction, ProtocolAdapter, RejectReason,
    TargetDescriptor,
};

use crate::common::{
    broker_toml, instant, openid_assertion, openid_assertion_with_nonce, openid_return_to,
    saml_request_id, saml_response, wsfed_response, TestEnv, ACS, REPLY,
};

/// Builds the identity provider's answer to an instruction.
fn answer(
    protocol: &str,
    instruction: &OutboundInstruction,
    receiving_url: Option<&str>,
) -> anyhow::Result<InboundMessage> {
    match protocol {
        protocol_id::SAML2 => Ok(saml_response(
            &saml_request_id(instruction)?,
            receiving_url.unwrap_or(ACS),
        )),
        protocol_id::OPENID => match receiving_url {
            Some(url) => openid_assertion(url),
            None => openid_assertion(&openid_return_to(instruction)?),
        },
        protocol_id::WS_FEDERATION => {
            let wctx = instruction
                .query_param("wctx")
                .ok_or_else(|| anyhow::anyhow!("no wctx"))?;
            Ok(wsfed_response(&wctx, receiving_url.unwrap_or(REPLY)))
        }
        other => anyhow::bail!("no fixture for {other}"),
    }
}

const PROTOCOLS: [&str; 3] = [
    protocol_id::SAML2,
    protocol_id::OPENID,
    protocol_id::WS_FEDERATION,
];

#[tokio::test]
async fn test_replayed_response_completes_once() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    for protocol in PROTOCOLS {
        let session = format!("replay-{protocol}");
        let instruction = env
            .dispatcher
            .initiate(Some(protocol), &TargetDescriptor::new(), &session)
            .await?;
        let inbound = answer(protocol, &instruction, None)?;

        let first = env.dispatcher.complete(protocol, &session, &inbound).await;
        assert!(first.is_success(), "{protocol}: {first:?}");

        let second = env.dispatcher.complete(protocol, &session, &inbound).await;
        assert_eq!(
            second,
            Outcome::failure(RejectReason::Unverified),
            "{protocol}"
        );

        // A new exchange in the same session.
        env.dispatcher
            .initiate(Some(protocol), &TargetDescriptor::new(), &session)
            .await?;
        assert_eq!(
            env.dispatcher.complete(protocol, &session, &inbound).await,
            Outcome::failure(RejectReason::Unverified),
            "{protocol}: same session"
        );

        // A new exchange in another session.
        let other = format!("attacker-{protocol}");
        env.dispatcher
            .initiate(Some(protocol), &TargetDescriptor::new(), &other)
            .await?;
        assert_eq!(
            env.dispatcher.complete(protocol, &other, &inbound).await,
            Outcome::failure(RejectReason::Unverified),
            "{protocol}: other session"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_openid_response_nonce_is_accepted_once() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let nonce = format!("{}reused", instant(0));

    let mut outcomes = Vec::new();
    for session in ["nonce-a", "nonce-b"] {
        let instruction = env
            .dispatcher
            .initiate(Some(protocol_id::OPENID), &TargetDescriptor::new(), session)
            .await?;
        let inbound = openid_assertion_with_nonce(&openid_return_to(&instruction)?, &nonce)?;
        outcomes.push(
            env.dispatcher
                .complete(protocol_id::OPENID, session, &inbound)
                .await,
        );
    }

    assert!(outcomes[0].is_success(), "{:?}", outcomes[0]);
    assert_eq!(outcomes[1], Outcome::failure(RejectReason::Unverified));
    Ok(())
}

#[tokio::test]
async fn test_wrong_recipient_is_rejected_despite_valid_signature() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let elsewhere = [
        (protocol_id::SAML2, "https://evil.example.com/saml/acs"),
        (protocol_id::OPENID, "https://evil.example.com/openid/return"),
        (protocol_id::WS_FEDERATION, "https://evil.example.com/wsfed"),
    ];

    for (protocol, url) in elsewhere {
        let session = format!("recipient-{protocol}");
        let instruction = env
            .dispatcher
            .initiate(Some(protocol), &TargetDescriptor::new(), &session)
            .await?;
        let inbound = answer(protocol, &instruction, Some(url))?;

        let outcome = env.dispatcher.complete(protocol, &session, &inbound).await;
        assert_eq!(
            outcome,
            Outcome::failure(RejectReason::RecipientMismatch),
            "{protocol}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_invalid_signature_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::with_rejecting_verifier()?;

    for protocol in [protocol_id::SAML2, protocol_id::WS_FEDERATION] {
        let session = format!("signature-{protocol}");
        let instruction = env
            .dispatcher
            .initiate(Some(protocol), &TargetDescriptor::new(), &session)
            .await?;
        let inbound = answer(protocol, &instruction, None)?;

        let outcome = env.dispatcher.complete(protocol, &session, &inbound).await;
        assert_eq!(
            outcome,
            Outcome::failure(RejectReason::SignatureInvalid),
            "{protocol}"
        );
        assert!(env.store.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_tampered_openid_assertion_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let instruction = env
        .dispatcher
        .initiate(Some(protocol_id::OPENID), &TargetDescriptor::new(), "tamper")
        .await?;

    let mut inbound = openid_assertion(&openid_return_to(&instruction)?)?;
    inbound
        .parameters
        .insert("openid.ax.value.last".into(), "Mallory".into());

    let outcome = env
        .dispatcher
        .complete(protocol_id::OPENID, "tamper", &inbound)
        .await;
    assert_eq!(outcome, Outcome::failure(RejectReason::SignatureInvalid));
    Ok(())
}

#[tokio::test]
async fn test_unmapped_attributes_pass_through() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let instruction = env
        .dispatcher
        .initiate(Some(protocol_id::WS_FEDERATION), &TargetDescriptor::new(), "attrs")
        .await?;
    let outcome = env
        .dispatcher
        .complete(
            protocol_id::WS_FEDERATION,
            "attrs",
            &answer(protocol_id::WS_FEDERATION, &instruction, None)?,
        )
        .await;

    let Outcome::Success { attributes, .. } = outcome else {
        anyhow::bail!("expected success, got {outcome:?}");
    };
    assert_eq!(attributes.len(), 2);
    assert_eq!(
        attributes
            .get_default(DefaultAttribute::LastName)
            .and_then(|v| v.first()),
        Some("Doe")
    );
    assert_eq!(
        attributes
            .get_raw("urn:corp/department")
            .and_then(|v| v.first()),
        Some("R&D")
    );
    Ok(())
}

#[tokio::test]
async fn test_mapping_never_drops_attributes() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let adapter = env
        .dispatcher
        .registry()
        .get(protocol_id::SAML2)
        .ok_or_else(|| anyhow::anyhow!("saml2 not registered"))?;

    let raw = RawAttributes::new()
        .with("urn:oid:2.5.4.4", vec!["Doe".into()])
        .with("urn:oid:2.5.4.42", vec!["Alice".into()])
        .with("urn:example:unknown", vec!["x".into(), "y".into()]);
    let distinct_in = raw.distinct_len();

    let map = adapter.map_attributes(raw);

    assert!(map.len() >= distinct_in);
    assert!(map
        .get(&AttributeKey::Default(DefaultAttribute::FirstName))
        .is_some());
    assert_eq!(
        map.get_raw("urn:example:unknown").map(|v| v.values().len()),
        Some(2)
    );
    Ok(())
}

#[tokio::test]
async fn test_uri_resolution_is_deterministic() -> anyhow::Result<()> {
    let a = BrokerConfig::from_toml_str(&broker_toml())?;
    let b = BrokerConfig::from_toml_str(&broker_toml())?;

    for attribute in DefaultAttribute::ALL {
        assert_eq!(
            a.attributes.resolve_uri(protocol_id::SAML2, attribute),
            b.attributes.resolve_uri(protocol_id::SAML2, attribute)
        );
    }

    let env = TestEnv::new()?;
    let adapter = env
        .dispatcher
        .registry()
        .get(protocol_id::SAML2)
        .ok_or_else(|| anyhow::anyhow!("saml2 not registered"))?;
    assert_eq!(
        adapter.find_attribute_uri(DefaultAttribute::LastName),
        adapter.find_attribute_uri(DefaultAttribute::LastName)
    );
    Ok(())
}
