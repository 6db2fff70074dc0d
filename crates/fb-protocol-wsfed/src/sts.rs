//! Security token service client.
//!
//! Tokens received through the passive profile can be checked by the issuing
//! token service with a WS-Trust 1.3 `Validate` request over SOAP 1.2.
//!
//! ## NIST 800-53 Rev5: SC-8 (Transmission Confidentiality and Integrity)
//!
//! The client only speaks to the configured endpoint; TLS is provided by
//! `reqwest` with rustls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fb_protocol_saml::xml::XmlElement;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::trace::{observe, Direction, NoopTraceHook, TraceHook};

const NS_SOAP12: &str = "http://www.w3.org/2003/05/soap-envelope";
const NS_ADDRESSING: &str = "http://www.w3.org/2005/08/addressing";
const NS_TRUST13: &str = "http://docs.oasis-open.org/ws-sx/ws-trust/200512";
const ACTION_VALIDATE: &str = "http://docs.oasis-open.org/ws-sx/ws-trust/200512/RST/Validate";
const REQUEST_TYPE_VALIDATE: &str = "http://docs.oasis-open.org/ws-sx/ws-trust/200512/Validate";
const TOKEN_TYPE_STATUS: &str = "http://docs.oasis-open.org/ws-sx/ws-trust/200512/RSTR/Status";

/// Status code of a valid token.
pub const STATUS_VALID: &str = "http://docs.oasis-open.org/ws-sx/ws-trust/200512/status/valid";

/// Failure to obtain an answer from the token service.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The deadline passed before an answer arrived.
    #[error("token service call timed out")]
    Timeout,

    /// The connection could not be established.
    #[error("token service unreachable: {0}")]
    Connection(String),

    /// The service answered with an HTTP error and no SOAP fault.
    #[error("token service returned HTTP {0}")]
    Http(u16),

    /// The service answered with a SOAP fault.
    #[error("token service fault: {0}")]
    Fault(String),

    /// The answer could not be understood.
    #[error("invalid token service response: {0}")]
    InvalidResponse(String),
}

/// The token service's verdict on a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenValidation {
    /// `Status/Code`.
    pub code: String,
    /// `Status/Reason`, if any.
    pub reason: Option<String>,
}

impl TokenValidation {
    /// Returns whether the service declared the token valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.code == STATUS_VALID
    }
}

/// Validates issued tokens with their issuer.
#[async_trait]
pub trait SecurityTokenService: Send + Sync {
    /// Asks the service whether `token_xml` is valid.
    ///
    /// The call gives up at `deadline` with [`TransportError::Timeout`].
    async fn validate(
        &self,
        token_xml: &str,
        deadline: Option<Instant>,
    ) -> Result<TokenValidation, TransportError>;
}

/// WS-Trust 1.3 client over HTTP.
pub struct HttpSecurityTokenService {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    trace: Arc<dyn TraceHook>,
}

impl HttpSecurityTokenService {
    /// Creates a client for `endpoint`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
            trace: Arc::new(NoopTraceHook),
        })
    }

    /// Attaches a trace hook.
    #[must_use]
    pub fn with_trace_hook(mut self, trace: Arc<dyn TraceHook>) -> Self {
        self.trace = trace;
        self
    }

    /// Builds the SOAP envelope of a `Validate` request.
    #[must_use]
    pub fn validate_envelope(&self, token_xml: &str) -> String {
        let message_id = uuid::Uuid::new_v4();
        let to = fb_protocol_saml::xml::escape(&self.endpoint);
        format!(
            r#"<s:Envelope xmlns:s="{NS_SOAP12}" xmlns:a="{NS_ADDRESSING}"><s:Header><a:Action s:mustUnderstand="1">{ACTION_VALIDATE}</a:Action><a:MessageID>urn:uuid:{message_id}</a:MessageID><a:To s:mustUnderstand="1">{to}</a:To></s:Header><s:Body><trust:RequestSecurityToken xmlns:trust="{NS_TRUST13}"><trust:TokenType>{TOKEN_TYPE_STATUS}</trust:TokenType><trust:RequestType>{REQUEST_TYPE_VALIDATE}</trust:RequestType><trust:ValidateTarget>{token_xml}</trust:ValidateTarget></trust:RequestSecurityToken></s:Body></s:Envelope>"#
        )
    }

    async fn post(&self, envelope: &str) -> Result<(u16, String), reqwest::Error> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!(r#"application/soap+xml; charset=utf-8; action="{ACTION_VALIDATE}""#),
            )
            .body(envelope.to_string())
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn call(&self, envelope: &str) -> Result<TokenValidation, TransportError> {
        let mut attempt = 0;
        let (status, body) = loop {
            attempt += 1;
            match self.post(envelope).await {
                Ok(answer) => break answer,
                Err(e) if e.is_connect() && attempt < 2 => {
                    warn!(endpoint = %self.endpoint, error = %e, "token service unreachable, retrying");
                }
                Err(e) if e.is_timeout() => return Err(TransportError::Timeout),
                Err(e) => return Err(TransportError::Connection(e.to_string())),
            }
        };

        let parsed = parse_validate_response(&body);
        let fault = matches!(parsed, Err(TransportError::Fault(_))) || !(200..300).contains(&status);
        observe(self.trace.as_ref(), Direction::Inbound, &body, fault);

        match parsed {
            Ok(validation) if (200..300).contains(&status) => Ok(validation),
            Ok(_) | Err(TransportError::InvalidResponse(_)) if !(200..300).contains(&status) => {
                Err(TransportError::Http(status))
            }
            other => other,
        }
    }
}

#[async_trait]
impl SecurityTokenService for HttpSecurityTokenService {
    async fn validate(
        &self,
        token_xml: &str,
        deadline: Option<Instant>,
    ) -> Result<TokenValidation, TransportError> {
        let envelope = self.validate_envelope(token_xml);
        observe(self.trace.as_ref(), Direction::Outbound, &envelope, false);

        let own_deadline = Instant::now() + self.timeout;
        let deadline = deadline.map_or(own_deadline, |d| d.min(own_deadline));

        let result =
            tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), self.call(&envelope))
                .await
                .unwrap_or(Err(TransportError::Timeout));

        match &result {
            Ok(validation) => debug!(code = %validation.code, "token service answered"),
            Err(e) => error!(endpoint = %self.endpoint, error = %e, "token service call failed"),
        }
        result
    }
}

/// Reads `Status/Code` from a `Validate` response, or the fault reason.
fn parse_validate_response(body: &str) -> Result<TokenValidation, TransportError> {
    let envelope =
        XmlElement::parse(body).map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
    let soap_body = envelope
        .child("Body")
        .ok_or_else(|| TransportError::InvalidResponse("no SOAP Body".into()))?;

    if let Some(fault) = soap_body.child("Fault") {
        let reason = fault
            .find("Text")
            .or_else(|| fault.child("faultstring"))
            .and_then(XmlElement::non_empty_text)
            .unwrap_or("unspecified fault");
        return Err(TransportError::Fault(reason.to_string()));
    }

    let status = soap_body
        .find("Status")
        .ok_or_else(|| TransportError::InvalidResponse("no Status in response".into()))?;
    let code = status
        .child("Code")
        .and_then(XmlElement::non_empty_text)
        .ok_or_else(|| TransportError::InvalidResponse("no Status/Code".into()))?;

    Ok(TokenValidation {
        code: code.to_string(),
        reason: status
            .child("Reason")
            .and_then(XmlElement::non_empty_text)
            .map(String::from),
    })
}
