//! Outbound transport instructions.
//!
//! Every supported protocol sends its authentication request to the identity
//! provider in one of two shapes: a browser redirect, or an HTML form the
//! browser posts automatically. The caller layer issues the instruction.

use serde::Serialize;

/// How the caller must deliver a request to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundInstruction {
    /// Redirect the browser to `url`.
    Redirect {
        /// Target URL including the encoded request.
        url: String,
    },
    /// Render a form that posts `fields` to `url`.
    AutoPostForm {
        /// Form action.
        url: String,
        /// Hidden fields, in order.
        fields: Vec<(String, String)>,
    },
}

impl OutboundInstruction {
    /// Returns the destination URL.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Redirect { url } | Self::AutoPostForm { url, .. } => url,
        }
    }

    /// Returns a hidden form field value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Self::Redirect { .. } => None,
            Self::AutoPostForm { fields, .. } => fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
        }
    }

    /// Returns a query parameter of the redirect URL.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        match self {
            Self::AutoPostForm { .. } => None,
            Self::Redirect { url } => url::Url::parse(url).ok().and_then(|u| {
                u.query_pairs()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.into_owned())
            }),
        }
    }

    /// Renders an auto-submitting HTML page for [`Self::AutoPostForm`].
    ///
    /// Returns `None` for redirects.
    #[must_use]
    pub fn to_html(&self) -> Option<String> {
        let Self::AutoPostForm { url, fields } = self else {
            return None;
        };

        let inputs: String = fields
            .iter()
            .map(|(name, value)| {
                format!(
                    r#"        <input type="hidden" name="{}" value="{}"/>
"#,
                    html_escape(name),
                    html_escape(value)
                )
            })
            .collect();

        Some(format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Signing in</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
{}        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            html_escape(url),
            inputs
        ))
    }
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
