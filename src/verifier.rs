use serde::Deserialize;

const SUBSCRIBE_MODE: &str = "subscribe";

/// Query string of the platform's subscription handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,

    #[serde(rename = "hub.verify_token")]
    pub token: Option<String>,

    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    verify_token: String,
}
impl WebhookVerifier {
    pub fn new(verify_token: String) -> Self {
        Self { verify_token }
    }

    /// Returns the challenge to echo back, or `None` if the handshake is rejected.
    pub fn verify(&self, query: VerifyQuery) -> Option<String> {
        let accepted = query.mode.as_deref() == Some(SUBSCRIBE_MODE)
            && query.token.as_deref() == Some(self.verify_token.as_str());

        accepted.then(|| query.challenge.unwrap_or_default())
    }
}
