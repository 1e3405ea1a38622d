//! OAuth1 request signing (RFC 5849 §3.4.2, HMAC-SHA1). The three-legged login dance itself stays
//! an external collaborator completed out of band; this module only signs already-built requests.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

/// Pluggable signer so `RemoteClient` implementations never hard-code a signing method.
pub trait Signer: Send + Sync {
    /// Returns the full set of OAuth parameters (the caller's `params` plus the `oauth_*`
    /// parameters this call adds, including `oauth_signature`) to attach to the request.
    fn sign(&self, method: &str, url: &str, params: &[(String, String)]) -> Vec<(String, String)>;
}

#[derive(Debug, Clone)]
pub struct OAuth1Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub oauth_token: String,
    pub oauth_token_secret: String,
}

pub struct OAuth1Signer {
    credentials: OAuth1Credentials,
}

impl OAuth1Signer {
    pub fn new(credentials: OAuth1Credentials) -> Self {
        Self { credentials }
    }

    fn signing_key(&self) -> String {
        format!(
            "{}&{}",
            urlencoding::encode(&self.credentials.consumer_secret),
            urlencoding::encode(&self.credentials.oauth_token_secret)
        )
    }

    fn base_string(&self, method: &str, url: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<(String, String)> = params.to_vec();
        sorted.sort();
        let param_string = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!(
            "{}&{}&{}",
            method.to_uppercase(),
            urlencoding::encode(url),
            urlencoding::encode(&param_string)
        )
    }
}

impl Signer for OAuth1Signer {
    fn sign(&self, method: &str, url: &str, params: &[(String, String)]) -> Vec<(String, String)> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let nonce = format!("{:016x}", rand::random::<u64>());

        let mut all_params = params.to_vec();
        all_params.push(("oauth_consumer_key".to_string(), self.credentials.consumer_key.clone()));
        all_params.push(("oauth_token".to_string(), self.credentials.oauth_token.clone()));
        all_params.push(("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()));
        all_params.push(("oauth_timestamp".to_string(), timestamp.to_string()));
        all_params.push(("oauth_nonce".to_string(), nonce));
        all_params.push(("oauth_version".to_string(), "1.0".to_string()));

        let base = self.base_string(method, url, &all_params);

        let mut mac =
            HmacSha1::new_from_slice(self.signing_key().as_bytes()).expect("HMAC accepts any key length");
        mac.update(base.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        all_params.push(("oauth_signature".to_string(), signature));
        all_params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> OAuth1Signer {
        OAuth1Signer::new(OAuth1Credentials {
            consumer_key: "key".into(),
            consumer_secret: "secret".into(),
            oauth_token: "token".into(),
            oauth_token_secret: "token_secret".into(),
        })
    }

    #[test]
    fn sign_adds_oauth_parameters_and_signature() {
        let params = vec![("method".to_string(), "images".to_string())];
        let signed = signer().sign("GET", "https://example.com/api", &params);

        let keys: Vec<&str> = signed.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"oauth_signature"));
        assert!(keys.contains(&"oauth_nonce"));
        assert!(keys.contains(&"oauth_timestamp"));
        assert!(keys.contains(&"oauth_consumer_key"));
    }

    #[test]
    fn signature_is_deterministic_for_fixed_inputs() {
        // base_string/signing_key are pure; verify directly rather than through sign(), whose
        // nonce/timestamp vary per call.
        let s = signer();
        let base = s.base_string("GET", "https://example.com", &[("a".into(), "b".into())]);
        let base2 = s.base_string("GET", "https://example.com", &[("a".into(), "b".into())]);
        assert_eq!(base, base2);
    }
}
