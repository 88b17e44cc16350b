//! Signed owner identity carried in a cookie.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies owner identity tokens.
///
/// A token has the form `<user_id>.<hex hmac-sha256(user_id)>`. Without the
/// server-side secret a client can neither forge a token nor claim another
/// owner's identifier.
pub struct IdentityService {
    secret: Vec<u8>,
}

impl IdentityService {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Creates a service keyed by a random per-process secret.
    ///
    /// Tokens issued before a restart stop verifying.
    pub fn ephemeral() -> Self {
        let secret: [u8; 32] = rand::random();
        Self::new(secret)
    }

    fn mac(&self, user_id: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(user_id.as_bytes());
        mac
    }

    /// Generates a fresh owner identifier and its token.
    ///
    /// Returns `(user_id, token)`.
    pub fn issue(&self) -> (String, String) {
        let raw: [u8; 16] = rand::random();
        let user_id = hex::encode(raw);
        let token = self.sign(&user_id);
        (user_id, token)
    }

    /// Produces the token for an existing identifier.
    pub fn sign(&self, user_id: &str) -> String {
        let signature = hex::encode(self.mac(user_id).finalize().into_bytes());
        format!("{user_id}.{signature}")
    }

    /// Returns the identifier carried by `token` if its signature is valid.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (user_id, signature) = token.rsplit_once('.')?;
        if user_id.is_empty() {
            return None;
        }

        let signature = hex::decode(signature).ok()?;
        self.mac(user_id).verify_slice(&signature).ok()?;

        Some(user_id.to_string())
    }
}
