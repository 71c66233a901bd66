use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

// ============================================================================
// Identity collaborator
// ============================================================================
//
// Token issuance and verification are owned by an external identity service.
// The pipeline only needs `verify(credential) -> principal`; the static
// verifier below maps configured bearer tokens to principals so the API can
// run without that service.
//
// ============================================================================

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingCredential,

    #[error("Invalid token")]
    InvalidCredential,

    #[error("Invalid token configuration: {0}")]
    Misconfigured(String),
}

pub trait TokenVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<Principal, AuthError>;

    fn issue(&self, principal: &Principal) -> Result<AuthTokens, AuthError>;
}

#[derive(Default)]
pub struct StaticTokenVerifier {
    tokens: RwLock<HashMap<String, Principal>>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `token=user-uuid:email` pairs separated by commas.
    pub fn from_pairs(pairs: &str) -> Result<Self, AuthError> {
        let mut tokens = HashMap::new();

        for entry in pairs.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, identity) = entry
                .split_once('=')
                .ok_or_else(|| AuthError::Misconfigured(format!("missing '=' in '{entry}'")))?;
            let (user_id, email) = identity
                .split_once(':')
                .ok_or_else(|| AuthError::Misconfigured(format!("missing ':' in '{entry}'")))?;
            let user_id = Uuid::parse_str(user_id.trim())
                .map_err(|e| AuthError::Misconfigured(format!("bad user id in '{entry}': {e}")))?;

            tokens.insert(
                token.trim().to_string(),
                Principal {
                    user_id,
                    email: email.trim().to_string(),
                },
            );
        }

        Ok(Self {
            tokens: RwLock::new(tokens),
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, credential: &str) -> Result<Principal, AuthError> {
        if credential.is_empty() {
            return Err(AuthError::MissingCredential);
        }
        let tokens = self.tokens.read().map_err(|_| AuthError::InvalidCredential)?;
        tokens.get(credential).cloned().ok_or(AuthError::InvalidCredential)
    }

    fn issue(&self, principal: &Principal) -> Result<AuthTokens, AuthError> {
        let access_token = Uuid::new_v4().simple().to_string();
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| AuthError::Misconfigured("token table poisoned".into()))?;
        tokens.insert(access_token.clone(), principal.clone());

        Ok(AuthTokens {
            access_token,
            token_type: "Bearer",
        })
    }
}

/// Pull the credential out of an `Authorization: Bearer <token>` header value.
pub fn bearer_credential(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredential)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingCredential)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "7f0c1e9a-4a0e-4f57-9b8e-0a60a6f1e2d1";

    #[test]
    fn test_parse_token_pairs() {
        let verifier = StaticTokenVerifier::from_pairs(&format!(
            "alice-token={USER}:alice@example.com, bob-token=0b9c4c59-3b9e-4c44-a0d8-2f6c2b1d6b11:bob@example.com"
        ))
        .unwrap();

        assert_eq!(verifier.len(), 2);
        let alice = verifier.verify("alice-token").unwrap();
        assert_eq!(alice.user_id.to_string(), USER);
        assert_eq!(alice.email, "alice@example.com");
    }

    #[test]
    fn test_empty_pairs_are_valid() {
        assert!(StaticTokenVerifier::from_pairs("").unwrap().is_empty());
    }

    #[test]
    fn test_bad_pairs_are_rejected() {
        assert!(matches!(
            StaticTokenVerifier::from_pairs("token-without-identity"),
            Err(AuthError::Misconfigured(_))
        ));
        assert!(StaticTokenVerifier::from_pairs("t=not-a-uuid:x@example.com").is_err());
    }

    #[test]
    fn test_unknown_token() {
        let verifier = StaticTokenVerifier::new();
        assert_eq!(verifier.verify("nope"), Err(AuthError::InvalidCredential));
        assert_eq!(verifier.verify(""), Err(AuthError::MissingCredential));
    }

    #[test]
    fn test_issued_token_verifies() {
        let verifier = StaticTokenVerifier::new();
        let principal = Principal {
            user_id: Uuid::new_v4(),
            email: "carol@example.com".into(),
        };

        let tokens = verifier.issue(&principal).unwrap();
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(verifier.verify(&tokens.access_token).unwrap(), principal);
    }

    #[test]
    fn test_bearer_header_parsing() {
        assert_eq!(bearer_credential(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_credential(Some("Basic abc")), Err(AuthError::MissingCredential));
        assert_eq!(bearer_credential(Some("Bearer ")), Err(AuthError::MissingCredential));
        assert_eq!(bearer_credential(None), Err(AuthError::MissingCredential));
    }
}
