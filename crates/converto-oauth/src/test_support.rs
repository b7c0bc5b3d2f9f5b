//! Shared fixtures for signing test ID tokens.

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};

pub const TEST_KID: &str = "test-key-1";
pub const TEST_AUDIENCE: &str = "test-client.apps.googleusercontent.com";

const TEST_RSA_PEM: &[u8] = include_bytes!("../tests/fixtures/id_token_rsa.pem");

/// Public half of `TEST_RSA_PEM`.
const TEST_RSA_N: &str = "kxeJp1JptcBE1f2zONy3F6C-bgdfMHHz75QCE1xeJ2zStX5c8id_axRVUBJcDqYB0BRqcDsA7i6XtF2-gqU8tc8f2aLtmWRPVZf8uK1GqYGWrYeSlKaiPjmt3ojjssGmKXbiw8IBBtdffaGamH-XfwnxOtxEkQGrHYe8TZx3jOa0WZRLCuJlJw-3SXAuZ6xYimf7_DQ04xDDMgNGRli2DCEqkhZbcEjh6_IEJBaGWoZl7AkMOzU9lqi9FTtBF5kTf5g_ousc9oWZINwWlDpEmEJcowUjkJwSldGGH1MrBjEPQjYt2yJPJ1JjdCRrCO0y3YqRz8crtxTA5qTjCcwlwQ";
const TEST_RSA_E: &str = "AQAB";

pub fn jwks_json(kid: &str) -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "kid": kid,
            "n": TEST_RSA_N,
            "e": TEST_RSA_E,
        }]
    })
}

pub fn test_key_set() -> JwkSet {
    serde_json::from_value(jwks_json(TEST_KID)).unwrap()
}

/// Sign a token with sensible Google-shaped defaults; `overrides` wins.
pub fn mint_id_token(overrides: Value) -> String {
    let now = chrono::Utc::now().timestamp();
    let mut claims = json!({
        "iss": "https://accounts.google.com",
        "aud": TEST_AUDIENCE,
        "sub": "1234567890",
        "iat": now,
        "exp": now + 3600,
    });
    if let (Some(base), Some(extra)) = (claims.as_object_mut(), overrides.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    let key = EncodingKey::from_rsa_pem(TEST_RSA_PEM).unwrap();
    encode(&header, &claims, &key).unwrap()
}
