//! Request credentials
//!
//! Every Subsonic call carries its credential in the query string. Two modes
//! are supported:
//!
//! - `token`: `t = hex(md5(password + salt))` with a fresh 6-character
//!   alphanumeric salt `s`, protocol version 1.13.0
//! - `password`: `p = "enc:" + hex(password)`, protocol version 1.12.0
//!
//! MD5 here is a protocol requirement, not a security boundary.
//!
//! Credentials are never cached: callers build one per top-level operation
//! and share it across that operation's requests.

use core_runtime::config::SubsonicConfig;
use md5::{Digest, Md5};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;

/// Protocol version announced in token mode (Subsonic 5.3+)
pub const TOKEN_PROTOCOL_VERSION: &str = "1.13.0";

/// Protocol version announced in password mode
pub const PASSWORD_PROTOCOL_VERSION: &str = "1.12.0";

/// Response format requested from the server
pub const RESPONSE_FORMAT: &str = "json";

const SALT_LENGTH: usize = 6;

/// Authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Token,
    Password,
}

impl FromStr for AuthMode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "password" => Ok(Self::Password),
            _ => Err(AuthError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Token => f.write_str("token"),
            AuthMode::Password => f.write_str("password"),
        }
    }
}

/// Ordered authentication query parameters
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    mode: AuthMode,
    params: Vec<(&'static str, String)>,
}

impl Credential {
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Parameters in the order they are sent
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.params.iter().map(|(key, value)| (*key, value.as_str()))
    }

    /// Value of a single parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.params.iter().map(|(key, _)| *key).collect();
        f.debug_struct("Credential")
            .field("mode", &self.mode)
            .field("user", &self.get("u"))
            .field("params", &keys)
            .finish()
    }
}

/// Builds credentials from the configured account
#[derive(Clone)]
pub struct Authenticator {
    auth_mode: String,
    user: String,
    password: String,
    client_name: String,
}

impl Authenticator {
    pub fn new(
        auth_mode: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            auth_mode: auth_mode.into(),
            user: user.into(),
            password: password.into(),
            client_name: client_name.into(),
        }
    }

    pub fn from_config(config: &SubsonicConfig) -> Self {
        Self::new(
            config.auth.clone(),
            config.user.clone(),
            config.password.clone(),
            config.client_name.clone(),
        )
    }

    /// Build a fresh credential
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidMode`] when the configured mode is neither
    /// `token` nor `password`.
    pub fn credential(&self) -> Result<Credential, AuthError> {
        build_credential(&self.auth_mode, &self.user, &self.password, &self.client_name)
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("auth_mode", &self.auth_mode)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("client_name", &self.client_name)
            .finish()
    }
}

/// Build a credential for the given mode and account
pub fn build_credential(
    auth_mode: &str,
    user: &str,
    password: &str,
    client_name: &str,
) -> Result<Credential, AuthError> {
    let mode = auth_mode.parse::<AuthMode>()?;

    let params = match mode {
        AuthMode::Token => {
            let salt = generate_salt();
            let token = token_for(password, &salt);
            vec![
                ("u", user.to_string()),
                ("t", token),
                ("s", salt),
                ("v", TOKEN_PROTOCOL_VERSION.to_string()),
                ("c", client_name.to_string()),
                ("f", RESPONSE_FORMAT.to_string()),
            ]
        }
        AuthMode::Password => vec![
            ("u", user.to_string()),
            ("p", encode_password(password)),
            ("v", PASSWORD_PROTOCOL_VERSION.to_string()),
            ("c", client_name.to_string()),
            ("f", RESPONSE_FORMAT.to_string()),
        ],
    };

    Ok(Credential { mode, params })
}

fn generate_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}

/// `hex(md5(password + salt))`
pub fn token_for(password: &str, salt: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// `enc:` followed by the hex-encoded UTF-8 password
pub fn encode_password(password: &str) -> String {
    format!("enc:{}", hex::encode(password.as_bytes()))
}
