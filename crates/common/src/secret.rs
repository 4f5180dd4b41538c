//! Secret wrappers for values that must never reach logs.
//!
//! Re-exports [`secrecy`] types. `SecretString` and `SecretBox<T>` print
//! as `[REDACTED]` under `Debug`, so structs holding signing keys, OAuth
//! client secrets or issued tokens can derive `Debug` safely. Inner values
//! are zeroized on drop and are only reachable through
//! [`ExposeSecret::expose_secret`].
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretBox};
//!
//! let signing_key = SecretBox::new(Box::new(vec![7u8; 64]));
//! assert!(format!("{signing_key:?}").contains("REDACTED"));
//! assert_eq!(signing_key.expose_secret().len(), 64);
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_binary_key_debug_is_redacted() {
        let key = SecretBox::new(Box::new(vec![0xAB_u8; 64]));
        let debug_str = format!("{key:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("171"));
    }

    #[test]
    fn test_client_secret_deserializes_and_stays_hidden() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct ClientCredentials {
            client_id: String,
            client_secret: SecretString,
        }

        let json = r#"{"client_id": "web-client", "client_secret": "s3cr3t-value"}"#;
        let creds: ClientCredentials = serde_json::from_str(json).expect("deserialize");

        assert_eq!(creds.client_secret.expose_secret(), "s3cr3t-value");

        let debug = format!("{creds:?}");
        assert!(debug.contains("web-client"));
        assert!(!debug.contains("s3cr3t-value"));
    }
}
