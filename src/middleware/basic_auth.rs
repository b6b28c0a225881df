//! HTTP Basic authentication (RFC 7617).

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::Error;
use crate::handler::Handler;

/// Configuration for [`basic_auth`]. `username` and `password` are required.
#[derive(Clone, Debug)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
    /// Realm announced in `www-authenticate`. Default `Secure Area`.
    pub realm: String,
}

impl BasicAuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            realm: "Secure Area".to_owned(),
        }
    }
}

/// Lets requests through only with matching `Authorization: Basic`
/// credentials; everyone else gets `401` and a `www-authenticate` challenge.
///
/// Fails with [`Error::Config`] when username or password is empty.
pub fn basic_auth(config: BasicAuthConfig) -> Result<Handler, Error> {
    if config.username.is_empty() || config.password.is_empty() {
        return Err(Error::Config("basic auth requires a username and a password"));
    }
    let challenge = format!("Basic realm=\"{}\"", config.realm);
    let config = Arc::new((config, challenge));

    Ok(Handler::chained(move |ctx, next| {
        let config = Arc::clone(&config);
        Box::pin(async move {
            let (config, challenge) = &*config;
            let authorized = ctx.request()
                .header("authorization")
                .and_then(decode_credentials)
                .is_some_and(|(user, pass)| user == config.username && pass == config.password);

            if authorized {
                next.run(ctx).await;
            } else {
                let res = ctx.response();
                res.set_header("www-authenticate", challenge.as_str());
                res.status(401).text("Unauthorized");
            }
            Ok(())
        })
    }))
}

/// Splits `Basic <base64(user:pass)>` into its two parts.
fn decode_credentials(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_owned(), pass.to_owned()))
}
