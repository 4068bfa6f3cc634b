use url::Url;
use crate::error::SupervisorResult;

/// Device type sent when the caller does not name one.
pub const DEFAULT_DEVICE_TYPE: &str = "im_app_android";

const TOKEN_PARAM: &str = "token";
const DEVICE_TYPE_PARAM: &str = "deviceType";

/// The connection target remembered for reconnection: base URL, auth token and device type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    token: String,
    device_type: String,
}

impl Endpoint {
    /// An empty or absent `device_type` falls back to [`DEFAULT_DEVICE_TYPE`].
    pub fn new(url: &str, token: &str, device_type: Option<&str>) -> Self {
        let device_type = match device_type {
            Some(device_type) if !device_type.is_empty() => device_type,
            _ => DEFAULT_DEVICE_TYPE,
        };
        Endpoint {
            url: url.to_string(),
            token: token.to_string(),
            device_type: device_type.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    /// Builds the URL to dial: the base URL with the `token` and `deviceType` query
    /// parameters set. Existing values of those two parameters are replaced, every other
    /// parameter is kept in order.
    pub fn dial_target(&self) -> SupervisorResult<Url> {
        let mut target = Url::parse(&self.url)?;

        let retained: Vec<(String, String)> = target
            .query_pairs()
            .filter(|(key, _)| key != TOKEN_PARAM && key != DEVICE_TYPE_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        {
            let mut pairs = target.query_pairs_mut();
            pairs.clear();
            pairs.extend_pairs(retained);
            pairs.append_pair(TOKEN_PARAM, &self.token);
            pairs.append_pair(DEVICE_TYPE_PARAM, &self.device_type);
        }

        Ok(target)
    }

    /// Handshake headers carrying the same credentials as the query parameters.
    pub fn auth_headers(&self) -> Vec<(String, String)> {
        vec![
            (TOKEN_PARAM.to_string(), self.token.clone()),
            (DEVICE_TYPE_PARAM.to_string(), self.device_type.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SupervisorError;

    #[test]
    fn test_dial_target_appends_params() {
        let endpoint = Endpoint::new("ws://h/ws", "tok", Some("dev"));
        let target = endpoint.dial_target().unwrap();
        assert_eq!(target.as_str(), "ws://h/ws?token=tok&deviceType=dev");
    }

    #[test]
    fn test_default_device_type() {
        assert_eq!(Endpoint::new("ws://h/ws", "tok", None).device_type(), DEFAULT_DEVICE_TYPE);
        assert_eq!(Endpoint::new("ws://h/ws", "tok", Some("")).device_type(), DEFAULT_DEVICE_TYPE);
    }

    #[test]
    fn test_dial_target_overwrites_existing_params() {
        let endpoint = Endpoint::new("ws://h/ws?token=old&room=7&deviceType=web", "new", Some("dev"));
        let target = endpoint.dial_target().unwrap();

        let pairs: Vec<(String, String)> = target.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("room".to_string(), "7".to_string()),
                ("token".to_string(), "new".to_string()),
                ("deviceType".to_string(), "dev".to_string()),
            ]
        );
    }

    #[test]
    fn test_dial_target_encodes_token() {
        let endpoint = Endpoint::new("wss://example.com/ws", "a b&c", None);
        let target = endpoint.dial_target().unwrap();
        let token = target.query_pairs().find(|(k, _)| k == "token").map(|(_, v)| v.into_owned());
        assert_eq!(token.as_deref(), Some("a b&c"));
    }

    #[test]
    fn test_malformed_url_rejected() {
        let endpoint = Endpoint::new("::not a url::", "tok", None);
        assert!(matches!(endpoint.dial_target(), Err(SupervisorError::InvalidUri(_))));
    }

    #[test]
    fn test_auth_headers() {
        let endpoint = Endpoint::new("ws://h/ws", "tok", Some("dev"));
        assert_eq!(
            endpoint.auth_headers(),
            vec![
                ("token".to_string(), "tok".to_string()),
                ("deviceType".to_string(), "dev".to_string()),
            ]
        );
    }
}
