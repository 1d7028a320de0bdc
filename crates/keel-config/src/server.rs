use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind; defaults to 0.0.0.0:3000 when unset
    pub listen_address: Option<SocketAddr>,
    /// Headers applied to every response before the handler runs,
    /// e.g. legacy compatibility headers
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_headers_parse() {
        let config: ServerConfig = toml::from_str(
            r#"
            listen_address = "127.0.0.1:8080"

            [default_headers]
            "X-UA-Compatible" = "chrome=1"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.default_headers.get("X-UA-Compatible").map(String::as_str),
            Some("chrome=1")
        );
        assert_eq!(config.listen_address.unwrap().port(), 8080);
    }
}
