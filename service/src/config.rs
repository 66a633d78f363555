use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use messenger_auth::webhook::DEFAULT_SIGNATURE_HEADER;
use secrecy::SecretString;
use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default Graph API base URL used when `GRAPH_API_BASE_URL` is not set.
pub const DEFAULT_GRAPH_API_BASE_URL: &str = "https://graph.facebook.com/v2.6";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The application secret the platform signs webhook payloads with.
    #[arg(long, env, hide_env_values = true)]
    app_secret: Option<String>,

    /// The page access token appended to every Graph API call.
    #[arg(long, env, hide_env_values = true)]
    page_access_token: Option<String>,

    /// The token the platform echoes back when subscribing the webhook.
    #[arg(long, env, hide_env_values = true)]
    verify_token: Option<String>,

    /// The request header that carries the webhook signature.
    #[arg(long, env, default_value = DEFAULT_SIGNATURE_HEADER)]
    signature_header: String,

    /// The base URL of the Graph API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_GRAPH_API_BASE_URL)]
    graph_api_base_url: String,

    /// An HTTP/HTTPS forward proxy to route outbound Graph API calls through.
    #[arg(long, env)]
    proxy_url: Option<String>,

    /// Timeout in seconds for a single outbound Graph API call
    #[arg(long, env, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// The host interface to listen for incoming webhook connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming webhook connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Parses configuration from an explicit argument list instead of the process arguments.
    /// Environment variables still apply to any flag not present in `args`.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Config::try_parse_from(args)
    }

    /// Returns the webhook application secret, if configured.
    pub fn app_secret(&self) -> Option<SecretString> {
        self.app_secret.clone().map(SecretString::new)
    }

    pub fn set_app_secret(mut self, app_secret: String) -> Self {
        self.app_secret = Some(app_secret);
        self
    }

    /// Returns the page access token, if configured.
    pub fn page_access_token(&self) -> Option<SecretString> {
        self.page_access_token.clone().map(SecretString::new)
    }

    pub fn set_page_access_token(mut self, page_access_token: String) -> Self {
        self.page_access_token = Some(page_access_token);
        self
    }

    /// Returns the webhook subscription verify token, if configured.
    pub fn verify_token(&self) -> Option<String> {
        self.verify_token.clone()
    }

    pub fn set_verify_token(mut self, verify_token: String) -> Self {
        self.verify_token = Some(verify_token);
        self
    }

    pub fn signature_header(&self) -> &str {
        &self.signature_header
    }

    /// Returns the Graph API base URL without a trailing slash.
    pub fn graph_api_base_url(&self) -> &str {
        self.graph_api_base_url.trim_end_matches('/')
    }

    pub fn set_graph_api_base_url(mut self, graph_api_base_url: String) -> Self {
        self.graph_api_base_url = graph_api_base_url;
        self
    }

    pub fn proxy_url(&self) -> Option<String> {
        self.proxy_url.clone()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

// Secrets are never printed, only whether they are present.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[REDACTED]"))
            .field(
                "page_access_token",
                &self.page_access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "verify_token",
                &self.verify_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("signature_header", &self.signature_header)
            .field("graph_api_base_url", &self.graph_api_base_url)
            .field("proxy_url", &self.proxy_url.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("interface", &self.interface)
            .field("port", &self.port)
            .field("log_level_filter", &self.log_level_filter)
            .field("runtime_env", &self.runtime_env)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::env;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["messenger_platform_rs"];
        argv.extend_from_slice(args);
        Config::try_parse_args(argv).unwrap()
    }

    #[test]
    #[serial]
    fn test_defaults() {
        env::remove_var("GRAPH_API_BASE_URL");
        env::remove_var("SIGNATURE_HEADER");
        env::remove_var("REQUEST_TIMEOUT_SECS");

        let config = parse(&[]);

        assert_eq!(config.graph_api_base_url(), DEFAULT_GRAPH_API_BASE_URL);
        assert_eq!(config.signature_header(), DEFAULT_SIGNATURE_HEADER);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--app-secret",
            "abc123",
            "--page-access-token",
            "page_token",
            "--verify-token",
            "verify_me",
            "--graph-api-base-url",
            "http://127.0.0.1:1234/",
            "--proxy-url",
            "http://proxy.example.com:3128",
            "--port",
            "8080",
            "--log-level-filter",
            "DEBUG",
            "--runtime-env",
            "production",
        ]);

        assert_eq!(
            config.app_secret().unwrap().expose_secret().as_str(),
            "abc123"
        );
        assert_eq!(
            config.page_access_token().unwrap().expose_secret().as_str(),
            "page_token"
        );
        assert_eq!(config.verify_token(), Some("verify_me".to_string()));
        assert_eq!(config.graph_api_base_url(), "http://127.0.0.1:1234");
        assert_eq!(
            config.proxy_url(),
            Some("http://proxy.example.com:3128".to_string())
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level_filter, LevelFilter::Debug);
        assert!(config.is_production());
    }

    #[test]
    #[serial]
    fn test_env_fallback() {
        env::set_var("GRAPH_API_BASE_URL", "http://localhost:9999");
        let config = parse(&[]);
        env::remove_var("GRAPH_API_BASE_URL");

        assert_eq!(config.graph_api_base_url(), "http://localhost:9999");
    }

    #[test]
    #[serial]
    fn test_invalid_log_level_is_rejected() {
        let result =
            Config::try_parse_from(["messenger_platform_rs", "--log-level-filter", "LOUD"]);
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_debug_redacts_secrets() {
        let config = parse(&[])
            .set_app_secret("abc123".to_string())
            .set_page_access_token("page_token".to_string());

        let output = format!("{:?}", config);
        assert!(!output.contains("abc123"));
        assert!(!output.contains("page_token"));
        assert!(output.contains("[REDACTED]"));
    }

    #[test]
    fn test_rust_env_round_trip() {
        for runtime_env in [RustEnv::Development, RustEnv::Production, RustEnv::Staging] {
            assert_eq!(runtime_env.to_string().parse::<RustEnv>(), Ok(runtime_env));
        }
        assert_eq!("qa".parse::<RustEnv>(), Err(RustEnvParseError));
    }
}
