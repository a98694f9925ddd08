use std::{env, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use storefront_common::{
    helpers::{non_empty, parse_boolean_flag},
    Secret,
};
use storefront_engine::helpers::DEFAULT_HOLD_DURATION;

const DEFAULT_SFS_HOST: &str = "127.0.0.1";
const DEFAULT_SFS_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.db";
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 25;
const DEFAULT_EXPIRY_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);
const DEFAULT_CRM_BASE_URL: &str = "https://app.leadteh.ru/api/v1";

/// Server configuration. It is read from the environment once at startup and passed around explicitly from then on.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_db_connections: u32,
    /// How long a hold stays active before the expiry sweep reclaims it.
    pub hold_duration: Duration,
    /// How often the background expiry worker runs.
    pub expiry_sweep_interval: StdDuration,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    pub payment: PaymentConfig,
    pub admin: AdminConfig,
    pub crm: CrmConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SFS_HOST.to_string(),
            port: DEFAULT_SFS_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            hold_duration: DEFAULT_HOLD_DURATION,
            expiry_sweep_interval: DEFAULT_EXPIRY_SWEEP_INTERVAL,
            use_x_forwarded_for: false,
            use_forwarded: false,
            payment: PaymentConfig::default(),
            admin: AdminConfig::default(),
            crm: CrmConfig::default(),
        }
    }
}

/// Settings for the hosted payment form.
#[derive(Clone, Debug, Default)]
pub struct PaymentConfig {
    /// The payment form URL. Always ends with a `/`.
    pub form_url: String,
    /// The merchant's system identifier at the payment provider.
    pub sys: String,
    /// Shared secret for signing payment links and verifying webhooks.
    pub secret_key: Secret<String>,
}

impl PaymentConfig {
    pub fn is_configured(&self) -> bool {
        !self.form_url.is_empty() && !self.sys.is_empty() && self.secret_key.is_set()
    }
}

#[derive(Clone, Debug, Default)]
pub struct AdminConfig {
    pub user: String,
    pub pass: Secret<String>,
}

impl AdminConfig {
    pub fn is_configured(&self) -> bool {
        !self.user.is_empty() && self.pass.is_set()
    }
}

#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub base_url: String,
    pub api_token: Secret<String>,
    pub bot_id: String,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_CRM_BASE_URL.to_string(), api_token: Secret::default(), bot_id: String::default() }
    }
}

impl CrmConfig {
    pub fn is_configured(&self) -> bool {
        self.api_token.is_set() && !self.bot_id.is_empty()
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SFS_HOST").ok().unwrap_or_else(|| DEFAULT_SFS_HOST.into());
        let port = env::var("SFS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for SFS_PORT. {e} Using the default, {DEFAULT_SFS_PORT}.");
                    DEFAULT_SFS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SFS_PORT);
        let database_url = non_empty(env::var("SFS_DATABASE_URL").ok()).unwrap_or_else(|| {
            warn!("🪛️ SFS_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_db_connections =
            parse_number("SFS_MAX_DB_CONNECTIONS", env::var("SFS_MAX_DB_CONNECTIONS").ok(), DEFAULT_MAX_DB_CONNECTIONS);
        let hold_minutes = parse_number(
            "SFS_HOLD_DURATION",
            env::var("SFS_HOLD_DURATION").ok(),
            DEFAULT_HOLD_DURATION.num_minutes(),
        );
        let hold_duration = Duration::minutes(hold_minutes.max(1));
        let sweep_secs = parse_number(
            "SFS_EXPIRY_SWEEP_INTERVAL",
            env::var("SFS_EXPIRY_SWEEP_INTERVAL").ok(),
            DEFAULT_EXPIRY_SWEEP_INTERVAL.as_secs(),
        );
        let expiry_sweep_interval = StdDuration::from_secs(sweep_secs.max(1));
        let use_x_forwarded_for = parse_boolean_flag(env::var("SFS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SFS_USE_FORWARDED").ok(), false);
        let payment = PaymentConfig::from_env();
        let admin = AdminConfig::from_env();
        let crm = CrmConfig::from_env();
        Self {
            host,
            port,
            database_url,
            max_db_connections,
            hold_duration,
            expiry_sweep_interval,
            use_x_forwarded_for,
            use_forwarded,
            payment,
            admin,
            crm,
        }
    }
}

impl PaymentConfig {
    pub fn from_env() -> Self {
        let form_url = non_empty(env::var("SFS_PAYMENT_FORM_URL").ok()).map(normalize_form_url).unwrap_or_default();
        let sys = non_empty(env::var("SFS_PAYMENT_SYS").ok()).unwrap_or_default();
        let secret_key = Secret::new(non_empty(env::var("SFS_PAYMENT_SECRET_KEY").ok()).unwrap_or_default());
        let result = Self { form_url, sys, secret_key };
        if !result.is_configured() {
            error!(
                "🪛️ The payment provider is not fully configured. Set SFS_PAYMENT_FORM_URL, SFS_PAYMENT_SYS and \
                 SFS_PAYMENT_SECRET_KEY. Orders cannot be placed and webhooks will be rejected until you do."
            );
        }
        result
    }
}

impl AdminConfig {
    pub fn from_env() -> Self {
        let user = non_empty(env::var("SFS_ADMIN_USER").ok()).unwrap_or_default();
        let pass = Secret::new(non_empty(env::var("SFS_ADMIN_PASS").ok()).unwrap_or_default());
        let result = Self { user, pass };
        if !result.is_configured() {
            warn!("🪛️ SFS_ADMIN_USER and SFS_ADMIN_PASS are not set. Inventory administration is disabled.");
        }
        result
    }
}

impl CrmConfig {
    pub fn from_env() -> Self {
        let base_url = non_empty(env::var("SFS_CRM_BASE_URL").ok())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_CRM_BASE_URL.to_string());
        let api_token = Secret::new(non_empty(env::var("SFS_CRM_API_TOKEN").ok()).unwrap_or_default());
        let bot_id = non_empty(env::var("SFS_CRM_BOT_ID").ok()).unwrap_or_default();
        let result = Self { base_url, api_token, bot_id };
        if !result.is_configured() {
            info!("🪛️ SFS_CRM_API_TOKEN and SFS_CRM_BOT_ID are not set. Paid orders will not be sent to the CRM.");
        }
        result
    }
}

/// The payment provider expects the form URL to end with a slash.
pub fn normalize_form_url(url: String) -> String {
    if url.ends_with('/') {
        url
    } else {
        format!("{url}/")
    }
}

fn parse_number<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
    T::Err: std::fmt::Display,
{
    match non_empty(value) {
        None => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Some(s) => s.parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name}: {s}. {e} Using the default value of {default}.");
            default
        }),
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn form_url_gets_a_trailing_slash() {
        assert_eq!(normalize_form_url("https://shop.example/pay".into()), "https://shop.example/pay/");
        assert_eq!(normalize_form_url("https://shop.example/pay/".into()), "https://shop.example/pay/");
    }

    #[test]
    fn numbers_fall_back_to_defaults() {
        assert_eq!(parse_number("X", Some("15".into()), 30i64), 15);
        assert_eq!(parse_number("X", Some("soon".into()), 30i64), 30);
        assert_eq!(parse_number("X", None, 60u64), 60);
    }

    #[test]
    fn partial_configuration_is_not_configured() {
        let payment =
            PaymentConfig { form_url: "https://pay/".into(), sys: String::new(), secret_key: Secret::default() };
        assert!(!payment.is_configured());
        let admin = AdminConfig { user: "admin".into(), pass: Secret::new("hunter2".into()) };
        assert!(admin.is_configured());
        assert!(!CrmConfig::default().is_configured());
    }
}
