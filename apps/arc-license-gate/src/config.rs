use std::{env, path::PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub license_file: PathBuf,
    pub public_key_path: PathBuf,
    pub license_issuer: Option<String>,
    pub license_audience: Option<String>,
    pub metrics_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let metrics_enabled = env::var("ARC_METRICS_ENABLED")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.metrics_enabled);

        Self {
            port: env::var("ARC_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            license_file: env::var("LICENSE_FILE")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.license_file),
            public_key_path: env::var("LICENSE_PUBLIC_KEY_PATH")
                .or_else(|_| env::var("JWT_PUBLIC_KEY_PATH"))
                .map(PathBuf::from)
                .unwrap_or(defaults.public_key_path),
            license_issuer: env::var("LICENSE_ISSUER").ok(),
            license_audience: env::var("LICENSE_AUDIENCE").ok(),
            metrics_enabled,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            redis_url: "redis://localhost:6379".to_string(),
            license_file: PathBuf::from("license.lic"),
            public_key_path: PathBuf::from("./public.pem"),
            license_issuer: None,
            license_audience: None,
            metrics_enabled: true,
        }
    }
}
