// src/config.rs

use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROXY_PORT: u16 = 80;

/// Hosts that never go through the proxy.
const ALWAYS_BYPASS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Proxy settings for the browser's network egress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    pub proxy_host: Option<String>,
    pub proxy_port: u16,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Option<String>,
}

impl ProxyConfig {
    /// Reads `PROXY_HOST`, `PROXY_PORT`, `HTTP_PROXY`, `HTTPS_PROXY` and `NO_PROXY`
    /// (upper case first, then lower case).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| {
            env::var(key)
                .or_else(|_| env::var(key.to_lowercase()))
                .ok()
        })
    }

    /// Like [`ProxyConfig::from_env`] with a custom variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            proxy_host: get("PROXY_HOST"),
            proxy_port: get("PROXY_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PROXY_PORT),
            http_proxy: get("HTTP_PROXY"),
            https_proxy: get("HTTPS_PROXY"),
            no_proxy: get("NO_PROXY"),
        }
    }

    /// `NO_PROXY` entries plus localhost and 127.0.0.1.
    pub fn bypass_list(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .no_proxy
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        for host in ALWAYS_BYPASS {
            if !hosts.iter().any(|h| h == host) {
                hosts.push(host.to_string());
            }
        }
        hosts
    }

    /// Value for `--proxy-server`, `None` when no proxy is configured.
    pub fn proxy_server(&self) -> Option<String> {
        match (&self.http_proxy, &self.https_proxy) {
            (Some(http), Some(https)) if http != https => {
                Some(format!("http={};https={}", http, https))
            }
            (Some(http), _) => Some(http.clone()),
            (None, _) => self
                .proxy_host
                .as_ref()
                .map(|host| format!("{}:{}", host, self.proxy_port)),
        }
    }

    /// Chrome command-line switches for these settings.
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args = vec![format!("--proxy-bypass-list={}", self.bypass_list().join(","))];
        match self.proxy_server() {
            Some(server) => args.push(format!("--proxy-server={}", server)),
            None => args.push("--no-proxy-server".to_string()),
        }
        args
    }
}

/// Everything the batch needs to start a browser and run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub webdriver_url: String,
    /// chromedriver binary to launch; `None` means one is already listening.
    pub chromedriver: Option<PathBuf>,
    pub headless: bool,
    pub timeout: Duration,
    pub proxy: ProxyConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            chromedriver: None,
            headless: true,
            timeout: DEFAULT_TIMEOUT,
            proxy: ProxyConfig::from_lookup(|_| None),
        }
    }
}

impl Settings {
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.headless {
            args.push("--headless".to_string());
        }
        args.extend(self.proxy.chrome_args());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn proxy(vars: &[(&str, &str)]) -> ProxyConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProxyConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn no_proxy_configured() {
        let p = proxy(&[]);
        assert_eq!(p.proxy_port, 80);
        assert_eq!(
            p.chrome_args(),
            vec![
                "--proxy-bypass-list=localhost,127.0.0.1".to_string(),
                "--no-proxy-server".to_string(),
            ]
        );
    }

    #[test]
    fn bypass_list_keeps_entries_and_adds_loopback_once() {
        let p = proxy(&[("NO_PROXY", " intranet.local, localhost ,,10.0.0.1")]);
        assert_eq!(
            p.bypass_list(),
            vec!["intranet.local", "localhost", "10.0.0.1", "127.0.0.1"]
        );
    }

    #[test]
    fn http_proxy_wins_over_host_and_port() {
        let p = proxy(&[
            ("HTTP_PROXY", "http://proxy.corp:8080"),
            ("PROXY_HOST", "other"),
            ("PROXY_PORT", "3128"),
        ]);
        assert_eq!(p.proxy_server().as_deref(), Some("http://proxy.corp:8080"));
    }

    #[test]
    fn host_and_port_when_no_http_proxy() {
        let p = proxy(&[("PROXY_HOST", "proxy.corp"), ("PROXY_PORT", "3128")]);
        assert_eq!(p.proxy_server().as_deref(), Some("proxy.corp:3128"));

        let p = proxy(&[("PROXY_HOST", "proxy.corp"), ("PROXY_PORT", "junk")]);
        assert_eq!(p.proxy_server().as_deref(), Some("proxy.corp:80"));
    }

    #[test]
    fn distinct_https_proxy_gets_a_scheme_rule() {
        let p = proxy(&[("HTTP_PROXY", "p1:80"), ("HTTPS_PROXY", "p2:443")]);
        assert_eq!(p.proxy_server().as_deref(), Some("http=p1:80;https=p2:443"));

        let same = proxy(&[("HTTP_PROXY", "p1:80"), ("HTTPS_PROXY", "p1:80")]);
        assert_eq!(same.proxy_server().as_deref(), Some("p1:80"));
    }

    #[test]
    fn blank_values_are_unset() {
        let p = proxy(&[("HTTP_PROXY", "  "), ("NO_PROXY", "")]);
        assert_eq!(p, ProxyConfig { proxy_port: 80, ..Default::default() });
    }

    #[test]
    fn headless_flag_leads_the_args() {
        let s = Settings::default();
        let args = s.chrome_args();
        assert_eq!(args[0], "--headless");
        assert!(args.contains(&"--no-proxy-server".to_string()));

        let visible = Settings { headless: false, ..Settings::default() };
        assert!(!visible.chrome_args().contains(&"--headless".to_string()));
    }
}
