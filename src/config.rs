//! Process configuration: environment variables with `.env` support.
//!
//! `.env` files are read from the working directory and from the
//! platform config directory:
//!   macOS:   ~/Library/Application Support/latexscan/.env
//!   Linux:   ~/.config/latexscan/.env
//!   Windows: %APPDATA%/latexscan/.env
//!
//! Values already present in the environment win over `.env` entries.

use std::path::PathBuf;

pub const DEFAULT_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
/// Characters of LaTeX shown in the "copied" notification body.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// Label of the settings webview window declared in `tauri.conf.json`.
pub const SETTINGS_WINDOW: &str = "settings";

pub const ENV_API_ENDPOINT: &str = "LATEXSCAN_API_ENDPOINT";
pub const ENV_MODEL: &str = "LATEXSCAN_MODEL";
pub const ENV_CAPTURE_COMMAND: &str = "LATEXSCAN_CAPTURE_COMMAND";
pub const ENV_PREVIEW_CHARS: &str = "LATEXSCAN_PREVIEW_CHARS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for the remote LaTeX-extraction service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub model: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ServiceConfig {
    /// `{endpoint}/models/{model}:generateContent`, without the key.
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub service: ServiceConfig,
    /// Picker command override, already split into program + args.
    pub capture_command: Option<Vec<String>>,
    pub preview_chars: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            capture_command: None,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

impl AppConfig {
    /// Load `.env` files, then read configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(endpoint) = get(ENV_API_ENDPOINT) {
            config.service.endpoint = endpoint.trim().to_string();
        }
        if let Some(model) = get(ENV_MODEL) {
            config.service.model = model.trim().to_string();
        }
        if let Some(command) = get(ENV_CAPTURE_COMMAND) {
            let args = split_command(&command).ok_or_else(|| ConfigError::Invalid {
                key: ENV_CAPTURE_COMMAND,
                value: command.clone(),
                reason: "unbalanced quote".to_string(),
            })?;
            config.capture_command = Some(args);
        }
        if let Some(raw) = get(ENV_PREVIEW_CHARS) {
            config.preview_chars = match raw.trim().parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        key: ENV_PREVIEW_CHARS,
                        value: raw,
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        key: ENV_PREVIEW_CHARS,
                        value: raw,
                        reason: e.to_string(),
                    })
                }
            };
        }

        Ok(config)
    }
}

/// Split a command line on whitespace. Single or double quotes group
/// words containing spaces; there are no escapes. `None` on an
/// unterminated quote.
fn split_command(line: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return None;
    }
    if in_word {
        args.push(current);
    }
    Some(args)
}

/// Per-user configuration directory for latexscan.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("latexscan")
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => log::info!("[CONFIG] Loaded {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("[CONFIG] Ignoring malformed .env: {}", e),
    }

    let user_env = config_dir().join(".env");
    if user_env.exists() {
        match dotenvy::from_path(&user_env) {
            Ok(()) => log::info!("[CONFIG] Loaded {}", user_env.display()),
            Err(e) => log::warn!("[CONFIG] Ignoring {}: {}", user_env.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.service.generate_content_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_API_ENDPOINT, "http://127.0.0.1:9000/"),
            (ENV_MODEL, "gemini-2.5-flash"),
            (ENV_CAPTURE_COMMAND, "grim -g  {output}"),
            (ENV_PREVIEW_CHARS, "40"),
        ]))
        .unwrap();

        assert_eq!(
            config.service.generate_content_url(),
            "http://127.0.0.1:9000/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            config.capture_command,
            Some(vec!["grim".into(), "-g".into(), "{output}".into()])
        );
        assert_eq!(config.preview_chars, 40);
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = AppConfig::from_lookup(lookup(&[(ENV_MODEL, "   ")])).unwrap();
        assert_eq!(config.service.model, DEFAULT_MODEL);
    }

    #[test]
    fn invalid_preview_length_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_PREVIEW_CHARS, "lots")])).unwrap_err();
        assert!(err.to_string().contains(ENV_PREVIEW_CHARS));

        let err = AppConfig::from_lookup(lookup(&[(ENV_PREVIEW_CHARS, "0")])).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn quoted_capture_arguments_keep_their_spaces() {
        let config = AppConfig::from_lookup(lookup(&[(
            ENV_CAPTURE_COMMAND,
            r#""/Applications/My Tools/snip" --title 'Pick math' "" {output}"#,
        )]))
        .unwrap();
        assert_eq!(
            config.capture_command,
            Some(vec![
                "/Applications/My Tools/snip".into(),
                "--title".into(),
                "Pick math".into(),
                "".into(),
                "{output}".into(),
            ])
        );
    }

    #[test]
    fn unbalanced_quote_in_capture_command_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_CAPTURE_COMMAND, "snip \"oops {output}")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_CAPTURE_COMMAND));
    }
}
