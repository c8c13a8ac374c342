use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::quark::{Category, CategoryMap, Code, Digit, Question, Questionnaire};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default = "default_port")]
    port: u16,
    /// Directory for state files (logs). Defaults to current directory.
    data_dir: Option<String>,
    /// Directory of static files served as the fallback route.
    static_dir: Option<String>,
    openai_api_key: Option<String>,
    #[serde(default = "default_model")]
    openai_model: String,
    /// Persona for general conversation.
    system_message: String,
    greeting_instruction: Option<String>,
    questions: Vec<QuestionFile>,
    quarks: Vec<QuarkFile>,
    #[serde(default)]
    sessions: SessionsFile,
    /// Posting bot; disabled when absent.
    bot: Option<BotFile>,
}

#[derive(Deserialize)]
struct QuestionFile {
    question: String,
    yes: String,
    no: String,
}

#[derive(Deserialize)]
struct QuarkFile {
    code: String,
    name: String,
    description: String,
}

#[derive(Deserialize)]
struct SessionsFile {
    #[serde(default = "default_ttl_minutes")]
    ttl_minutes: u64,
    #[serde(default = "default_max_sessions")]
    max_sessions: usize,
}

impl Default for SessionsFile {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Deserialize)]
struct BotFile {
    persona: String,
    personality_prompt: String,
    /// `{quark}` is replaced with the Quark name.
    fortune_prompt: String,
    #[serde(default = "default_image_dir")]
    image_dir: String,
    #[serde(default = "default_personality_interval")]
    personality_interval: IntervalFile,
    #[serde(default = "default_fortune_interval")]
    fortune_interval: IntervalFile,
    #[serde(default = "default_cooldown_secs")]
    rate_limit_cooldown_secs: u64,
    twitter_app_key: Option<String>,
    twitter_app_secret: Option<String>,
    twitter_access_token: Option<String>,
    twitter_access_secret: Option<String>,
}

#[derive(Deserialize, Clone, Copy)]
struct IntervalFile {
    min_minutes: u64,
    max_minutes: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_ttl_minutes() -> u64 {
    24 * 60
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_image_dir() -> String {
    "imgs".to_string()
}

fn default_personality_interval() -> IntervalFile {
    IntervalFile { min_minutes: 0, max_minutes: 120 }
}

fn default_fortune_interval() -> IntervalFile {
    IntervalFile { min_minutes: 240, max_minutes: 480 }
}

fn default_cooldown_secs() -> u64 {
    15 * 60
}

pub const DEFAULT_GREETING_INSTRUCTION: &str = "Generate a message that includes: \
'The path of every particle was chosen at the dawn of the universe, this includes the ones that form you.' \
Vary this line slightly, then say exactly this 'To find out your assigned Quark type 'I want to know my Quark''.";

/// A [min, max] window for randomized post delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub min: Duration,
    pub max: Duration,
}

/// OAuth 1.0a user-context credentials for the social platform.
#[derive(Debug, Clone)]
pub struct TwitterCredentials {
    pub app_key: String,
    pub app_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub persona: String,
    pub personality_prompt: String,
    pub fortune_prompt: String,
    pub image_dir: PathBuf,
    pub personality_interval: Interval,
    pub fortune_interval: Interval,
    pub rate_limit_cooldown: Duration,
    /// None when any credential is missing.
    pub twitter: Option<TwitterCredentials>,
}

pub struct Config {
    pub port: u16,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub openai_api_key: String,
    pub openai_model: String,
    pub system_message: String,
    pub greeting_instruction: String,
    pub questionnaire: Questionnaire,
    pub categories: CategoryMap,
    pub session_ttl: Duration,
    pub max_sessions: usize,
    pub bot: Option<BotConfig>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;
        Self::from_file(file, &|key: &str| std::env::var(key).ok())
    }

    fn from_file(file: ConfigFile, env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // File values win over the environment
        let secret = |value: Option<String>, key: &str| value.filter(|v| !v.is_empty()).or_else(|| env(key));

        let questionnaire = parse_questions(file.questions)?;
        let categories = parse_quarks(file.quarks)?;

        if file.sessions.ttl_minutes == 0 {
            return Err(ConfigError::Validation("sessions.ttl_minutes must be positive".into()));
        }
        if file.sessions.max_sessions == 0 {
            return Err(ConfigError::Validation("sessions.max_sessions must be positive".into()));
        }

        let bot = match file.bot {
            Some(bot) => {
                let personality_interval = parse_interval("bot.personality_interval", bot.personality_interval)?;
                let fortune_interval = parse_interval("bot.fortune_interval", bot.fortune_interval)?;
                if !bot.fortune_prompt.contains("{quark}") {
                    return Err(ConfigError::Validation(
                        "bot.fortune_prompt must contain the {quark} placeholder".into(),
                    ));
                }
                let twitter = match (
                    secret(bot.twitter_app_key, "TWITTER_APP_KEY"),
                    secret(bot.twitter_app_secret, "TWITTER_APP_SECRET"),
                    secret(bot.twitter_access_token, "TWITTER_ACCESS_TOKEN"),
                    secret(bot.twitter_access_secret, "TWITTER_ACCESS_SECRET"),
                ) {
                    (Some(app_key), Some(app_secret), Some(access_token), Some(access_secret)) => {
                        Some(TwitterCredentials { app_key, app_secret, access_token, access_secret })
                    }
                    _ => None,
                };
                Some(BotConfig {
                    persona: bot.persona,
                    personality_prompt: bot.personality_prompt,
                    fortune_prompt: bot.fortune_prompt,
                    image_dir: PathBuf::from(bot.image_dir),
                    personality_interval,
                    fortune_interval,
                    rate_limit_cooldown: Duration::from_secs(bot.rate_limit_cooldown_secs),
                    twitter,
                })
            }
            None => None,
        };

        let openai_api_key = secret(file.openai_api_key, "OPENAI_API_KEY").unwrap_or_default();

        Ok(Self {
            port: file.port,
            data_dir: file.data_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            static_dir: file.static_dir.map(PathBuf::from),
            openai_api_key,
            openai_model: file.openai_model,
            system_message: file.system_message,
            greeting_instruction: file
                .greeting_instruction
                .unwrap_or_else(|| DEFAULT_GREETING_INSTRUCTION.to_string()),
            questionnaire,
            categories,
            session_ttl: Duration::from_secs(file.sessions.ttl_minutes * 60),
            max_sessions: file.sessions.max_sessions,
            bot,
        })
    }
}

fn parse_questions(questions: Vec<QuestionFile>) -> Result<Questionnaire, ConfigError> {
    let parsed = questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            let digit = |value: &str| {
                Digit::parse(value).ok_or_else(|| {
                    ConfigError::Validation(format!("questions[{i}]: '{value}' is not a digit from 1 to 8"))
                })
            };
            Ok(Question {
                yes: digit(&q.yes)?,
                no: digit(&q.no)?,
                prompt: q.question,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    Questionnaire::new(parsed)
        .ok_or_else(|| ConfigError::Validation("questions must contain at least one question".into()))
}

fn parse_quarks(quarks: Vec<QuarkFile>) -> Result<CategoryMap, ConfigError> {
    let entries = quarks
        .into_iter()
        .map(|q| {
            let code = Code::parse(&q.code).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "quark '{}' has invalid code '{}' (expected one of 1/2, 3/4, 5/6, 7/8 per position)",
                    q.name, q.code
                ))
            })?;
            Ok((code, Category { name: q.name, description: q.description }))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    let map = CategoryMap::from_entries(entries);
    if map.is_empty() {
        return Err(ConfigError::Validation("quarks must contain at least one entry".into()));
    }
    Ok(map)
}

fn parse_interval(name: &str, interval: IntervalFile) -> Result<Interval, ConfigError> {
    if interval.min_minutes > interval.max_minutes {
        return Err(ConfigError::Validation(format!(
            "{name}: min_minutes ({}) exceeds max_minutes ({})",
            interval.min_minutes, interval.max_minutes
        )));
    }
    Ok(Interval {
        min: Duration::from_secs(interval.min_minutes * 60),
        max: Duration::from_secs(interval.max_minutes * 60),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    fn parse_with_env(json: &str, env: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let file: ConfigFile = serde_json::from_str(json).unwrap();
        let env: Vec<(String, String)> = env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_file(file, &move |key: &str| {
            env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
    }

    const MINIMAL: &str = r#"{
        "system_message": "You are Gluon.",
        "questions": [{"question": "Do you rise early?", "yes": "1", "no": "2"}],
        "quarks": [{"code": "1357", "name": "Fynix", "description": "a light"}]
    }"#;

    #[test]
    fn test_valid_config() {
        let file = write_config(MINIMAL);
        let config = Config::load(file.path()).expect("should load valid config");
        assert_eq!(config.port, 3000);
        assert_eq!(config.openai_model, "gpt-3.5-turbo");
        assert_eq!(config.questionnaire.len(), 1);
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.greeting_instruction, DEFAULT_GREETING_INSTRUCTION);
        assert_eq!(config.session_ttl, Duration::from_secs(24 * 60 * 60));
        assert!(config.bot.is_none());
    }

    #[test]
    fn test_example_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("gluon.example.json");
        let config = Config::load(path).expect("example config should load");
        assert_eq!(config.questionnaire.len(), 16);
        assert_eq!(config.categories.len(), 16);
        let bot = config.bot.expect("example has a bot section");
        assert_eq!(bot.fortune_interval.min, Duration::from_secs(4 * 60 * 60));
        assert_eq!(bot.fortune_interval.max, Duration::from_secs(8 * 60 * 60));
    }

    #[test]
    fn test_empty_questions() {
        let file = write_config(r#"{
            "system_message": "x",
            "questions": [],
            "quarks": [{"code": "1357", "name": "Fynix", "description": "a light"}]
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("questions"));
    }

    #[test]
    fn test_invalid_question_digit() {
        let file = write_config(r#"{
            "system_message": "x",
            "questions": [{"question": "q", "yes": "9", "no": "2"}],
            "quarks": [{"code": "1357", "name": "Fynix", "description": "a light"}]
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("'9'"));
    }

    #[test]
    fn test_invalid_quark_code() {
        let file = write_config(r#"{
            "system_message": "x",
            "questions": [{"question": "q", "yes": "1", "no": "2"}],
            "quarks": [{"code": "1537", "name": "Fynix", "description": "a light"}]
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("1537"));
    }

    #[test]
    fn test_duplicate_quark_code_keeps_first() {
        let file = write_config(r#"{
            "system_message": "x",
            "questions": [{"question": "q", "yes": "1", "no": "2"}],
            "quarks": [
                {"code": "2467", "name": "Glyon", "description": "connecting"},
                {"code": "2467", "name": "Charm", "description": "rare"}
            ]
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.categories.len(), 1);
        let code = Code::parse("2467").unwrap();
        assert_eq!(config.categories.get(&code).unwrap().name, "Glyon");
    }

    #[test]
    fn test_bot_interval_validation() {
        let file = write_config(r#"{
            "system_message": "x",
            "questions": [{"question": "q", "yes": "1", "no": "2"}],
            "quarks": [{"code": "1357", "name": "Fynix", "description": "a light"}],
            "bot": {
                "persona": "p",
                "personality_prompt": "muse",
                "fortune_prompt": "foretell {quark}",
                "fortune_interval": {"min_minutes": 10, "max_minutes": 5}
            }
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("fortune_interval"));
    }

    #[test]
    fn test_fortune_prompt_needs_placeholder() {
        let file = write_config(r#"{
            "system_message": "x",
            "questions": [{"question": "q", "yes": "1", "no": "2"}],
            "quarks": [{"code": "1357", "name": "Fynix", "description": "a light"}],
            "bot": {"persona": "p", "personality_prompt": "muse", "fortune_prompt": "foretell"}
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("{quark}"));
    }

    #[test]
    fn test_secrets_from_env() {
        let json = r#"{
            "system_message": "x",
            "openai_api_key": "from-file",
            "questions": [{"question": "q", "yes": "1", "no": "2"}],
            "quarks": [{"code": "1357", "name": "Fynix", "description": "a light"}],
            "bot": {
                "persona": "p",
                "personality_prompt": "muse",
                "fortune_prompt": "foretell {quark}",
                "twitter_app_key": "k"
            }
        }"#;
        let env = [
            ("OPENAI_API_KEY", "from-env"),
            ("TWITTER_APP_SECRET", "s"),
            ("TWITTER_ACCESS_TOKEN", "t"),
            ("TWITTER_ACCESS_SECRET", "ts"),
        ];
        let config = parse_with_env(json, &env).unwrap();
        assert_eq!(config.openai_api_key, "from-file");
        let twitter = config.bot.unwrap().twitter.expect("credentials merged from env");
        assert_eq!(twitter.app_key, "k");
        assert_eq!(twitter.access_secret, "ts");
    }

    #[test]
    fn test_missing_credential_disables_publishing() {
        let json = r#"{
            "system_message": "x",
            "questions": [{"question": "q", "yes": "1", "no": "2"}],
            "quarks": [{"code": "1357", "name": "Fynix", "description": "a light"}],
            "bot": {"persona": "p", "personality_prompt": "muse", "fortune_prompt": "foretell {quark}"}
        }"#;
        let config = parse_with_env(json, &[("TWITTER_APP_KEY", "k")]).unwrap();
        assert!(config.bot.unwrap().twitter.is_none());
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
