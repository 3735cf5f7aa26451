use std::{env, str::FromStr, time::Duration};

use crate::error::ConfigError;
use crate::models::{Ticker, TrendKind};

const DEFAULT_SEEDS: &[&str] = &[
    "A40AEG.DE",
    "694280.DE",
    "A2AA20.DE",
    "PNTX.DE",
    "PZNA.DE",
    "SZA.DE",
];

const DE_HEADER_KEYWORDS: &[&str] = &["Symbol", "Ticker", "Kürzel"];

/// Calendar days of slack for exchange holidays on top of the 5/7 weekday ratio.
const HOLIDAY_MARGIN_DAYS: usize = 14;

/// Everything the scan needs, read once at startup and handed to each
/// component by value.
#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub gemini: Option<GeminiSettings>,
    pub market_data: MarketDataSettings,
    pub universe: UniverseSettings,
    pub detector: DetectorSettings,
    pub throttle: ThrottleSettings,
}

#[derive(Clone)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: i64,
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MarketDataSettings {
    pub base_url: String,
    pub lookback_days: u32,
}

#[derive(Debug, Clone)]
pub struct UniverseSettings {
    pub seeds: Vec<Ticker>,
    pub scrape_enabled: bool,
    pub index_sources: Vec<IndexSourceSettings>,
}

/// One scraped membership table.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSourceSettings {
    pub name: String,
    pub url: String,
    /// A header qualifies when it contains any of these, case-sensitive.
    pub header_keywords: Vec<String>,
    /// Literal substitutions applied to each raw cell, in order.
    pub replacements: Vec<(String, String)>,
    /// Exchange suffix appended unless the symbol already ends with it.
    pub suffix: Option<String>,
}

impl IndexSourceSettings {
    pub fn defaults() -> Vec<Self> {
        let mut sources = vec![Self {
            name: "S&P 500".to_string(),
            url: "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies".to_string(),
            header_keywords: vec!["Symbol".to_string()],
            replacements: vec![(".".to_string(), "-".to_string())],
            suffix: None,
        }];

        for index in ["DAX", "MDAX", "SDAX"] {
            sources.push(Self {
                name: index.to_string(),
                url: format!("https://de.wikipedia.org/wiki/{index}"),
                header_keywords: DE_HEADER_KEYWORDS.iter().map(|k| k.to_string()).collect(),
                replacements: Vec::new(),
                suffix: Some(".DE".to_string()),
            });
        }

        sources
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub min_bars: usize,
    pub volume_window: usize,
    pub trend: TrendKind,
    pub rel_volume_threshold: f64,
    pub rsl: Option<RslFilter>,
}

/// Optional third condition: close / SMA(window) must exceed `min_rsl`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RslFilter {
    pub window: usize,
    pub min_rsl: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_bars: 50,
            volume_window: 20,
            trend: TrendKind::Sma(50),
            rel_volume_threshold: 1.5,
            rsl: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleSettings {
    pub fetch_concurrency: usize,
    pub alert_concurrency: usize,
    pub request_delay: Duration,
    pub retry_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            fetch_concurrency: 5,
            alert_concurrency: 2,
            request_delay: Duration::from_millis(100),
            retry_delay: Duration::from_millis(1000),
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bot_token = get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;
        let chat_id = get("TELEGRAM_CHAT_ID").ok_or(ConfigError::Missing("TELEGRAM_CHAT_ID"))?;
        let telegram = TelegramSettings {
            bot_token,
            chat_id: parse_value("TELEGRAM_CHAT_ID", &chat_id)?,
        };

        let gemini = get("GEMINI_API_KEY").map(|api_key| GeminiSettings {
            api_key,
            model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
        });

        let market_data = MarketDataSettings {
            base_url: get("MARKET_DATA_BASE_URL")
                .unwrap_or_else(|| "https://query1.finance.yahoo.com".to_string()),
            lookback_days: parse_or("SCAN_LOOKBACK_DAYS", get("SCAN_LOOKBACK_DAYS"), 400)?,
        };

        let seeds = match get("SCAN_SEED_TICKERS") {
            Some(raw) => raw.split(',').filter_map(Ticker::parse).collect(),
            None => DEFAULT_SEEDS.iter().filter_map(|s| Ticker::parse(s)).collect(),
        };
        let universe = UniverseSettings {
            seeds,
            scrape_enabled: !parse_or("SCAN_DISABLE_SCRAPE", get("SCAN_DISABLE_SCRAPE"), false)?,
            index_sources: IndexSourceSettings::defaults(),
        };

        let defaults = DetectorSettings::default();
        let trend_window = get("SCAN_TREND_WINDOW");
        let trend = match get("SCAN_TREND").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("sma") => TrendKind::Sma(parse_or("SCAN_TREND_WINDOW", trend_window, 50)?),
            Some("ema") => TrendKind::Ema(parse_or("SCAN_TREND_WINDOW", trend_window, 200)?),
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "SCAN_TREND",
                    value: other.to_string(),
                    reason: "expected `sma` or `ema`".to_string(),
                });
            }
        };
        let rsl = match get("SCAN_RSL_WINDOW") {
            Some(window) => Some(RslFilter {
                window: parse_value("SCAN_RSL_WINDOW", &window)?,
                min_rsl: parse_or("SCAN_MIN_RSL", get("SCAN_MIN_RSL"), 1.0)?,
            }),
            None => None,
        };
        let detector = DetectorSettings {
            min_bars: parse_or("SCAN_MIN_BARS", get("SCAN_MIN_BARS"), defaults.min_bars)?,
            volume_window: parse_or(
                "SCAN_VOLUME_WINDOW",
                get("SCAN_VOLUME_WINDOW"),
                defaults.volume_window,
            )?,
            trend,
            rel_volume_threshold: parse_or(
                "SCAN_REL_VOLUME_THRESHOLD",
                get("SCAN_REL_VOLUME_THRESHOLD"),
                defaults.rel_volume_threshold,
            )?,
            rsl,
        };
        detector.validate()?;

        let need_days = detector.required_calendar_days();
        if (market_data.lookback_days as usize) < need_days {
            return Err(ConfigError::Invalid {
                key: "SCAN_LOOKBACK_DAYS",
                value: market_data.lookback_days.to_string(),
                reason: format!(
                    "{} daily bars need at least {} calendar days",
                    detector.required_bars(),
                    need_days
                ),
            });
        }

        let defaults = ThrottleSettings::default();
        let throttle = ThrottleSettings {
            fetch_concurrency: parse_or(
                "SCAN_FETCH_CONCURRENCY",
                get("SCAN_FETCH_CONCURRENCY"),
                defaults.fetch_concurrency,
            )?
            .max(1),
            alert_concurrency: parse_or(
                "SCAN_ALERT_CONCURRENCY",
                get("SCAN_ALERT_CONCURRENCY"),
                defaults.alert_concurrency,
            )?
            .max(1),
            request_delay: Duration::from_millis(parse_or(
                "SCAN_REQUEST_DELAY_MS",
                get("SCAN_REQUEST_DELAY_MS"),
                100,
            )?),
            retry_delay: Duration::from_millis(parse_or(
                "SCAN_RETRY_DELAY_MS",
                get("SCAN_RETRY_DELAY_MS"),
                1000,
            )?),
            call_timeout: Duration::from_secs(parse_or(
                "SCAN_CALL_TIMEOUT_SECS",
                get("SCAN_CALL_TIMEOUT_SECS"),
                10,
            )?),
        };

        Ok(Self {
            telegram,
            gemini,
            market_data,
            universe,
            detector,
            throttle,
        })
    }
}

impl DetectorSettings {
    /// Shortest series for which every statistic is defined.
    pub fn required_bars(&self) -> usize {
        let rsl_window = self.rsl.map(|rsl| rsl.window).unwrap_or(0);

        self.min_bars
            .max(self.volume_window)
            .max(self.trend.window())
            .max(rsl_window)
            .max(1)
    }

    /// Lookback that yields `required_bars` trading days, weekends and
    /// holidays included.
    pub fn required_calendar_days(&self) -> usize {
        self.required_bars().div_ceil(5) * 7 + HOLIDAY_MARGIN_DAYS
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &'static str, value: String, reason: &str| ConfigError::Invalid {
            key,
            value,
            reason: reason.to_string(),
        };

        if self.volume_window == 0 {
            return Err(invalid("SCAN_VOLUME_WINDOW", "0".into(), "must be at least 1"));
        }
        if self.trend.window() == 0 {
            return Err(invalid("SCAN_TREND_WINDOW", "0".into(), "must be at least 1"));
        }
        if !(self.rel_volume_threshold.is_finite() && self.rel_volume_threshold > 0.0) {
            return Err(invalid(
                "SCAN_REL_VOLUME_THRESHOLD",
                self.rel_volume_threshold.to_string(),
                "must be a positive number",
            ));
        }
        if let Some(rsl) = self.rsl {
            if rsl.window == 0 {
                return Err(invalid("SCAN_RSL_WINDOW", "0".into(), "must be at least 1"));
            }
            if !rsl.min_rsl.is_finite() {
                return Err(invalid("SCAN_MIN_RSL", rsl.min_rsl.to_string(), "must be finite"));
            }
        }
        Ok(())
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
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
        move |key: &str| map.get(key).cloned()
    }

    const CHAT: &[(&str, &str)] = &[("TELEGRAM_BOT_TOKEN", "123:abc"), ("TELEGRAM_CHAT_ID", "-1001")];

    #[test]
    fn missing_chat_credentials_abort() {
        let err = Settings::from_lookup(lookup(&[("TELEGRAM_CHAT_ID", "1")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TELEGRAM_BOT_TOKEN"));

        let err = Settings::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "  "),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("TELEGRAM_CHAT_ID"));
    }

    #[test]
    fn non_numeric_chat_id_is_invalid() {
        let err = Settings::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "my-channel"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TELEGRAM_CHAT_ID", .. }));
    }

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let settings = Settings::from_lookup(lookup(CHAT)).unwrap();

        assert_eq!(settings.telegram.chat_id, -1001);
        assert!(settings.gemini.is_none());
        assert_eq!(settings.detector, DetectorSettings::default());
        assert_eq!(settings.throttle, ThrottleSettings::default());
        assert_eq!(settings.universe.seeds.len(), DEFAULT_SEEDS.len());
        assert!(settings.universe.scrape_enabled);
        assert_eq!(settings.universe.index_sources.len(), 4);
    }

    #[test]
    fn ema_trend_defaults_to_200_bars() {
        let mut pairs = CHAT.to_vec();
        pairs.push(("SCAN_TREND", "EMA"));
        pairs.push(("SCAN_REL_VOLUME_THRESHOLD", "1.2"));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(settings.detector.trend, TrendKind::Ema(200));
        assert_eq!(settings.detector.rel_volume_threshold, 1.2);
    }

    #[test]
    fn unknown_trend_kind_is_rejected() {
        let mut pairs = CHAT.to_vec();
        pairs.push(("SCAN_TREND", "wma"));
        let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SCAN_TREND", .. }));
    }

    #[test]
    fn seed_list_is_parsed_and_filtered() {
        let mut pairs = CHAT.to_vec();
        pairs.push(("SCAN_SEED_TICKERS", "SAP.DE, ,nan,AAPL"));
        pairs.push(("SCAN_RSL_WINDOW", "189"));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();

        let seeds: Vec<&str> = settings.universe.seeds.iter().map(Ticker::as_str).collect();
        assert_eq!(seeds, vec!["SAP.DE", "AAPL"]);
        assert_eq!(
            settings.detector.rsl,
            Some(RslFilter {
                window: 189,
                min_rsl: 1.0
            })
        );
    }

    #[test]
    fn lookback_too_short_for_the_trend_window_is_rejected() {
        let mut pairs = CHAT.to_vec();
        pairs.push(("SCAN_TREND", "ema"));
        pairs.push(("SCAN_TREND_WINDOW", "300"));
        let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SCAN_LOOKBACK_DAYS", .. }));

        pairs.push(("SCAN_LOOKBACK_DAYS", "100"));
        assert!(Settings::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = CHAT.to_vec();
        pairs.push(("SCAN_LOOKBACK_DAYS", "100"));
        pairs.push(("SCAN_TREND", "ema"));
        assert!(Settings::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn required_calendar_days_cover_weekends() {
        let defaults = DetectorSettings::default();
        assert_eq!(defaults.required_bars(), 50);
        assert_eq!(defaults.required_calendar_days(), 84);

        let ema = DetectorSettings {
            trend: TrendKind::Ema(200),
            ..DetectorSettings::default()
        };
        assert_eq!(ema.required_calendar_days(), 294);

        let mut pairs = CHAT.to_vec();
        pairs.push(("SCAN_TREND", "ema"));
        pairs.push(("SCAN_LOOKBACK_DAYS", "294"));
        assert!(Settings::from_lookup(lookup(&pairs)).is_ok());
    }

    #[test]
    fn zero_threshold_fails_validation() {
        let mut pairs = CHAT.to_vec();
        pairs.push(("SCAN_REL_VOLUME_THRESHOLD", "0"));
        assert!(Settings::from_lookup(lookup(&pairs)).is_err());
    }
}
