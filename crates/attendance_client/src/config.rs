use crate::AttendanceError;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REFRESH_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct Config {
    /// Deployed spreadsheet script URL. Anyone holding it can write rows.
    pub api_url: SecretString,
    /// Directory holding the saved form preferences.
    pub prefs_dir: PathBuf,
    /// How often the batch suggestion is recomputed.
    pub refresh_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AttendanceError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, AttendanceError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let api_url = get("ATTENDANCE_SHEETS_API_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                AttendanceError::Config("ATTENDANCE_SHEETS_API_URL missing".into())
            })?;
        let prefs_dir = get("ATTENDANCE_PREFS_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let refresh_secs = match get("ATTENDANCE_REFRESH_SECS") {
            None => DEFAULT_REFRESH_SECS,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    AttendanceError::Config(format!(
                        "ATTENDANCE_REFRESH_SECS must be a positive integer, got {raw:?}"
                    ))
                })?,
        };
        Ok(Self {
            api_url: SecretString::new(api_url.trim().into()),
            prefs_dir,
            refresh_interval: Duration::from_secs(refresh_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn from_env_missing_api_url() {
        let get = |k: &str| match k {
            "ATTENDANCE_PREFS_DIR" => Some("/tmp".into()),
            _ => None,
        };
        let res = Config::from_env_with(get);
        assert!(matches!(res, Err(AttendanceError::Config(_))));
    }

    #[test]
    fn from_env_blank_api_url_is_missing() {
        let get = |k: &str| match k {
            "ATTENDANCE_SHEETS_API_URL" => Some("   ".into()),
            _ => None,
        };
        assert!(Config::from_env_with(get).is_err());
    }

    #[test]
    fn from_env_reads_values() {
        let get = |k: &str| match k {
            "ATTENDANCE_SHEETS_API_URL" => Some("https://script.example/exec".into()),
            "ATTENDANCE_PREFS_DIR" => Some("/var/lib/checkin".into()),
            "ATTENDANCE_REFRESH_SECS" => Some("15".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.api_url.expose_secret(), "https://script.example/exec");
        assert_eq!(cfg.prefs_dir, PathBuf::from("/var/lib/checkin"));
        assert_eq!(cfg.refresh_interval, Duration::from_secs(15));
    }

    #[test]
    fn from_env_defaults() {
        let get = |k: &str| match k {
            "ATTENDANCE_SHEETS_API_URL" => Some("https://script.example/exec".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.prefs_dir, PathBuf::from("."));
        assert_eq!(cfg.refresh_interval, Duration::from_secs(DEFAULT_REFRESH_SECS));
    }

    #[test]
    fn from_env_rejects_bad_refresh() {
        for bad in ["0", "soon", "-5"] {
            let get = |k: &str| match k {
                "ATTENDANCE_SHEETS_API_URL" => Some("https://script.example/exec".into()),
                "ATTENDANCE_REFRESH_SECS" => Some(bad.to_string()),
                _ => None,
            };
            assert!(Config::from_env_with(get).is_err(), "{bad}");
        }
    }
}
