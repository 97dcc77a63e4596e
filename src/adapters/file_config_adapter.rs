//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_str(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_float(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn from_string_parses_sections() {
        let adapter = FileConfigAdapter::from_string(
            r#"
[backtest]
initial_capital = 200000
max_positions = 8
quality_thresholds = 50,60,70

[exits]
layered_tp = yes
stop_loss = 0.08
"#,
        )
        .unwrap();

        assert_eq!(
            adapter.get_str("backtest", "quality_thresholds"),
            Some("50,60,70".to_string())
        );
        assert_eq!(adapter.get_int("backtest", "max_positions", 5), 8);
        assert_eq!(adapter.get_float("exits", "stop_loss", 0.10), 0.08);
        assert!(adapter.get_bool("exits", "layered_tp", false));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        assert_eq!(adapter.get_str("backtest", "missing"), None);
        assert_eq!(adapter.get_int("backtest", "max_positions", 5), 5);
        assert_eq!(adapter.get_float("exits", "stop_loss", 0.10), 0.10);
        assert!(!adapter.get_bool("exits", "pyramid", false));
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nmax_positions = five\ninitial_capital = lots\n")
                .unwrap();
        assert_eq!(adapter.get_int("backtest", "max_positions", 5), 5);
        assert_eq!(adapter.get_float("backtest", "initial_capital", 1.0), 1.0);
    }

    #[test]
    fn bool_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[exits]\na = true\nb = YES\nc = 1\nd = false\ne = No\nf = 0\ng = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("exits", "a", false));
        assert!(adapter.get_bool("exits", "b", false));
        assert!(adapter.get_bool("exits", "c", false));
        assert!(!adapter.get_bool("exits", "d", true));
        assert!(!adapter.get_bool("exits", "e", true));
        assert!(!adapter.get_bool("exits", "f", true));
        // unparseable keeps the default
        assert!(adapter.get_bool("exits", "g", true));
    }

    #[test]
    fn from_file_round_trip() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[gate]\nenabled = true\nindex = SH000001\n").unwrap();

        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert!(adapter.get_bool("gate", "enabled", false));
        assert_eq!(adapter.get_str("gate", "index"), Some("SH000001".into()));
    }

    #[test]
    fn from_file_missing_path_errors() {
        assert!(FileConfigAdapter::from_file("/nonexistent/qqetrader.ini").is_err());
    }
}
