//! INI file configuration adapter.

use crate::domain::error::BacksimError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BacksimError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| BacksimError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, BacksimError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| BacksimError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Some(true),
            "false" | "no" | "0" | "off" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }

    fn sections(&self) -> Vec<String> {
        let mut sections = self.config.sections();
        sections.sort();
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
dir = /srv/prices
symbol = SPY

[strategy]
name = Golden Cross
baseline = PRICE_OSC(EMA,26,14)
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "dir"),
            Some("/srv/prices".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "name"),
            Some("Golden Cross".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "baseline"),
            Some("PRICE_OSC(EMA,26,14)".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nnumtrades = 1\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn sections_are_listed_sorted() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nname = x\n[data]\nsymbol = ABC\n").unwrap();
        assert_eq!(adapter.sections(), vec!["data", "strategy"]);
    }

    #[test]
    fn numbers_are_read_as_text() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_value = 100000.5\n").unwrap();
        assert_eq!(
            adapter.get_string("backtest", "initial_value"),
            Some("100000.5".to_string())
        );
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\na = true\nb = yes\nc = 0\nd = off\ne = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("strategy", "a", false));
        assert!(adapter.get_bool("strategy", "b", false));
        assert!(!adapter.get_bool("strategy", "c", true));
        assert!(!adapter.get_bool("strategy", "d", true));
        assert!(adapter.get_bool("strategy", "e", true));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[output]\ndir = /tmp/results\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("output", "dir"),
            Some("/tmp/results".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(BacksimError::ConfigParse { .. })));
    }
}
