use std::path::PathBuf;

use anyhow::Result;
use crossterm::style::Stylize;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    default_colors::*,
    odata::UpdateMethod,
    workflow::{Level, Notification},
};

pub const CONFIG_FILE: &str = "booklist.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    bold:   bool,
    italic: bool,
    color:  crossterm::style::Color,
}

impl StyleConfig {
    fn style(&self, s: impl ToString) -> String {
        let mut s = s.to_string().with(self.color);
        if self.bold {
            s = s.bold();
        }
        if self.italic {
            s = s.italic();
        }
        s.to_string()
    }
}

pub trait Styleable {
    fn style(&self, c: &StyleConfig) -> String;
}

impl<T> Styleable for T
where
    T: ToString + std::fmt::Display,
{
    fn style(&self, c: &StyleConfig) -> String {
        c.style(self)
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            color:  COLOR_WHITE,
            bold:   false,
            italic: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub prefix:            String,
    pub suffix:            String,
    pub description:       String,
    pub style_prefix:      StyleConfig,
    pub style_suffix:      StyleConfig,
    pub style_description: StyleConfig,
    pub style_content:     StyleConfig,
}

impl OutputConfig {
    pub fn format(&self, content: impl ToString) -> String {
        let prefix = self.prefix.style(&self.style_prefix);
        let suffix = self.suffix.style(&self.style_suffix);
        let content = content.to_string().style(&self.style_content);
        if self.description.is_empty() {
            return format!("{prefix}{content}{suffix}");
        }
        let description = self.description.style(&self.style_description);
        format!("{prefix}{description} {content}{suffix}")
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix:            "".into(),
            suffix:            "".into(),
            description:       "".into(),
            style_prefix:      StyleConfig::default(),
            style_suffix:      StyleConfig::default(),
            style_description: StyleConfig {
                italic: true,
                ..StyleConfig::default()
            },
            style_content:     StyleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the OData service, e.g. `https://host/sap/opu/odata/SAP/Z801_BOOKLIST_DARU_SRV`
    pub service_url:    String,
    pub entity_set:     String,
    pub username:       Option<String>,
    pub password:       Option<String>,
    pub sap_client:     Option<String>,
    pub update_method:  UpdateMethod,
    pub timeout_secs:   u64,
    pub history_file:   PathBuf,
    pub output_info:    OutputConfig,
    pub output_success: OutputConfig,
    pub output_warning: OutputConfig,
    pub output_error:   OutputConfig,
    pub output_header:  OutputConfig,
    pub output_row:     OutputConfig,
}

impl Config {
    pub fn default_as_string() -> Result<String> {
        Ok(toml::to_string(&Self::default())?)
    }

    pub fn read_config() -> Result<Self> {
        Ok(Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("BOOKLIST_"))
            .extract()?)
    }

    /// History file with `~` and environment variables expanded.
    pub fn history_path(&self) -> Result<PathBuf> {
        Ok(shellexpand::path::full(&self.history_file)?.into_owned())
    }

    pub fn output_for(&self, level: Level) -> &OutputConfig {
        match level {
            Level::Info => &self.output_info,
            Level::Success => &self.output_success,
            Level::Warning => &self.output_warning,
            Level::Error => &self.output_error,
        }
    }

    pub fn format_notification(&self, notification: &Notification) -> String {
        self.output_for(notification.level).format(&notification.message)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url:    "http://localhost:8000/sap/opu/odata/SAP/Z801_BOOKLIST_DARU_SRV".into(),
            entity_set:     "Z801_book_entity_daruSet".into(),
            username:       None,
            password:       None,
            sap_client:     None,
            update_method:  UpdateMethod::default(),
            timeout_secs:   30,
            history_file:   PathBuf::from("~/.local/share/booklist/history.txt"),
            output_info:    OutputConfig {
                prefix: "· ".into(),
                style_prefix: StyleConfig {
                    color: COLOR_DIMMED,
                    ..StyleConfig::default()
                },
                style_content: StyleConfig {
                    color: COLOR_INFO,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_success: OutputConfig {
                prefix: "✓ ".into(),
                style_prefix: StyleConfig {
                    color: COLOR_SUCCESS,
                    bold: true,
                    ..StyleConfig::default()
                },
                style_content: StyleConfig {
                    color: COLOR_SUCCESS,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_warning: OutputConfig {
                description: "Warning:".into(),
                style_description: StyleConfig {
                    color: COLOR_WARNING,
                    bold: true,
                    ..StyleConfig::default()
                },
                style_content: StyleConfig {
                    color: COLOR_WARNING,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_error:   OutputConfig {
                description: "Error:".into(),
                style_description: StyleConfig {
                    color: COLOR_ERROR,
                    bold: true,
                    ..StyleConfig::default()
                },
                style_content: StyleConfig {
                    color: COLOR_ERROR,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_header:  OutputConfig {
                style_content: StyleConfig {
                    color: COLOR_HEADER,
                    bold: true,
                    ..StyleConfig::default()
                },
                ..OutputConfig::default()
            },
            output_row:     OutputConfig::default(),
        }
    }
}
