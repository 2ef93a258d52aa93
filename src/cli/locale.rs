//! Operator-facing messages in English and Russian.

use crate::config::EnvConfig;
use crate::pipeline::{EntryPoint, Stage};
use clap::ValueEnum;
use std::path::Path;

/// Message language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Locale {
    /// English
    #[default]
    En,
    /// Russian
    Ru,
}

impl Locale {
    /// Parse `en`, `ru`, or a POSIX locale such as `ru_RU.UTF-8`
    pub fn parse(value: &str) -> Option<Self> {
        let lang = value
            .trim()
            .split(['_', '-', '.'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match lang.as_str() {
            "en" => Some(Locale::En),
            "ru" => Some(Locale::Ru),
            _ => None,
        }
    }

    /// Pick the language: `--lang`, then `release.toml`, then the environment
    pub fn detect(flag: Option<Locale>, configured: Option<&str>, env: &EnvConfig) -> Self {
        flag.or_else(|| configured.and_then(Self::parse))
            .or_else(|| env.language_hint().as_deref().and_then(Self::parse))
            .unwrap_or_default()
    }

    /// Title of a numbered progress line
    pub fn stage_title(self, stage: Stage) -> &'static str {
        match (self, stage) {
            (Locale::En, Stage::Provision) => "Preparing the build environment",
            (Locale::En, Stage::Install) => "Installing dependencies",
            (Locale::En, Stage::Package) => "Building the executable",
            (Locale::En, Stage::Publish) => "Publishing",
            (Locale::Ru, Stage::Provision) => "Подготовка окружения сборки",
            (Locale::Ru, Stage::Install) => "Установка зависимостей",
            (Locale::Ru, Stage::Package) => "Сборка исполняемого файла",
            (Locale::Ru, Stage::Publish) => "Публикация",
        }
    }

    /// Final `[4/4]` line of an interactive build
    pub fn done(self) -> &'static str {
        match self {
            Locale::En => "Done",
            Locale::Ru => "Готово",
        }
    }

    /// Note for a stage whose previous result was reused
    pub fn reused(self) -> &'static str {
        match self {
            Locale::En => "up to date, reused",
            Locale::Ru => "актуально, используется повторно",
        }
    }

    /// Success banner naming the artifact
    pub fn artifact_ready(self, executable: &Path) -> String {
        match self {
            Locale::En => format!("Build complete: {}", executable.display()),
            Locale::Ru => format!("Сборка завершена: {}", executable.display()),
        }
    }

    /// Error banner for a failed run
    pub fn failure_banner(self, stage: Option<Stage>) -> String {
        match (self, stage) {
            (Locale::En, Some(Stage::Publish)) => {
                "PUBLISH FAILED: the executable was built, the release was not updated".to_string()
            }
            (Locale::Ru, Some(Stage::Publish)) => {
                "ОШИБКА ПУБЛИКАЦИИ: исполняемый файл собран, релиз не обновлён".to_string()
            }
            (Locale::En, Some(stage)) => format!(
                "BUILD FAILED at step {} ({})",
                stage.number(),
                self.stage_title(stage)
            ),
            (Locale::En, None) => "BUILD FAILED: the project is not ready to build".to_string(),
            (Locale::Ru, Some(stage)) => format!(
                "ОШИБКА СБОРКИ на шаге {} ({})",
                stage.number(),
                self.stage_title(stage)
            ),
            (Locale::Ru, None) => "ОШИБКА СБОРКИ: проект не готов к сборке".to_string(),
        }
    }

    /// Header above the failed command's last output lines
    pub fn output_tail_header(self) -> &'static str {
        match self {
            Locale::En => "Last output of the failed command:",
            Locale::Ru => "Последний вывод команды:",
        }
    }

    /// Header of the recovery suggestions
    pub fn suggestions_header(self) -> &'static str {
        match self {
            Locale::En => "💡 Recovery suggestions:",
            Locale::Ru => "💡 Что можно сделать:",
        }
    }

    /// Pause prompt for the calling shell
    pub fn pause_prompt(self, entry: EntryPoint) -> &'static str {
        match (self, entry) {
            (Locale::En, EntryPoint::Cmd) => "Press Enter to close this window...",
            (Locale::En, _) => "Press Enter to continue...",
            (Locale::Ru, EntryPoint::Cmd) => "Нажмите Enter, чтобы закрыть окно...",
            (Locale::Ru, _) => "Нажмите Enter для продолжения...",
        }
    }
}
