use crate::quiz::report::ReportLayout;
use crate::quiz::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

pub const DEFAULT_QUESTIONS_FILE: &str = "vark_questions.xlsx";
pub const DEFAULT_QUESTIONS_SHEET: &str = "Questions";
pub const DEFAULT_ANSWERS_SHEET: &str = "Answers";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionSource {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "answersFilePath")]
    pub answers_file_path: Option<String>,
    #[serde(rename = "questionsSheet")]
    pub questions_sheet: Option<String>,
    #[serde(rename = "answersSheet")]
    pub answers_sheet: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizRules {
    #[serde(rename = "shuffleQuestions")]
    pub shuffle_questions: Option<bool>,
    #[serde(rename = "shuffleOptions")]
    pub shuffle_options: Option<bool>,
    #[serde(rename = "randomSeed")]
    _random_seed: Option<JSValue>,
    #[serde(rename = "orphanPolicy")]
    pub orphan_policy: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "embedNameInFileName")]
    pub embed_name_in_file_name: Option<bool>,
    #[serde(rename = "chartFilePath")]
    pub chart_file_path: Option<String>,
    #[serde(rename = "summaryFilePath")]
    pub summary_file_path: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSettings {
    pub title: Option<String>,
    #[serde(rename = "fontSize")]
    pub font_size: Option<f64>,
    #[serde(rename = "imageX")]
    pub image_x: Option<f64>,
    #[serde(rename = "imageWidth")]
    pub image_width: Option<f64>,
}

impl ReportSettings {
    pub fn layout(&self) -> ReportLayout {
        let default = ReportLayout::default();
        ReportLayout {
            title: self.title.clone().unwrap_or(default.title),
            font_size: self.font_size.unwrap_or(default.font_size),
            image_x_mm: self.image_x.unwrap_or(default.image_x_mm),
            image_width_mm: self.image_width.unwrap_or(default.image_width_mm),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizConfig {
    #[serde(rename = "questionSource", default)]
    pub question_source: QuestionSource,
    #[serde(default)]
    pub rules: QuizRules,
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(default)]
    pub report: ReportSettings,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    Excel,
    Csv,
}

impl Provider {
    pub fn parse(s: &str) -> VarkResult<Provider> {
        match s {
            "excel" | "xlsx" => Ok(Provider::Excel),
            "csv" => Ok(Provider::Csv),
            x => whatever!("Provider not implemented {:?}", x),
        }
    }
}

/// Where and how to read the two source tables.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SourceSettings {
    pub provider: Provider,
    pub questions_path: String,
    /// Only for the csv provider.
    pub answers_path: Option<String>,
    /// Only for the excel provider.
    pub questions_sheet: String,
    pub answers_sheet: String,
}

impl QuestionSource {
    pub fn resolve(&self, root_p: &Path) -> VarkResult<SourceSettings> {
        let provider = match &self.provider {
            Some(p) => Provider::parse(p)?,
            None => Provider::Excel,
        };
        let questions_path = self
            .file_path
            .clone()
            .unwrap_or_else(|| DEFAULT_QUESTIONS_FILE.to_string());
        Ok(SourceSettings {
            provider,
            questions_path: resolve_path(root_p, &questions_path),
            answers_path: self
                .answers_file_path
                .as_ref()
                .map(|p| resolve_path(root_p, p)),
            questions_sheet: self
                .questions_sheet
                .clone()
                .unwrap_or_else(|| DEFAULT_QUESTIONS_SHEET.to_string()),
            answers_sheet: self
                .answers_sheet
                .clone()
                .unwrap_or_else(|| DEFAULT_ANSWERS_SHEET.to_string()),
        })
    }
}

impl QuizRules {
    pub fn load_rules(&self) -> VarkResult<LoadRules> {
        let orphan_policy = match self.orphan_policy.as_deref() {
            None | Some("reject") => OrphanPolicy::Reject,
            Some("skip") => OrphanPolicy::Skip,
            Some(x) => whatever!("unknown orphan policy: {}", x),
        };
        Ok(LoadRules {
            shuffle_questions: self.shuffle_questions.unwrap_or(false),
            shuffle_options: self.shuffle_options.unwrap_or(false),
            orphan_policy,
        })
    }

    /// The seed may be written as a number or as a string.
    pub fn random_seed(&self) -> VarkResult<Option<u64>> {
        match &self._random_seed {
            None | Some(JSValue::Null) => Ok(None),
            Some(JSValue::Number(n)) => match n.as_u64() {
                Some(x) => Ok(Some(x)),
                None => whatever!("randomSeed must be a non-negative integer: {}", n),
            },
            Some(JSValue::String(s)) => match s.trim().parse::<u64>() {
                Ok(x) => Ok(Some(x)),
                Err(_) => whatever!("randomSeed must be a non-negative integer: {:?}", s),
            },
            Some(x) => whatever!("Cannot understand randomSeed {:?}", x),
        }
    }
}

pub fn read_config(path: &str) -> VarkResult<QuizConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_config: {:?}", contents);
    let config: QuizConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> QuizConfig {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("{}");
        let source = config.question_source.resolve(Path::new("")).unwrap();
        assert_eq!(source.provider, Provider::Excel);
        assert_eq!(source.questions_path, "vark_questions.xlsx");
        assert_eq!(source.questions_sheet, "Questions");
        assert_eq!(source.answers_sheet, "Answers");
        assert_eq!(config.rules.load_rules().unwrap(), LoadRules::DEFAULT_RULES);
        assert_eq!(config.rules.random_seed().unwrap(), None);
        assert_eq!(config.report.layout(), ReportLayout::default());
    }

    #[test]
    fn paths_are_relative_to_the_config() {
        let config = parse(
            r#"{"questionSource": {"provider": "csv", "filePath": "q.csv", "answersFilePath": "a.csv"}}"#,
        );
        let source = config.question_source.resolve(Path::new("data")).unwrap();
        assert_eq!(source.provider, Provider::Csv);
        assert_eq!(
            Path::new(source.questions_path.as_str()),
            Path::new("data/q.csv")
        );
        assert_eq!(
            source.answers_path.as_deref().map(Path::new),
            Some(Path::new("data/a.csv"))
        );
    }

    #[test]
    fn seed_as_number_or_string() {
        let config = parse(r#"{"rules": {"randomSeed": 7}}"#);
        assert_eq!(config.rules.random_seed().unwrap(), Some(7));
        let config = parse(r#"{"rules": {"randomSeed": "42"}}"#);
        assert_eq!(config.rules.random_seed().unwrap(), Some(42));
        let config = parse(r#"{"rules": {"randomSeed": "abc"}}"#);
        assert!(config.rules.random_seed().is_err());
    }

    #[test]
    fn rules_and_layout() {
        let config = parse(
            r#"{"rules": {"shuffleQuestions": true, "orphanPolicy": "skip"},
                "report": {"title": "VARK", "imageWidth": 120}}"#,
        );
        let rules = config.rules.load_rules().unwrap();
        assert!(rules.shuffle_questions);
        assert!(!rules.shuffle_options);
        assert_eq!(rules.orphan_policy, OrphanPolicy::Skip);
        let layout = config.report.layout();
        assert_eq!(layout.title, "VARK");
        assert_eq!(layout.image_width_mm, 120.0);
        assert_eq!(layout.image_x_mm, 30.0);

        let config = parse(r#"{"rules": {"orphanPolicy": "maybe"}}"#);
        assert_eq!(config.rules.load_rules().unwrap_err().kind(), ErrorKind::Config);
    }
}
