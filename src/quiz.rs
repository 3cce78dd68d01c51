use log::{debug, info, warn};

use snafu::{prelude::*, ErrorCompat, Snafu};
use vark_scoring::*;

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::quiz::config_reader::*;
use crate::quiz::report::ReportLayout;

pub mod chart;
pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
mod io_responses;
mod prompt;
pub mod report;

#[derive(Debug, Snafu)]
pub enum VarkError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {sheet} not found in {path}"))]
    MissingWorksheet { sheet: String, path: String },
    #[snafu(display("Table {table} is empty"))]
    EmptyTable { table: String },
    #[snafu(display("Table {table}: cannot find the column {column} in the header"))]
    MissingColumn { table: String, column: String },
    #[snafu(display("Table {table}, line {lineno}: cannot understand the cell {content}"))]
    WrongCellType {
        table: String,
        lineno: u64,
        content: String,
    },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing a line of file {path}"))]
    CsvLineParse { source: csv::Error, path: String },
    #[snafu(display("The csv input type requires the answers table (--answers-input or answersFilePath)"))]
    NoAnswersSource {},
    #[snafu(display("Cannot find the answers table {path}"))]
    MissingAnswersTable { source: csv::Error, path: String },
    #[snafu(display("Error reading file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON content"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("The questions could not be loaded"))]
    InvalidQuestionBank { source: DataFormatError },
    #[snafu(display("The responses were not accepted"))]
    InvalidResponses { source: ValidationError },
    #[snafu(display("Question {question_id}: unknown category {tag:?} (expected V, A, R or K)"))]
    ResponseWrongTag { question_id: String, tag: String },
    #[snafu(display("Error reading from the terminal"))]
    Terminal { source: std::io::Error },
    #[snafu(display("Cannot build a report without the name of the participant"))]
    ReportEmptyName {},
    #[snafu(display("The chart is not a valid PNG image"))]
    ChartDecoding { source: png::DecodingError },
    #[snafu(display("Unsupported chart image: {message}"))]
    ChartUnsupported { message: String },
    #[snafu(display("Error encoding the chart"))]
    ChartEncoding { source: png::EncodingError },
    #[snafu(display("Cannot draw a chart of size {width}x{height}"))]
    ChartCanvas { width: u32, height: u32 },
    #[snafu(display("Error drawing the chart labels"))]
    ChartLabels { source: usvg::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Missing parent directory"))]
    MissingParentDir {},
    #[snafu(display("The summary differs from the reference summary {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type VarkResult<T> = Result<T, VarkError>;

/// The summary destination that prints to the standard output.
pub const STDOUT_SUMMARY: &str = "stdout";

/// The families of failures, following how they can be recovered.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ErrorKind {
    /// The questions source is malformed. Only the operator can fix it.
    DataFormat,
    /// The participant has to fix the name or the answers and submit again.
    Validation,
    /// The chart or the report could not be produced. The tally is still valid.
    Render,
    /// The options or the configuration file are invalid.
    Config,
    Io,
    /// The result differs from the expected reference summary.
    Mismatch,
}

impl VarkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VarkError::MissingWorksheet { .. }
            | VarkError::EmptyTable { .. }
            | VarkError::MissingColumn { .. }
            | VarkError::WrongCellType { .. }
            | VarkError::CsvLineParse { .. }
            | VarkError::NoAnswersSource {}
            | VarkError::MissingAnswersTable { .. }
            | VarkError::InvalidQuestionBank { .. } => ErrorKind::DataFormat,
            VarkError::InvalidResponses { .. } | VarkError::ResponseWrongTag { .. } => {
                ErrorKind::Validation
            }
            VarkError::ReportEmptyName {}
            | VarkError::ChartDecoding { .. }
            | VarkError::ChartUnsupported { .. }
            | VarkError::ChartEncoding { .. }
            | VarkError::ChartCanvas { .. }
            | VarkError::ChartLabels { .. } => ErrorKind::Render,
            VarkError::ParsingJson { .. } | VarkError::Whatever { .. } => ErrorKind::Config,
            VarkError::OpeningExcel { .. }
            | VarkError::CsvOpen { .. }
            | VarkError::OpeningJson { .. }
            | VarkError::Terminal { .. }
            | VarkError::WritingOutput { .. }
            | VarkError::MissingParentDir {} => ErrorKind::Io,
            VarkError::ReferenceMismatch { .. } => ErrorKind::Mismatch,
        }
    }
}

/// The settings of one run, once the configuration file and the command line
/// have been merged.
#[derive(PartialEq, Debug, Clone)]
pub struct QuizSettings {
    pub source: SourceSettings,
    pub rules: LoadRules,
    pub seed: Option<u64>,
    /// Explicit report path, or a directory to place the report in.
    pub out: Option<String>,
    pub output_directory: String,
    pub embed_name_in_file_name: bool,
    pub chart_path: Option<String>,
    pub summary_path: Option<String>,
    pub reference_path: Option<String>,
    pub layout: ReportLayout,
}

/// What a completed run produced.
#[derive(PartialEq, Debug, Clone)]
pub struct QuizOutcome {
    pub name: String,
    pub tally: ScoreTally,
    pub report_path: String,
    pub summary: JSValue,
}

pub fn resolve_settings(args: &Args) -> VarkResult<QuizSettings> {
    let (config, root_p): (QuizConfig, PathBuf) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root_p)
        }
        None => (QuizConfig::default(), PathBuf::new()),
    };
    info!("config: {:?}", config);

    // Paths from the command line are taken as is, paths from the
    // configuration file are relative to it.
    let mut source = config.question_source.resolve(&root_p)?;
    if let Some(input_type) = &args.input_type {
        source.provider = Provider::parse(input_type)?;
    }
    if let Some(input) = &args.input {
        source.questions_path = input.clone();
    }
    if let Some(answers_input) = &args.answers_input {
        source.answers_path = Some(answers_input.clone());
    }

    let mut rules = config.rules.load_rules()?;
    if args.shuffle {
        rules.shuffle_questions = true;
        rules.shuffle_options = true;
    }
    let seed = match args.seed {
        Some(s) => Some(s),
        None => config.rules.random_seed()?,
    };

    let resolve = |p: &Option<String>| p.as_ref().map(|s| resolve_path(&root_p, s));
    let settings = QuizSettings {
        source,
        rules,
        seed,
        out: args.out.clone(),
        output_directory: resolve(&config.output_settings.output_directory)
            .unwrap_or_else(|| ".".to_string()),
        embed_name_in_file_name: config
            .output_settings
            .embed_name_in_file_name
            .unwrap_or(true),
        chart_path: args
            .chart
            .clone()
            .or_else(|| resolve(&config.output_settings.chart_file_path)),
        summary_path: args.summary.clone().or_else(|| {
            match config.output_settings.summary_file_path.as_deref() {
                Some(STDOUT_SUMMARY) => Some(STDOUT_SUMMARY.to_string()),
                _ => resolve(&config.output_settings.summary_file_path),
            }
        }),
        reference_path: args.reference.clone(),
        layout: config.report.layout(),
    };
    debug!("resolve_settings: {:?}", settings);
    Ok(settings)
}

/// Reads the two source tables, without validating their content.
pub fn read_question_tables(
    source: &SourceSettings,
) -> VarkResult<(Vec<QuestionRow>, Vec<AnswerRow>)> {
    info!("Attempting to read questions from {:?}", source.questions_path);
    match source.provider {
        Provider::Excel => io_excel::read_excel_tables(
            &source.questions_path,
            &source.questions_sheet,
            &source.answers_sheet,
        ),
        Provider::Csv => {
            let answers_path = source
                .answers_path
                .clone()
                .context(NoAnswersSourceSnafu {})?;
            io_csv::read_csv_tables(&source.questions_path, &answers_path)
        }
    }
}

/// Loads the question bank of a new session.
///
/// Without a seed, every call draws a new order when shuffling is enabled.
pub fn load_question_bank(
    source: &SourceSettings,
    rules: &LoadRules,
    seed: Option<u64>,
) -> VarkResult<QuestionBank> {
    let (questions, answers) = read_question_tables(source)?;
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    assemble_question_bank(&questions, &answers, rules, &mut rng)
        .context(InvalidQuestionBankSnafu {})
}

pub fn build_summary_js(name: &str, tally: &ScoreTally) -> JSValue {
    let results: Vec<JSValue> = tally
        .proportions()
        .iter()
        .map(|(category, pct)| {
            json!({
                "category": category.label(),
                "tag": category.tag(),
                "count": tally.count(*category),
                "percentage": format!("{:.1}", pct),
            })
        })
        .collect();
    let dominant: Vec<&str> = tally.dominant().iter().map(|c| c.label()).collect();
    json!({
        "participant": name,
        "total": tally.total(),
        "results": results,
        "dominant": dominant,
    })
}

pub fn read_summary(path: &str) -> VarkResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn resolve_path(root_p: &Path, p: &str) -> String {
    let full: PathBuf = [root_p, Path::new(p)].iter().collect();
    full.as_path().display().to_string()
}

// An explicit .pdf path is used as is, anything else is a directory.
fn report_destination(settings: &QuizSettings, name: &str) -> String {
    let file_name = report::report_file_name(name, settings.embed_name_in_file_name);
    let dir = match &settings.out {
        Some(out) if out.to_lowercase().ends_with(".pdf") => return out.clone(),
        Some(out) => out.clone(),
        None => settings.output_directory.clone(),
    };
    resolve_path(Path::new(dir.as_str()), &file_name)
}

fn write_file(path: &str, data: &[u8]) -> VarkResult<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingOutputSnafu { path })?;
        }
    }
    fs::write(path, data).context(WritingOutputSnafu { path })
}

/// Runs a whole session: loading, answering, scoring and the report.
///
/// The answers are read from the responses file when one is given, and from
/// `input` otherwise.
pub fn run_quiz<R: BufRead, W: Write>(
    args: &Args,
    input: &mut R,
    output: &mut W,
) -> VarkResult<QuizOutcome> {
    let settings = resolve_settings(args)?;
    let bank = load_question_bank(&settings.source, &settings.rules, settings.seed)?;
    let mut session = QuizSession::new(bank);

    if let Some(name) = &args.name {
        session.set_name(name).context(InvalidResponsesSnafu {})?;
    }

    let tally: ScoreTally = match &args.responses {
        Some(responses_path) => {
            let responses = io_responses::read_responses(responses_path)?;
            io_responses::apply_responses(&mut session, &responses)?;
            if !session.is_complete() {
                warn!("run_quiz: no response for {:?}", session.unanswered());
            }
            *session.submit().context(InvalidResponsesSnafu {})?
        }
        None => prompt::run_prompt(&mut session, input, output)?,
    };
    let name = session.name().to_string();
    info!("run_quiz: {:?} -> {:?}", name, tally);

    let chart_png = chart::render_chart(&tally, &chart::ChartStyle::default())?;
    if let Some(chart_path) = &settings.chart_path {
        write_file(chart_path, &chart_png)?;
        info!("Chart written to {:?}", chart_path);
    }

    let pdf = report::build_report(&name, &tally, &chart_png, &settings.layout)?;
    let report_path = report_destination(&settings, &name);
    write_file(&report_path, &pdf)?;
    info!(
        "Report written to {:?} ({} bytes, {})",
        report_path,
        pdf.len(),
        report::REPORT_MIME_TYPE
    );

    let summary = build_summary_js(&name, &tally);
    let pretty_js_summary =
        serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
    match settings.summary_path.as_deref() {
        Some(STDOUT_SUMMARY) => {
            writeln!(output, "{}", pretty_js_summary).context(TerminalSnafu {})?;
        }
        Some(summary_path) => {
            write_file(summary_path, pretty_js_summary.as_bytes())?;
        }
        None => {}
    }

    // The reference summary, if provided for comparison
    if let Some(reference_path) = &settings.reference_path {
        let summary_ref = read_summary(reference_path)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_summary {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_summary.as_ref(),
                "\n",
            );
            return ReferenceMismatchSnafu {
                path: reference_path.as_str(),
            }
            .fail();
        }
    }

    Ok(QuizOutcome {
        name,
        tally,
        report_path,
        summary,
    })
}

pub fn report_error(e: &VarkError) {
    let headline = match e.kind() {
        ErrorKind::DataFormat => "The questions could not be loaded",
        ErrorKind::Validation => "The answers were not accepted",
        ErrorKind::Render => "The report could not be generated",
        ErrorKind::Config => "Invalid configuration",
        ErrorKind::Io => "Input/output error",
        ErrorKind::Mismatch => "The result does not match the reference",
    };
    eprintln!("{}: {}", headline, e);
    let mut source = std::error::Error::source(e);
    while let Some(s) = source {
        eprintln!("  caused by: {}", s);
        source = std::error::Error::source(s);
    }
    if let Some(bt) = ErrorCompat::backtrace(e) {
        eprintln!("trace: {}", bt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Cursor;

    fn test_data(p: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), p)
    }

    fn scratch_dir(test_name: &str) -> String {
        let p = std::env::temp_dir().join(format!(
            "varkquiz-{}-{}",
            test_name,
            std::process::id()
        ));
        p.as_path().display().to_string()
    }

    fn run(cmd: &[&str], input: &str) -> (VarkResult<QuizOutcome>, String) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut args_v = vec!["varkquiz"];
        args_v.extend_from_slice(cmd);
        let args = Args::parse_from(args_v);
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut output: Vec<u8> = Vec::new();
        let res = run_quiz(&args, &mut input, &mut output);
        (res, String::from_utf8(output).unwrap())
    }

    #[test]
    fn excel_with_responses_file() {
        let out = scratch_dir("excel_with_responses_file");
        let (res, _) = run(
            &[
                "-i",
                &test_data("vark_questions.xlsx"),
                "--name",
                "Budi Santoso",
                "--responses",
                &test_data("responses.json"),
                "--out",
                &out,
                "--reference",
                &test_data("expected_summary.json"),
            ],
            "",
        );
        let outcome = res.unwrap();
        assert_eq!(outcome.tally.count(Category::Visual), 2);
        assert_eq!(outcome.tally.count(Category::Auditory), 1);
        assert_eq!(outcome.tally.count(Category::ReadingWriting), 0);
        assert_eq!(outcome.tally.count(Category::Kinesthetic), 1);
        assert!(outcome.report_path.ends_with("hasil_vark_Budi_Santoso.pdf"));
        let pdf = fs::read(&outcome.report_path).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn csv_matches_excel() {
        let (q1, a1) = read_question_tables(&SourceSettings {
            provider: Provider::Excel,
            questions_path: test_data("vark_questions.xlsx"),
            answers_path: None,
            questions_sheet: "Questions".to_string(),
            answers_sheet: "Answers".to_string(),
        })
        .unwrap();
        let (q2, a2) = read_question_tables(&SourceSettings {
            provider: Provider::Csv,
            questions_path: test_data("csv/questions.csv"),
            answers_path: Some(test_data("csv/answers.csv")),
            questions_sheet: "Questions".to_string(),
            answers_sheet: "Answers".to_string(),
        })
        .unwrap();
        assert_eq!(q1, q2);
        assert_eq!(a1, a2);
        assert_eq!(q1.len(), 4);
        assert_eq!(a1.len(), 16);
    }

    #[test]
    fn interactive_session() {
        let out = scratch_dir("interactive_session");
        // Empty name first, then an invalid choice, then four answers.
        let input = "\nSari\n9\n3\n3\n1\n4\n";
        let (res, transcript) = run(
            &[
                "-c",
                &test_data("config.json"),
                "--out",
                &out,
                "--summary",
                "stdout",
            ],
            input,
        );
        let outcome = res.unwrap();
        assert_eq!(outcome.name, "Sari");
        assert_eq!(outcome.tally.total(), 4);
        assert!(transcript.contains("Hasil Anda"));
        assert!(transcript.contains("\"participant\": \"Sari\""));
        assert!(outcome.report_path.ends_with("hasil_vark_Sari.pdf"));
    }

    #[test]
    fn config_seed_gives_stable_order() {
        let config_path = test_data("config.json");
        let args = Args::parse_from(["varkquiz", "-c", config_path.as_str()]);
        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.seed, Some(2024));
        assert!(settings.rules.shuffle_questions);
        let b1 = load_question_bank(&settings.source, &settings.rules, settings.seed).unwrap();
        let b2 = load_question_bank(&settings.source, &settings.rules, settings.seed).unwrap();
        assert_eq!(b1, b2);
    }

    #[test]
    fn config_paths_are_relative_to_the_config_file() {
        let config_path = test_data("nested/config.json");
        let args = Args::parse_from(["varkquiz", "-c", config_path.as_str()]);
        let settings = resolve_settings(&args).unwrap();
        let nested = Path::new(&config_path).parent().unwrap().to_path_buf();
        assert_eq!(
            Path::new(&settings.source.questions_path),
            nested.join("../vark_questions.xlsx")
        );
        assert_eq!(
            Path::new(&settings.output_directory),
            nested.join("reports")
        );
        assert_eq!(
            settings.chart_path.as_deref().map(Path::new),
            Some(nested.join("chart.png").as_path())
        );
        assert_eq!(
            settings.summary_path.as_deref().map(Path::new),
            Some(nested.join("summary.json").as_path())
        );

        // The standard output is not a path.
        let args = Args::parse_from(["varkquiz", "-c", config_path.as_str(), "-s", "stdout"]);
        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.summary_path.as_deref(), Some(STDOUT_SUMMARY));
    }

    #[test]
    fn reference_mismatch() {
        let out = scratch_dir("reference_mismatch");
        let (res, _) = run(
            &[
                "-i",
                &test_data("vark_questions.xlsx"),
                "--name",
                "Budi",
                "--responses",
                &test_data("responses.json"),
                "--out",
                &out,
                "--reference",
                &test_data("expected_summary.json"),
            ],
            "",
        );
        let err = res.unwrap_err();
        assert!(matches!(err, VarkError::ReferenceMismatch { .. }));
        assert_eq!(err.kind(), ErrorKind::Mismatch);
    }

    #[test]
    fn csv_without_answers_table() {
        let (res, _) = run(
            &["-i", &test_data("csv/questions.csv"), "--input-type", "csv"],
            "",
        );
        let err = res.unwrap_err();
        assert!(matches!(err, VarkError::NoAnswersSource {}));
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn missing_name_is_a_validation_error() {
        let out = scratch_dir("missing_name");
        let _ = fs::remove_dir_all(&out);
        let (res, _) = run(
            &[
                "-i",
                &test_data("vark_questions.xlsx"),
                "--responses",
                &test_data("responses.json"),
                "--out",
                &out,
            ],
            "",
        );
        let err = res.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            err,
            VarkError::InvalidResponses {
                source: ValidationError::EmptyName
            }
        ));
        // No document is produced.
        assert!(!Path::new(&out).exists());
    }

    #[test]
    fn incomplete_responses_are_rejected() {
        let (res, _) = run(
            &[
                "-i",
                &test_data("vark_questions.xlsx"),
                "--name",
                "Budi",
                "--responses",
                &test_data("responses_incomplete.json"),
            ],
            "",
        );
        let err = res.unwrap_err();
        assert!(matches!(
            err,
            VarkError::InvalidResponses {
                source: ValidationError::MissingResponse(_)
            }
        ));
    }

    #[test]
    fn missing_answers_sheet() {
        let (res, _) = run(&["-i", &test_data("missing_answers.xlsx"), "-n", "Budi"], "");
        let err = res.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
        assert!(matches!(err, VarkError::MissingWorksheet { sheet, .. } if sheet == "Answers"));
    }

    #[test]
    fn missing_category_in_csv() {
        let (res, _) = run(
            &[
                "-i",
                &test_data("csv/questions.csv"),
                "--input-type",
                "csv",
                "--answers-input",
                &test_data("csv/answers_missing_k.csv"),
            ],
            "",
        );
        let err = res.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
        assert!(matches!(
            err,
            VarkError::InvalidQuestionBank {
                source: DataFormatError::MissingCategory {
                    category: Category::Kinesthetic,
                    ..
                }
            }
        ));
    }

    #[test]
    fn summary_content() {
        let tally = ScoreTally::EMPTY
            .with_count(Category::Visual, 1)
            .with_count(Category::Kinesthetic, 3);
        let js = build_summary_js("Budi", &tally);
        assert_eq!(js["total"], json!(4));
        assert_eq!(js["results"][3]["percentage"], json!("75.0"));
        assert_eq!(js["results"][1]["count"], json!(0));
        assert_eq!(js["dominant"], json!(["Kinesthetic"]));
    }
}
