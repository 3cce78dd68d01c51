use clap::Parser;

/// This is a self-scoring VARK learning-style questionnaire.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file describing the questions source, the
    /// randomization rules and the report layout. All the other options override the values of
    /// this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The file containing the questions. For the excel input type, the workbook
    /// with the Questions and Answers worksheets. For the csv input type, the questions file.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default excel) The type of the input: excel or csv.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (file path) For the csv input type, the file containing the answers table.
    #[clap(long, value_parser)]
    pub answers_input: Option<String>,

    /// The name of the participant. If not provided, it is asked on the terminal.
    #[clap(short, long, value_parser)]
    pub name: Option<String>,

    /// (file path, optional) A JSON file mapping each question id to the selected category
    /// (V, A, R or K). If not provided, the questions are asked on the terminal.
    #[clap(long, value_parser)]
    pub responses: Option<String>,

    /// (file or directory path) Where to write the PDF report. When a directory is given, the
    /// report is named hasil_vark_<name>.pdf.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, optional) If specified, the chart is also written as a PNG image.
    #[clap(long, value_parser)]
    pub chart: Option<String>,

    /// (file path or 'stdout', optional) If specified, a JSON summary of the result is written
    /// to the given location.
    #[clap(short, long, value_parser)]
    pub summary: Option<String>,

    /// (file path) A reference file containing the expected summary in JSON format. If provided,
    /// varkquiz will check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed as an argument, shuffles the questions and the answers of each question.
    #[clap(long, takes_value = false)]
    pub shuffle: bool,

    /// (integer, optional) The seed for shuffling. The same seed gives the same order.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
