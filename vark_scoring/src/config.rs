// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// The four learning-style categories of the VARK questionnaire.
///
/// The declaration order is the canonical order used for tallies, reports
/// and charts.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Category {
    Visual,
    Auditory,
    ReadingWriting,
    Kinesthetic,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Visual,
        Category::Auditory,
        Category::ReadingWriting,
        Category::Kinesthetic,
    ];

    /// Parses the one-letter tag found in the `vark_type` column.
    /// Surrounding whitespace and case are ignored.
    pub fn from_tag(tag: &str) -> Option<Category> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "V" => Some(Category::Visual),
            "A" => Some(Category::Auditory),
            "R" => Some(Category::ReadingWriting),
            "K" => Some(Category::Kinesthetic),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Category::Visual => "V",
            Category::Auditory => "A",
            Category::ReadingWriting => "R",
            Category::Kinesthetic => "K",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Visual => "Visual",
            Category::Auditory => "Auditory",
            Category::ReadingWriting => "Reading/Writing",
            Category::Kinesthetic => "Kinesthetic",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Category::Visual => 0,
            Category::Auditory => 1,
            Category::ReadingWriting => 2,
            Category::Kinesthetic => 3,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The identifier of a question, as written in the source tables.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn new(id: &str) -> QuestionId {
        QuestionId(id.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for QuestionId {
    fn from(id: &str) -> QuestionId {
        QuestionId::new(id)
    }
}

impl Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of the questions table, as parsed by the readers.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionRow {
    pub id: String,
    pub text: String,
}

/// A row of the answers table, as parsed by the readers.
/// The tag is kept verbatim and only checked when the bank is assembled.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnswerRow {
    pub question_id: String,
    pub tag: String,
    pub text: String,
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnswerOption {
    pub category: Category,
    pub text: String,
}

/// A question with its options, in display order.
///
/// Invariant: exactly one option per category.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<AnswerOption>,
}

impl QuestionRecord {
    pub fn option(&self, index: usize) -> Option<&AnswerOption> {
        self.options.get(index)
    }

    pub fn option_text(&self, category: Category) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.category == category)
            .map(|o| o.text.as_str())
    }
}

/// The ordered questions of one session. The order is fixed once the bank
/// has been assembled.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<QuestionRecord>,
}

impl QuestionBank {
    pub(crate) fn new(questions: Vec<QuestionRecord>) -> QuestionBank {
        QuestionBank { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QuestionRecord> {
        self.questions.iter()
    }

    pub fn get(&self, id: &QuestionId) -> Option<&QuestionRecord> {
        self.questions.iter().find(|q| q.id == *id)
    }

    pub fn ids(&self) -> Vec<QuestionId> {
        self.questions.iter().map(|q| q.id.clone()).collect()
    }
}

/// The selected category for each answered question.
pub type ResponseMap = BTreeMap<QuestionId, Category>;

/// Number of selections per category.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Hash)]
pub struct ScoreTally {
    counts: [u64; 4],
}

impl ScoreTally {
    pub const EMPTY: ScoreTally = ScoreTally { counts: [0; 4] };

    /// Returns a copy of this tally with the count of one category replaced.
    pub fn with_count(mut self, category: Category, count: u64) -> ScoreTally {
        self.counts[category.index()] = count;
        self
    }

    pub(crate) fn increment(&mut self, category: Category) {
        self.counts[category.index()] += 1;
    }

    pub fn count(&self, category: Category) -> u64 {
        self.counts[category.index()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// The counts in canonical category order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u64)> + '_ {
        Category::ALL.iter().map(move |c| (*c, self.count(*c)))
    }

    /// The share of each category, in percent. All zeros for an empty tally.
    pub fn proportions(&self) -> Vec<(Category, f64)> {
        let total = self.total();
        self.iter()
            .map(|(c, n)| {
                let pct = if total == 0 {
                    0.0
                } else {
                    (n as f64) * 100.0 / (total as f64)
                };
                (c, pct)
            })
            .collect()
    }

    /// The categories sharing the highest count, in canonical order.
    /// Empty when nothing has been counted.
    pub fn dominant(&self) -> Vec<Category> {
        let max = self.counts.iter().cloned().max().unwrap_or(0);
        if max == 0 {
            return vec![];
        }
        self.iter()
            .filter_map(|(c, n)| if n == max { Some(c) } else { None })
            .collect()
    }
}

/// Errors detected while assembling a question bank from the source tables.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum DataFormatError {
    /// No question survived the join.
    EmptyBank,
    DuplicateQuestion(QuestionId),
    UnknownCategory { question_id: QuestionId, tag: String },
    /// A question without any answer row.
    NoOptions(QuestionId),
    DuplicateCategory {
        question_id: QuestionId,
        category: Category,
    },
    MissingCategory {
        question_id: QuestionId,
        category: Category,
    },
    /// Answer rows referencing a question that does not exist.
    OrphanedAnswer(QuestionId),
}

impl Error for DataFormatError {}

impl Display for DataFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormatError::EmptyBank => write!(f, "the question bank is empty"),
            DataFormatError::DuplicateQuestion(qid) => {
                write!(f, "question {} is defined more than once", qid)
            }
            DataFormatError::UnknownCategory { question_id, tag } => write!(
                f,
                "question {}: unknown category tag {:?} (expected one of V, A, R, K)",
                question_id, tag
            ),
            DataFormatError::NoOptions(qid) => write!(f, "question {} has no answers", qid),
            DataFormatError::DuplicateCategory {
                question_id,
                category,
            } => write!(
                f,
                "question {} has more than one answer for category {}",
                question_id, category
            ),
            DataFormatError::MissingCategory {
                question_id,
                category,
            } => write!(
                f,
                "question {} has no answer for category {}",
                question_id, category
            ),
            DataFormatError::OrphanedAnswer(qid) => write!(
                f,
                "answers reference question {} which is not in the questions table",
                qid
            ),
        }
    }
}

/// Errors that reject an answer or a submission. The session is left
/// untouched when one of them is returned.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ValidationError {
    EmptyName,
    MissingResponse(QuestionId),
    UnknownQuestion(QuestionId),
    OptionOutOfRange {
        question_id: QuestionId,
        index: usize,
        num_options: usize,
    },
    AlreadySubmitted,
}

impl Error for ValidationError {}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyName => write!(f, "the participant name is empty"),
            ValidationError::MissingResponse(qid) => {
                write!(f, "question {} has not been answered", qid)
            }
            ValidationError::UnknownQuestion(qid) => write!(f, "unknown question {}", qid),
            ValidationError::OptionOutOfRange {
                question_id,
                index,
                num_options,
            } => write!(
                f,
                "question {}: option {} does not exist ({} options)",
                question_id, index, num_options
            ),
            ValidationError::AlreadySubmitted => {
                write!(f, "the questionnaire has already been submitted")
            }
        }
    }
}

// ********* Configuration **********

/// What to do with rows that cannot be joined between the two tables.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum OrphanPolicy {
    /// Any orphaned row is a data format error.
    Reject,
    /// Orphaned rows are dropped (inner join).
    Skip,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LoadRules {
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub orphan_policy: OrphanPolicy,
}

impl LoadRules {
    pub const DEFAULT_RULES: LoadRules = LoadRules {
        shuffle_questions: false,
        shuffle_options: false,
        orphan_policy: OrphanPolicy::Reject,
    };

    pub const SHUFFLED_RULES: LoadRules = LoadRules {
        shuffle_questions: true,
        shuffle_options: true,
        orphan_policy: OrphanPolicy::Reject,
    };
}
