pub use crate::config::*;
use rand::Rng;

/// A builder for assembling a question bank without going through tables.
///
/// ```
/// pub use vark_scoring::builder::Builder;
/// pub use vark_scoring::{Category, LoadRules, QuestionId};
/// # use vark_scoring::DataFormatError;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let mut builder = Builder::new(&LoadRules::DEFAULT_RULES);
/// builder.add_question(
///     "1",
///     "I prefer to learn a new recipe by",
///     &[
///         (Category::Visual, "looking at the pictures"),
///         (Category::Auditory, "asking a friend"),
///         (Category::ReadingWriting, "reading the instructions"),
///         (Category::Kinesthetic, "cooking it right away"),
///     ],
/// );
///
/// let bank = builder.build(&mut StdRng::seed_from_u64(7))?;
/// assert_eq!(bank.len(), 1);
/// # Ok::<(), DataFormatError>(())
/// ```
pub struct Builder {
    pub(crate) _rules: LoadRules,
    pub(crate) _questions: Vec<QuestionRow>,
    pub(crate) _answers: Vec<AnswerRow>,
}

impl Builder {
    pub fn new(rules: &LoadRules) -> Builder {
        Builder {
            _rules: rules.clone(),
            _questions: Vec::new(),
            _answers: Vec::new(),
        }
    }

    /// Adds a question together with its options, in display order.
    ///
    /// Nothing is checked at this point: missing or duplicated categories are
    /// reported by [Builder::build].
    pub fn add_question(&mut self, id: &str, text: &str, options: &[(Category, &str)]) {
        self._questions.push(QuestionRow {
            id: id.to_string(),
            text: text.to_string(),
        });
        for (category, option_text) in options {
            self._answers.push(AnswerRow {
                question_id: id.to_string(),
                tag: category.tag().to_string(),
                text: option_text.to_string(),
            });
        }
    }

    /// Adds raw rows, as they would appear in the source tables.
    pub fn add_rows(&mut self, questions: &[QuestionRow], answers: &[AnswerRow]) {
        self._questions.extend(questions.iter().cloned());
        self._answers.extend(answers.iter().cloned());
    }

    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<QuestionBank, DataFormatError> {
        crate::assemble_question_bank(&self._questions, &self._answers, &self._rules, rng)
    }
}
