use serde_json::Map as JSMap;

use crate::quiz::*;

/// Reads a JSON object mapping question ids to category tags, such as
/// `{"1": "V", "2": "K"}`.
pub fn read_responses(path: &str) -> VarkResult<Vec<(QuestionId, Category)>> {
    info!("Attempting to read responses {:?}", path);
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSMap<String, JSValue> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    parse_responses(&js)
}

fn parse_responses(js: &JSMap<String, JSValue>) -> VarkResult<Vec<(QuestionId, Category)>> {
    let mut res: Vec<(QuestionId, Category)> = Vec::new();
    for (qid, v) in js.iter() {
        let category = match v {
            JSValue::String(tag) => Category::from_tag(tag),
            _ => None,
        }
        .context(ResponseWrongTagSnafu {
            question_id: qid.as_str(),
            tag: v.to_string(),
        })?;
        res.push((QuestionId::new(qid), category));
    }
    debug!("parse_responses: {:?}", res);
    Ok(res)
}

/// Records the responses into the session. The first rejected response stops
/// the process.
pub fn apply_responses(
    session: &mut QuizSession,
    responses: &[(QuestionId, Category)],
) -> VarkResult<()> {
    for (qid, category) in responses.iter() {
        session
            .answer(qid, *category)
            .context(InvalidResponsesSnafu {})?;
    }
    Ok(())
}
