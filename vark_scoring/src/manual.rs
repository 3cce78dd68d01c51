/*!

This is the long-form manual for `vark_scoring` and `varkquiz`.

## The questionnaire

VARK sorts learning preferences into four categories: **V**isual, **A**uditory,
**R**eading/Writing and **K**inesthetic. Every question of the questionnaire offers
exactly one answer per category. The participant picks one answer per question,
and the result is the number of answers picked in each category.

## Input formats

The questions are stored in two tables, joined on the question id:

|  Questions      |                                   |
|-----------------|-----------------------------------|
| `id`            | the question id                   |
| `question_text` | the text shown to the participant |

|  Answers        |                                          |
|-----------------|------------------------------------------|
| `question_id`   | the id of the question                   |
| `vark_type`     | one of `V`, `A`, `R`, `K`                 |
| `answer_text`   | the text of the answer                   |

The columns are found by their name in the first row, so they may appear in any
order and other columns are ignored. Each question needs exactly four answer rows,
one per category.

The following providers are supported:
* `excel` a `.xlsx` workbook with a `Questions` and an `Answers` worksheet. The
 names of the worksheets can be changed in the configuration.
* `csv` two comma-separated files with a header row: the questions file and the
 answers file.

### Rows that do not join

An answer row that references an unknown question, or a question without any
answer, is an error by default (`"orphanPolicy": "reject"`). With
`"orphanPolicy": "skip"`, these rows are dropped and only the questions present
in both tables are asked.

## Randomization

Without shuffling, questions are asked sorted by id: numerically when every id is
an integer, as text otherwise. The order of the questions and the order of the
answers within each question can be shuffled independently (`shuffleQuestions`,
`shuffleOptions`). Without a `randomSeed`, every run draws a new order. With a
seed, the order is the same for every run using that seed, which is useful to
reproduce a session.

## Configuration

```json
{
  "questionSource": {
    "provider": "excel",
    "filePath": "vark_questions.xlsx",
    "questionsSheet": "Questions",
    "answersSheet": "Answers"
  },
  "rules": {
    "shuffleQuestions": true,
    "shuffleOptions": true,
    "randomSeed": "2024",
    "orphanPolicy": "reject"
  },
  "outputSettings": {
    "outputDirectory": "reports",
    "embedNameInFileName": true
  },
  "report": {
    "title": "Hasil Kuisioner VARK",
    "fontSize": 12,
    "imageX": 30,
    "imageWidth": 150
  }
}
```

All the sections are optional. Paths are relative to the configuration file.

## Output

The report is a one-page PDF named `hasil_vark_<name>.pdf`, containing the title
with the name of the participant, the count for each category and a donut chart
of the counts, labelled with each category and its percentage. A JSON summary of the result can also be written with `--summary`.

*/
