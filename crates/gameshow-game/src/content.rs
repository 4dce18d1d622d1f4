//! Question content: multiple-choice questions, free-text speed questions
//! and Round-2 packs, plus the loader that reads them from disk.
//!
//! A [`QuestionBank`] is loaded once at startup and shared (behind an
//! `Arc`) by every session. Each of the three files falls back to the
//! built-in set on its own, so a broken pack file doesn't take the
//! Round-1 questions down with it.

use std::path::{Path, PathBuf};

use gameshow_protocol::{PackQuestionView, PackSummary, QuestionView, TextQuestionView};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// File names looked up inside the questions directory.
pub const ROUND1_FILE: &str = "round1-questions.json";
pub const SPEED_FILE: &str = "speed-questions.json";
pub const PACKS_FILE: &str = "round2-question-packs.json";

const DEFAULT_TIME_LIMIT: u32 = 15;

/// Errors reading a content file.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{} contains no entries", .0.display())]
    Empty(PathBuf),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A Round-1 multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
}

fn default_time_limit() -> u32 {
    DEFAULT_TIME_LIMIT
}

impl Question {
    /// What players see: everything but the answer.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id,
            text: self.text.clone(),
            options: self.options.clone(),
            time_limit: self.time_limit,
        }
    }
}

/// A free-text question used for the speed-order round and tiebreaks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedQuestion {
    pub id: String,
    #[serde(alias = "question")]
    pub text: String,
    #[serde(alias = "correctAnswer")]
    pub answer: String,
}

impl SpeedQuestion {
    pub fn view(&self) -> TextQuestionView {
        TextQuestionView {
            id: self.id.clone(),
            text: self.text.clone(),
        }
    }

    /// Checks a free-text answer against this question's key.
    pub fn accepts(&self, given: &str) -> bool {
        answers_match(given, &self.answer)
    }
}

/// One free-text question inside a [`ContentPack`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackQuestion {
    pub text: String,
    /// Answer key. Empty means the host has to verify by hand.
    #[serde(default)]
    pub answer: String,
}

/// A themed bundle of Round-2 questions. Each pack can be played once per
/// game.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentPack {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<PackQuestion>,
}

impl ContentPack {
    pub fn summary(&self, selected: bool) -> PackSummary {
        PackSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            question_count: self.questions.len(),
            selected,
        }
    }

    /// The pack's questions, with answer keys only when `with_answers`.
    pub fn question_views(&self, with_answers: bool) -> Vec<PackQuestionView> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, q)| PackQuestionView {
                index,
                text: q.text.clone(),
                answer: with_answers.then(|| q.answer.clone()),
            })
            .collect()
    }
}

/// Case-insensitive comparison of a free-text answer against a key,
/// ignoring surrounding whitespace. An empty key never matches.
pub fn answers_match(given: &str, key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && given.trim().to_lowercase() == key.to_lowercase()
}

// ---------------------------------------------------------------------------
// QuestionBank
// ---------------------------------------------------------------------------

/// All question content available to sessions.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    pub questions: Vec<Question>,
    pub speed_questions: Vec<SpeedQuestion>,
    pub packs: Vec<ContentPack>,
}

impl QuestionBank {
    /// The built-in content set.
    pub fn builtin() -> Self {
        Self {
            questions: builtin_questions(),
            speed_questions: builtin_speed_questions(),
            packs: builtin_packs(),
        }
    }

    /// Loads content from `dir`, falling back per file to the built-in set.
    pub fn load_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let bank = Self {
            questions: load_or(dir.join(ROUND1_FILE), builtin_questions),
            speed_questions: load_or(dir.join(SPEED_FILE), builtin_speed_questions),
            packs: load_or(dir.join(PACKS_FILE), builtin_packs),
        };
        tracing::info!(
            questions = bank.questions.len(),
            speed_questions = bank.speed_questions.len(),
            packs = bank.packs.len(),
            dir = %dir.display(),
            "question bank loaded"
        );
        bank
    }

    /// Looks up a pack by id.
    pub fn pack(&self, id: &str) -> Option<&ContentPack> {
        self.packs.iter().find(|p| p.id == id)
    }

    /// The free-text question at `cursor`, wrapping around the bank.
    ///
    /// Sessions advance their own cursor so a tiebreak and the speed round
    /// don't reuse the same question. An empty bank yields a fixed fallback.
    pub fn timed_question(&self, cursor: usize) -> SpeedQuestion {
        if self.speed_questions.is_empty() {
            return fallback_speed_question();
        }
        self.speed_questions[cursor % self.speed_questions.len()].clone()
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Reads a JSON array from `path`.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ContentError> {
    let text = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let items: Vec<T> = serde_json::from_str(&text).map_err(|source| ContentError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if items.is_empty() {
        return Err(ContentError::Empty(path.to_path_buf()));
    }
    Ok(items)
}

fn load_or<T: DeserializeOwned>(path: PathBuf, fallback: fn() -> Vec<T>) -> Vec<T> {
    match load_file(&path) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "using built-in content");
            fallback()
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in content
// ---------------------------------------------------------------------------

fn mc(id: u32, text: &str, options: [&str; 4], correct_answer: usize, time_limit: u32) -> Question {
    Question {
        id,
        text: text.into(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer,
        time_limit,
    }
}

fn builtin_questions() -> Vec<Question> {
    vec![
        mc(1, "What is the capital of France?", ["London", "Berlin", "Paris", "Madrid"], 2, 15),
        mc(2, "Which planet is known as the Red Planet?", ["Venus", "Mars", "Jupiter", "Saturn"], 1, 15),
        mc(3, "What is 2 + 2?", ["3", "4", "5", "6"], 1, 10),
        mc(4, "Who painted the Mona Lisa?", ["Van Gogh", "Da Vinci", "Picasso", "Monet"], 1, 15),
    ]
}

fn speed(id: &str, text: &str, answer: &str) -> SpeedQuestion {
    SpeedQuestion {
        id: id.into(),
        text: text.into(),
        answer: answer.into(),
    }
}

fn builtin_speed_questions() -> Vec<SpeedQuestion> {
    vec![
        speed("speed1", "Type the number: What is 7 x 8?", "56"),
        speed("speed2", "Type the city: Capital of Japan?", "tokyo"),
        speed("speed3", "Type the number: What is 10 + 15?", "25"),
    ]
}

fn fallback_speed_question() -> SpeedQuestion {
    speed("fallback", "Type the number: What is 6 x 7?", "42")
}

fn pack(id: &str, title: &str, description: &str, questions: &[(&str, &str)]) -> ContentPack {
    ContentPack {
        id: id.into(),
        title: title.into(),
        description: description.into(),
        questions: questions
            .iter()
            .map(|(text, answer)| PackQuestion {
                text: (*text).into(),
                answer: (*answer).into(),
            })
            .collect(),
    }
}

fn builtin_packs() -> Vec<ContentPack> {
    vec![
        pack(
            "pack1",
            "Geography Masters",
            "World capitals, countries, and landmarks",
            &[
                ("What is the capital of Australia?", "Canberra"),
                ("Which country has the most islands?", "Sweden"),
                ("What is the longest river in Africa?", "Nile"),
            ],
        ),
        pack(
            "pack2",
            "Science Lab",
            "Elements, planets, and the natural world",
            &[
                ("What is the chemical symbol for gold?", "Au"),
                ("Which planet is closest to the Sun?", "Mercury"),
                ("What is the hardest natural substance?", "Diamond"),
            ],
        ),
        pack(
            "pack3",
            "History Buffs",
            "Empires, explorers, and turning points",
            &[
                ("In which year did humans first land on the Moon?", "1969"),
                ("Which civilization built Machu Picchu?", "Inca"),
                ("Who was the first Roman emperor?", "Augustus"),
            ],
        ),
        pack(
            "pack4",
            "Sports Arena",
            "Games, rules, and records",
            &[
                ("How many players does a soccer team have on the field?", "11"),
                ("In which sport is a shuttlecock used?", "Badminton"),
                ("How many rings are on the Olympic flag?", "5"),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers_match_ignores_case_and_whitespace() {
        assert!(answers_match("  Tokyo ", "tokyo"));
        assert!(answers_match("PARIS", "Paris"));
        assert!(!answers_match("Pariz", "Paris"));
    }

    #[test]
    fn test_empty_key_never_matches() {
        assert!(!answers_match("", ""));
        assert!(!answers_match("anything", "  "));
    }

    #[test]
    fn test_builtin_bank_is_usable() {
        let bank = QuestionBank::builtin();
        assert_eq!(bank.questions.len(), 4);
        assert_eq!(bank.speed_questions.len(), 3);
        assert!(bank.packs.len() >= 4);
        for q in &bank.questions {
            assert!(q.correct_answer < q.options.len(), "question {}", q.id);
        }
        assert_eq!(bank.questions[0].options[2], "Paris");
    }

    #[test]
    fn test_timed_question_wraps_and_falls_back() {
        let bank = QuestionBank::builtin();
        assert_eq!(bank.timed_question(0).id, "speed1");
        assert_eq!(bank.timed_question(4).id, "speed2");

        let empty = QuestionBank {
            speed_questions: vec![],
            ..QuestionBank::builtin()
        };
        assert_eq!(empty.timed_question(7).id, "fallback");
    }

    #[test]
    fn test_question_view_hides_answer() {
        let q = &QuestionBank::builtin().questions[0];
        let view = q.view();
        assert_eq!(view.id, 1);
        assert_eq!(view.options.len(), 4);
        assert_eq!(view.time_limit, 15);
    }

    #[test]
    fn test_pack_views_and_summary() {
        let bank = QuestionBank::builtin();
        let pack = bank.pack("pack1").unwrap();

        let player_view = pack.question_views(false);
        assert!(player_view.iter().all(|q| q.answer.is_none()));

        let host_view = pack.question_views(true);
        assert_eq!(host_view[0].answer.as_deref(), Some("Canberra"));
        assert_eq!(host_view[2].index, 2);

        let summary = pack.summary(true);
        assert_eq!(summary.question_count, 3);
        assert!(summary.selected);
        assert!(bank.pack("nope").is_none());
    }

    #[test]
    fn test_legacy_file_formats_parse() {
        let speed: Vec<SpeedQuestion> = serde_json::from_str(
            r#"[{"id":"s1","question":"Capital of Peru?","correctAnswer":"Lima"}]"#,
        )
        .unwrap();
        assert_eq!(speed[0].text, "Capital of Peru?");
        assert!(speed[0].accepts("lima"));

        let questions: Vec<Question> = serde_json::from_str(
            r#"[{"id":9,"text":"?","options":["a","b"],"correctAnswer":1}]"#,
        )
        .unwrap();
        assert_eq!(questions[0].correct_answer, 1);
        assert_eq!(questions[0].time_limit, DEFAULT_TIME_LIMIT);

        let packs: Vec<ContentPack> = serde_json::from_str(
            r#"[{"id":"p","title":"T","questions":[{"text":"Q1"}]}]"#,
        )
        .unwrap();
        assert_eq!(packs[0].questions[0].answer, "");
        assert_eq!(packs[0].description, "");
    }

    #[test]
    fn test_load_dir_falls_back_per_file() {
        let dir = std::env::temp_dir().join(format!(
            "gameshow-content-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(SPEED_FILE),
            r#"[{"id":"s1","text":"Capital of Peru?","answer":"Lima"}]"#,
        )
        .unwrap();
        std::fs::write(dir.join(PACKS_FILE), "not json").unwrap();

        let bank = QuestionBank::load_dir(&dir);

        assert_eq!(bank.speed_questions.len(), 1);
        assert_eq!(bank.speed_questions[0].id, "s1");
        assert_eq!(bank.questions, builtin_questions());
        assert_eq!(bank.packs, builtin_packs());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_file_reports_errors() {
        let missing = Path::new("/definitely/not/here.json");
        assert!(matches!(
            load_file::<Question>(missing),
            Err(ContentError::Io { .. })
        ));
    }
}
