//! Operator decisions per softphone stage.

use serde_json::Value;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::error::{InputError, Result, SpaceOdtError};
use crate::inputs::{Payload, payload_string, read_csv_file};
use crate::planner::{SoftphoneStage, StageDecision, parse_stage_decision};

/// A parsed decision: the keyword plus the overrides file for `yesbut`.
pub type Decision = (StageDecision, Option<String>);

/// Answers the yes/no/yesbut question for each stage.
pub trait DecisionProvider: Send + Sync {
    /// Decision for `stage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be obtained or parsed.
    fn decide(&self, stage: SoftphoneStage) -> Result<Decision>;
}

impl<F> DecisionProvider for F
where
    F: Fn(SoftphoneStage) -> Result<Decision> + Send + Sync,
{
    fn decide(&self, stage: SoftphoneStage) -> Result<Decision> {
        self(stage)
    }
}

/// Decisions read from a JSON object of stage name to answer text.
///
/// Stages missing from the file are answered `no`.
#[derive(Debug, Clone, Default)]
pub struct FileDecisions {
    answers: HashMap<String, String>,
}

impl FileDecisions {
    /// Loads the decisions file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or not an object of strings.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses a decisions document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not an object of strings.
    pub fn parse(content: &str) -> Result<Self> {
        let answers: HashMap<String, String> = serde_json::from_str(content)?;
        Ok(Self { answers })
    }
}

impl DecisionProvider for FileDecisions {
    fn decide(&self, stage: SoftphoneStage) -> Result<Decision> {
        match self.answers.get(stage.as_str()) {
            Some(answer) => Ok(parse_stage_decision(answer)?),
            None => Ok((StageDecision::No, None)),
        }
    }
}

/// Asks the operator on a terminal, repeating until the answer parses.
pub struct PromptDecisions<R, W> {
    io: Mutex<(R, W)>,
}

impl<R: BufRead + Send, W: Write + Send> PromptDecisions<R, W> {
    /// Creates a prompt over the given reader and writer.
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }
}

impl<R: BufRead + Send, W: Write + Send> DecisionProvider for PromptDecisions<R, W> {
    fn decide(&self, stage: SoftphoneStage) -> Result<Decision> {
        let mut io = self
            .io
            .lock()
            .map_err(|_| SpaceOdtError::internal("decision prompt poisoned"))?;
        let (reader, writer) = &mut *io;
        loop {
            write!(writer, "{stage} [yes/no/yesbut <overrides.csv>]: ")?;
            writer.flush()?;

            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Err(SpaceOdtError::internal(format!(
                    "no decision given for {stage}"
                )));
            }
            match parse_stage_decision(&line) {
                Ok(decision) => return Ok(decision),
                Err(err) => writeln!(writer, "{err}")?,
            }
        }
    }
}

/// Resolves an overrides path relative to the v2 directory.
#[must_use]
pub fn overrides_path(v2_dir: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        v2_dir.join(path)
    }
}

/// Loads override rows keyed by `user_email`.
///
/// # Errors
///
/// Returns an error if the file is unreadable or a row has no `user_email`.
pub fn load_overrides(path: &Path) -> Result<HashMap<String, Payload>> {
    let rows = read_csv_file(path)?;
    let mut overrides = HashMap::with_capacity(rows.len());
    for (idx, mut row) in rows.into_iter().enumerate() {
        let Some(email) = payload_string(&row, "user_email") else {
            return Err(InputError::InvalidRow {
                source_name: path.display().to_string(),
                row: idx + 2,
                message: String::from("user_email is required in overrides"),
            }
            .into());
        };
        row.remove("user_email");
        overrides.insert(email, row);
    }
    debug!("Loaded {} override rows from {}", overrides.len(), path.display());
    Ok(overrides)
}

/// Copies non-empty override values into `payload`.
pub fn merge_overrides(payload: &mut Payload, overrides: &Payload) {
    for (key, value) in overrides {
        let empty = matches!(value, Value::String(s) if s.is_empty());
        if !empty {
            payload.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_file_decisions_default_to_no() {
        let decisions = FileDecisions::parse(
            r#"{"ASSIGN_CALLING_LICENSE": "YES", "APPLY_FORWARDING": "yesbut fwd.csv"}"#,
        )
        .expect("parse");

        assert_eq!(
            decisions.decide(SoftphoneStage::AssignCallingLicense).expect("decide"),
            (StageDecision::Yes, None)
        );
        assert_eq!(
            decisions.decide(SoftphoneStage::ApplyForwarding).expect("decide"),
            (StageDecision::Yesbut, Some(String::from("fwd.csv")))
        );
        assert_eq!(
            decisions.decide(SoftphoneStage::ApplyVoicemail).expect("decide"),
            (StageDecision::No, None)
        );
    }

    #[test]
    fn test_file_decisions_reject_bad_answer() {
        let decisions = FileDecisions::parse(r#"{"APPLY_VOICEMAIL": "maybe"}"#).expect("parse");
        assert!(decisions.decide(SoftphoneStage::ApplyVoicemail).is_err());
    }

    #[test]
    fn test_closure_provider() {
        let provider = |_stage: SoftphoneStage| -> Result<Decision> { Ok((StageDecision::No, None)) };
        assert_eq!(
            provider.decide(SoftphoneStage::ApplyPermissions).expect("decide").0,
            StageDecision::No
        );
    }

    #[test]
    fn test_prompt_retries_until_valid() {
        let prompt = PromptDecisions::new(Cursor::new(b"perhaps\nyesbut\nyes\n".to_vec()), Vec::new());
        let decision = prompt.decide(SoftphoneStage::ApplyVoicemail).expect("decide");
        assert_eq!(decision, (StageDecision::Yes, None));

        let prompt = PromptDecisions::new(Cursor::new(Vec::new()), Vec::new());
        assert!(prompt.decide(SoftphoneStage::ApplyVoicemail).is_err());
    }

    #[test]
    fn test_overrides_merge_by_email() {
        let dir = TempDir::new().expect("tempdir");
        let path = overrides_path(dir.path(), "fwd.csv");
        std::fs::write(
            &path,
            "user_email,cf_always_destination,voicemail_enabled\na@example.com,+3499,\n",
        )
        .expect("write");

        let overrides = load_overrides(&path).expect("load");
        let mut payload: Payload = json!({"cf_always_destination": "+3411", "voicemail_enabled": "yes"})
            .as_object()
            .cloned()
            .unwrap_or_default();
        merge_overrides(&mut payload, &overrides["a@example.com"]);

        assert_eq!(payload["cf_always_destination"], json!("+3499"));
        assert_eq!(payload["voicemail_enabled"], json!("yes"));
    }

    #[test]
    fn test_overrides_require_email() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "user_email,extension\n,1001\n").expect("write");
        assert!(load_overrides(&path).is_err());
    }
}
