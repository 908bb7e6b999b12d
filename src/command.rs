//! Initial command: the only way a job comes into existence.

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::error::PipelineError;
use crate::core::types::{Action, JobInputs, JobState, Limit};

/// Inputs as sent by the UI. A key that is absent is distinct from a key set
/// to `null` (which means "unbounded" for the limits).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_places: Option<Limit>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_reviews: Option<Limit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_images: Option<bool>,
}

fn present<'de, D>(d: D) -> Result<Option<Limit>, D::Error>
where
    D: Deserializer<'de>,
{
    Limit::deserialize(d).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialCommand {
    pub action_id: Option<u8>,
    #[serde(default)]
    pub inputs: CommandInputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CommandReply {
    #[serde(rename = "ACK")]
    Ack,
    #[serde(rename = "error")]
    Error { message: String },
}

impl InitialCommand {
    pub fn new(inputs: JobInputs) -> Self {
        Self {
            action_id: Some(Action::FIRST),
            inputs: CommandInputs {
                keyword: Some(inputs.keyword),
                max_places: Some(inputs.max_places),
                max_reviews: Some(inputs.max_reviews),
                save_images: Some(inputs.save_images),
            },
        }
    }

    /// Validate into job inputs. `None` when this is not an initial command.
    pub fn validate(&self) -> Option<Result<JobInputs, PipelineError>> {
        if self.action_id != Some(Action::FIRST) {
            return None;
        }
        let i = &self.inputs;
        let inputs = match (&i.keyword, i.max_places, i.max_reviews, i.save_images) {
            (Some(keyword), Some(max_places), Some(max_reviews), Some(save_images))
                if !keyword.trim().is_empty() =>
            {
                Ok(JobInputs {
                    keyword: keyword.trim().to_string(),
                    max_places,
                    max_reviews,
                    save_images,
                })
            }
            _ => Err(PipelineError::MissingInputs),
        };
        Some(inputs)
    }

    /// Accept or refuse: on success the fresh job document bound to `host`.
    pub fn accept(&self, host: &str) -> Option<(CommandReply, Option<JobState>)> {
        Some(match self.validate()? {
            Ok(inputs) => (CommandReply::Ack, Some(JobState::new(inputs, host))),
            Err(e) => (
                CommandReply::Error {
                    message: e.user_message(),
                },
                None,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StatusCode;

    fn parse(raw: &str) -> InitialCommand {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn complete_command_is_acknowledged() {
        let cmd = parse(
            r#"{"actionId": 1, "inputs": {"keyword": "ooty", "maxPlaces": 2, "maxReviews": null, "saveImages": false}}"#,
        );
        let (reply, job) = cmd.accept("https://www.tripadvisor.in/").unwrap();
        assert_eq!(reply, CommandReply::Ack);
        let job = job.unwrap();
        assert_eq!(job.action_id, 1);
        assert_eq!(job.inputs.max_places, Limit::at_most(2));
        assert_eq!(job.inputs.max_reviews, Limit::UNBOUNDED);
        assert_eq!(job.status.code, StatusCode::Uninitiated);
        assert_eq!(job.status.message, "starting scraper...");
        assert_eq!(job.host, "https://www.tripadvisor.in/");
    }

    #[test]
    fn absent_key_is_refused() {
        let cmd = parse(r#"{"actionId": 1, "inputs": {"keyword": "ooty", "maxPlaces": 2, "saveImages": true}}"#);
        let (reply, job) = cmd.accept("https://www.tripadvisor.in").unwrap();
        assert!(job.is_none());
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::json!({"type": "error", "message": "one or more inputs missing for action id 1"})
        );
    }

    #[test]
    fn non_initial_commands_are_ignored() {
        assert!(parse(r#"{"actionId": 3}"#).accept("x").is_none());
        assert!(parse(r#"{"actionId": null}"#).accept("x").is_none());
    }

    #[test]
    fn ack_wire_shape() {
        assert_eq!(
            serde_json::to_value(CommandReply::Ack).unwrap(),
            serde_json::json!({"type": "ACK"})
        );
    }

    #[test]
    fn new_round_trips_through_validation() {
        let inputs = JobInputs {
            keyword: "goa".into(),
            max_places: Limit::at_most(1),
            max_reviews: Limit::at_most(10),
            save_images: true,
        };
        let cmd = InitialCommand::new(inputs.clone());
        assert_eq!(cmd.validate().unwrap().unwrap(), inputs);
    }
}
