use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, serde::json::Json, Request};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable detail for a failed ballot validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotErrors {
    /// Positions in the catalog the voter has no vote for.
    pub missing_positions: Vec<String>,
    /// Positions where the voter holds more votes than the quota allows.
    pub violations: Vec<String>,
}

impl BallotErrors {
    /// Human-readable summary, mirrored into the response `message`.
    pub fn message(&self) -> String {
        if !self.missing_positions.is_empty() {
            format!(
                "Please vote for all positions. Missing: {}",
                self.missing_positions.join(", ")
            )
        } else {
            format!(
                "You have voted for too many candidates in: {}",
                self.violations.join(", ")
            )
        }
    }
}

/// Everything that can go wrong serving a request.
///
/// All variants are recovered at the request boundary and rendered as a
/// structured JSON failure; none crash the serving process.
#[derive(Debug, Error)]
pub enum Error {
    /// The storage layer failed; not the caller's fault.
    #[error(transparent)]
    Db(#[from] DbError),
    /// The global voting flag is closed.
    #[error("{0}")]
    VotingClosed(String),
    /// The supplied voter identity does not resolve to a voter.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    /// The voter has already finalized their ballot.
    #[error("{0}")]
    AlreadyVoted(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// Ballot validation failed; carries the position lists.
    #[error("Ballot validation failed")]
    Validation(BallotErrors),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::InternalServerError,
            Self::VotingClosed(_) | Self::AlreadyVoted(_) | Self::BadRequest(_) => {
                Status::BadRequest
            }
            Self::Unauthenticated(_) => Status::Unauthorized,
            Self::NotFound(_) => Status::NotFound,
            Self::Validation(_) => Status::UnprocessableEntity,
        }
    }
}

/// The JSON body of every failure response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_positions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<String>>,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        match err {
            Error::Validation(errors) => Self {
                message: errors.message(),
                missing_positions: (!errors.missing_positions.is_empty())
                    .then(|| errors.missing_positions.clone()),
                violations: (!errors.violations.is_empty()).then(|| errors.violations.clone()),
            },
            // Storage detail stays in the logs, not on the wire.
            Error::Db(_) => Self {
                message: "Internal database error".to_string(),
                missing_positions: None,
                violations: None,
            },
            other => Self {
                message: other.to_string(),
                missing_positions: None,
                violations: None,
            },
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        match &self {
            Error::Db(e) => error!("Database error serving {}: {e}", req.uri()),
            other => debug!("Rejected {}: {other}", req.uri()),
        }
        let body = ErrorResponse::from(&self);
        let mut response = Json(body).respond_to(req)?;
        response.set_status(status);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_response_carries_lists() {
        let err = Error::Validation(BallotErrors {
            missing_positions: vec!["Secretary".to_string()],
            violations: vec![],
        });
        let body = ErrorResponse::from(&err);
        assert_eq!(
            body.message,
            "Please vote for all positions. Missing: Secretary"
        );
        assert_eq!(body.missing_positions.unwrap(), vec!["Secretary"]);
        assert!(body.violations.is_none());
    }

    #[test]
    fn violation_message_lists_positions() {
        let errors = BallotErrors {
            missing_positions: vec![],
            violations: vec!["Senator (max 2 vote(s))".to_string()],
        };
        assert_eq!(
            errors.message(),
            "You have voted for too many candidates in: Senator (max 2 vote(s))"
        );
    }

    #[test]
    fn db_errors_are_not_leaked() {
        let err = Error::Db(mongodb::error::Error::custom("secret detail"));
        let body = ErrorResponse::from(&err);
        assert_eq!(body.message, "Internal database error");
    }

    #[test]
    fn statuses() {
        assert_eq!(
            Error::VotingClosed("closed".into()).status(),
            Status::BadRequest
        );
        assert_eq!(
            Error::Unauthenticated("who?".into()).status(),
            Status::Unauthorized
        );
        assert_eq!(Error::not_found("candidate").status(), Status::NotFound);
        assert_eq!(
            Error::Validation(BallotErrors {
                missing_positions: vec![],
                violations: vec![],
            })
            .status(),
            Status::UnprocessableEntity
        );
    }
}
