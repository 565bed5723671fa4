//! Submission wizard as an explicit finite state machine.
//!
//! The wizard owns a typed payload-so-far and only advances on validated
//! input. A rejected input leaves the step unchanged so the caller can
//! re-prompt.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::submission::{
    parse_local_event_time, validate_address, validate_body, validate_event_time, validate_link,
    validate_title, Draft,
};
use crate::types::{DbId, Timestamp};

/// Text command that skips an optional step.
pub const SKIP_COMMAND: &str = "/skip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Cities,
    Categories,
    Title,
    Body,
    Image,
    Address,
    Link,
    EventTime,
    Complete,
}

impl WizardStep {
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            WizardStep::Image | WizardStep::Address | WizardStep::Link | WizardStep::EventTime
        )
    }

    fn next(self) -> WizardStep {
        match self {
            WizardStep::Cities => WizardStep::Categories,
            WizardStep::Categories => WizardStep::Title,
            WizardStep::Title => WizardStep::Body,
            WizardStep::Body => WizardStep::Image,
            WizardStep::Image => WizardStep::Address,
            WizardStep::Address => WizardStep::Link,
            WizardStep::Link => WizardStep::EventTime,
            WizardStep::EventTime | WizardStep::Complete => WizardStep::Complete,
        }
    }
}

/// One piece of user input fed to the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    /// Confirmed multi-select (cities or categories).
    Selection(Vec<DbId>),
    Text(String),
    /// Uploaded media handle.
    Image(String),
    Skip,
}

impl WizardInput {
    fn is_skip(&self) -> bool {
        match self {
            WizardInput::Skip => true,
            WizardInput::Text(t) => t.trim().eq_ignore_ascii_case(SKIP_COMMAND),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionWizard {
    author_id: DbId,
    step: WizardStep,
    city_ids: Vec<DbId>,
    category_ids: Vec<DbId>,
    title: Option<String>,
    body: Option<String>,
    image_id: Option<String>,
    address: Option<String>,
    link: Option<String>,
    event_at: Option<Timestamp>,
}

impl SubmissionWizard {
    pub fn new(author_id: DbId) -> Self {
        Self {
            author_id,
            step: WizardStep::Cities,
            city_ids: Vec::new(),
            category_ids: Vec::new(),
            title: None,
            body: None,
            image_id: None,
            address: None,
            link: None,
            event_at: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Feed one input to the current step.
    ///
    /// `now` and `offset` are only consulted at the event-time step, where
    /// the typed local time is converted to UTC and checked for lead time.
    pub fn advance(
        &mut self,
        input: WizardInput,
        now: Timestamp,
        offset: FixedOffset,
    ) -> Result<WizardStep, CoreError> {
        if input.is_skip() {
            if !self.step.is_optional() {
                return Err(CoreError::Validation(format!(
                    "Step {:?} cannot be skipped",
                    self.step
                )));
            }
            self.step = self.step.next();
            return Ok(self.step);
        }

        match (self.step, input) {
            (WizardStep::Cities, WizardInput::Selection(ids)) => {
                self.city_ids = non_empty_selection(ids, "city")?;
            }
            (WizardStep::Categories, WizardInput::Selection(ids)) => {
                self.category_ids = non_empty_selection(ids, "category")?;
            }
            (WizardStep::Title, WizardInput::Text(text)) => {
                let text = text.trim();
                validate_title(text)?;
                self.title = Some(text.to_string());
            }
            (WizardStep::Body, WizardInput::Text(text)) => {
                let text = text.trim();
                validate_body(text)?;
                self.body = Some(text.to_string());
            }
            (WizardStep::Image, WizardInput::Image(media_id)) => {
                self.image_id = Some(media_id);
            }
            (WizardStep::Address, WizardInput::Text(text)) => {
                let text = text.trim();
                validate_address(text)?;
                self.address = Some(text.to_string());
            }
            (WizardStep::Link, WizardInput::Text(text)) => {
                let text = text.trim();
                validate_link(text)?;
                self.link = Some(text.to_string());
            }
            (WizardStep::EventTime, WizardInput::Text(text)) => {
                let at = parse_local_event_time(&text, offset)?;
                validate_event_time(at, now)?;
                self.event_at = Some(at);
            }
            (WizardStep::Complete, _) => {
                return Err(CoreError::Conflict("Submission is already complete".to_string()));
            }
            (step, _) => {
                return Err(CoreError::Validation(format!(
                    "Unexpected input for step {step:?}"
                )));
            }
        }

        self.step = self.step.next();
        Ok(self.step)
    }

    /// Finish the wizard, yielding the typed draft.
    pub fn into_draft(self) -> Result<Draft, CoreError> {
        if self.step != WizardStep::Complete {
            return Err(CoreError::Validation(format!(
                "Submission incomplete, waiting for {:?}",
                self.step
            )));
        }
        let (Some(title), Some(body)) = (self.title, self.body) else {
            return Err(CoreError::Internal(
                "Completed wizard is missing title or body".to_string(),
            ));
        };
        Ok(Draft {
            author_id: self.author_id,
            title,
            body,
            image_id: self.image_id,
            link: self.link,
            address: self.address,
            event_at: self.event_at,
            category_ids: self.category_ids,
            city_ids: self.city_ids,
        })
    }
}

fn non_empty_selection(mut ids: Vec<DbId>, what: &str) -> Result<Vec<DbId>, CoreError> {
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Err(CoreError::Validation(format!("Select at least one {what}")));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn msk() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn text(s: &str) -> WizardInput {
        WizardInput::Text(s.to_string())
    }

    #[test]
    fn full_walk_produces_draft() {
        let mut w = SubmissionWizard::new(5);
        w.advance(WizardInput::Selection(vec![2, 1, 2]), now(), msk()).unwrap();
        w.advance(WizardInput::Selection(vec![7]), now(), msk()).unwrap();
        w.advance(text("  Open mic "), now(), msk()).unwrap();
        w.advance(text("Bring <i>your</i> guitar"), now(), msk()).unwrap();
        w.advance(WizardInput::Image("photo-1".into()), now(), msk()).unwrap();
        w.advance(text("/skip"), now(), msk()).unwrap();
        w.advance(text("https://mic.example"), now(), msk()).unwrap();
        let step = w.advance(text("01.05.2026 18:00"), now(), msk()).unwrap();
        assert_eq!(step, WizardStep::Complete);

        let draft = w.into_draft().unwrap();
        assert_eq!(draft.city_ids, vec![1, 2]);
        assert_eq!(draft.title, "Open mic");
        assert_eq!(draft.address, None);
        assert_eq!(draft.event_at, Some(Utc.with_ymd_and_hms(2026, 5, 1, 15, 0, 0).unwrap()));
        assert!(draft.validate(now()).is_ok());
    }

    #[test]
    fn invalid_input_keeps_step() {
        let mut w = SubmissionWizard::new(5);
        assert_matches!(
            w.advance(WizardInput::Selection(vec![]), now(), msk()),
            Err(CoreError::Validation(_))
        );
        assert_eq!(w.step(), WizardStep::Cities);

        w.advance(WizardInput::Selection(vec![1]), now(), msk()).unwrap();
        w.advance(WizardInput::Selection(vec![1]), now(), msk()).unwrap();
        assert!(w.advance(text(&"x".repeat(101)), now(), msk()).is_err());
        assert_eq!(w.step(), WizardStep::Title);
    }

    #[test]
    fn required_steps_cannot_be_skipped() {
        let mut w = SubmissionWizard::new(5);
        assert!(w.advance(WizardInput::Skip, now(), msk()).is_err());
        assert_eq!(w.step(), WizardStep::Cities);
    }

    #[test]
    fn event_time_too_soon_is_reprompted() {
        let mut w = SubmissionWizard::new(5);
        for input in [
            WizardInput::Selection(vec![1]),
            WizardInput::Selection(vec![1]),
            text("t"),
            text("b"),
            WizardInput::Skip,
            WizardInput::Skip,
            WizardInput::Skip,
        ] {
            w.advance(input, now(), msk()).unwrap();
        }
        // 15:10 MSK is 12:10 UTC, only ten minutes ahead.
        assert!(w.advance(text("01.05.2026 15:10"), now(), msk()).is_err());
        assert_eq!(w.step(), WizardStep::EventTime);
        assert!(w.clone().into_draft().is_err());
        w.advance(WizardInput::Skip, now(), msk()).unwrap();
        assert_eq!(w.into_draft().unwrap().event_at, None);
    }
}
