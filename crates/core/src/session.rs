//! Per-session UI state: which page is showing, the last submitted form and
//! the current recommendation.

use crate::advisor::{self, GENERIC_FAILURE_MESSAGE};
use crate::domain::inputs::{InputError, RecommendationForm, UserInputs};
use crate::domain::portfolio::Recommendation;
use crate::llm::LlmClient;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Page {
    #[default]
    Home,
    Input,
    Results,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Home, Page::Input, Page::Results];

    pub fn as_str(self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::Input => "input",
            Page::Results => "results",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Page::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown page: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Warning,
    Error,
}

/// One-shot message shown on the next render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    fn new(kind: FlashKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationError {
    ResultsUnavailable,
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::ResultsUnavailable => write!(
                f,
                "No portfolio data available. Please generate a recommendation first."
            ),
        }
    }
}

impl std::error::Error for NavigationError {}

pub const IN_FLIGHT_MESSAGE: &str =
    "A recommendation is already being generated. Please wait for it to finish.";

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionError {
    Invalid(InputError),
    InFlight,
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::Invalid(err) => fmt::Display::fmt(err, f),
            SubmissionError::InFlight => f.write_str(IN_FLIGHT_MESSAGE),
        }
    }
}

impl std::error::Error for SubmissionError {}

impl From<InputError> for SubmissionError {
    fn from(err: InputError) -> Self {
        SubmissionError::Invalid(err)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    page: Page,
    form: RecommendationForm,
    recommendation: Option<Recommendation>,
    flash: Option<Flash>,
    pending: bool,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn form(&self) -> &RecommendationForm {
        &self.form
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        self.recommendation.as_ref()
    }

    pub fn results_enabled(&self) -> bool {
        self.recommendation.is_some()
    }

    /// A model call for this session is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn take_flash(&mut self) -> Option<Flash> {
        self.flash.take()
    }

    /// "Get started" on the home page.
    pub fn start(&mut self) {
        self.page = Page::Input;
    }

    /// Sidebar navigation. Results stay unreachable until a record exists.
    pub fn navigate(&mut self, page: Page) -> Result<(), NavigationError> {
        if page == Page::Results && !self.results_enabled() {
            return Err(NavigationError::ResultsUnavailable);
        }
        self.page = page;
        Ok(())
    }

    /// Remembers the submitted values and validates them. A validation failure
    /// never touches the current recommendation. On success the session is
    /// marked pending until `complete_submission` runs.
    pub fn begin_submission(
        &mut self,
        form: RecommendationForm,
    ) -> Result<UserInputs, SubmissionError> {
        if self.pending {
            self.warn(IN_FLIGHT_MESSAGE);
            return Err(SubmissionError::InFlight);
        }
        let validated = UserInputs::try_from(&form);
        self.form = form;
        match validated {
            Ok(inputs) => {
                self.pending = true;
                Ok(inputs)
            }
            Err(err) => {
                self.reject_submission(&err);
                Err(err.into())
            }
        }
    }

    /// Reports a form that could not even be decoded. The stored form keeps
    /// its previous values.
    pub fn reject_submission(&mut self, err: &InputError) {
        self.page = Page::Input;
        self.flash = Some(Flash::new(FlashKind::Error, err.to_string()));
    }

    /// Applies the outcome of a recommendation request. On failure the
    /// previous recommendation, if any, is kept as it was.
    pub fn complete_submission(&mut self, outcome: anyhow::Result<Recommendation>) -> bool {
        self.pending = false;
        match outcome {
            Ok(rec) => {
                self.form = RecommendationForm::from(&rec.inputs);
                self.recommendation = Some(rec);
                self.page = Page::Results;
                self.flash = Some(Flash::new(
                    FlashKind::Success,
                    "Portfolio generated successfully!",
                ));
                true
            }
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "portfolio recommendation failed");
                self.flash = Some(Flash::new(FlashKind::Error, GENERIC_FAILURE_MESSAGE));
                false
            }
        }
    }

    /// Validates, requests and applies in one step.
    pub async fn submit(
        &mut self,
        form: RecommendationForm,
        llm: &dyn LlmClient,
    ) -> Result<bool, SubmissionError> {
        let inputs = self.begin_submission(form)?;
        let outcome = advisor::generate_recommendation(llm, &inputs).await;
        Ok(self.complete_submission(outcome))
    }

    /// "Generate new recommendation" on the results page.
    pub fn new_recommendation(&mut self) {
        self.recommendation = None;
        self.page = Page::Input;
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.flash = Some(Flash::new(FlashKind::Warning, message));
    }
}
