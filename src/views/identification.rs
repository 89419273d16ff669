//! Identification view: Loading -> Success | Error.

use std::fmt::Write as _;

use crate::client::{ClientError, PlantApi};
use crate::models::{IdentifyResponse, PlantRecord};

pub const IDENTIFY_FAILED: &str = "Failed to identify plant";
pub const IDENTIFY_TRANSPORT_FAILED: &str = "An error occurred during plant identification";
pub const HEALTHY_NOTE: &str =
    "Your plant appears to be healthy! Continue with the recommended care routine.";

#[derive(Debug, Clone, PartialEq)]
pub enum IdentificationState {
    Loading,
    Success(PlantRecord),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Care,
    Health,
}

impl Tab {
    pub fn title(self) -> &'static str {
        match self {
            Tab::Care => "Care Guide",
            Tab::Health => "Health Assessment",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentificationView {
    image_url: String,
    state: IdentificationState,
    tab: Tab,
    requested: bool,
}

impl IdentificationView {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            state: IdentificationState::Loading,
            tab: Tab::default(),
            requested: false,
        }
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn state(&self) -> &IdentificationState {
        &self.state
    }

    pub fn record(&self) -> Option<&PlantRecord> {
        match &self.state {
            IdentificationState::Success(record) => Some(record),
            _ => None,
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    /// Point the view at a different image; it goes back to Loading.
    pub fn set_image_url(&mut self, image_url: impl Into<String>) {
        let image_url = image_url.into();
        if image_url != self.image_url {
            *self = Self::new(image_url);
        }
    }

    /// Issue the identification call for the current URL, at most once.
    pub async fn load(&mut self, api: &dyn PlantApi) -> &IdentificationState {
        if !self.requested {
            self.requested = true;
            let result = api.identify(&self.image_url).await;
            self.finish(result);
        }
        &self.state
    }

    pub fn finish(&mut self, result: Result<IdentifyResponse, ClientError>) {
        self.state = match result {
            Ok(IdentifyResponse {
                success: true,
                data: Some(record),
                ..
            }) => IdentificationState::Success(record),
            Ok(response) => IdentificationState::Error(
                response.error.unwrap_or_else(|| IDENTIFY_FAILED.to_string()),
            ),
            Err(err) => {
                tracing::error!(error = %err, "Identification request failed");
                IdentificationState::Error(IDENTIFY_TRANSPORT_FAILED.to_string())
            }
        };
    }

    /// Header, description and the active tab.
    pub fn render(&self) -> String {
        match &self.state {
            IdentificationState::Loading => "Identifying plant...\n".to_string(),
            IdentificationState::Error(message) => format!("{message}\n[Try Again]\n"),
            IdentificationState::Success(record) => {
                let mut out = render_header(record);
                out.push('\n');
                out.push_str(&self.render_tab(self.tab));
                out.push_str("\n[Analyze Another Plant]\n");
                out
            }
        }
    }

    pub fn render_tab(&self, tab: Tab) -> String {
        let Some(record) = self.record() else {
            return String::new();
        };

        let mut out = format!("== {} ==\n", tab.title());
        match tab {
            Tab::Care => {
                let care = &record.care_instructions;
                for (label, text) in [
                    ("Water", &care.water),
                    ("Light", &care.light),
                    ("Soil", &care.soil),
                    ("Temperature", &care.temperature),
                ] {
                    let _ = writeln!(out, "{label}: {text}");
                }
            }
            Tab::Health => {
                let health = &record.health_assessment;
                if health.issues.is_empty() {
                    let _ = writeln!(out, "{HEALTHY_NOTE}");
                } else {
                    out.push_str("Identified Issues:\n");
                    for issue in &health.issues {
                        let _ = writeln!(out, "  - {issue}");
                    }
                    out.push_str("Recommendations:\n");
                    for rec in &health.recommendations {
                        let _ = writeln!(out, "  - {rec}");
                    }
                }
            }
        }
        out
    }
}

fn render_header(record: &PlantRecord) -> String {
    format!(
        "{} [{}]\n{}\n\n{}\n",
        record.name,
        record.health_assessment.status.label(),
        record.scientific_name,
        record.description
    )
}
