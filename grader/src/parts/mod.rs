//! The ordered stage graders.
//!
//! Each stage exposes a name, optional upper bound and lower bound, and
//! produces one clamped [`GradePart`]. Expected failures (unreachable
//! server, wrong status, malformed payload) never escape a stage: they
//! become explanations plus a reduced grade. Only truly exceptional
//! conditions (binding the mock server socket, spawning the build tool)
//! propagate as [`GraderError`].

mod ci;
mod coherence;
mod commits;
mod compilation;
mod coverage;
mod prediction_api;
mod site_api;
mod style;

pub use ci::CiPart;
pub use coherence::CoherencePart;
pub use commits::CommitsPart;
pub use compilation::CompilationPart;
pub use coverage::CoveragePart;
pub use prediction_api::PredictionApiPart;
pub use site_api::SiteApiPart;
pub use style::StylePart;

use async_trait::async_trait;

use crate::clients::{Inscription, WeatherExpectation};
use crate::context::GradingContext;
use crate::error::GraderError;
use crate::json::DecodeFault;
use crate::random::SharedRandom;
use crate::report::GradePart;

#[async_trait]
pub trait PartGrader: Send + Sync {
    fn name(&self) -> String;

    fn max_grade(&self) -> Option<f64> {
        None
    }

    fn min_grade(&self) -> f64 {
        0.0
    }

    async fn grade(&self, context: &mut GradingContext) -> Result<GradePart, GraderError>;

    /// Wraps a raw grade, clamped into `[min_grade, max_grade]`.
    fn result(&self, explanations: Vec<String>, grade: f64) -> GradePart {
        let grade = match self.max_grade() {
            Some(max) => grade.clamp(self.min_grade(), max),
            None => grade.max(self.min_grade()),
        };
        GradePart {
            name: self.name(),
            grade,
            max_grade: self.max_grade(),
            explanations,
        }
    }
}

/// Countries the inscription generator draws from. The last entry is out of
/// reach of the random draw, like the dataset table.
pub(crate) const COUNTRIES: [&str; 22] = [
    "Bahrain",
    "Bangladesh",
    "Barbados",
    "Belarus",
    "Belgium",
    "Belize",
    "Benin",
    "Bhutan",
    "Bolivia",
    "Bosnia",
    "Botswana",
    "Brazil",
    "Brunei",
    "Bulgaria",
    "Eritrea",
    "Estonia",
    "Eswatini",
    "Ethiopia",
    "Fiji",
    "Finland",
    "France",
    "Gabon",
];

pub(crate) fn generate_inscription(
    random: &SharedRandom,
    expectation: WeatherExpectation,
) -> Inscription {
    let user_name = random.next_uuid().to_string();
    let user_country = COUNTRIES[random.next_int(COUNTRIES.len() as u32 - 1) as usize];
    let minimum_temperature_distance = random.next_int(10) + 6;
    Inscription {
        user_email: format!("{user_name}@lernejo.fr"),
        user_name,
        user_country: user_country.to_lowercase(),
        weather_expectation: expectation,
        minimum_temperature_distance,
    }
}

/// Renders a float the way students see it in messages: at least one
/// decimal, trailing zeros trimmed (`55.0`, `63.16`).
pub(crate) fn format_double(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    let text = format!("{value:.2}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed.contains('.') {
        trimmed.to_string()
    } else {
        format!("{trimmed}.0")
    }
}

/// Goals launching the student's `site` module, its outbound prediction
/// calls redirected to the mock server.
pub(crate) fn site_run_goals(site_port: u16, prediction_port: u16) -> Vec<String> {
    vec![
        format!("{}:run", runner::maven::SPRING_BOOT_PLUGIN),
        "-pl".to_string(),
        ":site".to_string(),
        format!(
            "-Dspring-boot.run.jvmArguments=-Dserver.port={site_port} -DtackEnabled=true -DtackRedirectPort={prediction_port}"
        ),
    ]
}

/// Goals launching the student's `prediction-engine` module.
pub(crate) fn prediction_run_goals(port: u16) -> Vec<String> {
    vec![
        format!("{}:run", runner::maven::SPRING_BOOT_PLUGIN),
        "-pl".to_string(),
        ":prediction-engine".to_string(),
        format!("-Dspring-boot.run.jvmArguments=-Dserver.port={port}"),
    ]
}

pub(crate) fn bad_payload_message(sample: &str, fault: &DecodeFault) -> String {
    format!(
        "Bad response payload expected something like:\n```\n{sample}\n```\nBut got:\n```\n{}\n```",
        fault.raw_body
    )
}

pub(crate) fn server_start_failure(context: &GradingContext) -> String {
    format!(
        "Server failed to start within {} sec.",
        context.server_start_timeout.as_secs()
    )
}
