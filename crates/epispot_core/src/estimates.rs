//! Parameter estimates from the literature.
//!
//! Estimates are grouped into a hierarchy: a [`Disease`] holds the
//! [`Paper`]s studying it, and each paper holds the [`Estimate`]s it
//! reports. [`Registry::builtin`] carries the bundled data; queries use
//! slash-separated paths such as `"SARS-CoV-2/Santos 2022/beta"`.

pub mod data;

use crate::error::{EpiError, Result};
use crate::params::Param;
use chrono::NaiveDate;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimate {
    /// Parameter identifier, e.g. `r_0` or `gamma`.
    pub id: String,
    pub name: String,
    pub description: String,
    pub dist: Param,
}

impl Estimate {
    pub fn new(id: &str, dist: impl Into<Param>) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            description: String::new(),
            dist: dist.into(),
        }
    }

    pub fn described(mut self, name: &str, description: &str) -> Self {
        self.name = name.to_string();
        self.description = description.to_string();
        self
    }

    pub fn value(&self, t: f64) -> f64 {
        self.dist.eval(t)
    }

    /// `value(t)` plus Gaussian noise with standard deviation `z`.
    pub fn sample<R: Rng + ?Sized>(&self, t: f64, z: f64, rng: &mut R) -> f64 {
        let noise: f64 = rng.sample(StandardNormal);
        self.value(t) + z * noise
    }

    pub fn about(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// In-text citation parts: lead author, optional second author (or
/// `"et al."`), and year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperId {
    pub lead: String,
    pub coauthor: Option<String>,
    pub year: i32,
}

impl PaperId {
    pub fn new(lead: &str, coauthor: Option<&str>, year: i32) -> Self {
        Self {
            lead: lead.to_string(),
            coauthor: coauthor.map(str::to_string),
            year,
        }
    }

    /// `Lead 2020`, `Lead et al. 2020` or `Lead, Second 2020`.
    pub fn in_text(&self) -> String {
        match self.coauthor.as_deref() {
            None => format!("{} {}", self.lead, self.year),
            Some("et al.") => format!("{} et al. {}", self.lead, self.year),
            Some(second) => format!("{}, {} {}", self.lead, second, self.year),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub journal: String,
    pub published: Option<NaiveDate>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub in_text: String,
    pub estimates: Vec<Estimate>,
    pub metadata: Option<PaperMetadata>,
    /// Full citation; bundled papers use APA style.
    pub full: Option<String>,
}

impl Paper {
    pub fn new(id: PaperId, estimates: Vec<Estimate>) -> Self {
        Self {
            in_text: id.in_text(),
            id,
            estimates,
            metadata: None,
            full: None,
        }
    }

    pub fn with_metadata(mut self, metadata: PaperMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_full(mut self, full: &str) -> Self {
        self.full = Some(full.to_string());
        self
    }

    /// Overrides the derived in-text citation.
    pub fn with_in_text(mut self, in_text: &str) -> Self {
        self.in_text = in_text.to_string();
        self
    }

    pub fn cite(&self) -> &str {
        &self.in_text
    }

    pub fn about(&self) -> &str {
        if let Some(desc) = self.metadata.as_ref().and_then(|m| m.description.as_deref()) {
            return desc;
        }
        self.full.as_deref().unwrap_or(&self.in_text)
    }

    pub fn estimate(&self, id: &str) -> Option<&Estimate> {
        self.estimates.iter().find(|e| e.id == id)
    }
}

impl fmt::Display for Paper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.metadata {
            Some(meta) => f.write_str(&meta.title),
            None => f.write_str(&self.in_text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disease {
    /// Scientific identifier, e.g. `SARS-CoV-2`.
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub papers: Vec<Paper>,
}

impl Disease {
    pub fn paper(&self, in_text: &str) -> Option<&Paper> {
        self.papers.iter().find(|p| p.in_text == in_text)
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_deref().unwrap_or(&self.id))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Match<'a> {
    Disease(&'a Disease),
    Paper(&'a Paper),
    Estimate(&'a Estimate),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    diseases: Vec<Disease>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every bundled estimate.
    pub fn builtin() -> Self {
        Self {
            diseases: vec![data::covid()],
        }
    }

    pub fn register(&mut self, disease: Disease) {
        self.diseases.push(disease);
    }

    pub fn diseases(&self) -> &[Disease] {
        &self.diseases
    }

    /// Looks up `disease[/paper[/estimate]]`, where papers are named by their
    /// in-text citation and everything else by id.
    pub fn query(&self, path: &str) -> Result<Match<'_>> {
        let parts: Vec<&str> = path.split('/').collect();
        self.query_parts(&parts)
    }

    pub fn query_parts(&self, parts: &[&str]) -> Result<Match<'_>> {
        let miss = || EpiError::NoMatch(parts.join("/"));
        let (disease_id, rest) = parts.split_first().ok_or_else(miss)?;
        let disease = self
            .diseases
            .iter()
            .find(|d| d.id == *disease_id)
            .ok_or_else(miss)?;
        match rest {
            [] => Ok(Match::Disease(disease)),
            [paper] => disease.paper(paper).map(Match::Paper).ok_or_else(miss),
            [paper, estimate] => disease
                .paper(paper)
                .and_then(|p| p.estimate(estimate))
                .map(Match::Estimate)
                .ok_or_else(miss),
            _ => Err(miss()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn in_text_citations_follow_author_count() {
        assert_eq!(PaperId::new("Santos", None, 2022).in_text(), "Santos 2022");
        assert_eq!(
            PaperId::new("Tsay", Some("et al."), 2020).in_text(),
            "Tsay et al. 2020"
        );
        assert_eq!(
            PaperId::new("Lauer", Some("Grantz"), 2020).in_text(),
            "Lauer, Grantz 2020"
        );
    }

    #[test]
    fn queries_walk_the_hierarchy() {
        let registry = Registry::builtin();
        match registry.query("SARS-CoV-2").expect("disease") {
            Match::Disease(d) => assert_eq!(d.to_string(), "COVID-19"),
            other => panic!("expected disease, got {other:?}"),
        }
        match registry.query("SARS-CoV-2/Tsay et al. 2020").expect("paper") {
            Match::Paper(p) => assert_eq!(p.estimates.len(), 3),
            other => panic!("expected paper, got {other:?}"),
        }
        match registry.query("SARS-CoV-2/Santos 2022/beta").expect("estimate") {
            Match::Estimate(e) => assert_eq!(e.value(0.0), 2.93),
            other => panic!("expected estimate, got {other:?}"),
        }
        match registry
            .query_parts(&["SARS-CoV-2", "Bentout et al. 2020", "r_0"])
            .expect("estimate")
        {
            Match::Estimate(e) => assert_eq!(e.value(10.0), 4.1),
            other => panic!("expected estimate, got {other:?}"),
        }
    }

    #[test]
    fn misses_are_errors() {
        let registry = Registry::builtin();
        for path in [
            "MERS",
            "SARS-CoV-2/Nobody 1999",
            "SARS-CoV-2/Santos 2022/omega",
            "SARS-CoV-2/Santos 2022/beta/extra",
        ] {
            let err = registry.query(path).expect_err(path);
            assert!(matches!(err, EpiError::NoMatch(p) if p == path));
        }
    }

    #[test]
    fn user_registered_diseases_are_queryable() {
        let mut registry = Registry::new();
        registry.register(Disease {
            id: "FLU".into(),
            name: None,
            description: None,
            papers: vec![Paper::new(
                PaperId::new("Doe", None, 2021),
                vec![Estimate::new("gamma", 0.25)],
            )],
        });
        assert!(matches!(
            registry.query("FLU/Doe 2021/gamma"),
            Ok(Match::Estimate(e)) if e.value(0.0) == 0.25
        ));
        assert_eq!(registry.diseases()[0].to_string(), "FLU");
    }

    #[test]
    fn sampling_adds_gaussian_noise() {
        let estimate = Estimate::new("beta", 2.0);
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(estimate.sample(0.0, 0.0, &mut rng), 2.0);

        let draws = 2000;
        let mean = (0..draws)
            .map(|_| estimate.sample(0.0, 0.1, &mut rng))
            .sum::<f64>()
            / draws as f64;
        assert!((mean - 2.0).abs() < 0.02, "mean {mean}");
    }

    #[test]
    fn papers_describe_themselves() {
        let registry = Registry::builtin();
        let Ok(Match::Paper(paper)) = registry.query("SARS-CoV-2/Santos 2022") else {
            panic!("santos should be bundled");
        };
        assert!(paper.to_string().starts_with("Parameter Estimation for a Modified SEIR"));
        assert!(paper.about().starts_with("Santos, G. L. I. (2022)"));
        let meta = paper.metadata.as_ref().expect("metadata");
        assert_eq!(meta.published, NaiveDate::from_ymd_opt(2022, 5, 19));
    }
}
