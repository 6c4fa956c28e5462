//! Bundled estimates.

use super::{Disease, Estimate, Paper, PaperId, PaperMetadata};
use chrono::NaiveDate;

fn metadata(
    title: &str,
    authors: &[&str],
    journal: &str,
    (year, month, day): (i32, u32, u32),
    url: &str,
) -> PaperMetadata {
    PaperMetadata {
        title: title.to_string(),
        description: None,
        authors: authors.iter().map(|a| a.to_string()).collect(),
        journal: journal.to_string(),
        published: NaiveDate::from_ymd_opt(year, month, day),
        url: url.to_string(),
    }
}

const PHILIPPINES_SEIR: &str =
    "Estimated using an SEIR model and fit via a genetic algorithm using data from the Philippines";
const US_SEAIR: &str = "Estimated using data from the U.S. in the context of an SEAIR model";
const ALGERIA_SEIR: &str = "Estimated using data from the beginning of Algeria's COVID-19 outbreak in the context of an SEIR model";
const KOREA_US_SQAIR: &str =
    "Estimated using data from South Korea and the U.S. in the context of a SQAIR model";

fn santos() -> Paper {
    Paper::new(
        PaperId::new("Santos", None, 2022),
        vec![
            Estimate::new("beta", 2.93)
                .described("Constant-valued approximation of Beta", PHILIPPINES_SEIR),
            Estimate::new("delta", 0.28).described(
                "Constant-valued approximation of Delta",
                &format!("{PHILIPPINES_SEIR}; referred to in the paper as \"sigma,\" though it still represents the incubation rate delta"),
            ),
            Estimate::new("gamma", 0.33).described(
                "Constant-valued approximation of Gamma",
                &format!("{PHILIPPINES_SEIR}; represents the removal rate in particular (not recovery rate)"),
            ),
        ],
    )
    .with_metadata(metadata(
        "Parameter Estimation for a Modified SEIR Model of the COVID-19 Dynamics in the Philippines using Genetic Algorithm",
        &["Gabriel Lorenzo I. Santos"],
        "medRxiv",
        (2022, 5, 19),
        "https://www.medrxiv.org/content/10.1101/2022.05.17.22275187v1",
    ))
    .with_full("Santos, G. L. I. (2022). Parameter estimation for a modified SEIR model of the COVID-19 dynamics in the Philippines using genetic algorithm (p. 2022.05.17.22275187). medRxiv. https://www.medrxiv.org/content/10.1101/2022.05.17.22275187v1")
}

fn tsay() -> Paper {
    Paper::new(
        PaperId::new("Tsay", Some("et al."), 2020),
        vec![
            Estimate::new("kappa", 0.2).described(
                "Average testing rate",
                &format!("{US_SEAIR}; represents the probability of asymptomatic individuals becoming officially confirmed as infected cases"),
            ),
            Estimate::new("gamma", 0.0255).described(
                "Average recovery rate",
                &format!("{US_SEAIR}; referred to as \"beta\" in the paper"),
            ),
            Estimate::new("rho", 0.0255).described(
                "Average death rate",
                &format!("{US_SEAIR}; referred to as \"mu\" in the paper"),
            ),
        ],
    )
    .with_metadata(metadata(
        "Modeling, state estimation, and optimal control for the US COVID-19 outbreak",
        &["Calvin Tsay", "Fernando Lejarza", "Mark A. Stadtherr", "Michael Baldea"],
        "Nature",
        (2020, 7, 1),
        "https://www.fmda.org/COVID/Published-Peer-Reviewed-Journal-Articles/s41598-020-67459-8.pdf",
    ))
    .with_full("Tsay, C., Lejarza, F., Stadtherr, M. A., & Baldea, M. (2020). Modeling, state estimation, and optimal control for the US COVID-19 outbreak. Scientific Reports, 10(1), 10711. https://doi.org/10.1038/s41598-020-67459-8")
}

fn bentout() -> Paper {
    Paper::new(
        PaperId::new("Bentout", Some("et al."), 2020),
        vec![
            Estimate::new("r_0", 4.1).described("Estimated initial R Naught", ALGERIA_SEIR),
            Estimate::new("beta", 0.41).described("Estimated initial Beta", ALGERIA_SEIR),
            Estimate::new("gamma", 0.1).described(
                "Gamma approximation (pulled from various sources)",
                &format!("{ALGERIA_SEIR}; represents the removal (not recovery) rate"),
            ),
            Estimate::new("delta", 0.2).described(
                "Delta approximation (pulled from various sources including the WHO Coronavirus dataset)",
                &format!("{ALGERIA_SEIR}; referred to as \"lambda\" in the paper"),
            ),
        ],
    )
    .with_metadata(metadata(
        "Parameter estimation and prediction for coronavirus disease outbreak 2019 (COVID-19) in Algeria",
        &["Soufiane Bentout", "Abdennasser Chekroun", "Toshikazu Kuniya"],
        "AIMS Public Health",
        (2020, 5, 22),
        "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC7327392/",
    ))
    .with_full("Bentout, Soufiane, Abdennasser Chekroun, and Toshikazu Kuniya. \"Parameter Estimation and Prediction for Coronavirus Disease Outbreak 2019 (COVID-19) in Algeria.\" AIMS Public Health 7, no. 2 (May 22, 2020): 306-18. https://doi.org/10.3934/publichealth.2020026.")
}

fn mehra() -> Paper {
    Paper::new(
        PaperId::new("Mehra", Some("et al."), 2020),
        vec![
            Estimate::new("gamma", 0.222).described(
                "Average Gamma estimate",
                &format!("{KOREA_US_SQAIR}; represents the recovery rate; referred to as \"g\" in the paper"),
            ),
            Estimate::new("rho", 0.0257).described(
                "Average Rho estimate",
                &format!("{KOREA_US_SQAIR}; represents the death rate; referred to as \"mu sub d\" in the paper"),
            ),
            Estimate::new("kappa", 0.214).described(
                "Average testing rate estimate",
                &format!("{KOREA_US_SQAIR}; represents the probability of asymptomatic individuals becoming officially confirmed as infected cases; referred to as \"alpha\" in the paper but renamed to kappa for consistency"),
            ),
        ],
    )
    .with_metadata(metadata(
        "Parameter Estimation and Prediction of COVID-19 Epidemic Turning Point and Ending Time of a Case Study on SIR/SQAIR Epidemic Models",
        &["Amir Hossein Amiri Mehra", "Mohsen Shafieirad", "Zohreh Abbasi", "Iman Zamani"],
        "Hindawi",
        (2020, 12, 29),
        "https://www.hindawi.com/journals/cmmm/2020/1465923/",
    ))
    .with_full("Amiri Mehra, Amir Hossein, Mohsen Shafieirad, Zohreh Abbasi, and Iman Zamani. \"Parameter Estimation and Prediction of COVID-19 Epidemic Turning Point and Ending Time of a Case Study on SIR/SQAIR Epidemic Models.\" Computational and Mathematical Methods in Medicine 2020 (December 29, 2020): e1465923. https://doi.org/10.1155/2020/1465923.")
}

pub fn covid() -> Disease {
    Disease {
        id: "SARS-CoV-2".to_string(),
        name: Some("COVID-19".to_string()),
        description: Some("severe acute respiratory syndrome coronavirus 2".to_string()),
        papers: vec![santos(), tsay(), bentout(), mehra()],
    }
}
