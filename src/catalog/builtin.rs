//! Catalogs compiled into the binary.

const BUILTIN: &[(&str, &str)] = &[
    (
        "job-simulation-business",
        include_str!("../../catalogs/job-simulation-business.json"),
    ),
    (
        "job-simulation-economics",
        include_str!("../../catalogs/job-simulation-economics.json"),
    ),
    (
        "job-simulation-statistics",
        include_str!("../../catalogs/job-simulation-statistics.json"),
    ),
    (
        "skill-checkup-business",
        include_str!("../../catalogs/skill-checkup-business.json"),
    ),
    (
        "skill-checkup-economics",
        include_str!("../../catalogs/skill-checkup-economics.json"),
    ),
    (
        "skill-checkup-statistics",
        include_str!("../../catalogs/skill-checkup-statistics.json"),
    ),
    (
        "career-survey-general",
        include_str!("../../catalogs/career-survey-general.json"),
    ),
    (
        "spec-check-marketing",
        include_str!("../../catalogs/spec-check-marketing.json"),
    ),
    (
        "spec-check-data",
        include_str!("../../catalogs/spec-check-data.json"),
    ),
];

/// `(file name, JSON source)` of every built-in catalog.
pub fn builtin_catalog_sources() -> &'static [(&'static str, &'static str)] {
    BUILTIN
}
