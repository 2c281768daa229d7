use std::{borrow::Borrow, fmt};

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};

use crate::skills::SkillSet;

/// Text shown when a job posting carries no description.
pub const NO_DESCRIPTION: &str = "No description provided";

/// Image shown when a company has no logo.
pub const PLACEHOLDER_LOGO: &str = "/static/img/company-placeholder.png";

/// Identifier of a record served by the job/talent API.
///
/// The API returns identifiers either as JSON numbers or strings. Both are
/// normalized to their string form so `1` and `"1"` address the same record,
/// which is also how identifiers are keyed in the persisted reaction mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

pub type JobId = EntityId;
pub type TalentId = EntityId;

impl EntityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(value) => Self(value),
            RawId::Number(value) => Self(value.to_string()),
        })
    }
}

/// Employment type of a posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Freelance,
    Other(String),
}

impl JobType {
    /// Parses an API label. Known labels match case-insensitively, anything
    /// else is kept verbatim.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "full time" | "full_time" | "full-time" => Self::FullTime,
            "part time" | "part_time" | "part-time" => Self::PartTime,
            "contract" => Self::Contract,
            "freelance" => Self::Freelance,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::FullTime => "Full time",
            Self::PartTime => "Part time",
            Self::Contract => "Contract",
            Self::Freelance => "Freelance",
            Self::Other(value) => value,
        }
    }
}

/// Where the work happens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkplaceType {
    Onsite,
    Remote,
    Hybrid,
    Other(String),
}

impl WorkplaceType {
    /// Parses an API label. Known labels match case-insensitively, anything
    /// else is kept verbatim.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "onsite" | "on-site" | "on site" => Self::Onsite,
            "remote" => Self::Remote,
            "hybrid" => Self::Hybrid,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Onsite => "Onsite",
            Self::Remote => "Remote",
            Self::Hybrid => "Hybrid",
            Self::Other(value) => value,
        }
    }
}

macro_rules! label_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let value = String::deserialize(deserializer)?;
                Ok(<$ty>::parse(&value))
            }
        }
    };
}

label_serde!(JobType);
label_serde!(WorkplaceType);

/// Company reference embedded in a job posting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyRef {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub logo: Option<String>,
}

/// Job posting as served by the remote API. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(default, deserialize_with = "lenient")]
    pub occupation: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub specialty: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub job_type: Option<JobType>,
    #[serde(default, deserialize_with = "lenient")]
    pub workplace_type: Option<WorkplaceType>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub salary_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub salary_max: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, rename = "skils")]
    pub skills: SkillSet,
    #[serde(default, deserialize_with = "lenient")]
    pub company: Option<CompanyRef>,
}

impl Job {
    /// Minimal posting with only an identifier, mostly useful for fixtures.
    pub fn new(id: impl Into<JobId>) -> Self {
        Self {
            id: id.into(),
            occupation: None,
            specialty: None,
            job_type: None,
            workplace_type: None,
            salary_min: None,
            salary_max: None,
            location: None,
            description: None,
            skills: SkillSet::default(),
            company: None,
        }
    }

    /// City of the posting, falling back to the company city.
    pub fn city(&self) -> Option<&str> {
        self.location
            .as_deref()
            .or_else(|| self.company.as_ref().and_then(|c| c.city.as_deref()))
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company.as_ref().and_then(|c| c.name.as_deref())
    }

    pub fn display_description(&self) -> &str {
        match self.description.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => NO_DESCRIPTION,
        }
    }

    pub fn logo_url(&self) -> &str {
        match self.company.as_ref().and_then(|c| c.logo.as_deref()) {
            Some(url) if !url.trim().is_empty() => url,
            _ => PLACEHOLDER_LOGO,
        }
    }
}

/// Talent profile; only the skills feed into matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalentProfile {
    pub id: TalentId,
    #[serde(default, deserialize_with = "lenient")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub occupation: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub specialty: Option<String>,
    #[serde(default, rename = "skils")]
    pub skills: SkillSet,
}

/// Optional field that reads as `None` when the value has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

/// Accepts a JSON number, a numeric string, or null. Anything else is `None`.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(number)) => number.as_f64(),
        Some(serde_json::Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_string_ids_are_equivalent() {
        let numeric: EntityId = serde_json::from_value(json!(42)).expect("numeric id");
        let text: EntityId = serde_json::from_value(json!("42")).expect("string id");
        assert_eq!(numeric, text);
        assert_eq!(serde_json::to_value(&numeric).unwrap(), json!("42"));
    }

    #[test]
    fn job_deserializes_with_missing_optional_fields() {
        let job: Job = serde_json::from_value(json!({ "id": 7 })).expect("minimal job");
        assert_eq!(job.id.as_str(), "7");
        assert!(job.occupation.is_none());
        assert!(job.skills.is_empty());
        assert_eq!(job.display_description(), NO_DESCRIPTION);
        assert_eq!(job.logo_url(), PLACEHOLDER_LOGO);
    }

    #[test]
    fn job_parses_full_payload() {
        let job: Job = serde_json::from_value(json!({
            "id": 1,
            "occupation": "Backend developer",
            "specialty": "Rust",
            "job_type": "Full time",
            "workplace_type": "remote",
            "salary_min": "400",
            "salary_max": 900,
            "location": "Tashkent",
            "skils": "Rust, SQL",
            "company": { "name": "Acme", "city": "Samarkand", "logo": "https://cdn/acme.png" }
        }))
        .expect("full job");

        assert_eq!(job.job_type, Some(JobType::FullTime));
        assert_eq!(job.workplace_type, Some(WorkplaceType::Remote));
        assert_eq!(job.salary_min, Some(400.0));
        assert_eq!(job.salary_max, Some(900.0));
        assert_eq!(job.city(), Some("Tashkent"));
        assert_eq!(job.company_name(), Some("Acme"));
        assert_eq!(job.logo_url(), "https://cdn/acme.png");
        assert!(job.skills.contains("sql"));
    }

    #[test]
    fn city_falls_back_to_company() {
        let mut job = Job::new("3");
        job.company = Some(CompanyRef {
            city: Some("Bukhara".to_string()),
            ..CompanyRef::default()
        });
        assert_eq!(job.city(), Some("Bukhara"));
    }

    #[test]
    fn unknown_labels_are_preserved() {
        let kind = JobType::parse("Internship");
        assert_eq!(kind, JobType::Other("Internship".to_string()));
        assert_eq!(kind.as_str(), "Internship");
        assert_eq!(WorkplaceType::parse("On-site"), WorkplaceType::Onsite);
    }

    #[test]
    fn wrongly_typed_fields_fall_back_to_defaults() {
        let job: Job = serde_json::from_value(json!({
            "id": 4,
            "occupation": 12,
            "specialty": { "name": "Rust" },
            "job_type": 3,
            "workplace_type": ["remote"],
            "location": false,
            "description": ["text"],
            "skils": ["Figma", null, 7, "Sketch"],
            "company": { "name": "Acme", "city": 9, "logo": {} }
        }))
        .expect("job with bad fields");

        assert!(job.occupation.is_none());
        assert!(job.specialty.is_none());
        assert!(job.job_type.is_none());
        assert!(job.workplace_type.is_none());
        assert!(job.location.is_none());
        assert_eq!(job.display_description(), NO_DESCRIPTION);
        assert_eq!(job.skills.iter().collect::<Vec<_>>(), vec!["figma", "sketch"]);
        assert_eq!(job.company_name(), Some("Acme"));
        assert_eq!(job.city(), None);
        assert_eq!(job.logo_url(), PLACEHOLDER_LOGO);
    }

    #[test]
    fn non_object_company_is_dropped() {
        let job: Job = serde_json::from_value(json!({ "id": 5, "company": "Acme" })).expect("job");
        assert!(job.company.is_none());
    }

    #[test]
    fn non_numeric_salary_is_ignored() {
        let job: Job = serde_json::from_value(json!({ "id": "x", "salary_min": "negotiable" }))
            .expect("job");
        assert_eq!(job.salary_min, None);
    }
}
