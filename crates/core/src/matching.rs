use serde::{Deserialize, Serialize};

use crate::{
    reactions::{ReactionMode, ReactionStore},
    skills::SkillSet,
    types::{Job, JobType, WorkplaceType},
};

/// Filter parameters as they arrive from a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub workplace_type: Option<String>,
    #[serde(default)]
    pub min_salary: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

/// Typed filter state. A `None` field is inactive and passes every job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilters {
    pub job_type: Option<JobType>,
    pub workplace_type: Option<WorkplaceType>,
    pub min_salary: Option<f64>,
    /// Stored lower-cased.
    pub city: Option<String>,
    /// Stored lower-cased.
    pub search: Option<String>,
}

impl JobFilters {
    /// Resolves raw parameters. Blank values and non-numeric salary
    /// thresholds are treated as inactive.
    pub fn from_params(params: &FilterParams) -> Self {
        Self {
            job_type: non_blank(params.job_type.as_deref()).map(JobType::parse),
            workplace_type: non_blank(params.workplace_type.as_deref()).map(WorkplaceType::parse),
            min_salary: non_blank(params.min_salary.as_deref())
                .and_then(|raw| raw.parse::<f64>().ok())
                .filter(|value| value.is_finite()),
            city: non_blank(params.city.as_deref()).map(str::to_lowercase),
            search: non_blank(params.search.as_deref()).map(str::to_lowercase),
        }
    }

    pub fn with_job_type(mut self, value: JobType) -> Self {
        self.job_type = Some(value);
        self
    }

    pub fn with_workplace_type(mut self, value: WorkplaceType) -> Self {
        self.workplace_type = Some(value);
        self
    }

    pub fn with_min_salary(mut self, value: f64) -> Self {
        self.min_salary = Some(value);
        self
    }

    pub fn with_city(mut self, value: &str) -> Self {
        self.city = non_blank(Some(value)).map(str::to_lowercase);
        self
    }

    pub fn with_search(mut self, value: &str) -> Self {
        self.search = non_blank(Some(value)).map(str::to_lowercase);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.job_type.is_none()
            && self.workplace_type.is_none()
            && self.min_salary.is_none()
            && self.city.is_none()
            && self.search.is_none()
    }

    /// Returns `true` when the job satisfies every active predicate.
    pub fn matches(&self, job: &Job) -> bool {
        self.matches_job_type(job)
            && self.matches_workplace_type(job)
            && self.matches_min_salary(job)
            && self.matches_city(job)
            && self.matches_search(job)
    }

    fn matches_job_type(&self, job: &Job) -> bool {
        match &self.job_type {
            Some(wanted) => job.job_type.as_ref() == Some(wanted),
            None => true,
        }
    }

    fn matches_workplace_type(&self, job: &Job) -> bool {
        match &self.workplace_type {
            Some(wanted) => job.workplace_type.as_ref() == Some(wanted),
            None => true,
        }
    }

    fn matches_min_salary(&self, job: &Job) -> bool {
        match self.min_salary {
            Some(threshold) => job.salary_min.map(|min| min >= threshold).unwrap_or(false),
            None => true,
        }
    }

    fn matches_city(&self, job: &Job) -> bool {
        match &self.city {
            Some(needle) => contains_lowercase(job.city(), needle),
            None => true,
        }
    }

    fn matches_search(&self, job: &Job) -> bool {
        match &self.search {
            Some(needle) => {
                contains_lowercase(job.occupation.as_deref(), needle)
                    || contains_lowercase(job.company_name(), needle)
            }
            None => true,
        }
    }
}

/// Returns `true` when any skill occurs in the job's specialty or occupation.
pub fn is_skill_match(job: &Job, skills: &SkillSet) -> bool {
    skills.matches_text(job.specialty.as_deref()) || skills.matches_text(job.occupation.as_deref())
}

/// Stable partition: matching jobs first, original order kept within each
/// group. An empty skill set leaves the order untouched.
pub fn rank_by_skills<'a>(jobs: &'a [Job], skills: &SkillSet) -> Vec<&'a Job> {
    if skills.is_empty() {
        return jobs.iter().collect();
    }

    let (mut matched, rest): (Vec<&Job>, Vec<&Job>) =
        jobs.iter().partition(|job| is_skill_match(job, skills));
    matched.extend(rest);
    matched
}

/// Keeps the jobs passing every active filter, preserving order.
pub fn filter_jobs<'a, I>(jobs: I, filters: &JobFilters) -> Vec<&'a Job>
where
    I: IntoIterator<Item = &'a Job>,
{
    jobs.into_iter().filter(|job| filters.matches(job)).collect()
}

/// Ranks by skill match, then filters. Pass an empty skill set for views
/// that do not rank.
pub fn list_visible_jobs(jobs: &[Job], skills: &SkillSet, filters: &JobFilters) -> Vec<Job> {
    filter_jobs(rank_by_skills(jobs, skills), filters)
        .into_iter()
        .cloned()
        .collect()
}

/// Jobs carrying a reaction admitted by `mode`, in their original order.
pub fn list_reacted_jobs(jobs: &[Job], reactions: &ReactionStore, mode: ReactionMode) -> Vec<Job> {
    jobs.iter()
        .filter(|job| mode.admits(reactions.get(&job.id)))
        .cloned()
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn contains_lowercase(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|text| text.to_lowercase().contains(needle))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompanyRef, JobId};

    fn job(id: i64) -> Job {
        Job::new(id)
    }

    fn with_specialty(id: i64, specialty: &str) -> Job {
        let mut job = job(id);
        job.specialty = Some(specialty.to_string());
        job
    }

    fn ids(jobs: &[Job]) -> Vec<&str> {
        jobs.iter().map(|job| job.id.as_str()).collect()
    }

    fn example_jobs() -> Vec<Job> {
        let mut first = job(1);
        first.salary_min = Some(400.0);
        first.job_type = Some(JobType::FullTime);
        first.location = Some("Tashkent".to_string());

        let mut second = job(2);
        second.salary_min = Some(600.0);
        second.job_type = Some(JobType::PartTime);
        second.location = Some("Samarkand".to_string());

        vec![first, second]
    }

    #[test]
    fn ranking_is_a_stable_partition() {
        let jobs = vec![
            with_specialty(1, "Accountant"),
            with_specialty(2, "Rust engineer"),
            with_specialty(3, "Designer"),
            with_specialty(4, "Embedded RUST"),
        ];
        let skills: SkillSet = ["rust"].into_iter().collect();

        let ranked = list_visible_jobs(&jobs, &skills, &JobFilters::default());
        assert_eq!(ids(&ranked), vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn empty_skill_set_keeps_order() {
        let jobs = vec![with_specialty(1, "a"), with_specialty(2, "rust")];
        let ranked = rank_by_skills(&jobs, &SkillSet::new());
        assert_eq!(ranked[0].id.as_str(), "1");
        assert_eq!(ranked[1].id.as_str(), "2");
    }

    #[test]
    fn occupation_also_counts_as_match() {
        let mut candidate = job(5);
        candidate.occupation = Some("Python developer".to_string());
        let skills: SkillSet = ["python"].into_iter().collect();
        assert!(is_skill_match(&candidate, &skills));
        assert!(!is_skill_match(&job(6), &skills));
    }

    #[test]
    fn min_salary_filter_matches_example() {
        let jobs = example_jobs();
        let filters = JobFilters::from_params(&FilterParams {
            min_salary: Some("500".to_string()),
            ..FilterParams::default()
        });

        let visible = list_visible_jobs(&jobs, &SkillSet::new(), &filters);
        assert_eq!(ids(&visible), vec!["2"]);
    }

    #[test]
    fn non_numeric_threshold_is_inactive() {
        let filters = JobFilters::from_params(&FilterParams {
            min_salary: Some("lots".to_string()),
            city: Some("   ".to_string()),
            ..FilterParams::default()
        });
        assert!(filters.is_empty());
        assert_eq!(list_visible_jobs(&example_jobs(), &SkillSet::new(), &filters).len(), 2);
    }

    #[test]
    fn filters_commute() {
        let jobs = example_jobs();
        let by_type = JobFilters::default().with_job_type(JobType::FullTime);
        let by_city = JobFilters::default().with_city("tash");

        let type_then_city: Vec<Job> = filter_jobs(filter_jobs(&jobs, &by_type), &by_city)
            .into_iter()
            .cloned()
            .collect();
        let city_then_type: Vec<Job> = filter_jobs(filter_jobs(&jobs, &by_city), &by_type)
            .into_iter()
            .cloned()
            .collect();
        let combined = list_visible_jobs(
            &jobs,
            &SkillSet::new(),
            &JobFilters::default()
                .with_job_type(JobType::FullTime)
                .with_city("TASH"),
        );

        assert_eq!(type_then_city, city_then_type);
        assert_eq!(type_then_city, combined);
        assert_eq!(ids(&combined), vec!["1"]);
    }

    #[test]
    fn search_checks_occupation_and_company_name() {
        let mut by_occupation = job(1);
        by_occupation.occupation = Some("Data Analyst".to_string());
        let mut by_company = job(2);
        by_company.company = Some(CompanyRef {
            name: Some("Analytica LLC".to_string()),
            ..CompanyRef::default()
        });
        let unrelated = job(3);
        let jobs = vec![by_occupation, by_company, unrelated];

        let filters = JobFilters::default().with_search("ANALY");
        let visible = list_visible_jobs(&jobs, &SkillSet::new(), &filters);
        assert_eq!(ids(&visible), vec!["1", "2"]);
    }

    #[test]
    fn missing_fields_fail_active_predicates() {
        let jobs = vec![job(1)];
        let filters = JobFilters::default()
            .with_workplace_type(WorkplaceType::Remote)
            .with_min_salary(1.0);
        assert!(list_visible_jobs(&jobs, &SkillSet::new(), &filters).is_empty());
    }

    #[test]
    fn workplace_filter_keeps_only_that_workplace() {
        let mut remote = job(1);
        remote.workplace_type = Some(WorkplaceType::Remote);
        let mut onsite = job(2);
        onsite.workplace_type = Some(WorkplaceType::Onsite);
        let jobs = vec![remote, onsite];

        let filters = JobFilters::default().with_workplace_type(WorkplaceType::Remote);
        assert_eq!(ids(&list_visible_jobs(&jobs, &SkillSet::new(), &filters)), vec!["1"]);
    }

    #[test]
    fn job_type_filter_keeps_only_that_type() {
        let filters = JobFilters::default().with_job_type(JobType::PartTime);
        let visible = list_visible_jobs(&example_jobs(), &SkillSet::new(), &filters);
        assert_eq!(ids(&visible), vec!["2"]);
    }

    #[test]
    fn city_filter_uses_company_city_when_location_is_missing() {
        let mut via_company = job(1);
        via_company.company = Some(CompanyRef {
            city: Some("Bukhara".to_string()),
            ..CompanyRef::default()
        });
        let mut elsewhere = job(2);
        elsewhere.location = Some("Samarkand".to_string());
        elsewhere.company = Some(CompanyRef {
            city: Some("Bukhara".to_string()),
            ..CompanyRef::default()
        });
        let jobs = vec![via_company, elsewhere];

        let filters = JobFilters::default().with_city("bukh");
        assert_eq!(ids(&list_visible_jobs(&jobs, &SkillSet::new(), &filters)), vec!["1"]);
    }

    #[test]
    fn salary_threshold_is_inclusive() {
        let filters = JobFilters::default().with_min_salary(600.0);
        let visible = list_visible_jobs(&example_jobs(), &SkillSet::new(), &filters);
        assert_eq!(ids(&visible), vec!["2"]);
    }

    #[test]
    fn params_parse_labels_and_lowercase_text() {
        let filters = JobFilters::from_params(&FilterParams {
            job_type: Some("full-time".to_string()),
            workplace_type: Some(" REMOTE ".to_string()),
            min_salary: Some(" 250.5 ".to_string()),
            city: Some("TashKent".to_string()),
            search: Some("Rust".to_string()),
        });

        assert_eq!(filters.job_type, Some(JobType::FullTime));
        assert_eq!(filters.workplace_type, Some(WorkplaceType::Remote));
        assert_eq!(filters.min_salary, Some(250.5));
        assert_eq!(filters.city.as_deref(), Some("tashkent"));
        assert_eq!(filters.search.as_deref(), Some("rust"));
    }

    #[test]
    fn unknown_label_matches_only_the_same_label() {
        let mut internship = job(1);
        internship.job_type = Some(JobType::parse("Internship"));
        let jobs = vec![internship, job(2)];

        let filters = JobFilters::from_params(&FilterParams {
            job_type: Some("Internship".to_string()),
            ..FilterParams::default()
        });
        assert_eq!(ids(&list_visible_jobs(&jobs, &SkillSet::new(), &filters)), vec!["1"]);
    }

    #[test]
    fn reacted_jobs_follow_mode() {
        let jobs = example_jobs();
        let mut reactions = ReactionStore::new();
        reactions.toggle_like(&JobId::from(1));
        reactions.toggle_dislike(&JobId::from(2));

        assert_eq!(ids(&list_reacted_jobs(&jobs, &reactions, ReactionMode::Like)), vec!["1"]);
        assert_eq!(
            ids(&list_reacted_jobs(&jobs, &reactions, ReactionMode::Dislike)),
            vec!["2"]
        );
        assert_eq!(
            ids(&list_reacted_jobs(&jobs, &reactions, ReactionMode::All)),
            vec!["1", "2"]
        );
    }

    #[test]
    fn unreacted_jobs_never_appear_in_inbox() {
        let jobs = example_jobs();
        assert!(list_reacted_jobs(&jobs, &ReactionStore::new(), ReactionMode::All).is_empty());
    }
}
