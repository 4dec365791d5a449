//! Selector tables for applicant-tracking systems and job boards.

use jobscout_core::error::AppError;
use jobscout_core::models::{EmploymentType, Field, MethodKind};
use jobscout_core::record::ExtractionRecord;
use jobscout_core::util::title_case;

use super::{PageContext, classify_heading, employment_from_text, list_items};
use crate::dom::{DomNode, DomQuery};

/// Ordered candidate selectors per field for one platform.
#[derive(Debug)]
pub struct SiteProfile {
    pub name: &'static str,
    /// Host suffixes the profile applies to.
    pub hosts: &'static [&'static str],
    pub title: &'static [&'static str],
    pub company: &'static [&'static str],
    pub location: &'static [&'static str],
    pub description: &'static [&'static str],
    pub employment_type: &'static [&'static str],
    /// The first path segment names the company (`jobs.lever.co/acme/...`).
    pub company_in_path: bool,
}

pub const PROFILES: &[SiteProfile] = &[
    SiteProfile {
        name: "greenhouse",
        hosts: &["greenhouse.io"],
        title: &[".app-title", "h1.app-title", "[data-qa='job-name']", "h1.section-header", "h1"],
        company: &[".company-name", "[data-qa='company-name']", "meta[property='og:site_name']"],
        location: &[".location", "[data-qa='job-location']", ".job-location", ".job__location"],
        description: &["#content", ".job-post-content", ".section-wrapper--description", ".job__description", "#app-body"],
        employment_type: &[".employment-type", "[data-qa='job-type']"],
        company_in_path: true,
    },
    SiteProfile {
        name: "lever",
        hosts: &["lever.co"],
        title: &[".posting-headline h2", ".posting-headline"],
        company: &[".main-header-text a", ".main-header-logo img[alt]", "meta[property='og:site_name']"],
        location: &[".posting-categories .location", ".sort-by-location"],
        description: &[".posting-page .content", ".posting-content", ".section-wrapper"],
        employment_type: &[".posting-categories .commitment", ".sort-by-commitment"],
        company_in_path: true,
    },
    SiteProfile {
        name: "workday",
        hosts: &["myworkdayjobs.com", "workday.com"],
        title: &["[data-automation-id='jobPostingHeader']", "h1"],
        company: &["[data-automation-id='company']", ".company", "meta[property='og:site_name']"],
        location: &["[data-automation-id='locations']", ".location"],
        description: &["[data-automation-id='jobPostingDescription']", ".jobDescription"],
        employment_type: &["[data-automation-id='time']"],
        company_in_path: false,
    },
    SiteProfile {
        name: "bamboohr",
        hosts: &["bamboohr.com"],
        title: &[".BambooHR-ATS-Job-Title", "h2", "h1"],
        company: &[".BambooHR-ATS-Company-Name", "meta[property='og:site_name']"],
        location: &[".BambooHR-ATS-Location"],
        description: &[".BambooHR-ATS-Description"],
        employment_type: &[".BambooHR-ATS-Employment-Type"],
        company_in_path: false,
    },
    SiteProfile {
        name: "smartrecruiters",
        hosts: &["smartrecruiters.com"],
        title: &["[data-test='job-title']", "h1.job-title", "h1"],
        company: &["[data-test='company-name']", "meta[property='og:site_name']"],
        location: &["[data-test='job-location']", ".job-location"],
        description: &["[data-test='job-description']", ".job-sections"],
        employment_type: &["[data-test='job-type']"],
        company_in_path: false,
    },
    SiteProfile {
        name: "ashby",
        hosts: &["ashbyhq.com"],
        title: &["h1[class*='title']", "h1"],
        company: &["meta[property='og:site_name']", "img[class*='logo'][alt]"],
        location: &["[class*='location'] p", "[class*='location']"],
        description: &["[class*='descriptionText']", "[class*='description']"],
        employment_type: &["[class*='employmentType']"],
        company_in_path: true,
    },
    SiteProfile {
        name: "jobvite",
        hosts: &["jobvite.com"],
        title: &[".jv-job-detail-title", "h1"],
        company: &[".jv-job-detail-company", "meta[property='og:site_name']"],
        location: &[".jv-job-detail-location", ".location"],
        description: &[".jv-job-detail-description", ".description"],
        employment_type: &[],
        company_in_path: false,
    },
    SiteProfile {
        name: "linkedin",
        hosts: &["linkedin.com"],
        title: &[".top-card-layout__title", ".topcard__title", "h1"],
        company: &[".topcard__org-name-link", ".topcard__flavor--black-link"],
        location: &[".topcard__flavor--bullet", ".job-criteria__text"],
        description: &[".description__text", ".show-more-less-html__markup"],
        employment_type: &[".description__job-criteria-text"],
        company_in_path: false,
    },
    SiteProfile {
        name: "indeed",
        hosts: &["indeed.com"],
        title: &["[data-testid='jobsearch-JobInfoHeader-title']", "h1"],
        company: &["[data-testid='inlineHeader-companyName']", "[data-company-name]"],
        location: &["[data-testid='job-location']", "[data-testid='inlineHeader-companyLocation']"],
        description: &["#jobDescriptionText", ".jobsearch-jobDescriptionText"],
        employment_type: &["[data-testid='jobsearch-JobInfoHeader-jobType']"],
        company_in_path: false,
    },
    SiteProfile {
        name: "glassdoor",
        hosts: &["glassdoor.com"],
        title: &["[data-test='job-title']", "h2", "h1"],
        company: &["[data-test='employer-name']", ".employerName"],
        location: &["[data-test='job-location']", ".location"],
        description: &["[data-test='jobDescription']", ".jobDescriptionContent"],
        employment_type: &[],
        company_in_path: false,
    },
];

/// The profile for a host, matching exact hosts and subdomains.
pub fn profile_for(host: &str) -> Option<&'static SiteProfile> {
    PROFILES.iter().find(|profile| {
        profile
            .hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{h}")))
    })
}

pub fn extract<D: DomQuery>(doc: &D, ctx: &PageContext<'_>) -> Result<ExtractionRecord, AppError> {
    let mut record = ExtractionRecord::new(MethodKind::SiteProfile);
    let Some(profile) = profile_for(&ctx.host) else {
        return Ok(record);
    };
    tracing::debug!(profile = profile.name, url = ctx.url, "Using site profile");

    if let Some(title) = doc.first_text(profile.title) {
        record.set_text(Field::Title, title);
    }
    match doc.first_text(profile.company) {
        Some(company) => record.set_text(Field::Company, company),
        None if profile.company_in_path => {
            if let Some(company) = company_from_path(ctx) {
                record.set_text(Field::Company, company);
            }
        }
        None => {}
    }
    if let Some(location) = doc.first_text(profile.location) {
        record.set_text(Field::Location, location.trim_end_matches(['/', ' ']));
    }

    let description_node = profile
        .description
        .iter()
        .find_map(|sel| doc.select_one(sel));
    let description = description_node
        .as_ref()
        .map(|node| ctx.description_of(node))
        .filter(|text| text.chars().count() > 2);

    let employment = doc
        .first_text(profile.employment_type)
        .and_then(|raw| EmploymentType::parse(&raw))
        .map(|ty| ty.as_str())
        .or_else(|| description.as_deref().and_then(employment_from_text));
    if let Some(employment) = employment {
        record.set_text(Field::EmploymentType, employment);
    }

    if let Some(node) = &description_node {
        collect_sections(node, &mut record);
    }
    if let Some(description) = description {
        record.set_block(Field::Description, description);
    }

    Ok(record)
}

/// Company slug from the first path segment, title-cased.
fn company_from_path(ctx: &PageContext<'_>) -> Option<String> {
    let base = ctx.base.as_ref()?;
    let slug = base.path_segments()?.find(|s| !s.is_empty())?;
    let slug = slug.trim();
    if slug.len() < 2 || slug.eq_ignore_ascii_case("jobs") || slug.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(title_case(slug))
}

/// Lists under `<h3>`/`<h4>` section headings, mapped by heading text.
fn collect_sections<N: DomNode>(container: &N, record: &mut ExtractionRecord) {
    for heading in container.select_all("h2, h3, h4") {
        let Some(field) = classify_heading(&heading.text()) else {
            continue;
        };
        let list = heading
            .next_element()
            .filter(|next| matches!(next.tag_name(), "ul" | "ol"))
            .or_else(|| heading.parent_element().and_then(|p| p.select_one("ul, ol")));
        if let Some(list) = list {
            record.extend_list(field, list_items(&list));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::TextCleaner;
    use crate::dom::HtmlDocument;

    fn run(html: &str, url: &str) -> ExtractionRecord {
        let cleaner = TextCleaner::new();
        let ctx = PageContext::new(url, &cleaner);
        extract(&HtmlDocument::parse(html), &ctx).unwrap()
    }

    const LEVER: &str = r#"<html><body>
        <div class="posting-headline"><h2>Platform Engineer</h2>
          <div class="posting-categories">
            <div class="location">Toronto, ON /</div>
            <div class="commitment">Full-time</div></div></div>
        <div class="posting-content">
          <div class="section"><p>Join the <a href="/initech/about">platform</a> team and help us scale.</p></div>
          <div class="section"><h3>What you'll do</h3>
            <ul><li>Run the build fleet</li><li>Own the deploy pipeline</li></ul></div>
          <div class="section"><h3>Requirements</h3>
            <ul><li>Linux experience</li><li>Terraform</li></ul></div>
        </div></body></html>"#;

    #[test]
    fn test_profile_lookup() {
        assert_eq!(profile_for("jobs.lever.co").unwrap().name, "lever");
        assert_eq!(profile_for("boards.greenhouse.io").unwrap().name, "greenhouse");
        assert_eq!(profile_for("jobs.ashbyhq.com").unwrap().name, "ashby");
        assert_eq!(profile_for("acme.wd5.myworkdayjobs.com").unwrap().name, "workday");
        assert!(profile_for("notlever.com").is_none());
        assert!(profile_for("example.com").is_none());
    }

    #[test]
    fn test_lever_posting() {
        let record = run(LEVER, "https://jobs.lever.co/initech/abc-123");

        assert_eq!(record.text(Field::Title), Some("Platform Engineer"));
        assert_eq!(record.text(Field::Company), Some("Initech"));
        assert_eq!(record.text(Field::Location), Some("Toronto, ON"));
        assert_eq!(record.text(Field::EmploymentType), Some("full-time"));
        assert_eq!(
            record.list(Field::Responsibilities),
            ["Run the build fleet", "Own the deploy pipeline"]
        );
        assert_eq!(record.list(Field::Qualifications), ["Linux experience", "Terraform"]);
        let description = record.text(Field::Description).unwrap();
        assert!(description.contains("platform (https://jobs.lever.co/initech/about)"));
    }

    #[test]
    fn test_greenhouse_company_slug() {
        let html = r#"<html><body><h1 class="app-title">Data Analyst</h1>
            <div class="location">Remote</div>
            <div id="content"><p>Analyze things for the business every day.</p></div></body></html>"#;
        let record = run(html, "https://boards.greenhouse.io/globex-corp/jobs/42");
        assert_eq!(record.text(Field::Title), Some("Data Analyst"));
        assert_eq!(record.text(Field::Company), Some("Globex Corp"));
        assert_eq!(record.text(Field::Location), Some("Remote"));
    }

    #[test]
    fn test_unknown_host_is_empty() {
        let record = run(LEVER, "https://careers.example.com/1");
        assert!(record.is_empty());
    }
}
