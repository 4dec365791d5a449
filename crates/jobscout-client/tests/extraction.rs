use chrono::Utc;
use jobscout_client::ExtractorSuite;
use jobscout_core::testutil::{MockExecutor, MockReporter};
use jobscout_core::traits::{NullStore, RecordExtractor};
use jobscout_core::{
    AcquisitionService, EngineConfig, FieldSource, JobPosting, MethodKind, Normalizer,
    Orchestrator, SalaryPeriod, StrategyKind, merge_records,
};

fn pipeline(html: &str, url: &str) -> JobPosting {
    let records = ExtractorSuite::default().extract_all(html, url);
    Normalizer::default().normalize(&merge_records(records), url, Utc::now())
}

const JSON_LD_PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<title>Backend Engineer at Acme</title>
<script type="application/ld+json">
{
  "@context": "https://schema.org",
  "@type": "JobPosting",
  "title": "Backend Engineer",
  "hiringOrganization": {"@type": "Organization", "name": "Acme"},
  "employmentType": "FULL_TIME",
  "datePosted": "2025-01-10",
  "jobLocation": {"@type": "Place", "address": {"addressLocality": "Berlin", "addressCountry": "Germany"}},
  "description": "<p>Build and operate the services behind our logistics platform. You will own APIs written in Rust and work closely with the data team.</p>"
}
</script>
</head>
<body>
<h1>Backend Engineer</h1>
<p>Build and operate the services behind our logistics platform. You will own APIs written in Rust and work closely with the data team.</p>
</body></html>"#;

#[test]
fn json_ld_posting_wins_title_and_company() {
    let posting = pipeline(JSON_LD_PAGE, "https://careers.acme.test/jobs/42");

    assert_eq!(posting.title, "Backend Engineer");
    assert_eq!(posting.company, "Acme");
    assert_eq!(posting.provenance.extraction_method, FieldSource::Method(MethodKind::JsonLd));
    assert_eq!(posting.date_posted.as_deref(), Some("2025-01-10"));
    assert!(posting.skills.iter().any(|s| s == "Rust"));

    let json = serde_json::to_value(&posting).unwrap();
    assert_eq!(json["provenance"]["extractionMethod"], "json-ld");
}

#[test]
fn company_is_repaired_from_host_without_structured_data() {
    let html = r#"<html><head><title>Job At Example | Careers</title></head>
<body><main>
<p>We are looking for someone to help us maintain internal tooling and keep our build infrastructure healthy and fast.</p>
</main></body></html>"#;
    let posting = pipeline(html, "https://jobs.example.com/openings/7");

    assert_eq!(posting.title, "Job At Example");
    assert_eq!(posting.company, "Example");
    assert_eq!(posting.provenance.field_sources[&jobscout_core::Field::Company], FieldSource::Repair);
    assert!(!posting.provenance.warnings.is_empty());
}

#[test]
fn salary_sentence_becomes_yearly_usd_range() {
    let html = r#"<html><head><title>Data Engineer - Initech</title></head>
<body><main>
<h1>Data Engineer</h1>
<p>Join the analytics group to build reliable pipelines. Compensation: $100,000 - $150,000 per year plus equity.</p>
</main></body></html>"#;
    let posting = pipeline(html, "https://initech.test/jobs/data-engineer");

    let salary = posting.salary.expect("salary");
    assert_eq!(salary.min, Some(100_000.0));
    assert_eq!(salary.max, Some(150_000.0));
    assert_eq!(salary.currency.as_deref(), Some("USD"));
    assert_eq!(salary.period, Some(SalaryPeriod::Yearly));
}

#[test]
fn date_range_is_not_a_salary() {
    let html = r#"<html><head><title>Seasonal Support Agent - Initech</title></head>
<body><main>
<h1>Seasonal Support Agent</h1>
<p>This assignment runs 2025-01-15 to 2025-02-01 and covers the winter support rotation for our customers.</p>
</main></body></html>"#;
    let posting = pipeline(html, "https://initech.test/jobs/seasonal");

    assert!(posting.salary.is_none());
}

#[tokio::test]
async fn acquisition_runs_the_whole_pipeline() {
    let executor = MockExecutor::with_page(StrategyKind::Direct, JSON_LD_PAGE);
    let orchestrator = Orchestrator::new(vec![executor.clone()], EngineConfig::immediate());
    let service: AcquisitionService<_, _, NullStore> =
        AcquisitionService::new(orchestrator, ExtractorSuite::default());
    let reporter = MockReporter::new();

    let url = "https://careers.acme.test/jobs/42";
    let first = service.acquire_job_posting(url, None, None, &reporter).await.unwrap();
    let second = service.acquire_job_posting(url, None, None, &reporter).await.unwrap();

    assert_eq!(first.title, "Backend Engineer");
    assert_eq!(second.company, "Acme");
    assert_eq!(executor.call_count(), 1);
    assert_eq!(reporter.count("completed"), 2);
}
