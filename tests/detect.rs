use std::path::PathBuf;
use std::sync::Arc;

use harwappalyzer::{
    Catalog, DetectionResult, EngineConfig, ImpliedConfidence, PageRecord, TechDetector,
};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/catalog.json")
}

fn catalog() -> Arc<Catalog> {
    Catalog::load(&fixture_path(), &EngineConfig::default())
        .expect("fixture catalog should load")
        .into_shared()
}

fn detector() -> TechDetector {
    TechDetector::new(catalog(), EngineConfig::default())
}

fn names(results: &[DetectionResult]) -> Vec<&str> {
    results.iter().map(|r| r.name.as_str()).collect()
}

fn find<'a>(results: &'a [DetectionResult], name: &str) -> &'a DetectionResult {
    results
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("{name} not detected"))
}

fn wordpress_page() -> PageRecord {
    PageRecord::new("https://blog.example.com/")
        .with_html(
            r#"<html><head>
                <meta name="generator" content="WordPress 6.2">
                <link rel="stylesheet" href="/wp-content/themes/twentytwenty/style.css">
                <script src="/cdn/jquery-3.6.0.min.js"></script>
            </head><body></body></html>"#,
        )
        .with_header("Server", "nginx/1.25.3")
        .with_header("X-Powered-By", "PHP/8.2.1")
}

#[test]
fn test_unrelated_page_detects_nothing() {
    let page = PageRecord::new("https://example.com/")
        .with_html("<html><body>hello</body></html>")
        .with_header("Server", "Apache");

    assert!(detector().detect(&page).is_empty());
}

#[test]
fn test_wordpress_page_end_to_end() {
    let results = detector().detect(&wordpress_page());

    assert_eq!(names(&results), vec!["Nginx", "PHP", "WordPress", "jQuery", "MySQL"]);

    let wordpress = find(&results, "WordPress");
    assert_eq!(wordpress.versions, vec!["6.2"]);
    assert_eq!(wordpress.categories, vec!["CMS", "Blogs"]);
    assert_eq!(wordpress.groups, vec!["Content"]);
    assert!(!wordpress.is_implied());

    assert_eq!(find(&results, "Nginx").versions, vec!["1.25.3"]);
    assert_eq!(find(&results, "jQuery").versions, vec!["3.6.0"]);

    // 直接命中的 PHP 保留自身版本与置信度
    let php = find(&results, "PHP");
    assert_eq!(php.versions, vec!["8.2.1"]);
    assert_eq!(php.confidence, 100);
    assert!(php.implied_by.is_empty());

    let mysql = find(&results, "MySQL");
    assert_eq!(mysql.confidence, 60);
    assert_eq!(mysql.implied_by, vec!["WordPress"]);
    assert!(mysql.versions.is_empty());
}

#[test]
fn test_meta_generator_version_extraction() {
    let page = PageRecord::new("https://example.com/").with_meta("generator", "WordPress 6.2");
    let results = detector().detect(&page);

    assert_eq!(find(&results, "WordPress").versions, vec!["6.2"]);
}

#[test]
fn test_confidence_is_bounded() {
    let page = wordpress_page().with_header("Link", r#"<https://blog.example.com/wp-json/>; rel="https://api.w.org/""#);
    let results = detector().detect(&page);

    assert_eq!(find(&results, "WordPress").confidence, 100);
    assert!(results.iter().all(|r| r.confidence <= 100));
}

#[test]
fn test_output_is_deterministic() {
    let page = wordpress_page();

    let first = serde_json::to_string(&detector().analyze(&page)).unwrap();
    let second = serde_json::to_string(&detector().analyze(&page)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_implies_transitive_closure() {
    let page = PageRecord::new("https://example.com/").with_html("<div>alpha-marker</div>");
    let results = detector().detect(&page);

    assert_eq!(names(&results), vec!["Alpha", "Bravo", "Charlie"]);
    assert_eq!(find(&results, "Bravo").implied_by, vec!["Alpha"]);
}

#[test]
fn test_implied_then_excluded() {
    let page = PageRecord::new("https://example.com/").with_html("delta-marker");
    assert_eq!(names(&detector().detect(&page)), vec!["Delta"]);
}

#[test]
fn test_excludes_removes_direct_detection() {
    let page = PageRecord::new("https://example.com/").with_html("golf-marker foxtrot-marker");
    assert_eq!(names(&detector().detect(&page)), vec!["Foxtrot"]);
}

#[test]
fn test_malformed_rule_does_not_block_others() {
    let page = PageRecord::new("https://example.com/").with_html("yttrium-marker xenon-marker");
    let analysis = detector().analyze(&page);

    assert_eq!(names(&analysis.technologies), vec!["Yttrium", "Xenon"]);
    assert_eq!(analysis.warnings.len(), 1);
    assert_eq!(analysis.warnings[0].technology, "Xenon");
    assert_eq!(analysis.warnings[0].pattern, "(unclosed");
}

#[test]
fn test_rank_by_confidence_then_name() {
    let page = PageRecord::new("https://example.com/").with_html("zinc-marker xenon-marker yttrium-marker");
    let results = detector().detect(&page);

    assert_eq!(names(&results), vec!["Yttrium", "Xenon", "Zinc"]);
    assert_eq!(results[0].confidence, 90);
    assert_eq!(results[1].confidence, 50);
}

#[test]
fn test_dangling_implies_target_is_skipped() {
    let page = PageRecord::new("https://example.com/").with_header("CF-RAY", "7d1c2b3a4e5f-AMS");
    let results = detector().detect(&page);

    assert_eq!(names(&results), vec!["Cloudflare"]);
    assert_eq!(results[0].groups, vec!["Servers"]);
}

#[test]
fn test_cookie_from_set_cookie_header() {
    let page = PageRecord::new("https://example.com/")
        .with_header("Set-Cookie", "PHPSESSID=9f86d081884c7d65; path=/; HttpOnly");
    let results = detector().detect(&page);

    assert_eq!(names(&results), vec!["PHP"]);
    assert!(results[0].versions.is_empty());
}

#[test]
fn test_fixed_implied_confidence_policy() {
    let config = EngineConfig::builder()
        .implied_confidence(ImpliedConfidence::Fixed(25))
        .build();
    let detector = TechDetector::new(catalog(), config);
    let page = PageRecord::new("https://example.com/").with_meta("generator", "WordPress");
    let results = detector.detect(&page);

    // 边自带置信度标签时不受策略影响
    assert_eq!(find(&results, "MySQL").confidence, 60);
    assert_eq!(find(&results, "PHP").confidence, 25);
}

#[test]
fn test_page_record_from_json() {
    let page = PageRecord::from_json_str(
        r#"{
            "url": "https://shop.example.com/",
            "scripts": ["https://code.jquery.com/1.12.4/jquery.min.js"],
            "headers": { "server": "nginx" }
        }"#,
    )
    .unwrap();
    let results = detector().detect(&page);

    assert_eq!(names(&results), vec!["Nginx", "jQuery"]);
    assert!(find(&results, "Nginx").versions.is_empty());
    assert_eq!(find(&results, "jQuery").versions, vec!["1.12.4"]);
}

#[test]
fn test_dns_record_type_is_case_insensitive() {
    // 记录类型小写，指纹键大写
    let page = PageRecord::new("https://example.com/")
        .with_dns("mx", "10 alt1.aspmx.l.google.com.")
        .with_dns("mx", "1 aspmx.l.google.com.");
    let results = detector().detect(&page);

    assert_eq!(names(&results), vec!["Google Workspace"]);
    assert_eq!(results[0].categories, vec!["Email"]);
    assert_eq!(results[0].groups, vec!["Communication"]);

    // 记录类型大写，指纹键小写
    let page = PageRecord::new("https://example.com/")
        .with_dns("TXT", "google-site-verification=abc")
        .with_dns("TXT", "v=spf1 include:spf.protection.outlook.com -all");
    assert_eq!(names(&detector().detect(&page)), vec!["Microsoft 365"]);
}

#[test]
fn test_dns_from_page_record_json() {
    let page = PageRecord::from_json_str(
        r#"{ "url": "https://example.com/", "dns": { "MX": "aspmx.l.google.com", "NS": ["ns1.example.net"] } }"#,
    )
    .unwrap();

    assert_eq!(names(&detector().detect(&page)), vec!["Google Workspace"]);
}

#[test]
fn test_cert_issuer_detection() {
    let page = PageRecord::new("https://example.com/").with_cert_issuer("R3, Let's Encrypt");
    let results = detector().detect(&page);

    assert_eq!(names(&results), vec!["Let's Encrypt", "TLS"]);
    assert_eq!(find(&results, "Let's Encrypt").groups, vec!["Servers"]);
}

#[test]
fn test_empty_cert_issuer_is_absent() {
    let page = PageRecord::new("https://example.com/").with_cert_issuer("");
    assert!(detector().detect(&page).is_empty());

    let page = PageRecord::from_json_str(r#"{ "url": "https://example.com/", "certIssuer": "" }"#).unwrap();
    assert!(detector().detect(&page).is_empty());
}
