//! 页面记录：一次页面加载的 HAR 式采集数据（检测输入）

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Deserializer, Serialize};

use crate::compiler::FieldSelector;
use crate::config::EngineConfig;
use crate::error::{HarWappError, WappResult};
use crate::extractor::HtmlExtractor;
use crate::utils::HeaderConverter;

/// 页面记录（单次检测内只读）
///
/// JSON 形态：`{ url, html, scripts, headers, cookies, meta, dns, certIssuer }`，所有键可选，
/// `dns` 的值可以是字符串或字符串数组。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageRecord {
    pub url: String,
    pub html: String,
    pub scripts: Vec<String>,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub meta: BTreeMap<String, String>,
    #[serde(deserialize_with = "deserialize_dns")]
    pub dns: BTreeMap<String, Vec<String>>,
    pub cert_issuer: Option<String>,
}

impl PageRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// 从JSON文本解析
    pub fn from_json_str(content: &str) -> WappResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| HarWappError::InvalidInput(format!("页面记录解析失败：{}", e)))
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    pub fn with_script(mut self, src: impl Into<String>) -> Self {
        self.scripts.push(src.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// 批量追加HAR风格的 (名称, 值) Header列表，同名多值合并
    pub fn with_headers<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let existing = std::mem::take(&mut self.headers);
        let incoming = pairs
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_string(), value.as_ref().to_string()));
        self.headers = HeaderConverter::from_pairs(existing.into_iter().chain(incoming));
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_meta(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.meta.insert(name.into(), content.into());
        self
    }

    pub fn with_dns(mut self, record_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.dns.entry(record_type.into()).or_default().push(value.into());
        self
    }

    pub fn with_cert_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.cert_issuer = Some(issuer.into());
        self
    }
}

fn deserialize_dns<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let raw = Option::<BTreeMap<String, OneOrMany>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(record_type, values)| {
            let values = match values {
                OneOrMany::One(value) => vec![value],
                OneOrMany::Many(values) => values,
            };
            (record_type, values)
        })
        .collect())
}

/// 归一化后的页面视图：键统一小写，按配置合并HTML中提取的标签
///
/// 每次检测构建一次，所有规则共用。
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    url: &'a str,
    html: &'a str,
    scripts: Vec<String>,
    headers: FxHashMap<String, String>,
    cookies: FxHashMap<String, String>,
    meta: FxHashMap<String, String>,
    dns: FxHashMap<String, Vec<&'a str>>,
    cert_issuer: Option<&'a str>,
}

impl<'a> PageView<'a> {
    pub fn new(page: &'a PageRecord, config: &EngineConfig) -> Self {
        let headers = HeaderConverter::to_lookup(&page.headers);

        // 页面记录自带的Cookie优先，其次从Cookie/Set-Cookie头解析
        let mut cookies = HeaderConverter::parse_cookies(&headers);
        for (name, value) in &page.cookies {
            cookies.insert(name.to_lowercase(), value.clone());
        }

        let mut meta: FxHashMap<String, String> = page
            .meta
            .iter()
            .map(|(name, content)| (name.to_lowercase(), content.clone()))
            .collect();

        let mut scripts = page.scripts.clone();

        if config.extract_html_tags && !page.html.is_empty() {
            let extracted = HtmlExtractor::new().extract(&page.html);

            let mut seen: FxHashSet<String> = scripts.iter().cloned().collect();
            for src in extracted.get_script_srcs() {
                if seen.insert(src.clone()) {
                    scripts.push(src);
                }
            }
            for (name, content) in extracted.get_meta_tags() {
                meta.entry(name).or_insert(content);
            }
        }

        let mut dns: FxHashMap<String, Vec<&'a str>> = FxHashMap::default();
        for (record_type, values) in &page.dns {
            dns.entry(record_type.to_lowercase())
                .or_default()
                .extend(values.iter().map(String::as_str));
        }

        Self {
            url: &page.url,
            html: &page.html,
            scripts,
            headers,
            cookies,
            meta,
            dns,
            cert_issuer: page.cert_issuer.as_deref().filter(|issuer| !issuer.is_empty()),
        }
    }

    /// 规则字段对应的候选值；字段缺失时返回空列表（即不匹配，不是错误）
    pub fn values(&self, selector: &FieldSelector) -> Vec<&str> {
        match selector {
            FieldSelector::Url => non_empty(self.url),
            FieldSelector::Html => non_empty(self.html),
            FieldSelector::Script => self.scripts.iter().map(String::as_str).collect(),
            FieldSelector::Header(key) => self.headers.get(key).map(String::as_str).into_iter().collect(),
            FieldSelector::Cookie(key) => self.cookies.get(key).map(String::as_str).into_iter().collect(),
            FieldSelector::Meta(key) => self.meta.get(key).map(String::as_str).into_iter().collect(),
            FieldSelector::Dns(key) => self.dns.get(key).cloned().unwrap_or_default(),
            FieldSelector::CertIssuer => self.cert_issuer.into_iter().collect(),
        }
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }
}

fn non_empty(value: &str) -> Vec<&str> {
    if value.is_empty() {
        Vec::new()
    } else {
        vec![value]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_page_record() {
        let page = PageRecord::from_json_str(
            r#"{
                "url": "https://example.com/",
                "headers": { "Server": "nginx" },
                "dns": { "MX": "aspmx.l.google.com", "TXT": ["v=spf1", "google-site-verification=x"] },
                "certIssuer": "Let's Encrypt"
            }"#,
        )
        .unwrap();

        assert_eq!(page.url, "https://example.com/");
        assert!(page.html.is_empty());
        assert_eq!(page.dns["MX"], vec!["aspmx.l.google.com"]);
        assert_eq!(page.dns["TXT"].len(), 2);
        assert_eq!(page.cert_issuer.as_deref(), Some("Let's Encrypt"));
    }

    #[test]
    fn test_invalid_page_record_is_invalid_input() {
        let err = PageRecord::from_json_str(r#"{ "scripts": "not-a-list" }"#).unwrap_err();
        assert!(matches!(err, HarWappError::InvalidInput(_)));
    }

    #[test]
    fn test_view_lookups_are_case_insensitive() {
        let page = PageRecord::new("https://example.com/")
            .with_header("X-Powered-By", "PHP/8.2")
            .with_cookie("PHPSESSID", "abc")
            .with_meta("Generator", "WordPress 6.2")
            .with_dns("MX", "mx.example.com");
        let view = PageView::new(&page, &EngineConfig::default());

        assert_eq!(view.values(&FieldSelector::Header("x-powered-by".into())), vec!["PHP/8.2"]);
        assert_eq!(view.values(&FieldSelector::Cookie("phpsessid".into())), vec!["abc"]);
        assert_eq!(view.values(&FieldSelector::Meta("generator".into())), vec!["WordPress 6.2"]);
        assert_eq!(view.values(&FieldSelector::Dns("mx".into())), vec!["mx.example.com"]);
        assert!(view.values(&FieldSelector::Header("server".into())).is_empty());
        assert!(view.values(&FieldSelector::Html).is_empty());
        assert!(view.values(&FieldSelector::CertIssuer).is_empty());
    }

    #[test]
    fn test_view_merges_html_tags_and_header_cookies() {
        let page = PageRecord::new("https://example.com/")
            .with_html(
                r#"<script src="/a.js"></script><script src="/b.js"></script>
                   <meta name="generator" content="Hugo 0.120">"#,
            )
            .with_script("/a.js")
            .with_meta("generator", "Jekyll")
            .with_header("Set-Cookie", "session=xyz; HttpOnly")
            .with_cookie("theme", "dark");
        let view = PageView::new(&page, &EngineConfig::default());

        assert_eq!(view.scripts(), &["/a.js".to_string(), "/b.js".to_string()]);
        assert_eq!(view.values(&FieldSelector::Meta("generator".into())), vec!["Jekyll"]);
        assert_eq!(view.values(&FieldSelector::Cookie("session".into())), vec!["xyz"]);
        assert_eq!(view.values(&FieldSelector::Cookie("theme".into())), vec!["dark"]);
    }

    #[test]
    fn test_with_headers_merges_duplicates() {
        let page = PageRecord::new("https://example.com/").with_headers([
            ("Set-Cookie", "a=1; Path=/"),
            ("set-cookie", "b=2"),
            ("Vary", "Accept-Encoding"),
            ("VARY", "Cookie"),
        ]);
        let view = PageView::new(&page, &EngineConfig::default());

        assert_eq!(page.headers["vary"], "Accept-Encoding, Cookie");
        assert_eq!(view.values(&FieldSelector::Cookie("a".into())), vec!["1"]);
        assert_eq!(view.values(&FieldSelector::Cookie("b".into())), vec!["2"]);
    }

    #[test]
    fn test_view_without_html_extraction() {
        let page = PageRecord::new("https://example.com/")
            .with_html(r#"<script src="/a.js"></script>"#);
        let config = EngineConfig::builder().extract_html_tags(false).build();
        let view = PageView::new(&page, &config);

        assert!(view.scripts().is_empty());
    }
}
