//! Header格式转换工具
//! Header名统一小写、多值合并，以及从 Cookie / Set-Cookie 头解析标准化Cookie

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::warn;

const MAX_HEADER_COUNT: usize = 1000;

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 将 (名称, 值) 序列合并为单值Header表
    ///
    /// 名称转小写；同名多值时 `set-cookie` 以换行拼接（其值本身可能含逗号），其余以 `, ` 拼接。
    pub fn from_pairs<I, K, V>(pairs: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map: BTreeMap<String, String> = BTreeMap::new();

        for (iter_count, (key, value)) in pairs.into_iter().enumerate() {
            if iter_count >= MAX_HEADER_COUNT {
                warn!("Header数量超过{}条，忽略剩余Header", MAX_HEADER_COUNT);
                break;
            }

            let key = key.as_ref().trim().to_ascii_lowercase();
            if key.is_empty() {
                continue;
            }
            let value = value.as_ref();
            let joiner = Self::joiner(key == "set-cookie");
            map.entry(key)
                .and_modify(|existing| {
                    existing.push_str(joiner);
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        map
    }

    /// 将页面记录的Header表转为小写键的查找表
    pub fn to_lookup(headers: &BTreeMap<String, String>) -> FxHashMap<String, String> {
        let mut lookup: FxHashMap<String, String> = FxHashMap::default();
        for (key, value) in headers {
            let key = key.trim().to_ascii_lowercase();
            let joiner = Self::joiner(key == "set-cookie");
            lookup
                .entry(key)
                .and_modify(|existing| {
                    existing.push_str(joiner);
                    existing.push_str(value);
                })
                .or_insert_with(|| value.clone());
        }
        lookup
    }

    /// 从 `cookie` / `set-cookie` 头解析标准化Cookie（名称小写，取首个值）
    pub fn parse_cookies(headers: &FxHashMap<String, String>) -> FxHashMap<String, String> {
        let mut cookies = FxHashMap::default();

        if let Some(raw) = headers.get("set-cookie") {
            for line in raw.lines() {
                Self::parse_set_cookie(line, &mut cookies);
            }
        }
        if let Some(raw) = headers.get("cookie") {
            Self::parse_request_cookie(raw, &mut cookies);
        }

        cookies
    }

    // 解析单条Set-Cookie，只取首段 name=value，过滤deleted Cookie
    fn parse_set_cookie(raw_cookie: &str, cookies: &mut FxHashMap<String, String>) {
        let Some(core_kv) = raw_cookie
            .split(';')
            .map(str::trim)
            .find(|s| !s.is_empty())
        else {
            return;
        };
        Self::insert_kv(core_kv, cookies);
    }

    // 解析请求Cookie：a=1; b=2
    fn parse_request_cookie(raw_cookie: &str, cookies: &mut FxHashMap<String, String>) {
        for core_kv in raw_cookie.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            Self::insert_kv(core_kv, cookies);
        }
    }

    fn insert_kv(core_kv: &str, cookies: &mut FxHashMap<String, String>) {
        let Some((name, value)) = core_kv.split_once('=') else {
            return;
        };
        let (name, value) = (name.trim(), value.trim());

        if name.is_empty() || value.eq_ignore_ascii_case("deleted") {
            return;
        }

        cookies
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| value.to_string());
    }

    fn joiner(is_set_cookie: bool) -> &'static str {
        if is_set_cookie {
            "\n"
        } else {
            ", "
        }
    }
}
