//! HTML标签提取器
//! 负责从HTML中提取 script-src 和 meta 标签（纯静态分词，不执行脚本）

use std::cell::RefCell;

use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use markup5ever::interface::Attribute;
use tendril::StrTendril;

/// meta 标签名称来源属性，按优先级排列
const META_NAME_ATTRS: [&str; 3] = ["name", "property", "http-equiv"];

#[derive(Debug, Default, Clone)]
pub struct HtmlExtractor {
    script_srcs: RefCell<Vec<String>>,
    meta_tags: RefCell<Vec<(String, String)>>,
}

impl TokenSink for HtmlExtractor {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        if let Token::TagToken(Tag {
            kind: TagKind::StartTag,
            name,
            attrs,
            ..
        }) = token
        {
            match name.as_ref() {
                "script" => {
                    self.extract_script_src(&attrs);
                    // 脚本体按原始文本处理，其中的 "<script src=…>" 字符串不算标签
                    return TokenSinkResult::RawData(RawKind::ScriptData);
                }
                "style" => return TokenSinkResult::RawData(RawKind::Rawtext),
                "meta" => self.extract_meta_tag(&attrs),
                _ => {}
            }
        }
        TokenSinkResult::Continue
    }
}

impl HtmlExtractor {
    /// 创建新的提取器
    pub fn new() -> Self {
        Self::default()
    }

    /// 从HTML字符串提取标签
    pub fn extract(&self, html: &str) -> Self {
        let tokenizer = Tokenizer::new(self.clone(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink
    }

    /// 提取script-src（空值跳过）
    fn extract_script_src(&self, attrs: &[Attribute]) {
        if let Some(src) = attrs
            .iter()
            .find(|attr| attr.name.local.as_ref() == "src")
            .map(|attr| attr.value.trim())
            .filter(|src| !src.is_empty())
        {
            self.script_srcs.borrow_mut().push(src.to_string());
        }
    }

    /// 提取meta标签：名称取 name / property / http-equiv 中的第一个，统一小写
    fn extract_meta_tag(&self, attrs: &[Attribute]) {
        let attr_value = |wanted: &str| {
            attrs
                .iter()
                .find(|attr| attr.name.local.as_ref() == wanted)
                .map(|attr| attr.value.to_string())
        };

        let name = META_NAME_ATTRS
            .iter()
            .find_map(|key| attr_value(*key))
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty());

        if let (Some(name), Some(content)) = (name, attr_value("content")) {
            self.meta_tags.borrow_mut().push((name, content));
        }
    }

    /// 获取提取到的script-src列表
    pub fn get_script_srcs(&self) -> Vec<String> {
        self.script_srcs.borrow().clone()
    }

    /// 获取提取到的meta标签列表
    pub fn get_meta_tags(&self) -> Vec<(String, String)> {
        self.meta_tags.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_extractor() {
        let html = r#"
            <script src="/jquery.min.js"></script>
            <meta name="author" content="test_user">
            <meta name="Generator" content="WordPress 6.0" />
            <meta property="og:site_name" content="Example">
            <meta http-equiv="X-UA-Compatible" content="IE=edge">
            <script>var inline = true;</script>
            <script src=""></script>
            <script src="/vue.global.js"></script>
        "#;

        let result = HtmlExtractor::new().extract(html);

        assert_eq!(
            result.get_script_srcs(),
            vec!["/jquery.min.js".to_string(), "/vue.global.js".to_string()]
        );

        assert_eq!(
            result.get_meta_tags(),
            vec![
                ("author".to_string(), "test_user".to_string()),
                ("generator".to_string(), "WordPress 6.0".to_string()),
                ("og:site_name".to_string(), "Example".to_string()),
                ("x-ua-compatible".to_string(), "IE=edge".to_string()),
            ]
        );
    }

    #[test]
    fn test_markup_inside_inline_script_is_ignored() {
        let html = r#"
            <script>
                var s = '<script src="/injected.js"><\/script>';
                document.write('<meta name="generator" content="Fake 1.0">');
            </script>
            <style>a::after { content: "<script src='/style.js'>"; }</style>
            <script src="/real.js"></script>
            <meta name="generator" content="Hugo 0.120">
        "#;

        let result = HtmlExtractor::new().extract(html);

        assert_eq!(result.get_script_srcs(), vec!["/real.js".to_string()]);
        assert_eq!(
            result.get_meta_tags(),
            vec![("generator".to_string(), "Hugo 0.120".to_string())]
        );
    }

    #[test]
    fn test_meta_without_content_is_skipped() {
        let result = HtmlExtractor::new().extract(r#"<meta charset="utf-8"><meta name="robots">"#);
        assert!(result.get_meta_tags().is_empty());
    }
}
