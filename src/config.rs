//! 引擎配置：存储所有可配置项

/// 推导（implies）技术的默认置信度策略
///
/// 仅在 implies 边本身没有 `\;confidence:N` 标签时生效。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpliedConfidence {
    /// 继承推导来源技术的置信度
    Inherit,
    /// 固定置信度（超过100按100处理）
    Fixed(u8),
}

impl Default for ImpliedConfidence {
    fn default() -> Self {
        ImpliedConfidence::Inherit
    }
}

impl ImpliedConfidence {
    /// 根据来源置信度计算推导置信度
    pub fn apply(&self, source_confidence: u8) -> u8 {
        match self {
            ImpliedConfidence::Inherit => source_confidence.min(100),
            ImpliedConfidence::Fixed(value) => (*value).min(100),
        }
    }
}

/// 引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // implies 推导置信度策略
    pub implied_confidence: ImpliedConfidence,
    // 是否从HTML中补充提取 script-src / meta 标签
    pub extract_html_tags: bool,
    // 单条正则编译后的大小上限（字节），超限视为畸形规则
    pub regex_size_limit: usize,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            implied_confidence: ImpliedConfidence::default(),
            extract_html_tags: true,
            regex_size_limit: 1 << 20,
            verbose: false,
        }
    }
}

impl EngineConfig {
    /// 自定义配置
    pub fn builder() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: EngineConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn implied_confidence(mut self, policy: ImpliedConfidence) -> Self {
        self.config.implied_confidence = policy;
        self
    }

    pub fn extract_html_tags(mut self, enabled: bool) -> Self {
        self.config.extract_html_tags = enabled;
        self
    }

    pub fn regex_size_limit(mut self, limit: usize) -> Self {
        self.config.regex_size_limit = limit;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
