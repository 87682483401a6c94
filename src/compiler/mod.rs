//! 编译模块：将原始规则编译为可执行的签名规则
pub mod compiler;
pub mod pattern;
pub mod regex_fixer;

pub use self::compiler::RuleCompiler;
pub use self::regex_fixer::RegexFixer;
pub use self::pattern::{
    Catalog, Category, FieldSelector, ImpliedTech, RuleCompileWarning, RuleOutcome, SignatureRule,
    TechnologyDefinition,
};
