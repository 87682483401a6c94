//! harwappalyzer 命令行：加载指纹库，对页面记录执行检测并输出结果
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use harwappalyzer::{EngineConfig, PageRecord, TechDetector};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// JSON（含编译告警）
    Json,
    /// 每行一个技术
    Pretty,
}

/// 基于 HAR 页面记录识别网站技术栈
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 指纹库路径：数据目录或单个JSON文件
    #[arg(short, long)]
    catalog: PathBuf,

    /// 页面记录JSON文件，缺省时从标准输入读取
    #[arg(short, long)]
    page: Option<PathBuf>,

    /// 输出格式
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// 输出文件，缺省时写到标准输出
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 输出详细日志
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = EngineConfig::builder().verbose(cli.verbose).build();
    let detector = TechDetector::from_path(&cli.catalog, config)
        .with_context(|| format!("无法加载指纹库：{}", cli.catalog.display()))?;

    let raw_page = match &cli.page {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("无法读取页面记录：{}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("无法从标准输入读取页面记录")?;
            buf
        }
    };
    let page = PageRecord::from_json_str(&raw_page)?;

    let analysis = detector.analyze(&page);
    let rendered = match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&analysis)?,
        OutputFormat::Pretty => {
            let mut lines: Vec<String> = analysis
                .technologies
                .iter()
                .map(|tech| {
                    if tech.categories.is_empty() {
                        tech.to_string()
                    } else {
                        format!("{} [{}]", tech, tech.categories.join(", "))
                    }
                })
                .collect();
            if lines.is_empty() {
                lines.push("未检测到任何技术".to_string());
            }
            lines.join("\n")
        }
    };

    match &cli.output {
        Some(path) => fs::write(path, rendered + "\n")
            .with_context(|| format!("无法写入输出文件：{}", path.display()))?,
        None => println!("{}", rendered),
    }

    Ok(())
}

/// 日志输出到标准错误；RUST_LOG 优先于 --verbose
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
