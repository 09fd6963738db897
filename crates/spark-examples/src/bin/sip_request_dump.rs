//! SIP 请求转储工具：以固定块大小把文件内容输入增量解析器，输出 JSON 投影。
//!
//! # 使用方法
//! ```bash
//! RUST_LOG=spark_codec_sip=trace cargo run --bin sip_request_dump -- request.sip \
//!     --chunk-size 16 --settings parser.toml
//! ```
//! - `request.sip`：单条 SIP 请求的原始字节；
//! - `--chunk-size`：可选，每次输入的字节数，默认 64；
//! - `--settings`：可选，解析器上限配置（TOML），缺省使用内置默认值。
//!
//! 解析失败时打印对应的状态码并以非零码退出。

use std::env;
use std::fs;
use std::path::PathBuf;

use spark_codec_sip::{RequestParser, Settings};
use spark_examples::{DumpOutcome, dump_request};
use tracing_subscriber::EnvFilter;

const DEFAULT_CHUNK_SIZE: usize = 64;

fn main() {
    if let Err(error) = run() {
        eprintln!("sip_request_dump 失败: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let input_path = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| usage("缺少请求文件路径"))?;

    let mut chunk_size = DEFAULT_CHUNK_SIZE;
    let mut settings_path = None;
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--chunk-size" => {
                let value = args
                    .next()
                    .ok_or_else(|| usage("--chunk-size 之后必须提供字节数"))?;
                chunk_size = value
                    .parse()
                    .map_err(|error| usage(&format!("--chunk-size 无效: {error}")))?;
            }
            "--settings" => {
                let value = args
                    .next()
                    .ok_or_else(|| usage("--settings 之后必须提供文件路径"))?;
                settings_path = Some(PathBuf::from(value));
            }
            unknown => return Err(usage(&format!("未知参数: {unknown}"))),
        }
    }

    let settings = match settings_path {
        Some(path) => {
            let document = fs::read_to_string(&path)
                .map_err(|error| format!("读取配置 {} 失败: {error}", path.display()))?;
            Settings::from_toml_str(&document).map_err(|error| error.to_string())?
        }
        None => Settings::default(),
    };

    let input = fs::read(&input_path)
        .map_err(|error| format!("读取请求 {} 失败: {error}", input_path.display()))?;

    let mut parser = RequestParser::with_settings(settings);
    match dump_request(&mut parser, &input, chunk_size) {
        Ok(DumpOutcome::Complete(value)) => {
            let rendered = serde_json::to_string_pretty(&value).map_err(|error| error.to_string())?;
            println!("{rendered}");
            Ok(())
        }
        Ok(DumpOutcome::Truncated(fed)) => Err(format!("输入在 {fed} 字节处结束，请求不完整")),
        Err(error) => Err(format!("请求被拒绝: {} ({error})", error.status())),
    }
}

fn usage(reason: &str) -> String {
    format!(
        "{reason}\n用法: sip_request_dump <request-file> [--chunk-size <bytes>] [--settings <toml>]"
    )
}
