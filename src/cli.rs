//! CLI 定义模块：仅负责命令行参数结构体与解析
//! 将 clap 的声明与业务逻辑解耦，环境变量回退在 commands 中处理。

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 顶层 CLI 入口
#[derive(Parser, Debug)]
#[command(name = "flutter-prep", about = "Flutter 发布辅助工具", version)]
pub(crate) struct Cli {
    /// 输出调试日志（等价于 RUST_LOG=debug）
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// 子命令定义
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// 注入环境常量并调用 flutter 构建 appbundle
    Build {
        /// 构建配置文件（YAML），默认：flutter-prep.yaml / flutter-prep.yml
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// 外部构建工具（名称或路径），默认：flutter
        #[arg(long, value_name = "BIN")]
        flutter: Option<String>,
        /// 项目根目录（子进程工作目录），默认当前目录
        #[arg(long, value_name = "DIR")]
        project_dir: Option<PathBuf>,
        /// 仅打印参数列表，不执行构建
        #[arg(long)]
        dry_run: bool,
    },
    /// 交互式更新隐私政策 URL 并检查图标
    Specs {
        /// 项目根目录（android/ 与 ios/ 所在目录），默认当前目录
        #[arg(long, value_name = "DIR")]
        project_dir: Option<PathBuf>,
        /// Info.plist 更新方式（structured|legacy），默认 structured
        #[arg(long, value_name = "MODE")]
        plist_mode: Option<String>,
    },
}
