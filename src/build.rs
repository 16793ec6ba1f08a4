//! 构建调用模块：
//! - 由 `BuildConfig` 组装 flutter 的参数列表（始终为参数向量，不经过 shell）
//! - 阻塞执行外部构建进程并报告结果

use std::{io::Write, path::Path, process::Command};

use crate::{config::BuildConfig, error::BuildError};

/// 组装 `build` 之后的全部参数
pub(crate) fn build_args(cfg: &BuildConfig) -> Vec<String> {
    let mut args = vec!["build".to_string(), cfg.target.clone()];
    for (key, value) in &cfg.defines {
        args.push(format!("--dart-define={}={}", key, value));
    }
    if let Some(dir) = cfg.split_debug_info.as_deref() {
        args.push(format!("--split-debug-info={}", dir));
    }
    args.extend(cfg.extra_args.iter().cloned());
    args
}

/// 执行外部构建，等待其结束；无超时、无重试
pub(crate) fn run_build(program: &str, cfg: &BuildConfig, workdir: &Path) -> Result<(), BuildError> {
    let args = build_args(cfg);
    tracing::debug!(program, ?args, workdir = %workdir.display(), "spawning build tool");
    let status = Command::new(program)
        .args(&args)
        .current_dir(workdir)
        .status()
        .map_err(|source| BuildError::Spawn { program: program.to_string(), source })?;
    if status.success() {
        Ok(())
    } else {
        Err(BuildError::Failed { program: program.to_string(), status })
    }
}

/// 运行构建并输出结果行；返回是否成功
pub(crate) fn invoke_build<W: Write>(
    program: &str,
    cfg: &BuildConfig,
    workdir: &Path,
    dry_run: bool,
    out: &mut W,
) -> std::io::Result<bool> {
    if dry_run {
        writeln!(out, "ℹ️ 仅预览（未执行）: {} {}", program, build_args(cfg).join(" "))?;
        return Ok(true);
    }
    match run_build(program, cfg, workdir) {
        Ok(()) => {
            writeln!(out, "✅ 构建完成。")?;
            Ok(true)
        }
        Err(e) => {
            writeln!(out, "❌ 构建失败: {}", e)?;
            Ok(false)
        }
    }
}
