//! 命令调度模块：
//! - 接收解析好的 CLI 参数，结合环境变量计算“有效参数”
//! - 调用构建或交互更新流程，并给出进程退出码

use anyhow::{bail, Context, Result};
use std::{io, path::PathBuf};

use crate::{
    build::invoke_build,
    cli::{Cli, Command},
    config::{describe_source, load_build_config},
    plist::PlistMode,
    specs::{run_specs, Prompter, SpecsOptions},
    utils::{env_bool_truthy, env_opt_path, env_opt_string, parse_plist_mode},
};

const DEFAULT_FLUTTER: &str = "flutter";

/// 运行指定的子命令，返回进程退出码（构建失败为 1）
pub(crate) fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Build { config, flutter, project_dir, dry_run } => {
            // 环境变量覆盖（若 CLI 未指定）
            let env_config = env_opt_path("FLUTTER_PREP_CONFIG");
            let env_flutter = env_opt_string("FLUTTER_PREP_FLUTTER");
            let env_project_dir = env_opt_path("FLUTTER_PREP_PROJECT_DIR");
            let env_dry_run = env_bool_truthy("FLUTTER_PREP_DRY_RUN").unwrap_or(false);

            let effective_config = config.or(env_config);
            let effective_flutter = flutter.or(env_flutter).unwrap_or_else(|| DEFAULT_FLUTTER.to_string());
            let effective_project_dir = project_dir.or(env_project_dir).unwrap_or_else(|| PathBuf::from("."));
            let effective_dry_run = if dry_run { true } else { env_dry_run };

            let (build_config, source) =
                load_build_config(effective_config.as_deref(), &effective_project_dir)?;
            println!("ℹ️ 本次使用的构建配置: {}", describe_source(&source));

            let mut out = io::stdout().lock();
            let ok = invoke_build(
                &effective_flutter,
                &build_config,
                &effective_project_dir,
                effective_dry_run,
                &mut out,
            )
            .context("输出构建结果失败")?;
            Ok(if ok { 0 } else { 1 })
        }
        Command::Specs { project_dir, plist_mode } => {
            let env_project_dir = env_opt_path("FLUTTER_PREP_PROJECT_DIR");
            let env_plist_mode = env_opt_string("FLUTTER_PREP_PLIST_MODE");

            let effective_project_dir = project_dir.or(env_project_dir).unwrap_or_else(|| PathBuf::from("."));
            let effective_plist_mode = match plist_mode.or(env_plist_mode) {
                Some(s) => match parse_plist_mode(s.clone()) {
                    Some(mode) => mode,
                    None => bail!("未知的 plist 更新方式: {}（可选 structured|legacy）", s),
                },
                None => PlistMode::default(),
            };

            let opts = SpecsOptions {
                project_dir: effective_project_dir,
                plist_mode: effective_plist_mode,
            };
            let mut prompter = Prompter::new(io::stdin().lock(), io::stdout().lock());
            run_specs(&opts, &mut prompter).context("交互输入输出失败")?;
            Ok(0)
        }
    }
}
