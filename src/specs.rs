//! 交互式更新流程：
//! - 依次询问应用名称、应用 ID、隐私政策 URL（名称与 ID 仅回显）
//! - 三个独立的 y/n 确认分别触发 Android 清单、iOS plist 与图标检查
//! - 输入输出通过 `Prompter` 注入，便于在测试中替换终端

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use crate::{
    icons::check_icons,
    manifest::{update_android_manifest, MANIFEST_PATH},
    plist::{update_ios_info_plist, PlistMode, PLIST_PATH},
    utils::{is_yes, looks_like_http_url},
};

/// 行式提问：写出提示，读取一行并去掉首尾空白；EOF 视为空回答
pub(crate) struct Prompter<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub(crate) fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    pub(crate) fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.out, "{}", question)?;
        self.out.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    pub(crate) fn confirm(&mut self, question: &str) -> io::Result<bool> {
        Ok(is_yes(&self.ask(question)?))
    }

    pub(crate) fn out(&mut self) -> &mut W {
        &mut self.out
    }

    #[cfg(test)]
    pub(crate) fn into_output(self) -> W {
        self.out
    }
}

/// 交互流程的固定参数
#[derive(Debug, Clone)]
pub(crate) struct SpecsOptions {
    pub(crate) project_dir: PathBuf,
    pub(crate) plist_mode: PlistMode,
}

/// 本次运行的结果（不持久化）；None 表示该步骤未执行
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SpecsReport {
    pub(crate) app_name: Option<String>,
    pub(crate) app_id: Option<String>,
    pub(crate) android: Option<bool>,
    pub(crate) ios: Option<bool>,
    pub(crate) icons_checked: bool,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// 执行完整的交互流程；无论前面的步骤成败，都会走到最后
pub(crate) fn run_specs<R: BufRead, W: Write>(
    opts: &SpecsOptions,
    prompter: &mut Prompter<R, W>,
) -> io::Result<SpecsReport> {
    let mut report = SpecsReport::default();
    writeln!(prompter.out(), "--- Flutter 项目配置更新 ---")?;

    report.app_name = non_empty(prompter.ask("请输入应用名称（回车跳过）: ")?);
    if let Some(name) = &report.app_name {
        writeln!(prompter.out(), "应用名称: {}", name)?;
    }
    report.app_id = non_empty(prompter.ask("请输入应用 ID / 包名（回车跳过）: ")?);
    if let Some(id) = &report.app_id {
        writeln!(prompter.out(), "应用 ID: {}", id)?;
    }

    let url = prompter.ask("请输入隐私政策 URL（回车跳过）: ")?;
    if !url.is_empty() && !looks_like_http_url(&url) {
        writeln!(prompter.out(), "⚠️ 这看起来不是有效的 http(s) URL，将按原样写入。")?;
    }

    if prompter.confirm("检查 Android 配置？(y/n): ")? {
        if url.is_empty() {
            writeln!(prompter.out(), "⚠️ 未提供隐私政策 URL，跳过 AndroidManifest.xml。")?;
        } else {
            let path = opts.project_dir.join(MANIFEST_PATH);
            report.android = Some(update_android_manifest(&path, &url, prompter.out())?);
        }
    }

    if prompter.confirm("检查 iOS 配置？(y/n): ")? {
        if url.is_empty() {
            writeln!(prompter.out(), "⚠️ 未提供隐私政策 URL，跳过 Info.plist。")?;
        } else {
            let path = opts.project_dir.join(PLIST_PATH);
            report.ios = Some(update_ios_info_plist(&path, &url, opts.plist_mode, prompter.out())?);
        }
    }

    if prompter.confirm("检查应用图标？(y/n): ")? {
        check_icons(&opts.project_dir, prompter.out())?;
        report.icons_checked = true;
    }

    writeln!(prompter.out(), "\n配置更新完成。")?;
    tracing::debug!(?report, "specs run finished");
    Ok(report)
}
