//! 通用辅助函数：
//! - 环境变量读取与解析
//! - 文本到枚举的解析工具
//! - 交互输入的 y/n 判定
//! - 待修改文件的整体读取与写回

use std::{env, fs, path::{Path, PathBuf}};
use crate::{error::PatchError, plist::PlistMode};

/// 可选读取 PATH 环境变量为 PathBuf。
pub(crate) fn env_opt_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from).filter(|p| !p.as_os_str().is_empty())
}

/// 可选读取 String 环境变量。
pub(crate) fn env_opt_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// 读取布尔环境变量的真值（1/true/on/yes/y）。
pub(crate) fn env_bool_truthy(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| parse_truthy(&v))
}

fn parse_truthy(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes" | "y")
}

/// 将字符串解析为 PlistMode。
pub(crate) fn parse_plist_mode(s: String) -> Option<PlistMode> {
    match s.trim().to_ascii_lowercase().as_str() {
        "structured" | "xml" => Some(PlistMode::Structured),
        "legacy" | "text" => Some(PlistMode::Legacy),
        _ => None,
    }
}

/// 交互确认：仅 `y`（忽略大小写与首尾空白）视为肯定。
pub(crate) fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// 粗略判断是否为 http/https URL（仅用于提示，不阻止写入）。
pub(crate) fn looks_like_http_url(u: &str) -> bool {
    match url::Url::parse(u) {
        Ok(p) => matches!(p.scheme(), "http" | "https") && p.host_str().is_some(),
        Err(_) => false,
    }
}

/// 整体读取待修改文件；不存在 -> NotFound，非 UTF-8 -> Parse。
pub(crate) fn read_document(path: &Path) -> Result<String, PatchError> {
    if !path.exists() {
        return Err(PatchError::NotFound { path: path.to_path_buf() });
    }
    let bytes = fs::read(path).map_err(|source| PatchError::Io { path: path.to_path_buf(), source })?;
    String::from_utf8(bytes).map_err(|e| PatchError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// 原地整体写回（非原子写入，失败时文件可能只写了一部分）。
pub(crate) fn write_document(path: &Path, text: &str) -> Result<(), PatchError> {
    fs::write(path, text).map_err(|source| PatchError::Io { path: path.to_path_buf(), source })
}
