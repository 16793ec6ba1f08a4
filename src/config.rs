//! 构建配置与加载模块：
//! - 定义 `BuildConfig`（不可变，一次构建期间只读）
//! - 内置默认值即发布用的环境常量（API 地址、AdMob 广告位）
//! - 可选 YAML 文件覆盖/追加，支持显式路径与项目目录自动发现

use std::{fs, path::{Path, PathBuf}};
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

pub(crate) const DEFAULT_TARGET: &str = "appbundle";
pub(crate) const DEFAULT_SPLIT_DEBUG_INFO: &str = "build/symbols";

/// 自动发现的配置文件名（按顺序）
const CONFIG_CANDIDATES: [&str; 2] = ["flutter-prep.yaml", "flutter-prep.yml"];

// 默认注入的 --dart-define，顺序即命令行顺序
const DEFAULT_DEFINES: [(&str, &str); 6] = [
    ("API_URL_LOCAL", "http://127.0.0.1:5000"),
    ("API_URL", "https://fmif.reignofplay.com"),
    ("ADMOBS_TOP_BANNER01", "ca-app-pub-3940256099942544/9214589741"),
    ("ADMOBS_BOTTOM_BANNER01", "ca-app-pub-3940256099942544/9214589741"),
    ("ADMOBS_INTERSTITIAL01", "ca-app-pub-3940256099942544/1033173712"),
    ("ADMOBS_REWARDED01", "ca-app-pub-3940256099942544/5224354917"),
];

/// 一次构建调用所需的全部常量
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BuildConfig {
    /// flutter build 的目标，例如 `appbundle`
    pub(crate) target: String,
    /// 以 `--dart-define=KEY=VALUE` 形式注入，保持插入顺序
    pub(crate) defines: IndexMap<String, String>,
    /// `--split-debug-info` 输出目录；None 表示不拆分
    pub(crate) split_debug_info: Option<String>,
    /// 追加在末尾的原样参数
    pub(crate) extra_args: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            defines: DEFAULT_DEFINES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            split_debug_info: Some(DEFAULT_SPLIT_DEBUG_INFO.to_string()),
            extra_args: Vec::new(),
        }
    }
}

/// YAML 文件结构：所有字段可选，未出现的沿用默认值
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BuildFile {
    #[serde(default)]
    pub(crate) target: Option<String>,
    /// 同名键覆盖默认值（位置不变），新键追加到末尾
    #[serde(default)]
    pub(crate) defines: IndexMap<String, String>,
    /// 空字符串表示关闭拆分
    #[serde(default)]
    pub(crate) split_debug_info: Option<String>,
    #[serde(default)]
    pub(crate) extra_args: Vec<String>,
}

impl BuildConfig {
    /// 将文件中的覆盖项合并到当前配置
    pub(crate) fn merged_with(mut self, file: BuildFile) -> Self {
        if let Some(t) = file.target.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            self.target = t;
        }
        for (k, v) in file.defines {
            self.defines.insert(k, v);
        }
        if let Some(s) = file.split_debug_info {
            let s = s.trim();
            self.split_debug_info = if s.is_empty() { None } else { Some(s.to_string()) };
        }
        self.extra_args.extend(file.extra_args);
        self
    }
}

/// 配置来源（用于打印和调试）
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConfigSource {
    Explicit(PathBuf),
    Auto(PathBuf),
    Defaults,
}

/// 人类可读的来源描述
pub(crate) fn describe_source(src: &ConfigSource) -> String {
    match src {
        ConfigSource::Explicit(p) => format!("配置文件: {}", p.display()),
        ConfigSource::Auto(p) => format!("配置文件(自动发现): {}", p.display()),
        ConfigSource::Defaults => "内置默认值".to_string(),
    }
}

// 自动发现：项目目录下的 flutter-prep.yaml / flutter-prep.yml
fn resolve_local_config_path(project_dir: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|cand| project_dir.join(cand))
        .find(|p| p.is_file())
}

/// 解析 YAML 文本并与默认配置合并
pub(crate) fn parse_build_config(text: &str) -> Result<BuildConfig> {
    // 空文件在 serde_yaml 中是 null，按“无覆盖”处理
    if text.trim().is_empty() {
        return Ok(BuildConfig::default());
    }
    let file: BuildFile = serde_yaml::from_str(text).context("解析构建配置 YAML 失败")?;
    Ok(BuildConfig::default().merged_with(file))
}

/// 加载构建配置：显式路径 > 自动发现 > 内置默认值
pub(crate) fn load_build_config(
    explicit: Option<&Path>,
    project_dir: &Path,
) -> Result<(BuildConfig, ConfigSource)> {
    let (path, source) = match explicit {
        Some(p) => {
            if !p.is_file() {
                bail!("指定的配置文件不存在: {}", p.display());
            }
            (p.to_path_buf(), ConfigSource::Explicit(p.to_path_buf()))
        }
        None => match resolve_local_config_path(project_dir) {
            Some(p) => (p.clone(), ConfigSource::Auto(p)),
            None => return Ok((BuildConfig::default(), ConfigSource::Defaults)),
        },
    };
    let text = fs::read_to_string(&path)
        .with_context(|| format!("读取配置失败: {}", path.display()))?;
    let cfg = parse_build_config(&text).with_context(|| format!("配置无效: {}", path.display()))?;
    tracing::debug!(path = %path.display(), defines = cfg.defines.len(), "loaded build config");
    Ok((cfg, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_keep_release_constants_in_order() {
        let cfg = BuildConfig::default();
        let keys: Vec<&str> = cfg.defines.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "API_URL_LOCAL",
                "API_URL",
                "ADMOBS_TOP_BANNER01",
                "ADMOBS_BOTTOM_BANNER01",
                "ADMOBS_INTERSTITIAL01",
                "ADMOBS_REWARDED01",
            ]
        );
        assert_eq!(cfg.defines["API_URL"], "https://fmif.reignofplay.com");
        assert_eq!(cfg.target, "appbundle");
        assert_eq!(cfg.split_debug_info.as_deref(), Some("build/symbols"));
    }

    #[test]
    fn file_overrides_in_place_and_appends_new_keys() {
        let cfg = parse_build_config(
            "target: apk\ndefines:\n  API_URL: https://staging.example.com\n  FLAVOR: qa\nextra_args: [--release]\n",
        )
        .unwrap();
        assert_eq!(cfg.target, "apk");
        assert_eq!(cfg.defines.get_index_of("API_URL"), Some(1));
        assert_eq!(cfg.defines["API_URL"], "https://staging.example.com");
        assert_eq!(cfg.defines.keys().last().map(String::as_str), Some("FLAVOR"));
        assert_eq!(cfg.extra_args, vec!["--release".to_string()]);
    }

    #[test]
    fn empty_split_debug_info_disables_it() {
        let cfg = parse_build_config("split_debug_info: \"\"\n").unwrap();
        assert!(cfg.split_debug_info.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_build_config("targets: apk\n").is_err());
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let (cfg, src) = load_build_config(None, dir.path()).unwrap();
        assert_eq!(src, ConfigSource::Defaults);
        assert_eq!(cfg, BuildConfig::default());
    }

    #[test]
    fn load_discovers_project_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("flutter-prep.yml"), "target: ipa\n").unwrap();
        let (cfg, src) = load_build_config(None, dir.path()).unwrap();
        assert!(matches!(src, ConfigSource::Auto(_)));
        assert_eq!(cfg.target, "ipa");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(load_build_config(Some(&missing), dir.path()).is_err());
    }
}
