//! 错误类型：
//! - `PatchError` 对应清单/plist 修改的四类失败（未找到、解析、结构、写入）
//! - `BuildError` 对应外部构建进程的启动失败与非零退出

use std::{path::PathBuf, process::ExitStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum PatchError {
    #[error("文件不存在: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("解析失败 {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("结构不符合预期 {}: {message}", .path.display())]
    Structure { path: PathBuf, message: String },

    #[error("读写失败 {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub(crate) enum BuildError {
    #[error("无法启动 {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} 退出状态异常: {status}")]
    Failed { program: String, status: ExitStatus },
}

/// 补丁结果：新增或更新
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PatchOutcome {
    Added,
    Updated,
}

/// 文本层面的失败，由调用方补上文件路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XmlFault {
    Parse(String),
    Structure(String),
}

impl XmlFault {
    pub(crate) fn at(self, path: &std::path::Path) -> PatchError {
        let path = path.to_path_buf();
        match self {
            XmlFault::Parse(message) => PatchError::Parse { path, message },
            XmlFault::Structure(message) => PatchError::Structure { path, message },
        }
    }
}

impl From<quick_xml::Error> for XmlFault {
    fn from(e: quick_xml::Error) -> Self {
        XmlFault::Parse(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for XmlFault {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        XmlFault::Parse(e.to_string())
    }
}

impl From<std::str::Utf8Error> for XmlFault {
    fn from(e: std::str::Utf8Error) -> Self {
        XmlFault::Parse(e.to_string())
    }
}
