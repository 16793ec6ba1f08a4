//! AndroidManifest.xml 修改模块：
//! - 在 `<application>` 下新增或更新 `privacy_policy_url` 的 `<meta-data>`
//! - 基于 quick-xml 事件流逐个转写，未涉及的节点原样输出
//! - 任一读取/解析/结构错误都不会写回文件

use std::{io::Write, path::Path};

use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::{
    error::{PatchError, PatchOutcome, XmlFault},
    utils::{read_document, write_document},
};

/// 相对项目根目录的清单路径
pub(crate) const MANIFEST_PATH: &str = "android/app/src/main/AndroidManifest.xml";
pub(crate) const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";
pub(crate) const PRIVACY_META_NAME: &str = "privacy_policy_url";

/// 在清单文本上应用隐私政策 URL，返回新文本与结果类型
pub(crate) fn patch_manifest_text(xml: &str, url: &str) -> Result<(String, PatchOutcome), XmlFault> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut prefix = String::from("android");
    let mut wrote_decl = false;
    let mut seen_root = false;
    let mut in_application = false;
    let mut found_application = false;
    let mut outcome: Option<PatchOutcome> = None;
    // 紧挨当前事件之前的纯空白文本，用于推断插入节点的缩进
    let mut trailing_ws: Option<String> = None;

    loop {
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) => {
                return Err(XmlFault::Parse(format!("位置 {}: {}", reader.buffer_position(), e)));
            }
        };
        let prev_ws = trailing_ws.take();

        if !wrote_decl && !matches!(event, Event::Decl(_) | Event::Eof) {
            writer.write_event(Event::Decl(utf8_decl()))?;
            writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;
            wrote_decl = true;
        }

        match event {
            Event::Decl(_) => {
                if !wrote_decl {
                    writer.write_event(Event::Decl(utf8_decl()))?;
                    wrote_decl = true;
                }
            }
            Event::Start(mut e) => {
                if open.is_empty() {
                    enter_root(&mut seen_root)?;
                    prefix = bind_android_prefix(&mut e)?;
                } else if !found_application && is_application(&e, open.len()) {
                    found_application = true;
                    in_application = true;
                } else if outcome.is_none() && in_application && open.len() == 2 && is_privacy_meta(&e, &prefix)? {
                    set_attr(&mut e, &format!("{}:value", prefix), url)?;
                    outcome = Some(PatchOutcome::Updated);
                }
                open.push(e.name().as_ref().to_vec());
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(mut e) => {
                if open.is_empty() {
                    enter_root(&mut seen_root)?;
                    bind_android_prefix(&mut e)?;
                    writer.write_event(Event::Empty(e))?;
                } else if !found_application && is_application(&e, open.len()) {
                    // 自闭合的 <application/> 展开为成对标签以容纳新节点
                    found_application = true;
                    writer.write_event(Event::Start(e))?;
                    writer.write_event(Event::Empty(privacy_meta(&prefix, url)))?;
                    writer.write_event(Event::End(BytesEnd::new("application")))?;
                    outcome = Some(PatchOutcome::Added);
                } else if outcome.is_none() && in_application && open.len() == 2 && is_privacy_meta(&e, &prefix)? {
                    set_attr(&mut e, &format!("{}:value", prefix), url)?;
                    outcome = Some(PatchOutcome::Updated);
                    writer.write_event(Event::Empty(e))?;
                } else {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::End(e) => {
                match open.pop() {
                    Some(name) if name.as_slice() == e.name().as_ref() => {}
                    _ => return Err(XmlFault::Parse(format!("位置 {}: 结束标签不匹配", reader.buffer_position()))),
                }
                if in_application && open.len() == 1 {
                    in_application = false;
                    if outcome.is_none() {
                        if let Some(ws) = prev_ws.as_deref() {
                            writer.write_event(Event::Text(BytesText::from_escaped(extra_indent(ws))))?;
                        }
                        writer.write_event(Event::Empty(privacy_meta(&prefix, url)))?;
                        if let Some(ws) = prev_ws {
                            writer.write_event(Event::Text(BytesText::from_escaped(ws)))?;
                        }
                        outcome = Some(PatchOutcome::Added);
                    }
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Text(t) => {
                let raw = std::str::from_utf8(&t)?;
                if raw.trim().is_empty() {
                    trailing_ws = Some(raw.to_string());
                } else if open.is_empty() {
                    return Err(XmlFault::Parse("根元素之外存在文本内容".to_string()));
                }
                writer.write_event(Event::Text(t))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    if !open.is_empty() {
        return Err(XmlFault::Parse("文档提前结束，存在未闭合的标签".to_string()));
    }
    if !seen_root {
        return Err(XmlFault::Parse("未找到根元素".to_string()));
    }
    if !found_application {
        return Err(XmlFault::Structure("缺少 <application> 节点".to_string()));
    }
    let outcome = outcome.ok_or_else(|| XmlFault::Structure("无法写入 <meta-data> 节点".to_string()))?;
    let text = String::from_utf8(writer.into_inner()).map_err(|e| XmlFault::Parse(e.to_string()))?;
    Ok((text, outcome))
}

/// 读取、修改并写回清单文件
pub(crate) fn patch_manifest(path: &Path, url: &str) -> Result<PatchOutcome, PatchError> {
    let xml = read_document(path)?;
    let (text, outcome) = patch_manifest_text(&xml, url).map_err(|f| f.at(path))?;
    tracing::debug!(path = %path.display(), ?outcome, "writing manifest");
    write_document(path, &text)?;
    Ok(outcome)
}

/// 交互流程使用的包装：打印结果并折叠为 bool
pub(crate) fn update_android_manifest<W: Write>(path: &Path, url: &str, out: &mut W) -> std::io::Result<bool> {
    match patch_manifest(path, url) {
        Ok(PatchOutcome::Added) => {
            writeln!(out, "✅ 已在 AndroidManifest.xml 中添加隐私政策 URL。")?;
            Ok(true)
        }
        Ok(PatchOutcome::Updated) => {
            writeln!(out, "✅ 已更新 AndroidManifest.xml 中的隐私政策 URL。")?;
            Ok(true)
        }
        Err(PatchError::NotFound { path }) => {
            writeln!(out, "❌ 未找到 AndroidManifest.xml: {}", path.display())?;
            Ok(false)
        }
        Err(PatchError::Structure { .. }) => {
            writeln!(out, "❌ AndroidManifest.xml 中没有 <application> 标签。")?;
            Ok(false)
        }
        Err(e) => {
            writeln!(out, "❌ 处理 AndroidManifest.xml 失败: {}", e)?;
            Ok(false)
        }
    }
}

fn utf8_decl() -> BytesDecl<'static> {
    BytesDecl::new("1.0", Some("utf-8"), None)
}

fn enter_root(seen_root: &mut bool) -> Result<(), XmlFault> {
    if *seen_root {
        return Err(XmlFault::Parse("存在多个根元素".to_string()));
    }
    *seen_root = true;
    Ok(())
}

fn is_application(e: &BytesStart, depth: usize) -> bool {
    depth == 1 && e.name().as_ref() == b"application"
}

fn is_privacy_meta(e: &BytesStart, prefix: &str) -> Result<bool, XmlFault> {
    if e.name().as_ref() != b"meta-data" {
        return Ok(false);
    }
    let name = attr_value(e, &format!("{}:name", prefix))?;
    Ok(name.as_deref() == Some(PRIVACY_META_NAME))
}

fn privacy_meta(prefix: &str, url: &str) -> BytesStart<'static> {
    let mut meta = BytesStart::new("meta-data");
    meta.push_attribute((format!("{}:name", prefix).as_str(), PRIVACY_META_NAME));
    meta.push_attribute((format!("{}:value", prefix).as_str(), url));
    meta
}

/// `</application>` 前的空白已写出，子节点只需再补一级缩进
fn extra_indent(ws: &str) -> &str {
    match ws.rsplit('\n').next() {
        Some(indent) if !indent.is_empty() => indent,
        _ => "    ",
    }
}

/// 在根元素上找到绑定 Android 命名空间的前缀；没有则注册 `xmlns:android`
fn bind_android_prefix(root: &mut BytesStart) -> Result<String, XmlFault> {
    let mut taken: Vec<String> = Vec::new();
    for a in root.attributes() {
        let a = a?;
        if let Some(p) = a.key.as_ref().strip_prefix(b"xmlns:") {
            let p = std::str::from_utf8(p)?.to_string();
            if a.unescape_value()? == ANDROID_NS {
                return Ok(p);
            }
            taken.push(p);
        }
    }
    let mut prefix = String::from("android");
    let mut n = 0;
    while taken.contains(&prefix) {
        prefix = format!("ns{}", n);
        n += 1;
    }
    root.push_attribute((format!("xmlns:{}", prefix).as_str(), ANDROID_NS));
    tracing::debug!(%prefix, "registered android namespace on root element");
    Ok(prefix)
}

fn attr_value(e: &BytesStart, key: &str) -> Result<Option<String>, XmlFault> {
    for a in e.attributes() {
        let a = a?;
        if a.key.as_ref() == key.as_bytes() {
            return Ok(Some(a.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// 原位替换属性值，其余属性保持顺序；不存在则追加
fn set_attr(e: &mut BytesStart, key: &str, value: &str) -> Result<(), XmlFault> {
    let mut attrs: Vec<(Vec<u8>, String)> = Vec::new();
    let mut replaced = false;
    for a in e.attributes() {
        let a = a?;
        if a.key.as_ref() == key.as_bytes() {
            attrs.push((a.key.as_ref().to_vec(), escape(value).into_owned()));
            replaced = true;
        } else {
            attrs.push((a.key.as_ref().to_vec(), escape(&a.unescape_value()?).into_owned()));
        }
    }
    if !replaced {
        attrs.push((key.as_bytes().to_vec(), escape(value).into_owned()));
    }
    e.clear_attributes();
    for (k, v) in &attrs {
        e.push_attribute((k.as_slice(), v.as_bytes()));
    }
    Ok(())
}
