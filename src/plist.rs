//! Info.plist 修改模块：新增或更新 `PrivacyPolicyURL`
//! - `Structured`：quick-xml 事件流，只认顶层 `<dict>` 的直接子键
//! - `Legacy`：纯文本拼接，保留“替换旧值的第一个文本匹配”的行为，
//!   旧值若在文件更靠前的位置出现（或为空串），被替换的会是那一处

use std::{io::Write, path::Path};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::{
    error::{PatchError, PatchOutcome, XmlFault},
    utils::{read_document, write_document},
};

/// 相对项目根目录的 plist 路径
pub(crate) const PLIST_PATH: &str = "ios/Runner/Info.plist";
pub(crate) const PRIVACY_KEY: &str = "PrivacyPolicyURL";

const KEY_MARKER: &str = "<key>PrivacyPolicyURL</key>";
const DEFAULT_CHILD_WS: &str = "\n\t";

/// plist 更新方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum PlistMode {
    #[default]
    Structured,
    Legacy,
}

/// 按模式修改 plist 文本
pub(crate) fn patch_plist_text(text: &str, url: &str, mode: PlistMode) -> Result<(String, PatchOutcome), XmlFault> {
    match mode {
        PlistMode::Structured => patch_plist_structured(text, url),
        PlistMode::Legacy => patch_plist_legacy(text, url),
    }
}

/// 文本拼接方式：
/// - 已有键：取键之后第一个 `<string>` 的内容作为旧值，替换全文中旧值的第一次出现
/// - 没有键：在最后一个 `</dict>` 之前插入键值对（URL 不做转义）
pub(crate) fn patch_plist_legacy(text: &str, url: &str) -> Result<(String, PatchOutcome), XmlFault> {
    if let Some(pos) = text.find(KEY_MARKER) {
        let after = &text[pos + KEY_MARKER.len()..];
        // 只看到下一个同名键为止
        let after = after.split(KEY_MARKER).next().unwrap_or(after);
        let (_, rest) = after
            .split_once("<string>")
            .ok_or_else(|| XmlFault::Structure(format!("{} 之后没有 <string> 值", PRIVACY_KEY)))?;
        let segment = rest.split("<string>").next().unwrap_or(rest);
        let old = segment.split("</string>").next().unwrap_or(segment);
        tracing::debug!(old, "legacy plist update");
        return Ok((text.replacen(old, url, 1), PatchOutcome::Updated));
    }

    let insert_at = text
        .rfind("</dict>")
        .ok_or_else(|| XmlFault::Structure("未找到 </dict>".to_string()))?;
    let entry = format!("\n\t{}\n\t<string>{}</string>\n", KEY_MARKER, url);
    let mut out = String::with_capacity(text.len() + entry.len());
    out.push_str(&text[..insert_at]);
    out.push_str(&entry);
    out.push_str(&text[insert_at..]);
    Ok((out, PatchOutcome::Added))
}

/// 结构化方式：只处理顶层 `<dict>`（根元素或根元素的直接子元素）
pub(crate) fn patch_plist_structured(xml: &str, url: &str) -> Result<(String, PatchOutcome), XmlFault> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;
    // 顶层 dict 打开时的栈深度；关闭后置 None 并记 dict_closed
    let mut dict_depth: Option<usize> = None;
    let mut dict_closed = false;
    let mut key_text: Option<String> = None;
    let mut pending_value = false;
    let mut skip = 0usize;
    let mut outcome: Option<PatchOutcome> = None;
    let mut trailing_ws: Option<String> = None;
    let mut child_ws: Option<String> = None;

    loop {
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) => {
                return Err(XmlFault::Parse(format!("位置 {}: {}", reader.buffer_position(), e)));
            }
        };
        let prev_ws = trailing_ws.take();

        // 丢弃被替换掉的旧值子树
        if skip > 0 {
            match event {
                Event::Start(_) => skip += 1,
                Event::End(_) => skip -= 1,
                Event::Eof => return Err(XmlFault::Parse("文档提前结束，存在未闭合的标签".to_string())),
                _ => {}
            }
            continue;
        }

        let at_dict_child = dict_depth == Some(open.len());

        match event {
            Event::Start(e) => {
                if open.is_empty() {
                    if seen_root {
                        return Err(XmlFault::Parse("存在多个根元素".to_string()));
                    }
                    seen_root = true;
                }
                if at_dict_child {
                    if prev_ws.is_some() {
                        child_ws = prev_ws.clone();
                    }
                    let is_key = e.name().as_ref() == b"key";
                    if pending_value {
                        write_string_value(&mut writer, url)?;
                        pending_value = false;
                        outcome = Some(PatchOutcome::Updated);
                        if !is_key {
                            skip = 1;
                            continue;
                        }
                    }
                    if is_key {
                        key_text = Some(String::new());
                    }
                } else if is_top_dict(&e, open.len(), dict_depth, dict_closed) {
                    open.push(e.name().as_ref().to_vec());
                    dict_depth = Some(open.len());
                    writer.write_event(Event::Start(e))?;
                    continue;
                }
                open.push(e.name().as_ref().to_vec());
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) => {
                if open.is_empty() {
                    if seen_root {
                        return Err(XmlFault::Parse("存在多个根元素".to_string()));
                    }
                    seen_root = true;
                }
                if at_dict_child {
                    if prev_ws.is_some() {
                        child_ws = prev_ws.clone();
                    }
                    if pending_value {
                        write_string_value(&mut writer, url)?;
                        pending_value = false;
                        outcome = Some(PatchOutcome::Updated);
                        if e.name().as_ref() != b"key" {
                            continue;
                        }
                    }
                } else if is_top_dict(&e, open.len(), dict_depth, dict_closed) {
                    // <dict/> 展开为成对标签
                    writer.write_event(Event::Start(e))?;
                    write_entry(&mut writer, url, DEFAULT_CHILD_WS, None)?;
                    writer.write_event(Event::End(BytesEnd::new("dict")))?;
                    outcome = Some(PatchOutcome::Added);
                    dict_closed = true;
                    continue;
                }
                writer.write_event(Event::Empty(e))?;
            }
            Event::End(e) => {
                if at_dict_child {
                    // 顶层 dict 的结束标签
                    if pending_value {
                        if prev_ws.is_some() {
                            writer.write_event(Event::Text(BytesText::from_escaped(indent_of(
                                child_ws.as_deref().unwrap_or(DEFAULT_CHILD_WS),
                            ))))?;
                        }
                        write_string_value(&mut writer, url)?;
                        if let Some(ws) = prev_ws.as_deref() {
                            writer.write_event(Event::Text(BytesText::from_escaped(ws)))?;
                        }
                        pending_value = false;
                        outcome = Some(PatchOutcome::Updated);
                    } else if outcome.is_none() {
                        let ws = child_ws.as_deref().unwrap_or(DEFAULT_CHILD_WS);
                        write_entry(&mut writer, url, ws, prev_ws.as_deref())?;
                        outcome = Some(PatchOutcome::Added);
                    }
                    dict_depth = None;
                    dict_closed = true;
                }
                match open.pop() {
                    Some(name) if name.as_slice() == e.name().as_ref() => {}
                    _ => return Err(XmlFault::Parse(format!("位置 {}: 结束标签不匹配", reader.buffer_position()))),
                }
                if dict_depth == Some(open.len()) && e.name().as_ref() == b"key" {
                    if let Some(k) = key_text.take() {
                        if outcome.is_none() && k.trim() == PRIVACY_KEY {
                            pending_value = true;
                        }
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
                if let Some(k) = key_text.as_mut() {
                    k.push_str(&t.unescape()?);
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
    if !dict_closed {
        return Err(XmlFault::Structure("缺少顶层 <dict>".to_string()));
    }
    let outcome = outcome.ok_or_else(|| XmlFault::Structure("无法写入 PrivacyPolicyURL".to_string()))?;
    let text = String::from_utf8(writer.into_inner()).map_err(|e| XmlFault::Parse(e.to_string()))?;
    Ok((text, outcome))
}

/// 读取、修改并写回 Info.plist
pub(crate) fn patch_plist(path: &Path, url: &str, mode: PlistMode) -> Result<PatchOutcome, PatchError> {
    let text = read_document(path)?;
    let (patched, outcome) = patch_plist_text(&text, url, mode).map_err(|f| f.at(path))?;
    tracing::debug!(path = %path.display(), ?mode, ?outcome, "writing plist");
    write_document(path, &patched)?;
    Ok(outcome)
}

/// 交互流程使用的包装：打印结果并折叠为 bool
pub(crate) fn update_ios_info_plist<W: Write>(
    path: &Path,
    url: &str,
    mode: PlistMode,
    out: &mut W,
) -> std::io::Result<bool> {
    match patch_plist(path, url, mode) {
        Ok(PatchOutcome::Added) => {
            writeln!(out, "✅ 已在 Info.plist 中添加隐私政策 URL。")?;
            Ok(true)
        }
        Ok(PatchOutcome::Updated) => {
            writeln!(out, "✅ 已更新 Info.plist 中的隐私政策 URL。")?;
            Ok(true)
        }
        Err(PatchError::NotFound { path }) => {
            writeln!(out, "❌ 未找到 Info.plist: {}", path.display())?;
            Ok(false)
        }
        Err(e) => {
            writeln!(out, "❌ 处理 Info.plist 失败: {}", e)?;
            Ok(false)
        }
    }
}

// 顶层 dict：根元素本身，或根元素的直接子元素；只取第一个
fn is_top_dict(e: &BytesStart, depth: usize, dict_depth: Option<usize>, dict_closed: bool) -> bool {
    dict_depth.is_none() && !dict_closed && depth <= 1 && e.name().as_ref() == b"dict"
}

fn indent_of(ws: &str) -> &str {
    ws.rsplit('\n').next().unwrap_or("")
}

fn write_string_value(writer: &mut Writer<Vec<u8>>, url: &str) -> Result<(), XmlFault> {
    writer.write_event(Event::Start(BytesStart::new("string")))?;
    writer.write_event(Event::Text(BytesText::new(url)))?;
    writer.write_event(Event::End(BytesEnd::new("string")))?;
    Ok(())
}

/// 在 `</dict>` 前写入键值对；`prev_ws` 为已写出的结束标签前空白
fn write_entry(writer: &mut Writer<Vec<u8>>, url: &str, child_ws: &str, prev_ws: Option<&str>) -> Result<(), XmlFault> {
    let lead = if prev_ws.is_some() { indent_of(child_ws) } else { child_ws };
    writer.write_event(Event::Text(BytesText::from_escaped(lead)))?;
    writer.write_event(Event::Start(BytesStart::new("key")))?;
    writer.write_event(Event::Text(BytesText::new(PRIVACY_KEY)))?;
    writer.write_event(Event::End(BytesEnd::new("key")))?;
    writer.write_event(Event::Text(BytesText::from_escaped(child_ws)))?;
    write_string_value(writer, url)?;
    writer.write_event(Event::Text(BytesText::from_escaped(prev_ws.unwrap_or("\n"))))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const URL: &str = "https://example.com/privacy";

    const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleName</key>
	<string>demo</string>
	<key>UIRequiresFullScreen</key>
	<true/>
</dict>
</plist>
"#;

    const WITH_KEY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
	<key>PrivacyPolicyURL</key>
	<string>https://old.example.com</string>
	<key>CFBundleName</key>
	<string>demo</string>
</dict>
</plist>
"#;

    fn assert_single_pair_before_dict_end(out: &str) {
        assert_eq!(out.matches(KEY_MARKER).count(), 1, "{out}");
        let pair = format!("{}\n\t<string>{}</string>", KEY_MARKER, URL);
        let at = out.find(&pair).expect("key must be followed by its string");
        assert!(at < out.rfind("</dict>").unwrap());
    }

    #[test]
    fn inserts_pair_before_final_dict_close_in_both_modes() {
        for mode in [PlistMode::Structured, PlistMode::Legacy] {
            let (out, outcome) = patch_plist_text(INFO_PLIST, URL, mode).unwrap();
            assert_eq!(outcome, PatchOutcome::Added, "{mode:?}");
            assert_single_pair_before_dict_end(&out);
            assert!(out.contains("<true/>"));
        }
    }

    #[test]
    fn structured_insert_keeps_indentation() {
        let (out, _) = patch_plist_structured(INFO_PLIST, URL).unwrap();
        assert!(out.contains("\t<true/>\n\t<key>PrivacyPolicyURL</key>\n\t<string>https://example.com/privacy</string>\n</dict>"));
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(out.contains("<!DOCTYPE plist"));
    }

    #[test]
    fn updates_existing_value_in_both_modes() {
        for mode in [PlistMode::Structured, PlistMode::Legacy] {
            let (out, outcome) = patch_plist_text(WITH_KEY, URL, mode).unwrap();
            assert_eq!(outcome, PatchOutcome::Updated, "{mode:?}");
            assert_single_pair_before_dict_end(&out);
            assert!(!out.contains("old.example.com"));
            assert!(out.contains("<string>demo</string>"));
        }
    }

    #[test]
    fn patching_twice_is_idempotent() {
        for mode in [PlistMode::Structured, PlistMode::Legacy] {
            let (first, _) = patch_plist_text(INFO_PLIST, URL, mode).unwrap();
            let (second, outcome) = patch_plist_text(&first, URL, mode).unwrap();
            assert_eq!(outcome, PatchOutcome::Updated);
            assert_eq!(first, second, "{mode:?}");
            assert_eq!(second.matches(KEY_MARKER).count(), 1);
        }
    }

    #[test]
    fn legacy_replaces_first_textual_match_of_old_value() {
        // 旧值同时出现在更靠前的无关键里：文本方式改掉的是那一处
        let text = "<plist><dict>\n\t<key>Support</key>\n\t<string>https://old.example.com</string>\n\t<key>PrivacyPolicyURL</key>\n\t<string>https://old.example.com</string>\n</dict></plist>";
        let (out, _) = patch_plist_legacy(text, URL).unwrap();
        assert!(out.contains("<key>Support</key>\n\t<string>https://example.com/privacy</string>"));
        assert!(out.contains("<key>PrivacyPolicyURL</key>\n\t<string>https://old.example.com</string>"));

        let (structured, _) = patch_plist_structured(text, URL).unwrap();
        assert!(structured.contains("<key>Support</key>\n\t<string>https://old.example.com</string>"));
        assert!(structured.contains("<key>PrivacyPolicyURL</key>\n\t<string>https://example.com/privacy</string>"));
    }

    #[test]
    fn legacy_empty_old_value_lands_at_document_start() {
        let text = "<dict><key>PrivacyPolicyURL</key><string></string></dict>";
        let (out, outcome) = patch_plist_legacy(text, URL).unwrap();
        assert_eq!(outcome, PatchOutcome::Updated);
        assert!(out.starts_with(URL));
        assert!(out.ends_with("<string></string></dict>"));

        let (structured, _) = patch_plist_structured(text, URL).unwrap();
        assert_eq!(structured, format!("<dict><key>PrivacyPolicyURL</key><string>{}</string></dict>", URL));
    }

    #[test]
    fn legacy_requires_string_after_key_and_a_dict_close() {
        let err = patch_plist_legacy("<dict><key>PrivacyPolicyURL</key><true/></dict>", URL).unwrap_err();
        assert!(matches!(err, XmlFault::Structure(_)));
        let err = patch_plist_legacy("<plist></plist>", URL).unwrap_err();
        assert!(matches!(err, XmlFault::Structure(_)));
    }

    #[test]
    fn structured_ignores_nested_keys() {
        let text = "<plist><dict>\n\t<key>Nested</key>\n\t<dict>\n\t\t<key>PrivacyPolicyURL</key>\n\t\t<string>keep</string>\n\t</dict>\n</dict></plist>";
        let (out, outcome) = patch_plist_structured(text, URL).unwrap();
        assert_eq!(outcome, PatchOutcome::Added);
        assert!(out.contains("<string>keep</string>"));
        assert_eq!(out.matches(KEY_MARKER).count(), 2);
        assert!(out.contains("\t</dict>\n\t<key>PrivacyPolicyURL</key>\n\t<string>https://example.com/privacy</string>\n</dict>"));
    }

    #[test]
    fn structured_replaces_non_string_value() {
        let text = "<plist><dict><key>PrivacyPolicyURL</key><array><string>a</string></array><key>X</key><true/></dict></plist>";
        let (out, outcome) = patch_plist_structured(text, URL).unwrap();
        assert_eq!(outcome, PatchOutcome::Updated);
        assert_eq!(
            out,
            format!("<plist><dict><key>PrivacyPolicyURL</key><string>{}</string><key>X</key><true/></dict></plist>", URL)
        );
    }

    #[test]
    fn structured_expands_empty_dict() {
        let (out, outcome) = patch_plist_structured("<plist><dict/></plist>", URL).unwrap();
        assert_eq!(outcome, PatchOutcome::Added);
        assert_eq!(
            out,
            format!("<plist><dict>\n\t<key>PrivacyPolicyURL</key>\n\t<string>{}</string>\n</dict></plist>", URL)
        );
    }

    #[test]
    fn structured_escapes_url() {
        let (out, _) = patch_plist_structured(WITH_KEY, "https://e.com/?a=1&b=2").unwrap();
        assert!(out.contains("<string>https://e.com/?a=1&amp;b=2</string>"));
    }

    #[test]
    fn structured_rejects_bad_documents() {
        assert!(matches!(
            patch_plist_structured("<plist><dict></plist>", URL).unwrap_err(),
            XmlFault::Parse(_)
        ));
        assert!(matches!(
            patch_plist_structured("<plist><array/></plist>", URL).unwrap_err(),
            XmlFault::Structure(_)
        ));
    }

    #[test]
    fn missing_file_is_reported_and_not_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PLIST_PATH);
        let err = patch_plist(&path, URL, PlistMode::Structured).unwrap_err();
        assert!(matches!(err, PatchError::NotFound { .. }));
        assert!(!path.exists());

        let mut out = Vec::new();
        assert!(!update_ios_info_plist(&path, URL, PlistMode::Legacy, &mut out).unwrap());
        assert!(String::from_utf8(out).unwrap().contains("未找到 Info.plist"));
        assert!(!path.exists());
    }

    #[test]
    fn file_is_rewritten_and_messages_distinguish_add_and_update() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Info.plist");
        fs::write(&path, INFO_PLIST).unwrap();

        let mut out = Vec::new();
        assert!(update_ios_info_plist(&path, URL, PlistMode::Structured, &mut out).unwrap());
        assert!(update_ios_info_plist(&path, "https://e.com/v2", PlistMode::Structured, &mut out).unwrap());
        let log = String::from_utf8(out).unwrap();
        assert!(log.lines().next().unwrap().contains("添加"));
        assert!(log.lines().nth(1).unwrap().contains("更新"));
        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("<string>https://e.com/v2</string>"));
        assert_eq!(saved.matches(KEY_MARKER).count(), 1);
    }
}
