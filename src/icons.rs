//! 图标检查模块：
//! - 固定的 Android（5 个密度）与 iOS（10 个尺寸）启动图标清单
//! - 逐个检查文件是否存在并输出一行结果，只读、无汇总结论

use std::{io::{self, Write}, path::Path};

pub(crate) const ANDROID_ICONS: [&str; 5] = [
    "android/app/src/main/res/mipmap-hdpi/ic_launcher.png",
    "android/app/src/main/res/mipmap-mdpi/ic_launcher.png",
    "android/app/src/main/res/mipmap-xhdpi/ic_launcher.png",
    "android/app/src/main/res/mipmap-xxhdpi/ic_launcher.png",
    "android/app/src/main/res/mipmap-xxxhdpi/ic_launcher.png",
];

pub(crate) const IOS_ICONS: [&str; 10] = [
    "ios/Runner/Assets.xcassets/AppIcon.appiconset/Icon-App-20x20@2x.png",
    "ios/Runner/Assets.xcassets/AppIcon.appiconset/Icon-App-20x20@3x.png",
    "ios/Runner/Assets.xcassets/AppIcon.appiconset/Icon-App-29x29@1x.png",
    "ios/Runner/Assets.xcassets/AppIcon.appiconset/Icon-App-29x29@2x.png",
    "ios/Runner/Assets.xcassets/AppIcon.appiconset/Icon-App-29x29@3x.png",
    "ios/Runner/Assets.xcassets/AppIcon.appiconset/Icon-App-40x40@2x.png",
    "ios/Runner/Assets.xcassets/AppIcon.appiconset/Icon-App-40x40@3x.png",
    "ios/Runner/Assets.xcassets/AppIcon.appiconset/Icon-App-60x60@2x.png",
    "ios/Runner/Assets.xcassets/AppIcon.appiconset/Icon-App-60x60@3x.png",
    "ios/Runner/Assets.xcassets/AppIcon.appiconset/Icon-App-1024x1024@1x.png",
];

/// 单个图标的检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IconStatus {
    pub(crate) path: &'static str,
    pub(crate) present: bool,
}

/// 相对 `root` 检查每个路径；意外的 I/O 错误直接向上传递
pub(crate) fn icon_statuses(root: &Path, paths: &[&'static str]) -> io::Result<Vec<IconStatus>> {
    paths
        .iter()
        .map(|p| -> io::Result<IconStatus> {
            Ok(IconStatus { path: *p, present: root.join(p).try_exists()? })
        })
        .collect()
}

fn print_group<W: Write>(out: &mut W, title: &str, statuses: &[IconStatus]) -> io::Result<()> {
    writeln!(out, "\n{}:", title)?;
    for s in statuses {
        if s.present {
            writeln!(out, "✅ {}", s.path)?;
        } else {
            writeln!(out, "❌ {} 缺失!", s.path)?;
        }
    }
    Ok(())
}

/// 检查并输出两端的图标情况
pub(crate) fn check_icons<W: Write>(root: &Path, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n--- 检查图标 ---")?;
    let android = icon_statuses(root, &ANDROID_ICONS)?;
    print_group(out, "Android 图标", &android)?;
    let ios = icon_statuses(root, &IOS_ICONS)?;
    print_group(out, "iOS 图标", &ios)?;
    tracing::debug!(
        missing = android.iter().chain(ios.iter()).filter(|s| !s.present).count(),
        "icon check finished"
    );
    Ok(())
}
