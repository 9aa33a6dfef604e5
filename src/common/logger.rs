use colored::*;

/// 初始化 tracing 日志
pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

/// 漂亮的控制台输出工具
pub struct PrettyLogger;

impl PrettyLogger {
    /// 显示成功消息
    pub fn success(message: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), message.as_ref());
    }

    /// 显示信息消息
    pub fn info(message: impl AsRef<str>) {
        println!("{} {}", "ℹ".blue().bold(), message.as_ref());
    }

    /// 显示警告消息
    pub fn warning(message: impl AsRef<str>) {
        println!("{} {}", "⚠".yellow().bold(), message.as_ref());
    }

    /// 显示文件信息
    pub fn file_info(label: impl AsRef<str>, path: impl AsRef<str>) {
        println!("{} {}: {}", "📁".blue().bold(), label.as_ref().bold(), path.as_ref());
    }

    /// 显示标题
    pub fn title(text: impl AsRef<str>) {
        let text = text.as_ref();
        let width = text.chars().count().min(48);
        let padding = (48 - width) / 2;
        println!(
            "{} {} {}",
            "─".repeat(padding).bright_black(),
            text.bold(),
            "─".repeat(48 - padding - width).bright_black()
        );
    }
}
