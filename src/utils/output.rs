//! # 终端输出
//!
//! 统一的带前缀彩色消息：`[OK]`、`[ERR]`、`[WARN]`、`[*]`、`[SKIP]`、`[DONE]`。
//! 库代码不打印；命令层通过这里报告进度、结果与容差提示。
//!
//! ## 依赖关系
//! - 被 `commands/` 和 `batch/` 使用
//! - 使用 `colored` crate

use crate::symmetry::ToleranceAdvisory;

use colored::Colorize;

pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

pub fn print_skip(msg: &str) {
    println!("{} {}", "[SKIP]".dimmed(), msg);
}

pub fn print_done(msg: &str) {
    println!("{} {}", "[DONE]".green().bold(), msg);
}

/// 打印 "输入 -> 输出" 形式的写出消息
pub fn print_written(from: &str, to: &str) {
    println!(
        "{} {} {} {}",
        "[OK]".green().bold(),
        from.dimmed(),
        "->".cyan(),
        to
    );
}

/// 以警告形式打印容差提示
pub fn print_advisories(advisories: &[ToleranceAdvisory]) {
    for advisory in advisories {
        print_warning(&advisory.to_string());
    }
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let line = "─".repeat(60);
    println!("\n{}", line.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", line.dimmed());
}

pub fn print_separator() {
    println!("{}", "─".repeat(60).dimmed());
}
